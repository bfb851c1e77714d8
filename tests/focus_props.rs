//! Property tests for focus targeting and the lens ramp

use proptest::prelude::*;
use snapcrab::session::{FocusTarget, ManualFocusRamp};
use snapcrab::types::{SurfaceBounds, TapPoint};
use std::time::Duration;

proptest! {
    /// Any finite tap on a non-empty surface lands in the unit square
    #[test]
    fn focus_target_is_normalized(
        x in -5000.0f64..5000.0,
        y in -5000.0f64..5000.0,
        origin_x in -100.0f64..100.0,
        origin_y in -100.0f64..100.0,
        width in 0.5f64..4000.0,
        height in 0.5f64..4000.0,
    ) {
        let bounds = SurfaceBounds { x: origin_x, y: origin_y, width, height };
        let target = FocusTarget::from_tap(TapPoint::new(x, y), bounds).unwrap();
        prop_assert!((0.0..=1.0).contains(&target.x));
        prop_assert!((0.0..=1.0).contains(&target.y));
    }

    /// Taps inside the surface map proportionally
    #[test]
    fn focus_target_preserves_interior_points(
        fx in 0.0f64..=1.0,
        fy in 0.0f64..=1.0,
        width in 1.0f64..4000.0,
        height in 1.0f64..4000.0,
    ) {
        let bounds = SurfaceBounds::new(width, height);
        let target = FocusTarget::from_tap(TapPoint::new(fx * width, fy * height), bounds).unwrap();
        prop_assert!((target.x - fx).abs() < 1e-9);
        prop_assert!((target.y - fy).abs() < 1e-9);
    }

    /// Surfaces without area never produce a point of interest
    #[test]
    fn empty_surface_has_no_target(
        x in -100.0f64..100.0,
        y in -100.0f64..100.0,
        width in -10.0f64..=0.0,
    ) {
        let bounds = SurfaceBounds::new(width, 100.0);
        prop_assert!(FocusTarget::from_tap(TapPoint::new(x, y), bounds).is_none());
    }

    /// The default ramp cycles through 101 positions: 0.00, 0.01, ..., 1.00
    #[test]
    fn ramp_position_follows_cycle(ticks in 0usize..1000) {
        let mut ramp = ManualFocusRamp::new(0.01, Duration::from_millis(1));
        let mut position = 0.0;
        for _ in 0..ticks {
            position = ramp.advance();
        }
        let expected = (ticks % 101) as f32 * 0.01;
        prop_assert!((position - expected).abs() < 1e-4, "{} vs {}", position, expected);
        prop_assert!((0.0..=1.0).contains(&position));
    }

    /// Any step keeps the lens inside [0, 1]
    #[test]
    fn ramp_stays_in_range(step in 0.001f32..=1.0, ticks in 1usize..500) {
        let mut ramp = ManualFocusRamp::new(step, Duration::from_millis(1));
        for _ in 0..ticks {
            let position = ramp.advance();
            prop_assert!((0.0..=1.0).contains(&position));
        }
    }
}
