//! Tap-to-focus targeting and the manual focus lens ramp

use crate::config::{DEFAULT_RAMP_INTERVAL, DEFAULT_RAMP_STEP};
use crate::types::{SurfaceBounds, TapPoint};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Normalized focus point of interest, both axes in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FocusTarget {
    pub x: f64,
    pub y: f64,
}

impl FocusTarget {
    /// Normalize a tap against the preview surface bounds.
    ///
    /// Returns `None` when the surface has no area or the tap is not a number.
    pub fn from_tap(point: TapPoint, bounds: SurfaceBounds) -> Option<Self> {
        if bounds.is_empty() || !point.x.is_finite() || !point.y.is_finite() {
            return None;
        }
        Some(Self {
            x: ((point.x - bounds.x) / bounds.width).clamp(0.0, 1.0),
            y: ((point.y - bounds.y) / bounds.height).clamp(0.0, 1.0),
        })
    }
}

// Lens positions are kept on a 1e-4 grid so repeated steps do not drift.
const LENS_GRID: f32 = 10_000.0;

/// Recurring lens sweep used by manual focus mode.
///
/// The ramp itself is plain state; the worker owns it, applies each step to
/// the bound device and drives the timer task that produces ticks. Every
/// armed run carries a generation number and a cancellation token so ticks
/// from an earlier run are ignored.
#[derive(Debug)]
pub struct ManualFocusRamp {
    lens_position: f32,
    step: f32,
    interval: Duration,
    generation: u64,
    token: Option<CancellationToken>,
}

impl ManualFocusRamp {
    pub fn new(step: f32, interval: Duration) -> Self {
        Self {
            lens_position: 0.0,
            step,
            interval,
            generation: 0,
            token: None,
        }
    }

    pub fn lens_position(&self) -> f32 {
        self.lens_position
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Step the lens forward, wrapping past 1.0 back to 0.0
    pub fn advance(&mut self) -> f32 {
        let next = ((self.lens_position + self.step) * LENS_GRID).round() / LENS_GRID;
        self.lens_position = if next > 1.0 { 0.0 } else { next };
        self.lens_position
    }

    pub fn is_active(&self) -> bool {
        self.token.as_ref().is_some_and(|t| !t.is_cancelled())
    }

    /// Begin a new run under `token`, cancelling any previous one.
    /// Returns the generation ticks must carry.
    pub fn arm(&mut self, token: CancellationToken) -> u64 {
        self.cancel();
        self.generation = self.generation.wrapping_add(1);
        self.token = Some(token);
        self.generation
    }

    pub fn cancel(&mut self) {
        if let Some(token) = self.token.take() {
            token.cancel();
        }
    }

    /// Whether a tick from `generation` belongs to the live run
    pub fn accepts(&self, generation: u64) -> bool {
        self.is_active() && generation == self.generation
    }
}

impl Default for ManualFocusRamp {
    fn default() -> Self {
        Self::new(DEFAULT_RAMP_STEP, DEFAULT_RAMP_INTERVAL)
    }
}
