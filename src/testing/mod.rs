//! Testing utilities: an offline capture platform so sessions can be
//! exercised without camera hardware
pub mod synthetic;

pub use synthetic::{
    synthetic_jpeg, BackendStats, DeviceState, StillBehavior, SyntheticBackend, SyntheticDevice,
    SyntheticDeviceSpec, SyntheticSurface,
};
