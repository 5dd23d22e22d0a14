//! Core telemetry components.
//!
//! This module contains:
//! - Fixed-capacity sample buffering per sensor
//! - Heartbeat-derived device liveness
//! - Gated spectral decomposition of sample windows

pub mod buffer;
pub mod liveness;
pub mod spectral;

// Re-export commonly used types
pub use buffer::{axis_values, Axis, Sample, SampleBuffer};
pub use liveness::{DeviceStatus, LivenessTracker};
pub use spectral::{compute_spectrum, AxisSpectra, SpectralAnalyzer, SpectralPoint};
