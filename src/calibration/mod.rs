//! # Calibration Module
//!
//! Joystick calibration and runtime normalization.
//!
//! This module handles:
//! - Sampling the resting band and the extremes of travel
//! - Deriving the per-axis slopes and rejecting degenerate calibrations
//! - Persisting the calibration record
//! - Normalizing raw readings into the signed output range
//! - Driving the operator through the calibration phases

pub mod abort;
pub mod normalize;
pub mod procedure;
pub mod record;
pub mod sampler;
pub mod slope;
