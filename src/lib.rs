//! # Joystick Calibration Library
//!
//! Calibrate a 2-axis analog joystick read through an ADC, then map raw
//! readings into a normalized, signed output range.
//!
//! A calibration run samples the stick at rest and at each extreme of travel
//! and derives a [`CalibrationRecord`](calibration::record::CalibrationRecord).
//! At runtime a [`Normalizer`](calibration::normalize::Normalizer) built from
//! that record turns every raw reading into an `(x, y)` pair that is 0 at rest
//! and reaches ±100 at the calibrated extremes.

pub mod adc;
pub mod calibration;
pub mod config;
pub mod error;
pub mod telemetry;
