//! # Error Types
//!
//! Custom error types for joystick calibration using `thiserror`.

use thiserror::Error;

/// Main error type for joystick calibration
#[derive(Debug, Error)]
pub enum JoystickError {
    /// Raw acquisition failed or returned an out-of-range reading
    #[error("Acquisition error: {0}")]
    Acquisition(String),

    /// A slope denominator is zero or an extreme lies inside the resting band
    #[error("Calibration degenerate: {0}")]
    CalibrationDegenerate(String),

    /// The operator interrupted a calibration phase
    #[error("Calibration aborted by operator")]
    OperatorAbort,

    /// Calibration record missing or unreadable
    #[error("Calibration record error: {0}")]
    Record(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Calibration record serialization errors
    #[error("Serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Telemetry encoding errors
    #[error("Telemetry encoding error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for joystick calibration
pub type Result<T> = std::result::Result<T, JoystickError>;
