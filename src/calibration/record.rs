//! # Calibration Record
//!
//! The persisted result of a calibration run: for each axis, the resting band,
//! the extremes of travel, and the two slopes converting a deviation outside
//! the band into the output range.
//!
//! ## Invariant
//!
//! For every axis: `extreme_low < resting_low <= resting_high < extreme_high`,
//! and both slopes are finite and strictly positive. Slopes are stored as
//! magnitudes; the direction of a deflection is decided when a reading is
//! normalized, not by the sign of the slope.
//!
//! ## File Format
//!
//! ```toml
//! calibrated_at = "2024-05-01T12:00:00+00:00"
//!
//! [x]
//! resting_low = 32100
//! resting_high = 32900
//! extreme_low = 200
//! extreme_high = 65300
//! slope_low = 0.0031347962382445144
//! slope_high = 0.0030959752321981426
//!
//! [y]
//! # same fields
//! ```
//!
//! Floats are written in shortest round-trip form, so reloading a record
//! reproduces the slopes bit for bit.

use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::adc::Axis;
use crate::error::{JoystickError, Result};

/// Normalized output at the edge of the resting band
pub const OUTPUT_MIN: f64 = 0.0;

/// Normalized output at a calibrated extreme
pub const OUTPUT_MAX: f64 = 100.0;

/// Inclusive raw interval `[low, high]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Band {
    pub low: u16,
    pub high: u16,
}

impl Band {
    #[must_use]
    pub fn new(low: u16, high: u16) -> Self {
        Self { low, high }
    }

    /// Returns `true` if `raw` lies within the band, bounds included.
    #[must_use]
    pub fn contains(&self, raw: u16) -> bool {
        self.low <= raw && raw <= self.high
    }
}

/// One [`Band`] per axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisBands {
    pub x: Band,
    pub y: Band,
}

impl AxisBands {
    /// Returns the band for one axis.
    #[must_use]
    pub fn get(&self, axis: Axis) -> Band {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
        }
    }
}

/// Calibration constants for one axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisCalibration {
    /// Lower edge of the resting band.
    pub resting_low: u16,
    /// Upper edge of the resting band.
    pub resting_high: u16,
    /// Raw value at the low end of travel.
    pub extreme_low: u16,
    /// Raw value at the high end of travel.
    pub extreme_high: u16,
    /// Output units per raw step below the resting band.
    pub slope_low: f64,
    /// Output units per raw step above the resting band.
    pub slope_high: f64,
}

impl AxisCalibration {
    /// Returns the resting band.
    #[must_use]
    pub fn resting(&self) -> Band {
        Band::new(self.resting_low, self.resting_high)
    }

    /// Returns the extremes of travel as a band.
    #[must_use]
    pub fn travel(&self) -> Band {
        Band::new(self.extreme_low, self.extreme_high)
    }

    /// Checks the record invariant for this axis.
    ///
    /// # Errors
    ///
    /// Returns `CalibrationDegenerate` naming the axis and the violated bound.
    pub fn validate(&self, axis: Axis) -> Result<()> {
        if self.resting_low > self.resting_high {
            return Err(JoystickError::CalibrationDegenerate(format!(
                "{} axis resting band is inverted ({} > {})",
                axis, self.resting_low, self.resting_high
            )));
        }

        if self.extreme_low >= self.resting_low {
            return Err(JoystickError::CalibrationDegenerate(format!(
                "{} axis low extreme {} does not lie below the resting band (low edge {})",
                axis, self.extreme_low, self.resting_low
            )));
        }

        if self.extreme_high <= self.resting_high {
            return Err(JoystickError::CalibrationDegenerate(format!(
                "{} axis high extreme {} does not lie above the resting band (high edge {})",
                axis, self.extreme_high, self.resting_high
            )));
        }

        for (side, slope) in [("low", self.slope_low), ("high", self.slope_high)] {
            if !slope.is_finite() || slope <= 0.0 {
                return Err(JoystickError::CalibrationDegenerate(format!(
                    "{} axis {} slope must be finite and positive, got {}",
                    axis, side, slope
                )));
            }
        }

        Ok(())
    }
}

/// Calibration constants for both axes.
///
/// Created once by a calibration run and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    /// RFC 3339 timestamp of the calibration run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calibrated_at: Option<String>,
    pub x: AxisCalibration,
    pub y: AxisCalibration,
}

impl CalibrationRecord {
    /// Creates a record from per-axis constants, stamped with the current time.
    #[must_use]
    pub fn new(x: AxisCalibration, y: AxisCalibration) -> Self {
        Self {
            calibrated_at: Some(chrono::Utc::now().to_rfc3339()),
            x,
            y,
        }
    }

    /// Returns the constants for one axis.
    #[must_use]
    pub fn axis(&self, axis: Axis) -> &AxisCalibration {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
        }
    }

    /// Checks the record invariant on both axes.
    ///
    /// # Errors
    ///
    /// Returns `CalibrationDegenerate` for the first violating axis.
    pub fn validate(&self) -> Result<()> {
        self.x.validate(Axis::X)?;
        self.y.validate(Axis::Y)
    }

    /// Load a calibration record from a TOML file
    ///
    /// # Errors
    ///
    /// Returns `Record` if the file cannot be read or parsed, and
    /// `CalibrationDegenerate` if the stored constants violate the invariant.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use joystick_cal::calibration::record::CalibrationRecord;
    ///
    /// let record = CalibrationRecord::load("joystick_data.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            JoystickError::Record(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let record: CalibrationRecord = toml::from_str(&contents).map_err(|e| {
            JoystickError::Record(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        record.validate()?;
        debug!("Loaded calibration record from {}", path.display());
        Ok(record)
    }

    /// Save the record as TOML.
    ///
    /// The record is written to a sibling `.tmp` file and renamed into place,
    /// so readers never observe a partially written record.
    ///
    /// # Errors
    ///
    /// Returns `CalibrationDegenerate` if the record is invalid (nothing is
    /// written), or `Serialize`/`Io` on encoding or filesystem failures.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        self.validate()?;

        let contents = toml::to_string_pretty(self)?;
        let tmp = tmp_path(path);

        fs::write(&tmp, contents)?;
        if let Err(e) = fs::rename(&tmp, path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        info!("Calibration record written to {}", path.display());
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}
