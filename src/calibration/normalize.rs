//! # Runtime Normalizer
//!
//! Maps a raw reading into the signed output range using a calibration record.
//!
//! Per axis:
//!
//! | Raw reading | Output |
//! |---|---|
//! | below `resting_low` | `-round(slope_low * (resting_low - raw))` |
//! | inside `[resting_low, resting_high]` | `0` |
//! | above `resting_high` | `+round(slope_high * (raw - resting_high))` |
//!
//! Readings beyond a calibrated extreme produce magnitudes above 100. They are
//! not clamped: an output past 100 means the extreme was under-calibrated.
//!
//! ## Usage
//!
//! ```
//! use joystick_cal::adc::RawSample;
//! use joystick_cal::calibration::normalize::Normalizer;
//! use joystick_cal::calibration::record::{AxisBands, Band};
//! use joystick_cal::calibration::slope::derive_record;
//!
//! let resting = AxisBands { x: Band::new(30_000, 30_000), y: Band::new(30_000, 30_000) };
//! let travel = AxisBands { x: Band::new(10_000, 50_000), y: Band::new(10_000, 50_000) };
//! let normalizer = Normalizer::new(derive_record(resting, travel)?)?;
//!
//! let out = normalizer.normalize(RawSample::new(20_000, 40_000));
//! assert_eq!((out.x, out.y), (-50, 50));
//! # Ok::<(), joystick_cal::error::JoystickError>(())
//! ```

use super::record::{AxisCalibration, CalibrationRecord};
use crate::adc::RawSample;
use crate::error::Result;

/// Normalized joystick deflection.
///
/// `0` inside the resting band; negative toward left/down, positive toward
/// right/up; magnitude 100 at the calibrated extremes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NormalizedSample {
    pub x: i32,
    pub y: i32,
}

/// Maps one oriented raw value for one axis.
///
/// # Examples
///
/// ```
/// use joystick_cal::calibration::normalize::normalize_axis;
/// use joystick_cal::calibration::record::AxisCalibration;
///
/// let cal = AxisCalibration {
///     resting_low: 30_000,
///     resting_high: 31_000,
///     extreme_low: 10_000,
///     extreme_high: 51_000,
///     slope_low: 0.005,
///     slope_high: 0.005,
/// };
///
/// assert_eq!(normalize_axis(&cal, 30_500), 0);
/// assert_eq!(normalize_axis(&cal, 10_000), -100);
/// assert_eq!(normalize_axis(&cal, 51_000), 100);
/// ```
#[must_use]
pub fn normalize_axis(cal: &AxisCalibration, raw: u16) -> i32 {
    if raw < cal.resting_low {
        let deviation = f64::from(cal.resting_low - raw);
        -((cal.slope_low * deviation).round() as i32)
    } else if raw > cal.resting_high {
        let deviation = f64::from(raw - cal.resting_high);
        (cal.slope_high * deviation).round() as i32
    } else {
        0
    }
}

/// Normalizes a sample against a record without validating it first.
///
/// Prefer [`Normalizer`] for repeated use; it checks the record once.
#[must_use]
pub fn normalize(record: &CalibrationRecord, sample: RawSample) -> NormalizedSample {
    NormalizedSample {
        x: normalize_axis(&record.x, sample.x),
        y: normalize_axis(&record.y, sample.y),
    }
}

/// Runtime mapper built from a validated calibration record.
#[derive(Debug, Clone)]
pub struct Normalizer {
    record: CalibrationRecord,
}

impl Normalizer {
    /// Creates a normalizer, validating the record.
    ///
    /// # Errors
    ///
    /// Returns `CalibrationDegenerate` if the record violates its invariant.
    pub fn new(record: CalibrationRecord) -> Result<Self> {
        record.validate()?;
        Ok(Self { record })
    }

    /// Returns the underlying record.
    pub fn record(&self) -> &CalibrationRecord {
        &self.record
    }

    /// Maps an oriented raw sample to a normalized sample.
    ///
    /// Never fails: every value in `0..=RAW_MAX` has a defined output.
    #[must_use]
    pub fn normalize(&self, sample: RawSample) -> NormalizedSample {
        normalize(&self.record, sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adc::RAW_MAX;
    use crate::calibration::record::{AxisBands, Band};
    use crate::calibration::slope::derive_record;
    use crate::error::JoystickError;

    fn single_point_record() -> CalibrationRecord {
        derive_record(
            AxisBands {
                x: Band::new(30_000, 30_000),
                y: Band::new(30_000, 30_000),
            },
            AxisBands {
                x: Band::new(10_000, 50_000),
                y: Band::new(10_000, 50_000),
            },
        )
        .unwrap()
    }

    fn wide_band_record() -> CalibrationRecord {
        derive_record(
            AxisBands {
                x: Band::new(31_000, 33_000),
                y: Band::new(30_500, 32_500),
            },
            AxisBands {
                x: Band::new(1_000, 64_000),
                y: Band::new(500, 65_000),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_single_point_band_example() {
        let normalizer = Normalizer::new(single_point_record()).unwrap();

        let out = normalizer.normalize(RawSample::new(20_000, 40_000));
        assert_eq!(out.x, -50);
        assert_eq!(out.y, 50);

        let out = normalizer.normalize(RawSample::new(40_000, 20_000));
        assert_eq!(out.x, 50);
        assert_eq!(out.y, -50);
    }

    #[test]
    fn test_resting_band_is_dead_zone() {
        let record = wide_band_record();
        for raw in record.x.resting_low..=record.x.resting_high {
            assert_eq!(normalize_axis(&record.x, raw), 0, "raw {} should be centered", raw);
        }
        for raw in record.y.resting_low..=record.y.resting_high {
            assert_eq!(normalize_axis(&record.y, raw), 0, "raw {} should be centered", raw);
        }
    }

    #[test]
    fn test_band_edges() {
        let record = wide_band_record();
        assert_eq!(normalize_axis(&record.x, record.x.resting_low), 0);
        assert_eq!(normalize_axis(&record.x, record.x.resting_high), 0);
        assert!(normalize_axis(&record.x, record.x.resting_low - 300) < 0);
        assert!(normalize_axis(&record.x, record.x.resting_high + 300) > 0);
    }

    #[test]
    fn test_extremes_map_to_full_scale() {
        let record = wide_band_record();
        assert_eq!(normalize_axis(&record.x, record.x.extreme_low), -100);
        assert_eq!(normalize_axis(&record.x, record.x.extreme_high), 100);
        assert_eq!(normalize_axis(&record.y, record.y.extreme_low), -100);
        assert_eq!(normalize_axis(&record.y, record.y.extreme_high), 100);
    }

    #[test]
    fn test_beyond_extremes_is_not_clamped() {
        let record = wide_band_record();
        assert!(normalize_axis(&record.x, 0) < -100);
        assert!(normalize_axis(&record.x, RAW_MAX) > 100);
    }

    #[test]
    fn test_low_side_monotonic() {
        let record = wide_band_record();
        let cal = record.x;

        let mut previous = 0;
        for raw in (0..cal.resting_low).rev() {
            let magnitude = normalize_axis(&cal, raw).abs();
            assert!(magnitude >= previous, "magnitude dropped at raw {}", raw);
            previous = magnitude;
        }

        // One output unit is ~300 raw steps; coarser steps must strictly grow.
        let step = (1.0 / cal.slope_low).ceil() as u16 + 1;
        let mut raw = cal.resting_low - step;
        let mut previous = normalize_axis(&cal, raw).abs();
        while raw >= step {
            raw -= step;
            let magnitude = normalize_axis(&cal, raw).abs();
            assert!(magnitude > previous, "magnitude did not grow at raw {}", raw);
            previous = magnitude;
        }
    }

    #[test]
    fn test_high_side_monotonic() {
        let record = wide_band_record();
        let cal = record.y;

        let mut previous = 0;
        for raw in cal.resting_high + 1..=RAW_MAX {
            let value = normalize_axis(&cal, raw);
            assert!(value >= previous, "output dropped at raw {}", raw);
            previous = value;
        }

        let step = (1.0 / cal.slope_high).ceil() as u16 + 1;
        let mut raw = cal.resting_high + step;
        let mut previous = normalize_axis(&cal, raw);
        while raw <= RAW_MAX - step {
            raw += step;
            let value = normalize_axis(&cal, raw);
            assert!(value > previous, "output did not grow at raw {}", raw);
            previous = value;
        }
    }

    #[test]
    fn test_sign_follows_direction() {
        let normalizer = Normalizer::new(wide_band_record()).unwrap();
        let out = normalizer.normalize(RawSample::new(0, RAW_MAX));
        assert!(out.x < 0);
        assert!(out.y > 0);
    }

    #[test]
    fn test_rounding_half_away_from_zero() {
        let cal = AxisCalibration {
            resting_low: 1_000,
            resting_high: 1_000,
            extreme_low: 0,
            extreme_high: 2_000,
            slope_low: 0.5,
            slope_high: 0.5,
        };
        // 0.5 * 1 = 0.5 rounds to 1 in both directions
        assert_eq!(normalize_axis(&cal, 999), -1);
        assert_eq!(normalize_axis(&cal, 1_001), 1);
        // 0.5 * 3 = 1.5 rounds to 2
        assert_eq!(normalize_axis(&cal, 997), -2);
        assert_eq!(normalize_axis(&cal, 1_003), 2);
    }

    #[test]
    fn test_normalizer_rejects_degenerate_record() {
        let mut record = single_point_record();
        record.x.extreme_low = record.x.resting_low;

        match Normalizer::new(record).unwrap_err() {
            JoystickError::CalibrationDegenerate(_) => {}
            other => panic!("Expected CalibrationDegenerate, got: {:?}", other),
        }
    }

    #[test]
    fn test_persisted_record_reproduces_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("joystick_data.toml");

        let original = Normalizer::new(wide_band_record()).unwrap();
        original.record().save(&path).unwrap();
        let reloaded = Normalizer::new(CalibrationRecord::load(&path).unwrap()).unwrap();

        let probes = [
            0, 1, 500, 1_000, 15_000, 30_499, 30_500, 31_000, 32_000, 32_500, 33_000, 33_001,
            48_000, 64_000, 65_000, RAW_MAX,
        ];
        for &x in &probes {
            for &y in &probes {
                let sample = RawSample::new(x, y);
                assert_eq!(original.normalize(sample), reloaded.normalize(sample));
            }
        }
    }
}
