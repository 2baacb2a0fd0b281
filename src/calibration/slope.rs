//! # Slope Derivation
//!
//! Converts the resting band and the extremes of travel into the two slopes of
//! each axis:
//!
//! ```text
//! slope_low  = (OUTPUT_MAX - OUTPUT_MIN) / (resting_low  - extreme_low)
//! slope_high = (OUTPUT_MAX - OUTPUT_MIN) / (extreme_high - resting_high)
//! ```
//!
//! Both denominators are distances, so both slopes come out positive. A
//! denominator that would be zero or negative is reported as
//! `CalibrationDegenerate` before any division happens.

use tracing::debug;

use super::record::{AxisBands, AxisCalibration, Band, CalibrationRecord, OUTPUT_MAX, OUTPUT_MIN};
use crate::adc::Axis;
use crate::error::{JoystickError, Result};

/// Derives the calibration constants for one axis.
///
/// # Arguments
///
/// * `axis` - Axis being derived (used in error messages)
/// * `resting` - Resting band of the axis
/// * `travel` - Extremes of travel (`low` = minimum, `high` = maximum)
///
/// # Errors
///
/// Returns `CalibrationDegenerate` if the resting band is inverted or if an
/// extreme does not lie strictly outside the resting band.
///
/// # Examples
///
/// ```
/// use joystick_cal::adc::Axis;
/// use joystick_cal::calibration::record::Band;
/// use joystick_cal::calibration::slope::derive_axis;
///
/// let cal = derive_axis(Axis::X, Band::new(30_000, 30_000), Band::new(10_000, 50_000))?;
/// assert!((cal.slope_low - 0.005).abs() < 1e-12);
/// assert!((cal.slope_high - 0.005).abs() < 1e-12);
/// # Ok::<(), joystick_cal::error::JoystickError>(())
/// ```
pub fn derive_axis(axis: Axis, resting: Band, travel: Band) -> Result<AxisCalibration> {
    if resting.low > resting.high {
        return Err(JoystickError::CalibrationDegenerate(format!(
            "{} axis resting band is inverted ({} > {})",
            axis, resting.low, resting.high
        )));
    }

    if travel.low >= resting.low {
        return Err(JoystickError::CalibrationDegenerate(format!(
            "{} axis low extreme {} never left the resting band (low edge {})",
            axis, travel.low, resting.low
        )));
    }

    if travel.high <= resting.high {
        return Err(JoystickError::CalibrationDegenerate(format!(
            "{} axis high extreme {} never left the resting band (high edge {})",
            axis, travel.high, resting.high
        )));
    }

    let span = OUTPUT_MAX - OUTPUT_MIN;
    let slope_low = span / f64::from(resting.low - travel.low);
    let slope_high = span / f64::from(travel.high - resting.high);

    debug!(
        "{} axis slopes: low {:.8} high {:.8}",
        axis, slope_low, slope_high
    );

    Ok(AxisCalibration {
        resting_low: resting.low,
        resting_high: resting.high,
        extreme_low: travel.low,
        extreme_high: travel.high,
        slope_low,
        slope_high,
    })
}

/// Derives a complete calibration record from both axes' measurements.
///
/// # Errors
///
/// Returns `CalibrationDegenerate` for the first axis that fails
/// [`derive_axis`]; no record is produced in that case.
pub fn derive_record(resting: AxisBands, travel: AxisBands) -> Result<CalibrationRecord> {
    let x = derive_axis(Axis::X, resting.x, travel.x)?;
    let y = derive_axis(Axis::Y, resting.y, travel.y)?;
    Ok(CalibrationRecord::new(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symmetric_slopes() {
        let cal = derive_axis(Axis::X, Band::new(30_000, 30_000), Band::new(10_000, 50_000)).unwrap();
        assert!((cal.slope_low - 0.005).abs() < 1e-12);
        assert!((cal.slope_high - 0.005).abs() < 1e-12);
        assert_eq!(cal.resting_low, 30_000);
        assert_eq!(cal.extreme_high, 50_000);
    }

    #[test]
    fn test_asymmetric_slopes() {
        let cal = derive_axis(Axis::Y, Band::new(30_000, 32_000), Band::new(5_000, 62_000)).unwrap();
        assert!((cal.slope_low - 100.0 / 25_000.0).abs() < 1e-12);
        assert!((cal.slope_high - 100.0 / 30_000.0).abs() < 1e-12);
    }

    #[test]
    fn test_slopes_are_positive() {
        let cal = derive_axis(Axis::X, Band::new(100, 200), Band::new(0, 65_535)).unwrap();
        assert!(cal.slope_low > 0.0);
        assert!(cal.slope_high > 0.0);
        assert!(cal.validate(Axis::X).is_ok());
    }

    #[test]
    fn test_low_extreme_at_resting_low_is_degenerate() {
        let result = derive_axis(Axis::X, Band::new(30_000, 31_000), Band::new(30_000, 50_000));
        match result.unwrap_err() {
            JoystickError::CalibrationDegenerate(msg) => {
                assert!(msg.contains("X axis low extreme"));
            }
            other => panic!("Expected CalibrationDegenerate, got: {:?}", other),
        }
    }

    #[test]
    fn test_low_extreme_above_resting_low_is_degenerate() {
        let result = derive_axis(Axis::Y, Band::new(30_000, 31_000), Band::new(30_500, 50_000));
        assert!(matches!(result, Err(JoystickError::CalibrationDegenerate(_))));
    }

    #[test]
    fn test_high_extreme_at_resting_high_is_degenerate() {
        let result = derive_axis(Axis::Y, Band::new(30_000, 31_000), Band::new(10_000, 31_000));
        match result.unwrap_err() {
            JoystickError::CalibrationDegenerate(msg) => {
                assert!(msg.contains("Y axis high extreme"));
            }
            other => panic!("Expected CalibrationDegenerate, got: {:?}", other),
        }
    }

    #[test]
    fn test_inverted_resting_band_is_degenerate() {
        let result = derive_axis(Axis::X, Band::new(31_000, 30_000), Band::new(10_000, 50_000));
        assert!(matches!(result, Err(JoystickError::CalibrationDegenerate(_))));
    }

    #[test]
    fn test_derive_record_stops_at_first_degenerate_axis() {
        let resting = AxisBands {
            x: Band::new(30_000, 30_000),
            y: Band::new(30_000, 30_000),
        };
        let travel = AxisBands {
            x: Band::new(10_000, 50_000),
            y: Band::new(30_000, 50_000),
        };

        match derive_record(resting, travel).unwrap_err() {
            JoystickError::CalibrationDegenerate(msg) => assert!(msg.starts_with("Y axis")),
            other => panic!("Expected CalibrationDegenerate, got: {:?}", other),
        }
    }

    #[test]
    fn test_derive_record_is_valid() {
        let resting = AxisBands {
            x: Band::new(32_000, 33_000),
            y: Band::new(31_000, 31_500),
        };
        let travel = AxisBands {
            x: Band::new(300, 65_200),
            y: Band::new(100, 65_535),
        };

        let record = derive_record(resting, travel).unwrap();
        assert!(record.validate().is_ok());
        assert!(record.calibrated_at.is_some());
    }
}
