//! # Linux IIO ADC Backend
//!
//! Reads joystick channels from an Industrial I/O device exposed through
//! sysfs (`/sys/bus/iio/devices/iio:deviceN/in_voltageK_raw`).
//!
//! Converters narrower than 16 bits are widened by bit replication so that
//! full scale always maps to [`RAW_MAX`](super::RAW_MAX), the same way microcontroller
//! `read_u16` APIs report 12-bit conversions.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{RawSample, RawSource};
use crate::error::{JoystickError, Result};

/// Default IIO device directory
pub const DEFAULT_IIO_DEVICE: &str = "/sys/bus/iio/devices/iio:device0";

/// Narrowest supported converter resolution in bits
pub const MIN_RESOLUTION_BITS: u8 = 8;

/// Widest supported converter resolution in bits
pub const MAX_RESOLUTION_BITS: u8 = 16;

/// Joystick wired to two channels of an IIO ADC
#[derive(Debug, Clone)]
pub struct IioAdc {
    device: PathBuf,
    x_attr: PathBuf,
    y_attr: PathBuf,
    resolution_bits: u8,
}

impl IioAdc {
    /// Opens two channels of an IIO device.
    ///
    /// # Arguments
    ///
    /// * `device` - IIO device directory (e.g. `/sys/bus/iio/devices/iio:device0`)
    /// * `x_channel` - Channel index wired to the X potentiometer
    /// * `y_channel` - Channel index wired to the Y potentiometer
    /// * `resolution_bits` - Converter resolution (8 to 16)
    ///
    /// # Errors
    ///
    /// Returns `Acquisition` if the resolution is unsupported, or if the device
    /// directory or either channel attribute does not exist.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use joystick_cal::adc::iio::IioAdc;
    ///
    /// let adc = IioAdc::open("/sys/bus/iio/devices/iio:device0", 0, 1, 12)?;
    /// println!("Reading from: {}", adc.device().display());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open<P: AsRef<Path>>(
        device: P,
        x_channel: u8,
        y_channel: u8,
        resolution_bits: u8,
    ) -> Result<Self> {
        let device = device.as_ref().to_path_buf();

        if !(MIN_RESOLUTION_BITS..=MAX_RESOLUTION_BITS).contains(&resolution_bits) {
            return Err(JoystickError::Acquisition(format!(
                "unsupported ADC resolution {} bits (must be {}-{})",
                resolution_bits, MIN_RESOLUTION_BITS, MAX_RESOLUTION_BITS
            )));
        }

        if !device.is_dir() {
            return Err(JoystickError::Acquisition(format!(
                "IIO device not found: {}",
                device.display()
            )));
        }

        let x_attr = channel_attr(&device, x_channel);
        let y_attr = channel_attr(&device, y_channel);

        for attr in [&x_attr, &y_attr] {
            if !attr.is_file() {
                return Err(JoystickError::Acquisition(format!(
                    "IIO channel not found: {}",
                    attr.display()
                )));
            }
        }

        info!(
            "Opened IIO ADC at {} (X: channel {}, Y: channel {}, {} bits)",
            device.display(),
            x_channel,
            y_channel,
            resolution_bits
        );

        Ok(Self {
            device,
            x_attr,
            y_attr,
            resolution_bits,
        })
    }

    /// Returns the IIO device directory.
    pub fn device(&self) -> &Path {
        &self.device
    }

    /// Returns the converter resolution in bits.
    pub fn resolution_bits(&self) -> u8 {
        self.resolution_bits
    }

    fn read_channel(&self, attr: &Path) -> Result<u16> {
        let text = fs::read_to_string(attr).map_err(|e| {
            JoystickError::Acquisition(format!("Failed to read {}: {}", attr.display(), e))
        })?;

        let raw: u32 = text.trim().parse().map_err(|e| {
            JoystickError::Acquisition(format!(
                "Invalid reading {:?} from {}: {}",
                text.trim(),
                attr.display(),
                e
            ))
        })?;

        let max = (1u32 << self.resolution_bits) - 1;
        if raw > max {
            return Err(JoystickError::Acquisition(format!(
                "Reading {} from {} exceeds {}-bit range",
                raw,
                attr.display(),
                self.resolution_bits
            )));
        }

        Ok(widen_to_u16(raw as u16, self.resolution_bits))
    }
}

impl RawSource for IioAdc {
    fn read_raw(&mut self) -> Result<RawSample> {
        let x = self.read_channel(&self.x_attr)?;
        let y = self.read_channel(&self.y_attr)?;
        debug!("IIO raw reading: x={} y={}", x, y);
        Ok(RawSample { x, y })
    }
}

fn channel_attr(device: &Path, channel: u8) -> PathBuf {
    device.join(format!("in_voltage{}_raw", channel))
}

/// Widens a `bits`-wide conversion to the full 16-bit range.
///
/// The reading is shifted to the top of the word and its high bits are
/// replicated into the vacated low bits, so zero stays zero and full scale
/// becomes [`RAW_MAX`](super::RAW_MAX).
///
/// # Examples
///
/// ```
/// use joystick_cal::adc::iio::widen_to_u16;
///
/// assert_eq!(widen_to_u16(0, 12), 0);
/// assert_eq!(widen_to_u16(4095, 12), 65535);
/// assert_eq!(widen_to_u16(255, 8), 65535);
/// ```
#[must_use]
pub fn widen_to_u16(raw: u16, bits: u8) -> u16 {
    if bits >= MAX_RESOLUTION_BITS {
        return raw;
    }
    let shift = MAX_RESOLUTION_BITS - bits;
    (raw << shift) | (raw >> bits.saturating_sub(shift))
}
