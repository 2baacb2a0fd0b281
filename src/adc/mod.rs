//! # Raw Acquisition Module
//!
//! Reads the two joystick potentiometers through an analog-to-digital
//! converter and corrects for the mounting orientation of the stick.
//!
//! This module handles:
//! - The [`RawSource`] contract every ADC backend implements
//! - Orientation correction ([`Joystick`]) shared by calibration and runtime
//! - A Linux IIO sysfs backend ([`iio::IioAdc`])
//!
//! ## Orientation
//!
//! The stick on the reference board is mounted horizontally reversed: full
//! left produces the highest X reading. [`Orientation`] flips an axis with
//! `RAW_MAX - raw` right after acquisition so that "left" and "down" are
//! always the low raw values.

pub mod iio;

use std::fmt;

use crate::error::Result;

/// Highest raw value produced by a 16-bit reading
pub const RAW_MAX: u16 = u16::MAX;

/// Joystick axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Horizontal axis (left/right)
    X,
    /// Vertical axis (down/up)
    Y,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::X => write!(f, "X"),
            Axis::Y => write!(f, "Y"),
        }
    }
}

/// One reading of both axes, each in `0..=RAW_MAX`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawSample {
    pub x: u16,
    pub y: u16,
}

impl RawSample {
    /// Creates a sample from an X/Y pair.
    #[must_use]
    pub fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    /// Returns the reading for one axis.
    #[must_use]
    pub fn axis(&self, axis: Axis) -> u16 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
        }
    }
}

/// Source of raw joystick readings.
///
/// Implementations return the current hardware state without any orientation
/// correction applied. A reading that cannot be taken is reported as
/// [`JoystickError::Acquisition`](crate::error::JoystickError::Acquisition)
/// and is never retried here.
#[cfg_attr(test, mockall::automock)]
pub trait RawSource {
    /// Reads both axes once.
    fn read_raw(&mut self) -> Result<RawSample>;
}

/// Per-axis inversion applied immediately after acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Orientation {
    pub invert_x: bool,
    pub invert_y: bool,
}

impl Default for Orientation {
    fn default() -> Self {
        Self {
            invert_x: true,
            invert_y: false,
        }
    }
}

impl Orientation {
    /// No inversion on either axis.
    #[must_use]
    pub fn identity() -> Self {
        Self {
            invert_x: false,
            invert_y: false,
        }
    }

    /// Applies the orientation correction to a hardware reading.
    ///
    /// # Examples
    ///
    /// ```
    /// use joystick_cal::adc::{Orientation, RawSample};
    ///
    /// let corrected = Orientation::default().apply(RawSample::new(65535, 1200));
    /// assert_eq!(corrected, RawSample::new(0, 1200));
    /// ```
    #[must_use]
    pub fn apply(&self, sample: RawSample) -> RawSample {
        RawSample {
            x: if self.invert_x { RAW_MAX - sample.x } else { sample.x },
            y: if self.invert_y { RAW_MAX - sample.y } else { sample.y },
        }
    }
}

/// A joystick: a raw source plus its mounting orientation.
///
/// Both the calibration sampler and the runtime monitor read through this
/// type, so the orientation correction is identical in both paths.
#[derive(Debug)]
pub struct Joystick<S> {
    source: S,
    orientation: Orientation,
}

impl<S: RawSource> Joystick<S> {
    /// Wraps a raw source with an orientation.
    pub fn new(source: S, orientation: Orientation) -> Self {
        Self {
            source,
            orientation,
        }
    }

    /// Reads both axes with the orientation correction applied.
    ///
    /// # Errors
    ///
    /// Propagates acquisition faults from the underlying source.
    pub fn read(&mut self) -> Result<RawSample> {
        let raw = self.source.read_raw()?;
        Ok(self.orientation.apply(raw))
    }

    /// Returns the configured orientation.
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Gives mutable access to the underlying source.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }
}
