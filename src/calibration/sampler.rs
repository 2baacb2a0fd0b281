//! # Calibration Sampler
//!
//! Fixed-length sampling windows over the joystick, with a fixed delay between
//! samples:
//!
//! - [`Sampler::resting_average`]: resting band by averaging boundary
//!   extensions (the estimator calibration uses by default)
//! - [`Sampler::resting_extent`]: resting band as the true min/max over a
//!   longer window, plus the overall range across both axes
//! - [`Sampler::capture_extreme`]: the single farthest reading on one axis in
//!   one direction
//!
//! ## Averaging Boundary Extensions
//!
//! For each axis the low and high boundaries are tracked separately. The first
//! sample counts toward both. After that a sample is added to the low sum only
//! when it is strictly below the current low boundary (and becomes the new
//! boundary), and likewise for the high side. Each edge of the band is the
//! rounded mean of its sum. Jitter widens the band, but a single outlier is
//! averaged against the earlier extensions instead of defining the edge on
//! its own the way a plain min/max would.
//!
//! The accumulators ([`RestingAverage`], [`ExtremeTracker`], [`RangeTracker`])
//! are plain synchronous types; the sampler only adds timing and abort checks.

use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::abort::AbortSignal;
use super::record::{AxisBands, Band};
use crate::adc::{Axis, Joystick, RawSample, RawSource, RAW_MAX};
use crate::error::{JoystickError, Result};

/// Default delay between samples
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(10);

/// Default sample count for [`Sampler::resting_average`]
pub const DEFAULT_RESTING_SAMPLES: usize = 50;

/// Default sample count for [`Sampler::resting_extent`]
pub const DEFAULT_RESTING_WINDOW_SAMPLES: usize = 200;

/// Default sample count for [`Sampler::capture_extreme`]
pub const DEFAULT_EXTREME_SAMPLES: usize = 100;

/// Direction of travel an extreme is captured in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Seek the lowest reading
    Min,
    /// Seek the highest reading
    Max,
}

/// How the resting band is measured during calibration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestingMethod {
    /// Average of boundary extensions over `resting_samples`
    #[default]
    Average,
    /// True min/max over `resting_window_samples`
    Extent,
}

/// Window sizes and pacing for each sampling operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingPlan {
    pub interval: Duration,
    pub resting_samples: usize,
    pub resting_window_samples: usize,
    pub extreme_samples: usize,
}

impl Default for SamplingPlan {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SAMPLE_INTERVAL,
            resting_samples: DEFAULT_RESTING_SAMPLES,
            resting_window_samples: DEFAULT_RESTING_WINDOW_SAMPLES,
            extreme_samples: DEFAULT_EXTREME_SAMPLES,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Extension {
    edge: u16,
    sum: u64,
    count: u64,
}

impl Extension {
    fn first(raw: u16) -> Self {
        Self {
            edge: raw,
            sum: u64::from(raw),
            count: 1,
        }
    }

    fn extend(&mut self, raw: u16) {
        self.edge = raw;
        self.sum += u64::from(raw);
        self.count += 1;
    }

    /// Rounded mean, halves rounding up.
    fn mean(&self) -> u16 {
        ((self.sum + self.count / 2) / self.count) as u16
    }
}

/// Resting band accumulator for one axis (average of boundary extensions).
///
/// # Examples
///
/// ```
/// use joystick_cal::calibration::sampler::RestingAverage;
///
/// let mut avg = RestingAverage::new();
/// for raw in [100, 98, 102, 97, 101] {
///     avg.push(raw);
/// }
/// let band = avg.band().unwrap();
/// // low extensions: 100, 98, 97 -> 98; high extensions: 100, 102 -> 101
/// assert_eq!((band.low, band.high), (98, 101));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RestingAverage {
    low: Option<Extension>,
    high: Option<Extension>,
}

impl RestingAverage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one reading.
    pub fn push(&mut self, raw: u16) {
        match &mut self.low {
            None => self.low = Some(Extension::first(raw)),
            Some(low) if raw < low.edge => low.extend(raw),
            Some(_) => {}
        }
        match &mut self.high {
            None => self.high = Some(Extension::first(raw)),
            Some(high) if raw > high.edge => high.extend(raw),
            Some(_) => {}
        }
    }

    /// Returns the averaged band, or `None` before the first reading.
    #[must_use]
    pub fn band(&self) -> Option<Band> {
        match (self.low, self.high) {
            (Some(low), Some(high)) => Some(Band::new(low.mean(), high.mean())),
            _ => None,
        }
    }
}

/// True extremum over a stream of readings.
#[derive(Debug, Clone, Copy)]
pub struct ExtremeTracker {
    direction: Direction,
    best: u32,
}

impl ExtremeTracker {
    /// Starts above any raw value when seeking a minimum, at 0 for a maximum.
    #[must_use]
    pub fn new(direction: Direction) -> Self {
        let best = match direction {
            Direction::Min => u32::from(RAW_MAX) + 1,
            Direction::Max => 0,
        };
        Self { direction, best }
    }

    /// Feeds one reading.
    pub fn push(&mut self, raw: u16) {
        let raw = u32::from(raw);
        let better = match self.direction {
            Direction::Min => raw < self.best,
            Direction::Max => raw > self.best,
        };
        if better {
            self.best = raw;
        }
    }

    /// Returns the extremum seen so far.
    ///
    /// A minimum is `None` until the first reading. A maximum starts at 0.
    #[must_use]
    pub fn value(&self) -> Option<u16> {
        u16::try_from(self.best).ok()
    }
}

/// True min/max over a stream of readings.
#[derive(Debug, Clone, Copy)]
pub struct RangeTracker {
    min: ExtremeTracker,
    max: ExtremeTracker,
}

impl Default for RangeTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RangeTracker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            min: ExtremeTracker::new(Direction::Min),
            max: ExtremeTracker::new(Direction::Max),
        }
    }

    /// Feeds one reading.
    pub fn push(&mut self, raw: u16) {
        self.min.push(raw);
        self.max.push(raw);
    }

    /// Returns `[min, max]`, or `None` before the first reading.
    #[must_use]
    pub fn band(&self) -> Option<Band> {
        Some(Band::new(self.min.value()?, self.max.value()?))
    }
}

/// Result of [`Sampler::resting_extent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestingExtent {
    /// True min/max per axis
    pub bands: AxisBands,
    /// True min/max across both axes
    pub overall: Band,
}

/// Runs sampling windows over a joystick.
#[derive(Debug)]
pub struct Sampler<S> {
    joystick: Joystick<S>,
    plan: SamplingPlan,
    abort: AbortSignal,
}

impl<S: RawSource> Sampler<S> {
    pub fn new(joystick: Joystick<S>, plan: SamplingPlan, abort: AbortSignal) -> Self {
        Self {
            joystick,
            plan,
            abort,
        }
    }

    /// Returns the sampling plan.
    pub fn plan(&self) -> &SamplingPlan {
        &self.plan
    }

    /// Releases the joystick.
    pub fn into_joystick(self) -> Joystick<S> {
        self.joystick
    }

    /// Measures the resting band by averaging boundary extensions.
    ///
    /// Takes `resting_samples` readings.
    ///
    /// # Errors
    ///
    /// `OperatorAbort` if aborted mid-window, `Acquisition` on a failed read.
    pub async fn resting_average(&mut self) -> Result<AxisBands> {
        let mut x = RestingAverage::new();
        let mut y = RestingAverage::new();

        self.sample_window(self.plan.resting_samples, |sample| {
            x.push(sample.x);
            y.push(sample.y);
        })
        .await?;

        let bands = AxisBands {
            x: x.band().ok_or_else(empty_window)?,
            y: y.band().ok_or_else(empty_window)?,
        };
        debug!("Resting average: {:?}", bands);
        Ok(bands)
    }

    /// Measures the resting band as the true min/max per axis.
    ///
    /// Takes `resting_window_samples` readings and also reports the overall
    /// range across both axes.
    ///
    /// # Errors
    ///
    /// `OperatorAbort` if aborted mid-window, `Acquisition` on a failed read.
    pub async fn resting_extent(&mut self) -> Result<RestingExtent> {
        let mut x = RangeTracker::new();
        let mut y = RangeTracker::new();
        let mut overall = RangeTracker::new();

        self.sample_window(self.plan.resting_window_samples, |sample| {
            x.push(sample.x);
            y.push(sample.y);
            overall.push(sample.x);
            overall.push(sample.y);
        })
        .await?;

        let extent = RestingExtent {
            bands: AxisBands {
                x: x.band().ok_or_else(empty_window)?,
                y: y.band().ok_or_else(empty_window)?,
            },
            overall: overall.band().ok_or_else(empty_window)?,
        };
        debug!("Resting extent: {:?}", extent);
        Ok(extent)
    }

    /// Captures the farthest reading on one axis in one direction.
    ///
    /// Takes `extreme_samples` readings and returns the true extremum,
    /// unaveraged.
    ///
    /// # Errors
    ///
    /// `OperatorAbort` if aborted mid-window, `Acquisition` on a failed read.
    pub async fn capture_extreme(&mut self, axis: Axis, direction: Direction) -> Result<u16> {
        let mut tracker = ExtremeTracker::new(direction);

        self.sample_window(self.plan.extreme_samples, |sample| {
            tracker.push(sample.axis(axis));
        })
        .await?;

        let value = tracker.value().ok_or_else(empty_window)?;
        debug!("{} axis {:?} extreme: {}", axis, direction, value);
        Ok(value)
    }

    async fn sample_window<F>(&mut self, count: usize, mut consume: F) -> Result<()>
    where
        F: FnMut(RawSample),
    {
        for _ in 0..count {
            self.abort.check()?;
            let sample = self.joystick.read()?;
            consume(sample);
            self.pause().await?;
        }
        Ok(())
    }

    async fn pause(&mut self) -> Result<()> {
        if self.plan.interval.is_zero() {
            return Ok(());
        }
        tokio::select! {
            _ = tokio::time::sleep(self.plan.interval) => Ok(()),
            _ = self.abort.aborted() => Err(JoystickError::OperatorAbort),
        }
    }
}

fn empty_window() -> JoystickError {
    JoystickError::Acquisition("sampling window took no readings".to_string())
}
