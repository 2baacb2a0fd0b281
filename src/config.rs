//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and every field is optional; anything left out takes the
//! default shown below.
//!
//! ```toml
//! [adc]
//! device = "/sys/bus/iio/devices/iio:device0"
//! x_channel = 0
//! y_channel = 1
//! resolution_bits = 12
//! invert_x = true
//! invert_y = false
//!
//! [sampling]
//! interval_ms = 10
//! resting_samples = 50
//! resting_window_samples = 200
//! extreme_samples = 100
//! resting_method = "average"
//!
//! [record]
//! path = "joystick_data.toml"
//!
//! [monitor]
//! interval_ms = 100
//!
//! [telemetry]
//! enabled = false
//! log_dir = "./logs"
//! max_records_per_file = 10000
//! max_files_to_keep = 10
//! ```

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::adc::iio::{DEFAULT_IIO_DEVICE, MAX_RESOLUTION_BITS, MIN_RESOLUTION_BITS};
use crate::adc::Orientation;
use crate::calibration::sampler::{
    RestingMethod, SamplingPlan, DEFAULT_EXTREME_SAMPLES, DEFAULT_RESTING_SAMPLES,
    DEFAULT_RESTING_WINDOW_SAMPLES,
};
use crate::error::{JoystickError, Result};

/// Largest accepted sample count for any sampling window
const MAX_WINDOW_SAMPLES: usize = 10_000;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub adc: AdcConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub record: RecordConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// ADC wiring configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AdcConfig {
    #[serde(default = "default_adc_device")]
    pub device: PathBuf,

    #[serde(default = "default_x_channel")]
    pub x_channel: u8,

    #[serde(default = "default_y_channel")]
    pub y_channel: u8,

    #[serde(default = "default_resolution_bits")]
    pub resolution_bits: u8,

    #[serde(default = "default_invert_x")]
    pub invert_x: bool,

    #[serde(default)]
    pub invert_y: bool,
}

/// Calibration sampling configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SamplingConfig {
    #[serde(default = "default_sample_interval_ms")]
    pub interval_ms: u64,

    #[serde(default = "default_resting_samples")]
    pub resting_samples: usize,

    #[serde(default = "default_resting_window_samples")]
    pub resting_window_samples: usize,

    #[serde(default = "default_extreme_samples")]
    pub extreme_samples: usize,

    #[serde(default)]
    pub resting_method: RestingMethod,
}

/// Calibration record location
#[derive(Debug, Deserialize, Clone)]
pub struct RecordConfig {
    #[serde(default = "default_record_path")]
    pub path: PathBuf,
}

/// Runtime monitor configuration
#[derive(Debug, Deserialize, Clone)]
pub struct MonitorConfig {
    #[serde(default = "default_monitor_interval_ms")]
    pub interval_ms: u64,
}

/// Telemetry configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,
}

// Default value functions
fn default_adc_device() -> PathBuf { PathBuf::from(DEFAULT_IIO_DEVICE) }
fn default_x_channel() -> u8 { 0 }
fn default_y_channel() -> u8 { 1 }
fn default_resolution_bits() -> u8 { 12 }
fn default_invert_x() -> bool { true }

fn default_sample_interval_ms() -> u64 { 10 }
fn default_resting_samples() -> usize { DEFAULT_RESTING_SAMPLES }
fn default_resting_window_samples() -> usize { DEFAULT_RESTING_WINDOW_SAMPLES }
fn default_extreme_samples() -> usize { DEFAULT_EXTREME_SAMPLES }

fn default_record_path() -> PathBuf { PathBuf::from("joystick_data.toml") }

fn default_monitor_interval_ms() -> u64 { 100 }

fn default_log_dir() -> PathBuf { PathBuf::from("./logs") }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }

impl Default for AdcConfig {
    fn default() -> Self {
        Self {
            device: default_adc_device(),
            x_channel: default_x_channel(),
            y_channel: default_y_channel(),
            resolution_bits: default_resolution_bits(),
            invert_x: default_invert_x(),
            invert_y: false,
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_sample_interval_ms(),
            resting_samples: default_resting_samples(),
            resting_window_samples: default_resting_window_samples(),
            extreme_samples: default_extreme_samples(),
            resting_method: RestingMethod::default(),
        }
    }
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            path: default_record_path(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_monitor_interval_ms(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_dir: default_log_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
        }
    }
}

fn invalid(msg: impl std::fmt::Display) -> JoystickError {
    JoystickError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use joystick_cal::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Builds the calibration sampling plan.
    #[must_use]
    pub fn sampling_plan(&self) -> SamplingPlan {
        SamplingPlan {
            interval: Duration::from_millis(self.sampling.interval_ms),
            resting_samples: self.sampling.resting_samples,
            resting_window_samples: self.sampling.resting_window_samples,
            extreme_samples: self.sampling.extreme_samples,
        }
    }

    /// Builds the joystick orientation.
    #[must_use]
    pub fn orientation(&self) -> Orientation {
        Orientation {
            invert_x: self.adc.invert_x,
            invert_y: self.adc.invert_y,
        }
    }

    /// Returns the monitor tick period.
    #[must_use]
    pub fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.monitor.interval_ms)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        // Validate ADC wiring
        if self.adc.device.as_os_str().is_empty() {
            return Err(invalid("adc device cannot be empty"));
        }

        if self.adc.x_channel == self.adc.y_channel {
            return Err(invalid("x_channel and y_channel must be different"));
        }

        if !(MIN_RESOLUTION_BITS..=MAX_RESOLUTION_BITS).contains(&self.adc.resolution_bits) {
            return Err(invalid(format!(
                "resolution_bits must be between {} and {}",
                MIN_RESOLUTION_BITS, MAX_RESOLUTION_BITS
            )));
        }

        // Validate sampling windows
        for (name, value) in [
            ("resting_samples", self.sampling.resting_samples),
            ("resting_window_samples", self.sampling.resting_window_samples),
            ("extreme_samples", self.sampling.extreme_samples),
        ] {
            if value == 0 || value > MAX_WINDOW_SAMPLES {
                return Err(invalid(format!(
                    "{} must be between 1 and {}",
                    name, MAX_WINDOW_SAMPLES
                )));
            }
        }

        // Validate timing fields
        if self.sampling.interval_ms > 1000 {
            return Err(invalid("sampling interval_ms must be between 0 and 1000"));
        }

        if self.monitor.interval_ms == 0 || self.monitor.interval_ms > 60000 {
            return Err(invalid("monitor interval_ms must be between 1 and 60000"));
        }

        // Validate record location
        if self.record.path.as_os_str().is_empty() {
            return Err(invalid("record path cannot be empty"));
        }

        // Validate telemetry configuration
        if self.telemetry.enabled && self.telemetry.log_dir.as_os_str().is_empty() {
            return Err(invalid("telemetry log_dir cannot be empty when enabled"));
        }

        if self.telemetry.max_records_per_file == 0 {
            return Err(invalid("max_records_per_file must be greater than 0"));
        }

        if self.telemetry.max_files_to_keep == 0 {
            return Err(invalid("max_files_to_keep must be greater than 0"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(contents.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    fn assert_invalid(config: &Config, needle: &str) {
        match config.validate() {
            Err(JoystickError::Config(e)) => {
                assert!(e.to_string().contains(needle), "unexpected message: {}", e)
            }
            other => panic!("Expected Config error containing {:?}, got: {:?}", needle, other),
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());

        assert_eq!(config.adc.device, PathBuf::from(DEFAULT_IIO_DEVICE));
        assert!(config.adc.invert_x);
        assert!(!config.adc.invert_y);
        assert_eq!(config.sampling.resting_method, RestingMethod::Average);
        assert_eq!(config.record.path, PathBuf::from("joystick_data.toml"));
        assert!(!config.telemetry.enabled);
    }

    #[test]
    fn test_default_sampling_plan() {
        let plan = Config::default().sampling_plan();
        assert_eq!(plan, SamplingPlan::default());
        assert_eq!(plan.interval, Duration::from_millis(10));
        assert_eq!(plan.resting_samples, 50);
        assert_eq!(plan.resting_window_samples, 200);
        assert_eq!(plan.extreme_samples, 100);
    }

    #[test]
    fn test_default_monitor_interval() {
        assert_eq!(Config::default().monitor_interval(), Duration::from_millis(100));
    }

    #[test]
    fn test_load_empty_file_uses_defaults() {
        let temp_file = write_config("");
        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.sampling_plan(), SamplingPlan::default());
        assert_eq!(config.orientation(), Orientation::default());
    }

    #[test]
    fn test_load_config_from_file() {
        let toml_content = r#"
[adc]
device = "/sys/bus/iio/devices/iio:device1"
x_channel = 2
y_channel = 3
resolution_bits = 16
invert_x = false
invert_y = true

[sampling]
interval_ms = 5
resting_samples = 80
resting_method = "extent"

[record]
path = "/var/lib/joystick/cal.toml"

[telemetry]
enabled = true
log_dir = "/tmp/joystick-logs"
"#;

        let temp_file = write_config(toml_content);
        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.adc.x_channel, 2);
        assert_eq!(config.adc.resolution_bits, 16);
        assert_eq!(
            config.orientation(),
            Orientation {
                invert_x: false,
                invert_y: true
            }
        );
        assert_eq!(config.sampling.resting_method, RestingMethod::Extent);
        assert_eq!(config.sampling_plan().resting_samples, 80);
        assert_eq!(config.sampling_plan().extreme_samples, 100);
        assert_eq!(config.sampling_plan().interval, Duration::from_millis(5));
        assert_eq!(config.record.path, PathBuf::from("/var/lib/joystick/cal.toml"));
        assert!(config.telemetry.enabled);
        assert_eq!(config.monitor.interval_ms, 100);
    }

    #[test]
    fn test_unknown_resting_method_is_parse_error() {
        let temp_file = write_config("[sampling]\nresting_method = \"median\"\n");
        assert!(matches!(
            Config::load(temp_file.path()),
            Err(JoystickError::Config(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            Config::load("/nonexistent/joystick.toml"),
            Err(JoystickError::Io(_))
        ));
    }

    #[test]
    fn test_same_channel_for_both_axes() {
        let mut config = Config::default();
        config.adc.y_channel = config.adc.x_channel;
        assert_invalid(&config, "must be different");
    }

    #[test]
    fn test_invalid_resolution() {
        let mut config = Config::default();
        config.adc.resolution_bits = 6;
        assert_invalid(&config, "resolution_bits");

        config.adc.resolution_bits = 24;
        assert_invalid(&config, "resolution_bits");
    }

    #[test]
    fn test_zero_sample_window() {
        let mut config = Config::default();
        config.sampling.extreme_samples = 0;
        assert_invalid(&config, "extreme_samples");
    }

    #[test]
    fn test_oversized_sample_window() {
        let mut config = Config::default();
        config.sampling.resting_window_samples = MAX_WINDOW_SAMPLES + 1;
        assert_invalid(&config, "resting_window_samples");
    }

    #[test]
    fn test_zero_sampling_interval_is_allowed() {
        let mut config = Config::default();
        config.sampling.interval_ms = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_intervals() {
        let mut config = Config::default();
        config.sampling.interval_ms = 5000;
        assert_invalid(&config, "sampling interval_ms");

        let mut config = Config::default();
        config.monitor.interval_ms = 0;
        assert_invalid(&config, "monitor interval_ms");
    }

    #[test]
    fn test_empty_record_path() {
        let mut config = Config::default();
        config.record.path = PathBuf::new();
        assert_invalid(&config, "record path");
    }

    #[test]
    fn test_telemetry_limits() {
        let mut config = Config::default();
        config.telemetry.enabled = true;
        config.telemetry.log_dir = PathBuf::new();
        assert_invalid(&config, "log_dir");

        let mut config = Config::default();
        config.telemetry.max_records_per_file = 0;
        assert_invalid(&config, "max_records_per_file");

        let mut config = Config::default();
        config.telemetry.max_files_to_keep = 0;
        assert_invalid(&config, "max_files_to_keep");
    }

    #[test]
    fn test_invalid_config_file_rejected_on_load() {
        let temp_file = write_config("[adc]\nx_channel = 1\ny_channel = 1\n");
        assert!(Config::load(temp_file.path()).is_err());
    }
}
