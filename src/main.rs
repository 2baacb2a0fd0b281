//! # Joystick Calibration
//!
//! Calibrate a 2-axis analog joystick and watch its normalized output.
//!
//! ## Commands
//!
//! - `calibrate`: walk through the resting and extreme phases, derive the
//!   slopes and write the calibration record
//! - `monitor`: load the record and print the normalized position every tick
//!
//! # Examples
//!
//! ```bash
//! joystick-cal --config joystick.toml calibrate
//! joystick-cal --config joystick.toml monitor
//! ```
//!
//! Expected monitor output:
//! ```text
//! X:    0  Y:    0
//! X:  -37  Y:    0
//! X: -100  Y:   12
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use joystick_cal::adc::iio::IioAdc;
use joystick_cal::adc::Joystick;
use joystick_cal::calibration::abort::abort_pair;
use joystick_cal::calibration::normalize::Normalizer;
use joystick_cal::calibration::procedure::{CalibrationOutcome, Calibrator, TerminalOperator};
use joystick_cal::calibration::record::CalibrationRecord;
use joystick_cal::calibration::sampler::Sampler;
use joystick_cal::config::Config;
use joystick_cal::telemetry::SampleLogger;

/// Number of monitor readings between status log messages
const LOG_INTERVAL_READINGS: u64 = 600;

#[derive(Debug, Parser)]
#[command(name = "joystick-cal", version, about = "Calibrate and monitor a 2-axis analog joystick")]
struct Args {
    /// Path to configuration file (defaults are used when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, overridden by RUST_LOG
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output file for the logs (stderr when omitted)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the interactive calibration and write the calibration record
    Calibrate {
        /// Where to write the record (overrides record.path)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print normalized readings until Ctrl+C
    Monitor {
        /// Record to load (overrides record.path)
        #[arg(long)]
        record: Option<PathBuf>,
    },
}

fn init_tracing(log_level: &str, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(log_level))?;

    match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .with_context(|| format!("Invalid log file path: {}", path.display()))?;

            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            Ok(None)
        }
    }
}

fn open_joystick(config: &Config) -> Result<Joystick<IioAdc>> {
    let adc = IioAdc::open(
        &config.adc.device,
        config.adc.x_channel,
        config.adc.y_channel,
        config.adc.resolution_bits,
    )?;
    Ok(Joystick::new(adc, config.orientation()))
}

async fn calibrate(config: &Config, output: Option<PathBuf>) -> Result<()> {
    let path = output.unwrap_or_else(|| config.record.path.clone());
    let joystick = open_joystick(config)?;

    let (handle, signal) = abort_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, aborting calibration...");
            handle.abort();
        }
    });

    let sampler = Sampler::new(joystick, config.sampling_plan(), signal.clone());
    let mut calibrator = Calibrator::new(sampler, config.sampling.resting_method);
    let mut operator = TerminalOperator::spawn(signal);

    match calibrator.run(&mut operator).await? {
        CalibrationOutcome::Completed(record) => {
            record
                .save(&path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Calibration written to {}", path.display());
        }
        CalibrationOutcome::Aborted => {
            println!("Calibration aborted, nothing was written");
        }
    }

    Ok(())
}

async fn monitor(config: &Config, record_path: Option<PathBuf>) -> Result<()> {
    let path = record_path.unwrap_or_else(|| config.record.path.clone());
    let record = CalibrationRecord::load(&path)
        .with_context(|| format!("Run `joystick-cal calibrate` to create {}", path.display()))?;
    let normalizer = Normalizer::new(record)?;
    let mut joystick = open_joystick(config)?;

    let mut logger = if config.telemetry.enabled {
        Some(SampleLogger::new(
            &config.telemetry.log_dir,
            config.telemetry.max_records_per_file,
            config.telemetry.max_files_to_keep,
        )?)
    } else {
        None
    };

    let mut ticker = interval(config.monitor_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("Monitoring every {}ms, press Ctrl+C to exit", config.monitor.interval_ms);

    let mut readings: u64 = 0;
    let mut skipped: u64 = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let raw = match joystick.read() {
                    Ok(raw) => raw,
                    Err(e) => {
                        skipped += 1;
                        warn!("Skipping reading: {}", e);
                        continue;
                    }
                };

                let out = normalizer.normalize(raw);
                println!("X: {:4}  Y: {:4}", out.x, out.y);

                if let Some(logger) = logger.as_mut() {
                    if let Err(e) = logger.log(raw, out) {
                        warn!("Failed to log sample: {}", e);
                    }
                }

                readings += 1;
                if readings % LOG_INTERVAL_READINGS == 0 {
                    info!("{} readings ({} skipped)", readings, skipped);
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    if let Some(logger) = logger.as_mut() {
        logger.flush()?;
    }
    info!("Total readings: {} ({} skipped)", readings, skipped);
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _guard = init_tracing(&args.log_level, args.log_file.as_deref())?;

    info!("joystick-cal v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::default(),
    };

    match args.command {
        Command::Calibrate { output } => calibrate(&config, output).await,
        Command::Monitor { record } => monitor(&config, record).await,
    }
}
