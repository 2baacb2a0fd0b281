//! # Telemetry Module
//!
//! Logs monitor samples to JSONL files with rotation.
//!
//! This module handles:
//! - Formatting each (raw, normalized) sample as one JSON object per line
//! - Rotating to a new file after N records
//! - Retaining only the newest M files
//!
//! ## Record Format
//!
//! ```text
//! {"timestamp":"2024-05-01T12:00:00.123+00:00","raw_x":32001,"raw_y":30999,"x":0,"y":0}
//! ```

use chrono::Utc;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::adc::RawSample;
use crate::calibration::normalize::NormalizedSample;
use crate::error::Result;

const FILE_PREFIX: &str = "samples_";
const FILE_EXTENSION: &str = "jsonl";

/// One logged sample
#[derive(Debug, Clone, Serialize)]
pub struct SampleEntry {
    pub timestamp: String,
    pub raw_x: u16,
    pub raw_y: u16,
    pub x: i32,
    pub y: i32,
}

impl SampleEntry {
    /// Creates an entry stamped with the current time.
    #[must_use]
    pub fn now(raw: RawSample, normalized: NormalizedSample) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            raw_x: raw.x,
            raw_y: raw.y,
            x: normalized.x,
            y: normalized.y,
        }
    }
}

/// Rotating JSONL sample log
#[derive(Debug)]
pub struct SampleLogger {
    dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    writer: Option<BufWriter<File>>,
    records_in_file: usize,
    file_seq: u64,
}

impl SampleLogger {
    /// Creates a logger writing into `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the directory cannot be created.
    pub fn new<P: AsRef<Path>>(
        dir: P,
        max_records_per_file: usize,
        max_files_to_keep: usize,
    ) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        info!("Logging samples to {}", dir.display());

        Ok(Self {
            dir,
            max_records_per_file: max_records_per_file.max(1),
            max_files_to_keep: max_files_to_keep.max(1),
            writer: None,
            records_in_file: 0,
            file_seq: 0,
        })
    }

    /// Appends one sample, rotating first if the current file is full.
    ///
    /// # Errors
    ///
    /// Returns `Io` or `Json` if the entry cannot be written.
    pub fn log(&mut self, raw: RawSample, normalized: NormalizedSample) -> Result<()> {
        self.write_entry(&SampleEntry::now(raw, normalized))
    }

    /// Appends a prepared entry.
    ///
    /// # Errors
    ///
    /// Returns `Io` or `Json` if the entry cannot be written.
    pub fn write_entry(&mut self, entry: &SampleEntry) -> Result<()> {
        if self.writer.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }

        if let Some(writer) = self.writer.as_mut() {
            serde_json::to_writer(&mut *writer, entry)?;
            writer.write_all(b"\n")?;
            self.records_in_file += 1;
        }
        Ok(())
    }

    /// Flushes buffered entries to disk.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the flush fails.
    pub fn flush(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }

    fn rotate(&mut self) -> Result<()> {
        self.flush()?;

        let name = format!(
            "{}{}_{:06}.{}",
            FILE_PREFIX,
            Utc::now().format("%Y%m%d_%H%M%S"),
            self.file_seq,
            FILE_EXTENSION
        );
        self.file_seq += 1;

        let path = self.dir.join(name);
        let file = File::create(&path)?;
        debug!("Opened sample log {}", path.display());

        self.writer = Some(BufWriter::new(file));
        self.records_in_file = 0;
        self.prune()
    }

    fn prune(&self) -> Result<()> {
        let mut files = log_files(&self.dir)?;
        if files.len() <= self.max_files_to_keep {
            return Ok(());
        }

        files.sort();
        let excess = files.len() - self.max_files_to_keep;
        for old in files.into_iter().take(excess) {
            if let Err(e) = fs::remove_file(&old) {
                warn!("Failed to remove old sample log {}: {}", old.display(), e);
            } else {
                debug!("Removed old sample log {}", old.display());
            }
        }
        Ok(())
    }
}

impl Drop for SampleLogger {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!("Failed to flush sample log: {}", e);
        }
    }
}

fn log_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_log = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(FILE_PREFIX))
            && path.extension().is_some_and(|ext| ext == FILE_EXTENSION);
        if is_log {
            files.push(path);
        }
    }
    Ok(files)
}
