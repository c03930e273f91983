//! Append-only output sinks.
//!
//! Each job owns exactly one sink, written only by its pipeline consumer.
//! The engine needs nothing beyond `write` + `flush`; acquisition goes
//! through a [`SinkFactory`] so it can fail per job.
//!
//! [`CsvSinkFactory`] names files
//! `{EXCHANGE}_{DATA_TYPE}_{SYMBOL}_{YYYY-MM-DD_HH_MM_SS}.csv`.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::ScrapeError;
use crate::time_util;
use crate::types::PollTarget;

/// Destination for one job's rows.
pub trait RecordSink: Send {
    /// Append one row.
    fn write(&mut self, fields: &[String]) -> Result<(), ScrapeError>;
    /// Push buffered rows to the underlying medium.
    fn flush(&mut self) -> Result<(), ScrapeError>;
}

/// Acquires a sink for a job at start-up.
pub trait SinkFactory: Send + Sync {
    fn open(
        &self,
        target: &PollTarget,
        started_at: DateTime<Utc>,
    ) -> Result<Box<dyn RecordSink>, ScrapeError>;
}

// ---------------------------------------------------------------------------
// CSV files
// ---------------------------------------------------------------------------

/// CSV writer over an append-mode file.
pub struct CsvSink {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl RecordSink for CsvSink {
    fn write(&mut self, fields: &[String]) -> Result<(), ScrapeError> {
        self.writer
            .write_record(fields)
            .map_err(|e| ScrapeError::Sink(format!("{}: {e}", self.path.display())))
    }

    fn flush(&mut self) -> Result<(), ScrapeError> {
        self.writer
            .flush()
            .map_err(|e| ScrapeError::Sink(format!("{}: {e}", self.path.display())))
    }
}

/// Opens one CSV file per job under `dir`.
#[derive(Debug, Clone)]
pub struct CsvSinkFactory {
    dir: PathBuf,
}

impl CsvSinkFactory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// File name for a job started at `started_at`.
    pub fn file_name(target: &PollTarget, started_at: &DateTime<Utc>) -> String {
        let symbol: String = target
            .symbol
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
            .collect();
        format!(
            "{}_{}_{}_{}.csv",
            target.exchange,
            target.data_type,
            symbol,
            time_util::format_file_stamp(started_at)
        )
    }
}

impl SinkFactory for CsvSinkFactory {
    fn open(
        &self,
        target: &PollTarget,
        started_at: DateTime<Utc>,
    ) -> Result<Box<dyn RecordSink>, ScrapeError> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| ScrapeError::Sink(format!("create {}: {e}", self.dir.display())))?;

        let path = self.dir.join(Self::file_name(target, &started_at));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| ScrapeError::Sink(format!("open {}: {e}", path.display())))?;

        debug!(path = %path.display(), "csv sink opened");
        Ok(Box::new(CsvSink { writer: csv::Writer::from_writer(file), path }))
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// Rows written to a [`MemorySink`], shared with whoever created it.
pub type SharedRows = Arc<Mutex<Vec<Vec<String>>>>;

/// Sink that appends rows to a shared vector.
pub struct MemorySink {
    rows: SharedRows,
}

impl RecordSink for MemorySink {
    fn write(&mut self, fields: &[String]) -> Result<(), ScrapeError> {
        self.rows.lock().unwrap_or_else(|e| e.into_inner()).push(fields.to_vec());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ScrapeError> {
        Ok(())
    }
}

/// Hands out [`MemorySink`]s and remembers them by target.
///
/// Symbols listed via [`MemorySinkFactory::failing_for`] fail acquisition.
#[derive(Default, Clone)]
pub struct MemorySinkFactory {
    sinks: Arc<Mutex<HashMap<PollTarget, SharedRows>>>,
    failing: HashSet<String>,
}

impl MemorySinkFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(mut self, symbol: impl Into<String>) -> Self {
        self.failing.insert(symbol.into());
        self
    }

    /// Snapshot of the rows written for `target`, if a sink was opened.
    pub fn rows(&self, target: &PollTarget) -> Option<Vec<Vec<String>>> {
        let sinks = self.sinks.lock().unwrap_or_else(|e| e.into_inner());
        sinks
            .get(target)
            .map(|rows| rows.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    /// Number of sinks opened so far.
    pub fn opened(&self) -> usize {
        self.sinks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl SinkFactory for MemorySinkFactory {
    fn open(
        &self,
        target: &PollTarget,
        _started_at: DateTime<Utc>,
    ) -> Result<Box<dyn RecordSink>, ScrapeError> {
        if self.failing.contains(&target.symbol) {
            return Err(ScrapeError::Sink(format!("refusing sink for {target}")));
        }
        let rows = SharedRows::default();
        self.sinks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(target.clone(), Arc::clone(&rows));
        Ok(Box::new(MemorySink { rows }))
    }
}
