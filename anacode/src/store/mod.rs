//! Append-only storage of the normalized tables.
//!
//! Two interchangeable backends implement [`TableStore`]:
//!
//! - [`InMemoryStore`] accumulates batches in memory; `flush` is a no-op.
//! - [`CsvStore`] buffers appended rows and writes them to one CSV file per
//!   table on `flush`. A snapshot variant reads the backup files a previous
//!   run left behind.

use std::path::{Path, PathBuf};

use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;
use crate::normalizer::NormalizedCall;
use crate::schema::TableName;
use crate::table::{validate_batch, Table};

pub mod csv;
pub mod in_memory;

pub use self::csv::{read_table_file, CsvStore};
pub use in_memory::InMemoryStore;

/// Interface shared by all table storage backends.
///
/// Stores are append-only: rows are never updated or removed once written.
pub trait TableStore: Send {
    /// Appends a batch to `table`. A zero-row batch still marks the table as
    /// present.
    fn append(&mut self, table: TableName, batch: RecordBatch) -> Result<()>;

    /// Returns every row appended to `table` so far, in append order.
    fn read(&self, table: TableName) -> Result<Table>;

    /// Persists the current state. No-op for purely in-memory backends.
    fn flush(&mut self) -> Result<()>;

    /// Whether `table` has been appended to or persisted, even with zero rows.
    fn contains(&self, table: TableName) -> bool;

    /// Returns metadata about the store.
    fn metadata(&self) -> StoreMetadata;

    /// Appends every batch of one normalized invocation.
    ///
    /// All batches are validated before the first one is appended, so a
    /// schema mismatch leaves the store untouched.
    fn append_call(&mut self, call: &NormalizedCall) -> Result<()> {
        for (table, batch) in &call.batches {
            validate_batch(*table, batch)?;
        }
        for (table, batch) in &call.batches {
            self.append(*table, batch.clone())?;
        }
        Ok(())
    }
}

/// Metadata about a table store.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct StoreMetadata {
    /// The type of backend (e.g., "in_memory", "csv").
    pub backend_type: Option<String>,

    /// Directory backing the store, if any.
    pub location: Option<PathBuf>,

    /// Rows held per table, including rows not yet flushed.
    pub row_counts: Vec<(TableName, usize)>,

    /// Backup suffix a snapshot store reads from.
    pub backup_suffix: Option<String>,

    /// Time of the last append or flush.
    pub last_modified: Option<DateTime<Utc>>,
}

impl StoreMetadata {
    pub fn new(backend_type: impl Into<String>) -> Self {
        Self {
            backend_type: Some(backend_type.into()),
            ..Default::default()
        }
    }

    pub fn with_location(mut self, location: impl Into<PathBuf>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_row_count(mut self, table: TableName, rows: usize) -> Self {
        self.row_counts.push((table, rows));
        self
    }

    pub fn with_backup_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.backup_suffix = Some(suffix.into());
        self
    }

    pub fn with_last_modified(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.last_modified = at;
        self
    }

    pub fn total_rows(&self) -> usize {
        self.row_counts.iter().map(|(_, rows)| rows).sum()
    }
}

/// Finds the most recent backup suffix among the table files in `dir`.
///
/// Backups are named `<table>.csv_<suffix>`; timestamp suffixes sort
/// chronologically, so the lexicographically largest one wins.
pub fn latest_backup_suffix(dir: impl AsRef<Path>) -> Result<Option<String>> {
    let dir = dir.as_ref();
    let mut latest: Option<String> = None;
    for table in TableName::ALL {
        let pattern = dir
            .join(format!("{}_*", glob::Pattern::escape(&table.file_name())))
            .to_string_lossy()
            .into_owned();
        let Ok(paths) = glob::glob(&pattern) else {
            warn!(pattern = %pattern, "skipping unusable backup pattern");
            continue;
        };
        let prefix = format!("{}_", table.file_name());
        for path in paths.flatten() {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if let Some(suffix) = name.strip_prefix(&prefix) {
                if latest.as_deref().map_or(true, |l| suffix > l) {
                    latest = Some(suffix.to_string());
                }
            }
        }
    }
    Ok(latest)
}
