//! CSV backed table store.
//!
//! Each table lives in `<dir>/<table>.csv` with a header row holding the
//! fixed column list. Appended rows are buffered until [`TableStore::flush`],
//! which creates the file on the first flush of a session and appends to it
//! afterwards. Files left by a previous run are renamed to
//! `<table>.csv_<UTC %Y%m%d%H%M%S>` on the first flush, and
//! [`CsvStore::snapshot`] reads such a backup instead of the live files.
//!
//! Null cells are written as [`NULL_TOKEN`], so an empty string and a missing
//! value stay distinct after a round trip.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use arrow::compute::concat_batches;
use arrow::csv::{ReaderBuilder, WriterBuilder};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::{debug, info, instrument, warn};

use crate::error::{AnacodeError, ErrorContext, Result};
use crate::log_data_op;
use crate::logging::LogConfig;
use crate::schema::TableName;
use crate::table::{validate_batch, Table};

use super::{StoreMetadata, TableStore};

/// Format of the suffix appended to backed up table files.
pub const BACKUP_SUFFIX_FORMAT: &str = "%Y%m%d%H%M%S";

/// Cell text standing for a null value in persisted tables.
pub const NULL_TOKEN: &str = "\\N";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Mode {
    Live {
        /// Set once the first flush has dealt with the previous run's files.
        checked: bool,
        backed_up: Option<String>,
    },
    Snapshot {
        suffix: String,
    },
}

/// Table store persisting one CSV file per table.
#[derive(Debug)]
pub struct CsvStore {
    dir: PathBuf,
    mode: Mode,
    pending: BTreeMap<TableName, Vec<RecordBatch>>,
    written: BTreeSet<TableName>,
    flushed_rows: BTreeMap<TableName, usize>,
    last_modified: Option<DateTime<Utc>>,
    log_config: LogConfig,
}

impl CsvStore {
    /// Opens the live files in `dir`, creating the directory if needed.
    #[instrument(skip(dir), fields(dir = %dir.as_ref().display()))]
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
        Ok(Self::with_mode(dir, Mode::Live {
                checked: false,
                backed_up: None,
            }))
    }

    /// Opens the read-only snapshot of `dir` saved under `suffix`.
    pub fn snapshot(dir: impl AsRef<Path>, suffix: impl Into<String>) -> Result<Self> {
        let suffix = suffix.into();
        if suffix.is_empty() {
            return Err(AnacodeError::invalid_argument("backup suffix must not be empty"));
        }
        Ok(Self::with_mode(dir.as_ref().to_path_buf(), Mode::Snapshot { suffix }))
    }

    fn with_mode(dir: PathBuf, mode: Mode) -> Self {
        Self {
            dir,
            mode,
            pending: BTreeMap::new(),
            written: BTreeSet::new(),
            flushed_rows: BTreeMap::new(),
            last_modified: None,
            log_config: LogConfig::default(),
        }
    }

    pub fn with_log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_snapshot(&self) -> bool {
        matches!(self.mode, Mode::Snapshot { .. })
    }

    /// Suffix of the backups made by this store's first flush, if any were made.
    pub fn backup_suffix(&self) -> Option<&str> {
        match &self.mode {
            Mode::Live { backed_up, .. } => backed_up.as_deref(),
            Mode::Snapshot { suffix } => Some(suffix),
        }
    }

    /// Path of the file `table` is read from.
    pub fn path(&self, table: TableName) -> PathBuf {
        match &self.mode {
            Mode::Live { .. } => self.dir.join(table.file_name()),
            Mode::Snapshot { suffix } => self.dir.join(table.backup_file_name(suffix)),
        }
    }

    fn pending_rows(&self, table: TableName) -> usize {
        self.pending
            .get(&table)
            .map_or(0, |batches| batches.iter().map(RecordBatch::num_rows).sum())
    }

    /// Renames the files of a previous run out of the way.
    fn back_up_previous_run(&mut self) -> Result<()> {
        let Mode::Live { checked, backed_up } = &mut self.mode else {
            return Ok(());
        };
        if *checked {
            return Ok(());
        }
        let suffix = Utc::now().format(BACKUP_SUFFIX_FORMAT).to_string();
        let mut moved = 0;
        for table in TableName::ALL {
            if self.written.contains(&table) {
                continue;
            }
            let live = self.dir.join(table.file_name());
            if !live.exists() {
                continue;
            }
            let backup = self.dir.join(table.backup_file_name(&suffix));
            if backup.exists() {
                warn!(path = %backup.display(), "backup already exists, overwriting");
            }
            fs::rename(&live, &backup)
                .with_context(|| format!("backing up {}", live.display()))?;
            moved += 1;
        }
        if moved > 0 {
            info!(files = moved, suffix = %suffix, "backed up previous table files");
            *backed_up = Some(suffix);
        }
        *checked = true;
        Ok(())
    }

    fn write_table(&mut self, table: TableName, batches: &[RecordBatch]) -> Result<usize> {
        let path = self.dir.join(table.file_name());
        let fresh = !self.written.contains(&table);
        let mut file = if fresh {
            let mut file =
                File::create(&path).with_context(|| format!("creating {}", path.display()))?;
            writeln!(file, "{}", table.column_names().join(","))
                .with_context(|| format!("writing header of {}", path.display()))?;
            file
        } else {
            OpenOptions::new()
                .append(true)
                .open(&path)
                .with_context(|| format!("opening {}", path.display()))?
        };

        let mut rows = 0;
        let mut writer = WriterBuilder::new()
            .with_header(false)
            .with_null(NULL_TOKEN.to_string())
            .build(Vec::new());
        for batch in batches {
            writer.write(batch)?;
            rows += batch.num_rows();
        }
        file.write_all(&writer.into_inner())
            .with_context(|| format!("writing {}", path.display()))?;
        file.flush()?;
        self.written.insert(table);
        Ok(rows)
    }
}

impl TableStore for CsvStore {
    #[instrument(skip(self, batch), fields(rows = batch.num_rows()))]
    fn append(&mut self, table: TableName, batch: RecordBatch) -> Result<()> {
        if self.is_snapshot() {
            return Err(AnacodeError::invalid_argument(format!(
                "cannot append to '{table}': snapshot stores are read-only"
            )));
        }
        validate_batch(table, &batch)?;
        self.pending.entry(table).or_default().push(batch);
        self.last_modified = Some(Utc::now());
        Ok(())
    }

    fn read(&self, table: TableName) -> Result<Table> {
        let pending = self.pending.get(&table);
        let on_disk = match &self.mode {
            Mode::Snapshot { .. } => true,
            Mode::Live { .. } => self.written.contains(&table),
        };
        if !on_disk {
            return match pending {
                Some(batches) => Table::concat(table, batches),
                None => Err(AnacodeError::missing_table(
                    table.as_str(),
                    self.path(table).display().to_string(),
                )),
            };
        }

        let stored = read_table_file(&self.path(table), table)?;
        match pending {
            Some(batches) => {
                let mut all = Vec::with_capacity(batches.len() + 1);
                all.push(stored.batch().clone());
                all.extend(batches.iter().cloned());
                Table::concat(table, &all)
            }
            None => Ok(stored),
        }
    }

    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    fn flush(&mut self) -> Result<()> {
        if self.is_snapshot() {
            return Ok(());
        }
        self.back_up_previous_run()?;
        let tables: Vec<TableName> = self.pending.keys().copied().collect();
        let mut total = 0;
        for table in &tables {
            let Some(batches) = self.pending.remove(table) else {
                continue;
            };
            // rows stay pending until their table is on disk
            let rows = match self.write_table(*table, &batches) {
                Ok(rows) => rows,
                Err(e) => {
                    self.pending.insert(*table, batches);
                    warn!(table = %table, error = %e, "flush failed, rows kept pending");
                    return Err(e);
                }
            };
            *self.flushed_rows.entry(*table).or_default() += rows;
            log_data_op!(self.log_config, table = %table, rows, "flushed table");
            total += rows;
        }
        self.last_modified = Some(Utc::now());
        info!(tables = tables.len(), rows = total, "flushed pending rows");
        Ok(())
    }

    fn contains(&self, table: TableName) -> bool {
        match &self.mode {
            Mode::Live { .. } => self.written.contains(&table) || self.pending.contains_key(&table),
            Mode::Snapshot { .. } => self.path(table).is_file(),
        }
    }

    fn metadata(&self) -> StoreMetadata {
        let mut metadata = StoreMetadata::new("csv")
            .with_location(&self.dir)
            .with_last_modified(self.last_modified);
        if let Some(suffix) = self.backup_suffix() {
            metadata = metadata.with_backup_suffix(suffix);
        }
        for table in TableName::ALL {
            if self.contains(table) && !self.is_snapshot() {
                let rows = self.flushed_rows.get(&table).copied().unwrap_or(0)
                    + self.pending_rows(table);
                metadata = metadata.with_row_count(table, rows);
            }
        }
        metadata
    }
}

/// Reads one persisted table file.
///
/// The header must list exactly the columns of `table`. A missing file is a
/// [`AnacodeError::MissingTable`] naming the path.
pub fn read_table_file(path: &Path, table: TableName) -> Result<Table> {
    if !path.is_file() {
        return Err(AnacodeError::missing_table(
            table.as_str(),
            path.display().to_string(),
        ));
    }

    let mut header = String::new();
    BufReader::new(File::open(path)?)
        .read_line(&mut header)
        .with_context(|| format!("reading header of {}", path.display()))?;
    let header = header.trim_end_matches(['\r', '\n']);
    let expected = table.column_names().join(",");
    if header != expected {
        return Err(AnacodeError::schema(
            table.as_str(),
            format!(
                "{} has header '{header}', expected '{expected}'",
                path.display()
            ),
        ));
    }

    let null = Regex::new(&format!("^{}$", regex::escape(NULL_TOKEN)))
        .map_err(|e| AnacodeError::invalid_argument(format!("null token pattern: {e}")))?;
    let schema = table.schema();
    let reader = ReaderBuilder::new(schema.clone())
        .with_header(true)
        .with_null_regex(null)
        .build(File::open(path)?)?;
    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    let batch = concat_batches(&schema, &batches)?;
    debug!(table = %table, rows = batch.num_rows(), path = %path.display(), "read table file");
    Table::try_new(table, batch)
}
