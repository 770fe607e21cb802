//! In-memory table store for tests and short-lived sessions.

use std::collections::BTreeMap;

use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use crate::error::Result;
use crate::schema::TableName;
use crate::table::{validate_batch, Table};

use super::{StoreMetadata, TableStore};

/// Keeps every appended batch in memory.
///
/// Reading a table that was never appended to yields an empty table with
/// the full column set. Such a table is not reported by
/// [`TableStore::contains`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    batches: BTreeMap<TableName, Vec<RecordBatch>>,
    last_modified: Option<DateTime<Utc>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows appended to `table`.
    pub fn num_rows(&self, table: TableName) -> usize {
        self.batches
            .get(&table)
            .map_or(0, |batches| batches.iter().map(RecordBatch::num_rows).sum())
    }
}

impl TableStore for InMemoryStore {
    #[instrument(skip(self, batch), fields(rows = batch.num_rows()))]
    fn append(&mut self, table: TableName, batch: RecordBatch) -> Result<()> {
        validate_batch(table, &batch)?;
        self.batches.entry(table).or_default().push(batch);
        self.last_modified = Some(Utc::now());
        debug!(total_rows = self.num_rows(table), "appended batch");
        Ok(())
    }

    fn read(&self, table: TableName) -> Result<Table> {
        match self.batches.get(&table) {
            Some(batches) => Table::concat(table, batches),
            None => Ok(Table::empty(table)),
        }
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn contains(&self, table: TableName) -> bool {
        self.batches.contains_key(&table)
    }

    fn metadata(&self) -> StoreMetadata {
        TableName::ALL
            .iter()
            .fold(StoreMetadata::new("in_memory"), |metadata, table| {
                metadata.with_row_count(*table, self.num_rows(*table))
            })
            .with_last_modified(self.last_modified)
    }
}
