//! Read-only datasets assembled from stores, raw responses or persisted files.
//!
//! # Examples
//!
//! ```rust,no_run
//! use anacode::prelude::*;
//!
//! # fn main() -> anacode::Result<()> {
//! let loader = DatasetLoader::from_path_with(
//!     "analysis/",
//!     &LoadOptions::new().with_call_types([CallType::Concepts]),
//! )?;
//! let top = loader.concepts()?.most_common_concepts(10, "", false)?;
//! for score in top {
//!     println!("{}: {}", score.name, score.value);
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::aggregation::{AbsaView, CategoriesView, ConceptsView, SentimentsView};
use crate::error::{AnacodeError, Result};
use crate::schema::{CallType, TableName};
use crate::store::{read_table_file, TableStore};
use crate::table::Table;
use crate::writer::AnalysisWriter;

/// Options for [`DatasetLoader::from_path_with`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Call types whose tables must be present. `None` loads whatever exists.
    pub call_types: Option<Vec<CallType>>,
    /// Read `<table>.csv_<suffix>` backups instead of the live files.
    pub backup_suffix: Option<String>,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_call_types(mut self, call_types: impl IntoIterator<Item = CallType>) -> Self {
        self.call_types = Some(call_types.into_iter().collect());
        self
    }

    pub fn with_backup_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.backup_suffix = Some(suffix.into());
        self
    }

    fn file_name(&self, table: TableName) -> String {
        match &self.backup_suffix {
            Some(suffix) => table.backup_file_name(suffix),
            None => table.file_name(),
        }
    }
}

/// An immutable set of loaded tables with per-call-type views.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetLoader {
    tables: BTreeMap<TableName, Table>,
}

impl DatasetLoader {
    /// Builds a loader from explicit tables. At least one table is required.
    pub fn from_tables(tables: impl IntoIterator<Item = Table>) -> Result<Self> {
        let tables: BTreeMap<TableName, Table> =
            tables.into_iter().map(|t| (t.name(), t)).collect();
        if tables.is_empty() {
            return Err(AnacodeError::invalid_argument("no tables provided"));
        }
        Ok(Self { tables })
    }

    /// Reads every table present in the store.
    #[instrument(skip(store))]
    pub fn from_store<S: TableStore + ?Sized>(store: &S) -> Result<Self> {
        let mut tables = Vec::new();
        for name in TableName::ALL {
            if !store.contains(name) {
                continue;
            }
            match store.read(name) {
                Ok(table) => tables.push(table),
                Err(AnacodeError::MissingTable { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
        debug!(tables = tables.len(), "loaded tables from store");
        Self::from_tables(tables)
    }

    pub fn from_writer<S: TableStore>(writer: &AnalysisWriter<S>) -> Result<Self> {
        Self::from_store(writer.store())
    }

    /// Normalizes lists of raw responses, each call type with its own ids.
    ///
    /// Only the tables of the call types present in `lists` are loaded.
    pub fn from_lists<'a, I>(lists: I) -> Result<Self>
    where
        I: IntoIterator<Item = (CallType, &'a [Value])>,
    {
        let mut writer = AnalysisWriter::default();
        let mut calls = BTreeSet::new();
        for (call, responses) in lists {
            calls.insert(call);
            for response in responses {
                writer.write(call, response)?;
            }
        }
        let tables = calls
            .iter()
            .flat_map(|call| call.tables())
            .map(|name| writer.store().read(*name))
            .collect::<Result<Vec<_>>>()?;
        Self::from_tables(tables)
    }

    pub fn from_path(dir: impl AsRef<Path>) -> Result<Self> {
        Self::from_path_with(dir, &LoadOptions::default())
    }

    /// Loads persisted tables from `dir`.
    ///
    /// Every table of a requested call type must exist; otherwise the error
    /// names the first missing file. Without requested call types, absent
    /// files are skipped.
    #[instrument(skip(dir, options), fields(dir = %dir.as_ref().display()))]
    pub fn from_path_with(dir: impl AsRef<Path>, options: &LoadOptions) -> Result<Self> {
        let dir = dir.as_ref();
        let (calls, required) = match &options.call_types {
            Some(calls) => (calls.clone(), true),
            None => (CallType::ALL.to_vec(), false),
        };

        let mut tables = Vec::new();
        for call in calls {
            for name in call.tables() {
                let file = options.file_name(*name);
                let path = dir.join(&file);
                if path.is_file() {
                    tables.push(read_table_file(&path, *name)?);
                } else if required {
                    return Err(AnacodeError::missing_table(name.as_str(), file));
                } else {
                    debug!(file = %file, "table file not present");
                }
            }
        }

        if tables.is_empty() {
            return Err(AnacodeError::missing_table(
                "any",
                format!("no table files in {}", dir.display()),
            ));
        }
        info!(tables = tables.len(), "loaded table files");
        Self::from_tables(tables)
    }

    /// Looks a table up by name.
    ///
    /// Unknown names are an [`AnacodeError::InvalidArgument`]; known tables
    /// that were not loaded are an [`AnacodeError::MissingTable`].
    pub fn table(&self, name: &str) -> Result<&Table> {
        let name: TableName = name.parse()?;
        self.get(name)
            .ok_or_else(|| AnacodeError::missing_table(name.as_str(), "not loaded"))
    }

    pub fn get(&self, name: TableName) -> Option<&Table> {
        self.tables.get(&name)
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    /// Whether any table of `call` is loaded.
    pub fn has(&self, call: CallType) -> bool {
        call.tables().iter().any(|name| self.tables.contains_key(name))
    }

    pub fn categories(&self) -> Result<CategoriesView<'_>> {
        self.require(CallType::Categories)?;
        self.get(TableName::Categories)
            .map(CategoriesView::new)
            .ok_or_else(|| AnacodeError::missing_table("categories", "not loaded"))
    }

    pub fn concepts(&self) -> Result<ConceptsView<'_>> {
        self.require(CallType::Concepts)?;
        Ok(ConceptsView::new(
            self.get(TableName::Concepts),
            self.get(TableName::ConceptsExpressions),
        ))
    }

    pub fn sentiments(&self) -> Result<SentimentsView<'_>> {
        self.require(CallType::Sentiment)?;
        self.get(TableName::Sentiments)
            .map(SentimentsView::new)
            .ok_or_else(|| AnacodeError::missing_table("sentiments", "not loaded"))
    }

    pub fn absa(&self) -> Result<AbsaView<'_>> {
        self.require(CallType::Absa)?;
        Ok(AbsaView::from_tables(|name| self.get(name)))
    }

    /// A new loader holding only rows of the given documents.
    pub fn filter(&self, doc_ids: impl IntoIterator<Item = i64>) -> Result<Self> {
        let ids: BTreeSet<i64> = doc_ids.into_iter().collect();
        if ids.is_empty() {
            return Err(AnacodeError::invalid_argument("document id filter is empty"));
        }
        let tables = self
            .tables
            .values()
            .map(|table| {
                let docs = table.int_column("doc_id")?;
                table.retain(|i| ids.contains(&docs.value(i)))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_tables(tables)
    }

    /// A new loader without the named concepts in the `concepts` table.
    pub fn remove_concepts<S: AsRef<str>>(&self, concepts: &[S]) -> Result<Self> {
        let removed: BTreeSet<&str> = concepts.iter().map(|c| c.as_ref()).collect();
        let mut tables = self.tables.clone();
        if let Some(table) = self.tables.get(&TableName::Concepts) {
            let names = table.text_column("concept")?;
            let kept = table.retain(|i| !removed.contains(names.value(i)))?;
            tables.insert(TableName::Concepts, kept);
        }
        Ok(Self { tables })
    }

    fn require(&self, call: CallType) -> Result<()> {
        if self.has(call) {
            Ok(())
        } else {
            let table = call.tables().first().copied().unwrap_or(TableName::Categories);
            Err(AnacodeError::missing_table(
                call.as_str(),
                format!("{} not loaded", table.file_name()),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CsvStore, InMemoryStore};
    use serde_json::json;

    fn concepts_response() -> Value {
        json!([[
            {"concept": "Lenovo", "freq": 2, "relevance_score": 1.0, "type": "brand",
             "expressions": {"联想": 2}},
            {"concept": "Screen", "freq": 1, "relevance_score": 0.5,
             "type": "feature_quantitative", "expressions": {"屏幕": 1}}
        ]])
    }

    #[test]
    fn test_from_lists_loads_only_given_call_types() {
        let concepts = [concepts_response(), concepts_response()];
        let loader = DatasetLoader::from_lists([(CallType::Concepts, &concepts[..])]).unwrap();
        assert!(loader.has(CallType::Concepts));
        assert!(!loader.has(CallType::Categories));
        assert_eq!(loader.table("concepts").unwrap().num_rows(), 4);
        assert!(matches!(
            loader.categories(),
            Err(AnacodeError::MissingTable { .. })
        ));
    }

    #[test]
    fn test_table_lookup_errors() {
        let concepts = [concepts_response()];
        let loader = DatasetLoader::from_lists([(CallType::Concepts, &concepts[..])]).unwrap();
        assert!(matches!(
            loader.table("nonsense"),
            Err(AnacodeError::InvalidArgument(_))
        ));
        assert!(matches!(
            loader.table("sentiments"),
            Err(AnacodeError::MissingTable { .. })
        ));
    }

    #[test]
    fn test_from_tables_requires_one_table() {
        assert!(matches!(
            DatasetLoader::from_tables(Vec::new()),
            Err(AnacodeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_from_store_reads_written_tables() {
        let mut writer = AnalysisWriter::default();
        writer.write_concepts(&json!([null])).unwrap();
        let loader = DatasetLoader::from_writer(&writer).unwrap();
        assert_eq!(loader.tables().count(), 2);
        assert!(loader.concepts().unwrap().most_common_concepts(3, "", false).unwrap().is_empty());
        assert!(!loader.has(CallType::Categories));

        assert!(matches!(
            DatasetLoader::from_store(&InMemoryStore::new()),
            Err(AnacodeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_filter_and_remove_concepts() {
        let concepts = [concepts_response(), concepts_response(), concepts_response()];
        let loader = DatasetLoader::from_lists([(CallType::Concepts, &concepts[..])]).unwrap();

        let filtered = loader.filter([0, 2]).unwrap();
        let docs = filtered.table("concepts").unwrap().int_column("doc_id").unwrap();
        assert_eq!(docs.values().to_vec(), vec![0, 0, 2, 2]);
        assert_eq!(filtered.table("concepts_expressions").unwrap().num_rows(), 6);
        assert!(matches!(
            loader.filter(Vec::new()),
            Err(AnacodeError::InvalidArgument(_))
        ));

        let pruned = loader.remove_concepts(&["Lenovo"]).unwrap();
        let top = pruned.concepts().unwrap().most_common_concepts(5, "", false).unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].name, "Screen");
        assert_eq!(loader.table("concepts").unwrap().num_rows(), 6);
    }

    #[test]
    fn test_from_path_requires_requested_tables() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = AnalysisWriter::new(CsvStore::open(dir.path()).unwrap());
        writer.write_concepts(&concepts_response()).unwrap();
        writer.flush().unwrap();

        let err = DatasetLoader::from_path_with(
            dir.path(),
            &LoadOptions::new().with_call_types([CallType::Categories]),
        )
        .unwrap_err();
        assert!(matches!(err, AnacodeError::MissingTable { .. }));
        assert!(err.to_string().contains("categories.csv"));

        let loader = DatasetLoader::from_path_with(
            dir.path(),
            &LoadOptions::new().with_call_types([CallType::Concepts]),
        )
        .unwrap();
        assert_eq!(loader.table("concepts").unwrap().num_rows(), 2);

        let loader = DatasetLoader::from_path(dir.path()).unwrap();
        assert!(loader.has(CallType::Concepts));
        assert!(!loader.has(CallType::Absa));
    }

    #[test]
    fn test_from_path_of_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            DatasetLoader::from_path(dir.path()),
            Err(AnacodeError::MissingTable { .. })
        ));
    }
}
