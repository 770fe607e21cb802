//! Read-only aggregations over loaded tables.
//!
//! Concepts and ABSA entities share one engine, [`Occurrences`]: a flat list of
//! named, typed, weighted rows tagged with their `(doc_id, text_order)` scope.
//! Frequency, ranking and co-occurrence are all computed on it, so the
//! tie-break rules live in one place: equal values keep the order in which
//! their names were first encountered in the table.
//!
//! Type filters are prefix matches on the type column; the empty string
//! matches every row.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::error::{AnacodeError, Result};
use crate::table::Table;

pub mod absa;
pub mod categories;
pub mod concepts;
pub mod sentiments;
pub mod time_series;

pub use absa::AbsaView;
pub use categories::CategoriesView;
pub use concepts::{ConceptsView, IdfFilter};
pub use sentiments::SentimentsView;
pub use time_series::{make_time_series, TimeBucket};

/// A named aggregate value, e.g. a count, a relative frequency or a mean rating.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Score {
    pub name: String,
    pub value: f64,
}

impl Score {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Which columns of a table make up an occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OccurrenceColumns {
    pub name: &'static str,
    pub kind: &'static str,
    /// Integer column weighting each row. Rows count once when absent.
    pub weight: Option<&'static str>,
}

/// Concepts are weighted by their in-text frequency.
pub const CONCEPT_COLUMNS: OccurrenceColumns = OccurrenceColumns {
    name: "concept",
    kind: "concept_type",
    weight: Some("freq"),
};

/// Every entity row is one occurrence.
pub const ENTITY_COLUMNS: OccurrenceColumns = OccurrenceColumns {
    name: "entity_name",
    kind: "entity_type",
    weight: None,
};

/// One row of an occurrence table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence<'a> {
    pub doc_id: i64,
    pub text_order: i64,
    pub name: &'a str,
    pub kind: &'a str,
    pub weight: i64,
}

impl Occurrence<'_> {
    pub fn scope(&self) -> (i64, i64) {
        (self.doc_id, self.text_order)
    }
}

/// Borrowed view of the occurrence rows of a concepts or entities table.
#[derive(Debug, Clone, Default)]
pub struct Occurrences<'a> {
    rows: Vec<Occurrence<'a>>,
}

impl<'a> Occurrences<'a> {
    pub fn from_table(table: &'a Table, columns: OccurrenceColumns) -> Result<Self> {
        let docs = table.int_column("doc_id")?;
        let orders = table.int_column("text_order")?;
        let names = table.text_column(columns.name)?;
        let kinds = table.text_column(columns.kind)?;
        let weights = columns
            .weight
            .map(|column| table.int_column(column))
            .transpose()?;

        let rows = (0..table.num_rows())
            .map(|i| Occurrence {
                doc_id: docs.value(i),
                text_order: orders.value(i),
                name: names.value(i),
                kind: kinds.value(i),
                weight: weights.map_or(1, |w| w.value(i)),
            })
            .collect();
        Ok(Self { rows })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Occurrence<'a>> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows whose type starts with `prefix`.
    pub fn of_kind(&self, prefix: &str) -> Self {
        Self {
            rows: self
                .rows
                .iter()
                .filter(|row| row.kind.starts_with(prefix))
                .copied()
                .collect(),
        }
    }

    /// Sum of weights over all rows.
    pub fn total(&self) -> i64 {
        self.rows.iter().map(|row| row.weight).sum()
    }

    /// Summed weight per name, in order of first encounter.
    pub fn counts(&self) -> Vec<(&'a str, i64)> {
        let mut index: HashMap<&'a str, usize> = HashMap::new();
        let mut counts: Vec<(&'a str, i64)> = Vec::new();
        for row in &self.rows {
            match index.get(row.name) {
                Some(&at) => counts[at].1 += row.weight,
                None => {
                    index.insert(row.name, counts.len());
                    counts.push((row.name, row.weight));
                }
            }
        }
        counts
    }

    /// Count of every requested name, in the order requested.
    ///
    /// Unseen names count zero. With `normalize`, counts are divided by the
    /// total weight of these rows, so callers filter by type first.
    pub fn frequency<S: AsRef<str>>(&self, names: &[S], normalize: bool) -> Result<Vec<Score>> {
        if names.is_empty() {
            return Err(AnacodeError::invalid_argument(
                "at least one name is required",
            ));
        }
        let counts: HashMap<&str, i64> = self.counts().into_iter().collect();
        let scale = self.scale(normalize);
        Ok(names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                let count = counts.get(name).copied().unwrap_or(0);
                Score::new(name, count as f64 * scale)
            })
            .collect())
    }

    pub fn most_common(&self, n: usize, normalize: bool) -> Vec<Score> {
        self.ranked(SortOrder::Descending, n, normalize)
    }

    pub fn least_common(&self, n: usize, normalize: bool) -> Vec<Score> {
        self.ranked(SortOrder::Ascending, n, normalize)
    }

    /// Names sharing a text with `anchor`, ranked by summed weight.
    ///
    /// The anchor is matched case-insensitively and never counted as its own
    /// neighbour. Only neighbours whose type starts with `neighbor_kind` are
    /// counted; each text containing the anchor counts once.
    pub fn co_occurring(&self, anchor: &str, neighbor_kind: &str, n: usize) -> Vec<Score> {
        let anchor = anchor.to_lowercase();
        let is_anchor = |row: &Occurrence<'_>| row.name.to_lowercase() == anchor;
        let scopes: BTreeSet<(i64, i64)> = self
            .rows
            .iter()
            .filter(|row| is_anchor(row))
            .map(Occurrence::scope)
            .collect();
        if scopes.is_empty() {
            return Vec::new();
        }

        let neighbours = Self {
            rows: self
                .rows
                .iter()
                .filter(|row| {
                    scopes.contains(&row.scope())
                        && row.kind.starts_with(neighbor_kind)
                        && !is_anchor(row)
                })
                .copied()
                .collect(),
        };
        neighbours.most_common(n, false)
    }

    fn ranked(&self, order: SortOrder, n: usize, normalize: bool) -> Vec<Score> {
        let scale = self.scale(normalize);
        let scores = self
            .counts()
            .into_iter()
            .map(|(name, count)| Score::new(name, count as f64 * scale))
            .collect();
        rank(scores, order, n)
    }

    fn scale(&self, normalize: bool) -> f64 {
        let total = self.total();
        match (normalize, total) {
            (false, _) => 1.0,
            (true, 0) => 0.0,
            (true, total) => 1.0 / total as f64,
        }
    }
}

/// Stable sort by value, truncated to `n`. Ties keep their incoming order.
pub fn rank(mut scores: Vec<Score>, order: SortOrder, n: usize) -> Vec<Score> {
    match order {
        SortOrder::Descending => scores.sort_by(|a, b| b.value.total_cmp(&a.value)),
        SortOrder::Ascending => scores.sort_by(|a, b| a.value.total_cmp(&b.value)),
    }
    scores.truncate(n);
    scores
}

/// Mean of the values grouped by name, in order of first encounter.
pub(crate) fn grouped_means<'a, I>(values: I) -> Vec<Score>
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    let mut index: HashMap<&'a str, usize> = HashMap::new();
    let mut sums: Vec<(&'a str, f64, usize)> = Vec::new();
    for (name, value) in values {
        match index.get(name) {
            Some(&at) => {
                sums[at].1 += value;
                sums[at].2 += 1;
            }
            None => {
                index.insert(name, sums.len());
                sums.push((name, value, 1));
            }
        }
    }
    sums.into_iter()
        .map(|(name, sum, count)| Score::new(name, sum / count as f64))
        .collect()
}

/// Error for a view operation whose table was not loaded.
pub(crate) fn not_loaded(table: crate::schema::TableName) -> AnacodeError {
    AnacodeError::missing_table(table.as_str(), "not loaded")
}
