//! Aggregations over the `concepts` and `concepts_expressions` tables.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{Duration, NaiveDate};

use crate::error::Result;
use crate::schema::TableName;
use crate::table::Table;

use super::time_series::{make_time_series, TimeBucket};
use super::{not_loaded, rank, Occurrences, Score, SortOrder, CONCEPT_COLUMNS};

/// Concept queries. Counts are summed `freq` values, not row counts.
#[derive(Debug, Clone, Copy)]
pub struct ConceptsView<'a> {
    concepts: Option<&'a Table>,
    expressions: Option<&'a Table>,
}

impl<'a> ConceptsView<'a> {
    pub fn new(concepts: Option<&'a Table>, expressions: Option<&'a Table>) -> Self {
        Self {
            concepts,
            expressions,
        }
    }

    fn concepts(&self) -> Result<&'a Table> {
        self.concepts.ok_or_else(|| not_loaded(TableName::Concepts))
    }

    fn occurrences(&self) -> Result<Occurrences<'a>> {
        Occurrences::from_table(self.concepts()?, CONCEPT_COLUMNS)
    }

    /// Counts of `concepts`, in the order given.
    pub fn concept_frequency<S: AsRef<str>>(
        &self,
        concepts: &[S],
        concept_type: &str,
        normalize: bool,
    ) -> Result<Vec<Score>> {
        self.occurrences()?
            .of_kind(concept_type)
            .frequency(concepts, normalize)
    }

    pub fn most_common_concepts(
        &self,
        n: usize,
        concept_type: &str,
        normalize: bool,
    ) -> Result<Vec<Score>> {
        Ok(self.occurrences()?.of_kind(concept_type).most_common(n, normalize))
    }

    pub fn least_common_concepts(
        &self,
        n: usize,
        concept_type: &str,
        normalize: bool,
    ) -> Result<Vec<Score>> {
        Ok(self.occurrences()?.of_kind(concept_type).least_common(n, normalize))
    }

    /// Concepts of type `concept_type` found in the same texts as `concept`.
    pub fn co_occurring_concepts(
        &self,
        concept: &str,
        n: usize,
        concept_type: &str,
    ) -> Result<Vec<Score>> {
        Ok(self.occurrences()?.co_occurring(concept, concept_type, n))
    }

    /// See [`make_time_series`].
    pub fn make_time_series<S: AsRef<str>>(
        &self,
        concepts: &[S],
        dates: &BTreeMap<i64, NaiveDate>,
        width: Duration,
        interval: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<Vec<TimeBucket>> {
        make_time_series(&self.occurrences()?, concepts, dates, width, interval)
    }

    /// Surface expressions of each concept, in row order.
    pub fn surface_strings<S: AsRef<str>>(
        &self,
        concepts: &[S],
    ) -> Result<BTreeMap<String, Vec<String>>> {
        let expressions = self
            .expressions
            .ok_or_else(|| not_loaded(TableName::ConceptsExpressions))?;
        let names = expressions.text_column("concept")?;
        let surfaces = expressions.text_column("expression")?;

        let mut result: BTreeMap<String, Vec<String>> = concepts
            .iter()
            .map(|c| (c.as_ref().to_string(), Vec::new()))
            .collect();
        for (name, surface) in names.iter().zip(surfaces.iter()) {
            if let (Some(name), Some(surface)) = (name, surface) {
                if let Some(list) = result.get_mut(name) {
                    list.push(surface.to_string());
                }
            }
        }
        Ok(result)
    }

    /// Inverse document frequency `ln(N / df)` of each concept.
    ///
    /// Documents are `(doc_id, text_order)` texts; `N` counts every text in the
    /// table and `df` the texts containing the concept with a type starting
    /// with `concept_type`. Concepts found in no text score zero.
    pub fn concept_idf<S: AsRef<str>>(&self, concepts: &[S], concept_type: &str) -> Result<Vec<Score>> {
        let idf = self.idf_table(concept_type)?;
        Ok(concepts
            .iter()
            .map(|c| {
                let c = c.as_ref();
                Score::new(c, idf.get(c).copied().unwrap_or(0.0))
            })
            .collect())
    }

    /// Filter passing concepts whose idf is at least `threshold`.
    pub fn make_idf_filter(&self, threshold: f64, concept_type: &str) -> Result<IdfFilter> {
        Ok(IdfFilter {
            idf: self.idf_table(concept_type)?,
            threshold,
        })
    }

    /// The `max_concepts` most frequent concepts accepted by `filter`.
    pub fn word_cloud_frequencies<F>(
        &self,
        max_concepts: usize,
        concept_type: &str,
        mut filter: F,
    ) -> Result<Vec<Score>>
    where
        F: FnMut(&str) -> bool,
    {
        let scores = self
            .occurrences()?
            .of_kind(concept_type)
            .counts()
            .into_iter()
            .filter(|(name, _)| filter(*name))
            .map(|(name, count)| Score::new(name, count as f64))
            .collect();
        Ok(rank(scores, SortOrder::Descending, max_concepts))
    }

    fn idf_table(&self, concept_type: &str) -> Result<HashMap<String, f64>> {
        let occurrences = self.occurrences()?;
        let texts: BTreeSet<(i64, i64)> = occurrences.iter().map(|row| row.scope()).collect();
        let total = texts.len() as f64;

        let mut containing: HashMap<&str, BTreeSet<(i64, i64)>> = HashMap::new();
        for row in occurrences.of_kind(concept_type).iter() {
            containing.entry(row.name).or_default().insert(row.scope());
        }
        Ok(containing
            .into_iter()
            .map(|(name, scopes)| (name.to_string(), (total / scopes.len() as f64).ln()))
            .collect())
    }
}

/// Idf threshold filter produced by [`ConceptsView::make_idf_filter`].
#[derive(Debug, Clone)]
pub struct IdfFilter {
    idf: HashMap<String, f64>,
    threshold: f64,
}

impl IdfFilter {
    pub fn idf(&self, concept: &str) -> f64 {
        self.idf.get(concept).copied().unwrap_or(0.0)
    }

    pub fn passes(&self, concept: &str) -> bool {
        self.idf(concept) >= self.threshold
    }
}
