//! Aggregations over the six ABSA tables.
//!
//! Entity counts come from `absa_entities`, one per row. Ratings join
//! `absa_relations` with `absa_relations_entities` on
//! `(doc_id, text_order, relation_id)`; relations without entities carry no
//! rating.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{Duration, NaiveDate};

use crate::error::Result;
use crate::schema::TableName;
use crate::table::Table;

use super::time_series::{make_time_series, TimeBucket};
use super::{grouped_means, not_loaded, rank, Occurrences, Score, SortOrder, ENTITY_COLUMNS};

#[derive(Debug, Clone, Copy, Default)]
pub struct AbsaView<'a> {
    pub(crate) entities: Option<&'a Table>,
    pub(crate) normalized_texts: Option<&'a Table>,
    pub(crate) relations: Option<&'a Table>,
    pub(crate) relations_entities: Option<&'a Table>,
    pub(crate) evaluations: Option<&'a Table>,
    pub(crate) evaluations_entities: Option<&'a Table>,
}

impl<'a> AbsaView<'a> {
    /// Builds a view from whichever ABSA tables are available.
    pub fn from_tables<F>(mut lookup: F) -> Self
    where
        F: FnMut(TableName) -> Option<&'a Table>,
    {
        Self {
            entities: lookup(TableName::AbsaEntities),
            normalized_texts: lookup(TableName::AbsaNormalizedTexts),
            relations: lookup(TableName::AbsaRelations),
            relations_entities: lookup(TableName::AbsaRelationsEntities),
            evaluations: lookup(TableName::AbsaEvaluations),
            evaluations_entities: lookup(TableName::AbsaEvaluationsEntities),
        }
    }

    pub fn table(&self, name: TableName) -> Result<&'a Table> {
        let table = match name {
            TableName::AbsaEntities => self.entities,
            TableName::AbsaNormalizedTexts => self.normalized_texts,
            TableName::AbsaRelations => self.relations,
            TableName::AbsaRelationsEntities => self.relations_entities,
            TableName::AbsaEvaluations => self.evaluations,
            TableName::AbsaEvaluationsEntities => self.evaluations_entities,
            _ => None,
        };
        table.ok_or_else(|| not_loaded(name))
    }

    fn occurrences(&self) -> Result<Occurrences<'a>> {
        Occurrences::from_table(self.table(TableName::AbsaEntities)?, ENTITY_COLUMNS)
    }

    /// Mentions of `entities`, in the order given.
    pub fn entity_frequency<S: AsRef<str>>(
        &self,
        entities: &[S],
        entity_type: &str,
        normalize: bool,
    ) -> Result<Vec<Score>> {
        self.occurrences()?
            .of_kind(entity_type)
            .frequency(entities, normalize)
    }

    pub fn most_common_entities(
        &self,
        n: usize,
        entity_type: &str,
        normalize: bool,
    ) -> Result<Vec<Score>> {
        Ok(self.occurrences()?.of_kind(entity_type).most_common(n, normalize))
    }

    pub fn least_common_entities(
        &self,
        n: usize,
        entity_type: &str,
        normalize: bool,
    ) -> Result<Vec<Score>> {
        Ok(self.occurrences()?.of_kind(entity_type).least_common(n, normalize))
    }

    pub fn co_occurring_entities(
        &self,
        entity: &str,
        n: usize,
        entity_type: &str,
    ) -> Result<Vec<Score>> {
        Ok(self.occurrences()?.co_occurring(entity, entity_type, n))
    }

    /// Entities with the highest mean relation sentiment.
    pub fn best_rated_entities(&self, n: usize, entity_type: &str) -> Result<Vec<Score>> {
        Ok(rank(self.ratings(entity_type)?, SortOrder::Descending, n))
    }

    /// Entities with the lowest mean relation sentiment.
    pub fn worst_rated_entities(&self, n: usize, entity_type: &str) -> Result<Vec<Score>> {
        Ok(rank(self.ratings(entity_type)?, SortOrder::Ascending, n))
    }

    /// Mean relation sentiment of each entity in the order given; `None` when
    /// the entity was never rated.
    pub fn entity_sentiment<S: AsRef<str>>(
        &self,
        entities: &[S],
    ) -> Result<Vec<(String, Option<f64>)>> {
        let means: HashMap<String, f64> = self
            .ratings("")?
            .into_iter()
            .map(|score| (score.name, score.value))
            .collect();
        Ok(entities
            .iter()
            .map(|entity| {
                let entity = entity.as_ref();
                (entity.to_string(), means.get(entity).copied())
            })
            .collect())
    }

    /// Normalized texts mentioning each entity, in order of mention.
    ///
    /// A text is listed once per entity even when the entity occurs several
    /// times in it.
    pub fn entity_texts<S: AsRef<str>>(&self, entities: &[S]) -> Result<BTreeMap<String, Vec<String>>> {
        let table = self.table(TableName::AbsaEntities)?;
        let texts_table = self.table(TableName::AbsaNormalizedTexts)?;

        let mut texts: HashMap<(i64, i64), Vec<&str>> = HashMap::new();
        let scopes = texts_table.scopes()?;
        let normalized = texts_table.text_column("normalized_text")?;
        for (scope, text) in scopes.into_iter().zip(normalized.iter()) {
            texts.entry(scope).or_default().push(text.unwrap_or(""));
        }

        let mut result = empty_lists(entities);
        let names = table.text_column("entity_name")?;
        let mut seen: HashSet<(i64, i64, &str)> = HashSet::new();
        for (scope, name) in table.scopes()?.into_iter().zip(names.iter()) {
            let Some(name) = name else { continue };
            let Some(list) = result.get_mut(name) else {
                continue;
            };
            if !seen.insert((scope.0, scope.1, name)) {
                continue;
            }
            if let Some(found) = texts.get(&scope) {
                list.extend(found.iter().map(|t| t.to_string()));
            }
        }
        Ok(result)
    }

    /// Surface strings each entity was mentioned with, in row order.
    pub fn surface_strings<S: AsRef<str>>(
        &self,
        entities: &[S],
    ) -> Result<BTreeMap<String, Vec<String>>> {
        let table = self.table(TableName::AbsaEntities)?;
        let names = table.text_column("entity_name")?;
        let surfaces = table.text_column("surface_string")?;

        let mut result = empty_lists(entities);
        for (name, surface) in names.iter().zip(surfaces.iter()) {
            if let (Some(name), Some(surface)) = (name, surface) {
                if let Some(list) = result.get_mut(name) {
                    list.push(surface.to_string());
                }
            }
        }
        Ok(result)
    }

    /// See [`make_time_series`]. Counts entity mentions.
    pub fn make_time_series<S: AsRef<str>>(
        &self,
        entities: &[S],
        dates: &BTreeMap<i64, NaiveDate>,
        width: Duration,
        interval: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<Vec<TimeBucket>> {
        make_time_series(&self.occurrences()?, entities, dates, width, interval)
    }

    /// Mean sentiment per rated entity whose type starts with `entity_type`,
    /// in order of first appearance in `absa_relations_entities`.
    fn ratings(&self, entity_type: &str) -> Result<Vec<Score>> {
        let relations = self.table(TableName::AbsaRelations)?;
        let links = self.table(TableName::AbsaRelationsEntities)?;

        let mut sentiment: HashMap<(i64, i64, i64), f64> = HashMap::new();
        let relation_ids = relations.int_column("relation_id")?;
        let values = relations.float_column("sentiment_value")?;
        for (i, (doc, order)) in relations.scopes()?.into_iter().enumerate() {
            sentiment.insert((doc, order, relation_ids.value(i)), values.value(i));
        }

        let link_ids = links.int_column("relation_id")?;
        let kinds = links.text_column("entity_type")?;
        let names = links.text_column("entity_name")?;
        let rated = links
            .scopes()?
            .into_iter()
            .enumerate()
            .filter(|(i, _)| kinds.value(*i).starts_with(entity_type))
            .filter_map(|(i, (doc, order))| {
                sentiment
                    .get(&(doc, order, link_ids.value(i)))
                    .map(|value| (names.value(i), *value))
            });
        Ok(grouped_means(rated))
    }
}

fn empty_lists<S: AsRef<str>>(names: &[S]) -> BTreeMap<String, Vec<String>> {
    names
        .iter()
        .map(|name| (name.as_ref().to_string(), Vec::new()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnacodeError;
    use crate::test_fixtures::{
        absa_entities_table, normalized_texts_table, relations_entities_table, relations_table,
    };

    struct Fixture {
        entities: Table,
        texts: Table,
        relations: Table,
        links: Table,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                entities: absa_entities_table(&[
                    (0, 0, "Size", "feature_quantitative", "size"),
                    (0, 0, "Size", "feature_quantitative", "big"),
                    (0, 0, "Color", "feature_subjective", "color"),
                    (1, 0, "Size", "feature_quantitative", "dimensions"),
                    (1, 0, "Apple", "brand", "apple"),
                ]),
                texts: normalized_texts_table(&[(0, 0, "first text"), (1, 0, "second text")]),
                relations: relations_table(&[(0, 0, 0, 2.0), (0, 0, 1, -1.0), (1, 0, 0, 1.0)]),
                links: relations_entities_table(&[
                    (0, 0, 0, "feature_quantitative", "Size"),
                    (0, 0, 1, "feature_subjective", "Color"),
                    (1, 0, 0, "feature_quantitative", "Size"),
                    (1, 0, 0, "brand", "Apple"),
                ]),
            }
        }

        fn view(&self) -> AbsaView<'_> {
            AbsaView {
                entities: Some(&self.entities),
                normalized_texts: Some(&self.texts),
                relations: Some(&self.relations),
                relations_entities: Some(&self.links),
                ..AbsaView::default()
            }
        }
    }

    #[test]
    fn test_entity_counts() {
        let fixture = Fixture::new();
        let view = fixture.view();
        let scores = view.entity_frequency(&["Color", "Size"], "", false).unwrap();
        assert_eq!(scores, vec![Score::new("Color", 1.0), Score::new("Size", 3.0)]);
        let most = view.most_common_entities(1, "feature", true).unwrap();
        assert_eq!(most, vec![Score::new("Size", 0.75)]);
        let least = view.least_common_entities(2, "", false).unwrap();
        assert_eq!(least, vec![Score::new("Color", 1.0), Score::new("Apple", 1.0)]);
        let neighbours = view.co_occurring_entities("size", 5, "").unwrap();
        assert_eq!(neighbours, vec![Score::new("Color", 1.0), Score::new("Apple", 1.0)]);
    }

    #[test]
    fn test_rated_entities() {
        let fixture = Fixture::new();
        let view = fixture.view();
        assert_eq!(
            view.best_rated_entities(5, "").unwrap(),
            vec![
                Score::new("Size", 1.5),
                Score::new("Apple", 1.0),
                Score::new("Color", -1.0)
            ]
        );
        assert_eq!(
            view.worst_rated_entities(1, "feature").unwrap(),
            vec![Score::new("Color", -1.0)]
        );
        assert_eq!(
            view.entity_sentiment(&["Apple", "Battery"]).unwrap(),
            vec![("Apple".to_string(), Some(1.0)), ("Battery".to_string(), None)]
        );
    }

    #[test]
    fn test_entity_texts_once_per_text() {
        let fixture = Fixture::new();
        let texts = fixture.view().entity_texts(&["Size", "Battery"]).unwrap();
        assert_eq!(texts["Size"], vec!["first text", "second text"]);
        assert!(texts["Battery"].is_empty());
    }

    #[test]
    fn test_surface_strings() {
        let fixture = Fixture::new();
        let surfaces = fixture.view().surface_strings(&["Size"]).unwrap();
        assert_eq!(surfaces["Size"], vec!["size", "big", "dimensions"]);
    }

    #[test]
    fn test_ratings_need_relation_tables() {
        let fixture = Fixture::new();
        let view = AbsaView {
            entities: Some(&fixture.entities),
            ..AbsaView::default()
        };
        assert!(view.most_common_entities(3, "", false).is_ok());
        assert!(matches!(
            view.best_rated_entities(3, ""),
            Err(AnacodeError::MissingTable { .. })
        ));
    }
}
