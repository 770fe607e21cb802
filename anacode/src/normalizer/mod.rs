//! Flattening of raw API responses into rows of the fixed tables.
//!
//! A response covers a list of texts submitted in one call invocation. All rows
//! produced from it share one `doc_id`; `text_order` is the index of the text
//! in the submitted list. Every call type keeps its own `doc_id` counter.
//!
//! Normalization is all-or-nothing: [`normalize_call`] either returns the
//! complete set of batches for the invocation or an error, and
//! [`Normalizer::commit`] advances the counter only once the caller has
//! stored those batches.

use std::collections::BTreeMap;

use arrow::record_batch::RecordBatch;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::{AnacodeError, Result};
use crate::schema::{CallType, TableName};
use crate::table::{Datum, TableBuilder};

pub mod wire;

use wire::{AbsaText, CategoriesText, ConceptsText, SentimentText};

/// Rows produced by normalizing one call invocation.
#[derive(Debug, Clone)]
pub struct NormalizedCall {
    pub call: CallType,
    pub doc_id: i64,
    /// Number of texts in the response.
    pub texts: usize,
    /// One batch for every table of `call`, possibly with zero rows.
    pub batches: Vec<(TableName, RecordBatch)>,
}

impl NormalizedCall {
    /// Counter value for the next invocation of the same call type.
    pub fn next_doc_id(&self) -> i64 {
        self.doc_id + 1
    }

    pub fn num_rows(&self, table: TableName) -> usize {
        self.batches
            .iter()
            .find(|(name, _)| *name == table)
            .map(|(_, batch)| batch.num_rows())
            .unwrap_or(0)
    }
}

/// Per-call-type `doc_id` counters.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    next_ids: BTreeMap<CallType, i64>,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The `doc_id` the next invocation of `call` will receive.
    pub fn next_doc_id(&self, call: CallType) -> i64 {
        self.next_ids.get(&call).copied().unwrap_or(0)
    }

    /// Normalizes `response` with the current counter of `call` without
    /// advancing it.
    pub fn normalize(&self, call: CallType, response: &Value) -> Result<NormalizedCall> {
        normalize_call(call, response, self.next_doc_id(call))
    }

    /// Advances the counter past a stored invocation.
    pub fn commit(&mut self, normalized: &NormalizedCall) {
        let next = self.next_ids.entry(normalized.call).or_insert(0);
        *next = (*next).max(normalized.next_doc_id());
    }
}

/// Converts one call's response into batches for every table of that call.
#[instrument(skip(response))]
pub fn normalize_call(call: CallType, response: &Value, doc_id: i64) -> Result<NormalizedCall> {
    let items = response.as_array().ok_or_else(|| {
        AnacodeError::schema(call.as_str(), "expected a sequence of per-text results")
    })?;

    let batches = match call {
        CallType::Categories => categories_rows(doc_id, &decode::<CategoriesText>(call, items)?)?,
        CallType::Concepts => concepts_rows(doc_id, &decode::<ConceptsText>(call, items)?)?,
        CallType::Sentiment => sentiment_rows(doc_id, &decode::<SentimentText>(call, items)?)?,
        CallType::Absa => absa_rows(doc_id, &decode::<AbsaText>(call, items)?)?,
    };

    debug!(
        texts = items.len(),
        rows = batches.iter().map(|(_, b)| b.num_rows()).sum::<usize>(),
        "normalized response"
    );

    Ok(NormalizedCall {
        call,
        doc_id,
        texts: items.len(),
        batches,
    })
}

fn decode<T>(call: CallType, items: &[Value]) -> Result<Vec<T>>
where
    T: for<'de> Deserialize<'de>,
{
    items
        .iter()
        .enumerate()
        .map(|(order, item)| {
            T::deserialize(item)
                .map_err(|e| AnacodeError::schema(call.as_str(), format!("text {order}: {e}")))
        })
        .collect()
}

fn finish(builders: Vec<TableBuilder>) -> Result<Vec<(TableName, RecordBatch)>> {
    builders
        .into_iter()
        .map(|b| {
            let name = b.name();
            Ok((name, b.finish()?))
        })
        .collect()
}

fn categories_rows(doc_id: i64, texts: &[CategoriesText]) -> Result<Vec<(TableName, RecordBatch)>> {
    let mut categories = TableBuilder::new(TableName::Categories);
    for (order, labels) in texts.iter().enumerate() {
        let order = order as i64;
        for label in labels {
            categories.push(&[
                Datum::Int(doc_id),
                Datum::Int(order),
                Datum::Text(&label.label),
                Datum::Float(label.probability),
            ])?;
        }
    }
    finish(vec![categories])
}

fn concepts_rows(doc_id: i64, texts: &[ConceptsText]) -> Result<Vec<(TableName, RecordBatch)>> {
    let mut concepts = TableBuilder::new(TableName::Concepts);
    let mut expressions = TableBuilder::new(TableName::ConceptsExpressions);
    for (order, found) in texts.iter().enumerate() {
        let order = order as i64;
        for concept in found.iter().flatten() {
            concepts.push(&[
                Datum::Int(doc_id),
                Datum::Int(order),
                Datum::Text(&concept.concept),
                Datum::Int(concept.freq),
                Datum::Float(concept.relevance_score),
                Datum::Text(&concept.concept_type),
            ])?;
            for (expression, count) in &concept.expressions {
                for _ in 0..*count {
                    expressions.push(&[
                        Datum::Int(doc_id),
                        Datum::Int(order),
                        Datum::Text(&concept.concept),
                        Datum::Text(expression),
                    ])?;
                }
            }
        }
    }
    finish(vec![concepts, expressions])
}

fn sentiment_rows(doc_id: i64, texts: &[SentimentText]) -> Result<Vec<(TableName, RecordBatch)>> {
    let mut sentiments = TableBuilder::new(TableName::Sentiments);
    for (order, labels) in texts.iter().enumerate() {
        let probability = |wanted: &str| {
            labels
                .iter()
                .find(|l| l.label == wanted)
                .map(|l| l.probability)
                .ok_or_else(|| {
                    AnacodeError::schema(
                        CallType::Sentiment.as_str(),
                        format!("text {order}: missing '{wanted}' label"),
                    )
                })
        };
        let positive = probability("positive")?;
        let negative = probability("negative")?;
        sentiments.push(&[
            Datum::Int(doc_id),
            Datum::Int(order as i64),
            Datum::Float(positive),
            Datum::Float(negative),
        ])?;
    }
    finish(vec![sentiments])
}

fn absa_rows(doc_id: i64, texts: &[AbsaText]) -> Result<Vec<(TableName, RecordBatch)>> {
    let mut entities = TableBuilder::new(TableName::AbsaEntities);
    let mut normalized = TableBuilder::new(TableName::AbsaNormalizedTexts);
    let mut relations = TableBuilder::new(TableName::AbsaRelations);
    let mut relation_entities = TableBuilder::new(TableName::AbsaRelationsEntities);
    let mut evaluations = TableBuilder::new(TableName::AbsaEvaluations);
    let mut evaluation_entities = TableBuilder::new(TableName::AbsaEvaluationsEntities);

    for (order, text) in texts.iter().enumerate() {
        let order = order as i64;

        for entity in &text.entities {
            let span = entity.text.text_span();
            for semantic in &entity.semantics {
                entities.push(&[
                    Datum::Int(doc_id),
                    Datum::Int(order),
                    Datum::Text(&semantic.value),
                    Datum::Text(&semantic.kind),
                    Datum::Text(&entity.text.surface_string),
                    Datum::Text(&span),
                ])?;
            }
        }

        normalized.push(&[
            Datum::Int(doc_id),
            Datum::Int(order),
            Datum::Text(&text.normalized_text),
        ])?;

        for (relation_id, relation) in text.relations.iter().enumerate() {
            let relation_id = relation_id as i64;
            let semantics = &relation.semantics;
            let span = relation.text.text_span();
            relations.push(&[
                Datum::Int(doc_id),
                Datum::Int(order),
                Datum::Int(relation_id),
                semantics.opinion_holder.as_deref().map_or(Datum::Null, Datum::Text),
                semantics.restriction.as_deref().map_or(Datum::Null, Datum::Text),
                Datum::Float(semantics.value),
                Datum::Bool(relation.is_external),
                Datum::Text(&relation.text.surface_string),
                Datum::Text(&span),
            ])?;
            for entity in semantics.entity.iter().flatten() {
                relation_entities.push(&[
                    Datum::Int(doc_id),
                    Datum::Int(order),
                    Datum::Int(relation_id),
                    Datum::Text(&entity.kind),
                    Datum::Text(&entity.value),
                ])?;
            }
        }

        for (evaluation_id, evaluation) in text.evaluations.iter().enumerate() {
            let evaluation_id = evaluation_id as i64;
            let span = evaluation.text.text_span();
            evaluations.push(&[
                Datum::Int(doc_id),
                Datum::Int(order),
                Datum::Int(evaluation_id),
                Datum::Float(evaluation.semantics.value),
                Datum::Text(&evaluation.text.surface_string),
                Datum::Text(&span),
            ])?;
            for entity in evaluation.semantics.entity.iter().flatten() {
                evaluation_entities.push(&[
                    Datum::Int(doc_id),
                    Datum::Int(order),
                    Datum::Int(evaluation_id),
                    Datum::Text(&entity.kind),
                    Datum::Text(&entity.value),
                ])?;
            }
        }
    }

    finish(vec![
        entities,
        normalized,
        relations,
        relation_entities,
        evaluations,
        evaluation_entities,
    ])
}
