//! Wire types of the per-text results returned by each analysis call.
//!
//! Unknown fields are ignored. Fields without a default are required and a
//! missing one fails deserialization, which the normalizer reports as a
//! schema error.

use std::collections::BTreeMap;

use serde::Deserialize;

/// `{label, probability}` pair used by both categories and sentiment.
#[derive(Debug, Clone, Deserialize)]
pub struct LabelProbability {
    pub label: String,
    pub probability: f64,
}

/// Categories result for one text.
pub type CategoriesText = Vec<LabelProbability>;

/// Sentiment result for one text; expected labels are `positive` and `negative`.
pub type SentimentText = Vec<LabelProbability>;

/// Concepts result for one text. The API sends `null` for texts without concepts.
pub type ConceptsText = Option<Vec<Concept>>;

#[derive(Debug, Clone, Deserialize)]
pub struct Concept {
    pub concept: String,
    pub freq: i64,
    pub relevance_score: f64,
    #[serde(rename = "type")]
    pub concept_type: String,
    /// Surface expression to number of occurrences in the text.
    #[serde(default)]
    pub expressions: BTreeMap<String, u64>,
}

/// A `[start, end]` character span with the text it covers.
#[derive(Debug, Clone, Deserialize)]
pub struct Surface {
    pub span: (i64, i64),
    pub surface_string: String,
}

impl Surface {
    /// Span rendered the way it is stored, `start-end`.
    pub fn text_span(&self) -> String {
        format!("{}-{}", self.span.0, self.span.1)
    }
}

/// Typed entity reference (`{type, value}`).
#[derive(Debug, Clone, Deserialize)]
pub struct Semantic {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

/// ABSA result for one text.
#[derive(Debug, Clone, Deserialize)]
pub struct AbsaText {
    pub entities: Vec<AbsaEntity>,
    pub normalized_text: String,
    pub relations: Vec<AbsaRelation>,
    pub evaluations: Vec<AbsaEvaluation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AbsaEntity {
    pub semantics: Vec<Semantic>,
    pub text: Surface,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AbsaRelation {
    #[serde(rename = "external_entity")]
    pub is_external: bool,
    pub semantics: RelationSemantics,
    pub text: Surface,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelationSemantics {
    #[serde(default)]
    pub entity: Option<Vec<Semantic>>,
    #[serde(default)]
    pub opinion_holder: Option<String>,
    #[serde(default)]
    pub restriction: Option<String>,
    #[serde(alias = "sentiment_value")]
    pub value: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AbsaEvaluation {
    pub semantics: EvaluationSemantics,
    pub text: Surface,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvaluationSemantics {
    #[serde(default)]
    pub entity: Option<Vec<Semantic>>,
    #[serde(alias = "sentiment_value")]
    pub value: f64,
}
