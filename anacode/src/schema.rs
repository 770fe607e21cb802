//! Fixed relational schema produced from analysis responses.
//!
//! Each [`CallType`] owns a set of [`TableName`]s. Column order is fixed and
//! shared by the in-memory tables, the persisted CSV files and their header
//! rows.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{AnacodeError, Result};

/// One analysis operation offered by the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallType {
    Categories,
    Concepts,
    Sentiment,
    Absa,
}

impl CallType {
    pub const ALL: [CallType; 4] = [
        CallType::Categories,
        CallType::Concepts,
        CallType::Sentiment,
        CallType::Absa,
    ];

    /// Name used by the API for this analysis, also the key in combined responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Categories => "categories",
            Self::Concepts => "concepts",
            Self::Sentiment => "sentiment",
            Self::Absa => "absa",
        }
    }

    /// Tables populated by this call type, in persistence order.
    pub fn tables(&self) -> &'static [TableName] {
        match self {
            Self::Categories => &[TableName::Categories],
            Self::Concepts => &[TableName::Concepts, TableName::ConceptsExpressions],
            Self::Sentiment => &[TableName::Sentiments],
            Self::Absa => &[
                TableName::AbsaEntities,
                TableName::AbsaNormalizedTexts,
                TableName::AbsaRelations,
                TableName::AbsaRelationsEntities,
                TableName::AbsaEvaluations,
                TableName::AbsaEvaluationsEntities,
            ],
        }
    }
}

impl fmt::Display for CallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CallType {
    type Err = AnacodeError;

    fn from_str(s: &str) -> Result<Self> {
        CallType::ALL
            .into_iter()
            .find(|call| call.as_str() == s)
            .ok_or_else(|| AnacodeError::invalid_argument(format!("unknown call type '{s}'")))
    }
}

/// Storage class of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Int,
    Float,
    Text,
    /// Text that is legitimately absent in the source (`opinion_holder`, `restriction`).
    OptionalText,
    Bool,
}

impl ColumnKind {
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Int => DataType::Int64,
            Self::Float => DataType::Float64,
            Self::Text | Self::OptionalText => DataType::Utf8,
            Self::Bool => DataType::Boolean,
        }
    }
}

/// A named, typed column of one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: ColumnKind,
}

const fn col(name: &'static str, kind: ColumnKind) -> ColumnSpec {
    ColumnSpec { name, kind }
}

use ColumnKind::{Bool, Float, Int, OptionalText, Text};

const CATEGORIES: &[ColumnSpec] = &[
    col("doc_id", Int),
    col("text_order", Int),
    col("category", Text),
    col("probability", Float),
];

const CONCEPTS: &[ColumnSpec] = &[
    col("doc_id", Int),
    col("text_order", Int),
    col("concept", Text),
    col("freq", Int),
    col("relevance_score", Float),
    col("concept_type", Text),
];

const CONCEPTS_EXPRESSIONS: &[ColumnSpec] = &[
    col("doc_id", Int),
    col("text_order", Int),
    col("concept", Text),
    col("expression", Text),
];

const SENTIMENTS: &[ColumnSpec] = &[
    col("doc_id", Int),
    col("text_order", Int),
    col("positive", Float),
    col("negative", Float),
];

const ABSA_ENTITIES: &[ColumnSpec] = &[
    col("doc_id", Int),
    col("text_order", Int),
    col("entity_name", Text),
    col("entity_type", Text),
    col("surface_string", Text),
    col("text_span", Text),
];

const ABSA_NORMALIZED_TEXTS: &[ColumnSpec] = &[
    col("doc_id", Int),
    col("text_order", Int),
    col("normalized_text", Text),
];

const ABSA_RELATIONS: &[ColumnSpec] = &[
    col("doc_id", Int),
    col("text_order", Int),
    col("relation_id", Int),
    col("opinion_holder", OptionalText),
    col("restriction", OptionalText),
    col("sentiment_value", Float),
    col("is_external", Bool),
    col("surface_string", Text),
    col("text_span", Text),
];

const ABSA_RELATIONS_ENTITIES: &[ColumnSpec] = &[
    col("doc_id", Int),
    col("text_order", Int),
    col("relation_id", Int),
    col("entity_type", Text),
    col("entity_name", Text),
];

const ABSA_EVALUATIONS: &[ColumnSpec] = &[
    col("doc_id", Int),
    col("text_order", Int),
    col("evaluation_id", Int),
    col("sentiment_value", Float),
    col("surface_string", Text),
    col("text_span", Text),
];

const ABSA_EVALUATIONS_ENTITIES: &[ColumnSpec] = &[
    col("doc_id", Int),
    col("text_order", Int),
    col("evaluation_id", Int),
    col("entity_type", Text),
    col("entity_name", Text),
];

/// The ten output tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableName {
    Categories,
    Concepts,
    ConceptsExpressions,
    Sentiments,
    AbsaEntities,
    AbsaNormalizedTexts,
    AbsaRelations,
    AbsaRelationsEntities,
    AbsaEvaluations,
    AbsaEvaluationsEntities,
}

static SCHEMAS: Lazy<Vec<SchemaRef>> = Lazy::new(|| {
    TableName::ALL
        .iter()
        .map(|table| build_schema(table.columns()))
        .collect()
});

fn build_schema(columns: &[ColumnSpec]) -> SchemaRef {
    let fields: Vec<Field> = columns
        .iter()
        .map(|c| {
            let nullable = c.kind == ColumnKind::OptionalText;
            Field::new(c.name, c.kind.data_type(), nullable)
        })
        .collect();
    Arc::new(Schema::new(fields))
}

impl TableName {
    pub const ALL: [TableName; 10] = [
        TableName::Categories,
        TableName::Concepts,
        TableName::ConceptsExpressions,
        TableName::Sentiments,
        TableName::AbsaEntities,
        TableName::AbsaNormalizedTexts,
        TableName::AbsaRelations,
        TableName::AbsaRelationsEntities,
        TableName::AbsaEvaluations,
        TableName::AbsaEvaluationsEntities,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Categories => "categories",
            Self::Concepts => "concepts",
            Self::ConceptsExpressions => "concepts_expressions",
            Self::Sentiments => "sentiments",
            Self::AbsaEntities => "absa_entities",
            Self::AbsaNormalizedTexts => "absa_normalized_texts",
            Self::AbsaRelations => "absa_relations",
            Self::AbsaRelationsEntities => "absa_relations_entities",
            Self::AbsaEvaluations => "absa_evaluations",
            Self::AbsaEvaluationsEntities => "absa_evaluations_entities",
        }
    }

    /// File name of the live persisted table, e.g. `concepts.csv`.
    pub fn file_name(&self) -> String {
        format!("{}.csv", self.as_str())
    }

    /// File name of a backup snapshot, e.g. `concepts.csv_20161206180006`.
    pub fn backup_file_name(&self, suffix: &str) -> String {
        format!("{}_{suffix}", self.file_name())
    }

    pub fn call_type(&self) -> CallType {
        match self {
            Self::Categories => CallType::Categories,
            Self::Concepts | Self::ConceptsExpressions => CallType::Concepts,
            Self::Sentiments => CallType::Sentiment,
            _ => CallType::Absa,
        }
    }

    pub fn columns(&self) -> &'static [ColumnSpec] {
        match self {
            Self::Categories => CATEGORIES,
            Self::Concepts => CONCEPTS,
            Self::ConceptsExpressions => CONCEPTS_EXPRESSIONS,
            Self::Sentiments => SENTIMENTS,
            Self::AbsaEntities => ABSA_ENTITIES,
            Self::AbsaNormalizedTexts => ABSA_NORMALIZED_TEXTS,
            Self::AbsaRelations => ABSA_RELATIONS,
            Self::AbsaRelationsEntities => ABSA_RELATIONS_ENTITIES,
            Self::AbsaEvaluations => ABSA_EVALUATIONS,
            Self::AbsaEvaluationsEntities => ABSA_EVALUATIONS_ENTITIES,
        }
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns().iter().map(|c| c.name).collect()
    }

    /// Canonical arrow schema of this table.
    pub fn schema(&self) -> SchemaRef {
        SCHEMAS[*self as usize].clone()
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableName {
    type Err = AnacodeError;

    fn from_str(s: &str) -> Result<Self> {
        TableName::ALL
            .into_iter()
            .find(|table| table.as_str() == s)
            .ok_or_else(|| AnacodeError::invalid_argument(format!("unknown table '{s}'")))
    }
}
