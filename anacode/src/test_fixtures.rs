//! Small hand-built tables for unit tests.
//!
//! Columns not relevant to the aggregations under test get fixed filler
//! values.

use crate::schema::TableName;
use crate::table::{Datum, Table, TableBuilder};

fn build(table: TableName, rows: impl IntoIterator<Item = Vec<Datum<'static>>>) -> Table {
    let mut builder = TableBuilder::new(table);
    for row in rows {
        builder.push(&row).unwrap();
    }
    builder.finish_table().unwrap()
}

/// `(doc_id, text_order, category, probability)` rows.
pub fn categories_table(rows: &[(i64, i64, &'static str, f64)]) -> Table {
    build(
        TableName::Categories,
        rows.iter().map(|&(doc, order, category, probability)| {
            vec![
                Datum::Int(doc),
                Datum::Int(order),
                Datum::Text(category),
                Datum::Float(probability),
            ]
        }),
    )
}

/// `(doc_id, text_order, concept, freq, concept_type)` rows.
pub fn concepts_table(rows: &[(i64, i64, &'static str, i64, &'static str)]) -> Table {
    build(
        TableName::Concepts,
        rows.iter().map(|&(doc, order, concept, freq, kind)| {
            vec![
                Datum::Int(doc),
                Datum::Int(order),
                Datum::Text(concept),
                Datum::Int(freq),
                Datum::Float(1.0),
                Datum::Text(kind),
            ]
        }),
    )
}

/// `(doc_id, text_order, concept, expression)` rows.
pub fn expressions_table(rows: &[(i64, i64, &'static str, &'static str)]) -> Table {
    build(
        TableName::ConceptsExpressions,
        rows.iter().map(|&(doc, order, concept, expression)| {
            vec![
                Datum::Int(doc),
                Datum::Int(order),
                Datum::Text(concept),
                Datum::Text(expression),
            ]
        }),
    )
}

/// `(doc_id, text_order, positive, negative)` rows.
pub fn sentiments_table(rows: &[(i64, i64, f64, f64)]) -> Table {
    build(
        TableName::Sentiments,
        rows.iter().map(|&(doc, order, positive, negative)| {
            vec![
                Datum::Int(doc),
                Datum::Int(order),
                Datum::Float(positive),
                Datum::Float(negative),
            ]
        }),
    )
}

/// `(doc_id, text_order, entity_name, entity_type, surface_string)` rows.
pub fn absa_entities_table(
    rows: &[(i64, i64, &'static str, &'static str, &'static str)],
) -> Table {
    build(
        TableName::AbsaEntities,
        rows.iter().map(|&(doc, order, name, kind, surface)| {
            vec![
                Datum::Int(doc),
                Datum::Int(order),
                Datum::Text(name),
                Datum::Text(kind),
                Datum::Text(surface),
                Datum::Text("0-1"),
            ]
        }),
    )
}

/// `(doc_id, text_order, normalized_text)` rows.
pub fn normalized_texts_table(rows: &[(i64, i64, &'static str)]) -> Table {
    build(
        TableName::AbsaNormalizedTexts,
        rows.iter()
            .map(|&(doc, order, text)| vec![Datum::Int(doc), Datum::Int(order), Datum::Text(text)]),
    )
}

/// `(doc_id, text_order, relation_id, sentiment_value)` rows.
pub fn relations_table(rows: &[(i64, i64, i64, f64)]) -> Table {
    build(
        TableName::AbsaRelations,
        rows.iter().map(|&(doc, order, relation, sentiment)| {
            vec![
                Datum::Int(doc),
                Datum::Int(order),
                Datum::Int(relation),
                Datum::Null,
                Datum::Null,
                Datum::Float(sentiment),
                Datum::Bool(false),
                Datum::Text("surface"),
                Datum::Text("0-7"),
            ]
        }),
    )
}

/// `(doc_id, text_order, relation_id, entity_type, entity_name)` rows.
pub fn relations_entities_table(
    rows: &[(i64, i64, i64, &'static str, &'static str)],
) -> Table {
    build(
        TableName::AbsaRelationsEntities,
        rows.iter().map(|&(doc, order, relation, kind, name)| {
            vec![
                Datum::Int(doc),
                Datum::Int(order),
                Datum::Int(relation),
                Datum::Text(kind),
                Datum::Text(name),
            ]
        }),
    )
}
