//! End-to-end queries over responses written through the public API.

mod common;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use anacode::prelude::*;
use chrono::{Duration, NaiveDate};
use common::{
    absa_response, categories_response, combined_response, concepts_response, sentiment_response,
    write_reviews,
};
use serde_json::Value;

const EPSILON: f64 = 1e-9;

fn reviews() -> DatasetLoader {
    let mut writer = AnalysisWriter::default();
    write_reviews(&mut writer, 1);
    DatasetLoader::from_writer(&writer).unwrap()
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
}

#[test]
fn test_categories_and_sentiment() {
    let loader = reviews();

    let categories = loader.categories().unwrap().categories().unwrap();
    let names: Vec<&str> = categories.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["it", "auto", "hr"]);
    assert!((categories[0].value - 0.65).abs() < EPSILON);

    let average = loader.sentiments().unwrap().average_sentiment().unwrap();
    assert!((average - 0.2).abs() < EPSILON);
}

#[test]
fn test_concept_rankings() {
    let concepts = reviews();
    let concepts = concepts.concepts().unwrap();

    let frequency = concepts
        .concept_frequency(&["Screen", "Lenovo", "Keyboard"], "", true)
        .unwrap();
    assert!((frequency[0].value - 2.0 / 6.0).abs() < EPSILON);
    assert!((frequency[1].value - 3.0 / 6.0).abs() < EPSILON);
    assert_eq!(frequency[2], Score::new("Keyboard", 0.0));

    assert_eq!(
        concepts.most_common_concepts(5, "feature", false).unwrap(),
        vec![Score::new("Screen", 2.0), Score::new("BatteryLife", 1.0)]
    );
    assert_eq!(
        concepts.least_common_concepts(1, "", false).unwrap(),
        vec![Score::new("BatteryLife", 1.0)]
    );
    assert_eq!(
        concepts.co_occurring_concepts("lenovo", 5, "feature").unwrap(),
        vec![Score::new("Screen", 2.0), Score::new("BatteryLife", 1.0)]
    );
    assert_eq!(
        concepts.surface_strings(&["Screen"]).unwrap()["Screen"],
        vec!["display".to_string(), "screen".to_string()]
    );
}

#[test]
fn test_idf_filtered_word_cloud() {
    let loader = reviews();
    let concepts = loader.concepts().unwrap();

    let idf = concepts.concept_idf(&["Lenovo", "Screen"], "").unwrap();
    assert_eq!(idf[0].value, 0.0);
    assert!((idf[1].value - 2f64.ln()).abs() < EPSILON);

    let filter = concepts.make_idf_filter(0.5, "").unwrap();
    let cloud = concepts
        .word_cloud_frequencies(10, "", |concept| filter.passes(concept))
        .unwrap();
    assert_eq!(
        cloud,
        vec![Score::new("Screen", 2.0), Score::new("BatteryLife", 1.0)]
    );
}

#[test]
fn test_absa_queries() {
    let loader = reviews();
    let absa = loader.absa().unwrap();

    assert_eq!(
        absa.most_common_entities(1, "", false).unwrap(),
        vec![Score::new("Lenovo", 2.0)]
    );
    assert_eq!(
        absa.co_occurring_entities("Lenovo", 5, "").unwrap(),
        vec![Score::new("BatteryLife", 1.0), Score::new("Screen", 1.0)]
    );
    assert_eq!(
        absa.best_rated_entities(1, "").unwrap(),
        vec![Score::new("BatteryLife", 2.0)]
    );
    assert_eq!(
        absa.worst_rated_entities(1, "feature").unwrap(),
        vec![Score::new("Screen", -1.5)]
    );
    assert_eq!(
        absa.entity_sentiment(&["Screen", "Lenovo"]).unwrap(),
        vec![("Screen".to_string(), Some(-1.5)), ("Lenovo".to_string(), None)]
    );
    assert_eq!(
        absa.surface_strings(&["Lenovo"]).unwrap()["Lenovo"],
        vec!["lenovo".to_string(), "lenovo".to_string()]
    );
}

#[test]
fn test_concept_time_series() {
    let mut writer = AnalysisWriter::default();
    write_reviews(&mut writer, 2);
    let loader = DatasetLoader::from_writer(&writer).unwrap();
    let dates = BTreeMap::from([(0, date(1)), (1, date(3))]);

    let series = loader
        .concepts()
        .unwrap()
        .make_time_series(&["Lenovo"], &dates, Duration::days(1), None)
        .unwrap();
    let counts: Vec<(NaiveDate, i64)> = series.iter().map(|b| (b.start, b.count)).collect();
    // The document dated on the last day falls outside the default interval.
    assert_eq!(counts, [(date(1), 3), (date(2), 0)]);

    let explicit = loader
        .absa()
        .unwrap()
        .make_time_series(&["Lenovo"], &dates, Duration::days(3), Some((date(1), date(4))))
        .unwrap();
    assert_eq!(explicit.len(), 1);
    assert_eq!(explicit[0].count, 4);
}

#[test]
fn test_filter_and_remove_concepts() {
    let mut writer = AnalysisWriter::default();
    write_reviews(&mut writer, 3);
    let loader = DatasetLoader::from_writer(&writer).unwrap();

    let second = loader.filter([1]).unwrap();
    for table in second.tables() {
        let docs = table.int_column("doc_id").unwrap();
        assert!(docs.iter().all(|doc| doc == Some(1)), "{}", table.name());
    }
    assert_eq!(second.table("categories").unwrap().num_rows(), 6);

    let without = loader.remove_concepts(&["Lenovo"]).unwrap();
    let top = without.concepts().unwrap().most_common_concepts(1, "", false).unwrap();
    assert_eq!(top, vec![Score::new("Screen", 6.0)]);
    assert_eq!(
        without.table("concepts_expressions").unwrap().num_rows(),
        loader.table("concepts_expressions").unwrap().num_rows()
    );
}

#[test]
fn test_from_lists_loads_only_given_call_types() {
    let concepts = [concepts_response(), concepts_response()];
    let categories = [categories_response()];
    let loader = DatasetLoader::from_lists([
        (CallType::Concepts, &concepts[..]),
        (CallType::Categories, &categories[..]),
    ])
    .unwrap();

    assert!(loader.has(CallType::Concepts));
    assert!(!loader.has(CallType::Absa));
    assert!(matches!(
        loader.sentiments(),
        Err(AnacodeError::MissingTable { .. })
    ));
    let docs = loader.table("concepts").unwrap().int_column("doc_id").unwrap();
    assert_eq!(docs.values().last(), Some(&1));
    assert_eq!(loader.table("categories").unwrap().num_rows(), 6);
}

/// Answers every request with the review fixtures trimmed to the batch size.
struct ReviewTransport {
    requests: AtomicUsize,
}

impl AnalysisTransport for ReviewTransport {
    fn analyze(&self, texts: &[String], analyses: &[CallType]) -> anacode::Result<Value> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let full = combined_response();
        let mut response = serde_json::Map::new();
        for call in analyses {
            let per_text = full[call.as_str()].as_array().cloned().unwrap_or_default();
            let trimmed: Vec<Value> = per_text.into_iter().cycle().take(texts.len()).collect();
            response.insert(call.as_str().to_string(), Value::Array(trimmed));
        }
        Ok(Value::Object(response))
    }
}

#[test]
fn test_bulk_analysis_feeds_the_loader() {
    let transport = ReviewTransport {
        requests: AtomicUsize::new(0),
    };
    let texts: Vec<String> = (0..10).map(|i| format!("review number {i}")).collect();
    let mut writer = AnalysisWriter::default();

    let report = BulkAnalyzer::new(&transport)
        .with_workers(3)
        .with_max_request_bytes(150)
        .analyze(&mut writer, &texts, &[CallType::Sentiment, CallType::Absa])
        .unwrap();
    assert_eq!(report.requests, transport.requests.load(Ordering::SeqCst));
    assert!(report.requests > 1);

    let loader = DatasetLoader::from_writer(&writer).unwrap();
    assert_eq!(loader.table("sentiments").unwrap().num_rows(), texts.len());
    assert_eq!(
        loader.table("absa_normalized_texts").unwrap().num_rows(),
        texts.len()
    );
    assert!(!loader.has(CallType::Categories));
    assert_eq!(writer.next_doc_id(CallType::Absa), report.requests as i64);
}

#[test]
fn test_separate_calls_keep_separate_ids() {
    let mut writer = AnalysisWriter::default();
    assert_eq!(writer.write_sentiment(&sentiment_response()).unwrap(), 0);
    assert_eq!(writer.write_absa(&absa_response()).unwrap(), 0);
    assert_eq!(writer.write_sentiment(&sentiment_response()).unwrap(), 1);
    assert_eq!(writer.next_doc_id(CallType::Absa), 1);
}
