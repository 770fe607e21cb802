//! Shared responses for the integration tests.
//!
//! The responses describe two short laptop reviews. Each builder returns one
//! call's payload as the service would send it.

#![allow(dead_code)]

use anacode::prelude::*;
use serde_json::{json, Value};

pub fn categories_response() -> Value {
    json!([
        [
            {"label": "auto", "probability": 0.1},
            {"label": "hr", "probability": 0.2},
            {"label": "it", "probability": 0.7}
        ],
        [
            {"label": "auto", "probability": 0.3},
            {"label": "hr", "probability": 0.1},
            {"label": "it", "probability": 0.6}
        ]
    ])
}

pub fn concepts_response() -> Value {
    json!([
        [
            {
                "concept": "Lenovo",
                "expressions": {"lenovo": 2},
                "freq": 2,
                "relevance_score": 1.0,
                "type": "brand"
            },
            {
                "concept": "BatteryLife",
                "expressions": {"battery": 1},
                "freq": 1,
                "relevance_score": 0.75,
                "type": "feature_quantitative"
            }
        ],
        [
            {
                "concept": "Lenovo",
                "expressions": {"联想": 1},
                "freq": 1,
                "relevance_score": 0.9,
                "type": "brand"
            },
            {
                "concept": "Screen",
                "expressions": {"screen": 1, "display": 1},
                "freq": 2,
                "relevance_score": 0.5,
                "type": "feature_subjective"
            }
        ]
    ])
}

pub fn sentiment_response() -> Value {
    json!([
        [{"label": "positive", "probability": 0.8}, {"label": "negative", "probability": 0.2}],
        [{"label": "negative", "probability": 0.6}, {"label": "positive", "probability": 0.4}]
    ])
}

fn entity(kind: &str, value: &str, surface: &str, span: (i64, i64)) -> Value {
    json!({
        "semantics": [{"type": kind, "value": value}],
        "text": {"span": [span.0, span.1], "surface_string": surface}
    })
}

pub fn absa_response() -> Value {
    json!([
        {
            "entities": [
                entity("brand", "Lenovo", "lenovo", (0, 6)),
                entity("feature_quantitative", "BatteryLife", "battery", (11, 18))
            ],
            "normalized_text": "lenovo has battery, it lasts long",
            "relations": [{
                "external_entity": false,
                "semantics": {
                    "entity": [{"type": "feature_quantitative", "value": "BatteryLife"}],
                    "opinion_holder": "reviewer",
                    "restriction": null,
                    "value": 2.0
                },
                "text": {"span": [11, 33], "surface_string": "battery, it lasts long"}
            }],
            "evaluations": [{
                "semantics": {
                    "entity": [{"type": "brand", "value": "Lenovo"}],
                    "value": 1.0
                },
                "text": {"span": [0, 6], "surface_string": "lenovo"}
            }]
        },
        {
            "entities": [
                entity("brand", "Lenovo", "lenovo", (0, 6)),
                entity("feature_subjective", "Screen", "screen", (13, 19))
            ],
            "normalized_text": "lenovo's dim screen",
            "relations": [{
                "external_entity": true,
                "semantics": {
                    "entity": [{"type": "feature_subjective", "value": "Screen"}],
                    "restriction": "indoors",
                    "sentiment_value": -1.5
                },
                "text": {"span": [9, 19], "surface_string": "dim screen"}
            }],
            "evaluations": []
        }
    ])
}

/// One combined analysis object, as returned when several analyses are
/// requested together.
pub fn combined_response() -> Value {
    json!({
        "categories": categories_response(),
        "concepts": concepts_response(),
        "sentiment": sentiment_response(),
        "absa": absa_response()
    })
}

/// Writes the combined response `times` times into `writer`.
pub fn write_reviews<S: TableStore>(writer: &mut AnalysisWriter<S>, times: usize) {
    for _ in 0..times {
        writer.write_analysis(&combined_response()).unwrap();
    }
}
