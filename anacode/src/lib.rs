//! # Anacode - Text Analytics Tables for Rust
//!
//! Anacode turns the nested JSON returned by a text-analytics service
//! (categories, concepts, sentiment and aspect-based sentiment) into a fixed
//! set of relational tables, and answers a closed family of aggregation
//! queries over them: frequencies, rankings, co-occurrence, ratings and
//! time-series buckets.
//!
//! ## Quick Start
//!
//! ```rust
//! use anacode::prelude::*;
//! use serde_json::json;
//!
//! # fn main() -> anacode::Result<()> {
//! let mut writer = AnalysisWriter::default();
//! writer.write_concepts(&json!([[
//!     {"concept": "Lenovo", "freq": 2, "relevance_score": 1.0, "type": "brand"},
//!     {"concept": "Screen", "freq": 1, "relevance_score": 0.4, "type": "feature_quantitative"}
//! ]]))?;
//!
//! let loader = DatasetLoader::from_writer(&writer)?;
//! let top = loader.concepts()?.most_common_concepts(1, "", false)?;
//! assert_eq!(top[0].name, "Lenovo");
//! # Ok(())
//! # }
//! ```
//!
//! ## Data Flow
//!
//! ```text
//! response JSON -> normalizer -> TableStore -> DatasetLoader -> views
//! ```
//!
//! - **`normalizer`**: flattens one call's response into rows, assigning a
//!   `doc_id` per invocation and a `text_order` per text
//! - **`store`**: append-only table storage, in memory or as CSV files
//! - **`writer`**: normalizer plus store; a response is stored completely or
//!   not at all
//! - **`loader`**: immutable datasets built from stores, raw responses or a
//!   directory of persisted tables
//! - **`aggregation`**: the per-call-type views and the shared occurrence
//!   engine they are built on
//! - **`api`**: request batching and bounded concurrent dispatch through a
//!   caller supplied transport
//!
//! ## Logging
//!
//! The crate emits `tracing` events and spans but never installs a
//! subscriber. Applications can use [`logging::setup::init_logging`] or
//! bring their own.

pub mod aggregation;
pub mod api;
pub mod error;
pub mod loader;
pub mod logging;
pub mod normalizer;
pub mod prelude;
pub mod schema;
pub mod store;
pub mod table;
pub mod writer;

pub use error::{AnacodeError, Result};

#[cfg(test)]
mod test_fixtures;
