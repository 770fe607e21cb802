//! Prelude for commonly used types and traits in anacode.

pub use crate::aggregation::{
    AbsaView, CategoriesView, ConceptsView, IdfFilter, Score, SentimentsView, TimeBucket,
};
pub use crate::api::{AnalysisTransport, BulkAnalyzer, BulkReport};
pub use crate::error::{AnacodeError, ErrorContext, Result};
pub use crate::loader::{DatasetLoader, LoadOptions};
pub use crate::logging::LogConfig;
pub use crate::schema::{CallType, TableName};
pub use crate::store::{CsvStore, InMemoryStore, TableStore};
pub use crate::table::Table;
pub use crate::writer::AnalysisWriter;
