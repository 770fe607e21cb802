//! Error types for the anacode toolkit.
//!
//! Every fallible operation in the crate returns [`AnacodeError`]. The four
//! domain variants (`Schema`, `MissingTable`, `EmptyDataset`, `InvalidArgument`)
//! describe what went wrong with the caller's data or arguments; the remaining
//! variants wrap failures from the libraries underneath.

use thiserror::Error;

/// The main error type for the anacode crate.
#[derive(Error, Debug)]
pub enum AnacodeError {
    /// An API response did not have the shape the schema requires.
    #[error("Schema error in {call} response: {message}")]
    Schema {
        /// Call type (or table) whose input was malformed
        call: String,
        /// Detailed error message
        message: String,
    },

    /// A table required for the requested operation is not present.
    #[error("Missing table '{table}' ({path})")]
    MissingTable {
        /// Name of the absent table
        table: String,
        /// File name or location that was looked up
        path: String,
    },

    /// An aggregation needs at least one row and got none.
    #[error("Empty dataset: {0}")]
    EmptyDataset(String),

    /// A caller supplied argument is out of its valid domain.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Error from Arrow operations.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error from I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from JSON decoding outside of schema validation.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error reported by an analysis transport.
    #[error("Transport error: {0}")]
    Transport(String),
}

/// A type alias for `Result<T, AnacodeError>`.
pub type Result<T> = std::result::Result<T, AnacodeError>;

impl AnacodeError {
    /// Creates a new schema error for the given call type.
    pub fn schema(call: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Schema {
            call: call.into(),
            message: message.into(),
        }
    }

    /// Creates a new missing table error.
    pub fn missing_table(table: impl Into<String>, path: impl Into<String>) -> Self {
        Self::MissingTable {
            table: table.into(),
            path: path.into(),
        }
    }

    /// Creates a new empty dataset error.
    pub fn empty_dataset(message: impl Into<String>) -> Self {
        Self::EmptyDataset(message.into())
    }

    /// Creates a new invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Creates a new transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }
}

/// Extension trait for adding context to errors.
///
/// Domain variants keep their kind so callers can still match on them; only
/// the wrapped library errors are rewritten with the extra message.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, msg: &str) -> Result<T>;

    /// Adds context with a lazy message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<AnacodeError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.with_context(|| msg.to_string())
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| match e.into() {
            AnacodeError::Io(inner) => {
                AnacodeError::Io(std::io::Error::new(inner.kind(), format!("{}: {inner}", f())))
            }
            AnacodeError::Arrow(inner) => {
                AnacodeError::Arrow(arrow::error::ArrowError::ExternalError(
                    format!("{}: {inner}", f()).into(),
                ))
            }
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_display() {
        let err = AnacodeError::schema("absa", "relation 0 lacks sentiment_value");
        assert_eq!(
            err.to_string(),
            "Schema error in absa response: relation 0 lacks sentiment_value"
        );
    }

    #[test]
    fn test_missing_table_display() {
        let err = AnacodeError::missing_table("categories", "categories.csv");
        assert_eq!(
            err.to_string(),
            "Missing table 'categories' (categories.csv)"
        );
    }

    #[test]
    fn test_context_keeps_domain_variants() {
        let result: Result<()> = Err(AnacodeError::invalid_argument("n"));
        let err = result.context("during ranking").unwrap_err();
        assert!(matches!(err, AnacodeError::InvalidArgument(_)));
    }

    #[test]
    fn test_context_rewrites_io_errors() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no such file",
        ));
        let err = result.context("reading concepts.csv").unwrap_err();
        assert!(matches!(err, AnacodeError::Io(_)));
        assert!(err.to_string().contains("reading concepts.csv"));
    }
}
