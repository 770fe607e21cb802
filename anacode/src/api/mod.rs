//! Boundary to the remote analysis service.
//!
//! HTTP and authentication live behind [`AnalysisTransport`]; this module
//! only decides how texts are split into requests and how concurrent
//! responses reach an [`AnalysisWriter`](crate::writer::AnalysisWriter).

use serde::Serialize;
use serde_json::Value;

use crate::error::{AnacodeError, Result};
use crate::schema::CallType;

mod bulk;

pub use bulk::{BulkAnalyzer, BulkReport};

/// Service endpoint used when `ANACODE_API_URL` is not set.
pub const DEFAULT_API_URL: &str = "https://api.anacode.de/";

/// Environment variable overriding the service endpoint.
pub const API_URL_ENV: &str = "ANACODE_API_URL";

/// Largest request body the service accepts.
pub const MAX_REQUEST_BYTES: usize = 1_000_000;

/// Base URL transports should post to.
pub fn default_base_url() -> String {
    std::env::var(API_URL_ENV)
        .ok()
        .filter(|url| !url.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string())
}

/// Performs one analyze request.
///
/// Implementations return the combined response object keyed by call type
/// (`{"categories": [...], "concepts": [...], ...}`) and own retries and
/// timeouts.
pub trait AnalysisTransport: Send + Sync {
    fn analyze(&self, texts: &[String], analyses: &[CallType]) -> Result<Value>;
}

#[derive(Serialize)]
struct RequestBody<'a, S: Serialize> {
    texts: &'a [S],
    analyses: &'a [CallType],
}

/// Splits `texts` into consecutive batches whose request body stays within
/// `max_bytes`.
///
/// Texts are never reordered. A text too large to fit into a request on its
/// own is an [`AnacodeError::InvalidArgument`].
pub fn optimal_requests<'a, S>(
    texts: &'a [S],
    analyses: &[CallType],
    max_bytes: usize,
) -> Result<Vec<&'a [S]>>
where
    S: AsRef<str> + Serialize,
{
    let empty: &[S] = &[];
    let base = serde_json::to_vec(&RequestBody {
        texts: empty,
        analyses,
    })?
    .len();

    let mut batches = Vec::new();
    let mut start = 0;
    let mut length = base;
    for (i, text) in texts.iter().enumerate() {
        // encoded text plus its separating comma
        let size = serde_json::to_vec(text.as_ref())?.len() + 1;
        if base + size > max_bytes {
            return Err(AnacodeError::invalid_argument(format!(
                "text {i} needs {} bytes, over the {max_bytes} byte request limit",
                base + size
            )));
        }
        if length + size > max_bytes {
            batches.push(&texts[start..i]);
            start = i;
            length = base;
        }
        length += size;
    }
    if start < texts.len() {
        batches.push(&texts[start..]);
    }
    Ok(batches)
}
