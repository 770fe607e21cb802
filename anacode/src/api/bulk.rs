use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::error::{AnacodeError, Result};
use crate::schema::CallType;
use crate::store::TableStore;
use crate::writer::AnalysisWriter;

use super::{optimal_requests, AnalysisTransport, MAX_REQUEST_BYTES};

/// Outcome of a successful [`BulkAnalyzer::analyze`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkReport {
    /// Number of requests sent.
    pub requests: usize,
    /// `doc_id` assigned per call type, indexed by request in text order.
    pub doc_ids: Vec<BTreeMap<CallType, i64>>,
}

/// Sends batched analyze requests from a bounded pool of worker threads.
///
/// Responses are written as they arrive, one at a time, so every call type's
/// `doc_id` allocation and row appends stay atomic. The first transport or
/// normalization error stops the dispatch of further requests; requests
/// already in flight finish but their responses are discarded.
pub struct BulkAnalyzer<'t, T: AnalysisTransport + ?Sized> {
    transport: &'t T,
    workers: usize,
    max_request_bytes: usize,
}

impl<'t, T: AnalysisTransport + ?Sized> BulkAnalyzer<'t, T> {
    pub fn new(transport: &'t T) -> Self {
        Self {
            transport,
            workers: 1,
            max_request_bytes: MAX_REQUEST_BYTES,
        }
    }

    /// Number of concurrent requests. Zero is treated as one.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_max_request_bytes(mut self, max_request_bytes: usize) -> Self {
        self.max_request_bytes = max_request_bytes;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Analyzes `texts` and writes every response into `writer`.
    #[instrument(skip(self, writer, texts), fields(texts = texts.len(), workers = self.workers))]
    pub fn analyze<S: TableStore>(
        &self,
        writer: &mut AnalysisWriter<S>,
        texts: &[String],
        analyses: &[CallType],
    ) -> Result<BulkReport> {
        if analyses.is_empty() {
            return Err(AnacodeError::invalid_argument(
                "at least one analysis is required",
            ));
        }
        let batches = optimal_requests(texts, analyses, self.max_request_bytes)?;
        let requests = batches.len();

        let writer = Mutex::new(writer);
        let next = AtomicUsize::new(0);
        let stop = AtomicBool::new(false);
        let first_error: Mutex<Option<AnacodeError>> = Mutex::new(None);
        let written: Mutex<Vec<(usize, BTreeMap<CallType, i64>)>> = Mutex::new(Vec::new());

        let fail = |error: AnacodeError| {
            stop.store(true, Ordering::SeqCst);
            let mut slot = first_error.lock();
            if slot.is_none() {
                *slot = Some(error);
            } else {
                debug!(error = %error, "dropping error after the first failure");
            }
        };

        let panicked = thread::scope(|scope| {
            let workers = self.workers.min(requests);
            let mut handles = Vec::with_capacity(workers);
            for _ in 0..workers {
                handles.push(scope.spawn(|| loop {
                    if stop.load(Ordering::SeqCst) {
                        break;
                    }
                    let index = next.fetch_add(1, Ordering::SeqCst);
                    let Some(batch) = batches.get(index) else {
                        break;
                    };
                    let response = match self.transport.analyze(batch, analyses) {
                        Ok(response) => response,
                        Err(error) => {
                            fail(error);
                            break;
                        }
                    };
                    if stop.load(Ordering::SeqCst) {
                        break;
                    }
                    let mut guard = writer.lock();
                    match guard.write_analysis(&response) {
                        Ok(ids) => written.lock().push((index, ids)),
                        Err(error) => {
                            fail(error);
                            break;
                        }
                    }
                }));
            }
            handles
                .into_iter()
                .map(|handle| handle.join())
                .filter(|joined| joined.is_err())
                .count()
        });

        if panicked > 0 {
            warn!(workers = panicked, "analysis workers panicked");
            return Err(AnacodeError::transport(format!(
                "{panicked} analysis worker(s) panicked"
            )));
        }
        if let Some(error) = first_error.into_inner() {
            return Err(error);
        }

        let mut written = written.into_inner();
        written.sort_by_key(|(index, _)| *index);
        info!(requests, "bulk analysis finished");
        Ok(BulkReport {
            requests,
            doc_ids: written.into_iter().map(|(_, ids)| ids).collect(),
        })
    }
}
