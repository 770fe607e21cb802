//! Writes raw analysis responses into a [`TableStore`].
//!
//! Each write normalizes the response, appends the resulting batches and only
//! then advances the call type's `doc_id` counter. A response that fails to
//! normalize leaves both the store and the counters untouched.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::error::{AnacodeError, Result};
use crate::log_data_op;
use crate::logging::{truncate_field, LogConfig};
use crate::normalizer::{NormalizedCall, Normalizer};
use crate::schema::CallType;
use crate::store::{InMemoryStore, TableStore};

/// Normalizer and store pair that turns API responses into table rows.
#[derive(Debug)]
pub struct AnalysisWriter<S: TableStore = InMemoryStore> {
    normalizer: Normalizer,
    store: S,
    log_config: LogConfig,
}

impl Default for AnalysisWriter<InMemoryStore> {
    fn default() -> Self {
        Self::new(InMemoryStore::new())
    }
}

impl<S: TableStore> AnalysisWriter<S> {
    pub fn new(store: S) -> Self {
        Self {
            normalizer: Normalizer::new(),
            store,
            log_config: LogConfig::default(),
        }
    }

    pub fn with_log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// The `doc_id` the next write of `call` will receive.
    pub fn next_doc_id(&self, call: CallType) -> i64 {
        self.normalizer.next_doc_id(call)
    }

    /// Writes one response of `call` and returns the `doc_id` it was stored under.
    #[instrument(skip(self, response))]
    pub fn write(&mut self, call: CallType, response: &Value) -> Result<i64> {
        let normalized = self.normalizer.normalize(call, response)?;
        self.commit(&normalized)?;
        Ok(normalized.doc_id)
    }

    pub fn write_categories(&mut self, response: &Value) -> Result<i64> {
        self.write(CallType::Categories, response)
    }

    pub fn write_concepts(&mut self, response: &Value) -> Result<i64> {
        self.write(CallType::Concepts, response)
    }

    pub fn write_sentiment(&mut self, response: &Value) -> Result<i64> {
        self.write(CallType::Sentiment, response)
    }

    pub fn write_absa(&mut self, response: &Value) -> Result<i64> {
        self.write(CallType::Absa, response)
    }

    /// Writes a combined analysis object keyed by call type name.
    ///
    /// Every present call type is normalized before anything is appended, so a
    /// malformed section rejects the whole object. Returns the `doc_id`
    /// assigned to each written call type.
    #[instrument(skip(self, response))]
    pub fn write_analysis(&mut self, response: &Value) -> Result<BTreeMap<CallType, i64>> {
        let object = response.as_object().ok_or_else(|| {
            AnacodeError::schema("analysis", "expected an object keyed by call type")
        })?;
        for key in object.keys() {
            if key.parse::<CallType>().is_err() {
                warn!(
                    key = %truncate_field(key, self.log_config.max_field_length),
                    "ignoring unknown analysis section"
                );
            }
        }

        let mut normalized = Vec::new();
        for call in CallType::ALL {
            match object.get(call.as_str()) {
                None | Some(Value::Null) => {}
                Some(section) => normalized.push(self.normalizer.normalize(call, section)?),
            }
        }
        for call in &normalized {
            self.store.append_call(call)?;
        }

        let mut ids = BTreeMap::new();
        for call in &normalized {
            self.normalizer.commit(call);
            ids.insert(call.call, call.doc_id);
        }
        debug!(calls = ids.len(), "wrote combined analysis");
        Ok(ids)
    }

    /// Writes responses in order, stopping at the first failure.
    pub fn write_bulk<'a, I>(&mut self, responses: I) -> Result<Vec<i64>>
    where
        I: IntoIterator<Item = (CallType, &'a Value)>,
    {
        responses
            .into_iter()
            .map(|(call, response)| self.write(call, response))
            .collect()
    }

    pub fn flush(&mut self) -> Result<()> {
        self.store.flush()
    }

    fn commit(&mut self, normalized: &NormalizedCall) -> Result<()> {
        self.store.append_call(normalized)?;
        self.normalizer.commit(normalized);
        log_data_op!(
            self.log_config,
            call = %normalized.call,
            doc_id = normalized.doc_id,
            texts = normalized.texts,
            "wrote call"
        );
        Ok(())
    }
}
