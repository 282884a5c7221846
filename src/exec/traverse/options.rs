use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::types::{Result, TagId, Timestamp, TraverseError};

use super::condition::Condition;

/// Worker pool size used when none is configured.
pub const DEFAULT_WORKERS: usize = 5;
/// Upstream rows requested per batch when none is configured.
pub const DEFAULT_BATCH_SIZE: usize = 1024;
/// Longest accepted condition chain. A worker may expand one nested task
/// per hop on its own stack when the task queue is full.
pub const MAX_CHAIN_LEN: usize = 64;

/// Configuration fixed when a [`super::TraverseExec`] is constructed.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TraverseOptions {
    /// Hops to follow, in order. Its length is the number of hops.
    pub chain: Vec<Condition>,
    /// Column of the upstream rows holding the starting vertex id.
    pub vertex_id_offset: usize,
    /// Row tag materialized for each terminal vertex.
    pub result_tag: TagId,
    /// Number of worker threads expanding hops.
    pub workers: usize,
    /// Snapshot timestamp the traversal reads at.
    pub read_ts: Timestamp,
    /// Rows requested from the upstream source per batch.
    pub batch_size: usize,
    /// Task queue capacity; defaults to the worker count.
    pub queue_capacity: Option<usize>,
    /// Result channel capacity; defaults to the worker count.
    pub result_capacity: Option<usize>,
}

impl Default for TraverseOptions {
    fn default() -> Self {
        Self {
            chain: Vec::new(),
            vertex_id_offset: 0,
            result_tag: TagId(0),
            workers: DEFAULT_WORKERS,
            read_ts: Timestamp::MAX,
            batch_size: DEFAULT_BATCH_SIZE,
            queue_capacity: None,
            result_capacity: None,
        }
    }
}

impl TraverseOptions {
    /// Options following `chain` with every other setting at its default.
    pub fn new(chain: Vec<Condition>) -> Self {
        Self {
            chain,
            ..Self::default()
        }
    }

    /// Parses options from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|err| TraverseError::Config(err.to_string()))
    }

    /// Reads options from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Sets the column holding starting vertex ids.
    pub fn vertex_id_offset(mut self, offset: usize) -> Self {
        self.vertex_id_offset = offset;
        self
    }

    /// Sets the row tag to materialize.
    pub fn result_tag(mut self, tag: TagId) -> Self {
        self.result_tag = tag;
        self
    }

    /// Sets the worker pool size.
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Sets the snapshot read timestamp.
    pub fn read_ts(mut self, ts: Timestamp) -> Self {
        self.read_ts = ts;
        self
    }

    /// Sets the upstream batch size.
    pub fn batch_size(mut self, rows: usize) -> Self {
        self.batch_size = rows;
        self
    }

    /// Sets the task queue capacity.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    /// Sets the result channel capacity.
    pub fn result_capacity(mut self, capacity: usize) -> Self {
        self.result_capacity = Some(capacity);
        self
    }

    /// Rejects configurations the operator cannot run.
    pub fn validate(&self) -> Result<()> {
        if self.chain.is_empty() {
            return Err(TraverseError::Invalid("condition chain must not be empty"));
        }
        if self.chain.len() > MAX_CHAIN_LEN {
            return Err(TraverseError::Invalid("condition chain exceeds MAX_CHAIN_LEN hops"));
        }
        if self.workers == 0 {
            return Err(TraverseError::Invalid("worker pool size must be positive"));
        }
        if self.batch_size == 0 {
            return Err(TraverseError::Invalid("batch size must be positive"));
        }
        Ok(())
    }

    pub(crate) fn effective_queue_capacity(&self) -> usize {
        self.queue_capacity.unwrap_or(self.workers).max(1)
    }

    pub(crate) fn effective_result_capacity(&self) -> usize {
        self.result_capacity.unwrap_or(self.workers).max(1)
    }
}
