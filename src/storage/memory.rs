//! Multi-version in-memory key-value store.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use crate::types::{Result, Timestamp, TraverseError};

use super::kv::{KvIter, KvStore, Snapshot};

/// Versions of one key, keyed by commit timestamp. `None` is a tombstone.
type Versions = BTreeMap<Timestamp, Option<Vec<u8>>>;
type Table = BTreeMap<Vec<u8>, Versions>;

/// Ordered key-value store that keeps every committed version.
///
/// Cloning is cheap and yields a handle to the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    table: Arc<RwLock<Table>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes `value` under `key` as of `commit_ts`.
    pub fn put(&self, key: Vec<u8>, value: Vec<u8>, commit_ts: Timestamp) {
        self.table
            .write()
            .entry(key)
            .or_default()
            .insert(commit_ts, Some(value));
    }

    /// Hides `key` from snapshots at or after `commit_ts`.
    pub fn delete(&self, key: Vec<u8>, commit_ts: Timestamp) {
        self.table
            .write()
            .entry(key)
            .or_default()
            .insert(commit_ts, None);
    }

    /// Snapshot bound to this store at `read_ts`.
    pub fn snapshot_at(&self, read_ts: Timestamp) -> MemorySnapshot {
        MemorySnapshot {
            table: Arc::clone(&self.table),
            read_ts,
        }
    }
}

impl KvStore for MemoryStore {
    fn snapshot(&self, read_ts: Timestamp) -> Result<Arc<dyn Snapshot>> {
        Ok(Arc::new(self.snapshot_at(read_ts)))
    }
}

fn visible(versions: &Versions, read_ts: Timestamp) -> Option<&Vec<u8>> {
    versions
        .range(..=read_ts)
        .next_back()
        .and_then(|(_, value)| value.as_ref())
}

/// Point-in-time view of a [`MemoryStore`].
pub struct MemorySnapshot {
    table: Arc<RwLock<Table>>,
    read_ts: Timestamp,
}

impl Snapshot for MemorySnapshot {
    fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        let table = self.table.read();
        table
            .get(key)
            .and_then(|versions| visible(versions, self.read_ts))
            .cloned()
            .ok_or(TraverseError::NotFound)
    }

    fn iter(&self, start: &[u8], end: &[u8]) -> Result<Box<dyn KvIter + '_>> {
        if start > end {
            return Err(TraverseError::Scan("range start is past range end".into()));
        }
        let table = self.table.read();
        let entries: Vec<(Vec<u8>, Vec<u8>)> = table
            .range::<[u8], _>((Bound::Included(start), Bound::Excluded(end)))
            .filter_map(|(key, versions)| {
                visible(versions, self.read_ts).map(|value| (key.clone(), value.clone()))
            })
            .collect();
        trace!(entries = entries.len(), "storage.memory.iter");
        Ok(Box::new(EntryCursor::new(entries)))
    }
}

/// Cursor over a materialized run of entries.
pub struct EntryCursor {
    entries: Vec<(Vec<u8>, Vec<u8>)>,
    index: usize,
}

impl EntryCursor {
    pub(crate) fn new(entries: Vec<(Vec<u8>, Vec<u8>)>) -> Self {
        Self { entries, index: 0 }
    }
}

impl KvIter for EntryCursor {
    fn valid(&self) -> bool {
        self.index < self.entries.len()
    }

    fn key(&self) -> &[u8] {
        self.entries
            .get(self.index)
            .map(|(key, _)| key.as_slice())
            .unwrap_or_default()
    }

    fn value(&self) -> &[u8] {
        self.entries
            .get(self.index)
            .map(|(_, value)| value.as_slice())
            .unwrap_or_default()
    }

    fn advance(&mut self) -> Result<()> {
        if self.index < self.entries.len() {
            self.index += 1;
        }
        Ok(())
    }
}
