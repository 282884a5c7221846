use std::sync::Arc;

use crate::types::{Result, Timestamp};

/// Forward cursor over a key range of a [`Snapshot`].
pub trait KvIter {
    /// Whether the cursor is positioned on an entry.
    fn valid(&self) -> bool;

    /// Key of the current entry. Only meaningful while [`KvIter::valid`].
    fn key(&self) -> &[u8];

    /// Value of the current entry. Only meaningful while [`KvIter::valid`].
    fn value(&self) -> &[u8];

    /// Moves to the next entry in key order.
    fn advance(&mut self) -> Result<()>;
}

/// Read-only, point-in-time view of a key-value store.
///
/// Implementations must allow several threads to run independent range scans
/// over the same snapshot at once.
pub trait Snapshot: Send + Sync {
    /// Point lookup. A key without a visible version is [`TraverseError::NotFound`](crate::types::TraverseError::NotFound).
    fn get(&self, key: &[u8]) -> Result<Vec<u8>>;

    /// Opens a forward iterator over `[start, end)`.
    fn iter(&self, start: &[u8], end: &[u8]) -> Result<Box<dyn KvIter + '_>>;
}

/// Source of snapshots at a given read timestamp.
pub trait KvStore: Send + Sync {
    /// Returns a snapshot that observes every commit at or before `read_ts`.
    fn snapshot(&self, read_ts: Timestamp) -> Result<Arc<dyn Snapshot>>;
}
