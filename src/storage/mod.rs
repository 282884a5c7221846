//! Key-value storage collaborators of the traversal operator.
//!
//! Defines the snapshot and iterator contracts the operator reads through,
//! the key layout for adjacency and row-tag records, and an in-memory
//! multi-version store implementing those contracts.

/// Adjacency and row-tag key encoding.
pub mod keys;

mod kv;
mod memory;
mod writer;

/// Snapshot and iterator contracts.
pub use kv::{KvIter, KvStore, Snapshot};

/// In-memory multi-version store.
pub use memory::{EntryCursor, MemorySnapshot, MemoryStore};

/// Graph record writer.
pub use writer::GraphWriter;
