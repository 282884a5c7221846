#![forbid(unsafe_code)]

//! Identifier newtypes and the crate-wide error type.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque graph vertex identifier; doubles as the row handle on materialization.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VertexId(pub i64);

/// Edge type identifier selecting one adjacency range per vertex.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeTypeId(pub i64);

/// Row tag identifier selecting which stored record is materialized for a vertex.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagId(pub i64);

/// Commit / read timestamp of the versioned key-value store.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Reads everything ever committed.
    pub const MAX: Timestamp = Timestamp(u64::MAX);
}

#[derive(thiserror::Error, Debug)]
/// Errors produced by the traversal operator and its collaborators.
pub enum TraverseError {
    /// Operating system error (thread spawn, file access).
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    /// The upstream row source failed to produce a batch.
    #[error("upstream fetch failed: {0}")]
    Upstream(String),
    /// Opening or advancing a range iterator failed.
    #[error("range scan failed: {0}")]
    Scan(String),
    /// A point read against the snapshot failed.
    #[error("point read failed: {0}")]
    Read(String),
    /// A key or value could not be decoded.
    #[error("decode: {0}")]
    Decode(&'static str),
    /// The requested key has no visible version.
    #[error("not found")]
    NotFound,
    /// Caller supplied an argument the operator cannot honor.
    #[error("invalid argument: {0}")]
    Invalid(&'static str),
    /// Configuration could not be loaded.
    #[error("config: {0}")]
    Config(String),
    /// An external cancellation token fired.
    #[error("operation cancelled")]
    Cancelled,
    /// A previous `next` call already surfaced an error.
    #[error("traversal aborted by an earlier error")]
    Aborted,
    /// The operator was closed.
    #[error("operator is closed")]
    Closed,
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, TraverseError>;

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for EdgeTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for VertexId {
    fn from(value: i64) -> Self {
        VertexId(value)
    }
}

impl From<VertexId> for i64 {
    fn from(value: VertexId) -> Self {
        value.0
    }
}

impl From<i64> for EdgeTypeId {
    fn from(value: i64) -> Self {
        EdgeTypeId(value)
    }
}

impl From<i64> for TagId {
    fn from(value: i64) -> Self {
        TagId(value)
    }
}
