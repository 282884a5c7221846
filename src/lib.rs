//! Hopscan: a multi-hop graph traversal operator over a versioned
//! key-value store.
//!
//! [`TraverseExec`] pulls starting vertices from an upstream [`RowSource`],
//! expands them along a chain of edge [`Condition`]s with a pool of worker
//! threads, and materializes the vertices reached at the last hop into rows.

#![warn(missing_docs)]

pub mod cli;
pub mod exec;
pub mod row;
pub mod storage;
pub mod types;

pub use exec::traverse::{CancelToken, Condition, Direction, TraverseExec, TraverseOptions};
pub use exec::{default_metrics, CounterMetrics, NoopMetrics, RowSource, TraverseMetrics, VecSource};
pub use row::codec::{ColumnCodec, ColumnInfo, ColumnKind, RowCodec};
pub use row::{Datum, Row, RowBatch};
pub use storage::{GraphWriter, KvIter, KvStore, MemoryStore, Snapshot};
pub use types::{EdgeTypeId, Result, TagId, Timestamp, TraverseError, VertexId};
