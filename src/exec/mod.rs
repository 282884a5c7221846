//! Pull-based execution operators.

/// Multi-hop graph traversal operator.
pub mod traverse;

mod metrics;
mod source;

pub use metrics::{default_metrics, CounterMetrics, NoopMetrics, TraverseMetrics};
pub use source::{RowSource, VecSource};
