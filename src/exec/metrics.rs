use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Hooks for observing traversal progress.
///
/// Called from worker threads and the consumer concurrently.
pub trait TraverseMetrics: Send + Sync {
    /// An adjacency range scan was opened.
    ///
    /// # Parameters
    /// * `direction` - `"out"` or `"in"`, the orientation actually scanned.
    fn adjacency_scan(&self, direction: &'static str);

    /// A next-level task was handed to the task queue (`inline == false`) or
    /// expanded by the producing worker because the queue was full.
    fn task_dispatched(&self, inline: bool);

    /// A terminal vertex was sent to the consumer.
    fn result_emitted(&self);

    /// A terminal vertex was dropped because the traversal was cancelled.
    fn result_dropped(&self);

    /// A terminal vertex was materialized into an output row.
    fn row_materialized(&self);
}

/// Discards every observation.
#[derive(Default)]
pub struct NoopMetrics;

impl TraverseMetrics for NoopMetrics {
    fn adjacency_scan(&self, _direction: &'static str) {}
    fn task_dispatched(&self, _inline: bool) {}
    fn result_emitted(&self) {}
    fn result_dropped(&self) {}
    fn row_materialized(&self) {}
}

/// Atomic counters for each observation.
#[derive(Default)]
pub struct CounterMetrics {
    /// Outgoing-range scans.
    pub scans_out: AtomicU64,
    /// Incoming-range scans.
    pub scans_in: AtomicU64,
    /// Tasks handed to the queue.
    pub tasks_queued: AtomicU64,
    /// Tasks expanded inline by the producing worker.
    pub tasks_inlined: AtomicU64,
    /// Terminal vertices sent to the consumer.
    pub results_emitted: AtomicU64,
    /// Terminal vertices dropped on cancellation.
    pub results_dropped: AtomicU64,
    /// Rows materialized by the consumer.
    pub rows_materialized: AtomicU64,
}

impl TraverseMetrics for CounterMetrics {
    fn adjacency_scan(&self, direction: &'static str) {
        match direction {
            "in" => self.scans_in.fetch_add(1, Ordering::Relaxed),
            _ => self.scans_out.fetch_add(1, Ordering::Relaxed),
        };
    }

    fn task_dispatched(&self, inline: bool) {
        if inline {
            self.tasks_inlined.fetch_add(1, Ordering::Relaxed);
        } else {
            self.tasks_queued.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn result_emitted(&self) {
        self.results_emitted.fetch_add(1, Ordering::Relaxed);
    }

    fn result_dropped(&self) {
        self.results_dropped.fetch_add(1, Ordering::Relaxed);
    }

    fn row_materialized(&self) {
        self.rows_materialized.fetch_add(1, Ordering::Relaxed);
    }
}

/// Metrics sink used when none is supplied.
pub fn default_metrics() -> Arc<dyn TraverseMetrics> {
    Arc::new(NoopMetrics)
}
