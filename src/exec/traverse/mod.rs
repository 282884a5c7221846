//! Multi-hop traversal operator.
//!
//! Starting vertices come from an upstream [`RowSource`]. A fixed pool of
//! worker threads expands them hop by hop along a chain of [`Condition`]s by
//! scanning adjacency ranges of a snapshot, and the vertices reached at the
//! last hop are materialized into rows by [`TraverseExec::next`].
//!
//! Data flow: frontier producer -> task queue -> workers (re-enqueueing
//! next-level tasks) -> result channel -> row materializer -> caller.
//! Termination is detected by reference counting outstanding vertices; see
//! `tracker`.

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, never, select, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::exec::{default_metrics, RowSource, TraverseMetrics};
use crate::row::codec::RowCodec;
use crate::row::RowBatch;
use crate::storage::{KvStore, Snapshot};
use crate::types::{Result, TraverseError, VertexId};

mod condition;
mod materialize;
mod options;
mod producer;
mod shutdown;
mod signal;
mod task;
mod tracker;
mod worker;


pub use condition::{Condition, Direction};
pub use options::{TraverseOptions, DEFAULT_BATCH_SIZE, DEFAULT_WORKERS, MAX_CHAIN_LEN};
pub use signal::CancelToken;

use materialize::RowMaterializer;
use producer::FrontierProducer;
use signal::ErrorSlot;
use task::Task;
use tracker::CompletionTracker;

/// State shared by the producer, the workers and the consumer of one execution.
pub(crate) struct Shared {
    snapshot: Arc<dyn Snapshot>,
    chain: Vec<Condition>,
    tracker: CompletionTracker,
    errors: ErrorSlot,
    cancel: CancelToken,
    external: Option<CancelToken>,
    metrics: Arc<dyn TraverseMetrics>,
}

impl Shared {
    fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
            || self
                .external
                .as_ref()
                .is_some_and(|token| token.is_cancelled())
    }

    fn external_signal(&self) -> Receiver<()> {
        match &self.external {
            Some(token) => token.signal(),
            None => never(),
        }
    }
}

/// Channels and threads of one open execution.
pub(crate) struct Running {
    shared: Arc<Shared>,
    /// Operator-held task sender; cloned into the producer, dropped on shutdown.
    tasks_tx: Option<Sender<Task>>,
    results_rx: Receiver<VertexId>,
    /// Kept alive so the consumer never observes a disconnect on this channel.
    fetch_err_tx: Sender<TraverseError>,
    fetch_err_rx: Receiver<TraverseError>,
    workers: Vec<JoinHandle<()>>,
    producer: Option<JoinHandle<()>>,
    materializer: RowMaterializer,
}

/// Outcome of filling one output batch.
enum Fill {
    /// The batch reached capacity; more results may follow.
    Full,
    /// No further results will arrive.
    Exhausted,
}

impl Running {
    fn fill(&self, batch: &mut RowBatch) -> Result<Fill> {
        let shared = &self.shared;
        let done = shared.tracker.done_signal();
        let failed = shared.errors.signal();
        let external = shared.external_signal();
        loop {
            select! {
                recv(self.fetch_err_rx) -> msg => {
                    if let Ok(err) = msg {
                        return Err(err);
                    }
                },
                recv(failed) -> _ => {
                    if let Some(err) = shared.errors.take() {
                        return Err(err);
                    }
                },
                recv(done) -> _ => return Ok(Fill::Exhausted),
                recv(external) -> _ => return Err(TraverseError::Cancelled),
                recv(self.results_rx) -> msg => {
                    // Disconnected only once every worker has exited.
                    let Ok(vertex) = msg else {
                        return Ok(Fill::Exhausted);
                    };
                    self.materializer.materialize(vertex, batch)?;
                    shared.metrics.row_materialized();
                    shared.tracker.retire_one();
                    if shared.tracker.check_and_finalize() {
                        return Ok(Fill::Exhausted);
                    }
                    if batch.is_full() {
                        return Ok(Fill::Full);
                    }
                },
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ExecState {
    Created,
    Open,
    Finished,
    Failed,
    Closed,
}

/// Pull-based operator emitting the rows of vertices reached at the last hop.
///
/// Lifecycle: [`open`](Self::open) takes a snapshot and starts the worker
/// pool, the first [`next`](Self::next) starts pulling from the upstream
/// source, [`close`](Self::close) cancels outstanding work and joins every
/// thread. The operator may be reopened after `close`.
///
/// Results carry no ordering guarantee and revisited vertices are not
/// deduplicated: every walk matching the chain yields one row.
pub struct TraverseExec {
    source: Arc<Mutex<Box<dyn RowSource>>>,
    store: Arc<dyn KvStore>,
    codec: Arc<dyn RowCodec>,
    options: TraverseOptions,
    metrics: Arc<dyn TraverseMetrics>,
    external: Option<CancelToken>,
    state: ExecState,
    source_open: bool,
    running: Option<Running>,
}

impl TraverseExec {
    /// Creates a closed operator. Fails if `options` do not validate.
    pub fn new(
        source: Box<dyn RowSource>,
        store: Arc<dyn KvStore>,
        codec: Arc<dyn RowCodec>,
        options: TraverseOptions,
    ) -> Result<Self> {
        options.validate()?;
        if options
            .chain
            .iter()
            .any(|cond| cond.direction == Direction::Both)
        {
            warn!(
                chain = ?options.chain,
                "traverse.direction.both_scans_outgoing_only"
            );
        }
        Ok(Self {
            source: Arc::new(Mutex::new(source)),
            store,
            codec,
            options,
            metrics: default_metrics(),
            external: None,
            state: ExecState::Created,
            source_open: false,
            running: None,
        })
    }

    /// Reports traversal progress to `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<dyn TraverseMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Honors an external cancellation token at every suspension point.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.external = Some(token);
        self
    }

    /// Options the operator was built with.
    pub fn options(&self) -> &TraverseOptions {
        &self.options
    }

    /// Outstanding items of the current execution, if one is open.
    pub fn outstanding(&self) -> Option<i64> {
        self.running
            .as_ref()
            .map(|run| run.shared.tracker.outstanding())
    }

    /// Opens the upstream source, takes a snapshot at the configured read
    /// timestamp and starts the worker pool.
    pub fn open(&mut self) -> Result<()> {
        match self.state {
            ExecState::Created | ExecState::Closed => {}
            _ => return Err(TraverseError::Invalid("traverse operator is already open")),
        }
        let snapshot = self.store.snapshot(self.options.read_ts)?;
        self.source.lock().open()?;
        self.source_open = true;

        let shared = Arc::new(Shared {
            snapshot: Arc::clone(&snapshot),
            chain: self.options.chain.clone(),
            tracker: CompletionTracker::new(),
            errors: ErrorSlot::new(),
            cancel: CancelToken::new(),
            external: self.external.clone(),
            metrics: Arc::clone(&self.metrics),
        });
        let (tasks_tx, tasks_rx) = bounded(self.options.effective_queue_capacity());
        let (results_tx, results_rx) = bounded(self.options.effective_result_capacity());
        let (fetch_err_tx, fetch_err_rx) = bounded(1);
        let materializer = RowMaterializer::new(
            snapshot,
            Arc::clone(&self.codec),
            self.options.result_tag,
        );

        let workers = match worker::spawn_pool(
            self.options.workers,
            &shared,
            &tasks_tx,
            &tasks_rx,
            results_tx,
        ) {
            Ok(workers) => workers,
            Err((started, err)) => {
                shutdown::shutdown(Running {
                    shared,
                    tasks_tx: Some(tasks_tx),
                    results_rx,
                    fetch_err_tx,
                    fetch_err_rx,
                    workers: started,
                    producer: None,
                    materializer,
                });
                let _ = self.close_source();
                return Err(err.into());
            }
        };
        debug!(
            workers = workers.len(),
            hops = self.options.chain.len(),
            read_ts = self.options.read_ts.0,
            "traverse.open"
        );
        self.running = Some(Running {
            shared,
            tasks_tx: Some(tasks_tx),
            results_rx,
            fetch_err_tx,
            fetch_err_rx,
            workers,
            producer: None,
            materializer,
        });
        self.state = ExecState::Open;
        Ok(())
    }

    /// Fills `batch` with up to its capacity of result rows.
    ///
    /// An empty batch means the traversal is exhausted; later calls keep
    /// returning empty batches. The first call starts pulling from the
    /// upstream source.
    pub fn next(&mut self, batch: &mut RowBatch) -> Result<()> {
        batch.reset();
        match self.state {
            ExecState::Open => {}
            ExecState::Finished => return Ok(()),
            ExecState::Failed => return Err(TraverseError::Aborted),
            ExecState::Closed => return Err(TraverseError::Closed),
            ExecState::Created => {
                return Err(TraverseError::Invalid("traverse operator is not open"))
            }
        }
        let Some(run) = self.running.as_mut() else {
            return Err(TraverseError::Closed);
        };
        if run.producer.is_none() {
            let Some(tasks_tx) = run.tasks_tx.clone() else {
                return Err(TraverseError::Closed);
            };
            let producer = FrontierProducer {
                source: Arc::clone(&self.source),
                shared: Arc::clone(&run.shared),
                tasks_tx,
                errors_tx: run.fetch_err_tx.clone(),
                vertex_id_offset: self.options.vertex_id_offset,
                batch_size: self.options.batch_size,
            };
            match producer.spawn() {
                Ok(handle) => run.producer = Some(handle),
                Err(err) => {
                    self.state = ExecState::Failed;
                    return Err(err);
                }
            }
        }
        match run.fill(batch) {
            Ok(Fill::Full) => Ok(()),
            Ok(Fill::Exhausted) => {
                self.state = ExecState::Finished;
                Ok(())
            }
            Err(err) => {
                self.state = ExecState::Failed;
                Err(err)
            }
        }
    }

    /// Cancels outstanding work, joins every thread and closes the upstream
    /// source. Worker errors are not reported here. Calling it again is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.state == ExecState::Closed {
            return Ok(());
        }
        if let Some(run) = self.running.take() {
            debug!(
                outstanding = run.shared.tracker.outstanding(),
                done = run.shared.tracker.is_done(),
                "traverse.close"
            );
            shutdown::shutdown(run);
        }
        self.state = ExecState::Closed;
        self.close_source()
    }

    fn close_source(&mut self) -> Result<()> {
        if !self.source_open {
            return Ok(());
        }
        self.source_open = false;
        self.source.lock().close()
    }
}

impl Drop for TraverseExec {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(error = %err, "traverse.drop.close_failed");
        }
    }
}
