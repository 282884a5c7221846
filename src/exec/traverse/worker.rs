//! Fixed-size pool of hop-expanding workers.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{select, Receiver, Sender, TrySendError};
use tracing::{debug, trace};

use crate::storage::keys;
use crate::types::{Result, VertexId};

use super::task::Task;
use super::Shared;

pub(crate) struct Worker {
    id: usize,
    shared: Arc<Shared>,
    tasks_tx: Sender<Task>,
    tasks_rx: Receiver<Task>,
    results_tx: Sender<VertexId>,
}

/// Spawns `count` workers. On a spawn failure the workers already started are
/// returned alongside the error so the caller can shut them down.
pub(crate) fn spawn_pool(
    count: usize,
    shared: &Arc<Shared>,
    tasks_tx: &Sender<Task>,
    tasks_rx: &Receiver<Task>,
    results_tx: Sender<VertexId>,
) -> std::result::Result<Vec<JoinHandle<()>>, (Vec<JoinHandle<()>>, std::io::Error)> {
    let mut handles = Vec::with_capacity(count);
    for id in 0..count {
        let worker = Worker {
            id,
            shared: Arc::clone(shared),
            tasks_tx: tasks_tx.clone(),
            tasks_rx: tasks_rx.clone(),
            results_tx: results_tx.clone(),
        };
        match thread::Builder::new()
            .name(format!("traverse-worker-{id}"))
            .spawn(move || worker.run())
        {
            Ok(handle) => handles.push(handle),
            Err(err) => return Err((handles, err)),
        }
    }
    Ok(handles)
}

impl Worker {
    fn run(self) {
        debug!(worker = self.id, "traverse.worker.start");
        let cancel = self.shared.cancel.signal();
        let external = self.shared.external_signal();
        loop {
            let task = select! {
                recv(self.tasks_rx) -> msg => match msg {
                    Ok(task) => task,
                    Err(_) => break,
                },
                recv(cancel) -> _ => break,
                recv(external) -> _ => break,
            };
            if let Err(err) = self.process(task) {
                debug!(worker = self.id, error = %err, "traverse.worker.failed");
                self.shared.errors.raise(err);
            }
        }
        debug!(worker = self.id, "traverse.worker.exit");
    }

    /// Expands every vertex of `task` by one hop.
    ///
    /// An error leaves the failing vertex unretired; the traversal is
    /// abandoned at that point.
    fn process(&self, task: Task) -> Result<()> {
        if self.shared.is_cancelled() {
            return Ok(());
        }
        let level = task.level;
        let condition = self.shared.chain[level];
        let terminal = level + 1 == self.shared.chain.len();
        trace!(
            worker = self.id,
            level,
            vertices = task.len(),
            terminal,
            "traverse.worker.task"
        );
        for vertex in task.vertices {
            let (start, end) = keys::edge_range(vertex, &condition)?;
            self.shared
                .metrics
                .adjacency_scan(condition.direction.scan_label());
            let mut iter = self.shared.snapshot.iter(&start, &end)?;
            let mut next = (!terminal).then(|| Task::new(level + 1));
            while iter.valid() {
                let neighbor = keys::decode_neighbor(iter.key())?;
                self.shared.tracker.add_outstanding(1);
                match next.as_mut() {
                    Some(next) => next.vertices.push(neighbor),
                    None => {
                        if !self.emit(neighbor) {
                            self.shared.metrics.result_dropped();
                            return Ok(());
                        }
                    }
                }
                iter.advance()?;
            }
            drop(iter);
            if let Some(next) = next {
                self.dispatch(next)?;
            }
            self.shared.tracker.retire_one();
            if self.shared.tracker.check_and_finalize() {
                return Ok(());
            }
        }
        Ok(())
    }

    /// Sends a terminal vertex to the consumer unless the traversal is being
    /// cancelled. Returns `false` when the vertex was dropped.
    fn emit(&self, vertex: VertexId) -> bool {
        if self.shared.is_cancelled() {
            return false;
        }
        let cancel = self.shared.cancel.signal();
        let external = self.shared.external_signal();
        select! {
            send(self.results_tx, vertex) -> res => {
                let sent = res.is_ok();
                if sent {
                    self.shared.metrics.result_emitted();
                }
                sent
            },
            recv(cancel) -> _ => false,
            recv(external) -> _ => false,
        }
    }

    /// Hands a next-level task to the pool, or expands it here when the queue
    /// is full. Every worker may be producing at once, so blocking on a full
    /// queue could leave nobody receiving. Inline recursion is bounded by the
    /// chain length, which `TraverseOptions::validate` caps at `MAX_CHAIN_LEN`.
    fn dispatch(&self, task: Task) -> Result<()> {
        match self.tasks_tx.try_send(task) {
            Ok(()) => {
                self.shared.metrics.task_dispatched(false);
                Ok(())
            }
            Err(TrySendError::Full(task)) => {
                self.shared.metrics.task_dispatched(true);
                trace!(worker = self.id, level = task.level, "traverse.worker.inline");
                self.process(task)
            }
            // Unreachable while this worker holds a receiver.
            Err(TrySendError::Disconnected(_)) => Ok(()),
        }
    }
}
