use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{select, Sender};
use parking_lot::Mutex;
use tracing::debug;

use crate::exec::RowSource;
use crate::row::RowBatch;
use crate::types::{Result, TraverseError, VertexId};

use super::task::Task;
use super::Shared;

/// Pulls starting vertices from the upstream source and feeds level-0 tasks.
pub(crate) struct FrontierProducer {
    pub(crate) source: Arc<Mutex<Box<dyn RowSource>>>,
    pub(crate) shared: Arc<Shared>,
    pub(crate) tasks_tx: Sender<Task>,
    pub(crate) errors_tx: Sender<TraverseError>,
    pub(crate) vertex_id_offset: usize,
    pub(crate) batch_size: usize,
}

impl FrontierProducer {
    pub(crate) fn spawn(self) -> Result<JoinHandle<()>> {
        let handle = thread::Builder::new()
            .name("traverse-producer".into())
            .spawn(move || self.run())?;
        Ok(handle)
    }

    fn run(self) {
        let cancel = self.shared.cancel.signal();
        let external = self.shared.external_signal();
        let mut source = self.source.lock();
        let mut batch = RowBatch::new(self.batch_size);
        let mut batches = 0usize;
        loop {
            if self.shared.is_cancelled() {
                debug!(batches, "traverse.producer.cancelled");
                return;
            }
            batch.reset();
            if let Err(err) = source.next_batch(&mut batch) {
                debug!(error = %err, "traverse.producer.failed");
                let _ = self.errors_tx.try_send(err);
                return;
            }
            if batch.is_empty() {
                let done = self.shared.tracker.finish_producer();
                debug!(batches, done, "traverse.producer.finished");
                return;
            }
            let task = match self.build_task(&batch) {
                Ok(task) => task,
                Err(err) => {
                    debug!(error = %err, "traverse.producer.failed");
                    let _ = self.errors_tx.try_send(err);
                    return;
                }
            };
            batches += 1;
            debug!(batch = batches, rows = task.len(), "traverse.producer.batch");
            self.shared.tracker.add_outstanding(task.len());
            select! {
                send(self.tasks_tx, task) -> res => {
                    if res.is_err() {
                        return;
                    }
                },
                recv(cancel) -> _ => return,
                recv(external) -> _ => return,
            }
        }
    }

    fn build_task(&self, batch: &RowBatch) -> Result<Task> {
        let vertices = batch
            .rows()
            .iter()
            .map(|row| {
                row.get(self.vertex_id_offset)
                    .and_then(|datum| datum.as_int())
                    .map(VertexId)
                    .ok_or(TraverseError::Invalid(
                        "vertex id column is missing or not an integer",
                    ))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Task::with_vertices(0, vertices))
    }
}
