//! Reference-counting termination detection.
//!
//! Every vertex id produced (by the frontier producer or by a hop expansion)
//! is one outstanding item: it is added exactly once and retired exactly once.
//! The traversal is complete when the producer has finished and no items are
//! outstanding. The counter itself is updated lock-free; only the completion
//! decision is serialized, so two threads observing zero cannot both finalize
//! and a producer finishing concurrently with the last retirement is never
//! missed.

use std::sync::atomic::{AtomicI64, Ordering};

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::debug;

pub(crate) struct CompletionTracker {
    outstanding: AtomicI64,
    state: Mutex<TrackerState>,
    done_rx: Receiver<()>,
}

struct TrackerState {
    producer_finished: bool,
    done: bool,
    /// Dropped on finalize; receivers observe the disconnect.
    done_tx: Option<Sender<()>>,
}

impl CompletionTracker {
    pub(crate) fn new() -> Self {
        let (done_tx, done_rx) = bounded(0);
        Self {
            outstanding: AtomicI64::new(0),
            state: Mutex::new(TrackerState {
                producer_finished: false,
                done: false,
                done_tx: Some(done_tx),
            }),
            done_rx,
        }
    }

    pub(crate) fn add_outstanding(&self, n: usize) {
        let n = i64::try_from(n).unwrap_or(i64::MAX);
        self.outstanding.fetch_add(n, Ordering::SeqCst);
    }

    pub(crate) fn retire_one(&self) {
        let prev = self.outstanding.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(prev > 0, "completion counter went negative");
    }

    /// Records that the upstream source is exhausted, then runs the
    /// completion check under the same lock.
    pub(crate) fn finish_producer(&self) -> bool {
        let mut state = self.state.lock();
        state.producer_finished = true;
        self.finalize_locked(&mut state)
    }

    /// Finalizes the traversal if the producer finished and nothing is
    /// outstanding. Returns whether the traversal is done.
    pub(crate) fn check_and_finalize(&self) -> bool {
        let mut state = self.state.lock();
        self.finalize_locked(&mut state)
    }

    fn finalize_locked(&self, state: &mut TrackerState) -> bool {
        if state.done {
            return true;
        }
        if state.producer_finished && self.outstanding.load(Ordering::SeqCst) == 0 {
            state.done = true;
            state.done_tx.take();
            debug!("traverse.finalize");
        }
        state.done
    }

    pub(crate) fn is_done(&self) -> bool {
        self.state.lock().done
    }

    pub(crate) fn outstanding(&self) -> i64 {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// Receiver that becomes ready once the traversal is finalized.
    pub(crate) fn done_signal(&self) -> Receiver<()> {
        self.done_rx.clone()
    }
}
