use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::types::TraverseError;

/// Broadcast cancellation signal.
///
/// Firing drops the only sender of an internal channel, so every clone of
/// [`CancelToken::signal`] becomes ready at once and stays ready. Cloning the
/// token shares the signal.
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

struct CancelInner {
    fired: AtomicBool,
    trigger: Mutex<Option<Sender<()>>>,
    signal: Receiver<()>,
}

impl CancelToken {
    /// Creates an unfired token.
    pub fn new() -> Self {
        let (trigger, signal) = bounded(0);
        Self {
            inner: Arc::new(CancelInner {
                fired: AtomicBool::new(false),
                trigger: Mutex::new(Some(trigger)),
                signal,
            }),
        }
    }

    /// Fires the signal. Later calls are no-ops.
    pub fn cancel(&self) {
        self.inner.fired.store(true, Ordering::SeqCst);
        self.inner.trigger.lock().take();
    }

    /// Whether [`CancelToken::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.inner.fired.load(Ordering::SeqCst)
    }

    /// Receiver that becomes ready (disconnected) once the token fires.
    pub fn signal(&self) -> Receiver<()> {
        self.inner.signal.clone()
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Shared slot holding the most recent worker error.
///
/// Concurrent failures overwrite each other; a one-slot channel wakes the
/// consumer.
pub(crate) struct ErrorSlot {
    slot: Mutex<Option<TraverseError>>,
    notify_tx: Sender<()>,
    notify_rx: Receiver<()>,
}

impl ErrorSlot {
    pub(crate) fn new() -> Self {
        let (notify_tx, notify_rx) = bounded(1);
        Self {
            slot: Mutex::new(None),
            notify_tx,
            notify_rx,
        }
    }

    pub(crate) fn raise(&self, err: TraverseError) {
        *self.slot.lock() = Some(err);
        let _ = self.notify_tx.try_send(());
    }

    pub(crate) fn take(&self) -> Option<TraverseError> {
        self.slot.lock().take()
    }

    pub(crate) fn signal(&self) -> Receiver<()> {
        self.notify_rx.clone()
    }
}
