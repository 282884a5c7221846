use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use super::Running;

/// Stops a running traversal and waits for every thread it started.
///
/// Order matters: cancellation first so blocked senders wake up, then the
/// operator's task sender goes away, then a drain keeps the result channel
/// moving while workers are joined. Workers own the only result senders, so
/// the channel disconnects once the last one exits; the drain thread ends on
/// that disconnect and joining it is the signal that no send can still be in
/// flight.
pub(crate) fn shutdown(run: Running) {
    let Running {
        shared,
        tasks_tx,
        results_rx,
        workers,
        producer,
        ..
    } = run;

    shared.cancel.cancel();
    drop(tasks_tx);

    let drain = match thread::Builder::new()
        .name("traverse-drain".into())
        .spawn(move || results_rx.iter().count())
    {
        Ok(handle) => Some(handle),
        Err(err) => {
            // Workers still observe the cancel signal while blocked on a send.
            warn!(error = %err, "traverse.shutdown.drain_spawn_failed");
            None
        }
    };

    if let Some(handle) = producer {
        join("producer", handle);
    }
    let worker_count = workers.len();
    for handle in workers {
        join("worker", handle);
    }
    debug!(workers = worker_count, "traverse.shutdown.workers_joined");

    if let Some(handle) = drain {
        match handle.join() {
            Ok(drained) => debug!(drained, "traverse.shutdown.drained"),
            Err(_) => warn!("traverse.shutdown.drain_panicked"),
        }
    }
}

fn join(role: &'static str, handle: JoinHandle<()>) {
    if handle.join().is_err() {
        warn!(role, "traverse.shutdown.thread_panicked");
    }
}
