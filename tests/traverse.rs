#![forbid(unsafe_code)]

mod support;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use hopscan::exec::traverse::MAX_CHAIN_LEN;
use hopscan::storage::keys;
use hopscan::{
    CancelToken, Condition, CounterMetrics, Datum, Direction, EdgeTypeId, GraphWriter, KvIter,
    KvStore, MemoryStore, Result, RowBatch, RowSource, Snapshot, Timestamp, TraverseError,
    TraverseExec, TraverseOptions, VecSource, VertexId,
};

use support::{collect_rows, handles, Fixture, TAG};

fn hop(ty: i64, direction: Direction) -> Condition {
    Condition::new(EdgeTypeId(ty), direction)
}

#[test]
fn single_hop_yields_direct_neighbors() -> Result<()> {
    let fx = Fixture::new();
    fx.edge(1, 7, 2).edge(1, 7, 3).edge(1, 8, 4).rows(1..=4);

    let mut exec = fx.exec(&[1], TraverseOptions::new(vec![hop(7, Direction::Out)]))?;
    exec.open()?;
    let rows = collect_rows(&mut exec, 16)?;
    assert_eq!(handles(&rows), vec![2, 3]);
    assert!(rows.contains(&vec![Datum::Int(2), Datum::Str("v2".into())]));
    exec.close()?;
    Ok(())
}

#[test]
fn cycles_are_not_deduplicated() -> Result<()> {
    let fx = Fixture::new();
    fx.edge(1, 1, 2).edge(1, 2, 2).rows(1..=2);

    let chain = vec![hop(1, Direction::Out), hop(2, Direction::In)];
    let mut exec = fx.exec(&[1, 1], TraverseOptions::new(chain))?;
    exec.open()?;
    let rows = collect_rows(&mut exec, 4)?;
    assert_eq!(handles(&rows), vec![1, 1]);
    exec.close()?;
    Ok(())
}

#[test]
fn empty_upstream_completes_without_results() -> Result<()> {
    let fx = Fixture::new();
    fx.edge(1, 7, 2).rows(1..=2);

    let mut exec = fx.exec(&[], TraverseOptions::new(vec![hop(7, Direction::Out)]))?;
    exec.open()?;
    let rows = collect_rows(&mut exec, 8)?;
    assert!(rows.is_empty());
    assert_eq!(exec.outstanding(), Some(0));
    exec.close()?;
    Ok(())
}

#[test]
fn close_mid_traversal_returns_promptly() -> Result<()> {
    let fx = Fixture::new();
    for mid in 1..=50 {
        fx.edge(0, 1, mid);
        for leaf in 0..50 {
            let id = 1_000 + mid * 100 + leaf;
            fx.edge(mid, 1, id).row(id);
        }
    }
    let chain = vec![hop(1, Direction::Out), hop(1, Direction::Out)];
    let mut exec = fx.exec(&[0, 0, 0, 0], TraverseOptions::new(chain).result_capacity(1))?;
    exec.open()?;

    let mut batch = RowBatch::new(3);
    exec.next(&mut batch)?;
    assert_eq!(batch.len(), 3);

    let started = Instant::now();
    exec.close()?;
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(exec.outstanding(), None);
    Ok(())
}

/// Fails range scans that start at one vertex's adjacency range.
struct FailingStore {
    inner: MemoryStore,
    poisoned: Vec<u8>,
}

struct FailingSnapshot {
    inner: Arc<dyn Snapshot>,
    poisoned: Vec<u8>,
}

impl KvStore for FailingStore {
    fn snapshot(&self, read_ts: Timestamp) -> Result<Arc<dyn Snapshot>> {
        Ok(Arc::new(FailingSnapshot {
            inner: self.inner.snapshot(read_ts)?,
            poisoned: self.poisoned.clone(),
        }))
    }
}

impl Snapshot for FailingSnapshot {
    fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        self.inner.get(key)
    }

    fn iter(&self, start: &[u8], end: &[u8]) -> Result<Box<dyn KvIter + '_>> {
        if start == self.poisoned.as_slice() {
            return Err(TraverseError::Scan("injected scan failure".into()));
        }
        self.inner.iter(start, end)
    }
}

#[test]
fn scan_error_surfaces_and_close_terminates() -> Result<()> {
    let fx = Fixture::new();
    for start in 1..=8 {
        for leaf in 0..20 {
            let id = 100 * start + leaf;
            fx.edge(start, 1, id).row(id);
        }
    }
    let condition = hop(1, Direction::Out);
    let (poisoned, _) = keys::edge_range(VertexId(5), &condition)?;
    let store = FailingStore {
        inner: fx.store.clone(),
        poisoned,
    };
    let mut exec = TraverseExec::new(
        Box::new(VecSource::from_ints(1..=8)),
        Arc::new(store),
        Arc::new(fx.codec.clone()),
        TraverseOptions::new(vec![condition]).result_tag(TAG),
    )?;
    exec.open()?;

    let err = collect_rows(&mut exec, 4).unwrap_err();
    assert!(matches!(err, TraverseError::Scan(_)), "{err:?}");
    let mut batch = RowBatch::new(4);
    assert!(matches!(exec.next(&mut batch), Err(TraverseError::Aborted)));

    let started = Instant::now();
    exec.close()?;
    assert!(started.elapsed() < Duration::from_secs(5));
    Ok(())
}

#[test]
fn close_is_idempotent() -> Result<()> {
    let fx = Fixture::new();
    fx.edge(1, 7, 2).rows(1..=2);
    let mut exec = fx.exec(&[1], TraverseOptions::new(vec![hop(7, Direction::Out)]))?;
    exec.open()?;
    exec.close()?;
    exec.close()?;

    let mut batch = RowBatch::new(2);
    assert!(matches!(exec.next(&mut batch), Err(TraverseError::Closed)));
    Ok(())
}

#[test]
fn next_after_exhaustion_stays_empty() -> Result<()> {
    let fx = Fixture::new();
    fx.edge(1, 7, 2).rows(1..=2);
    let mut exec = fx.exec(&[1], TraverseOptions::new(vec![hop(7, Direction::Out)]))?;
    exec.open()?;
    assert_eq!(collect_rows(&mut exec, 8)?.len(), 1);

    let mut batch = RowBatch::new(8);
    for _ in 0..3 {
        exec.next(&mut batch)?;
        assert!(batch.is_empty());
    }
    exec.close()?;
    Ok(())
}

#[test]
fn next_before_open_is_rejected() -> Result<()> {
    let fx = Fixture::new();
    let mut exec = fx.exec(&[1], TraverseOptions::new(vec![hop(7, Direction::Out)]))?;
    let mut batch = RowBatch::new(2);
    assert!(matches!(exec.next(&mut batch), Err(TraverseError::Invalid(_))));
    Ok(())
}

#[test]
fn only_last_hop_vertices_are_emitted() -> Result<()> {
    let fx = Fixture::new();
    fx.edge(1, 1, 2)
        .edge(2, 1, 3)
        .edge(2, 1, 4)
        .edge(3, 1, 5)
        .rows(1..=5);

    let chain = vec![hop(1, Direction::Out), hop(1, Direction::Out)];
    let mut exec = fx.exec(&[1], TraverseOptions::new(chain))?;
    exec.open()?;
    assert_eq!(handles(&collect_rows(&mut exec, 8)?), vec![3, 4]);
    exec.close()?;
    Ok(())
}

#[test]
fn dead_end_vertices_finish_the_traversal() -> Result<()> {
    let fx = Fixture::new();
    fx.edge(1, 1, 2).edge(3, 1, 4).edge(4, 1, 5).rows(1..=5);

    let chain = vec![hop(1, Direction::Out), hop(1, Direction::Out)];
    let mut exec = fx.exec(&[1, 3], TraverseOptions::new(chain))?;
    exec.open()?;
    assert_eq!(handles(&collect_rows(&mut exec, 8)?), vec![5]);
    assert_eq!(exec.outstanding(), Some(0));
    exec.close()?;
    Ok(())
}

#[test]
fn single_worker_handles_deep_chains() -> Result<()> {
    let fx = Fixture::new();
    for start in 1..=10 {
        let base = start * 1_000;
        fx.edge(start, 1, base + 1)
            .edge(start, 1, base + 2)
            .edge(base + 1, 2, base + 3)
            .edge(base + 2, 2, base + 3)
            .edge(base + 3, 3, base + 4)
            .row(base + 4);
    }
    let chain = vec![
        hop(1, Direction::Out),
        hop(2, Direction::Out),
        hop(3, Direction::Out),
    ];
    let mut exec = fx.exec(
        &(1..=10).collect::<Vec<_>>(),
        TraverseOptions::new(chain).workers(1).batch_size(3),
    )?;
    exec.open()?;
    let rows = collect_rows(&mut exec, 5)?;
    let expected: Vec<i64> = (1..=10).flat_map(|s| [s * 1_000 + 4; 2]).collect();
    assert_eq!(handles(&rows), expected);
    exec.close()?;
    Ok(())
}

#[test]
fn both_direction_scans_outgoing_edges() -> Result<()> {
    let fx = Fixture::new();
    fx.edge(1, 7, 2).edge(3, 7, 1).rows(1..=3);

    let mut exec = fx.exec(&[1], TraverseOptions::new(vec![hop(7, Direction::Both)]))?;
    exec.open()?;
    assert_eq!(handles(&collect_rows(&mut exec, 4)?), vec![2]);
    exec.close()?;
    Ok(())
}

#[test]
fn incoming_hop_follows_reverse_edges() -> Result<()> {
    let fx = Fixture::new();
    fx.edge(1, 7, 2).edge(3, 7, 1).rows(1..=3);

    let mut exec = fx.exec(&[1], TraverseOptions::new(vec![hop(7, Direction::In)]))?;
    exec.open()?;
    assert_eq!(handles(&collect_rows(&mut exec, 4)?), vec![3]);
    exec.close()?;
    Ok(())
}

#[test]
fn missing_row_is_reported_on_next() -> Result<()> {
    let fx = Fixture::new();
    fx.edge(1, 7, 2).row(1);

    let mut exec = fx.exec(&[1], TraverseOptions::new(vec![hop(7, Direction::Out)]))?;
    exec.open()?;
    let err = collect_rows(&mut exec, 4).unwrap_err();
    assert!(matches!(err, TraverseError::NotFound), "{err:?}");
    exec.close()?;
    Ok(())
}

#[test]
fn malformed_row_is_a_decode_error() -> Result<()> {
    let fx = Fixture::new();
    fx.edge(1, 7, 2).edge(1, 7, 3).rows(1..=3);
    GraphWriter::new(&fx.store, Timestamp(1)).put_row(VertexId(3), TAG, vec![0xFF; 4]);

    let mut exec = fx.exec(&[1], TraverseOptions::new(vec![hop(7, Direction::Out)]))?;
    exec.open()?;
    let err = collect_rows(&mut exec, 4).unwrap_err();
    assert!(matches!(err, TraverseError::Decode(_)), "{err:?}");
    let mut batch = RowBatch::new(4);
    assert!(matches!(exec.next(&mut batch), Err(TraverseError::Aborted)));
    exec.close()?;
    Ok(())
}

struct BrokenSource;

impl RowSource for BrokenSource {
    fn open(&mut self) -> Result<()> {
        Ok(())
    }

    fn next_batch(&mut self, _batch: &mut RowBatch) -> Result<()> {
        Err(TraverseError::Upstream("upstream went away".into()))
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

#[test]
fn upstream_error_is_reported_on_next() -> Result<()> {
    let fx = Fixture::new();
    fx.edge(1, 7, 2).rows(1..=2);
    let mut exec = TraverseExec::new(
        Box::new(BrokenSource),
        Arc::new(fx.store.clone()),
        Arc::new(fx.codec.clone()),
        TraverseOptions::new(vec![hop(7, Direction::Out)]).result_tag(TAG),
    )?;
    exec.open()?;
    let err = collect_rows(&mut exec, 4).unwrap_err();
    assert!(matches!(err, TraverseError::Upstream(_)), "{err:?}");
    exec.close()?;
    Ok(())
}

#[test]
fn external_cancellation_stops_next() -> Result<()> {
    let fx = Fixture::new();
    fx.edge(1, 7, 2).rows(1..=2);
    let token = CancelToken::new();
    let mut exec = fx
        .exec(&[1], TraverseOptions::new(vec![hop(7, Direction::Out)]))?
        .with_cancel_token(token.clone());
    exec.open()?;
    token.cancel();

    let mut batch = RowBatch::new(4);
    assert!(matches!(exec.next(&mut batch), Err(TraverseError::Cancelled)));
    exec.close()?;
    Ok(())
}

#[test]
fn operator_can_be_reopened() -> Result<()> {
    let fx = Fixture::new();
    fx.edge(1, 7, 2).edge(1, 7, 3).rows(1..=3);
    let mut exec = fx.exec(&[1], TraverseOptions::new(vec![hop(7, Direction::Out)]))?;
    for _ in 0..3 {
        exec.open()?;
        assert_eq!(handles(&collect_rows(&mut exec, 1)?), vec![2, 3]);
        exec.close()?;
    }
    Ok(())
}

#[test]
fn snapshot_hides_later_commits() -> Result<()> {
    let fx = Fixture::new();
    fx.edge(1, 7, 2).rows(1..=3);
    GraphWriter::new(&fx.store, Timestamp(5)).add_edge(VertexId(1), EdgeTypeId(7), VertexId(3));

    let chain = vec![hop(7, Direction::Out)];
    let mut exec = fx.exec(&[1], TraverseOptions::new(chain.clone()).read_ts(Timestamp(3)))?;
    exec.open()?;
    assert_eq!(handles(&collect_rows(&mut exec, 4)?), vec![2]);
    exec.close()?;

    let mut exec = fx.exec(&[1], TraverseOptions::new(chain))?;
    exec.open()?;
    assert_eq!(handles(&collect_rows(&mut exec, 4)?), vec![2, 3]);
    exec.close()?;
    Ok(())
}

#[test]
fn vertex_id_offset_selects_the_column() -> Result<()> {
    let fx = Fixture::new();
    fx.edge(1, 7, 2).rows(1..=2);
    let source = VecSource::new(vec![vec![Datum::Str("alice".into()), Datum::Int(1)]]);
    let mut exec = TraverseExec::new(
        Box::new(source),
        Arc::new(fx.store.clone()),
        Arc::new(fx.codec.clone()),
        TraverseOptions::new(vec![hop(7, Direction::Out)])
            .vertex_id_offset(1)
            .result_tag(TAG),
    )?;
    exec.open()?;
    assert_eq!(handles(&collect_rows(&mut exec, 4)?), vec![2]);
    exec.close()?;
    Ok(())
}

#[test]
fn counter_metrics_track_progress() -> Result<()> {
    let fx = Fixture::new();
    fx.edge(1, 7, 2).edge(1, 7, 3).rows(1..=3);
    let metrics = Arc::new(CounterMetrics::default());
    let mut exec = fx
        .exec(&[1], TraverseOptions::new(vec![hop(7, Direction::Out)]))?
        .with_metrics(metrics.clone());
    exec.open()?;
    assert_eq!(collect_rows(&mut exec, 8)?.len(), 2);
    exec.close()?;

    assert_eq!(metrics.scans_out.load(Ordering::Relaxed), 1);
    assert_eq!(metrics.scans_in.load(Ordering::Relaxed), 0);
    assert_eq!(metrics.results_emitted.load(Ordering::Relaxed), 2);
    assert_eq!(metrics.rows_materialized.load(Ordering::Relaxed), 2);
    Ok(())
}

#[test]
fn invalid_options_are_rejected_up_front() {
    let fx = Fixture::new();
    assert!(matches!(
        fx.exec(&[1], TraverseOptions::new(Vec::new())),
        Err(TraverseError::Invalid(_))
    ));
    assert!(matches!(
        fx.exec(&[1], TraverseOptions::new(vec![hop(1, Direction::Out)]).workers(0)),
        Err(TraverseError::Invalid(_))
    ));
    assert!(matches!(
        fx.exec(
            &[1],
            TraverseOptions::new(vec![hop(1, Direction::Out); MAX_CHAIN_LEN + 1])
        ),
        Err(TraverseError::Invalid(_))
    ));
}
