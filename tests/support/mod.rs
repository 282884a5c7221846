#![forbid(unsafe_code)]
#![allow(dead_code)]

use std::sync::Arc;

use hopscan::{
    ColumnCodec, ColumnInfo, ColumnKind, Datum, EdgeTypeId, GraphWriter, MemoryStore, Result,
    Row, RowBatch, TagId, Timestamp, TraverseExec, TraverseOptions, VecSource, VertexId,
};

pub const TAG: TagId = TagId(9);

pub fn person_codec() -> ColumnCodec {
    ColumnCodec::new(vec![
        ColumnInfo::handle(0),
        ColumnInfo::new(1, ColumnKind::Str),
    ])
}

/// In-memory graph whose vertices all carry a `name` row under [`TAG`].
pub struct Fixture {
    pub store: MemoryStore,
    pub codec: ColumnCodec,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            store: MemoryStore::new(),
            codec: person_codec(),
        }
    }

    pub fn edge(&self, src: i64, ty: i64, dst: i64) -> &Self {
        GraphWriter::new(&self.store, Timestamp(1)).add_edge(
            VertexId(src),
            EdgeTypeId(ty),
            VertexId(dst),
        );
        self
    }

    pub fn row(&self, vertex: i64) -> &Self {
        let value = self
            .codec
            .encode(&[(1, Datum::Str(format!("v{vertex}")))])
            .expect("encode row");
        GraphWriter::new(&self.store, Timestamp(1)).put_row(VertexId(vertex), TAG, value);
        self
    }

    pub fn rows(&self, vertices: impl IntoIterator<Item = i64>) -> &Self {
        for vertex in vertices {
            self.row(vertex);
        }
        self
    }

    pub fn exec(&self, start: &[i64], options: TraverseOptions) -> Result<TraverseExec> {
        TraverseExec::new(
            Box::new(VecSource::from_ints(start.iter().copied())),
            Arc::new(self.store.clone()),
            Arc::new(self.codec.clone()),
            options.result_tag(TAG),
        )
    }
}

/// Pulls batches until the operator reports exhaustion.
pub fn collect_rows(exec: &mut TraverseExec, capacity: usize) -> Result<Vec<Row>> {
    let mut rows = Vec::new();
    let mut batch = RowBatch::new(capacity);
    loop {
        exec.next(&mut batch)?;
        if batch.is_empty() {
            return Ok(rows);
        }
        rows.extend(batch.rows().iter().cloned());
    }
}

/// Sorted handle column of `rows`.
pub fn handles(rows: &[Row]) -> Vec<i64> {
    let mut ids: Vec<i64> = rows
        .iter()
        .map(|row| row[0].as_int().expect("handle column"))
        .collect();
    ids.sort_unstable();
    ids
}
