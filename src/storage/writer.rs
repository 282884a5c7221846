use crate::types::{EdgeTypeId, TagId, Timestamp, VertexId};

use super::keys::{edge_key, row_tag_key};
use super::memory::MemoryStore;

/// Writes graph records into a [`MemoryStore`] at a fixed commit timestamp.
pub struct GraphWriter<'a> {
    store: &'a MemoryStore,
    commit_ts: Timestamp,
    edges: usize,
    rows: usize,
}

impl<'a> GraphWriter<'a> {
    /// Creates a writer that commits every record at `commit_ts`.
    pub fn new(store: &'a MemoryStore, commit_ts: Timestamp) -> Self {
        Self {
            store,
            commit_ts,
            edges: 0,
            rows: 0,
        }
    }

    /// Stores `src -[edge_type]-> dst` under both endpoints.
    pub fn add_edge(&mut self, src: VertexId, edge_type: EdgeTypeId, dst: VertexId) {
        self.store
            .put(edge_key(src, true, edge_type, dst), Vec::new(), self.commit_ts);
        self.store
            .put(edge_key(dst, false, edge_type, src), Vec::new(), self.commit_ts);
        self.edges += 1;
    }

    /// Tombstones both orientations of an edge.
    pub fn remove_edge(&mut self, src: VertexId, edge_type: EdgeTypeId, dst: VertexId) {
        self.store
            .delete(edge_key(src, true, edge_type, dst), self.commit_ts);
        self.store
            .delete(edge_key(dst, false, edge_type, src), self.commit_ts);
    }

    /// Stores the encoded record of `vertex` under `tag`.
    pub fn put_row(&mut self, vertex: VertexId, tag: TagId, value: Vec<u8>) {
        self.store
            .put(row_tag_key(vertex, tag), value, self.commit_ts);
        self.rows += 1;
    }

    /// Number of edges written so far.
    pub fn edges_written(&self) -> usize {
        self.edges
    }

    /// Number of rows written so far.
    pub fn rows_written(&self) -> usize {
        self.rows
    }
}
