use std::sync::Arc;

use crate::row::codec::RowCodec;
use crate::row::{Row, RowBatch};
use crate::storage::{keys, Snapshot};
use crate::types::{Result, TagId, VertexId};

/// Turns terminal vertex ids into output rows via a point read and the row codec.
pub(crate) struct RowMaterializer {
    snapshot: Arc<dyn Snapshot>,
    codec: Arc<dyn RowCodec>,
    tag: TagId,
}

impl RowMaterializer {
    pub(crate) fn new(snapshot: Arc<dyn Snapshot>, codec: Arc<dyn RowCodec>, tag: TagId) -> Self {
        Self {
            snapshot,
            codec,
            tag,
        }
    }

    pub(crate) fn materialize(&self, vertex: VertexId, batch: &mut RowBatch) -> Result<()> {
        let key = keys::row_tag_key(vertex, self.tag);
        let value = self.snapshot.get(&key)?;
        let mut row = Row::new();
        self.codec.decode(&value, vertex, &mut row)?;
        batch.push(row);
        Ok(())
    }
}
