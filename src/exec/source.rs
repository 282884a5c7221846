use std::collections::VecDeque;

use tracing::debug;

use crate::row::{Row, RowBatch};
use crate::types::{Result, TraverseError};

/// Upstream operator feeding rows into the traversal.
///
/// `next_batch` fills up to the batch capacity; an empty batch means the
/// source is exhausted.
pub trait RowSource: Send {
    /// Prepares the source for reading. May be called again after `close`.
    fn open(&mut self) -> Result<()>;

    /// Fills `batch` with the next rows.
    fn next_batch(&mut self, batch: &mut RowBatch) -> Result<()>;

    /// Releases the source.
    fn close(&mut self) -> Result<()>;
}

/// Row source replaying a fixed set of rows.
#[derive(Clone, Debug, Default)]
pub struct VecSource {
    rows: Vec<Row>,
    pending: VecDeque<Row>,
    opened: bool,
}

impl VecSource {
    /// Source yielding `rows` in order.
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows,
            pending: VecDeque::new(),
            opened: false,
        }
    }

    /// Source yielding one single-column row per integer.
    pub fn from_ints<I: IntoIterator<Item = i64>>(ids: I) -> Self {
        Self::new(
            ids.into_iter()
                .map(|id| vec![crate::row::Datum::Int(id)])
                .collect(),
        )
    }
}

impl RowSource for VecSource {
    fn open(&mut self) -> Result<()> {
        self.pending = self.rows.iter().cloned().collect();
        self.opened = true;
        debug!(rows = self.pending.len(), "exec.vec_source.open");
        Ok(())
    }

    fn next_batch(&mut self, batch: &mut RowBatch) -> Result<()> {
        if !self.opened {
            return Err(TraverseError::Upstream("source is not open".into()));
        }
        batch.reset();
        while !batch.is_full() {
            match self.pending.pop_front() {
                Some(row) => batch.push(row),
                None => break,
            }
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.pending.clear();
        self.opened = false;
        Ok(())
    }
}
