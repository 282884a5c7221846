//! Row values and the batch container passed between operators.

use serde::Serialize;

/// Row encoding and decoding.
pub mod codec;

/// Single column value.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Datum {
    /// Missing value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Floating-point value
    Float(f64),
    /// UTF-8 string value
    Str(String),
    /// Raw byte value
    Bytes(Vec<u8>),
}

impl Datum {
    /// Integer payload, if this datum is an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Datum::Int(v) => Some(*v),
            _ => None,
        }
    }
}

/// One output row; datums are ordered by column position.
pub type Row = Vec<Datum>;

/// Capacity-bounded batch of rows.
#[derive(Clone, Debug)]
pub struct RowBatch {
    rows: Vec<Row>,
    capacity: usize,
}

impl RowBatch {
    /// Creates an empty batch holding at most `capacity` rows (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            rows: Vec::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Maximum number of rows.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of rows currently held.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the batch holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether the batch reached its capacity.
    pub fn is_full(&self) -> bool {
        self.rows.len() >= self.capacity
    }

    /// Appends a row. Callers check [`RowBatch::is_full`] first.
    pub fn push(&mut self, row: Row) {
        debug_assert!(!self.is_full(), "row batch overflow");
        self.rows.push(row);
    }

    /// Drops all rows, keeping the capacity.
    pub fn reset(&mut self) {
        self.rows.clear();
    }

    /// Rows in insertion order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }
}
