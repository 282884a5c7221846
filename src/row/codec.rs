use std::collections::HashMap;
use std::convert::TryInto;

use serde::Deserialize;

use crate::types::{Result, TraverseError, VertexId};

use super::{Datum, Row};

const TYPE_NULL: u8 = 0;
const TYPE_BOOL: u8 = 1;
const TYPE_INT: u8 = 2;
const TYPE_FLOAT: u8 = 3;
const TYPE_STR: u8 = 4;
const TYPE_BYTES: u8 = 5;

/// Smallest encoded entry: column id plus type tag.
const MIN_ENTRY_LEN: usize = 8 + 1;

/// Decodes a stored record into an output row.
pub trait RowCodec: Send + Sync {
    /// Appends one datum per output column to `row`. `handle` is the vertex
    /// the record belongs to.
    fn decode(&self, value: &[u8], handle: VertexId, row: &mut Row) -> Result<()>;
}

/// Declared type of an output column.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// Boolean column
    Bool,
    /// Integer column
    Int,
    /// Floating-point column
    Float,
    /// String column
    Str,
    /// Byte column
    Bytes,
}

/// Output column definition.
#[derive(Clone, Debug, Deserialize)]
pub struct ColumnInfo {
    /// Column id stored alongside each encoded value.
    pub id: i64,
    /// Declared type.
    pub kind: ColumnKind,
    /// Filled from the vertex id instead of the stored value.
    #[serde(default)]
    pub is_handle: bool,
}

impl ColumnInfo {
    /// Regular value column.
    pub fn new(id: i64, kind: ColumnKind) -> Self {
        Self {
            id,
            kind,
            is_handle: false,
        }
    }

    /// Integer column carrying the vertex id.
    pub fn handle(id: i64) -> Self {
        Self {
            id,
            kind: ColumnKind::Int,
            is_handle: true,
        }
    }
}

/// Column-id keyed record codec.
///
/// Layout (little endian): `u32` entry count, then per entry `i64` column id,
/// `u8` type tag and the payload (`i64`, `f64`, one byte for bools, `u32`
/// length plus bytes for strings and blobs, nothing for nulls).
#[derive(Clone, Debug)]
pub struct ColumnCodec {
    columns: Vec<ColumnInfo>,
}

impl ColumnCodec {
    /// Creates a codec producing `columns` in order.
    pub fn new(columns: Vec<ColumnInfo>) -> Self {
        Self { columns }
    }

    /// Encodes `(column id, value)` pairs into a stored record.
    pub fn encode(&self, values: &[(i64, Datum)]) -> Result<Vec<u8>> {
        let count: u32 = values
            .len()
            .try_into()
            .map_err(|_| TraverseError::Invalid("too many columns to encode"))?;
        let mut buf = Vec::with_capacity(4 + values.len() * 16);
        buf.extend_from_slice(&count.to_le_bytes());
        for (id, datum) in values {
            buf.extend_from_slice(&id.to_le_bytes());
            match datum {
                Datum::Null => buf.push(TYPE_NULL),
                Datum::Bool(v) => {
                    buf.push(TYPE_BOOL);
                    buf.push(u8::from(*v));
                }
                Datum::Int(v) => {
                    buf.push(TYPE_INT);
                    buf.extend_from_slice(&v.to_le_bytes());
                }
                Datum::Float(v) => {
                    buf.push(TYPE_FLOAT);
                    buf.extend_from_slice(&v.to_le_bytes());
                }
                Datum::Str(s) => write_bytes_like(&mut buf, TYPE_STR, s.as_bytes())?,
                Datum::Bytes(b) => write_bytes_like(&mut buf, TYPE_BYTES, b)?,
            }
        }
        Ok(buf)
    }

    fn decode_entries(value: &[u8]) -> Result<HashMap<i64, Datum>> {
        let mut cursor = 0usize;
        let count = u32::from_le_bytes(read_array(value, &mut cursor, "record header truncated")?);
        // The header count is untrusted; size the map by what the buffer can hold.
        let fits = value.len().saturating_sub(cursor) / MIN_ENTRY_LEN;
        let mut entries = HashMap::with_capacity((count as usize).min(fits));
        for _ in 0..count {
            let id = i64::from_le_bytes(read_array(value, &mut cursor, "column id truncated")?);
            let [tag] = read_array::<1>(value, &mut cursor, "column tag truncated")?;
            let datum = match tag {
                TYPE_NULL => Datum::Null,
                TYPE_BOOL => {
                    let [byte] = read_array::<1>(value, &mut cursor, "bool payload truncated")?;
                    if byte > 1 {
                        return Err(TraverseError::Decode("bool payload invalid"));
                    }
                    Datum::Bool(byte == 1)
                }
                TYPE_INT => Datum::Int(i64::from_le_bytes(read_array(
                    value,
                    &mut cursor,
                    "int payload truncated",
                )?)),
                TYPE_FLOAT => Datum::Float(f64::from_le_bytes(read_array(
                    value,
                    &mut cursor,
                    "float payload truncated",
                )?)),
                TYPE_STR => {
                    let bytes = read_bytes_like(value, &mut cursor)?;
                    let s = String::from_utf8(bytes)
                        .map_err(|_| TraverseError::Decode("string payload is not utf-8"))?;
                    Datum::Str(s)
                }
                TYPE_BYTES => Datum::Bytes(read_bytes_like(value, &mut cursor)?),
                _ => return Err(TraverseError::Decode("unknown column type tag")),
            };
            entries.insert(id, datum);
        }
        if cursor != value.len() {
            return Err(TraverseError::Decode("trailing bytes after record"));
        }
        Ok(entries)
    }
}

impl RowCodec for ColumnCodec {
    fn decode(&self, value: &[u8], handle: VertexId, row: &mut Row) -> Result<()> {
        let mut entries = Self::decode_entries(value)?;
        row.reserve(self.columns.len());
        for column in &self.columns {
            if column.is_handle {
                row.push(Datum::Int(handle.0));
                continue;
            }
            // Absent columns have no default value.
            let datum = entries.remove(&column.id).unwrap_or(Datum::Null);
            if !matches_kind(&datum, column.kind) {
                return Err(TraverseError::Decode("column type mismatch"));
            }
            row.push(datum);
        }
        Ok(())
    }
}

fn matches_kind(datum: &Datum, kind: ColumnKind) -> bool {
    matches!(
        (datum, kind),
        (Datum::Null, _)
            | (Datum::Bool(_), ColumnKind::Bool)
            | (Datum::Int(_), ColumnKind::Int)
            | (Datum::Float(_), ColumnKind::Float)
            | (Datum::Str(_), ColumnKind::Str)
            | (Datum::Bytes(_), ColumnKind::Bytes)
    )
}

fn write_bytes_like(buf: &mut Vec<u8>, tag: u8, bytes: &[u8]) -> Result<()> {
    let len: u32 = bytes
        .len()
        .try_into()
        .map_err(|_| TraverseError::Invalid("column value exceeds u32::MAX bytes"))?;
    buf.push(tag);
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(bytes);
    Ok(())
}

fn read_array<const N: usize>(
    buf: &[u8],
    cursor: &mut usize,
    truncated: &'static str,
) -> Result<[u8; N]> {
    let end = cursor
        .checked_add(N)
        .filter(|end| *end <= buf.len())
        .ok_or(TraverseError::Decode(truncated))?;
    let arr: [u8; N] = buf[*cursor..end]
        .try_into()
        .map_err(|_| TraverseError::Decode(truncated))?;
    *cursor = end;
    Ok(arr)
}

fn read_bytes_like(buf: &[u8], cursor: &mut usize) -> Result<Vec<u8>> {
    let len = u32::from_le_bytes(read_array(buf, cursor, "length prefix truncated")?) as usize;
    let end = cursor
        .checked_add(len)
        .filter(|end| *end <= buf.len())
        .ok_or(TraverseError::Decode("column payload truncated"))?;
    let bytes = buf[*cursor..end].to_vec();
    *cursor = end;
    Ok(bytes)
}
