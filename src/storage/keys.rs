//! Key layout for adjacency and row-tag records.
//!
//! Edge keys sort by `(vertex, orientation, edge type, neighbor)`, so every
//! edge of one type incident to one vertex in one orientation forms a single
//! contiguous range. Signed ids are stored big-endian with the sign bit
//! flipped so that byte order matches numeric order.

use std::convert::TryInto;

use crate::exec::traverse::Condition;
use crate::types::{EdgeTypeId, Result, TagId, TraverseError, VertexId};

/// Leading byte of every edge key.
pub const EDGE_PREFIX: u8 = b'e';
/// Leading byte of every row-tag key.
pub const TAG_PREFIX: u8 = b't';

const DIR_OUT: u8 = b'o';
const DIR_IN: u8 = b'i';
const SIGN_FLIP: u64 = 1 << 63;

/// Length of the prefix shared by all edges of one `(vertex, orientation, type)`.
pub const EDGE_RANGE_KEY_LEN: usize = 1 + 8 + 1 + 8;
/// Length of a full edge key.
pub const EDGE_KEY_LEN: usize = EDGE_RANGE_KEY_LEN + 8;
/// Length of a row-tag key.
pub const ROW_TAG_KEY_LEN: usize = 1 + 8 + 8;

fn ordered_bytes(value: i64) -> [u8; 8] {
    ((value as u64) ^ SIGN_FLIP).to_be_bytes()
}

fn from_ordered_bytes(bytes: [u8; 8]) -> i64 {
    (u64::from_be_bytes(bytes) ^ SIGN_FLIP) as i64
}

/// Prefix of every edge of `edge_type` incident to `vertex` in one orientation.
pub fn edge_range_key(vertex: VertexId, outgoing: bool, edge_type: EdgeTypeId) -> Vec<u8> {
    let mut buf = Vec::with_capacity(EDGE_KEY_LEN);
    buf.push(EDGE_PREFIX);
    buf.extend_from_slice(&ordered_bytes(vertex.0));
    buf.push(if outgoing { DIR_OUT } else { DIR_IN });
    buf.extend_from_slice(&ordered_bytes(edge_type.0));
    buf
}

/// Full key of one stored edge as seen from `vertex`.
pub fn edge_key(
    vertex: VertexId,
    outgoing: bool,
    edge_type: EdgeTypeId,
    neighbor: VertexId,
) -> Vec<u8> {
    let mut buf = edge_range_key(vertex, outgoing, edge_type);
    buf.extend_from_slice(&ordered_bytes(neighbor.0));
    buf
}

/// Half-open key range `[start, end)` covering one hop from `vertex`.
///
/// `Direction::Both` scans the outgoing range only; see
/// [`Direction::scans_outgoing`](crate::exec::traverse::Direction::scans_outgoing).
pub fn edge_range(vertex: VertexId, condition: &Condition) -> Result<(Vec<u8>, Vec<u8>)> {
    let outgoing = condition.direction.scans_outgoing();
    let next_type = condition
        .edge_type
        .0
        .checked_add(1)
        .ok_or(TraverseError::Invalid("edge type id overflow"))?;
    Ok((
        edge_range_key(vertex, outgoing, condition.edge_type),
        edge_range_key(vertex, outgoing, EdgeTypeId(next_type)),
    ))
}

/// Extracts the neighbor id from the tail of an edge key.
pub fn decode_neighbor(key: &[u8]) -> Result<VertexId> {
    if key.len() != EDGE_KEY_LEN || key[0] != EDGE_PREFIX {
        return Err(TraverseError::Decode("malformed edge key"));
    }
    let tail: [u8; 8] = key[EDGE_RANGE_KEY_LEN..]
        .try_into()
        .map_err(|_| TraverseError::Decode("malformed edge key"))?;
    Ok(VertexId(from_ordered_bytes(tail)))
}

/// Key of the stored record for `vertex` under row tag `tag`.
pub fn row_tag_key(vertex: VertexId, tag: TagId) -> Vec<u8> {
    let mut buf = Vec::with_capacity(ROW_TAG_KEY_LEN);
    buf.push(TAG_PREFIX);
    buf.extend_from_slice(&ordered_bytes(vertex.0));
    buf.extend_from_slice(&ordered_bytes(tag.0));
    buf
}
