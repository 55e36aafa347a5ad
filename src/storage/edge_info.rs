//! Edge-reference payloads stored in vertex rows.
//!
//! Layout: `[4B labelLen][label][4B idLen][adjacentVertexId]`, lengths
//! big-endian. The timestamp and visibility come from the column key.

use bytes::Bytes;

use crate::primitives::bytes::{ord::read_i32_be, write};
use crate::types::{PushdownError, Result, Timestamp};

use super::edge_labels::EdgeLabels;

const LEN_PREFIX: usize = 4;

/// Flyweight view of one edge reference.
///
/// The label lives in the element's [`EdgeLabels`] table; the adjacent
/// vertex id and visibility share the column's buffers.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IteratorEdgeInfo {
    label_index: u32,
    timestamp: Timestamp,
    vertex_id: Bytes,
    visibility: Bytes,
}

impl IteratorEdgeInfo {
    /// Decodes `value`, interning its label into `labels`.
    pub fn decode(
        value: &Bytes,
        timestamp: Timestamp,
        visibility: Bytes,
        labels: &mut EdgeLabels,
    ) -> Result<Self> {
        let (label_len, id_start, id_len) = spans(value)?;
        let label_index = labels.add_range(value, LEN_PREFIX, label_len)?;
        Ok(Self {
            label_index,
            timestamp,
            vertex_id: value.slice(id_start..id_start + id_len),
            visibility,
        })
    }

    /// Index of the label in the owning element's [`EdgeLabels`].
    pub fn label_index(&self) -> u32 {
        self.label_index
    }

    /// Timestamp of the edge-reference column.
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Raw adjacent vertex id.
    pub fn vertex_id(&self) -> &Bytes {
        &self.vertex_id
    }

    /// Visibility expression of the edge-reference column.
    pub fn visibility(&self) -> &Bytes {
        &self.visibility
    }
}

/// Extracts the adjacent-vertex id span without touching any label table.
pub fn parse_vertex_id_bytes(value: &[u8]) -> Result<&[u8]> {
    let (_, id_start, id_len) = spans(value)?;
    Ok(&value[id_start..id_start + id_len])
}

/// Encodes an edge-reference payload.
pub fn encode_edge_info(label: &[u8], vertex_id: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(2 * LEN_PREFIX + label.len() + vertex_id.len());
    write::put_bytes(&mut out, Some(label))?;
    write::put_bytes(&mut out, Some(vertex_id))?;
    Ok(out)
}

/// Returns `(label_len, id_start, id_len)`, requiring the payload to be
/// consumed exactly.
fn spans(value: &[u8]) -> Result<(usize, usize, usize)> {
    let label_len = non_negative(read_i32_be(value, 0)?, "edge info label length")?;
    let id_off = LEN_PREFIX + label_len;
    let id_len = non_negative(read_i32_be(value, id_off)?, "edge info vertex id length")?;
    let id_start = id_off + LEN_PREFIX;
    if id_start + id_len != value.len() {
        return Err(PushdownError::format(
            "edge info payload",
            format_args!("{} bytes", id_start + id_len),
            format_args!("{} bytes", value.len()),
        ));
    }
    Ok((label_len, id_start, id_len))
}

fn non_negative(len: i32, context: &'static str) -> Result<usize> {
    usize::try_from(len).map_err(|_| PushdownError::format(context, "length >= 0", len))
}
