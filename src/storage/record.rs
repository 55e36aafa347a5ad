//! Encoded element records and their decoder.
//!
//! Record layout (all integers big-endian, strings length-prefixed):
//!
//! ```text
//! u8      element type id (1 vertex, 2 edge)
//! u8      format version
//! str     id
//! i64     timestamp
//! str     visibility
//! strset  hiding visibilities
//! strset  additional visibilities
//! strset  extended-data table names (null when not projected)
//! i32     metadata table length, then (str key, str visibility, bytes value)*
//! i32     property count, then per property:
//!           str key, str name, str visibility, i64 timestamp, bytes value,
//!           i32 metadata index count (-1 when not projected) + i32 indices,
//!           strset hiding visibilities
//! vertex: (u8 direction tag, u8 block tag, block) for out then in
//! edge:   str label, str out-vertex id, str in-vertex id
//! ```

use crate::primitives::bytes::buf::Cursor;
use crate::primitives::bytes::read_frame;
use crate::types::{Direction, ElementKind, PushdownError, Result, Timestamp};

/// Version byte following the element type id.
pub const FORMAT_VERSION: u8 = 1;

/// Edge block carrying nothing (neither refs nor counts projected).
pub const EDGE_BLOCK_NONE: u8 = 0;
/// Edge block carrying `(label, count)` pairs.
pub const EDGE_BLOCK_LABELS_AND_COUNTS: u8 = 1;
/// Edge block carrying full references grouped by label.
pub const EDGE_BLOCK_REFS: u8 = 2;

/// Decoded element record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedElement {
    /// Vertex or edge.
    pub kind: ElementKind,
    /// Element id.
    pub id: String,
    /// Creation timestamp.
    pub timestamp: Timestamp,
    /// Element visibility.
    pub visibility: String,
    /// Visibilities under which the element is hidden.
    pub hidden_visibilities: Vec<String>,
    /// Extra visibilities required to see the element.
    pub additional_visibilities: Vec<String>,
    /// Extended-data table names, when projected.
    pub extended_data_table_names: Option<Vec<String>>,
    /// Visible properties in storage order.
    pub properties: Vec<DecodedProperty>,
    /// Kind-specific part.
    pub body: DecodedBody,
}

impl DecodedElement {
    /// Returns `true` when the element carries hiding visibilities.
    pub fn is_hidden(&self) -> bool {
        !self.hidden_visibilities.is_empty()
    }

    /// First property with the given key and name.
    pub fn property(&self, key: &str, name: &str) -> Option<&DecodedProperty> {
        self.properties
            .iter()
            .find(|p| p.key == key && p.name == name)
    }
}

/// One decoded property.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedProperty {
    /// Property key.
    pub key: String,
    /// Property name.
    pub name: String,
    /// Property visibility.
    pub visibility: String,
    /// Timestamp of the retained version.
    pub timestamp: Timestamp,
    /// Raw value bytes.
    pub value: Vec<u8>,
    /// Metadata entries, when projected.
    pub metadata: Option<Vec<DecodedMetadata>>,
    /// Visibilities under which this property is hidden.
    pub hidden_visibilities: Vec<String>,
}

impl DecodedProperty {
    /// Returns `true` when the property was emitted despite being hidden.
    pub fn is_hidden(&self) -> bool {
        !self.hidden_visibilities.is_empty()
    }
}

/// One metadata entry resolved from the shared table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedMetadata {
    /// Metadata key.
    pub key: String,
    /// Metadata visibility.
    pub visibility: String,
    /// Raw value bytes.
    pub value: Vec<u8>,
}

/// Kind-specific part of a decoded record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecodedBody {
    /// Vertex edge blocks.
    Vertex {
        /// Outgoing references.
        out_edges: EdgeBlock,
        /// Incoming references.
        in_edges: EdgeBlock,
    },
    /// Edge label and endpoints.
    Edge {
        /// Edge label.
        label: String,
        /// Tail vertex id.
        out_vertex_id: String,
        /// Head vertex id.
        in_vertex_id: String,
    },
}

/// Projection of one direction of a vertex's edge references.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EdgeBlock {
    /// Neither references nor counts were projected.
    NotFetched,
    /// `(label, count)` pairs.
    LabelsAndCounts(Vec<(String, u32)>),
    /// Full references.
    Refs(Vec<DecodedEdgeRef>),
}

impl EdgeBlock {
    /// Total number of edges represented by the block.
    pub fn edge_count(&self) -> usize {
        match self {
            EdgeBlock::NotFetched => 0,
            EdgeBlock::LabelsAndCounts(counts) => counts.iter().map(|(_, c)| *c as usize).sum(),
            EdgeBlock::Refs(refs) => refs.len(),
        }
    }
}

/// One decoded edge reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedEdgeRef {
    /// Edge id, when projected.
    pub edge_id: Option<String>,
    /// Edge label.
    pub label: String,
    /// Timestamp of the reference column.
    pub timestamp: Timestamp,
    /// Adjacent vertex id, when projected.
    pub vertex_id: Option<String>,
    /// Visibility of the reference column.
    pub visibility: String,
}

/// Decodes a record of either kind.
pub fn decode(record: &[u8]) -> Result<DecodedElement> {
    let mut cur = Cursor::new(record);
    let kind = ElementKind::from_type_id(cur.read_u8("element type id")?)?;
    decode_after_type(cur, kind)
}

/// Decodes a record, failing unless it holds an element of `kind`.
pub fn decode_as(record: &[u8], kind: ElementKind) -> Result<DecodedElement> {
    let mut cur = Cursor::new(record);
    let tag = cur.read_u8("element type id")?;
    if tag != kind.type_id() {
        return Err(PushdownError::format(
            "element type id",
            format_args!("{} ({kind})", kind.type_id()),
            tag,
        ));
    }
    decode_after_type(cur, kind)
}

/// Decodes a buffer of length-framed records.
pub fn decode_frames(mut buf: &[u8]) -> Result<Vec<DecodedElement>> {
    let mut out = Vec::new();
    while !buf.is_empty() {
        let (record, rest) = read_frame(buf)?;
        out.push(decode(record)?);
        buf = rest;
    }
    Ok(out)
}

fn decode_after_type(mut cur: Cursor<'_>, kind: ElementKind) -> Result<DecodedElement> {
    cur.expect_u8(FORMAT_VERSION, "format version")?;
    let id = cur.read_required_str("element id")?.to_owned();
    let timestamp = cur.read_i64("element timestamp")?;
    let visibility = cur.read_required_str("element visibility")?.to_owned();
    let hidden_visibilities = required_set(&mut cur, "hidden visibilities")?;
    let additional_visibilities = required_set(&mut cur, "additional visibilities")?;
    let extended_data_table_names = cur.read_str_set("extended data table names")?;

    let metadata_table = decode_metadata_table(&mut cur)?;
    let properties = decode_properties(&mut cur, &metadata_table)?;

    let body = match kind {
        ElementKind::Vertex => {
            expect_direction(&mut cur, Direction::Out)?;
            let out_edges = decode_edge_block(&mut cur)?;
            expect_direction(&mut cur, Direction::In)?;
            let in_edges = decode_edge_block(&mut cur)?;
            DecodedBody::Vertex {
                out_edges,
                in_edges,
            }
        }
        ElementKind::Edge => DecodedBody::Edge {
            label: cur.read_required_str("edge label")?.to_owned(),
            out_vertex_id: cur.read_required_str("edge out vertex id")?.to_owned(),
            in_vertex_id: cur.read_required_str("edge in vertex id")?.to_owned(),
        },
    };
    cur.expect_end("element record")?;

    Ok(DecodedElement {
        kind,
        id,
        timestamp,
        visibility,
        hidden_visibilities,
        additional_visibilities,
        extended_data_table_names,
        properties,
        body,
    })
}

fn required_set(cur: &mut Cursor<'_>, context: &'static str) -> Result<Vec<String>> {
    cur.read_str_set(context)?
        .ok_or_else(|| PushdownError::format(context, "string set", "null"))
}

fn required_len(cur: &mut Cursor<'_>, context: &'static str) -> Result<usize> {
    cur.read_len(context)?
        .ok_or_else(|| PushdownError::format(context, "count", "null"))
}

fn decode_metadata_table(cur: &mut Cursor<'_>) -> Result<Vec<DecodedMetadata>> {
    let len = required_len(cur, "metadata table length")?;
    let mut table = Vec::with_capacity(len.min(cur.remaining()));
    for _ in 0..len {
        table.push(DecodedMetadata {
            key: cur.read_required_str("metadata key")?.to_owned(),
            visibility: cur.read_required_str("metadata visibility")?.to_owned(),
            value: cur
                .read_bytes("metadata value")?
                .ok_or_else(|| PushdownError::format("metadata value", "bytes", "null"))?
                .to_vec(),
        });
    }
    Ok(table)
}

fn decode_properties(
    cur: &mut Cursor<'_>,
    metadata_table: &[DecodedMetadata],
) -> Result<Vec<DecodedProperty>> {
    let count = required_len(cur, "property count")?;
    let mut properties = Vec::with_capacity(count.min(cur.remaining()));
    for _ in 0..count {
        let key = cur.read_required_str("property key")?.to_owned();
        let name = cur.read_required_str("property name")?.to_owned();
        let visibility = cur.read_required_str("property visibility")?.to_owned();
        let timestamp = cur.read_i64("property timestamp")?;
        let value = cur
            .read_bytes("property value")?
            .ok_or_else(|| PushdownError::format("property value", "bytes", "null"))?
            .to_vec();
        let metadata = match cur.read_len("property metadata count")? {
            None => None,
            Some(n) => {
                let mut entries = Vec::with_capacity(n.min(metadata_table.len()));
                for _ in 0..n {
                    let idx = cur.read_i32("property metadata index")?;
                    let entry = usize::try_from(idx)
                        .ok()
                        .and_then(|i| metadata_table.get(i))
                        .ok_or_else(|| {
                            PushdownError::format(
                                "property metadata index",
                                format_args!("0..{}", metadata_table.len()),
                                idx,
                            )
                        })?;
                    entries.push(entry.clone());
                }
                Some(entries)
            }
        };
        let hidden_visibilities = required_set(cur, "property hidden visibilities")?;
        properties.push(DecodedProperty {
            key,
            name,
            visibility,
            timestamp,
            value,
            metadata,
            hidden_visibilities,
        });
    }
    Ok(properties)
}

fn expect_direction(cur: &mut Cursor<'_>, expected: Direction) -> Result<()> {
    let found = Direction::from_tag(cur.read_u8("edge block direction")?)?;
    if found != expected {
        return Err(PushdownError::format(
            "edge block direction",
            expected.as_str(),
            found.as_str(),
        ));
    }
    Ok(())
}

fn decode_edge_block(cur: &mut Cursor<'_>) -> Result<EdgeBlock> {
    match cur.read_u8("edge block tag")? {
        EDGE_BLOCK_NONE => Ok(EdgeBlock::NotFetched),
        EDGE_BLOCK_LABELS_AND_COUNTS => {
            let n = required_len(cur, "edge label count")?;
            let mut counts = Vec::with_capacity(n.min(cur.remaining()));
            for _ in 0..n {
                let label = cur.read_required_str("edge label")?.to_owned();
                let count = cur.read_i32("edge count")?;
                let count = u32::try_from(count)
                    .map_err(|_| PushdownError::format("edge count", "count >= 0", count))?;
                counts.push((label, count));
            }
            Ok(EdgeBlock::LabelsAndCounts(counts))
        }
        EDGE_BLOCK_REFS => {
            let groups = required_len(cur, "edge label count")?;
            let mut refs = Vec::new();
            for _ in 0..groups {
                let label = cur.read_required_str("edge label")?;
                let n = required_len(cur, "edge ref count")?;
                for _ in 0..n {
                    let edge_id = cur.read_str("edge id")?.map(str::to_owned);
                    let timestamp = cur.read_i64("edge timestamp")?;
                    let vertex_id = cur.read_str("edge vertex id")?.map(str::to_owned);
                    let visibility = cur.read_required_str("edge visibility")?.to_owned();
                    refs.push(DecodedEdgeRef {
                        edge_id,
                        label: label.to_owned(),
                        timestamp,
                        vertex_id,
                        visibility,
                    });
                }
            }
            Ok(EdgeBlock::Refs(refs))
        }
        other => Err(PushdownError::format(
            "edge block tag",
            format_args!(
                "{EDGE_BLOCK_NONE}, {EDGE_BLOCK_LABELS_AND_COUNTS} or {EDGE_BLOCK_REFS}"
            ),
            other,
        )),
    }
}
