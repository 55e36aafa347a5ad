//! Column-family taxonomy for element rows.
//!
//! Tags are byte-exact; the two tables below are the only place they are
//! matched. A family outside the table for the row's element kind is a
//! [`PushdownError::ProtocolViolation`].

use crate::types::{ElementKind, PushdownError, Result};

/// Every column family an element row may carry.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ColumnFamily {
    /// Vertex existence / tombstone.
    VertexSignal,
    /// Edge existence / tombstone; qualifier holds the label.
    EdgeSignal,
    /// Property value; qualifier `name␟key`.
    Property,
    /// Property soft-delete marker; qualifier `name␟key`.
    PropertySoftDelete,
    /// Property hidden marker; qualifier `name␟key␟visibility`.
    PropertyHidden,
    /// Property metadata value; qualifier `name␟key␟visibility␟metadataKey`.
    PropertyMetadata,
    /// Element hidden marker; column visibility is the hiding visibility.
    ElementHidden,
    /// Element soft-delete marker.
    ElementSoftDelete,
    /// Additional visibility label; qualifier holds the label.
    AdditionalVisibility,
    /// Extended-data table name; qualifier holds the table name.
    ExtendedData,
    /// Outgoing edge reference; qualifier holds the edge id.
    OutEdge,
    /// Incoming edge reference; qualifier holds the edge id.
    InEdge,
    /// Hidden marker for an outgoing edge reference.
    OutEdgeHidden,
    /// Soft-delete marker for an outgoing edge reference.
    OutEdgeSoftDelete,
    /// Hidden marker for an incoming edge reference.
    InEdgeHidden,
    /// Soft-delete marker for an incoming edge reference.
    InEdgeSoftDelete,
    /// Edge tail vertex; qualifier holds the vertex id.
    OutVertex,
    /// Edge head vertex; qualifier holds the vertex id.
    InVertex,
}

impl ColumnFamily {
    /// The byte-exact family tag stored in the wide-column key.
    pub const fn tag(self) -> &'static [u8] {
        match self {
            ColumnFamily::VertexSignal => b"V",
            ColumnFamily::EdgeSignal => b"E",
            ColumnFamily::Property => b"PROP",
            ColumnFamily::PropertySoftDelete => b"PROPD",
            ColumnFamily::PropertyHidden => b"PROPH",
            ColumnFamily::PropertyMetadata => b"PROPMETA",
            ColumnFamily::ElementHidden => b"H",
            ColumnFamily::ElementSoftDelete => b"D",
            ColumnFamily::AdditionalVisibility => b"AV",
            ColumnFamily::ExtendedData => b"EXTDATA",
            ColumnFamily::OutEdge => b"EOUT",
            ColumnFamily::InEdge => b"EIN",
            ColumnFamily::OutEdgeHidden => b"EOUTH",
            ColumnFamily::OutEdgeSoftDelete => b"EOUTD",
            ColumnFamily::InEdgeHidden => b"EINH",
            ColumnFamily::InEdgeSoftDelete => b"EIND",
            ColumnFamily::OutVertex => b"VOUT",
            ColumnFamily::InVertex => b"VIN",
        }
    }

    /// Short name used in log fields.
    pub const fn as_str(self) -> &'static str {
        match self {
            ColumnFamily::VertexSignal => "vertex_signal",
            ColumnFamily::EdgeSignal => "edge_signal",
            ColumnFamily::Property => "property",
            ColumnFamily::PropertySoftDelete => "property_soft_delete",
            ColumnFamily::PropertyHidden => "property_hidden",
            ColumnFamily::PropertyMetadata => "property_metadata",
            ColumnFamily::ElementHidden => "element_hidden",
            ColumnFamily::ElementSoftDelete => "element_soft_delete",
            ColumnFamily::AdditionalVisibility => "additional_visibility",
            ColumnFamily::ExtendedData => "extended_data",
            ColumnFamily::OutEdge => "out_edge",
            ColumnFamily::InEdge => "in_edge",
            ColumnFamily::OutEdgeHidden => "out_edge_hidden",
            ColumnFamily::OutEdgeSoftDelete => "out_edge_soft_delete",
            ColumnFamily::InEdgeHidden => "in_edge_hidden",
            ColumnFamily::InEdgeSoftDelete => "in_edge_soft_delete",
            ColumnFamily::OutVertex => "out_vertex",
            ColumnFamily::InVertex => "in_vertex",
        }
    }

    /// Returns `true` for the existence / tombstone families.
    pub fn is_signal(self) -> bool {
        matches!(self, ColumnFamily::VertexSignal | ColumnFamily::EdgeSignal)
    }

    /// Returns `true` for families accepted on both vertex and edge rows.
    pub fn is_shared(self) -> bool {
        SHARED.contains(&self)
    }
}

const SHARED: [ColumnFamily; 8] = [
    ColumnFamily::Property,
    ColumnFamily::PropertySoftDelete,
    ColumnFamily::PropertyHidden,
    ColumnFamily::PropertyMetadata,
    ColumnFamily::ElementHidden,
    ColumnFamily::ElementSoftDelete,
    ColumnFamily::AdditionalVisibility,
    ColumnFamily::ExtendedData,
];

/// Closed lookup table from family tag to [`ColumnFamily`] for one element kind.
#[derive(Debug)]
pub struct FamilyTable {
    kind: ElementKind,
    signal: ColumnFamily,
    specific: &'static [ColumnFamily],
}

/// Families accepted on vertex rows.
pub static VERTEX_FAMILIES: FamilyTable = FamilyTable {
    kind: ElementKind::Vertex,
    signal: ColumnFamily::VertexSignal,
    specific: &[
        ColumnFamily::OutEdge,
        ColumnFamily::InEdge,
        ColumnFamily::OutEdgeHidden,
        ColumnFamily::OutEdgeSoftDelete,
        ColumnFamily::InEdgeHidden,
        ColumnFamily::InEdgeSoftDelete,
    ],
};

/// Families accepted on edge rows.
pub static EDGE_FAMILIES: FamilyTable = FamilyTable {
    kind: ElementKind::Edge,
    signal: ColumnFamily::EdgeSignal,
    specific: &[ColumnFamily::OutVertex, ColumnFamily::InVertex],
};

impl FamilyTable {
    /// Returns the table for `kind`.
    pub fn for_kind(kind: ElementKind) -> &'static FamilyTable {
        match kind {
            ElementKind::Vertex => &VERTEX_FAMILIES,
            ElementKind::Edge => &EDGE_FAMILIES,
        }
    }

    /// Element kind this table classifies for.
    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    /// Maps a raw family tag to its [`ColumnFamily`].
    pub fn classify(&self, tag: &[u8]) -> Result<ColumnFamily> {
        if tag == self.signal.tag() {
            return Ok(self.signal);
        }
        SHARED
            .iter()
            .chain(self.specific.iter())
            .copied()
            .find(|family| family.tag() == tag)
            .ok_or_else(|| PushdownError::ProtocolViolation {
                family: String::from_utf8_lossy(tag).into_owned(),
                kind: self.kind,
            })
    }

    /// Iterates every family this table accepts.
    pub fn families(&self) -> impl Iterator<Item = ColumnFamily> + '_ {
        std::iter::once(self.signal)
            .chain(SHARED.iter().copied())
            .chain(self.specific.iter().copied())
    }
}
