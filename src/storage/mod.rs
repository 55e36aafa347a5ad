//! Element resolution over wide-column rows.
//!
//! Columns flow from a [`ColumnSource`] through an [`ElementIterator`], which
//! classifies each by [`ColumnFamily`] and merges it into the row's
//! [`ElementData`]. At the row boundary the element is encoded under the
//! configured [`FetchHints`].

/// Versioned cells and the sorted upstream source.
pub mod column;

/// Edge-reference payload codec.
pub mod edge_info;

/// Per-element edge-label dedup table.
pub mod edge_labels;

/// Per-direction edge-reference collection.
pub mod edges;

/// Vertex and edge resolution state.
pub mod element;

/// Column-family tags and per-kind lookup tables.
pub mod family;

/// Projection flags applied at encode time.
pub mod hints;

/// Row iterators.
pub mod iterator;

/// Scan metrics hooks.
pub mod metrics;

/// Writer-side column builder.
pub mod mutation;

/// Iterator options and TOML loading.
pub mod options;

/// Qualifier parsing and name substitution.
pub mod qualifier;

/// Encoded record layout and decoder.
pub mod record;

pub use column::{Column, ColumnKey, ColumnSource, VecColumnSource};
pub use edge_info::{encode_edge_info, parse_vertex_id_bytes, IteratorEdgeInfo};
pub use edge_labels::EdgeLabels;
pub use edges::EdgeCollection;
pub use element::{EdgeData, ElementCore, ElementData, VertexData};
pub use family::{ColumnFamily, FamilyTable, EDGE_FAMILIES, VERTEX_FAMILIES};
pub use hints::{FetchHints, FetchHintsBuilder};
pub use iterator::{
    EdgeIterator, ElementIterator, EncodedElement, FramedSummary, VertexIterator,
};
pub use metrics::{default_metrics, CounterMetrics, IteratorMetrics, NoopMetrics};
pub use mutation::RowMutation;
pub use options::IteratorOptions;
pub use qualifier::{
    IdentityNameSubstitution, MapNameSubstitution, NameSubstitution, PropertySlot,
};
pub use record::{
    decode, decode_as, decode_frames, DecodedBody, DecodedEdgeRef, DecodedElement,
    DecodedMetadata, DecodedProperty, EdgeBlock,
};
