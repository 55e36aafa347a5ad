//! Builder for the columns a writer stores for one element row.
//!
//! Produces exactly the layout the resolution path reads: family tags from
//! [`ColumnFamily::tag`], qualifiers deflated through the row's
//! [`NameSubstitution`], edge-reference payloads from
//! [`encode_edge_info`].

use std::sync::Arc;

use bytes::Bytes;

use super::column::Column;
use super::edge_info::encode_edge_info;
use super::element::HIDDEN_VALUE_DELETED;
use super::family::ColumnFamily;
use super::qualifier::{IdentityNameSubstitution, NameSubstitution, PropertySlot};
use crate::types::{Direction, Result, Timestamp};

/// Accumulates the columns of one element row.
#[derive(Clone)]
pub struct RowMutation {
    row: Bytes,
    names: Arc<dyn NameSubstitution>,
    columns: Vec<Column>,
}

impl RowMutation {
    /// Starts a mutation that stores names verbatim.
    pub fn new(row: impl Into<Bytes>) -> Self {
        Self::with_names(row, Arc::new(IdentityNameSubstitution))
    }

    /// Starts a mutation that deflates names through `names`.
    pub fn with_names(row: impl Into<Bytes>, names: Arc<dyn NameSubstitution>) -> Self {
        Self {
            row: row.into(),
            names,
            columns: Vec::new(),
        }
    }

    fn put(
        mut self,
        family: ColumnFamily,
        qualifier: impl Into<Bytes>,
        visibility: &str,
        timestamp: Timestamp,
        value: impl Into<Bytes>,
    ) -> Self {
        self.columns.push(Column::put(
            self.row.clone(),
            family.tag(),
            qualifier,
            Bytes::copy_from_slice(visibility.as_bytes()),
            timestamp,
            value,
        ));
        self
    }

    fn delete(
        mut self,
        family: ColumnFamily,
        qualifier: impl Into<Bytes>,
        visibility: &str,
        timestamp: Timestamp,
    ) -> Self {
        self.columns.push(Column::delete(
            self.row.clone(),
            family.tag(),
            qualifier,
            Bytes::copy_from_slice(visibility.as_bytes()),
            timestamp,
        ));
        self
    }

    fn deflated(&self, name: &str) -> Bytes {
        Bytes::copy_from_slice(self.names.deflate(name).as_bytes())
    }

    /// Marks the row as an existing vertex.
    pub fn vertex_signal(self, visibility: &str, timestamp: Timestamp) -> Self {
        self.put(ColumnFamily::VertexSignal, Bytes::new(), visibility, timestamp, Bytes::new())
    }

    /// Tombstones the vertex.
    pub fn delete_vertex(self, visibility: &str, timestamp: Timestamp) -> Self {
        self.delete(ColumnFamily::VertexSignal, Bytes::new(), visibility, timestamp)
    }

    /// Marks the row as an existing edge labelled `label`.
    pub fn edge_signal(self, label: &str, visibility: &str, timestamp: Timestamp) -> Self {
        let qualifier = self.deflated(label);
        self.put(ColumnFamily::EdgeSignal, qualifier, visibility, timestamp, Bytes::new())
    }

    /// Tombstones the edge.
    pub fn delete_edge(self, label: &str, visibility: &str, timestamp: Timestamp) -> Self {
        let qualifier = self.deflated(label);
        self.delete(ColumnFamily::EdgeSignal, qualifier, visibility, timestamp)
    }

    /// Writes a property value.
    pub fn property(
        self,
        slot: &PropertySlot,
        timestamp: Timestamp,
        value: impl Into<Bytes>,
    ) -> Self {
        let qualifier = slot.value_qualifier(self.names.as_ref());
        self.put(ColumnFamily::Property, qualifier, &slot.visibility, timestamp, value)
    }

    /// Writes a delete marker for a property value.
    pub fn delete_property(self, slot: &PropertySlot, timestamp: Timestamp) -> Self {
        let qualifier = slot.value_qualifier(self.names.as_ref());
        self.delete(ColumnFamily::Property, qualifier, &slot.visibility, timestamp)
    }

    /// Soft-deletes every version of the property at or before `timestamp`.
    pub fn soft_delete_property(self, slot: &PropertySlot, timestamp: Timestamp) -> Self {
        let qualifier = slot.value_qualifier(self.names.as_ref());
        self.put(
            ColumnFamily::PropertySoftDelete,
            qualifier,
            &slot.visibility,
            timestamp,
            Bytes::new(),
        )
    }

    /// Hides the property from readers lacking `include_hidden`.
    pub fn hide_property(self, slot: &PropertySlot, hiding: &str, timestamp: Timestamp) -> Self {
        let qualifier = slot.hidden_qualifier(self.names.as_ref());
        self.put(ColumnFamily::PropertyHidden, qualifier, hiding, timestamp, Bytes::new())
    }

    /// Lifts a hidden marker written under `hiding`.
    pub fn unhide_property(self, slot: &PropertySlot, hiding: &str, timestamp: Timestamp) -> Self {
        let qualifier = slot.hidden_qualifier(self.names.as_ref());
        self.put(
            ColumnFamily::PropertyHidden,
            qualifier,
            hiding,
            timestamp,
            HIDDEN_VALUE_DELETED,
        )
    }

    /// Writes a metadata entry for the property.
    pub fn property_metadata(
        self,
        slot: &PropertySlot,
        metadata_key: &str,
        visibility: &str,
        timestamp: Timestamp,
        value: impl Into<Bytes>,
    ) -> Self {
        let qualifier = slot.metadata_qualifier(metadata_key, self.names.as_ref());
        self.put(ColumnFamily::PropertyMetadata, qualifier, visibility, timestamp, value)
    }

    /// Writes a delete marker for a metadata entry.
    pub fn delete_property_metadata(
        self,
        slot: &PropertySlot,
        metadata_key: &str,
        visibility: &str,
        timestamp: Timestamp,
    ) -> Self {
        let qualifier = slot.metadata_qualifier(metadata_key, self.names.as_ref());
        self.delete(ColumnFamily::PropertyMetadata, qualifier, visibility, timestamp)
    }

    /// Hides the element under `hiding`.
    pub fn hide_element(self, hiding: &str, timestamp: Timestamp) -> Self {
        self.put(ColumnFamily::ElementHidden, Bytes::new(), hiding, timestamp, Bytes::new())
    }

    /// Lifts a hidden marker written under `hiding`.
    pub fn unhide_element(self, hiding: &str, timestamp: Timestamp) -> Self {
        self.put(
            ColumnFamily::ElementHidden,
            Bytes::new(),
            hiding,
            timestamp,
            HIDDEN_VALUE_DELETED,
        )
    }

    /// Soft-deletes the element and everything written at or before `timestamp`.
    pub fn soft_delete_element(self, visibility: &str, timestamp: Timestamp) -> Self {
        self.put(
            ColumnFamily::ElementSoftDelete,
            Bytes::new(),
            visibility,
            timestamp,
            Bytes::new(),
        )
    }

    /// Adds an additional visibility requirement.
    pub fn additional_visibility(self, label: &str, timestamp: Timestamp) -> Self {
        let qualifier = Bytes::copy_from_slice(label.as_bytes());
        self.put(ColumnFamily::AdditionalVisibility, qualifier, "", timestamp, Bytes::new())
    }

    /// Removes an additional visibility requirement.
    pub fn remove_additional_visibility(self, label: &str, timestamp: Timestamp) -> Self {
        let qualifier = Bytes::copy_from_slice(label.as_bytes());
        self.delete(ColumnFamily::AdditionalVisibility, qualifier, "", timestamp)
    }

    /// Attaches an extended-data table name.
    pub fn extended_data_table(self, table: &str, timestamp: Timestamp) -> Self {
        let qualifier = Bytes::copy_from_slice(table.as_bytes());
        self.put(ColumnFamily::ExtendedData, qualifier, "", timestamp, Bytes::new())
    }

    /// Writes an edge reference on a vertex row.
    ///
    /// Fails when the label or vertex id does not fit a length prefix.
    pub fn edge_ref(
        self,
        direction: Direction,
        edge_id: &str,
        label: &str,
        vertex_id: &str,
        visibility: &str,
        timestamp: Timestamp,
    ) -> Result<Self> {
        let family = match direction {
            Direction::Out => ColumnFamily::OutEdge,
            Direction::In => ColumnFamily::InEdge,
        };
        let value = encode_edge_info(label.as_bytes(), vertex_id.as_bytes())?;
        Ok(self.put(
            family,
            Bytes::copy_from_slice(edge_id.as_bytes()),
            visibility,
            timestamp,
            value,
        ))
    }

    /// Writes a delete marker for an edge reference.
    pub fn delete_edge_ref(
        self,
        direction: Direction,
        edge_id: &str,
        visibility: &str,
        timestamp: Timestamp,
    ) -> Self {
        let family = match direction {
            Direction::Out => ColumnFamily::OutEdge,
            Direction::In => ColumnFamily::InEdge,
        };
        self.delete(
            family,
            Bytes::copy_from_slice(edge_id.as_bytes()),
            visibility,
            timestamp,
        )
    }

    /// Hides an edge reference under `hiding`.
    pub fn hide_edge_ref(
        self,
        direction: Direction,
        edge_id: &str,
        hiding: &str,
        timestamp: Timestamp,
    ) -> Self {
        let family = match direction {
            Direction::Out => ColumnFamily::OutEdgeHidden,
            Direction::In => ColumnFamily::InEdgeHidden,
        };
        self.put(
            family,
            Bytes::copy_from_slice(edge_id.as_bytes()),
            hiding,
            timestamp,
            Bytes::new(),
        )
    }

    /// Soft-deletes an edge reference written at or before `timestamp`.
    pub fn soft_delete_edge_ref(
        self,
        direction: Direction,
        edge_id: &str,
        timestamp: Timestamp,
    ) -> Self {
        let family = match direction {
            Direction::Out => ColumnFamily::OutEdgeSoftDelete,
            Direction::In => ColumnFamily::InEdgeSoftDelete,
        };
        self.put(
            family,
            Bytes::copy_from_slice(edge_id.as_bytes()),
            "",
            timestamp,
            Bytes::new(),
        )
    }

    /// Sets the tail vertex of an edge row.
    pub fn out_vertex(self, vertex_id: &str, timestamp: Timestamp) -> Self {
        let qualifier = Bytes::copy_from_slice(vertex_id.as_bytes());
        self.put(ColumnFamily::OutVertex, qualifier, "", timestamp, Bytes::new())
    }

    /// Sets the head vertex of an edge row.
    pub fn in_vertex(self, vertex_id: &str, timestamp: Timestamp) -> Self {
        let qualifier = Bytes::copy_from_slice(vertex_id.as_bytes());
        self.put(ColumnFamily::InVertex, qualifier, "", timestamp, Bytes::new())
    }

    /// Columns accumulated so far, in insertion order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Consumes the builder.
    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }
}
