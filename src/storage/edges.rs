//! Edge references collected for one direction of a vertex.

use bytes::Bytes;

use super::edge_info::IteratorEdgeInfo;

/// Append-mostly list of `(edge id, edge info)` pairs.
///
/// `add` never checks for duplicates: the resolution rules already admit at
/// most one reference per edge id.
#[derive(Clone, Debug, Default)]
pub struct EdgeCollection {
    entries: Vec<(Bytes, IteratorEdgeInfo)>,
}

impl EdgeCollection {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a reference.
    pub fn add(&mut self, edge_id: Bytes, info: IteratorEdgeInfo) {
        self.entries.push((edge_id, info));
    }

    /// Removes and returns the reference for `edge_id`.
    pub fn remove(&mut self, edge_id: &[u8]) -> Option<IteratorEdgeInfo> {
        let idx = self
            .entries
            .iter()
            .position(|(id, _)| id.as_ref() == edge_id)?;
        Some(self.entries.remove(idx).1)
    }

    /// Returns the reference for `edge_id`.
    pub fn get(&self, edge_id: &[u8]) -> Option<&IteratorEdgeInfo> {
        self.entries
            .iter()
            .find(|(id, _)| id.as_ref() == edge_id)
            .map(|(_, info)| info)
    }

    /// Iterates references in insertion order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&Bytes, &IteratorEdgeInfo)> + '_ {
        self.entries.iter().map(|(id, info)| (id, info))
    }

    /// Number of references.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every reference, keeping the allocation.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
