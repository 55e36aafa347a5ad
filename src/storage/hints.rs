use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::Direction;

/// Projection applied when a resolved element is encoded.
///
/// Hints never influence resolution: tombstones, soft-deletes and hidden
/// markers are always merged in full, so one resolved element can be encoded
/// under several projections.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchHints {
    /// Emit every property.
    pub include_all_properties: bool,
    /// Emit only properties with these names (when not including all).
    pub property_names_to_include: Option<BTreeSet<String>>,
    /// Emit every metadata entry of emitted properties.
    pub include_all_property_metadata: bool,
    /// Emit only metadata with these keys (when not including all).
    pub metadata_keys_to_include: Option<BTreeSet<String>>,
    /// Emit metadata written before the current property version.
    pub include_previous_metadata: bool,
    /// Emit hidden elements, properties and edge references.
    pub include_hidden: bool,
    /// Emit full edge references in both directions.
    pub include_all_edge_refs: bool,
    /// Emit full outgoing edge references.
    pub include_out_edge_refs: bool,
    /// Emit full incoming edge references.
    pub include_in_edge_refs: bool,
    /// Restrict edge references and counts to these labels.
    pub edge_labels_of_edge_refs_to_include: Option<BTreeSet<String>>,
    /// Emit per-label edge counts when full references are not requested.
    pub include_edge_labels_and_counts: bool,
    /// Write edge ids in full edge references.
    pub include_edge_ids: bool,
    /// Write adjacent vertex ids in full edge references.
    pub include_edge_vertex_ids: bool,
    /// Emit extended-data table names.
    pub include_extended_data_table_names: bool,
}

impl FetchHints {
    /// Everything visible to the caller, hidden data excluded.
    pub fn all() -> Self {
        Self {
            include_all_properties: true,
            include_all_property_metadata: true,
            include_previous_metadata: true,
            include_all_edge_refs: true,
            include_edge_labels_and_counts: true,
            include_edge_ids: true,
            include_edge_vertex_ids: true,
            include_extended_data_table_names: true,
            ..Self::default()
        }
    }

    /// Everything, hidden data included.
    pub fn all_including_hidden() -> Self {
        Self {
            include_hidden: true,
            ..Self::all()
        }
    }

    /// Only the element header.
    pub fn none() -> Self {
        Self::default()
    }

    /// Edge references with ids and vertex ids, no properties.
    pub fn edge_refs() -> Self {
        Self {
            include_all_edge_refs: true,
            include_edge_ids: true,
            include_edge_vertex_ids: true,
            ..Self::default()
        }
    }

    /// Starts a builder from [`FetchHints::none`].
    pub fn builder() -> FetchHintsBuilder {
        FetchHintsBuilder::default()
    }

    /// Whether properties named `name` are projected.
    pub fn includes_property(&self, name: &str) -> bool {
        self.include_all_properties
            || self
                .property_names_to_include
                .as_ref()
                .is_some_and(|names| names.contains(name))
    }

    /// Whether any property metadata is projected.
    pub fn includes_metadata(&self) -> bool {
        self.include_all_property_metadata || self.metadata_keys_to_include.is_some()
    }

    /// Whether metadata with `key` is projected.
    pub fn includes_metadata_key(&self, key: &str) -> bool {
        self.include_all_property_metadata
            || self
                .metadata_keys_to_include
                .as_ref()
                .is_some_and(|keys| keys.contains(key))
    }

    /// Whether full references are projected for `direction`.
    pub fn includes_edge_refs(&self, direction: Direction) -> bool {
        self.include_all_edge_refs
            || match direction {
                Direction::Out => self.include_out_edge_refs,
                Direction::In => self.include_in_edge_refs,
            }
    }

    /// Whether edges labelled `label` pass the label filter.
    pub fn includes_edge_label(&self, label: &[u8]) -> bool {
        match &self.edge_labels_of_edge_refs_to_include {
            None => true,
            Some(labels) => std::str::from_utf8(label).is_ok_and(|l| labels.contains(l)),
        }
    }
}

/// Consuming builder for [`FetchHints`].
#[derive(Clone, Debug, Default)]
pub struct FetchHintsBuilder {
    hints: FetchHints,
}

impl FetchHintsBuilder {
    /// Starts from existing hints.
    pub fn from_hints(hints: FetchHints) -> Self {
        Self { hints }
    }

    /// Projects every property.
    pub fn include_all_properties(mut self, enabled: bool) -> Self {
        self.hints.include_all_properties = enabled;
        self
    }

    /// Projects only the named properties.
    pub fn property_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hints.property_names_to_include = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Projects every metadata entry.
    pub fn include_all_property_metadata(mut self, enabled: bool) -> Self {
        self.hints.include_all_property_metadata = enabled;
        self
    }

    /// Projects only the named metadata keys.
    pub fn metadata_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hints.metadata_keys_to_include = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    /// Projects metadata older than the property version.
    pub fn include_previous_metadata(mut self, enabled: bool) -> Self {
        self.hints.include_previous_metadata = enabled;
        self
    }

    /// Projects hidden data.
    pub fn include_hidden(mut self, enabled: bool) -> Self {
        self.hints.include_hidden = enabled;
        self
    }

    /// Projects full references in both directions.
    pub fn include_all_edge_refs(mut self, enabled: bool) -> Self {
        self.hints.include_all_edge_refs = enabled;
        self
    }

    /// Projects full outgoing references.
    pub fn include_out_edge_refs(mut self, enabled: bool) -> Self {
        self.hints.include_out_edge_refs = enabled;
        self
    }

    /// Projects full incoming references.
    pub fn include_in_edge_refs(mut self, enabled: bool) -> Self {
        self.hints.include_in_edge_refs = enabled;
        self
    }

    /// Restricts edge projection to the given labels.
    pub fn edge_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hints.edge_labels_of_edge_refs_to_include =
            Some(labels.into_iter().map(Into::into).collect());
        self
    }

    /// Projects per-label edge counts.
    pub fn include_edge_labels_and_counts(mut self, enabled: bool) -> Self {
        self.hints.include_edge_labels_and_counts = enabled;
        self
    }

    /// Writes edge ids in full references.
    pub fn include_edge_ids(mut self, enabled: bool) -> Self {
        self.hints.include_edge_ids = enabled;
        self
    }

    /// Writes adjacent vertex ids in full references.
    pub fn include_edge_vertex_ids(mut self, enabled: bool) -> Self {
        self.hints.include_edge_vertex_ids = enabled;
        self
    }

    /// Projects extended-data table names.
    pub fn include_extended_data_table_names(mut self, enabled: bool) -> Self {
        self.hints.include_extended_data_table_names = enabled;
        self
    }

    /// Finishes the builder.
    pub fn build(self) -> FetchHints {
        self.hints
    }
}
