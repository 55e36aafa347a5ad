//! State shared by every element kind: signal, element-level markers,
//! properties and their metadata.

use std::collections::BTreeMap;

use bytes::Bytes;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::primitives::bytes::write;
use crate::storage::column::Column;
use crate::storage::family::ColumnFamily;
use crate::storage::hints::FetchHints;
use crate::storage::qualifier::{NameSubstitution, PropertySlot};
use crate::storage::record::FORMAT_VERSION;
use crate::types::{ElementKind, PushdownError, Result, Timestamp};

use super::HIDDEN_VALUE_DELETED;

/// The honored existence / tombstone column of an element.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Signal {
    /// Timestamp of the signal column.
    pub timestamp: Timestamp,
    /// Element visibility taken from the signal column.
    pub visibility: String,
    /// Whether the newest signal is a delete marker.
    pub deleted: bool,
}

/// Newest retained version of one property slot.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PropertyRecord {
    /// `(key, name, visibility)` identity.
    pub slot: PropertySlot,
    /// Version timestamp.
    pub timestamp: Timestamp,
    /// Raw value bytes.
    pub value: Bytes,
}

/// Deduplicated `(key, visibility, value)` metadata entry.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct MetadataEntry {
    /// Metadata key.
    pub key: String,
    /// Metadata visibility.
    pub visibility: String,
    /// Raw value bytes.
    pub value: Bytes,
}

/// Side table of metadata entries shared between properties.
#[derive(Clone, Debug, Default)]
pub struct MetadataTable {
    entries: Vec<MetadataEntry>,
    index: FxHashMap<MetadataEntry, u32>,
}

impl MetadataTable {
    /// Returns the index of `entry`, appending it when unseen.
    pub fn intern(&mut self, entry: MetadataEntry) -> u32 {
        if let Some(idx) = self.index.get(&entry) {
            return *idx;
        }
        let idx = self.entries.len() as u32;
        self.index.insert(entry.clone(), idx);
        self.entries.push(entry);
        idx
    }

    /// Entry at `idx`.
    pub fn get(&self, idx: u32) -> Option<&MetadataEntry> {
        self.entries.get(idx as usize)
    }

    /// Number of distinct entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }
}

/// A property's reference to the newest version of one metadata key.
#[derive(Clone, Debug, Eq, PartialEq)]
struct MetadataRef {
    key: String,
    visibility: String,
    timestamp: Timestamp,
    // `None` when the newest version is a delete marker.
    entry: Option<u32>,
}

/// Resolution state common to vertices and edges.
#[derive(Clone, Debug, Default)]
pub struct ElementCore {
    id: String,
    signal: Option<Signal>,
    soft_delete_timestamp: Timestamp,
    // hiding visibility -> active
    hidden: BTreeMap<String, bool>,
    additional_visibilities: BTreeMap<String, bool>,
    extended_data_tables: BTreeMap<String, bool>,
    properties: Vec<PropertyRecord>,
    // `None` marks a slot whose newest version is a delete marker.
    property_slots: FxHashMap<PropertySlot, Option<usize>>,
    metadata: MetadataTable,
    property_metadata: FxHashMap<PropertySlot, SmallVec<[MetadataRef; 4]>>,
    property_soft_deletes: FxHashMap<PropertySlot, Timestamp>,
    hidden_properties: FxHashMap<PropertySlot, SmallVec<[(String, bool); 2]>>,
}

impl ElementCore {
    /// Element id (the row id).
    pub fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn set_id(&mut self, row: &Bytes) -> Result<()> {
        let id = std::str::from_utf8(row)
            .map_err(|err| PushdownError::format("element row id", "UTF-8", err))?;
        self.id.clear();
        self.id.push_str(id);
        Ok(())
    }

    /// The honored signal, if any signal column was seen.
    pub fn signal(&self) -> Option<&Signal> {
        self.signal.as_ref()
    }

    /// Whether the newest signal is a delete marker.
    pub fn is_deleted(&self) -> bool {
        self.signal.as_ref().is_some_and(|s| s.deleted)
    }

    /// Newest element soft-delete timestamp, `0` when none.
    pub fn soft_delete_timestamp(&self) -> Timestamp {
        self.soft_delete_timestamp
    }

    /// Visibilities under which the element is currently hidden.
    pub fn hidden_visibilities(&self) -> impl Iterator<Item = &str> + '_ {
        active_keys(&self.hidden)
    }

    /// Additional visibilities required to see the element.
    pub fn additional_visibilities(&self) -> impl Iterator<Item = &str> + '_ {
        active_keys(&self.additional_visibilities)
    }

    /// Extended-data table names attached to the element.
    pub fn extended_data_table_names(&self) -> impl Iterator<Item = &str> + '_ {
        active_keys(&self.extended_data_tables)
    }

    /// Newest retained version of a property, ignoring visibility rules.
    pub fn property(&self, key: &str, name: &str, visibility: &str) -> Option<&PropertyRecord> {
        let slot = PropertySlot::new(key, name, visibility);
        self.property_slots
            .get(&slot)
            .copied()
            .flatten()
            .and_then(|idx| self.properties.get(idx))
    }

    /// Properties that survive soft-deletes, hidden markers and `hints`.
    pub fn visible_properties<'a>(
        &'a self,
        hints: &'a FetchHints,
    ) -> impl Iterator<Item = &'a PropertyRecord> + 'a {
        self.properties
            .iter()
            .filter(move |record| self.is_property_visible(record, hints))
    }

    /// Shared metadata table.
    pub fn metadata(&self) -> &MetadataTable {
        &self.metadata
    }

    /// Applies a signal column; returns `true` when it became the honored one.
    pub(crate) fn apply_signal(&mut self, column: &Column) -> Result<bool> {
        let key = &column.key;
        if self
            .signal
            .as_ref()
            .is_some_and(|current| key.timestamp <= current.timestamp)
        {
            return Ok(false);
        }
        self.signal = Some(Signal {
            timestamp: key.timestamp,
            visibility: key.visibility_str()?.to_owned(),
            deleted: key.deleted,
        });
        Ok(true)
    }

    /// Merges a column of one of the families shared by both kinds.
    pub(crate) fn process_shared(
        &mut self,
        kind: ElementKind,
        family: ColumnFamily,
        column: &Column,
        names: &dyn NameSubstitution,
    ) -> Result<()> {
        let key = &column.key;
        match family {
            ColumnFamily::Property => {
                let slot =
                    PropertySlot::from_value_qualifier(&key.qualifier, key.visibility_str()?, names)?;
                if self.property_slots.contains_key(&slot) {
                    return Ok(());
                }
                if key.deleted {
                    self.property_slots.insert(slot, None);
                } else {
                    self.property_slots.insert(slot.clone(), Some(self.properties.len()));
                    self.properties.push(PropertyRecord {
                        slot,
                        timestamp: key.timestamp,
                        value: column.value.clone(),
                    });
                }
            }
            ColumnFamily::PropertyMetadata => {
                let (slot, metadata_key) =
                    PropertySlot::from_metadata_qualifier(&key.qualifier, names)?;
                let visibility = key.visibility_str()?;
                let refs = self.property_metadata.entry(slot).or_default();
                if refs
                    .iter()
                    .any(|r| r.key == metadata_key && r.visibility == visibility)
                {
                    return Ok(());
                }
                let entry = if key.deleted {
                    None
                } else {
                    Some(self.metadata.intern(MetadataEntry {
                        key: metadata_key.clone(),
                        visibility: visibility.to_owned(),
                        value: column.value.clone(),
                    }))
                };
                refs.push(MetadataRef {
                    key: metadata_key,
                    visibility: visibility.to_owned(),
                    timestamp: key.timestamp,
                    entry,
                });
            }
            ColumnFamily::PropertySoftDelete => {
                if key.deleted {
                    return Ok(());
                }
                let slot =
                    PropertySlot::from_value_qualifier(&key.qualifier, key.visibility_str()?, names)?;
                let ts = self.property_soft_deletes.entry(slot).or_insert(key.timestamp);
                *ts = (*ts).max(key.timestamp);
            }
            ColumnFamily::PropertyHidden => {
                let slot = PropertySlot::from_hidden_qualifier(&key.qualifier, names)?;
                let hiding = key.visibility_str()?;
                let entries = self.hidden_properties.entry(slot).or_default();
                if !entries.iter().any(|(vis, _)| vis == hiding) {
                    entries.push((hiding.to_owned(), is_active_hidden(column)));
                }
            }
            ColumnFamily::ElementHidden => {
                let hiding = key.visibility_str()?;
                if !self.hidden.contains_key(hiding) {
                    self.hidden.insert(hiding.to_owned(), is_active_hidden(column));
                }
            }
            ColumnFamily::ElementSoftDelete => {
                if !key.deleted {
                    self.soft_delete_timestamp = self.soft_delete_timestamp.max(key.timestamp);
                }
            }
            ColumnFamily::AdditionalVisibility => {
                first_wins(&mut self.additional_visibilities, column)?;
            }
            ColumnFamily::ExtendedData => {
                first_wins(&mut self.extended_data_tables, column)?;
            }
            other => {
                return Err(PushdownError::ProtocolViolation {
                    family: String::from_utf8_lossy(other.tag()).into_owned(),
                    kind,
                })
            }
        }
        Ok(())
    }

    /// Element-level emission rule.
    pub fn is_visible(&self, hints: &FetchHints) -> bool {
        let Some(signal) = &self.signal else {
            return false;
        };
        if signal.deleted {
            return false;
        }
        if self.soft_delete_timestamp != 0 && self.soft_delete_timestamp >= signal.timestamp {
            return false;
        }
        hints.include_hidden || self.hidden_visibilities().next().is_none()
    }

    fn is_property_visible(&self, record: &PropertyRecord, hints: &FetchHints) -> bool {
        if record.timestamp < self.soft_delete_timestamp {
            return false;
        }
        if self
            .property_soft_deletes
            .get(&record.slot)
            .is_some_and(|sd| *sd >= record.timestamp)
        {
            return false;
        }
        if !hints.include_hidden && self.is_property_hidden(&record.slot) {
            return false;
        }
        hints.includes_property(&record.slot.name)
    }

    fn is_property_hidden(&self, slot: &PropertySlot) -> bool {
        self.hidden_properties
            .get(slot)
            .is_some_and(|entries| entries.iter().any(|(_, active)| *active))
    }

    fn projected_metadata<'a>(
        &'a self,
        record: &'a PropertyRecord,
        hints: &'a FetchHints,
    ) -> impl Iterator<Item = u32> + 'a {
        self.property_metadata
            .get(&record.slot)
            .into_iter()
            .flatten()
            .filter(move |r| hints.includes_metadata_key(&r.key))
            .filter(move |r| hints.include_previous_metadata || r.timestamp >= record.timestamp)
            .filter_map(|r| r.entry)
    }

    /// Writes everything up to and including the property section.
    pub(crate) fn encode_common(
        &self,
        kind: ElementKind,
        hints: &FetchHints,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        let signal = self.signal.as_ref().ok_or(PushdownError::Invalid(
            "cannot encode an element without a signal column",
        ))?;

        write::put_u8(out, kind.type_id());
        write::put_u8(out, FORMAT_VERSION);
        write::put_str(out, Some(self.id.as_str()))?;
        write::put_i64(out, signal.timestamp);
        write::put_str(out, Some(signal.visibility.as_str()))?;

        let hidden: Vec<&str> = self.hidden_visibilities().collect();
        write::put_str_set(out, Some(hidden.iter().copied()))?;
        let additional: Vec<&str> = self.additional_visibilities().collect();
        write::put_str_set(out, Some(additional.iter().copied()))?;
        if hints.include_extended_data_table_names {
            let tables: Vec<&str> = self.extended_data_table_names().collect();
            write::put_str_set(out, Some(tables.iter().copied()))?;
        } else {
            write::put_str_set::<std::iter::Empty<&str>>(out, None)?;
        }

        // Only entries referenced by emitted properties reach the record.
        let with_metadata = hints.includes_metadata();
        let mut remap: FxHashMap<u32, u32> = FxHashMap::default();
        let mut table: Vec<&MetadataEntry> = Vec::new();
        let mut emitted: Vec<(&PropertyRecord, Option<SmallVec<[u32; 4]>>)> = Vec::new();
        for record in self.visible_properties(hints) {
            let indices = if with_metadata {
                let mut indices = SmallVec::new();
                for idx in self.projected_metadata(record, hints) {
                    let next = table.len() as u32;
                    let remapped = *remap.entry(idx).or_insert(next);
                    if remapped == next {
                        let entry = self.metadata.get(idx).ok_or_else(|| {
                            PushdownError::format(
                                "metadata index",
                                format_args!("0..{}", self.metadata.len()),
                                idx,
                            )
                        })?;
                        table.push(entry);
                    }
                    indices.push(remapped);
                }
                Some(indices)
            } else {
                None
            };
            emitted.push((record, indices));
        }

        write::put_len(out, table.len())?;
        for entry in &table {
            write::put_str(out, Some(entry.key.as_str()))?;
            write::put_str(out, Some(entry.visibility.as_str()))?;
            write::put_bytes(out, Some(&entry.value[..]))?;
        }

        write::put_len(out, emitted.len())?;
        for (record, indices) in &emitted {
            write::put_str(out, Some(record.slot.key.as_str()))?;
            write::put_str(out, Some(record.slot.name.as_str()))?;
            write::put_str(out, Some(record.slot.visibility.as_str()))?;
            write::put_i64(out, record.timestamp);
            write::put_bytes(out, Some(&record.value[..]))?;
            match indices {
                None => write::put_i32(out, crate::primitives::bytes::NULL_LEN),
                Some(indices) => {
                    write::put_len(out, indices.len())?;
                    for idx in indices {
                        write::put_len(out, *idx as usize)?;
                    }
                }
            }
            let hiding: Vec<&str> = self
                .hidden_properties
                .get(&record.slot)
                .into_iter()
                .flatten()
                .filter(|(_, active)| *active)
                .map(|(vis, _)| vis.as_str())
                .collect();
            write::put_str_set(out, Some(hiding.iter().copied()))?;
        }
        Ok(())
    }

    /// Resets every collection, keeping allocations.
    pub fn clear(&mut self) {
        self.id.clear();
        self.signal = None;
        self.soft_delete_timestamp = 0;
        self.hidden.clear();
        self.additional_visibilities.clear();
        self.extended_data_tables.clear();
        self.properties.clear();
        self.property_slots.clear();
        self.metadata.clear();
        self.property_metadata.clear();
        self.property_soft_deletes.clear();
        self.hidden_properties.clear();
    }
}

fn is_active_hidden(column: &Column) -> bool {
    !column.key.deleted && column.value.as_ref() != HIDDEN_VALUE_DELETED
}

fn first_wins(set: &mut BTreeMap<String, bool>, column: &Column) -> Result<()> {
    let name = column.key.qualifier_str()?;
    if !set.contains_key(name) {
        set.insert(name.to_owned(), !column.key.deleted);
    }
    Ok(())
}

fn active_keys(set: &BTreeMap<String, bool>) -> impl Iterator<Item = &str> + '_ {
    set.iter()
        .filter(|(_, active)| **active)
        .map(|(key, _)| key.as_str())
}
