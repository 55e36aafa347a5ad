//! Per-element deduplicated edge-label table.

use bytes::Bytes;

use crate::types::{PushdownError, Result};

/// Ordered list of distinct edge labels, addressed by index.
///
/// A vertex rarely carries more than a handful of labels, so lookups scan the
/// list instead of hashing. Indices are only meaningful until the next
/// [`EdgeLabels::clear`].
#[derive(Clone, Debug, Default)]
pub struct EdgeLabels {
    labels: Vec<Bytes>,
}

impl EdgeLabels {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the index of `label`, appending it when unseen.
    pub fn add(&mut self, label: &[u8]) -> u32 {
        if let Some(idx) = self.position(label) {
            return idx;
        }
        self.labels.push(Bytes::copy_from_slice(label));
        (self.labels.len() - 1) as u32
    }

    /// Same as [`EdgeLabels::add`] for the `len` bytes at `offset` of `buf`.
    pub fn add_range(&mut self, buf: &[u8], offset: usize, len: usize) -> Result<u32> {
        let label = offset
            .checked_add(len)
            .and_then(|end| buf.get(offset..end))
            .ok_or_else(|| {
                PushdownError::format(
                    "edge label",
                    format_args!("{len} bytes at offset {offset}"),
                    format_args!("{} byte buffer", buf.len()),
                )
            })?;
        Ok(self.add(label))
    }

    /// Returns the label stored at `index`.
    pub fn get(&self, index: u32) -> Option<&Bytes> {
        self.labels.get(index as usize)
    }

    /// Returns the index of `label` without inserting it.
    pub fn position(&self, label: &[u8]) -> Option<u32> {
        self.labels
            .iter()
            .position(|existing| existing.as_ref() == label)
            .map(|idx| idx as u32)
    }

    /// Number of distinct labels.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Returns `true` when no label has been added.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Forgets every label; previously handed-out indices become invalid.
    pub fn clear(&mut self) {
        self.labels.clear();
    }
}
