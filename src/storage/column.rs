//! Versioned wide-column entries and the sorted upstream source.

use std::cmp::Ordering;

use bytes::Bytes;

use crate::types::{PushdownError, Result, Timestamp};

/// Key of one versioned cell.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ColumnKey {
    /// Row id; one row per graph element.
    pub row: Bytes,
    /// Raw column-family tag.
    pub family: Bytes,
    /// Raw column qualifier.
    pub qualifier: Bytes,
    /// Cell visibility expression.
    pub visibility: Bytes,
    /// Cell timestamp.
    pub timestamp: Timestamp,
    /// Whether this entry is a delete marker.
    pub deleted: bool,
}

impl ColumnKey {
    /// The visibility expression as UTF-8.
    pub fn visibility_str(&self) -> Result<&str> {
        std::str::from_utf8(&self.visibility)
            .map_err(|err| PushdownError::format("column visibility", "UTF-8", err))
    }

    /// The qualifier as UTF-8, for families whose qualifier is a single id.
    pub fn qualifier_str(&self) -> Result<&str> {
        std::str::from_utf8(&self.qualifier)
            .map_err(|err| PushdownError::format("column qualifier", "UTF-8", err))
    }
}

impl Ord for ColumnKey {
    /// Storage order: row, family, qualifier and visibility ascending, then
    /// newest timestamp first, delete markers ahead of puts at equal time.
    fn cmp(&self, other: &Self) -> Ordering {
        self.row
            .cmp(&other.row)
            .then_with(|| self.family.cmp(&other.family))
            .then_with(|| self.qualifier.cmp(&other.qualifier))
            .then_with(|| self.visibility.cmp(&other.visibility))
            .then_with(|| other.timestamp.cmp(&self.timestamp))
            .then_with(|| other.deleted.cmp(&self.deleted))
    }
}

impl PartialOrd for ColumnKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// One versioned cell: key plus value bytes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Column {
    /// Cell key.
    pub key: ColumnKey,
    /// Cell value; empty for delete markers.
    pub value: Bytes,
}

impl Column {
    /// Creates a put entry.
    pub fn put(
        row: impl Into<Bytes>,
        family: &'static [u8],
        qualifier: impl Into<Bytes>,
        visibility: impl Into<Bytes>,
        timestamp: Timestamp,
        value: impl Into<Bytes>,
    ) -> Self {
        Self {
            key: ColumnKey {
                row: row.into(),
                family: Bytes::from_static(family),
                qualifier: qualifier.into(),
                visibility: visibility.into(),
                timestamp,
                deleted: false,
            },
            value: value.into(),
        }
    }

    /// Creates a delete marker.
    pub fn delete(
        row: impl Into<Bytes>,
        family: &'static [u8],
        qualifier: impl Into<Bytes>,
        visibility: impl Into<Bytes>,
        timestamp: Timestamp,
    ) -> Self {
        let mut column = Self::put(row, family, qualifier, visibility, timestamp, Bytes::new());
        column.key.deleted = true;
        column
    }
}

/// Sorted supplier of columns, grouped by row.
///
/// Parallel scan sessions each take their own [`ColumnSource::deep_copy`]
/// before iteration starts.
pub trait ColumnSource: Iterator<Item = Column> {
    /// Returns an independent copy positioned where `self` is.
    fn deep_copy(&self) -> Self
    where
        Self: Sized;
}

/// In-memory column source over a sorted vector.
#[derive(Clone, Debug, Default)]
pub struct VecColumnSource {
    columns: Vec<Column>,
    pos: usize,
}

impl VecColumnSource {
    /// Sorts `columns` into storage order and wraps them.
    pub fn new(mut columns: Vec<Column>) -> Self {
        columns.sort_by(|a, b| a.key.cmp(&b.key));
        Self { columns, pos: 0 }
    }

    /// Number of columns not yet yielded.
    pub fn remaining(&self) -> usize {
        self.columns.len() - self.pos
    }
}

impl Iterator for VecColumnSource {
    type Item = Column;

    fn next(&mut self) -> Option<Column> {
        let column = self.columns.get(self.pos)?.clone();
        self.pos += 1;
        Some(column)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining(), Some(self.remaining()))
    }
}

impl ColumnSource for VecColumnSource {
    fn deep_copy(&self) -> Self {
        self.clone()
    }
}
