//! Row-at-a-time resolution over a sorted column source.
//!
//! The iterator owns one reusable [`ElementData`]. Each call to
//! [`ElementIterator::advance_row`] consumes every column of the next row,
//! routing it through the family table of the element kind; the
//! [`Iterator`] impl additionally encodes each row and skips rows that
//! resolve to nothing.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, trace, warn};

use super::column::{Column, ColumnSource};
use super::element::{EdgeData, ElementData, VertexData};
use super::family::FamilyTable;
use super::metrics::{default_metrics, IteratorMetrics};
use super::options::IteratorOptions;
use crate::primitives::bytes::write_frame;
use crate::types::Result;

/// One encoded element, keyed by its row id.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EncodedElement {
    /// Row id of the element.
    pub row: Bytes,
    /// Encoded record.
    pub value: Vec<u8>,
}

/// Outcome of [`ElementIterator::write_framed`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FramedSummary {
    /// Records appended.
    pub written: usize,
    /// Rows dropped because they failed to resolve.
    pub failed: usize,
}

/// Resolves rows of `source` into elements of kind `D`.
pub struct ElementIterator<S: ColumnSource, D: ElementData> {
    source: S,
    pending: Option<Column>,
    row: Bytes,
    data: D,
    families: &'static FamilyTable,
    options: IteratorOptions,
    metrics: Arc<dyn IteratorMetrics>,
}

/// Iterator over vertex rows.
pub type VertexIterator<S> = ElementIterator<S, VertexData>;

/// Iterator over edge rows.
pub type EdgeIterator<S> = ElementIterator<S, EdgeData>;

impl<S: ColumnSource, D: ElementData> ElementIterator<S, D> {
    /// Wraps `source`, which must yield columns in storage order.
    pub fn new(source: S, options: IteratorOptions) -> Self {
        let metrics = options.metrics.clone().unwrap_or_else(default_metrics);
        Self {
            source,
            pending: None,
            row: Bytes::new(),
            data: D::default(),
            families: FamilyTable::for_kind(D::KIND),
            options,
            metrics,
        }
    }

    /// Independent copy for another scan session, including the source.
    pub fn deep_copy(&self) -> Self {
        Self {
            source: self.source.deep_copy(),
            pending: self.pending.clone(),
            row: self.row.clone(),
            data: self.data.clone(),
            families: self.families,
            options: self.options.clone(),
            metrics: Arc::clone(&self.metrics),
        }
    }

    /// Options this iterator was built with.
    pub fn options(&self) -> &IteratorOptions {
        &self.options
    }

    /// Row id of the most recently resolved row.
    pub fn row(&self) -> &Bytes {
        &self.row
    }

    /// State of the most recently resolved row.
    pub fn current(&self) -> &D {
        &self.data
    }

    /// Resolves the next row into [`ElementIterator::current`].
    ///
    /// Returns `Ok(false)` once the source is exhausted. On error the rest of
    /// the failing row is still consumed, so the next call starts on a fresh
    /// row.
    pub fn advance_row(&mut self) -> Result<bool> {
        let Some(mut column) = self.pending.take().or_else(|| self.source.next()) else {
            return Ok(false);
        };
        self.row = column.key.row.clone();
        let mut failure = self.data.start_row(&self.row).err();
        loop {
            if failure.is_none() {
                failure = self.process(&column).err();
            }
            match self.source.next() {
                Some(next) if next.key.row == self.row => column = next,
                Some(next) => {
                    self.pending = Some(next);
                    break;
                }
                None => break,
            }
        }
        match failure {
            Some(err) => {
                self.metrics.row_failed();
                debug!(row = ?self.row, error = %err, "pushdown.row.failed");
                Err(err)
            }
            None => Ok(true),
        }
    }

    fn process(&mut self, column: &Column) -> Result<()> {
        let family = match self.families.classify(&column.key.family) {
            Ok(family) => family,
            Err(err) => {
                warn!(
                    row = ?column.key.row,
                    family = %String::from_utf8_lossy(&column.key.family),
                    kind = %self.families.kind(),
                    "pushdown.column.protocol_violation"
                );
                return Err(err);
            }
        };
        self.metrics.column_processed(family);
        self.data
            .process_column(family, column, self.options.names.as_ref())
            .map_err(|err| {
                debug!(
                    row = ?column.key.row,
                    family = family.as_str(),
                    error = %err,
                    "pushdown.column.rejected"
                );
                err
            })
    }

    /// Appends every remaining element to `out` as length-framed records.
    ///
    /// Rows that fail to resolve are skipped and counted; they were already
    /// reported through [`IteratorMetrics::row_failed`]. `out` only ever
    /// holds whole frames: if framing itself fails, `out` is restored to its
    /// length on entry.
    pub fn write_framed(&mut self, out: &mut Vec<u8>) -> Result<FramedSummary> {
        let start = out.len();
        let mut summary = FramedSummary::default();
        for element in self.by_ref() {
            match element {
                Ok(element) => {
                    if let Err(err) = write_frame(out, &element.value) {
                        out.truncate(start);
                        return Err(err);
                    }
                    summary.written += 1;
                }
                Err(_) => summary.failed += 1,
            }
        }
        Ok(summary)
    }
}

impl<S: ColumnSource, D: ElementData> Iterator for ElementIterator<S, D> {
    type Item = Result<EncodedElement>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.advance_row() {
                Ok(true) => {}
                Ok(false) => return None,
                Err(err) => return Some(Err(err)),
            }
            match self.data.encode(&self.options.fetch_hints) {
                Ok(Some(value)) => {
                    self.metrics.row_resolved();
                    self.metrics.record_encoded(value.len());
                    trace!(row = ?self.row, bytes = value.len(), "pushdown.row.resolved");
                    return Some(Ok(EncodedElement {
                        row: self.row.clone(),
                        value,
                    }));
                }
                Ok(None) => {
                    self.metrics.row_skipped();
                    trace!(row = ?self.row, "pushdown.row.skipped");
                }
                Err(err) => {
                    self.metrics.row_failed();
                    debug!(row = ?self.row, error = %err, "pushdown.row.failed");
                    return Some(Err(err));
                }
            }
        }
    }
}
