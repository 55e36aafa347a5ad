use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::family::ColumnFamily;

/// Trait for tracking how element rows flow through the pushdown iterators.
///
/// Implementations are shared between scan sessions, so every method takes
/// `&self` and must be cheap: they run once per column on the scan path.
pub trait IteratorMetrics: Send + Sync {
    /// Records one classified column.
    fn column_processed(&self, family: ColumnFamily);

    /// Records a row that resolved into a visible element.
    fn row_resolved(&self);

    /// Records a row that resolved to nothing (deleted, hidden or bare).
    fn row_skipped(&self);

    /// Records a row whose resolution failed.
    fn row_failed(&self);

    /// Records an encoded record of `bytes` length.
    fn record_encoded(&self, bytes: usize);
}

/// A no-op implementation of [`IteratorMetrics`].
#[derive(Default)]
pub struct NoopMetrics;

impl IteratorMetrics for NoopMetrics {
    fn column_processed(&self, _family: ColumnFamily) {}
    fn row_resolved(&self) {}
    fn row_skipped(&self) {}
    fn row_failed(&self) {}
    fn record_encoded(&self, _bytes: usize) {}
}

/// Atomic counters for [`IteratorMetrics`].
#[derive(Default)]
pub struct CounterMetrics {
    /// Number of columns classified.
    pub columns_processed: AtomicU64,

    /// Number of edge-reference columns (either direction).
    pub edge_columns: AtomicU64,

    /// Number of property value columns.
    pub property_columns: AtomicU64,

    /// Rows that produced an element.
    pub rows_resolved: AtomicU64,

    /// Rows that produced nothing.
    pub rows_skipped: AtomicU64,

    /// Rows aborted by an error.
    pub rows_failed: AtomicU64,

    /// Total bytes of encoded records.
    pub bytes_encoded: AtomicU64,
}

impl IteratorMetrics for CounterMetrics {
    fn column_processed(&self, family: ColumnFamily) {
        self.columns_processed.fetch_add(1, Ordering::Relaxed);
        match family {
            ColumnFamily::OutEdge | ColumnFamily::InEdge => {
                self.edge_columns.fetch_add(1, Ordering::Relaxed);
            }
            ColumnFamily::Property => {
                self.property_columns.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    fn row_resolved(&self) {
        self.rows_resolved.fetch_add(1, Ordering::Relaxed);
    }

    fn row_skipped(&self) {
        self.rows_skipped.fetch_add(1, Ordering::Relaxed);
    }

    fn row_failed(&self) {
        self.rows_failed.fetch_add(1, Ordering::Relaxed);
    }

    fn record_encoded(&self, bytes: usize) {
        self.bytes_encoded.fetch_add(bytes as u64, Ordering::Relaxed);
    }
}

/// Returns the default metrics implementation, [`NoopMetrics`].
pub fn default_metrics() -> Arc<dyn IteratorMetrics> {
    Arc::new(NoopMetrics)
}
