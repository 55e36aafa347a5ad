//! Per-row element state and its resolution rules.
//!
//! One [`ElementData`] value is reused for every row of a scan: the iterator
//! calls [`ElementData::start_row`], feeds each column of the row in storage
//! order through [`ElementData::process_column`], then asks for
//! [`ElementData::encode`] once the row ends.

mod common;
mod edge;
mod vertex;

use bytes::Bytes;

pub use common::{ElementCore, MetadataEntry, MetadataTable, PropertyRecord, Signal};
pub use edge::EdgeData;
pub use vertex::VertexData;

use crate::storage::column::Column;
use crate::storage::family::ColumnFamily;
use crate::storage::hints::FetchHints;
use crate::storage::qualifier::NameSubstitution;
use crate::types::{ElementKind, Result};

/// Value of a hidden-marker column that un-hides instead of hiding.
pub const HIDDEN_VALUE_DELETED: &[u8] = b"X";

/// Resolution state for one element kind.
pub trait ElementData: Clone + Default + Send {
    /// Kind of element this state resolves.
    const KIND: ElementKind;

    /// State shared by every kind.
    fn core(&self) -> &ElementCore;

    /// Mutable access to the shared state.
    fn core_mut(&mut self) -> &mut ElementCore;

    /// Applies a signal column of this kind.
    fn apply_signal(&mut self, column: &Column, names: &dyn NameSubstitution) -> Result<()>;

    /// Merges a column of a family specific to this kind.
    fn process_kind_column(
        &mut self,
        family: ColumnFamily,
        column: &Column,
        names: &dyn NameSubstitution,
    ) -> Result<()>;

    /// Writes the kind-specific tail of the record.
    fn encode_body(&self, hints: &FetchHints, out: &mut Vec<u8>) -> Result<()>;

    /// Resets the kind-specific collections.
    fn clear_kind(&mut self);

    /// Clears all state and adopts `row` as the element id.
    fn start_row(&mut self, row: &Bytes) -> Result<()> {
        self.clear();
        self.core_mut().set_id(row)
    }

    /// Resets every collection, keeping allocations.
    fn clear(&mut self) {
        self.core_mut().clear();
        self.clear_kind();
    }

    /// Routes one classified column to the matching merge rule.
    fn process_column(
        &mut self,
        family: ColumnFamily,
        column: &Column,
        names: &dyn NameSubstitution,
    ) -> Result<()> {
        if family.is_signal() {
            self.apply_signal(column, names)
        } else if family.is_shared() {
            self.core_mut()
                .process_shared(Self::KIND, family, column, names)
        } else {
            self.process_kind_column(family, column, names)
        }
    }

    /// Whether the element is emitted under `hints`.
    fn is_visible(&self, hints: &FetchHints) -> bool {
        self.core().is_visible(hints)
    }

    /// Encodes the element, or returns `None` when it is not emitted.
    ///
    /// The record is assembled in a private buffer, so an error never leaves
    /// a partial record behind.
    fn encode(&self, hints: &FetchHints) -> Result<Option<Vec<u8>>> {
        if !self.is_visible(hints) {
            return Ok(None);
        }
        let mut out = Vec::with_capacity(128);
        self.core().encode_common(Self::KIND, hints, &mut out)?;
        self.encode_body(hints, &mut out)?;
        Ok(Some(out))
    }
}
