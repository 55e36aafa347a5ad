//! Pushdown element materialization for a cell-secured wide-column graph store.
//!
//! Server-side iterators in [`storage`] fold the sorted, versioned columns of
//! one element row into a single visible snapshot and encode it as a compact
//! binary record; [`storage::record`] decodes those records downstream.

#![warn(missing_docs)]

pub mod primitives;
pub mod storage;
pub mod types;
