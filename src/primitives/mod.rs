//! Low-level primitives shared by the storage layer.

/// Byte-level utilities and encoding/decoding.
///
/// Length-prefixed writers, big-endian readers and a bounds-checked cursor.
pub mod bytes;
