#![forbid(unsafe_code)]
//! Length-prefixed binary codec shared by the edge-info payloads and the
//! encoded element records.
//!
//! Every variable-length value is written as a 4-byte big-endian signed
//! length followed by the raw bytes. A length of [`NULL_LEN`] marks an absent
//! value, `0` an empty one. Readers never turn a malformed prefix into a
//! silent `None`: they fail with [`PushdownError::Format`].

use crate::types::{PushdownError, Result};

/// Length prefix reserved for "no value".
pub const NULL_LEN: i32 = -1;

const I32_LEN: usize = core::mem::size_of::<i32>();
const I64_LEN: usize = core::mem::size_of::<i64>();

pub mod ord {
    //! Fixed-width big-endian integers.

    use super::I32_LEN;
    use crate::types::{PushdownError, Result};

    /// Appends a big-endian i32.
    #[inline]
    pub fn put_i32_be(dst: &mut Vec<u8>, v: i32) {
        dst.extend_from_slice(&v.to_be_bytes());
    }

    /// Appends a big-endian i64.
    #[inline]
    pub fn put_i64_be(dst: &mut Vec<u8>, v: i64) {
        dst.extend_from_slice(&v.to_be_bytes());
    }

    /// Reads a big-endian i32 at `off` without going through a cursor.
    ///
    /// Used on the edge-info path where every vertex row decodes one payload
    /// per edge reference.
    #[inline]
    pub fn read_i32_be(src: &[u8], off: usize) -> Result<i32> {
        match src.get(off..off.saturating_add(I32_LEN)) {
            Some(&[a, b, c, d]) => Ok(i32::from_be_bytes([a, b, c, d])),
            _ => Err(PushdownError::format(
                "i32 field",
                format_args!("{I32_LEN} bytes at offset {off}"),
                format_args!("{} bytes", src.len().saturating_sub(off)),
            )),
        }
    }
}

pub mod write {
    //! Writers for tag bytes, longs and length-prefixed values.

    use super::{ord, NULL_LEN};
    use crate::types::{PushdownError, Result};

    /// Appends a single tag byte.
    #[inline]
    pub fn put_u8(dst: &mut Vec<u8>, v: u8) {
        dst.push(v);
    }

    /// Appends a signed 32-bit count or index.
    #[inline]
    pub fn put_i32(dst: &mut Vec<u8>, v: i32) {
        ord::put_i32_be(dst, v);
    }

    /// Appends a signed 64-bit long.
    #[inline]
    pub fn put_i64(dst: &mut Vec<u8>, v: i64) {
        ord::put_i64_be(dst, v);
    }

    /// Appends a collection length. Lengths beyond `i32::MAX` are rejected.
    #[inline]
    pub fn put_len(dst: &mut Vec<u8>, len: usize) -> Result<()> {
        let len = i32::try_from(len)
            .map_err(|_| PushdownError::Invalid("length exceeds i32 prefix"))?;
        put_i32(dst, len);
        Ok(())
    }

    /// Appends a length-prefixed byte string, or the null sentinel.
    pub fn put_bytes(dst: &mut Vec<u8>, bytes: Option<&[u8]>) -> Result<()> {
        match bytes {
            None => put_i32(dst, NULL_LEN),
            Some(bytes) => {
                put_len(dst, bytes.len())?;
                dst.extend_from_slice(bytes);
            }
        }
        Ok(())
    }

    /// Appends a length-prefixed UTF-8 string, or the null sentinel.
    #[inline]
    pub fn put_str(dst: &mut Vec<u8>, s: Option<&str>) -> Result<()> {
        put_bytes(dst, s.map(str::as_bytes))
    }

    /// Appends a count-prefixed list of strings. `None` writes the null count.
    pub fn put_str_set<'a, I>(dst: &mut Vec<u8>, items: Option<I>) -> Result<()>
    where
        I: ExactSizeIterator<Item = &'a str>,
    {
        match items {
            None => put_i32(dst, NULL_LEN),
            Some(items) => {
                put_len(dst, items.len())?;
                for item in items {
                    put_str(dst, Some(item))?;
                }
            }
        }
        Ok(())
    }
}

pub mod buf {
    //! A slice-backed cursor that mirrors the writers in [`super::write`].

    use core::fmt;

    use super::{I32_LEN, I64_LEN, NULL_LEN};
    use crate::types::{PushdownError, Result};

    /// A cursor for reading bytes from a slice with offset tracking.
    #[derive(Clone)]
    pub struct Cursor<'a> {
        /// The underlying byte slice.
        pub buf: &'a [u8],
        /// Current read offset.
        pub off: usize,
    }

    impl<'a> Cursor<'a> {
        /// Creates a new cursor starting at offset 0.
        pub fn new(buf: &'a [u8]) -> Self {
            Self { buf, off: 0 }
        }

        /// Takes the next `n` bytes from the cursor, advancing the offset.
        pub fn take(&mut self, n: usize, context: &'static str) -> Result<&'a [u8]> {
            let end = self.off.checked_add(n).filter(|end| *end <= self.buf.len());
            let Some(end) = end else {
                return Err(PushdownError::format(
                    context,
                    format_args!("{n} bytes"),
                    format_args!("{} remaining", self.remaining()),
                ));
            };
            let slice = &self.buf[self.off..end];
            self.off = end;
            Ok(slice)
        }

        /// Reads one tag byte.
        pub fn read_u8(&mut self, context: &'static str) -> Result<u8> {
            Ok(self.take(1, context)?[0])
        }

        /// Reads a tag byte and checks it against `expected`.
        pub fn expect_u8(&mut self, expected: u8, context: &'static str) -> Result<()> {
            let found = self.read_u8(context)?;
            if found != expected {
                return Err(PushdownError::format(context, expected, found));
            }
            Ok(())
        }

        /// Reads a big-endian i32.
        pub fn read_i32(&mut self, context: &'static str) -> Result<i32> {
            let raw = self.take(I32_LEN, context)?;
            let mut arr = [0u8; I32_LEN];
            arr.copy_from_slice(raw);
            Ok(i32::from_be_bytes(arr))
        }

        /// Reads a big-endian i64.
        pub fn read_i64(&mut self, context: &'static str) -> Result<i64> {
            let raw = self.take(I64_LEN, context)?;
            let mut arr = [0u8; I64_LEN];
            arr.copy_from_slice(raw);
            Ok(i64::from_be_bytes(arr))
        }

        /// Reads a non-negative count. The null sentinel maps to `None`.
        pub fn read_len(&mut self, context: &'static str) -> Result<Option<usize>> {
            match self.read_i32(context)? {
                NULL_LEN => Ok(None),
                len if len < 0 => Err(PushdownError::format(
                    context,
                    "length >= -1",
                    len,
                )),
                len => Ok(Some(len as usize)),
            }
        }

        /// Reads a length-prefixed byte string.
        pub fn read_bytes(&mut self, context: &'static str) -> Result<Option<&'a [u8]>> {
            match self.read_len(context)? {
                None => Ok(None),
                Some(len) => self.take(len, context).map(Some),
            }
        }

        /// Reads a length-prefixed UTF-8 string.
        pub fn read_str(&mut self, context: &'static str) -> Result<Option<&'a str>> {
            match self.read_bytes(context)? {
                None => Ok(None),
                Some(raw) => core::str::from_utf8(raw)
                    .map(Some)
                    .map_err(|err| PushdownError::format(context, "UTF-8 string", err)),
            }
        }

        /// Reads a string that must not be the null sentinel.
        pub fn read_required_str(&mut self, context: &'static str) -> Result<&'a str> {
            self.read_str(context)?
                .ok_or_else(|| PushdownError::format(context, "string", "null"))
        }

        /// Reads a count-prefixed list of strings written by `put_str_set`.
        pub fn read_str_set(&mut self, context: &'static str) -> Result<Option<Vec<String>>> {
            let Some(count) = self.read_len(context)? else {
                return Ok(None);
            };
            // Every entry needs at least its length prefix.
            if count > self.remaining() / I32_LEN {
                return Err(PushdownError::format(
                    context,
                    format_args!("{count} entries"),
                    format_args!("{} remaining bytes", self.remaining()),
                ));
            }
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                items.push(self.read_required_str(context)?.to_owned());
            }
            Ok(Some(items))
        }

        /// Returns the number of bytes remaining in the buffer.
        pub fn remaining(&self) -> usize {
            self.buf.len().saturating_sub(self.off)
        }

        /// Fails unless every byte has been consumed.
        pub fn expect_end(&self, context: &'static str) -> Result<()> {
            if self.remaining() != 0 {
                return Err(PushdownError::format(
                    context,
                    "end of record",
                    format_args!("{} trailing bytes", self.remaining()),
                ));
            }
            Ok(())
        }
    }

    impl<'a> fmt::Debug for Cursor<'a> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("Cursor")
                .field("off", &self.off)
                .field("remaining", &self.remaining())
                .finish()
        }
    }
}

/// Appends `payload` to `dst` behind a 4-byte length frame.
pub fn write_frame(dst: &mut Vec<u8>, payload: &[u8]) -> Result<()> {
    let len = i32::try_from(payload.len())
        .map_err(|_| PushdownError::Invalid("record exceeds i32 frame length"))?;
    ord::put_i32_be(dst, len);
    dst.extend_from_slice(payload);
    Ok(())
}

/// Splits the next framed record off `src`, returning it and the remainder.
pub fn read_frame(src: &[u8]) -> Result<(&[u8], &[u8])> {
    let mut cur = buf::Cursor::new(src);
    let len = cur
        .read_len("record frame")?
        .ok_or_else(|| PushdownError::format("record frame", "payload length", NULL_LEN))?;
    let payload = cur.take(len, "record frame")?;
    Ok((payload, &src[cur.off..]))
}
