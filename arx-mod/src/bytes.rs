//! Little-endian byte helpers shared by the container reader and writer.

use crate::{EncodeError, LoadError};

/// Alignment of section payloads within the data region.
pub(crate) const SECTION_ALIGN: usize = 16;

/// Round `len` up to the next section-alignment boundary.
pub(crate) const fn align_up(len: usize) -> usize {
    let rem = len % SECTION_ALIGN;
    len + (rem != 0) as usize * (SECTION_ALIGN - rem)
}

/// Sequential reader over a byte slice. Every read is bounds-checked and
/// reports the absolute offset on failure.
pub(crate) struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    pub(crate) fn take(&mut self, n: usize) -> Result<&'a [u8], LoadError> {
        let end = self.pos.checked_add(n).ok_or(LoadError::Truncated {
            offset: self.pos,
            needed: n,
        })?;
        let bytes = self.buf.get(self.pos..end).ok_or_else(|| LoadError::Truncated {
            offset: self.pos,
            needed: n - self.remaining(),
        })?;
        self.pos = end;
        Ok(bytes)
    }

    pub(crate) fn array<const N: usize>(&mut self) -> Result<[u8; N], LoadError> {
        let bytes = self.take(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub(crate) fn u32(&mut self) -> Result<u32, LoadError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    pub(crate) fn u64(&mut self) -> Result<u64, LoadError> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    /// Read a NUL-padded fixed-width string field.
    pub(crate) fn fixed_str(&mut self, width: usize) -> Result<String, LoadError> {
        let bytes = self.take(width)?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(width);
        Ok(String::from_utf8(bytes[..end].to_vec())?)
    }
}

pub(crate) fn put_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

pub(crate) fn put_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_le_bytes());
}

/// Write a NUL-padded fixed-width string field. The name may use at most
/// `width - 1` bytes so the field always terminates.
pub(crate) fn put_fixed_str(
    buf: &mut Vec<u8>,
    s: &str,
    width: usize,
) -> Result<(), EncodeError> {
    if s.len() >= width {
        return Err(EncodeError::NameTooLong {
            name: s.to_string(),
            max: width - 1,
        });
    }
    buf.extend_from_slice(s.as_bytes());
    buf.extend(std::iter::repeat(0u8).take(width - s.len()));
    Ok(())
}

/// Pad `buf` with zero bytes up to the section alignment.
pub(crate) fn pad_to_alignment(buf: &mut Vec<u8>) {
    let target = align_up(buf.len());
    buf.resize(target, 0);
}
