//! Checked little-endian access to fields at fixed offsets.
//!
//! Record views validate their layout once with these helpers and then
//! patch fields in place through `byteorder`.

use byteorder::{ByteOrder, LittleEndian};

use crate::{Error, Result};

/// Check that `len` bytes starting at `offset` fit inside `data`.
#[inline]
pub fn check_span(data: &[u8], offset: usize, len: usize) -> Result<()> {
    match offset.checked_add(len) {
        Some(end) if end <= data.len() => Ok(()),
        _ => Err(Error::OutOfBounds {
            offset,
            len,
            size: data.len(),
        }),
    }
}

#[inline]
pub fn u32_at(data: &[u8], offset: usize) -> Result<u32> {
    check_span(data, offset, 4)?;
    Ok(LittleEndian::read_u32(&data[offset..]))
}

/// Bytes from `offset` up to the first NUL (or the end of `data`).
pub fn name_at(data: &[u8], offset: usize) -> &[u8] {
    let tail = data.get(offset..).unwrap_or_default();
    let end = memchr::memchr(0, tail).unwrap_or(tail.len());
    &tail[..end]
}

/// Read `N` little-endian f32 values starting at `offset`.
pub fn f32_array_at<const N: usize>(data: &[u8], offset: usize) -> Result<[f32; N]> {
    check_span(data, offset, N * 4)?;
    let mut out = [0.0f32; N];
    LittleEndian::read_f32_into(&data[offset..offset + N * 4], &mut out);
    Ok(out)
}
