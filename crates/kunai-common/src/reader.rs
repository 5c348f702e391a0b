//! Bounds-checked cursor for directory and header parsing.
//!
//! [`BinaryReader`] keeps a position into a borrowed slice and hands out
//! sub-slices without copying. Every read is bounds-checked.

use zerocopy::FromBytes;

use crate::{Error, Result};

/// A cursor over a little-endian byte slice.
///
/// # Example
///
/// ```
/// use kunai_common::BinaryReader;
///
/// // record count, then an offset table
/// let data = [0x02, 0, 0, 0, 0x10, 0, 0, 0, 0x30, 0, 0, 0];
/// let mut reader = BinaryReader::new(&data);
///
/// let count = reader.read_u32().unwrap() as usize;
/// assert_eq!(reader.read_u32_array(count).unwrap(), vec![0x10, 0x30]);
/// assert!(reader.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct BinaryReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> BinaryReader<'a> {
    #[inline]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Start reading at `position`. Positions past the end fail on the first read.
    #[inline]
    pub const fn new_at(data: &'a [u8], position: usize) -> Self {
        Self { data, position }
    }

    #[inline]
    pub const fn position(&self) -> usize {
        self.position
    }

    #[inline]
    pub const fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.position >= self.data.len()
    }

    #[inline]
    pub fn seek(&mut self, position: usize) {
        self.position = position;
    }

    /// Read `count` bytes and advance the position.
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        if self.remaining() < count {
            return Err(Error::UnexpectedEof {
                needed: count,
                available: self.remaining(),
            });
        }
        let bytes = &self.data[self.position..self.position + count];
        self.position += count;
        Ok(bytes)
    }

    #[inline]
    pub fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read `count` consecutive little-endian u32 values.
    pub fn read_u32_array(&mut self, count: usize) -> Result<Vec<u32>> {
        let bytes = self.read_bytes(count.saturating_mul(4))?;
        Ok(bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    /// Read a packed on-disk struct.
    #[inline]
    pub fn read_struct<T: FromBytes>(&mut self) -> Result<T> {
        let size = std::mem::size_of::<T>();
        let bytes = self.read_bytes(size)?;
        T::read_from_bytes(bytes).map_err(|_| Error::UnexpectedEof {
            needed: size,
            available: bytes.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_read_u32() {
        let data = [0x01u8, 0x02, 0x03, 0x04];
        let mut reader = BinaryReader::new(&data);

        assert_eq!(reader.read_u32().unwrap(), 0x04030201);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_seek_and_offset_start() {
        let data = [0u8, 0, 0, 0, 7, 0, 0, 0];
        let mut reader = BinaryReader::new_at(&data, 4);
        assert_eq!(reader.read_u32().unwrap(), 7);

        reader.seek(0);
        assert_eq!(reader.remaining(), 8);
        assert_eq!(reader.read_bytes(2).unwrap(), &[0, 0]);
        assert_eq!(reader.position(), 2);
    }

    #[test]
    fn test_read_struct() {
        #[derive(FromBytes)]
        #[repr(C, packed)]
        struct Pair {
            a: u16,
            b: u32,
        }

        let data = [1u8, 0, 2, 0, 0, 0];
        let pair: Pair = BinaryReader::new(&data).read_struct().unwrap();
        let (a, b) = (pair.a, pair.b);
        assert_eq!((a, b), (1, 2));
    }

    #[test]
    fn test_eof_error() {
        let data = [0x01, 0x02];
        let mut reader = BinaryReader::new(&data);

        assert!(reader.read_u32().is_err());
        assert!(reader.read_u32_array(1).is_err());
        assert!(BinaryReader::new_at(&data, 9).read_bytes(1).is_err());
    }
}
