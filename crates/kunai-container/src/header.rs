//! Fixed container header structures.

use std::fmt;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Version bytes at offset 0x08 of every container.
pub const VERSION_BYTES: [u8; 4] = [0x00, 0x00, 0x01, 0x01];

/// Header size of an inline container.
pub const HEADER_SIZE: u32 = 0x30;

/// Header size of a container whose records live in a companion buffer.
pub const COMPANION_HEADER_SIZE: u32 = 0x50;

/// Check constant stored in both copies of the companion header.
pub const CHECK_CONSTANT: u32 = 0x0123_4567;

/// Size of the header at the start of a companion buffer.
pub const COMPANION_PREFIX_SIZE: usize = 0x10;

/// Offset of the companion header copy inside the primary buffer.
pub(crate) const COMPANION_HEADER_OFFSET: usize = 0x40;

/// An 8-byte, NUL-padded container tag such as `TMC` or `ObjGeo`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Magic([u8; 8]);

impl Magic {
    /// Build a tag from up to eight bytes, padding with NUL.
    pub const fn new(tag: &[u8]) -> Self {
        let mut raw = [0u8; 8];
        let mut i = 0;
        while i < tag.len() && i < 8 {
            raw[i] = tag[i];
            i += 1;
        }
        Self(raw)
    }

    #[inline]
    pub const fn from_raw(raw: [u8; 8]) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    /// The tag without its NUL padding.
    pub fn name(&self) -> &[u8] {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(8);
        &self.0[..end]
    }
}

impl fmt::Display for Magic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.name()))
    }
}

impl fmt::Debug for Magic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Magic({:?})", String::from_utf8_lossy(self.name()))
    }
}

/// The 0x30-byte header at the start of every container.
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct ContainerHeader {
    pub magic: [u8; 8],
    pub version: [u8; 4],
    pub header_size: u32,
    pub container_size: u32,
    pub record_count: u32,
    pub valid_record_count: u32,
    pub reserved0: u32,
    pub offset_table_ofs: u32,
    pub size_table_ofs: u32,
    pub sub_container_ofs: u32,
    pub reserved1: u32,
}

impl ContainerHeader {
    pub fn magic(&self) -> Magic {
        Magic(self.magic)
    }

    pub fn is_companion_layout(&self) -> bool {
        self.header_size == COMPANION_HEADER_SIZE
    }
}

/// The 16-byte header shared by a companion-layout container and its
/// companion buffer. Stored at 0x40 of the primary and 0x00 of the companion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct CompanionHeader {
    pub valid_record_count: u32,
    pub companion_size: u32,
    pub check: u32,
    pub reserved: u32,
}

impl CompanionHeader {
    pub fn new(valid_record_count: u32, companion_size: u32) -> Self {
        Self {
            valid_record_count,
            companion_size,
            check: CHECK_CONSTANT,
            reserved: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_sizes() {
        assert_eq!(std::mem::size_of::<ContainerHeader>(), HEADER_SIZE as usize);
        assert_eq!(std::mem::size_of::<CompanionHeader>(), COMPANION_PREFIX_SIZE);
    }

    #[test]
    fn test_magic_padding() {
        let magic = Magic::new(b"ObjGeo");
        assert_eq!(magic.as_bytes(), b"ObjGeo\0\0");
        assert_eq!(magic.name(), b"ObjGeo");
        assert_eq!(magic.to_string(), "ObjGeo");
        assert_eq!(Magic::new(b"BnOfsMtx").name(), b"BnOfsMtx");
    }
}
