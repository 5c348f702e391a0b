//! Geometry declarations: per-draw buffer indices and vertex layouts.

use std::borrow::Cow;

use kunai_common::align::align_up;
use kunai_common::{field, BinaryReader, ByteOrder, LittleEndian};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::error::ensure_len;
use crate::section::{Record, Section};
use crate::Result;

/// The `GeoDecl` sub-container of an `ObjGeo`.
pub type GeoDecl = Section<GeoDeclEntry>;

const INFO_SIZE: usize = 0x04;
const INDEX_BUFFER_INDEX: usize = 0x0c;
const INDEX_COUNT: usize = 0x10;
const VERTEX_COUNT: usize = 0x14;
const MIN_SIZE: usize = 0x18;

/// One vertex element descriptor (8 bytes, Direct3D 9 declaration style).
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct VertexElement {
    pub stream: u16,
    pub offset: u16,
    pub data_type: u8,
    pub method: u8,
    pub usage: u8,
    pub usage_index: u8,
}

/// One geometry declaration.
///
/// The fixed head is `info_size` bytes long; the vertex buffer reference
/// follows it, then the vertex elements at the next 16-byte boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoDeclEntry {
    data: Vec<u8>,
    info_size: usize,
    element_count: usize,
}

impl GeoDeclEntry {
    #[inline]
    pub fn info_size(&self) -> usize {
        self.info_size
    }

    pub fn index_buffer_index(&self) -> i32 {
        LittleEndian::read_i32(&self.data[INDEX_BUFFER_INDEX..])
    }

    pub fn set_index_buffer_index(&mut self, index: i32) {
        LittleEndian::write_i32(&mut self.data[INDEX_BUFFER_INDEX..], index);
    }

    pub fn index_count(&self) -> u32 {
        LittleEndian::read_u32(&self.data[INDEX_COUNT..])
    }

    pub fn vertex_count(&self) -> u32 {
        LittleEndian::read_u32(&self.data[VERTEX_COUNT..])
    }

    pub fn vertex_buffer_index(&self) -> i32 {
        LittleEndian::read_i32(&self.data[self.info_size..])
    }

    pub fn set_vertex_buffer_index(&mut self, index: i32) {
        LittleEndian::write_i32(&mut self.data[self.info_size..], index);
    }

    pub fn vertex_size(&self) -> u32 {
        LittleEndian::read_u32(&self.data[self.info_size + 4..])
    }

    #[inline]
    pub fn element_count(&self) -> usize {
        self.element_count
    }

    pub fn elements(&self) -> Vec<VertexElement> {
        let mut reader = BinaryReader::new_at(&self.data, elements_offset(self.info_size));
        (0..self.element_count)
            .filter_map(|_| reader.read_struct().ok())
            .collect()
    }
}

fn elements_offset(info_size: usize) -> usize {
    align_up(info_size + 0x0c, 0x10)
}

impl Record for GeoDeclEntry {
    fn parse(data: &[u8]) -> Result<Self> {
        ensure_len("geometry declaration", data, MIN_SIZE)?;

        let info_size = field::u32_at(data, INFO_SIZE)? as usize;
        ensure_len("geometry declaration", data, info_size.saturating_add(0x0c))?;

        let element_count = field::u32_at(data, info_size + 8)? as usize;
        let elements_end = element_count
            .checked_mul(8)
            .and_then(|n| n.checked_add(elements_offset(info_size)))
            .unwrap_or(usize::MAX);
        ensure_len("geometry declaration", data, elements_end)?;

        Ok(Self {
            data: data.to_vec(),
            info_size,
            element_count,
        })
    }

    fn to_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(&self.data)
    }
}
