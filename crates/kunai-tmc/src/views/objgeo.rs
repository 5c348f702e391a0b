//! Per-object geometry: draw chunks, texture bindings and buffer references.

use std::borrow::Cow;

use kunai_common::{field, ByteOrder, LittleEndian};
use kunai_container::{serialize, Container, ContainerParts};

use crate::error::{ensure_index, ensure_len};
use crate::kind::{GEO_DECL, OBJ_GEO};
use crate::section::Record;
use crate::views::{GeoDecl, GeoDeclEntry};
use crate::{Error, Result};

const OBJECT_ID: usize = 0x04;
const NAME: usize = 0x20;

const CHUNK_ID: usize = 0x00;
const MATERIAL_INDEX: usize = 0x04;
const TEXTURE_COUNT: usize = 0x0c;
const TEXTURE_TABLE: usize = 0x10;
const DECL_INDEX: usize = 0x38;
const SOFT_TRANSPARENCY: usize = 0x40;
const HARD_TRANSPARENCY: usize = 0x48;
const DRAW_MIN_SIZE: usize = 0x4c;
const GEOMETRY_BASE: usize = 0x30;
const TEXTURE_BINDING_SIZE: usize = 0x0c;

/// Most texture bindings a draw chunk can carry.
pub const MAX_TEXTURES: usize = 8;

/// Value stored for an enabled hard-transparency flag.
pub const HARD_TRANSPARENCY_ON: u32 = 0xc0;

/// A texture reference inside a draw chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureBinding {
    pub id: i32,
    pub category: i32,
    /// Slot in the model's texture directory.
    pub buffer_index: i32,
}

/// One draw call of an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawChunk {
    data: Vec<u8>,
    texture_offsets: Vec<usize>,
    /// `0x30 + info_size` of the referenced declaration.
    geometry: usize,
}

impl DrawChunk {
    fn parse(data: &[u8], decl: Option<&GeoDecl>) -> Result<Self> {
        ensure_len("draw chunk", data, DRAW_MIN_SIZE)?;

        let texture_count = field::u32_at(data, TEXTURE_COUNT)? as usize;
        if texture_count > MAX_TEXTURES {
            return Err(Error::IndexOutOfRange {
                what: "texture count",
                index: texture_count as i64,
                len: MAX_TEXTURES + 1,
            });
        }
        let texture_offsets = (0..texture_count)
            .map(|i| {
                let offset = field::u32_at(data, TEXTURE_TABLE + 4 * i)? as usize;
                field::check_span(data, offset, TEXTURE_BINDING_SIZE)?;
                Ok(offset)
            })
            .collect::<Result<Vec<_>>>()?;

        let decl_index = field::u32_at(data, DECL_INDEX)? as i64;
        let entries = decl.map_or(&[][..], |d| d.records());
        let entry = &entries[ensure_index("geometry declaration", decl_index, entries.len())?];
        let geometry = GEOMETRY_BASE + entry.info_size();
        ensure_len("draw chunk", data, geometry + 0x20)?;

        Ok(Self {
            data: data.to_vec(),
            texture_offsets,
            geometry,
        })
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn id(&self) -> i32 {
        LittleEndian::read_i32(&self.data[CHUNK_ID..])
    }

    pub(crate) fn set_id(&mut self, id: i32) {
        LittleEndian::write_i32(&mut self.data[CHUNK_ID..], id);
    }

    /// Index into the model's `MtrCol` section.
    pub fn material_index(&self) -> i32 {
        LittleEndian::read_i32(&self.data[MATERIAL_INDEX..])
    }

    pub fn set_material_index(&mut self, index: i32) {
        LittleEndian::write_i32(&mut self.data[MATERIAL_INDEX..], index);
    }

    #[inline]
    pub fn texture_count(&self) -> usize {
        self.texture_offsets.len()
    }

    pub fn texture(&self, index: usize) -> Option<TextureBinding> {
        let offset = *self.texture_offsets.get(index)?;
        Some(TextureBinding {
            id: LittleEndian::read_i32(&self.data[offset..]),
            category: LittleEndian::read_i32(&self.data[offset + 4..]),
            buffer_index: LittleEndian::read_i32(&self.data[offset + 8..]),
        })
    }

    pub fn textures(&self) -> Vec<TextureBinding> {
        (0..self.texture_count()).filter_map(|i| self.texture(i)).collect()
    }

    /// Point texture binding `index` at another texture directory slot.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not below [`DrawChunk::texture_count`].
    pub fn set_texture_buffer(&mut self, index: usize, buffer_index: i32) {
        let offset = self.texture_offsets[index];
        LittleEndian::write_i32(&mut self.data[offset + 8..], buffer_index);
    }

    /// Index into the object's geometry declarations.
    pub fn decl_index(&self) -> u32 {
        LittleEndian::read_u32(&self.data[DECL_INDEX..])
    }

    pub fn soft_transparency(&self) -> bool {
        LittleEndian::read_u32(&self.data[SOFT_TRANSPARENCY..]) != 0
    }

    pub fn set_soft_transparency(&mut self, enabled: bool) {
        LittleEndian::write_u32(&mut self.data[SOFT_TRANSPARENCY..], enabled as u32);
    }

    pub fn hard_transparency(&self) -> bool {
        LittleEndian::read_u32(&self.data[HARD_TRANSPARENCY..]) != 0
    }

    pub fn set_hard_transparency(&mut self, enabled: bool) {
        let value = if enabled { HARD_TRANSPARENCY_ON } else { 0 };
        LittleEndian::write_u32(&mut self.data[HARD_TRANSPARENCY..], value);
    }

    pub fn index_buffer_offset(&self) -> u32 {
        LittleEndian::read_u32(&self.data[self.geometry + 0x10..])
    }

    pub fn index_count(&self) -> u32 {
        LittleEndian::read_u32(&self.data[self.geometry + 0x14..])
    }

    pub fn vertex_buffer_offset(&self) -> u32 {
        LittleEndian::read_u32(&self.data[self.geometry + 0x18..])
    }

    pub fn vertex_count(&self) -> u32 {
        LittleEndian::read_u32(&self.data[self.geometry + 0x1c..])
    }
}

/// An `ObjGeo` container: one object's draw chunks and declarations.
#[derive(Debug, Clone)]
pub struct ObjGeo {
    parts: ContainerParts,
    decl: Option<GeoDecl>,
    draws: Vec<DrawChunk>,
}

impl ObjGeo {
    /// Object id stored in the metadata; rewritten on every structural edit.
    pub fn id(&self) -> i32 {
        LittleEndian::read_i32(&self.parts.metadata[OBJECT_ID..])
    }

    pub(crate) fn set_id(&mut self, id: i32) {
        LittleEndian::write_i32(&mut self.parts.metadata[OBJECT_ID..], id);
    }

    pub fn name(&self) -> &[u8] {
        field::name_at(&self.parts.metadata, NAME)
    }

    /// Geometry declarations, empty when the object has none.
    pub fn declarations(&self) -> &[GeoDeclEntry] {
        self.decl.as_ref().map_or(&[], |d| d.records())
    }

    pub fn declarations_mut(&mut self) -> &mut [GeoDeclEntry] {
        match &mut self.decl {
            Some(decl) => decl.records_mut(),
            None => &mut [],
        }
    }

    #[inline]
    pub fn draws(&self) -> &[DrawChunk] {
        &self.draws
    }

    #[inline]
    pub fn draws_mut(&mut self) -> &mut [DrawChunk] {
        &mut self.draws
    }

    /// Renumber draw chunk ids to their positions.
    pub(crate) fn renumber_draws(&mut self) {
        for (j, draw) in self.draws.iter_mut().enumerate() {
            draw.set_id(j as i32);
        }
    }
}

impl Record for ObjGeo {
    fn parse(data: &[u8]) -> Result<Self> {
        let container = Container::parse(OBJ_GEO, data, None)?;
        ensure_len("ObjGeo metadata", container.metadata(), OBJECT_ID + 4)?;

        let decl = match container.sub_container() {
            [] => None,
            sub => Some(GeoDecl::parse(GEO_DECL, sub, None)?),
        };
        let draws = container
            .records()
            .iter()
            .map(|record| DrawChunk::parse(record, decl.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        let mut parts = container.to_parts();
        parts.records.clear();

        Ok(Self { parts, decl, draws })
    }

    fn to_bytes(&self) -> Cow<'_, [u8]> {
        let sub_container = match &self.decl {
            Some(decl) => Cow::Owned(decl.encode().data),
            None => Cow::Borrowed(&self.parts.sub_container[..]),
        };
        let draws: Vec<&[u8]> = self.draws.iter().map(|d| d.as_bytes()).collect();

        Cow::Owned(
            serialize(
                self.parts.magic,
                &draws,
                &self.parts.metadata,
                &sub_container,
                &self.parts.options,
            )
            .data,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{draw_chunk_bytes, obj_geo_bytes, DrawSpec};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_obj_geo() {
        let data = obj_geo_bytes(
            3,
            b"OPTscat_a",
            &[(10, 20)],
            &[DrawSpec::new(2, 0, &[5, 6]), DrawSpec::new(1, 0, &[7])],
        );
        let geo = ObjGeo::parse(&data).unwrap();

        assert_eq!(geo.id(), 3);
        assert_eq!(geo.name(), b"OPTscat_a");
        assert_eq!(geo.declarations().len(), 1);
        assert_eq!(geo.declarations()[0].vertex_buffer_index(), 10);
        assert_eq!(geo.draws().len(), 2);

        let draw = &geo.draws()[0];
        assert_eq!(draw.material_index(), 2);
        assert_eq!(draw.texture_count(), 2);
        assert_eq!(draw.texture(1).unwrap().buffer_index, 6);
        assert_eq!(draw.index_count(), 36);
        assert_eq!(draw.vertex_count(), 24);
    }

    #[test]
    fn test_untouched_obj_geo_is_byte_stable() {
        let data = obj_geo_bytes(0, b"MOT00", &[(0, 0)], &[DrawSpec::new(0, 0, &[1])]);
        let geo = ObjGeo::parse(&data).unwrap();
        assert_eq!(geo.to_bytes().as_ref(), &data[..]);
    }

    #[test]
    fn test_patch_draw_fields() {
        let data = obj_geo_bytes(0, b"MOT00", &[(0, 0)], &[DrawSpec::new(0, 0, &[1, 2, 3])]);
        let mut geo = ObjGeo::parse(&data).unwrap();

        geo.set_id(7);
        let draw = &mut geo.draws_mut()[0];
        draw.set_material_index(4);
        draw.set_texture_buffer(2, 11);
        draw.set_hard_transparency(true);
        draw.set_soft_transparency(true);

        let reparsed = ObjGeo::parse(&geo.to_bytes()).unwrap();
        let draw = &reparsed.draws()[0];
        assert_eq!(reparsed.id(), 7);
        assert_eq!(draw.material_index(), 4);
        assert_eq!(
            draw.textures().iter().map(|t| t.buffer_index).collect::<Vec<_>>(),
            vec![1, 2, 11]
        );
        assert!(draw.hard_transparency());
        assert_eq!(LittleEndian::read_u32(&draw.as_bytes()[HARD_TRANSPARENCY..]), 0xc0);
        assert!(draw.soft_transparency());
    }

    #[test]
    fn test_reject_bad_decl_index() {
        let data = obj_geo_bytes(0, b"MOT00", &[(0, 0)], &[DrawSpec::new(0, 3, &[])]);
        assert!(matches!(
            ObjGeo::parse(&data),
            Err(Error::IndexOutOfRange { what: "geometry declaration", .. })
        ));
    }

    #[test]
    fn test_reject_too_many_textures() {
        let mut chunk = draw_chunk_bytes(&DrawSpec::new(0, 0, &[]));
        LittleEndian::write_u32(&mut chunk[TEXTURE_COUNT..], 9);
        let decl = None;
        assert!(DrawChunk::parse(&chunk, decl).is_err());
    }
}
