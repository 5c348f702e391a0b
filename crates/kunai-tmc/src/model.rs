//! TMC/TMCL model pairs.

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use kunai_common::{field, BinaryReader};
use kunai_container::{Container, ContainerParts};

use crate::kind::{SectionKind, TMC};
use crate::nodetype::{NodeTypeCatalog, NodeTypeTable, BODY_RECORD, HEAD_RECORD, ITEM_EXTRA_SIZE};
use crate::section::Section;
use crate::views::{HierarchyNode, MaterialRecord, NodeObject, ObjGeo, ObjInfo, RawRecord, TextureDirectory};
use crate::{Error, Result};

const NAME: usize = 0x20;
const TYPE_TABLE: usize = 0xc0;
const LHEADER_TYPE_TABLE: usize = 0x20;

/// The two files a model is stored as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPair {
    /// The TMC file.
    pub primary: Vec<u8>,
    /// The TMCL file: the `LHeader` companion buffer.
    pub companion: Vec<u8>,
}

impl AssetPair {
    /// File names of the pair for archive chunk `id`.
    pub fn file_names(id: u32) -> (String, String) {
        (format!("{id:05}.dat"), format!("{:05}.dat", id + 1))
    }

    /// Write `{id:05}.dat` and `{id+1:05}.dat` into `dir`.
    pub fn write_to<P: AsRef<Path>>(&self, dir: P, id: u32) -> Result<(PathBuf, PathBuf)> {
        let dir = dir.as_ref();
        let (primary_name, companion_name) = Self::file_names(id);
        let primary = dir.join(primary_name);
        let companion = dir.join(companion_name);

        fs::write(&primary, &self.primary)?;
        fs::write(&companion, &self.companion)?;
        tracing::debug!(primary = %primary.display(), companion = %companion.display(), "wrote model pair");
        Ok((primary, companion))
    }
}

/// A parsed model.
///
/// Object-parallel sections (`MdlGeo`, `MdlInfo`, `HieLay`, `NodeLay`,
/// `GlblMtx`, `BnOfsMtx`) hold one record per object. Sections the model
/// does not interpret are kept as raw top-level records and written back
/// unchanged.
#[derive(Debug, Clone)]
pub struct Model {
    pub(crate) top: ContainerParts,
    pub(crate) type_ids: Vec<u32>,
    pub(crate) lheader: Section<RawRecord>,
    pub(crate) lheader_ids: Vec<u32>,

    pub(crate) mdlgeo: Section<ObjGeo>,
    pub(crate) ttdm: TextureDirectory,
    pub(crate) vtxlay: Section<RawRecord>,
    pub(crate) idxlay: Section<RawRecord>,
    pub(crate) mtrcol: Section<MaterialRecord>,
    pub(crate) mdlinfo: Section<ObjInfo>,
    pub(crate) hielay: Section<HierarchyNode>,
    pub(crate) nodelay: Section<NodeObject>,
    pub(crate) glblmtx: Section<RawRecord>,
    pub(crate) bnofsmtx: Section<RawRecord>,

    pub(crate) catalog: NodeTypeCatalog,
    pub(crate) node_table: Option<NodeTypeTable>,
    /// Per-node item bytes of the node-type body past the documented fields.
    pub(crate) node_extras: Vec<Vec<u8>>,
}

impl Model {
    /// Parse a model from its TMC and TMCL buffers.
    pub fn parse(tmc: &[u8], tmcl: &[u8]) -> Result<Self> {
        let top = Container::parse(TMC, tmc, None)?;
        let type_ids = type_table(top.metadata(), TYPE_TABLE, top.records().len())?;

        let section = |kind: SectionKind| {
            type_ids
                .iter()
                .position(|&t| t == kind.type_id())
                .and_then(|i| top.record(i))
                .filter(|record| !record.is_empty())
                .ok_or(Error::MissingSection(kind))
        };

        let lheader_container = Container::parse(
            SectionKind::LHeader.magic(),
            section(SectionKind::LHeader)?,
            Some(tmcl),
        )?;
        let lheader_ids = type_table(
            lheader_container.metadata(),
            LHEADER_TYPE_TABLE,
            lheader_container.records().len(),
        )?;
        let lheader: Section<RawRecord> = Section::from_container(&lheader_container)?;

        let companion = |kind: SectionKind| {
            lheader_ids
                .iter()
                .position(|&t| t == kind.companion_id())
                .and_then(|i| lheader.get(i))
                .map(RawRecord::as_bytes)
                .filter(|ldata| !ldata.is_empty())
        };
        let typed = |kind: SectionKind| section(kind).map(|data| (data, companion(kind)));
        macro_rules! parse_section {
            ($kind:expr) => {{
                let (data, ldata) = typed($kind)?;
                Section::parse($kind.magic(), data, ldata)?
            }};
        }

        let (ttdm_data, ttdm_ldata) = typed(SectionKind::Ttdm)?;
        let mut model = Self {
            mdlgeo: parse_section!(SectionKind::MdlGeo),
            ttdm: TextureDirectory::parse(ttdm_data, ttdm_ldata)?,
            vtxlay: parse_section!(SectionKind::VtxLay),
            idxlay: parse_section!(SectionKind::IdxLay),
            mtrcol: parse_section!(SectionKind::MtrCol),
            mdlinfo: parse_section!(SectionKind::MdlInfo),
            hielay: parse_section!(SectionKind::HieLay),
            nodelay: parse_section!(SectionKind::NodeLay),
            glblmtx: parse_section!(SectionKind::GlblMtx),
            bnofsmtx: parse_section!(SectionKind::BnOfsMtx),
            top: top.to_parts(),
            type_ids,
            lheader,
            lheader_ids,
            catalog: NodeTypeCatalog::default(),
            node_table: None,
            node_extras: Vec::new(),
        };
        model.load_node_table();

        tracing::debug!(
            name = %String::from_utf8_lossy(model.name()),
            objects = model.object_count(),
            materials = model.mtrcol.len(),
            node_table = model.node_table.is_some(),
            "parsed model"
        );
        Ok(model)
    }

    /// Read a model from a TMC file and its TMCL file.
    pub fn open<P: AsRef<Path>, Q: AsRef<Path>>(tmc: P, tmcl: Q) -> Result<Self> {
        let tmc = fs::read(tmc)?;
        let tmcl = fs::read(tmcl)?;
        Self::parse(&tmc, &tmcl)
    }

    fn load_node_table(&mut self) {
        let has_table = [HEAD_RECORD, BODY_RECORD].iter().all(|&i| {
            let untyped = self
                .type_ids
                .get(i)
                .is_some_and(|&t| !SectionKind::from_type_id(t).is_some_and(SectionKind::is_required));
            untyped && self.top.records.get(i).is_some_and(|r| !r.is_empty())
        });
        if !has_table {
            return;
        }

        let head = self.top.records[HEAD_RECORD].clone();
        let body = self.top.records[BODY_RECORD].clone();
        let count = self.nodelay.len();
        self.node_extras = NodeTypeTable::item_extras(&body, count).unwrap_or_else(|| {
            tracing::warn!(count, "node-type body does not match node count, extras reset");
            vec![vec![0; ITEM_EXTRA_SIZE]; count]
        });
        self.node_table = Some(NodeTypeTable { head, body });
    }

    /// Model name from the TMC metadata.
    pub fn name(&self) -> &[u8] {
        field::name_at(&self.top.metadata, NAME)
    }

    /// Number of objects, as counted by `NodeLay`.
    #[inline]
    pub fn object_count(&self) -> usize {
        self.nodelay.len()
    }

    /// Node names in object order.
    pub fn node_names(&self) -> Vec<&[u8]> {
        self.nodelay.iter().map(NodeObject::name).collect()
    }

    /// Section kind of each top-level record, `None` for untyped records.
    pub fn section_kinds(&self) -> Vec<Option<SectionKind>> {
        self.type_ids.iter().map(|&t| SectionKind::from_type_id(t)).collect()
    }

    #[inline]
    pub fn mdlgeo(&self) -> &Section<ObjGeo> {
        &self.mdlgeo
    }

    /// Geometry for draw-level edits (materials, transparency, texture bindings).
    #[inline]
    pub fn mdlgeo_mut(&mut self) -> &mut Section<ObjGeo> {
        &mut self.mdlgeo
    }

    #[inline]
    pub fn ttdm(&self) -> &TextureDirectory {
        &self.ttdm
    }

    #[inline]
    pub fn vtxlay(&self) -> &Section<RawRecord> {
        &self.vtxlay
    }

    #[inline]
    pub fn idxlay(&self) -> &Section<RawRecord> {
        &self.idxlay
    }

    #[inline]
    pub fn mtrcol(&self) -> &Section<MaterialRecord> {
        &self.mtrcol
    }

    #[inline]
    pub fn mdlinfo(&self) -> &Section<ObjInfo> {
        &self.mdlinfo
    }

    #[inline]
    pub fn hielay(&self) -> &Section<HierarchyNode> {
        &self.hielay
    }

    #[inline]
    pub fn nodelay(&self) -> &Section<NodeObject> {
        &self.nodelay
    }

    #[inline]
    pub fn glblmtx(&self) -> &Section<RawRecord> {
        &self.glblmtx
    }

    #[inline]
    pub fn bnofsmtx(&self) -> &Section<RawRecord> {
        &self.bnofsmtx
    }

    #[inline]
    pub fn catalog(&self) -> &NodeTypeCatalog {
        &self.catalog
    }

    /// Replace the node-type catalog used when the side table is rebuilt.
    pub fn set_catalog(&mut self, catalog: NodeTypeCatalog) {
        self.catalog = catalog;
    }

    /// The node-type side table, if the model has one.
    #[inline]
    pub fn node_table(&self) -> Option<&NodeTypeTable> {
        self.node_table.as_ref()
    }

    /// The side table the current nodes and catalog produce.
    ///
    /// # Panics
    ///
    /// Panics if a node name is unknown to the catalog.
    pub fn build_node_table(&self) -> NodeTypeTable {
        NodeTypeTable::build(&self.catalog, self.name(), &self.node_names(), &self.node_extras)
    }

    /// Encode the model back into its file pair.
    ///
    /// Companion sections are encoded first and their L-data routed into
    /// the matching `LHeader` records; `LHeader` is then encoded with the
    /// TMCL file as its companion buffer, and the TMC container last.
    pub fn commit(&self) -> Result<AssetPair> {
        let mut lheader_records: Vec<Cow<'_, [u8]>> = self
            .lheader
            .iter()
            .map(|r| Cow::Borrowed(r.as_bytes()))
            .collect();
        let mut top_records: Vec<Cow<'_, [u8]>> =
            self.top.records.iter().map(|r| Cow::Borrowed(&r[..])).collect();

        for kind in SectionKind::REQUIRED {
            if kind == SectionKind::LHeader {
                continue;
            }
            let encoded = match kind {
                SectionKind::MdlGeo => self.mdlgeo.encode(),
                SectionKind::Ttdm => self.ttdm.encode(),
                SectionKind::VtxLay => self.vtxlay.encode(),
                SectionKind::IdxLay => self.idxlay.encode(),
                SectionKind::MtrCol => self.mtrcol.encode(),
                SectionKind::MdlInfo => self.mdlinfo.encode(),
                SectionKind::HieLay => self.hielay.encode(),
                SectionKind::NodeLay => self.nodelay.encode(),
                SectionKind::GlblMtx => self.glblmtx.encode(),
                SectionKind::BnOfsMtx => self.bnofsmtx.encode(),
                _ => continue,
            };
            if let Some(ldata) = encoded.companion {
                let slot = self
                    .lheader_ids
                    .iter()
                    .position(|&t| t == kind.companion_id())
                    .filter(|&i| i < lheader_records.len())
                    .ok_or(Error::MissingCompanionSlot(kind))?;
                lheader_records[slot] = Cow::Owned(ldata);
            }
            let index = self.top_index(kind)?;
            top_records[index] = Cow::Owned(encoded.data);
        }

        let lheader = self.lheader.encode_with(&lheader_records);
        top_records[self.top_index(SectionKind::LHeader)?] = Cow::Owned(lheader.data);

        if let Some(table) = &self.node_table {
            top_records[HEAD_RECORD] = Cow::Borrowed(&table.head);
            top_records[BODY_RECORD] = Cow::Borrowed(&table.body);
        }

        let primary = self.top.encode_with(&top_records).data;
        tracing::debug!(
            primary = primary.len(),
            companion = lheader.companion.as_ref().map_or(0, Vec::len),
            "committed model"
        );

        Ok(AssetPair {
            primary,
            companion: lheader.companion.unwrap_or_default(),
        })
    }

    fn top_index(&self, kind: SectionKind) -> Result<usize> {
        self.type_ids
            .iter()
            .position(|&t| t == kind.type_id())
            .ok_or(Error::MissingSection(kind))
    }

    /// Rewrite every stored self-index to its position.
    pub(crate) fn renumber(&mut self) {
        for (i, geo) in self.mdlgeo.iter_mut().enumerate() {
            geo.set_id(i as i32);
            geo.renumber_draws();
        }
        for (m, material) in self.mtrcol.iter_mut().enumerate() {
            material.set_id(m as i32);
        }
        for (i, info) in self.mdlinfo.iter_mut().enumerate() {
            info.set_id(i as i32);
        }
        let mut j = 0u32;
        for (i, node) in self.nodelay.iter_mut().enumerate() {
            node.set_node_id(i as u32);
            for data in node.data_mut() {
                data.set_object_index(j);
                data.set_node_index(i as u32);
                j += 1;
            }
        }
        if self.node_table.is_some() {
            self.node_table = Some(self.build_node_table());
        }
    }
}

fn type_table(metadata: &[u8], offset: usize, count: usize) -> Result<Vec<u32>> {
    Ok(BinaryReader::new_at(metadata, offset).read_u32_array(count)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{two_object_model, DrawSpec, ModelBuilder, ObjectSpec};
    use crate::views::NO_PARENT;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_model() {
        let (tmc, tmcl) = two_object_model().build();
        let model = Model::parse(&tmc, &tmcl).unwrap();

        assert_eq!(model.name(), b"e_nin_a");
        assert_eq!(model.object_count(), 2);
        assert_eq!(model.node_names(), vec![&b"MOT00"[..], &b"OPTscat00"[..]]);
        assert_eq!(model.mdlgeo().len(), 2);
        assert_eq!(model.vtxlay().len(), 2);
        assert_eq!(model.vtxlay()[1].as_bytes(), &[2u8; 0x20][..]);
        assert_eq!(model.hielay()[0].children(), vec![1]);
        assert_eq!(model.ttdm().slot_count(), 2);
        assert_eq!(&model.ttdm().payload(1).unwrap()[..4], b"tex1");
        assert!(model.node_table().is_some());
        assert_eq!(model.section_kinds()[7], Some(SectionKind::LHeader));
    }

    #[test]
    fn test_unmodified_commit_is_byte_stable() {
        let (tmc, tmcl) = two_object_model().build();
        let pair = Model::parse(&tmc, &tmcl).unwrap().commit().unwrap();

        assert_eq!(pair.primary, tmc);
        assert_eq!(pair.companion, tmcl);
    }

    #[test]
    fn test_commit_without_node_table() {
        let (tmc, tmcl) = two_object_model().without_node_table().build();
        let model = Model::parse(&tmc, &tmcl).unwrap();
        assert!(model.node_table().is_none());
        assert_eq!(model.commit().unwrap().primary, tmc);
    }

    #[test]
    fn test_commit_reparses_edits() {
        let (tmc, tmcl) = ModelBuilder::new(b"m")
            .object(ObjectSpec::new(b"MOT00", NO_PARENT, &[DrawSpec::new(0, 0, &[0, 1])]))
            .build();
        let mut model = Model::parse(&tmc, &tmcl).unwrap();
        let draw = &mut model.mdlgeo_mut()[0].draws_mut()[0];
        draw.set_texture_buffer(1, 0);
        draw.set_hard_transparency(true);

        let pair = model.commit().unwrap();
        let reparsed = Model::parse(&pair.primary, &pair.companion).unwrap();
        let draw = &reparsed.mdlgeo()[0].draws()[0];
        assert_eq!(draw.texture(1).unwrap().buffer_index, 0);
        assert!(draw.hard_transparency());
        assert_eq!(pair.companion, tmcl);
    }

    #[test]
    fn test_missing_section() {
        let (tmc, tmcl) = two_object_model().build();
        let mut top = Container::parse(TMC, &tmc, None).unwrap().to_parts();
        top.records[8].clear();
        let tmc = top.encode().data;

        assert!(matches!(
            Model::parse(&tmc, &tmcl),
            Err(Error::MissingSection(SectionKind::NodeLay))
        ));
    }

    #[test]
    fn test_file_names() {
        assert_eq!(
            AssetPair::file_names(1352),
            ("01352.dat".to_string(), "01353.dat".to_string())
        );
    }
}
