//! Synthetic records and models for tests.

use kunai_common::align::pad_to;
use kunai_common::{ByteOrder, IntoBytes, LittleEndian};
use kunai_container::{serialize, Encoded, Magic, SerializeOptions};

use crate::kind::{SectionKind, GEO_DECL, NODE_OBJ, OBJ_GEO, OBJ_INFO, TMC, TTDH, TTDL};
use crate::nodetype::{NodeTypeCatalog, NodeTypeTable};
use crate::section::Record;
use crate::views::{HierarchyNode, MaterialRecord, VertexElement, Xref, COLOR_COUNT, NO_PARENT};

pub(crate) const IDENTITY: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0,
];

/// A geometry declaration entry with `info_size` 0x20, 36 indices and 24 vertices.
pub(crate) fn decl_entry_bytes(vertex_buffer: i32, index_buffer: i32, elements: &[VertexElement]) -> Vec<u8> {
    let mut data = vec![0u8; 0x30];
    LittleEndian::write_u32(&mut data[0x04..], 0x20);
    LittleEndian::write_i32(&mut data[0x0c..], index_buffer);
    LittleEndian::write_u32(&mut data[0x10..], 36);
    LittleEndian::write_u32(&mut data[0x14..], 24);
    LittleEndian::write_i32(&mut data[0x20..], vertex_buffer);
    LittleEndian::write_u32(&mut data[0x24..], 0x20);
    LittleEndian::write_u32(&mut data[0x28..], elements.len() as u32);
    for element in elements {
        data.extend_from_slice(element.as_bytes());
    }
    pad_to(&mut data, 0x10);
    data
}

#[derive(Debug, Clone)]
pub(crate) struct DrawSpec {
    pub material: i32,
    pub decl_index: u32,
    pub textures: Vec<i32>,
}

impl DrawSpec {
    pub fn new(material: i32, decl_index: u32, textures: &[i32]) -> Self {
        Self {
            material,
            decl_index,
            textures: textures.to_vec(),
        }
    }
}

/// A draw chunk whose geometry block sits at 0x50 (declarations of `info_size` 0x20).
pub(crate) fn draw_chunk_bytes(spec: &DrawSpec) -> Vec<u8> {
    let mut data = vec![0u8; 0x70];
    LittleEndian::write_i32(&mut data[0x04..], spec.material);
    LittleEndian::write_u32(&mut data[0x0c..], spec.textures.len() as u32);
    LittleEndian::write_u32(&mut data[0x38..], spec.decl_index);
    LittleEndian::write_u32(&mut data[0x50 + 0x14..], 36);
    LittleEndian::write_u32(&mut data[0x50 + 0x1c..], 24);

    for (i, buffer) in spec.textures.iter().enumerate() {
        let offset = data.len();
        LittleEndian::write_u32(&mut data[0x10 + 4 * i..], offset as u32);
        let mut binding = [0u8; 0x10];
        LittleEndian::write_i32(&mut binding[0..], i as i32);
        LittleEndian::write_i32(&mut binding[8..], *buffer);
        data.extend_from_slice(&binding);
    }
    data
}

fn named_metadata(size: usize, name_at: usize, name: &[u8]) -> Vec<u8> {
    let mut metadata = vec![0u8; size];
    metadata[name_at..name_at + name.len()].copy_from_slice(name);
    metadata
}

/// An `ObjGeo` with one declaration per `(vertex buffer, index buffer)` pair.
pub(crate) fn obj_geo_bytes(id: i32, name: &[u8], buffers: &[(i32, i32)], draws: &[DrawSpec]) -> Vec<u8> {
    let mut metadata = named_metadata(0x40, 0x20, name);
    LittleEndian::write_i32(&mut metadata[0x04..], id);

    let entries: Vec<Vec<u8>> = buffers
        .iter()
        .map(|&(vb, ib)| decl_entry_bytes(vb, ib, &[]))
        .collect();
    let decl = serialize(GEO_DECL, &entries, &[], &[], &SerializeOptions::inline()).data;
    let chunks: Vec<Vec<u8>> = draws.iter().map(draw_chunk_bytes).collect();

    serialize(OBJ_GEO, &chunks, &metadata, &decl, &SerializeOptions::inline()).data
}

/// A `NodeObj` with one data record whose node index is `node_id`, or none.
pub(crate) fn node_obj_bytes(name: &[u8], node_id: u32, members: Option<&[i32]>) -> Vec<u8> {
    let mut metadata = named_metadata(0x30, 0x10, name);
    LittleEndian::write_u32(&mut metadata[0x08..], node_id);

    let records: Vec<Vec<u8>> = members
        .map(|members| {
            let mut data = vec![0u8; 0x50];
            LittleEndian::write_u32(&mut data[0x00..], node_id);
            LittleEndian::write_u32(&mut data[0x04..], members.len() as u32);
            LittleEndian::write_u32(&mut data[0x08..], node_id);
            LittleEndian::write_f32_into(&IDENTITY, &mut data[0x10..0x50]);
            for member in members {
                data.extend_from_slice(&member.to_le_bytes());
            }
            pad_to(&mut data, 0x10);
            data
        })
        .into_iter()
        .collect();

    serialize(NODE_OBJ, &records, &metadata, &[], &SerializeOptions::inline()).data
}

pub(crate) fn obj_info_bytes(id: i32) -> Vec<u8> {
    let mut metadata = vec![0u8; 0x10];
    LittleEndian::write_i32(&mut metadata[0x04..], id);
    serialize(OBJ_INFO, &[vec![0x11u8; 0x10]], &metadata, &[], &SerializeOptions::inline()).data
}

/// A `TTDM` section; the companion buffer is the `TTDL` L-data.
pub(crate) fn ttdm_bytes(inline: &[&[u8]], companion: &[&[u8]], slots: &[(bool, i32)]) -> Encoded {
    let slot_records: Vec<Vec<u8>> = slots
        .iter()
        .map(|&(in_companion, index)| {
            let mut slot = vec![0u8; 0x20];
            slot[0] = in_companion as u8;
            LittleEndian::write_i32(&mut slot[4..], index);
            slot
        })
        .collect();
    let ttdh = serialize(TTDH, &slot_records, &[], &[], &SerializeOptions::inline()).data;

    let (ttdl, ldata) = if companion.is_empty() {
        (Vec::new(), None)
    } else {
        let encoded = serialize(TTDL, companion, &[], &[], &SerializeOptions::companion());
        (encoded.data, encoded.companion)
    };
    let data = serialize(
        SectionKind::Ttdm.magic(),
        inline,
        &ttdh,
        &ttdl,
        &SerializeOptions::inline(),
    )
    .data;

    Encoded {
        data,
        companion: ldata,
    }
}

/// One object of a synthetic model.
#[derive(Debug, Clone)]
pub(crate) struct ObjectSpec {
    pub name: &'static [u8],
    pub parent: i32,
    pub draws: Vec<DrawSpec>,
    pub members: Option<Vec<i32>>,
}

impl ObjectSpec {
    pub fn new(name: &'static [u8], parent: i32, draws: &[DrawSpec]) -> Self {
        Self {
            name,
            parent,
            draws: draws.to_vec(),
            members: Some(Vec::new()),
        }
    }

    pub fn with_members(mut self, members: &[i32]) -> Self {
        self.members = Some(members.to_vec());
        self
    }
}

/// Builder for a consistent TMC/TMCL pair.
///
/// Each object gets one declaration with its own vertex and index buffer,
/// filled with `object index + 1` and `0x80 + object index`. Materials get
/// xrefs matching the draws. The top container has 15 records so the
/// node-type table lands in records 13 and 14.
#[derive(Debug, Clone)]
pub(crate) struct ModelBuilder {
    name: &'static [u8],
    objects: Vec<ObjectSpec>,
    materials: usize,
    textures: usize,
    node_table: bool,
}

impl ModelBuilder {
    pub fn new(name: &'static [u8]) -> Self {
        Self {
            name,
            objects: Vec::new(),
            materials: 1,
            textures: 2,
            node_table: true,
        }
    }

    pub fn object(mut self, object: ObjectSpec) -> Self {
        self.objects.push(object);
        self
    }

    pub fn materials(mut self, count: usize) -> Self {
        self.materials = count;
        self
    }

    pub fn textures(mut self, count: usize) -> Self {
        self.textures = count;
        self
    }

    pub fn without_node_table(mut self) -> Self {
        self.node_table = false;
        self
    }

    /// Returns the TMC and TMCL buffers.
    pub fn build(&self) -> (Vec<u8>, Vec<u8>) {
        let n = self.objects.len();

        let geos: Vec<Vec<u8>> = self
            .objects
            .iter()
            .enumerate()
            .map(|(i, o)| obj_geo_bytes(i as i32, o.name, &[(i as i32, i as i32)], &o.draws))
            .collect();
        let mdlgeo = inline(SectionKind::MdlGeo.magic(), &geos, &[]);

        let vertex_buffers: Vec<Vec<u8>> = (0..n).map(|i| vec![i as u8 + 1; 0x20]).collect();
        let index_buffers: Vec<Vec<u8>> = (0..n).map(|i| vec![0x80 + i as u8; 0x10]).collect();
        let vtxlay = in_companion(SectionKind::VtxLay.magic(), &vertex_buffers);
        let idxlay = in_companion(SectionKind::IdxLay.magic(), &index_buffers);

        let payloads: Vec<Vec<u8>> = (0..self.textures)
            .map(|k| {
                let mut payload = format!("tex{k}").into_bytes();
                pad_to(&mut payload, 0x10);
                payload
            })
            .collect();
        let payload_refs: Vec<&[u8]> = payloads.iter().map(Vec::as_slice).collect();
        let slots: Vec<(bool, i32)> = (0..self.textures).map(|k| (true, k as i32)).collect();
        let ttdm = ttdm_bytes(&[], &payload_refs, &slots);

        let materials: Vec<Vec<u8>> = (0..self.materials)
            .map(|m| {
                let xrefs: Vec<Xref> = self
                    .objects
                    .iter()
                    .enumerate()
                    .filter_map(|(i, o)| {
                        let count = o.draws.iter().filter(|d| d.material == m as i32).count();
                        (count > 0).then(|| Xref::new(i as i32, count as i32))
                    })
                    .collect();
                let colors: [f32; COLOR_COUNT] = std::array::from_fn(|c| (m * 100 + c) as f32);
                let mut record = MaterialRecord::new(&colors, &xrefs).to_bytes().into_owned();
                LittleEndian::write_i32(&mut record[0xd0..], m as i32);
                record
            })
            .collect();
        let mtrcol = inline(SectionKind::MtrCol.magic(), &materials, &[]);

        let infos: Vec<Vec<u8>> = (0..n).map(|i| obj_info_bytes(i as i32)).collect();
        let mdlinfo = inline(SectionKind::MdlInfo.magic(), &infos, &[]);

        let nodes: Vec<Vec<u8>> = self
            .objects
            .iter()
            .enumerate()
            .map(|(i, o)| {
                let children: Vec<i32> = (0..n as i32)
                    .filter(|&j| self.objects[j as usize].parent == i as i32)
                    .collect();
                let level = if o.parent == NO_PARENT { 0 } else { 1 };
                HierarchyNode::new(&IDENTITY, o.parent, level, &children)
                    .to_bytes()
                    .into_owned()
            })
            .collect();
        let hielay = inline(SectionKind::HieLay.magic(), &nodes, &[]);

        let node_objs: Vec<Vec<u8>> = self
            .objects
            .iter()
            .enumerate()
            .map(|(i, o)| node_obj_bytes(o.name, i as u32, o.members.as_deref()))
            .collect();
        let nodelay = inline(SectionKind::NodeLay.magic(), &node_objs, &[]);

        let matrices: Vec<Vec<u8>> = (0..n)
            .map(|i| {
                let mut matrix = vec![0u8; 0x40];
                LittleEndian::write_f32_into(&IDENTITY, &mut matrix);
                LittleEndian::write_f32(&mut matrix[0x30..], i as f32);
                matrix
            })
            .collect();
        let glblmtx = inline(SectionKind::GlblMtx.magic(), &matrices, &[]);
        let bnofsmtx = inline(SectionKind::BnOfsMtx.magic(), &matrices, &[]);

        let companion_kinds = [SectionKind::VtxLay, SectionKind::IdxLay, SectionKind::Ttdm];
        let mut lheader_metadata = vec![0u8; 0x20];
        for kind in companion_kinds {
            lheader_metadata.extend_from_slice(&kind.companion_id().to_le_bytes());
        }
        let lheader_records = [
            vtxlay.companion.clone().unwrap_or_default(),
            idxlay.companion.clone().unwrap_or_default(),
            ttdm.companion.clone().unwrap_or_default(),
        ];
        let lheader = serialize(
            SectionKind::LHeader.magic(),
            &lheader_records,
            &lheader_metadata,
            &[],
            &SerializeOptions::companion(),
        );

        let names: Vec<&[u8]> = self.objects.iter().map(|o| o.name).collect();
        let (head, body) = if self.node_table {
            let table = NodeTypeTable::build(&NodeTypeCatalog::default(), self.name, &names, &[]);
            (table.head, table.body)
        } else {
            (Vec::new(), Vec::new())
        };

        let top_records: Vec<(u32, Vec<u8>)> = vec![
            (SectionKind::MdlGeo.type_id(), mdlgeo),
            (SectionKind::Ttdm.type_id(), ttdm.data),
            (SectionKind::VtxLay.type_id(), vtxlay.data),
            (SectionKind::IdxLay.type_id(), idxlay.data),
            (SectionKind::MtrCol.type_id(), mtrcol),
            (SectionKind::MdlInfo.type_id(), mdlinfo),
            (SectionKind::HieLay.type_id(), hielay),
            (SectionKind::LHeader.type_id(), lheader.data),
            (SectionKind::NodeLay.type_id(), nodelay),
            (SectionKind::GlblMtx.type_id(), glblmtx),
            (SectionKind::BnOfsMtx.type_id(), bnofsmtx),
            (SectionKind::Cpf.type_id(), vec![0xcf; 0x20]),
            (0, Vec::new()),
            (0, head),
            (0, body),
        ];

        let mut metadata = named_metadata(0xc0, 0x20, self.name);
        for (type_id, _) in &top_records {
            metadata.extend_from_slice(&type_id.to_le_bytes());
        }
        let records: Vec<&[u8]> = top_records.iter().map(|(_, r)| r.as_slice()).collect();
        let tmc = serialize(TMC, &records, &metadata, &[], &SerializeOptions::inline()).data;

        (tmc, lheader.companion.unwrap_or_default())
    }
}

fn inline(magic: Magic, records: &[Vec<u8>], metadata: &[u8]) -> Vec<u8> {
    serialize(magic, records, metadata, &[], &SerializeOptions::inline()).data
}

fn in_companion(magic: Magic, records: &[Vec<u8>]) -> Encoded {
    serialize(magic, records, &[], &[], &SerializeOptions::companion())
}

/// The standard two-object model: `MOT00` is the root, `OPTscat00` its child.
pub(crate) fn two_object_model() -> ModelBuilder {
    ModelBuilder::new(b"e_nin_a")
        .object(ObjectSpec::new(b"MOT00", NO_PARENT, &[DrawSpec::new(0, 0, &[0])]))
        .object(ObjectSpec::new(b"OPTscat00", 0, &[DrawSpec::new(0, 0, &[1])]).with_members(&[1]))
}
