//! Node objects: named nodes with transform and node-group data.

use std::borrow::Cow;

use kunai_common::align::pad_to;
use kunai_common::{field, ByteOrder, LittleEndian};

use crate::error::ensure_len;
use crate::kind::NODE_OBJ;
use crate::section::{Record, Section};
use crate::Result;

const NODE_ID: usize = 0x08;
const NAME: usize = 0x10;

const OBJECT_INDEX: usize = 0x00;
const MEMBER_COUNT: usize = 0x04;
const NODE_INDEX: usize = 0x08;
const MATRIX: usize = 0x10;
const MEMBERS: usize = 0x50;

/// A `NodeObj` container. Its name decides the node's type and sort order.
#[derive(Debug, Clone)]
pub struct NodeObject {
    section: Section<NodeData>,
}

impl NodeObject {
    pub fn name(&self) -> &[u8] {
        field::name_at(self.section.metadata(), NAME)
    }

    pub fn node_id(&self) -> u32 {
        LittleEndian::read_u32(&self.section.metadata()[NODE_ID..])
    }

    pub(crate) fn set_node_id(&mut self, id: u32) {
        LittleEndian::write_u32(&mut self.section.metadata_mut()[NODE_ID..], id);
    }

    #[inline]
    pub fn data(&self) -> &[NodeData] {
        self.section.records()
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [NodeData] {
        self.section.records_mut()
    }
}

impl Record for NodeObject {
    fn parse(data: &[u8]) -> Result<Self> {
        let section = Section::parse(NODE_OBJ, data, None)?;
        ensure_len("NodeObj metadata", section.metadata(), NODE_ID + 4)?;
        Ok(Self { section })
    }

    fn to_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Owned(self.section.encode().data)
    }
}

/// A node data record: placement plus the node-group member list.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeData {
    data: Vec<u8>,
}

impl NodeData {
    pub fn object_index(&self) -> u32 {
        LittleEndian::read_u32(&self.data[OBJECT_INDEX..])
    }

    pub(crate) fn set_object_index(&mut self, index: u32) {
        LittleEndian::write_u32(&mut self.data[OBJECT_INDEX..], index);
    }

    pub fn node_index(&self) -> u32 {
        LittleEndian::read_u32(&self.data[NODE_INDEX..])
    }

    pub(crate) fn set_node_index(&mut self, index: u32) {
        LittleEndian::write_u32(&mut self.data[NODE_INDEX..], index);
    }

    pub fn matrix(&self) -> [f32; 16] {
        let mut out = [0.0; 16];
        LittleEndian::read_f32_into(&self.data[MATRIX..MEMBERS], &mut out);
        out
    }

    pub fn member_count(&self) -> usize {
        LittleEndian::read_u32(&self.data[MEMBER_COUNT..]) as usize
    }

    /// Object indices grouped under this node.
    pub fn members(&self) -> Vec<i32> {
        let mut out = vec![0; self.member_count()];
        LittleEndian::read_i32_into(&self.data[MEMBERS..MEMBERS + 4 * out.len()], &mut out);
        out
    }

    /// Replace the member list, in place when the count is unchanged.
    pub fn set_members(&mut self, members: &[i32]) {
        if members.len() == self.member_count() {
            let end = MEMBERS + 4 * members.len();
            LittleEndian::write_i32_into(members, &mut self.data[MEMBERS..end]);
            return;
        }
        self.data.truncate(MEMBERS);
        LittleEndian::write_u32(&mut self.data[MEMBER_COUNT..], members.len() as u32);
        for member in members {
            self.data.extend_from_slice(&member.to_le_bytes());
        }
        pad_to(&mut self.data, 0x10);
    }
}

impl Record for NodeData {
    fn parse(data: &[u8]) -> Result<Self> {
        ensure_len("node data", data, MEMBERS)?;
        let count = field::u32_at(data, MEMBER_COUNT)? as usize;
        ensure_len("node data", data, MEMBERS.saturating_add(count.saturating_mul(4)))?;

        Ok(Self {
            data: data.to_vec(),
        })
    }

    fn to_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(&self.data)
    }
}
