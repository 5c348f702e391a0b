//! Object hierarchy nodes.

use std::borrow::Cow;

use kunai_common::align::pad_to;
use kunai_common::{field, ByteOrder, LittleEndian};

use crate::error::ensure_len;
use crate::section::Record;
use crate::Result;

const PARENT: usize = 0x40;
const CHILD_COUNT: usize = 0x44;
const LEVEL: usize = 0x48;
const CHILDREN: usize = 0x50;

/// Parent value of the root node.
pub const NO_PARENT: i32 = -1;

/// A `HieLay` record: transform, parent link and child list.
#[derive(Debug, Clone, PartialEq)]
pub struct HierarchyNode {
    data: Vec<u8>,
}

impl HierarchyNode {
    pub fn new(matrix: &[f32; 16], parent: i32, level: i32, children: &[i32]) -> Self {
        let mut data = vec![0u8; CHILDREN];
        LittleEndian::write_f32_into(matrix, &mut data[..PARENT]);
        LittleEndian::write_i32(&mut data[PARENT..], parent);
        LittleEndian::write_i32(&mut data[LEVEL..], level);

        let mut node = Self { data };
        node.rebuild_children(children);
        node
    }

    pub fn matrix(&self) -> [f32; 16] {
        let mut out = [0.0; 16];
        LittleEndian::read_f32_into(&self.data[..PARENT], &mut out);
        out
    }

    /// Parent index, [`NO_PARENT`] for the root.
    pub fn parent(&self) -> i32 {
        LittleEndian::read_i32(&self.data[PARENT..])
    }

    pub fn set_parent(&mut self, parent: i32) {
        LittleEndian::write_i32(&mut self.data[PARENT..], parent);
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent() == NO_PARENT
    }

    pub fn level(&self) -> i32 {
        LittleEndian::read_i32(&self.data[LEVEL..])
    }

    pub fn set_level(&mut self, level: i32) {
        LittleEndian::write_i32(&mut self.data[LEVEL..], level);
    }

    pub fn child_count(&self) -> usize {
        LittleEndian::read_u32(&self.data[CHILD_COUNT..]) as usize
    }

    pub fn children(&self) -> Vec<i32> {
        let mut out = vec![0; self.child_count()];
        LittleEndian::read_i32_into(&self.data[CHILDREN..CHILDREN + 4 * out.len()], &mut out);
        out
    }

    /// Replace the child list, in place when the count is unchanged.
    pub fn set_children(&mut self, children: &[i32]) {
        if children.len() == self.child_count() {
            let end = CHILDREN + 4 * children.len();
            LittleEndian::write_i32_into(children, &mut self.data[CHILDREN..end]);
        } else {
            self.rebuild_children(children);
        }
    }

    fn rebuild_children(&mut self, children: &[i32]) {
        self.data.truncate(CHILDREN);
        LittleEndian::write_u32(&mut self.data[CHILD_COUNT..], children.len() as u32);
        for child in children {
            self.data.extend_from_slice(&child.to_le_bytes());
        }
        pad_to(&mut self.data, 0x10);
    }
}

impl Record for HierarchyNode {
    fn parse(data: &[u8]) -> Result<Self> {
        ensure_len("HieLay", data, CHILDREN)?;
        let count = field::u32_at(data, CHILD_COUNT)? as usize;
        ensure_len("HieLay", data, CHILDREN.saturating_add(count.saturating_mul(4)))?;

        Ok(Self {
            data: data.to_vec(),
        })
    }

    fn to_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(&self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const IDENTITY: [f32; 16] = [
        1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0,
    ];

    #[test]
    fn test_new_node() {
        let node = HierarchyNode::new(&IDENTITY, NO_PARENT, 0, &[1, 2, 3]);

        assert!(node.is_root());
        assert_eq!(node.children(), vec![1, 2, 3]);
        assert_eq!(node.matrix(), IDENTITY);
        assert_eq!(node.to_bytes().len(), 0x60);
    }

    #[test]
    fn test_children_rebuild_keeps_head() {
        let mut node = HierarchyNode::new(&IDENTITY, 0, 1, &[]);
        assert_eq!(node.to_bytes().len(), 0x50);

        node.set_children(&[4, 5, 6, 7, 8]);
        let reparsed = HierarchyNode::parse(&node.to_bytes()).unwrap();
        assert_eq!(reparsed.children(), vec![4, 5, 6, 7, 8]);
        assert_eq!(reparsed.parent(), 0);
        assert_eq!(reparsed.level(), 1);
        assert_eq!(reparsed.to_bytes().len(), 0x70);

        node.set_children(&[8, 7, 6, 5, 4]);
        assert_eq!(node.to_bytes().len(), 0x70);
        assert_eq!(node.children(), vec![8, 7, 6, 5, 4]);
    }

    #[test]
    fn test_reject_short_children() {
        let mut data = HierarchyNode::new(&IDENTITY, 0, 1, &[]).to_bytes().into_owned();
        LittleEndian::write_u32(&mut data[CHILD_COUNT..], 1);
        assert!(HierarchyNode::parse(&data).is_err());
    }
}
