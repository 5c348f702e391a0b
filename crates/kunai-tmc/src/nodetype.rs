//! Node-type side table stored in top-level records 13 and 14.
//!
//! The head record holds, per node type, the start and count of that type's
//! nodes in node order. The body holds one 0x60-byte item per node with its
//! type, subtype and ordinal within the subtype. Node types and subtypes
//! come from node name prefixes, so the table must be rebuilt whenever
//! nodes are added, removed or reordered.

use kunai_common::align::align_up;
use kunai_common::{ByteOrder, LittleEndian};

/// Top-level record index of the head.
pub const HEAD_RECORD: usize = 13;
/// Top-level record index of the body.
pub const BODY_RECORD: usize = 14;

pub const HEAD_SIZE: usize = 0x80;
pub const ITEM_SIZE: usize = 0x60;

const HEAD_NAME: usize = 0x28;
const ITEM_FIELDS: usize = 0x0c;
const TABLE_ALIGNMENT: usize = 0x20;

/// Bytes of an item past its type, subtype and ordinal.
pub const ITEM_EXTRA_SIZE: usize = ITEM_SIZE - ITEM_FIELDS;

/// A node's type, decided by its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeClass {
    pub type_id: u32,
    /// Subtype for nodes of the subtyped type, zero otherwise.
    pub subtype: u32,
}

/// Name prefixes and the type ids they map to.
///
/// The type order is the order node groups appear in the head. Sorting
/// objects with a custom key should reorder the catalog with the same key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeTypeCatalog {
    types: Vec<(Vec<u8>, u32)>,
    subtyped: u32,
    subtypes: Vec<(Vec<u8>, u32)>,
}

impl Default for NodeTypeCatalog {
    fn default() -> Self {
        Self {
            types: vec![
                (b"MOT".to_vec(), 1),
                (b"OPT".to_vec(), 5),
                (b"SUP".to_vec(), 4),
                (b"WGT".to_vec(), 3),
                (b"WPB".to_vec(), 7),
            ],
            subtyped: 5,
            subtypes: vec![
                (b"blur".to_vec(), 1),
                (b"r_".to_vec(), 2),
                (b"scat".to_vec(), 3),
                (b"_acs".to_vec(), 4),
                (b"kami".to_vec(), 4),
                (b"corpse".to_vec(), 0xb),
            ],
        }
    }
}

impl NodeTypeCatalog {
    /// Type prefixes in head order.
    pub fn prefixes(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.types.iter().map(|(prefix, _)| prefix.as_slice())
    }

    /// The same catalog with its types stably sorted by `key` of their prefix.
    pub fn reordered_by<K: Ord>(&self, key: impl Fn(&[u8]) -> K) -> Self {
        let mut catalog = self.clone();
        catalog.types.sort_by_key(|(prefix, _)| key(prefix));
        catalog
    }

    pub fn classify(&self, name: &[u8]) -> Option<NodeClass> {
        let (prefix, type_id) = self
            .types
            .iter()
            .find(|(prefix, _)| name.starts_with(prefix))?;

        if *type_id != self.subtyped {
            return Some(NodeClass {
                type_id: *type_id,
                subtype: 0,
            });
        }
        let rest = &name[prefix.len()..];
        let (_, subtype) = self
            .subtypes
            .iter()
            .find(|(sub_prefix, _)| rest.starts_with(sub_prefix))?;

        Some(NodeClass {
            type_id: *type_id,
            subtype: *subtype,
        })
    }

    /// # Panics
    ///
    /// Panics if any name has an unknown type or subtype prefix.
    pub fn assert_known<'a>(&self, names: impl IntoIterator<Item = &'a [u8]>) {
        for name in names {
            assert!(
                self.classify(name).is_some(),
                "invariant violation: no node type for node name {:?}",
                String::from_utf8_lossy(name)
            );
        }
    }
}

/// The head and body records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeTypeTable {
    pub head: Vec<u8>,
    pub body: Vec<u8>,
}

impl NodeTypeTable {
    /// Build the table for nodes named `names`, in node order.
    ///
    /// `extras` carries each node's item bytes past the documented fields;
    /// missing entries are written as zeros.
    ///
    /// # Panics
    ///
    /// Panics if a name is unknown to `catalog`.
    pub fn build(
        catalog: &NodeTypeCatalog,
        model_name: &[u8],
        names: &[&[u8]],
        extras: &[Vec<u8>],
    ) -> Self {
        let classes: Vec<NodeClass> = names
            .iter()
            .map(|name| match catalog.classify(name) {
                Some(class) => class,
                None => panic!(
                    "invariant violation: no node type for node name {:?}",
                    String::from_utf8_lossy(name)
                ),
            })
            .collect();

        let mut head = vec![0u8; HEAD_SIZE];
        let mut start = 0usize;
        for (_, type_id) in &catalog.types {
            let count = classes.iter().filter(|c| c.type_id == *type_id).count();
            if count > 0 {
                let at = 4 * *type_id as usize;
                LittleEndian::write_u16(&mut head[at..], start as u16);
                LittleEndian::write_u16(&mut head[at + 2..], count as u16);
            }
            start += count;
        }
        let name_len = model_name.len().min(HEAD_SIZE - HEAD_NAME);
        head[HEAD_NAME..HEAD_NAME + name_len].copy_from_slice(&model_name[..name_len]);

        let table_size = align_up(4 * names.len(), TABLE_ALIGNMENT);
        let mut body = vec![0u8; table_size + ITEM_SIZE * names.len()];
        let mut ordinals: Vec<(u32, u32)> = Vec::new();

        for (i, class) in classes.iter().enumerate() {
            let offset = table_size + ITEM_SIZE * i;
            LittleEndian::write_u32(&mut body[4 * i..], offset as u32);

            let item = &mut body[offset..offset + ITEM_SIZE];
            LittleEndian::write_u32(&mut item[0..], class.type_id);
            if class.type_id == catalog.subtyped {
                let ordinal = match ordinals.iter_mut().find(|(s, _)| *s == class.subtype) {
                    Some((_, next)) => {
                        *next += 1;
                        *next - 1
                    }
                    None => {
                        ordinals.push((class.subtype, 1));
                        0
                    }
                };
                LittleEndian::write_u32(&mut item[4..], class.subtype);
                LittleEndian::write_u32(&mut item[8..], ordinal);
            }
            if let Some(extra) = extras.get(i) {
                let len = extra.len().min(ITEM_EXTRA_SIZE);
                item[ITEM_FIELDS..ITEM_FIELDS + len].copy_from_slice(&extra[..len]);
            }
        }

        Self { head, body }
    }

    /// Per-item bytes past the documented fields, if `body` holds exactly
    /// `count` items laid out the way [`NodeTypeTable::build`] writes them.
    pub fn item_extras(body: &[u8], count: usize) -> Option<Vec<Vec<u8>>> {
        let table_size = align_up(4 * count, TABLE_ALIGNMENT);
        if body.len() < table_size + ITEM_SIZE * count {
            return None;
        }
        (0..count)
            .map(|i| {
                let offset = LittleEndian::read_u32(&body[4 * i..]) as usize;
                body.get(offset + ITEM_FIELDS..offset + ITEM_SIZE)
                    .map(<[u8]>::to_vec)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn item(body: &[u8], i: usize) -> [u32; 3] {
        let offset = LittleEndian::read_u32(&body[4 * i..]) as usize;
        [
            LittleEndian::read_u32(&body[offset..]),
            LittleEndian::read_u32(&body[offset + 4..]),
            LittleEndian::read_u32(&body[offset + 8..]),
        ]
    }

    fn pair(head: &[u8], type_id: usize) -> (u16, u16) {
        (
            LittleEndian::read_u16(&head[4 * type_id..]),
            LittleEndian::read_u16(&head[4 * type_id + 2..]),
        )
    }

    #[test]
    fn test_classify() {
        let catalog = NodeTypeCatalog::default();
        assert_eq!(
            catalog.classify(b"OPTkami01"),
            Some(NodeClass { type_id: 5, subtype: 4 })
        );
        assert_eq!(
            catalog.classify(b"WGT_sword"),
            Some(NodeClass { type_id: 3, subtype: 0 })
        );
        assert_eq!(catalog.classify(b"OPTunknown"), None);
        assert_eq!(catalog.classify(b"XYZ"), None);
    }

    #[test]
    fn test_head_groups() {
        let names: [&[u8]; 5] = [b"MOT00", b"MOT01", b"OPTscat00", b"SUP00", b"WPB00"];
        let table = NodeTypeTable::build(&NodeTypeCatalog::default(), b"e_nin_a", &names, &[]);

        assert_eq!(table.head.len(), HEAD_SIZE);
        assert_eq!(pair(&table.head, 1), (0, 2));
        assert_eq!(pair(&table.head, 5), (2, 1));
        assert_eq!(pair(&table.head, 4), (3, 1));
        assert_eq!(pair(&table.head, 3), (0, 0));
        assert_eq!(pair(&table.head, 7), (4, 1));
        assert_eq!(&table.head[HEAD_NAME..HEAD_NAME + 8], b"e_nin_a\0");
    }

    #[test]
    fn test_body_ordinals_per_subtype() {
        let names: [&[u8]; 6] = [
            b"OPTblur0",
            b"OPTblur1",
            b"OPT_acs0",
            b"OPTkami0",
            b"OPTscat0",
            b"MOT00",
        ];
        let table = NodeTypeTable::build(&NodeTypeCatalog::default(), b"m", &names, &[]);

        assert_eq!(table.body.len(), 0x20 + 6 * ITEM_SIZE);
        assert_eq!(item(&table.body, 0), [5, 1, 0]);
        assert_eq!(item(&table.body, 1), [5, 1, 1]);
        assert_eq!(item(&table.body, 2), [5, 4, 0]);
        assert_eq!(item(&table.body, 3), [5, 4, 1]);
        assert_eq!(item(&table.body, 4), [5, 3, 0]);
        assert_eq!(item(&table.body, 5), [1, 0, 0]);
    }

    #[test]
    fn test_extras_carried() {
        let names: [&[u8]; 2] = [b"MOT00", b"WGT00"];
        let extras = vec![vec![0xaa; ITEM_EXTRA_SIZE], vec![0xbb; ITEM_EXTRA_SIZE]];
        let table = NodeTypeTable::build(&NodeTypeCatalog::default(), b"m", &names, &extras);

        assert_eq!(NodeTypeTable::item_extras(&table.body, 2), Some(extras));
        assert_eq!(NodeTypeTable::item_extras(&table.body, 9), None);
    }

    #[test]
    fn test_reordered_catalog() {
        let order: [&[u8]; 5] = [b"MOT", b"SUP", b"WPB", b"OPT", b"WGT"];
        let catalog = NodeTypeCatalog::default()
            .reordered_by(|prefix| order.iter().position(|p| *p == prefix));
        assert_eq!(catalog.prefixes().collect::<Vec<_>>(), order.to_vec());

        let names: [&[u8]; 3] = [b"MOT00", b"SUP00", b"OPTr_0"];
        let table = NodeTypeTable::build(&catalog, b"m", &names, &[]);
        assert_eq!(pair(&table.head, 4), (1, 1));
        assert_eq!(pair(&table.head, 5), (2, 1));
    }

    #[test]
    #[should_panic(expected = "invariant violation")]
    fn test_unknown_prefix_panics() {
        NodeTypeCatalog::default().assert_known([&b"ABC00"[..]]);
    }
}
