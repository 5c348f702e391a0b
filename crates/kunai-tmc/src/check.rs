//! Structural consistency report for a model.

use std::fmt;

use crate::kind::SectionKind;
use crate::model::Model;
use crate::views::Xref;

/// One violated structural property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inconsistency {
    /// An object-parallel section has the wrong number of records.
    ParallelLength {
        kind: SectionKind,
        len: usize,
        objects: usize,
    },
    /// The hierarchy does not have exactly one root.
    RootCount(usize),
    ParentOutOfRange { node: usize, parent: i32 },
    /// A node lists a child whose parent pointer is elsewhere.
    StrayChild { node: usize, child: i32 },
    /// A node is missing from its parent's child list.
    UnlistedChild { node: usize, parent: usize },
    /// Following parents from this node never reaches the root.
    Cycle { node: usize },
    MaterialOutOfRange {
        object: usize,
        draw: usize,
        material: i32,
    },
    XrefMismatch {
        material: usize,
        expected: Vec<Xref>,
        actual: Vec<Xref>,
    },
    VertexBufferOutOfRange { object: usize, decl: usize, index: i32 },
    IndexBufferOutOfRange { object: usize, decl: usize, index: i32 },
    TextureSlotOutOfRange {
        object: usize,
        draw: usize,
        texture: usize,
        slot: i32,
    },
    /// The node-type side table does not describe the current nodes.
    StaleNodeTable,
}

impl fmt::Display for Inconsistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParallelLength { kind, len, objects } => {
                write!(f, "{kind} has {len} records for {objects} objects")
            }
            Self::RootCount(count) => write!(f, "hierarchy has {count} roots"),
            Self::ParentOutOfRange { node, parent } => {
                write!(f, "node {node} has parent {parent} out of range")
            }
            Self::StrayChild { node, child } => {
                write!(f, "node {node} lists child {child} whose parent differs")
            }
            Self::UnlistedChild { node, parent } => {
                write!(f, "node {node} is missing from children of {parent}")
            }
            Self::Cycle { node } => write!(f, "node {node} is on a parent cycle"),
            Self::MaterialOutOfRange {
                object,
                draw,
                material,
            } => write!(f, "object {object} draw {draw} uses missing material {material}"),
            Self::XrefMismatch {
                material,
                expected,
                actual,
            } => write!(
                f,
                "material {material} xrefs {actual:?} do not match geometry {expected:?}"
            ),
            Self::VertexBufferOutOfRange {
                object,
                decl,
                index,
            } => write!(f, "object {object} declaration {decl} uses missing vertex buffer {index}"),
            Self::IndexBufferOutOfRange {
                object,
                decl,
                index,
            } => write!(f, "object {object} declaration {decl} uses missing index buffer {index}"),
            Self::TextureSlotOutOfRange {
                object,
                draw,
                texture,
                slot,
            } => write!(
                f,
                "object {object} draw {draw} texture {texture} uses missing slot {slot}"
            ),
            Self::StaleNodeTable => write!(f, "node-type table does not match the nodes"),
        }
    }
}

fn index_in(index: i32, len: usize) -> Option<usize> {
    usize::try_from(index).ok().filter(|&i| i < len)
}

impl Model {
    /// Check the structural properties every edit preserves.
    ///
    /// An empty report means the model is consistent.
    pub fn check(&self) -> Vec<Inconsistency> {
        let mut report = Vec::new();
        let objects = self.object_count();

        for (kind, len) in self.parallel_lens() {
            if len != objects {
                report.push(Inconsistency::ParallelLength { kind, len, objects });
            }
        }

        self.check_hierarchy(&mut report);
        self.check_geometry(&mut report);

        if let Some(table) = &self.node_table {
            let names = self.node_names();
            let known = names.iter().all(|name| self.catalog.classify(name).is_some());
            if !known || self.build_node_table().body != table.body {
                report.push(Inconsistency::StaleNodeTable);
            }
        }
        report
    }

    fn check_hierarchy(&self, report: &mut Vec<Inconsistency>) {
        let nodes = self.hielay.records();
        let n = nodes.len();

        let roots = nodes.iter().filter(|node| node.is_root()).count();
        if roots != 1 {
            report.push(Inconsistency::RootCount(roots));
        }

        for (i, node) in nodes.iter().enumerate() {
            if !node.is_root() {
                match index_in(node.parent(), n) {
                    Some(parent) if !nodes[parent].children().contains(&(i as i32)) => {
                        report.push(Inconsistency::UnlistedChild { node: i, parent });
                    }
                    Some(_) => {}
                    None => report.push(Inconsistency::ParentOutOfRange {
                        node: i,
                        parent: node.parent(),
                    }),
                }
            }
            for child in node.children() {
                let listed = index_in(child, n).is_some_and(|c| nodes[c].parent() == i as i32);
                if !listed {
                    report.push(Inconsistency::StrayChild { node: i, child });
                }
            }

            let mut current = i;
            let mut steps = 0;
            while let Some(parent) = index_in(nodes[current].parent(), n) {
                steps += 1;
                if steps > n {
                    report.push(Inconsistency::Cycle { node: i });
                    break;
                }
                current = parent;
            }
        }
    }

    fn check_geometry(&self, report: &mut Vec<Inconsistency>) {
        let materials = self.mtrcol.len();
        let slots = self.ttdm.slot_count();

        for (object, geo) in self.mdlgeo.iter().enumerate() {
            for (decl, entry) in geo.declarations().iter().enumerate() {
                if index_in(entry.vertex_buffer_index(), self.vtxlay.len()).is_none() {
                    report.push(Inconsistency::VertexBufferOutOfRange {
                        object,
                        decl,
                        index: entry.vertex_buffer_index(),
                    });
                }
                if index_in(entry.index_buffer_index(), self.idxlay.len()).is_none() {
                    report.push(Inconsistency::IndexBufferOutOfRange {
                        object,
                        decl,
                        index: entry.index_buffer_index(),
                    });
                }
            }
            for (draw, chunk) in geo.draws().iter().enumerate() {
                if index_in(chunk.material_index(), materials).is_none() {
                    report.push(Inconsistency::MaterialOutOfRange {
                        object,
                        draw,
                        material: chunk.material_index(),
                    });
                }
                for (texture, binding) in chunk.textures().iter().enumerate() {
                    if index_in(binding.buffer_index, slots).is_none() {
                        report.push(Inconsistency::TextureSlotOutOfRange {
                            object,
                            draw,
                            texture,
                            slot: binding.buffer_index,
                        });
                    }
                }
            }
        }

        for (material, (record, expected)) in self.mtrcol.iter().zip(self.expected_xrefs()).enumerate() {
            let actual = record.xrefs();
            if actual != expected {
                report.push(Inconsistency::XrefMismatch {
                    material,
                    expected,
                    actual,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{two_object_model, DrawSpec, ModelBuilder, ObjectSpec};
    use crate::views::NO_PARENT;
    use pretty_assertions::assert_eq;

    fn parse(builder: ModelBuilder) -> Model {
        let (tmc, tmcl) = builder.build();
        Model::parse(&tmc, &tmcl).unwrap()
    }

    #[test]
    fn test_consistent_model() {
        assert_eq!(parse(two_object_model()).check(), vec![]);
    }

    #[test]
    fn test_dangling_references() {
        let model = parse(
            ModelBuilder::new(b"m")
                .textures(1)
                .object(ObjectSpec::new(b"MOT00", NO_PARENT, &[DrawSpec::new(3, 0, &[4])])),
        );

        assert_eq!(
            model.check(),
            vec![
                Inconsistency::MaterialOutOfRange {
                    object: 0,
                    draw: 0,
                    material: 3,
                },
                Inconsistency::TextureSlotOutOfRange {
                    object: 0,
                    draw: 0,
                    texture: 0,
                    slot: 4,
                },
            ]
        );
    }

    #[test]
    fn test_hierarchy_problems() {
        let mut model = parse(two_object_model());
        model.hielay[1].set_parent(NO_PARENT);

        let report = model.check();
        assert!(report.contains(&Inconsistency::RootCount(2)));
        assert!(report.contains(&Inconsistency::StrayChild { node: 0, child: 1 }));
    }

    #[test]
    fn test_parent_cycle() {
        let mut model = parse(two_object_model());
        model.hielay[0].set_parent(1);
        model.hielay[1].set_children(&[0]);
        model.hielay[0].set_children(&[1]);

        let report = model.check();
        assert!(report.contains(&Inconsistency::RootCount(0)));
        assert!(report.contains(&Inconsistency::Cycle { node: 0 }));
    }

    #[test]
    fn test_xref_mismatch() {
        let mut model = parse(two_object_model());
        model.mtrcol[0].set_xrefs(&[Xref::new(0, 1)]);

        assert_eq!(
            model.check(),
            vec![Inconsistency::XrefMismatch {
                material: 0,
                expected: vec![Xref::new(0, 1), Xref::new(1, 1)],
                actual: vec![Xref::new(0, 1)],
            }]
        );
        assert!(model.check()[0].to_string().contains("material 0"));
    }

    #[test]
    fn test_stale_node_table() {
        let mut model = parse(two_object_model());
        model.nodelay.records_mut().swap(0, 1);
        assert!(model.check().contains(&Inconsistency::StaleNodeTable));
    }
}
