//! Structural edits over a [`Model`].
//!
//! Every operation validates its preconditions before touching the model,
//! so a panic leaves the model as it was. After the edit all self-indices
//! are renumbered and the node-type side table is rebuilt.

use std::collections::BTreeMap;
use std::ops::Range;

use crate::kind::SectionKind;
use crate::model::Model;
use crate::nodetype::ITEM_EXTRA_SIZE;
use crate::views::{HierarchyNode, NodeObject, ObjGeo, TextureDestination, Xref, NO_PARENT};

/// Which material inserted draws use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaterialTarget {
    /// Point every inserted draw at this destination material.
    Existing(usize),
    /// Append a copy of each source material the inserted draws use.
    #[default]
    CopyFromSource,
}

/// How inserted objects are attached to the destination's materials and textures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertRemap {
    pub material: MaterialTarget,
    /// Texture directory slots for each inserted draw's bindings, in binding order.
    pub texture_buffers: Option<Vec<i32>>,
}

impl Model {
    /// Record counts of the object-parallel sections besides `NodeLay`.
    pub fn parallel_lens(&self) -> [(SectionKind, usize); 5] {
        [
            (SectionKind::MdlGeo, self.mdlgeo.len()),
            (SectionKind::MdlInfo, self.mdlinfo.len()),
            (SectionKind::HieLay, self.hielay.len()),
            (SectionKind::GlblMtx, self.glblmtx.len()),
            (SectionKind::BnOfsMtx, self.bnofsmtx.len()),
        ]
    }

    fn assert_parallel(&self) {
        let n = self.object_count();
        for (kind, len) in self.parallel_lens() {
            assert!(
                len == n,
                "invariant violation: {kind} has {len} records for {n} objects"
            );
        }
    }

    /// Index of the single hierarchy root.
    ///
    /// # Panics
    ///
    /// Panics unless exactly one node has no parent.
    pub fn root_index(&self) -> usize {
        let mut roots = self
            .hielay
            .iter()
            .enumerate()
            .filter(|(_, node)| node.is_root())
            .map(|(i, _)| i);
        match (roots.next(), roots.next()) {
            (Some(root), None) => root,
            _ => panic!(
                "invariant violation: hierarchy needs exactly one root, found {}",
                self.hielay.iter().filter(|n| n.is_root()).count()
            ),
        }
    }

    fn assert_buffers(&self, objects: Range<usize>) {
        for i in objects {
            for entry in self.mdlgeo[i].declarations() {
                assert_in_range("vertex buffer", entry.vertex_buffer_index(), self.vtxlay.len());
                assert_in_range("index buffer", entry.index_buffer_index(), self.idxlay.len());
            }
        }
    }

    /// Copy objects `range` of `source` into this model at `at` (`None` appends).
    ///
    /// Returns the indices the copies occupy.
    ///
    /// # Panics
    ///
    /// Panics on an invariant violation: mismatched parallel sections, a
    /// range or position out of bounds, a destination without exactly one
    /// root, dangling buffer or material references, texture buffer lists
    /// that do not match a draw, texture slots missing from this model's
    /// directory, or node names unknown to the node-type catalog.
    pub fn insert_objects(
        &mut self,
        source: &Model,
        range: Range<usize>,
        at: Option<usize>,
        remap: &InsertRemap,
    ) -> Range<usize> {
        self.assert_parallel();
        source.assert_parallel();
        assert!(
            range.start <= range.end && range.end <= source.object_count(),
            "invariant violation: source range {range:?} outside {} objects",
            source.object_count()
        );
        let len = self.object_count();
        let at = at.unwrap_or(len);
        assert!(
            at <= len,
            "invariant violation: insert position {at} past {len} objects"
        );
        let root = self.root_index();
        source.assert_buffers(range.clone());

        if let MaterialTarget::Existing(m) = remap.material {
            assert_in_range("material", m as i32, self.mtrcol.len());
        }
        let slots = self.ttdm.slot_count();
        if let Some(buffers) = &remap.texture_buffers {
            for &buffer in buffers {
                assert_in_range("texture slot", buffer, slots);
            }
        }
        for geo in &source.mdlgeo.records()[range.clone()] {
            for draw in geo.draws() {
                if remap.material == MaterialTarget::CopyFromSource {
                    assert_in_range("material", draw.material_index(), source.mtrcol.len());
                }
                match &remap.texture_buffers {
                    Some(buffers) => assert!(
                        draw.texture_count() == buffers.len(),
                        "invariant violation: {} texture buffers for a draw with {} textures",
                        buffers.len(),
                        draw.texture_count()
                    ),
                    // Kept bindings must already resolve in this directory.
                    None => {
                        for binding in draw.textures() {
                            assert_in_range("texture slot", binding.buffer_index, slots);
                        }
                    }
                }
            }
        }
        if self.node_table.is_some() {
            let inserted = source.nodelay.records()[range.clone()].iter().map(NodeObject::name);
            self.catalog
                .assert_known(self.nodelay.iter().map(NodeObject::name).chain(inserted));
        }

        let k = range.len();
        let shift = |i: i32| if i >= at as i32 { i + k as i32 } else { i };

        for node in self.hielay.iter_mut() {
            node.set_parent(shift(node.parent()));
            let children: Vec<i32> = node.children().into_iter().map(shift).collect();
            node.set_children(&children);
        }
        for material in self.mtrcol.iter_mut() {
            let xrefs: Vec<Xref> = material
                .xrefs()
                .into_iter()
                .map(|x| Xref::new(shift(x.object_index), x.count))
                .collect();
            material.set_xrefs(&xrefs);
        }
        for node in self.nodelay.iter_mut() {
            for data in node.data_mut() {
                let members: Vec<i32> = data.members().into_iter().map(shift).collect();
                data.set_members(&members);
            }
        }

        let mut geos: Vec<ObjGeo> = source.mdlgeo.records()[range.clone()].to_vec();
        for geo in &mut geos {
            for entry in geo.declarations_mut() {
                let vb = entry.vertex_buffer_index() as usize;
                entry.set_vertex_buffer_index(self.vtxlay.len() as i32);
                self.vtxlay.push(source.vtxlay[vb].clone());

                let ib = entry.index_buffer_index() as usize;
                entry.set_index_buffer_index(self.idxlay.len() as i32);
                self.idxlay.push(source.idxlay[ib].clone());
            }
        }

        let mut copied: Vec<(i32, i32)> = Vec::new();
        for geo in &mut geos {
            for draw in geo.draws_mut() {
                let target = match remap.material {
                    MaterialTarget::Existing(m) => m as i32,
                    MaterialTarget::CopyFromSource => {
                        let src = draw.material_index();
                        match copied.iter().find(|(s, _)| *s == src) {
                            Some(&(_, dst)) => dst,
                            None => {
                                let mut material = source.mtrcol[src as usize].clone();
                                material.set_xrefs(&[]);
                                let dst = self.mtrcol.len() as i32;
                                self.mtrcol.push(material);
                                copied.push((src, dst));
                                dst
                            }
                        }
                    }
                };
                draw.set_material_index(target);

                if let Some(buffers) = &remap.texture_buffers {
                    for (t, &buffer) in buffers.iter().enumerate() {
                        draw.set_texture_buffer(t, buffer);
                    }
                }
            }
        }
        for (o, geo) in geos.iter().enumerate() {
            for (material, count) in material_counts(geo) {
                let record = &mut self.mtrcol[material as usize];
                let mut xrefs = record.xrefs();
                xrefs.push(Xref::new((at + o) as i32, count));
                xrefs.sort_unstable();
                record.set_xrefs(&xrefs);
            }
        }

        let new_root = shift(root as i32);
        let nodes: Vec<HierarchyNode> = source.hielay.records()[range.clone()]
            .iter()
            .map(|node| {
                let mut node = node.clone();
                node.set_parent(new_root);
                node.set_level(1);
                node.set_children(&[]);
                node
            })
            .collect();

        let remap_member = |m: i32| {
            usize::try_from(m)
                .ok()
                .filter(|m| range.contains(m))
                .map(|m| (at + m - range.start) as i32)
        };
        let node_objs: Vec<NodeObject> = source.nodelay.records()[range.clone()]
            .iter()
            .map(|node| {
                let mut node = node.clone();
                for data in node.data_mut() {
                    let members: Vec<i32> =
                        data.members().into_iter().filter_map(remap_member).collect();
                    data.set_members(&members);
                }
                node
            })
            .collect();

        insert_run(self.mdlgeo.records_mut(), at, geos);
        insert_run(
            self.mdlinfo.records_mut(),
            at,
            source.mdlinfo.records()[range.clone()].to_vec(),
        );
        insert_run(self.hielay.records_mut(), at, nodes);
        insert_run(self.nodelay.records_mut(), at, node_objs);
        insert_run(
            self.glblmtx.records_mut(),
            at,
            source.glblmtx.records()[range.clone()].to_vec(),
        );
        insert_run(
            self.bnofsmtx.records_mut(),
            at,
            source.bnofsmtx.records()[range.clone()].to_vec(),
        );
        if self.node_table.is_some() {
            let extras = range
                .clone()
                .map(|i| {
                    source
                        .node_extras
                        .get(i)
                        .cloned()
                        .unwrap_or_else(|| vec![0; ITEM_EXTRA_SIZE])
                })
                .collect();
            insert_run(&mut self.node_extras, at, extras);
        }

        let root_node = &mut self.hielay[new_root as usize];
        let mut children = root_node.children();
        children.extend(at as i32..(at + k) as i32);
        children.sort_unstable();
        children.dedup();
        root_node.set_children(&children);

        self.renumber();
        tracing::debug!(
            source = %String::from_utf8_lossy(source.name()),
            inserted = k,
            at,
            "inserted objects"
        );
        at..at + k
    }

    /// Remove every object whose node name matches `predicate`.
    ///
    /// Returns the number of removed objects. Vertex and index buffers of
    /// removed objects stay in place.
    ///
    /// # Panics
    ///
    /// Panics if the root would be removed, a surviving object's parent
    /// would be removed, or the parallel sections disagree.
    pub fn remove_objects<F: Fn(&[u8]) -> bool>(&mut self, predicate: F) -> usize {
        self.assert_parallel();
        let removed: Vec<bool> = self.nodelay.iter().map(|n| predicate(n.name())).collect();
        let count = removed.iter().filter(|&&r| r).count();
        if count == 0 {
            return 0;
        }

        for (i, node) in self.hielay.iter().enumerate() {
            if removed[i] {
                assert!(
                    !node.is_root(),
                    "invariant violation: object {i} is the hierarchy root"
                );
            } else if let Ok(parent) = usize::try_from(node.parent()) {
                assert!(
                    !removed.get(parent).copied().unwrap_or(false),
                    "invariant violation: object {i} survives but its parent {parent} is removed"
                );
            }
        }
        if self.node_table.is_some() {
            self.catalog.assert_known(
                self.nodelay
                    .iter()
                    .zip(&removed)
                    .filter(|(_, &r)| !r)
                    .map(|(n, _)| n.name()),
            );
        }

        let mut next = 0;
        let new_index: Vec<Option<i32>> = removed
            .iter()
            .map(|&r| {
                (!r).then(|| {
                    next += 1;
                    next - 1
                })
            })
            .collect();
        let map = |i: i32| {
            usize::try_from(i)
                .ok()
                .and_then(|i| new_index.get(i).copied().flatten())
        };

        for node in self.hielay.iter_mut() {
            node.set_parent(map(node.parent()).unwrap_or(NO_PARENT));
            let children: Vec<i32> = node.children().into_iter().filter_map(map).collect();
            node.set_children(&children);
        }
        for material in self.mtrcol.iter_mut() {
            let xrefs: Vec<Xref> = material
                .xrefs()
                .into_iter()
                .filter_map(|x| map(x.object_index).map(|o| Xref::new(o, x.count)))
                .collect();
            material.set_xrefs(&xrefs);
        }
        for node in self.nodelay.iter_mut() {
            for data in node.data_mut() {
                let members: Vec<i32> = data.members().into_iter().filter_map(map).collect();
                data.set_members(&members);
            }
        }

        retain_kept(self.mdlgeo.records_mut(), &removed);
        retain_kept(self.mdlinfo.records_mut(), &removed);
        retain_kept(self.hielay.records_mut(), &removed);
        retain_kept(self.nodelay.records_mut(), &removed);
        retain_kept(self.glblmtx.records_mut(), &removed);
        retain_kept(self.bnofsmtx.records_mut(), &removed);
        retain_kept(&mut self.node_extras, &removed);

        self.renumber();
        tracing::debug!(removed = count, remaining = self.object_count(), "removed objects");
        count
    }

    /// Stably sort objects by `key` of their node names.
    ///
    /// Vertex and index buffers are rebuilt in the new object order;
    /// buffers no declaration refers to are dropped. The node-type catalog
    /// is reordered by the same key.
    ///
    /// # Panics
    ///
    /// Panics if the parallel sections disagree, a declaration points at a
    /// missing buffer, or a node name is unknown to the catalog.
    pub fn sort_objects_by_key<K: Ord, F: Fn(&[u8]) -> K>(&mut self, key: F) {
        self.assert_parallel();
        let n = self.object_count();
        self.assert_buffers(0..n);

        let catalog = self.catalog.reordered_by(&key);
        if self.node_table.is_some() {
            catalog.assert_known(self.nodelay.iter().map(NodeObject::name));
        }

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by_key(|&i| key(self.nodelay[i].name()));
        let mut rank = vec![0usize; n];
        for (new, &old) in order.iter().enumerate() {
            rank[old] = new;
        }

        permute(self.mdlgeo.records_mut(), &rank);
        permute(self.mdlinfo.records_mut(), &rank);
        permute(self.hielay.records_mut(), &rank);
        permute(self.nodelay.records_mut(), &rank);
        permute(self.glblmtx.records_mut(), &rank);
        permute(self.bnofsmtx.records_mut(), &rank);
        permute(&mut self.node_extras, &rank);

        let vertex_buffers = std::mem::take(self.vtxlay.records_mut());
        let index_buffers = std::mem::take(self.idxlay.records_mut());
        for geo in self.mdlgeo.iter_mut() {
            for entry in geo.declarations_mut() {
                let vb = entry.vertex_buffer_index() as usize;
                entry.set_vertex_buffer_index(self.vtxlay.len() as i32);
                self.vtxlay.push(vertex_buffers[vb].clone());

                let ib = entry.index_buffer_index() as usize;
                entry.set_index_buffer_index(self.idxlay.len() as i32);
                self.idxlay.push(index_buffers[ib].clone());
            }
        }

        let map = |i: i32| usize::try_from(i).ok().and_then(|i| rank.get(i)).map(|&r| r as i32);
        for node in self.hielay.iter_mut() {
            node.set_parent(map(node.parent()).unwrap_or(NO_PARENT));
        }
        let parents: Vec<i32> = self.hielay.iter().map(HierarchyNode::parent).collect();
        for (i, node) in self.hielay.iter_mut().enumerate() {
            let children: Vec<i32> = parents
                .iter()
                .enumerate()
                .filter(|(_, &p)| p == i as i32)
                .map(|(j, _)| j as i32)
                .collect();
            node.set_children(&children);
        }
        for node in self.nodelay.iter_mut() {
            for data in node.data_mut() {
                let members: Vec<i32> = data.members().into_iter().filter_map(map).collect();
                data.set_members(&members);
            }
        }
        self.rebuild_xrefs();

        self.catalog = catalog;
        self.renumber();
        tracing::debug!(objects = n, "sorted objects");
    }

    /// Sort objects by node name.
    pub fn sort_objects_by_name(&mut self) {
        self.sort_objects_by_key(<[u8]>::to_vec);
    }

    /// Rebuild every material's xref list from the draws that use it.
    pub(crate) fn rebuild_xrefs(&mut self) {
        let expected = self.expected_xrefs();
        for (material, xrefs) in self.mtrcol.iter_mut().zip(expected) {
            material.set_xrefs(&xrefs);
        }
    }

    /// Per material, the xrefs the geometry implies.
    pub(crate) fn expected_xrefs(&self) -> Vec<Vec<Xref>> {
        let mut expected = vec![Vec::new(); self.mtrcol.len()];
        for (k, geo) in self.mdlgeo.iter().enumerate() {
            for (material, count) in material_counts(geo) {
                if let Some(xrefs) = usize::try_from(material)
                    .ok()
                    .and_then(|m| expected.get_mut(m))
                {
                    xrefs.push(Xref::new(k as i32, count));
                }
            }
        }
        expected
    }

    /// Copy a texture payload from `source` into this model's texture directory.
    ///
    /// Returns the destination slot.
    ///
    /// # Panics
    ///
    /// See [`TextureDirectory::substitute`](crate::views::TextureDirectory::substitute).
    pub fn substitute_texture_buffer(
        &mut self,
        source: &Model,
        src_slot: usize,
        destination: TextureDestination,
    ) -> usize {
        self.ttdm.substitute(&source.ttdm, src_slot, destination)
    }

    /// Point the texture bindings of every draw of matching objects at `buffers`.
    ///
    /// Returns the number of matching objects.
    ///
    /// # Panics
    ///
    /// Panics if a matching draw's texture count differs from `buffers.len()`
    /// or a buffer names a missing texture slot.
    pub fn set_texture_buffers<F: Fn(&[u8]) -> bool>(&mut self, predicate: F, buffers: &[i32]) -> usize {
        self.assert_parallel();
        let targets: Vec<usize> = self
            .nodelay
            .iter()
            .enumerate()
            .filter(|(_, node)| predicate(node.name()))
            .map(|(i, _)| i)
            .collect();

        for &buffer in buffers {
            assert_in_range("texture slot", buffer, self.ttdm.slot_count());
        }
        for &i in &targets {
            for draw in self.mdlgeo[i].draws() {
                assert!(
                    draw.texture_count() == buffers.len(),
                    "invariant violation: object {i} has a draw with {} textures, got {} buffers",
                    draw.texture_count(),
                    buffers.len()
                );
            }
        }
        for &i in &targets {
            for draw in self.mdlgeo[i].draws_mut() {
                for (t, &buffer) in buffers.iter().enumerate() {
                    draw.set_texture_buffer(t, buffer);
                }
            }
        }
        targets.len()
    }
}

fn assert_in_range(what: &str, index: i32, len: usize) {
    assert!(
        usize::try_from(index).is_ok_and(|i| i < len),
        "invariant violation: {what} {index} out of range (len {len})"
    );
}

/// Draw counts per material index, ascending.
fn material_counts(geo: &ObjGeo) -> BTreeMap<i32, i32> {
    let mut counts = BTreeMap::new();
    for draw in geo.draws() {
        *counts.entry(draw.material_index()).or_insert(0) += 1;
    }
    counts
}

fn insert_run<T>(list: &mut Vec<T>, at: usize, items: Vec<T>) {
    let tail = list.split_off(at);
    list.extend(items);
    list.extend(tail);
}

fn retain_kept<T>(list: &mut Vec<T>, removed: &[bool]) {
    let mut i = 0;
    list.retain(|_| {
        let keep = !removed.get(i).copied().unwrap_or(false);
        i += 1;
        keep
    });
}

/// Move item `i` to position `rank[i]`.
fn permute<T>(list: &mut Vec<T>, rank: &[usize]) {
    let mut ranked: Vec<(usize, T)> = std::mem::take(list)
        .into_iter()
        .enumerate()
        .map(|(i, item)| (rank.get(i).copied().unwrap_or(i), item))
        .collect();
    ranked.sort_by_key(|(r, _)| *r);
    list.extend(ranked.into_iter().map(|(_, item)| item));
}
