//! Skin consolidation
//!
//! Skins that share joints end up on one skeleton. Skeletons live in an
//! arena; a joint -> owner table answers "which skeleton has this joint"
//! without scanning, and merging only reassigns owners.

use glam::DMat4;
use hashbrown::{HashMap, HashSet};
use std::hash::Hash;

use super::types::{Skeleton, SkeletonId, SkeletonRecord, Skin};
use crate::diagnostics::Diagnostics;
use crate::node_graph::NodeGraph;

#[derive(Debug, Clone)]
enum Slot<N> {
    Live(Skeleton<N>),
    /// Absorbed into another skeleton
    Merged(SkeletonId),
}

/// Skins and the skeletons consolidated from them, for one conversion run
#[derive(Debug, Clone)]
pub struct Skinning<N> {
    pub(crate) skins: Vec<Skin<N>>,
    slots: Vec<Slot<N>>,
    owners: HashMap<N, SkeletonId>,
    joints: HashSet<N>,
}

impl<N: Copy + Eq + Hash + std::fmt::Debug> Default for Skinning<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: Copy + Eq + Hash + std::fmt::Debug> Skinning<N> {
    pub fn new() -> Self {
        Self {
            skins: Vec::new(),
            slots: Vec::new(),
            owners: HashMap::new(),
            joints: HashSet::new(),
        }
    }

    /// Register a skin, returns its index
    pub fn add_skin(&mut self, skin: Skin<N>) -> usize {
        self.skins.push(skin);
        self.skins.len() - 1
    }

    pub fn skins(&self) -> &[Skin<N>] {
        &self.skins
    }

    pub fn skin(&self, index: usize) -> Option<&Skin<N>> {
        self.skins.get(index)
    }

    /// Build a skeleton from `root` by depth-first traversal
    ///
    /// Joints already owned by another live skeleton keep their owner until
    /// a merge moves them.
    pub fn create_skeleton<G>(&mut self, graph: &G, root: N) -> SkeletonId
    where
        G: NodeGraph<Node = N>,
    {
        let id = SkeletonId(self.slots.len());
        let mut skeleton = Skeleton::new();

        let mut stack: Vec<(N, Option<String>)> = vec![(root, None)];
        while let Some((node, parent_path)) = stack.pop() {
            let name = graph.name(node);
            let path = match parent_path {
                Some(parent) => format!("{}/{}", parent, name),
                None => name,
            };
            if !skeleton.push_joint(node, path.clone(), graph.local_transform(node)) {
                tracing::warn!("Node {:?} reached twice while collecting joints", node);
                continue;
            }
            for child in graph.children(node).into_iter().rev() {
                stack.push((child, Some(path.clone())));
            }
        }

        for &joint in skeleton.joints() {
            self.owners.entry(joint).or_insert(id);
        }

        tracing::debug!(
            "Created skeleton {} rooted at {:?} with {} joints",
            id.index(),
            root,
            skeleton.len()
        );
        self.slots.push(Slot::Live(skeleton));
        id
    }

    /// Merge all skins onto the smallest set of disjoint skeletons
    ///
    /// Skins are processed in registration order. Afterwards every skin with
    /// joints has a skeleton and a remap table.
    pub fn consolidate<G>(&mut self, graph: &G, diagnostics: &mut Diagnostics)
    where
        G: NodeGraph<Node = N>,
    {
        for skin_index in 0..self.skins.len() {
            let skin = &self.skins[skin_index];
            let Some(&first) = skin.joints.first() else {
                tracing::debug!("Skin {} has no joints, skipping", skin_index);
                continue;
            };
            let root = skin.root.unwrap_or(first);

            let id = match self.find_skeleton_by_joint(first) {
                Some(id) => id,
                None => self.create_skeleton(graph, root),
            };

            self.joints.extend(self.skins[skin_index].joints.iter().copied());
            self.bind_skin(skin_index, id);
            self.absorb_subskeletons();
        }

        self.prepare_remapping(diagnostics);
    }

    /// Attach a skin to a skeleton and write its bind matrices
    fn bind_skin(&mut self, skin_index: usize, id: SkeletonId) {
        let skin = &mut self.skins[skin_index];
        skin.skeleton = Some(id);
        let Some(Slot::Live(skeleton)) = self.slots.get_mut(id.0) else {
            return;
        };
        for joint in &skin.joints {
            if let Some(&matrix) = skin.bind_matrices.get(joint) {
                skeleton.write_bind(*joint, matrix, skin_index);
            }
        }
    }

    /// Merge every live skeleton whose root is a joint of another
    fn absorb_subskeletons(&mut self) {
        while let Some((keep, absorb)) = self.find_subsumption() {
            self.merge(keep, absorb);
        }
    }

    fn find_subsumption(&self) -> Option<(SkeletonId, SkeletonId)> {
        for (outer_id, outer) in self.live() {
            for (inner_id, inner) in self.live() {
                if outer_id == inner_id {
                    continue;
                }
                if inner.root().is_some_and(|root| outer.contains(root)) {
                    return Some((outer_id, inner_id));
                }
            }
        }
        None
    }

    fn merge(&mut self, keep: SkeletonId, absorb: SkeletonId) {
        let Slot::Live(mut absorbed) =
            std::mem::replace(&mut self.slots[absorb.0], Slot::Merged(keep))
        else {
            return;
        };
        let Slot::Live(survivor) = &mut self.slots[keep.0] else {
            return;
        };

        survivor.absorb_binds(absorbed.binds());
        if survivor.animation().is_none() {
            if let Some(animation) = absorbed.take_animation() {
                survivor.set_animation(animation);
            }
        }

        for &joint in absorbed.joints() {
            if survivor.contains(joint) {
                self.owners.insert(joint, keep);
            } else if self.owners.get(&joint) == Some(&absorb) {
                self.owners.remove(&joint);
            }
        }

        for skin in &mut self.skins {
            if skin.skeleton == Some(absorb) {
                skin.skeleton = Some(keep);
            }
        }

        tracing::debug!(
            "Skeleton {} absorbed into skeleton {}",
            absorb.index(),
            keep.index()
        );
    }

    fn prepare_remapping(&mut self, diagnostics: &mut Diagnostics) {
        for (skin_index, skin) in self.skins.iter_mut().enumerate() {
            let Some(id) = skin.skeleton else {
                skin.remap.clear();
                continue;
            };
            let Some(skeleton) = resolve_live(&self.slots, id) else {
                continue;
            };
            skin.skeleton = Some(resolve_id(&self.slots, id));
            skin.remap = skin
                .joints
                .iter()
                .map(|&joint| skeleton.joint_index(joint))
                .collect();

            for (local, mapped) in skin.remap.iter().enumerate() {
                if mapped.is_none() {
                    diagnostics.warn(
                        format!("skin[{}]", skin_index),
                        format!(
                            "joint {:?} (local index {}) is not under skeleton root {:?}",
                            skin.joints[local],
                            local,
                            skeleton.root()
                        ),
                    );
                }
            }
        }
    }

    /// Follow merge redirects to the live skeleton an id refers to
    pub fn resolve(&self, id: SkeletonId) -> Option<SkeletonId> {
        if id.0 >= self.slots.len() {
            return None;
        }
        Some(resolve_id(&self.slots, id))
    }

    pub fn skeleton(&self, id: SkeletonId) -> Option<&Skeleton<N>> {
        resolve_live(&self.slots, id)
    }

    pub(crate) fn skeleton_mut(&mut self, id: SkeletonId) -> Option<&mut Skeleton<N>> {
        let id = self.resolve(id)?;
        match &mut self.slots[id.0] {
            Slot::Live(skeleton) => Some(skeleton),
            Slot::Merged(_) => None,
        }
    }

    /// Live skeletons in creation order
    pub fn live(&self) -> impl Iterator<Item = (SkeletonId, &Skeleton<N>)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| match slot {
                Slot::Live(skeleton) => Some((SkeletonId(i), skeleton)),
                Slot::Merged(_) => None,
            })
    }

    pub fn skeleton_count(&self) -> usize {
        self.live().count()
    }

    /// Whether any skin uses this node as a joint
    pub fn is_joint(&self, node: N) -> bool {
        self.joints.contains(&node)
    }

    pub fn find_skeleton_by_joint(&self, node: N) -> Option<SkeletonId> {
        let id = *self.owners.get(&node)?;
        self.resolve(id)
    }

    pub fn find_skeleton_by_root(&self, node: N) -> Option<SkeletonId> {
        self.live()
            .find(|(_, skeleton)| skeleton.root() == Some(node))
            .map(|(id, _)| id)
    }

    /// Canonical records for every live skeleton
    pub fn skeleton_records(&self) -> Vec<SkeletonRecord> {
        self.live()
            .map(|(id, skeleton)| skeleton.to_record(id))
            .collect()
    }

    /// Bind matrix the skeleton ended up with for a joint
    pub fn bind_matrix(&self, id: SkeletonId, joint: N) -> Option<DMat4> {
        self.skeleton(id).map(|skeleton| skeleton.bind_matrix(joint))
    }
}

fn resolve_id<N>(slots: &[Slot<N>], mut id: SkeletonId) -> SkeletonId {
    // Merge chains are acyclic: a slot only redirects to an older live one
    while let Some(Slot::Merged(next)) = slots.get(id.0) {
        id = *next;
    }
    id
}

fn resolve_live<N>(slots: &[Slot<N>], id: SkeletonId) -> Option<&Skeleton<N>> {
    if id.0 >= slots.len() {
        return None;
    }
    match &slots[resolve_id(slots, id).0] {
        Slot::Live(skeleton) => Some(skeleton),
        Slot::Merged(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Category;
    use crate::records::{NodeRecord, RecordGraph};
    use glam::DVec3;

    /// Hips(0) -> Spine(1) -> Head(2)
    ///         -> LegL(3)
    ///         -> LegR(4)
    /// Prop(5)
    fn rig() -> RecordGraph {
        RecordGraph::new(vec![
            NodeRecord::new("Hips", vec![1, 3, 4], DMat4::IDENTITY),
            NodeRecord::new("Spine", vec![2], DMat4::from_translation(DVec3::Y)),
            NodeRecord::new("Head", vec![], DMat4::from_translation(DVec3::Y)),
            NodeRecord::new("LegL", vec![], DMat4::from_translation(-DVec3::X)),
            NodeRecord::new("LegR", vec![], DMat4::from_translation(DVec3::X)),
            NodeRecord::new("Prop", vec![], DMat4::IDENTITY),
        ])
        .unwrap()
    }

    fn skin(root: Option<usize>, joints: &[usize]) -> Skin<usize> {
        let mut skin = Skin::new(root);
        for &joint in joints {
            skin.add_joint(joint, DMat4::from_translation(DVec3::splat(joint as f64)));
        }
        skin
    }

    #[test]
    fn test_create_skeleton_depth_first_paths() {
        let graph = rig();
        let mut skinning = Skinning::new();
        let id = skinning.create_skeleton(&graph, 0);

        let skeleton = skinning.skeleton(id).unwrap();
        assert_eq!(skeleton.joints(), &[0, 1, 2, 3, 4]);
        assert_eq!(skeleton.joint_path(0), Some("Hips"));
        assert_eq!(skeleton.joint_path(2), Some("Hips/Spine/Head"));
        assert_eq!(skeleton.joint_path(4), Some("Hips/LegR"));
        assert_eq!(
            skeleton.rest_matrix(1),
            Some(DMat4::from_translation(DVec3::Y))
        );
        assert_eq!(skeleton.bind_matrix(3), DMat4::IDENTITY);
    }

    #[test]
    fn test_shared_joints_share_skeleton() {
        let graph = rig();
        let mut skinning = Skinning::new();
        skinning.add_skin(skin(Some(0), &[0, 1, 2]));
        skinning.add_skin(skin(Some(0), &[0, 3, 4]));

        let mut diagnostics = Diagnostics::new();
        skinning.consolidate(&graph, &mut diagnostics);

        assert_eq!(skinning.skeleton_count(), 1);
        assert_eq!(skinning.skins()[0].skeleton(), skinning.skins()[1].skeleton());
        assert_eq!(skinning.skins()[1].remap_table(), &[Some(0), Some(3), Some(4)]);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_subsumption_rebinds_earlier_skin() {
        let graph = rig();
        let mut skinning = Skinning::new();
        // First skin only knows the spine chain
        skinning.add_skin(skin(Some(1), &[1, 2]));
        // Second skin is rooted higher up and contains the spine
        skinning.add_skin(skin(Some(0), &[0, 3, 1]));

        let mut diagnostics = Diagnostics::new();
        skinning.consolidate(&graph, &mut diagnostics);

        // The second skin's first joint (Hips) was not owned yet, so a new
        // skeleton was created and then absorbed the spine skeleton
        assert_eq!(skinning.skeleton_count(), 1);
        let (id, skeleton) = skinning.live().next().unwrap();
        assert_eq!(skeleton.root(), Some(0));
        assert_eq!(skinning.skins()[0].skeleton(), Some(id));
        assert_eq!(skinning.skins()[0].remap_table(), &[Some(1), Some(2)]);
        assert_eq!(skinning.skins()[1].remap_table(), &[Some(0), Some(3), Some(1)]);

        // The discarded id still resolves
        assert_eq!(skinning.resolve(SkeletonId(0)), Some(id));
        assert_eq!(skinning.find_skeleton_by_joint(2), Some(id));
        assert_eq!(skinning.find_skeleton_by_root(1), None);
    }

    #[test]
    fn test_bind_matrix_last_skin_wins() {
        // Deliberate tie-break: when two skins bind the same joint the later
        // skin's matrix is kept, even across a merge.
        let graph = rig();
        let mut skinning = Skinning::new();

        let mut early = Skin::new(Some(1));
        early.add_joint(1, DMat4::from_translation(DVec3::X));
        skinning.add_skin(early);

        let mut late = Skin::new(Some(0));
        late.add_joint(0, DMat4::IDENTITY);
        late.add_joint(1, DMat4::from_translation(DVec3::Z));
        skinning.add_skin(late);

        skinning.consolidate(&graph, &mut Diagnostics::new());

        let (id, _) = skinning.live().next().unwrap();
        assert_eq!(
            skinning.bind_matrix(id, 1),
            Some(DMat4::from_translation(DVec3::Z))
        );
    }

    #[test]
    fn test_empty_skin_ignored() {
        let graph = rig();
        let mut skinning = Skinning::new();
        skinning.add_skin(Skin::new(Some(0)));

        skinning.consolidate(&graph, &mut Diagnostics::new());

        assert_eq!(skinning.skeleton_count(), 0);
        assert_eq!(skinning.skins()[0].skeleton(), None);
        assert!(skinning.skins()[0].remap_table().is_empty());
    }

    #[test]
    fn test_joint_outside_root_reported() {
        let graph = rig();
        let mut skinning = Skinning::new();
        skinning.add_skin(skin(Some(0), &[0, 5]));

        let mut diagnostics = Diagnostics::new();
        skinning.consolidate(&graph, &mut diagnostics);

        assert_eq!(skinning.skins()[0].remap_table(), &[Some(0), None]);
        assert_eq!(diagnostics.len(), 1);
        let finding = diagnostics.iter().next().unwrap();
        assert_eq!(finding.category, Category::GraphConsistency);
        assert_eq!(finding.subject, "skin[0]");
    }

    #[test]
    fn test_disjoint_skins_keep_separate_skeletons() {
        let graph = rig();
        let mut skinning = Skinning::new();
        skinning.add_skin(skin(None, &[3]));
        skinning.add_skin(skin(None, &[4]));

        skinning.consolidate(&graph, &mut Diagnostics::new());

        assert_eq!(skinning.skeleton_count(), 2);
        assert!(skinning.is_joint(3));
        assert!(!skinning.is_joint(0));
        let records = skinning.skeleton_records();
        assert_eq!(records[0].joints, vec!["LegL"]);
        assert_eq!(records[1].joints, vec!["LegR"]);
    }

    #[test]
    fn test_consolidate_is_idempotent() {
        let graph = rig();
        let mut skinning = Skinning::new();
        skinning.add_skin(skin(Some(1), &[1, 2]));
        skinning.add_skin(skin(Some(0), &[0, 1, 3]));

        skinning.consolidate(&graph, &mut Diagnostics::new());
        let first = skinning.skeleton_records();
        let remap: Vec<_> = skinning.skins().iter().map(|s| s.remap.clone()).collect();

        skinning.consolidate(&graph, &mut Diagnostics::new());
        assert_eq!(skinning.skeleton_records(), first);
        let again: Vec<_> = skinning.skins().iter().map(|s| s.remap.clone()).collect();
        assert_eq!(again, remap);
    }
}
