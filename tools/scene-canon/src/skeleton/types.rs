//! Skin and skeleton records

use glam::DMat4;
use hashbrown::HashMap;
use serde::Serialize;
use std::hash::Hash;

/// Handle into the skeleton arena
///
/// Ids stay valid after a merge: a discarded skeleton's id resolves to the
/// skeleton that absorbed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SkeletonId(pub(crate) usize);

impl SkeletonId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Binding of a mesh to a set of joints, as authored
#[derive(Debug, Clone)]
pub struct Skin<N> {
    /// Declared skeleton root, the first joint is used when absent
    pub root: Option<N>,
    /// Joints in authoring order. Per-vertex joint indices refer to this list.
    pub joints: Vec<N>,
    /// Bind-pose (joint to world) matrix per joint
    pub bind_matrices: HashMap<N, DMat4>,
    pub(crate) skeleton: Option<SkeletonId>,
    pub(crate) remap: Vec<Option<usize>>,
}

impl<N: Copy + Eq + Hash> Skin<N> {
    pub fn new(root: Option<N>) -> Self {
        Self {
            root,
            joints: Vec::new(),
            bind_matrices: HashMap::new(),
            skeleton: None,
            remap: Vec::new(),
        }
    }

    /// Append a joint with its bind-pose matrix
    pub fn add_joint(&mut self, joint: N, bind_matrix: DMat4) {
        self.joints.push(joint);
        self.bind_matrices.insert(joint, bind_matrix);
    }

    /// Skeleton this skin was bound to during consolidation
    ///
    /// May name a skeleton that was later absorbed, resolve it through
    /// [`Skinning::resolve`](super::Skinning::resolve).
    pub fn skeleton(&self) -> Option<SkeletonId> {
        self.skeleton
    }

    /// Local joint index -> skeleton joint index, one entry per joint
    pub fn remap_table(&self) -> &[Option<usize>] {
        &self.remap
    }

    pub fn remap_index(&self, local: usize) -> Option<usize> {
        self.remap.get(local).copied().flatten()
    }
}

/// Bind matrix plus the order of the skin that wrote it
#[derive(Debug, Clone, Copy)]
pub(crate) struct BindEntry {
    pub matrix: DMat4,
    pub order: usize,
}

/// Consolidated joint hierarchy shared by one or more skins
#[derive(Debug, Clone)]
pub struct Skeleton<N> {
    joints: Vec<N>,
    index: HashMap<N, usize>,
    paths: Vec<String>,
    rest: Vec<DMat4>,
    binds: HashMap<N, BindEntry>,
    animation: Option<String>,
}

impl<N: Copy + Eq + Hash> Skeleton<N> {
    pub(crate) fn new() -> Self {
        Self {
            joints: Vec::new(),
            index: HashMap::new(),
            paths: Vec::new(),
            rest: Vec::new(),
            binds: HashMap::new(),
            animation: None,
        }
    }

    /// Append a joint; returns false if it is already part of the skeleton
    pub(crate) fn push_joint(&mut self, joint: N, path: String, rest: DMat4) -> bool {
        if self.index.contains_key(&joint) {
            return false;
        }
        self.index.insert(joint, self.joints.len());
        self.joints.push(joint);
        self.paths.push(path);
        self.rest.push(rest);
        true
    }

    /// First joint of the depth-first traversal
    pub fn root(&self) -> Option<N> {
        self.joints.first().copied()
    }

    pub fn joints(&self) -> &[N] {
        &self.joints
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    pub fn joint_index(&self, joint: N) -> Option<usize> {
        self.index.get(&joint).copied()
    }

    pub fn contains(&self, joint: N) -> bool {
        self.index.contains_key(&joint)
    }

    pub fn joint_path(&self, index: usize) -> Option<&str> {
        self.paths.get(index).map(String::as_str)
    }

    pub fn rest_matrix(&self, index: usize) -> Option<DMat4> {
        self.rest.get(index).copied()
    }

    /// Bind matrix of a joint, identity when no skin ever bound it
    pub fn bind_matrix(&self, joint: N) -> DMat4 {
        self.binds
            .get(&joint)
            .map(|entry| entry.matrix)
            .unwrap_or(DMat4::IDENTITY)
    }

    pub fn has_bind_matrix(&self, node: N) -> bool {
        self.binds.contains_key(&node)
    }

    pub fn animation(&self) -> Option<&str> {
        self.animation.as_deref()
    }

    /// Record a bind matrix; a write from a later skin replaces an earlier one
    pub(crate) fn write_bind(&mut self, joint: N, matrix: DMat4, order: usize) {
        match self.binds.get(&joint) {
            Some(existing) if existing.order > order => {}
            _ => {
                self.binds.insert(joint, BindEntry { matrix, order });
            }
        }
    }

    /// Fold another skeleton's bind matrices in, keeping the latest writer
    pub(crate) fn absorb_binds(&mut self, other: &HashMap<N, BindEntry>) {
        for (&joint, entry) in other {
            self.write_bind(joint, entry.matrix, entry.order);
        }
    }

    pub(crate) fn binds(&self) -> &HashMap<N, BindEntry> {
        &self.binds
    }

    pub(crate) fn set_animation(&mut self, name: String) {
        self.animation = Some(name);
    }

    pub(crate) fn take_animation(&mut self) -> Option<String> {
        self.animation.take()
    }

    /// Canonical output record
    pub fn to_record(&self, id: SkeletonId) -> SkeletonRecord {
        SkeletonRecord {
            id,
            joints: self.paths.clone(),
            rest_transforms: self.rest.clone(),
            bind_transforms: self.joints.iter().map(|&j| self.bind_matrix(j)).collect(),
            animation: self.animation.clone(),
        }
    }
}

/// Skeleton as handed to the emitter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkeletonRecord {
    pub id: SkeletonId,
    /// Hierarchical joint paths in canonical order
    pub joints: Vec<String>,
    pub rest_transforms: Vec<DMat4>,
    pub bind_transforms: Vec<DMat4>,
    pub animation: Option<String>,
}
