//! Format-neutral node access
//!
//! Every input format exposes its scene graph through [`NodeGraph`]. The
//! consolidator only ever sees node keys and asks the graph for names,
//! children, transforms and parents.

use glam::DMat4;
use std::fmt::Debug;
use std::hash::Hash;

/// Read-only view over an adapter's native scene graph
pub trait NodeGraph {
    /// Opaque node key, cheap to copy and hash
    type Node: Copy + Eq + Hash + Debug;

    /// Display name, already a valid identifier
    fn name(&self, node: Self::Node) -> String;

    /// Children in authoring order
    fn children(&self, node: Self::Node) -> Vec<Self::Node>;

    /// Transform relative to the parent
    fn local_transform(&self, node: Self::Node) -> DMat4;

    /// Parent node, `None` for scene roots
    fn parent(&self, node: Self::Node) -> Option<Self::Node>;

    /// Transform relative to the scene root
    fn world_transform(&self, node: Self::Node) -> DMat4 {
        let mut world = self.local_transform(node);
        let mut current = self.parent(node);
        while let Some(parent) = current {
            world = self.local_transform(parent) * world;
            current = self.parent(parent);
        }
        world
    }

    /// World transform of the node's parent, identity for roots
    fn parent_world_transform(&self, node: Self::Node) -> DMat4 {
        self.parent(node)
            .map(|parent| self.world_transform(parent))
            .unwrap_or(DMat4::IDENTITY)
    }
}
