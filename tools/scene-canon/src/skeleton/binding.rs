//! Mesh-to-skeleton binding
//!
//! Per-vertex joint indices are authored against a skin's own joint list.
//! After consolidation they are rewritten to index the owning skeleton.

use glam::DMat4;
use serde::Serialize;
use std::hash::Hash;

use super::consolidate::Skinning;
use super::types::SkeletonId;
use crate::diagnostics::Diagnostics;
use crate::node_graph::NodeGraph;

/// Joint influences rewritten into skeleton space
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JointInfluences {
    pub skeleton: SkeletonId,
    /// Influences per vertex
    pub element_size: usize,
    pub indices: Vec<u32>,
    pub weights: Vec<f32>,
}

/// Mesh that follows a single joint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RigidBinding {
    pub skeleton: SkeletonId,
    pub joint_index: u32,
    pub weight: f32,
    /// Mesh space -> skeleton space
    pub geom_bind_transform: DMat4,
}

/// Why a mesh's joint influences could not be remapped
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InfluenceError {
    #[error("skin {0} does not exist")]
    UnknownSkin(usize),

    #[error("skin {0} is not bound to a skeleton")]
    Unbound(usize),

    #[error("element size must be at least 1")]
    ZeroElementSize,

    #[error("{indices} joint indices but {weights} joint weights")]
    LengthMismatch { indices: usize, weights: usize },

    #[error("{count} influences is not a multiple of element size {element_size}")]
    Ragged { count: usize, element_size: usize },

    #[error("joint index {index} at influence {position} exceeds skin joint count {joints}")]
    IndexOutOfRange {
        index: u32,
        position: usize,
        joints: usize,
    },
}

impl<N: Copy + Eq + Hash + std::fmt::Debug> Skinning<N> {
    /// Rewrite a skinned mesh's joint indices into skeleton space
    ///
    /// Influences on joints outside the skeleton lose their weight. With
    /// `normalize` set each vertex's weights are scaled to sum to 1; vertices
    /// whose weights sum to zero are left as they are.
    pub fn remap_influences(
        &self,
        skin_index: usize,
        indices: &[u32],
        weights: &[f32],
        element_size: usize,
        normalize: bool,
    ) -> Result<JointInfluences, InfluenceError> {
        let skin = self
            .skins
            .get(skin_index)
            .ok_or(InfluenceError::UnknownSkin(skin_index))?;
        let skeleton = skin
            .skeleton()
            .and_then(|id| self.resolve(id))
            .ok_or(InfluenceError::Unbound(skin_index))?;

        if element_size == 0 {
            return Err(InfluenceError::ZeroElementSize);
        }
        if indices.len() != weights.len() {
            return Err(InfluenceError::LengthMismatch {
                indices: indices.len(),
                weights: weights.len(),
            });
        }
        if indices.len() % element_size != 0 {
            return Err(InfluenceError::Ragged {
                count: indices.len(),
                element_size,
            });
        }

        let mut remapped = Vec::with_capacity(indices.len());
        let mut kept = Vec::with_capacity(weights.len());
        for (position, (&local, &weight)) in indices.iter().zip(weights).enumerate() {
            if local as usize >= skin.joints.len() {
                return Err(InfluenceError::IndexOutOfRange {
                    index: local,
                    position,
                    joints: skin.joints.len(),
                });
            }
            match skin.remap_index(local as usize) {
                Some(mapped) => {
                    remapped.push(mapped as u32);
                    kept.push(weight);
                }
                None => {
                    remapped.push(0);
                    kept.push(0.0);
                }
            }
        }

        if normalize {
            normalize_weights(&mut kept, element_size);
        }

        Ok(JointInfluences {
            skeleton,
            element_size,
            indices: remapped,
            weights: kept,
        })
    }

    /// Bind a mesh rigidly to one joint
    ///
    /// Returns `None` when no skeleton owns the joint. The geom bind transform
    /// is identity unless the mesh node itself was bound by a skin, in which
    /// case it moves the mesh into the space of the skeleton root's parent.
    pub fn bind_rigid<G>(&self, graph: &G, mesh_node: N, joint: N) -> Option<RigidBinding>
    where
        G: NodeGraph<Node = N>,
    {
        let id = self.find_skeleton_by_joint(joint)?;
        let skeleton = self.skeleton(id)?;
        let joint_index = skeleton.joint_index(joint)?;

        let geom_bind_transform = match skeleton.root() {
            Some(root) if skeleton.has_bind_matrix(mesh_node) => {
                graph.parent_world_transform(root).inverse() * graph.world_transform(mesh_node)
            }
            _ => DMat4::IDENTITY,
        };

        Some(RigidBinding {
            skeleton: id,
            joint_index: joint_index as u32,
            weight: 1.0,
            geom_bind_transform,
        })
    }

    /// Skeleton driven by an animation, judged by its first animated node
    pub fn find_skeleton_for_animation(&self, targets: &[N]) -> Option<SkeletonId> {
        targets
            .first()
            .and_then(|&node| self.find_skeleton_by_joint(node))
    }

    /// Attach an animation to a skeleton; the first one assigned is kept
    ///
    /// Returns true if the animation became the skeleton's animation.
    pub fn assign_animation(
        &mut self,
        id: SkeletonId,
        name: &str,
        diagnostics: &mut Diagnostics,
    ) -> bool {
        let Some(skeleton) = self.skeleton_mut(id) else {
            diagnostics.warn(
                format!("animation '{}'", name),
                format!(
                    "skeleton {} has not been created, animation not assigned",
                    id.index()
                ),
            );
            return false;
        };
        if let Some(existing) = skeleton.animation() {
            tracing::debug!(
                "Skeleton {} already animated by '{}', ignoring '{}'",
                id.index(),
                existing,
                name
            );
            return false;
        }
        skeleton.set_animation(name.to_string());
        true
    }

    /// Assign an animation to whichever skeleton its targets belong to
    pub fn assign_animation_to_targets(
        &mut self,
        targets: &[N],
        name: &str,
        diagnostics: &mut Diagnostics,
    ) -> Option<SkeletonId> {
        match self.find_skeleton_for_animation(targets) {
            Some(id) => self.assign_animation(id, name, diagnostics).then_some(id),
            None => {
                diagnostics.warn(
                    format!("animation '{}'", name),
                    "no skeleton has been created for the animated joints",
                );
                None
            }
        }
    }
}

/// Scale each run of `element_size` weights to sum to 1
pub fn normalize_weights(weights: &mut [f32], element_size: usize) {
    if element_size == 0 {
        return;
    }
    for vertex in weights.chunks_mut(element_size) {
        let sum: f32 = vertex.iter().sum();
        if sum > f32::EPSILON {
            for weight in vertex.iter_mut() {
                *weight /= sum;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{NodeRecord, RecordGraph};
    use crate::skeleton::Skin;
    use glam::DVec3;

    /// Root(0) -> Upper(1) -> Lower(2)
    /// Mesh(3) under Lower
    fn arm() -> RecordGraph {
        RecordGraph::new(vec![
            NodeRecord::new("Root", vec![1], DMat4::from_translation(DVec3::X)),
            NodeRecord::new("Upper", vec![2], DMat4::from_translation(DVec3::Y)),
            NodeRecord::new("Lower", vec![3], DMat4::from_translation(DVec3::Y)),
            NodeRecord::new("Mesh", vec![], DMat4::from_translation(DVec3::Z)),
        ])
        .unwrap()
    }

    fn consolidated(skins: Vec<Skin<usize>>) -> (RecordGraph, Skinning<usize>) {
        let graph = arm();
        let mut skinning = Skinning::new();
        for skin in skins {
            skinning.add_skin(skin);
        }
        skinning.consolidate(&graph, &mut Diagnostics::new());
        (graph, skinning)
    }

    fn skin(root: Option<usize>, joints: &[usize]) -> Skin<usize> {
        let mut skin = Skin::new(root);
        for &joint in joints {
            skin.add_joint(joint, DMat4::IDENTITY);
        }
        skin
    }

    #[test]
    fn test_remap_influences_into_skeleton_space() {
        // Skin lists joints in reverse of the skeleton order
        let (_, skinning) = consolidated(vec![skin(Some(0), &[2, 1, 0])]);

        let influences = skinning
            .remap_influences(0, &[0, 1, 2, 0], &[0.5, 0.5, 1.0, 0.0], 2, true)
            .unwrap();

        assert_eq!(influences.indices, vec![2, 1, 0, 2]);
        assert_eq!(influences.weights, vec![0.5, 0.5, 1.0, 0.0]);
        assert_eq!(influences.element_size, 2);
    }

    #[test]
    fn test_remap_normalizes_weights() {
        let (_, skinning) = consolidated(vec![skin(Some(0), &[0, 1])]);

        let influences = skinning
            .remap_influences(0, &[0, 1, 0, 1], &[2.0, 2.0, 0.0, 0.0], 2, true)
            .unwrap();
        assert_eq!(influences.weights, vec![0.5, 0.5, 0.0, 0.0]);

        let raw = skinning
            .remap_influences(0, &[0, 1], &[2.0, 2.0], 2, false)
            .unwrap();
        assert_eq!(raw.weights, vec![2.0, 2.0]);
    }

    #[test]
    fn test_remap_rejects_bad_input() {
        let (_, skinning) = consolidated(vec![skin(Some(0), &[0, 1])]);

        assert_eq!(
            skinning.remap_influences(0, &[0], &[1.0, 0.0], 1, true),
            Err(InfluenceError::LengthMismatch {
                indices: 1,
                weights: 2
            })
        );
        assert_eq!(
            skinning.remap_influences(0, &[0, 1, 0], &[1.0; 3], 2, true),
            Err(InfluenceError::Ragged {
                count: 3,
                element_size: 2
            })
        );
        assert!(matches!(
            skinning.remap_influences(0, &[5], &[1.0], 1, true),
            Err(InfluenceError::IndexOutOfRange { index: 5, .. })
        ));
        assert_eq!(
            skinning.remap_influences(3, &[], &[], 1, true),
            Err(InfluenceError::UnknownSkin(3))
        );
    }

    #[test]
    fn test_unbound_skin_cannot_remap() {
        let (_, skinning) = consolidated(vec![Skin::new(None)]);
        assert_eq!(
            skinning.remap_influences(0, &[], &[], 1, true),
            Err(InfluenceError::Unbound(0))
        );
    }

    #[test]
    fn test_rigid_binding_single_joint() {
        let (graph, skinning) = consolidated(vec![skin(Some(0), &[0, 1, 2])]);

        let binding = skinning.bind_rigid(&graph, 3, 2).unwrap();
        assert_eq!(binding.joint_index, 2);
        assert_eq!(binding.weight, 1.0);
        assert_eq!(binding.geom_bind_transform, DMat4::IDENTITY);

        // Prop node that is not a joint of any skeleton
        assert!(skinning.bind_rigid(&graph, 3, 42).is_none());
    }

    #[test]
    fn test_rigid_binding_of_bound_mesh_node() {
        // The mesh node itself is a skin joint, so its world placement
        // relative to the skeleton root's parent becomes the bind transform
        let (graph, skinning) = consolidated(vec![skin(Some(0), &[0, 1, 2, 3])]);

        let binding = skinning.bind_rigid(&graph, 3, 3).unwrap();
        assert_eq!(binding.joint_index, 3);
        assert_eq!(
            binding.geom_bind_transform.transform_point3(DVec3::ZERO),
            DVec3::new(1.0, 2.0, 1.0)
        );
    }

    #[test]
    fn test_first_animation_wins() {
        let (_, mut skinning) = consolidated(vec![skin(Some(0), &[0, 1])]);
        let mut diagnostics = Diagnostics::new();

        let id = skinning.assign_animation_to_targets(&[1], "walk", &mut diagnostics);
        assert!(id.is_some());
        assert!(skinning
            .assign_animation_to_targets(&[0], "run", &mut diagnostics)
            .is_none());

        let records = skinning.skeleton_records();
        assert_eq!(records[0].animation.as_deref(), Some("walk"));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_animation_before_skeleton_warns() {
        let (_, mut skinning) = consolidated(vec![]);
        let mut diagnostics = Diagnostics::new();

        assert!(!skinning.assign_animation(SkeletonId(0), "idle", &mut diagnostics));
        assert!(skinning
            .assign_animation_to_targets(&[1], "idle", &mut diagnostics)
            .is_none());
        assert_eq!(diagnostics.len(), 2);
        assert!(!diagnostics.has_errors());
    }

    #[test]
    fn test_normalize_weights_chunks() {
        let mut weights = [1.0, 3.0, 0.0, 0.0, 5.0, 5.0];
        normalize_weights(&mut weights, 2);
        assert_eq!(weights, [0.25, 0.75, 0.0, 0.0, 0.5, 0.5]);
    }
}
