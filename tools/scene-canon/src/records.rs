//! Scene records
//!
//! The JSON interchange format read by `scene-canon convert`. Nodes are
//! addressed by their index in `nodes`, matrices are 16 numbers in
//! column-major order.

use glam::DMat4;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::CanonConfig;
use crate::error::{CanonError, Result};
use crate::identifier::name_or_indexed;
use crate::material::Material;
use crate::mesh::MeshRecord;
use crate::node_graph::NodeGraph;
use crate::session::{CanonicalScene, ConversionRun};
use crate::skeleton::Skin;

/// One scene node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub children: Vec<usize>,
    /// Local transform
    #[serde(default = "identity")]
    pub transform: DMat4,
}

impl NodeRecord {
    pub fn new(name: &str, children: Vec<usize>, transform: DMat4) -> Self {
        Self {
            name: name.to_string(),
            children,
            transform,
        }
    }
}

fn identity() -> DMat4 {
    DMat4::IDENTITY
}

/// A skin as it appears in the records
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkinRecord {
    #[serde(default)]
    pub root: Option<usize>,
    pub joints: Vec<usize>,
    /// Joint to world matrices, one per joint. Empty means identity.
    #[serde(default)]
    pub bind_matrices: Vec<DMat4>,
}

/// An animation, reduced to the nodes it drives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationRecord {
    pub name: String,
    #[serde(default)]
    pub targets: Vec<usize>,
}

/// Everything an adapter extracted from one source asset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneRecords {
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub skins: Vec<SkinRecord>,
    #[serde(default)]
    pub materials: Vec<Material>,
    #[serde(default)]
    pub meshes: Vec<MeshRecord>,
    #[serde(default)]
    pub animations: Vec<AnimationRecord>,
}

impl SceneRecords {
    /// Load records from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| CanonError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Node graph over the records
    pub fn graph(&self) -> Result<RecordGraph> {
        RecordGraph::new(self.nodes.clone())
    }

    /// Skins with node references checked against the node list
    pub fn skins(&self) -> Result<Vec<Skin<usize>>> {
        let count = self.nodes.len();
        self.skins
            .iter()
            .enumerate()
            .map(|(index, record)| {
                if !record.bind_matrices.is_empty()
                    && record.bind_matrices.len() != record.joints.len()
                {
                    return Err(CanonError::BindMatrixCount {
                        skin: index,
                        joints: record.joints.len(),
                        matrices: record.bind_matrices.len(),
                    });
                }
                if let Some(root) = record.root {
                    check_node(format!("skin {} root", index), root, count)?;
                }
                let mut skin = Skin::new(record.root);
                for (i, &joint) in record.joints.iter().enumerate() {
                    check_node(format!("skin {} joint {}", index, i), joint, count)?;
                    let bind = record.bind_matrices.get(i).copied().unwrap_or(DMat4::IDENTITY);
                    skin.add_joint(joint, bind);
                }
                Ok(skin)
            })
            .collect()
    }

    /// Run the records through a conversion run
    ///
    /// Fails only on dangling node references or bind-matrix count
    /// mismatches; everything else ends up in the scene's diagnostics.
    pub fn canonicalize(&self, config: CanonConfig) -> Result<CanonicalScene> {
        let graph = self.graph()?;
        let skins = self.skins()?;
        self.check_references()?;

        let mut run = ConversionRun::new(&graph, config);
        for skin in skins {
            run.add_skin(skin);
        }
        for material in &self.materials {
            run.add_material(material.clone());
        }
        for mesh in &self.meshes {
            run.add_mesh(mesh.clone());
        }
        for animation in &self.animations {
            run.add_animation(&animation.name, animation.targets.clone());
        }
        Ok(run.finish())
    }

    /// Check every node reference held by meshes and animations
    pub fn check_references(&self) -> Result<()> {
        let count = self.nodes.len();
        for mesh in &self.meshes {
            for node in mesh.referenced_nodes() {
                check_node(format!("mesh {}", mesh.path), node, count)?;
            }
        }
        for animation in &self.animations {
            for &node in &animation.targets {
                check_node(format!("animation '{}'", animation.name), node, count)?;
            }
        }
        Ok(())
    }
}

fn check_node(what: String, index: usize, count: usize) -> Result<()> {
    if index < count {
        Ok(())
    } else {
        Err(CanonError::DanglingNode { what, index, count })
    }
}

/// [`NodeGraph`] over a flat node list
#[derive(Debug, Clone)]
pub struct RecordGraph {
    nodes: Vec<NodeRecord>,
    parents: HashMap<usize, usize>,
}

impl RecordGraph {
    pub fn new(nodes: Vec<NodeRecord>) -> Result<Self> {
        let count = nodes.len();
        let mut parents = HashMap::new();
        for (index, node) in nodes.iter().enumerate() {
            for &child in &node.children {
                check_node(format!("node {} child", index), child, count)?;
                if parents.insert(child, index).is_some() {
                    return Err(CanonError::Hierarchy {
                        node: child,
                        reason: "has more than one parent",
                    });
                }
            }
        }

        // With single parents, a walk longer than the node count is a cycle
        for start in 0..count {
            let mut current = parents.get(&start).copied();
            let mut steps = 0;
            while let Some(parent) = current {
                steps += 1;
                if steps > count {
                    return Err(CanonError::Hierarchy {
                        node: start,
                        reason: "is part of a parent cycle",
                    });
                }
                current = parents.get(&parent).copied();
            }
        }
        Ok(Self { nodes, parents })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl NodeGraph for RecordGraph {
    type Node = usize;

    fn name(&self, node: usize) -> String {
        name_or_indexed(
            self.nodes.get(node).map(|n| n.name.as_str()),
            "node_",
            node,
        )
    }

    fn children(&self, node: usize) -> Vec<usize> {
        self.nodes
            .get(node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn local_transform(&self, node: usize) -> DMat4 {
        self.nodes
            .get(node)
            .map(|n| n.transform)
            .unwrap_or(DMat4::IDENTITY)
    }

    fn parent(&self, node: usize) -> Option<usize> {
        self.parents.get(&node).copied()
    }
}
