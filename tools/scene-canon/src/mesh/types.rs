//! Mesh records and attribute layout

use serde::{Deserialize, Serialize};
use std::fmt;

/// How attribute values map onto mesh elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Interpolation {
    /// One value for the whole mesh
    Constant,
    /// One value per face
    Uniform,
    /// One value per point, linearly interpolated
    Varying,
    /// One value per point
    Vertex,
    /// One value per face corner
    FaceVarying,
}

impl Interpolation {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "constant" => Some(Interpolation::Constant),
            "uniform" => Some(Interpolation::Uniform),
            "varying" => Some(Interpolation::Varying),
            "vertex" => Some(Interpolation::Vertex),
            "faceVarying" => Some(Interpolation::FaceVarying),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Interpolation::Constant => "constant",
            Interpolation::Uniform => "uniform",
            Interpolation::Varying => "varying",
            Interpolation::Vertex => "vertex",
            Interpolation::FaceVarying => "faceVarying",
        }
    }
}

impl fmt::Display for Interpolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attribute values, only their count matters for validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValues {
    Single(f64),
    Flat(Vec<f64>),
    Tuples(Vec<Vec<f64>>),
}

impl AttributeValues {
    pub fn len(&self) -> usize {
        match self {
            AttributeValues::Single(_) => 1,
            AttributeValues::Flat(values) => values.len(),
            AttributeValues::Tuples(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AttributeValues {
    fn default() -> Self {
        AttributeValues::Flat(Vec::new())
    }
}

/// A named per-element attribute (normals, texcoords, colors, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshAttribute {
    pub name: String,
    #[serde(default)]
    pub values: AttributeValues,
    #[serde(default)]
    pub indices: Vec<u32>,
    /// Interpolation token, checked during validation
    pub interpolation: String,
    #[serde(default = "default_element_size")]
    pub element_size: usize,
}

fn default_element_size() -> usize {
    1
}

impl MeshAttribute {
    pub fn new(name: &str, interpolation: Interpolation, values: AttributeValues) -> Self {
        Self {
            name: name.to_string(),
            values,
            indices: Vec::new(),
            interpolation: interpolation.as_str().to_string(),
            element_size: 1,
        }
    }

    pub fn with_indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = indices;
        self
    }

    pub fn with_element_size(mut self, element_size: usize) -> Self {
        self.element_size = element_size;
        self
    }

    pub fn is_indexed(&self) -> bool {
        !self.indices.is_empty()
    }
}

/// Named subset of faces, usually carrying its own material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeomSubset {
    pub name: String,
    pub face_indices: Vec<u32>,
    #[serde(default)]
    pub material: Option<String>,
}

/// How a mesh follows a skeleton
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MeshBinding<N = usize> {
    /// Per-vertex influences indexing into a skin's joint list
    Skinned {
        skin: usize,
        joint_indices: Vec<u32>,
        joint_weights: Vec<f32>,
        element_size: usize,
    },
    /// Whole mesh follows one joint
    Rigid { node: N, joint: N },
}

/// One mesh as an adapter hands it over
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshRecord<N = usize> {
    pub path: String,
    /// Scene node holding the mesh; bound rigidly to itself when a
    /// skeleton owns it and no other binding is given
    #[serde(default)]
    pub node: Option<N>,
    #[serde(default)]
    pub points: Vec<[f32; 3]>,
    #[serde(default)]
    pub face_vertex_counts: Vec<u32>,
    #[serde(default)]
    pub face_vertex_indices: Vec<u32>,
    #[serde(default)]
    pub normals: Option<MeshAttribute>,
    #[serde(default)]
    pub primvars: Vec<MeshAttribute>,
    #[serde(default)]
    pub subsets: Vec<GeomSubset>,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub binding: Option<MeshBinding<N>>,
}

impl<N: Copy> MeshRecord<N> {
    pub fn face_count(&self) -> usize {
        self.face_vertex_counts.len()
    }

    /// Nodes the binding refers to
    pub fn referenced_nodes(&self) -> Vec<N> {
        let mut nodes: Vec<N> = self.node.into_iter().collect();
        if let Some(MeshBinding::Rigid { node, joint }) = &self.binding {
            nodes.extend([*node, *joint]);
        }
        nodes
    }
}

impl MeshRecord {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            ..Default::default()
        }
    }
}
