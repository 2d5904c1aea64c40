//! scene-canon library
//!
//! Normalizes 3D scenes before they are written to a USD-style target:
//! merges skins onto shared skeletons, builds preview-surface shading graphs
//! from flat material descriptions and validates mesh primvar sizes.
//!
//! Adapters expose their native scene through [`NodeGraph`] and feed a
//! [`ConversionRun`], which produces a [`CanonicalScene`].

pub mod adapters;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod formats;
pub mod identifier;
pub mod material;
pub mod mesh;
pub mod node_graph;
pub mod records;
pub mod session;
pub mod skeleton;

pub use config::CanonConfig;
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{CanonError, Result};
pub use node_graph::NodeGraph;
pub use records::{RecordGraph, SceneRecords};
pub use session::{CanonicalScene, ConversionRun};

// Re-export the three normalization stages
pub use material::{validate_shading_graph, Material, MaterialGraphBuilder, ShadingGraph};
pub use mesh::{validate_mesh, MeshRecord, MeshReport, MeshStatus};
pub use skeleton::{Skeleton, Skin, Skinning};
