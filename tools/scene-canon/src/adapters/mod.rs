//! Format adapters
//!
//! Each adapter implements [`NodeGraph`](crate::node_graph::NodeGraph) over
//! its native scene and hands skins, materials and meshes to a
//! [`ConversionRun`](crate::session::ConversionRun).

pub mod gltf;

pub use self::gltf::{load_gltf, load_gltf_slice, GltfGraph, GltfScene};
