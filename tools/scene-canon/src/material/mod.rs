//! Material graphs
//!
//! Converts flat per-input material descriptions into preview-surface
//! shading graphs and checks graphs for dangling connections and type
//! mismatches.

mod graph;
mod types;
mod validate;

pub use graph::{
    InputSource, InterfaceInput, MaterialGraphBuilder, ShaderInput, ShaderNode, ShaderOutput,
    ShadingGraph, Storage, Value, ValueType, PREVIEW_SURFACE, PRIMVAR_READER_FLOAT2,
    ST_PRIMVAR_INTERFACE, SURFACE_NODE, TRANSFORM_2D, UV_TEXTURE,
};
pub use types::{Channels, InputName, InputValue, Material, MaterialInput, TextureMap, WrapMode};
pub use validate::validate_shading_graph;
