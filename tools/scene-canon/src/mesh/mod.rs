//! Mesh records and attribute validation

mod types;
mod validate;

// Re-export public API
pub use types::{
    AttributeValues, GeomSubset, Interpolation, MeshAttribute, MeshBinding, MeshRecord,
};
pub use validate::{
    validate_attribute, validate_mesh, validate_subset, validate_topology, MeshIssue, MeshReport,
    MeshStatus,
};
