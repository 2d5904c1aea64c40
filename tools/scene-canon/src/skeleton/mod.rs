//! Skeleton consolidation
//!
//! Collects per-mesh skins, merges the ones that share joints onto common
//! skeletons and rewrites per-vertex joint indices into skeleton space.

mod binding;
mod consolidate;
mod types;

// Re-export public API
pub use binding::{normalize_weights, InfluenceError, JointInfluences, RigidBinding};
pub use consolidate::Skinning;
pub use types::{Skeleton, SkeletonId, SkeletonRecord, Skin};
