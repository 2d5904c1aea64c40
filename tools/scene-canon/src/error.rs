//! Fatal errors
//!
//! Anything here aborts the conversion of the whole asset. Per-mesh and
//! per-material findings are not errors; they are collected as
//! [`Diagnostic`](crate::diagnostics::Diagnostic)s instead.

use std::path::PathBuf;

/// Errors that unwind a conversion run
#[derive(Debug, thiserror::Error)]
pub enum CanonError {
    /// Input file could not be read
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Scene records are malformed JSON or do not match the record schema
    #[error("malformed scene records: {0}")]
    Records(#[from] serde_json::Error),

    /// canon.toml could not be parsed
    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),

    /// A record references a node that does not exist
    #[error("{what} references node {index}, but the scene only has {count} nodes")]
    DanglingNode {
        what: String,
        index: usize,
        count: usize,
    },

    /// Node hierarchy is not a forest
    #[error("node {node} {reason}")]
    Hierarchy { node: usize, reason: &'static str },

    /// A skin declares a different number of bind matrices than joints
    #[error("skin {skin} has {joints} joints but {matrices} bind matrices")]
    BindMatrixCount {
        skin: usize,
        joints: usize,
        matrices: usize,
    },
}

pub type Result<T, E = CanonError> = std::result::Result<T, E>;
