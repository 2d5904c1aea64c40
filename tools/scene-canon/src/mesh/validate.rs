//! Attribute and topology checks
//!
//! Read-only. Every attribute of a mesh is checked even after one fails so a
//! single pass reports all problems.

use serde::Serialize;

use super::types::{GeomSubset, Interpolation, MeshAttribute, MeshRecord};
use crate::diagnostics::Diagnostics;

/// Single structural problem on a mesh
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MeshIssue {
    #[error("faceVertexIndices has {indices} entries, fewer than the {faces} faces in faceVertexCounts")]
    Topology { indices: usize, faces: usize },

    #[error("subset {name} has {count} face indices, expected between 1 and {faces}")]
    SubsetSize {
        name: String,
        count: usize,
        faces: usize,
    },

    #[error("{attribute} has unknown interpolation '{token}'")]
    UnknownInterpolation { attribute: String, token: String },

    #[error("{attribute} has constant interpolation and cannot be indexed ({indices} indices)")]
    IndexedConstant { attribute: String, indices: usize },

    #[error("{attribute} has {interpolation} interpolation and {indices} indices, expected {expected} ({domain})")]
    IndexCount {
        attribute: String,
        interpolation: Interpolation,
        indices: usize,
        expected: usize,
        domain: &'static str,
    },

    #[error("{attribute} has {interpolation} interpolation and {values} values, expected {expected} ({domain} x element size {element_size})")]
    ValueCount {
        attribute: String,
        interpolation: Interpolation,
        values: usize,
        expected: usize,
        domain: &'static str,
        element_size: usize,
    },
}

/// Outcome of validating one mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MeshStatus {
    Pass,
    Fail,
    /// Missing topology, nothing could be checked
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeshReport {
    pub path: String,
    pub status: MeshStatus,
    /// Findings for this mesh; merged into the run's list on output
    #[serde(skip)]
    pub diagnostics: Diagnostics,
}

impl MeshReport {
    pub fn passed(&self) -> bool {
        self.status == MeshStatus::Pass
    }
}

/// The floor check: at least one face-vertex index per face
pub fn validate_topology(face_vertex_counts: &[u32], face_vertex_indices: &[u32]) -> Result<(), MeshIssue> {
    if face_vertex_indices.len() < face_vertex_counts.len() {
        return Err(MeshIssue::Topology {
            indices: face_vertex_indices.len(),
            faces: face_vertex_counts.len(),
        });
    }
    Ok(())
}

pub fn validate_subset(subset: &GeomSubset, face_count: usize) -> Result<(), MeshIssue> {
    let count = subset.face_indices.len();
    if count == 0 || count > face_count {
        return Err(MeshIssue::SubsetSize {
            name: subset.name.clone(),
            count,
            faces: face_count,
        });
    }
    Ok(())
}

/// Check value and index counts against the interpolation domain
pub fn validate_attribute(
    attribute: &MeshAttribute,
    face_count: usize,
    face_vertex_index_count: usize,
    point_count: usize,
) -> Result<(), MeshIssue> {
    let interpolation = Interpolation::parse(&attribute.interpolation).ok_or_else(|| {
        MeshIssue::UnknownInterpolation {
            attribute: attribute.name.clone(),
            token: attribute.interpolation.clone(),
        }
    })?;

    let values = attribute.values.len();
    let indices = attribute.indices.len();
    let element_size = attribute.element_size;

    let (domain, count) = match interpolation {
        Interpolation::Constant => {
            if indices > 0 {
                return Err(MeshIssue::IndexedConstant {
                    attribute: attribute.name.clone(),
                    indices,
                });
            }
            ("constant", 1)
        }
        Interpolation::Varying | Interpolation::Vertex => ("points", point_count),
        Interpolation::Uniform => ("faces", face_count),
        Interpolation::FaceVarying => ("face-vertex indices", face_vertex_index_count),
    };

    if indices > 0 {
        if indices != count {
            return Err(MeshIssue::IndexCount {
                attribute: attribute.name.clone(),
                interpolation,
                indices,
                expected: count,
                domain,
            });
        }
    } else if values != count * element_size {
        return Err(MeshIssue::ValueCount {
            attribute: attribute.name.clone(),
            interpolation,
            values,
            expected: count * element_size,
            domain,
            element_size,
        });
    }
    Ok(())
}

/// Validate a whole mesh: topology, subsets, normals and primvars
pub fn validate_mesh<N: Copy>(mesh: &MeshRecord<N>) -> MeshReport {
    let mut diagnostics = Diagnostics::new();
    let finish = |status: MeshStatus, diagnostics: Diagnostics| MeshReport {
        path: mesh.path.clone(),
        status,
        diagnostics,
    };

    let missing = if mesh.face_vertex_counts.is_empty() {
        Some("faceVertexCounts")
    } else if mesh.face_vertex_indices.is_empty() {
        Some("faceVertexIndices")
    } else if mesh.points.is_empty() {
        Some("points")
    } else {
        None
    };
    if let Some(what) = missing {
        diagnostics.note(mesh.path.clone(), format!("mesh has no {}, skipped", what));
        return finish(MeshStatus::Skipped, diagnostics);
    }

    if let Err(issue) = validate_topology(&mesh.face_vertex_counts, &mesh.face_vertex_indices) {
        diagnostics.fail(mesh.path.clone(), issue.to_string());
        return finish(MeshStatus::Fail, diagnostics);
    }

    let faces = mesh.face_count();
    let corners = mesh.face_vertex_indices.len();
    let points = mesh.points.len();

    let mut issues = Vec::new();
    for subset in &mesh.subsets {
        if let Err(issue) = validate_subset(subset, faces) {
            issues.push(issue);
        }
    }
    if let Some(normals) = &mesh.normals {
        // Normals are checked unindexed, one value per element
        let normals = MeshAttribute {
            element_size: 1,
            indices: Vec::new(),
            ..normals.clone()
        };
        if let Err(issue) = validate_attribute(&normals, faces, corners, points) {
            issues.push(issue);
        }
    }
    for primvar in &mesh.primvars {
        if let Err(issue) = validate_attribute(primvar, faces, corners, points) {
            issues.push(issue);
        }
    }

    let status = if issues.is_empty() {
        MeshStatus::Pass
    } else {
        MeshStatus::Fail
    };
    for issue in issues {
        diagnostics.fail(mesh.path.clone(), issue.to_string());
    }
    finish(status, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::AttributeValues;

    /// Cube: 6 quads, 24 corners, 8 points
    fn cube() -> MeshRecord {
        let mut mesh = MeshRecord::new("/Asset/Geom/cube");
        mesh.points = vec![[0.0; 3]; 8];
        mesh.face_vertex_counts = vec![4; 6];
        mesh.face_vertex_indices = (0..24).map(|i| i % 8).collect();
        mesh
    }

    fn flat(count: usize) -> AttributeValues {
        AttributeValues::Flat(vec![0.0; count])
    }

    #[test]
    fn test_face_varying_count_mismatch() {
        let attribute = MeshAttribute::new("st", Interpolation::FaceVarying, flat(14));
        let err = validate_attribute(&attribute, 6, 24, 8).unwrap_err();
        assert!(matches!(
            err,
            MeshIssue::ValueCount {
                values: 14,
                expected: 24,
                ..
            }
        ));
    }

    #[test]
    fn test_uniform_one_value_per_face() {
        let attribute = MeshAttribute::new("faceId", Interpolation::Uniform, flat(6));
        assert!(validate_attribute(&attribute, 6, 24, 8).is_ok());
    }

    #[test]
    fn test_element_size_multiplies_value_count() {
        let colors = MeshAttribute::new("displayColor", Interpolation::Vertex, flat(24))
            .with_element_size(3);
        assert!(validate_attribute(&colors, 6, 24, 8).is_ok());

        let short = MeshAttribute::new("displayColor", Interpolation::Vertex, flat(8))
            .with_element_size(3);
        assert!(validate_attribute(&short, 6, 24, 8).is_err());
    }

    #[test]
    fn test_indexed_counts_indices_not_values() {
        let st = MeshAttribute::new("st", Interpolation::FaceVarying, flat(4))
            .with_indices(vec![0, 1, 2, 3].repeat(6));
        assert!(validate_attribute(&st, 6, 24, 8).is_ok());

        let uniform = MeshAttribute::new("faceId", Interpolation::Uniform, flat(2))
            .with_indices(vec![0, 1, 0]);
        assert!(matches!(
            validate_attribute(&uniform, 6, 24, 8).unwrap_err(),
            MeshIssue::IndexCount {
                indices: 3,
                expected: 6,
                ..
            }
        ));
    }

    #[test]
    fn test_constant_rules() {
        let single = MeshAttribute::new("opacity", Interpolation::Constant, AttributeValues::Single(1.0));
        assert!(validate_attribute(&single, 6, 24, 8).is_ok());

        let color = MeshAttribute::new("displayColor", Interpolation::Constant, flat(3))
            .with_element_size(3);
        assert!(validate_attribute(&color, 6, 24, 8).is_ok());

        let indexed = single.clone().with_indices(vec![0]);
        assert!(matches!(
            validate_attribute(&indexed, 6, 24, 8).unwrap_err(),
            MeshIssue::IndexedConstant { .. }
        ));
    }

    #[test]
    fn test_unknown_interpolation() {
        let mut attribute = MeshAttribute::new("st", Interpolation::Vertex, flat(8));
        attribute.interpolation = "perPixel".to_string();
        assert!(matches!(
            validate_attribute(&attribute, 6, 24, 8).unwrap_err(),
            MeshIssue::UnknownInterpolation { .. }
        ));
    }

    #[test]
    fn test_topology_floor() {
        assert!(validate_topology(&[4; 6], &[0; 24]).is_ok());
        assert!(validate_topology(&[3; 6], &[0; 5]).is_err());
    }

    #[test]
    fn test_subset_range() {
        let subset = |count: usize| GeomSubset {
            name: "top".into(),
            face_indices: (0..count as u32).collect(),
            material: None,
        };
        assert!(validate_subset(&subset(0), 6).is_err());
        assert!(validate_subset(&subset(1), 6).is_ok());
        assert!(validate_subset(&subset(6), 6).is_ok());
        assert!(validate_subset(&subset(7), 6).is_err());
    }

    #[test]
    fn test_mesh_collects_every_issue() {
        let mut mesh = cube();
        mesh.primvars = vec![
            MeshAttribute::new("st", Interpolation::FaceVarying, flat(14)),
            MeshAttribute::new("faceId", Interpolation::Uniform, flat(6)),
            MeshAttribute::new("weird", Interpolation::Vertex, flat(3)),
        ];
        mesh.subsets = vec![GeomSubset {
            name: "empty".into(),
            face_indices: vec![],
            material: None,
        }];

        let report = validate_mesh(&mesh);
        assert_eq!(report.status, MeshStatus::Fail);
        assert_eq!(report.diagnostics.len(), 3);
        assert!(report.diagnostics.has_errors());
    }

    #[test]
    fn test_normals_use_element_size_one() {
        let mut mesh = cube();
        mesh.normals = Some(
            MeshAttribute::new(
                "normals",
                Interpolation::FaceVarying,
                AttributeValues::Tuples(vec![vec![0.0, 0.0, 1.0]; 24]),
            )
            .with_element_size(3),
        );
        assert!(validate_mesh(&mesh).passed());
    }

    #[test]
    fn test_normals_ignore_indices() {
        let mut mesh = cube();
        mesh.normals = Some(
            MeshAttribute::new(
                "normals",
                Interpolation::Vertex,
                AttributeValues::Tuples(vec![vec![0.0, 0.0, 1.0]; 8]),
            )
            .with_indices(vec![0, 1, 2]),
        );
        assert!(validate_mesh(&mesh).passed());

        // Value count still has to match the domain
        mesh.normals = Some(
            MeshAttribute::new(
                "normals",
                Interpolation::Vertex,
                AttributeValues::Tuples(vec![vec![0.0, 0.0, 1.0]; 3]),
            )
            .with_indices(vec![0; 8]),
        );
        assert_eq!(validate_mesh(&mesh).status, MeshStatus::Fail);
    }

    #[test]
    fn test_mesh_without_points_is_skipped() {
        let mut mesh = cube();
        mesh.points.clear();
        let report = validate_mesh(&mesh);
        assert_eq!(report.status, MeshStatus::Skipped);
        assert!(!report.diagnostics.has_errors());
    }

    #[test]
    fn test_bad_topology_stops_checks() {
        let mut mesh = cube();
        mesh.face_vertex_indices.truncate(3);
        mesh.primvars = vec![MeshAttribute::new("st", Interpolation::FaceVarying, flat(14))];
        let report = validate_mesh(&mesh);
        assert_eq!(report.status, MeshStatus::Fail);
        assert_eq!(report.diagnostics.len(), 1);
    }
}
