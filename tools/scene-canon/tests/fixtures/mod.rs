//! Scene records and glTF assets shared by the integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};

/// A small rig: two skins sharing the hips, a skinned body quad and a
/// helmet that follows the head rigidly
pub const RIG_RECORDS: &str = r#"{
    "nodes": [
        { "name": "Armature", "children": [1, 5] },
        {
            "name": "Hips",
            "children": [2, 4],
            "transform": [1, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1, 0, 0, 1, 0, 1]
        },
        { "name": "Spine", "children": [3] },
        { "name": "Head" },
        { "name": "Leg.L" },
        { "name": "Helmet" }
    ],
    "skins": [
        { "root": 1, "joints": [1, 2, 3] },
        { "root": 1, "joints": [1, 4] }
    ],
    "materials": [
        {
            "name": "Body",
            "inputs": {
                "diffuseColor": { "file": "tex/body albedo.jpeg" },
                "metallic": { "file": "tex/orm.png", "channels": "b" },
                "roughness": { "file": "tex/orm.png", "channels": "g", "scale": 0.5 },
                "occlusion": { "file": "tex/orm.png", "channels": "r" },
                "normal": { "file": "tex/normal.png" }
            }
        },
        { "name": "Visor", "inputs": { "diffuseColor": [0.1, 0.1, 0.1], "opacity": 0.4 } }
    ],
    "meshes": [
        {
            "path": "/Asset/Geom/Body",
            "points": [[0, 0, 0], [1, 0, 0], [1, 1, 0], [0, 1, 0]],
            "face_vertex_counts": [4],
            "face_vertex_indices": [0, 1, 2, 3],
            "normals": {
                "name": "normals",
                "interpolation": "vertex",
                "values": [[0, 0, 1], [0, 0, 1], [0, 0, 1], [0, 0, 1]]
            },
            "primvars": [
                {
                    "name": "st",
                    "interpolation": "faceVarying",
                    "values": [[0, 0], [1, 0], [1, 1], [0, 1]]
                }
            ],
            "material": "Body",
            "binding": {
                "kind": "skinned",
                "skin": 0,
                "joint_indices": [0, 1, 2, 0],
                "joint_weights": [1, 1, 1, 1],
                "element_size": 1
            }
        },
        {
            "path": "/Asset/Geom/Helmet",
            "points": [[0, 0, 0], [1, 0, 0], [0, 1, 0]],
            "face_vertex_counts": [3],
            "face_vertex_indices": [0, 1, 2],
            "material": "Visor",
            "binding": { "kind": "rigid", "node": 5, "joint": 3 }
        }
    ],
    "animations": [ { "name": "walk", "targets": [1, 4] } ]
}"#;

/// One quad whose face-varying texcoords are one short
pub const BAD_MESH_RECORDS: &str = r#"{
    "meshes": [
        {
            "path": "/Asset/Geom/Broken",
            "points": [[0, 0, 0], [1, 0, 0], [1, 1, 0], [0, 1, 0]],
            "face_vertex_counts": [4],
            "face_vertex_indices": [0, 1, 2, 3],
            "primvars": [
                {
                    "name": "st",
                    "interpolation": "faceVarying",
                    "values": [[0, 0], [1, 0], [1, 1]]
                }
            ]
        }
    ]
}"#;

pub fn write_file(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("Failed to write fixture");
    path
}

/// Three positions followed by three u16 indices, padded to 44 bytes
fn write_triangle_bin(dir: &Path) {
    let mut bin = Vec::new();
    for value in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
        bin.extend_from_slice(&value.to_le_bytes());
    }
    for index in [0u16, 1, 2] {
        bin.extend_from_slice(&index.to_le_bytes());
    }
    // Pad to a multiple of four
    bin.extend_from_slice(&[0, 0]);
    write_file(dir, "triangle.bin", &bin);
}

/// Accessors and buffer views over `triangle.bin`
const TRIANGLE_BUFFERS: &str = r#"
        "buffers": [ { "uri": "triangle.bin", "byteLength": 44 } ],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 36, "target": 34962 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 6, "target": 34963 }
        ],
        "accessors": [
            {
                "bufferView": 0,
                "componentType": 5126,
                "count": 3,
                "type": "VEC3",
                "min": [0.0, 0.0, 0.0],
                "max": [1.0, 1.0, 0.0]
            },
            { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }
        ],
        "meshes": [
            {
                "name": "Tri",
                "primitives": [
                    { "attributes": { "POSITION": 0 }, "indices": 1, "material": 0 }
                ]
            }
        ],
        "materials": [
            { "name": "Red", "pbrMetallicRoughness": { "baseColorFactor": [1.0, 0.0, 0.0, 1.0] } }
        ]"#;

/// A single-triangle glTF with its buffer in `triangle.bin`
pub fn write_triangle_gltf(dir: &Path) -> PathBuf {
    write_triangle_bin(dir);
    let json = format!(
        r#"{{
        "asset": {{ "version": "2.0" }},
        "scene": 0,
        "scenes": [ {{ "nodes": [0] }} ],
        "nodes": [ {{ "name": "Tri", "mesh": 0 }} ],
        {}
    }}"#,
        TRIANGLE_BUFFERS
    );
    write_file(dir, "triangle.gltf", json.as_bytes())
}

/// Armature -> { Hips -> Spine, Prop }, skinned on Hips and Spine with the
/// armature as declared skeleton root; Prop carries an unskinned triangle
pub fn write_prop_rig_gltf(dir: &Path) -> PathBuf {
    write_triangle_bin(dir);
    let json = format!(
        r#"{{
        "asset": {{ "version": "2.0" }},
        "scene": 0,
        "scenes": [ {{ "nodes": [0] }} ],
        "nodes": [
            {{ "name": "Armature", "children": [1, 3] }},
            {{ "name": "Hips", "children": [2] }},
            {{ "name": "Spine" }},
            {{ "name": "Prop", "mesh": 0 }}
        ],
        "skins": [ {{ "joints": [1, 2], "skeleton": 0 }} ],
        {}
    }}"#,
        TRIANGLE_BUFFERS
    );
    write_file(dir, "prop_rig.gltf", json.as_bytes())
}

