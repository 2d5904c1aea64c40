//! Integration tests for the scene-canon binary

mod fixtures;

use std::path::Path;
use std::process::{Command, Output};
use tempfile::tempdir;

fn scene_canon(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_scene-canon"))
        .args(args)
        .output()
        .expect("Failed to run scene-canon")
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("Non UTF-8 temp path")
}

#[test]
fn test_convert_writes_canonical_scene() {
    let dir = tempdir().expect("Failed to create temp dir");
    let records = fixtures::write_file(dir.path(), "rig.json", fixtures::RIG_RECORDS.as_bytes());
    let output = dir.path().join("rig.canonical.json");

    let result = scene_canon(&["convert", path_str(&records), "-o", path_str(&output)]);
    assert!(result.status.success(), "{}", String::from_utf8_lossy(&result.stderr));

    let text = std::fs::read_to_string(&output).expect("Output should exist");
    assert!(text.ends_with('\n'));
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["passed"], true);
    assert_eq!(value["skeletons"].as_array().unwrap().len(), 1);
    assert_eq!(value["textures"][0]["target"], "tex/body_albedo.jpg");
}

#[test]
fn test_convert_to_stdout() {
    let dir = tempdir().expect("Failed to create temp dir");
    let records = fixtures::write_file(dir.path(), "rig.json", fixtures::RIG_RECORDS.as_bytes());

    let result = scene_canon(&["convert", path_str(&records)]);
    assert!(result.status.success());
    let value: serde_json::Value = serde_json::from_slice(&result.stdout).unwrap();
    assert_eq!(value["asset"], "Asset");
}

#[test]
fn test_convert_is_deterministic() {
    let dir = tempdir().expect("Failed to create temp dir");
    let records = fixtures::write_file(dir.path(), "rig.json", fixtures::RIG_RECORDS.as_bytes());
    let first = dir.path().join("first.json");
    let second = dir.path().join("second.json");

    assert!(scene_canon(&["convert", path_str(&records), "-o", path_str(&first)])
        .status
        .success());
    assert!(scene_canon(&["convert", path_str(&records), "-o", path_str(&second)])
        .status
        .success());

    assert_eq!(std::fs::read(&first).unwrap(), std::fs::read(&second).unwrap());
}

#[test]
fn test_convert_with_config() {
    let dir = tempdir().expect("Failed to create temp dir");
    let records = fixtures::write_file(dir.path(), "rig.json", fixtures::RIG_RECORDS.as_bytes());
    let config = fixtures::write_file(
        dir.path(),
        "canon.toml",
        b"[asset]\nname = \"robot\"\n\n[output]\nverbose = true\n",
    );
    let output = dir.path().join("out.json");

    let result = scene_canon(&[
        "convert",
        path_str(&records),
        "-c",
        path_str(&config),
        "-o",
        path_str(&output),
    ]);
    assert!(result.status.success());

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(value["materials"][0]["path"], "/robot/Materials/Body");
}

#[test]
fn test_check_passes_valid_scene() {
    let dir = tempdir().expect("Failed to create temp dir");
    let records = fixtures::write_file(dir.path(), "rig.json", fixtures::RIG_RECORDS.as_bytes());
    assert!(scene_canon(&["check", path_str(&records)]).status.success());
}

#[test]
fn test_check_fails_bad_mesh() {
    let dir = tempdir().expect("Failed to create temp dir");
    let records = fixtures::write_file(
        dir.path(),
        "broken.json",
        fixtures::BAD_MESH_RECORDS.as_bytes(),
    );
    let result = scene_canon(&["check", path_str(&records)]);
    assert!(!result.status.success());
}

#[test]
fn test_malformed_records_fail() {
    let dir = tempdir().expect("Failed to create temp dir");
    let records = fixtures::write_file(dir.path(), "bad.json", b"{ \"nodes\": 3 }");
    let result = scene_canon(&["convert", path_str(&records)]);
    assert!(!result.status.success());
    assert!(result.stdout.is_empty());
}

#[test]
fn test_gltf_command() {
    let dir = tempdir().expect("Failed to create temp dir");
    let gltf = fixtures::write_triangle_gltf(dir.path());
    let output = dir.path().join("triangle.json");

    let result = scene_canon(&["gltf", path_str(&gltf), "-o", path_str(&output)]);
    assert!(result.status.success(), "{}", String::from_utf8_lossy(&result.stderr));

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(value["meshes"][0]["path"], "/Geom/Tri");
    assert_eq!(value["meshes"][0]["status"], "pass");
}
