//! Identifier and path sanitizing
//!
//! Target scene paths only accept `[A-Za-z_][A-Za-z0-9_]*` per component.

/// Name used when nothing usable is left of the authored name
pub const DEFAULT_IDENTIFIER: &str = "defaultIdentifier";

/// Turn an authored name into a valid prim identifier
///
/// Every character outside `[A-Za-z0-9]` becomes '_', and a leading digit
/// gets a '_' prefix.
pub fn make_valid_identifier(name: &str) -> String {
    if name.is_empty() {
        return DEFAULT_IDENTIFIER.to_string();
    }
    let mut out = sanitize(name, |c| c.is_ascii_alphanumeric());
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Sanitize a relative path, keeping '/' and '.' separators
pub fn make_valid_path(path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }
    let mut out = sanitize(path, |c| c.is_ascii_alphanumeric() || c == '/' || c == '.');
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

fn sanitize(input: &str, keep: impl Fn(char) -> bool) -> String {
    input
        .chars()
        .map(|c| if keep(c) { c } else { '_' })
        .collect()
}

/// Name for an indexed element whose authored name is missing or unusable
///
/// Mirrors how adapters name unnamed nodes: `<template><index>`.
pub fn name_or_indexed(name: Option<&str>, template: &str, index: usize) -> String {
    match name {
        Some(name) if !name.is_empty() => make_valid_identifier(name),
        _ => format!("{}{}", template, index),
    }
}
