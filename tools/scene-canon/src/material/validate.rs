//! Shading graph consistency checks
//!
//! Works on any [`ShadingGraph`], not only the ones the builder produced, so
//! it also catches graphs edited or assembled elsewhere.

use super::graph::{
    InputSource, ShaderInput, ShaderNode, ShadingGraph, ValueType, PREVIEW_SURFACE,
    PRIMVAR_READER_FLOAT2, TRANSFORM_2D, UV_TEXTURE,
};
use super::types::InputName;
use crate::diagnostics::Diagnostics;

/// Check a shading graph, returning every problem found
pub fn validate_shading_graph(graph: &ShadingGraph) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();
    GraphCheck {
        graph,
        diagnostics: &mut diagnostics,
    }
    .run();
    diagnostics
}

struct GraphCheck<'a> {
    graph: &'a ShadingGraph,
    diagnostics: &'a mut Diagnostics,
}

impl<'a> GraphCheck<'a> {
    fn run(&mut self) {
        let graph = self.graph;
        let Some(surface_name) = &graph.surface else {
            self.diagnostics.warn(
                self.graph.path.clone(),
                "material does not connect to a surface shader",
            );
            return;
        };
        let Some(surface) = graph.node(surface_name) else {
            self.diagnostics.reject(
                self.graph.path.clone(),
                format!("surface output connects to missing node '{}'", surface_name),
            );
            return;
        };
        let subject = self.graph.node_path(&surface.name);
        if surface.output("surface").is_none() {
            self.diagnostics.reject(subject.clone(), "shader has no surface output");
        }
        if surface.shader_id != PREVIEW_SURFACE {
            self.diagnostics.reject(
                subject,
                format!("unsupported surface shader '{}'", surface.shader_id),
            );
            return;
        }

        for input in &surface.inputs {
            self.check_surface_input(surface, input);
        }
    }

    fn check_surface_input(&mut self, surface: &'a ShaderNode, input: &'a ShaderInput) {
        let subject = self.graph.node_path(&surface.name);
        if let Some(expected) = surface_input_type(&input.name) {
            if expected != input.value_type {
                self.diagnostics.reject(
                    subject.clone(),
                    format!(
                        "input {} has type {}, expected {}",
                        input.name,
                        input.value_type.as_str(),
                        expected.as_str()
                    ),
                );
            }
        }

        match &input.source {
            InputSource::Value { .. } => {}
            InputSource::Interface { name } => self.check_interface(&subject, input, name),
            InputSource::Connection { node, output } => {
                let Some(upstream) = self.check_connection(&subject, input, node, output) else {
                    return;
                };
                match upstream.shader_id.as_str() {
                    UV_TEXTURE => self.check_texture(upstream),
                    id if id.starts_with("UsdPrimvarReader_") => self.check_primvar_reader(upstream),
                    id => self.diagnostics.reject(
                        self.graph.node_path(&upstream.name),
                        format!("unrecognized shader id '{}'", id),
                    ),
                }
            }
        }
    }

    /// Connected node and output exist and agree on storage
    fn check_connection(
        &mut self,
        subject: &str,
        input: &ShaderInput,
        node: &str,
        output: &str,
    ) -> Option<&'a ShaderNode> {
        let graph = self.graph;
        let Some(upstream) = graph.node(node) else {
            self.diagnostics.reject(
                subject,
                format!("input {} connects to missing node '{}'", input.name, node),
            );
            return None;
        };
        let Some(out) = upstream.output(output) else {
            self.diagnostics.reject(
                subject,
                format!(
                    "input {} connects to missing output '{}' on '{}'",
                    input.name, output, node
                ),
            );
            return None;
        };
        if out.value_type.storage() != input.value_type.storage() {
            self.diagnostics.reject(
                subject,
                format!(
                    "input {} ({}) connects to output {} of type {}",
                    input.name,
                    input.value_type.as_str(),
                    output,
                    out.value_type.as_str()
                ),
            );
        }
        Some(upstream)
    }

    fn check_interface(&mut self, subject: &str, input: &ShaderInput, name: &str) {
        match self.graph.interface_input(name) {
            None => self.diagnostics.reject(
                subject,
                format!("input {} reads missing material input '{}'", input.name, name),
            ),
            Some(interface) if interface.value_type.storage() != input.value_type.storage() => {
                self.diagnostics.reject(
                    subject,
                    format!(
                        "input {} ({}) reads material input {} of type {}",
                        input.name,
                        input.value_type.as_str(),
                        name,
                        interface.value_type.as_str()
                    ),
                )
            }
            Some(_) => {}
        }
    }

    fn expect_type(&mut self, node: &ShaderNode, name: &str, expected: &[ValueType]) {
        let Some(input) = node.input(name) else {
            return;
        };
        if !expected.contains(&input.value_type) {
            let names: Vec<_> = expected.iter().map(|t| t.as_str()).collect();
            self.diagnostics.reject(
                self.graph.node_path(&node.name),
                format!(
                    "input {} has type {}, expected {}",
                    name,
                    input.value_type.as_str(),
                    names.join(" or ")
                ),
            );
        }
    }

    fn check_texture(&mut self, texture: &'a ShaderNode) {
        let subject = self.graph.node_path(&texture.name);
        if texture.input("file").is_none() {
            self.diagnostics.warn(
                subject.clone(),
                "no texture file authored, the fallback value will be used",
            );
        }
        self.expect_type(texture, "file", &[ValueType::Asset]);
        for name in ["fallback", "scale", "bias"] {
            self.expect_type(texture, name, &[ValueType::Float4]);
        }
        for name in ["wrapS", "wrapT"] {
            self.expect_type(texture, name, &[ValueType::Token]);
        }

        let Some(st) = texture.input("st") else {
            self.diagnostics.reject(subject, "texture has no st input");
            return;
        };
        self.expect_type(texture, "st", &[ValueType::Float2]);
        if let InputSource::Connection { node, output } = &st.source {
            let Some(reader) = self.check_connection(&subject, st, node, output) else {
                return;
            };
            match reader.shader_id.as_str() {
                PRIMVAR_READER_FLOAT2 => self.check_primvar_reader(reader),
                TRANSFORM_2D => self.check_transform2d(reader),
                id => self.diagnostics.reject(
                    subject,
                    format!("st connects to unsupported shader '{}'", id),
                ),
            }
        }
    }

    fn check_transform2d(&mut self, transform: &'a ShaderNode) {
        let subject = self.graph.node_path(&transform.name);
        self.expect_type(transform, "rotation", &[ValueType::Float]);
        for name in ["scale", "translation"] {
            self.expect_type(transform, name, &[ValueType::Float2]);
        }
        if let Some(result) = transform.output("result") {
            if result.value_type != ValueType::Float2 {
                self.diagnostics.reject(
                    subject.clone(),
                    format!(
                        "output result has type {}, expected float2",
                        result.value_type.as_str()
                    ),
                );
            }
        }

        let Some(input) = transform.input("in") else {
            self.diagnostics.reject(subject, "transform has no in input");
            return;
        };
        self.expect_type(transform, "in", &[ValueType::Float2]);
        match &input.source {
            InputSource::Connection { node, output } => {
                let Some(reader) = self.check_connection(&subject, input, node, output) else {
                    return;
                };
                if reader.shader_id == PRIMVAR_READER_FLOAT2 {
                    self.check_primvar_reader(reader);
                } else {
                    self.diagnostics.reject(
                        subject,
                        format!("in connects to unsupported shader '{}'", reader.shader_id),
                    );
                }
            }
            InputSource::Interface { name } => self.check_interface(&subject, input, name),
            InputSource::Value { .. } => {}
        }
    }

    fn check_primvar_reader(&mut self, reader: &'a ShaderNode) {
        let subject = self.graph.node_path(&reader.name);
        if reader.shader_id != PRIMVAR_READER_FLOAT2 {
            self.diagnostics.warn(
                subject,
                format!("primvar reader '{}' is not supported", reader.shader_id),
            );
            return;
        }

        let Some(varname) = reader.input("varname") else {
            self.diagnostics.reject(subject, "primvar reader has no varname input");
            return;
        };
        self.expect_type(reader, "varname", &[ValueType::Token, ValueType::String]);
        match &varname.source {
            InputSource::Interface { name } => self.check_interface(&subject, varname, name),
            InputSource::Connection { node, output } => {
                self.check_connection(&subject, varname, node, output);
            }
            InputSource::Value { .. } => {}
        }
        self.expect_type(reader, "fallback", &[ValueType::Float2]);

        if let Some(result) = reader.output("result") {
            if result.value_type != ValueType::Float2 {
                self.diagnostics.reject(
                    subject,
                    format!(
                        "output result has type {}, expected float2",
                        result.value_type.as_str()
                    ),
                );
            }
        }
    }
}

/// Declared type of a known preview surface input
fn surface_input_type(name: &str) -> Option<ValueType> {
    InputName::ALL
        .iter()
        .find(|input| input.as_str() == name)
        .map(|input| input.value_type())
        .or(match name {
            "specularColor" => Some(ValueType::Color3f),
            "ior" | "displacement" | "opacityThreshold" => Some(ValueType::Float),
            "useSpecularWorkflow" => Some(ValueType::Int),
            _ => None,
        })
}
