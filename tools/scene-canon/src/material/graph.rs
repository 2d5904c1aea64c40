//! Shading graph construction
//!
//! Every non-empty material becomes a preview surface node fed by constants
//! and texture nodes. Texture nodes are shared between inputs that read the
//! same file, and texture coordinate readers are shared per texcoord set.

use serde::Serialize;

use super::types::{Channels, InputName, InputValue, Material, MaterialInput, TextureMap};
use crate::config::CanonConfig;
use crate::diagnostics::Diagnostics;

pub const PREVIEW_SURFACE: &str = "UsdPreviewSurface";
pub const UV_TEXTURE: &str = "UsdUVTexture";
pub const PRIMVAR_READER_FLOAT2: &str = "UsdPrimvarReader_float2";
/// Texture coordinate transform that may sit between reader and texture
pub const TRANSFORM_2D: &str = "UsdTransform2d";

/// Name of the surface node in every graph
pub const SURFACE_NODE: &str = "surfaceShader";

/// Material interface input feeding the normal map's texcoord reader
pub const ST_PRIMVAR_INTERFACE: &str = "frame:stPrimvarName";

const DEFAULT_FALLBACK: [f32; 4] = [0.0, 0.0, 0.0, 1.0];
const DEFAULT_SCALE: [f32; 4] = [1.0; 4];

/// Declared type of a shader input or output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueType {
    Float,
    Float2,
    Float3,
    Float4,
    Color3f,
    Normal3f,
    Token,
    String,
    Asset,
    Int,
}

/// How a value is stored, which is what connections must agree on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Token,
    String,
    Asset,
    Int,
}

impl ValueType {
    pub fn storage(self) -> Storage {
        match self {
            ValueType::Float => Storage::Scalar,
            ValueType::Float2 => Storage::Vec2,
            ValueType::Float3 | ValueType::Color3f | ValueType::Normal3f => Storage::Vec3,
            ValueType::Float4 => Storage::Vec4,
            ValueType::Token => Storage::Token,
            ValueType::String => Storage::String,
            ValueType::Asset => Storage::Asset,
            ValueType::Int => Storage::Int,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ValueType::Float => "float",
            ValueType::Float2 => "float2",
            ValueType::Float3 => "float3",
            ValueType::Float4 => "float4",
            ValueType::Color3f => "color3f",
            ValueType::Normal3f => "normal3f",
            ValueType::Token => "token",
            ValueType::String => "string",
            ValueType::Asset => "asset",
            ValueType::Int => "int",
        }
    }
}

/// Authored value of an unconnected input
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Float(f32),
    Float2([f32; 2]),
    Float3([f32; 3]),
    Float4([f32; 4]),
    Token(String),
    Asset(String),
    Int(i32),
}

/// Where a shader input gets its value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputSource {
    Value { value: Value },
    Connection { node: String, output: String },
    /// Connected to a material interface input
    Interface { name: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShaderInput {
    pub name: String,
    pub value_type: ValueType,
    pub source: InputSource,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShaderOutput {
    pub name: String,
    pub value_type: ValueType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShaderNode {
    pub name: String,
    pub shader_id: String,
    pub inputs: Vec<ShaderInput>,
    pub outputs: Vec<ShaderOutput>,
}

impl ShaderNode {
    pub fn new(name: impl Into<String>, shader_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shader_id: shader_id.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn input(&self, name: &str) -> Option<&ShaderInput> {
        self.inputs.iter().find(|i| i.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&ShaderOutput> {
        self.outputs.iter().find(|o| o.name == name)
    }

    /// Authored value of an input, if it is not connected
    pub fn value(&self, name: &str) -> Option<&Value> {
        match self.input(name).map(|i| &i.source) {
            Some(InputSource::Value { value }) => Some(value),
            _ => None,
        }
    }

    /// Create or overwrite an input
    pub fn set_input(&mut self, name: &str, value_type: ValueType, source: InputSource) {
        match self.inputs.iter_mut().find(|i| i.name == name) {
            Some(input) => {
                input.value_type = value_type;
                input.source = source;
            }
            None => self.inputs.push(ShaderInput {
                name: name.to_string(),
                value_type,
                source,
            }),
        }
    }

    pub fn set_value(&mut self, name: &str, value_type: ValueType, value: Value) {
        self.set_input(name, value_type, InputSource::Value { value });
    }

    pub fn connect(&mut self, name: &str, value_type: ValueType, node: &str, output: &str) {
        self.set_input(
            name,
            value_type,
            InputSource::Connection {
                node: node.to_string(),
                output: output.to_string(),
            },
        );
    }

    /// Declare an output once
    pub fn add_output(&mut self, name: &str, value_type: ValueType) {
        if self.output(name).is_none() {
            self.outputs.push(ShaderOutput {
                name: name.to_string(),
                value_type,
            });
        }
    }
}

/// Input on the material itself, read by shader nodes through
/// [`InputSource::Interface`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterfaceInput {
    pub name: String,
    pub value_type: ValueType,
    pub value: Value,
}

/// Shading network of one material
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShadingGraph {
    pub name: String,
    pub path: String,
    pub interface: Vec<InterfaceInput>,
    pub nodes: Vec<ShaderNode>,
    /// Node whose `surface` output feeds the material
    pub surface: Option<String>,
}

impl ShadingGraph {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            interface: Vec::new(),
            nodes: Vec::new(),
            surface: None,
        }
    }

    pub fn node(&self, name: &str) -> Option<&ShaderNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn node_mut(&mut self, name: &str) -> Option<&mut ShaderNode> {
        self.nodes.iter_mut().find(|n| n.name == name)
    }

    /// Existing node with this name, or a new one with the given shader id
    fn node_or_insert(&mut self, name: &str, shader_id: &str) -> &mut ShaderNode {
        let index = match self.nodes.iter().position(|n| n.name == name) {
            Some(index) => index,
            None => {
                self.nodes.push(ShaderNode::new(name, shader_id));
                self.nodes.len() - 1
            }
        };
        &mut self.nodes[index]
    }

    pub fn interface_input(&self, name: &str) -> Option<&InterfaceInput> {
        self.interface.iter().find(|i| i.name == name)
    }

    pub fn set_interface(&mut self, name: &str, value_type: ValueType, value: Value) {
        match self.interface.iter_mut().find(|i| i.name == name) {
            Some(input) => {
                input.value_type = value_type;
                input.value = value;
            }
            None => self.interface.push(InterfaceInput {
                name: name.to_string(),
                value_type,
                value,
            }),
        }
    }

    /// Path of a node, used as diagnostic subject
    pub fn node_path(&self, node: &str) -> String {
        format!("{}/{}", self.path, node)
    }
}

/// Turns [`Material`]s into [`ShadingGraph`]s
pub struct MaterialGraphBuilder<'a> {
    config: &'a CanonConfig,
}

impl<'a> MaterialGraphBuilder<'a> {
    pub fn new(config: &'a CanonConfig) -> Self {
        Self { config }
    }

    /// Path a material without an explicit one is placed at
    pub fn material_path(&self, material: &Material) -> String {
        match &material.path {
            Some(path) if path.starts_with('/') => path.clone(),
            Some(path) => format!("/{}/{}", self.config.asset.name, path),
            None => format!("/{}/Materials/{}", self.config.asset.name, material.name),
        }
    }

    /// Build the shading graph of one material
    ///
    /// A material without inputs yields a graph with no nodes and no surface.
    pub fn build(&self, material: &Material, diagnostics: &mut Diagnostics) -> ShadingGraph {
        let mut graph = ShadingGraph::new(material.name.clone(), self.material_path(material));
        if material.is_empty() {
            return graph;
        }

        let samplers = material.sampler_names();

        let mut surface = ShaderNode::new(SURFACE_NODE, PREVIEW_SURFACE);
        surface.add_output("surface", ValueType::Token);

        for input in InputName::ALL {
            let Some(value) = material.inputs.get(&input) else {
                continue;
            };
            match value {
                MaterialInput::Constant(constant) => {
                    let subject = graph.node_path(SURFACE_NODE);
                    let value = constant_value(input, *constant, &subject, diagnostics);
                    surface.set_value(input.as_str(), input.value_type(), value);
                }
                MaterialInput::Texture(map) => {
                    if map.file.is_empty() {
                        diagnostics.warn(
                            graph.path.clone(),
                            format!("{} texture has no file, input skipped", input.as_str()),
                        );
                        continue;
                    }
                    let sampler = samplers
                        .get(&input)
                        .cloned()
                        .unwrap_or_else(|| input.as_str().to_string());
                    let channels = resolve_channels(input, map);
                    let texture = self.add_texture(&mut graph, input, map, channels, &sampler, diagnostics);
                    surface.connect(input.as_str(), input.value_type(), &texture, channels.as_str());
                }
            }
        }

        graph.nodes.insert(0, surface);
        graph.surface = Some(SURFACE_NODE.to_string());
        graph
    }

    /// Add or extend the texture node for one input, returns its name
    fn add_texture(
        &self,
        graph: &mut ShadingGraph,
        input: InputName,
        map: &TextureMap,
        channels: Channels,
        sampler: &str,
        diagnostics: &mut Diagnostics,
    ) -> String {
        let texcoord_set = map
            .texcoord_set
            .clone()
            .unwrap_or_else(|| self.config.materials.default_texcoord_set.clone());

        // The normal map's reader takes its primvar name from the material
        let uv_interface = if input == InputName::Normal {
            graph.set_interface(
                ST_PRIMVAR_INTERFACE,
                ValueType::Token,
                Value::Token(texcoord_set.clone()),
            );
            true
        } else {
            false
        };

        let reader_name = format!("uvReader_{}", texcoord_set);
        if graph.node(&reader_name).is_none() {
            let mut reader = ShaderNode::new(reader_name.clone(), PRIMVAR_READER_FLOAT2);
            let varname = if uv_interface {
                InputSource::Interface {
                    name: ST_PRIMVAR_INTERFACE.to_string(),
                }
            } else {
                InputSource::Value {
                    value: Value::Token(texcoord_set.clone()),
                }
            };
            reader.set_input("varname", ValueType::Token, varname);
            reader.add_output("result", ValueType::Float2);
            graph.nodes.push(reader);
        }

        let texture_name = format!("{}_texture", sampler);
        let subject = graph.node_path(&texture_name);
        let supported = self.config.is_supported_texture(&map.file);
        let texture = graph.node_or_insert(&texture_name, UV_TEXTURE);

        if input == InputName::Normal {
            texture.set_value("scale", ValueType::Float4, Value::Float4([2.0; 4]));
            texture.set_value("bias", ValueType::Float4, Value::Float4([-1.0; 4]));
        } else if let Some(scale) = map.scale {
            let mut merged = float4_or(texture.value("scale"), DEFAULT_SCALE);
            merge_channels(&mut merged, channels, scale, input, "scale", &subject, diagnostics);
            texture.set_value("scale", ValueType::Float4, Value::Float4(merged));
        }

        if !supported {
            diagnostics.warn(
                subject.clone(),
                format!(
                    "texture file '{}' is not one of the supported formats ({})",
                    map.file,
                    self.config.materials.texture_extensions.join(", ")
                ),
            );
        }

        texture.set_value("file", ValueType::Asset, Value::Asset(map.file.clone()));
        texture.connect("st", ValueType::Float2, &reader_name, "result");
        texture.add_output(channels.as_str(), channels.output_type());
        texture.set_value("wrapS", ValueType::Token, Value::Token(map.wrap_s.as_str().into()));
        texture.set_value("wrapT", ValueType::Token, Value::Token(map.wrap_t.as_str().into()));

        if let Some(fallback) = map.fallback {
            let mut merged = float4_or(texture.value("fallback"), DEFAULT_FALLBACK);
            merge_channels(&mut merged, channels, fallback, input, "fallback", &subject, diagnostics);
            if input == InputName::Normal {
                // Stored like the texels: [-1, 1] packed into [0, 1]
                for component in &mut merged[..3] {
                    *component = 0.5 * (*component + 1.0);
                }
            }
            texture.set_value("fallback", ValueType::Float4, Value::Float4(merged));
        }

        texture_name
    }
}

/// Channels from the map when their width fits the input, else the default
fn resolve_channels(input: InputName, map: &TextureMap) -> Channels {
    let default = input.default_channels();
    match map.channels {
        Some(channels) if channels.len() == default.len() => channels,
        _ => default,
    }
}

fn float4_or(value: Option<&Value>, default: [f32; 4]) -> [f32; 4] {
    match value {
        Some(Value::Float4(v)) => *v,
        _ => default,
    }
}

/// Write an authored scale or fallback into the components its channels read
fn merge_channels(
    target: &mut [f32; 4],
    channels: Channels,
    value: InputValue,
    input: InputName,
    what: &str,
    subject: &str,
    diagnostics: &mut Diagnostics,
) {
    let offset = channels.offset();
    match (channels.len(), value) {
        (3, InputValue::Vector(v)) => target[..3].copy_from_slice(&v),
        (3, InputValue::Scalar(_)) => {
            diagnostics.warn(
                subject,
                format!("{} {} must be a vector, ignored", input.as_str(), what),
            );
        }
        (_, InputValue::Scalar(s)) => target[offset] = s,
        (_, InputValue::Vector(v)) => {
            diagnostics.warn(
                subject,
                format!("{} {} should be a scalar, using its first component", input.as_str(), what),
            );
            target[offset] = v[0];
        }
    }
}

fn constant_value(
    input: InputName,
    constant: InputValue,
    subject: &str,
    diagnostics: &mut Diagnostics,
) -> Value {
    match (input.is_vector(), constant) {
        (true, InputValue::Vector(v)) => Value::Float3(v),
        (true, InputValue::Scalar(s)) => Value::Float3([s; 3]),
        (false, InputValue::Scalar(s)) => Value::Float(s),
        (false, InputValue::Vector(v)) => {
            diagnostics.warn(
                subject,
                format!("{} expects a scalar, using the first component", input.as_str()),
            );
            Value::Float(v[0])
        }
    }
}
