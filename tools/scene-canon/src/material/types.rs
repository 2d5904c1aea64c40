//! Authored material description

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use super::graph::ValueType;
use crate::identifier::{make_valid_identifier, make_valid_path};

/// Surface inputs, in the order they are processed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InputName {
    Normal,
    DiffuseColor,
    Opacity,
    EmissiveColor,
    Metallic,
    Roughness,
    Occlusion,
    Clearcoat,
    ClearcoatRoughness,
}

impl InputName {
    pub const ALL: [InputName; 9] = [
        InputName::Normal,
        InputName::DiffuseColor,
        InputName::Opacity,
        InputName::EmissiveColor,
        InputName::Metallic,
        InputName::Roughness,
        InputName::Occlusion,
        InputName::Clearcoat,
        InputName::ClearcoatRoughness,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            InputName::Normal => "normal",
            InputName::DiffuseColor => "diffuseColor",
            InputName::Opacity => "opacity",
            InputName::EmissiveColor => "emissiveColor",
            InputName::Metallic => "metallic",
            InputName::Roughness => "roughness",
            InputName::Occlusion => "occlusion",
            InputName::Clearcoat => "clearcoat",
            InputName::ClearcoatRoughness => "clearcoatRoughness",
        }
    }

    /// Texture channels read when a map names none, or names the wrong width
    pub fn default_channels(self) -> Channels {
        match self {
            InputName::Normal | InputName::DiffuseColor | InputName::EmissiveColor => Channels::Rgb,
            InputName::Opacity => Channels::A,
            _ => Channels::R,
        }
    }

    /// Declared type of the input on the preview surface
    pub fn value_type(self) -> ValueType {
        match self {
            InputName::Normal => ValueType::Normal3f,
            InputName::DiffuseColor | InputName::EmissiveColor => ValueType::Color3f,
            _ => ValueType::Float,
        }
    }

    pub fn is_vector(self) -> bool {
        self.default_channels() == Channels::Rgb
    }
}

/// Texture output channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channels {
    R,
    G,
    B,
    A,
    Rgb,
}

impl Channels {
    /// Output name on the texture node
    pub fn as_str(self) -> &'static str {
        match self {
            Channels::R => "r",
            Channels::G => "g",
            Channels::B => "b",
            Channels::A => "a",
            Channels::Rgb => "rgb",
        }
    }

    pub fn len(self) -> usize {
        match self {
            Channels::Rgb => 3,
            _ => 1,
        }
    }

    /// Component offset into a four-component value
    pub fn offset(self) -> usize {
        match self {
            Channels::R | Channels::Rgb => 0,
            Channels::G => 1,
            Channels::B => 2,
            Channels::A => 3,
        }
    }

    pub fn output_type(self) -> ValueType {
        match self {
            Channels::Rgb => ValueType::Float3,
            _ => ValueType::Float,
        }
    }
}

/// Texture addressing outside [0, 1]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WrapMode {
    Black,
    Clamp,
    #[default]
    Repeat,
    Mirror,
}

impl WrapMode {
    pub fn as_str(self) -> &'static str {
        match self {
            WrapMode::Black => "black",
            WrapMode::Clamp => "clamp",
            WrapMode::Repeat => "repeat",
            WrapMode::Mirror => "mirror",
        }
    }
}

/// A constant, either a scalar or an RGB/XYZ triple
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputValue {
    Scalar(f32),
    Vector([f32; 3]),
}

/// Texture-backed input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureMap {
    /// Texture file, relative to the asset
    pub file: String,
    /// Channels to read, defaults per input
    #[serde(default)]
    pub channels: Option<Channels>,
    /// Primvar holding the texture coordinates
    #[serde(default)]
    pub texcoord_set: Option<String>,
    #[serde(default)]
    pub wrap_s: WrapMode,
    #[serde(default)]
    pub wrap_t: WrapMode,
    /// Value used when the texture cannot be read
    #[serde(default)]
    pub fallback: Option<InputValue>,
    /// Per-channel multiplier
    #[serde(default)]
    pub scale: Option<InputValue>,
    /// Shared sampler name, assigned once per material
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampler_name: Option<String>,
}

impl TextureMap {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            channels: None,
            texcoord_set: None,
            wrap_s: WrapMode::Repeat,
            wrap_t: WrapMode::Repeat,
            fallback: None,
            scale: None,
            sampler_name: None,
        }
    }

    pub fn with_channels(mut self, channels: Channels) -> Self {
        self.channels = Some(channels);
        self
    }

    pub fn with_texcoord_set(mut self, set: impl Into<String>) -> Self {
        self.texcoord_set = Some(set.into());
        self
    }

    pub fn with_fallback(mut self, fallback: InputValue) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn with_scale(mut self, scale: InputValue) -> Self {
        self.scale = Some(scale);
        self
    }
}

/// One surface input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MaterialInput {
    Texture(TextureMap),
    Constant(InputValue),
}

/// A material as an adapter hands it over
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    /// Explicit material path, otherwise placed under the asset's materials
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub inputs: HashMap<InputName, MaterialInput>,
}

impl Material {
    /// Material with a sanitized name
    ///
    /// Names containing '/' are treated as paths: the path is kept
    /// (sanitized) and the last component becomes the name.
    pub fn new(authored_name: &str) -> Self {
        let mut material = Self {
            name: authored_name.to_string(),
            ..Default::default()
        };
        material.normalize_name();
        material
    }

    pub fn normalize_name(&mut self) {
        if self.path.is_none() && self.name.contains('/') {
            let path = make_valid_path(&self.name);
            let base = path.rsplit('/').next().unwrap_or_default().to_string();
            self.path = Some(path);
            self.name = base;
        }
        if !self.name.is_empty() {
            self.name = make_valid_identifier(&self.name);
        }
    }

    pub fn set(&mut self, input: InputName, value: MaterialInput) {
        self.inputs.insert(input, value);
    }

    pub fn set_constant(&mut self, input: InputName, value: InputValue) {
        self.set(input, MaterialInput::Constant(value));
    }

    pub fn set_texture(&mut self, input: InputName, map: TextureMap) {
        self.set(input, MaterialInput::Texture(map));
    }

    pub fn texture(&self, input: InputName) -> Option<&TextureMap> {
        match self.inputs.get(&input) {
            Some(MaterialInput::Texture(map)) => Some(map),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Group texture maps reading the same file onto shared samplers
    ///
    /// Inputs are visited in [`InputName::ALL`] order. The first input using
    /// a file starts a group, every later input reading the same file joins
    /// it and appends its own name, e.g. `metallic_roughness`. Normal maps
    /// never share. Names already present are kept.
    pub fn sampler_names(&self) -> HashMap<InputName, String> {
        let mut names: HashMap<InputName, String> = HashMap::new();
        for (i, &input) in InputName::ALL.iter().enumerate() {
            if names.contains_key(&input) {
                continue;
            }
            let Some(map) = self.texture(input) else {
                continue;
            };
            if let Some(name) = &map.sampler_name {
                names.insert(input, name.clone());
                continue;
            }
            if map.file.is_empty() {
                continue;
            }
            let mut group = vec![input];
            let mut shared = input.as_str().to_string();
            if input != InputName::Normal {
                for &other in &InputName::ALL[i + 1..] {
                    match self.texture(other) {
                        Some(m) if m.file == map.file && m.sampler_name.is_none() => {
                            shared.push('_');
                            shared.push_str(other.as_str());
                            group.push(other);
                        }
                        _ => {}
                    }
                }
            }
            for member in group {
                names.insert(member, shared.clone());
            }
        }
        names
    }

    /// Store [`sampler_names`](Self::sampler_names) on the texture maps
    pub fn assign_sampler_names(&mut self) {
        let names = self.sampler_names();
        for (input, name) in names {
            if let Some(MaterialInput::Texture(map)) = self.inputs.get_mut(&input) {
                map.sampler_name = Some(name);
            }
        }
    }
}
