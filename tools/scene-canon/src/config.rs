//! canon.toml parsing
//!
//! Every section and field is optional, an empty file yields the defaults.

use serde::Deserialize;
use std::path::Path;

use crate::error::{CanonError, Result};

/// canon.toml structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CanonConfig {
    #[serde(default)]
    pub asset: AssetSection,
    #[serde(default)]
    pub materials: MaterialsSection,
    #[serde(default)]
    pub skinning: SkinningSection,
    #[serde(default)]
    pub output: OutputSection,
}

/// Asset naming
#[derive(Debug, Clone, Deserialize)]
pub struct AssetSection {
    /// Root prim name. Materials land under `/<name>/Materials`.
    /// Default: "Asset"
    #[serde(default = "default_asset_name")]
    pub name: String,
}

impl Default for AssetSection {
    fn default() -> Self {
        Self {
            name: default_asset_name(),
        }
    }
}

/// Material graph settings
#[derive(Debug, Clone, Deserialize)]
pub struct MaterialsSection {
    /// Texture extensions the target format loads natively.
    /// Anything else is reported as a warning.
    #[serde(default = "default_texture_extensions")]
    pub texture_extensions: Vec<String>,

    /// Texcoord set used by texture references that do not name one.
    /// Default: "st"
    #[serde(default = "default_texcoord_set")]
    pub default_texcoord_set: String,
}

impl Default for MaterialsSection {
    fn default() -> Self {
        Self {
            texture_extensions: default_texture_extensions(),
            default_texcoord_set: default_texcoord_set(),
        }
    }
}

/// Skinning settings
#[derive(Debug, Clone, Deserialize)]
pub struct SkinningSection {
    /// Normalize per-vertex joint weights while remapping.
    /// Default: true
    #[serde(default = "default_true")]
    pub normalize_weights: bool,
}

impl Default for SkinningSection {
    fn default() -> Self {
        Self {
            normalize_weights: true,
        }
    }
}

/// Output settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputSection {
    /// Log warnings as well as errors
    #[serde(default)]
    pub verbose: bool,
}

fn default_asset_name() -> String {
    "Asset".to_string()
}

fn default_texture_extensions() -> Vec<String> {
    vec!["png".to_string(), "jpg".to_string()]
}

fn default_texcoord_set() -> String {
    "st".to_string()
}

fn default_true() -> bool {
    true
}

impl CanonConfig {
    /// Load config from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| CanonError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse config from string
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Whether a texture file has an extension the target loads natively
    pub fn is_supported_texture(&self, file: &str) -> bool {
        Path::new(file)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.materials
                    .texture_extensions
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_empty() {
        let config = CanonConfig::parse("").unwrap();
        assert_eq!(config.asset.name, "Asset");
        assert_eq!(config.materials.default_texcoord_set, "st");
        assert!(config.skinning.normalize_weights);
        assert!(!config.output.verbose);
    }

    #[test]
    fn test_config_sections() {
        let config = CanonConfig::parse(
            r#"
[asset]
name = "robot"

[materials]
texture_extensions = ["png", "jpg", "exr"]

[skinning]
normalize_weights = false

[output]
verbose = true
"#,
        )
        .unwrap();

        assert_eq!(config.asset.name, "robot");
        assert_eq!(config.materials.texture_extensions.len(), 3);
        assert_eq!(config.materials.default_texcoord_set, "st");
        assert!(!config.skinning.normalize_weights);
        assert!(config.output.verbose);
    }

    #[test]
    fn test_config_rejects_bad_types() {
        let result = CanonConfig::parse("[output]\nverbose = \"yes\"\n");
        assert!(matches!(result, Err(CanonError::Config(_))));
    }

    #[test]
    fn test_supported_texture() {
        let config = CanonConfig::default();
        assert!(config.is_supported_texture("textures/albedo.png"));
        assert!(config.is_supported_texture("ORM.JPG"));
        assert!(!config.is_supported_texture("normal.tga"));
        assert!(!config.is_supported_texture("no_extension"));
    }
}
