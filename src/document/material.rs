//! Material schema: PBR metallic-roughness parameters and texture bindings.

use serde::Deserialize;
use serde_json::Value;

use super::ExtensionMap;

fn one() -> f32 {
    1.0
}

fn white() -> [f32; 4] {
    [1.0, 1.0, 1.0, 1.0]
}

fn half() -> f32 {
    0.5
}

/// Alpha rendering mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlphaMode {
    #[default]
    Opaque,
    Mask,
    Blend,
}

/// A texture binding: texture index plus UV set.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextureInfo {
    pub index: usize,
    #[serde(default)]
    pub tex_coord: usize,
    #[serde(default)]
    pub extensions: ExtensionMap,
    #[serde(default)]
    pub extras: Value,
}

/// Normal map binding with its strength multiplier.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalTextureInfo {
    pub index: usize,
    #[serde(default)]
    pub tex_coord: usize,
    #[serde(default = "one")]
    pub scale: f32,
    #[serde(default)]
    pub extensions: ExtensionMap,
    #[serde(default)]
    pub extras: Value,
}

/// Occlusion map binding with its strength multiplier.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcclusionTextureInfo {
    pub index: usize,
    #[serde(default)]
    pub tex_coord: usize,
    #[serde(default = "one")]
    pub strength: f32,
    #[serde(default)]
    pub extensions: ExtensionMap,
    #[serde(default)]
    pub extras: Value,
}

/// Core metallic-roughness parameter set.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PbrMetallicRoughness {
    #[serde(default = "white")]
    pub base_color_factor: [f32; 4],
    #[serde(default)]
    pub base_color_texture: Option<TextureInfo>,
    #[serde(default = "one")]
    pub metallic_factor: f32,
    #[serde(default = "one")]
    pub roughness_factor: f32,
    #[serde(default)]
    pub metallic_roughness_texture: Option<TextureInfo>,
    #[serde(default)]
    pub extensions: ExtensionMap,
    #[serde(default)]
    pub extras: Value,
}

impl Default for PbrMetallicRoughness {
    fn default() -> Self {
        Self {
            base_color_factor: white(),
            base_color_texture: None,
            metallic_factor: 1.0,
            roughness_factor: 1.0,
            metallic_roughness_texture: None,
            extensions: ExtensionMap::default(),
            extras: Value::Null,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub pbr_metallic_roughness: PbrMetallicRoughness,
    #[serde(default)]
    pub normal_texture: Option<NormalTextureInfo>,
    #[serde(default)]
    pub occlusion_texture: Option<OcclusionTextureInfo>,
    #[serde(default)]
    pub emissive_texture: Option<TextureInfo>,
    #[serde(default)]
    pub emissive_factor: [f32; 3],
    #[serde(default)]
    pub alpha_mode: AlphaMode,
    #[serde(default = "half")]
    pub alpha_cutoff: f32,
    #[serde(default)]
    pub double_sided: bool,
    #[serde(default)]
    pub extensions: ExtensionMap,
    #[serde(default)]
    pub extras: Value,
}
