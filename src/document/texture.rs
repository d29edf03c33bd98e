//! Texture, sampler and image schema.

use serde::Deserialize;
use serde_json::Value;
use serde_repr::Deserialize_repr;

use super::ExtensionMap;

/// Texture coordinate wrap mode (GL enum codes).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize_repr)]
#[repr(u32)]
pub enum WrapMode {
    ClampToEdge = 33071,
    MirroredRepeat = 33648,
    #[default]
    Repeat = 10497,
}

/// Magnification filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize_repr)]
#[repr(u32)]
pub enum MagFilter {
    Nearest = 9728,
    Linear = 9729,
}

/// Minification filter, including the mipmapped variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize_repr)]
#[repr(u32)]
pub enum MinFilter {
    Nearest = 9728,
    Linear = 9729,
    NearestMipmapNearest = 9984,
    LinearMipmapNearest = 9985,
    NearestMipmapLinear = 9986,
    LinearMipmapLinear = 9987,
}

/// Sampling parameters. Filters have no schema default (the host picks);
/// wrap modes default to repeat.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sampler {
    #[serde(default)]
    pub mag_filter: Option<MagFilter>,
    #[serde(default)]
    pub min_filter: Option<MinFilter>,
    #[serde(default)]
    pub wrap_s: WrapMode,
    #[serde(default)]
    pub wrap_t: WrapMode,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub extensions: ExtensionMap,
    #[serde(default)]
    pub extras: Value,
}

/// Image data source: an external/data URI or a buffer view plus MIME type.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub buffer_view: Option<usize>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub extensions: ExtensionMap,
    #[serde(default)]
    pub extras: Value,
}

/// Binds an image source to sampling parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Texture {
    #[serde(default)]
    pub sampler: Option<usize>,
    #[serde(default)]
    pub source: Option<usize>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub extensions: ExtensionMap,
    #[serde(default)]
    pub extras: Value,
}
