//! Animation schema: channels bind keyframe samplers to node properties.

use serde::Deserialize;
use serde_json::Value;

use super::ExtensionMap;

/// Keyframe interpolation mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Interpolation {
    #[default]
    Linear,
    Step,
    Cubicspline,
}

/// Animated node property.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetPath {
    Translation,
    Rotation,
    Scale,
    Weights,
}

impl TargetPath {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Translation => "translation",
            Self::Rotation => "rotation",
            Self::Scale => "scale",
            Self::Weights => "weights",
        }
    }
}

/// What a channel drives: a node plus one of its animatable paths.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    /// Optional in the schema to allow extensions to re-target channels;
    /// a channel without a node is validated but drives nothing.
    #[serde(default)]
    pub node: Option<usize>,
    pub path: TargetPath,
    #[serde(default)]
    pub extensions: ExtensionMap,
    #[serde(default)]
    pub extras: Value,
}

/// Binds a sampler to a target.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub sampler: usize,
    pub target: Target,
    #[serde(default)]
    pub extensions: ExtensionMap,
    #[serde(default)]
    pub extras: Value,
}

/// Keyframe input times plus output values.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationSampler {
    /// Accessor of keyframe times; must be a float scalar.
    pub input: usize,
    #[serde(default)]
    pub interpolation: Interpolation,
    /// Accessor of keyframe values.
    pub output: usize,
    #[serde(default)]
    pub extensions: ExtensionMap,
    #[serde(default)]
    pub extras: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Animation {
    #[serde(default)]
    pub name: Option<String>,
    pub channels: Vec<Channel>,
    pub samplers: Vec<AnimationSampler>,
    #[serde(default)]
    pub extensions: ExtensionMap,
    #[serde(default)]
    pub extras: Value,
}
