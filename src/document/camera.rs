//! Camera schema.

use serde::Deserialize;
use serde_json::Value;

use super::ExtensionMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraKind {
    Perspective,
    Orthographic,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Perspective {
    /// Absent means the host picks the viewport aspect.
    #[serde(default)]
    pub aspect_ratio: Option<f32>,
    /// Vertical field of view in radians.
    pub yfov: f32,
    /// Absent means an infinite projection.
    #[serde(default)]
    pub zfar: Option<f32>,
    pub znear: f32,
    #[serde(default)]
    pub extensions: ExtensionMap,
    #[serde(default)]
    pub extras: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Orthographic {
    pub xmag: f32,
    pub ymag: f32,
    pub zfar: f32,
    pub znear: f32,
    #[serde(default)]
    pub extensions: ExtensionMap,
    #[serde(default)]
    pub extras: Value,
}

/// The `type` tag selects which projection sub-object applies; the
/// resolver verifies the matching one is present.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Camera {
    #[serde(rename = "type")]
    pub kind: CameraKind,
    #[serde(default)]
    pub perspective: Option<Perspective>,
    #[serde(default)]
    pub orthographic: Option<Orthographic>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub extensions: ExtensionMap,
    #[serde(default)]
    pub extras: Value,
}
