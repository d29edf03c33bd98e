//! Skin schema.

use serde::Deserialize;
use serde_json::Value;

use super::ExtensionMap;

/// Joint list with optional inverse bind matrices.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skin {
    #[serde(default)]
    pub name: Option<String>,
    /// Node indices acting as joints, in joint order.
    pub joints: Vec<usize>,
    /// MAT4 accessor; element count must equal the joint count.
    #[serde(default)]
    pub inverse_bind_matrices: Option<usize>,
    /// Optional skeleton root node.
    #[serde(default)]
    pub skeleton: Option<usize>,
    #[serde(default)]
    pub extensions: ExtensionMap,
    #[serde(default)]
    pub extras: Value,
}
