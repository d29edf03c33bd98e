//! Node and scene schema.

use serde::Deserialize;
use serde_json::Value;

use super::ExtensionMap;

/// A scene-graph node.
///
/// The transform arrives either as a 4x4 matrix or as TRS components;
/// the source format treats these as independent optional fields, so
/// both are carried here raw. The resolver turns them into a single
/// tagged [`Transform`](crate::resolve::Transform) and rejects nodes
/// that specify both representations.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub children: Vec<usize>,
    /// Column-major 4x4 matrix.
    #[serde(default)]
    pub matrix: Option<[f32; 16]>,
    #[serde(default)]
    pub translation: Option<[f32; 3]>,
    /// Quaternion (x, y, z, w).
    #[serde(default)]
    pub rotation: Option<[f32; 4]>,
    #[serde(default)]
    pub scale: Option<[f32; 3]>,
    #[serde(default)]
    pub mesh: Option<usize>,
    #[serde(default)]
    pub camera: Option<usize>,
    #[serde(default)]
    pub skin: Option<usize>,
    /// Morph weight override for the instanced mesh.
    #[serde(default)]
    pub weights: Vec<f32>,
    #[serde(default)]
    pub extensions: ExtensionMap,
    #[serde(default)]
    pub extras: Value,
}

impl Node {
    /// True when any TRS component is present.
    #[inline]
    pub fn has_trs(&self) -> bool {
        self.translation.is_some() || self.rotation.is_some() || self.scale.is_some()
    }
}

/// An ordered list of root nodes.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub nodes: Vec<usize>,
    #[serde(default)]
    pub extensions: ExtensionMap,
    #[serde(default)]
    pub extras: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_defaults() {
        let n: Node = serde_json::from_str("{}").unwrap();
        assert!(n.children.is_empty());
        assert!(n.matrix.is_none());
        assert!(!n.has_trs());
    }

    #[test]
    fn test_node_trs() {
        let n: Node = serde_json::from_str(r#"{"translation": [1, 2, 3]}"#).unwrap();
        assert!(n.has_trs());
        assert_eq!(n.translation, Some([1.0, 2.0, 3.0]));
    }
}
