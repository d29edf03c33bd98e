//! Mesh schema: primitives, attribute semantics and morph targets.

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde_json::Value;
use serde_repr::Deserialize_repr;

use super::ExtensionMap;

/// Primitive topology (GL enum codes).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize_repr)]
#[repr(u32)]
pub enum PrimitiveMode {
    Points = 0,
    Lines = 1,
    LineLoop = 2,
    LineStrip = 3,
    #[default]
    Triangles = 4,
    TriangleStrip = 5,
    TriangleFan = 6,
}

/// Mapping from attribute name to accessor index. BTreeMap keeps the
/// iteration order deterministic for the scene builder and tests.
pub type AttributeMap = BTreeMap<String, usize>;

/// One drawable piece of a mesh.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Primitive {
    pub attributes: AttributeMap,
    #[serde(default)]
    pub indices: Option<usize>,
    #[serde(default)]
    pub material: Option<usize>,
    #[serde(default)]
    pub mode: PrimitiveMode,
    /// Morph targets: per-target attribute-delta accessor mappings.
    #[serde(default)]
    pub targets: Vec<AttributeMap>,
    #[serde(default)]
    pub extensions: ExtensionMap,
    #[serde(default)]
    pub extras: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mesh {
    #[serde(default)]
    pub name: Option<String>,
    pub primitives: Vec<Primitive>,
    /// Default morph weights; a node instancing this mesh may override them.
    #[serde(default)]
    pub weights: Vec<f32>,
    #[serde(default)]
    pub extensions: ExtensionMap,
    #[serde(default)]
    pub extras: Value,
}

impl Mesh {
    /// Number of morph targets (taken from the first primitive; the
    /// resolver verifies all primitives agree).
    pub fn morph_target_count(&self) -> usize {
        self.primitives.first().map_or(0, |p| p.targets.len())
    }
}

/// Parsed vertex attribute name.
///
/// Unknown names (including `_APP_SPECIFIC` ones) are carried through
/// as [`Semantic::Other`]; they are not an error.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Semantic {
    Position,
    Normal,
    Tangent,
    TexCoord(u32),
    Color(u32),
    Joints(u32),
    Weights(u32),
    Other(String),
}

impl Semantic {
    pub fn parse(name: &str) -> Self {
        fn set(name: &str, prefix: &str) -> Option<u32> {
            name.strip_prefix(prefix)?.parse().ok()
        }
        match name {
            "POSITION" => Self::Position,
            "NORMAL" => Self::Normal,
            "TANGENT" => Self::Tangent,
            _ => {
                if let Some(n) = set(name, "TEXCOORD_") {
                    Self::TexCoord(n)
                } else if let Some(n) = set(name, "COLOR_") {
                    Self::Color(n)
                } else if let Some(n) = set(name, "JOINTS_") {
                    Self::Joints(n)
                } else if let Some(n) = set(name, "WEIGHTS_") {
                    Self::Weights(n)
                } else {
                    Self::Other(name.to_string())
                }
            }
        }
    }
}

impl fmt::Display for Semantic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Position => f.write_str("POSITION"),
            Self::Normal => f.write_str("NORMAL"),
            Self::Tangent => f.write_str("TANGENT"),
            Self::TexCoord(n) => write!(f, "TEXCOORD_{n}"),
            Self::Color(n) => write!(f, "COLOR_{n}"),
            Self::Joints(n) => write!(f, "JOINTS_{n}"),
            Self::Weights(n) => write!(f, "WEIGHTS_{n}"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_defaults() {
        let p: Primitive =
            serde_json::from_str(r#"{"attributes": {"POSITION": 0}}"#).unwrap();
        assert_eq!(p.mode, PrimitiveMode::Triangles);
        assert!(p.indices.is_none());
        assert!(p.targets.is_empty());
    }

    #[test]
    fn test_unknown_mode_rejected() {
        let r = serde_json::from_str::<Primitive>(r#"{"attributes": {}, "mode": 9}"#);
        assert!(r.is_err());
    }

    #[test]
    fn test_semantic_parse() {
        assert_eq!(Semantic::parse("POSITION"), Semantic::Position);
        assert_eq!(Semantic::parse("TEXCOORD_1"), Semantic::TexCoord(1));
        assert_eq!(Semantic::parse("JOINTS_0"), Semantic::Joints(0));
        assert_eq!(
            Semantic::parse("_CUSTOM"),
            Semantic::Other("_CUSTOM".to_string())
        );
        // Malformed set suffix falls back to Other rather than failing
        assert_eq!(
            Semantic::parse("TEXCOORD_X"),
            Semantic::Other("TEXCOORD_X".to_string())
        );
    }

    #[test]
    fn test_morph_target_count() {
        let m: Mesh = serde_json::from_str(
            r#"{
                "primitives": [{
                    "attributes": {"POSITION": 0},
                    "targets": [{"POSITION": 1}, {"POSITION": 2}]
                }]
            }"#,
        )
        .unwrap();
        assert_eq!(m.morph_target_count(), 2);
    }
}
