//! Typed document model for the glTF 2.0 JSON schema.
//!
//! Deserialization fills in the schema's documented defaults for absent
//! optional fields and rejects missing required fields and out-of-domain
//! values as [`SchemaViolation`](crate::util::Error::SchemaViolation).
//! Unknown object keys are tolerated; `extensions` and `extras` payloads
//! are preserved verbatim as raw JSON for the extension dispatcher.
//!
//! All cross references are plain indices into the top-level arrays.
//! Nothing here dereferences them; that is the resolver's job.

mod accessor;
mod animation;
mod buffer;
mod camera;
mod material;
mod mesh;
mod node;
mod skin;
mod texture;

pub use accessor::{Accessor, Sparse, SparseIndices, SparseValues};
pub use animation::{Animation, AnimationSampler, Channel, Interpolation, Target, TargetPath};
pub use buffer::{Buffer, BufferView};
pub use camera::{Camera, CameraKind, Orthographic, Perspective};
pub use material::{
    AlphaMode, Material, NormalTextureInfo, OcclusionTextureInfo, PbrMetallicRoughness,
    TextureInfo,
};
pub use mesh::{AttributeMap, Mesh, Primitive, PrimitiveMode, Semantic};
pub use node::{Node, Scene};
pub use skin::Skin;
pub use texture::{Image, MagFilter, MinFilter, Sampler, Texture, WrapMode};

use serde::Deserialize;
use serde_json::Value;

use crate::util::{EntityKind, EntityRef, Error, Result};

/// Supported document version.
pub const GLTF_VERSION: (u32, u32) = (2, 0);

/// Raw extension payloads keyed by extension name.
pub type ExtensionMap = serde_json::Map<String, Value>;

/// The `asset` header every document must carry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetInfo {
    pub version: String,
    #[serde(default)]
    pub min_version: Option<String>,
    #[serde(default)]
    pub generator: Option<String>,
    #[serde(default)]
    pub copyright: Option<String>,
    #[serde(default)]
    pub extensions: ExtensionMap,
    #[serde(default)]
    pub extras: Value,
}

/// The complete typed document: ordered entity arrays plus the asset
/// header and document-level extension declarations.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub asset: AssetInfo,
    #[serde(default)]
    pub scene: Option<usize>,
    #[serde(default)]
    pub scenes: Vec<Scene>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub meshes: Vec<Mesh>,
    #[serde(default)]
    pub accessors: Vec<Accessor>,
    #[serde(default)]
    pub buffer_views: Vec<BufferView>,
    #[serde(default)]
    pub buffers: Vec<Buffer>,
    #[serde(default)]
    pub materials: Vec<Material>,
    #[serde(default)]
    pub textures: Vec<Texture>,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub samplers: Vec<Sampler>,
    #[serde(default)]
    pub skins: Vec<Skin>,
    #[serde(default)]
    pub animations: Vec<Animation>,
    #[serde(default)]
    pub cameras: Vec<Camera>,
    #[serde(default)]
    pub extensions_used: Vec<String>,
    #[serde(default)]
    pub extensions_required: Vec<String>,
    #[serde(default)]
    pub extensions: ExtensionMap,
    #[serde(default)]
    pub extras: Value,
}

impl Document {
    /// Parse a document from JSON text and check its declared version.
    pub fn from_json(json: &str) -> Result<Self> {
        let doc: Document = serde_json::from_str(json)
            .map_err(|e| Error::schema(EntityRef::asset(), format!("invalid document: {e}")))?;
        doc.check_version()?;
        Ok(doc)
    }

    /// Verify the asset version against [`GLTF_VERSION`].
    ///
    /// When `minVersion` is declared the full (major, minor) pair must be
    /// satisfied; otherwise only the major version must match, keeping
    /// forward compatibility with minor revisions.
    pub fn check_version(&self) -> Result<()> {
        if let Some(min) = &self.asset.min_version {
            let min = parse_version(min)?;
            if GLTF_VERSION < min {
                return Err(Error::schema(
                    EntityRef::asset(),
                    format!("unsupported minimum version {}.{}", min.0, min.1),
                ));
            }
        } else {
            let version = parse_version(&self.asset.version)?;
            if version.0 != GLTF_VERSION.0 {
                return Err(Error::schema(
                    EntityRef::asset(),
                    format!("unsupported version {}.{}", version.0, version.1),
                ));
            }
        }
        Ok(())
    }

    /// Length of the entity array addressed by `kind`.
    pub fn entity_len(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Asset => 1,
            EntityKind::Buffer => self.buffers.len(),
            EntityKind::BufferView => self.buffer_views.len(),
            EntityKind::Accessor => self.accessors.len(),
            EntityKind::Image => self.images.len(),
            EntityKind::Sampler => self.samplers.len(),
            EntityKind::Texture => self.textures.len(),
            EntityKind::Material => self.materials.len(),
            EntityKind::Mesh => self.meshes.len(),
            EntityKind::Skin => self.skins.len(),
            EntityKind::Animation => self.animations.len(),
            EntityKind::Camera => self.cameras.len(),
            EntityKind::Node => self.nodes.len(),
            EntityKind::Scene => self.scenes.len(),
            EntityKind::Light => 0,
        }
    }
}

/// Parse a "major.minor" version string.
fn parse_version(s: &str) -> Result<(u32, u32)> {
    let mut parts = s.split('.');
    let parse = |p: Option<&str>| p.and_then(|v| v.parse::<u32>().ok());
    match (parse(parts.next()), parse(parts.next())) {
        (Some(major), Some(minor)) => Ok((major, minor)),
        _ => Err(Error::schema(
            EntityRef::asset(),
            format!("unknown version format: {s:?}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::ErrorKind;

    #[test]
    fn test_minimal_document() {
        let doc = Document::from_json(r#"{"asset": {"version": "2.0"}}"#).unwrap();
        assert!(doc.nodes.is_empty());
        assert!(doc.scene.is_none());
    }

    #[test]
    fn test_missing_asset_rejected() {
        let err = Document::from_json("{}").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaViolation);
    }

    #[test]
    fn test_version_checks() {
        // Minor revisions ahead of ours are fine
        assert!(Document::from_json(r#"{"asset": {"version": "2.1"}}"#).is_ok());
        // Major mismatch is not
        let err = Document::from_json(r#"{"asset": {"version": "1.0"}}"#).unwrap_err();
        assert!(err.to_string().contains("unsupported version"));
        // minVersion past ours is not satisfiable
        let err = Document::from_json(
            r#"{"asset": {"version": "2.0", "minVersion": "2.1"}}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("minimum version"));
        // Garbage version strings are schema violations
        let err = Document::from_json(r#"{"asset": {"version": "two"}}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaViolation);
    }

    #[test]
    fn test_unknown_keys_tolerated() {
        let doc = Document::from_json(
            r#"{"asset": {"version": "2.0"}, "futureThing": {"a": 1}, "nodes": [{"futureKey": 5}]}"#,
        )
        .unwrap();
        assert_eq!(doc.nodes.len(), 1);
    }

    #[test]
    fn test_extensions_preserved_verbatim() {
        let doc = Document::from_json(
            r#"{
                "asset": {"version": "2.0"},
                "extensions": {"VENDOR_custom": {"answer": 42}},
                "extensionsUsed": ["VENDOR_custom"]
            }"#,
        )
        .unwrap();
        assert_eq!(doc.extensions["VENDOR_custom"]["answer"], 42);
        assert_eq!(doc.extensions_used, vec!["VENDOR_custom"]);
    }
}
