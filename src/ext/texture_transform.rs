//! `KHR_texture_transform`: UV offset/rotation/scale per texture binding.

use glam::{Mat3, Vec2};
use serde::Deserialize;
use serde_json::Value;

use super::{Augment, Context, ExtensionHandler, Site};
use crate::util::{EntityKind, EntityRef, Error, Result};

pub const KHR_TEXTURE_TRANSFORM: &str = "KHR_texture_transform";

fn one2() -> [f32; 2] {
    [1.0, 1.0]
}

/// UV transform attached to a material's texture binding.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextureTransform {
    #[serde(default)]
    pub offset: [f32; 2],
    /// Radians, counter-clockwise in UV space (where +V points down).
    #[serde(default)]
    pub rotation: f32,
    #[serde(default = "one2")]
    pub scale: [f32; 2],
    /// Overrides the binding's UV set when present.
    #[serde(default)]
    pub tex_coord: Option<usize>,
}

impl Default for TextureTransform {
    fn default() -> Self {
        Self {
            offset: [0.0, 0.0],
            rotation: 0.0,
            scale: one2(),
            tex_coord: None,
        }
    }
}

impl TextureTransform {
    /// Combined UV matrix, translation * rotation * scale.
    ///
    /// The rotation sign flips because UV space has V pointing down: a
    /// counter-clockwise UV rotation is clockwise in the usual math
    /// orientation.
    pub fn matrix(&self) -> Mat3 {
        Mat3::from_translation(Vec2::from(self.offset))
            * Mat3::from_angle(-self.rotation)
            * Mat3::from_scale(Vec2::from(self.scale))
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }
}

/// Handler for `KHR_texture_transform`.
pub struct TextureTransforms;

impl ExtensionHandler for TextureTransforms {
    fn name(&self) -> &'static str {
        KHR_TEXTURE_TRANSFORM
    }

    fn apply(&self, site: Site, payload: &Value, _cx: &Context<'_>, out: &mut Augment) -> Result<()> {
        let Site::TextureSlot { material, slot } = site else {
            return Ok(());
        };
        let entity = EntityRef::new(EntityKind::Material, material);
        let parsed: TextureTransform = serde_json::from_value(payload.clone())
            .map_err(|e| Error::extension(KHR_TEXTURE_TRANSFORM, entity, e.to_string()))?;
        out.texture_transforms.insert((material, slot), parsed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::ext::{Registry, TextureSlot};

    #[test]
    fn test_transform_recorded_per_slot() {
        let doc = Document::from_json(
            r#"{
                "asset": {"version": "2.0"},
                "images": [{"uri": "a.png"}],
                "textures": [{"source": 0}],
                "materials": [{
                    "pbrMetallicRoughness": {
                        "baseColorTexture": {
                            "index": 0,
                            "extensions": {"KHR_texture_transform": {
                                "offset": [0.5, 0.0], "scale": [2.0, 2.0]
                            }}
                        }
                    },
                    "emissiveTexture": {"index": 0}
                }]
            }"#,
        )
        .unwrap();
        let out = Registry::standard().dispatch(&doc).unwrap();
        let t = &out.texture_transforms[&(0, TextureSlot::BaseColor)];
        assert_eq!(t.offset, [0.5, 0.0]);
        assert_eq!(t.scale, [2.0, 2.0]);
        assert!(!out
            .texture_transforms
            .contains_key(&(0, TextureSlot::Emissive)));
    }

    #[test]
    fn test_identity_matrix() {
        let t = TextureTransform::default();
        assert!(t.is_identity());
        assert_eq!(t.matrix(), Mat3::IDENTITY);
    }

    #[test]
    fn test_offset_applies_after_scale() {
        let t = TextureTransform {
            offset: [1.0, 0.0],
            scale: [2.0, 1.0],
            ..Default::default()
        };
        let uv = t.matrix() * glam::Vec3::new(1.0, 0.0, 1.0);
        assert!((uv.x - 3.0).abs() < 1e-6);
    }
}
