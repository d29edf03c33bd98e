//! `KHR_materials_pbrSpecularGlossiness`: alternate PBR parameter set.

use serde::Deserialize;
use serde_json::Value;

use super::{Augment, Context, ExtensionHandler, Site};
use crate::document::TextureInfo;
use crate::util::{EntityKind, EntityRef, Error, Result};

pub const KHR_MATERIALS_PBR_SPECULAR_GLOSSINESS: &str = "KHR_materials_pbrSpecularGlossiness";

fn one() -> f32 {
    1.0
}

fn white4() -> [f32; 4] {
    [1.0, 1.0, 1.0, 1.0]
}

fn white3() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

/// Specular-glossiness parameters, replacing the metallic-roughness set
/// when a host material supports them.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecGloss {
    #[serde(default = "white4")]
    pub diffuse_factor: [f32; 4],
    #[serde(default)]
    pub diffuse_texture: Option<TextureInfo>,
    #[serde(default = "white3")]
    pub specular_factor: [f32; 3],
    #[serde(default = "one")]
    pub glossiness_factor: f32,
    #[serde(default)]
    pub specular_glossiness_texture: Option<TextureInfo>,
}

/// Handler for `KHR_materials_pbrSpecularGlossiness`.
pub struct SpecularGlossiness;

impl ExtensionHandler for SpecularGlossiness {
    fn name(&self) -> &'static str {
        KHR_MATERIALS_PBR_SPECULAR_GLOSSINESS
    }

    fn apply(&self, site: Site, payload: &Value, cx: &Context<'_>, out: &mut Augment) -> Result<()> {
        let Site::Material(index) = site else {
            return Ok(());
        };
        let entity = EntityRef::new(EntityKind::Material, index);
        let parsed: SpecGloss = serde_json::from_value(payload.clone()).map_err(|e| {
            Error::extension(KHR_MATERIALS_PBR_SPECULAR_GLOSSINESS, entity, e.to_string())
        })?;
        for info in [&parsed.diffuse_texture, &parsed.specular_glossiness_texture]
            .into_iter()
            .flatten()
        {
            if info.index >= cx.doc.textures.len() {
                return Err(Error::extension(
                    KHR_MATERIALS_PBR_SPECULAR_GLOSSINESS,
                    entity,
                    format!(
                        "textures[{}] is out of range (len {})",
                        info.index,
                        cx.doc.textures.len()
                    ),
                ));
            }
        }
        out.materials.entry(index).or_default().spec_gloss = Some(parsed);
        Ok(())
    }
}
