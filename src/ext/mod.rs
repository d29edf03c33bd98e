//! Extension dispatch.
//!
//! Handlers are registered per extension identifier and invoked for
//! every entity carrying that identifier in its `extensions` map. An
//! extension without a registered handler is not an error: its payload
//! stays in the document verbatim and produces no semantic effect. The
//! one hard gate is `extensionsRequired`: a required name with no
//! handler aborts the import before any scene building.

mod lights;
mod spec_gloss;
mod texture_dds;
mod texture_transform;
mod unlit;

pub use lights::{Light, LightKind, PunctualLights, KHR_LIGHTS_PUNCTUAL};
pub use spec_gloss::{SpecGloss, SpecularGlossiness, KHR_MATERIALS_PBR_SPECULAR_GLOSSINESS};
pub use texture_dds::{TextureDds, MSFT_TEXTURE_DDS};
pub use texture_transform::{TextureTransform, TextureTransforms, KHR_TEXTURE_TRANSFORM};
pub use unlit::{Unlit, KHR_MATERIALS_UNLIT};

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, warn};

use crate::document::{Document, ExtensionMap};
use crate::util::{Error, Result};

/// Where in the document an extension payload was found.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Site {
    Document,
    Node(usize),
    Material(usize),
    TextureSlot { material: usize, slot: TextureSlot },
    Texture(usize),
}

/// Texture binding slots of a material that can carry extensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    BaseColor,
    MetallicRoughness,
    Normal,
    Occlusion,
    Emissive,
}

/// Read-only document context handed to handlers.
pub struct Context<'a> {
    pub doc: &'a Document,
}

/// Supplementary data produced by extension handlers, attached
/// alongside the entities it augments.
#[derive(Default, Debug)]
pub struct Augment {
    /// Lights declared at document level.
    pub lights: Vec<Light>,
    /// Node index -> light index.
    pub node_light: HashMap<usize, usize>,
    /// Material index -> material-level augmentations.
    pub materials: HashMap<usize, MaterialAugment>,
    /// (material index, slot) -> UV transform.
    pub texture_transforms: HashMap<(usize, TextureSlot), TextureTransform>,
    /// Texture index -> replacement image index.
    pub texture_sources: HashMap<usize, usize>,
}

#[derive(Clone, Debug, Default)]
pub struct MaterialAugment {
    pub unlit: bool,
    pub spec_gloss: Option<SpecGloss>,
}

/// Capability interface implemented once per supported extension name.
pub trait ExtensionHandler: Send + Sync {
    /// The extension identifier this handler owns.
    fn name(&self) -> &'static str;

    /// Interpret `payload` found at `site`, attaching results to `out`.
    fn apply(&self, site: Site, payload: &Value, cx: &Context<'_>, out: &mut Augment)
        -> Result<()>;
}

/// Registry of named extension handlers.
pub struct Registry {
    handlers: HashMap<&'static str, Box<dyn ExtensionHandler>>,
}

impl Registry {
    /// A registry with no handlers; every extension is pass-through.
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// The bundled handler set.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(PunctualLights));
        registry.register(Box::new(SpecularGlossiness));
        registry.register(Box::new(Unlit));
        registry.register(Box::new(TextureTransforms));
        registry.register(Box::new(TextureDds));
        registry
    }

    /// Register a handler, replacing any previous one for the same name.
    pub fn register(&mut self, handler: Box<dyn ExtensionHandler>) {
        self.handlers.insert(handler.name(), handler);
    }

    pub fn supports(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.keys().copied()
    }

    /// Enforce `extensionsRequired`; log the merely-used-but-unsupported.
    pub fn check_required(&self, doc: &Document) -> Result<()> {
        for name in &doc.extensions_required {
            if !self.supports(name) {
                return Err(Error::UnsupportedRequiredExtension(name.clone()));
            }
        }
        for name in &doc.extensions_used {
            if !self.supports(name) {
                warn!(extension = %name, "unsupported optional extension will be ignored");
            }
        }
        Ok(())
    }

    /// Walk every extension-bearing entity and invoke matching handlers.
    ///
    /// The document-level pass runs first so entity payloads can refer
    /// to document-level products (e.g. a node's light index).
    pub fn dispatch(&self, doc: &Document) -> Result<Augment> {
        let cx = Context { doc };
        let mut out = Augment::default();

        self.apply_map(&doc.extensions, Site::Document, &cx, &mut out)?;

        for (i, node) in doc.nodes.iter().enumerate() {
            self.apply_map(&node.extensions, Site::Node(i), &cx, &mut out)?;
        }

        for (i, material) in doc.materials.iter().enumerate() {
            self.apply_map(&material.extensions, Site::Material(i), &cx, &mut out)?;

            let pbr = &material.pbr_metallic_roughness;
            let slots: [(TextureSlot, Option<&ExtensionMap>); 5] = [
                (
                    TextureSlot::BaseColor,
                    pbr.base_color_texture.as_ref().map(|t| &t.extensions),
                ),
                (
                    TextureSlot::MetallicRoughness,
                    pbr.metallic_roughness_texture.as_ref().map(|t| &t.extensions),
                ),
                (
                    TextureSlot::Normal,
                    material.normal_texture.as_ref().map(|t| &t.extensions),
                ),
                (
                    TextureSlot::Occlusion,
                    material.occlusion_texture.as_ref().map(|t| &t.extensions),
                ),
                (
                    TextureSlot::Emissive,
                    material.emissive_texture.as_ref().map(|t| &t.extensions),
                ),
            ];
            for (slot, map) in slots {
                if let Some(map) = map {
                    self.apply_map(map, Site::TextureSlot { material: i, slot }, &cx, &mut out)?;
                }
            }
        }

        for (i, texture) in doc.textures.iter().enumerate() {
            self.apply_map(&texture.extensions, Site::Texture(i), &cx, &mut out)?;
        }

        debug!(
            lights = out.lights.len(),
            augmented_materials = out.materials.len(),
            "extension dispatch complete"
        );
        Ok(out)
    }

    fn apply_map(
        &self,
        map: &ExtensionMap,
        site: Site,
        cx: &Context<'_>,
        out: &mut Augment,
    ) -> Result<()> {
        for (name, payload) in map {
            if let Some(handler) = self.handlers.get(name.as_str()) {
                handler.apply(site, payload, cx, out)?;
            }
        }
        Ok(())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::standard()
    }
}
