//! `MSFT_texture_dds`: alternate DDS image source for a texture.

use serde::Deserialize;
use serde_json::Value;

use super::{Augment, Context, ExtensionHandler, Site};
use crate::util::{EntityKind, EntityRef, Error, Result};

pub const MSFT_TEXTURE_DDS: &str = "MSFT_texture_dds";

#[derive(Deserialize)]
struct Payload {
    source: usize,
}

/// Handler for `MSFT_texture_dds`.
pub struct TextureDds;

impl ExtensionHandler for TextureDds {
    fn name(&self) -> &'static str {
        MSFT_TEXTURE_DDS
    }

    fn apply(&self, site: Site, payload: &Value, cx: &Context<'_>, out: &mut Augment) -> Result<()> {
        let Site::Texture(index) = site else {
            return Ok(());
        };
        let entity = EntityRef::new(EntityKind::Texture, index);
        let parsed: Payload = serde_json::from_value(payload.clone())
            .map_err(|e| Error::extension(MSFT_TEXTURE_DDS, entity, e.to_string()))?;
        if parsed.source >= cx.doc.images.len() {
            return Err(Error::extension(
                MSFT_TEXTURE_DDS,
                entity,
                format!(
                    "images[{}] is out of range (len {})",
                    parsed.source,
                    cx.doc.images.len()
                ),
            ));
        }
        out.texture_sources.insert(index, parsed.source);
        Ok(())
    }
}
