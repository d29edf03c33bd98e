//! `KHR_materials_unlit`: flag a material as shadeless.
//!
//! The payload is an empty object; its presence is the whole signal.

use serde_json::Value;

use super::{Augment, Context, ExtensionHandler, Site};
use crate::util::Result;

pub const KHR_MATERIALS_UNLIT: &str = "KHR_materials_unlit";

/// Handler for `KHR_materials_unlit`.
pub struct Unlit;

impl ExtensionHandler for Unlit {
    fn name(&self) -> &'static str {
        KHR_MATERIALS_UNLIT
    }

    fn apply(&self, site: Site, _payload: &Value, _cx: &Context<'_>, out: &mut Augment) -> Result<()> {
        if let Site::Material(index) = site {
            out.materials.entry(index).or_default().unlit = true;
        }
        Ok(())
    }
}
