//! `KHR_lights_punctual`: directional, point and spot lights.
//!
//! The light list lives in the document-level extension payload; nodes
//! reference list entries through their own payload.

use glam::Vec3;
use serde::Deserialize;
use serde_json::Value;

use super::{Augment, Context, ExtensionHandler, Site};
use crate::util::{EntityKind, EntityRef, Error, Result};

pub const KHR_LIGHTS_PUNCTUAL: &str = "KHR_lights_punctual";

/// Resolved punctual light.
#[derive(Clone, Debug, PartialEq)]
pub struct Light {
    pub name: Option<String>,
    pub kind: LightKind,
    pub color: Vec3,
    /// Candela for point/spot, lux for directional.
    pub intensity: f32,
    pub range: Option<f32>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LightKind {
    Directional,
    Point,
    Spot {
        inner_cone_angle: f32,
        outer_cone_angle: f32,
    },
}

fn one() -> f32 {
    1.0
}

fn white() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

fn quarter_pi() -> f32 {
    std::f32::consts::FRAC_PI_4
}

#[derive(Deserialize)]
struct DocumentPayload {
    #[serde(default)]
    lights: Vec<LightPayload>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LightPayload {
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "type")]
    kind: PayloadKind,
    #[serde(default = "white")]
    color: [f32; 3],
    #[serde(default = "one")]
    intensity: f32,
    #[serde(default)]
    range: Option<f32>,
    #[serde(default)]
    spot: Option<SpotPayload>,
}

#[derive(Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum PayloadKind {
    Directional,
    Point,
    Spot,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpotPayload {
    #[serde(default)]
    inner_cone_angle: f32,
    #[serde(default = "quarter_pi")]
    outer_cone_angle: f32,
}

#[derive(Deserialize)]
struct NodePayload {
    light: usize,
}

/// Handler for `KHR_lights_punctual`.
pub struct PunctualLights;

impl ExtensionHandler for PunctualLights {
    fn name(&self) -> &'static str {
        KHR_LIGHTS_PUNCTUAL
    }

    fn apply(&self, site: Site, payload: &Value, _cx: &Context<'_>, out: &mut Augment) -> Result<()> {
        match site {
            Site::Document => {
                let parsed: DocumentPayload = from_payload(payload, EntityRef::asset())?;
                out.lights = parsed
                    .lights
                    .into_iter()
                    .map(|light| {
                        let kind = match light.kind {
                            PayloadKind::Directional => LightKind::Directional,
                            PayloadKind::Point => LightKind::Point,
                            PayloadKind::Spot => {
                                let spot = light.spot.unwrap_or(SpotPayload {
                                    inner_cone_angle: 0.0,
                                    outer_cone_angle: quarter_pi(),
                                });
                                LightKind::Spot {
                                    inner_cone_angle: spot.inner_cone_angle,
                                    outer_cone_angle: spot.outer_cone_angle,
                                }
                            }
                        };
                        Light {
                            name: light.name,
                            kind,
                            color: Vec3::from(light.color),
                            intensity: light.intensity,
                            range: light.range,
                        }
                    })
                    .collect();
                Ok(())
            }
            Site::Node(index) => {
                let entity = EntityRef::new(EntityKind::Node, index);
                let parsed: NodePayload = from_payload(payload, entity)?;
                if parsed.light >= out.lights.len() {
                    return Err(Error::extension(
                        KHR_LIGHTS_PUNCTUAL,
                        entity,
                        format!(
                            "light {} is out of range (len {})",
                            parsed.light,
                            out.lights.len()
                        ),
                    ));
                }
                out.node_light.insert(index, parsed.light);
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

fn from_payload<T: serde::de::DeserializeOwned>(payload: &Value, entity: EntityRef) -> Result<T> {
    serde_json::from_value(payload.clone())
        .map_err(|e| Error::extension(KHR_LIGHTS_PUNCTUAL, entity, e.to_string()))
}
