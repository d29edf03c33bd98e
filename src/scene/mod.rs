//! Scene building: drives the host through a resolved asset.
//!
//! The host is an injected capability ([`SceneHost`]); the core never
//! creates host objects itself, which keeps the pipeline testable
//! headlessly through [`RecordingHost`]. The builder walks each scene's
//! node forest pre-order, accumulating world transforms, and hands the
//! host fully resolved, decoded data. It performs no validation of its
//! own - every invariant was established by the resolver and decoder.

use std::collections::HashMap;
use std::sync::Arc;

use glam::Mat4;
use tracing::debug;

use crate::decode::DecodedAccessor;
use crate::document::{
    Camera, Interpolation, Material, PrimitiveMode, Sampler, Semantic, TargetPath,
};
use crate::ext::{Light, SpecGloss, TextureSlot, TextureTransform};
use crate::import::Asset;
use crate::resolve::Transform;
use crate::util::{EntityKind, EntityRef, Error, Result};

/// One realized node: local transform plus accumulated world transform.
pub struct NodeData<'a> {
    pub index: usize,
    pub name: Option<&'a str>,
    pub local: Transform,
    pub world: Mat4,
}

/// A mesh instance on a node, all accessors decoded.
pub struct MeshData<'a, H> {
    pub index: usize,
    pub name: Option<&'a str>,
    pub primitives: Vec<PrimitiveData<H>>,
    /// Morph weights: the node's override when present, else the mesh
    /// defaults, else empty.
    pub weights: Vec<f32>,
}

pub struct PrimitiveData<H> {
    pub mode: PrimitiveMode,
    pub attributes: Vec<(Semantic, Arc<DecodedAccessor>)>,
    pub indices: Option<Arc<DecodedAccessor>>,
    pub material: Option<H>,
    /// Morph target deltas, one attribute set per target.
    pub targets: Vec<Vec<(Semantic, Arc<DecodedAccessor>)>>,
}

/// A material with its texture bindings resolved (sampler parameters,
/// image source overrides, UV transforms).
pub struct MaterialData<'a> {
    pub index: usize,
    pub material: &'a Material,
    pub textures: HashMap<TextureSlot, TextureBinding>,
    pub unlit: bool,
    pub spec_gloss: Option<&'a SpecGloss>,
}

#[derive(Clone, Debug)]
pub struct TextureBinding {
    pub texture: usize,
    /// Image source after any compressed-format override.
    pub image: Option<usize>,
    /// UV set after any transform override.
    pub tex_coord: usize,
    pub sampler: Sampler,
    pub transform: Option<TextureTransform>,
    /// Normal scale / occlusion strength; 1.0 for color slots.
    pub strength: f32,
}

pub struct CameraData<'a> {
    pub index: usize,
    pub camera: &'a Camera,
}

pub struct LightData<'a> {
    pub index: usize,
    pub light: &'a Light,
}

pub struct SkinData<'a, H> {
    pub index: usize,
    pub name: Option<&'a str>,
    pub joints: Vec<H>,
    pub inverse_bind_matrices: Option<Vec<Mat4>>,
    pub skeleton: Option<H>,
}

pub struct ChannelData<H> {
    pub target: H,
    pub path: TargetPath,
    pub interpolation: Interpolation,
    pub input: Arc<DecodedAccessor>,
    pub output: Arc<DecodedAccessor>,
}

pub struct AnimationData<'a, H> {
    pub index: usize,
    pub name: Option<&'a str>,
    pub channels: Vec<ChannelData<H>>,
}

/// Host-side scene construction interface.
///
/// Handles are opaque to the core; it stores them only to pass back as
/// parents, material bindings and animation targets.
pub trait SceneHost {
    type Handle: Copy;

    fn create_node(&mut self, node: &NodeData<'_>, parent: Option<Self::Handle>)
        -> Result<Self::Handle>;
    fn create_mesh(&mut self, owner: Self::Handle, mesh: &MeshData<'_, Self::Handle>)
        -> Result<Self::Handle>;
    fn create_material(&mut self, material: &MaterialData<'_>) -> Result<Self::Handle>;
    fn create_camera(&mut self, owner: Self::Handle, camera: &CameraData<'_>)
        -> Result<Self::Handle>;
    fn create_light(&mut self, owner: Self::Handle, light: &LightData<'_>)
        -> Result<Self::Handle>;
    fn create_skin(&mut self, owner: Self::Handle, skin: &SkinData<'_, Self::Handle>)
        -> Result<Self::Handle>;
    fn create_animation(&mut self, animation: &AnimationData<'_, Self::Handle>)
        -> Result<Self::Handle>;
}

/// Walks a resolved asset and emits host calls.
pub struct SceneBuilder<'a, H: SceneHost> {
    asset: &'a Asset,
    host: &'a mut H,
    nodes: HashMap<usize, H::Handle>,
    materials: HashMap<usize, H::Handle>,
    visited: Vec<usize>,
}

impl<'a, H: SceneHost> SceneBuilder<'a, H> {
    pub fn new(asset: &'a Asset, host: &'a mut H) -> Self {
        Self {
            asset,
            host,
            nodes: HashMap::new(),
            materials: HashMap::new(),
            visited: Vec::new(),
        }
    }

    /// Build one scene: nodes pre-order, then skins, then animations.
    pub fn build_scene(&mut self, scene: usize) -> Result<()> {
        let asset = self.asset;
        let doc = asset.document();
        if scene >= doc.scenes.len() {
            return Err(Error::schema(
                EntityRef::new(EntityKind::Scene, scene),
                format!("scene index out of range (len {})", doc.scenes.len()),
            ));
        }
        debug!(scene, roots = doc.scenes[scene].nodes.len(), "building scene");

        let mut stack: Vec<(usize, Option<H::Handle>, Mat4)> = doc.scenes[scene]
            .nodes
            .iter()
            .rev()
            .map(|&root| (root, None, Mat4::IDENTITY))
            .collect();

        while let Some((index, parent, parent_world)) = stack.pop() {
            let node = &doc.nodes[index];
            let local = asset.graph().transform(index);
            let world = parent_world * local.matrix();

            let handle = self.host.create_node(
                &NodeData {
                    index,
                    name: node.name.as_deref(),
                    local,
                    world,
                },
                parent,
            )?;
            self.nodes.insert(index, handle);
            self.visited.push(index);

            if let Some(mesh) = node.mesh {
                let data = self.mesh_data(index, mesh)?;
                self.host.create_mesh(handle, &data)?;
            }
            if let Some(camera) = node.camera {
                let data = CameraData {
                    index: camera,
                    camera: &doc.cameras[camera],
                };
                self.host.create_camera(handle, &data)?;
            }
            if let Some(&light) = asset.augment().node_light.get(&index) {
                let data = LightData {
                    index: light,
                    light: &asset.augment().lights[light],
                };
                self.host.create_light(handle, &data)?;
            }

            for &child in node.children.iter().rev() {
                stack.push((child, Some(handle), world));
            }
        }

        self.build_skins()?;
        self.build_animations()
    }

    /// Skins reference node handles, so they go after the node pass.
    fn build_skins(&mut self) -> Result<()> {
        let visited = std::mem::take(&mut self.visited);
        for &index in &visited {
            if let Some(skin) = self.asset.document().nodes[index].skin {
                let owner = self.nodes[&index];
                let data = self.skin_data(skin)?;
                self.host.create_skin(owner, &data)?;
            }
        }
        self.visited = visited;
        Ok(())
    }

    fn skin_data(&self, index: usize) -> Result<SkinData<'a, H::Handle>> {
        let doc = self.asset.document();
        let skin = &doc.skins[index];
        let entity = EntityRef::new(EntityKind::Skin, index);

        let joints = skin
            .joints
            .iter()
            .map(|joint| {
                self.nodes.get(joint).copied().ok_or_else(|| {
                    Error::schema(entity, format!("joint nodes[{joint}] is not in the built scene"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let inverse_bind_matrices = match skin.inverse_bind_matrices {
            Some(accessor) => {
                let decoded = self.asset.decode(accessor)?;
                // The resolver pinned this accessor to float MAT4
                decoded.to_mat4().map(Some).ok_or_else(|| {
                    Error::schema(entity, "inverse bind matrices are not float MAT4")
                })?
            }
            None => None,
        };

        Ok(SkinData {
            index,
            name: skin.name.as_deref(),
            joints,
            inverse_bind_matrices,
            skeleton: skin.skeleton.and_then(|s| self.nodes.get(&s).copied()),
        })
    }

    /// One host call per animation whose channels touch this scene.
    fn build_animations(&mut self) -> Result<()> {
        let asset = self.asset;
        for (index, animation) in asset.document().animations.iter().enumerate() {
            let mut channels = Vec::with_capacity(animation.channels.len());
            for channel in &animation.channels {
                let Some(target) = channel.target.node.and_then(|n| self.nodes.get(&n).copied())
                else {
                    continue;
                };
                let sampler = &animation.samplers[channel.sampler];
                channels.push(ChannelData {
                    target,
                    path: channel.target.path,
                    interpolation: sampler.interpolation,
                    input: asset.decode(sampler.input)?,
                    output: asset.decode(sampler.output)?,
                });
            }
            if channels.is_empty() {
                continue;
            }
            let data = AnimationData {
                index,
                name: animation.name.as_deref(),
                channels,
            };
            self.host.create_animation(&data)?;
        }
        Ok(())
    }

    fn mesh_data(&mut self, node: usize, index: usize) -> Result<MeshData<'a, H::Handle>> {
        let asset = self.asset;
        let doc = asset.document();
        let mesh = &doc.meshes[index];

        let mut primitives = Vec::with_capacity(mesh.primitives.len());
        for primitive in &mesh.primitives {
            let material = match primitive.material {
                Some(material) => Some(self.material_handle(material)?),
                None => None,
            };

            let mut attributes = Vec::with_capacity(primitive.attributes.len());
            for (name, &accessor) in &primitive.attributes {
                attributes.push((Semantic::parse(name), asset.decode(accessor)?));
            }
            let indices = primitive.indices.map(|i| asset.decode(i)).transpose()?;

            let mut targets = Vec::with_capacity(primitive.targets.len());
            for target in &primitive.targets {
                let mut deltas = Vec::with_capacity(target.len());
                for (name, &accessor) in target {
                    deltas.push((Semantic::parse(name), asset.decode(accessor)?));
                }
                targets.push(deltas);
            }

            primitives.push(PrimitiveData {
                mode: primitive.mode,
                attributes,
                indices,
                material,
                targets,
            });
        }

        let node = &doc.nodes[node];
        let weights = if !node.weights.is_empty() {
            node.weights.clone()
        } else {
            mesh.weights.clone()
        };

        Ok(MeshData {
            index,
            name: mesh.name.as_deref(),
            primitives,
            weights,
        })
    }

    /// Materials are created on first reference and shared afterwards.
    fn material_handle(&mut self, index: usize) -> Result<H::Handle> {
        if let Some(&handle) = self.materials.get(&index) {
            return Ok(handle);
        }
        let data = material_data(self.asset, index);
        let handle = self.host.create_material(&data)?;
        self.materials.insert(index, handle);
        Ok(handle)
    }
}

fn material_data(asset: &Asset, index: usize) -> MaterialData<'_> {
    let doc = asset.document();
    let material = &doc.materials[index];
    let augment = asset.augment().materials.get(&index);

    let mut textures = HashMap::new();
    let pbr = &material.pbr_metallic_roughness;
    if let Some(info) = &pbr.base_color_texture {
        textures.insert(
            TextureSlot::BaseColor,
            texture_binding(asset, index, TextureSlot::BaseColor, info.index, info.tex_coord, 1.0),
        );
    }
    if let Some(info) = &pbr.metallic_roughness_texture {
        textures.insert(
            TextureSlot::MetallicRoughness,
            texture_binding(
                asset,
                index,
                TextureSlot::MetallicRoughness,
                info.index,
                info.tex_coord,
                1.0,
            ),
        );
    }
    if let Some(info) = &material.normal_texture {
        textures.insert(
            TextureSlot::Normal,
            texture_binding(asset, index, TextureSlot::Normal, info.index, info.tex_coord, info.scale),
        );
    }
    if let Some(info) = &material.occlusion_texture {
        textures.insert(
            TextureSlot::Occlusion,
            texture_binding(
                asset,
                index,
                TextureSlot::Occlusion,
                info.index,
                info.tex_coord,
                info.strength,
            ),
        );
    }
    if let Some(info) = &material.emissive_texture {
        textures.insert(
            TextureSlot::Emissive,
            texture_binding(asset, index, TextureSlot::Emissive, info.index, info.tex_coord, 1.0),
        );
    }

    MaterialData {
        index,
        material,
        textures,
        unlit: augment.is_some_and(|a| a.unlit),
        spec_gloss: augment.and_then(|a| a.spec_gloss.as_ref()),
    }
}

fn texture_binding(
    asset: &Asset,
    material: usize,
    slot: TextureSlot,
    texture: usize,
    tex_coord: usize,
    strength: f32,
) -> TextureBinding {
    let doc = asset.document();
    let augment = asset.augment();
    let source = &doc.textures[texture];

    let transform = augment.texture_transforms.get(&(material, slot)).cloned();
    let image = augment
        .texture_sources
        .get(&texture)
        .copied()
        .or(source.source);
    let tex_coord = transform
        .as_ref()
        .and_then(|t| t.tex_coord)
        .unwrap_or(tex_coord);
    let sampler = source
        .sampler
        .map(|s| doc.samplers[s].clone())
        .unwrap_or_default();

    TextureBinding {
        texture,
        image,
        tex_coord,
        sampler,
        transform,
        strength,
    }
}

/// Host events captured by [`RecordingHost`].
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Node {
        index: usize,
        parent: Option<usize>,
        world: Mat4,
    },
    Mesh {
        owner: usize,
        index: usize,
        primitives: usize,
    },
    Material {
        index: usize,
    },
    Camera {
        owner: usize,
        index: usize,
    },
    Light {
        owner: usize,
        index: usize,
    },
    Skin {
        owner: usize,
        index: usize,
        joints: usize,
    },
    Animation {
        index: usize,
        channels: usize,
    },
}

/// No-op host that records every call; the headless stand-in used by
/// tests and batch validation.
#[derive(Default)]
pub struct RecordingHost {
    pub events: Vec<Event>,
    next: usize,
}

impl RecordingHost {
    fn next_handle(&mut self) -> usize {
        let handle = self.next;
        self.next += 1;
        handle
    }

    /// Events of one variant, in emission order.
    pub fn filter<F: Fn(&Event) -> bool>(&self, f: F) -> Vec<&Event> {
        self.events.iter().filter(|e| f(e)).collect()
    }
}

impl SceneHost for RecordingHost {
    type Handle = usize;

    fn create_node(&mut self, node: &NodeData<'_>, parent: Option<usize>) -> Result<usize> {
        let handle = self.next_handle();
        self.events.push(Event::Node {
            index: node.index,
            parent,
            world: node.world,
        });
        Ok(handle)
    }

    fn create_mesh(&mut self, owner: usize, mesh: &MeshData<'_, usize>) -> Result<usize> {
        self.events.push(Event::Mesh {
            owner,
            index: mesh.index,
            primitives: mesh.primitives.len(),
        });
        Ok(self.next_handle())
    }

    fn create_material(&mut self, material: &MaterialData<'_>) -> Result<usize> {
        self.events.push(Event::Material {
            index: material.index,
        });
        Ok(self.next_handle())
    }

    fn create_camera(&mut self, owner: usize, camera: &CameraData<'_>) -> Result<usize> {
        self.events.push(Event::Camera {
            owner,
            index: camera.index,
        });
        Ok(self.next_handle())
    }

    fn create_light(&mut self, owner: usize, light: &LightData<'_>) -> Result<usize> {
        self.events.push(Event::Light {
            owner,
            index: light.index,
        });
        Ok(self.next_handle())
    }

    fn create_skin(&mut self, owner: usize, skin: &SkinData<'_, usize>) -> Result<usize> {
        self.events.push(Event::Skin {
            owner,
            index: skin.index,
            joints: skin.joints.len(),
        });
        Ok(self.next_handle())
    }

    fn create_animation(&mut self, animation: &AnimationData<'_, usize>) -> Result<usize> {
        self.events.push(Event::Animation {
            index: animation.index,
            channels: animation.channels.len(),
        });
        Ok(self.next_handle())
    }
}
