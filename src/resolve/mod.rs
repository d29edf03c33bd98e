//! Reference resolution and validation.
//!
//! Runs after parsing and before any decoding: every index reference in
//! the document is range-checked, the node hierarchy is proven to be an
//! acyclic forest, the two transform representations are collapsed into
//! one tagged [`Transform`], and skins and animation channels are checked
//! for internal consistency. Downstream components (decoder, extension
//! dispatcher, scene builder) rely on these invariants and perform no
//! index validation of their own.

use glam::{Mat4, Quat, Vec3};
use smallvec::{smallvec, SmallVec};
use tracing::debug;

use crate::document::{CameraKind, Document, Node, TargetPath};
use crate::util::{ComponentType, ElementType, EntityKind, EntityRef, Error, Result};

/// A node's local transform, one representation or the other.
///
/// The source format allows `matrix` and TRS fields independently; a
/// node carrying both is rejected during resolution rather than given
/// an arbitrary precedence.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Transform {
    Trs {
        translation: Vec3,
        rotation: Quat,
        scale: Vec3,
    },
    Matrix(Mat4),
}

impl Transform {
    pub const IDENTITY: Self = Self::Trs {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Collapse to a 4x4 column-major matrix.
    pub fn matrix(&self) -> Mat4 {
        match *self {
            Self::Trs {
                translation,
                rotation,
                scale,
            } => Mat4::from_scale_rotation_translation(scale, rotation, translation),
            Self::Matrix(m) => m,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Validated view of the node hierarchy.
#[derive(Debug)]
pub struct Graph {
    /// Parent node index, `None` for roots.
    parent: Vec<Option<usize>>,
    /// Per-node local transform.
    transform: Vec<Transform>,
}

impl Graph {
    /// Parent of `node`, if any.
    #[inline]
    pub fn parent(&self, node: usize) -> Option<usize> {
        self.parent[node]
    }

    /// Local transform of `node`.
    #[inline]
    pub fn transform(&self, node: usize) -> Transform {
        self.transform[node]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Ancestor chain of `node`, nearest first, excluding the node itself.
    pub fn ancestors(&self, node: usize) -> Ancestors<'_> {
        Ancestors {
            graph: self,
            next: self.parent[node],
        }
    }
}

/// Iterator over a node's ancestor chain. Guaranteed finite once the
/// graph has passed cycle detection.
pub struct Ancestors<'a> {
    graph: &'a Graph,
    next: Option<usize>,
}

impl Iterator for Ancestors<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let current = self.next?;
        self.next = self.graph.parent[current];
        Some(current)
    }
}

/// Validate every cross reference in the document and build the [`Graph`].
pub fn resolve(doc: &Document) -> Result<Graph> {
    check_buffer_views(doc)?;
    check_accessors(doc)?;
    check_images_and_textures(doc)?;
    check_materials(doc)?;
    check_meshes(doc)?;
    check_cameras(doc)?;
    check_node_references(doc)?;
    check_scenes(doc)?;

    let parent = build_forest(doc)?;
    detect_cycles(doc)?;
    let transform = node_transforms(doc)?;

    check_skins(doc)?;
    check_animations(doc)?;

    debug!(
        nodes = doc.nodes.len(),
        roots = parent.iter().filter(|p| p.is_none()).count(),
        "hierarchy resolved"
    );

    Ok(Graph { parent, transform })
}

/// Range-check one index reference.
fn check(doc: &Document, from: EntityRef, target: EntityKind, index: usize) -> Result<()> {
    let len = doc.entity_len(target);
    if index >= len {
        return Err(Error::schema(
            from,
            format!("{target}[{index}] is out of range (len {len})"),
        ));
    }
    Ok(())
}

fn check_buffer_views(doc: &Document) -> Result<()> {
    for (i, view) in doc.buffer_views.iter().enumerate() {
        let from = EntityRef::new(EntityKind::BufferView, i);
        check(doc, from, EntityKind::Buffer, view.buffer)?;
        if view.byte_stride.is_some_and(|s| s == 0 || s > 252) {
            return Err(Error::schema(from, "byteStride outside 1..=252"));
        }
    }
    Ok(())
}

fn check_accessors(doc: &Document) -> Result<()> {
    for (i, accessor) in doc.accessors.iter().enumerate() {
        let from = EntityRef::new(EntityKind::Accessor, i);
        if let Some(view) = accessor.buffer_view {
            check(doc, from, EntityKind::BufferView, view)?;
        }
        match &accessor.sparse {
            Some(sparse) => {
                check(doc, from, EntityKind::BufferView, sparse.indices.buffer_view)?;
                check(doc, from, EntityKind::BufferView, sparse.values.buffer_view)?;
                if !sparse.indices.component_type.is_unsigned_int() {
                    return Err(Error::schema(
                        from,
                        format!(
                            "sparse indices must be unsigned, got {}",
                            sparse.indices.component_type
                        ),
                    ));
                }
                if sparse.count > accessor.count {
                    return Err(Error::schema(
                        from,
                        format!(
                            "sparse count {} exceeds element count {}",
                            sparse.count, accessor.count
                        ),
                    ));
                }
            }
            None => {
                if accessor.buffer_view.is_none() {
                    return Err(Error::schema(from, "neither bufferView nor sparse data"));
                }
            }
        }
    }
    Ok(())
}

fn check_images_and_textures(doc: &Document) -> Result<()> {
    for (i, image) in doc.images.iter().enumerate() {
        let from = EntityRef::new(EntityKind::Image, i);
        if let Some(view) = image.buffer_view {
            check(doc, from, EntityKind::BufferView, view)?;
            if image.mime_type.is_none() {
                return Err(Error::schema(from, "bufferView image requires mimeType"));
            }
        } else if image.uri.is_none() {
            return Err(Error::schema(from, "image has neither uri nor bufferView"));
        }
    }
    for (i, texture) in doc.textures.iter().enumerate() {
        let from = EntityRef::new(EntityKind::Texture, i);
        if let Some(sampler) = texture.sampler {
            check(doc, from, EntityKind::Sampler, sampler)?;
        }
        if let Some(source) = texture.source {
            check(doc, from, EntityKind::Image, source)?;
        }
    }
    Ok(())
}

fn check_materials(doc: &Document) -> Result<()> {
    for (i, material) in doc.materials.iter().enumerate() {
        let from = EntityRef::new(EntityKind::Material, i);
        let pbr = &material.pbr_metallic_roughness;
        for info in [&pbr.base_color_texture, &pbr.metallic_roughness_texture, &material.emissive_texture]
            .into_iter()
            .flatten()
        {
            check(doc, from, EntityKind::Texture, info.index)?;
        }
        if let Some(info) = &material.normal_texture {
            check(doc, from, EntityKind::Texture, info.index)?;
        }
        if let Some(info) = &material.occlusion_texture {
            check(doc, from, EntityKind::Texture, info.index)?;
        }
    }
    Ok(())
}

fn check_meshes(doc: &Document) -> Result<()> {
    for (i, mesh) in doc.meshes.iter().enumerate() {
        let from = EntityRef::new(EntityKind::Mesh, i);
        if mesh.primitives.is_empty() {
            return Err(Error::schema(from, "mesh has no primitives"));
        }
        let target_count = mesh.primitives[0].targets.len();
        for (pi, primitive) in mesh.primitives.iter().enumerate() {
            if primitive.attributes.is_empty() {
                return Err(Error::schema(
                    from,
                    format!("primitive {pi} has no attributes"),
                ));
            }
            let mut element_count = None;
            for (&index, name) in primitive
                .attributes
                .iter()
                .map(|(name, index)| (index, name.as_str()))
            {
                check(doc, from, EntityKind::Accessor, index)?;
                let count = doc.accessors[index].count;
                match element_count {
                    None => element_count = Some(count),
                    Some(expected) if expected != count => {
                        return Err(Error::schema(
                            from,
                            format!(
                                "primitive {pi} attribute {name} has {count} elements, expected {expected}"
                            ),
                        ));
                    }
                    Some(_) => {}
                }
            }
            if let Some(indices) = primitive.indices {
                check(doc, from, EntityKind::Accessor, indices)?;
                let accessor = &doc.accessors[indices];
                if accessor.element_type != ElementType::Scalar
                    || !accessor.component_type.is_unsigned_int()
                {
                    return Err(Error::schema(
                        from,
                        format!("primitive {pi} indices must be unsigned scalars"),
                    ));
                }
            }
            if let Some(material) = primitive.material {
                check(doc, from, EntityKind::Material, material)?;
            }
            if primitive.targets.len() != target_count {
                return Err(Error::schema(
                    from,
                    format!(
                        "primitive {pi} has {} morph targets, expected {target_count}",
                        primitive.targets.len()
                    ),
                ));
            }
            for target in &primitive.targets {
                for &index in target.values() {
                    check(doc, from, EntityKind::Accessor, index)?;
                }
            }
        }
        if !mesh.weights.is_empty() && mesh.weights.len() != target_count {
            return Err(Error::schema(
                from,
                format!(
                    "{} morph weights for {target_count} targets",
                    mesh.weights.len()
                ),
            ));
        }
    }
    Ok(())
}

fn check_cameras(doc: &Document) -> Result<()> {
    for (i, camera) in doc.cameras.iter().enumerate() {
        let from = EntityRef::new(EntityKind::Camera, i);
        let ok = match camera.kind {
            CameraKind::Perspective => camera.perspective.is_some(),
            CameraKind::Orthographic => camera.orthographic.is_some(),
        };
        if !ok {
            return Err(Error::schema(from, "camera type has no matching projection"));
        }
    }
    Ok(())
}

fn check_node_references(doc: &Document) -> Result<()> {
    for (i, node) in doc.nodes.iter().enumerate() {
        let from = EntityRef::new(EntityKind::Node, i);
        for &child in &node.children {
            check(doc, from, EntityKind::Node, child)?;
        }
        if let Some(mesh) = node.mesh {
            check(doc, from, EntityKind::Mesh, mesh)?;
        }
        if let Some(camera) = node.camera {
            check(doc, from, EntityKind::Camera, camera)?;
        }
        if let Some(skin) = node.skin {
            check(doc, from, EntityKind::Skin, skin)?;
            if node.mesh.is_none() {
                return Err(Error::schema(from, "skin on a node without a mesh"));
            }
        }
        if !node.weights.is_empty() {
            let targets = node
                .mesh
                .map_or(0, |m| doc.meshes[m].morph_target_count());
            if node.weights.len() != targets {
                return Err(Error::schema(
                    from,
                    format!("{} morph weights for {targets} targets", node.weights.len()),
                ));
            }
        }
    }
    Ok(())
}

fn check_scenes(doc: &Document) -> Result<()> {
    for (i, scene) in doc.scenes.iter().enumerate() {
        let from = EntityRef::new(EntityKind::Scene, i);
        for &root in &scene.nodes {
            check(doc, from, EntityKind::Node, root)?;
        }
    }
    if let Some(scene) = doc.scene {
        check(doc, EntityRef::asset(), EntityKind::Scene, scene)?;
    }
    Ok(())
}

/// Build the parent map, rejecting nodes claimed by more than one parent.
fn build_forest(doc: &Document) -> Result<Vec<Option<usize>>> {
    let mut parent = vec![None; doc.nodes.len()];
    for (i, node) in doc.nodes.iter().enumerate() {
        for &child in &node.children {
            if parent[child].is_some() {
                return Err(Error::schema(
                    EntityRef::new(EntityKind::Node, child),
                    "node is a child of more than one parent",
                ));
            }
            parent[child] = Some(i);
        }
    }
    Ok(parent)
}

#[derive(Clone, Copy, PartialEq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Three-color depth-first sweep over parent→child edges.
///
/// Every node is visited exactly once, so a back-edge is found in
/// O(nodes + edges) and a cyclic document can never hang the import.
/// An explicit stack keeps arbitrarily deep (or adversarial) documents
/// from overflowing the call stack.
fn detect_cycles(doc: &Document) -> Result<()> {
    let mut color = vec![Color::White; doc.nodes.len()];
    for start in 0..doc.nodes.len() {
        if color[start] != Color::White {
            continue;
        }
        color[start] = Color::Gray;
        let mut stack: SmallVec<[(usize, usize); 32]> = smallvec![(start, 0)];
        while let Some(&mut (node, ref mut cursor)) = stack.last_mut() {
            let children = &doc.nodes[node].children;
            if *cursor < children.len() {
                let child = children[*cursor];
                *cursor += 1;
                match color[child] {
                    Color::Gray => {
                        return Err(Error::CyclicHierarchy {
                            entity: EntityRef::new(EntityKind::Node, child),
                        });
                    }
                    Color::White => {
                        color[child] = Color::Gray;
                        stack.push((child, 0));
                    }
                    Color::Black => {}
                }
            } else {
                color[node] = Color::Black;
                stack.pop();
            }
        }
    }
    Ok(())
}

/// Collapse each node's raw transform fields into a tagged [`Transform`].
fn node_transforms(doc: &Document) -> Result<Vec<Transform>> {
    doc.nodes
        .iter()
        .enumerate()
        .map(|(i, node)| node_transform(node, i))
        .collect()
}

fn node_transform(node: &Node, index: usize) -> Result<Transform> {
    if let Some(m) = node.matrix {
        if node.has_trs() {
            return Err(Error::schema(
                EntityRef::new(EntityKind::Node, index),
                "matrix and TRS transforms are mutually exclusive",
            ));
        }
        return Ok(Transform::Matrix(Mat4::from_cols_array(&m)));
    }
    Ok(Transform::Trs {
        translation: node.translation.map_or(Vec3::ZERO, Vec3::from),
        rotation: node
            .rotation
            .map_or(Quat::IDENTITY, |[x, y, z, w]| Quat::from_xyzw(x, y, z, w)),
        scale: node.scale.map_or(Vec3::ONE, Vec3::from),
    })
}

fn check_skins(doc: &Document) -> Result<()> {
    for (i, skin) in doc.skins.iter().enumerate() {
        let from = EntityRef::new(EntityKind::Skin, i);
        if skin.joints.is_empty() {
            return Err(Error::schema(from, "skin has no joints"));
        }
        for &joint in &skin.joints {
            check(doc, from, EntityKind::Node, joint)?;
        }
        if let Some(skeleton) = skin.skeleton {
            check(doc, from, EntityKind::Node, skeleton)?;
        }
        if let Some(ibm) = skin.inverse_bind_matrices {
            check(doc, from, EntityKind::Accessor, ibm)?;
            let accessor = &doc.accessors[ibm];
            if accessor.element_type != ElementType::Mat4
                || accessor.component_type != ComponentType::Float
            {
                return Err(Error::schema(
                    from,
                    "inverse bind matrices must be float MAT4",
                ));
            }
            if accessor.count != skin.joints.len() {
                return Err(Error::SkinMismatch {
                    entity: from,
                    message: format!(
                        "{} inverse bind matrices for {} joints",
                        accessor.count,
                        skin.joints.len()
                    ),
                });
            }
        }
    }
    Ok(())
}

fn check_animations(doc: &Document) -> Result<()> {
    for (i, animation) in doc.animations.iter().enumerate() {
        let from = EntityRef::new(EntityKind::Animation, i);
        for (si, sampler) in animation.samplers.iter().enumerate() {
            check(doc, from, EntityKind::Accessor, sampler.input)?;
            check(doc, from, EntityKind::Accessor, sampler.output)?;
            let input = &doc.accessors[sampler.input];
            if input.element_type != ElementType::Scalar
                || input.component_type != ComponentType::Float
            {
                return Err(Error::schema(
                    from,
                    format!("sampler {si} input must be float scalars"),
                ));
            }
        }
        for (ci, channel) in animation.channels.iter().enumerate() {
            if channel.sampler >= animation.samplers.len() {
                return Err(Error::schema(
                    from,
                    format!(
                        "channel {ci} sampler {} is out of range (len {})",
                        channel.sampler,
                        animation.samplers.len()
                    ),
                ));
            }
            let Some(node) = channel.target.node else {
                continue;
            };
            check(doc, from, EntityKind::Node, node)?;
            if channel.target.path == TargetPath::Weights {
                let targets = doc.nodes[node]
                    .mesh
                    .map_or(0, |m| doc.meshes[m].morph_target_count());
                if targets == 0 {
                    return Err(Error::InvalidAnimationTarget {
                        entity: from,
                        message: format!(
                            "channel {ci} targets weights on nodes[{node}], whose mesh has no morph targets"
                        ),
                    });
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::ErrorKind;

    fn doc(json: &str) -> Document {
        Document::from_json(json).unwrap()
    }

    #[test]
    fn test_empty_document_resolves() {
        let d = doc(r#"{"asset": {"version": "2.0"}}"#);
        let graph = resolve(&d).unwrap();
        assert!(graph.is_empty());
    }

    #[test]
    fn test_parent_map_and_ancestors() {
        let d = doc(
            r#"{"asset": {"version": "2.0"},
                "nodes": [{"children": [1]}, {"children": [2]}, {}]}"#,
        );
        let graph = resolve(&d).unwrap();
        assert_eq!(graph.parent(0), None);
        assert_eq!(graph.parent(2), Some(1));
        let chain: Vec<usize> = graph.ancestors(2).collect();
        assert_eq!(chain, vec![1, 0]);
    }

    #[test]
    fn test_cycle_detected() {
        // 0 -> 1 -> 2 -> 0
        let d = doc(
            r#"{"asset": {"version": "2.0"},
                "nodes": [{"children": [1]}, {"children": [2]}, {"children": [0]}]}"#,
        );
        let err = resolve(&d).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CyclicHierarchy);
    }

    #[test]
    fn test_self_cycle_detected() {
        let d = doc(r#"{"asset": {"version": "2.0"}, "nodes": [{"children": [0]}]}"#);
        let err = resolve(&d).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CyclicHierarchy);
        assert_eq!(err.location().unwrap().index, 0);
    }

    #[test]
    fn test_diamond_rejected() {
        // Two parents both claim node 2
        let d = doc(
            r#"{"asset": {"version": "2.0"},
                "nodes": [{"children": [2]}, {"children": [2]}, {}]}"#,
        );
        let err = resolve(&d).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaViolation);
        assert_eq!(err.location().unwrap().index, 2);
    }

    #[test]
    fn test_dangling_child_index() {
        let d = doc(r#"{"asset": {"version": "2.0"}, "nodes": [{"children": [5]}]}"#);
        let err = resolve(&d).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaViolation);
        assert_eq!(err.location().unwrap().kind, EntityKind::Node);
    }

    #[test]
    fn test_matrix_and_trs_conflict() {
        let d = doc(
            r#"{"asset": {"version": "2.0"},
                "nodes": [{
                    "matrix": [1,0,0,0, 0,1,0,0, 0,0,1,0, 0,0,0,1],
                    "translation": [1, 2, 3]
                }]}"#,
        );
        let err = resolve(&d).unwrap_err();
        assert!(err.to_string().contains("mutually exclusive"));
    }

    #[test]
    fn test_transform_defaults_to_identity() {
        let d = doc(r#"{"asset": {"version": "2.0"}, "nodes": [{}]}"#);
        let graph = resolve(&d).unwrap();
        assert_eq!(graph.transform(0), Transform::IDENTITY);
        assert_eq!(graph.transform(0).matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn test_skin_ibm_count_mismatch() {
        let d = doc(
            r#"{"asset": {"version": "2.0"},
                "nodes": [{"mesh": 0, "skin": 0}, {}, {}],
                "meshes": [{"primitives": [{"attributes": {"POSITION": 1}}]}],
                "buffers": [{"byteLength": 112}],
                "bufferViews": [{"buffer": 0, "byteLength": 112}],
                "accessors": [
                    {"bufferView": 0, "componentType": 5126, "count": 1, "type": "MAT4"},
                    {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "byteOffset": 64}
                ],
                "skins": [{"joints": [1, 2], "inverseBindMatrices": 0}]}"#,
        );
        let err = resolve(&d).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SkinMismatch);
        assert!(err.to_string().contains("1 inverse bind matrices for 2 joints"));
    }

    #[test]
    fn test_weights_target_without_morphs() {
        let d = doc(
            r#"{"asset": {"version": "2.0"},
                "nodes": [{"mesh": 0}],
                "meshes": [{"primitives": [{"attributes": {"POSITION": 0}}]}],
                "buffers": [{"byteLength": 36}],
                "bufferViews": [{"buffer": 0, "byteLength": 36}],
                "accessors": [
                    {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3"},
                    {"bufferView": 0, "componentType": 5126, "count": 2, "type": "SCALAR"},
                    {"bufferView": 0, "componentType": 5126, "count": 2, "type": "VEC3"}
                ],
                "animations": [{
                    "samplers": [{"input": 1, "output": 2}],
                    "channels": [{"sampler": 0, "target": {"node": 0, "path": "weights"}}]
                }]}"#,
        );
        let err = resolve(&d).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidAnimationTarget);
    }

    #[test]
    fn test_animation_input_must_be_float_scalar() {
        let d = doc(
            r#"{"asset": {"version": "2.0"},
                "nodes": [{}],
                "buffers": [{"byteLength": 64}],
                "bufferViews": [{"buffer": 0, "byteLength": 64}],
                "accessors": [
                    {"bufferView": 0, "componentType": 5123, "count": 2, "type": "SCALAR"},
                    {"bufferView": 0, "componentType": 5126, "count": 2, "type": "VEC3"}
                ],
                "animations": [{
                    "samplers": [{"input": 0, "output": 1}],
                    "channels": [{"sampler": 0, "target": {"node": 0, "path": "translation"}}]
                }]}"#,
        );
        let err = resolve(&d).unwrap_err();
        assert!(err.to_string().contains("input must be float scalars"));
    }

    #[test]
    fn test_accessor_without_view_or_sparse() {
        let d = doc(
            r#"{"asset": {"version": "2.0"},
                "accessors": [{"componentType": 5126, "count": 4, "type": "VEC3"}]}"#,
        );
        let err = resolve(&d).unwrap_err();
        assert!(err.to_string().contains("neither bufferView nor sparse"));
    }

    #[test]
    fn test_primitive_attribute_counts_must_agree() {
        let d = doc(
            r#"{"asset": {"version": "2.0"},
                "buffers": [{"byteLength": 100}],
                "bufferViews": [{"buffer": 0, "byteLength": 100}],
                "accessors": [
                    {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3"},
                    {"bufferView": 0, "componentType": 5126, "count": 4, "type": "VEC3"}
                ],
                "meshes": [{"primitives": [{"attributes": {"POSITION": 0, "NORMAL": 1}}]}]}"#,
        );
        let err = resolve(&d).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaViolation);
    }
}
