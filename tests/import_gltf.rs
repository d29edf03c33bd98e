//! Full-pipeline integration tests over in-memory documents.

use gltf_import::document::TargetPath;
use gltf_import::glb::{CHUNK_BIN, CHUNK_JSON, GLB_MAGIC, GLB_VERSION};
use gltf_import::scene::Event;
use gltf_import::{Asset, ErrorKind, RecordingHost};

/// Assemble a binary container from a JSON document and optional blob.
fn build_glb(json: &str, bin: Option<&[u8]>) -> Vec<u8> {
    fn push_chunk(out: &mut Vec<u8>, kind: u32, payload: &[u8], pad: u8) {
        let padded = (payload.len() + 3) & !3;
        out.extend_from_slice(&(padded as u32).to_le_bytes());
        out.extend_from_slice(&kind.to_le_bytes());
        out.extend_from_slice(payload);
        out.resize(out.len() + (padded - payload.len()), pad);
    }

    let mut out = Vec::new();
    out.extend_from_slice(&GLB_MAGIC);
    out.extend_from_slice(&GLB_VERSION.to_le_bytes());
    out.extend_from_slice(&[0u8; 4]);
    push_chunk(&mut out, CHUNK_JSON, json.as_bytes(), b' ');
    if let Some(bin) = bin {
        push_chunk(&mut out, CHUNK_BIN, bin, 0);
    }
    let total = out.len() as u32;
    out[8..12].copy_from_slice(&total.to_le_bytes());
    out
}

/// Triangle positions (3 x VEC3 f32) followed by u16 indices [0, 1, 2].
fn triangle_bin() -> Vec<u8> {
    let mut bin = Vec::new();
    for v in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
        bin.extend_from_slice(&v.to_le_bytes());
    }
    for i in [0u16, 1, 2] {
        bin.extend_from_slice(&i.to_le_bytes());
    }
    bin
}

const TRIANGLE_JSON: &str = r#"{
    "asset": {"version": "2.0"},
    "scene": 0,
    "scenes": [{"nodes": [0]}],
    "nodes": [{"mesh": 0, "name": "tri"}],
    "meshes": [{"primitives": [{"attributes": {"POSITION": 0}, "indices": 1, "material": 0}]}],
    "materials": [{"pbrMetallicRoughness": {"baseColorFactor": [1, 0, 0, 1]}}],
    "buffers": [{"byteLength": 42}],
    "bufferViews": [
        {"buffer": 0, "byteLength": 36},
        {"buffer": 0, "byteOffset": 36, "byteLength": 6}
    ],
    "accessors": [
        {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3"},
        {"bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR"}
    ]
}"#;

#[test]
fn imports_binary_container_end_to_end() {
    let glb = build_glb(TRIANGLE_JSON, Some(&triangle_bin()));
    let asset = Asset::from_slice(&glb).unwrap();

    let positions = asset.decode(0).unwrap();
    assert_eq!(
        positions.as_f32().unwrap(),
        &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]
    );
    let indices = asset.decode(1).unwrap();
    assert_eq!(indices.to_u32().unwrap(), vec![0, 1, 2]);

    let mut host = RecordingHost::default();
    asset.build_default_scene(&mut host).unwrap();
    assert!(matches!(host.events[0], Event::Node { index: 0, parent: None, .. }));
    assert!(host
        .events
        .iter()
        .any(|e| matches!(e, Event::Material { index: 0 })));
    assert!(host
        .events
        .iter()
        .any(|e| matches!(e, Event::Mesh { index: 0, primitives: 1, .. })));
}

#[test]
fn imports_bare_json_with_data_uri() {
    let json = r#"{
        "asset": {"version": "2.0"},
        "scene": 0,
        "scenes": [{"nodes": [0]}],
        "nodes": [{"mesh": 0}],
        "meshes": [{"primitives": [{"attributes": {"POSITION": 0, "COLOR_0": 1}}]}],
        "buffers": [{
            "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAA/wCA/wD/AP////8A",
            "byteLength": 48
        }],
        "bufferViews": [
            {"buffer": 0, "byteLength": 36},
            {"buffer": 0, "byteOffset": 36, "byteLength": 12}
        ],
        "accessors": [
            {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3"},
            {"bufferView": 1, "componentType": 5121, "count": 3, "type": "VEC4", "normalized": true}
        ]
    }"#;
    let asset = Asset::from_slice(json.as_bytes()).unwrap();

    // Normalized u8 colors: 255 -> 1.0, 0 -> 0.0
    let colors = asset.decode(1).unwrap();
    let c = colors.as_f32().unwrap();
    assert_eq!(c[0], 1.0);
    assert_eq!(c[1], 0.0);
    assert_eq!(c[3], 1.0);
    assert_eq!(c[15], 0.0);

    let mut host = RecordingHost::default();
    asset.build_default_scene(&mut host).unwrap();
    assert_eq!(
        host.filter(|e| matches!(e, Event::Mesh { .. })).len(),
        1
    );
}

#[test]
fn two_binary_chunks_fail_before_json_parse() {
    // The JSON chunk is deliberately invalid: the container error must
    // win because chunk framing is checked before any JSON parsing.
    let mut glb = build_glb("{not json", Some(&[1, 2, 3, 4]));
    let extra = build_glb("{}", Some(&[5, 6, 7, 8]));
    // Append the second container's BIN chunk and fix up the length
    glb.extend_from_slice(&extra[extra.len() - 12..]);
    let total = glb.len() as u32;
    glb[8..12].copy_from_slice(&total.to_le_bytes());

    let err = Asset::from_slice(&glb).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedContainer);
    assert!(err.to_string().contains("more than one binary chunk"));
}

#[test]
fn required_extension_without_handler_aborts() {
    let json = r#"{
        "asset": {"version": "2.0"},
        "extensionsRequired": ["KHR_draco_mesh_compression"],
        "extensionsUsed": ["KHR_draco_mesh_compression"],
        "scenes": [{"nodes": []}],
        "scene": 0
    }"#;
    let err = Asset::from_slice(json.as_bytes()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedRequiredExtension);
}

#[test]
fn cyclic_hierarchy_is_rejected() {
    let json = r#"{
        "asset": {"version": "2.0"},
        "nodes": [{"children": [1]}, {"children": [2]}, {"children": [0]}],
        "scenes": [{"nodes": [0]}]
    }"#;
    let err = Asset::from_slice(json.as_bytes()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CyclicHierarchy);
}

#[test]
fn sparse_accessor_through_pipeline() {
    let json = r#"{
        "asset": {"version": "2.0"},
        "buffers": [{
            "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAQAEAAAAIEEAACBC",
            "byteLength": 36
        }],
        "bufferViews": [
            {"buffer": 0, "byteLength": 24},
            {"buffer": 0, "byteOffset": 24, "byteLength": 4},
            {"buffer": 0, "byteOffset": 28, "byteLength": 8}
        ],
        "accessors": [{
            "bufferView": 0, "componentType": 5126, "count": 6, "type": "SCALAR",
            "sparse": {
                "count": 2,
                "indices": {"bufferView": 1, "componentType": 5123},
                "values": {"bufferView": 2}
            }
        }]
    }"#;
    let asset = Asset::from_slice(json.as_bytes()).unwrap();
    let decoded = asset.decode(0).unwrap();
    assert_eq!(decoded.as_f32().unwrap(), &[0.0, 10.0, 0.0, 0.0, 40.0, 0.0]);

    // Decoding twice returns the identical cached allocation
    let again = asset.decode(0).unwrap();
    assert!(std::sync::Arc::ptr_eq(&decoded, &again));
}

#[test]
fn weights_channel_without_morph_targets_is_rejected() {
    let json = r#"{
        "asset": {"version": "2.0"},
        "nodes": [{"mesh": 0}],
        "meshes": [{"primitives": [{"attributes": {"POSITION": 0}}]}],
        "buffers": [{
            "uri": "data:application/octet-stream;base64,AAAAAAAAgD8AAAAAAAAAAAAAAAAAAIA/AACAPwAAgD8=",
            "byteLength": 32
        }],
        "bufferViews": [
            {"buffer": 0, "byteLength": 8},
            {"buffer": 0, "byteOffset": 8, "byteLength": 24}
        ],
        "accessors": [
            {"bufferView": 1, "componentType": 5126, "count": 2, "type": "VEC3"},
            {"bufferView": 0, "componentType": 5126, "count": 2, "type": "SCALAR"}
        ],
        "animations": [{
            "samplers": [{"input": 1, "output": 0}],
            "channels": [{"sampler": 0, "target": {"node": 0, "path": "weights"}}]
        }]
    }"#;
    let err = Asset::from_slice(json.as_bytes()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidAnimationTarget);
}

#[test]
fn lights_attach_to_nodes() {
    let json = r#"{
        "asset": {"version": "2.0"},
        "extensionsUsed": ["KHR_lights_punctual"],
        "extensions": {"KHR_lights_punctual": {"lights": [
            {"type": "directional", "intensity": 3.0},
            {"type": "spot", "spot": {}}
        ]}},
        "scene": 0,
        "scenes": [{"nodes": [0, 1]}],
        "nodes": [
            {"extensions": {"KHR_lights_punctual": {"light": 1}}},
            {}
        ]
    }"#;
    let asset = Asset::from_slice(json.as_bytes()).unwrap();
    assert_eq!(asset.augment().lights.len(), 2);

    let mut host = RecordingHost::default();
    asset.build_default_scene(&mut host).unwrap();
    let lights = host.filter(|e| matches!(e, Event::Light { .. }));
    assert_eq!(lights.len(), 1);
    assert!(matches!(lights[0], Event::Light { owner: 0, index: 1 }));
}

#[test]
fn skins_and_animations_follow_nodes() {
    let json = r#"{
        "asset": {"version": "2.0"},
        "scene": 0,
        "scenes": [{"nodes": [0, 1, 2]}],
        "nodes": [
            {"mesh": 0, "skin": 0},
            {"name": "jointA", "children": []},
            {"name": "jointB"}
        ],
        "meshes": [{"primitives": [{"attributes": {"POSITION": 2}}]}],
        "skins": [{"joints": [1, 2], "inverseBindMatrices": 3}],
        "buffers": [
            {
                "uri": "data:application/octet-stream;base64,AAAAAAAAgD8AAAAAAAAAAAAAAAAAAIA/AACAPwAAgD8=",
                "byteLength": 32
            },
            {
                "uri": "data:application/octet-stream;base64,AACAPwAAAAAAAAAAAAAAAAAAAAAAAIA/AAAAAAAAAAAAAAAAAAAAAAAAgD8AAAAAAAAAAAAAAAAAAAAAAACAPwAAgD8AAAAAAAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAAAAAAIA/AAAAAAAAAAAAAAAAAAAAAAAAgD8=",
                "byteLength": 128
            }
        ],
        "bufferViews": [
            {"buffer": 0, "byteLength": 8},
            {"buffer": 0, "byteOffset": 8, "byteLength": 24},
            {"buffer": 1, "byteLength": 128}
        ],
        "accessors": [
            {"bufferView": 0, "componentType": 5126, "count": 2, "type": "SCALAR"},
            {"bufferView": 1, "componentType": 5126, "count": 2, "type": "VEC3"},
            {"bufferView": 1, "componentType": 5126, "count": 2, "type": "VEC3"},
            {"bufferView": 2, "componentType": 5126, "count": 2, "type": "MAT4"}
        ],
        "animations": [{
            "name": "wave",
            "samplers": [{"input": 0, "output": 1, "interpolation": "LINEAR"}],
            "channels": [{"sampler": 0, "target": {"node": 1, "path": "translation"}}]
        }]
    }"#;
    let asset = Asset::from_slice(json.as_bytes()).unwrap();
    let mut host = RecordingHost::default();
    asset.build_default_scene(&mut host).unwrap();

    let node_count = host.filter(|e| matches!(e, Event::Node { .. })).len();
    assert_eq!(node_count, 3);

    // Skin comes after every node and carries both joints
    let skin_pos = host
        .events
        .iter()
        .position(|e| matches!(e, Event::Skin { joints: 2, .. }))
        .expect("skin event");
    let last_node_pos = host
        .events
        .iter()
        .rposition(|e| matches!(e, Event::Node { .. }))
        .unwrap();
    assert!(skin_pos > last_node_pos);

    let animations = host.filter(|e| matches!(e, Event::Animation { .. }));
    assert_eq!(animations.len(), 1);
    assert!(matches!(
        animations[0],
        Event::Animation { index: 0, channels: 1 }
    ));
}

#[test]
fn animation_data_reaches_host_decoded() {
    use gltf_import::scene::{
        AnimationData, CameraData, LightData, MaterialData, MeshData, NodeData, SceneHost,
        SkinData,
    };
    use gltf_import::Result;

    #[derive(Default)]
    struct AnimHost {
        times: Vec<f32>,
        paths: Vec<TargetPath>,
    }

    impl SceneHost for AnimHost {
        type Handle = u32;

        fn create_node(&mut self, _: &NodeData<'_>, _: Option<u32>) -> Result<u32> {
            Ok(0)
        }
        fn create_mesh(&mut self, _: u32, _: &MeshData<'_, u32>) -> Result<u32> {
            Ok(0)
        }
        fn create_material(&mut self, _: &MaterialData<'_>) -> Result<u32> {
            Ok(0)
        }
        fn create_camera(&mut self, _: u32, _: &CameraData<'_>) -> Result<u32> {
            Ok(0)
        }
        fn create_light(&mut self, _: u32, _: &LightData<'_>) -> Result<u32> {
            Ok(0)
        }
        fn create_skin(&mut self, _: u32, _: &SkinData<'_, u32>) -> Result<u32> {
            Ok(0)
        }
        fn create_animation(&mut self, animation: &AnimationData<'_, u32>) -> Result<u32> {
            for channel in &animation.channels {
                self.times.extend(channel.input.as_f32().unwrap());
                self.paths.push(channel.path);
            }
            Ok(0)
        }
    }

    let json = r#"{
        "asset": {"version": "2.0"},
        "scene": 0,
        "scenes": [{"nodes": [0]}],
        "nodes": [{}],
        "buffers": [{
            "uri": "data:application/octet-stream;base64,AAAAAAAAgD8AAAAAAAAAAAAAAAAAAIA/AACAPwAAgD8=",
            "byteLength": 32
        }],
        "bufferViews": [
            {"buffer": 0, "byteLength": 8},
            {"buffer": 0, "byteOffset": 8, "byteLength": 24}
        ],
        "accessors": [
            {"bufferView": 0, "componentType": 5126, "count": 2, "type": "SCALAR"},
            {"bufferView": 1, "componentType": 5126, "count": 2, "type": "VEC3"}
        ],
        "animations": [{
            "samplers": [{"input": 0, "output": 1}],
            "channels": [{"sampler": 0, "target": {"node": 0, "path": "translation"}}]
        }]
    }"#;
    let asset = Asset::from_slice(json.as_bytes()).unwrap();
    let mut host = AnimHost::default();
    asset.build_default_scene(&mut host).unwrap();
    assert_eq!(host.times, vec![0.0, 1.0]);
    assert_eq!(host.paths, vec![TargetPath::Translation]);
}

#[test]
fn morph_targets_reach_host() {
    let json = r#"{
        "asset": {"version": "2.0"},
        "scene": 0,
        "scenes": [{"nodes": [0]}],
        "nodes": [{"mesh": 0}],
        "meshes": [{
            "weights": [0.5, 0.5],
            "primitives": [{
                "attributes": {"POSITION": 0},
                "targets": [{"POSITION": 1}, {"POSITION": 2}]
            }]
        }],
        "buffers": [{
            "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAA",
            "byteLength": 36
        }],
        "bufferViews": [{"buffer": 0, "byteLength": 36, "byteStride": 12}],
        "accessors": [
            {"bufferView": 0, "componentType": 5126, "count": 1, "type": "VEC3"},
            {"bufferView": 0, "byteOffset": 12, "componentType": 5126, "count": 1, "type": "VEC3"},
            {"bufferView": 0, "byteOffset": 24, "componentType": 5126, "count": 1, "type": "VEC3"}
        ]
    }"#;
    let asset = Asset::from_slice(json.as_bytes()).unwrap();
    let mut host = RecordingHost::default();
    asset.build_default_scene(&mut host).unwrap();
    assert!(host
        .events
        .iter()
        .any(|e| matches!(e, Event::Mesh { primitives: 1, .. })));

    let target_delta = asset.decode(1).unwrap();
    assert_eq!(target_delta.as_f32().unwrap(), &[1.0, 0.0, 0.0]);
}
