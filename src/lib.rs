//! # gltf-import
//!
//! Rust implementation of a glTF 2.0 scene importer.
//!
//! The glTF format is developed by the Khronos Group; this crate covers
//! the read path only: decoding the JSON/binary container, resolving the
//! document's index-based object graph, decoding accessor data, and
//! driving a host application's scene construction through an injected
//! interface. Host-side object creation (a DCC's meshes, materials,
//! objects) is deliberately out of scope.
//!
//! ## Modules
//!
//! - [`util`] - Basic types (errors, component/element types)
//! - [`glb`] - Low-level binary container (.glb) chunk reading
//! - [`document`] - Typed document model of the glTF JSON schema
//! - [`resolve`] - Reference validation, cycle detection, transforms
//! - [`decode`] - Lazy, cached accessor decoding
//! - [`ext`] - Extension handler registry and bundled handlers
//! - [`scene`] - Scene building against a pluggable host
//! - [`import`] - The pipeline driver ([`Asset`]) and batch diagnostics
//!
//! ## Example
//!
//! ```ignore
//! use gltf_import::{Asset, RecordingHost};
//!
//! let asset = Asset::open("model.glb")?;
//! let mut host = RecordingHost::default();
//! asset.build_default_scene(&mut host)?;
//! ```

pub mod util;
pub mod glb;
pub mod document;
pub mod resolve;
pub mod decode;
pub mod ext;
pub mod scene;
pub mod import;

// Re-export commonly used types
pub use decode::{DecodeCache, DecodedAccessor, Values};
pub use document::Document;
pub use ext::{ExtensionHandler, Registry};
pub use import::{Asset, BufferFetch, DirFetch, NoFetch, Report, ReportEntry, Status};
pub use resolve::Transform;
pub use scene::{RecordingHost, SceneBuilder, SceneHost};
pub use util::{EntityKind, EntityRef, Error, ErrorKind, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::decode::DecodedAccessor;
    pub use crate::document::Document;
    pub use crate::ext::{ExtensionHandler, Light, Registry};
    pub use crate::import::{Asset, BufferFetch, DirFetch, NoFetch, Report};
    pub use crate::resolve::Transform;
    pub use crate::scene::{RecordingHost, SceneHost};
    pub use crate::util::{EntityKind, EntityRef, Error, ErrorKind, Result};
}
