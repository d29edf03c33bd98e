//! Error types for the glTF importer.

use std::fmt;
use thiserror::Error;

/// Kind of document entity an error points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Asset,
    Buffer,
    BufferView,
    Accessor,
    Image,
    Sampler,
    Texture,
    Material,
    Mesh,
    Skin,
    Animation,
    Camera,
    Node,
    Scene,
    Light,
}

impl EntityKind {
    /// Name as it appears in the source document's top-level arrays.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Asset => "asset",
            Self::Buffer => "buffers",
            Self::BufferView => "bufferViews",
            Self::Accessor => "accessors",
            Self::Image => "images",
            Self::Sampler => "samplers",
            Self::Texture => "textures",
            Self::Material => "materials",
            Self::Mesh => "meshes",
            Self::Skin => "skins",
            Self::Animation => "animations",
            Self::Camera => "cameras",
            Self::Node => "nodes",
            Self::Scene => "scenes",
            Self::Light => "lights",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Location of an error: entity kind plus index into its top-level array.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub index: usize,
}

impl EntityRef {
    #[inline]
    pub const fn new(kind: EntityKind, index: usize) -> Self {
        Self { kind, index }
    }

    /// The document-wide `asset` header (not an array entry).
    #[inline]
    pub const fn asset() -> Self {
        Self::new(EntityKind::Asset, 0)
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind == EntityKind::Asset {
            f.write_str("asset")
        } else {
            write!(f, "{}[{}]", self.kind, self.index)
        }
    }
}

/// Coarse error classification for diagnostics reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MalformedContainer,
    SchemaViolation,
    CyclicHierarchy,
    SkinMismatch,
    InvalidAnimationTarget,
    AccessorBounds,
    UnsupportedRequiredExtension,
    Io,
}

impl ErrorKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::MalformedContainer => "MalformedContainer",
            Self::SchemaViolation => "SchemaViolation",
            Self::CyclicHierarchy => "CyclicHierarchy",
            Self::SkinMismatch => "SkinMismatch",
            Self::InvalidAnimationTarget => "InvalidAnimationTarget",
            Self::AccessorBounds => "AccessorBoundsError",
            Self::UnsupportedRequiredExtension => "UnsupportedRequiredExtension",
            Self::Io => "IOError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Main error type for import operations.
///
/// Every variant is fatal for the current import: the pipeline aborts on
/// the first error and no partial scene is committed.
#[derive(Error, Debug)]
pub enum Error {
    /// Container-level framing problem (bad magic, version, chunk layout)
    #[error("malformed container: {0}")]
    MalformedContainer(String),

    /// JSON chunk is not valid UTF-8
    #[error("malformed container: JSON chunk is not UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// Document violates the schema (missing field, bad value, dangling index)
    #[error("{entity}: {message}")]
    SchemaViolation { entity: EntityRef, message: String },

    /// Node hierarchy contains a back-edge
    #[error("{entity}: node hierarchy contains a cycle")]
    CyclicHierarchy { entity: EntityRef },

    /// Skin joints and inverse bind matrices disagree
    #[error("{entity}: {message}")]
    SkinMismatch { entity: EntityRef, message: String },

    /// Animation channel targets a property its node cannot animate
    #[error("{entity}: {message}")]
    InvalidAnimationTarget { entity: EntityRef, message: String },

    /// Computed byte range falls outside the owning buffer
    #[error("{entity}: byte range {start}..{end} exceeds length {len}")]
    AccessorBounds {
        entity: EntityRef,
        start: usize,
        end: usize,
        len: usize,
    },

    /// Document requires an extension with no registered handler
    #[error("required extension is not supported: {0}")]
    UnsupportedRequiredExtension(String),

    /// A registered extension handler rejected its payload
    #[error("extension {name} on {entity}: {message}")]
    Extension {
        name: String,
        entity: EntityRef,
        message: String,
    },

    /// I/O error surfaced by the buffer-fetch collaborator
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a schema violation at the given entity.
    pub fn schema(entity: EntityRef, message: impl Into<String>) -> Self {
        Self::SchemaViolation {
            entity,
            message: message.into(),
        }
    }

    /// Create an extension payload error.
    pub fn extension(name: impl Into<String>, entity: EntityRef, message: impl Into<String>) -> Self {
        Self::Extension {
            name: name.into(),
            entity,
            message: message.into(),
        }
    }

    /// Classify this error for diagnostics reports.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedContainer(_) | Self::Utf8(_) => ErrorKind::MalformedContainer,
            Self::SchemaViolation { .. } | Self::Extension { .. } => ErrorKind::SchemaViolation,
            Self::CyclicHierarchy { .. } => ErrorKind::CyclicHierarchy,
            Self::SkinMismatch { .. } => ErrorKind::SkinMismatch,
            Self::InvalidAnimationTarget { .. } => ErrorKind::InvalidAnimationTarget,
            Self::AccessorBounds { .. } => ErrorKind::AccessorBounds,
            Self::UnsupportedRequiredExtension(_) => ErrorKind::UnsupportedRequiredExtension,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// Entity the error points at, when one is known.
    pub fn location(&self) -> Option<EntityRef> {
        match self {
            Self::SchemaViolation { entity, .. }
            | Self::CyclicHierarchy { entity }
            | Self::SkinMismatch { entity, .. }
            | Self::InvalidAnimationTarget { entity, .. }
            | Self::AccessorBounds { entity, .. }
            | Self::Extension { entity, .. } => Some(*entity),
            _ => None,
        }
    }
}

/// Result type alias for import operations.
pub type Result<T> = std::result::Result<T, Error>;
