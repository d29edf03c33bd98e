//! Low-level binary container (.glb) support.
//!
//! A binary container wraps the JSON document and an optional binary
//! buffer in a chunked envelope. [`split`] undoes the envelope; bare
//! `.gltf` JSON bypasses this module entirely (see [`is_binary`]).

mod format;
mod reader;

pub use format::{is_binary, CHUNK_BIN, CHUNK_JSON, GLB_MAGIC, GLB_VERSION};
pub use reader::{split, Chunks};
