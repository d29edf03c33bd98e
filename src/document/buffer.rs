//! Buffer and buffer view schema.

use serde::Deserialize;
use serde_json::Value;

use super::ExtensionMap;

/// A raw byte blob. The data source is one of: the container's binary
/// chunk (buffer 0 with no `uri`), an embedded `data:` URI, or an
/// external URI resolved through the fetch collaborator.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Buffer {
    #[serde(default)]
    pub uri: Option<String>,
    pub byte_length: usize,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub extensions: ExtensionMap,
    #[serde(default)]
    pub extras: Value,
}

/// A byte range into a buffer. Multiple accessors may share one view.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferView {
    pub buffer: usize,
    #[serde(default)]
    pub byte_offset: usize,
    pub byte_length: usize,
    /// Distance between vertex-attribute elements; `None` means tightly packed.
    #[serde(default)]
    pub byte_stride: Option<usize>,
    /// GL buffer binding hint; carried but not interpreted.
    #[serde(default)]
    pub target: Option<u32>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub extensions: ExtensionMap,
    #[serde(default)]
    pub extras: Value,
}
