//! Accessor schema: how raw bytes are reinterpreted as typed elements.

use serde::Deserialize;
use serde_json::Value;

use super::ExtensionMap;
use crate::util::{ComponentType, DataType, ElementType};

/// Metadata describing a typed view over buffer bytes.
///
/// Parsed eagerly; the actual element data is decoded lazily and cached
/// by the decoder (see [`crate::decode`]).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accessor {
    /// Absent means a zero-filled base, which is only meaningful
    /// together with a sparse section.
    #[serde(default)]
    pub buffer_view: Option<usize>,
    #[serde(default)]
    pub byte_offset: usize,
    pub component_type: ComponentType,
    #[serde(default)]
    pub normalized: bool,
    pub count: usize,
    #[serde(rename = "type")]
    pub element_type: ElementType,
    #[serde(default)]
    pub max: Vec<f64>,
    #[serde(default)]
    pub min: Vec<f64>,
    #[serde(default)]
    pub sparse: Option<Sparse>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub extensions: ExtensionMap,
    #[serde(default)]
    pub extras: Value,
}

impl Accessor {
    /// Component/element storage description.
    #[inline]
    pub fn data_type(&self) -> DataType {
        DataType::new(self.component_type, self.element_type)
    }
}

/// Sparse override list layered atop the base values.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sparse {
    pub count: usize,
    pub indices: SparseIndices,
    pub values: SparseValues,
    #[serde(default)]
    pub extensions: ExtensionMap,
    #[serde(default)]
    pub extras: Value,
}

/// Where the replacement element indices live. Component type must be
/// one of the unsigned integer types (checked by the resolver).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SparseIndices {
    pub buffer_view: usize,
    #[serde(default)]
    pub byte_offset: usize,
    pub component_type: ComponentType,
    #[serde(default)]
    pub extensions: ExtensionMap,
    #[serde(default)]
    pub extras: Value,
}

/// Where the replacement element values live; typed like the base accessor.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SparseValues {
    pub buffer_view: usize,
    #[serde(default)]
    pub byte_offset: usize,
    #[serde(default)]
    pub extensions: ExtensionMap,
    #[serde(default)]
    pub extras: Value,
}
