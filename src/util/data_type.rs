//! DataType - combines a glTF component type with an element shape.

use std::fmt;

use serde::Deserialize;
use serde_repr::Deserialize_repr;

/// Component type codes as they appear in the source document.
///
/// The numeric values are fixed by the glTF 2.0 specification (they are
/// GL enum values); an unknown code is a schema violation at parse time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize_repr)]
#[repr(u32)]
pub enum ComponentType {
    Byte = 5120,
    UnsignedByte = 5121,
    Short = 5122,
    UnsignedShort = 5123,
    UnsignedInt = 5125,
    Float = 5126,
}

impl ComponentType {
    /// Size of one component in bytes.
    #[inline]
    pub const fn num_bytes(&self) -> usize {
        match self {
            Self::Byte | Self::UnsignedByte => 1,
            Self::Short | Self::UnsignedShort => 2,
            Self::UnsignedInt | Self::Float => 4,
        }
    }

    /// True for the unsigned integer component types.
    #[inline]
    pub const fn is_unsigned_int(&self) -> bool {
        matches!(self, Self::UnsignedByte | Self::UnsignedShort | Self::UnsignedInt)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Byte => "BYTE",
            Self::UnsignedByte => "UNSIGNED_BYTE",
            Self::Short => "SHORT",
            Self::UnsignedShort => "UNSIGNED_SHORT",
            Self::UnsignedInt => "UNSIGNED_INT",
            Self::Float => "FLOAT",
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Element shape: how many components make up one element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ElementType {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
}

impl ElementType {
    /// Number of components per element.
    #[inline]
    pub const fn num_components(&self) -> usize {
        match self {
            Self::Scalar => 1,
            Self::Vec2 => 2,
            Self::Vec3 => 3,
            Self::Vec4 => 4,
            Self::Mat2 => 4,
            Self::Mat3 => 9,
            Self::Mat4 => 16,
        }
    }

    /// For matrix shapes, (rows, columns) of the column-major storage.
    #[inline]
    pub const fn matrix_dims(&self) -> Option<(usize, usize)> {
        match self {
            Self::Mat2 => Some((2, 2)),
            Self::Mat3 => Some((3, 3)),
            Self::Mat4 => Some((4, 4)),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Scalar => "SCALAR",
            Self::Vec2 => "VEC2",
            Self::Vec3 => "VEC3",
            Self::Vec4 => "VEC4",
            Self::Mat2 => "MAT2",
            Self::Mat3 => "MAT3",
            Self::Mat4 => "MAT4",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// DataType describes how an element of an accessor is stored.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataType {
    pub component: ComponentType,
    pub element: ElementType,
}

impl DataType {
    #[inline]
    pub const fn new(component: ComponentType, element: ElementType) -> Self {
        Self { component, element }
    }

    /// Tightly packed size of one element in bytes, ignoring alignment.
    #[inline]
    pub const fn tight_size(&self) -> usize {
        self.component.num_bytes() * self.element.num_components()
    }

    /// Byte stride between matrix columns, columns padded to 4 bytes.
    ///
    /// Matrix accessors with 1- or 2-byte components align each column
    /// start to a 4-byte boundary (glTF 2.0 data alignment rules).
    #[inline]
    pub const fn column_stride(&self) -> usize {
        let rows = match self.element.matrix_dims() {
            Some((rows, _)) => rows,
            None => return 0,
        };
        let raw = rows * self.component.num_bytes();
        (raw + 3) & !3
    }

    /// Size of one element as laid out in a buffer view, including any
    /// matrix column padding. Equals [`tight_size`](Self::tight_size)
    /// for non-matrix shapes and 4-byte components.
    pub const fn packed_size(&self) -> usize {
        match self.element.matrix_dims() {
            Some((_, cols)) => self.column_stride() * cols,
            None => self.tight_size(),
        }
    }

    /// True when columns carry padding that per-component reads must skip.
    #[inline]
    pub const fn has_column_padding(&self) -> bool {
        self.packed_size() != self.tight_size()
    }
}

impl fmt::Debug for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.element, self.component)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
