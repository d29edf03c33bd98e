//! Accessor decoding: buffer bytes to typed element arrays.
//!
//! Decoding is lazy and memoized: the first request for an accessor
//! index computes its element array, later requests (from any thread)
//! share the same immutable result. Normalized integer data is mapped
//! to floats at decode time, so consumers only ever see either the raw
//! integer components or the final float values.

mod cache;

pub use cache::DecodeCache;

use std::sync::Arc;

use byteorder::{ByteOrder, LittleEndian};
use rayon::prelude::*;
use smallvec::SmallVec;
use tracing::trace;

use crate::document::Document;
use crate::util::{
    ComponentType, DataType, ElementType, EntityKind, EntityRef, Error, Result,
};

/// Decoded component storage.
///
/// Float sources and normalized integer sources land in `F32`; raw
/// integer sources keep their component width.
#[derive(Clone, Debug, PartialEq)]
pub enum Values {
    F32(Vec<f32>),
    U32(Vec<u32>),
    U16(Vec<u16>),
    U8(Vec<u8>),
    I16(Vec<i16>),
    I8(Vec<i8>),
}

impl Values {
    /// Total number of components stored.
    pub fn component_count(&self) -> usize {
        match self {
            Self::F32(v) => v.len(),
            Self::U32(v) => v.len(),
            Self::U16(v) => v.len(),
            Self::U8(v) => v.len(),
            Self::I16(v) => v.len(),
            Self::I8(v) => v.len(),
        }
    }
}

/// An accessor's fully decoded, immutable element data.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedAccessor {
    pub data_type: DataType,
    pub normalized: bool,
    pub count: usize,
    pub values: Values,
}

impl DecodedAccessor {
    /// Components per element (1 for scalars, 3 for VEC3, 16 for MAT4).
    #[inline]
    pub fn components_per_element(&self) -> usize {
        self.data_type.element.num_components()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Borrow the float components, if this decoded as floats.
    pub fn as_f32(&self) -> Option<&[f32]> {
        match &self.values {
            Values::F32(v) => Some(v),
            _ => None,
        }
    }

    /// Convert all components to floats by plain numeric cast.
    ///
    /// Normalization, when requested by the accessor, already happened
    /// at decode time; this is only a widening for consumers that want
    /// uniform float data (e.g. unnormalized u8 colors).
    pub fn to_f32(&self) -> Vec<f32> {
        match &self.values {
            Values::F32(v) => v.clone(),
            Values::U32(v) => v.iter().map(|&x| x as f32).collect(),
            Values::U16(v) => v.iter().map(|&x| x as f32).collect(),
            Values::U8(v) => v.iter().map(|&x| x as f32).collect(),
            Values::I16(v) => v.iter().map(|&x| x as f32).collect(),
            Values::I8(v) => v.iter().map(|&x| x as f32).collect(),
        }
    }

    /// Widen unsigned scalar indices to u32 (index accessors).
    pub fn to_u32(&self) -> Option<Vec<u32>> {
        match &self.values {
            Values::U32(v) => Some(v.clone()),
            Values::U16(v) => Some(v.iter().map(|&x| x as u32).collect()),
            Values::U8(v) => Some(v.iter().map(|&x| x as u32).collect()),
            _ => None,
        }
    }

    /// View float MAT4 elements as matrices (inverse bind matrices).
    pub fn to_mat4(&self) -> Option<Vec<glam::Mat4>> {
        if self.data_type.element != ElementType::Mat4 {
            return None;
        }
        let floats = self.as_f32()?;
        Some(
            floats
                .chunks_exact(16)
                .map(|c| glam::Mat4::from_cols_slice(c))
                .collect(),
        )
    }
}

/// Read layout of one raw accessor-shaped region (base data, sparse
/// indices and sparse values all decode through this).
struct RawSpec {
    view: usize,
    byte_offset: usize,
    data_type: DataType,
    normalized: bool,
    count: usize,
}

/// Decodes accessors against a document and its materialized buffers.
pub struct Decoder<'a> {
    doc: &'a Document,
    buffers: &'a [Arc<[u8]>],
    cache: &'a DecodeCache,
}

impl<'a> Decoder<'a> {
    pub fn new(doc: &'a Document, buffers: &'a [Arc<[u8]>], cache: &'a DecodeCache) -> Self {
        Self { doc, buffers, cache }
    }

    /// Decode accessor `index`, or return the session-cached result.
    pub fn decode(&self, index: usize) -> Result<Arc<DecodedAccessor>> {
        self.cache.get_or_compute(index, || self.decode_uncached(index))
    }

    /// Pre-decode every accessor, fanning out across indices.
    ///
    /// Decodes are independent of each other, so this is a plain
    /// parallel sweep; the cache guarantees each index still decodes
    /// at most once even if a caller races this warm-up.
    pub fn decode_all(&self) -> Result<()> {
        (0..self.doc.accessors.len())
            .into_par_iter()
            .try_for_each(|i| self.decode(i).map(drop))
    }

    fn decode_uncached(&self, index: usize) -> Result<DecodedAccessor> {
        let accessor = &self.doc.accessors[index];
        let entity = EntityRef::new(EntityKind::Accessor, index);
        let data_type = accessor.data_type();
        trace!(%entity, %data_type, count = accessor.count, "decoding accessor");

        let mut values = match accessor.buffer_view {
            Some(view) => self.read_values(
                entity,
                &RawSpec {
                    view,
                    byte_offset: accessor.byte_offset,
                    data_type,
                    normalized: accessor.normalized,
                    count: accessor.count,
                },
            )?,
            None => zero_values(data_type, accessor.normalized, accessor.count),
        };

        if let Some(sparse) = &accessor.sparse {
            let raw_indices = self.read_values(
                entity,
                &RawSpec {
                    view: sparse.indices.buffer_view,
                    byte_offset: sparse.indices.byte_offset,
                    data_type: DataType::new(sparse.indices.component_type, ElementType::Scalar),
                    normalized: false,
                    count: sparse.count,
                },
            )?;
            let indices: Vec<u32> = match raw_indices {
                Values::U8(v) => v.into_iter().map(u32::from).collect(),
                Values::U16(v) => v.into_iter().map(u32::from).collect(),
                Values::U32(v) => v,
                // The resolver rejects signed/float sparse index types.
                _ => return Err(Error::schema(entity, "sparse indices must be unsigned")),
            };

            let replacement = self.read_values(
                entity,
                &RawSpec {
                    view: sparse.values.buffer_view,
                    byte_offset: sparse.values.byte_offset,
                    data_type,
                    normalized: accessor.normalized,
                    count: sparse.count,
                },
            )?;

            overlay(
                entity,
                &mut values,
                &indices,
                &replacement,
                data_type.element.num_components(),
                accessor.count,
            )?;
        }

        Ok(DecodedAccessor {
            data_type,
            normalized: accessor.normalized,
            count: accessor.count,
            values,
        })
    }

    /// Decode `spec.count` elements from a buffer view region.
    fn read_values(&self, entity: EntityRef, spec: &RawSpec) -> Result<Values> {
        let view = &self.doc.buffer_views[spec.view];
        let buffer = &self.buffers[view.buffer];

        let view_end = view.byte_offset + view.byte_length;
        if view_end > buffer.len() {
            return Err(Error::AccessorBounds {
                entity: EntityRef::new(EntityKind::BufferView, spec.view),
                start: view.byte_offset,
                end: view_end,
                len: buffer.len(),
            });
        }
        let data = &buffer[view.byte_offset..view_end];

        let packed = spec.data_type.packed_size();
        let stride = view.byte_stride.unwrap_or(packed);
        let end = if spec.count == 0 {
            spec.byte_offset
        } else {
            spec.byte_offset + (spec.count - 1) * stride + packed
        };
        if end > data.len() {
            return Err(Error::AccessorBounds {
                entity,
                start: spec.byte_offset,
                end,
                len: data.len(),
            });
        }

        // Fast path: contiguous little-endian floats cast straight out
        // of the view.
        if cfg!(target_endian = "little")
            && spec.data_type.component == ComponentType::Float
            && stride == packed
        {
            let range = &data[spec.byte_offset..end];
            if let Ok(floats) = bytemuck::try_cast_slice::<u8, f32>(range) {
                return Ok(Values::F32(floats.to_vec()));
            }
            // Misaligned source; fall through to the per-component reads.
        }

        let offsets = ElementOffsets::new(spec.data_type);
        let ncomp = spec.data_type.element.num_components();
        let total = spec.count * ncomp;

        macro_rules! gather {
            ($read:expr) => {{
                let read = $read;
                let mut out = Vec::with_capacity(total);
                for e in 0..spec.count {
                    let base = spec.byte_offset + e * stride;
                    for off in offsets.iter(base) {
                        out.push(read(data, off));
                    }
                }
                out
            }};
        }

        let values = match (spec.data_type.component, spec.normalized) {
            (ComponentType::Float, _) => {
                Values::F32(gather!(|d: &[u8], o: usize| LittleEndian::read_f32(&d[o..])))
            }
            (ComponentType::UnsignedByte, false) => {
                Values::U8(gather!(|d: &[u8], o: usize| d[o]))
            }
            (ComponentType::UnsignedByte, true) => {
                Values::F32(gather!(|d: &[u8], o: usize| d[o] as f32 / 255.0))
            }
            (ComponentType::Byte, false) => {
                Values::I8(gather!(|d: &[u8], o: usize| d[o] as i8))
            }
            (ComponentType::Byte, true) => Values::F32(gather!(|d: &[u8], o: usize| {
                ((d[o] as i8) as f32 / 127.0).max(-1.0)
            })),
            (ComponentType::UnsignedShort, false) => {
                Values::U16(gather!(|d: &[u8], o: usize| LittleEndian::read_u16(&d[o..])))
            }
            (ComponentType::UnsignedShort, true) => {
                Values::F32(gather!(|d: &[u8], o: usize| {
                    LittleEndian::read_u16(&d[o..]) as f32 / 65535.0
                }))
            }
            (ComponentType::Short, false) => {
                Values::I16(gather!(|d: &[u8], o: usize| LittleEndian::read_i16(&d[o..])))
            }
            (ComponentType::Short, true) => Values::F32(gather!(|d: &[u8], o: usize| {
                (LittleEndian::read_i16(&d[o..]) as f32 / 32767.0).max(-1.0)
            })),
            (ComponentType::UnsignedInt, false) => {
                Values::U32(gather!(|d: &[u8], o: usize| LittleEndian::read_u32(&d[o..])))
            }
            (ComponentType::UnsignedInt, true) => {
                Values::F32(gather!(|d: &[u8], o: usize| {
                    (LittleEndian::read_u32(&d[o..]) as f64 / 4294967295.0) as f32
                }))
            }
        };
        Ok(values)
    }
}

/// Byte offsets of each component within one element, honoring the
/// column padding of small-component matrix layouts.
struct ElementOffsets {
    offsets: SmallVec<[usize; 16]>,
}

impl ElementOffsets {
    fn new(data_type: DataType) -> Self {
        let comp = data_type.component.num_bytes();
        let mut offsets = SmallVec::new();
        match data_type.element.matrix_dims() {
            Some((rows, cols)) if data_type.has_column_padding() => {
                let col_stride = data_type.column_stride();
                for c in 0..cols {
                    for r in 0..rows {
                        offsets.push(c * col_stride + r * comp);
                    }
                }
            }
            _ => {
                for k in 0..data_type.element.num_components() {
                    offsets.push(k * comp);
                }
            }
        }
        Self { offsets }
    }

    fn iter(&self, base: usize) -> impl Iterator<Item = usize> + '_ {
        self.offsets.iter().map(move |&o| base + o)
    }
}

/// Zero-filled base for accessors without a buffer view (sparse-only).
fn zero_values(data_type: DataType, normalized: bool, count: usize) -> Values {
    let total = count * data_type.element.num_components();
    match (data_type.component, normalized) {
        (ComponentType::Float, _) => Values::F32(vec![0.0; total]),
        (_, true) => Values::F32(vec![0.0; total]),
        (ComponentType::UnsignedByte, false) => Values::U8(vec![0; total]),
        (ComponentType::Byte, false) => Values::I8(vec![0; total]),
        (ComponentType::UnsignedShort, false) => Values::U16(vec![0; total]),
        (ComponentType::Short, false) => Values::I16(vec![0; total]),
        (ComponentType::UnsignedInt, false) => Values::U32(vec![0; total]),
    }
}

/// Overwrite base elements with the sparse replacements.
fn overlay(
    entity: EntityRef,
    base: &mut Values,
    indices: &[u32],
    replacement: &Values,
    ncomp: usize,
    count: usize,
) -> Result<()> {
    fn splice<T: Copy>(
        entity: EntityRef,
        base: &mut [T],
        indices: &[u32],
        replacement: &[T],
        ncomp: usize,
        count: usize,
    ) -> Result<()> {
        for (k, &index) in indices.iter().enumerate() {
            let index = index as usize;
            if index >= count {
                return Err(Error::AccessorBounds {
                    entity,
                    start: index * ncomp,
                    end: (index + 1) * ncomp,
                    len: count * ncomp,
                });
            }
            base[index * ncomp..(index + 1) * ncomp]
                .copy_from_slice(&replacement[k * ncomp..(k + 1) * ncomp]);
        }
        Ok(())
    }

    match (base, replacement) {
        (Values::F32(b), Values::F32(r)) => splice(entity, b, indices, r, ncomp, count),
        (Values::U32(b), Values::U32(r)) => splice(entity, b, indices, r, ncomp, count),
        (Values::U16(b), Values::U16(r)) => splice(entity, b, indices, r, ncomp, count),
        (Values::U8(b), Values::U8(r)) => splice(entity, b, indices, r, ncomp, count),
        (Values::I16(b), Values::I16(r)) => splice(entity, b, indices, r, ncomp, count),
        (Values::I8(b), Values::I8(r)) => splice(entity, b, indices, r, ncomp, count),
        // Base and replacement share component type and normalization,
        // so mixed variants cannot occur for a resolved document.
        _ => Err(Error::schema(entity, "sparse value storage mismatch")),
    }
}
