//! Basic types shared across the importer.
//!
//! - [`Error`] / [`Result`] - error taxonomy and result alias
//! - [`EntityKind`] / [`EntityRef`] - diagnostic locations
//! - [`ComponentType`] / [`ElementType`] / [`DataType`] - accessor storage description

mod data_type;
mod error;

pub use data_type::{ComponentType, DataType, ElementType};
pub use error::{EntityKind, EntityRef, Error, ErrorKind, Result};
