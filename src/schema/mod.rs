//! Schema descriptors: the static description of every type the engine copies.
//!
//! Types are registered in a [`TypeRegistry`], either by hand through
//! [`StructSchema::builder`] or by `#[derive(Reflect)]`.

/// Attribute descriptors and key normalization.
pub mod attribute;
/// Struct and enum schemas and the registry.
pub mod registry;
/// Type names and type descriptors.
pub mod type_ref;

pub use attribute::{AttributeDescriptor, normalize_key};
pub use registry::{EnumSchema, ExclusionPolicy, StructSchema, StructSchemaBuilder, TypeRegistry};
pub use type_ref::{RawType, TypeName, TypeRef};
