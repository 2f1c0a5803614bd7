//! # Transcopy
//!
//! A schema-driven engine for deep-copying object graphs and converting them
//! between independently defined types.
//!
//! ## Overview
//!
//! Given a source object and a destination type (the same type, a different
//! but structurally similar type, or a container of either), transcopy builds a
//! fully independent copy. Attributes are matched by normalized name or
//! declared alias, converted according to their declared types, and filtered by
//! exclusion policies declared on either side.
//!
//! ### Key Features
//!
//! *   **Name-based matching:** attributes pair up by alias or name, compared
//!     trimmed and case-insensitively.
//! *   **Exclusion policies:** per-attribute markers, type-level exclusions that
//!     apply on either side, and destination-only exclusions, all inherited
//!     through the ancestor chain.
//! *   **Nested containers:** sequences, sets and maps are decomposed down to
//!     their leaf element type. Same-typed containers are copied in one codec
//!     pass, differing ones element by element.
//! *   **Type-directed conversion:** numeric widening, nullable/primitive
//!     defaults, enum conversion by constant name.
//! *   **Lazy values:** stand-ins for not-yet-loaded objects are resolved before
//!     copying, also inside containers.
//! *   **Parallel resolution:** attributes of wide objects are copied on the
//!     rayon pool. The destination is written only after every attribute succeeded.
//!
//! ## Architecture
//!
//! Rust has no runtime reflection, so the object graph is expressed as a
//! dynamic [`Value`] tree described by schemas held in a
//! [`TypeRegistry`](schema::TypeRegistry):
//!
//! ```text
//! CopyEngine ─► fields (cached pairs) ─► orchestrator ─┬─► proxy
//!                                                     ├─► enums
//!                                                     ├─► cloner ─────► codec
//!                                                     └─► container ──► codec / recursion
//! ```
//!
//! * [`fields`] matches the attributes of two types. Results are memoized in a
//!   [`ResolutionCache`](cache::ResolutionCache).
//! * `orchestrator` decides per attribute how the value is carried over.
//! * [`codec`] provides the text (JSON) and binary (bincode) round trips used for
//!   structural copies.
//!
//! ## Usage Patterns
//!
//! ### Typed copies
//!
//! ```rust
//! use transcopy::{Reflect, Transcopy};
//!
//! #[derive(Reflect, Debug, PartialEq)]
//! struct Foo {
//!     int_value: i32,
//!     long_value: i64,
//!     bool_value: bool,
//! }
//!
//! #[derive(Reflect, Debug, PartialEq)]
//! struct Bar {
//!     #[transcopy(alias = "int_value")]
//!     i_val: i32,
//!     #[transcopy(alias = "long_value")]
//!     l_val: i64,
//!     #[transcopy(alias = "bool_value")]
//!     b_val: bool,
//! }
//!
//! let foo = Foo { int_value: 1, long_value: 2, bool_value: true };
//! let bar: Bar = Transcopy::copy_as(&foo)?;
//! assert_eq!(bar, Bar { i_val: 1, l_val: 2, b_val: true });
//! # Ok::<(), transcopy::CopyError>(())
//! ```
//!
//! ### Dynamic copies
//!
//! ```rust
//! use transcopy::schema::{AttributeDescriptor, StructSchema, TypeRef};
//! use transcopy::{CopyEngine, Object, PrimitiveKind, Value};
//!
//! let engine = CopyEngine::new();
//! engine.registry().register_struct(
//!     StructSchema::builder("app::Point")
//!         .attribute(AttributeDescriptor::new("x", TypeRef::Primitive(PrimitiveKind::I32)))
//!         .build(),
//! )?;
//!
//! let point = Value::from(Object::new("app::Point").with("x", 4));
//! assert_eq!(engine.copy(&point)?, point);
//! # Ok::<(), transcopy::CopyError>(())
//! ```
//!
//! ### Safety and Error Handling
//!
//! * **No Unsafe:** the crate forbids `unsafe` code.
//! * **No Panics:** no `unwrap()` or `panic!()` in the library (enforced by clippy lints).
//! * **Comprehensive Errors:** all failures are a [`CopyError`].
//! * **No partial writes:** a failed copy leaves the destination as it was.

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![warn(missing_docs)]

// --- PUBLIC API MODULES ---
pub mod api;
pub mod cache;
pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod fields;
pub mod inspector;
pub mod proxy;
pub mod schema;
pub mod types;
pub mod value;

// --- INTERNAL IMPLEMENTATION MODULES ---
mod cloner;
mod container;
mod enums;
mod orchestrator;

// --- MACRO SUPPORT MODULES ---

/// Runtime bridge used by the derived code.
pub mod rt;

// --- RE-EXPORTS ---

pub use api::Transcopy;
pub use cache::ResolutionCache;
pub use codec::{BinaryCodec, BincodeCodec, JsonCodec, TextCodec};
pub use config::CopyOptions;
pub use engine::{CopyEngine, EngineBuilder};
pub use error::{CopyError, Result};
pub use inspector::ResolutionReport;
pub use proxy::{LazyProxySupport, LazyValue, NoProxySupport, ProxySubsystem};
pub use rt::Reflect;
pub use schema::{TypeName, TypeRef, TypeRegistry};
pub use value::{
    Collection, CollectionKind, EnumValue, MapKind, MapValue, Object, PrimitiveKind, Scalar, Value,
};

// Re-export the derive macro so it is accessible as `transcopy::Reflect`
pub use transcopy_derive::Reflect;
