//! Centralized error handling for transcopy.
//!
//! Every failure the engine can produce is a [`CopyError`]. The engine never
//! panics on bad input: validation failures, codec failures and structural
//! mismatches are all propagated through [`Result`].
//!
//! ## Error Categories
//!
//! - **Invalid input** ([`CopyError::InvalidInput`]): absent source or destination,
//!   non-structured source values, empty batch input.
//! - **Type not instantiable** ([`CopyError::TypeNotInstantiable`]): an abstract
//!   schema was asked for a concrete instance.
//! - **Conversion** ([`CopyError::Conversion`]): codec round trips or attribute
//!   assignment failed.
//! - **Unknown type** ([`CopyError::UnknownType`]): a type name is missing from the
//!   [`TypeRegistry`](crate::schema::TypeRegistry).
//! - **Depth exceeded** ([`CopyError::DepthExceeded`]): the optional recursion guard
//!   configured through [`CopyOptions`](crate::config::CopyOptions) tripped.
//! - **Config** ([`CopyError::Config`]): an options file could not be read or parsed.
//!
//! A lookup miss is *not* an error. A source attribute without a destination
//! counterpart is skipped; two incompatible container kinds reset the
//! destination attribute to its declared default.
//!
//! ## Usage
//!
//! ```rust
//! use transcopy::{CopyEngine, CopyError, Value};
//!
//! let engine = CopyEngine::new();
//! let err = engine.copy(&Value::Null).unwrap_err();
//! assert!(matches!(err, CopyError::InvalidInput(ref msg) if msg == "The object to be copied is null."));
//! ```

use thiserror::Error;

/// A specialized `Result` type for transcopy operations.
pub type Result<T> = std::result::Result<T, CopyError>;

pub(crate) const SOURCE_OBJECT_NULL: &str = "The object to be copied is null.";
pub(crate) const DESTINATION_OBJECT_NULL: &str = "The destination object is null.";
pub(crate) const COLLECTION_EMPTY: &str = "The collection to be copied has no elements.";
pub(crate) const CLONE_COLLECTION_MAP_ERROR: &str =
    "Error cloning collection/map during object copy.";

/// The error enum covering all failure domains of the copy engine.
///
/// This type is `Clone` so that a failure captured on a worker thread during
/// parallel attribute resolution can be handed back to the caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CopyError {
    /// The caller handed the engine something it cannot copy.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A type was required to be concrete and constructible but is abstract.
    #[error("Type not instantiable: {0}")]
    TypeNotInstantiable(String),

    /// A codec round trip or an attribute assignment failed.
    ///
    /// The string carries the underlying codec message or a description of the
    /// mismatching value and attribute type.
    #[error("Conversion failure: {0}")]
    Conversion(String),

    /// A type name is not present in the registry.
    #[error("Unknown type: {0}")]
    UnknownType(String),

    /// The configured recursion limit was reached.
    #[error("Copy recursion exceeded the configured depth limit of {limit}")]
    DepthExceeded {
        /// The configured `max_depth`.
        limit: usize,
    },

    /// Copy options could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CopyError {
    /// Wraps the error in the generic collection/map cloning failure, keeping
    /// structural errors (unknown types, depth) intact.
    pub(crate) fn in_container(self) -> Self {
        match self {
            Self::Conversion(msg) => Self::Conversion(format!("{CLONE_COLLECTION_MAP_ERROR} {msg}")),
            other => other,
        }
    }
}

impl From<serde_json::Error> for CopyError {
    fn from(err: serde_json::Error) -> Self {
        Self::Conversion(err.to_string())
    }
}

impl From<bincode::error::EncodeError> for CopyError {
    fn from(err: bincode::error::EncodeError) -> Self {
        Self::Conversion(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for CopyError {
    fn from(err: bincode::error::DecodeError) -> Self {
        Self::Conversion(err.to_string())
    }
}
