//! Pluggable codecs used for structural deep copies.
//!
//! The engine clones leaves and same-typed containers by a codec round trip:
//! the value is serialized and a fresh value is decoded from the result, so the
//! copy shares nothing with the source. Two interfaces are consumed, a textual
//! one and a binary one. The defaults are [`JsonCodec`] (`serde_json`) and
//! [`BincodeCodec`] (`bincode`'s serde bridge).

use std::fmt::Debug;
use std::sync::Arc;

use crate::error::Result;
use crate::schema::{TypeRef, TypeRegistry};
use crate::types;
use crate::value::Value;

/// Text serialization of values.
pub trait TextCodec: Send + Sync + Debug {
    /// A short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Encodes `value`.
    fn serialize(&self, value: &Value) -> Result<String>;

    /// Decodes a value produced by [`TextCodec::serialize`].
    fn deserialize(&self, text: &str) -> Result<Value>;
}

/// Binary serialization of values.
pub trait BinaryCodec: Send + Sync + Debug {
    /// A short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Encodes `value`.
    fn serialize(&self, value: &Value) -> Result<Vec<u8>>;

    /// Decodes a value produced by [`BinaryCodec::serialize`].
    fn deserialize(&self, bytes: &[u8]) -> Result<Value>;
}

/// JSON text codec.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl TextCodec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn serialize(&self, value: &Value) -> Result<String> {
        Ok(serde_json::to_string(value)?)
    }

    fn deserialize(&self, text: &str) -> Result<Value> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Bincode binary codec (standard configuration).
#[derive(Debug, Default, Clone, Copy)]
pub struct BincodeCodec;

impl BinaryCodec for BincodeCodec {
    fn name(&self) -> &'static str {
        "bincode"
    }

    fn serialize(&self, value: &Value) -> Result<Vec<u8>> {
        Ok(bincode::serde::encode_to_vec(value, bincode::config::standard())?)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Value> {
        let (value, _read) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())?;
        Ok(value)
    }
}

/// The pair of codecs an engine uses.
#[derive(Debug, Clone)]
pub struct Codecs {
    /// Codec for the textual round trip.
    pub text: Arc<dyn TextCodec>,
    /// Codec for the binary round trip.
    pub binary: Arc<dyn BinaryCodec>,
}

impl Default for Codecs {
    fn default() -> Self {
        Self {
            text: Arc::new(JsonCodec),
            binary: Arc::new(BincodeCodec),
        }
    }
}

impl Codecs {
    /// Text round trip.
    pub fn text_round_trip(&self, value: &Value) -> Result<Value> {
        let text = self.text.serialize(value)?;
        self.text.deserialize(&text)
    }

    /// Binary round trip.
    pub fn binary_round_trip(&self, value: &Value) -> Result<Value> {
        let bytes = self.binary.serialize(value)?;
        self.binary.deserialize(&bytes)
    }

    /// Decodes `text` and checks the result against the declared type `ty`.
    ///
    /// # Errors
    /// `Conversion` when decoding fails or the decoded value does not conform.
    pub fn deserialize_as(&self, text: &str, ty: &TypeRef, registry: &TypeRegistry) -> Result<Value> {
        let value = self.text.deserialize(text)?;
        types::conform(value, ty, registry)
    }
}
