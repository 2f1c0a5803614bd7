//! Deep copies of single (non-container) values.

use crate::engine::CopyEngine;
use crate::error::{CopyError, Result};
use crate::proxy;
use crate::schema::{RawType, TypeRef};
use crate::value::Value;

/// Produces an independent copy of `value` for an attribute declared as `destination`.
///
/// * absent stays absent;
/// * simple destinations and scalar values take a binary codec round trip;
/// * a value whose runtime type is the destination type (or a descendant of
///   it), or any value for an `Unknown` destination, takes a text round trip;
/// * a structured value of another type is copied attribute by attribute into
///   a fresh destination instance.
pub(crate) fn clone_leaf(engine: &CopyEngine, value: &Value, destination: &TypeRef, depth: usize) -> Result<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }

    let codecs = engine.codecs();
    if destination.is_simple() || matches!(value, Value::Scalar(_)) {
        return codecs.binary_round_trip(value);
    }

    if same_type(engine, value, destination) {
        let resolved = proxy::resolve_deep(engine.proxy_subsystem(), engine.registry(), value)?;
        return codecs.text_round_trip(&resolved);
    }

    match (value, destination) {
        (Value::Object(source), TypeRef::Object(name)) => {
            Ok(engine.copy_object_as(source, name, depth + 1)?.into())
        }
        _ => Err(CopyError::Conversion(format!(
            "Cannot convert {} into {destination}",
            value.describe()
        ))),
    }
}

fn same_type(engine: &CopyEngine, value: &Value, destination: &TypeRef) -> bool {
    match (value.runtime_type(), destination) {
        (_, TypeRef::Unknown) => true,
        (RawType::Object(runtime), TypeRef::Object(declared)) => {
            engine.registry().is_subtype(&runtime, declared)
        }
        (runtime, declared) => runtime == declared.raw(),
    }
}
