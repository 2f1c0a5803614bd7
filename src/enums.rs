//! Conversion between enum constants and between enums and strings.
//!
//! Matching is textual (the constant's name), never positional.

use crate::error::{CopyError, Result};
use crate::schema::{TypeName, TypeRef, TypeRegistry};
use crate::value::{EnumValue, Value};

fn constant_of(registry: &TypeRegistry, enum_type: &TypeName, text: &str) -> Result<Option<EnumValue>> {
    let schema = registry
        .enum_schema(enum_type)
        .ok_or_else(|| CopyError::UnknownType(enum_type.to_string()))?;
    Ok(schema.constant(text))
}

/// Converts `value` for an attribute of type `destination` when either side
/// is an enum.
///
/// * string into enum: the constant with that exact text, if any;
/// * enum into enum: the constant with the same text, if any;
/// * enum into string: the constant's text.
///
/// Every other combination, and a text with no matching constant, yields
/// [`Value::Null`].
pub fn convert(registry: &TypeRegistry, value: &Value, destination: &TypeRef) -> Result<Value> {
    let converted = match (value, destination) {
        (Value::Str(text), TypeRef::Enum(name)) => constant_of(registry, name, text)?.map(Value::Enum),
        (Value::Enum(constant), TypeRef::Enum(name)) => {
            constant_of(registry, name, &constant.constant)?.map(Value::Enum)
        }
        (Value::Enum(constant), TypeRef::String) => Some(Value::Str(constant.constant.clone())),
        _ => None,
    };
    Ok(converted.unwrap_or(Value::Null))
}
