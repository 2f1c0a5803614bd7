//! Per-attribute dispatch: decides how one source value becomes one
//! destination value.

use tracing::debug;

use crate::cloner;
use crate::container;
use crate::engine::CopyEngine;
use crate::enums;
use crate::error::Result;
use crate::proxy;
use crate::schema::TypeRef;
use crate::value::Value;

/// Outcome of copying one attribute.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Copied {
    /// Store the value in the destination attribute.
    Assign(Value),
    /// Reset the destination attribute to its declared default: absent for
    /// nullable attributes, the empty container for typed ones.
    Reset,
}

/// Copies `value`, read from an attribute declared as `source`, for an
/// attribute declared as `destination`.
///
/// In order: lazy values are resolved; identical raw types copy directly; an
/// absent boxed value into a primitive yields zero; a primitive at its
/// default into a boxed attribute yields absent; enums convert by name; a
/// container on only one side, or two different container kinds, resets the
/// destination to its default;
/// anything else is copied by the leaf cloner.
pub(crate) fn copy_attribute(
    engine: &CopyEngine,
    value: &Value,
    source: &TypeRef,
    destination: &TypeRef,
    depth: usize,
) -> Result<Copied> {
    let value = if engine.options().proxy_support {
        proxy::resolve(engine.proxy_subsystem(), engine.registry(), value)?
    } else {
        value.clone()
    };

    let source_raw = source.raw();
    let destination_raw = destination.raw();
    if source_raw == destination_raw {
        return copy_value(engine, &value, source, destination, depth).map(Copied::Assign);
    }

    match (source, destination) {
        (TypeRef::Boxed(_), TypeRef::Primitive(_)) if value.is_null() => {
            return Ok(Copied::Assign(destination.default_value()));
        }
        (TypeRef::Primitive(_), TypeRef::Boxed(_)) if source.is_primitive_default(&value) => {
            return Ok(Copied::Assign(Value::Null));
        }
        _ => {}
    }

    if matches!(source, TypeRef::Enum(_)) || matches!(destination, TypeRef::Enum(_)) {
        return enums::convert(engine.registry(), &value, destination).map(Copied::Assign);
    }

    if source_raw.is_container() || destination_raw.is_container() {
        debug!(
            source = %source,
            destination = %destination,
            "container types differ, attribute reset"
        );
        return Ok(Copied::Reset);
    }

    copy_value(engine, &value, source, destination, depth).map(Copied::Assign)
}

/// Chooses the copy strategy from the declared source type.
pub(crate) fn copy_value(
    engine: &CopyEngine,
    value: &Value,
    source: &TypeRef,
    destination: &TypeRef,
    depth: usize,
) -> Result<Value> {
    match source {
        TypeRef::Primitive(_) | TypeRef::Enum(_) => Ok(value.clone()),
        TypeRef::Collection { .. } | TypeRef::Map { .. } => {
            container::clone_container(engine, value, destination, depth)
        }
        _ => cloner::clone_leaf(engine, value, destination, depth),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::EnumSchema;
    use crate::value::{Collection, CollectionKind, EnumValue, PrimitiveKind};

    fn int(k: PrimitiveKind) -> TypeRef {
        TypeRef::Primitive(k)
    }

    #[test]
    fn boxed_absent_into_primitive_is_zero() -> Result<()> {
        let engine = CopyEngine::new();
        let copied = copy_attribute(
            &engine,
            &Value::Null,
            &TypeRef::Boxed(PrimitiveKind::I32),
            &int(PrimitiveKind::I64),
            0,
        )?;
        assert_eq!(copied, Copied::Assign(Value::from(0i64)));
        Ok(())
    }

    #[test]
    fn primitive_default_into_boxed_is_absent() -> Result<()> {
        let engine = CopyEngine::new();
        let boxed = TypeRef::Boxed(PrimitiveKind::I32);
        let i32_ty = int(PrimitiveKind::I32);
        assert_eq!(
            copy_attribute(&engine, &Value::from(0), &i32_ty, &boxed, 0)?,
            Copied::Assign(Value::Null)
        );
        assert_eq!(
            copy_attribute(&engine, &Value::from(3), &i32_ty, &boxed, 0)?,
            Copied::Assign(Value::from(3))
        );
        Ok(())
    }

    #[test]
    fn container_kind_mismatch_resets_the_attribute() -> Result<()> {
        let engine = CopyEngine::new();
        let set = Value::from(Collection::from_items(CollectionKind::Set, ["a".into()]));
        let copied = copy_attribute(
            &engine,
            &set,
            &TypeRef::collection(CollectionKind::Set, TypeRef::String),
            &TypeRef::list(TypeRef::String),
            0,
        )?;
        assert_eq!(copied, Copied::Reset);
        Ok(())
    }

    #[test]
    fn enum_into_string_uses_the_constant_name() -> Result<()> {
        let engine = CopyEngine::new();
        engine.registry().register_enum(EnumSchema::new("t::Color", ["RED", "GREEN"]));
        let copied = copy_attribute(
            &engine,
            &EnumValue::new("t::Color", "GREEN").into(),
            &TypeRef::enumeration("t::Color"),
            &TypeRef::String,
            0,
        )?;
        assert_eq!(copied, Copied::Assign(Value::from("GREEN")));
        Ok(())
    }
}
