//! Type introspection over declared descriptors and runtime values.

use crate::error::{CopyError, Result};
use crate::schema::{RawType, TypeRef, TypeRegistry};
use crate::value::{Collection, MapValue, Value};

/// Element type of a sequence or set descriptor. `Unknown` otherwise.
pub fn element_type(ty: &TypeRef) -> TypeRef {
    match ty {
        TypeRef::Collection { element, .. } => (**element).clone(),
        _ => TypeRef::Unknown,
    }
}

/// Value type of a map descriptor. `Unknown` otherwise. Keys are never converted.
pub fn value_type(ty: &TypeRef) -> TypeRef {
    match ty {
        TypeRef::Map { value, .. } => (**value).clone(),
        _ => TypeRef::Unknown,
    }
}

/// The type argument at `index`: `0` is the element of a collection or the
/// key of a map, `1` the value of a map. `Unknown` when out of range.
pub fn nested_type(ty: &TypeRef, index: usize) -> TypeRef {
    match (ty, index) {
        (TypeRef::Collection { element, .. }, 0) => (**element).clone(),
        (TypeRef::Map { key, .. }, 0) => (**key).clone(),
        (TypeRef::Map { value, .. }, 1) => (**value).clone(),
        _ => TypeRef::Unknown,
    }
}

/// Innermost declared leaf of a nested container descriptor.
///
/// `List<Set<Foo>>` and `Map<K, List<Foo>>` both yield `Foo`. A leaf yields itself.
pub fn declared_leaf_type(ty: &TypeRef) -> &TypeRef {
    match ty {
        TypeRef::Collection { element, .. } => declared_leaf_type(element),
        TypeRef::Map { value, .. } => declared_leaf_type(value),
        other => other,
    }
}

pub(crate) fn first_element(collection: &Collection) -> Option<&Value> {
    collection.items().iter().find(|v| !v.is_null())
}

pub(crate) fn first_map_value(map: &MapValue) -> Option<&Value> {
    map.values().find(|v| !v.is_null())
}

/// Runtime type of the innermost leaf of a container value.
///
/// Follows the first non-null element (or map value) down. `Unknown` for an
/// absent value or an empty container.
pub fn innermost_leaf_type(value: &Value) -> RawType {
    match value {
        Value::Collection(c) => first_element(c).map_or(RawType::Unknown, innermost_leaf_type),
        Value::Map(m) => first_map_value(m).map_or(RawType::Unknown, innermost_leaf_type),
        other => other.runtime_type(),
    }
}

/// Decomposes a descriptor into its component leaf types and checks that each
/// one can be instantiated.
///
/// Sequences and sets have one component, maps two (key and value). Each
/// component is reduced to its innermost leaf. Primitive, boxed, string, enum
/// and unknown leaves need no probe.
///
/// # Errors
/// `TypeNotInstantiable` for abstract components, `UnknownType` for
/// unregistered ones.
pub fn validate_instantiable(ty: &TypeRef, registry: &TypeRegistry) -> Result<Vec<RawType>> {
    let components: Vec<&TypeRef> = match ty {
        TypeRef::Collection { element, .. } => vec![declared_leaf_type(element)],
        TypeRef::Map { key, value, .. } => vec![declared_leaf_type(key), declared_leaf_type(value)],
        other => vec![other],
    };

    components
        .into_iter()
        .map(|component| {
            if let TypeRef::Object(name) = component {
                registry.probe_constructible(name)?;
            }
            Ok(component.raw())
        })
        .collect()
}

fn mismatch(value: &Value, ty: &TypeRef) -> CopyError {
    CopyError::Conversion(format!(
        "Cannot assign {} to an attribute of type {ty}",
        value.describe()
    ))
}

/// Checks that `value` may be stored in an attribute declared as `ty`,
/// widening scalars where needed. Only the top level is inspected.
///
/// # Errors
/// `Conversion` when the value does not fit, including an absent value
/// offered to a primitive.
pub fn coerce_for_assignment(value: Value, ty: &TypeRef, registry: &TypeRegistry) -> Result<Value> {
    let fits = match (&value, ty) {
        (Value::Null, TypeRef::Primitive(_)) => false,
        (Value::Null, _) | (_, TypeRef::Unknown) => true,
        (Value::Scalar(s), TypeRef::Primitive(k) | TypeRef::Boxed(k)) => {
            return s
                .convert_to(*k)
                .map(Value::Scalar)
                .ok_or_else(|| mismatch(&value, ty));
        }
        (Value::Str(_), TypeRef::String) => true,
        (Value::Enum(e), TypeRef::Enum(name)) => &e.type_name == name,
        (Value::Object(o), TypeRef::Object(name)) => registry.is_subtype(o.type_name(), name),
        (Value::Lazy(l), TypeRef::Object(name)) => registry.is_subtype(l.backing_type(), name),
        (Value::Collection(c), TypeRef::Collection { kind, .. }) => kind.accepts(c.kind()),
        (Value::Map(m), TypeRef::Map { kind, .. }) => kind.accepts(m.kind()),
        _ => false,
    };
    if fits { Ok(value) } else { Err(mismatch(&value, ty)) }
}

/// Deep variant of [`coerce_for_assignment`]: container elements, map keys
/// and values, and object attributes are checked against their declared types.
pub fn conform(value: Value, ty: &TypeRef, registry: &TypeRegistry) -> Result<Value> {
    let value = coerce_for_assignment(value, ty, registry)?;
    match value {
        Value::Collection(collection) => {
            let element = element_type(ty);
            let kind = collection.kind();
            let frozen = collection.is_frozen();
            let items = collection
                .into_items()
                .into_iter()
                .map(|item| conform(item, &element, registry))
                .collect::<Result<Vec<_>>>()?;
            Ok(if frozen {
                Collection::frozen(kind, items)
            } else {
                Collection::from_items(kind, items)
            }
            .into())
        }
        Value::Map(map) => {
            let key_ty = nested_type(ty, 0);
            let value_ty = value_type(ty);
            let kind = map.kind();
            let frozen = map.is_frozen();
            let entries = map
                .into_entries()
                .into_iter()
                .map(|(k, v)| Ok((conform(k, &key_ty, registry)?, conform(v, &value_ty, registry)?)))
                .collect::<Result<Vec<_>>>()?;
            Ok(if frozen {
                MapValue::frozen(kind, entries)
            } else {
                MapValue::from_entries(kind, entries)
            }
            .into())
        }
        Value::Object(mut object) => {
            let attributes = registry.all_attributes(object.type_name())?;
            for attribute in attributes {
                if let Some(slot) = object.take(&attribute.name) {
                    object.set(attribute.name.clone(), conform(slot, &attribute.ty, registry)?);
                }
            }
            Ok(Value::Object(object))
        }
        other => Ok(other),
    }
}
