//! Deep copies of collections and maps.
//!
//! When the element (or map value) type matches the declared destination
//! type, the whole container is copied in one text codec pass. Otherwise it is
//! converted element by element, one nesting level at a time. Map keys are
//! carried over unchanged.
//!
//! Copies keep the concrete kind of the source unless the source is frozen,
//! in which case the canonical kind for its shape is used.

use tracing::trace;

use crate::cloner;
use crate::engine::CopyEngine;
use crate::error::{CopyError, Result};
use crate::proxy;
use crate::schema::{RawType, TypeRef};
use crate::types::{self, declared_leaf_type, element_type, first_element, first_map_value, nested_type, value_type};
use crate::value::{Collection, CollectionKind, MapKind, MapValue, Value};

/// Copies a container value for an attribute declared as `destination`.
///
/// # Errors
/// Failures are reported as `Conversion` errors prefixed with the generic
/// container cloning message.
pub(crate) fn clone_container(
    engine: &CopyEngine,
    value: &Value,
    destination: &TypeRef,
    depth: usize,
) -> Result<Value> {
    let copied = match value {
        Value::Null => Ok(Value::Null),
        Value::Collection(collection) => clone_collection(engine, collection, destination, depth),
        Value::Map(map) => clone_map(engine, map, destination, depth),
        other => Err(CopyError::Conversion(format!(
            "Expected a container for {destination}, found {}",
            other.describe()
        ))),
    };
    copied.map_err(CopyError::in_container)
}

fn declared_collection_kind(ty: &TypeRef) -> Option<CollectionKind> {
    match ty {
        TypeRef::Collection { kind, .. } => Some(*kind),
        _ => None,
    }
}

fn declared_map_kind(ty: &TypeRef) -> Option<MapKind> {
    match ty {
        TypeRef::Map { kind, .. } => Some(*kind),
        _ => None,
    }
}

/// The preserved kind if the declaration accepts it, else the declared kind.
fn collection_kind_for(preserved: CollectionKind, declared: &TypeRef) -> CollectionKind {
    match declared_collection_kind(declared) {
        Some(kind) if !kind.accepts(preserved) => kind,
        _ => preserved,
    }
}

fn map_kind_for(preserved: MapKind, declared: &TypeRef) -> MapKind {
    match declared_map_kind(declared) {
        Some(kind) if !kind.accepts(preserved) => kind,
        _ => preserved,
    }
}

/// Runtime and declared leaf types agree. Runtime scalars always report boxed,
/// so they also match the unboxed primitive of the same kind.
fn same_leaf(runtime: &RawType, declared: &RawType) -> bool {
    match (runtime, declared) {
        (RawType::Boxed(r), RawType::Primitive(d)) => r == d,
        _ => runtime == declared,
    }
}

fn clone_collection(
    engine: &CopyEngine,
    collection: &Collection,
    destination: &TypeRef,
    depth: usize,
) -> Result<Value> {
    if collection.is_empty() {
        let kind = declared_collection_kind(destination).unwrap_or_else(|| collection.rebuild_kind());
        return Ok(Collection::new(kind).into());
    }

    let declared_element = element_type(destination);
    let Some(first) = first_element(collection) else {
        return structural_clone(engine, &Value::Collection(collection.clone()), destination);
    };

    let kind = collection_kind_for(collection.rebuild_kind(), destination);
    if first.is_container() {
        let leaf = declared_leaf_type(&declared_element).raw();
        if leaf == RawType::Unknown || same_leaf(&types::innermost_leaf_type(first), &leaf) {
            return structural_clone(engine, &Value::Collection(collection.clone()), destination);
        }
        let nested = nested_type(destination, 0);
        let items = collection
            .items()
            .iter()
            .map(|item| clone_container(engine, item, &nested, depth))
            .collect::<Result<Vec<_>>>()?;
        return Ok(Collection::from_items(kind, items).into());
    }

    let runtime = first.runtime_type();
    if declared_element == TypeRef::Unknown || same_leaf(&runtime, &declared_element.raw()) {
        return structural_clone(engine, &Value::Collection(collection.clone()), destination);
    }

    trace!(from = ?runtime, to = %declared_element, "converting collection element by element");
    let items = collection
        .items()
        .iter()
        .map(|item| convert_leaf(engine, item, &declared_element, depth))
        .collect::<Result<Vec<_>>>()?;
    Ok(Collection::from_items(kind, items).into())
}

fn clone_map(engine: &CopyEngine, map: &MapValue, destination: &TypeRef, depth: usize) -> Result<Value> {
    if map.is_empty() {
        let kind = declared_map_kind(destination).unwrap_or_else(|| map.rebuild_kind());
        return Ok(MapValue::new(kind).into());
    }

    let declared_value = value_type(destination);
    let Some(first) = first_map_value(map) else {
        return structural_clone(engine, &Value::Map(map.clone()), destination);
    };

    let kind = map_kind_for(map.rebuild_kind(), destination);
    if first.is_container() {
        let leaf = declared_leaf_type(&declared_value).raw();
        if leaf == RawType::Unknown || same_leaf(&types::innermost_leaf_type(first), &leaf) {
            return structural_clone(engine, &Value::Map(map.clone()), destination);
        }
        let nested = nested_type(destination, 1);
        let entries = map
            .entries()
            .iter()
            .map(|(k, v)| Ok((k.clone(), clone_container(engine, v, &nested, depth)?)))
            .collect::<Result<Vec<_>>>()?;
        return Ok(MapValue::from_entries(kind, entries).into());
    }

    let runtime = first.runtime_type();
    if declared_value == TypeRef::Unknown || same_leaf(&runtime, &declared_value.raw()) {
        return structural_clone(engine, &Value::Map(map.clone()), destination);
    }

    trace!(from = ?runtime, to = %declared_value, "converting map values one by one");
    let entries = map
        .entries()
        .iter()
        .map(|(k, v)| Ok((k.clone(), convert_leaf(engine, v, &declared_value, depth)?)))
        .collect::<Result<Vec<_>>>()?;
    Ok(MapValue::from_entries(kind, entries).into())
}

fn convert_leaf(engine: &CopyEngine, item: &Value, declared: &TypeRef, depth: usize) -> Result<Value> {
    let copied = cloner::clone_leaf(engine, item, declared, depth)?;
    types::coerce_for_assignment(copied, declared, engine.registry())
}

/// Descriptor of a container value built from its runtime contents.
fn runtime_type_ref(value: &Value) -> TypeRef {
    match value {
        Value::Collection(c) => TypeRef::collection(
            c.kind(),
            first_element(c).map_or(TypeRef::Unknown, runtime_type_ref),
        ),
        Value::Map(m) => TypeRef::map(
            m.kind(),
            m.entries().first().map_or(TypeRef::Unknown, |(k, _)| runtime_type_ref(k)),
            first_map_value(m).map_or(TypeRef::Unknown, runtime_type_ref),
        ),
        Value::Scalar(s) => TypeRef::Boxed(s.kind()),
        Value::Str(_) => TypeRef::String,
        Value::Enum(e) => TypeRef::Enum(e.type_name.clone()),
        Value::Object(o) => TypeRef::Object(o.type_name().clone()),
        Value::Lazy(l) => TypeRef::Object(l.backing_type().clone()),
        Value::Null => TypeRef::Unknown,
    }
}

/// One text codec pass over the whole container.
///
/// The decode target is the declared descriptor. When a declared component
/// cannot be instantiated, the runtime element type is used instead.
fn structural_clone(engine: &CopyEngine, value: &Value, destination: &TypeRef) -> Result<Value> {
    let registry = engine.registry();
    let resolved = proxy::resolve_deep(engine.proxy_subsystem(), registry, value)?;
    let text = engine.codecs().text.serialize(&resolved)?;

    let target = match types::validate_instantiable(destination, registry) {
        Ok(_) => destination.clone(),
        Err(CopyError::TypeNotInstantiable(component)) => {
            trace!(component = %component, "declared component is abstract, decoding as the runtime type");
            runtime_type_ref(&resolved)
        }
        Err(other) => return Err(other),
    };

    let decoded = engine.codecs().deserialize_as(&text, &target, registry)?;
    Ok(thaw(decoded, destination))
}

/// Rebuilds frozen containers at every level, keeping the kind of the others.
fn thaw(value: Value, declared: &TypeRef) -> Value {
    match value {
        Value::Collection(collection) => {
            let kind = collection_kind_for(collection.rebuild_kind(), declared);
            let element = element_type(declared);
            let items = collection.into_items().into_iter().map(|v| thaw(v, &element));
            Collection::from_items(kind, items).into()
        }
        Value::Map(map) => {
            let kind = map_kind_for(map.rebuild_kind(), declared);
            let key = nested_type(declared, 0);
            let value = value_type(declared);
            let entries = map
                .into_entries()
                .into_iter()
                .map(|(k, v)| (thaw(k, &key), thaw(v, &value)));
            MapValue::from_entries(kind, entries).into()
        }
        other => other,
    }
}
