//! The typed bridge: converting Rust values to and from the [`Value`] model.
//!
//! `#[derive(Reflect)]` implements [`Reflect`] for structs with named fields
//! and for unit-only enums. This module provides the implementations for the
//! standard primitive, string, option and container types, plus the helpers
//! the derived code calls.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, LinkedList, VecDeque};
use std::hash::Hash;

use crate::error::{CopyError, Result};
use crate::schema::{TypeName, TypeRef, TypeRegistry};
use crate::value::{Collection, CollectionKind, MapKind, MapValue, Object, PrimitiveKind, Scalar, Value};

/// A Rust type the engine can copy.
pub trait Reflect: Sized {
    /// The static type descriptor.
    fn type_ref() -> TypeRef;

    /// Registers the schema of this type and of every type it refers to.
    /// Must be idempotent.
    fn register(_registry: &TypeRegistry) -> Result<()> {
        Ok(())
    }

    /// The value a fresh attribute of this type holds.
    fn default_value() -> Value {
        Self::type_ref().default_value()
    }

    /// Converts `self` into the dynamic model.
    fn to_value(&self) -> Value;

    /// Converts back from the dynamic model.
    fn from_value(value: Value) -> Result<Self>;
}

fn unexpected(expected: impl std::fmt::Display, found: &Value) -> CopyError {
    CopyError::Conversion(format!("Expected {expected}, found {}", found.describe()))
}

/// Unwraps an object of type `type_name`.
#[doc(hidden)]
pub fn expect_object(value: Value, type_name: &str) -> Result<Object> {
    match value {
        Value::Object(object) if object.type_name().as_str() == type_name => Ok(object),
        other => Err(unexpected(type_name, &other)),
    }
}

/// Moves an attribute out of `object`. A missing attribute reads as the
/// default of its type.
#[doc(hidden)]
pub fn take_field<T: Reflect>(object: &mut Object, name: &str) -> Result<T> {
    let value = object.take(name).unwrap_or_else(T::default_value);
    T::from_value(value).map_err(|e| match e {
        CopyError::Conversion(msg) => {
            CopyError::Conversion(format!("{}.{name}: {msg}", object.type_name().simple_name()))
        }
        other => other,
    })
}

/// True when `name` is already registered.
///
/// # Errors
/// `InvalidInput` when the stored struct schema declares other attributes
/// than `attributes`. Two derived types with the same default name (such as
/// same-named types local to two functions of one module) end up here.
#[doc(hidden)]
pub fn already_registered(registry: &TypeRegistry, name: &TypeName, attributes: &[&str]) -> Result<bool> {
    let Some(schema) = registry.struct_schema(name) else {
        return Ok(registry.contains(name));
    };
    let stored = schema.attributes.iter().map(|a| a.name.as_str());
    if !stored.eq(attributes.iter().copied()) {
        return Err(CopyError::InvalidInput(format!(
            "{name} is already registered with different attributes. \
             Give one of the types an explicit #[transcopy(name = \"...\")]"
        )));
    }
    Ok(true)
}

/// Unwraps the constant text of an enum of type `type_name`.
#[doc(hidden)]
pub fn expect_enum(value: Value, type_name: &str) -> Result<String> {
    match value {
        Value::Enum(e) if e.type_name.as_str() == type_name => Ok(e.constant),
        other => Err(unexpected(type_name, &other)),
    }
}

/// The error for an enum constant the type does not declare.
#[doc(hidden)]
pub fn unknown_constant(type_name: &str, constant: &str) -> CopyError {
    CopyError::Conversion(format!("{type_name} has no constant named '{constant}'"))
}

macro_rules! impl_reflect_scalar {
    ($($t:ty => $kind:ident),* $(,)?) => {
        $(
            impl Reflect for $t {
                fn type_ref() -> TypeRef {
                    TypeRef::Primitive(PrimitiveKind::$kind)
                }

                fn to_value(&self) -> Value {
                    Value::Scalar(Scalar::$kind(*self))
                }

                fn from_value(value: Value) -> Result<Self> {
                    match value.as_scalar().and_then(|s| s.convert_to(PrimitiveKind::$kind)) {
                        Some(Scalar::$kind(v)) => Ok(v),
                        _ => Err(unexpected(stringify!($t), &value)),
                    }
                }
            }
        )*
    };
}

impl_reflect_scalar!(
    bool => Bool, char => Char,
    i8 => I8, i16 => I16, i32 => I32, i64 => I64, i128 => I128,
    u8 => U8, u16 => U16, u32 => U32, u64 => U64, u128 => U128,
    f32 => F32, f64 => F64,
);

impl Reflect for String {
    fn type_ref() -> TypeRef {
        TypeRef::String
    }

    fn default_value() -> Value {
        Value::Str(String::new())
    }

    fn to_value(&self) -> Value {
        Value::Str(self.clone())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Str(s) => Ok(s),
            other => Err(unexpected("String", &other)),
        }
    }
}

impl Reflect for Value {
    fn type_ref() -> TypeRef {
        TypeRef::Unknown
    }

    fn to_value(&self) -> Value {
        self.clone()
    }

    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

/// `Option<T>` is the nullable form of `T`. Over a primitive it is the boxed primitive.
impl<T: Reflect> Reflect for Option<T> {
    fn type_ref() -> TypeRef {
        match T::type_ref() {
            TypeRef::Primitive(kind) => TypeRef::Boxed(kind),
            other => other,
        }
    }

    fn register(registry: &TypeRegistry) -> Result<()> {
        T::register(registry)
    }

    fn default_value() -> Value {
        Value::Null
    }

    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, Reflect::to_value)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: Reflect> Reflect for Box<T> {
    fn type_ref() -> TypeRef {
        T::type_ref()
    }

    fn register(registry: &TypeRegistry) -> Result<()> {
        T::register(registry)
    }

    fn default_value() -> Value {
        T::default_value()
    }

    fn to_value(&self) -> Value {
        (**self).to_value()
    }

    fn from_value(value: Value) -> Result<Self> {
        T::from_value(value).map(Box::new)
    }
}

fn collection_items(value: Value, expected: &str) -> Result<Vec<Value>> {
    match value {
        Value::Collection(c) => Ok(c.into_items()),
        other => Err(unexpected(expected, &other)),
    }
}

fn map_entries(value: Value, expected: &str) -> Result<Vec<(Value, Value)>> {
    match value {
        Value::Map(m) => Ok(m.into_entries()),
        other => Err(unexpected(expected, &other)),
    }
}

macro_rules! impl_reflect_collection {
    ($name:ident<$t:ident $(: $bound:path $(, $more:path)*)?> => $kind:ident) => {
        impl<$t: Reflect $(+ $bound $(+ $more)*)?> Reflect for $name<$t> {
            fn type_ref() -> TypeRef {
                TypeRef::collection(CollectionKind::$kind, $t::type_ref())
            }

            fn register(registry: &TypeRegistry) -> Result<()> {
                $t::register(registry)
            }

            fn default_value() -> Value {
                Collection::new(CollectionKind::$kind).into()
            }

            fn to_value(&self) -> Value {
                Collection::from_items(CollectionKind::$kind, self.iter().map(Reflect::to_value)).into()
            }

            fn from_value(value: Value) -> Result<Self> {
                collection_items(value, stringify!($name))?
                    .into_iter()
                    .map($t::from_value)
                    .collect()
            }
        }
    };
}

impl_reflect_collection!(Vec<T> => List);
impl_reflect_collection!(VecDeque<T> => Deque);
impl_reflect_collection!(LinkedList<T> => LinkedList);
impl_reflect_collection!(HashSet<T: Eq, Hash> => Set);
impl_reflect_collection!(BTreeSet<T: Ord> => SortedSet);

macro_rules! impl_reflect_map {
    ($name:ident<K: $($kb:path),+> => $kind:ident) => {
        impl<K: Reflect $(+ $kb)+, V: Reflect> Reflect for $name<K, V> {
            fn type_ref() -> TypeRef {
                TypeRef::map(MapKind::$kind, K::type_ref(), V::type_ref())
            }

            fn register(registry: &TypeRegistry) -> Result<()> {
                K::register(registry)?;
                V::register(registry)
            }

            fn default_value() -> Value {
                MapValue::new(MapKind::$kind).into()
            }

            fn to_value(&self) -> Value {
                MapValue::from_entries(
                    MapKind::$kind,
                    self.iter().map(|(k, v)| (k.to_value(), v.to_value())),
                )
                .into()
            }

            fn from_value(value: Value) -> Result<Self> {
                map_entries(value, stringify!($name))?
                    .into_iter()
                    .map(|(k, v)| Ok((K::from_value(k)?, V::from_value(v)?)))
                    .collect()
            }
        }
    };
}

impl_reflect_map!(HashMap<K: Eq, Hash> => Hash);
impl_reflect_map!(BTreeMap<K: Ord> => Sorted);

/// The registered name of `T`, when `T` is a structured or enum type.
pub fn type_name_of<T: Reflect>() -> Option<TypeName> {
    match T::type_ref() {
        TypeRef::Object(name) | TypeRef::Enum(name) => Some(name),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_widen_when_read_back() -> Result<()> {
        assert_eq!(i64::from_value(Value::from(7i32))?, 7);
        assert!(u8::from_value(Value::from(-1i32)).is_err());
        assert!(i32::from_value(Value::Null).is_err());
        Ok(())
    }

    #[test]
    fn option_over_primitive_is_boxed() -> Result<()> {
        assert_eq!(<Option<u16>>::type_ref(), TypeRef::Boxed(PrimitiveKind::U16));
        assert_eq!(<Option<String>>::type_ref(), TypeRef::String);
        assert_eq!(<Option<u16>>::from_value(Value::Null)?, None);
        assert_eq!(Some(3u16).to_value(), Value::from(3u16));
        Ok(())
    }

    #[test]
    fn containers_keep_their_kind() -> Result<()> {
        let set: BTreeSet<String> = ["b".to_string(), "a".to_string()].into();
        let value = set.to_value();
        assert_eq!(value.as_collection().map(Collection::kind), Some(CollectionKind::SortedSet));
        assert_eq!(BTreeSet::<String>::from_value(value)?, set);

        let map: HashMap<String, Vec<i32>> = [("k".to_string(), vec![1, 2])].into();
        assert_eq!(HashMap::<String, Vec<i32>>::from_value(map.to_value())?, map);
        Ok(())
    }

    #[test]
    fn only_named_types_have_a_type_name() {
        assert_eq!(type_name_of::<i32>(), None);
        assert_eq!(type_name_of::<Vec<String>>(), None);
    }

    #[test]
    fn reregistration_must_match_the_stored_attributes() -> Result<()> {
        use crate::schema::{AttributeDescriptor, StructSchema};

        let registry = TypeRegistry::new();
        let name = TypeName::new("t::Point");
        assert!(!already_registered(&registry, &name, &["x", "y"])?);

        registry.register_struct(
            StructSchema::builder(name.clone())
                .attribute(AttributeDescriptor::new("x", TypeRef::String))
                .attribute(AttributeDescriptor::new("y", TypeRef::String))
                .build(),
        )?;
        assert!(already_registered(&registry, &name, &["x", "y"])?);

        let clash = already_registered(&registry, &name, &["x", "y", "z"]);
        assert!(matches!(clash, Err(CopyError::InvalidInput(msg)) if msg.contains("t::Point")));
        Ok(())
    }
}
