use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::value::{CollectionKind, MapKind, PrimitiveKind, Value};

/// The fully qualified name of a registered type.
///
/// Cheap to clone. Derived types use `module_path!()::Ident` unless renamed.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeName(Arc<str>);

impl TypeName {
    /// Creates a type name.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// The full name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The last path segment (`Foo` for `app::model::Foo`).
    pub fn simple_name(&self) -> &str {
        self.0.rsplit("::").next().unwrap_or(&self.0)
    }
}

impl fmt::Debug for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeName({})", self.0)
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeName {
    fn from(v: &str) -> Self {
        Self::new(v)
    }
}

impl From<String> for TypeName {
    fn from(v: String) -> Self {
        Self(Arc::from(v))
    }
}

impl From<&TypeName> for TypeName {
    fn from(v: &TypeName) -> Self {
        v.clone()
    }
}

impl AsRef<str> for TypeName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Static type of an attribute. Container descriptors nest arbitrarily deep.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeRef {
    /// Unboxed primitive: never absent, defaults to zero.
    Primitive(PrimitiveKind),
    /// Nullable primitive (`Option<i32>` and friends).
    Boxed(PrimitiveKind),
    /// Owned text.
    String,
    /// A registered enum.
    Enum(TypeName),
    /// A registered structured type.
    Object(TypeName),
    /// A sequence or set of `element`.
    #[allow(missing_docs)]
    Collection {
        kind: CollectionKind,
        element: Box<TypeRef>,
    },
    /// A map from `key` to `value`.
    #[allow(missing_docs)]
    Map {
        kind: MapKind,
        key: Box<TypeRef>,
        value: Box<TypeRef>,
    },
    /// Erased or unresolvable type argument.
    Unknown,
}

impl TypeRef {
    /// An object type reference.
    pub fn object(name: impl Into<TypeName>) -> Self {
        Self::Object(name.into())
    }

    /// An enum type reference.
    pub fn enumeration(name: impl Into<TypeName>) -> Self {
        Self::Enum(name.into())
    }

    /// A collection descriptor.
    pub fn collection(kind: CollectionKind, element: TypeRef) -> Self {
        Self::Collection {
            kind,
            element: Box::new(element),
        }
    }

    /// Shorthand for a [`CollectionKind::List`] descriptor.
    pub fn list(element: TypeRef) -> Self {
        Self::collection(CollectionKind::List, element)
    }

    /// A map descriptor.
    pub fn map(kind: MapKind, key: TypeRef, value: TypeRef) -> Self {
        Self::Map {
            kind,
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    /// The type with generic arguments erased.
    pub fn raw(&self) -> RawType {
        match self {
            Self::Primitive(k) => RawType::Primitive(*k),
            Self::Boxed(k) => RawType::Boxed(*k),
            Self::String => RawType::String,
            Self::Enum(n) => RawType::Enum(n.clone()),
            Self::Object(n) => RawType::Object(n.clone()),
            Self::Collection { kind, .. } => RawType::Collection(*kind),
            Self::Map { kind, .. } => RawType::Map(*kind),
            Self::Unknown => RawType::Unknown,
        }
    }

    /// Primitive, boxed primitive, string or enum.
    pub fn is_simple(&self) -> bool {
        matches!(
            self,
            Self::Primitive(_) | Self::Boxed(_) | Self::String | Self::Enum(_)
        )
    }

    /// Collection or map.
    pub fn is_container(&self) -> bool {
        matches!(self, Self::Collection { .. } | Self::Map { .. })
    }

    /// The implicit value of a fresh attribute of this type.
    pub fn default_value(&self) -> Value {
        match self {
            Self::Primitive(k) => Value::Scalar(k.zero()),
            _ => Value::Null,
        }
    }

    /// True when `value` is the implicit default of a primitive of this type.
    pub(crate) fn is_primitive_default(&self, value: &Value) -> bool {
        matches!((self, value), (Self::Primitive(_), Value::Scalar(s)) if s.is_default())
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(k) => write!(f, "{k:?}"),
            Self::Boxed(k) => write!(f, "Option<{k:?}>"),
            Self::String => f.write_str("String"),
            Self::Enum(n) | Self::Object(n) => write!(f, "{n}"),
            Self::Collection { kind, element } => write!(f, "{kind:?}<{element}>"),
            Self::Map { kind, key, value } => write!(f, "{kind:?}Map<{key}, {value}>"),
            Self::Unknown => f.write_str("?"),
        }
    }
}

/// A type with its generic arguments erased.
///
/// Used for the "identical type" test: `List<Foo>` and `List<Bar>` share the
/// raw type `Collection(List)`.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum RawType {
    Primitive(PrimitiveKind),
    Boxed(PrimitiveKind),
    String,
    Enum(TypeName),
    Object(TypeName),
    Collection(CollectionKind),
    Map(MapKind),
    Unknown,
}

impl RawType {
    /// Collection or map.
    pub fn is_container(&self) -> bool {
        matches!(self, Self::Collection(_) | Self::Map(_))
    }
}
