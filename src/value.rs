//! The dynamic value model the engine copies.
//!
//! A [`Value`] is an owned tree: structured objects own their attribute values,
//! containers own their elements. Lazily materialized stand-ins are the only
//! shared nodes ([`Value::Lazy`]).

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use twox_hash::XxHash64;

use crate::cache::FastMap;
use crate::proxy::LazyValue;
use crate::schema::{RawType, TypeName};

/// Primitive value kinds. Used both for unboxed (`TypeRef::Primitive`) and
/// boxed (`TypeRef::Boxed`) attribute types.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PrimitiveKind {
    Bool,
    Char,
    I8,
    I16,
    I32,
    I64,
    I128,
    U8,
    U16,
    U32,
    U64,
    U128,
    F32,
    F64,
}

impl PrimitiveKind {
    /// The zero value of the primitive (`0`, `0.0`, `false`, `'\0'`).
    pub fn zero(self) -> Scalar {
        match self {
            Self::Bool => Scalar::Bool(false),
            Self::Char => Scalar::Char('\0'),
            Self::I8 => Scalar::I8(0),
            Self::I16 => Scalar::I16(0),
            Self::I32 => Scalar::I32(0),
            Self::I64 => Scalar::I64(0),
            Self::I128 => Scalar::I128(0),
            Self::U8 => Scalar::U8(0),
            Self::U16 => Scalar::U16(0),
            Self::U32 => Scalar::U32(0),
            Self::U64 => Scalar::U64(0),
            Self::U128 => Scalar::U128(0),
            Self::F32 => Scalar::F32(0.0),
            Self::F64 => Scalar::F64(0.0),
        }
    }

    fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }
}

/// A single primitive value.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Bool(bool),
    Char(char),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    I128(i128),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    U128(u128),
    F32(#[serde(with = "float_format::single")] f32),
    F64(#[serde(with = "float_format::double")] f64),
}

/// Serde format of float scalars.
///
/// Human-readable formats have no literal for non-finite numbers, so NaN and
/// the infinities are written as the tokens `"NaN"`, `"inf"` and `"-inf"`.
/// Binary formats carry the raw float.
mod float_format {
    use std::fmt;

    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};

    const NAN: &str = "NaN";
    const INF: &str = "inf";
    const NEG_INF: &str = "-inf";

    fn token(v: f64) -> Option<&'static str> {
        if v.is_nan() {
            Some(NAN)
        } else if v == f64::INFINITY {
            Some(INF)
        } else if v == f64::NEG_INFINITY {
            Some(NEG_INF)
        } else {
            None
        }
    }

    struct FloatVisitor;

    impl Visitor<'_> for FloatVisitor {
        type Value = f64;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a number or one of \"NaN\", \"inf\", \"-inf\"")
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<f64, E> {
            Ok(v)
        }

        #[allow(clippy::cast_precision_loss)]
        fn visit_i64<E: de::Error>(self, v: i64) -> Result<f64, E> {
            Ok(v as f64)
        }

        #[allow(clippy::cast_precision_loss)]
        fn visit_u64<E: de::Error>(self, v: u64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<f64, E> {
            match v {
                NAN => Ok(f64::NAN),
                INF => Ok(f64::INFINITY),
                NEG_INF => Ok(f64::NEG_INFINITY),
                other => Err(E::invalid_value(de::Unexpected::Str(other), &self)),
            }
        }
    }

    pub(super) mod double {
        use super::{Deserializer, FloatVisitor, Serializer, token};

        pub fn serialize<S: Serializer>(v: &f64, serializer: S) -> Result<S::Ok, S::Error> {
            match token(*v) {
                Some(t) if serializer.is_human_readable() => serializer.serialize_str(t),
                _ => serializer.serialize_f64(*v),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
            if deserializer.is_human_readable() {
                deserializer.deserialize_any(FloatVisitor)
            } else {
                deserializer.deserialize_f64(FloatVisitor)
            }
        }
    }

    pub(super) mod single {
        use super::{Deserializer, FloatVisitor, Serializer, token};

        pub fn serialize<S: Serializer>(v: &f32, serializer: S) -> Result<S::Ok, S::Error> {
            match token(f64::from(*v)) {
                Some(t) if serializer.is_human_readable() => serializer.serialize_str(t),
                _ => serializer.serialize_f32(*v),
            }
        }

        #[allow(clippy::cast_possible_truncation)]
        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f32, D::Error> {
            let wide = if deserializer.is_human_readable() {
                deserializer.deserialize_any(FloatVisitor)?
            } else {
                deserializer.deserialize_f32(FloatVisitor)?
            };
            Ok(wide as f32)
        }
    }
}

impl Scalar {
    /// Returns the kind of this scalar.
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Self::Bool(_) => PrimitiveKind::Bool,
            Self::Char(_) => PrimitiveKind::Char,
            Self::I8(_) => PrimitiveKind::I8,
            Self::I16(_) => PrimitiveKind::I16,
            Self::I32(_) => PrimitiveKind::I32,
            Self::I64(_) => PrimitiveKind::I64,
            Self::I128(_) => PrimitiveKind::I128,
            Self::U8(_) => PrimitiveKind::U8,
            Self::U16(_) => PrimitiveKind::U16,
            Self::U32(_) => PrimitiveKind::U32,
            Self::U64(_) => PrimitiveKind::U64,
            Self::U128(_) => PrimitiveKind::U128,
            Self::F32(_) => PrimitiveKind::F32,
            Self::F64(_) => PrimitiveKind::F64,
        }
    }

    fn hash_structure<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        match *self {
            Self::Bool(v) => v.hash(state),
            Self::Char(v) => v.hash(state),
            Self::I8(v) => v.hash(state),
            Self::I16(v) => v.hash(state),
            Self::I32(v) => v.hash(state),
            Self::I64(v) => v.hash(state),
            Self::I128(v) => v.hash(state),
            Self::U8(v) => v.hash(state),
            Self::U16(v) => v.hash(state),
            Self::U32(v) => v.hash(state),
            Self::U64(v) => v.hash(state),
            Self::U128(v) => v.hash(state),
            // `0.0 == -0.0`, so both zeros share a hash.
            Self::F32(v) => (if v == 0.0 { 0 } else { v.to_bits() }).hash(state),
            Self::F64(v) => (if v == 0.0 { 0 } else { v.to_bits() }).hash(state),
        }
    }

    /// True when the scalar equals the zero value of its own kind.
    pub fn is_default(&self) -> bool {
        *self == self.kind().zero()
    }

    fn integral(&self) -> Option<i128> {
        match *self {
            Self::Char(c) => Some(i128::from(u32::from(c))),
            Self::I8(v) => Some(i128::from(v)),
            Self::I16(v) => Some(i128::from(v)),
            Self::I32(v) => Some(i128::from(v)),
            Self::I64(v) => Some(i128::from(v)),
            Self::I128(v) => Some(v),
            Self::U8(v) => Some(i128::from(v)),
            Self::U16(v) => Some(i128::from(v)),
            Self::U32(v) => Some(i128::from(v)),
            Self::U64(v) => Some(i128::from(v)),
            Self::U128(v) => i128::try_from(v).ok(),
            Self::Bool(_) | Self::F32(_) | Self::F64(_) => None,
        }
    }

    /// Converts the scalar into `kind` when the value survives unchanged.
    ///
    /// Integers convert between widths when in range, integers convert into
    /// floats when exactly representable, `f32` widens to `f64`. Floats never
    /// convert into integers and `bool` never converts at all.
    pub fn convert_to(&self, kind: PrimitiveKind) -> Option<Scalar> {
        if self.kind() == kind {
            return Some(*self);
        }
        if kind.is_float() {
            return self.to_float(kind);
        }
        let wide = self.integral()?;
        let converted = match kind {
            PrimitiveKind::Char => Scalar::Char(char::from_u32(u32::try_from(wide).ok()?)?),
            PrimitiveKind::I8 => Scalar::I8(i8::try_from(wide).ok()?),
            PrimitiveKind::I16 => Scalar::I16(i16::try_from(wide).ok()?),
            PrimitiveKind::I32 => Scalar::I32(i32::try_from(wide).ok()?),
            PrimitiveKind::I64 => Scalar::I64(i64::try_from(wide).ok()?),
            PrimitiveKind::I128 => Scalar::I128(wide),
            PrimitiveKind::U8 => Scalar::U8(u8::try_from(wide).ok()?),
            PrimitiveKind::U16 => Scalar::U16(u16::try_from(wide).ok()?),
            PrimitiveKind::U32 => Scalar::U32(u32::try_from(wide).ok()?),
            PrimitiveKind::U64 => Scalar::U64(u64::try_from(wide).ok()?),
            PrimitiveKind::U128 => Scalar::U128(u128::try_from(wide).ok()?),
            PrimitiveKind::Bool | PrimitiveKind::F32 | PrimitiveKind::F64 => return None,
        };
        Some(converted)
    }

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    fn to_float(&self, kind: PrimitiveKind) -> Option<Scalar> {
        match (*self, kind) {
            (Self::F32(v), PrimitiveKind::F64) => Some(Scalar::F64(f64::from(v))),
            (Self::F64(v), PrimitiveKind::F32) => {
                let narrowed = v as f32;
                (f64::from(narrowed) == v || v.is_nan()).then_some(Scalar::F32(narrowed))
            }
            (Self::Char(_) | Self::Bool(_), _) => None,
            (other, PrimitiveKind::F64) => {
                let wide = other.integral()?;
                let f = wide as f64;
                (f as i128 == wide).then_some(Scalar::F64(f))
            }
            (other, PrimitiveKind::F32) => {
                let wide = other.integral()?;
                let f = wide as f32;
                (f as i128 == wide).then_some(Scalar::F32(f))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Char(v) => write!(f, "{v}"),
            Self::I8(v) => write!(f, "{v}"),
            Self::I16(v) => write!(f, "{v}"),
            Self::I32(v) => write!(f, "{v}"),
            Self::I64(v) => write!(f, "{v}"),
            Self::I128(v) => write!(f, "{v}"),
            Self::U8(v) => write!(f, "{v}"),
            Self::U16(v) => write!(f, "{v}"),
            Self::U32(v) => write!(f, "{v}"),
            Self::U64(v) => write!(f, "{v}"),
            Self::U128(v) => write!(f, "{v}"),
            Self::F32(v) => write!(f, "{v}"),
            Self::F64(v) => write!(f, "{v}"),
        }
    }
}

/// A constant of an enumerated type, identified by its textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnumValue {
    /// The enum type the constant belongs to.
    pub type_name: TypeName,
    /// The textual form of the constant.
    pub constant: String,
}

impl EnumValue {
    /// Creates a constant reference.
    pub fn new(type_name: impl Into<TypeName>, constant: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            constant: constant.into(),
        }
    }
}

impl fmt::Display for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.constant)
    }
}

/// An instance of a structured (multi-attribute) type.
///
/// Attribute values are keyed by declared attribute name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    type_name: TypeName,
    fields: BTreeMap<String, Value>,
}

impl Object {
    /// Creates an empty instance of `type_name`. Prefer
    /// [`TypeRegistry::instantiate`](crate::schema::TypeRegistry::instantiate),
    /// which fills in attribute defaults.
    pub fn new(type_name: impl Into<TypeName>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style setter.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// The runtime type of the instance.
    pub fn type_name(&self) -> &TypeName {
        &self.type_name
    }

    /// Reads an attribute value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Mutable access to an attribute value.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields.get_mut(name)
    }

    /// Writes an attribute value, returning the previous one.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(name.into(), value.into())
    }

    /// Removes an attribute value.
    pub fn take(&mut self, name: &str) -> Option<Value> {
        self.fields.remove(name)
    }

    /// Iterates over `(attribute name, value)` pairs in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub(crate) fn fields_mut(&mut self) -> impl Iterator<Item = (&String, &mut Value)> {
        self.fields.iter_mut()
    }

    /// Number of populated attributes.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when no attribute is populated.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Structural shape of a collection, used to pick a fallback implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionShape {
    /// Indexed sequence.
    List,
    /// FIFO sequence.
    Queue,
    /// Double-ended sequence.
    Deque,
    /// Unique elements.
    Set,
}

impl CollectionShape {
    /// The canonical implementation for the shape.
    pub fn canonical(self) -> CollectionKind {
        match self {
            Self::Set => CollectionKind::Set,
            Self::Deque => CollectionKind::Deque,
            Self::Queue => CollectionKind::LinkedList,
            Self::List => CollectionKind::List,
        }
    }
}

/// Concrete single-parameter container implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectionKind {
    /// Growable array (`Vec`). As a declared type it means "any list".
    List,
    /// Doubly linked list.
    LinkedList,
    /// Ring-buffer deque (`VecDeque`).
    Deque,
    /// Hash set. As a declared type it means "any set".
    Set,
    /// Insertion-ordered set.
    LinkedSet,
    /// Sorted set (`BTreeSet`).
    SortedSet,
}

impl CollectionKind {
    /// Capability query used for fallback dispatch.
    pub fn shape(self) -> CollectionShape {
        match self {
            Self::List => CollectionShape::List,
            Self::LinkedList => CollectionShape::Queue,
            Self::Deque => CollectionShape::Deque,
            Self::Set | Self::LinkedSet | Self::SortedSet => CollectionShape::Set,
        }
    }

    /// True when elements are unique.
    pub fn is_set(self) -> bool {
        self.shape() == CollectionShape::Set
    }

    /// Whether an attribute declared with `self` may hold a runtime collection of `runtime`.
    pub fn accepts(self, runtime: CollectionKind) -> bool {
        match self {
            Self::List => matches!(runtime, Self::List | Self::LinkedList),
            Self::Deque => matches!(runtime, Self::Deque | Self::LinkedList),
            Self::Set => runtime.is_set(),
            other => other == runtime,
        }
    }
}

/// Concrete key-value container implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MapKind {
    /// Hash map. As a declared type it means "any map".
    Hash,
    /// Insertion-ordered map.
    Linked,
    /// Sorted map (`BTreeMap`).
    Sorted,
    /// Map safe for concurrent mutation.
    Concurrent,
}

impl MapKind {
    /// Whether an attribute declared with `self` may hold a runtime map of `runtime`.
    pub fn accepts(self, runtime: MapKind) -> bool {
        self == Self::Hash || self == runtime
    }
}

/// Hash index over the unique members of a container: set items or map keys.
///
/// Positions are bucketed by [`Value::fingerprint`]. The index is derived
/// state: it never takes part in equality, is not serialized, and catches up
/// with members it has not seen yet (such as decoded ones) on the next insert.
#[derive(Clone, Default)]
struct MemberIndex {
    buckets: FastMap<u64, Vec<usize>>,
    indexed: usize,
}

impl MemberIndex {
    /// Indexes every member past the last indexed position.
    fn sync<T>(&mut self, slots: &[T], member: impl Fn(&T) -> &Value) {
        for (position, slot) in slots.iter().enumerate().skip(self.indexed) {
            self.buckets.entry(member(slot).fingerprint()).or_default().push(position);
        }
        self.indexed = slots.len();
    }

    /// Position of the member equal to `wanted`. Only valid after [`Self::sync`].
    fn find<T>(&self, slots: &[T], hash: u64, wanted: &Value, member: impl Fn(&T) -> &Value) -> Option<usize> {
        self.buckets
            .get(&hash)?
            .iter()
            .copied()
            .find(|&position| slots.get(position).is_some_and(|slot| member(slot) == wanted))
    }

    fn record(&mut self, hash: u64, position: usize) {
        self.buckets.entry(hash).or_default().push(position);
        self.indexed = position + 1;
    }

    fn is_current(&self, len: usize) -> bool {
        self.indexed == len
    }
}

impl PartialEq for MemberIndex {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl fmt::Debug for MemberIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberIndex").field("indexed", &self.indexed).finish()
    }
}

/// A populated ordered sequence or set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    kind: CollectionKind,
    frozen: bool,
    items: Vec<Value>,
    #[serde(skip)]
    index: MemberIndex,
}

impl Collection {
    /// Creates an empty, modifiable collection.
    pub fn new(kind: CollectionKind) -> Self {
        Self {
            kind,
            frozen: false,
            items: Vec::new(),
            index: MemberIndex::default(),
        }
    }

    /// Creates a modifiable collection from items. Set kinds drop duplicates.
    pub fn from_items(kind: CollectionKind, items: impl IntoIterator<Item = Value>) -> Self {
        let mut collection = Self::new(kind);
        collection.extend(items);
        collection
    }

    /// Creates an unmodifiable collection. It cannot be re-instantiated empty,
    /// so rebuilding it falls back to the canonical kind of its shape.
    pub fn frozen(kind: CollectionKind, items: impl IntoIterator<Item = Value>) -> Self {
        let mut collection = Self::from_items(kind, items);
        collection.frozen = true;
        collection
    }

    /// The implementation kind.
    pub fn kind(&self) -> CollectionKind {
        self.kind
    }

    /// True for unmodifiable instances.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// The kind a rebuilt copy of this collection gets.
    pub fn rebuild_kind(&self) -> CollectionKind {
        if self.frozen {
            self.kind.shape().canonical()
        } else {
            self.kind
        }
    }

    /// Appends an item. Set kinds ignore duplicates.
    pub fn push(&mut self, item: Value) {
        if self.kind.is_set() {
            self.index.sync(&self.items, |v| v);
            let hash = item.fingerprint();
            if self.index.find(&self.items, hash, &item, |v| v).is_some() {
                return;
            }
            self.index.record(hash, self.items.len());
        }
        self.items.push(item);
    }

    /// The elements in iteration order.
    pub fn items(&self) -> &[Value] {
        &self.items
    }

    /// Consumes the collection into its elements.
    pub fn into_items(self) -> Vec<Value> {
        self.items
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when there are no elements.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Extend<Value> for Collection {
    fn extend<I: IntoIterator<Item = Value>>(&mut self, iter: I) {
        for item in iter {
            self.push(item);
        }
    }
}

/// A populated key-value map. Entries keep insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapValue {
    kind: MapKind,
    frozen: bool,
    entries: Vec<(Value, Value)>,
    #[serde(skip)]
    index: MemberIndex,
}

impl MapValue {
    /// Creates an empty, modifiable map.
    pub fn new(kind: MapKind) -> Self {
        Self {
            kind,
            frozen: false,
            entries: Vec::new(),
            index: MemberIndex::default(),
        }
    }

    /// Creates a modifiable map from entries. Later duplicates replace earlier ones.
    pub fn from_entries(kind: MapKind, entries: impl IntoIterator<Item = (Value, Value)>) -> Self {
        let mut map = Self::new(kind);
        map.extend(entries);
        map
    }

    /// Creates an unmodifiable map.
    pub fn frozen(kind: MapKind, entries: impl IntoIterator<Item = (Value, Value)>) -> Self {
        let mut map = Self::from_entries(kind, entries);
        map.frozen = true;
        map
    }

    /// The implementation kind.
    pub fn kind(&self) -> MapKind {
        self.kind
    }

    /// True for unmodifiable instances.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// The kind a rebuilt copy of this map gets. Every map kind is its own
    /// canonical fallback, so only the frozen flag is dropped.
    pub fn rebuild_kind(&self) -> MapKind {
        self.kind
    }

    /// Inserts an entry, replacing the value of an equal key.
    pub fn insert(&mut self, key: Value, value: Value) -> Option<Value> {
        self.index.sync(&self.entries, |(k, _)| k);
        let hash = key.fingerprint();
        let existing = self.index.find(&self.entries, hash, &key, |(k, _)| k);
        if let Some(slot) = existing.and_then(|position| self.entries.get_mut(position)) {
            return Some(std::mem::replace(&mut slot.1, value));
        }
        self.index.record(hash, self.entries.len());
        self.entries.push((key, value));
        None
    }

    /// Looks up the value of `key`.
    pub fn get(&self, key: &Value) -> Option<&Value> {
        let position = if self.index.is_current(self.entries.len()) {
            self.index.find(&self.entries, key.fingerprint(), key, |(k, _)| k)
        } else {
            self.entries.iter().position(|(k, _)| k == key)
        };
        position.and_then(|p| self.entries.get(p)).map(|(_, v)| v)
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[(Value, Value)] {
        &self.entries
    }

    /// Iterates over the values.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }

    /// Consumes the map into its entries.
    pub fn into_entries(self) -> Vec<(Value, Value)> {
        self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Extend<(Value, Value)> for MapValue {
    fn extend<I: IntoIterator<Item = (Value, Value)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

/// A node of the value tree.
// `Lazy` must stay the last variant: it is skipped by serde, and keeping it
// last leaves the variant indices of binary encodings stable.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    /// The absent value.
    #[default]
    Null,
    /// A primitive.
    Scalar(Scalar),
    /// A string.
    Str(String),
    /// An enum constant.
    Enum(EnumValue),
    /// A structured instance.
    Object(Object),
    /// A sequence or set.
    Collection(Collection),
    /// A key-value map.
    Map(MapValue),
    /// A lazily materialized stand-in. Never serialized.
    #[serde(skip)]
    Lazy(LazyValue),
}

impl Value {
    /// True for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// True for collections and maps.
    pub fn is_container(&self) -> bool {
        matches!(self, Self::Collection(_) | Self::Map(_))
    }

    /// Structural hash consistent with `==`: equal values hash equal.
    pub(crate) fn fingerprint(&self) -> u64 {
        let mut hasher = XxHash64::default();
        self.hash_structure(&mut hasher);
        hasher.finish()
    }

    fn hash_structure<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Null => {}
            Self::Scalar(s) => s.hash_structure(state),
            Self::Str(s) => s.hash(state),
            Self::Enum(e) => e.hash(state),
            Self::Object(o) => {
                o.type_name.hash(state);
                for (name, value) in &o.fields {
                    name.hash(state);
                    value.hash_structure(state);
                }
            }
            Self::Collection(c) => {
                c.kind.hash(state);
                c.frozen.hash(state);
                state.write_usize(c.items.len());
                for item in &c.items {
                    item.hash_structure(state);
                }
            }
            Self::Map(m) => {
                m.kind.hash(state);
                m.frozen.hash(state);
                state.write_usize(m.entries.len());
                for (k, v) in &m.entries {
                    k.hash_structure(state);
                    v.hash_structure(state);
                }
            }
            // Equality of stand-ins is identity, so any hash of the backing
            // type is consistent with it.
            Self::Lazy(l) => l.backing_type().hash(state),
        }
    }

    /// The runtime type of the value. A primitive value is always reported
    /// boxed, since a runtime scalar carries no "unboxed" evidence.
    pub fn runtime_type(&self) -> RawType {
        match self {
            Self::Null => RawType::Unknown,
            Self::Scalar(s) => RawType::Boxed(s.kind()),
            Self::Str(_) => RawType::String,
            Self::Enum(e) => RawType::Enum(e.type_name.clone()),
            Self::Object(o) => RawType::Object(o.type_name().clone()),
            Self::Collection(c) => RawType::Collection(c.kind()),
            Self::Map(m) => RawType::Map(m.kind()),
            Self::Lazy(l) => RawType::Object(l.backing_type().clone()),
        }
    }

    /// Borrows the object, if this is one.
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Borrows the scalar, if this is one.
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Borrows the string, if this is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Borrows the collection, if this is one.
    pub fn as_collection(&self) -> Option<&Collection> {
        match self {
            Self::Collection(c) => Some(c),
            _ => None,
        }
    }

    /// Borrows the map, if this is one.
    pub fn as_map(&self) -> Option<&MapValue> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// A short description for error messages.
    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Scalar(s) => format!("{:?} {s}", s.kind()),
            Self::Str(_) => "string".to_string(),
            Self::Enum(e) => format!("enum {}::{}", e.type_name, e.constant),
            Self::Object(o) => format!("object {}", o.type_name()),
            Self::Collection(c) => format!("{:?} collection", c.kind()),
            Self::Map(m) => format!("{:?} map", m.kind()),
            Self::Lazy(l) => format!("lazy {}", l.backing_type()),
        }
    }
}

macro_rules! impl_from_scalar {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for Scalar {
                fn from(v: $t) -> Self {
                    Scalar::$variant(v)
                }
            }

            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Scalar(Scalar::$variant(v))
                }
            }
        )*
    };
}

impl_from_scalar!(
    bool => Bool, char => Char,
    i8 => I8, i16 => I16, i32 => I32, i64 => I64, i128 => I128,
    u8 => U8, u16 => U16, u32 => U32, u64 => U64, u128 => U128,
    f32 => F32, f64 => F64,
);

impl From<Scalar> for Value {
    fn from(v: Scalar) -> Self {
        Value::Scalar(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<EnumValue> for Value {
    fn from(v: EnumValue) -> Self {
        Value::Enum(v)
    }
}

impl From<Object> for Value {
    fn from(v: Object) -> Self {
        Value::Object(v)
    }
}

impl From<Collection> for Value {
    fn from(v: Collection) -> Self {
        Value::Collection(v)
    }
}

impl From<MapValue> for Value {
    fn from(v: MapValue) -> Self {
        Value::Map(v)
    }
}

impl From<LazyValue> for Value {
    fn from(v: LazyValue) -> Self {
        Value::Lazy(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_conversion_preserves_value_only() {
        assert_eq!(Scalar::I32(7).convert_to(PrimitiveKind::I64), Some(Scalar::I64(7)));
        assert_eq!(Scalar::I64(300).convert_to(PrimitiveKind::U8), None);
        assert_eq!(Scalar::I16(-3).convert_to(PrimitiveKind::F32), Some(Scalar::F32(-3.0)));
        assert_eq!(Scalar::F64(1.5).convert_to(PrimitiveKind::I64), None);
        assert_eq!(Scalar::F32(0.25).convert_to(PrimitiveKind::F64), Some(Scalar::F64(0.25)));
        assert_eq!(Scalar::Bool(true).convert_to(PrimitiveKind::I32), None);
        assert_eq!(Scalar::U8(65).convert_to(PrimitiveKind::Char), Some(Scalar::Char('A')));
    }

    #[test]
    fn set_kinds_ignore_duplicates() {
        let set = Collection::from_items(CollectionKind::Set, [Value::from(1), 2.into(), 1.into()]);
        assert_eq!(set.len(), 2);

        let list = Collection::from_items(CollectionKind::List, [Value::from(1), 1.into()]);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn frozen_collections_rebuild_to_shape_canonical_kind() {
        let frozen = Collection::frozen(CollectionKind::LinkedSet, [Value::from("a")]);
        assert_eq!(frozen.rebuild_kind(), CollectionKind::Set);

        let frozen = Collection::frozen(CollectionKind::Deque, Vec::new());
        assert_eq!(frozen.rebuild_kind(), CollectionKind::Deque);

        let modifiable = Collection::new(CollectionKind::SortedSet);
        assert_eq!(modifiable.rebuild_kind(), CollectionKind::SortedSet);
    }

    #[test]
    fn map_insert_replaces_equal_keys() {
        let mut map = MapValue::new(MapKind::Linked);
        assert_eq!(map.insert("k".into(), 1.into()), None);
        assert_eq!(map.insert("k".into(), 2.into()), Some(Value::from(1)));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&"k".into()), Some(&Value::from(2)));
    }

    #[test]
    fn equal_values_share_a_fingerprint() {
        assert_eq!(Value::from(0.0f64).fingerprint(), Value::from(-0.0f64).fingerprint());

        let a = Object::new("t::A").with("x", 1).with("y", "b");
        let b = Object::new("t::A").with("y", "b").with("x", 1);
        assert_eq!(Value::from(a).fingerprint(), Value::from(b).fingerprint());

        assert_ne!(Value::from(1i32).fingerprint(), Value::from(1i64).fingerprint());
    }

    #[test]
    fn large_sets_stay_unique() {
        let items = (0..20_000i32).chain(0..20_000).map(Value::from);
        let set = Collection::from_items(CollectionKind::Set, items);
        assert_eq!(set.len(), 20_000);

        let entries = (0..20_000i32).map(|i| (Value::from(i % 5_000), Value::from(i)));
        let map = MapValue::from_entries(MapKind::Hash, entries);
        assert_eq!(map.len(), 5_000);
        assert_eq!(map.get(&Value::from(7)), Some(&Value::from(15_007)));
    }

    #[test]
    fn decoded_containers_keep_deduplicating() -> Result<(), serde_json::Error> {
        let set = Collection::from_items(CollectionKind::Set, [Value::from("a"), "b".into()]);
        let mut decoded: Collection = serde_json::from_str(&serde_json::to_string(&set)?)?;
        assert_eq!(decoded, set);
        decoded.push("a".into());
        decoded.push("c".into());
        assert_eq!(decoded.len(), 3);

        let map = MapValue::from_entries(MapKind::Sorted, [("k".into(), Value::from(1))]);
        let mut decoded: MapValue = serde_json::from_str(&serde_json::to_string(&map)?)?;
        assert_eq!(decoded.get(&"k".into()), Some(&Value::from(1)));
        assert_eq!(decoded.insert("k".into(), 2.into()), Some(Value::from(1)));
        assert_eq!(decoded.len(), 1);
        Ok(())
    }

    #[test]
    fn non_finite_floats_survive_both_formats() -> Result<(), Box<dyn std::error::Error>> {
        let values = [
            Value::from(f64::INFINITY),
            Value::from(f64::NEG_INFINITY),
            Value::from(f32::INFINITY),
            Value::from(0.1f32),
            Value::from(-2.5f64),
        ];
        for value in &values {
            let text: Value = serde_json::from_str(&serde_json::to_string(value)?)?;
            assert_eq!(&text, value);
            let bytes = bincode::serde::encode_to_vec(value, bincode::config::standard())?;
            let (binary, _): (Value, usize) = bincode::serde::decode_from_slice(&bytes, bincode::config::standard())?;
            assert_eq!(&binary, value);
        }

        let text = serde_json::to_string(&Value::from(f64::NAN))?;
        assert_eq!(text, r#"{"Scalar":{"F64":"NaN"}}"#);
        let decoded: Value = serde_json::from_str(&text)?;
        assert!(matches!(decoded, Value::Scalar(Scalar::F64(v)) if v.is_nan()));

        let bad = serde_json::from_str::<Value>(r#"{"Scalar":{"F64":"nope"}}"#);
        assert!(bad.is_err());
        Ok(())
    }
}
