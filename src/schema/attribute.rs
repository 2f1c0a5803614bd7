use serde::Serialize;

use super::type_ref::{TypeName, TypeRef};
use crate::value::Value;

/// Normalizes an attribute identity for matching: trimmed and lowercased.
pub fn normalize_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// A named, typed slot declared by a structured type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeDescriptor {
    /// Declared name. Object values are keyed by it.
    pub name: String,
    /// The type that declares the slot (may be an ancestor of the runtime type).
    pub declaring_type: TypeName,
    /// Static type of the slot.
    pub ty: TypeRef,
    /// Matching name override.
    pub alias: Option<String>,
    /// Per-attribute exclusion marker. Applies on either side.
    pub excluded: bool,
    /// Immutable class-level constant. Never copied.
    pub constant: bool,
    /// Value a fresh instance starts with.
    #[serde(skip)]
    pub default: Value,
}

impl AttributeDescriptor {
    /// A plain attribute with the implicit default of its type.
    ///
    /// The declaring type is filled in when the attribute is added to a
    /// [`StructSchema`](super::StructSchema).
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        let default = ty.default_value();
        Self {
            name: name.into(),
            declaring_type: TypeName::new(""),
            ty,
            alias: None,
            excluded: false,
            constant: false,
            default,
        }
    }

    /// Sets the matching alias.
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Marks the attribute excluded from copying.
    #[must_use]
    pub fn excluded(mut self) -> Self {
        self.excluded = true;
        self
    }

    /// Marks the attribute as a class-level constant.
    #[must_use]
    pub fn constant(mut self) -> Self {
        self.constant = true;
        self
    }

    /// Overrides the default value.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = value.into();
        self
    }

    /// `alias` if present, else `name`, normalized.
    pub fn key(&self) -> String {
        normalize_key(self.alias.as_deref().unwrap_or(&self.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::PrimitiveKind;

    #[test]
    fn key_prefers_alias_and_normalizes() {
        let plain = AttributeDescriptor::new("LongValue", TypeRef::Primitive(PrimitiveKind::I64));
        assert_eq!(plain.key(), "longvalue");

        let aliased = AttributeDescriptor::new("l_val", TypeRef::Primitive(PrimitiveKind::I64))
            .alias("  LONGVALUE ");
        assert_eq!(aliased.key(), "longvalue");
    }
}
