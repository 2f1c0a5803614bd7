use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use serde::Serialize;
use tracing::trace;

use super::attribute::{AttributeDescriptor, normalize_key};
use super::type_ref::TypeName;
use crate::error::{CopyError, Result};
use crate::value::{EnumValue, Object};

/// Type-level exclusion policy. Names are stored normalized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExclusionPolicy {
    /// Excluded only when the type (or a descendant) is the copy destination.
    pub destination_only: BTreeSet<String>,
    /// Excluded whichever side the type is on.
    pub either_side: BTreeSet<String>,
}

impl ExclusionPolicy {
    /// True when neither set has names.
    pub fn is_empty(&self) -> bool {
        self.destination_only.is_empty() && self.either_side.is_empty()
    }
}

/// Descriptor of a structured type.
#[derive(Debug, Clone, Serialize)]
pub struct StructSchema {
    /// Fully qualified name.
    pub name: TypeName,
    /// Direct ancestor. `None` marks a root.
    pub parent: Option<TypeName>,
    /// Attributes declared by this type itself, in declaration order.
    pub attributes: Vec<Arc<AttributeDescriptor>>,
    /// Type-level exclusions.
    pub exclusions: ExclusionPolicy,
    /// False for abstract types.
    pub constructible: bool,
}

impl StructSchema {
    /// Starts a schema for `name`.
    pub fn builder(name: impl Into<TypeName>) -> StructSchemaBuilder {
        StructSchemaBuilder {
            schema: StructSchema {
                name: name.into(),
                parent: None,
                attributes: Vec::new(),
                exclusions: ExclusionPolicy::default(),
                constructible: true,
            },
        }
    }

    /// Looks up an attribute declared by this type.
    pub fn attribute(&self, name: &str) -> Option<&Arc<AttributeDescriptor>> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// Fluent construction of a [`StructSchema`].
#[derive(Debug)]
pub struct StructSchemaBuilder {
    schema: StructSchema,
}

impl StructSchemaBuilder {
    /// Sets the direct ancestor.
    #[must_use]
    pub fn parent(mut self, parent: impl Into<TypeName>) -> Self {
        self.schema.parent = Some(parent.into());
        self
    }

    /// Declares an attribute.
    #[must_use]
    pub fn attribute(mut self, mut attribute: AttributeDescriptor) -> Self {
        attribute.declaring_type = self.schema.name.clone();
        self.schema.attributes.push(Arc::new(attribute));
        self
    }

    /// Adds either-side exclusions.
    #[must_use]
    pub fn exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.schema
            .exclusions
            .either_side
            .extend(names.into_iter().map(|n| normalize_key(n.as_ref())));
        self
    }

    /// Adds destination-only exclusions.
    #[must_use]
    pub fn exclude_as_destination<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.schema
            .exclusions
            .destination_only
            .extend(names.into_iter().map(|n| normalize_key(n.as_ref())));
        self
    }

    /// Marks the type abstract.
    #[must_use]
    pub fn abstract_type(mut self) -> Self {
        self.schema.constructible = false;
        self
    }

    /// Finishes the schema.
    pub fn build(self) -> StructSchema {
        self.schema
    }
}

/// Descriptor of an enumerated type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumSchema {
    /// Fully qualified name.
    pub name: TypeName,
    /// Textual forms of the constants, in declaration order.
    pub constants: Vec<String>,
}

impl EnumSchema {
    /// Creates an enum schema.
    pub fn new<I, S>(name: impl Into<TypeName>, constants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            constants: constants.into_iter().map(Into::into).collect(),
        }
    }

    /// The constant whose textual form is exactly `text`.
    pub fn constant(&self, text: &str) -> Option<EnumValue> {
        self.constants
            .iter()
            .find(|c| c.as_str() == text)
            .map(|c| EnumValue::new(self.name.clone(), c.clone()))
    }
}

/// The store of schema descriptors. Thread-safe, append-only.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    structs: RwLock<HashMap<TypeName, Arc<StructSchema>>>,
    enums: RwLock<HashMap<TypeName, Arc<EnumSchema>>>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a structured type. Returns `false` when the name was already
    /// registered (the first registration wins).
    ///
    /// # Errors
    /// * `UnknownType` if the declared parent is not registered.
    /// * `InvalidInput` if an attribute name repeats within the type or
    ///   shadows an ancestor attribute.
    pub fn register_struct(&self, schema: StructSchema) -> Result<bool> {
        if self.contains(&schema.name) {
            return Ok(false);
        }

        let mut seen = BTreeSet::new();
        for attribute in &schema.attributes {
            if !seen.insert(attribute.name.as_str()) {
                return Err(CopyError::InvalidInput(format!(
                    "Attribute '{}' is declared twice in {}",
                    attribute.name, schema.name
                )));
            }
        }

        if let Some(parent) = &schema.parent {
            let ancestors = self.ancestors(parent)?;
            for ancestor in &ancestors {
                if let Some(shadowed) = schema
                    .attributes
                    .iter()
                    .find(|a| ancestor.attribute(&a.name).is_some())
                {
                    return Err(CopyError::InvalidInput(format!(
                        "Attribute '{}' of {} shadows the one declared by {}",
                        shadowed.name, schema.name, ancestor.name
                    )));
                }
            }
        }

        trace!(type_name = %schema.name, "registering struct schema");
        let mut guard = self.structs.write().unwrap_or_else(|p| p.into_inner());
        let inserted = !guard.contains_key(&schema.name);
        if inserted {
            guard.insert(schema.name.clone(), Arc::new(schema));
        }
        Ok(inserted)
    }

    /// Registers an enumerated type. Returns `false` when already registered.
    pub fn register_enum(&self, schema: EnumSchema) -> bool {
        let mut guard = self.enums.write().unwrap_or_else(|p| p.into_inner());
        if guard.contains_key(&schema.name) {
            return false;
        }
        trace!(type_name = %schema.name, "registering enum schema");
        guard.insert(schema.name.clone(), Arc::new(schema));
        true
    }

    /// True when `name` is registered as a struct or an enum.
    pub fn contains(&self, name: &TypeName) -> bool {
        self.struct_schema(name).is_some() || self.enum_schema(name).is_some()
    }

    /// The struct schema of `name`.
    pub fn struct_schema(&self, name: &TypeName) -> Option<Arc<StructSchema>> {
        let guard = self.structs.read().unwrap_or_else(|p| p.into_inner());
        guard.get(name).cloned()
    }

    /// The enum schema of `name`.
    pub fn enum_schema(&self, name: &TypeName) -> Option<Arc<EnumSchema>> {
        let guard = self.enums.read().unwrap_or_else(|p| p.into_inner());
        guard.get(name).cloned()
    }

    /// `name` followed by its ancestors, nearest first.
    ///
    /// # Errors
    /// `UnknownType` if any link of the chain is unregistered.
    pub fn ancestors(&self, name: &TypeName) -> Result<Vec<Arc<StructSchema>>> {
        let mut chain = Vec::new();
        let mut cursor = Some(name.clone());
        while let Some(current) = cursor {
            let schema = self
                .struct_schema(&current)
                .ok_or_else(|| CopyError::UnknownType(current.to_string()))?;
            cursor = schema.parent.clone();
            chain.push(schema);
        }
        Ok(chain)
    }

    /// True when `name` is `ancestor` or descends from it.
    pub fn is_subtype(&self, name: &TypeName, ancestor: &TypeName) -> bool {
        if name == ancestor {
            return true;
        }
        self.ancestors(name)
            .map(|chain| chain.iter().any(|s| &s.name == ancestor))
            .unwrap_or(false)
    }

    /// Every attribute of `name`, own attributes first, then each ancestor's.
    pub fn all_attributes(&self, name: &TypeName) -> Result<Vec<Arc<AttributeDescriptor>>> {
        Ok(self
            .ancestors(name)?
            .iter()
            .flat_map(|s| s.attributes.iter().cloned())
            .collect())
    }

    /// Fails unless `name` is a registered, constructible struct.
    pub fn probe_constructible(&self, name: &TypeName) -> Result<()> {
        match self.struct_schema(name) {
            Some(schema) if schema.constructible => Ok(()),
            Some(_) => Err(CopyError::TypeNotInstantiable(name.to_string())),
            None if self.enum_schema(name).is_some() => {
                Err(CopyError::TypeNotInstantiable(name.to_string()))
            }
            None => Err(CopyError::UnknownType(name.to_string())),
        }
    }

    /// Creates a fresh instance with every attribute at its default.
    ///
    /// # Errors
    /// * `TypeNotInstantiable` for abstract types and enums.
    /// * `UnknownType` for unregistered names.
    pub fn instantiate(&self, name: &TypeName) -> Result<Object> {
        self.probe_constructible(name)?;
        let mut object = Object::new(name.clone());
        for attribute in self.all_attributes(name)? {
            object.set(attribute.name.clone(), attribute.default.clone());
        }
        Ok(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TypeRef;
    use crate::value::{PrimitiveKind, Value};

    fn base() -> StructSchema {
        StructSchema::builder("t::Base")
            .attribute(AttributeDescriptor::new("id", TypeRef::Primitive(PrimitiveKind::I64)))
            .exclude_as_destination(["Secret "])
            .abstract_type()
            .build()
    }

    #[test]
    fn instantiate_fills_inherited_defaults() -> Result<()> {
        let registry = TypeRegistry::new();
        registry.register_struct(base())?;
        registry.register_struct(
            StructSchema::builder("t::Child")
                .parent("t::Base")
                .attribute(AttributeDescriptor::new("label", TypeRef::String))
                .build(),
        )?;

        let child = registry.instantiate(&"t::Child".into())?;
        assert_eq!(child.get("id"), Some(&Value::from(0i64)));
        assert_eq!(child.get("label"), Some(&Value::Null));
        assert!(registry.is_subtype(&"t::Child".into(), &"t::Base".into()));

        let base = registry.struct_schema(&"t::Base".into());
        assert!(base.is_some_and(|b| b.exclusions.destination_only.contains("secret")));
        Ok(())
    }

    #[test]
    fn abstract_and_unknown_types_are_rejected() -> Result<()> {
        let registry = TypeRegistry::new();
        registry.register_struct(base())?;

        assert!(matches!(
            registry.instantiate(&"t::Base".into()),
            Err(CopyError::TypeNotInstantiable(_))
        ));
        assert!(matches!(
            registry.instantiate(&"t::Missing".into()),
            Err(CopyError::UnknownType(_))
        ));
        Ok(())
    }

    #[test]
    fn shadowing_an_ancestor_attribute_is_rejected() -> Result<()> {
        let registry = TypeRegistry::new();
        registry.register_struct(base())?;
        let result = registry.register_struct(
            StructSchema::builder("t::Shadow")
                .parent("t::Base")
                .attribute(AttributeDescriptor::new("id", TypeRef::String))
                .build(),
        );
        assert!(matches!(result, Err(CopyError::InvalidInput(_))));
        Ok(())
    }

    #[test]
    fn first_registration_wins() -> Result<()> {
        let registry = TypeRegistry::new();
        assert!(registry.register_struct(base())?);
        assert!(!registry.register_struct(StructSchema::builder("t::Base").build())?);
        assert_eq!(
            registry.all_attributes(&"t::Base".into())?.len(),
            1,
            "the later registration must be ignored"
        );
        Ok(())
    }
}
