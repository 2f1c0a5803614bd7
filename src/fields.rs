//! Attribute matching between a source type and a destination type.
//!
//! Attributes match on their normalized key (alias or name, trimmed and
//! lowercased). Exclusions come from five places: the destination's
//! destination-only and either-side policies, the source's either-side policy,
//! and per-attribute markers on both sides. All policies are inherited through
//! the ancestor chain.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::Serialize;
use tracing::{trace, warn};

use crate::cache::{ResolutionCache, TypePair};
use crate::error::Result;
use crate::schema::{AttributeDescriptor, ExclusionPolicy, TypeName, TypeRegistry};

/// A source attribute and the destination attribute it copies into.
#[derive(Debug, Clone, Serialize)]
pub struct MatchedPair {
    /// Attribute read from the source.
    pub source: Arc<AttributeDescriptor>,
    /// Attribute written on the destination.
    pub destination: Arc<AttributeDescriptor>,
}

/// The copyable attributes of one type, indexed by normalized key.
#[derive(Debug, Clone)]
pub struct FieldIndex {
    type_name: TypeName,
    attributes: Vec<Arc<AttributeDescriptor>>,
    by_key: HashMap<String, usize>,
    exclusions: ExclusionPolicy,
}

impl FieldIndex {
    /// Collects the non-constant attributes of `type_name` and its ancestors,
    /// own attributes first, and merges the inherited exclusion policies.
    ///
    /// When two attributes normalize to the same key the first one wins.
    pub fn build(registry: &TypeRegistry, type_name: &TypeName) -> Result<Self> {
        let chain = registry.ancestors(type_name)?;
        let mut index = FieldIndex {
            type_name: type_name.clone(),
            attributes: Vec::new(),
            by_key: HashMap::new(),
            exclusions: ExclusionPolicy::default(),
        };

        for schema in &chain {
            index
                .exclusions
                .destination_only
                .extend(schema.exclusions.destination_only.iter().cloned());
            index
                .exclusions
                .either_side
                .extend(schema.exclusions.either_side.iter().cloned());

            for attribute in schema.attributes.iter().filter(|a| !a.constant) {
                let key = attribute.key();
                if let Some(&existing) = index.by_key.get(&key) {
                    warn!(
                        type_name = %type_name,
                        key = %key,
                        kept = %index.attributes[existing].name,
                        dropped = %attribute.name,
                        "two attributes normalize to the same key"
                    );
                    continue;
                }
                index.by_key.insert(key, index.attributes.len());
                index.attributes.push(Arc::clone(attribute));
            }
        }
        Ok(index)
    }

    /// The indexed type.
    pub fn type_name(&self) -> &TypeName {
        &self.type_name
    }

    /// Indexed attributes in resolution order.
    pub fn attributes(&self) -> &[Arc<AttributeDescriptor>] {
        &self.attributes
    }

    /// The attribute with normalized key `key`.
    pub fn get(&self, key: &str) -> Option<&Arc<AttributeDescriptor>> {
        self.by_key.get(key).and_then(|&i| self.attributes.get(i))
    }

    /// Inherited type-level exclusions.
    pub fn exclusions(&self) -> &ExclusionPolicy {
        &self.exclusions
    }

    fn marked_keys(&self) -> impl Iterator<Item = String> + '_ {
        self.attributes.iter().filter(|a| a.excluded).map(|a| a.key())
    }
}

/// The normalized keys excluded when copying `source` into `destination`.
pub fn exclusion_set(source: &FieldIndex, destination: &FieldIndex) -> BTreeSet<String> {
    let mut excluded: BTreeSet<String> = BTreeSet::new();
    excluded.extend(destination.exclusions.destination_only.iter().cloned());
    excluded.extend(destination.exclusions.either_side.iter().cloned());
    excluded.extend(source.exclusions.either_side.iter().cloned());
    excluded.extend(source.marked_keys());
    excluded.extend(destination.marked_keys());

    for name in excluded.iter().filter(|k| source.get(k).is_none()) {
        trace!(
            source = %source.type_name,
            destination = %destination.type_name,
            key = %name,
            "exclusion names no source attribute"
        );
    }
    excluded
}

/// Intersects the two indexes by key, in source resolution order.
pub fn match_attributes(source: &FieldIndex, destination: &FieldIndex) -> Vec<MatchedPair> {
    let excluded = exclusion_set(source, destination);
    source
        .attributes
        .iter()
        .filter_map(|attribute| {
            let key = attribute.key();
            if excluded.contains(&key) {
                return None;
            }
            destination.get(&key).map(|d| MatchedPair {
                source: Arc::clone(attribute),
                destination: Arc::clone(d),
            })
        })
        .collect()
}

/// Cached field index of `type_name`.
pub(crate) fn index_of(
    registry: &TypeRegistry,
    cache: &ResolutionCache,
    type_name: &TypeName,
) -> Result<Arc<FieldIndex>> {
    cache.get_or_compute_index(type_name, || FieldIndex::build(registry, type_name))
}

/// Cached matched pairs for copying a `source` instance into a `destination` instance.
pub(crate) fn resolve_pairs(
    registry: &TypeRegistry,
    cache: &ResolutionCache,
    source: &TypeName,
    destination: &TypeName,
) -> Result<Arc<[MatchedPair]>> {
    let pair = TypePair::new(source, destination);
    cache.get_or_compute_pairs(&pair, || {
        let src = index_of(registry, cache, source)?;
        let dst = index_of(registry, cache, destination)?;
        Ok(match_attributes(&src, &dst))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{StructSchema, TypeRef};
    use crate::value::PrimitiveKind;

    fn attr(name: &str) -> AttributeDescriptor {
        AttributeDescriptor::new(name, TypeRef::Primitive(PrimitiveKind::I32))
    }

    fn names(pairs: &[MatchedPair]) -> Vec<(&str, &str)> {
        pairs
            .iter()
            .map(|p| (p.source.name.as_str(), p.destination.name.as_str()))
            .collect()
    }

    #[test]
    fn aliases_match_case_and_whitespace_insensitively() -> Result<()> {
        let registry = TypeRegistry::new();
        registry.register_struct(
            StructSchema::builder("t::Src")
                .attribute(attr("IntValue"))
                .attribute(attr("other"))
                .build(),
        )?;
        registry.register_struct(
            StructSchema::builder("t::Dst")
                .attribute(attr("i_val").alias(" intvalue "))
                .build(),
        )?;

        let cache = ResolutionCache::new();
        let pairs = resolve_pairs(&registry, &cache, &"t::Src".into(), &"t::Dst".into())?;
        assert_eq!(names(&pairs), vec![("IntValue", "i_val")]);
        Ok(())
    }

    #[test]
    fn every_exclusion_source_applies() -> Result<()> {
        let registry = TypeRegistry::new();
        registry.register_struct(
            StructSchema::builder("t::SrcBase")
                .attribute(attr("a"))
                .exclude(["b"])
                .build(),
        )?;
        registry.register_struct(
            StructSchema::builder("t::Src")
                .parent("t::SrcBase")
                .attribute(attr("b"))
                .attribute(attr("c").excluded())
                .attribute(attr("d"))
                .attribute(attr("e"))
                .attribute(attr("f"))
                .attribute(attr("g"))
                .attribute(attr("k").constant())
                .build(),
        )?;
        registry.register_struct(
            StructSchema::builder("t::DstBase")
                .attribute(attr("d"))
                .exclude_as_destination(["D"])
                .build(),
        )?;
        registry.register_struct(
            StructSchema::builder("t::Dst")
                .parent("t::DstBase")
                .attribute(attr("a"))
                .attribute(attr("b"))
                .attribute(attr("c"))
                .attribute(attr("e"))
                .attribute(attr("f").excluded())
                .attribute(attr("g"))
                .attribute(attr("k"))
                .exclude(["e"])
                .build(),
        )?;

        let cache = ResolutionCache::new();
        let pairs = resolve_pairs(&registry, &cache, &"t::Src".into(), &"t::Dst".into())?;
        assert_eq!(names(&pairs), vec![("g", "g"), ("a", "a")]);
        Ok(())
    }

    #[test]
    fn destination_only_exclusion_ignores_the_source_side() -> Result<()> {
        let registry = TypeRegistry::new();
        registry.register_struct(
            StructSchema::builder("t::Guarded")
                .attribute(attr("id"))
                .attribute(attr("name"))
                .exclude_as_destination(["id"])
                .build(),
        )?;
        registry.register_struct(
            StructSchema::builder("t::Open")
                .attribute(attr("id"))
                .attribute(attr("name"))
                .build(),
        )?;

        let cache = ResolutionCache::new();
        let into_guarded = resolve_pairs(&registry, &cache, &"t::Open".into(), &"t::Guarded".into())?;
        assert_eq!(names(&into_guarded), vec![("name", "name")]);

        let from_guarded = resolve_pairs(&registry, &cache, &"t::Guarded".into(), &"t::Open".into())?;
        assert_eq!(names(&from_guarded), vec![("id", "id"), ("name", "name")]);
        Ok(())
    }

    #[test]
    fn colliding_keys_keep_the_first_declaration() -> Result<()> {
        let registry = TypeRegistry::new();
        registry.register_struct(
            StructSchema::builder("t::Collide")
                .attribute(attr("Value"))
                .attribute(attr("other").alias("VALUE"))
                .build(),
        )?;
        let index = FieldIndex::build(&registry, &"t::Collide".into())?;
        assert_eq!(index.attributes().len(), 1);
        assert_eq!(index.get("value").map(|a| a.name.as_str()), Some("Value"));
        Ok(())
    }
}
