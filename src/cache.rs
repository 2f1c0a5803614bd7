//! Process-lifetime memo of attribute resolution results.
//!
//! Two tables: the attribute index of a single type, and the matched pairs of
//! an ordered (source, destination) type pair. Both are keyed with `XxHash64`.
//! Entries are never evicted: type descriptors are static once registered.

use std::collections::HashMap;
use std::hash::BuildHasherDefault;
use std::sync::{Arc, RwLock};

use tracing::trace;
use twox_hash::XxHash64;

use crate::error::Result;
use crate::fields::{FieldIndex, MatchedPair};
use crate::schema::TypeName;

pub(crate) type FastMap<K, V> = HashMap<K, V, BuildHasherDefault<XxHash64>>;

/// Ordered pair of runtime source type and destination type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypePair {
    /// Runtime type of the source object.
    pub source: TypeName,
    /// Type of the destination object.
    pub destination: TypeName,
}

impl TypePair {
    /// Creates a pair.
    pub fn new(source: impl Into<TypeName>, destination: impl Into<TypeName>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }
}

/// Memo of field indexes and matched pairs.
///
/// Safe for concurrent first access. The factory runs outside the lock. When
/// two callers race on the same key, both compute and the first insert wins;
/// the loser receives the winner's value, so no caller ever sees a partial
/// entry.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    indexes: RwLock<FastMap<TypeName, Arc<FieldIndex>>>,
    pairs: RwLock<FastMap<TypePair, Arc<[MatchedPair]>>>,
}

impl ResolutionCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached index of `type_name`, computing it on a miss.
    ///
    /// A failing factory leaves the cache untouched.
    pub fn get_or_compute_index<F>(&self, type_name: &TypeName, factory: F) -> Result<Arc<FieldIndex>>
    where
        F: FnOnce() -> Result<FieldIndex>,
    {
        {
            let guard = self.indexes.read().unwrap_or_else(|p| p.into_inner());
            if let Some(hit) = guard.get(type_name) {
                return Ok(Arc::clone(hit));
            }
        }

        trace!(type_name = %type_name, "field index cache miss");
        let computed = Arc::new(factory()?);
        let mut guard = self.indexes.write().unwrap_or_else(|p| p.into_inner());
        Ok(Arc::clone(guard.entry(type_name.clone()).or_insert(computed)))
    }

    /// Returns the cached matched pairs of `pair`, computing them on a miss.
    pub fn get_or_compute_pairs<F>(&self, pair: &TypePair, factory: F) -> Result<Arc<[MatchedPair]>>
    where
        F: FnOnce() -> Result<Vec<MatchedPair>>,
    {
        {
            let guard = self.pairs.read().unwrap_or_else(|p| p.into_inner());
            if let Some(hit) = guard.get(pair) {
                return Ok(Arc::clone(hit));
            }
        }

        trace!(source = %pair.source, destination = %pair.destination, "matched pair cache miss");
        let computed: Arc<[MatchedPair]> = factory()?.into();
        let mut guard = self.pairs.write().unwrap_or_else(|p| p.into_inner());
        Ok(Arc::clone(guard.entry(pair.clone()).or_insert(computed)))
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.indexes.write().unwrap_or_else(|p| p.into_inner()).clear();
        self.pairs.write().unwrap_or_else(|p| p.into_inner()).clear();
    }

    /// Number of cached field indexes.
    pub fn index_count(&self) -> usize {
        self.indexes.read().unwrap_or_else(|p| p.into_inner()).len()
    }

    /// Number of cached type pairs.
    pub fn pair_count(&self) -> usize {
        self.pairs.read().unwrap_or_else(|p| p.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CopyError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn second_lookup_skips_the_factory() -> Result<()> {
        let cache = ResolutionCache::new();
        let calls = AtomicUsize::new(0);
        let pair = TypePair::new("a::Foo", "a::Bar");

        for _ in 0..3 {
            let pairs = cache.get_or_compute_pairs(&pair, || {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Vec::new())
            })?;
            assert!(pairs.is_empty());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.pair_count(), 1);
        Ok(())
    }

    #[test]
    fn failed_factory_is_not_cached() {
        let cache = ResolutionCache::new();
        let name = TypeName::from("a::Missing");
        let result = cache.get_or_compute_index(&name, || Err(CopyError::UnknownType("a::Missing".into())));
        assert!(result.is_err());
        assert_eq!(cache.index_count(), 0);
    }

    #[test]
    fn concurrent_first_access_agrees_on_one_value() {
        let cache = Arc::new(ResolutionCache::new());
        let pair = TypePair::new("a::Foo", "a::Foo");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let pair = pair.clone();
                std::thread::spawn(move || cache.get_or_compute_pairs(&pair, || Ok(Vec::new())))
            })
            .collect();

        let results: Vec<Arc<[MatchedPair]>> = handles
            .into_iter()
            .map(|h| h.join().expect("thread panicked").expect("factory failed"))
            .collect();
        for r in &results {
            assert!(Arc::ptr_eq(r, &results[0]));
        }
        cache.clear();
        assert_eq!(cache.pair_count(), 0);
    }
}
