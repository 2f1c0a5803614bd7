//! The copy engine.
//!
//! A [`CopyEngine`] bundles everything a copy needs: the schema registry, the
//! resolution cache, the lazy-value subsystem, the codecs and the options.
//! All of them are shared behind `Arc`s, so cloning an engine is cheap and the
//! clones share one cache.
//!
//! Attribute pairs of one object are independent. Above
//! [`CopyOptions::parallel_threshold`] pairs they are resolved on the rayon
//! pool. Nothing is written to the destination until every pair has
//! finished; the first failure in pair order is returned and the destination
//! is left untouched.

use std::borrow::Cow;
use std::sync::Arc;

use rayon::prelude::*;

use crate::cache::ResolutionCache;
use crate::codec::{BinaryCodec, Codecs, TextCodec};
use crate::config::CopyOptions;
use crate::error::{COLLECTION_EMPTY, CopyError, DESTINATION_OBJECT_NULL, Result, SOURCE_OBJECT_NULL};
use crate::fields::{self, MatchedPair};
use crate::orchestrator::{self, Copied};
use crate::proxy::{self, LazyProxySupport, NoProxySupport, ProxySubsystem};
use crate::rt::Reflect;
use crate::schema::{TypeName, TypeRef, TypeRegistry};
use crate::types;
use crate::value::{Object, Value};

/// Deep-copies and converts structured values.
#[derive(Debug, Clone)]
pub struct CopyEngine {
    registry: Arc<TypeRegistry>,
    cache: Arc<ResolutionCache>,
    proxies: Arc<dyn ProxySubsystem>,
    codecs: Codecs,
    options: CopyOptions,
}

impl Default for CopyEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CopyEngine {
    /// An engine with a fresh registry and cache and the default codecs.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts configuring an engine.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// The schema registry.
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// The resolution cache.
    pub fn cache(&self) -> &Arc<ResolutionCache> {
        &self.cache
    }

    /// The options in effect.
    pub fn options(&self) -> &CopyOptions {
        &self.options
    }

    /// The codecs in use.
    pub fn codecs(&self) -> &Codecs {
        &self.codecs
    }

    pub(crate) fn proxy_subsystem(&self) -> &dyn ProxySubsystem {
        self.proxies.as_ref()
    }

    /// Registers `T` (and every type it refers to).
    pub fn register<T: Reflect>(&self) -> Result<()> {
        T::register(&self.registry)
    }

    // --- DYNAMIC API ---

    /// Deep-copies a structured value into a new instance of the same type.
    ///
    /// # Errors
    /// `InvalidInput` when `source` is absent or not a structured object.
    pub fn copy(&self, source: &Value) -> Result<Value> {
        let source = self.source_object(source)?;
        Ok(self.copy_object_as(&source, source.type_name(), 0)?.into())
    }

    /// Copies a structured value into a new instance of `destination`.
    pub fn copy_as(&self, source: &Value, destination: &TypeName) -> Result<Value> {
        let source = self.source_object(source)?;
        Ok(self.copy_object_as(&source, destination, 0)?.into())
    }

    /// Copies the matching attributes of `source` into an existing object.
    ///
    /// # Errors
    /// `InvalidInput` when either side is absent or not a structured object.
    pub fn copy_into(&self, source: &Value, destination: &mut Value) -> Result<()> {
        let source = self.source_object(source)?;
        match destination {
            Value::Object(target) => self.copy_fields(&source, target, 0),
            Value::Null => Err(CopyError::InvalidInput(DESTINATION_OBJECT_NULL.to_string())),
            other => Err(CopyError::InvalidInput(format!(
                "The destination must be a structured object, found {}",
                other.describe()
            ))),
        }
    }

    /// Copies every element of a non-empty batch.
    pub fn copy_all(&self, sources: &[Value]) -> Result<Vec<Value>> {
        Self::check_batch(sources)?;
        sources.iter().map(|s| self.copy(s)).collect()
    }

    /// Copies every element of a non-empty batch into `destination` instances.
    pub fn copy_all_as(&self, sources: &[Value], destination: &TypeName) -> Result<Vec<Value>> {
        Self::check_batch(sources)?;
        sources.iter().map(|s| self.copy_as(s, destination)).collect()
    }

    /// Like [`copy_all`](Self::copy_all), collecting into a caller-chosen container.
    pub fn copy_all_into<C>(&self, sources: &[Value]) -> Result<C>
    where
        C: Default + Extend<Value>,
    {
        Self::check_batch(sources)?;
        let mut out = C::default();
        for source in sources {
            out.extend(Some(self.copy(source)?));
        }
        Ok(out)
    }

    /// Like [`copy_all_as`](Self::copy_all_as), collecting into a caller-chosen container.
    pub fn copy_all_as_into<C>(&self, sources: &[Value], destination: &TypeName) -> Result<C>
    where
        C: Default + Extend<Value>,
    {
        Self::check_batch(sources)?;
        let mut out = C::default();
        for source in sources {
            out.extend(Some(self.copy_as(source, destination)?));
        }
        Ok(out)
    }

    // --- TYPED API ---

    /// Deep-copies a typed value.
    pub fn copy_typed<T: Reflect>(&self, source: &T) -> Result<T> {
        self.register::<T>()?;
        T::from_value(self.copy(&source.to_value())?)
    }

    /// Converts a typed value into another type.
    pub fn copy_typed_as<S: Reflect, D: Reflect>(&self, source: &S) -> Result<D> {
        self.register::<S>()?;
        self.register::<D>()?;
        let destination = object_type_of::<D>()?;
        D::from_value(self.copy_as(&source.to_value(), &destination)?)
    }

    /// Copies the matching attributes of `source` into `destination`.
    pub fn copy_typed_into<S: Reflect, D: Reflect>(&self, source: &S, destination: &mut D) -> Result<()> {
        self.register::<S>()?;
        self.register::<D>()?;
        let mut target = destination.to_value();
        self.copy_into(&source.to_value(), &mut target)?;
        *destination = D::from_value(target)?;
        Ok(())
    }

    /// Deep-copies a non-empty batch of typed values.
    pub fn copy_typed_all<T: Reflect>(&self, sources: &[T]) -> Result<Vec<T>> {
        Self::check_batch(sources)?;
        sources.iter().map(|s| self.copy_typed(s)).collect()
    }

    /// Converts a non-empty batch of typed values.
    pub fn copy_typed_all_as<S: Reflect, D: Reflect>(&self, sources: &[S]) -> Result<Vec<D>> {
        Self::check_batch(sources)?;
        sources.iter().map(|s| self.copy_typed_as(s)).collect()
    }

    /// Converts a non-empty batch of typed values into a caller-chosen container.
    pub fn copy_typed_all_collect<S, D, C>(&self, sources: &[S]) -> Result<C>
    where
        S: Reflect,
        D: Reflect,
        C: Default + Extend<D>,
    {
        Self::check_batch(sources)?;
        let mut out = C::default();
        for source in sources {
            out.extend(Some(self.copy_typed_as::<S, D>(source)?));
        }
        Ok(out)
    }

    // --- INTERNALS ---

    fn check_batch<T>(sources: &[T]) -> Result<()> {
        if sources.is_empty() {
            return Err(CopyError::InvalidInput(COLLECTION_EMPTY.to_string()));
        }
        Ok(())
    }

    fn source_object<'v>(&self, source: &'v Value) -> Result<Cow<'v, Object>> {
        let resolved = if self.options.proxy_support && self.proxies.is_proxy(source) {
            Cow::Owned(proxy::resolve(self.proxy_subsystem(), &self.registry, source)?)
        } else {
            Cow::Borrowed(source)
        };

        match resolved {
            Cow::Borrowed(Value::Object(o)) => Ok(Cow::Borrowed(o)),
            Cow::Owned(Value::Object(o)) => Ok(Cow::Owned(o)),
            Cow::Borrowed(Value::Null) | Cow::Owned(Value::Null) => {
                Err(CopyError::InvalidInput(SOURCE_OBJECT_NULL.to_string()))
            }
            other => Err(CopyError::InvalidInput(format!(
                "Only structured objects can be copied, found {}",
                other.describe()
            ))),
        }
    }

    /// Creates a `destination` instance and copies `source` into it.
    pub(crate) fn copy_object_as(&self, source: &Object, destination: &TypeName, depth: usize) -> Result<Object> {
        let mut target = self.registry.instantiate(destination)?;
        self.copy_fields(source, &mut target, depth)?;
        Ok(target)
    }

    /// Copies every matched attribute of `source` into `destination`.
    pub(crate) fn copy_fields(&self, source: &Object, destination: &mut Object, depth: usize) -> Result<()> {
        if let Some(limit) = self.options.max_depth {
            if depth > limit {
                return Err(CopyError::DepthExceeded { limit });
            }
        }

        let pairs = fields::resolve_pairs(
            &self.registry,
            &self.cache,
            source.type_name(),
            destination.type_name(),
        )?;

        let resolve = |pair: &MatchedPair| -> Result<(String, Value)> {
            let value = source.get(&pair.source.name).unwrap_or(&pair.source.default);
            let copied = orchestrator::copy_attribute(
                self,
                value,
                &pair.source.ty,
                &pair.destination.ty,
                depth,
            )?;
            let value = match copied {
                Copied::Reset => pair.destination.default.clone(),
                Copied::Assign(value) => types::coerce_for_assignment(value, &pair.destination.ty, &self.registry)?,
            };
            Ok((pair.destination.name.clone(), value))
        };

        // Collecting keeps pair order, so the first error reported is the
        // first failing pair regardless of scheduling.
        let results: Vec<Result<(String, Value)>> = if pairs.len() > self.options.parallel_threshold {
            pairs.par_iter().map(resolve).collect()
        } else {
            pairs.iter().map(resolve).collect()
        };
        let assignments = results.into_iter().collect::<Result<Vec<_>>>()?;

        for (name, value) in assignments {
            destination.set(name, value);
        }
        Ok(())
    }
}

fn object_type_of<T: Reflect>() -> Result<TypeName> {
    match T::type_ref() {
        TypeRef::Object(name) => Ok(name),
        other => Err(CopyError::InvalidInput(format!(
            "Copy destinations must be structured types, found {other}"
        ))),
    }
}

/// Fluent construction of a [`CopyEngine`].
#[derive(Debug, Default)]
pub struct EngineBuilder {
    options: CopyOptions,
    registry: Option<Arc<TypeRegistry>>,
    cache: Option<Arc<ResolutionCache>>,
    proxies: Option<Arc<dyn ProxySubsystem>>,
    text: Option<Arc<dyn TextCodec>>,
    binary: Option<Arc<dyn BinaryCodec>>,
}

impl EngineBuilder {
    /// Sets the options.
    #[must_use]
    pub fn options(mut self, options: CopyOptions) -> Self {
        self.options = options;
        self
    }

    /// Uses an existing registry.
    #[must_use]
    pub fn registry(mut self, registry: Arc<TypeRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Uses an existing cache, shared with other engines.
    #[must_use]
    pub fn cache(mut self, cache: Arc<ResolutionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Uses a custom lazy-value subsystem.
    #[must_use]
    pub fn proxy_subsystem(mut self, proxies: Arc<dyn ProxySubsystem>) -> Self {
        self.proxies = Some(proxies);
        self
    }

    /// Uses a custom text codec.
    #[must_use]
    pub fn text_codec(mut self, codec: Arc<dyn TextCodec>) -> Self {
        self.text = Some(codec);
        self
    }

    /// Uses a custom binary codec.
    #[must_use]
    pub fn binary_codec(mut self, codec: Arc<dyn BinaryCodec>) -> Self {
        self.binary = Some(codec);
        self
    }

    /// Builds the engine. Unset parts get fresh defaults; with
    /// `proxy_support` off the subsystem is [`NoProxySupport`].
    pub fn build(self) -> CopyEngine {
        let defaults = Codecs::default();
        let proxies: Arc<dyn ProxySubsystem> = match self.proxies {
            _ if !self.options.proxy_support => Arc::new(NoProxySupport),
            Some(custom) => custom,
            None => Arc::new(LazyProxySupport),
        };
        CopyEngine {
            registry: self.registry.unwrap_or_default(),
            cache: self.cache.unwrap_or_default(),
            proxies,
            codecs: Codecs {
                text: self.text.unwrap_or(defaults.text),
                binary: self.binary.unwrap_or(defaults.binary),
            },
            options: self.options,
        }
    }
}
