//! Transparent handling of lazily materialized values.
//!
//! A lazy value stands in for an object that has not been loaded yet. Before a
//! value is copied it is resolved: an uninitialized stand-in becomes a default
//! instance of its backing type, a loaded one becomes the loaded value.
//! Containers are scanned recursively and rebuilt only when they held a
//! stand-in.

use std::fmt;
use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::error::Result;
use crate::schema::{TypeName, TypeRegistry};
use crate::value::{Collection, MapValue, Value};

type Loader = dyn Fn() -> Value + Send + Sync;

/// A stand-in for an object of `backing` type, loaded on first access.
#[derive(Clone)]
pub struct LazyValue {
    backing: TypeName,
    slot: Arc<OnceLock<Value>>,
    loader: Arc<Loader>,
}

impl LazyValue {
    /// Creates an unloaded stand-in.
    pub fn new<F>(backing: impl Into<TypeName>, loader: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        Self {
            backing: backing.into(),
            slot: Arc::new(OnceLock::new()),
            loader: Arc::new(loader),
        }
    }

    /// Creates a stand-in that is already loaded with `value`.
    pub fn loaded(backing: impl Into<TypeName>, value: Value) -> Self {
        let lazy = Self::new(backing, || Value::Null);
        // A fresh OnceLock is always empty.
        let _ = lazy.slot.set(value);
        lazy
    }

    /// The type the stand-in represents.
    pub fn backing_type(&self) -> &TypeName {
        &self.backing
    }

    /// True once the loader has run.
    pub fn is_loaded(&self) -> bool {
        self.slot.get().is_some()
    }

    /// Runs the loader if needed and returns the loaded value.
    pub fn load(&self) -> &Value {
        self.slot.get_or_init(|| (self.loader)())
    }
}

impl PartialEq for LazyValue {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }
}

impl fmt::Debug for LazyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyValue")
            .field("backing", &self.backing)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

/// Capability interface of a lazy-loading framework.
pub trait ProxySubsystem: Send + Sync + fmt::Debug {
    /// False when no framework is present. Every other query is then skipped.
    fn is_available(&self) -> bool;

    /// True when `value` is a stand-in.
    fn is_proxy(&self, value: &Value) -> bool;

    /// True when a stand-in has not been loaded.
    fn is_uninitialized(&self, value: &Value) -> bool;

    /// The loaded value of a stand-in.
    fn materialize(&self, value: &Value) -> Value;

    /// The type a stand-in represents.
    fn backing_type<'a>(&self, value: &'a Value) -> Option<&'a TypeName>;
}

/// Recognizes [`Value::Lazy`] stand-ins.
#[derive(Debug, Default, Clone, Copy)]
pub struct LazyProxySupport;

impl ProxySubsystem for LazyProxySupport {
    fn is_available(&self) -> bool {
        true
    }

    fn is_proxy(&self, value: &Value) -> bool {
        matches!(value, Value::Lazy(_))
    }

    fn is_uninitialized(&self, value: &Value) -> bool {
        matches!(value, Value::Lazy(l) if !l.is_loaded())
    }

    fn materialize(&self, value: &Value) -> Value {
        match value {
            Value::Lazy(l) => l.load().clone(),
            other => other.clone(),
        }
    }

    fn backing_type<'a>(&self, value: &'a Value) -> Option<&'a TypeName> {
        match value {
            Value::Lazy(l) => Some(l.backing_type()),
            _ => None,
        }
    }
}

/// The absent framework: nothing is a stand-in.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProxySupport;

impl ProxySubsystem for NoProxySupport {
    fn is_available(&self) -> bool {
        false
    }

    fn is_proxy(&self, _value: &Value) -> bool {
        false
    }

    fn is_uninitialized(&self, _value: &Value) -> bool {
        false
    }

    fn materialize(&self, value: &Value) -> Value {
        value.clone()
    }

    fn backing_type<'a>(&self, _value: &'a Value) -> Option<&'a TypeName> {
        None
    }
}

fn resolve_proxy(proxies: &dyn ProxySubsystem, registry: &TypeRegistry, value: &Value) -> Result<Value> {
    if proxies.is_uninitialized(value) {
        if let Some(backing) = proxies.backing_type(value) {
            debug!(backing = %backing, "replacing uninitialized proxy with a default instance");
            return Ok(registry.instantiate(backing)?.into());
        }
    }
    Ok(proxies.materialize(value))
}

fn contains_proxy(proxies: &dyn ProxySubsystem, value: &Value, into_objects: bool) -> bool {
    match value {
        Value::Collection(c) => c.items().iter().any(|v| contains_proxy(proxies, v, into_objects)),
        Value::Map(m) => m.entries().iter().any(|(k, v)| {
            contains_proxy(proxies, k, into_objects) || contains_proxy(proxies, v, into_objects)
        }),
        Value::Object(o) if into_objects => o.fields().any(|(_, v)| contains_proxy(proxies, v, true)),
        other => proxies.is_proxy(other),
    }
}

fn rebuild(
    proxies: &dyn ProxySubsystem,
    registry: &TypeRegistry,
    value: &Value,
    into_objects: bool,
) -> Result<Value> {
    if !contains_proxy(proxies, value, into_objects) {
        return Ok(value.clone());
    }
    match value {
        Value::Collection(c) => {
            let items = c
                .items()
                .iter()
                .map(|v| rebuild(proxies, registry, v, into_objects))
                .collect::<Result<Vec<_>>>()?;
            Ok(Collection::from_items(c.rebuild_kind(), items).into())
        }
        Value::Map(m) => {
            let entries = m
                .entries()
                .iter()
                .map(|(k, v)| {
                    Ok((
                        rebuild(proxies, registry, k, into_objects)?,
                        rebuild(proxies, registry, v, into_objects)?,
                    ))
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(MapValue::from_entries(m.rebuild_kind(), entries).into())
        }
        Value::Object(o) => {
            let mut copy = o.clone();
            for (_, slot) in copy.fields_mut() {
                *slot = rebuild(proxies, registry, slot, true)?;
            }
            Ok(copy.into())
        }
        other => {
            let resolved = resolve_proxy(proxies, registry, other)?;
            if into_objects {
                rebuild(proxies, registry, &resolved, true)
            } else {
                Ok(resolved)
            }
        }
    }
}

/// Resolves `value` for copying: stand-ins are replaced, and containers that
/// hold stand-ins (at any depth) are rebuilt with them replaced.
///
/// Rebuilt containers keep their kind unless frozen. Structured objects are
/// left as they are. An unavailable subsystem passes `value` through.
pub fn resolve(proxies: &dyn ProxySubsystem, registry: &TypeRegistry, value: &Value) -> Result<Value> {
    if !proxies.is_available() {
        return Ok(value.clone());
    }
    if value.is_container() {
        return rebuild(proxies, registry, value, false);
    }
    if proxies.is_proxy(value) {
        return resolve_proxy(proxies, registry, value);
    }
    Ok(value.clone())
}

/// Like [`resolve`], but also walks into structured objects and into loaded
/// values. Used before a value is handed to a codec.
pub fn resolve_deep(proxies: &dyn ProxySubsystem, registry: &TypeRegistry, value: &Value) -> Result<Value> {
    if !proxies.is_available() {
        return Ok(value.clone());
    }
    rebuild(proxies, registry, value, true)
}
