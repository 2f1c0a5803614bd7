//! The typed façade.
//!
//! [`Transcopy`] forwards to a lazily created, process-wide [`CopyEngine`].
//! Types go in and out through [`Reflect`], usually derived.

use std::sync::OnceLock;

use crate::engine::{CopyEngine, EngineBuilder};
use crate::error::Result;
use crate::rt::Reflect;

static DEFAULT_ENGINE: OnceLock<CopyEngine> = OnceLock::new();

/// The main entry point for typed copies.
///
/// Every call goes through one process-wide [`CopyEngine`] with default
/// options, so resolution results are cached across calls. Build your own
/// engine with [`Transcopy::builder`] for custom options or an isolated cache.
#[derive(Debug)]
pub struct Transcopy;

impl Transcopy {
    /// The shared engine.
    pub fn engine() -> &'static CopyEngine {
        DEFAULT_ENGINE.get_or_init(CopyEngine::new)
    }

    /// Starts configuring a dedicated engine.
    pub fn builder() -> EngineBuilder {
        CopyEngine::builder()
    }

    /// Deep-copies `source`.
    ///
    /// # Errors
    /// Fails when `T` is not a structured type, or when an attribute cannot be converted.
    pub fn copy<T: Reflect>(source: &T) -> Result<T> {
        Self::engine().copy_typed(source)
    }

    /// Converts `source` into a new `D`, attribute by attribute.
    pub fn copy_as<S: Reflect, D: Reflect>(source: &S) -> Result<D> {
        Self::engine().copy_typed_as(source)
    }

    /// Copies the matching attributes of `source` into `destination`.
    pub fn copy_into<S: Reflect, D: Reflect>(source: &S, destination: &mut D) -> Result<()> {
        Self::engine().copy_typed_into(source, destination)
    }

    /// Deep-copies every element of a non-empty slice.
    pub fn copy_all<T: Reflect>(sources: &[T]) -> Result<Vec<T>> {
        Self::engine().copy_typed_all(sources)
    }

    /// Converts every element of a non-empty slice.
    pub fn copy_all_as<S: Reflect, D: Reflect>(sources: &[S]) -> Result<Vec<D>> {
        Self::engine().copy_typed_all_as(sources)
    }

    /// Converts every element of a non-empty slice into a container of the caller's choice.
    ///
    /// ```rust
    /// use std::collections::VecDeque;
    /// use transcopy::{Reflect, Transcopy};
    ///
    /// #[derive(Reflect, Debug, PartialEq)]
    /// struct Point { x: i32, y: i32 }
    ///
    /// #[derive(Reflect, Debug, PartialEq)]
    /// struct WidePoint { x: i64, y: i64 }
    ///
    /// let points = [Point { x: 1, y: 2 }];
    /// let wide: VecDeque<WidePoint> = Transcopy::copy_all_collect::<_, WidePoint, _>(&points)?;
    /// assert_eq!(wide[0], WidePoint { x: 1, y: 2 });
    /// # Ok::<(), transcopy::CopyError>(())
    /// ```
    pub fn copy_all_collect<S, D, C>(sources: &[S]) -> Result<C>
    where
        S: Reflect,
        D: Reflect,
        C: Default + Extend<D>,
    {
        Self::engine().copy_typed_all_collect::<S, D, C>(sources)
    }
}
