//! Engine tuning options.
//!
//! ```rust
//! use transcopy::CopyOptions;
//!
//! let options = CopyOptions::default()
//!     .with_parallel_threshold(32)   // resolve attributes in parallel above 32 pairs
//!     .with_max_depth(64);           // fail instead of recursing past 64 levels
//! assert_eq!(options.max_depth, Some(64));
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CopyError, Result};

/// Matched pairs above this count are resolved on the rayon pool.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 10;

/// Options read by a [`CopyEngine`](crate::CopyEngine).
///
/// Missing keys in a JSON document take their default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CopyOptions {
    /// Attribute pairs of one object are copied in parallel when there are
    /// more than this many. `usize::MAX` disables parallelism.
    pub parallel_threshold: usize,
    /// Maximum nesting of structured objects. `None` means unbounded.
    pub max_depth: Option<usize>,
    /// Whether lazily materialized values are resolved before copying.
    pub proxy_support: bool,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            max_depth: None,
            proxy_support: true,
        }
    }
}

impl CopyOptions {
    /// Sets the parallel threshold.
    #[must_use]
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    /// Disables parallel attribute resolution.
    #[must_use]
    pub fn sequential(mut self) -> Self {
        self.parallel_threshold = usize::MAX;
        self
    }

    /// Bounds object nesting.
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Turns lazy-value resolution on or off.
    #[must_use]
    pub fn with_proxy_support(mut self, enabled: bool) -> Self {
        self.proxy_support = enabled;
        self
    }

    /// Parses options from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| CopyError::Config(e.to_string()))
    }

    /// Reads options from a JSON file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| CopyError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() -> Result<()> {
        let options = CopyOptions::from_json_str(r#"{ "max_depth": 8 }"#)?;
        assert_eq!(options.max_depth, Some(8));
        assert_eq!(options.parallel_threshold, DEFAULT_PARALLEL_THRESHOLD);
        assert!(options.proxy_support);
        Ok(())
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        assert!(matches!(
            CopyOptions::from_json_str("{ parallel_threshold: }"),
            Err(CopyError::Config(_))
        ));
    }
}
