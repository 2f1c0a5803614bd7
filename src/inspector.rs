//! Tools for inspecting how two types are matched.
//! Useful for debugging aliases and exclusion policies.

use std::fmt;

use serde::Serialize;

use crate::engine::CopyEngine;
use crate::error::Result;
use crate::fields::{self, FieldIndex};
use crate::schema::TypeName;

/// How a source type maps onto a destination type.
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionReport {
    /// Runtime source type.
    pub source: TypeName,
    /// Destination type.
    pub destination: TypeName,
    /// Attribute pairs that will be copied, in resolution order.
    pub matched: Vec<MatchInfo>,
    /// Source attributes dropped by an exclusion.
    pub excluded: Vec<String>,
    /// Source attributes with no destination counterpart.
    pub unmatched: Vec<String>,
}

/// One copied attribute pair.
#[derive(Debug, Clone, Serialize)]
pub struct MatchInfo {
    /// Normalized key both sides share.
    pub key: String,
    /// Source attribute name.
    pub source: String,
    /// Source attribute type.
    pub source_type: String,
    /// Destination attribute name.
    pub destination: String,
    /// Destination attribute type.
    pub destination_type: String,
    /// Type that declares the destination attribute.
    pub declared_by: TypeName,
}

impl CopyEngine {
    /// Explains which attributes a copy from `source` into `destination` reads and writes.
    ///
    /// Uses (and fills) the engine's resolution cache.
    pub fn inspect(&self, source: &TypeName, destination: &TypeName) -> Result<ResolutionReport> {
        let src = fields::index_of(self.registry(), self.cache(), source)?;
        let dst = fields::index_of(self.registry(), self.cache(), destination)?;
        let pairs = fields::resolve_pairs(self.registry(), self.cache(), source, destination)?;
        let excluded_keys = fields::exclusion_set(&src, &dst);

        let matched = pairs
            .iter()
            .map(|p| MatchInfo {
                key: p.source.key(),
                source: p.source.name.clone(),
                source_type: p.source.ty.to_string(),
                destination: p.destination.name.clone(),
                destination_type: p.destination.ty.to_string(),
                declared_by: p.destination.declaring_type.clone(),
            })
            .collect();

        let (excluded, unmatched) = Self::partition_unpaired(&src, &dst, &excluded_keys);

        Ok(ResolutionReport {
            source: source.clone(),
            destination: destination.clone(),
            matched,
            excluded,
            unmatched,
        })
    }

    fn partition_unpaired(
        src: &FieldIndex,
        dst: &FieldIndex,
        excluded_keys: &std::collections::BTreeSet<String>,
    ) -> (Vec<String>, Vec<String>) {
        let mut excluded = Vec::new();
        let mut unmatched = Vec::new();
        for attribute in src.attributes() {
            let key = attribute.key();
            if excluded_keys.contains(&key) {
                excluded.push(attribute.name.clone());
            } else if dst.get(&key).is_none() {
                unmatched.push(attribute.name.clone());
            }
        }
        (excluded, unmatched)
    }
}

impl fmt::Display for ResolutionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== TRANSCOPY RESOLUTION REPORT ===")?;
        writeln!(f, "{} -> {}", self.source, self.destination)?;
        writeln!(f, "\n[MATCHED]")?;
        for (i, m) in self.matched.iter().enumerate() {
            let connector = if i + 1 == self.matched.len() { "└── " } else { "├── " };
            writeln!(
                f,
                "{connector}{}: {} -> {}: {} (key '{}', declared by {})",
                m.source,
                m.source_type,
                m.destination,
                m.destination_type,
                m.key,
                m.declared_by.simple_name()
            )?;
        }
        if !self.excluded.is_empty() {
            writeln!(f, "\n[EXCLUDED] {}", self.excluded.join(", "))?;
        }
        if !self.unmatched.is_empty() {
            writeln!(f, "\n[UNMATCHED] {}", self.unmatched.join(", "))?;
        }
        Ok(())
    }
}
