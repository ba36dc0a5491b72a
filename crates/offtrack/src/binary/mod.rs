//! Static inspection of executables' debug information.
//!
//! - [`FieldQuery`]: a (structure, field) pair with optional version bounds
//! - [`find_offsets`]: resolves a batch of queries against one executable

mod reader;

#[cfg(test)]
pub mod fixture;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::version::Version;

pub use reader::{Analysis, FieldOutcome, find_offsets, find_offsets_in_bytes};

/// A structure member whose offset is requested
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldQuery {
    /// Module-path qualified structure name, e.g. `net/http.Request`
    pub structure: String,
    /// Case-sensitive member name
    pub field: String,
    /// Inclusive lower bound; empty means unbounded
    #[serde(default)]
    pub min_version: String,
    /// Inclusive upper bound; empty means unbounded
    #[serde(default)]
    pub max_version: String,
}

impl FieldQuery {
    pub fn new(structure: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            structure: structure.into(),
            field: field.into(),
            min_version: String::new(),
            max_version: String::new(),
        }
    }

    pub fn with_bounds(mut self, min_version: impl Into<String>, max_version: impl Into<String>) -> Self {
        self.min_version = min_version.into();
        self.max_version = max_version.into();
        self
    }

    /// Whether the query should be attempted for a binary built at `version`
    pub fn applies_to(&self, version: &Version) -> bool {
        version.is_within(&self.min_version, &self.max_version)
    }
}

impl fmt::Display for FieldQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.structure, self.field)
    }
}

/// A query resolved against one binary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedOffset {
    pub query: FieldQuery,
    pub offset: u64,
}
