//! Query manifest: which libraries, versions and fields to collect.
//!
//! ```json
//! {
//!   "go": {
//!     "versions": ">= 1.12",
//!     "fields": { "net/http.Request": ["ctx", "[1.20]pattern"] }
//!   },
//!   "google.golang.org/grpc": {
//!     "versions": ">= 1.40",
//!     "packages": ["google.golang.org/grpc/internal/transport"],
//!     "fields": { "google.golang.org/grpc/internal/transport.Stream": ["method"] }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::binary::FieldQuery;
use crate::error::{Error, Result};
use crate::target::{FetchStrategy, MissingFieldPolicy, TargetConfig, VersionSelection, VersionStrategy};
use crate::version::parse_constraint;

/// Manifest key of the Go standard library
pub const GO_STDLIB: &str = "go";

/// Library name -> query
pub type InputLibs = BTreeMap<String, LibQuery>;

/// What to collect for one library
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibQuery {
    /// Version constraint, e.g. `>= 1.12`; empty means every version
    #[serde(default, alias = "Versions")]
    pub versions: String,

    /// Examine only this branch instead of released versions
    #[serde(default, alias = "Branch")]
    pub branch: String,

    /// Packages the generated program imports
    #[serde(default, alias = "Packages")]
    pub packages: Vec<String>,

    /// Go source file compiled instead of the generated program
    #[serde(default, alias = "Inspect")]
    pub inspect: Option<PathBuf>,

    /// Qualified structure name -> field names, each optionally prefixed with `[min,max]`
    #[serde(default, alias = "Fields")]
    pub fields: BTreeMap<String, Vec<String>>,
}

impl LibQuery {
    /// Every requested field as a query, in structure order
    pub fn queries(&self) -> Vec<FieldQuery> {
        self.fields
            .iter()
            .flat_map(|(structure, fields)| {
                fields.iter().map(move |raw| {
                    let (field, min, max) = parse_field_name(raw);
                    FieldQuery::new(structure.as_str(), field).with_bounds(min, max)
                })
            })
            .collect()
    }

    pub fn target_config(&self, library: &str, policy: MissingFieldPolicy) -> Result<TargetConfig> {
        let selection = if !self.branch.trim().is_empty() {
            VersionSelection::Branch(self.branch.trim().to_string())
        } else if !self.versions.trim().is_empty() {
            VersionSelection::Constraint(Some(parse_constraint(&self.versions)?))
        } else {
            VersionSelection::Constraint(None)
        };

        let (version_strategy, fetch_strategy) = if library == GO_STDLIB {
            (VersionStrategy::GoDevListing, FetchStrategy::DownloadPrebuilt)
        } else {
            (VersionStrategy::GoList, FetchStrategy::BuildFromSource)
        };

        Ok(TargetConfig {
            library: library.to_string(),
            selection,
            version_strategy,
            fetch_strategy,
            packages: self.packages.clone(),
            inspect: self.inspect.clone(),
            policy,
        })
    }
}

/// A parsed query manifest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    libs: InputLibs,
}

impl Manifest {
    /// Load a manifest file. Relative `inspect` paths resolve against its directory.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| Error::InvalidManifest(format!("{}: {}", path.display(), e)))?;
        let mut manifest = Self::from_json(&content)?;

        if let Some(base) = path.parent() {
            for query in manifest.libs.values_mut() {
                if let Some(inspect) = query.inspect.as_mut() {
                    if inspect.is_relative() {
                        *inspect = base.join(&*inspect);
                    }
                }
            }
        }

        debug!("Loaded manifest {} with {} libraries", path.display(), manifest.libs.len());
        Ok(manifest)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| Error::InvalidManifest(e.to_string()))
    }

    pub fn len(&self) -> usize {
        self.libs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.libs.is_empty()
    }

    pub fn get(&self, library: &str) -> Option<&LibQuery> {
        self.libs.get(library)
    }

    /// Libraries in processing order: the standard library first, then by name
    pub fn iter(&self) -> impl Iterator<Item = (&str, &LibQuery)> {
        let stdlib = self.libs.get_key_value(GO_STDLIB);
        let rest = self.libs.iter().filter(|(name, _)| name.as_str() != GO_STDLIB);
        stdlib
            .into_iter()
            .chain(rest)
            .map(|(name, query)| (name.as_str(), query))
    }
}

/// Split `[min,max]name` into `(name, min, max)`.
///
/// Either bound may be empty, `[min]name` sets only the lower bound and a
/// name without a prefix has no bounds.
pub fn parse_field_name(raw: &str) -> (&str, &str, &str) {
    let raw = raw.trim();
    let Some(rest) = raw.strip_prefix('[') else {
        return (raw, "", "");
    };
    let Some(close) = rest.find(']') else {
        return (raw, "", "");
    };

    let bounds = &rest[..close];
    let name = rest[close + 1..].trim();
    match bounds.split_once(',') {
        Some((min, max)) => (name, min.trim(), max.trim()),
        None => (name, bounds.trim(), ""),
    }
}
