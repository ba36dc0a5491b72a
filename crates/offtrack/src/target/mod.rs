//! Per-library offset collection.
//!
//! A [`Target`] walks the versions of one library, answers each version
//! from the [`OffsetStore`] when every query is already known there, and
//! otherwise fetches an executable and analyzes its debug information.
//!
//! ## Example
//!
//! ```ignore
//! let target = Target::new(config, &versions, &executables);
//! let result = target.find_offsets(&store, &queries)?;
//! store.record(&[result]);
//! store.save_to_path("offsets.json")?;
//! ```

mod config;
mod supplier;

use std::fs::File;
use std::io::BufReader;

use semver::VersionReq;
use strum::Display;
use tracing::{info, warn};

use crate::binary::{self, FieldQuery, ResolvedOffset};
use crate::error::{Error, Result};
use crate::offset::OffsetStore;
use crate::version::Version;

pub use config::*;
pub use supplier::*;

/// Where a version's offsets came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum OffsetSource {
    Cache,
    Binary,
}

/// Offsets collected for one version
#[derive(Debug, Clone)]
pub struct VersionedResult {
    /// Label as supplied, e.g. `v1.16.7` or a branch name
    pub label: String,
    pub version: Version,
    pub source: OffsetSource,
    pub offsets: Vec<ResolvedOffset>,
}

/// A version whose collection was abandoned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionFailure {
    pub version: String,
    pub reason: String,
}

/// Everything collected for one library
#[derive(Debug, Clone)]
pub struct TargetResult {
    pub library: String,
    pub versions: Vec<VersionedResult>,
    pub failures: Vec<VersionFailure>,
}

/// Collects offsets for one library
pub struct Target<'a> {
    config: TargetConfig,
    versions: &'a dyn VersionSupplier,
    executables: &'a dyn ExecutableSupplier,
}

impl<'a> Target<'a> {
    pub fn new(
        config: TargetConfig,
        versions: &'a dyn VersionSupplier,
        executables: &'a dyn ExecutableSupplier,
    ) -> Self {
        Self {
            config,
            versions,
            executables,
        }
    }

    pub fn find_offsets(&self, store: &OffsetStore, queries: &[FieldQuery]) -> Result<TargetResult> {
        let name = &self.config.library;
        let labels = self.discover_versions()?;

        let mut result = TargetResult {
            library: name.clone(),
            versions: Vec::new(),
            failures: Vec::new(),
        };

        for label in labels {
            let version = Version::parse_or_zero(&label);
            let applicable: Vec<FieldQuery> = queries
                .iter()
                .filter(|q| q.applies_to(&version))
                .cloned()
                .collect();

            if let Some(offsets) = store.lookup_all(&label, &applicable) {
                info!("{}: Found all requested offsets in cache for version {}", name, label);
                result.versions.push(VersionedResult {
                    label,
                    version,
                    source: OffsetSource::Cache,
                    offsets,
                });
                continue;
            }

            match self.collect_version(&label, &version, &applicable) {
                Ok(offsets) => result.versions.push(VersionedResult {
                    label,
                    version,
                    source: OffsetSource::Binary,
                    offsets,
                }),
                Err(e) if self.config.policy == MissingFieldPolicy::Abort => return Err(e),
                Err(e) => {
                    if e.is_container_failure() {
                        warn!("{} (version: {}): unusable binary: {}", name, label, e);
                    } else {
                        warn!("{} (version: {}): {}", name, label, e);
                    }
                    result.failures.push(VersionFailure {
                        version: label,
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(result)
    }

    fn discover_versions(&self) -> Result<Vec<String>> {
        match &self.config.selection {
            VersionSelection::Branch(branch) => Ok(vec![branch.clone()]),
            VersionSelection::Constraint(req) => {
                info!(
                    "{}: Discovering available versions ({})",
                    self.config.library, self.config.version_strategy
                );
                let all = self.versions.versions(&self.config.library)?;
                filter_versions(&self.config.library, all, req.as_ref())
            }
        }
    }

    fn collect_version(
        &self,
        label: &str,
        version: &Version,
        queries: &[FieldQuery],
    ) -> Result<Vec<ResolvedOffset>> {
        let name = &self.config.library;

        info!("{}: Fetching version {} ({})", name, label, self.config.fetch_strategy);
        let executable = self.executables.fetch(&self.config, label)?;

        info!("{}: Analyzing binary for version {}", name, label);
        let file = File::open(executable.path())?;
        let analysis = binary::find_offsets(BufReader::new(file), version, queries)?;

        for query in analysis.missing() {
            warn!("{} (version: {}): could not find offsets for {}", name, label, query);
        }

        match self.config.policy {
            MissingFieldPolicy::RecordPartial => Ok(analysis.into_resolved()),
            MissingFieldPolicy::SkipVersion | MissingFieldPolicy::Abort => {
                match analysis.missing_error() {
                    Some(e) => Err(e),
                    None => Ok(analysis.into_resolved()),
                }
            }
        }
    }
}

/// Keep the labels matching `req`, in supplier order
pub fn filter_versions(
    library: &str,
    labels: Vec<String>,
    req: Option<&VersionReq>,
) -> Result<Vec<String>> {
    let Some(req) = req else {
        return Ok(labels);
    };

    let filtered: Vec<String> = labels
        .into_iter()
        .filter(|label| Version::parse_or_zero(label).matches(req))
        .collect();

    if filtered.is_empty() {
        return Err(Error::NoVersionsMatched(library.to_string()));
    }
    Ok(filtered)
}
