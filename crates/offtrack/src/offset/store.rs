//! Version-indexed offset store
//!
//! Persists every field's change-point history to a JSON file and answers
//! "offset of field F at version V" from it, so binaries whose offsets are
//! already known do not need to be fetched and analyzed again.

use std::collections::BTreeMap;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use super::history::{FieldHistory, normalize};
use crate::binary::{FieldQuery, ResolvedOffset};
use crate::error::{Error, Result};
use crate::target::TargetResult;
use crate::version::Version;

/// Field name -> history
pub type StructFields = BTreeMap<String, FieldHistory>;

/// How [`OffsetStore::open`] went
#[derive(Debug)]
pub enum LoadStatus {
    Loaded,
    /// No file yet; the store starts empty
    Missing,
    /// The file exists but could not be read or parsed; the store starts empty
    Corrupt(Error),
}

/// Structure name -> field name -> history
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetStore {
    #[serde(default)]
    data: BTreeMap<String, StructFields>,
}

impl OffsetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store, never failing: a missing or corrupt file yields an empty store.
    pub fn open<P: AsRef<Path>>(path: P) -> (Self, LoadStatus) {
        let path = path.as_ref();

        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("Could not find existing offsets file {}, cache will be empty", path.display());
                return (Self::new(), LoadStatus::Missing);
            }
            Err(e) => {
                warn!("Error reading existing offsets file: {}. Ignoring existing file.", e);
                let err = Error::CorruptPersistedStore {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                };
                return (Self::new(), LoadStatus::Corrupt(err));
            }
        };

        match serde_json::from_str::<OffsetStore>(&content) {
            Ok(store) => {
                let store = store.sorted();
                debug!(
                    "Loaded offsets for {} structures from {}",
                    store.data.len(),
                    path.display()
                );
                (store, LoadStatus::Loaded)
            }
            Err(e) => {
                warn!("Error parsing existing offsets file: {}. Ignoring existing file.", e);
                let err = Error::CorruptPersistedStore {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                };
                (Self::new(), LoadStatus::Corrupt(err))
            }
        }
    }

    /// Strictly parse a store from any reader
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        let store: OffsetStore =
            serde_json::from_str(&content).map_err(|e| Error::CorruptPersistedStore {
                path: Default::default(),
                message: e.to_string(),
            })?;
        Ok(store.sorted())
    }

    /// Hand-edited files may list change points out of order
    fn sorted(mut self) -> Self {
        for fields in self.data.values_mut() {
            for history in fields.values_mut() {
                history.offsets.sort_by(|a, b| a.since.cmp(&b.since));
            }
        }
        self
    }

    /// Pretty JSON with stable key order
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Save store to file
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let persistence = |message: String| Error::StorePersistence {
            path: path.to_path_buf(),
            message,
        };

        let content = self.to_json_pretty().map_err(|e| persistence(e.to_string()))?;

        // Write next to the target and rename over it, so the old file survives a failed write
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut file = NamedTempFile::new_in(dir).map_err(|e| persistence(e.to_string()))?;
        file.write_all(content.as_bytes())
            .and_then(|_| file.as_file().sync_all())
            .map_err(|e| persistence(e.to_string()))?;
        file.persist(path).map_err(|e| persistence(e.error.to_string()))?;
        info!("Saved offsets to {}", path.display());
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn structures(&self) -> impl Iterator<Item = (&String, &StructFields)> {
        self.data.iter()
    }

    pub fn history(&self, structure: &str, field: &str) -> Option<&FieldHistory> {
        self.data.get(structure)?.get(field)
    }

    /// Offset of `structure.field` at `version`, if the history covers it
    pub fn lookup(&self, structure: &str, field: &str, version: &str) -> Option<u64> {
        let history = self.history(structure, field)?;
        history.offset_at(&Version::parse_or_zero(version))
    }

    /// Answer a whole batch from the store, or nothing at all
    pub fn lookup_all(&self, version: &str, queries: &[FieldQuery]) -> Option<Vec<ResolvedOffset>> {
        let target = Version::parse_or_zero(version);
        let mut results = Vec::with_capacity(queries.len());
        for query in queries {
            let history = self.history(&query.structure, &query.field)?;
            let offset = history.offset_at(&target)?;
            results.push(ResolvedOffset {
                query: query.clone(),
                offset,
            });
        }
        Some(results)
    }

    /// Replace one field's history by merging `observations` into it
    pub fn merge(&mut self, structure: &str, field: &str, observations: &[(Version, u64)]) {
        let fields = self.data.entry(structure.to_string()).or_default();
        let merged = normalize(fields.get(field), observations);
        fields.insert(field.to_string(), merged);
    }

    /// Fold every per-version result of a run into the store
    pub fn record(&mut self, results: &[TargetResult]) {
        let mut observations: BTreeMap<(&str, &str), Vec<(Version, u64)>> = BTreeMap::new();
        for result in results {
            for versioned in &result.versions {
                for resolved in &versioned.offsets {
                    observations
                        .entry((
                            resolved.query.structure.as_str(),
                            resolved.query.field.as_str(),
                        ))
                        .or_default()
                        .push((versioned.version.clone(), resolved.offset));
                }
            }
        }

        for ((structure, field), obs) in observations {
            self.merge(structure, field, &obs);
        }
    }
}
