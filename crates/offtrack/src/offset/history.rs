//! Change-point histories of a single field's offset

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::version::Version;

/// "From `since` on, the field sits at `offset`"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangePoint {
    pub offset: u64,
    pub since: Version,
}

/// Oldest and newest versions that contributed to a history
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionBounds {
    #[serde(default)]
    pub oldest: String,
    #[serde(default)]
    pub newest: String,
}

impl VersionBounds {
    pub fn contains(&self, version: &Version) -> bool {
        version.is_within(&self.oldest, &self.newest)
    }

    fn span(&self) -> Option<(Version, Version)> {
        if self.oldest.trim().is_empty() || self.newest.trim().is_empty() {
            return None;
        }
        Some((
            Version::parse_or_zero(&self.oldest),
            Version::parse_or_zero(&self.newest),
        ))
    }
}

/// Minimal change-point log for one (structure, field) key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldHistory {
    pub offsets: Vec<ChangePoint>,
    #[serde(default)]
    pub versions: VersionBounds,
}

impl FieldHistory {
    /// Offset of the newest change point at or before `version`.
    ///
    /// Versions outside the observed bounds are never answered.
    pub fn offset_at(&self, version: &Version) -> Option<u64> {
        if !self.versions.contains(version) {
            return None;
        }
        self.offsets
            .iter()
            .rev()
            .find(|cp| cp.since <= *version)
            .map(|cp| cp.offset)
    }

    /// Merge fresh observations into this history, see [`normalize`]
    pub fn merge(&self, observations: &[(Version, u64)]) -> FieldHistory {
        normalize(Some(self), observations)
    }
}

/// Collapse `existing` change points plus `observations` into a minimal history.
///
/// Entries are ordered by version; an observation for a version that already
/// has a change point replaces it. Only the first entry and entries whose
/// offset differs from the previous one are kept. Bounds cover every input,
/// including samples that did not change the offset.
pub fn normalize(existing: Option<&FieldHistory>, observations: &[(Version, u64)]) -> FieldHistory {
    let mut by_version: BTreeMap<Version, u64> = BTreeMap::new();
    let mut lo: Option<Version> = None;
    let mut hi: Option<Version> = None;
    let mut widen = |v: &Version| {
        if lo.as_ref().is_none_or(|l| v < l) {
            lo = Some(v.clone());
        }
        if hi.as_ref().is_none_or(|h| v > h) {
            hi = Some(v.clone());
        }
    };

    if let Some(history) = existing {
        for cp in &history.offsets {
            by_version.insert(cp.since.clone(), cp.offset);
            widen(&cp.since);
        }
        if let Some((oldest, newest)) = history.versions.span() {
            widen(&oldest);
            widen(&newest);
        }
    }
    for (version, offset) in observations {
        by_version.insert(version.clone(), *offset);
        widen(version);
    }

    let mut offsets: Vec<ChangePoint> = Vec::new();
    for (since, offset) in by_version {
        if offsets.last().is_none_or(|last| last.offset != offset) {
            offsets.push(ChangePoint { offset, since });
        }
    }

    let versions = VersionBounds {
        oldest: lo.map(|v| v.to_string()).unwrap_or_default(),
        newest: hi.map(|v| v.to_string()).unwrap_or_default(),
    };

    FieldHistory { offsets, versions }
}
