//! Version normalization and ordering
//!
//! Library tags are mostly semantic versions, but real-world labels carry
//! noise: a leading `v`, Go toolchain labels such as `1.21rc2`, a fourth
//! numeric component, or a build tag separated by whitespace
//! (`1.19.0 X:boringcrypto`). Everything is reduced to a
//! `major.minor.patch[-prerelease]` [`semver::Version`] before comparing.
//! Labels that still do not parse (branch names and the like) collapse to
//! the zero version `0.0.0`, which keeps the ordering total.

use std::cmp::Ordering;
use std::fmt;

use semver::{BuildMetadata, Prerelease, VersionReq};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// A normalized version label
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Version(semver::Version);

impl Version {
    /// The sentinel every unparseable label maps to
    pub fn zero() -> Self {
        Self(semver::Version::new(0, 0, 0))
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::zero()
    }

    pub fn as_semver(&self) -> &semver::Version {
        &self.0
    }

    /// Parse a label, failing with [`Error::MalformedVersion`] when it cannot
    /// be reduced to `major.minor.patch[-prerelease]`.
    pub fn parse_strict(label: &str) -> Result<Self> {
        let malformed = || Error::MalformedVersion(label.to_string());

        let mut tokens = label.split_whitespace();
        let mut text = tokens.next().ok_or_else(malformed)?.to_string();
        // Whitespace separated build tags are dropped, prerelease tokens kept
        for token in tokens {
            if token.starts_with('-') {
                text.push_str(token);
            }
        }

        let text = match text.strip_prefix('v') {
            Some(rest) if rest.starts_with(|c: char| c.is_ascii_digit()) => rest,
            _ => text.as_str(),
        };

        let text = text.split_once('+').map_or(text, |(core, _build)| core);
        let (core, mut pre) = match text.split_once('-') {
            Some((core, pre)) => (core, Some(pre.to_string())),
            None => (text, None),
        };

        let mut numbers = Vec::with_capacity(3);
        let parts: Vec<&str> = core.split('.').collect();
        for (idx, part) in parts.iter().enumerate() {
            let digits_end = part
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(part.len());
            if digits_end == 0 {
                return Err(malformed());
            }
            numbers.push(part[..digits_end].parse::<u64>().map_err(|_| malformed())?);

            // Go toolchain style prerelease glued to the last number: 1.21rc2
            if digits_end < part.len() {
                if idx + 1 != parts.len() || pre.is_some() {
                    return Err(malformed());
                }
                pre = Some(part[digits_end..].to_string());
            }
        }

        numbers.resize(numbers.len().max(3), 0);
        let mut version = semver::Version::new(numbers[0], numbers[1], numbers[2]);
        if let Some(pre) = pre {
            version.pre = Prerelease::new(&pre).map_err(|_| malformed())?;
        }
        version.build = BuildMetadata::EMPTY;

        Ok(Self(version))
    }

    /// Parse a label, mapping anything malformed to [`Version::zero`].
    pub fn parse_or_zero(label: &str) -> Self {
        match Self::parse_strict(label) {
            Ok(version) => version,
            Err(e) => {
                debug!("{}, treating as 0.0.0", e);
                Self::zero()
            }
        }
    }

    /// Inclusive range check; an empty bound is unbounded.
    pub fn is_within(&self, lower: &str, upper: &str) -> bool {
        let lower = lower.trim();
        let upper = upper.trim();
        if !lower.is_empty() && *self < Version::parse_or_zero(lower) {
            return false;
        }
        if !upper.is_empty() && *self > Version::parse_or_zero(upper) {
            return false;
        }
        true
    }

    /// Check the version against a comparator requirement (`>= 1.12`)
    pub fn matches(&self, req: &VersionReq) -> bool {
        req.matches(&self.0)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Version {
    fn from(label: String) -> Self {
        Self::parse_or_zero(&label)
    }
}

impl From<&str> for Version {
    fn from(label: &str) -> Self {
        Self::parse_or_zero(label)
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.to_string()
    }
}

/// Canonical string form of a version label
pub fn normalize(label: &str) -> String {
    Version::parse_or_zero(label).to_string()
}

/// Compare two version labels after normalization
pub fn compare(a: &str, b: &str) -> Ordering {
    Version::parse_or_zero(a).cmp(&Version::parse_or_zero(b))
}

/// Check `lower <= version <= upper`; an empty bound is unbounded.
pub fn is_within(version: &str, lower: &str, upper: &str) -> bool {
    Version::parse_or_zero(version).is_within(lower, upper)
}

/// Parse a comma separated constraint such as `>= 1.12` or `>= v1.2, < 2`.
///
/// Each comparator's version goes through the same normalization as labels,
/// so `v` prefixes and short forms are accepted. A bare version means exactly
/// that version, and `~> 1.2` allows later versions up to, excluding, the
/// next bump of the second to last written component (`< 2.0.0`).
pub fn parse_constraint(constraint: &str) -> Result<VersionReq> {
    let invalid = |message: String| Error::InvalidConstraint {
        constraint: constraint.to_string(),
        message,
    };

    let mut comparators = Vec::new();
    for part in constraint.split(',') {
        let part = part.trim();
        if part.is_empty() {
            return Err(invalid("empty comparator".to_string()));
        }

        let op_end = part
            .find(|c: char| !matches!(c, '<' | '>' | '=' | '~' | '^' | '!'))
            .unwrap_or(part.len());
        let (op, raw) = part.split_at(op_end);
        let raw = raw.trim();
        let version = Version::parse_strict(raw).map_err(|e| invalid(e.to_string()))?;

        match op {
            "" | "=" => comparators.push(format!("={version}")),
            ">" | ">=" | "<" | "<=" | "~" | "^" => comparators.push(format!("{op}{version}")),
            "~>" => {
                let base = version.as_semver();
                let upper = if written_components(raw) >= 3 {
                    semver::Version::new(base.major, base.minor + 1, 0)
                } else {
                    semver::Version::new(base.major + 1, 0, 0)
                };
                comparators.push(format!(">={version}"));
                comparators.push(format!("<{upper}"));
            }
            _ => return Err(invalid(format!("unsupported operator {op:?}"))),
        }
    }

    VersionReq::parse(&comparators.join(", ")).map_err(|e| invalid(e.to_string()))
}

/// Numeric components written in a label: `1.2` has two, `v1.2.3-rc1` three
fn written_components(raw: &str) -> usize {
    let raw = raw.strip_prefix('v').unwrap_or(raw);
    let core = raw
        .split(|c: char| c == '-' || c == '+' || c.is_whitespace())
        .next()
        .unwrap_or(raw);
    core.split('.').count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_tag_suffix_is_ignored() {
        assert_eq!(compare("1.19.0 X:boringcrypto", "1.19.0"), Ordering::Equal);
        assert_eq!(normalize("1.19.0 X:boringcrypto"), "1.19.0");
    }

    #[test]
    fn test_prerelease_sorts_before_release() {
        assert_eq!(compare("1.19.0-prerelease", "1.19.0"), Ordering::Less);
        assert_eq!(compare("1.19.0 -rc1", "1.19.0"), Ordering::Less);
        assert_eq!(normalize("1.19.0 -rc1"), "1.19.0-rc1");
    }

    #[test]
    fn test_unparseable_labels_collapse_to_zero() {
        assert_eq!(compare("branch-foo", "anything-unparseable"), Ordering::Equal);
        assert_eq!(normalize("main"), "0.0.0");
        assert_eq!(compare("main", "0.0.1"), Ordering::Less);
        assert!(Version::parse_or_zero("feature/x").is_zero());
    }

    #[test]
    fn test_strict_parse_reports_malformed() {
        let err = Version::parse_strict("branch-foo").unwrap_err();
        assert!(matches!(err, Error::MalformedVersion(ref s) if s == "branch-foo"));
        assert!(Version::parse_strict("").is_err());
        assert!(Version::parse_strict("1..2").is_err());
    }

    #[test]
    fn test_extra_components_are_truncated() {
        assert_eq!(normalize("1.2.3.4"), "1.2.3");
        assert_eq!(compare("1.2.3.9", "1.2.3"), Ordering::Equal);
        assert_eq!(normalize("1.2.3.4-beta"), "1.2.3-beta");
    }

    #[test]
    fn test_leading_v_and_short_forms() {
        assert_eq!(normalize("v1.16.7"), "1.16.7");
        assert_eq!(normalize("1.20"), "1.20.0");
        assert_eq!(normalize("v0.1.0"), "0.1.0");
        assert_eq!(normalize("1.21rc2"), "1.21.0-rc2");
        assert_eq!(compare("1.21rc2", "1.21.0"), Ordering::Less);
        assert_eq!(compare("1.21rc2", "1.20.9"), Ordering::Greater);
    }

    #[test]
    fn test_build_metadata_does_not_affect_order() {
        assert_eq!(compare("1.4.0+incompatible", "1.4.0"), Ordering::Equal);
        assert_eq!(normalize("v2.0.0+incompatible"), "2.0.0");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for label in [
            "1.19.0 X:boringcrypto",
            "v1.2.3-rc.1",
            "1.2.3.4",
            "main",
            "1.21rc2",
            "1.20",
            "2.0.0+meta",
        ] {
            let once = normalize(label);
            assert_eq!(normalize(&once), once, "label {label:?}");
        }
    }

    #[test]
    fn test_compare_is_a_total_order() {
        let labels = [
            "main",
            "0.9.0",
            "1.18.7",
            "1.19.0-beta",
            "1.19.0-rc1",
            "1.19.0",
            "1.19.0 X:boringcrypto",
            "1.19.7",
            "2.0.0",
        ];
        for a in labels {
            for b in labels {
                assert_eq!(compare(a, b), compare(b, a).reverse(), "{a} vs {b}");
                for c in labels {
                    if compare(a, b) != Ordering::Greater && compare(b, c) != Ordering::Greater {
                        assert_ne!(compare(a, c), Ordering::Greater, "{a} {b} {c}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_is_within_treats_empty_bound_as_open() {
        assert!(is_within("1.19.0", "1.18.0", "1.20.0"));
        assert!(is_within("1.18.0", "1.18.0", "1.20.0"));
        assert!(is_within("1.20.0", "1.18.0", "1.20.0"));
        assert!(!is_within("1.17.9", "1.18.0", "1.20.0"));
        assert!(!is_within("1.20.1", "1.18.0", "1.20.0"));
        assert!(is_within("0.0.1", "", "1.0.0"));
        assert!(is_within("9.0.0", "1.0.0", ""));
        assert!(is_within("anything", "", ""));
    }

    #[test]
    fn test_constraint_matching() {
        let req = parse_constraint(">= 1.12").unwrap();
        assert!(Version::from("1.12.0").matches(&req));
        assert!(Version::from("v1.16.7").matches(&req));
        assert!(!Version::from("1.11.9").matches(&req));
        assert!(parse_constraint("not a constraint").is_err());
    }

    #[test]
    fn test_bare_constraint_is_exact() {
        let req = parse_constraint("1.2").unwrap();
        assert!(Version::from("1.2.0").matches(&req));
        assert!(!Version::from("1.2.1").matches(&req));
        assert!(!Version::from("1.9.0").matches(&req));

        let req = parse_constraint("= v1.16.7").unwrap();
        assert!(Version::from("v1.16.7").matches(&req));
        assert!(!Version::from("v1.16.8").matches(&req));
    }

    #[test]
    fn test_pessimistic_constraint() {
        let req = parse_constraint("~> 1.2").unwrap();
        assert!(Version::from("1.2.0").matches(&req));
        assert!(Version::from("1.9.0").matches(&req));
        assert!(!Version::from("1.1.9").matches(&req));
        assert!(!Version::from("2.0.0").matches(&req));

        let req = parse_constraint("~> 1.2.3").unwrap();
        assert!(Version::from("1.2.3").matches(&req));
        assert!(Version::from("1.2.9").matches(&req));
        assert!(!Version::from("1.3.0").matches(&req));
    }

    #[test]
    fn test_constraint_versions_are_normalized() {
        let req = parse_constraint(">= v1.40").unwrap();
        assert!(Version::from("v1.40.0").matches(&req));
        assert!(!Version::from("v1.39.9").matches(&req));

        // short upper bounds mean the written version, not the whole minor line
        let req = parse_constraint("<= 1.2").unwrap();
        assert!(Version::from("1.2.0").matches(&req));
        assert!(!Version::from("1.2.5").matches(&req));

        let req = parse_constraint(">=1.2, < 2").unwrap();
        assert!(Version::from("1.9.9").matches(&req));
        assert!(!Version::from("2.0.0").matches(&req));
    }

    #[test]
    fn test_unsupported_constraints() {
        for constraint in ["!= 1.2", ">> 1.2", "", ">= 1.2,", ">= main"] {
            let err = parse_constraint(constraint).unwrap_err();
            assert!(
                matches!(err, Error::InvalidConstraint { .. }),
                "constraint {constraint:?}"
            );
        }
    }

    #[test]
    fn test_serde_uses_canonical_string() {
        let v: Version = serde_json::from_str("\"v1.18.7\"").unwrap();
        assert_eq!(v.to_string(), "1.18.7");
        assert_eq!(serde_json::to_string(&v).unwrap(), "\"1.18.7\"");
    }
}
