use std::path::PathBuf;

use semver::VersionReq;
use strum::{Display, EnumString, IntoStaticStr};

/// Which versions of a library to examine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSelection {
    /// A single branch label, no discovery
    Branch(String),
    /// Every discovered version, optionally filtered
    Constraint(Option<VersionReq>),
}

/// How available versions are discovered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum VersionStrategy {
    /// `go list -m -versions <module>`
    GoList,
    /// The go.dev release listing
    GoDevListing,
}

/// How an executable is obtained for a version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum FetchStrategy {
    /// Build a throwaway program importing the library
    BuildFromSource,
    /// Download a prebuilt toolchain
    DownloadPrebuilt,
}

/// What to do when a query cannot be resolved in a binary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum MissingFieldPolicy {
    /// Drop the whole version and keep going
    #[default]
    SkipVersion,
    /// Keep whatever resolved for the version
    RecordPartial,
    /// Fail the library
    Abort,
}

/// Immutable per-library run configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetConfig {
    /// Module path, or `go` for the standard library
    pub library: String,
    pub selection: VersionSelection,
    pub version_strategy: VersionStrategy,
    pub fetch_strategy: FetchStrategy,
    /// Packages the generated program imports; empty means the module itself
    pub packages: Vec<String>,
    /// A Go source file compiled instead of the generated program
    pub inspect: Option<PathBuf>,
    pub policy: MissingFieldPolicy,
}
