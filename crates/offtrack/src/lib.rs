//! # offtrack
//!
//! Tracks the byte offsets of Go structure fields across library versions.
//!
//! This crate provides:
//! - Lenient version comparison of Go version labels
//! - Offset resolution from the DWARF debug information of executables
//! - A persisted, version-indexed store of change-point histories
//! - Per-library collection over discovered versions
//!
//! Fetching toolchains, building programs and listing versions happen behind
//! the [`VersionSupplier`] and [`ExecutableSupplier`] traits; the `offtrack`
//! binary provides implementations backed by the Go toolchain.

pub mod binary;
pub mod error;
pub mod manifest;
pub mod offset;
pub mod prelude;
pub mod target;
pub mod version;

pub use binary::{Analysis, FieldOutcome, FieldQuery, ResolvedOffset, find_offsets, find_offsets_in_bytes};
pub use error::{Error, Result};
pub use manifest::{GO_STDLIB, InputLibs, LibQuery, Manifest, parse_field_name};
pub use offset::{ChangePoint, FieldHistory, LoadStatus, OffsetStore, StructFields, VersionBounds};
pub use target::{
    Executable, ExecutableSupplier, FetchStrategy, MissingFieldPolicy, OffsetSource, Target,
    TargetConfig, TargetResult, VersionFailure, VersionSelection, VersionStrategy,
    VersionSupplier, VersionedResult, filter_versions,
};
pub use version::{Version, compare, is_within, normalize, parse_constraint};
