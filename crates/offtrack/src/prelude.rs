//! Prelude module for convenient imports
//!
//! ```ignore
//! use offtrack::prelude::*;
//! ```
//!
//! This brings the following into scope:
//!
//! - Collection: `Target`, `TargetConfig`, `TargetResult`, the supplier traits
//! - Storage: `OffsetStore`, `FieldHistory`
//! - Queries: `FieldQuery`, `Manifest`
//! - Error handling: `Error`, `Result`

// Collection
pub use crate::target::{
    Executable, ExecutableSupplier, MissingFieldPolicy, Target, TargetConfig, TargetResult,
    VersionSupplier,
};

// Error handling
pub use crate::error::{Error, Result};

// Storage
pub use crate::offset::{FieldHistory, LoadStatus, OffsetStore};

// Queries
pub use crate::binary::{FieldQuery, ResolvedOffset};
pub use crate::manifest::{LibQuery, Manifest};
pub use crate::version::Version;
