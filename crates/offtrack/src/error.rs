use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Not a parseable executable: {0}")]
    UnparseableContainer(String),

    #[error("Executable has no debug information")]
    MissingDebugInfo,

    #[error("Could not find offsets for {structure} {field}")]
    FieldNotFound { structure: String, field: String },

    #[error("Malformed version: {0:?}")]
    MalformedVersion(String),

    #[error("Corrupt offsets file {path}: {message}")]
    CorruptPersistedStore { path: PathBuf, message: String },

    #[error("Failed to write offsets file {path}: {message}")]
    StorePersistence { path: PathBuf, message: String },

    #[error("Failed to acquire {library} {version}: {cause}")]
    Acquisition {
        library: String,
        version: String,
        cause: String,
    },

    #[error("Failed to discover versions of {library}: {cause}")]
    VersionDiscovery { library: String, cause: String },

    #[error("Invalid version constraint {constraint:?}: {message}")]
    InvalidConstraint { constraint: String, message: String },

    #[error("No versions found for {0:?}. Try expanding the constraint or set the name of a given branch")]
    NoVersionsMatched(String),

    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("DWARF error: {0}")]
    Dwarf(#[from] gimli::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Errors that make a whole binary unusable, as opposed to a single query.
    pub fn is_container_failure(&self) -> bool {
        matches!(
            self,
            Error::UnparseableContainer(_) | Error::MissingDebugInfo | Error::Dwarf(_)
        )
    }
}
