//! Capabilities the orchestrator needs from the outside world

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use super::TargetConfig;
use crate::error::Result;

/// Lists the versions of a library, oldest first
pub trait VersionSupplier {
    fn versions(&self, library: &str) -> Result<Vec<String>>;
}

/// Produces an executable compiled at a given version
pub trait ExecutableSupplier {
    fn fetch(&self, target: &TargetConfig, version: &str) -> Result<Executable>;
}

/// An executable on disk plus the temporary directories backing it.
///
/// The directories are deleted when the handle is dropped.
#[derive(Debug)]
pub struct Executable {
    path: PathBuf,
    _workdirs: Vec<TempDir>,
}

impl Executable {
    /// An executable living inside `workdir`
    pub fn in_workdir(path: PathBuf, workdir: TempDir) -> Self {
        Self {
            path,
            _workdirs: vec![workdir],
        }
    }

    /// An executable that outlives the run, e.g. inside a toolchain cache
    pub fn persistent(path: PathBuf) -> Self {
        Self {
            path,
            _workdirs: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
