use std::path::PathBuf;
use std::process::Command;

use offtrack::{Error, Result, VersionSupplier};
use tracing::debug;

use super::run;

/// Lists module versions with `go list -m -versions`
pub struct GoListVersions {
    go: PathBuf,
}

impl GoListVersions {
    pub fn new(go: PathBuf) -> Self {
        Self { go }
    }
}

impl VersionSupplier for GoListVersions {
    fn versions(&self, library: &str) -> Result<Vec<String>> {
        let discovery = |cause: String| Error::VersionDiscovery {
            library: library.to_string(),
            cause,
        };

        // outside any module so a go.mod in the working directory cannot interfere
        let dir = tempfile::tempdir()?;
        let stdout = run(
            Command::new(&self.go)
                .args(["list", "-m", "-versions", library])
                .current_dir(dir.path()),
        )
        .map_err(discovery)?;

        let versions = parse_versions(&stdout, library);
        debug!("{}: go list returned {} versions", library, versions.len());
        if versions.is_empty() {
            return Err(discovery("no tagged versions".to_string()));
        }
        Ok(versions)
    }
}

/// Labels following the module path, in printed order
fn parse_versions(stdout: &str, library: &str) -> Vec<String> {
    let mut words = stdout.split_whitespace();
    match words.next() {
        Some(module) if module == library => words.map(str::to_string).collect(),
        _ => Vec::new(),
    }
}
