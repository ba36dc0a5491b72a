use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use offtrack::{Executable, ExecutableSupplier, Result, TargetConfig};
use tracing::debug;

use super::{APP_NAME, acquisition, run};

/// Builds a throwaway program that imports the library at a version
pub struct WrapperBuild {
    go: PathBuf,
}

impl WrapperBuild {
    pub fn new(go: PathBuf) -> Self {
        Self { go }
    }
}

impl ExecutableSupplier for WrapperBuild {
    fn fetch(&self, target: &TargetConfig, version: &str) -> Result<Executable> {
        let dir = tempfile::Builder::new().prefix(APP_NAME).tempdir()?;
        debug!("Building {} {} in {}", target.library, version, dir.path().display());

        fs::write(dir.path().join("go.mod"), go_mod(&target.library, version))?;
        write_main(dir.path(), target)?;

        run(Command::new(&self.go)
            .args(["mod", "tidy", "-compat=1.17"])
            .current_dir(dir.path()))
        .map_err(|cause| acquisition(target, version, cause))?;

        run(Command::new(&self.go)
            .args(["build", "-o", APP_NAME])
            .env("GOOS", "linux")
            .env("GOARCH", "amd64")
            .current_dir(dir.path()))
        .map_err(|cause| acquisition(target, version, cause))?;

        Ok(Executable::in_workdir(dir.path().join(APP_NAME), dir))
    }
}

/// Write `main.go`: the inspect file verbatim, or blank imports of the packages
pub(super) fn write_main(dir: &Path, target: &TargetConfig) -> Result<()> {
    let main = dir.join("main.go");
    match &target.inspect {
        Some(inspect) => {
            fs::copy(inspect, &main)?;
        }
        None => fs::write(&main, main_go(&target.library, &target.packages))?,
    }
    Ok(())
}

fn go_mod(library: &str, version: &str) -> String {
    format!("module {APP_NAME}\n\ngo 1.17\n\nrequire {library} {version}\n")
}

fn main_go(library: &str, packages: &[String]) -> String {
    let mut out = String::from("package main\n\nimport (\n");
    if packages.is_empty() {
        out.push_str(&format!("\t_ \"{library}\"\n"));
    }
    for package in packages {
        out.push_str(&format!("\t_ \"{package}\"\n"));
    }
    out.push_str(")\n\nfunc main() {}\n");
    out
}
