use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::Command;

use flate2::read::GzDecoder;
use offtrack::{Executable, ExecutableSupplier, Result, TargetConfig};
use tracing::info;

use super::wrapper::write_main;
use super::{APP_NAME, acquisition, run};

/// Downloads official Go toolchains from go.dev and keeps them in a cache directory
pub struct PrebuiltToolchain {
    agent: ureq::Agent,
    cache_dir: PathBuf,
}

impl PrebuiltToolchain {
    pub fn new(agent: ureq::Agent, cache_dir: PathBuf) -> Self {
        Self { agent, cache_dir }
    }

    /// GOROOT of the toolchain, downloading it on first use
    fn install(&self, target: &TargetConfig, version: &str, os: &str, arch: &str) -> Result<PathBuf> {
        let install_dir = self.cache_dir.join(toolchain_name(version, os, arch));
        let goroot = install_dir.join("go");
        if go_binary(&goroot).is_file() {
            info!("Using cached Go {} toolchain ({}-{})", version, os, arch);
            return Ok(goroot);
        }

        let url = download_url(version, os, arch);
        info!("Downloading {}", url);
        let mut resp = self
            .agent
            .get(&url)
            .call()
            .map_err(|e| acquisition(target, version, e))?;

        fs::create_dir_all(&self.cache_dir)?;
        let staging = tempfile::Builder::new()
            .prefix(".download")
            .tempdir_in(&self.cache_dir)?;
        unpack(resp.body_mut().as_reader(), staging.path())
            .map_err(|e| acquisition(target, version, format!("unpacking {}: {}", url, e)))?;

        fs::create_dir_all(&install_dir)?;
        if !goroot.exists() {
            fs::rename(staging.path().join("go"), &goroot)?;
        }
        Ok(goroot)
    }

    /// Compile the inspect file with the toolchain at `goroot`
    fn compile(&self, target: &TargetConfig, version: &str, goroot: &Path) -> Result<Executable> {
        let dir = tempfile::Builder::new().prefix(APP_NAME).tempdir()?;
        fs::write(dir.path().join("go.mod"), std_go_mod(version))?;
        write_main(dir.path(), target)?;

        run(toolchain_command(goroot, dir.path()).args(["mod", "tidy", "-compat=1.17"]))
            .map_err(|cause| acquisition(target, version, cause))?;
        run(toolchain_command(goroot, dir.path())
            .args(["build", "-o", APP_NAME])
            .env("GOOS", "linux")
            .env("GOARCH", "amd64"))
        .map_err(|cause| acquisition(target, version, cause))?;

        Ok(Executable::in_workdir(dir.path().join(APP_NAME), dir))
    }
}

impl ExecutableSupplier for PrebuiltToolchain {
    /// Without an inspect file the toolchain's own `go` binary is analyzed,
    /// so it must be a linux/amd64 build; otherwise the toolchain has to run here.
    fn fetch(&self, target: &TargetConfig, version: &str) -> Result<Executable> {
        match &target.inspect {
            None => {
                let goroot = self.install(target, version, "linux", "amd64")?;
                Ok(Executable::persistent(go_binary(&goroot)))
            }
            Some(_) => {
                let (os, arch) = host_platform();
                let goroot = self.install(target, version, os, arch)?;
                self.compile(target, version, &goroot)
            }
        }
    }
}

fn unpack<R: Read>(reader: R, dest: &Path) -> std::io::Result<()> {
    tar::Archive::new(GzDecoder::new(reader)).unpack(dest)
}

/// The toolchain's `go`, pinned to its own GOROOT
fn toolchain_command(goroot: &Path, workdir: &Path) -> Command {
    let mut command = Command::new(go_binary(goroot));
    command
        .env("GOROOT", goroot)
        .env("GOTOOLCHAIN", "local")
        .current_dir(workdir);
    command
}

fn go_binary(goroot: &Path) -> PathBuf {
    goroot.join("bin").join("go")
}

fn toolchain_name(version: &str, os: &str, arch: &str) -> String {
    format!("go{version}.{os}-{arch}")
}

fn download_url(version: &str, os: &str, arch: &str) -> String {
    format!("https://go.dev/dl/{}.tar.gz", toolchain_name(version, os, arch))
}

/// `go.mod` for a program using only the standard library, pinned to the
/// toolchain's minor version
fn std_go_mod(version: &str) -> String {
    let minor: Vec<&str> = version.split('.').take(2).collect();
    format!("module {APP_NAME}\n\ngo {}\n", minor.join("."))
}

/// Go's names for the running platform
fn host_platform() -> (&'static str, &'static str) {
    let os = match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    };
    let arch = match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "386",
        "powerpc64" => "ppc64",
        other => other,
    };
    (os, arch)
}
