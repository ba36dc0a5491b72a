//! Go toolchain backed version and executable suppliers.

mod go_dev;
mod go_list;
mod prebuilt;
mod wrapper;

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use offtrack::{
    Error, ExecutableSupplier, FetchStrategy, TargetConfig, VersionStrategy, VersionSupplier,
};
use tracing::debug;

pub use go_dev::GoDevVersions;
pub use go_list::GoListVersions;
pub use prebuilt::PrebuiltToolchain;
pub use wrapper::WrapperBuild;

/// Name of the executable every build produces
pub const APP_NAME: &str = "testapp";

/// One instance of every supplier, shared by all libraries of a run
pub struct Suppliers {
    go_list: GoListVersions,
    go_dev: GoDevVersions,
    wrapper: WrapperBuild,
    prebuilt: PrebuiltToolchain,
}

impl Suppliers {
    pub fn new(go: PathBuf, toolchain_cache: PathBuf) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(600)))
            .build();
        let agent: ureq::Agent = config.into();

        Self {
            go_list: GoListVersions::new(go.clone()),
            go_dev: GoDevVersions::new(agent.clone()),
            wrapper: WrapperBuild::new(go),
            prebuilt: PrebuiltToolchain::new(agent, toolchain_cache),
        }
    }

    /// Suppliers matching the strategies of `config`
    pub fn for_config(&self, config: &TargetConfig) -> (&dyn VersionSupplier, &dyn ExecutableSupplier) {
        let versions: &dyn VersionSupplier = match config.version_strategy {
            VersionStrategy::GoList => &self.go_list,
            VersionStrategy::GoDevListing => &self.go_dev,
        };
        let executables: &dyn ExecutableSupplier = match config.fetch_strategy {
            FetchStrategy::BuildFromSource => &self.wrapper,
            FetchStrategy::DownloadPrebuilt => &self.prebuilt,
        };
        (versions, executables)
    }
}

/// Default toolchain cache under the user's cache directory
pub fn default_toolchain_cache() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("offtrack")
        .join("toolchains")
}

/// Run a command to completion, returning its stdout or a message with its stderr
fn run(command: &mut Command) -> std::result::Result<String, String> {
    debug!("Running {:?}", command);
    let output = command
        .output()
        .map_err(|e| format!("{:?}: {}", command.get_program(), e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!(
            "{:?} {}: {}",
            command.get_program(),
            output.status,
            stderr.trim()
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn acquisition(target: &TargetConfig, version: &str, cause: impl ToString) -> Error {
    Error::Acquisition {
        library: target.library.clone(),
        version: version.to_string(),
        cause: cause.to_string(),
    }
}
