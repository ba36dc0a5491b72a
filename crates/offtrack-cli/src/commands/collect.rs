//! Collect offsets for every library in a manifest.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use offtrack::{LoadStatus, Manifest, MissingFieldPolicy, OffsetSource, OffsetStore, Target, TargetResult};
use tracing::{error, info, warn};

use crate::supplier::{Suppliers, default_toolchain_cache};

/// Options of the `collect` command
pub struct CollectOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub cache: Option<PathBuf>,
    pub policy: MissingFieldPolicy,
    pub go: PathBuf,
    pub toolchain_cache: Option<PathBuf>,
}

pub fn run(options: CollectOptions) -> Result<()> {
    let manifest = Manifest::load(&options.input).context("Failed to load manifest")?;
    info!("Loaded {} libraries from {}", manifest.len(), options.input.display());

    let cache_path = options.cache.as_deref().unwrap_or(&options.output);
    let mut store = open_store(cache_path);

    let toolchain_cache = options
        .toolchain_cache
        .clone()
        .unwrap_or_else(default_toolchain_cache);
    let suppliers = Suppliers::new(options.go.clone(), toolchain_cache);

    let mut results = Vec::new();
    let mut failed_libraries = Vec::new();

    for (name, query) in manifest.iter() {
        let config = query
            .target_config(name, options.policy)
            .with_context(|| format!("Invalid manifest entry for {}", name))?;
        let (versions, executables) = suppliers.for_config(&config);
        let target = Target::new(config, versions, executables);

        match target.find_offsets(&store, &query.queries()) {
            Ok(result) => results.push(result),
            Err(e) if options.policy == MissingFieldPolicy::Abort => {
                return Err(e).with_context(|| format!("Failed to collect offsets for {}", name));
            }
            Err(e) => {
                error!("{}: {}", name, e);
                failed_libraries.push((name.to_string(), e.to_string()));
            }
        }
    }

    info!("Done collecting offsets, writing results to file ...");
    store.record(&results);
    store
        .save_to_path(&options.output)
        .context("Failed to save offsets")?;

    eprint!("{}", summary(&results, &failed_libraries));
    Ok(())
}

fn open_store(path: &Path) -> OffsetStore {
    let (store, status) = OffsetStore::open(path);
    if let LoadStatus::Corrupt(e) = status {
        warn!("Starting with an empty offsets store: {}", e);
    }
    store
}

/// Per-library summary lines
fn summary(results: &[TargetResult], failed_libraries: &[(String, String)]) -> String {
    let mut out = String::new();
    for result in results {
        let cached = result
            .versions
            .iter()
            .filter(|v| v.source == OffsetSource::Cache)
            .count();
        out.push_str(&format!(
            "{}: {} versions ({} from cache), {} failed\n",
            result.library,
            result.versions.len(),
            cached,
            result.failures.len()
        ));
        for failure in &result.failures {
            out.push_str(&format!("  {}: {}\n", failure.version, failure.reason));
        }
    }
    for (library, reason) in failed_libraries {
        out.push_str(&format!("{}: failed: {}\n", library, reason));
    }
    out
}
