use offtrack::{Error, Result, VersionSupplier, compare};
use serde::Deserialize;
use tracing::debug;

const RELEASES_URL: &str = "https://go.dev/dl/?mode=json&include=all";

/// The full listing is several megabytes
const LISTING_LIMIT: u64 = 64 * 1024 * 1024;

#[derive(Deserialize)]
struct Release {
    version: String,
}

/// Lists Go releases from the go.dev download page
pub struct GoDevVersions {
    agent: ureq::Agent,
}

impl GoDevVersions {
    pub fn new(agent: ureq::Agent) -> Self {
        Self { agent }
    }
}

impl VersionSupplier for GoDevVersions {
    fn versions(&self, library: &str) -> Result<Vec<String>> {
        let discovery = |cause: String| Error::VersionDiscovery {
            library: library.to_string(),
            cause,
        };

        let mut resp = self
            .agent
            .get(RELEASES_URL)
            .call()
            .map_err(|e| discovery(e.to_string()))?;
        let body = resp
            .body_mut()
            .with_config()
            .limit(LISTING_LIMIT)
            .read_to_string()
            .map_err(|e| discovery(e.to_string()))?;

        let versions = parse_listing(&body).map_err(|e| discovery(e.to_string()))?;
        debug!("go.dev lists {} releases", versions.len());
        Ok(versions)
    }
}

/// Release versions without the `go` prefix, oldest first
fn parse_listing(json: &str) -> Result<Vec<String>> {
    let releases: Vec<Release> = serde_json::from_str(json)?;
    let mut versions: Vec<String> = releases
        .into_iter()
        .map(|r| match r.version.strip_prefix("go") {
            Some(v) => v.to_string(),
            None => r.version,
        })
        .collect();
    versions.sort_by(|a, b| compare(a, b));
    versions.dedup();
    Ok(versions)
}
