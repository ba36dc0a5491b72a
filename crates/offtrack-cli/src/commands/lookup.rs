//! Point lookup in an offsets file.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result, bail};
use offtrack::OffsetStore;

/// Print the offset of `structure.field` at `version`
pub fn run(file: &Path, structure: &str, field: &str, version: &str) -> Result<()> {
    let offset = find(file, structure, field, version)?;
    println!("{}", offset);
    Ok(())
}

fn find(file: &Path, structure: &str, field: &str, version: &str) -> Result<u64> {
    let reader = File::open(file)
        .with_context(|| format!("Failed to open offsets file {}", file.display()))?;
    let store = OffsetStore::from_reader(BufReader::new(reader))
        .with_context(|| format!("Failed to parse offsets file {}", file.display()))?;

    match store.lookup(structure, field, version) {
        Some(offset) => Ok(offset),
        None => bail!("No offset known for {}.{} at version {}", structure, field, version),
    }
}
