use std::path::PathBuf;

use clap::{Parser, Subcommand};
use offtrack::MissingFieldPolicy;

#[derive(Parser)]
#[command(name = "offtrack")]
#[command(about = "Tracks Go structure field offsets across library versions")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Collect offsets for every library in a manifest and write them to a file
    Collect {
        /// Input JSON file with the required offsets definition
        #[arg(short, long)]
        input: PathBuf,

        /// Output offsets file
        output: PathBuf,

        /// Existing offsets file to reuse (defaults to the output file)
        #[arg(long)]
        cache: Option<PathBuf>,

        /// What to do when a field cannot be found in a binary
        #[arg(long, default_value = "skip-version")]
        policy: MissingFieldPolicy,

        /// Go command used to list versions and build programs
        #[arg(long, env = "OFFTRACK_GO", default_value = "go")]
        go: PathBuf,

        /// Directory where downloaded Go toolchains are kept
        #[arg(long, env = "OFFTRACK_TOOLCHAIN_CACHE")]
        toolchain_cache: Option<PathBuf>,
    },
    /// Look up the offset of a field at a version
    Lookup {
        /// Offsets file
        #[arg(short, long, default_value = "offsets.json")]
        file: PathBuf,

        /// Qualified structure name, e.g. net/http.Request
        structure: String,

        /// Field name
        field: String,

        /// Version label, e.g. v1.16.7
        version: String,
    },
}
