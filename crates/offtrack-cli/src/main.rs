mod cli;
mod commands;
mod supplier;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use commands::collect::CollectOptions;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("offtrack=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Collect {
            input,
            output,
            cache,
            policy,
            go,
            toolchain_cache,
        } => commands::collect::run(CollectOptions {
            input,
            output,
            cache,
            policy,
            go,
            toolchain_cache,
        }),
        Command::Lookup {
            file,
            structure,
            field,
            version,
        } => commands::lookup::run(&file, &structure, &field, &version),
    }
}
