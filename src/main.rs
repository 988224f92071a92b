use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use rentmap::cli::{Cli, Commands};
use rentmap::commands::{aggregate, inspect};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match &cli.command {
        Commands::Inspect(args) => inspect::run(&cli, args),
        Commands::Aggregate(args) => aggregate::run(&cli, args),
    }
}

/// `RUST_LOG` wins; otherwise the level follows the -v count.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
