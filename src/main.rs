use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod app;
mod loader;
mod report;

use app::{App, ChainSource};

/// chainedgraphs - run chains of dependent graphs level by level
#[derive(Parser)]
#[command(name = "chainedgraphs")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Enable verbose logging
  #[arg(long)]
  verbose: bool,

  /// Path to a chain definition (JSON). Runs the bundled demo chain when omitted.
  chain_file: Option<PathBuf>,
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "info" };
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
    )
    .with_target(false)
    .with_writer(std::io::stderr)
    .init();

  let source = match cli.chain_file {
    Some(path) => ChainSource::File(path),
    None => ChainSource::Demo,
  };

  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async { App::new(cli.verbose).run(source).await })
}
