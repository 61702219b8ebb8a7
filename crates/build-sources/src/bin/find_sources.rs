//! Writes the build source lists for a tree.
//!
//! Usage: `find-sources [--working-dir DIR] [--out-dir DIR] [--config FILE]`
//!
//! Logging is controlled by `RUST_LOG`, e.g. `RUST_LOG=finder=debug`.

use std::path::PathBuf;
use std::process::ExitCode;

use build_sources::{find_sources, new_source_finder, BuildConfig, SourcesResult};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "find-sources")]
#[command(about = "Find build files in a source tree and write their lists")]
struct Cli {
    /// JSON build config; flags below override its fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Source tree root (default: current directory)
    #[arg(long)]
    working_dir: Option<PathBuf>,

    /// Build output directory (default: $OUT_DIR or `out`)
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

impl Cli {
    fn build_config(&self) -> SourcesResult<BuildConfig> {
        let mut config = match &self.config {
            Some(path) => BuildConfig::load(path)?,
            None => BuildConfig::from_env()?,
        };
        if let Some(working_dir) = &self.working_dir {
            config.working_dir = working_dir.clone();
        }
        if let Some(out_dir) = &self.out_dir {
            config.out_dir = out_dir.clone();
        }
        Ok(config)
    }
}

fn run(cli: &Cli) -> SourcesResult<()> {
    let config = cli.build_config()?;
    let finder = new_source_finder(&config)?;
    let lists = find_sources(&config, &finder)?;
    tracing::info!(
        "{} lists written, {} unchanged",
        lists.written.len(),
        lists.unchanged.len()
    );
    finder.shutdown()?;
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("find-sources: {error}");
            ExitCode::FAILURE
        }
    }
}
