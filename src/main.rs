// This is the command-line entry point for the asset optimizer.
// The lib.rs file serves as the public API for build-tool integrations.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use asset_optimizer_lib::{BuildConfig, OptimizerPlugin, PluginOptions};

/// Recompress the images in a build's output directory in place.
#[derive(Debug, Parser)]
#[command(name = "asset-optimizer", version, about)]
struct Cli {
    /// Project root
    #[arg(default_value = ".")]
    root: PathBuf,

    /// Build output directory, relative to the root
    #[arg(long, default_value = "dist")]
    out_dir: PathBuf,

    /// JSON file with plugin options (filter, verbose, per-codec settings)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Do not print the per-file summary
    #[arg(long)]
    quiet: bool,

    /// Maximum number of files processed at once
    #[arg(long)]
    max_concurrency: Option<usize>,

    /// Run the pipeline this many times in one process; later passes only
    /// touch files changed since the previous one
    #[arg(long, default_value_t = 1)]
    passes: usize,
}

fn load_options(cli: &Cli) -> anyhow::Result<PluginOptions> {
    let mut options = match &cli.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str::<PluginOptions>(&raw)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => PluginOptions::default(),
    };

    if cli.quiet {
        options.verbose = false;
    }
    if cli.max_concurrency.is_some() {
        options.max_concurrency = cli.max_concurrency;
    }
    Ok(options)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_file(false)         // Remove file path
        .with_line_number(false)  // Remove line numbers
        .with_thread_ids(false)   // Remove thread IDs
        .with_thread_names(false) // Remove thread names
        .with_target(false)       // Remove module path
        .with_ansi(true)          // Keep colored output
        .with_writer(std::io::stdout)
        .compact();               // Use compact formatter instead of pretty

    subscriber.init();

    let cli = Cli::parse();
    let options = load_options(&cli)?;
    debug!("Resolved options: {:?}", options);

    let build = BuildConfig::new(&cli.root, &cli.out_dir);
    let plugin = OptimizerPlugin::new(options);

    for pass in 1..=cli.passes.max(1) {
        if cli.passes > 1 {
            info!("=== Pass {} ===", pass);
        }
        let mut run = plugin.close_bundle(&build).await;
        // The runtime shuts down when main returns; let the summary land first.
        run.finish_rendering().await;
    }

    Ok(())
}
