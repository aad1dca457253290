//! clipsort CLI - sort a folder of images into category subfolders.
//!
//! Each image is scored with a local CLIP model against a list of category
//! prompts and a generic baseline prompt; images whose best category beats
//! both the baseline and the confidence threshold are moved into a folder
//! named after that category.
//!
//! # Usage
//!
//! ```bash
//! # Fetch the CLIP model files (once)
//! clipsort models download
//!
//! # Preview what would happen
//! clipsort sort ./photos --dry-run
//!
//! # Sort with custom categories and a stricter threshold
//! clipsort sort ./photos --categories "beach,mountain,city" --confidence 0.3
//!
//! # View configuration
//! clipsort config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// clipsort - zero-shot image sorting with a local CLIP model.
#[derive(Parser, Debug)]
#[command(name = "clipsort")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Categorize the images in a directory and move them into subfolders
    Sort(cli::sort::SortArgs),

    /// Manage the CLIP model files (download, list, path)
    Models(cli::models::ModelsArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln.
    let config = match clipsort_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `clipsort config path`."
            );
            clipsort_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("clipsort v{}", clipsort_core::VERSION);

    match cli.command {
        Commands::Sort(args) => cli::sort::execute(args, config).await,
        Commands::Models(args) => cli::models::execute(args, &config).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
