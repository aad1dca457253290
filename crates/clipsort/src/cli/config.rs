//! The `clipsort config` command for configuration management.

use std::path::Path;

use clap::{Args, Subcommand};
use clipsort_core::Config;

/// Arguments for the `config` command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Subcommands for configuration management.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,

    /// Show config and category file paths
    Path,

    /// Write a default config file and a category list template
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

const CATEGORIES_TEMPLATE: &str = "\
# One category per line. Lines starting with # are ignored.
# When this file lists at least one category it replaces the built-in list;
# --categories on the command line overrides both.
";

/// Execute the config command.
pub async fn execute(args: ConfigArgs) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => {
            let config = Config::load()?;
            println!("{}", config.to_toml()?);
        }

        ConfigCommand::Path => {
            let config = Config::load().unwrap_or_default();
            println!("config:     {}", Config::default_path().display());
            println!("categories: {}", config.categories_file().display());
            println!("models:     {}", config.model_dir().display());
        }

        ConfigCommand::Init { force } => {
            let path = Config::default_path();
            let config = Config::default();
            write_config(&path, &config, force)?;
            println!("Configuration initialized at: {}", path.display());

            let categories = config.categories_file();
            if write_categories_template(&categories)? {
                println!("Category list template created at: {}", categories.display());
            }
        }
    }

    Ok(())
}

fn write_config(path: &Path, config: &Config, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists at: {}\nUse --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, config.to_toml()?)?;
    tracing::info!("Config file created at: {}", path.display());
    Ok(())
}

/// Create the category list template unless a list already exists.
fn write_categories_template(path: &Path) -> anyhow::Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, CATEGORIES_TEMPLATE)?;
    Ok(true)
}
