//! The `clipsort models` command for managing the CLIP model files.

use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use clipsort_core::clip::files::{RemoteFile, REQUIRED_FILES};
use clipsort_core::{Config, ModelFiles};

/// Arguments for the `models` command.
#[derive(Args, Debug)]
pub struct ModelsArgs {
    #[command(subcommand)]
    pub command: ModelsCommand,
}

/// Subcommands for model management.
#[derive(Subcommand, Debug)]
pub enum ModelsCommand {
    /// Download the CLIP ViT-B/32 model, vocabulary and merge table
    Download,

    /// Show which model files are installed
    List,

    /// Show model directory path
    Path,
}

/// Execute the models command.
pub async fn execute(args: ModelsArgs, config: &Config) -> anyhow::Result<()> {
    let files = ModelFiles::new(config.model_dir());

    match args.command {
        ModelsCommand::Download => {
            let client = reqwest::Client::new();
            ensure_models(&files, &client).await?;
            tracing::info!("All downloads complete.");
        }

        ModelsCommand::List => {
            println!("Model directory: {}\n", files.dir().display());
            for (name, installed) in status(&files) {
                let status = if installed { "ready" } else { "not installed" };
                println!("  - {name:14} {status}");
            }
            if !files.is_complete() {
                println!("\nRun `clipsort models download` to fetch missing files.");
            }
        }

        ModelsCommand::Path => {
            println!("{}", files.dir().display());
        }
    }

    Ok(())
}

/// Install state of every required file.
pub fn status(files: &ModelFiles) -> Vec<(&'static str, bool)> {
    let missing = files.missing();
    REQUIRED_FILES
        .iter()
        .map(|f| (f.name, !missing.contains(&f.name)))
        .collect()
}

/// Download every required file that is not on disk yet.
pub async fn ensure_models(files: &ModelFiles, client: &reqwest::Client) -> anyhow::Result<()> {
    std::fs::create_dir_all(files.dir())?;

    for remote in &REQUIRED_FILES {
        let dest = files.path(remote);
        if dest.is_file() {
            tracing::info!("{} already exists at {:?}", remote.name, dest);
            continue;
        }

        tracing::info!("Downloading {}...", remote.name);
        tracing::info!("  Source: {}", remote.url());
        tracing::info!("  Destination: {:?}", dest);

        download_file(client, remote, &dest).await?;

        let file_size = std::fs::metadata(&dest)?.len();
        tracing::info!(
            "  {} complete ({:.1} MB)",
            remote.name,
            file_size as f64 / (1024.0 * 1024.0)
        );
    }

    Ok(())
}

/// Sibling path a download streams into before being renamed into place.
fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    dest.with_file_name(name)
}

/// Stream a file to `<dest>.tmp`, then rename it to `dest`.
///
/// The partial file is removed on any failure so the next run starts over.
async fn download_file(
    client: &reqwest::Client,
    remote: &RemoteFile,
    dest: &Path,
) -> anyhow::Result<()> {
    let tmp = partial_path(dest);
    let result = stream_to(client, &remote.url(), &tmp, remote.name).await;

    match result {
        Ok(()) => {
            tokio::fs::rename(&tmp, dest).await?;
            Ok(())
        }
        Err(e) => {
            let _ = tokio::fs::remove_file(&tmp).await;
            Err(e.context(format!("failed to download {}", remote.name)))
        }
    }
}

async fn stream_to(
    client: &reqwest::Client,
    url: &str,
    path: &Path,
    label: &str,
) -> anyhow::Result<()> {
    use futures_util::StreamExt;
    use tokio::io::AsyncWriteExt;

    let response = client
        .get(url)
        .send()
        .await?
        .error_for_status()
        .map_err(|e| anyhow::anyhow!("Download failed: {e}"))?;

    let progress = download_bar(response.content_length(), label);
    let mut file = tokio::fs::File::create(path).await?;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        progress.inc(chunk.len() as u64);
    }

    file.flush().await?;
    progress.finish_and_clear();
    Ok(())
}

fn download_bar(total: Option<u64>, label: &str) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = match total {
        Some(len) => ProgressBar::new(len),
        None => ProgressBar::new_spinner(),
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg:14} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );
    pb.set_message(label.to_string());
    pb
}
