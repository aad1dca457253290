//! The `clipsort sort` command: classify a folder and move images into category subfolders.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use clipsort_core::{
    categories, report, Categorizer, ClipClassifier, Config, FileDiscovery, FileMover,
    ModelFiles, OutputFormat, OutputWriter, RunStats,
};

use super::models;

/// Arguments for the `sort` command.
#[derive(Args, Debug)]
pub struct SortArgs {
    /// Directory containing the images to sort
    pub dir: PathBuf,

    /// Show what would be moved without touching any file
    #[arg(long)]
    pub dry_run: bool,

    /// Comma-separated categories (overrides the category file and defaults)
    #[arg(short, long)]
    pub categories: Option<String>,

    /// Minimum probability for the best category (0.0 to 1.0)
    #[arg(long, env = "CLIPSORT_CONFIDENCE")]
    pub confidence: Option<f64>,

    /// Number of images decoded and preprocessed concurrently
    #[arg(short, long)]
    pub parallel: Option<usize>,

    /// Write per-image results to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Result file format: json or jsonl
    #[arg(long, default_value = "jsonl")]
    pub format: String,

    /// Download missing model files before sorting
    #[arg(long)]
    pub download: bool,
}

/// Execute the sort command.
pub async fn execute(args: SortArgs, mut config: Config) -> anyhow::Result<()> {
    let threshold = args
        .confidence
        .unwrap_or(config.classification.confidence);
    validate_threshold(threshold)?;
    config.classification.confidence = threshold;

    let Some(format) = OutputFormat::parse(&args.format) else {
        anyhow::bail!("Unknown output format {:?} (expected json or jsonl)", args.format);
    };
    if let Some(parallel) = args.parallel {
        if parallel == 0 {
            anyhow::bail!("--parallel must be at least 1");
        }
        config.processing.parallel_workers = parallel;
    }

    let category_list = resolve_categories(args.categories.as_deref(), &config.categories_file())?;
    tracing::info!("Using {} categories", category_list.len());

    let discovery = FileDiscovery::new(config.processing.clone());
    let scan = discovery.scan(&args.dir)?;
    tracing::info!(
        "Found {} images in {:?} ({} other files)",
        scan.image_paths.len(),
        args.dir,
        scan.skipped
    );

    let files = ModelFiles::new(config.model_dir());
    if !files.is_complete() {
        if args.download {
            models::ensure_models(&files, &reqwest::Client::new()).await?;
        } else {
            anyhow::bail!(
                "Missing model files in {}: {}\nRun `clipsort models download` first, or pass --download.",
                files.dir().display(),
                files.missing().join(", ")
            );
        }
    }

    let model_dir = files.dir().to_path_buf();
    let classifier = tokio::task::spawn_blocking(move || ClipClassifier::load(&model_dir)).await??;
    let categorizer = Categorizer::new(Arc::new(classifier), &config);

    let pb = create_progress_bar(scan.image_paths.len() as u64);
    let outcomes = categorizer
        .categorize(&scan.image_paths, &category_list, threshold, |current, _total| {
            pb.set_position(current as u64);
        })
        .await;
    pb.finish_and_clear();
    let outcomes = outcomes?;

    let moves = FileMover::new(&args.dir, args.dry_run).move_all(&outcomes)?;

    let stats = RunStats::from_outcomes(&outcomes);
    tracing::info!(
        "Categorized {} of {} images ({} skipped)",
        stats.categorized,
        stats.found,
        stats.skipped
    );

    let mut stdout = std::io::stdout().lock();
    report::write_summary(&mut stdout, &outcomes, &moves, scan.skipped, args.dry_run)?;

    if let Some(path) = &args.output {
        write_results(path, format, &outcomes, &moves)?;
    }

    Ok(())
}

/// `--categories` with no names in it counts as unset.
fn resolve_categories(arg: Option<&str>, file: &Path) -> anyhow::Result<Vec<String>> {
    let cli = arg.map(categories::parse_list).unwrap_or_default();
    if arg.is_some() && cli.is_empty() {
        tracing::warn!("--categories has no category names; using the category file or defaults");
    }
    Ok(categories::resolve(&cli, file)?)
}

fn validate_threshold(threshold: f64) -> anyhow::Result<()> {
    if !(0.0..=1.0).contains(&threshold) {
        anyhow::bail!("--confidence must be between 0.0 and 1.0, got {threshold}");
    }
    Ok(())
}

fn write_results(
    path: &Path,
    format: OutputFormat,
    outcomes: &[clipsort_core::ImageOutcome],
    moves: &[clipsort_core::MoveRecord],
) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)?;
    let mut writer = OutputWriter::new(std::io::BufWriter::new(file), format);
    let count = writer.write_run(outcomes, moves)?;
    tracing::info!("Wrote {count} results to {:?}", path);
    Ok(())
}

/// Create a progress bar for the categorizing pass.
fn create_progress_bar(total: u64) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );
    pb.set_message("categorizing");
    pb
}
