//! clipsort core - zero-shot image categorization with a local CLIP model.
//!
//! Images are scored against a list of category prompts plus a generic
//! baseline prompt, and moved into a folder named after the winning
//! category when it beats both the baseline and a confidence threshold.
//!
//! # Architecture
//!
//! ```text
//! Scan → Validate → Decode → Preprocess (224×224, CLIP norm) ─┐
//!                                                              ├→ CLIP → Softmax → Decide → Move
//! Categories → "a photo of {category}" → BPE tokenize ────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use clipsort_core::{Categorizer, ClipClassifier, Config, FileDiscovery};
//!
//! #[tokio::main]
//! async fn main() -> clipsort_core::Result<()> {
//!     let config = Config::load()?;
//!     let scan = FileDiscovery::new(config.processing.clone()).scan("./photos".as_ref())?;
//!     let classifier = Arc::new(ClipClassifier::load(&config.model_dir())?);
//!
//!     let outcomes = Categorizer::new(classifier, &config)
//!         .categorize(&scan.image_paths, &["ocean", "desert"], 0.15, |_, _| {})
//!         .await?;
//!     for outcome in &outcomes {
//!         println!("{:?}: {:?}", outcome.path, outcome.category());
//!     }
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod categories;
pub mod clip;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod report;
pub mod scoring;
pub mod tokenizer;
pub mod types;

// Re-exports for convenient access
pub use clip::{ClipClassifier, ClipModel, ModelFiles, OnnxClipModel};
pub use config::Config;
pub use error::{
    ConfigError, ModelError, PipelineError, Result, SortError, TokenizerError,
};
pub use output::{OutputFormat, OutputWriter};
pub use pipeline::{Categorizer, FileDiscovery, FileMover, MoveRecord, ScanResult};
pub use scoring::{Classification, ScoreMap, SkipReason};
pub use tokenizer::{ClipTokenizer, TokenSequence};
pub use types::{ImageOutcome, RunStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
