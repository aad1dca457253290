//! Error types for the clipsort classification pipeline.
//!
//! Errors are organized by stage. Load-time errors (tokenizer tables, model
//! files, configuration) are fatal; per-image errors are turned into a
//! skipped outcome by the categorizer and never abort a run.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for clipsort operations.
#[derive(Error, Debug)]
pub enum SortError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Tokenizer tables could not be loaded
    #[error("Tokenizer error: {0}")]
    Tokenizer(#[from] TokenizerError),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// The custom category list exists but cannot be read
    #[error("Cannot read categories file {path}: {source}")]
    CategoriesFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while building the BPE tokenizer.
#[derive(Error, Debug)]
pub enum TokenizerError {
    /// The vocabulary table is missing, malformed, or inconsistent
    #[error("Cannot load vocabulary {path}: {message}")]
    Vocabulary { path: PathBuf, message: String },

    /// The merge-rank table is missing or unreadable
    #[error("Cannot load merge table {path}: {message}")]
    Merges { path: PathBuf, message: String },
}

/// Failures of the opaque CLIP model capability.
#[derive(Error, Debug)]
pub enum ModelError {
    /// An input tensor could not be built
    #[error("Failed to create {name} tensor: {message}")]
    Tensor { name: &'static str, message: String },

    /// The inference engine rejected the run
    #[error("Inference failed: {0}")]
    Run(String),

    /// The expected output was missing or had the wrong shape
    #[error("Unexpected model output: {0}")]
    Output(String),

    /// A previous inference panicked while holding the session
    #[error("Model session lock poisoned")]
    Poisoned,
}

/// Pipeline processing errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Image decoding failed
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// Model invocation failed for an image
    #[error("Inference failed for {path}: {message}")]
    Inference { path: PathBuf, message: String },

    /// Model files are missing, the session could not be created, or a
    /// model call outside any image run failed
    #[error("Model error: {message}")]
    Model { message: String },

    /// The caller supplied no categories to classify into
    #[error("No categories provided")]
    NoCategories,

    /// Operation timed out
    #[error("Timeout in {stage} stage for {path} after {timeout_ms}ms")]
    Timeout {
        path: PathBuf,
        stage: String,
        timeout_ms: u64,
    },

    /// File exceeds size limit
    #[error("File too large: {path} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        path: PathBuf,
        size_mb: u64,
        max_mb: u64,
    },

    /// Image dimensions exceed limit
    #[error("Image too large: {path} ({width}x{height} > {max_dim})")]
    ImageTooLarge {
        path: PathBuf,
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// Unsupported image format
    #[error("Unsupported format for {path}: {format}")]
    UnsupportedFormat { path: PathBuf, format: String },

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Input directory could not be scanned
    #[error("Cannot scan {path}: {message}")]
    Scan { path: PathBuf, message: String },

    /// A file could not be moved into its category folder
    #[error("Cannot move {from} to {to}: {message}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        message: String,
    },
}

/// Convenience type alias for clipsort results.
pub type Result<T> = std::result::Result<T, SortError>;
