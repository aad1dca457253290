//! CLIP zero-shot classification.
//!
//! Ties the tokenizer, the image preprocessor and a model capability
//! together. The model is abstracted behind [`ClipModel`] so the scoring
//! policy can run against ONNX Runtime or any other backend honoring the
//! same tensor contract.
//!
//! # Usage
//!
//! ```rust,ignore
//! use clipsort_core::clip::ClipClassifier;
//!
//! let classifier = ClipClassifier::load(&config.model_dir())?;
//! let pixels = clipsort_core::clip::preprocess::preprocess(&image);
//! let scores = classifier.classify(&pixels, &["ocean", "desert"])?;
//! ```

pub mod files;
pub mod preprocess;
pub mod session;

use std::path::Path;

use ndarray::{Array2, Array4};

use crate::error::{ModelError, PipelineError, Result};
use crate::scoring::{self, LabelSet, PromptBatch, ScoreMap};
use crate::tokenizer::ClipTokenizer;

pub use files::ModelFiles;
pub use session::OnnxClipModel;

/// The opaque image/text similarity capability.
///
/// Implementations receive `[labels, 77]` token ids, a `[1, 3, 224, 224]`
/// pixel tensor and a `[labels, 77]` attention mask, and return one logit
/// per label row for the single image.
pub trait ClipModel: Send + Sync {
    fn logits_per_image(
        &self,
        input_ids: &Array2<i64>,
        pixel_values: &Array4<f32>,
        attention_mask: &Array2<i64>,
    ) -> std::result::Result<Vec<f32>, ModelError>;
}

/// A tokenizer paired with a model capability.
pub struct ClipClassifier<M = OnnxClipModel> {
    tokenizer: ClipTokenizer,
    model: M,
}

impl ClipClassifier<OnnxClipModel> {
    /// Load the tokenizer tables and the ONNX model from `model_dir`.
    ///
    /// Fails before any image is touched if a file is missing or corrupt.
    pub fn load(model_dir: &Path) -> Result<Self> {
        let files = ModelFiles::new(model_dir);
        let missing = files.missing();
        if !missing.is_empty() {
            return Err(PipelineError::Model {
                message: format!(
                    "Missing model files in {}: {}. Run `clipsort models download` first.",
                    model_dir.display(),
                    missing.join(", ")
                ),
            }
            .into());
        }

        let tokenizer = ClipTokenizer::load(&files.vocab(), &files.merges())?;
        tracing::info!("Loading CLIP model from {:?}", files.model());
        let model = OnnxClipModel::load(&files.model())?;
        tracing::info!("CLIP model loaded successfully");

        Ok(Self::new(tokenizer, model))
    }
}

impl<M: ClipModel> ClipClassifier<M> {
    pub fn new(tokenizer: ClipTokenizer, model: M) -> Self {
        Self { tokenizer, model }
    }

    pub fn tokenizer(&self) -> &ClipTokenizer {
        &self.tokenizer
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Tokenize the prompts for a label set.
    pub fn prompts(&self, labels: &LabelSet) -> std::result::Result<PromptBatch, ModelError> {
        PromptBatch::encode(&self.tokenizer, labels)
    }

    /// Score one image against pre-tokenized prompts.
    pub fn score(
        &self,
        pixel_values: &Array4<f32>,
        labels: &LabelSet,
        prompts: &PromptBatch,
    ) -> std::result::Result<ScoreMap, ModelError> {
        scoring::classify(&self.model, labels, prompts, pixel_values)
    }

    /// Score one image against `categories` plus the baseline label.
    ///
    /// Tokenizes the prompts on every call; use [`Self::prompts`] and
    /// [`Self::score`] to reuse them across images.
    pub fn classify<S: AsRef<str>>(
        &self,
        pixel_values: &Array4<f32>,
        categories: &[S],
    ) -> std::result::Result<ScoreMap, PipelineError> {
        let labels = LabelSet::new(categories)?;
        let model = |e: ModelError| PipelineError::Model {
            message: e.to_string(),
        };
        let prompts = self.prompts(&labels).map_err(model)?;
        self.score(pixel_values, &labels, &prompts).map_err(model)
    }
}
