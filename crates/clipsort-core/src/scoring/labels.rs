//! Label sets and their tokenized prompts.

use ndarray::Array2;

use crate::error::{ModelError, PipelineError};
use crate::tokenizer::{ClipTokenizer, CONTEXT_LENGTH};

/// Reserved label for "no real category fits".
pub const BASELINE_LABEL: &str = "uncategorized";

/// Generic prompt the baseline label is scored with.
pub const BASELINE_PROMPT: &str = "a photo";

/// Baseline label followed by the caller's categories, in caller order.
///
/// A caller category spelled like [`BASELINE_LABEL`] is kept as a separate
/// entry; entries are identified by position, not by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
    labels: Vec<String>,
}

impl LabelSet {
    pub fn new<S: AsRef<str>>(categories: &[S]) -> Result<Self, PipelineError> {
        if categories.is_empty() {
            return Err(PipelineError::NoCategories);
        }

        let mut labels = Vec::with_capacity(categories.len() + 1);
        labels.push(BASELINE_LABEL.to_string());
        for category in categories {
            let category = category.as_ref();
            if category == BASELINE_LABEL {
                tracing::warn!(
                    "Category {:?} collides with the baseline label; both are scored",
                    category
                );
            }
            labels.push(category.to_string());
        }

        Ok(Self { labels })
    }

    /// All labels, baseline first.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// The caller's categories without the baseline.
    pub fn categories(&self) -> &[String] {
        &self.labels[1..]
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Token ids and attention mask for every label, one row per label.
#[derive(Debug, Clone)]
pub struct PromptBatch {
    input_ids: Array2<i64>,
    attention_mask: Array2<i64>,
}

impl PromptBatch {
    /// Encode the baseline prompt and `"a photo of {category}"` per category.
    pub fn encode(tokenizer: &ClipTokenizer, labels: &LabelSet) -> Result<Self, ModelError> {
        let mut flat = Vec::with_capacity(labels.len() * CONTEXT_LENGTH);
        flat.extend_from_slice(tokenizer.encode(BASELINE_PROMPT).ids());
        flat.extend(tokenizer.encode_categories(labels.categories()));

        let input_ids = Array2::from_shape_vec((labels.len(), CONTEXT_LENGTH), flat).map_err(
            |e| ModelError::Tensor {
                name: "input_ids",
                message: e.to_string(),
            },
        )?;
        let attention_mask = input_ids.mapv(|id| i64::from(id != 0));

        Ok(Self {
            input_ids,
            attention_mask,
        })
    }

    pub fn input_ids(&self) -> &Array2<i64> {
        &self.input_ids
    }

    pub fn attention_mask(&self) -> &Array2<i64> {
        &self.attention_mask
    }

    pub fn rows(&self) -> usize {
        self.input_ids.nrows()
    }
}
