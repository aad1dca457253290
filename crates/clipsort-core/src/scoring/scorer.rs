//! Softmax scoring of model logits into per-label probabilities.

use ndarray::Array4;
use serde::Serialize;

use super::labels::{LabelSet, PromptBatch};
use crate::clip::ClipModel;
use crate::error::ModelError;

/// Probability assigned to one label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelScore {
    pub label: String,
    pub probability: f32,
}

/// Per-label probabilities in label-set order, baseline first.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ScoreMap {
    entries: Vec<LabelScore>,
}

impl ScoreMap {
    /// Pair each label with the softmax of its logit.
    pub fn from_logits(labels: &LabelSet, logits: &[f32]) -> Result<Self, ModelError> {
        if logits.len() != labels.len() {
            return Err(ModelError::Output(format!(
                "expected {} logits, got {}",
                labels.len(),
                logits.len()
            )));
        }

        let entries = labels
            .labels()
            .iter()
            .zip(softmax(logits))
            .map(|(label, probability)| LabelScore {
                label: label.clone(),
                probability,
            })
            .collect();
        Ok(Self { entries })
    }

    /// Probability of the first entry named `label`.
    pub fn get(&self, label: &str) -> Option<f32> {
        self.entries
            .iter()
            .find(|e| e.label == label)
            .map(|e| e.probability)
    }

    /// Probability of the baseline entry.
    pub fn baseline(&self) -> f32 {
        self.entries.first().map_or(0.0, |e| e.probability)
    }

    /// Category entries in caller order, baseline excluded.
    pub fn categories(&self) -> &[LabelScore] {
        self.entries.get(1..).unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LabelScore> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all probabilities (1.0 up to rounding).
    pub fn total(&self) -> f32 {
        self.entries.iter().map(|e| e.probability).sum()
    }
}

/// Numerically stable softmax.
///
/// The max logit is subtracted before exponentiating; exponentials are
/// computed in f64 and accumulated in f32.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let Some(max) = logits.iter().copied().reduce(f32::max) else {
        return Vec::new();
    };

    let exps: Vec<f32> = logits
        .iter()
        .map(|&v| f64::from(v - max).exp() as f32)
        .collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Run the model on one image and turn its logits into a [`ScoreMap`].
pub fn classify<M: ClipModel + ?Sized>(
    model: &M,
    labels: &LabelSet,
    prompts: &PromptBatch,
    pixel_values: &Array4<f32>,
) -> Result<ScoreMap, ModelError> {
    let logits =
        model.logits_per_image(prompts.input_ids(), pixel_values, prompts.attention_mask())?;
    ScoreMap::from_logits(labels, &logits)
}
