//! The accept/skip decision taken on a [`ScoreMap`].

use std::fmt;

use serde::Serialize;

use super::scorer::{LabelScore, ScoreMap};

/// Result of classifying one image.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Classification {
    /// A real category beat the baseline and the threshold.
    Categorized { category: String, confidence: f32 },
    /// The image stays where it is.
    Skipped { reason: SkipReason },
}

/// Why an image was left uncategorized.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// The generic baseline prompt scored at least as high as every category.
    BaselineWins {
        best_category: Option<String>,
        best_confidence: f32,
        baseline: f32,
    },
    /// The best category scored below the confidence threshold.
    BelowThreshold {
        best_category: String,
        best_confidence: f32,
        threshold: f64,
    },
    /// Reading, decoding or inference failed for this image.
    Failed { message: String },
}

impl Classification {
    pub fn failed(error: impl fmt::Display) -> Self {
        Self::Skipped {
            reason: SkipReason::Failed {
                message: error.to_string(),
            },
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    pub fn category(&self) -> Option<&str> {
        match self {
            Self::Categorized { category, .. } => Some(category),
            Self::Skipped { .. } => None,
        }
    }

    pub fn confidence(&self) -> Option<f32> {
        match self {
            Self::Categorized { confidence, .. } => Some(*confidence),
            Self::Skipped { .. } => None,
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BaselineWins {
                best_category: Some(category),
                best_confidence,
                ..
            } => write!(
                f,
                "no category matched better than baseline; best was {category} at {:.1}%",
                best_confidence * 100.0
            ),
            Self::BaselineWins { .. } => write!(f, "no category matched better than baseline"),
            Self::BelowThreshold {
                best_category,
                best_confidence,
                threshold,
            } => write!(
                f,
                "best match {best_category} at {:.1}% < {:.1}% threshold",
                best_confidence * 100.0,
                threshold * 100.0
            ),
            Self::Failed { message } => f.write_str(message),
        }
    }
}

/// Pick the most probable category, or decide to skip.
///
/// The best category must have strictly the highest probability; among
/// equals the first in caller order wins. The baseline wins ties against
/// the best category. A best probability below `threshold` is skipped.
pub fn decide(scores: &ScoreMap, threshold: f64) -> Classification {
    let mut best: Option<&LabelScore> = None;
    for entry in scores.categories() {
        if best.map_or(true, |b| entry.probability > b.probability) {
            best = Some(entry);
        }
    }

    let baseline = scores.baseline();
    let best_confidence = best.map_or(0.0, |b| b.probability);

    let Some(best) = best.filter(|_| best_confidence > baseline) else {
        return Classification::Skipped {
            reason: SkipReason::BaselineWins {
                best_category: best.map(|b| b.label.clone()),
                best_confidence,
                baseline,
            },
        };
    };

    if f64::from(best.probability) < threshold {
        return Classification::Skipped {
            reason: SkipReason::BelowThreshold {
                best_category: best.label.clone(),
                best_confidence: best.probability,
                threshold,
            },
        };
    }

    Classification::Categorized {
        category: best.label.clone(),
        confidence: best.probability,
    }
}
