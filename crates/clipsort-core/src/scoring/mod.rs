//! Zero-shot scoring of an image against a list of categories.
//!
//! Every run scores the caller's categories together with a generic
//! baseline prompt ("a photo"). Logits from the model are softmaxed into
//! a [`ScoreMap`]; [`decide`] accepts the best category only if it beats
//! both the baseline and the confidence threshold.

pub mod decision;
pub mod labels;
pub mod scorer;

pub use decision::{decide, Classification, SkipReason};
pub use labels::{LabelSet, PromptBatch, BASELINE_LABEL, BASELINE_PROMPT};
pub use scorer::{classify, softmax, LabelScore, ScoreMap};
