//! Core data types produced by a sorting run.

use serde::Serialize;
use std::path::PathBuf;

use crate::scoring::Classification;

/// What happened to one input image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageOutcome {
    /// Path of the source file
    pub path: PathBuf,

    /// Accepted category or the reason it was skipped
    #[serde(flatten)]
    pub classification: Classification,
}

impl ImageOutcome {
    pub fn new(path: PathBuf, classification: Classification) -> Self {
        Self {
            path,
            classification,
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.classification.is_skipped()
    }

    pub fn category(&self) -> Option<&str> {
        self.classification.category()
    }
}

/// Counts for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub found: usize,
    pub categorized: usize,
    pub skipped: usize,
}

impl RunStats {
    pub fn from_outcomes(outcomes: &[ImageOutcome]) -> Self {
        let skipped = outcomes.iter().filter(|o| o.is_skipped()).count();
        Self {
            found: outcomes.len(),
            categorized: outcomes.len() - skipped,
            skipped,
        }
    }
}
