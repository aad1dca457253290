//! Per-image orchestration of a sorting run.
//!
//! A producer task reads, decodes and preprocesses up to
//! `parallel_workers` images at once and feeds the resulting tensors, in
//! input order, through a bounded channel. The consumer runs exactly one
//! model invocation at a time and applies the decision rule. Failures are
//! isolated per image: they become a skipped outcome and the run goes on.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use futures_util::stream::{self, StreamExt};
use ndarray::Array4;

use super::channel::bounded_channel;
use super::decode::ImageDecoder;
use crate::clip::{ClipClassifier, ClipModel, OnnxClipModel};
use crate::config::{Config, PipelineConfig};
use crate::error::PipelineError;
use crate::scoring::{decide, Classification, LabelSet, PromptBatch};
use crate::types::ImageOutcome;

/// Classifies a list of images into categories.
pub struct Categorizer<M: ClipModel + 'static = OnnxClipModel> {
    classifier: Arc<ClipClassifier<M>>,
    decoder: ImageDecoder,
    pipeline: PipelineConfig,
    parallel_workers: usize,
}

impl<M: ClipModel + 'static> Categorizer<M> {
    pub fn new(classifier: Arc<ClipClassifier<M>>, config: &Config) -> Self {
        Self {
            classifier,
            decoder: ImageDecoder::new(config.limits.clone()),
            pipeline: config.pipeline.clone(),
            parallel_workers: config.processing.parallel_workers.max(1),
        }
    }

    /// Override the number of concurrent preprocessing workers.
    pub fn with_parallel_workers(mut self, workers: usize) -> Self {
        self.parallel_workers = workers.max(1);
        self
    }

    /// Classify every image in `paths`, returning outcomes in input order.
    ///
    /// `progress` is called with `(current, total)` as each image reaches
    /// inference. Fails only when `categories` is empty or the prompts
    /// cannot be tokenized; per-image errors become skipped outcomes.
    pub async fn categorize<S, F>(
        &self,
        paths: &[PathBuf],
        categories: &[S],
        threshold: f64,
        mut progress: F,
    ) -> Result<Vec<ImageOutcome>, PipelineError>
    where
        S: AsRef<str>,
        F: FnMut(usize, usize),
    {
        let labels = LabelSet::new(categories)?;
        let prompts = self
            .classifier
            .prompts(&labels)
            .map_err(|e| PipelineError::Model {
                message: e.to_string(),
            })?;
        let batch = Arc::new((labels, prompts));

        let total = paths.len();
        let (tx, mut rx) = bounded_channel(&self.pipeline);

        let decoder = self.decoder.clone();
        let workers = self.parallel_workers;
        let queue = paths.to_vec();
        let producer = tokio::spawn(async move {
            let mut prepared = stream::iter(queue)
                .map(|path| {
                    let decoder = decoder.clone();
                    async move {
                        let tensor = decoder.load_tensor(&path).await;
                        (path, tensor)
                    }
                })
                .buffered(workers);

            while let Some(item) = prepared.next().await {
                if tx.send(item).await.is_err() {
                    break;
                }
            }
        });

        let mut outcomes = Vec::with_capacity(total);
        while let Some((path, tensor)) = rx.recv().await {
            progress(outcomes.len() + 1, total);
            let classification = match tensor {
                Ok(pixels) => self.classify_one(&path, pixels, &batch, threshold).await,
                Err(e) => Classification::failed(e),
            };
            log_outcome(&path, &classification);
            outcomes.push(ImageOutcome::new(path, classification));
        }

        if let Err(e) = producer.await {
            tracing::error!("Preprocessing task failed: {e}");
            for path in &paths[outcomes.len()..] {
                let classification = Classification::failed(format!("preprocessing aborted: {e}"));
                outcomes.push(ImageOutcome::new(path.clone(), classification));
            }
        }

        Ok(outcomes)
    }

    async fn classify_one(
        &self,
        path: &Path,
        pixels: Array4<f32>,
        batch: &Arc<(LabelSet, PromptBatch)>,
        threshold: f64,
    ) -> Classification {
        let classifier = Arc::clone(&self.classifier);
        let batch = Arc::clone(batch);
        let start = Instant::now();

        let scored = tokio::task::spawn_blocking(move || {
            let (labels, prompts) = &*batch;
            classifier.score(&pixels, labels, prompts)
        })
        .await;

        match scored {
            Ok(Ok(scores)) => {
                tracing::trace!("Scored {:?} in {:?}", path, start.elapsed());
                decide(&scores, threshold)
            }
            Ok(Err(e)) => Classification::failed(PipelineError::Inference {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(e) => Classification::failed(PipelineError::Inference {
                path: path.to_path_buf(),
                message: format!("Task join error: {e}"),
            }),
        }
    }
}

fn log_outcome(path: &Path, classification: &Classification) {
    match classification {
        Classification::Categorized {
            category,
            confidence,
        } => tracing::debug!(
            "{:?} -> {} ({:.1}%)",
            path,
            category,
            confidence * 100.0
        ),
        Classification::Skipped { reason } => tracing::warn!("Skipping {:?} ({})", path, reason),
    }
}
