//! CLIP ONNX session management and inference.
//!
//! Loads a joint text+vision CLIP export and runs it on one image against a
//! batch of tokenized prompts, producing one similarity logit per prompt.

use std::path::Path;
use std::sync::Mutex;

use ndarray::{Array2, Array4};
use ort::session::Session;
use ort::value::{Tensor, Value};

use super::ClipModel;
use crate::error::{ModelError, PipelineError};

/// Token id input, `[labels, 77]` i64.
pub const INPUT_IDS: &str = "input_ids";
/// Image input, `[1, 3, 224, 224]` f32.
pub const PIXEL_VALUES: &str = "pixel_values";
/// Attention mask input, same shape as [`INPUT_IDS`].
pub const ATTENTION_MASK: &str = "attention_mask";
/// Output holding `[1, labels]` image-to-text logits.
pub const LOGITS_PER_IMAGE: &str = "logits_per_image";

/// Wraps an ONNX Runtime session for the CLIP model.
///
/// Uses a `Mutex` because `Session::run` requires `&mut self`; this also
/// keeps at most one inference in flight per session.
pub struct OnnxClipModel {
    session: Mutex<Session>,
}

impl OnnxClipModel {
    /// Load a CLIP model from an ONNX file.
    pub fn load(model_path: &Path) -> Result<Self, PipelineError> {
        let session = Session::builder()
            .map_err(|e| PipelineError::Model {
                message: format!("Failed to create ONNX session builder: {e}"),
            })?
            .commit_from_file(model_path)
            .map_err(|e| PipelineError::Model {
                message: format!("Failed to load ONNX model {}: {e}", model_path.display()),
            })?;

        tracing::debug!(
            "Loaded CLIP model from {:?} (inputs: {:?}, outputs: {:?})",
            model_path,
            session.inputs().iter().map(|i| i.name()).collect::<Vec<_>>(),
            session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>()
        );

        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

fn i64_tensor(name: &'static str, array: &Array2<i64>) -> Result<Tensor<i64>, ModelError> {
    let shape: Vec<i64> = array.shape().iter().map(|&d| d as i64).collect();
    let data: Vec<i64> = array.iter().copied().collect();
    Value::from_array((shape, data)).map_err(|e| ModelError::Tensor {
        name,
        message: e.to_string(),
    })
}

impl ClipModel for OnnxClipModel {
    fn logits_per_image(
        &self,
        input_ids: &Array2<i64>,
        pixel_values: &Array4<f32>,
        attention_mask: &Array2<i64>,
    ) -> Result<Vec<f32>, ModelError> {
        let labels = input_ids.nrows();

        let ids = i64_tensor(INPUT_IDS, input_ids)?;
        let mask = i64_tensor(ATTENTION_MASK, attention_mask)?;

        let shape: Vec<i64> = pixel_values.shape().iter().map(|&d| d as i64).collect();
        let flat: Vec<f32> = pixel_values.iter().copied().collect();
        let pixels = Value::from_array((shape, flat)).map_err(|e| ModelError::Tensor {
            name: PIXEL_VALUES,
            message: e.to_string(),
        })?;

        let inputs = ort::inputs![
            INPUT_IDS => ids,
            PIXEL_VALUES => pixels,
            ATTENTION_MASK => mask,
        ];

        let mut session = self.session.lock().map_err(|_| ModelError::Poisoned)?;
        let outputs = session
            .run(inputs)
            .map_err(|e| ModelError::Run(e.to_string()))?;

        let logits = outputs
            .iter()
            .find(|(name, _)| *name == LOGITS_PER_IMAGE)
            .ok_or_else(|| ModelError::Output(format!("model did not produce {LOGITS_PER_IMAGE}")))?;

        let (shape, data) = logits
            .1
            .try_extract_tensor::<f32>()
            .map_err(|e| ModelError::Output(format!("cannot read {LOGITS_PER_IMAGE}: {e}")))?;

        if shape.len() != 2 || shape[0] != 1 || shape[1] as usize != labels {
            return Err(ModelError::Output(format!(
                "{LOGITS_PER_IMAGE} has shape {:?}, expected [1, {labels}]",
                &shape[..]
            )));
        }

        Ok(data.to_vec())
    }
}
