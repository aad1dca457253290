//! Image loading: read, validate, decode and preprocess with a timeout.

use std::io::Cursor;
use std::path::Path;
use std::time::{Duration, Instant};

use image::{DynamicImage, GenericImageView, ImageFormat};
use ndarray::Array4;
use tokio::time::timeout;

use super::validate::Validator;
use crate::clip::preprocess::preprocess;
use crate::config::LimitsConfig;
use crate::error::PipelineError;

/// Turns image files into CLIP pixel tensors under the configured limits.
#[derive(Debug, Clone)]
pub struct ImageDecoder {
    limits: LimitsConfig,
    validator: Validator,
}

/// Result of decoding an image.
pub struct DecodedImage {
    /// The decoded image data
    pub image: DynamicImage,
    /// Format identified from the file's magic bytes
    pub format: ImageFormat,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
}

impl ImageDecoder {
    /// Create a new decoder with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self {
            validator: Validator::new(limits.clone()),
            limits,
        }
    }

    /// Read `path` and produce its `[1, 3, 224, 224]` pixel tensor.
    ///
    /// Size and magic bytes are checked before decoding. Decoding and
    /// preprocessing run on the blocking pool under `decode_timeout_ms`.
    pub async fn load_tensor(&self, path: &Path) -> Result<Array4<f32>, PipelineError> {
        let start = Instant::now();

        let metadata = tokio::fs::metadata(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PipelineError::FileNotFound(path.to_path_buf())
            } else {
                PipelineError::Decode {
                    path: path.to_path_buf(),
                    message: format!("Cannot read metadata: {e}"),
                }
            }
        })?;
        self.validator.check_size(metadata.len(), path)?;

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| PipelineError::Decode {
                path: path.to_path_buf(),
                message: format!("Cannot read file: {e}"),
            })?;
        let format = self.validator.check_header(&bytes, path)?;

        let path_owned = path.to_path_buf();
        let max_dim = self.limits.max_image_dimension;
        let timeout_duration = Duration::from_millis(self.limits.decode_timeout_ms);

        let result = timeout(
            timeout_duration,
            tokio::task::spawn_blocking(move || {
                let decoded = Self::decode_bytes(&bytes, format, &path_owned)?;
                check_dimensions(&decoded, max_dim, &path_owned)?;
                Ok::<_, PipelineError>(preprocess(&decoded.image))
            }),
        )
        .await;

        let tensor = match result {
            Ok(Ok(inner)) => inner?,
            Ok(Err(e)) => {
                return Err(PipelineError::Decode {
                    path: path.to_path_buf(),
                    message: format!("Task join error: {e}"),
                })
            }
            Err(_) => {
                return Err(PipelineError::Timeout {
                    path: path.to_path_buf(),
                    stage: "decode".to_string(),
                    timeout_ms: self.limits.decode_timeout_ms,
                })
            }
        };

        tracing::trace!("Prepared {:?} in {:?}", path, start.elapsed());
        Ok(tensor)
    }

    /// Decode an in-memory image of a known format (blocking).
    pub fn decode_bytes(
        bytes: &[u8],
        format: ImageFormat,
        path: &Path,
    ) -> Result<DecodedImage, PipelineError> {
        let image = image::ImageReader::with_format(Cursor::new(bytes), format)
            .decode()
            .map_err(|e| match e {
                image::ImageError::Unsupported(inner) => PipelineError::UnsupportedFormat {
                    path: path.to_path_buf(),
                    format: inner.to_string(),
                },
                other => PipelineError::Decode {
                    path: path.to_path_buf(),
                    message: other.to_string(),
                },
            })?;

        let (width, height) = image.dimensions();
        Ok(DecodedImage {
            image,
            format,
            width,
            height,
        })
    }
}

fn check_dimensions(decoded: &DecodedImage, max_dim: u32, path: &Path) -> Result<(), PipelineError> {
    if decoded.width == 0 || decoded.height == 0 {
        return Err(PipelineError::Decode {
            path: path.to_path_buf(),
            message: "Image has no pixels".to_string(),
        });
    }
    if decoded.width > max_dim || decoded.height > max_dim {
        return Err(PipelineError::ImageTooLarge {
            path: path.to_path_buf(),
            width: decoded.width,
            height: decoded.height,
            max_dim,
        });
    }
    tracing::trace!(
        "Decoded {:?} as {:?} ({}x{})",
        path,
        decoded.format,
        decoded.width,
        decoded.height
    );
    Ok(())
}
