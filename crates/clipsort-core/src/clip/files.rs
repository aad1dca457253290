//! On-disk layout of the CLIP model directory.

use std::path::{Path, PathBuf};

/// Hugging Face repository the model files are fetched from.
pub const HF_BASE_URL: &str = "https://huggingface.co/Xenova/clip-vit-base-patch32/resolve/main";

pub const MODEL_FILENAME: &str = "model.onnx";
pub const VOCAB_FILENAME: &str = "vocab.json";
pub const MERGES_FILENAME: &str = "merges.txt";

/// A file required for inference and where to download it from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteFile {
    pub name: &'static str,
    /// Path below [`HF_BASE_URL`].
    pub remote_path: &'static str,
}

impl RemoteFile {
    pub fn url(&self) -> String {
        format!("{HF_BASE_URL}/{}", self.remote_path)
    }
}

/// Every file needed for CLIP inference.
pub const REQUIRED_FILES: [RemoteFile; 3] = [
    RemoteFile {
        name: MODEL_FILENAME,
        remote_path: "onnx/model.onnx",
    },
    RemoteFile {
        name: VOCAB_FILENAME,
        remote_path: "vocab.json",
    },
    RemoteFile {
        name: MERGES_FILENAME,
        remote_path: "merges.txt",
    },
];

/// Paths of the model files inside a model directory.
#[derive(Debug, Clone)]
pub struct ModelFiles {
    dir: PathBuf,
}

impl ModelFiles {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn model(&self) -> PathBuf {
        self.dir.join(MODEL_FILENAME)
    }

    pub fn vocab(&self) -> PathBuf {
        self.dir.join(VOCAB_FILENAME)
    }

    pub fn merges(&self) -> PathBuf {
        self.dir.join(MERGES_FILENAME)
    }

    /// Path of a required file.
    pub fn path(&self, file: &RemoteFile) -> PathBuf {
        self.dir.join(file.name)
    }

    /// Names of required files that are not present.
    pub fn missing(&self) -> Vec<&'static str> {
        REQUIRED_FILES
            .iter()
            .filter(|f| !self.path(f).is_file())
            .map(|f| f.name)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }
}
