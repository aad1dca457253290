//! File discovery for finding images in a directory.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::ProcessingConfig;
use crate::error::PipelineError;

/// Discovers image files directly inside a directory.
pub struct FileDiscovery {
    config: ProcessingConfig,
}

/// Outcome of scanning a directory.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    /// Image files, sorted by path
    pub image_paths: Vec<PathBuf>,
    /// Regular files that were not images
    pub skipped: usize,
}

impl FileDiscovery {
    /// Create a new file discovery instance.
    pub fn new(config: ProcessingConfig) -> Self {
        Self { config }
    }

    /// List the images directly inside `dir` (subdirectories are not entered).
    ///
    /// Hidden entries and directories are ignored; other files without a
    /// supported extension are counted as skipped. Finding no image at all
    /// is an error.
    pub fn scan(&self, dir: &Path) -> Result<ScanResult, PipelineError> {
        let scan_error = |message: String| PipelineError::Scan {
            path: dir.to_path_buf(),
            message,
        };

        let meta = std::fs::metadata(dir)
            .map_err(|e| scan_error(format!("cannot access directory: {e}")))?;
        if !meta.is_dir() {
            return Err(scan_error("not a directory".to_string()));
        }

        let mut result = ScanResult::default();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| scan_error(format!("cannot read directory: {e}")))?;
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            if entry.file_type().is_dir() || hidden {
                continue;
            }

            if self.is_supported(entry.path()) {
                result.image_paths.push(entry.into_path());
            } else {
                result.skipped += 1;
            }
        }

        if result.image_paths.is_empty() {
            return Err(scan_error("no image files found".to_string()));
        }

        tracing::debug!(
            "Found {} images in {:?} ({} other files)",
            result.image_paths.len(),
            dir,
            result.skipped
        );
        Ok(result)
    }

    /// Check if a file has a supported extension.
    fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext_lower = ext.to_lowercase();
                self.config
                    .supported_formats
                    .iter()
                    .any(|fmt| fmt.to_lowercase() == ext_lower)
            })
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn discovery() -> FileDiscovery {
        FileDiscovery::new(ProcessingConfig::default())
    }

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"x").unwrap();
    }

    #[test]
    fn test_is_supported() {
        let discovery = discovery();

        assert!(discovery.is_supported(Path::new("test.jpg")));
        assert!(discovery.is_supported(Path::new("test.JPG")));
        assert!(discovery.is_supported(Path::new("test.jpeg")));
        assert!(discovery.is_supported(Path::new("test.gif")));
        assert!(discovery.is_supported(Path::new("test.bmp")));
        assert!(discovery.is_supported(Path::new("test.TIF")));
        assert!(discovery.is_supported(Path::new("test.webp")));
        assert!(!discovery.is_supported(Path::new("test.heic")));
        assert!(!discovery.is_supported(Path::new("test.txt")));
        assert!(!discovery.is_supported(Path::new("jpg")));
    }

    #[test]
    fn test_scan_is_flat_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "b.png");
        touch(dir.path(), "a.JPG");
        touch(dir.path(), "notes.txt");
        touch(dir.path(), ".hidden.png");
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        touch(&dir.path().join("nested"), "deep.png");

        let result = discovery().scan(dir.path()).unwrap();
        let names: Vec<_> = result
            .image_paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.JPG", "b.png"]);
        assert_eq!(result.skipped, 1);
    }

    #[test]
    fn test_scan_without_images_fails() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "readme.md");
        let err = discovery().scan(dir.path()).unwrap_err();
        assert!(err.to_string().contains("no image files found"));
    }

    #[test]
    fn test_scan_rejects_files_and_missing_dirs() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.png");

        let err = discovery().scan(&dir.path().join("a.png")).unwrap_err();
        assert!(err.to_string().contains("not a directory"));

        let err = discovery().scan(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, PipelineError::Scan { .. }));
    }
}
