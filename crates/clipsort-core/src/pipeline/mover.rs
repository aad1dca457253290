//! Moving categorized images into per-category folders.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use crate::error::PipelineError;
use crate::types::ImageOutcome;

/// A planned or completed move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveRecord {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub category: String,
}

/// Moves files into `<base>/<category>/`.
pub struct FileMover {
    base_dir: PathBuf,
    dry_run: bool,
}

impl FileMover {
    pub fn new(base_dir: impl Into<PathBuf>, dry_run: bool) -> Self {
        Self {
            base_dir: base_dir.into(),
            dry_run,
        }
    }

    /// Move every categorized outcome; skipped outcomes stay in place.
    ///
    /// Categories are processed in sorted order, files in input order. In a
    /// dry run nothing touches the disk and destinations are not
    /// de-conflicted. The first failing mkdir or rename aborts the move.
    pub fn move_all(&self, outcomes: &[ImageOutcome]) -> Result<Vec<MoveRecord>, PipelineError> {
        let mut records = Vec::new();

        for (category, items) in group_by_category(outcomes) {
            let category_dir = self.category_dir(category, items[0])?;

            if !self.dry_run {
                std::fs::create_dir_all(&category_dir).map_err(|e| PipelineError::Move {
                    from: items[0].path.clone(),
                    to: category_dir.clone(),
                    message: format!("cannot create category folder: {e}"),
                })?;
            }

            for item in items {
                let Some(file_name) = item.path.file_name() else {
                    continue;
                };
                let mut destination = category_dir.join(file_name);

                if !self.dry_run {
                    destination = resolve_conflict(&destination);
                    std::fs::rename(&item.path, &destination).map_err(|e| PipelineError::Move {
                        from: item.path.clone(),
                        to: destination.clone(),
                        message: e.to_string(),
                    })?;
                    tracing::debug!("Moved {:?} -> {:?}", item.path, destination);
                }

                records.push(MoveRecord {
                    source: item.path.clone(),
                    destination,
                    category: category.to_string(),
                });
            }
        }

        Ok(records)
    }

    /// Folder for a category; the name must be a single plain path component.
    fn category_dir(&self, category: &str, first: &ImageOutcome) -> Result<PathBuf, PipelineError> {
        let mut components = Path::new(category).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.base_dir.join(category)),
            _ => Err(PipelineError::Move {
                from: first.path.clone(),
                to: self.base_dir.join(category),
                message: format!("category {category:?} is not a plain folder name"),
            }),
        }
    }
}

/// Categorized outcomes grouped by category, in sorted category order.
pub fn group_by_category(outcomes: &[ImageOutcome]) -> BTreeMap<&str, Vec<&ImageOutcome>> {
    let mut groups: BTreeMap<&str, Vec<&ImageOutcome>> = BTreeMap::new();
    for outcome in outcomes {
        if let Some(category) = outcome.category() {
            groups.entry(category).or_default().push(outcome);
        }
    }
    groups
}

/// First free path among `dest`, `<stem>_1<ext>`, `<stem>_2<ext>`, ...
pub fn resolve_conflict(dest: &Path) -> PathBuf {
    if !dest.exists() {
        return dest.to_path_buf();
    }

    let stem = dest
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = dest
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    (1..)
        .map(|i| dest.with_file_name(format!("{stem}_{i}{ext}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| dest.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::Classification;

    fn categorized(path: &Path, category: &str) -> ImageOutcome {
        ImageOutcome::new(
            path.to_path_buf(),
            Classification::Categorized {
                category: category.to_string(),
                confidence: 0.8,
            },
        )
    }

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, name).unwrap();
        path
    }

    #[test]
    fn test_moves_into_sorted_category_folders() {
        let dir = tempfile::tempdir().unwrap();
        let a = touch(dir.path(), "a.jpg");
        let b = touch(dir.path(), "b.png");
        let c = touch(dir.path(), "c.gif");
        let outcomes = vec![
            categorized(&a, "ocean"),
            ImageOutcome::new(b.clone(), Classification::failed("unreadable")),
            categorized(&c, "desert"),
        ];

        let records = FileMover::new(dir.path(), false).move_all(&outcomes).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].category, "desert");
        assert_eq!(records[0].destination, dir.path().join("desert/c.gif"));
        assert_eq!(records[1].destination, dir.path().join("ocean/a.jpg"));
        assert!(dir.path().join("ocean/a.jpg").exists());
        assert!(!a.exists());
        assert!(b.exists(), "skipped images stay in place");
    }

    #[test]
    fn test_name_conflict_gets_numeric_suffix() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("ocean")).unwrap();
        touch(&dir.path().join("ocean"), "a.jpg");
        touch(&dir.path().join("ocean"), "a_1.jpg");
        let a = touch(dir.path(), "a.jpg");

        let records = FileMover::new(dir.path(), false)
            .move_all(&[categorized(&a, "ocean")])
            .unwrap();
        assert_eq!(records[0].destination, dir.path().join("ocean/a_2.jpg"));
        assert_eq!(std::fs::read_to_string(&records[0].destination).unwrap(), "a.jpg");
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("cat")).unwrap();
        touch(&dir.path().join("cat"), "kitty.jpg");
        let kitty = touch(dir.path(), "kitty.jpg");

        let records = FileMover::new(dir.path(), true)
            .move_all(&[categorized(&kitty, "cat"), categorized(&kitty, "dog")])
            .unwrap();

        assert_eq!(records.len(), 2);
        // No conflict resolution in a dry run.
        assert_eq!(records[0].destination, dir.path().join("cat/kitty.jpg"));
        assert!(kitty.exists());
        assert!(!dir.path().join("dog").exists());
    }

    #[test]
    fn test_resolve_conflict_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        let readme = touch(dir.path(), "README");
        assert_eq!(resolve_conflict(&readme), dir.path().join("README_1"));
        assert_eq!(
            resolve_conflict(&dir.path().join("free.png")),
            dir.path().join("free.png")
        );
    }

    #[test]
    fn test_resolve_conflict_keeps_inner_dots() {
        let dir = tempfile::tempdir().unwrap();
        let archive = touch(dir.path(), "photo.tar.gz");
        assert_eq!(resolve_conflict(&archive), dir.path().join("photo.tar_1.gz"));
    }

    #[test]
    fn test_category_with_path_separator_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let a = touch(dir.path(), "a.jpg");
        for bad in ["../escape", "..", "nested/dir"] {
            let err = FileMover::new(dir.path(), false)
                .move_all(&[categorized(&a, bad)])
                .unwrap_err();
            assert!(err.to_string().contains("plain folder name"), "{bad}");
        }
        assert!(a.exists());
    }

    #[test]
    fn test_group_by_category_keeps_input_order() {
        let outcomes = vec![
            categorized(Path::new("2.jpg"), "cat"),
            categorized(Path::new("1.jpg"), "cat"),
            categorized(Path::new("3.jpg"), "bird"),
        ];
        let groups = group_by_category(&outcomes);
        let keys: Vec<_> = groups.keys().copied().collect();
        assert_eq!(keys, vec!["bird", "cat"]);
        assert_eq!(groups["cat"][0].path, PathBuf::from("2.jpg"));
    }
}
