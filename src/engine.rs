//! The bulk reorganize engine.
//!
//! A run walks a snapshot of entries in order, copies every regular file
//! into `destination_root/<sub-folder>/<name>`, and reports one
//! [`ProgressEvent`] per file. Existing destinations are skipped silently.
//! Cancellation is checked between files only; the first filesystem error
//! aborts the run.

use crate::classifier::Classifier;
use crate::file_organizer::{
    FsPrimitive, OrganizeError, StdFs, destination_path, should_skip,
};
use crate::snapshot::FileEntry;
use log::{debug, info, warn};
use serde::{Serialize, Serializer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Reported after each file a run has processed (copied or skipped).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    /// 1-based position of the file among the files of the run.
    pub index: usize,
    pub total: usize,
    pub current_name: String,
}

/// How a run ended.
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed {
        processed: usize,
    },
    Cancelled {
        processed: usize,
    },
    Failed {
        /// Files processed before the one that failed.
        processed: usize,
        #[serde(serialize_with = "serialize_error")]
        error: OrganizeError,
    },
}

fn serialize_error<S: Serializer>(error: &OrganizeError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&error.to_string())
}

impl RunOutcome {
    pub fn processed(&self) -> usize {
        match self {
            Self::Completed { processed }
            | Self::Cancelled { processed }
            | Self::Failed { processed, .. } => *processed,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Shared cancellation flag.
///
/// Clones observe the same flag. Once set it stays set.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Where a file would be copied by a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedCopy {
    pub source: PathBuf,
    pub target_subfolder: String,
    pub destination: PathBuf,
    /// Something already exists at `destination`, so a run would skip it.
    pub collides: bool,
}

/// Copies files into classified sub-folders through a [`FsPrimitive`].
pub struct ReorganizeEngine<F = StdFs> {
    fs: F,
}

impl ReorganizeEngine<StdFs> {
    pub fn new() -> Self {
        Self { fs: StdFs }
    }
}

impl Default for ReorganizeEngine<StdFs> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: FsPrimitive> ReorganizeEngine<F> {
    pub fn with_fs(fs: F) -> Self {
        Self { fs }
    }

    /// Runs one reorganization over `files`.
    ///
    /// Directories in `files` are ignored. `on_progress` is called once per
    /// file, in input order, after the file has been copied or skipped.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use dirsort::classifier::Classifier;
    /// use dirsort::engine::{CancelToken, ReorganizeEngine};
    /// use dirsort::file_category::CategoryTable;
    /// use std::path::Path;
    ///
    /// let files = Vec::new();
    /// let outcome = ReorganizeEngine::new().run(
    ///     &files,
    ///     &Classifier::by_type(CategoryTable::reference()),
    ///     Path::new("/tmp/sorted"),
    ///     &CancelToken::new(),
    ///     |event| println!("{}/{} {}", event.index, event.total, event.current_name),
    /// );
    /// assert!(outcome.is_completed());
    /// ```
    pub fn run<P>(
        &self,
        files: &[FileEntry],
        classifier: &Classifier,
        destination_root: &Path,
        cancel: &CancelToken,
        mut on_progress: P,
    ) -> RunOutcome
    where
        P: FnMut(ProgressEvent),
    {
        let files: Vec<&FileEntry> = files.iter().filter(|entry| !entry.is_dir).collect();
        let total = files.len();
        if total == 0 {
            return RunOutcome::Completed { processed: 0 };
        }

        if destination_root.exists() && !destination_root.is_dir() {
            warn!("destination {} is not a directory", destination_root.display());
            return RunOutcome::Failed {
                processed: 0,
                error: OrganizeError::InvalidDestinationRoot {
                    path: destination_root.to_path_buf(),
                },
            };
        }

        info!(
            "organizing {} files by {} into {}",
            total,
            classifier.mode(),
            destination_root.display()
        );

        let mut processed = 0;
        for (index, file) in files.iter().enumerate() {
            if cancel.is_cancelled() {
                info!("run cancelled after {} of {} files", processed, total);
                return RunOutcome::Cancelled { processed };
            }

            let subfolder = classifier.target_subfolder(file);
            let folder = destination_root.join(&subfolder);
            if let Err(error) = self.fs.ensure_directory(&folder) {
                warn!("run failed after {} files: {}", processed, error);
                return RunOutcome::Failed { processed, error };
            }

            let destination = destination_path(destination_root, &subfolder, file.file_name());
            if should_skip(&destination) {
                debug!("skipping {}: destination exists", destination.display());
            } else if let Err(error) = self.fs.copy_file(&file.path, &destination) {
                warn!("run failed after {} files: {}", processed, error);
                return RunOutcome::Failed { processed, error };
            } else {
                debug!("copied {} to {}", file.path.display(), destination.display());
            }

            processed += 1;
            on_progress(ProgressEvent {
                index: index + 1,
                total,
                current_name: file.name.clone(),
            });
        }

        info!("run completed: {} files", processed);
        RunOutcome::Completed { processed }
    }

    /// Computes where each regular file would go, without copying anything.
    pub fn plan(
        &self,
        files: &[FileEntry],
        classifier: &Classifier,
        destination_root: &Path,
    ) -> Vec<PlannedCopy> {
        files
            .iter()
            .filter(|entry| !entry.is_dir)
            .map(|file| {
                let target_subfolder = classifier.target_subfolder(file);
                let destination =
                    destination_path(destination_root, &target_subfolder, file.file_name());
                PlannedCopy {
                    source: file.path.clone(),
                    collides: should_skip(&destination),
                    target_subfolder,
                    destination,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_category::CategoryTable;
    use crate::file_organizer::OrganizeResult;
    use std::cell::RefCell;
    use std::fs;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, content: &str) -> FileEntry {
        let path = dir.join(name);
        fs::write(&path, content).expect("Failed to write file");
        FileEntry::from_path(&path).expect("Failed to stat file")
    }

    fn by_type() -> Classifier {
        Classifier::by_type(CategoryTable::reference())
    }

    /// Delegates to `StdFs` but fails the copy of one named file.
    struct FailingCopy {
        fail_on: &'static str,
        copies: RefCell<Vec<PathBuf>>,
    }

    impl FsPrimitive for FailingCopy {
        fn ensure_directory(&self, path: &Path) -> OrganizeResult<()> {
            StdFs.ensure_directory(path)
        }

        fn copy_file(&self, source: &Path, destination: &Path) -> OrganizeResult<()> {
            if source.file_name().is_some_and(|n| n == self.fail_on) {
                return Err(OrganizeError::CopyFailed {
                    source: source.to_path_buf(),
                    destination: destination.to_path_buf(),
                    source_error: std::io::Error::other("disk full"),
                });
            }
            self.copies.borrow_mut().push(destination.to_path_buf());
            StdFs.copy_file(source, destination)
        }
    }

    #[test]
    fn test_empty_input_completes_without_events() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut events = Vec::new();

        let outcome = ReorganizeEngine::new().run(
            &[],
            &by_type(),
            temp_dir.path(),
            &CancelToken::new(),
            |e| events.push(e),
        );

        assert!(matches!(outcome, RunOutcome::Completed { processed: 0 }));
        assert!(events.is_empty());
    }

    #[test]
    fn test_directories_only_is_empty_input() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::create_dir(temp_dir.path().join("folder")).unwrap();
        let dir_entry = FileEntry::from_path(&temp_dir.path().join("folder")).unwrap();
        let dest = temp_dir.path().join("out");

        let outcome = ReorganizeEngine::new().run(
            &[dir_entry],
            &by_type(),
            &dest,
            &CancelToken::new(),
            |_| panic!("no progress expected"),
        );

        assert!(matches!(outcome, RunOutcome::Completed { processed: 0 }));
        assert!(!dest.exists());
    }

    #[test]
    fn test_copies_into_categories_and_keeps_sources() {
        let src = TempDir::new().expect("Failed to create temp directory");
        let dest = TempDir::new().expect("Failed to create temp directory");
        let files = vec![
            write_file(src.path(), "a.jpg", "jpg"),
            write_file(src.path(), "b.txt", "txt"),
            write_file(src.path(), "c.xyz", "xyz"),
        ];
        let mut events = Vec::new();

        let outcome = ReorganizeEngine::new().run(
            &files,
            &by_type(),
            dest.path(),
            &CancelToken::new(),
            |e| events.push(e),
        );

        assert!(matches!(outcome, RunOutcome::Completed { processed: 3 }));
        assert_eq!(fs::read_to_string(dest.path().join("Images/a.jpg")).unwrap(), "jpg");
        assert_eq!(fs::read_to_string(dest.path().join("Text/b.txt")).unwrap(), "txt");
        assert_eq!(fs::read_to_string(dest.path().join("Others/c.xyz")).unwrap(), "xyz");
        for file in &files {
            assert!(file.path.exists());
        }

        let indices: Vec<_> = events.iter().map(|e| (e.index, e.total)).collect();
        assert_eq!(indices, vec![(1, 3), (2, 3), (3, 3)]);
        let names: Vec<_> = events.iter().map(|e| e.current_name.as_str()).collect();
        assert_eq!(names, vec!["a.jpg", "b.txt", "c.xyz"]);
    }

    #[test]
    fn test_collision_is_skipped_silently() {
        let src = TempDir::new().expect("Failed to create temp directory");
        let dest = TempDir::new().expect("Failed to create temp directory");
        let files = vec![
            write_file(src.path(), "a.jpg", "new"),
            write_file(src.path(), "b.jpg", "other"),
        ];
        fs::create_dir(dest.path().join("Images")).unwrap();
        fs::write(dest.path().join("Images/a.jpg"), "old").unwrap();
        let mut events = Vec::new();

        let outcome = ReorganizeEngine::new().run(
            &files,
            &by_type(),
            dest.path(),
            &CancelToken::new(),
            |e| events.push(e),
        );

        assert!(matches!(outcome, RunOutcome::Completed { processed: 2 }));
        assert_eq!(fs::read_to_string(dest.path().join("Images/a.jpg")).unwrap(), "old");
        assert_eq!(fs::read_to_string(dest.path().join("Images/b.jpg")).unwrap(), "other");
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_cancel_between_files() {
        let src = TempDir::new().expect("Failed to create temp directory");
        let dest = TempDir::new().expect("Failed to create temp directory");
        let files = vec![
            write_file(src.path(), "one.txt", "1"),
            write_file(src.path(), "two.jpg", "2"),
            write_file(src.path(), "three.pdf", "3"),
        ];
        let cancel = CancelToken::new();
        let observer = cancel.clone();

        let outcome = ReorganizeEngine::new().run(&files, &by_type(), dest.path(), &cancel, |e| {
            if e.index == 1 {
                observer.cancel();
            }
        });

        assert!(matches!(outcome, RunOutcome::Cancelled { processed: 1 }));
        assert!(dest.path().join("Text/one.txt").exists());
        assert!(!dest.path().join("Images").exists());
        assert!(!dest.path().join("Documents").exists());
    }

    #[test]
    fn test_cancel_before_start() {
        let src = TempDir::new().expect("Failed to create temp directory");
        let dest = TempDir::new().expect("Failed to create temp directory");
        let files = vec![write_file(src.path(), "one.txt", "1")];
        let cancel = CancelToken::new();
        cancel.cancel();

        let outcome = ReorganizeEngine::new().run(&files, &by_type(), dest.path(), &cancel, |_| {});

        assert!(matches!(outcome, RunOutcome::Cancelled { processed: 0 }));
        assert_eq!(fs::read_dir(dest.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_first_copy_error_aborts_run() {
        let src = TempDir::new().expect("Failed to create temp directory");
        let dest = TempDir::new().expect("Failed to create temp directory");
        let files = vec![
            write_file(src.path(), "a.txt", "a"),
            write_file(src.path(), "bad.jpg", "b"),
            write_file(src.path(), "c.pdf", "c"),
        ];
        let engine = ReorganizeEngine::with_fs(FailingCopy {
            fail_on: "bad.jpg",
            copies: RefCell::new(Vec::new()),
        });
        let mut events = Vec::new();

        let outcome = engine.run(&files, &by_type(), dest.path(), &CancelToken::new(), |e| {
            events.push(e)
        });

        match outcome {
            RunOutcome::Failed { processed, error } => {
                assert_eq!(processed, 1);
                assert!(matches!(error, OrganizeError::CopyFailed { .. }));
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(events.len(), 1);
        assert_eq!(engine.fs.copies.borrow().len(), 1);
        // The folder for the failing file stays behind.
        assert!(dest.path().join("Images").is_dir());
        assert!(!dest.path().join("Documents").exists());
    }

    #[test]
    fn test_folder_creation_error_aborts_run() {
        let src = TempDir::new().expect("Failed to create temp directory");
        let dest = TempDir::new().expect("Failed to create temp directory");
        fs::write(dest.path().join("Text"), "in the way").unwrap();
        let files = vec![
            write_file(src.path(), "a.jpg", "a"),
            write_file(src.path(), "b.txt", "b"),
            write_file(src.path(), "c.pdf", "c"),
        ];
        let mut events = Vec::new();

        let outcome = ReorganizeEngine::new().run(
            &files,
            &by_type(),
            dest.path(),
            &CancelToken::new(),
            |e| events.push(e),
        );

        match outcome {
            RunOutcome::Failed { processed, error } => {
                assert_eq!(processed, 1);
                assert!(matches!(error, OrganizeError::DirectoryCreationFailed { .. }));
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(events.len(), 1);
        assert!(dest.path().join("Images/a.jpg").is_file());
        assert_eq!(fs::read_to_string(dest.path().join("Text")).unwrap(), "in the way");
        assert!(!dest.path().join("Documents").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_names_keep_their_bytes() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let src = TempDir::new().expect("Failed to create temp directory");
        let dest = TempDir::new().expect("Failed to create temp directory");
        let names = [OsStr::from_bytes(b"f\xff.txt"), OsStr::from_bytes(b"f\xfe.txt")];
        let files: Vec<FileEntry> = names
            .iter()
            .map(|name| {
                let path = src.path().join(name);
                fs::write(&path, name.as_bytes()).expect("Failed to write file");
                FileEntry::from_path(&path).expect("Failed to stat file")
            })
            .collect();
        assert_eq!(files[0].name, files[1].name);

        let plan = ReorganizeEngine::new().plan(&files, &by_type(), dest.path());
        assert_ne!(plan[0].destination, plan[1].destination);

        let outcome = ReorganizeEngine::new().run(
            &files,
            &by_type(),
            dest.path(),
            &CancelToken::new(),
            |_| {},
        );

        assert!(matches!(outcome, RunOutcome::Completed { processed: 2 }));
        for name in names {
            let copied = dest.path().join("Text").join(name);
            assert_eq!(fs::read(&copied).unwrap(), name.as_bytes());
        }
    }

    #[test]
    fn test_destination_root_that_is_a_file_fails() {
        let src = TempDir::new().expect("Failed to create temp directory");
        let files = vec![write_file(src.path(), "a.txt", "a")];
        let not_a_dir = src.path().join("a.txt");

        let outcome = ReorganizeEngine::new().run(
            &files,
            &by_type(),
            &not_a_dir,
            &CancelToken::new(),
            |_| {},
        );

        assert!(matches!(
            outcome,
            RunOutcome::Failed {
                processed: 0,
                error: OrganizeError::InvalidDestinationRoot { .. }
            }
        ));
    }

    #[test]
    fn test_in_place_run_uses_snapshot_only() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let files = vec![
            write_file(dir.path(), "a.txt", "a"),
            write_file(dir.path(), "b.txt", "b"),
        ];

        let outcome = ReorganizeEngine::new().run(
            &files,
            &by_type(),
            dir.path(),
            &CancelToken::new(),
            |_| {},
        );

        assert!(matches!(outcome, RunOutcome::Completed { processed: 2 }));
        assert!(dir.path().join("Text/a.txt").exists());
        assert!(dir.path().join("Text/b.txt").exists());
        assert!(!dir.path().join("Text/Text").exists());
    }

    #[test]
    fn test_plan_reports_collisions() {
        let src = TempDir::new().expect("Failed to create temp directory");
        let dest = TempDir::new().expect("Failed to create temp directory");
        let files = vec![
            write_file(src.path(), "a.jpg", "a"),
            write_file(src.path(), "b.txt", "b"),
        ];
        fs::create_dir(dest.path().join("Text")).unwrap();
        fs::write(dest.path().join("Text/b.txt"), "old").unwrap();

        let plan = ReorganizeEngine::new().plan(&files, &by_type(), dest.path());

        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].target_subfolder, "Images");
        assert!(!plan[0].collides);
        assert_eq!(plan[1].destination, dest.path().join("Text").join("b.txt"));
        assert!(plan[1].collides);
        assert!(!dest.path().join("Images").exists());
    }

    #[test]
    fn test_outcome_serializes_with_tag() {
        let json = serde_json::to_string(&RunOutcome::Cancelled { processed: 2 }).unwrap();
        assert_eq!(json, r#"{"outcome":"cancelled","processed":2}"#);

        let failed = RunOutcome::Failed {
            processed: 0,
            error: OrganizeError::WorkerPanicked,
        };
        let value: serde_json::Value = serde_json::to_value(&failed).unwrap();
        assert_eq!(value["outcome"], "failed");
        assert_eq!(value["error"], "Worker thread stopped unexpectedly");
    }
}
