/// Filesystem primitives and the collision policy used by bulk runs.
///
/// The reorganize engine only ever needs two operations: make sure a
/// directory exists, and copy one file. They sit behind [`FsPrimitive`] so
/// runs can be exercised against a filesystem that fails on demand.
use log::debug;
use std::ffi::OsStr;
use std::fs::{self, File, FileTimes};
use std::io;
use std::path::{Path, PathBuf};

/// Errors that can occur while relocating files.
#[derive(Debug)]
pub enum OrganizeError {
    /// Failed to create a target sub-folder.
    DirectoryCreationFailed { path: PathBuf, source: io::Error },
    /// Failed to copy a file to its destination.
    CopyFailed {
        source: PathBuf,
        destination: PathBuf,
        source_error: io::Error,
    },
    /// The destination root exists but is not a directory.
    InvalidDestinationRoot { path: PathBuf },
    /// The background worker stopped without reporting an outcome.
    WorkerPanicked,
}

impl std::fmt::Display for OrganizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DirectoryCreationFailed { path, source } => {
                write!(
                    f,
                    "Failed to create directory {}: {}",
                    path.display(),
                    source
                )
            }
            Self::CopyFailed {
                source,
                destination,
                source_error,
            } => {
                write!(
                    f,
                    "Failed to copy {} to {}: {}",
                    source.display(),
                    destination.display(),
                    source_error
                )
            }
            Self::InvalidDestinationRoot { path } => {
                write!(f, "Destination {} is not a directory", path.display())
            }
            Self::WorkerPanicked => write!(f, "Worker thread stopped unexpectedly"),
        }
    }
}

impl std::error::Error for OrganizeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::DirectoryCreationFailed { source, .. } => Some(source),
            Self::CopyFailed { source_error, .. } => Some(source_error),
            Self::InvalidDestinationRoot { .. } | Self::WorkerPanicked => None,
        }
    }
}

/// Result type for file organization operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// The filesystem operations a reorganize run performs.
pub trait FsPrimitive {
    /// Creates `path` and any missing parents. Succeeds if it already exists.
    fn ensure_directory(&self, path: &Path) -> OrganizeResult<()>;

    /// Copies the contents and, where possible, the metadata of `source` to `destination`.
    fn copy_file(&self, source: &Path, destination: &Path) -> OrganizeResult<()>;
}

/// [`FsPrimitive`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFs;

impl FsPrimitive for StdFs {
    fn ensure_directory(&self, path: &Path) -> OrganizeResult<()> {
        fs::create_dir_all(path).map_err(|e| OrganizeError::DirectoryCreationFailed {
            path: path.to_path_buf(),
            source: e,
        })
    }

    fn copy_file(&self, source: &Path, destination: &Path) -> OrganizeResult<()> {
        copy_with_metadata(source, destination).map_err(|e| OrganizeError::CopyFailed {
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            source_error: e,
        })
    }
}

/// Copies a file's contents and permissions, then carries over its timestamps.
///
/// Timestamp preservation is best-effort: a destination that cannot be
/// reopened for writing (e.g. copied read-only permissions) keeps the copy
/// time.
pub fn copy_with_metadata(source: &Path, destination: &Path) -> io::Result<()> {
    fs::copy(source, destination)?;

    if let Err(e) = preserve_times(source, destination) {
        debug!(
            "could not preserve timestamps on {}: {}",
            destination.display(),
            e
        );
    }
    Ok(())
}

fn preserve_times(source: &Path, destination: &Path) -> io::Result<()> {
    let metadata = fs::metadata(source)?;
    let mut times = FileTimes::new().set_modified(metadata.modified()?);
    if let Ok(accessed) = metadata.accessed() {
        times = times.set_accessed(accessed);
    }
    File::options()
        .write(true)
        .open(destination)?
        .set_times(times)
}

/// Returns true if a bulk run must leave `destination` alone.
///
/// Any existing entry counts, including directories and dangling symlinks.
/// Bulk runs never overwrite, rename, or report these.
pub fn should_skip(destination: &Path) -> bool {
    fs::symlink_metadata(destination).is_ok()
}

/// Builds `root/subfolder/file_name`.
///
/// `file_name` is taken as an `OsStr` so names that are not valid UTF-8
/// keep their exact bytes.
pub fn destination_path(
    root: &Path,
    subfolder: &str,
    file_name: impl AsRef<OsStr>,
) -> PathBuf {
    root.join(subfolder).join(file_name.as_ref())
}
