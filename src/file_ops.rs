//! Single-entry copy, move and delete.
//!
//! Unlike bulk runs, these operations never skip silently: an occupied
//! destination is an error unless the caller explicitly asks to replace it.

use crate::file_organizer::copy_with_metadata;
use log::{debug, info};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// What to do when the destination already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overwrite {
    Refuse,
    Replace,
}

/// Errors from single-entry operations.
#[derive(Debug)]
pub enum TransferError {
    /// The source does not exist.
    SourceMissing(PathBuf),
    /// The source path has no final component (e.g. `/` or `..`).
    InvalidSource(PathBuf),
    /// Something already exists at the destination and overwriting was refused.
    DestinationExists(PathBuf),
    /// The destination is the source itself, or lies inside it.
    DestinationInsideSource { source: PathBuf, destination: PathBuf },
    /// A filesystem call failed.
    Io { path: PathBuf, source: io::Error },
}

impl std::fmt::Display for TransferError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SourceMissing(path) => write!(f, "{} does not exist", path.display()),
            Self::InvalidSource(path) => write!(f, "{} has no file name", path.display()),
            Self::DestinationExists(path) => {
                write!(f, "{} already exists", path.display())
            }
            Self::DestinationInsideSource {
                source,
                destination,
            } => write!(
                f,
                "Cannot place {} inside itself at {}",
                source.display(),
                destination.display()
            ),
            Self::Io { path, source } => write!(f, "{}: {}", path.display(), source),
        }
    }
}

impl std::error::Error for TransferError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> TransferError + '_ {
    move |source| TransferError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Resolves `destination_dir/<source name>` and applies the overwrite policy.
fn prepare_target(
    source: &Path,
    destination_dir: &Path,
    overwrite: Overwrite,
) -> Result<PathBuf, TransferError> {
    let source_meta = fs::symlink_metadata(source)
        .map_err(|_| TransferError::SourceMissing(source.to_path_buf()))?;
    let name = source
        .file_name()
        .ok_or_else(|| TransferError::InvalidSource(source.to_path_buf()))?;
    let target = destination_dir.join(name);

    let canonical_source = fs::canonicalize(source).map_err(io_error(source))?;
    if let Ok(canonical_dir) = fs::canonicalize(destination_dir) {
        let canonical_target = canonical_dir.join(name);
        let nests = source_meta.is_dir() && canonical_target.starts_with(&canonical_source);
        if canonical_target == canonical_source || nests {
            return Err(TransferError::DestinationInsideSource {
                source: source.to_path_buf(),
                destination: target,
            });
        }
    }

    if fs::symlink_metadata(&target).is_ok() {
        match overwrite {
            Overwrite::Refuse => return Err(TransferError::DestinationExists(target)),
            Overwrite::Replace => {
                debug!("replacing {}", target.display());
                remove_any(&target)?;
            }
        }
    }
    Ok(target)
}

fn remove_any(path: &Path) -> Result<(), TransferError> {
    let metadata = fs::symlink_metadata(path).map_err(io_error(path))?;
    if metadata.is_dir() {
        fs::remove_dir_all(path).map_err(io_error(path))
    } else {
        fs::remove_file(path).map_err(io_error(path))
    }
}

fn copy_tree(source: &Path, target: &Path) -> Result<(), TransferError> {
    for entry in WalkDir::new(source) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(source).to_path_buf();
            TransferError::Io {
                path,
                source: e.into(),
            }
        })?;
        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let destination = target.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&destination).map_err(io_error(&destination))?;
        } else {
            copy_with_metadata(entry.path(), &destination).map_err(io_error(entry.path()))?;
        }
    }
    Ok(())
}

fn copy_any(source: &Path, target: &Path) -> Result<(), TransferError> {
    if source.is_dir() {
        copy_tree(source, target)
    } else {
        copy_with_metadata(source, target).map_err(io_error(source))
    }
}

/// Copies a file or directory tree into `destination_dir`, returning the new path.
pub fn copy_entry(
    source: &Path,
    destination_dir: &Path,
    overwrite: Overwrite,
) -> Result<PathBuf, TransferError> {
    let target = prepare_target(source, destination_dir, overwrite)?;
    copy_any(source, &target)?;
    info!("copied {} to {}", source.display(), target.display());
    Ok(target)
}

/// Moves a file or directory into `destination_dir`, returning the new path.
///
/// Moves across filesystems fall back to copy-then-delete.
pub fn move_entry(
    source: &Path,
    destination_dir: &Path,
    overwrite: Overwrite,
) -> Result<PathBuf, TransferError> {
    let target = prepare_target(source, destination_dir, overwrite)?;
    match fs::rename(source, &target) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            debug!("rename crosses devices, copying {}", source.display());
            copy_any(source, &target)?;
            remove_any(source)?;
        }
        Err(e) => return Err(io_error(source)(e)),
    }
    info!("moved {} to {}", source.display(), target.display());
    Ok(target)
}

/// Deletes a file, or a directory with everything under it.
pub fn delete_entry(path: &Path) -> Result<(), TransferError> {
    if fs::symlink_metadata(path).is_err() {
        return Err(TransferError::SourceMissing(path.to_path_buf()));
    }
    remove_any(path)?;
    info!("deleted {}", path.display());
    Ok(())
}
