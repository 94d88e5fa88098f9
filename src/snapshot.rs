//! Directory snapshots: the immutable input of a reorganize run.
//!
//! A snapshot lists a single directory level. Entries are captured once with
//! their metadata and never re-read, so a run whose destination is the
//! listed directory cannot pick up the folders and copies it creates.

use crate::config::CompiledFilters;
use crate::file_category::CategoryTable;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Serialize;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

/// One filesystem object considered for reorganization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    /// Base name.
    pub name: String,
    /// Full path of the entry.
    pub path: PathBuf,
    /// Directories are listed but never relocated.
    pub is_dir: bool,
    /// Size in bytes; zero for directories.
    pub size_bytes: u64,
    /// Last modification time, in seconds since the Unix epoch.
    pub modified_at: i64,
}

impl FileEntry {
    /// Builds an entry from the metadata of `path` (symlinks are followed).
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let metadata = fs::metadata(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let modified_at = metadata
            .modified()
            .map(|time| DateTime::<Utc>::from(time).timestamp())
            .unwrap_or(0);
        let is_dir = metadata.is_dir();

        Ok(Self {
            name,
            path: path.to_path_buf(),
            is_dir,
            size_bytes: if is_dir { 0 } else { metadata.len() },
            modified_at,
        })
    }

    /// The entry's base name exactly as the filesystem stores it.
    ///
    /// `name` is a lossy UTF-8 rendering meant for display and
    /// classification; destinations are built from this one.
    pub fn file_name(&self) -> &OsStr {
        self.path
            .file_name()
            .unwrap_or_else(|| OsStr::new(&self.name))
    }
}

/// Orderings offered for a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SortOrder {
    /// Name, A to Z (case-insensitive).
    #[default]
    NameAsc,
    /// Name, Z to A (case-insensitive).
    NameDesc,
    /// Most recently modified first.
    DateNewest,
    /// Least recently modified first.
    DateOldest,
    /// Largest first.
    SizeLargest,
    /// Smallest first.
    SizeSmallest,
}

/// Errors that can occur while listing a directory.
#[derive(Debug)]
pub enum SnapshotError {
    /// The directory could not be read.
    ReadDirFailed {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl std::fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReadDirFailed { path, source } => {
                write!(f, "Error reading directory {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadDirFailed { source, .. } => Some(source),
        }
    }
}

/// The entries of one directory at the time it was listed.
#[derive(Debug, Clone)]
pub struct DirectorySnapshot {
    root: PathBuf,
    entries: Vec<FileEntry>,
}

impl DirectorySnapshot {
    /// Wraps already collected entries.
    pub fn from_entries(root: PathBuf, entries: Vec<FileEntry>) -> Self {
        Self { root, entries }
    }

    /// Lists `dir` (without recursing), keeping entries the filters accept.
    ///
    /// Entries whose metadata cannot be read are skipped with a warning.
    /// Entries keep the order `read_dir` returned them in.
    pub fn load(dir: &Path, filters: &CompiledFilters) -> Result<Self, SnapshotError> {
        let read_dir = fs::read_dir(dir).map_err(|e| SnapshotError::ReadDirFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;

        let mut entries = Vec::new();
        for dir_entry in read_dir {
            let dir_entry = match dir_entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("skipping unreadable entry in {}: {}", dir.display(), e);
                    continue;
                }
            };

            let path = dir_entry.path();
            if !filters.should_include(&path) {
                debug!("filtered out {}", path.display());
                continue;
            }

            match FileEntry::from_path(&path) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("skipping {}: {}", path.display(), e),
            }
        }

        debug!("listed {} entries in {}", entries.len(), dir.display());
        Ok(Self {
            root: dir.to_path_buf(),
            entries,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<FileEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Regular files only, in snapshot order.
    pub fn files(&self) -> impl Iterator<Item = &FileEntry> {
        self.entries.iter().filter(|entry| !entry.is_dir)
    }

    /// Reorders the entries. Ties keep their previous relative order.
    pub fn sort(&mut self, order: SortOrder) {
        match order {
            SortOrder::NameAsc => self.entries.sort_by_key(|e| e.name.to_lowercase()),
            SortOrder::NameDesc => self
                .entries
                .sort_by_key(|e| std::cmp::Reverse(e.name.to_lowercase())),
            SortOrder::DateNewest => self
                .entries
                .sort_by_key(|e| std::cmp::Reverse(e.modified_at)),
            SortOrder::DateOldest => self.entries.sort_by_key(|e| e.modified_at),
            SortOrder::SizeLargest => self
                .entries
                .sort_by_key(|e| std::cmp::Reverse(e.size_bytes)),
            SortOrder::SizeSmallest => self.entries.sort_by_key(|e| e.size_bytes),
        }
    }

    /// Files that a by-type run would place in `category`.
    ///
    /// Directories never belong to a category.
    pub fn in_category<'a>(
        &'a self,
        table: &'a CategoryTable,
        category: &'a str,
    ) -> impl Iterator<Item = &'a FileEntry> + 'a {
        self.files()
            .filter(move |entry| table.classify(&entry.name) == category)
    }
}
