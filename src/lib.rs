//! dirsort - copy a directory's files into date or type sub-folders
//!
//! This library provides file classification by extension or modification
//! date, a cancellable reorganize engine that reports progress per file, a
//! worker that runs it off the caller's thread, directory listing with
//! sorting and category views, and single-entry copy, move and delete.

pub mod classifier;
pub mod cli;
pub mod config;
pub mod engine;
pub mod file_category;
pub mod file_ops;
pub mod file_organizer;
pub mod output;
pub mod snapshot;
pub mod worker;

pub use classifier::{Classifier, SortMode};
pub use config::{CompiledConfig, CompiledFilters, ConfigError, OrganizerConfig};
pub use engine::{CancelToken, PlannedCopy, ProgressEvent, ReorganizeEngine, RunOutcome};
pub use file_category::{CategoryRule, CategoryTable};
pub use file_organizer::{FsPrimitive, OrganizeError, StdFs};
pub use snapshot::{DirectorySnapshot, FileEntry, SortOrder};
pub use worker::{RunEvent, RunHandle, spawn_run};

pub use cli::{Cli, run_cli};
