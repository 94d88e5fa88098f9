//! Target sub-folder selection for the reorganize engine.
//!
//! Files are grouped either by the calendar date they were last modified
//! (local time, `YYYY-MM-DD`) or by the category their extension belongs to.
//! Both classifications are total: every file gets a sub-folder.

use crate::file_category::CategoryTable;
use crate::snapshot::FileEntry;
use chrono::{DateTime, Local, Utc};
use serde::Serialize;

/// How files are grouped into sub-folders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    /// One folder per last-modified date.
    #[value(name = "date")]
    ByDate,
    /// One folder per category of the category table.
    #[value(name = "type")]
    ByType,
}

impl std::fmt::Display for SortMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortMode::ByDate => write!(f, "date"),
            SortMode::ByType => write!(f, "type"),
        }
    }
}

/// Returns the category name a file belongs to.
///
/// ```
/// use dirsort::classifier::classify_by_type;
/// use dirsort::file_category::CategoryTable;
///
/// let table = CategoryTable::reference();
/// assert_eq!(classify_by_type("b.txt", &table), "Text");
/// assert_eq!(classify_by_type("c.xyz", &table), "Others");
/// ```
pub fn classify_by_type<'a>(file_name: &str, table: &'a CategoryTable) -> &'a str {
    table.classify(file_name)
}

/// Formats a modification time (seconds since the Unix epoch) as a local `YYYY-MM-DD` date.
///
/// Timestamps chrono cannot represent are bucketed under the epoch date.
pub fn classify_by_date(modified_at: i64) -> String {
    DateTime::<Utc>::from_timestamp(modified_at, 0)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
        .with_timezone(&Local)
        .format("%Y-%m-%d")
        .to_string()
}

/// A sort mode bound to the category table it classifies with.
#[derive(Debug, Clone)]
pub struct Classifier {
    mode: SortMode,
    table: CategoryTable,
}

impl Classifier {
    pub fn new(mode: SortMode, table: CategoryTable) -> Self {
        Self { mode, table }
    }

    pub fn by_date() -> Self {
        Self::new(SortMode::ByDate, CategoryTable::reference())
    }

    pub fn by_type(table: CategoryTable) -> Self {
        Self::new(SortMode::ByType, table)
    }

    pub fn mode(&self) -> SortMode {
        self.mode
    }

    pub fn table(&self) -> &CategoryTable {
        &self.table
    }

    /// Name of the sub-folder `entry` should be copied into.
    pub fn target_subfolder(&self, entry: &FileEntry) -> String {
        match self.mode {
            SortMode::ByDate => classify_by_date(entry.modified_at),
            SortMode::ByType => classify_by_type(&entry.name, &self.table).to_string(),
        }
    }
}
