//! Category table used to group files by extension.
//!
//! A [`CategoryTable`] is an ordered list of named extension sets plus a
//! fallback category. Lookups scan the rules in order and the first rule
//! containing the extension wins, so a table with an extension listed twice
//! still classifies deterministically.
//!
//! # Examples
//!
//! ```
//! use dirsort::file_category::CategoryTable;
//!
//! let table = CategoryTable::reference();
//! assert_eq!(table.classify("holiday.JPG"), "Images");
//! assert_eq!(table.classify("notes.md"), "Text");
//! assert_eq!(table.classify("mystery.xyz"), "Others");
//! ```
use std::collections::HashSet;
use std::path::Path;

/// Name of the category that receives files no rule claims.
pub const DEFAULT_FALLBACK: &str = "Others";

/// Normalizes an extension to the lower-cased, dot-prefixed form stored in rules.
///
/// ```
/// use dirsort::file_category::normalize_extension;
///
/// assert_eq!(normalize_extension("PNG"), ".png");
/// assert_eq!(normalize_extension(".Tar"), ".tar");
/// assert_eq!(normalize_extension(""), "");
/// ```
pub fn normalize_extension(ext: &str) -> String {
    let lower = ext.trim().to_lowercase();
    if lower.is_empty() || lower.starts_with('.') {
        lower
    } else {
        format!(".{}", lower)
    }
}

/// Returns the lower-cased extension of a file name, including the leading dot.
///
/// Names without an extension (including dot-files such as `.bashrc`) yield
/// an empty string.
///
/// ```
/// use dirsort::file_category::extension_of;
///
/// assert_eq!(extension_of("Report.PDF"), ".pdf");
/// assert_eq!(extension_of("archive.tar.gz"), ".gz");
/// assert_eq!(extension_of("Makefile"), "");
/// assert_eq!(extension_of(".bashrc"), "");
/// ```
pub fn extension_of(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

/// A named set of extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRule {
    name: String,
    extensions: HashSet<String>,
}

impl CategoryRule {
    /// Creates a rule, normalizing every extension.
    ///
    /// Extensions may be given with or without the leading dot and in any case.
    pub fn new<I, S>(name: impl Into<String>, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            name: name.into(),
            extensions: extensions
                .into_iter()
                .map(|ext| normalize_extension(ext.as_ref()))
                .filter(|ext| !ext.is_empty())
                .collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extensions(&self) -> &HashSet<String> {
        &self.extensions
    }

    /// Returns true if `ext` (already normalized) belongs to this rule.
    pub fn contains(&self, ext: &str) -> bool {
        self.extensions.contains(ext)
    }
}

/// An extension claimed by more than one rule.
///
/// Only `owner` ever receives files with this extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateExtension {
    pub extension: String,
    pub owner: String,
    pub shadowed: String,
}

/// Ordered mapping from category name to extension set, with a fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTable {
    rules: Vec<CategoryRule>,
    fallback: String,
}

impl CategoryTable {
    /// Creates a table from rules in priority order and a fallback name.
    pub fn new(rules: Vec<CategoryRule>, fallback: impl Into<String>) -> Self {
        Self {
            rules,
            fallback: fallback.into(),
        }
    }

    /// The built-in table used when no configuration overrides it.
    pub fn reference() -> Self {
        let rules = vec![
            CategoryRule::new(
                "Images",
                [".jpg", ".jpeg", ".png", ".gif", ".bmp", ".tiff", ".webp"],
            ),
            CategoryRule::new(
                "Videos",
                [".mp4", ".avi", ".mov", ".wmv", ".flv", ".mkv", ".webm"],
            ),
            CategoryRule::new("Audio", [".mp3", ".wav", ".ogg", ".flac", ".aac", ".wma"]),
            CategoryRule::new("Documents", [".pdf", ".doc", ".docx", ".rtf", ".tex"]),
            CategoryRule::new("Spreadsheets", [".xls", ".xlsx", ".csv"]),
            CategoryRule::new("Presentations", [".ppt", ".pptx"]),
            CategoryRule::new("Text", [".txt", ".md", ".log"]),
            CategoryRule::new("Archives", [".zip", ".rar", ".7z", ".tar", ".gz", ".iso"]),
            CategoryRule::new("Executables", [".exe", ".msi", ".app"]),
            CategoryRule::new("OneNote", [".one", ".onetoc2"]),
            CategoryRule::new(DEFAULT_FALLBACK, Vec::<String>::new()),
        ];
        Self::new(rules, DEFAULT_FALLBACK)
    }

    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Category names in table order, with the fallback last if no rule carries it.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.rules.iter().map(CategoryRule::name).collect();
        if !names.contains(&self.fallback.as_str()) {
            names.push(&self.fallback);
        }
        names
    }

    /// Returns true if `name` is one of this table's categories.
    pub fn has_category(&self, name: &str) -> bool {
        self.names().contains(&name)
    }

    /// Finds the first rule whose set contains the normalized extension.
    pub fn category_for_extension(&self, ext: &str) -> Option<&str> {
        if ext.is_empty() {
            return None;
        }
        self.rules
            .iter()
            .find(|rule| rule.contains(ext))
            .map(CategoryRule::name)
    }

    /// Classifies a file name, falling back when no rule matches.
    pub fn classify(&self, file_name: &str) -> &str {
        self.category_for_extension(&extension_of(file_name))
            .unwrap_or(&self.fallback)
    }

    /// Lists extensions claimed by more than one rule.
    pub fn duplicate_extensions(&self) -> Vec<DuplicateExtension> {
        let mut duplicates = Vec::new();
        for (index, rule) in self.rules.iter().enumerate() {
            let mut extensions: Vec<&String> = rule.extensions.iter().collect();
            extensions.sort();
            for ext in extensions {
                if let Some(owner) = self.rules[..index].iter().find(|r| r.contains(ext)) {
                    duplicates.push(DuplicateExtension {
                        extension: ext.clone(),
                        owner: owner.name.clone(),
                        shadowed: rule.name.clone(),
                    });
                }
            }
        }
        duplicates
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::reference()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_table_order() {
        let table = CategoryTable::reference();
        assert_eq!(
            table.names(),
            vec![
                "Images",
                "Videos",
                "Audio",
                "Documents",
                "Spreadsheets",
                "Presentations",
                "Text",
                "Archives",
                "Executables",
                "OneNote",
                "Others",
            ]
        );
        assert_eq!(table.fallback(), "Others");
    }

    #[test]
    fn test_classify_known_extensions() {
        let table = CategoryTable::reference();
        assert_eq!(table.classify("a.jpg"), "Images");
        assert_eq!(table.classify("clip.mkv"), "Videos");
        assert_eq!(table.classify("song.flac"), "Audio");
        assert_eq!(table.classify("thesis.tex"), "Documents");
        assert_eq!(table.classify("budget.csv"), "Spreadsheets");
        assert_eq!(table.classify("deck.pptx"), "Presentations");
        assert_eq!(table.classify("server.log"), "Text");
        assert_eq!(table.classify("disk.iso"), "Archives");
        assert_eq!(table.classify("setup.msi"), "Executables");
        assert_eq!(table.classify("notebook.onetoc2"), "OneNote");
    }

    #[test]
    fn test_classify_is_case_insensitive() {
        let table = CategoryTable::reference();
        assert_eq!(table.classify("PHOTO.JPEG"), "Images");
        assert_eq!(table.classify("Readme.Md"), "Text");
    }

    #[test]
    fn test_classify_falls_back() {
        let table = CategoryTable::reference();
        assert_eq!(table.classify("c.xyz"), "Others");
        assert_eq!(table.classify("Makefile"), "Others");
        assert_eq!(table.classify(".hidden"), "Others");
        assert_eq!(table.classify("trailing."), "Others");
    }

    #[test]
    fn test_empty_rule_never_matches() {
        let table = CategoryTable::new(
            vec![CategoryRule::new("Empty", Vec::<String>::new())],
            "Rest",
        );
        assert_eq!(table.classify("file"), "Rest");
        assert_eq!(table.classify("file.txt"), "Rest");
    }

    #[test]
    fn test_first_match_wins() {
        let table = CategoryTable::new(
            vec![
                CategoryRule::new("Notes", ["txt"]),
                CategoryRule::new("Text", [".TXT", ".md"]),
            ],
            DEFAULT_FALLBACK,
        );
        assert_eq!(table.classify("todo.txt"), "Notes");
        assert_eq!(table.classify("readme.md"), "Text");

        let duplicates = table.duplicate_extensions();
        assert_eq!(
            duplicates,
            vec![DuplicateExtension {
                extension: ".txt".to_string(),
                owner: "Notes".to_string(),
                shadowed: "Text".to_string(),
            }]
        );
    }

    #[test]
    fn test_reference_table_has_no_duplicates() {
        assert!(CategoryTable::reference().duplicate_extensions().is_empty());
    }

    #[test]
    fn test_names_appends_missing_fallback() {
        let table = CategoryTable::new(vec![CategoryRule::new("Images", ["png"])], "Misc");
        assert_eq!(table.names(), vec!["Images", "Misc"]);
        assert!(table.has_category("Misc"));
        assert!(!table.has_category("Others"));
    }
}
