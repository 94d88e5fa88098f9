//! Listing filters and category table configuration.
//!
//! Configuration lives in a TOML file. Every section is optional; a missing
//! `[categories]` section selects the built-in reference table.
//!
//! ```toml
//! [filters]
//! enable_hidden_files = false
//!
//! [filters.exclude]
//! filenames = ["Thumbs.db"]
//! patterns = ["*.part"]
//! extensions = ["tmp"]
//! regex = []
//!
//! [filters.include]
//! patterns = []
//!
//! [categories]
//! fallback = "Others"
//!
//! [[categories.rules]]
//! name = "Images"
//! extensions = [".jpg", "png"]
//! ```

use crate::file_category::{CategoryRule, CategoryTable, DEFAULT_FALLBACK};
use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// File name looked up in the working directory when no path is given.
pub const LOCAL_CONFIG_FILE: &str = ".dirsortrc.toml";

/// Errors that can occur while loading or compiling configuration.
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    ConfigNotFound(PathBuf),
    /// Invalid TOML syntax or structure.
    ConfigInvalid(String),
    /// Invalid glob pattern provided.
    InvalidGlobPattern(String),
    /// Invalid regex pattern provided with the actual error reason.
    InvalidRegexPattern {
        /// The regex pattern that failed to compile.
        pattern: String,
        /// The reason why the pattern is invalid.
        reason: String,
    },
    /// The `[categories]` section does not describe a usable table.
    InvalidCategoryTable(String),
    /// IO error while reading configuration.
    IoError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ConfigNotFound(path) => {
                write!(f, "Configuration file not found: {}", path.display())
            }
            ConfigError::ConfigInvalid(msg) => write!(f, "Invalid configuration: {}", msg),
            ConfigError::InvalidGlobPattern(pattern) => {
                write!(f, "Invalid glob pattern '{}'", pattern)
            }
            ConfigError::InvalidRegexPattern { pattern, reason } => {
                write!(f, "Invalid regex pattern '{}': {}", pattern, reason)
            }
            ConfigError::InvalidCategoryTable(msg) => {
                write!(f, "Invalid category table: {}", msg)
            }
            ConfigError::IoError(msg) => write!(f, "IO error reading configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Root of the configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganizerConfig {
    #[serde(default)]
    pub filters: FilterRules,

    /// Overrides the reference category table when present.
    #[serde(default)]
    pub categories: Option<CategoryConfig>,
}

/// Which directory entries a listing keeps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterRules {
    /// Whether to list hidden entries (names starting with "."). Defaults to false.
    #[serde(default)]
    pub enable_hidden_files: bool,

    #[serde(default)]
    pub exclude: ExcludeRules,

    /// Whitelist; a match here overrides every exclude rule.
    #[serde(default)]
    pub include: IncludeRules,
}

/// Rules for leaving entries out of a listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExcludeRules {
    /// Exact names, e.g. "Thumbs.db".
    #[serde(default)]
    pub filenames: Vec<String>,

    /// Glob patterns, e.g. "*.part".
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Extensions without the dot, e.g. "tmp".
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Regexes matched against the base name.
    #[serde(default)]
    pub regex: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncludeRules {
    #[serde(default)]
    pub patterns: Vec<String>,
}

/// Replacement category table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryConfig {
    #[serde(default = "default_fallback")]
    pub fallback: String,

    /// Rules in priority order.
    #[serde(default)]
    pub rules: Vec<CategoryRuleConfig>,
}

fn default_fallback() -> String {
    DEFAULT_FALLBACK.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRuleConfig {
    pub name: String,
    #[serde(default)]
    pub extensions: Vec<String>,
}

impl CategoryConfig {
    /// Builds the category table, rejecting unusable names.
    ///
    /// Every name becomes a sub-folder of the destination root, so it must
    /// be a single plain path component: not empty, no separators, not `.`
    /// or `..`, not absolute.
    pub fn to_table(&self) -> Result<CategoryTable, ConfigError> {
        let fallback = folder_name(&self.fallback, "fallback category")?;

        let rules = self
            .rules
            .iter()
            .map(|rule| {
                let name = folder_name(&rule.name, "category")?;
                if name == fallback && !rule.extensions.is_empty() {
                    return Err(ConfigError::InvalidCategoryTable(format!(
                        "fallback category '{}' must not list extensions",
                        name
                    )));
                }
                Ok(CategoryRule::new(name, &rule.extensions))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CategoryTable::new(rules, fallback))
    }
}

/// Trims `raw` and checks that it names exactly one directory level.
fn folder_name<'a>(raw: &'a str, role: &str) -> Result<&'a str, ConfigError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ConfigError::InvalidCategoryTable(format!(
            "{} name is empty",
            role
        )));
    }

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) if part == name => Ok(name),
        _ => Err(ConfigError::InvalidCategoryTable(format!(
            "{} name '{}' is not a plain folder name",
            role, name
        ))),
    }
}

/// Everything a command needs from configuration, ready for use.
pub struct CompiledConfig {
    pub filters: CompiledFilters,
    pub categories: CategoryTable,
}

impl OrganizerConfig {
    /// Loads configuration, falling back to defaults when no file is found.
    ///
    /// Lookup order:
    /// 1. `config_path`, when given
    /// 2. `.dirsortrc.toml` in the current directory
    /// 3. `~/.config/dirsort/config.toml`
    /// 4. built-in defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the explicitly given file cannot be read, or if
    /// any file that is found cannot be parsed.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        match Self::discovered_paths().into_iter().find(|path| path.exists()) {
            Some(path) => Self::load_from_file(&path),
            None => {
                log::debug!("no configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Implicit configuration locations, most specific first.
    fn discovered_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
        if let Some(home) = std::env::var_os("HOME") {
            paths.push(Path::new(&home).join(".config/dirsort/config.toml"));
        }
        paths
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        log::debug!("loaded configuration from {}", path.display());
        Self::from_toml(&content)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
    }

    /// Validates patterns and builds the category table.
    ///
    /// # Errors
    ///
    /// Returns an error if any regex or glob pattern is invalid, or if the
    /// category section is unusable.
    pub fn compile(self) -> Result<CompiledConfig, ConfigError> {
        let categories = match &self.categories {
            Some(section) => section.to_table()?,
            None => CategoryTable::reference(),
        };
        Ok(CompiledConfig {
            filters: CompiledFilters::new(self.filters)?,
            categories,
        })
    }
}

/// Pre-parsed listing filters.
pub struct CompiledFilters {
    enable_hidden_files: bool,
    exclude_filenames: HashSet<String>,
    exclude_extensions: HashSet<String>,
    exclude_patterns: Vec<Pattern>,
    exclude_regexes: Vec<Regex>,
    include_patterns: Vec<Pattern>,
}

fn compile_globs(patterns: &[String]) -> Result<Vec<Pattern>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            Pattern::new(pattern).map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
        })
        .collect()
}

impl CompiledFilters {
    fn new(rules: FilterRules) -> Result<Self, ConfigError> {
        let exclude_patterns = compile_globs(&rules.exclude.patterns)?;
        let include_patterns = compile_globs(&rules.include.patterns)?;

        let exclude_regexes = rules
            .exclude
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            enable_hidden_files: rules.enable_hidden_files,
            exclude_filenames: rules.exclude.filenames.into_iter().collect(),
            exclude_extensions: rules
                .exclude
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
            exclude_patterns,
            exclude_regexes,
            include_patterns,
        })
    }

    /// Decides whether a listing keeps `path`.
    ///
    /// Include patterns win outright; otherwise the entry is dropped if it is
    /// hidden (and hidden entries are disabled), or matches an excluded name,
    /// extension, glob or regex.
    pub fn should_include(&self, path: &Path) -> bool {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        let glob_hit = |patterns: &[Pattern]| {
            patterns
                .iter()
                .any(|p| p.matches_path(path) || p.matches(&file_name))
        };

        glob_hit(&self.include_patterns) || !self.is_excluded(path, &file_name, glob_hit)
    }

    fn is_excluded(
        &self,
        path: &Path,
        file_name: &str,
        glob_hit: impl Fn(&[Pattern]) -> bool,
    ) -> bool {
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase());

        (!self.enable_hidden_files && file_name.starts_with('.'))
            || self.exclude_filenames.contains(file_name)
            || extension.is_some_and(|ext| self.exclude_extensions.contains(&ext))
            || glob_hit(&self.exclude_patterns)
            || self.exclude_regexes.iter().any(|re| re.is_match(file_name))
    }
}
