//! Command-line interface for dirsort.
//!
//! This module handles:
//! - Command parsing (clap)
//! - Configuration loading and directory listing
//! - Running a reorganization on a background worker and rendering its progress
//! - Single-entry copy, move and delete

use crate::classifier::{Classifier, SortMode};
use crate::config::{CompiledConfig, OrganizerConfig};
use crate::engine::{CancelToken, ReorganizeEngine, RunOutcome};
use crate::file_ops::{self, Overwrite};
use crate::output::{JsonLinesSink, OutputFormatter, TerminalSink};
use crate::snapshot::{DirectorySnapshot, FileEntry, SortOrder};
use crate::worker::spawn_run;
use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;

/// Copy a directory's files into date or type sub-folders.
#[derive(Parser, Debug)]
#[command(name = "dirsort", version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (default: ./.dirsortrc.toml, then ~/.config/dirsort/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// A CLI command to execute.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Copy every file of DIR into sub-folders named by date or by type
    Organize {
        dir: PathBuf,

        /// Grouping used for sub-folder names
        #[arg(long = "by", value_enum)]
        mode: SortMode,

        /// Root for the sub-folders (default: DIR itself)
        #[arg(long, value_name = "DIR")]
        dest: Option<PathBuf>,

        /// Show where files would go without copying anything
        #[arg(long)]
        dry_run: bool,

        /// Emit progress as JSON lines on stdout
        #[arg(long)]
        json: bool,

        /// Cancel the run when a line reading "q" or "cancel" arrives on stdin
        #[arg(long)]
        stdin_cancel: bool,
    },
    /// List the entries of DIR
    List {
        dir: PathBuf,

        #[arg(long, value_enum, default_value_t = SortOrder::NameAsc)]
        sort: SortOrder,

        /// Only show files of this category
        #[arg(long)]
        category: Option<String>,
    },
    /// Show details about one file or directory
    Info { path: PathBuf },
    /// Copy a file or directory into DEST_DIR
    Copy {
        source: PathBuf,
        dest_dir: PathBuf,

        /// Replace an existing entry of the same name
        #[arg(long)]
        overwrite: bool,
    },
    /// Move a file or directory into DEST_DIR
    Move {
        source: PathBuf,
        dest_dir: PathBuf,

        /// Replace an existing entry of the same name
        #[arg(long)]
        overwrite: bool,
    },
    /// Delete a file or directory (recursively)
    Delete {
        path: PathBuf,

        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

/// Settings of one `organize` invocation.
#[derive(Debug, Clone)]
pub struct OrganizeOptions {
    pub mode: SortMode,
    pub destination: Option<PathBuf>,
    pub dry_run: bool,
    pub json: bool,
    pub stdin_cancel: bool,
}

impl OrganizeOptions {
    pub fn new(mode: SortMode) -> Self {
        Self {
            mode,
            destination: None,
            dry_run: false,
            json: false,
            stdin_cancel: false,
        }
    }
}

/// Runs a parsed command line.
pub fn run_cli(cli: Cli) -> Result<(), String> {
    run_command(&cli.command, cli.config.as_deref())
}

/// Runs one command with an optional configuration file.
///
/// # Examples
///
/// ```no_run
/// use dirsort::cli::{Command, run_command};
/// use dirsort::classifier::SortMode;
/// use std::path::PathBuf;
///
/// let command = Command::Organize {
///     dir: PathBuf::from("/home/user/Downloads"),
///     mode: SortMode::ByType,
///     dest: None,
///     dry_run: true,
///     json: false,
///     stdin_cancel: false,
/// };
/// if let Err(e) = run_command(&command, None) {
///     eprintln!("Error: {}", e);
/// }
/// ```
pub fn run_command(command: &Command, config_path: Option<&Path>) -> Result<(), String> {
    match command {
        Command::Organize {
            dir,
            mode,
            dest,
            dry_run,
            json,
            stdin_cancel,
        } => {
            let options = OrganizeOptions {
                mode: *mode,
                destination: dest.clone(),
                dry_run: *dry_run,
                json: *json,
                stdin_cancel: *stdin_cancel,
            };
            match organize_directory_with_config(dir, &options, config_path)? {
                Some(RunOutcome::Failed { processed, error }) => Err(format!(
                    "Organization stopped after {} files: {}",
                    processed, error
                )),
                _ => Ok(()),
            }
        }
        Command::List {
            dir,
            sort,
            category,
        } => list_directory(dir, *sort, category.as_deref(), config_path),
        Command::Info { path } => show_details(path, config_path),
        Command::Copy {
            source,
            dest_dir,
            overwrite,
        } => {
            let target = file_ops::copy_entry(source, dest_dir, overwrite_policy(*overwrite))
                .map_err(|e| format!("Could not copy: {}", e))?;
            OutputFormatter::success(&format!(
                "Copied {} to {}",
                source.display(),
                target.display()
            ));
            Ok(())
        }
        Command::Move {
            source,
            dest_dir,
            overwrite,
        } => {
            let target = file_ops::move_entry(source, dest_dir, overwrite_policy(*overwrite))
                .map_err(|e| format!("Could not move: {}", e))?;
            OutputFormatter::success(&format!(
                "Moved {} to {}",
                source.display(),
                target.display()
            ));
            Ok(())
        }
        Command::Delete { path, yes } => {
            if !yes {
                return Err(format!(
                    "Refusing to delete {} without --yes",
                    path.display()
                ));
            }
            file_ops::delete_entry(path).map_err(|e| format!("Could not delete: {}", e))?;
            OutputFormatter::success(&format!("Deleted {}", path.display()));
            Ok(())
        }
    }
}

fn overwrite_policy(overwrite: bool) -> Overwrite {
    if overwrite {
        Overwrite::Replace
    } else {
        Overwrite::Refuse
    }
}

fn load_config(config_path: Option<&Path>) -> Result<CompiledConfig, String> {
    let compiled = OrganizerConfig::load(config_path)
        .map_err(|e| format!("Error loading configuration: {}", e))?
        .compile()
        .map_err(|e| format!("Error compiling configuration: {}", e))?;

    for duplicate in compiled.categories.duplicate_extensions() {
        warn!(
            "extension {} is listed under both {} and {}; {} wins",
            duplicate.extension, duplicate.owner, duplicate.shadowed, duplicate.owner
        );
    }
    Ok(compiled)
}

/// Organizes the files of `dir` and returns the run's outcome.
///
/// This function:
/// 1. Loads configuration (filters and category table)
/// 2. Takes a snapshot of the directory
/// 3. Either prints the plan (dry run) and returns `None`, or runs the
///    engine on a worker thread while rendering its progress
pub fn organize_directory_with_config(
    dir: &Path,
    options: &OrganizeOptions,
    config_path: Option<&Path>,
) -> Result<Option<RunOutcome>, String> {
    let config = load_config(config_path)?;
    let snapshot = DirectorySnapshot::load(dir, &config.filters).map_err(|e| e.to_string())?;
    let destination = options
        .destination
        .clone()
        .unwrap_or_else(|| dir.to_path_buf());
    let classifier = Classifier::new(options.mode, config.categories);

    if options.dry_run {
        print_plan(&snapshot, &classifier, &destination, options.json);
        return Ok(None);
    }

    if !options.json {
        if snapshot.is_empty() {
            OutputFormatter::info(&format!("{} is empty, nothing to organize", dir.display()));
        } else {
            OutputFormatter::info(&format!(
                "Organizing {} entries of {} by {} into {}",
                snapshot.len(),
                dir.display(),
                options.mode,
                destination.display()
            ));
        }
    }

    let handle = spawn_run(snapshot.into_entries(), classifier, destination);
    if options.stdin_cancel {
        watch_stdin_for_cancel(handle.cancel_token());
    }

    let outcome = if options.json {
        handle.drive(&mut JsonLinesSink::new(io::stdout()))
    } else {
        handle.drive(&mut TerminalSink::new())
    };
    Ok(Some(outcome))
}

fn print_plan(snapshot: &DirectorySnapshot, classifier: &Classifier, destination: &Path, json: bool) {
    let plan = ReorganizeEngine::new().plan(snapshot.entries(), classifier, destination);

    if json {
        for planned in &plan {
            match serde_json::to_string(planned) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!("could not serialize plan entry: {}", e),
            }
        }
        return;
    }

    if plan.is_empty() {
        OutputFormatter::dry_run_notice("No files found to organize.");
        return;
    }

    OutputFormatter::dry_run_notice(&format!(
        "Files of {} would be copied as follows:",
        snapshot.root().display()
    ));
    let mut folder_counts: BTreeMap<String, usize> = BTreeMap::new();
    for planned in &plan {
        let name = planned
            .source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if planned.collides {
            OutputFormatter::plain(&format!(
                " - {} → {}/ (exists, would skip)",
                name, planned.target_subfolder
            ));
        } else {
            OutputFormatter::plain(&format!(" - {} → {}/", name, planned.target_subfolder));
        }
        *folder_counts
            .entry(planned.target_subfolder.clone())
            .or_insert(0) += 1;
    }

    OutputFormatter::summary_table(&folder_counts, plan.len());
    OutputFormatter::dry_run_notice("No files were copied.");
}

fn watch_stdin_for_cancel(token: CancelToken) {
    thread::spawn(move || {
        for line in io::stdin().lines() {
            match line {
                Ok(line) if matches!(line.trim(), "q" | "cancel") => {
                    info!("cancellation requested on stdin");
                    token.cancel();
                    break;
                }
                Ok(_) => continue,
                Err(_) => break,
            }
        }
    });
}

/// Lists a directory, sorted and optionally restricted to one category.
pub fn list_directory(
    dir: &Path,
    order: SortOrder,
    category: Option<&str>,
    config_path: Option<&Path>,
) -> Result<(), String> {
    let config = load_config(config_path)?;
    let mut snapshot = DirectorySnapshot::load(dir, &config.filters).map_err(|e| e.to_string())?;
    snapshot.sort(order);
    debug!("listing {} entries of {}", snapshot.len(), dir.display());

    let entries: Vec<&FileEntry> = match category {
        Some(name) => {
            if !config.categories.has_category(name) {
                return Err(format!(
                    "Unknown category '{}'. Known categories: {}",
                    name,
                    config.categories.names().join(", ")
                ));
            }
            snapshot.in_category(&config.categories, name).collect()
        }
        None => snapshot.entries().iter().collect(),
    };

    OutputFormatter::header(&dir.display().to_string());
    for entry in &entries {
        let kind = if entry.is_dir {
            "<dir>".to_string()
        } else {
            human_bytes::human_bytes(entry.size_bytes as f64)
        };
        OutputFormatter::plain(&format!(
            "{:<40} {:>10}  {}",
            entry.name,
            kind,
            format_timestamp(entry.modified_at)
        ));
    }
    OutputFormatter::info(&format!("{} items", entries.len()));
    Ok(())
}

/// Prints name, location, type, size, modification time and detected MIME type.
pub fn show_details(path: &Path, config_path: Option<&Path>) -> Result<(), String> {
    let config = load_config(config_path)?;
    let entry =
        FileEntry::from_path(path).map_err(|e| format!("Could not read {}: {}", path.display(), e))?;

    let kind = if entry.is_dir {
        "Directory".to_string()
    } else {
        format!("{} file", config.categories.classify(&entry.name))
    };

    OutputFormatter::header(&entry.name);
    OutputFormatter::plain(&format!("Location: {}", entry.path.display()));
    OutputFormatter::plain(&format!("Type:     {}", kind));
    if !entry.is_dir {
        OutputFormatter::plain(&format!(
            "Size:     {} ({} bytes)",
            human_bytes::human_bytes(entry.size_bytes as f64),
            entry.size_bytes
        ));
        if let Some(mime) = detect_mime(path) {
            OutputFormatter::plain(&format!("Content:  {}", mime));
        }
    }
    OutputFormatter::plain(&format!("Modified: {}", format_timestamp(entry.modified_at)));
    Ok(())
}

/// Sniffs the MIME type from the file's leading bytes.
fn detect_mime(path: &Path) -> Option<String> {
    infer::get_from_path(path)
        .ok()
        .flatten()
        .map(|kind| kind.mime_type().to_string())
}

fn format_timestamp(seconds: i64) -> String {
    DateTime::<Utc>::from_timestamp(seconds, 0)
        .map(|time| {
            time.with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_default()
}
