//! Output formatting and progress sinks.
//!
//! [`OutputFormatter`] centralizes styled terminal messages. Progress of a
//! reorganize run is rendered by a [`ProgressSink`]: a progress bar for
//! people, or JSON lines for a front-end reading our stdout.

use crate::engine::{ProgressEvent, RunOutcome};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::io::Write;

/// Receives the events of one run, in order, then its outcome.
pub trait ProgressSink {
    fn on_progress(&mut self, event: &ProgressEvent);
    fn on_finished(&mut self, outcome: &RunOutcome);
}

/// Discards everything.
#[derive(Debug, Default)]
pub struct SilentSink;

impl ProgressSink for SilentSink {
    fn on_progress(&mut self, _event: &ProgressEvent) {}
    fn on_finished(&mut self, _outcome: &RunOutcome) {}
}

/// Manages CLI output with consistent styling.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn plain(message: &str) {
        println!("{}", message);
    }

    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Creates a progress bar rendering `pos/len` and the current file name.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use dirsort::output::OutputFormatter;
    /// let pb = OutputFormatter::create_progress_bar(100);
    /// pb.inc(1);
    /// pb.finish_with_message("Completed!");
    /// ```
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("Invalid progress bar template")
                .progress_chars("█▓░"),
        );
        pb
    }

    /// Prints file counts per sub-folder, sorted by name.
    pub fn summary_table(folder_counts: &BTreeMap<String, usize>, total_files: usize) {
        Self::header("SUMMARY");

        let width = folder_counts
            .keys()
            .map(|name| name.chars().count())
            .max()
            .unwrap_or(0)
            .max(6);

        println!(
            "{:<width$} | {}",
            "Folder".bold(),
            "Files".bold(),
            width = width
        );
        println!("{}", "-".repeat(width + 10));

        for (folder, count) in folder_counts {
            println!(
                "{:<width$} | {} {}",
                folder,
                count.to_string().green(),
                plural(*count),
                width = width
            );
        }

        println!("{}", "-".repeat(width + 10));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            total_files.to_string().green().bold(),
            plural(total_files),
            width = width
        );
    }

    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Prints the terminal outcome of a run.
    pub fn outcome(outcome: &RunOutcome) {
        match outcome {
            RunOutcome::Completed { processed } => {
                Self::success(&format!("Organized {} {}", processed, plural(*processed)))
            }
            RunOutcome::Cancelled { processed } => Self::warning(&format!(
                "Cancelled after {} {}",
                processed,
                plural(*processed)
            )),
            RunOutcome::Failed { processed, error } => Self::error(&format!(
                "Failed after {} {}: {}",
                processed,
                plural(*processed),
                error
            )),
        }
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}

/// Renders a run as a progress bar followed by a colored outcome line.
pub struct TerminalSink {
    bar: ProgressBar,
}

impl TerminalSink {
    pub fn new() -> Self {
        Self {
            bar: OutputFormatter::create_progress_bar(0),
        }
    }
}

impl Default for TerminalSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for TerminalSink {
    fn on_progress(&mut self, event: &ProgressEvent) {
        self.bar.set_length(event.total as u64);
        self.bar.set_position(event.index as u64);
        self.bar.set_message(event.current_name.clone());
    }

    fn on_finished(&mut self, outcome: &RunOutcome) {
        self.bar.finish_and_clear();
        OutputFormatter::outcome(outcome);
    }
}

/// Writes each event and the outcome as one JSON object per line.
///
/// Progress lines carry `"event": "progress"`; the final line is the
/// serialized [`RunOutcome`] with `"event": "finished"`.
pub struct JsonLinesSink<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, mut value: serde_json::Value, kind: &str) {
        if let Some(map) = value.as_object_mut() {
            map.insert("event".to_string(), kind.into());
        }
        let written = serde_json::to_writer(&mut self.out, &value)
            .map_err(std::io::Error::from)
            .and_then(|()| writeln!(self.out))
            .and_then(|()| self.out.flush());
        if let Err(e) = written {
            log::warn!("could not write progress line: {}", e);
        }
    }
}

impl<W: Write> ProgressSink for JsonLinesSink<W> {
    fn on_progress(&mut self, event: &ProgressEvent) {
        match serde_json::to_value(event) {
            Ok(value) => self.emit(value, "progress"),
            Err(e) => log::warn!("could not serialize progress: {}", e),
        }
    }

    fn on_finished(&mut self, outcome: &RunOutcome) {
        match serde_json::to_value(outcome) {
            Ok(value) => self.emit(value, "finished"),
            Err(e) => log::warn!("could not serialize outcome: {}", e),
        }
    }
}
