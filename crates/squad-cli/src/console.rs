//! CLI console utilities
//!
//! Status lines go to stderr; command output (tables, JSON) goes to stdout.

use colored::*;
use console::Term;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::time::Duration;

/// CLI console for formatted output
pub struct CLIConsole {
    verbose: bool,
    progress_bar: Option<ProgressBar>,
}

impl CLIConsole {
    pub const fn new(verbose: bool) -> Self {
        Self {
            verbose,
            progress_bar: None,
        }
    }

    /// Print an info message (verbose only)
    pub fn info(&self, message: &str) {
        if self.verbose {
            eprintln!("{} {}", "ℹ".blue().bold(), message);
        }
    }

    pub fn success(&self, message: &str) {
        eprintln!("{} {}", "✓".green().bold(), message.green());
    }

    pub fn warn(&self, message: &str) {
        eprintln!("{} {}", "⚠".yellow().bold(), message.yellow());
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "✗".red().bold(), message.red());
    }

    pub fn print_header(&self, title: &str) {
        println!();
        println!("{}", title.bold().underline());
        println!("{}", "=".repeat(title.len()).dimmed());
    }

    /// Print a table header; `widths` pads each column
    pub fn print_table_header(&self, headers: &[&str], widths: &[usize]) {
        let line = pad_cells(headers, widths);
        println!("{}", line.bold());
        println!("{}", "-".repeat(line.len()).dimmed());
    }

    pub fn print_table_row(&self, cells: &[&str], widths: &[usize]) {
        println!("{}", pad_cells(cells, widths));
    }

    /// Pretty JSON on stdout
    pub fn print_json<T: Serialize>(&self, value: &T) -> serde_json::Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    /// Start a spinner on stderr; a no-op when stderr is not a terminal
    pub fn start_progress(&mut self, message: &str) {
        if !Term::stderr().is_term() {
            return;
        }
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.blue} {msg} [{elapsed}]") {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        self.progress_bar = Some(pb);
    }

    pub fn finish_progress(&mut self) {
        if let Some(pb) = self.progress_bar.take() {
            pb.finish_and_clear();
        }
    }
}

impl Default for CLIConsole {
    fn default() -> Self {
        Self::new(false)
    }
}

fn pad_cells(cells: &[&str], widths: &[usize]) -> String {
    cells
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let width = widths.get(i).copied().unwrap_or(0);
            format!("{:width$}", cell, width = width)
        })
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

/// Utility functions for console formatting
pub mod format {
    use colored::*;
    use squad_core::{MemberOutcome, MemberStatus};

    pub fn path(path: &std::path::Path) -> String {
        path.display().to_string().cyan().to_string()
    }

    pub fn duration(duration: std::time::Duration) -> String {
        format!("{:.2}s", duration.as_secs_f64()).yellow().to_string()
    }

    pub fn outcome(outcome: MemberOutcome) -> ColoredString {
        let text = outcome.to_string();
        match outcome {
            MemberOutcome::Completed => text.green(),
            MemberOutcome::Failed => text.red(),
            MemberOutcome::Pending => text.yellow(),
        }
    }

    pub fn status(status: MemberStatus) -> ColoredString {
        let text = status.to_string();
        match status {
            MemberStatus::Completed | MemberStatus::ShutDown => text.green(),
            MemberStatus::Failed => text.red(),
            MemberStatus::Spawning | MemberStatus::Active => text.cyan(),
            MemberStatus::ShutdownRequested => text.yellow(),
        }
    }
}
