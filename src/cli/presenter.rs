//! CLI presenter for output formatting

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

use crate::domain::audio::format_size;

const BAR_WIDTH: usize = 20;

/// Snapshot of a running recording for the progress line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordingProgress {
    pub elapsed_ms: u64,
    pub total_ms: u64,
    pub bytes: usize,
    pub chunks: usize,
}

impl RecordingProgress {
    fn filled_cells(&self, width: usize) -> usize {
        if self.total_ms == 0 {
            return 0;
        }
        let ratio = (self.elapsed_ms as f64 / self.total_ms as f64).min(1.0);
        (ratio * width as f64) as usize
    }
}

/// `m:ss`
fn clock(ms: u64) -> String {
    let secs = ms / 1000;
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Presenter for CLI output formatting. Status goes to stderr, results to
/// stdout.
pub struct Presenter {
    spinner: Option<ProgressBar>,
}

impl Presenter {
    pub fn new() -> Self {
        Self { spinner: None }
    }

    /// Start a spinner with message
    pub fn start_spinner(&mut self, message: &str) {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner().tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
        // The template is static; fall back to the plain style if it is rejected
        let style = style
            .clone()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or(style);
        spinner.set_style(style);
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        self.spinner = Some(spinner);
    }

    pub fn update_spinner(&self, message: &str) {
        if let Some(ref spinner) = self.spinner {
            spinner.set_message(message.to_string());
        }
    }

    pub fn spinner_success(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_with_message(format!("{} {}", "✓".green(), message));
        }
    }

    pub fn spinner_fail(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_with_message(format!("{} {}", "✗".red(), message));
        }
    }

    /// Print a line without tearing the spinner
    fn status_line(&self, line: String) {
        match self.spinner {
            Some(ref spinner) => spinner.println(line),
            None => eprintln!("{}", line),
        }
    }

    pub fn info(&self, message: &str) {
        self.status_line(format!("{} {}", "ℹ".cyan(), message));
    }

    pub fn success(&self, message: &str) {
        self.status_line(format!("{} {}", "✓".green(), message));
    }

    pub fn warn(&self, message: &str) {
        self.status_line(format!("{} {}", "⚠".yellow(), message));
    }

    pub fn error(&self, message: &str) {
        self.status_line(format!("{} {}", "✗".red(), message));
    }

    /// Print a recorder event
    pub fn event(&self, name: &str, detail: &str) {
        if detail.is_empty() {
            self.status_line(format!("{} {}", "●".cyan(), name.bold()));
        } else {
            self.status_line(format!("{} {} {}", "●".cyan(), name.bold(), detail.dimmed()));
        }
    }

    /// Output text to stdout
    pub fn output(&self, text: &str) {
        println!("{}", text);
    }

    /// Progress line: bar, clock and bytes received so far
    pub fn format_progress(&self, progress: &RecordingProgress) -> String {
        let filled = progress.filled_cells(BAR_WIDTH);
        format!(
            "[{}{}] {} / {} {} in {} chunk{}",
            "█".repeat(filled).cyan(),
            "░".repeat(BAR_WIDTH - filled),
            clock(progress.elapsed_ms),
            clock(progress.total_ms),
            format_size(progress.bytes),
            progress.chunks,
            if progress.chunks == 1 { "" } else { "s" }
        )
    }

    pub fn update_recording_progress(&self, progress: &RecordingProgress) {
        self.update_spinner(&format!("Recording {}", self.format_progress(progress)));
    }

    /// Print a key-value pair (for config list)
    pub fn key_value(&self, key: &str, value: &str) {
        println!("{}: {}", key.cyan(), value);
    }
}

impl Default for Presenter {
    fn default() -> Self {
        Self::new()
    }
}
