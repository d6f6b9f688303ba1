//! Progress reporting

use indicatif::{HumanBytes, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::{Duration, Instant};

/// Spinner for a sync run
pub struct ProgressReporter {
    bar: ProgressBar,
    started_at: Instant,
    checked_files: u64,
    uploaded_files: u64,
    uploaded_bytes: u64,
}

impl ProgressReporter {
    /// Spinner drawn to stderr
    pub fn new() -> Self {
        let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
        bar.enable_steady_tick(Duration::from_millis(120));
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
            bar.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
        }
        Self::with_bar(bar)
    }

    /// Reporter that never draws anything
    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden())
    }

    /// Spinner if `enabled` and stderr is a terminal, hidden otherwise
    pub fn for_terminal(enabled: bool) -> Self {
        if enabled && console::Term::stderr().is_term() {
            Self::new()
        } else {
            Self::hidden()
        }
    }

    fn with_bar(bar: ProgressBar) -> Self {
        Self {
            bar,
            started_at: Instant::now(),
            checked_files: 0,
            uploaded_files: 0,
            uploaded_bytes: 0,
        }
    }

    /// Mark start of a pass
    pub fn start_phase(&self, label: &str) {
        self.bar.set_message(label.to_string());
    }

    /// Update current file/action indicator.
    pub fn set_current(&self, action: &str, path: &str) {
        self.bar.set_message(format!(
            "{} {} | {} checked, {} uploaded ({}, {}/s)",
            action,
            path,
            self.checked_files,
            self.uploaded_files,
            HumanBytes(self.uploaded_bytes),
            HumanBytes(self.throughput_bps())
        ));
    }

    pub fn file_checked(&mut self) {
        self.checked_files += 1;
    }

    /// Mark one upload complete
    pub fn file_uploaded(&mut self, bytes: u64) {
        self.uploaded_files += 1;
        self.uploaded_bytes = self.uploaded_bytes.saturating_add(bytes);
    }

    /// Clear the spinner at the end of the run
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    fn throughput_bps(&self) -> u64 {
        let secs = self.started_at.elapsed().as_secs_f64();
        if secs > 0.0 {
            (self.uploaded_bytes as f64 / secs) as u64
        } else {
            0
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::hidden()
    }
}
