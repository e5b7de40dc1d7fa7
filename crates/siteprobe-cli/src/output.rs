//! Output formatting and progress reporting

use console::{style, Style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use siteprobe::{ScenarioOutcome, SuiteReport};

/// Progress reporter for scenario runs
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    progress_bar: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            progress_bar: None,
            use_color,
            quiet,
        }
    }

    /// Start a progress bar over `total` scenarios
    pub fn start_progress(&mut self, total: u64, message: &str) {
        if self.quiet {
            return;
        }

        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb.set_message(message.to_string());
        self.progress_bar = Some(pb);
    }

    /// Show the attempt in progress
    pub fn attempt(&self, name: &str, attempt: u32) {
        if let Some(ref pb) = self.progress_bar {
            if attempt > 1 {
                pb.set_message(format!("{name} (retry {})", attempt - 1));
            } else {
                pb.set_message(name.to_string());
            }
        }
    }

    /// Print a finished scenario and advance the bar
    pub fn outcome(&self, outcome: &ScenarioOutcome) {
        let line = outcome.summary_line();
        self.println(|| {
            if outcome.status.is_passed() {
                if outcome.is_flaky() {
                    self.prefixed("~", "FLAKY", Style::new().yellow().bold(), &line)
                } else {
                    self.prefixed("✓", "PASS", Style::new().green().bold(), &line)
                }
            } else {
                self.prefixed("✗", "FAIL", Style::new().red().bold(), &line)
            }
        }, !outcome.status.is_passed());
        if let Some(ref pb) = self.progress_bar {
            pb.inc(1);
        }
    }

    /// Finish progress bar
    pub fn finish(&self) {
        if let Some(ref pb) = self.progress_bar {
            pb.finish_and_clear();
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }
        let _ = self
            .term
            .write_line(&self.prefixed("⚠", "WARN", Style::new().yellow().bold(), message));
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }
        let _ = self
            .term
            .write_line(&self.prefixed("ℹ", "INFO", Style::new().blue().bold(), message));
    }

    /// Print the suite summary; shown in quiet mode when something failed
    pub fn summary(&self, report: &SuiteReport) {
        if self.quiet && report.all_passed() {
            return;
        }
        let _ = self.term.write_line("");

        let status = if report.all_passed() { "PASSED" } else { "FAILED" };
        let status = if self.use_color {
            let s = if report.all_passed() {
                Style::new().green().bold()
            } else {
                Style::new().red().bold()
            };
            s.apply_to(status).to_string()
        } else {
            status.to_string()
        };
        let _ = self.term.write_line(&format!("{status} {}", report.summary()));

        for failure in report.failures() {
            let name = if self.use_color {
                style(&failure.name).bold().to_string()
            } else {
                failure.name.clone()
            };
            let _ = self.term.write_line(&format!(
                "  {name}: {}",
                failure.error.as_deref().unwrap_or("failed")
            ));
        }
    }

    fn prefixed(&self, symbol: &str, word: &str, styled: Style, message: &str) -> String {
        let prefix = if self.use_color {
            styled.apply_to(symbol).to_string()
        } else {
            word.to_string()
        };
        format!("{prefix} {message}")
    }

    fn println(&self, line: impl FnOnce() -> String, always: bool) {
        if self.quiet && !always {
            return;
        }
        let line = line();
        match self.progress_bar {
            Some(ref pb) => pb.println(line),
            None => {
                let _ = self.term.write_line(&line);
            }
        }
    }
}
