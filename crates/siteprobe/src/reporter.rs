//! Scenario outcomes and suite reports.
//!
//! A [`SuiteReport`] renders as a one-line-per-scenario list, as
//! `report.json`, or as a static `index.html`.

use crate::config::ReporterKind;
use crate::result::ProbeResult;
use crate::scenario::{Phase, StepRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// JSON report file name
pub const JSON_REPORT_FILE: &str = "report.json";

/// HTML report file name
pub const HTML_REPORT_FILE: &str = "index.html";

/// Final status of a scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    /// Last attempt passed
    Passed,
    /// Last attempt failed
    Failed,
    /// Last attempt exceeded the scenario timeout
    TimedOut,
}

impl ScenarioStatus {
    /// Check if status is passing
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Short label
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::TimedOut => "timed out",
        }
    }
}

/// Result of running one scenario, retries included
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    /// Scenario name
    pub name: String,
    /// Status of the last attempt
    pub status: ScenarioStatus,
    /// Attempts made (1 + retries used)
    pub attempts: u32,
    /// Wall time across all attempts
    pub duration_ms: u64,
    /// Phase the last attempt ended in
    pub final_phase: Phase,
    /// Phase the last attempt failed in
    pub failed_at: Option<Phase>,
    /// Error of the last attempt
    pub error: Option<String>,
    /// Step log of the last attempt
    pub steps: Vec<StepRecord>,
    /// Trace files written for this scenario
    pub traces: Vec<PathBuf>,
    /// When the scenario finished
    pub finished_at: DateTime<Utc>,
}

impl ScenarioOutcome {
    /// Passed, but only after a retry
    #[must_use]
    pub const fn is_flaky(&self) -> bool {
        self.status.is_passed() && self.attempts > 1
    }

    /// One-line summary
    #[must_use]
    pub fn summary_line(&self) -> String {
        let mut line = format!(
            "{} {} ({}ms",
            self.status.label(),
            self.name,
            self.duration_ms
        );
        if self.attempts > 1 {
            let _ = write!(line, ", {} attempts", self.attempts);
        }
        line.push(')');
        if let Some(phase) = self.failed_at {
            let _ = write!(line, " in {phase}");
        }
        if let Some(error) = &self.error {
            let _ = write!(line, ": {error}");
        }
        line
    }
}

/// Outcomes of a whole run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteReport {
    /// Suite name
    pub suite: String,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Wall time of the run
    pub duration_ms: u64,
    /// Per-scenario outcomes in run order
    pub outcomes: Vec<ScenarioOutcome>,
}

impl SuiteReport {
    /// Empty report starting now
    #[must_use]
    pub fn new(suite: impl Into<String>) -> Self {
        Self {
            suite: suite.into(),
            started_at: Utc::now(),
            duration_ms: 0,
            outcomes: Vec::new(),
        }
    }

    /// Append an outcome
    pub fn record(&mut self, outcome: ScenarioOutcome) {
        self.outcomes.push(outcome);
    }

    /// Number of passed scenarios
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status.is_passed()).count()
    }

    /// Number of failed or timed-out scenarios
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.total_count() - self.passed_count()
    }

    /// Number of flaky scenarios
    #[must_use]
    pub fn flaky_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_flaky()).count()
    }

    /// Total scenarios
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.outcomes.len()
    }

    /// Every scenario passed (vacuously true when empty)
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.outcomes.iter().all(|o| o.status.is_passed())
    }

    /// Failing outcomes
    #[must_use]
    pub fn failures(&self) -> Vec<&ScenarioOutcome> {
        self.outcomes
            .iter()
            .filter(|o| !o.status.is_passed())
            .collect()
    }

    /// Generate summary string
    #[must_use]
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "{}: {}/{} passed",
            self.suite,
            self.passed_count(),
            self.total_count()
        );
        if self.flaky_count() > 0 {
            let _ = write!(summary, ", {} flaky", self.flaky_count());
        }
        let _ = write!(summary, " in {:.2}s", self.duration_ms as f64 / 1000.0);
        summary
    }

    /// Render the list reporter output
    #[must_use]
    pub fn render_list(&self) -> String {
        let mut out = String::new();
        for outcome in &self.outcomes {
            out.push_str(&outcome.summary_line());
            out.push('\n');
        }
        out.push_str(&self.summary());
        out.push('\n');
        out
    }

    /// Render JSON report content
    pub fn render_json(&self) -> ProbeResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Render HTML report content
    #[must_use]
    pub fn render_html(&self) -> String {
        let mut html = String::new();

        html.push_str(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>siteprobe report</title>
    <style>
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; margin: 20px; }
        .summary { background: #f5f5f5; padding: 20px; border-radius: 8px; margin-bottom: 20px; }
        .scenario { padding: 10px; margin: 5px 0; border-radius: 4px; }
        .scenario.pass { background: #e8f5e9; border-left: 4px solid #4caf50; }
        .scenario.fail { background: #ffebee; border-left: 4px solid #f44336; }
        .error { color: #d32f2f; font-family: monospace; white-space: pre-wrap; }
        ol.steps { font-family: monospace; font-size: 0.9em; }
    </style>
</head>
<body>
"#,
        );

        let _ = write!(
            html,
            r#"<div class="summary">
    <h1>{}</h1>
    <h2>{}/{} passed</h2>
    <p>Started {} - {:.2}s</p>
</div>
"#,
            escape_html(&self.suite),
            self.passed_count(),
            self.total_count(),
            self.started_at.to_rfc3339(),
            self.duration_ms as f64 / 1000.0
        );

        for outcome in &self.outcomes {
            let class = if outcome.status.is_passed() { "pass" } else { "fail" };
            let _ = write!(
                html,
                r#"<div class="scenario {class}">
    <strong>{}</strong> - {} ({}ms, attempts: {})
"#,
                escape_html(&outcome.name),
                outcome.status.label(),
                outcome.duration_ms,
                outcome.attempts
            );
            if let Some(error) = &outcome.error {
                let _ = writeln!(html, r#"    <div class="error">{}</div>"#, escape_html(error));
            }
            if !outcome.steps.is_empty() {
                html.push_str("    <ol class=\"steps\">\n");
                for step in &outcome.steps {
                    let _ = writeln!(
                        html,
                        "        <li>[{}] +{}ms {}</li>",
                        step.phase,
                        step.elapsed_ms,
                        escape_html(&step.description)
                    );
                }
                html.push_str("    </ol>\n");
            }
            for trace in &outcome.traces {
                let _ = writeln!(html, "    <p>trace: {}</p>", escape_html(&trace.display().to_string()));
            }
            html.push_str("</div>\n");
        }

        html.push_str("</body>\n</html>\n");
        html
    }

    /// Write the report for `kind` into `dir`.
    ///
    /// Returns the file written; the list reporter writes nothing.
    pub async fn write(&self, kind: ReporterKind, dir: &Path) -> ProbeResult<Option<PathBuf>> {
        let (name, content) = match kind {
            ReporterKind::List => return Ok(None),
            ReporterKind::Json => (JSON_REPORT_FILE, self.render_json()?),
            ReporterKind::Html => (HTML_REPORT_FILE, self.render_html()),
        };
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(name);
        tokio::fs::write(&path, content).await?;
        Ok(Some(path))
    }
}

/// Escape HTML special characters
fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
