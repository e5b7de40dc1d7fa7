//! Suite runner: scenario selection, browser lifetime and progress output

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::ProgressReporter;
use crate::scenarios;
use siteprobe::runner::select;
use siteprobe::{
    PageLauncher, ReporterKind, RunConfig, RunEvent, Scenario, ScenarioRunner, SuiteReport,
};
use std::sync::Arc;
use tracing::debug;

/// Runs the built-in scenarios against a browser
#[derive(Debug)]
pub struct SuiteRunner {
    config: CliConfig,
    reporter: ProgressReporter,
}

impl SuiteRunner {
    /// Create a new suite runner
    #[must_use]
    pub fn new(config: CliConfig) -> Self {
        let reporter =
            ProgressReporter::new(config.color.should_color(), config.verbosity.is_quiet());
        Self { config, reporter }
    }

    /// Run the scenarios matching `filter` in a freshly launched browser
    ///
    /// # Errors
    ///
    /// Returns error if nothing matches, the browser cannot start, or the
    /// report cannot be written. Scenario failures are in the report.
    pub async fn run(&mut self, run: RunConfig, filter: Option<&str>) -> CliResult<SuiteReport> {
        let all = scenarios::all();
        let selected = select(&all, filter);
        if selected.is_empty() {
            return Err(CliError::NoScenarios {
                filter: filter.unwrap_or_default().to_string(),
            });
        }
        self.run_in_browser(run, &selected).await
    }

    #[cfg(feature = "browser")]
    async fn run_in_browser(
        &mut self,
        run: RunConfig,
        selected: &[&dyn Scenario],
    ) -> CliResult<SuiteReport> {
        use siteprobe::{Browser, LaunchOptions};

        let options = LaunchOptions::from(&run);
        debug!(headless = options.headless, "launching browser");
        let browser = Arc::new(Browser::launch(&options).await?);
        let launcher: Arc<dyn PageLauncher> = browser.clone();
        let report = self.run_with(run, launcher, selected).await;

        match Arc::try_unwrap(browser) {
            Ok(browser) => {
                if let Err(e) = browser.close().await {
                    self.reporter
                        .warning(&format!("Browser did not shut down cleanly: {e}"));
                }
            }
            Err(_) => debug!("browser still referenced; closing on drop"),
        }
        report
    }

    #[cfg(not(feature = "browser"))]
    #[allow(clippy::unused_async)]
    async fn run_in_browser(
        &mut self,
        _run: RunConfig,
        _selected: &[&dyn Scenario],
    ) -> CliResult<SuiteReport> {
        Err(CliError::BrowserDisabled)
    }

    /// Run `selected` on pages from `launcher`, then write the report
    ///
    /// # Errors
    ///
    /// Returns error if the report cannot be written
    pub async fn run_with(
        &mut self,
        run: RunConfig,
        launcher: Arc<dyn PageLauncher>,
        selected: &[&dyn Scenario],
    ) -> CliResult<SuiteReport> {
        let kind = run.reporter;
        let output_dir = run.output_dir.clone();

        self.reporter
            .start_progress(selected.len() as u64, "Starting...");
        let runner = ScenarioRunner::new(run, launcher);
        let reporter = &self.reporter;
        let report = runner
            .run_with(selected, |event| match event {
                RunEvent::AttemptStarted { name, attempt } => reporter.attempt(name, attempt),
                RunEvent::Finished(outcome) => reporter.outcome(outcome),
            })
            .await;
        self.reporter.finish();

        if let Some(path) = report.write(kind, &output_dir).await? {
            self.reporter
                .info(&format!("Report written to {}", path.display()));
        }
        if kind == ReporterKind::List && self.config.verbosity.is_verbose() {
            print!("{}", report.render_list());
        }
        self.reporter.summary(&report);
        Ok(report)
    }
}
