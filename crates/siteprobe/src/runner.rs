//! Scenario runner.
//!
//! Runs scenarios one after another, each on a fresh page (fresh browser
//! context) from a [`PageLauncher`]. Per attempt:
//!
//! ```text
//! new page -> install consent handler? -> run (bounded) -> finish
//!                                              | error/timeout
//!                                              v
//!                                    record failure, trace?, retry?
//! page.close() on every path
//! ```

use crate::config::RunConfig;
use crate::driver::PageDriver;
use crate::helpers::consent::install_consent_handler;
use crate::page::{millis, Page};
use crate::reporter::{ScenarioOutcome, ScenarioStatus, SuiteReport};
use crate::result::{ProbeError, ProbeResult};
use crate::scenario::{Phase, Scenario, ScenarioContext, StepRecord};
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Directory under the output dir that holds traces
pub const TRACE_DIR: &str = "traces";

/// Source of fresh, isolated pages
#[async_trait]
pub trait PageLauncher: Send + Sync {
    /// Open a new page in its own browser context
    async fn new_page(&self) -> ProbeResult<Arc<dyn PageDriver>>;
}

/// Progress notifications from [`ScenarioRunner::run_with`]
#[derive(Debug)]
pub enum RunEvent<'a> {
    /// An attempt is starting
    AttemptStarted {
        /// Scenario name
        name: &'a str,
        /// 1-based attempt number
        attempt: u32,
    },
    /// A scenario has its final outcome
    Finished(&'a ScenarioOutcome),
}

#[derive(Debug, Serialize)]
struct TraceFile<'a> {
    scenario: &'a str,
    attempt: u32,
    status: ScenarioStatus,
    failed_at: Option<Phase>,
    error: Option<&'a str>,
    steps: &'a [StepRecord],
    screenshot: Option<String>,
}

struct Attempt {
    status: ScenarioStatus,
    final_phase: Phase,
    failed_at: Option<Phase>,
    error: Option<String>,
    steps: Vec<StepRecord>,
    trace: Option<PathBuf>,
}

/// Sequential scenario runner with retries, timeouts and traces
pub struct ScenarioRunner {
    config: RunConfig,
    launcher: Arc<dyn PageLauncher>,
}

impl std::fmt::Debug for ScenarioRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenarioRunner")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Scenarios whose name contains `filter` (all when `None`)
#[must_use]
pub fn select<'a>(scenarios: &'a [Box<dyn Scenario>], filter: Option<&str>) -> Vec<&'a dyn Scenario> {
    scenarios
        .iter()
        .map(|s| &**s)
        .filter(|s| filter.map_or(true, |f| s.name().contains(f)))
        .collect()
}

impl ScenarioRunner {
    /// Create a runner
    #[must_use]
    pub fn new(config: RunConfig, launcher: Arc<dyn PageLauncher>) -> Self {
        Self { config, launcher }
    }

    /// Configuration in effect
    #[must_use]
    pub const fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run every scenario
    pub async fn run(&self, scenarios: &[&dyn Scenario]) -> SuiteReport {
        self.run_with(scenarios, |_| {}).await
    }

    /// Run every scenario, reporting progress to `observe`
    pub async fn run_with<F>(&self, scenarios: &[&dyn Scenario], mut observe: F) -> SuiteReport
    where
        F: FnMut(RunEvent<'_>) + Send,
    {
        let started = Instant::now();
        let mut report = SuiteReport::new("siteprobe");
        for scenario in scenarios {
            let outcome = self.run_scenario(*scenario, &mut observe).await;
            observe(RunEvent::Finished(&outcome));
            report.record(outcome);
        }
        report.duration_ms = millis(started.elapsed());
        report
    }

    async fn run_scenario<F>(&self, scenario: &dyn Scenario, observe: &mut F) -> ScenarioOutcome
    where
        F: FnMut(RunEvent<'_>) + Send,
    {
        let name = scenario.name();
        let started = Instant::now();
        let max_attempts = self.config.retries.saturating_add(1);
        let mut traces = Vec::new();
        let mut attempt = 0;

        info!(scenario = name, "Running {name}");
        let last = loop {
            attempt += 1;
            observe(RunEvent::AttemptStarted { name, attempt });
            let result = self.run_attempt(scenario, attempt).await;
            traces.extend(result.trace.clone());

            if result.status.is_passed() || attempt >= max_attempts {
                break result;
            }
            warn!(
                scenario = name,
                attempt,
                error = result.error.as_deref().unwrap_or_default(),
                "scenario failed; retrying"
            );
        };

        let outcome = ScenarioOutcome {
            name: name.to_string(),
            status: last.status,
            attempts: attempt,
            duration_ms: millis(started.elapsed()),
            final_phase: last.final_phase,
            failed_at: last.failed_at,
            error: last.error,
            steps: last.steps,
            traces,
            finished_at: Utc::now(),
        };
        info!(
            scenario = name,
            status = outcome.status.label(),
            attempts = outcome.attempts,
            duration_ms = outcome.duration_ms,
            "Done with {name}"
        );
        outcome
    }

    async fn run_attempt(&self, scenario: &dyn Scenario, attempt: u32) -> Attempt {
        let driver = match self.launcher.new_page().await {
            Ok(driver) => driver,
            Err(e) => {
                return Attempt {
                    status: ScenarioStatus::Failed,
                    final_phase: Phase::Start,
                    failed_at: Some(Phase::Start),
                    error: Some(e.to_string()),
                    steps: Vec::new(),
                    trace: None,
                }
            }
        };
        let page = Page::new(driver).with_timeouts(self.config.page_timeouts());
        let mut ctx = ScenarioContext::new(page, self.config.base_url.clone());

        let limit = self.config.scenario_timeout();
        let bounded = tokio::time::timeout(limit, run_body(scenario, &mut ctx)).await;
        let (status, error) = match bounded {
            Ok(Ok(())) => (ScenarioStatus::Passed, None),
            Ok(Err(e)) => {
                ctx.fail(&e);
                (ScenarioStatus::Failed, Some(e.to_string()))
            }
            Err(_) => {
                let e = ProbeError::Timeout {
                    operation: format!("scenario {}", scenario.name()),
                    ms: millis(limit),
                    reason: format!("still in {} phase", ctx.phase()),
                };
                ctx.fail(&e);
                (ScenarioStatus::TimedOut, Some(e.to_string()))
            }
        };

        let trace = if self.config.trace.records(attempt) {
            self.write_trace(scenario.name(), attempt, status, error.as_deref(), &ctx)
                .await
        } else {
            None
        };

        let final_phase = ctx.phase();
        let failed_at = ctx.failed_at();
        let steps = ctx.steps().to_vec();
        if let Err(e) = ctx.into_page().close().await {
            warn!(scenario = scenario.name(), error = %e, "failed to close page");
        }

        Attempt {
            status,
            final_phase,
            failed_at,
            error,
            steps,
            trace,
        }
    }

    async fn write_trace(
        &self,
        name: &str,
        attempt: u32,
        status: ScenarioStatus,
        error: Option<&str>,
        ctx: &ScenarioContext,
    ) -> Option<PathBuf> {
        let dir = self.config.output_dir.join(TRACE_DIR);
        let stem = format!("{}-attempt{attempt}", slug(name));

        let written: ProbeResult<PathBuf> = async {
            tokio::fs::create_dir_all(&dir).await?;

            let screenshot = if status.is_passed() {
                None
            } else {
                match ctx.page().screenshot().await {
                    Ok(png) if !png.is_empty() => {
                        let file = format!("{stem}.png");
                        tokio::fs::write(dir.join(&file), png).await?;
                        Some(file)
                    }
                    Ok(_) => None,
                    Err(e) => {
                        warn!(scenario = name, error = %e, "failure screenshot unavailable");
                        None
                    }
                }
            };

            let trace = TraceFile {
                scenario: name,
                attempt,
                status,
                failed_at: ctx.failed_at(),
                error,
                steps: ctx.steps(),
                screenshot,
            };
            let path = dir.join(format!("{stem}.json"));
            tokio::fs::write(&path, serde_json::to_vec_pretty(&trace)?).await?;
            Ok(path)
        }
        .await;

        match written {
            Ok(path) => {
                debug!(path = %path.display(), "trace written");
                Some(path)
            }
            Err(e) => {
                warn!(scenario = name, error = %e, "failed to write trace");
                None
            }
        }
    }
}

async fn run_body(scenario: &dyn Scenario, ctx: &mut ScenarioContext) -> ProbeResult<()> {
    if scenario.installs_consent_handler() {
        install_consent_handler(ctx.page()).await?;
    }
    scenario.run(ctx).await?;
    ctx.finish()
}

fn slug(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect()
}
