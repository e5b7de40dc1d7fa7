//! Scenario runner behaviour with an in-memory page launcher.

#![allow(clippy::unwrap_used)]

use async_trait::async_trait;
use siteprobe::runner::TRACE_DIR;
use siteprobe::{
    expect_page, MockDom, MockDriver, MockEffect, MockElement, PageDriver, PageLauncher, Phase,
    ProbeError, ProbeResult, RunConfig, RunEvent, Scenario, ScenarioContext, ScenarioRunner,
    ScenarioStatus, TraceMode,
};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// =============================================================================
// Fixtures
// =============================================================================

/// Hands out a fresh mock page per attempt and keeps them for inspection
#[derive(Default)]
struct MockLauncher {
    with_banner: bool,
    pages: Mutex<Vec<Arc<MockDriver>>>,
    fail_launch: bool,
}

impl MockLauncher {
    fn pages(&self) -> Vec<Arc<MockDriver>> {
        self.pages.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageLauncher for MockLauncher {
    async fn new_page(&self) -> ProbeResult<Arc<dyn PageDriver>> {
        if self.fail_launch {
            return Err(ProbeError::BrowserLaunchError {
                message: "chromium not found".into(),
            });
        }
        let mut dom = MockDom::new();
        if self.with_banner {
            let banner = dom.add(MockElement::new("div").with_id("cookie-banner").blocking());
            dom.add_child(
                banner,
                MockElement::new("button")
                    .with_text("Allow all")
                    .on_click(MockEffect::Hide(banner)),
            );
        }
        dom.add(
            MockElement::new("a")
                .with_text("News")
                .with_href("https://kmslh.com/news/"),
        );
        let driver = Arc::new(MockDriver::new(dom));
        self.pages.lock().unwrap().push(driver.clone());
        let page: Arc<dyn PageDriver> = driver;
        Ok(page)
    }
}

fn config(dir: &Path) -> RunConfig {
    RunConfig {
        action_timeout_ms: 300,
        expect_timeout_ms: 300,
        navigation_timeout_ms: 300,
        scenario_timeout_ms: 2_000,
        output_dir: dir.to_path_buf(),
        trace: TraceMode::Off,
        ..RunConfig::default()
    }
}

/// Opens News from the home page
struct NewsScenario;

#[async_trait]
impl Scenario for NewsScenario {
    fn name(&self) -> &str {
        "news"
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> ProbeResult<()> {
        let home = ctx.url("/");
        ctx.navigate(&home).await?;
        let page = ctx.interact("open News")?;
        page.click(&page.get_by_text("News")).await?;
        let news = ctx.url("/news/");
        let page = ctx.check("on the news page")?;
        expect_page(page).to_have_url(&news).await
    }
}

/// Fails its first `failures` attempts in the assert phase
struct FlakyScenario {
    failures: AtomicU32,
}

#[async_trait]
impl Scenario for FlakyScenario {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> ProbeResult<()> {
        let home = ctx.url("/");
        ctx.navigate(&home).await?;
        ctx.check("counter")?;
        let left = self.failures.load(Ordering::SeqCst);
        if left > 0 {
            self.failures.store(left - 1, Ordering::SeqCst);
            return Err(ProbeError::AssertionFailed {
                assertion: "to_have_text".into(),
                target: "locator(\"#total\")".into(),
                expected: "\"$404,452\"".into(),
                actual: "\"$0\"".into(),
                timeout_ms: 300,
            });
        }
        Ok(())
    }
}

/// Never finishes
struct HangingScenario;

#[async_trait]
impl Scenario for HangingScenario {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> ProbeResult<()> {
        let home = ctx.url("/");
        ctx.navigate(&home).await?;
        ctx.interact("wait forever")?
            .wait_for_timeout(Duration::from_secs(3600))
            .await;
        Ok(())
    }
}

/// Clicks without installing the consent handler
struct NoHandlerScenario;

#[async_trait]
impl Scenario for NoHandlerScenario {
    fn name(&self) -> &str {
        "no handler"
    }

    fn installs_consent_handler(&self) -> bool {
        false
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> ProbeResult<()> {
        let home = ctx.url("/");
        ctx.navigate(&home).await?;
        let page = ctx.interact("open News")?;
        page.click(&page.get_by_text("News")).await
    }
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_passing_scenario_reaches_done() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = Arc::new(MockLauncher::default());
    let runner = ScenarioRunner::new(config(dir.path()), launcher.clone());

    let report = runner.run(&[&NewsScenario]).await;

    assert!(report.all_passed());
    let outcome = &report.outcomes[0];
    assert_eq!(outcome.final_phase, Phase::Done);
    assert_eq!(outcome.attempts, 1);
    assert!(launcher.pages()[0].is_closed());
}

#[tokio::test]
async fn test_consent_handler_installed_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = Arc::new(MockLauncher {
        with_banner: true,
        ..MockLauncher::default()
    });
    let runner = ScenarioRunner::new(config(dir.path()), launcher.clone());

    let report = runner.run(&[&NewsScenario, &NoHandlerScenario]).await;

    assert!(report.outcomes[0].status.is_passed());
    let blocked = &report.outcomes[1];
    assert_eq!(blocked.status, ScenarioStatus::Failed);
    assert_eq!(blocked.failed_at, Some(Phase::Interact));
    assert!(blocked.error.as_deref().unwrap().contains("cookie-banner"));
}

#[tokio::test]
async fn test_retry_reruns_only_failed_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = Arc::new(MockLauncher::default());
    let runner = ScenarioRunner::new(
        RunConfig {
            retries: 2,
            ..config(dir.path())
        },
        launcher.clone(),
    );
    let flaky = FlakyScenario {
        failures: AtomicU32::new(1),
    };

    let mut started = Vec::new();
    let report = runner
        .run_with(&[&NewsScenario, &flaky], |event| {
            if let RunEvent::AttemptStarted { name, attempt } = event {
                started.push(format!("{name}#{attempt}"));
            }
        })
        .await;

    assert_eq!(started, vec!["news#1", "flaky#1", "flaky#2"]);
    assert!(report.all_passed());
    assert_eq!(report.flaky_count(), 1);
    assert_eq!(launcher.pages().len(), 3);
    assert!(launcher.pages().iter().all(|p| p.is_closed()));
}

#[tokio::test]
async fn test_retries_exhausted_reports_last_failure() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ScenarioRunner::new(
        RunConfig {
            retries: 1,
            ..config(dir.path())
        },
        Arc::new(MockLauncher::default()),
    );
    let flaky = FlakyScenario {
        failures: AtomicU32::new(5),
    };

    let report = runner.run(&[&flaky, &NewsScenario]).await;

    let failed = &report.outcomes[0];
    assert_eq!(failed.status, ScenarioStatus::Failed);
    assert_eq!(failed.attempts, 2);
    assert_eq!(failed.failed_at, Some(Phase::Assert));
    assert!(report.outcomes[1].status.is_passed());
    assert_eq!(report.failed_count(), 1);
}

#[tokio::test]
async fn test_scenario_timeout_is_timed_out() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = Arc::new(MockLauncher::default());
    let runner = ScenarioRunner::new(
        RunConfig {
            scenario_timeout_ms: 100,
            ..config(dir.path())
        },
        launcher.clone(),
    );

    let report = runner.run(&[&HangingScenario]).await;

    let outcome = &report.outcomes[0];
    assert_eq!(outcome.status, ScenarioStatus::TimedOut);
    assert_eq!(outcome.failed_at, Some(Phase::Interact));
    assert!(outcome.error.as_deref().unwrap().contains("scenario hanging"));
    assert!(launcher.pages()[0].is_closed());
}

#[tokio::test]
async fn test_launch_failure_fails_at_start() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ScenarioRunner::new(
        config(dir.path()),
        Arc::new(MockLauncher {
            fail_launch: true,
            ..MockLauncher::default()
        }),
    );

    let report = runner.run(&[&NewsScenario]).await;

    assert_eq!(report.outcomes[0].failed_at, Some(Phase::Start));
    assert!(report.outcomes[0]
        .error
        .as_deref()
        .unwrap()
        .contains("chromium not found"));
}

#[tokio::test]
async fn test_trace_on_first_retry_only() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ScenarioRunner::new(
        RunConfig {
            retries: 2,
            trace: TraceMode::OnFirstRetry,
            ..config(dir.path())
        },
        Arc::new(MockLauncher::default()),
    );
    let flaky = FlakyScenario {
        failures: AtomicU32::new(2),
    };

    let report = runner.run(&[&flaky]).await;

    let outcome = &report.outcomes[0];
    assert_eq!(outcome.attempts, 3);
    assert_eq!(outcome.traces.len(), 1);
    let trace = &outcome.traces[0];
    assert!(trace.starts_with(dir.path().join(TRACE_DIR)));
    assert!(trace.ends_with("flaky-attempt2.json"));
    let body = std::fs::read_to_string(trace).unwrap();
    assert!(body.contains("\"failed_at\": \"assert\""));
}

#[tokio::test]
async fn test_trace_on_records_every_attempt() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ScenarioRunner::new(
        RunConfig {
            trace: TraceMode::On,
            ..config(dir.path())
        },
        Arc::new(MockLauncher::default()),
    );

    let report = runner.run(&[&NewsScenario]).await;

    assert_eq!(report.outcomes[0].traces.len(), 1);
    assert!(report.outcomes[0].traces[0].exists());
}
