//! Scenario trait and per-scenario context.
//!
//! A scenario walks a small phase machine while it runs:
//!
//! ```text
//! Start -> Navigate -> [DismissConsent] -> Interact/Assert ... -> Assert -> Done
//!                               ^                  |
//!                               +------------------+   (polling consent re-check)
//! ```
//!
//! Interact and Assert alternate freely. The only way back is from
//! Interact/Assert to DismissConsent, which must be followed by Interact.
//! Any failed step records the phase it failed in and ends the scenario.

use crate::helpers::consent::ConsentState;
use crate::page::{millis, Page};
use crate::result::{ProbeError, ProbeResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

// =============================================================================
// PHASES
// =============================================================================

/// Phase of a running scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Page opened, nothing done yet
    Start,
    /// Loading the entry URL
    Navigate,
    /// Dismissing the consent banner by polling
    DismissConsent,
    /// Driving the page
    Interact,
    /// Checking expectations
    Assert,
    /// Finished successfully
    Done,
}

impl Phase {
    /// Whether `self -> next` is a legal transition
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        use Phase::{Assert, DismissConsent, Done, Interact, Navigate, Start};
        matches!(
            (self, next),
            (Start, Navigate)
                | (Navigate, DismissConsent | Interact | Assert)
                | (DismissConsent, Interact)
                | (Interact, Interact | Assert | DismissConsent)
                | (Assert, Assert | Interact | DismissConsent | Done)
        )
    }

    /// Lowercase name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Navigate => "navigate",
            Self::DismissConsent => "dismiss_consent",
            Self::Interact => "interact",
            Self::Assert => "assert",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a scenario's step log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Phase the step ran in
    pub phase: Phase,
    /// What the step did
    pub description: String,
    /// Milliseconds since the scenario started
    pub elapsed_ms: u64,
}

// =============================================================================
// CONTEXT
// =============================================================================

/// Everything a scenario touches while it runs
#[derive(Debug)]
pub struct ScenarioContext {
    page: Page,
    base_url: String,
    consent: ConsentState,
    phase: Phase,
    failed_at: Option<Phase>,
    steps: Vec<StepRecord>,
    started: Instant,
}

impl ScenarioContext {
    /// Fresh context in [`Phase::Start`]
    #[must_use]
    pub fn new(page: Page, base_url: impl Into<String>) -> Self {
        Self {
            page,
            base_url: base_url.into(),
            consent: ConsentState::new(),
            phase: Phase::Start,
            failed_at: None,
            steps: Vec::new(),
            started: Instant::now(),
        }
    }

    /// The page under test
    #[must_use]
    pub const fn page(&self) -> &Page {
        &self.page
    }

    /// Target site root, e.g. `https://kmslh.com/`
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL of `path` under the base URL
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Consent tracking for the polling strategy
    #[must_use]
    pub const fn consent(&self) -> &ConsentState {
        &self.consent
    }

    /// Current phase
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Phase a failed step ran in
    #[must_use]
    pub const fn failed_at(&self) -> Option<Phase> {
        self.failed_at
    }

    /// Step log so far
    #[must_use]
    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    /// Move to `next`, rejecting illegal transitions
    pub fn transition(&mut self, next: Phase) -> ProbeResult<()> {
        if self.failed_at.is_some() {
            return Err(ProbeError::invalid_state(format!(
                "scenario already failed in {}",
                self.phase
            )));
        }
        if !self.phase.can_transition_to(next) {
            return Err(ProbeError::invalid_state(format!(
                "illegal phase transition {} -> {next}",
                self.phase
            )));
        }
        debug!(from = %self.phase, to = %next, "phase transition");
        self.phase = next;
        Ok(())
    }

    fn record(&mut self, description: impl Into<String>) {
        let description = description.into();
        debug!(phase = %self.phase, step = %description, "step");
        self.steps.push(StepRecord {
            phase: self.phase,
            description,
            elapsed_ms: millis(self.started.elapsed()),
        });
    }

    fn enter(&mut self, phase: Phase, description: impl Into<String>) -> ProbeResult<&Page> {
        self.transition(phase)?;
        self.record(description);
        Ok(&self.page)
    }

    /// Enter [`Phase::Navigate`] and load `url`
    pub async fn navigate(&mut self, url: &str) -> ProbeResult<()> {
        self.transition(Phase::Navigate)?;
        self.record(format!("goto {url}"));
        self.page.goto(url).await
    }

    /// Enter [`Phase::DismissConsent`] and run the polling strategy.
    ///
    /// Skips the sleep when the banner was already accepted.
    pub async fn dismiss_consent(&mut self, wait: Duration) -> ProbeResult<bool> {
        self.transition(Phase::DismissConsent)?;
        self.record("dismiss consent banner");
        self.consent.accept_if_needed(&self.page, wait).await
    }

    /// Log an interaction step and return the page to perform it on
    pub fn interact(&mut self, description: impl Into<String>) -> ProbeResult<&Page> {
        self.enter(Phase::Interact, description)
    }

    /// Log an assertion step and return the page to check it on
    pub fn check(&mut self, description: impl Into<String>) -> ProbeResult<&Page> {
        self.enter(Phase::Assert, description)
    }

    /// Enter [`Phase::Done`]
    pub fn finish(&mut self) -> ProbeResult<()> {
        self.transition(Phase::Done)?;
        self.record("done");
        Ok(())
    }

    /// Record a failure in the current phase
    pub fn fail(&mut self, error: &ProbeError) {
        if self.failed_at.is_none() {
            self.failed_at = Some(self.phase);
            self.record(format!("failed: {error}"));
        }
    }

    /// Give the page back for cleanup
    #[must_use]
    pub fn into_page(self) -> Page {
        self.page
    }
}

// =============================================================================
// SCENARIO
// =============================================================================

/// A named end-to-end flow run on a fresh page
#[async_trait]
pub trait Scenario: Send + Sync {
    /// Unique scenario name
    fn name(&self) -> &str;

    /// Whether the runner installs the reactive consent handler first
    fn installs_consent_handler(&self) -> bool {
        true
    }

    /// Drive the page through its phases; the runner calls
    /// [`ScenarioContext::finish`] afterwards
    async fn run(&self, ctx: &mut ScenarioContext) -> ProbeResult<()>;
}
