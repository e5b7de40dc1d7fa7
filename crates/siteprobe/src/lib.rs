//! siteprobe: browser-driven UI scenario harness
//!
//! Scenarios drive a real page through Playwright-style locators that wait
//! for elements to become actionable, and check it with polling assertions.
//! Cookie banners are handled reactively by a locator handler that fires
//! whenever the banner blocks an action.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    SITEPROBE Architecture                        │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Scenario   │    │ Page +     │    │ PageDriver │            │
//! │   │ Runner     │───►│ expect()   │───►│ (chromium  │            │
//! │   │ (retries)  │    │ helpers    │    │  or mock)  │            │
//! │   └────────────┘    └────────────┘    └────────────┘            │
//! │         │                                                        │
//! │         ▼                                                        │
//! │   SuiteReport (list / json / html) + traces                      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use siteprobe::{expect, helpers::fill_and_verify, AriaRole, Page, ProbeResult, RoleOptions};
//!
//! async fn search(page: &Page) -> ProbeResult<()> {
//!     let field = page.get_by_role(AriaRole::Searchbox, RoleOptions::named("Search"));
//!     fill_and_verify(page, &field, "leader").await?;
//!     expect(page, page.locator("h3").first()).to_be_visible().await
//! }
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

pub mod config;
pub mod driver;
mod expect;
pub mod helpers;
mod locator;
mod page;
pub mod reporter;
mod result;
pub mod runner;
pub mod scenario;

pub use config::{BrowserKind, ConfigFile, ReporterKind, RunConfig, TraceMode};
#[cfg(feature = "browser")]
pub use driver::{Browser, ChromiumDriver, LaunchOptions};
pub use driver::{
    ElementAction, ElementState, MockDom, MockDriver, MockEffect, MockElement, PageDriver,
};
pub use expect::{expect, expect_page, LocatorAssertions, PageAssertions, TextMatch};
pub use helpers::ComputedStyleSnapshot;
pub use locator::{
    normalize_whitespace, text_matches, AriaRole, Locator, LocatorStep, RoleOptions,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_MS,
};
pub use page::{
    HandlerOptions, LocatorHandler, Page, PageTimeouts, DEFAULT_ACTION_TIMEOUT_MS,
    DEFAULT_NAVIGATION_TIMEOUT_MS,
};
pub use reporter::{ScenarioOutcome, ScenarioStatus, SuiteReport};
pub use result::{ProbeError, ProbeResult};
pub use runner::{PageLauncher, RunEvent, ScenarioRunner};
pub use scenario::{Phase, Scenario, ScenarioContext, StepRecord};

/// Prelude for writing scenarios
pub mod prelude {
    pub use super::helpers::{
        check_toggle_default, expect_focused_outline, fill_and_verify, focused_element_style,
        install_consent_handler, ConsentBanner, ConsentState,
    };
    pub use super::{
        expect, expect_page, AriaRole, Locator, Page, Phase, ProbeError, ProbeResult,
        RoleOptions, Scenario, ScenarioContext, TextMatch,
    };
}
