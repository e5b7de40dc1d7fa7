//! Page handle: one tab in its own browser context.
//!
//! Every action auto-waits. Before each attempt the registered locator
//! handlers get a chance to clear overlays, then the locator is resolved and
//! checked for actionability:
//!
//! ```text
//! run handlers -> query -> 0 matches?     retry until timeout
//!                       -> >1 matches?    StrictModeViolation (no retry)
//!                       -> not ready?     retry until timeout
//!                       -> act -> intercepted?  retry until timeout
//! ```

use crate::driver::{ElementAction, ElementState, PageDriver};
use crate::locator::{AriaRole, Locator, RoleOptions, DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_MS};
use crate::result::{ProbeError, ProbeResult};
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

// =============================================================================
// TIMEOUTS
// =============================================================================

/// Default action timeout (10 seconds)
pub const DEFAULT_ACTION_TIMEOUT_MS: u64 = 10_000;

/// Default navigation timeout (30 seconds)
pub const DEFAULT_NAVIGATION_TIMEOUT_MS: u64 = 30_000;

/// Bounds applied by a [`Page`] to its waiting operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageTimeouts {
    /// Auto-wait bound for actions
    pub action: Duration,
    /// Bound for `goto`
    pub navigation: Duration,
    /// Default bound for polling assertions
    pub expect: Duration,
    /// Delay between polls
    pub poll_interval: Duration,
}

impl Default for PageTimeouts {
    fn default() -> Self {
        Self {
            action: Duration::from_millis(DEFAULT_ACTION_TIMEOUT_MS),
            navigation: Duration::from_millis(DEFAULT_NAVIGATION_TIMEOUT_MS),
            expect: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

pub(crate) fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

// =============================================================================
// LOCATOR HANDLERS
// =============================================================================

/// Callback run when a handler's locator becomes visible
pub type LocatorHandler =
    Arc<dyn for<'a> Fn(&'a Page, &'a Locator) -> BoxFuture<'a, ProbeResult<()>> + Send + Sync>;

/// Options for [`Page::add_locator_handler`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandlerOptions {
    /// Remove the handler after this many invocations
    pub times: Option<u32>,
    /// Do not wait for the locator to become hidden after the handler runs
    pub no_wait_after: bool,
}

impl HandlerOptions {
    /// Run on every appearance and wait for the overlay to go away
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit the number of invocations
    #[must_use]
    pub const fn times(mut self, times: u32) -> Self {
        self.times = Some(times);
        self
    }

    /// Skip the hidden-wait after each invocation
    #[must_use]
    pub const fn no_wait_after(mut self) -> Self {
        self.no_wait_after = true;
        self
    }
}

#[derive(Clone)]
struct HandlerEntry {
    locator: Locator,
    handler: LocatorHandler,
    options: HandlerOptions,
    invocations: Arc<AtomicU32>,
}

impl HandlerEntry {
    fn exhausted(&self) -> bool {
        self.options
            .times
            .is_some_and(|t| self.invocations.load(Ordering::SeqCst) >= t)
    }
}

struct ReentryGuard<'a>(&'a AtomicBool);

impl Drop for ReentryGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// =============================================================================
// PAGE
// =============================================================================

/// A browser tab driven through a [`PageDriver`]
pub struct Page {
    driver: Arc<dyn PageDriver>,
    handlers: Mutex<Vec<HandlerEntry>>,
    in_handler: AtomicBool,
    timeouts: PageTimeouts,
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("driver", &self.driver)
            .field("timeouts", &self.timeouts)
            .finish_non_exhaustive()
    }
}

impl Page {
    /// Wrap a driver with default timeouts
    #[must_use]
    pub fn new(driver: Arc<dyn PageDriver>) -> Self {
        Self {
            driver,
            handlers: Mutex::new(Vec::new()),
            in_handler: AtomicBool::new(false),
            timeouts: PageTimeouts::default(),
        }
    }

    /// Replace the timeouts
    #[must_use]
    pub const fn with_timeouts(mut self, timeouts: PageTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Current timeouts
    #[must_use]
    pub const fn timeouts(&self) -> &PageTimeouts {
        &self.timeouts
    }

    /// Underlying driver
    #[must_use]
    pub fn driver(&self) -> &Arc<dyn PageDriver> {
        &self.driver
    }

    // -------------------------------------------------------------------------
    // Locator factories
    // -------------------------------------------------------------------------

    /// Locate by CSS selector
    #[must_use]
    pub fn locator(&self, selector: impl Into<String>) -> Locator {
        Locator::css(selector)
    }

    /// Locate by XPath expression
    #[must_use]
    pub fn locator_xpath(&self, expression: impl Into<String>) -> Locator {
        Locator::xpath(expression)
    }

    /// Locate by ARIA role
    #[must_use]
    pub fn get_by_role(&self, role: AriaRole, options: RoleOptions) -> Locator {
        Locator::role(role, options)
    }

    /// Locate by text
    #[must_use]
    pub fn get_by_text(&self, text: impl Into<String>) -> Locator {
        Locator::text(text)
    }

    /// Locate a form control by label
    #[must_use]
    pub fn get_by_label(&self, text: impl Into<String>) -> Locator {
        Locator::label(text)
    }

    // -------------------------------------------------------------------------
    // Navigation
    // -------------------------------------------------------------------------

    /// Navigate and wait for the load event, bounded by the navigation timeout
    pub async fn goto(&self, url: &str) -> ProbeResult<()> {
        debug!(url, "goto");
        match tokio::time::timeout(self.timeouts.navigation, self.driver.goto(url)).await {
            Ok(result) => result,
            Err(_) => Err(ProbeError::Timeout {
                operation: format!("goto {url}"),
                ms: millis(self.timeouts.navigation),
                reason: "load event not fired".to_string(),
            }),
        }
    }

    /// Current URL
    pub async fn url(&self) -> ProbeResult<String> {
        self.driver.url().await
    }

    // -------------------------------------------------------------------------
    // Actions
    // -------------------------------------------------------------------------

    /// Click the element
    pub async fn click(&self, locator: &Locator) -> ProbeResult<()> {
        self.perform(locator, ElementAction::Click).await
    }

    /// Hover the element
    pub async fn hover(&self, locator: &Locator) -> ProbeResult<()> {
        self.perform(locator, ElementAction::Hover).await
    }

    /// Focus the element
    pub async fn focus(&self, locator: &Locator) -> ProbeResult<()> {
        self.perform(locator, ElementAction::Focus).await
    }

    /// Replace the element's value
    pub async fn fill(&self, locator: &Locator, value: &str) -> ProbeResult<()> {
        self.perform(locator, ElementAction::Fill(value.to_string()))
            .await
    }

    /// Press a key on the element, e.g. `"Enter"`
    pub async fn press(&self, locator: &Locator, key: &str) -> ProbeResult<()> {
        self.perform(locator, ElementAction::Press(key.to_string()))
            .await
    }

    /// Select a `<select>` option by value or label
    pub async fn select_option(&self, locator: &Locator, option: &str) -> ProbeResult<()> {
        self.perform(locator, ElementAction::SelectOption(option.to_string()))
            .await
    }

    /// Sleep unconditionally.
    ///
    /// Prefer a polling assertion; fixed sleeps are either too short on a
    /// slow page or wasted time on a fast one.
    pub async fn wait_for_timeout(&self, duration: Duration) {
        debug!(ms = millis(duration), "wait_for_timeout");
        tokio::time::sleep(duration).await;
    }

    async fn perform(&self, locator: &Locator, action: ElementAction) -> ProbeResult<()> {
        let timeout = self.timeouts.action;
        let start = Instant::now();
        let mut attempts = 0_u32;

        loop {
            attempts += 1;
            self.run_locator_handlers().await?;

            let states = self.driver.query(locator).await?;
            let reason = match states.as_slice() {
                [] => "no element matches".to_string(),
                [state] => match not_ready(state, &action) {
                    Some(reason) => reason,
                    None => match self.driver.act(locator, &action).await {
                        Ok(()) => {
                            debug!(%locator, %action, attempts, "action performed");
                            return Ok(());
                        }
                        Err(e) if e.is_retryable() => e.to_string(),
                        Err(e) => return Err(e),
                    },
                },
                many => {
                    return Err(ProbeError::StrictModeViolation {
                        selector: locator.to_string(),
                        count: many.len(),
                    })
                }
            };

            if start.elapsed() >= timeout {
                return Err(ProbeError::Timeout {
                    operation: format!("{action} on {locator}"),
                    ms: millis(timeout),
                    reason,
                });
            }
            debug!(%locator, %action, %reason, "waiting for actionability");
            tokio::time::sleep(self.timeouts.poll_interval).await;
        }
    }

    // -------------------------------------------------------------------------
    // Instant queries
    // -------------------------------------------------------------------------

    /// Number of elements matching right now
    pub async fn count(&self, locator: &Locator) -> ProbeResult<usize> {
        Ok(self.driver.query(locator).await?.len())
    }

    /// Whether any match is visible right now
    pub async fn is_visible(&self, locator: &Locator) -> ProbeResult<bool> {
        Ok(self
            .driver
            .query(locator)
            .await?
            .iter()
            .any(|state| state.visible))
    }

    /// Evaluate JavaScript and deserialize the result
    pub async fn evaluate<T: DeserializeOwned>(&self, script: &str) -> ProbeResult<T> {
        let value = self.driver.evaluate(script).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// PNG screenshot of the viewport
    pub async fn screenshot(&self) -> ProbeResult<Vec<u8>> {
        self.driver.screenshot().await
    }

    /// Close the tab and its browser context
    pub async fn close(&self) -> ProbeResult<()> {
        self.handlers.lock().await.clear();
        self.driver.close().await
    }

    // -------------------------------------------------------------------------
    // Locator handlers
    // -------------------------------------------------------------------------

    /// Register a handler run whenever `locator` is visible before an action
    /// or assertion poll.
    ///
    /// Registering again for an equal locator replaces the previous handler.
    pub async fn add_locator_handler<F>(&self, locator: Locator, handler: F, options: HandlerOptions)
    where
        F: for<'a> Fn(&'a Page, &'a Locator) -> BoxFuture<'a, ProbeResult<()>> + Send + Sync + 'static,
    {
        let entry = HandlerEntry {
            locator,
            handler: Arc::new(handler),
            options,
            invocations: Arc::new(AtomicU32::new(0)),
        };
        let mut handlers = self.handlers.lock().await;
        handlers.retain(|h| h.locator != entry.locator);
        debug!(locator = %entry.locator, "locator handler registered");
        handlers.push(entry);
    }

    /// Unregister the handler for `locator`; returns whether one existed
    pub async fn remove_locator_handler(&self, locator: &Locator) -> bool {
        let mut handlers = self.handlers.lock().await;
        let before = handlers.len();
        handlers.retain(|h| &h.locator != locator);
        handlers.len() != before
    }

    /// Whether a handler is registered for `locator`
    pub async fn has_locator_handler(&self, locator: &Locator) -> bool {
        self.handlers
            .lock()
            .await
            .iter()
            .any(|h| &h.locator == locator)
    }

    /// Run every handler whose locator is currently visible.
    ///
    /// Handlers never trigger handlers: actions a handler performs skip this
    /// step.
    pub(crate) async fn run_locator_handlers(&self) -> ProbeResult<()> {
        if self.in_handler.load(Ordering::SeqCst) {
            return Ok(());
        }
        let snapshot: Vec<HandlerEntry> = self.handlers.lock().await.clone();
        if snapshot.is_empty() {
            return Ok(());
        }

        let mut any_exhausted = false;
        for entry in &snapshot {
            if entry.exhausted() || !self.is_visible(&entry.locator).await? {
                continue;
            }

            self.in_handler.store(true, Ordering::SeqCst);
            let guard = ReentryGuard(&self.in_handler);
            (entry.handler)(self, &entry.locator).await?;
            let n = entry.invocations.fetch_add(1, Ordering::SeqCst) + 1;
            debug!(locator = %entry.locator, invocations = n, "locator handler ran");

            if !entry.options.no_wait_after {
                self.wait_hidden_after_handler(&entry.locator).await?;
            }
            drop(guard);
            any_exhausted |= entry.exhausted();
        }

        if any_exhausted {
            self.handlers.lock().await.retain(|h| !h.exhausted());
        }
        Ok(())
    }

    async fn wait_hidden_after_handler(&self, locator: &Locator) -> ProbeResult<()> {
        let start = Instant::now();
        while self.is_visible(locator).await? {
            if start.elapsed() >= self.timeouts.expect {
                warn!(%locator, "locator handler ran but its target is still visible");
                return Ok(());
            }
            tokio::time::sleep(self.timeouts.poll_interval).await;
        }
        Ok(())
    }
}

fn not_ready(state: &ElementState, action: &ElementAction) -> Option<String> {
    if action.requires_visible() && !state.visible {
        return Some("element is not visible".to_string());
    }
    if action.requires_enabled() && !state.enabled {
        return Some("element is not enabled".to_string());
    }
    if action.requires_editable() && !state.editable {
        return Some("element is not editable".to_string());
    }
    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::driver::{MockDom, MockDriver, MockEffect, MockElement};

    fn fast() -> PageTimeouts {
        PageTimeouts {
            action: Duration::from_millis(300),
            navigation: Duration::from_millis(300),
            expect: Duration::from_millis(300),
            poll_interval: Duration::from_millis(10),
        }
    }

    fn page_over(dom: MockDom) -> (Arc<MockDriver>, Page) {
        let driver = Arc::new(MockDriver::new(dom));
        let page = Page::new(driver.clone()).with_timeouts(fast());
        (driver, page)
    }

    mod action_tests {
        use super::*;

        #[tokio::test]
        async fn test_click_waits_for_visibility() {
            let mut dom = MockDom::new();
            dom.add(MockElement::new("button").with_text("Search").revealed_after(3));
            let (driver, page) = page_over(dom);

            page.click(&page.locator("button")).await.unwrap();
            assert!(driver.was_called("click:"));
            assert!(driver.query_count() >= 3);
        }

        #[tokio::test]
        async fn test_strict_mode_violation_is_immediate() {
            let mut dom = MockDom::new();
            dom.add(MockElement::new("li").with_text("a"));
            dom.add(MockElement::new("li").with_text("b"));
            let (driver, page) = page_over(dom);

            let err = page.click(&page.locator("li")).await.unwrap_err();
            assert!(matches!(err, ProbeError::StrictModeViolation { count: 2, .. }));
            assert_eq!(driver.query_count(), 1);
        }

        #[tokio::test]
        async fn test_missing_element_times_out() {
            let (_, page) = page_over(MockDom::new());
            let err = page.click(&page.locator("#nope")).await.unwrap_err();
            assert!(err.is_timeout());
            assert!(err.to_string().contains("no element matches"));
        }

        #[tokio::test]
        async fn test_fill_requires_editable() {
            let mut dom = MockDom::new();
            dom.add(MockElement::new("input").readonly());
            let (_, page) = page_over(dom);
            let err = page.fill(&page.locator("input"), "x").await.unwrap_err();
            assert!(err.to_string().contains("not editable"));
        }

        #[tokio::test]
        async fn test_goto_updates_url() {
            let (_, page) = page_over(MockDom::new());
            page.goto("https://kmslh.com/").await.unwrap();
            assert_eq!(page.url().await.unwrap(), "https://kmslh.com/");
        }
    }

    mod handler_tests {
        use super::*;

        fn banner_dom() -> (MockDom, usize) {
            let mut dom = MockDom::new();
            let banner = dom.add(MockElement::new("div").with_id("cookie").blocking().revealed_after(2));
            dom.add_child(
                banner,
                MockElement::new("button")
                    .with_text("Allow all")
                    .on_click(MockEffect::Hide(banner)),
            );
            dom.add(MockElement::new("button").with_text("Search"));
            (dom, banner)
        }

        fn noop_handler<'a>(_page: &'a Page, _locator: &'a Locator) -> BoxFuture<'a, ProbeResult<()>> {
            Box::pin(async { Ok(()) })
        }

        #[tokio::test]
        async fn test_handler_clears_overlay_before_action() {
            let (dom, banner) = banner_dom();
            let (driver, page) = page_over(dom);
            let allow = Locator::css("button").filter_has_text("Allow all");
            page.add_locator_handler(
                allow,
                |page, locator| Box::pin(async move { page.click(locator).await }),
                HandlerOptions::new(),
            )
            .await;

            // Banner appears during the first poll and intercepts the click.
            let search = page.get_by_role(AriaRole::Button, RoleOptions::named("Search"));
            page.click(&search).await.unwrap();

            assert!(!driver.is_shown(banner));
            let clicks: Vec<_> = driver
                .history()
                .into_iter()
                .filter(|c| c.starts_with("click:"))
                .collect();
            assert_eq!(clicks.len(), 2);
        }

        #[tokio::test]
        async fn test_without_handler_overlay_times_out() {
            let (dom, _) = banner_dom();
            let (_, page) = page_over(dom);
            let search = page.get_by_role(AriaRole::Button, RoleOptions::named("Search"));
            page.count(&search).await.unwrap();
            page.count(&search).await.unwrap();

            let err = page.click(&search).await.unwrap_err();
            assert!(err.is_timeout());
            assert!(err.to_string().contains("covered by"));
        }

        #[tokio::test]
        async fn test_register_twice_keeps_one() {
            let (_, page) = page_over(MockDom::new());
            let allow = Locator::css("button").filter_has_text("Allow all");
            page.add_locator_handler(allow.clone(), noop_handler, HandlerOptions::new())
                .await;
            page.add_locator_handler(allow.clone(), noop_handler, HandlerOptions::new())
                .await;
            assert_eq!(page.handlers.lock().await.len(), 1);
            assert!(page.remove_locator_handler(&allow).await);
            assert!(!page.has_locator_handler(&allow).await);
        }

        #[tokio::test]
        async fn test_times_limits_invocations() {
            let mut dom = MockDom::new();
            dom.add(MockElement::new("div").with_id("promo"));
            let (_, page) = page_over(dom);
            let promo = page.locator("#promo");
            page.add_locator_handler(
                promo.clone(),
                noop_handler,
                HandlerOptions::new().times(1).no_wait_after(),
            )
            .await;

            page.run_locator_handlers().await.unwrap();
            assert!(!page.has_locator_handler(&promo).await);
        }

        #[tokio::test]
        async fn test_handler_still_visible_does_not_fail() {
            let mut dom = MockDom::new();
            dom.add(MockElement::new("div").with_id("sticky"));
            dom.add(MockElement::new("button").with_text("Go"));
            let (_, page) = page_over(dom);
            page.add_locator_handler(page.locator("#sticky"), noop_handler, HandlerOptions::new().times(1))
                .await;
            page.click(&page.locator("button")).await.unwrap();
        }
    }
}
