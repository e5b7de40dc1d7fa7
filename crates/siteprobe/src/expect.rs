//! Polling assertions.
//!
//! ```ignore
//! expect(&page, page.locator("#savings-roi_calc__total"))
//!     .to_have_text("$404,452")
//!     .await?;
//! expect_page(&page).to_have_url("https://kmslh.com/news/").await?;
//! ```
//!
//! Every assertion re-resolves its locator on each poll and runs the page's
//! locator handlers first, so an overlay that appears mid-wait is dismissed
//! before the next check.

use crate::driver::ElementState;
use crate::locator::{normalize_whitespace, Locator};
use crate::page::{millis, Page};
use crate::result::{ProbeError, ProbeResult};
use regex::Regex;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

// =============================================================================
// TEXT MATCHING
// =============================================================================

/// Expected text for [`LocatorAssertions::to_have_text`]
#[derive(Debug, Clone)]
pub enum TextMatch {
    /// Whole text equals this after whitespace normalisation
    Exact(String),
    /// Whole text matches this pattern
    Pattern(Regex),
}

impl TextMatch {
    /// Compile a pattern, e.g. `(?i)leader`
    pub fn pattern(pattern: &str) -> ProbeResult<Self> {
        Regex::new(pattern)
            .map(Self::Pattern)
            .map_err(|e| ProbeError::config(format!("invalid text pattern {pattern:?}: {e}")))
    }

    /// Whether `actual` satisfies the expectation
    #[must_use]
    pub fn matches(&self, actual: &str) -> bool {
        let actual = normalize_whitespace(actual);
        match self {
            Self::Exact(expected) => actual == normalize_whitespace(expected),
            Self::Pattern(re) => re.is_match(&actual),
        }
    }
}

impl fmt::Display for TextMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(s) => write!(f, "{s:?}"),
            Self::Pattern(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}

impl From<&str> for TextMatch {
    fn from(s: &str) -> Self {
        Self::Exact(s.to_string())
    }
}

impl From<String> for TextMatch {
    fn from(s: String) -> Self {
        Self::Exact(s)
    }
}

impl From<Regex> for TextMatch {
    fn from(re: Regex) -> Self {
        Self::Pattern(re)
    }
}

// =============================================================================
// LOCATOR ASSERTIONS
// =============================================================================

/// Start a polling assertion on a locator
#[must_use]
pub fn expect(page: &Page, locator: Locator) -> LocatorAssertions<'_> {
    LocatorAssertions {
        page,
        locator,
        negate: false,
        timeout: page.timeouts().expect,
    }
}

/// Start a polling assertion on the page itself
#[must_use]
pub fn expect_page(page: &Page) -> PageAssertions<'_> {
    PageAssertions {
        page,
        timeout: page.timeouts().expect,
    }
}

/// One observation of the locator during a poll
type Observation = Option<(bool, String)>;

/// Polling assertions on a [`Locator`]
#[derive(Debug)]
pub struct LocatorAssertions<'p> {
    page: &'p Page,
    locator: Locator,
    negate: bool,
    timeout: Duration,
}

impl<'p> LocatorAssertions<'p> {
    /// Invert the next assertion
    #[must_use]
    pub const fn not(mut self) -> Self {
        self.negate = !self.negate;
        self
    }

    /// Override the timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Exactly one visible element
    pub async fn to_be_visible(&self) -> ProbeResult<()> {
        let negate = self.negate;
        self.poll("to_be_visible", "visible".to_string(), move |states| match states {
            [] if negate => Some((false, "no element".to_string())),
            [] => None,
            [state] => Some((state.visible, visibility(state))),
            _ => None,
        })
        .await
    }

    /// No element, or the element is not visible
    pub async fn to_be_hidden(&self) -> ProbeResult<()> {
        self.poll("to_be_hidden", "hidden".to_string(), |states| match states {
            [] => Some((true, "no element".to_string())),
            [state] => Some((!state.visible, visibility(state))),
            _ => None,
        })
        .await
    }

    /// Element is enabled
    pub async fn to_be_enabled(&self) -> ProbeResult<()> {
        self.poll_single("to_be_enabled", "enabled".to_string(), |s| {
            (s.enabled, if s.enabled { "enabled" } else { "disabled" }.to_string())
        })
        .await
    }

    /// Element accepts text input
    pub async fn to_be_editable(&self) -> ProbeResult<()> {
        self.poll_single("to_be_editable", "editable".to_string(), |s| {
            (s.editable, if s.editable { "editable" } else { "read-only" }.to_string())
        })
        .await
    }

    /// Checkbox or switch is checked
    pub async fn to_be_checked(&self) -> ProbeResult<()> {
        self.poll_single("to_be_checked", "checked".to_string(), |s| {
            let actual = match s.checked {
                Some(true) => "checked",
                Some(false) => "unchecked",
                None => "not checkable",
            };
            (s.checked == Some(true), actual.to_string())
        })
        .await
    }

    /// Form value equals `expected` byte-for-byte
    pub async fn to_have_value(&self, expected: &str) -> ProbeResult<()> {
        self.poll_single("to_have_value", format!("{expected:?}"), |s| match &s.value {
            Some(v) => (v == expected, format!("{v:?}")),
            None => (false, "<no value>".to_string()),
        })
        .await
    }

    /// Text equals (normalised) or matches a pattern
    pub async fn to_have_text(&self, expected: impl Into<TextMatch>) -> ProbeResult<()> {
        let expected = expected.into();
        self.poll_single("to_have_text", expected.to_string(), |s| {
            (expected.matches(&s.text), format!("{:?}", normalize_whitespace(&s.text)))
        })
        .await
    }

    /// Text contains `expected` after normalisation
    pub async fn to_contain_text(&self, expected: &str) -> ProbeResult<()> {
        let wanted = normalize_whitespace(expected);
        self.poll_single("to_contain_text", format!("{wanted:?}"), |s| {
            let actual = normalize_whitespace(&s.text);
            (actual.contains(&wanted), format!("{actual:?}"))
        })
        .await
    }

    /// Locator resolves to exactly `count` elements
    pub async fn to_have_count(&self, count: usize) -> ProbeResult<()> {
        let negate = self.negate;
        let start = Instant::now();
        loop {
            self.page.run_locator_handlers().await?;
            let actual = self.page.driver().query(&self.locator).await?.len();
            if (actual == count) != negate {
                return Ok(());
            }
            if start.elapsed() >= self.timeout {
                return Err(self.failure("to_have_count", count.to_string(), actual.to_string()));
            }
            tokio::time::sleep(self.page.timeouts().poll_interval).await;
        }
    }

    async fn poll_single<F>(&self, assertion: &str, expected: String, check: F) -> ProbeResult<()>
    where
        F: Fn(&ElementState) -> (bool, String),
    {
        self.poll(assertion, expected, |states| match states {
            [state] => Some(check(state)),
            _ => None,
        })
        .await
    }

    /// Poll until `observe` passes (or fails, when negated).
    ///
    /// `observe` returning `None` for an empty set means "element missing";
    /// more than one element is a strict-mode violation.
    async fn poll<F>(&self, assertion: &str, expected: String, observe: F) -> ProbeResult<()>
    where
        F: Fn(&[ElementState]) -> Observation,
    {
        let start = Instant::now();
        let mut polls = 0_u32;
        loop {
            polls += 1;
            self.page.run_locator_handlers().await?;
            let states = self.page.driver().query(&self.locator).await?;
            let observation = observe(&states);

            if observation.is_none() && states.len() > 1 {
                return Err(ProbeError::StrictModeViolation {
                    selector: self.locator.to_string(),
                    count: states.len(),
                });
            }
            if let Some((pass, _)) = &observation {
                if *pass != self.negate {
                    debug!(locator = %self.locator, assertion, polls, "assertion passed");
                    return Ok(());
                }
            }

            if start.elapsed() >= self.timeout {
                return Err(match observation {
                    None => ProbeError::ElementNotFound {
                        selector: self.locator.to_string(),
                        timeout_ms: millis(self.timeout),
                    },
                    Some((_, actual)) => self.failure(assertion, expected, actual),
                });
            }
            tokio::time::sleep(self.page.timeouts().poll_interval).await;
        }
    }

    fn failure(&self, assertion: &str, expected: String, actual: String) -> ProbeError {
        let (assertion, expected) = if self.negate {
            (format!("not.{assertion}"), format!("not {expected}"))
        } else {
            (assertion.to_string(), expected)
        };
        ProbeError::AssertionFailed {
            assertion,
            target: self.locator.to_string(),
            expected,
            actual,
            timeout_ms: millis(self.timeout),
        }
    }
}

fn visibility(state: &ElementState) -> String {
    if state.visible { "visible" } else { "hidden" }.to_string()
}

// =============================================================================
// PAGE ASSERTIONS
// =============================================================================

/// Polling assertions on a [`Page`]
#[derive(Debug)]
pub struct PageAssertions<'p> {
    page: &'p Page,
    timeout: Duration,
}

impl PageAssertions<'_> {
    /// Override the timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Current URL equals `expected`
    pub async fn to_have_url(&self, expected: &str) -> ProbeResult<()> {
        let start = Instant::now();
        loop {
            self.page.run_locator_handlers().await?;
            let actual = self.page.url().await?;
            if actual == expected {
                return Ok(());
            }
            if start.elapsed() >= self.timeout {
                return Err(ProbeError::AssertionFailed {
                    assertion: "to_have_url".to_string(),
                    target: "page".to_string(),
                    expected: expected.to_string(),
                    actual,
                    timeout_ms: millis(self.timeout),
                });
            }
            tokio::time::sleep(self.page.timeouts().poll_interval).await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::driver::{MockDom, MockDriver, MockEffect, MockElement};
    use crate::page::PageTimeouts;
    use std::sync::Arc;

    fn page_over(dom: MockDom) -> Page {
        Page::new(Arc::new(MockDriver::new(dom))).with_timeouts(PageTimeouts {
            action: Duration::from_millis(200),
            navigation: Duration::from_millis(200),
            expect: Duration::from_millis(200),
            poll_interval: Duration::from_millis(10),
        })
    }

    mod text_tests {
        use super::*;

        #[test]
        fn test_exact_normalises_whitespace() {
            assert!(TextMatch::from("$41,902").matches("  $41,902\n"));
            assert!(!TextMatch::from("$41,902").matches("$41,903"));
        }

        #[test]
        fn test_pattern_case_insensitive() {
            let m = TextMatch::from(Regex::new("(?i)leader").unwrap());
            assert!(m.matches("Thought Leadership in KM"));
            assert_eq!(m.to_string(), "/(?i)leader/");
        }

        #[test]
        fn test_bad_pattern_is_config_error() {
            let err = TextMatch::pattern("(leader").unwrap_err();
            assert!(matches!(err, ProbeError::ConfigError { .. }));
        }
    }

    mod locator_assertion_tests {
        use super::*;

        #[tokio::test]
        async fn test_visible_after_delay() {
            let mut dom = MockDom::new();
            dom.add(MockElement::new("div").with_id("acwp-toolbar").revealed_after(3));
            let page = page_over(dom);
            expect(&page, page.locator_xpath(r#"//*[@id="acwp-toolbar"]"#))
                .to_be_visible()
                .await
                .unwrap();
        }

        #[tokio::test]
        async fn test_missing_is_element_not_found() {
            let page = page_over(MockDom::new());
            let err = expect(&page, page.locator("#ghost"))
                .to_be_visible()
                .await
                .unwrap_err();
            assert!(matches!(err, ProbeError::ElementNotFound { timeout_ms: 200, .. }));
        }

        #[tokio::test]
        async fn test_hidden_passes_on_missing() {
            let page = page_over(MockDom::new());
            expect(&page, page.locator("#ghost")).to_be_hidden().await.unwrap();
            expect(&page, page.locator("#ghost"))
                .not()
                .to_be_visible()
                .await
                .unwrap();
        }

        #[tokio::test]
        async fn test_value_mismatch_reports_both_sides() {
            let mut dom = MockDom::new();
            dom.add(MockElement::new("input").with_value("5000"));
            let page = page_over(dom);
            let err = expect(&page, page.locator("input"))
                .to_have_value("50000")
                .await
                .unwrap_err();
            let msg = err.to_string();
            assert!(msg.contains(r#""50000""#));
            assert!(msg.contains(r#""5000""#));
            assert!(msg.contains("200ms"));
        }

        #[tokio::test]
        async fn test_not_checked() {
            let mut dom = MockDom::new();
            dom.add(MockElement::new("input").with_type("checkbox"));
            let page = page_over(dom);
            expect(&page, page.locator("input")).not().to_be_checked().await.unwrap();
            let err = expect(&page, page.locator("input"))
                .to_be_checked()
                .await
                .unwrap_err();
            assert!(err.to_string().contains("unchecked"));
        }

        #[tokio::test]
        async fn test_text_changes_after_click() {
            let mut dom = MockDom::new();
            let total = dom.add(MockElement::new("span").with_id("savings-roi_calc__total").with_text("$0"));
            dom.add(
                MockElement::new("button")
                    .with_text("Calculate")
                    .on_click(MockEffect::SetText(total, "$404,452".into())),
            );
            let page = page_over(dom);
            page.click(&page.locator("button")).await.unwrap();
            expect(&page, page.locator("#savings-roi_calc__total"))
                .to_have_text("$404,452")
                .await
                .unwrap();
            expect(&page, page.locator("#savings-roi_calc__total"))
                .to_contain_text("404")
                .await
                .unwrap();
        }

        #[tokio::test]
        async fn test_count_and_strictness() {
            let mut dom = MockDom::new();
            let list = dom.add(MockElement::new("ul"));
            dom.add_child(list, MockElement::new("li").with_text("Failed to validate Captcha. Please try again."));
            dom.add_child(list, MockElement::new("li").with_text("Thanks"));
            let page = page_over(dom);

            let items = page.locator("li");
            expect(&page, items.clone()).to_have_count(2).await.unwrap();
            let err = expect(&page, items.clone()).to_be_visible().await.unwrap_err();
            assert!(matches!(err, ProbeError::StrictModeViolation { count: 2, .. }));

            let captcha = items.filter_has_text("Failed to validate Captcha. Please try again.");
            expect(&page, captcha.clone()).to_have_count(1).await.unwrap();
            expect(&page, captcha).to_be_visible().await.unwrap();
        }
    }

    mod page_assertion_tests {
        use super::*;

        #[tokio::test]
        async fn test_url_after_navigation() {
            let mut dom = MockDom::new();
            dom.add(MockElement::new("a").with_href("https://kmslh.com/news/").with_text("News"));
            let page = page_over(dom);
            page.click(&page.get_by_text("News")).await.unwrap();
            expect_page(&page)
                .to_have_url("https://kmslh.com/news/")
                .await
                .unwrap();
        }

        #[tokio::test]
        async fn test_url_mismatch() {
            let page = page_over(MockDom::new());
            let err = expect_page(&page)
                .with_timeout(Duration::from_millis(30))
                .to_have_url("https://kmslh.com/")
                .await
                .unwrap_err();
            assert!(err.to_string().contains("about:blank"));
        }
    }
}
