//! Style Inspector: computed CSS of the focused element.

use crate::locator::Locator;
use crate::page::{millis, Page};
use crate::result::{ProbeError, ProbeResult};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::debug;

/// Computed style values captured at one instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputedStyleSnapshot {
    /// `outline` shorthand as computed by the browser
    pub outline: String,
    /// `text-decoration` shorthand as computed by the browser
    pub text_decoration: String,
}

impl ComputedStyleSnapshot {
    /// Create a snapshot from raw values
    #[must_use]
    pub fn new(outline: impl Into<String>, text_decoration: impl Into<String>) -> Self {
        Self {
            outline: outline.into(),
            text_decoration: text_decoration.into(),
        }
    }

    /// Whether the outline is drawn at all
    #[must_use]
    pub fn has_outline(&self) -> bool {
        !self.outline.split_whitespace().any(|part| part == "none")
    }
}

impl Default for ComputedStyleSnapshot {
    fn default() -> Self {
        Self::new("none", "none")
    }
}

/// Capture the computed style of `document.activeElement`.
///
/// Does not move focus; the caller focuses the element of interest first.
/// When nothing is focused the body's computed style is returned.
pub async fn focused_element_style(page: &Page) -> ProbeResult<ComputedStyleSnapshot> {
    let snapshot = page.driver().focused_style().await?;
    debug!(
        outline = %snapshot.outline,
        text_decoration = %snapshot.text_decoration,
        "captured focused style"
    );
    Ok(snapshot)
}

/// Re-focus `target` until its computed outline equals `expected`.
///
/// Polls within the page's expect timeout.
pub async fn expect_focused_outline(
    page: &Page,
    target: &Locator,
    expected: &str,
) -> ProbeResult<()> {
    let timeout = page.timeouts().expect;
    let start = Instant::now();
    loop {
        page.focus(target).await?;
        let actual = focused_element_style(page).await?.outline;
        if actual == expected {
            return Ok(());
        }
        if start.elapsed() >= timeout {
            return Err(ProbeError::AssertionFailed {
                assertion: "focused_outline".to_string(),
                target: target.to_string(),
                expected: format!("{expected:?}"),
                actual: format!("{actual:?}"),
                timeout_ms: millis(timeout),
            });
        }
        tokio::time::sleep(page.timeouts().poll_interval).await;
    }
}
