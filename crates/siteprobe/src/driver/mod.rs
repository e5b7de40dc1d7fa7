//! PageDriver - Abstract Browser Automation Trait
//!
//! The harness talks to a browser only through [`PageDriver`]. Everything
//! above this seam (auto-waiting, strictness, locator handlers, polling
//! assertions) is driver-agnostic and is exercised in tests with
//! [`MockDriver`].
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Page (auto-wait, handlers)   expect (polling assertions)    │
//! ├──────────────────────────────────────────────────────────────┤
//! │  PageDriver (query / act / evaluate / focused_style)         │
//! ├──────────────────────────────┬───────────────────────────────┤
//! │  ChromiumDriver (CDP)        │  MockDriver (in-memory DOM)   │
//! └──────────────────────────────┴───────────────────────────────┘
//! ```

#[cfg(feature = "browser")]
mod chromium;
mod mock;

#[cfg(feature = "browser")]
pub use chromium::{Browser, ChromiumDriver, LaunchOptions};
pub use mock::{ElementId, MockDom, MockDriver, MockEffect, MockElement};

use crate::helpers::style::ComputedStyleSnapshot;
use crate::locator::Locator;
use crate::result::ProbeResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// In-page locator resolver injected by DOM-backed drivers
pub const RESOLVER_JS: &str = include_str!("resolver.js");

/// Snapshot of one matched element, taken during a single resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementState {
    /// Lowercase tag name
    pub tag: String,
    /// Rendered with a non-empty box and not `visibility: hidden`
    pub visible: bool,
    /// Not disabled (natively or via `aria-disabled`)
    pub enabled: bool,
    /// Accepts text input (enabled and not read-only)
    pub editable: bool,
    /// Checked state for checkboxes, radios and switches
    pub checked: Option<bool>,
    /// Text content
    pub text: String,
    /// Current value of form controls
    pub value: Option<String>,
}

impl ElementState {
    /// Short description used in failure messages
    #[must_use]
    pub fn describe(&self) -> String {
        format!(
            "<{}> visible={} enabled={} editable={} checked={:?}",
            self.tag, self.visible, self.enabled, self.editable, self.checked
        )
    }
}

/// Actions that can be performed on a located element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementAction {
    /// Click the element centre
    Click,
    /// Move the mouse over the element
    Hover,
    /// Move keyboard focus to the element
    Focus,
    /// Replace the element's value
    Fill(String),
    /// Press a key while the element is focused
    Press(String),
    /// Select an option of a `<select>` by value or label
    SelectOption(String),
}

impl ElementAction {
    /// Action name for logs and errors
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::Hover => "hover",
            Self::Focus => "focus",
            Self::Fill(_) => "fill",
            Self::Press(_) => "press",
            Self::SelectOption(_) => "select_option",
        }
    }

    /// The element must be visible before acting
    #[must_use]
    pub const fn requires_visible(&self) -> bool {
        matches!(
            self,
            Self::Click | Self::Hover | Self::Fill(_) | Self::SelectOption(_)
        )
    }

    /// The element must be enabled before acting
    #[must_use]
    pub const fn requires_enabled(&self) -> bool {
        matches!(self, Self::Click | Self::Fill(_) | Self::SelectOption(_))
    }

    /// The element must be editable before acting
    #[must_use]
    pub const fn requires_editable(&self) -> bool {
        matches!(self, Self::Fill(_))
    }

    /// The action dispatches a pointer event that another element may intercept
    #[must_use]
    pub const fn is_pointer(&self) -> bool {
        matches!(self, Self::Click | Self::Hover)
    }
}

impl fmt::Display for ElementAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fill(value) => write!(f, "fill({value:?})"),
            Self::Press(key) => write!(f, "press({key:?})"),
            Self::SelectOption(option) => write!(f, "select_option({option:?})"),
            other => f.write_str(other.name()),
        }
    }
}

/// Abstract driver trait for browser automation
///
/// # Implementations
///
/// - `ChromiumDriver` - chromiumoxide over CDP (`browser` feature)
/// - [`MockDriver`] - in-memory DOM for unit testing
#[async_trait]
pub trait PageDriver: Send + Sync + fmt::Debug {
    /// Navigate to URL and wait for the load event
    async fn goto(&self, url: &str) -> ProbeResult<()>;

    /// Current URL
    async fn url(&self) -> ProbeResult<String>;

    /// Resolve a locator once and snapshot every match in DOM order
    async fn query(&self, locator: &Locator) -> ProbeResult<Vec<ElementState>>;

    /// Perform an action on the single element a locator resolves to.
    ///
    /// Returns a retryable error when the element is momentarily not
    /// actionable or covered by another element.
    async fn act(&self, locator: &Locator, action: &ElementAction) -> ProbeResult<()>;

    /// Computed style of `document.activeElement` (body when nothing is focused)
    async fn focused_style(&self) -> ProbeResult<ComputedStyleSnapshot>;

    /// Evaluate a JavaScript expression in page context
    async fn evaluate(&self, script: &str) -> ProbeResult<serde_json::Value>;

    /// PNG screenshot of the viewport
    async fn screenshot(&self) -> ProbeResult<Vec<u8>>;

    /// Close the page and release its browser context
    async fn close(&self) -> ProbeResult<()>;
}
