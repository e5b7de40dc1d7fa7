//! Locator abstraction for element selection.
//!
//! A [`Locator`] is a lazy chain of [`LocatorStep`]s. It never holds element
//! references: every action or assertion re-resolves the chain against the
//! live DOM, so a locator built before navigation stays valid after it.
//!
//! # Resolution
//!
//! Each step maps the current element set to a new one:
//!
//! ```text
//! [document] --css("#form")--> [form] --role(spinbutton)--> [input] --nth(0)--> [input]
//! ```
//!
//! Scoping steps (`css`, `xpath`, `role`, `text`, `label`) search the
//! descendants of every element in the current set. Filtering steps
//! (`has_text`, `nth`) narrow the set in place.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default timeout for auto-waiting assertions (5 seconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Default polling interval for auto-waiting (100ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// ARIA roles understood by the role selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AriaRole {
    /// Site header landmark (`<header>` outside sectioning content)
    Banner,
    /// `<button>`, `input[type=button|submit|reset]`
    Button,
    /// `input[type=checkbox]`
    Checkbox,
    /// `<select>`
    Combobox,
    /// `<h1>`..`<h6>`
    Heading,
    /// `<a href>`
    Link,
    /// `<ul>`, `<ol>`
    List,
    /// `<li>`
    Listitem,
    /// `<nav>`
    Navigation,
    /// `input[type=search]`
    Searchbox,
    /// `input[type=number]`
    Spinbutton,
    /// Explicit `role="switch"`
    Switch,
    /// `input[type=text|email|tel|url]`, `<textarea>`
    Textbox,
}

impl AriaRole {
    /// Role name as used in the `role` attribute
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Banner => "banner",
            Self::Button => "button",
            Self::Checkbox => "checkbox",
            Self::Combobox => "combobox",
            Self::Heading => "heading",
            Self::Link => "link",
            Self::List => "list",
            Self::Listitem => "listitem",
            Self::Navigation => "navigation",
            Self::Searchbox => "searchbox",
            Self::Spinbutton => "spinbutton",
            Self::Switch => "switch",
            Self::Textbox => "textbox",
        }
    }

    /// Parse a role name
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let role = match name {
            "banner" => Self::Banner,
            "button" => Self::Button,
            "checkbox" => Self::Checkbox,
            "combobox" => Self::Combobox,
            "heading" => Self::Heading,
            "link" => Self::Link,
            "list" => Self::List,
            "listitem" => Self::Listitem,
            "navigation" => Self::Navigation,
            "searchbox" => Self::Searchbox,
            "spinbutton" => Self::Spinbutton,
            "switch" => Self::Switch,
            "textbox" => Self::Textbox,
            _ => return None,
        };
        Some(role)
    }
}

impl fmt::Display for AriaRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for role-based lookup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleOptions {
    /// Accessible name to match
    pub name: Option<String>,
    /// Match the name exactly instead of case-insensitive substring
    pub exact: bool,
    /// Heading level (only meaningful for [`AriaRole::Heading`])
    pub level: Option<u8>,
}

impl RoleOptions {
    /// Match any element with the role
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Match by accessible name
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Require an exact, case-sensitive name match
    #[must_use]
    pub const fn exact(mut self) -> Self {
        self.exact = true;
        self
    }

    /// Restrict headings to a level
    #[must_use]
    pub const fn level(mut self, level: u8) -> Self {
        self.level = Some(level);
        self
    }
}

/// One step of a locator chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LocatorStep {
    /// CSS selector, searched among descendants
    Css {
        /// Selector text
        selector: String,
    },
    /// XPath expression evaluated against each scope element
    XPath {
        /// Expression text
        expression: String,
    },
    /// ARIA role with optional accessible name
    Role {
        /// Role to match
        role: AriaRole,
        /// Accessible name
        name: Option<String>,
        /// Exact name match
        exact: bool,
        /// Heading level
        level: Option<u8>,
    },
    /// Smallest element whose text matches
    Text {
        /// Text to find
        text: String,
        /// Exact match
        exact: bool,
    },
    /// Form control associated with a label
    Label {
        /// Label text
        text: String,
        /// Exact match
        exact: bool,
    },
    /// Keep elements whose text content contains the given text
    HasText {
        /// Text to find
        text: String,
    },
    /// Keep the element at an index; negative counts from the end
    Nth {
        /// Index
        index: i32,
    },
}

impl LocatorStep {
    /// Whether this step narrows the current set instead of searching descendants
    #[must_use]
    pub const fn is_filter(&self) -> bool {
        matches!(self, Self::HasText { .. } | Self::Nth { .. })
    }
}

impl fmt::Display for LocatorStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css { selector } => write!(f, "locator({selector:?})"),
            Self::XPath { expression } => write!(f, "locator(xpath={expression:?})"),
            Self::Role {
                role,
                name,
                exact,
                level,
            } => {
                write!(f, "getByRole({:?}", role.as_str())?;
                let mut opts = Vec::new();
                if let Some(name) = name {
                    opts.push(format!("name: {name:?}"));
                }
                if *exact {
                    opts.push("exact: true".to_string());
                }
                if let Some(level) = level {
                    opts.push(format!("level: {level}"));
                }
                if !opts.is_empty() {
                    write!(f, ", {{ {} }}", opts.join(", "))?;
                }
                f.write_str(")")
            }
            Self::Text { text, .. } => write!(f, "getByText({text:?})"),
            Self::Label { text, .. } => write!(f, "getByLabel({text:?})"),
            Self::HasText { text } => write!(f, "filter(hasText={text:?})"),
            Self::Nth { index: 0 } => f.write_str("first()"),
            Self::Nth { index: -1 } => f.write_str("last()"),
            Self::Nth { index } => write!(f, "nth({index})"),
        }
    }
}

/// A lazy, re-resolving reference to elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    steps: Vec<LocatorStep>,
}

impl Locator {
    fn from_step(step: LocatorStep) -> Self {
        Self { steps: vec![step] }
    }

    fn then(&self, step: LocatorStep) -> Self {
        let mut steps = self.steps.clone();
        steps.push(step);
        Self { steps }
    }

    /// Locate by CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::from_step(LocatorStep::Css {
            selector: selector.into(),
        })
    }

    /// Locate by XPath expression
    #[must_use]
    pub fn xpath(expression: impl Into<String>) -> Self {
        Self::from_step(LocatorStep::XPath {
            expression: expression.into(),
        })
    }

    /// Locate by ARIA role
    #[must_use]
    pub fn role(role: AriaRole, options: RoleOptions) -> Self {
        Self::from_step(role_step(role, options))
    }

    /// Locate the smallest element containing text (case-insensitive)
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::from_step(LocatorStep::Text {
            text: text.into(),
            exact: false,
        })
    }

    /// Locate a form control by its label text
    #[must_use]
    pub fn label(text: impl Into<String>) -> Self {
        Self::from_step(LocatorStep::Label {
            text: text.into(),
            exact: false,
        })
    }

    /// Chain a CSS selector inside this locator
    #[must_use]
    pub fn locator(&self, selector: impl Into<String>) -> Self {
        self.then(LocatorStep::Css {
            selector: selector.into(),
        })
    }

    /// Chain a role lookup inside this locator
    #[must_use]
    pub fn get_by_role(&self, role: AriaRole, options: RoleOptions) -> Self {
        self.then(role_step(role, options))
    }

    /// Chain a text lookup inside this locator
    #[must_use]
    pub fn get_by_text(&self, text: impl Into<String>) -> Self {
        self.then(LocatorStep::Text {
            text: text.into(),
            exact: false,
        })
    }

    /// Chain a label lookup inside this locator
    #[must_use]
    pub fn get_by_label(&self, text: impl Into<String>) -> Self {
        self.then(LocatorStep::Label {
            text: text.into(),
            exact: false,
        })
    }

    /// Keep only matches whose text content contains `text`
    ///
    /// `page.locator("button").filter_has_text("Allow all")`
    #[must_use]
    pub fn filter_has_text(&self, text: impl Into<String>) -> Self {
        self.then(LocatorStep::HasText { text: text.into() })
    }

    /// First match
    #[must_use]
    pub fn first(&self) -> Self {
        self.nth(0)
    }

    /// Last match
    #[must_use]
    pub fn last(&self) -> Self {
        self.nth(-1)
    }

    /// Match at `index`; negative counts from the end
    #[must_use]
    pub fn nth(&self, index: i32) -> Self {
        self.then(LocatorStep::Nth { index })
    }

    /// The step chain
    #[must_use]
    pub fn steps(&self) -> &[LocatorStep] {
        &self.steps
    }

    /// Serialize the step chain for the in-page resolver
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.steps).unwrap_or_else(|_| "[]".to_string())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}

fn role_step(role: AriaRole, options: RoleOptions) -> LocatorStep {
    LocatorStep::Role {
        role,
        name: options.name,
        exact: options.exact,
        level: options.level,
    }
}

/// Collapse runs of whitespace and trim, as text matching does in the page
#[must_use]
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Name/text matching shared by role, text and label steps.
///
/// Non-exact matching is case-insensitive substring over normalised
/// whitespace; exact matching compares normalised text verbatim.
#[must_use]
pub fn text_matches(actual: &str, expected: &str, exact: bool) -> bool {
    let actual = normalize_whitespace(actual);
    let expected = normalize_whitespace(expected);
    if exact {
        actual == expected
    } else {
        actual.to_lowercase().contains(&expected.to_lowercase())
    }
}
