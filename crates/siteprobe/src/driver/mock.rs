//! In-memory DOM driver for unit testing.
//!
//! `MockDriver` resolves the same [`LocatorStep`] chains the in-page resolver
//! does, against a small element tree built with [`MockDom`]. Click and key
//! effects, delayed appearance and pointer-blocking overlays are enough to
//! model cookie banners, toggles and form flows without a browser.

use super::{ElementAction, ElementState, PageDriver};
use crate::helpers::style::ComputedStyleSnapshot;
use crate::locator::{normalize_whitespace, text_matches, AriaRole, Locator, LocatorStep};
use crate::result::{ProbeError, ProbeResult};
use async_trait::async_trait;
use regex::Regex;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Index of an element inside a [`MockDom`]
pub type ElementId = usize;

/// Side effect applied when a mock element is clicked or receives Enter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEffect {
    /// Make an element visible
    Show(ElementId),
    /// Hide an element (and cancel any pending reveal)
    Hide(ElementId),
    /// Change the page URL
    Navigate(String),
    /// Replace an element's own text
    SetText(ElementId, String),
    /// Swap an element's style with its alternate style
    ToggleStyle(ElementId),
    /// Flip a checkbox
    ToggleChecked(ElementId),
}

/// One element of the mock DOM
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockElement {
    /// Lowercase tag name
    pub tag: String,
    /// `id` attribute
    pub id: Option<String>,
    /// Class list
    pub classes: Vec<String>,
    /// `type` attribute of inputs
    pub input_type: Option<String>,
    /// Explicit `role` attribute
    pub role: Option<AriaRole>,
    /// `aria-label` attribute
    pub aria_label: Option<String>,
    /// Text of an associated `<label>`
    pub label: Option<String>,
    /// Own text (children contribute their own)
    pub text: String,
    /// `href` of links
    pub href: Option<String>,
    /// Rendered
    pub visible: bool,
    /// Not disabled
    pub enabled: bool,
    /// Not read-only
    pub writable: bool,
    /// Checked state
    pub checked: Option<bool>,
    /// Form value
    pub value: Option<String>,
    /// `<option>` values of a select
    pub options: Vec<String>,
    /// Computed style
    pub style: ComputedStyleSnapshot,
    /// Style swapped in by [`MockEffect::ToggleStyle`]
    pub alternate_style: Option<ComputedStyleSnapshot>,
    /// Parent element
    pub parent: Option<ElementId>,
    /// Effects of a click
    pub on_click: Vec<MockEffect>,
    /// Effects of pressing Enter
    pub on_enter: Vec<MockEffect>,
    /// Becomes visible once this many queries have run
    pub reveal_after_queries: Option<usize>,
    /// Covers the page and intercepts pointer events while visible
    pub blocks_pointer: bool,
}

impl MockElement {
    /// Create a visible, enabled element
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        let tag = tag.into().to_lowercase();
        let value = matches!(tag.as_str(), "input" | "textarea" | "select").then(String::new);
        Self {
            tag,
            id: None,
            classes: Vec::new(),
            input_type: None,
            role: None,
            aria_label: None,
            label: None,
            text: String::new(),
            href: None,
            visible: true,
            enabled: true,
            writable: true,
            checked: None,
            value,
            options: Vec::new(),
            style: ComputedStyleSnapshot::default(),
            alternate_style: None,
            parent: None,
            on_click: Vec::new(),
            on_enter: Vec::new(),
            reveal_after_queries: None,
            blocks_pointer: false,
        }
    }

    /// Set the `id` attribute
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Add a class
    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    /// Set the input `type`; checkboxes start unchecked
    #[must_use]
    pub fn with_type(mut self, input_type: impl Into<String>) -> Self {
        let input_type = input_type.into();
        if input_type == "checkbox" || input_type == "radio" {
            self.checked = Some(false);
        }
        self.input_type = Some(input_type);
        self
    }

    /// Set an explicit role
    #[must_use]
    pub const fn with_role(mut self, role: AriaRole) -> Self {
        self.role = Some(role);
        self
    }

    /// Set `aria-label`
    #[must_use]
    pub fn with_aria_label(mut self, label: impl Into<String>) -> Self {
        self.aria_label = Some(label.into());
        self
    }

    /// Associate a `<label>`
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set own text
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set `href`
    #[must_use]
    pub fn with_href(mut self, href: impl Into<String>) -> Self {
        self.href = Some(href.into());
        self
    }

    /// Set the form value
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Set `<option>` values
    #[must_use]
    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    /// Set the computed style
    #[must_use]
    pub fn with_style(mut self, style: ComputedStyleSnapshot) -> Self {
        self.style = style;
        self
    }

    /// Set the style swapped in by [`MockEffect::ToggleStyle`]
    #[must_use]
    pub fn with_alternate_style(mut self, style: ComputedStyleSnapshot) -> Self {
        self.alternate_style = Some(style);
        self
    }

    /// Start hidden
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Start disabled
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Start read-only
    #[must_use]
    pub const fn readonly(mut self) -> Self {
        self.writable = false;
        self
    }

    /// Start checked
    #[must_use]
    pub const fn checked(mut self) -> Self {
        self.checked = Some(true);
        self
    }

    /// Add a click effect
    #[must_use]
    pub fn on_click(mut self, effect: MockEffect) -> Self {
        self.on_click.push(effect);
        self
    }

    /// Add an Enter-key effect
    #[must_use]
    pub fn on_enter(mut self, effect: MockEffect) -> Self {
        self.on_enter.push(effect);
        self
    }

    /// Start hidden and appear after `queries` driver queries
    #[must_use]
    pub const fn revealed_after(mut self, queries: usize) -> Self {
        self.visible = false;
        self.reveal_after_queries = Some(queries);
        self
    }

    /// Intercept pointer events while visible
    #[must_use]
    pub const fn blocking(mut self) -> Self {
        self.blocks_pointer = true;
        self
    }

    fn implicit_role(&self) -> Option<AriaRole> {
        if self.role.is_some() {
            return self.role;
        }
        let role = match self.tag.as_str() {
            "a" if self.href.is_some() => AriaRole::Link,
            "button" => AriaRole::Button,
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => AriaRole::Heading,
            "header" => AriaRole::Banner,
            "nav" => AriaRole::Navigation,
            "ul" | "ol" => AriaRole::List,
            "li" => AriaRole::Listitem,
            "select" => AriaRole::Combobox,
            "textarea" => AriaRole::Textbox,
            "input" => match self.input_type.as_deref().unwrap_or("text") {
                "button" | "submit" | "reset" => AriaRole::Button,
                "checkbox" => AriaRole::Checkbox,
                "number" => AriaRole::Spinbutton,
                "search" => AriaRole::Searchbox,
                "text" | "email" | "tel" | "url" => AriaRole::Textbox,
                _ => return None,
            },
            _ => return None,
        };
        Some(role)
    }

    fn heading_level(&self) -> Option<u8> {
        self.tag
            .strip_prefix('h')
            .and_then(|level| level.parse().ok())
            .filter(|level| (1..=6).contains(level))
    }

    fn is_form_control(&self) -> bool {
        matches!(self.tag.as_str(), "input" | "textarea" | "select")
    }

    fn accepts_text(&self) -> bool {
        match self.tag.as_str() {
            "textarea" => true,
            "input" => !matches!(
                self.input_type.as_deref(),
                Some("checkbox" | "radio" | "button" | "submit" | "reset" | "hidden")
            ),
            _ => false,
        }
    }
}

/// Tree of mock elements in document order
#[derive(Debug, Clone, Default)]
pub struct MockDom {
    elements: Vec<MockElement>,
    body_style: ComputedStyleSnapshot,
}

impl MockDom {
    /// Empty document
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a top-level element
    pub fn add(&mut self, element: MockElement) -> ElementId {
        self.elements.push(element);
        self.elements.len() - 1
    }

    /// Append a child of `parent`
    pub fn add_child(&mut self, parent: ElementId, mut element: MockElement) -> ElementId {
        element.parent = Some(parent);
        self.add(element)
    }

    /// Element by id
    #[must_use]
    pub fn get(&self, id: ElementId) -> Option<&MockElement> {
        self.elements.get(id)
    }

    /// Number of elements
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the document is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    fn is_ancestor(&self, ancestor: ElementId, mut id: ElementId) -> bool {
        while let Some(parent) = self.elements[id].parent {
            if parent == ancestor {
                return true;
            }
            id = parent;
        }
        false
    }

    fn is_shown(&self, id: ElementId) -> bool {
        let mut current = Some(id);
        while let Some(idx) = current {
            if !self.elements[idx].visible {
                return false;
            }
            current = self.elements[idx].parent;
        }
        true
    }

    fn text_content(&self, id: ElementId) -> String {
        let mut parts = vec![self.elements[id].text.clone()];
        for child in (0..self.elements.len()).filter(|&c| self.elements[c].parent == Some(id)) {
            parts.push(self.text_content(child));
        }
        normalize_whitespace(&parts.join(" "))
    }

    fn accessible_name(&self, id: ElementId) -> String {
        let el = &self.elements[id];
        if let Some(name) = el.aria_label.as_ref().or(el.label.as_ref()) {
            return normalize_whitespace(name);
        }
        if el.is_form_control() {
            return String::new();
        }
        self.text_content(id)
    }

    fn state(&self, id: ElementId) -> ElementState {
        let el = &self.elements[id];
        ElementState {
            tag: el.tag.clone(),
            visible: self.is_shown(id),
            enabled: el.enabled,
            editable: el.enabled && el.writable && el.accepts_text(),
            checked: el.checked,
            text: self.text_content(id),
            value: el.value.clone(),
        }
    }

    fn resolve(&self, steps: &[LocatorStep]) -> ProbeResult<Vec<ElementId>> {
        let mut current: Option<Vec<ElementId>> = None;
        for step in steps {
            let scoped = |pred: &dyn Fn(ElementId) -> bool| -> Vec<ElementId> {
                (0..self.elements.len())
                    .filter(|&id| match &current {
                        None => true,
                        Some(scopes) => scopes.iter().any(|&s| self.is_ancestor(s, id)),
                    })
                    .filter(|&id| pred(id))
                    .collect()
            };
            let next = match step {
                LocatorStep::Css { selector } => {
                    let chain = CssChain::parse(selector)?;
                    scoped(&|id| chain.matches(self, id))
                }
                LocatorStep::XPath { expression } => {
                    let id_attr = xpath_id(expression)?;
                    scoped(&|id| self.elements[id].id.as_deref() == Some(id_attr.as_str()))
                }
                LocatorStep::Role {
                    role,
                    name,
                    exact,
                    level,
                } => scoped(&|id| {
                    let el = &self.elements[id];
                    el.implicit_role() == Some(*role)
                        && self.is_shown(id)
                        && level.map_or(true, |l| el.heading_level() == Some(l))
                        && name
                            .as_ref()
                            .map_or(true, |n| text_matches(&self.accessible_name(id), n, *exact))
                }),
                LocatorStep::Text { text, exact } => {
                    let hits = scoped(&|id| text_matches(&self.text_content(id), text, *exact));
                    hits.iter()
                        .copied()
                        .filter(|&id| !hits.iter().any(|&other| other != id && self.is_ancestor(id, other)))
                        .collect()
                }
                LocatorStep::Label { text, exact } => scoped(&|id| {
                    let el = &self.elements[id];
                    el.label
                        .iter()
                        .chain(el.aria_label.iter())
                        .any(|label| text_matches(label, text, *exact))
                }),
                LocatorStep::HasText { text } => current
                    .clone()
                    .unwrap_or_else(|| (0..self.elements.len()).collect())
                    .into_iter()
                    .filter(|&id| text_matches(&self.text_content(id), text, false))
                    .collect(),
                LocatorStep::Nth { index } => {
                    let set = current.clone().unwrap_or_else(|| (0..self.elements.len()).collect());
                    let len = set.len() as i64;
                    let idx = if *index < 0 { len + i64::from(*index) } else { i64::from(*index) };
                    if (0..len).contains(&idx) {
                        vec![set[idx as usize]]
                    } else {
                        Vec::new()
                    }
                }
            };
            current = Some(next);
        }
        Ok(current.unwrap_or_default())
    }

    fn blocker_for(&self, target: ElementId) -> Option<ElementId> {
        (0..self.elements.len()).find(|&id| {
            self.elements[id].blocks_pointer
                && self.is_shown(id)
                && id != target
                && !self.is_ancestor(id, target)
        })
    }

    fn describe(&self, id: ElementId) -> String {
        let el = &self.elements[id];
        let mut out = el.tag.clone();
        if let Some(html_id) = &el.id {
            out.push('#');
            out.push_str(html_id);
        }
        for class in &el.classes {
            out.push('.');
            out.push_str(class);
        }
        out
    }
}

/// One compound of a descendant-combinator CSS selector: `tag#id.class[type=x]`
#[derive(Debug, Default)]
struct CssCompound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    input_type: Option<String>,
}

#[derive(Debug)]
struct CssChain(Vec<CssCompound>);

impl CssChain {
    fn parse(selector: &str) -> ProbeResult<Self> {
        let compound = Regex::new(
            r#"^(?P<tag>[a-zA-Z][\w-]*|\*)?(?P<rest>(?:[#.][\w-]+|\[type=["']?[\w-]+["']?\])*)$"#,
        )
        .map_err(|e| ProbeError::page(e.to_string()))?;
        let part = Regex::new(r#"([#.])([\w-]+)|\[type=["']?([\w-]+)["']?\]"#)
            .map_err(|e| ProbeError::page(e.to_string()))?;

        let mut chain = Vec::new();
        for token in selector.split_whitespace() {
            let caps = compound.captures(token).ok_or_else(|| {
                ProbeError::page(format!("mock DOM cannot parse selector {selector:?}"))
            })?;
            let mut parsed = CssCompound {
                tag: caps
                    .name("tag")
                    .map(|m| m.as_str().to_lowercase())
                    .filter(|t| t != "*"),
                ..CssCompound::default()
            };
            let rest = caps.name("rest").map_or("", |m| m.as_str());
            for p in part.captures_iter(rest) {
                match (p.get(1).map(|m| m.as_str()), p.get(2), p.get(3)) {
                    (Some("#"), Some(name), _) => parsed.id = Some(name.as_str().to_string()),
                    (Some("."), Some(name), _) => parsed.classes.push(name.as_str().to_string()),
                    (_, _, Some(ty)) => parsed.input_type = Some(ty.as_str().to_string()),
                    _ => {}
                }
            }
            chain.push(parsed);
        }
        if chain.is_empty() {
            return Err(ProbeError::page("empty selector"));
        }
        Ok(Self(chain))
    }

    fn compound_matches(compound: &CssCompound, el: &MockElement) -> bool {
        compound.tag.as_ref().map_or(true, |t| *t == el.tag)
            && compound.id.as_ref().map_or(true, |id| el.id.as_ref() == Some(id))
            && compound.classes.iter().all(|c| el.classes.contains(c))
            && compound
                .input_type
                .as_ref()
                .map_or(true, |ty| el.input_type.as_ref() == Some(ty))
    }

    fn matches(&self, dom: &MockDom, id: ElementId) -> bool {
        let Some((last, ancestors)) = self.0.split_last() else {
            return false;
        };
        if !Self::compound_matches(last, &dom.elements[id]) {
            return false;
        }
        let mut cursor = dom.elements[id].parent;
        for compound in ancestors.iter().rev() {
            loop {
                let Some(idx) = cursor else {
                    return false;
                };
                cursor = dom.elements[idx].parent;
                if Self::compound_matches(compound, &dom.elements[idx]) {
                    break;
                }
            }
        }
        true
    }
}

fn xpath_id(expression: &str) -> ProbeResult<String> {
    let re = Regex::new(r#"^//[\w*]+\[@id=["']([^"']+)["']\]$"#)
        .map_err(|e| ProbeError::page(e.to_string()))?;
    re.captures(expression)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| ProbeError::page(format!("mock DOM supports only id XPath, got {expression:?}")))
}

#[derive(Debug)]
struct MockState {
    dom: MockDom,
    url: String,
    focused: Option<ElementId>,
    queries: usize,
    history: Vec<String>,
    js_results: VecDeque<serde_json::Value>,
    closed: bool,
}

/// Mock driver for unit testing
#[derive(Debug)]
pub struct MockDriver {
    state: Mutex<MockState>,
}

impl MockDriver {
    /// Create a driver over a document at `about:blank`
    #[must_use]
    pub fn new(dom: MockDom) -> Self {
        Self {
            state: Mutex::new(MockState {
                dom,
                url: String::from("about:blank"),
                focused: None,
                queries: 0,
                history: Vec::new(),
                js_results: VecDeque::new(),
                closed: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a result for the next `evaluate` call
    pub fn push_js_result(&self, value: serde_json::Value) {
        self.lock().js_results.push_back(value);
    }

    /// Recorded calls, e.g. `goto:https://…`, `click:locator("#x")`
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.lock().history.clone()
    }

    /// Whether a call starting with `prefix` was recorded
    #[must_use]
    pub fn was_called(&self, prefix: &str) -> bool {
        self.lock().history.iter().any(|c| c.starts_with(prefix))
    }

    /// Current value of an element
    #[must_use]
    pub fn value_of(&self, id: ElementId) -> Option<String> {
        self.lock().dom.get(id).and_then(|el| el.value.clone())
    }

    /// Whether an element is currently shown
    #[must_use]
    pub fn is_shown(&self, id: ElementId) -> bool {
        self.lock().dom.is_shown(id)
    }

    /// Number of queries resolved so far
    #[must_use]
    pub fn query_count(&self) -> usize {
        self.lock().queries
    }

    /// Whether `close` was called
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

impl MockState {
    fn apply(&mut self, effects: &[MockEffect]) {
        for effect in effects {
            match effect {
                MockEffect::Show(id) => {
                    if let Some(el) = self.dom.elements.get_mut(*id) {
                        el.visible = true;
                    }
                }
                MockEffect::Hide(id) => {
                    if let Some(el) = self.dom.elements.get_mut(*id) {
                        el.visible = false;
                        el.reveal_after_queries = None;
                    }
                }
                MockEffect::Navigate(url) => self.url.clone_from(url),
                MockEffect::SetText(id, text) => {
                    if let Some(el) = self.dom.elements.get_mut(*id) {
                        el.text.clone_from(text);
                    }
                }
                MockEffect::ToggleStyle(id) => {
                    if let Some(el) = self.dom.elements.get_mut(*id) {
                        if let Some(alt) = el.alternate_style.take() {
                            el.alternate_style = Some(std::mem::replace(&mut el.style, alt));
                        }
                    }
                }
                MockEffect::ToggleChecked(id) => {
                    if let Some(el) = self.dom.elements.get_mut(*id) {
                        el.checked = el.checked.map(|c| !c);
                    }
                }
            }
        }
    }

    fn reveal_pending(&mut self) {
        let queries = self.queries;
        for el in &mut self.dom.elements {
            if el.reveal_after_queries.is_some_and(|n| queries >= n) {
                el.visible = true;
                el.reveal_after_queries = None;
            }
        }
    }

    fn single(&self, locator: &Locator) -> ProbeResult<ElementId> {
        let matches = self.dom.resolve(locator.steps())?;
        match matches.as_slice() {
            [id] => Ok(*id),
            _ => Err(ProbeError::NotActionable {
                selector: locator.to_string(),
                reason: format!("resolved to {} elements", matches.len()),
            }),
        }
    }
}

#[async_trait]
impl PageDriver for MockDriver {
    async fn goto(&self, url: &str) -> ProbeResult<()> {
        let mut state = self.lock();
        state.history.push(format!("goto:{url}"));
        state.url = url.to_string();
        state.focused = None;
        Ok(())
    }

    async fn url(&self) -> ProbeResult<String> {
        Ok(self.lock().url.clone())
    }

    async fn query(&self, locator: &Locator) -> ProbeResult<Vec<ElementState>> {
        let mut state = self.lock();
        state.queries += 1;
        state.reveal_pending();
        let ids = state.dom.resolve(locator.steps())?;
        Ok(ids.into_iter().map(|id| state.dom.state(id)).collect())
    }

    async fn act(&self, locator: &Locator, action: &ElementAction) -> ProbeResult<()> {
        let mut state = self.lock();
        let id = state.single(locator)?;
        if action.is_pointer() {
            if let Some(blocker) = state.dom.blocker_for(id) {
                return Err(ProbeError::Intercepted {
                    selector: locator.to_string(),
                    intercepted_by: state.dom.describe(blocker),
                });
            }
        }
        state.history.push(format!("{}:{locator}", action.name()));

        match action {
            ElementAction::Click => {
                state.focused = Some(id);
                let el = state.dom.elements[id].clone();
                if el.tag == "input" && el.checked.is_some() {
                    state.apply(&[MockEffect::ToggleChecked(id)]);
                }
                if let Some(href) = el.href {
                    state.apply(&[MockEffect::Navigate(href)]);
                }
                state.apply(&el.on_click);
            }
            ElementAction::Hover => {}
            ElementAction::Focus => state.focused = Some(id),
            ElementAction::Fill(value) => {
                state.focused = Some(id);
                state.dom.elements[id].value = Some(value.clone());
            }
            ElementAction::Press(key) => {
                state.focused = Some(id);
                if key == "Enter" {
                    let effects = state.dom.elements[id].on_enter.clone();
                    state.apply(&effects);
                }
            }
            ElementAction::SelectOption(wanted) => {
                let el = &mut state.dom.elements[id];
                if !el.options.iter().any(|o| o == wanted) {
                    return Err(ProbeError::NotActionable {
                        selector: locator.to_string(),
                        reason: format!("option {wanted:?} not found"),
                    });
                }
                el.value = Some(wanted.clone());
            }
        }
        Ok(())
    }

    async fn focused_style(&self) -> ProbeResult<ComputedStyleSnapshot> {
        let state = self.lock();
        Ok(state
            .focused
            .and_then(|id| state.dom.get(id))
            .map_or_else(|| state.dom.body_style.clone(), |el| el.style.clone()))
    }

    async fn evaluate(&self, script: &str) -> ProbeResult<serde_json::Value> {
        let mut state = self.lock();
        state.history.push(format!("evaluate:{script}"));
        state
            .js_results
            .pop_front()
            .ok_or_else(|| ProbeError::EvaluationError {
                message: "No mock JS result set".to_string(),
            })
    }

    async fn screenshot(&self) -> ProbeResult<Vec<u8>> {
        Ok(Vec::new())
    }

    async fn close(&self) -> ProbeResult<()> {
        let mut state = self.lock();
        state.history.push("close".to_string());
        state.closed = true;
        Ok(())
    }
}
