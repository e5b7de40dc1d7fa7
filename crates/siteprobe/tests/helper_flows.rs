//! Helper flows against the in-memory driver.
//!
//! Each test builds a small page that mimics one part of the target site and
//! runs the public helpers on it end to end.

#![allow(clippy::unwrap_used, deprecated)]

use proptest::prelude::*;
use siteprobe::helpers::{
    accept_consent_if_present, check_toggle_default, fill_and_verify, focused_element_style,
    install_consent_handler,
};
use siteprobe::{
    expect, AriaRole, ComputedStyleSnapshot, MockDom, MockDriver, MockEffect, MockElement, Page,
    PageTimeouts, ProbeError, RoleOptions,
};
use std::sync::Arc;
use std::time::Duration;

fn fast() -> PageTimeouts {
    PageTimeouts {
        action: Duration::from_millis(200),
        expect: Duration::from_millis(200),
        poll_interval: Duration::from_millis(10),
        ..PageTimeouts::default()
    }
}

fn page(dom: MockDom) -> (Arc<MockDriver>, Page) {
    let driver = Arc::new(MockDriver::new(dom));
    let page = Page::new(driver.clone()).with_timeouts(fast());
    (driver, page)
}

/// Cookie banner covering the page, dismissed by "Allow all"
fn add_banner(dom: &mut MockDom) -> usize {
    let banner = dom.add(
        MockElement::new("div")
            .with_id("CybotCookiebotDialog")
            .blocking(),
    );
    dom.add_child(
        banner,
        MockElement::new("button")
            .with_text("Allow all")
            .on_click(MockEffect::Hide(banner)),
    );
    banner
}

// =============================================================================
// Form Field Verifier
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Whatever is typed is read back unchanged
    #[test]
    fn prop_fill_reads_back_exact_value(value in "[ -~]{0,24}") {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        rt.block_on(async {
            let mut dom = MockDom::new();
            let input = dom.add(MockElement::new("input").with_type("text").with_label("Message"));
            let (driver, page) = page(dom);
            let field = page.get_by_role(AriaRole::Textbox, RoleOptions::named("Message"));

            fill_and_verify(&page, &field, &value).await.unwrap();
            assert_eq!(driver.value_of(input).as_deref(), Some(value.as_str()));
        });
    }
}

#[tokio::test]
async fn test_fill_rejects_readonly_field() {
    let mut dom = MockDom::new();
    dom.add(
        MockElement::new("input")
            .with_type("tel")
            .with_label("Phone number*")
            .readonly(),
    );
    let (driver, page) = page(dom);
    let phone = page.get_by_role(AriaRole::Textbox, RoleOptions::named("Phone number*"));

    let err = fill_and_verify(&page, &phone, "+38164123456").await.unwrap_err();
    assert!(matches!(err, ProbeError::AssertionFailed { ref assertion, .. } if assertion == "to_be_editable"));
    assert!(!driver.was_called("fill:"));
}

#[tokio::test]
async fn test_fill_waits_for_late_field() {
    let mut dom = MockDom::new();
    let input = dom.add(
        MockElement::new("input")
            .with_type("text")
            .with_label("Job Title*")
            .revealed_after(3),
    );
    let (driver, page) = page(dom);
    let job = page.get_by_role(AriaRole::Textbox, RoleOptions::named("Job Title*"));

    fill_and_verify(&page, &job, "QA").await.unwrap();
    assert_eq!(driver.value_of(input).as_deref(), Some("QA"));
}

// =============================================================================
// Toggle State Checker
// =============================================================================

#[tokio::test]
async fn test_all_toolbar_toggles_default_off() {
    let toggles = [
        "keyboard",
        "animations",
        "contrast",
        "incfont",
        "decfont",
        "readable",
        "marktitles",
        "underline",
    ];
    let mut dom = MockDom::new();
    for name in toggles {
        dom.add(
            MockElement::new("input")
                .with_type("checkbox")
                .with_id(format!("acwp-toggler-{name}")),
        );
    }
    let (_, page) = page(dom);

    for name in toggles {
        check_toggle_default(&page, &format!("#acwp-toggler-{name}"))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_toggle_checked_by_default_fails() {
    let mut dom = MockDom::new();
    dom.add(
        MockElement::new("input")
            .with_type("checkbox")
            .with_id("acwp-toggler-contrast")
            .checked(),
    );
    let (_, page) = page(dom);

    let err = check_toggle_default(&page, "#acwp-toggler-contrast")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not.to_be_checked"));
}

#[tokio::test]
async fn test_missing_toggle_is_not_found() {
    let (_, page) = page(MockDom::new());
    let err = check_toggle_default(&page, "#acwp-toggler-keyboard")
        .await
        .unwrap_err();
    assert!(matches!(err, ProbeError::ElementNotFound { .. }));
}

// =============================================================================
// Style Inspector
// =============================================================================

#[tokio::test]
async fn test_double_toggle_restores_focus_style() {
    let mut dom = MockDom::new();
    let logo = dom.add(
        MockElement::new("a")
            .with_aria_label("Logo")
            .with_href("https://kmslh.com/")
            .with_style(ComputedStyleSnapshot::new("rgb(0, 0, 0) solid 2px", "none"))
            .with_alternate_style(ComputedStyleSnapshot::new(
                "rgb(255, 0, 0) solid 2px",
                "underline solid rgb(0, 0, 0)",
            )),
    );
    dom.add(
        MockElement::new("label")
            .with_text("link Highlight Links & Buttons")
            .on_click(MockEffect::ToggleStyle(logo)),
    );
    let (_, page) = page(dom);
    let logo_link = page.get_by_role(AriaRole::Link, RoleOptions::named("Logo"));
    let highlight = page.get_by_text("link Highlight Links & Buttons");

    page.focus(&logo_link).await.unwrap();
    let before = focused_element_style(&page).await.unwrap();

    page.click(&highlight).await.unwrap();
    page.focus(&logo_link).await.unwrap();
    let toggled = focused_element_style(&page).await.unwrap();
    assert_ne!(toggled, before);
    assert_eq!(toggled.text_decoration, "underline solid rgb(0, 0, 0)");

    page.click(&highlight).await.unwrap();
    page.focus(&logo_link).await.unwrap();
    let restored = focused_element_style(&page).await.unwrap();
    assert_eq!(restored, before);
    assert!(restored.has_outline());
}

#[tokio::test]
async fn test_nothing_focused_reads_body() {
    let (_, page) = page(MockDom::new());
    let style = focused_element_style(&page).await.unwrap();
    assert_eq!(style, ComputedStyleSnapshot::default());
}

// =============================================================================
// Consent Banner Handler
// =============================================================================

#[tokio::test]
async fn test_polling_clicks_visible_banner() {
    let mut dom = MockDom::new();
    let banner = add_banner(&mut dom);
    let (driver, page) = page(dom);

    assert!(accept_consent_if_present(&page, Duration::ZERO).await.unwrap());
    assert!(!driver.is_shown(banner));
    assert!(driver.was_called("click:"));
}

#[tokio::test]
async fn test_polling_without_banner_clicks_nothing() {
    let (driver, page) = page(MockDom::new());
    assert!(!accept_consent_if_present(&page, Duration::ZERO).await.unwrap());
    assert!(!driver.was_called("click:"));
}

#[tokio::test]
async fn test_polling_misses_late_banner() {
    let mut dom = MockDom::new();
    let banner = dom.add(MockElement::new("div").blocking().revealed_after(5));
    dom.add_child(
        banner,
        MockElement::new("button")
            .with_text("Allow all")
            .on_click(MockEffect::Hide(banner)),
    );
    let (_, page) = page(dom);

    assert!(!accept_consent_if_present(&page, Duration::ZERO).await.unwrap());
}

#[tokio::test]
async fn test_handler_clears_banner_that_appears_mid_flow() {
    let mut dom = MockDom::new();
    let banner = dom.add(MockElement::new("div").blocking().revealed_after(2));
    dom.add_child(
        banner,
        MockElement::new("button")
            .with_text("Allow all")
            .on_click(MockEffect::Hide(banner)),
    );
    let news = dom.add(MockElement::new("a").with_text("News").with_href("https://kmslh.com/news/"));
    let (driver, page) = page(dom);
    install_consent_handler(&page).await.unwrap();

    page.goto("https://kmslh.com/").await.unwrap();
    let link = page.get_by_role(AriaRole::Link, RoleOptions::named("News"));
    expect(&page, link.clone()).to_be_visible().await.unwrap();
    page.click(&link).await.unwrap();

    assert!(!driver.is_shown(banner));
    assert!(driver.is_shown(news));
    assert_eq!(page.url().await.unwrap(), "https://kmslh.com/news/");
}

#[tokio::test]
async fn test_banner_without_handler_times_out() {
    let mut dom = MockDom::new();
    add_banner(&mut dom);
    dom.add(MockElement::new("button").with_text("Search"));
    let (driver, page) = page(dom);
    let search = page.get_by_role(AriaRole::Button, RoleOptions::named("Search"));

    let err = page.click(&search).await.unwrap_err();
    assert!(err.is_timeout());
    assert!(err.to_string().contains("CybotCookiebotDialog"));
    assert!(!driver.was_called("click:"));
}
