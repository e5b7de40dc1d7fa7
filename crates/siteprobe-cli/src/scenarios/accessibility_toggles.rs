//! Accessibility toolbar: toggles start off and "Highlight Links & Buttons"
//! changes the focus outline reversibly.

use async_trait::async_trait;
use siteprobe::prelude::*;

/// Toolbar container
pub const TOOLBAR_XPATH: &str = r#"//*[@id="acwp-toolbar"]"#;

/// Toggles checked for their default state, `#acwp-toggler-<name>`
pub const TOGGLES: [&str; 8] = [
    "keyboard",
    "animations",
    "contrast",
    "incfont",
    "decfont",
    "readable",
    "marktitles",
    "underline",
];

const HIGHLIGHT_LABEL: &str = "link Highlight Links & Buttons";

fn logo(page: &Page) -> Locator {
    page.get_by_role(AriaRole::Link, RoleOptions::named("Logo"))
}

/// Accessibility toggles scenario
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessibilityToggles;

#[async_trait]
impl Scenario for AccessibilityToggles {
    fn name(&self) -> &str {
        "accessibility toggles"
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> ProbeResult<()> {
        let home = ctx.url("/");
        ctx.navigate(&home).await?;

        let page = ctx.interact("open accessibility toolbar")?;
        page.click(&page.get_by_role(
            AriaRole::Button,
            RoleOptions::named("Toggle Accessibility Toolbar"),
        ))
        .await?;
        let page = ctx.check("toolbar is visible")?;
        expect(page, page.locator_xpath(TOOLBAR_XPATH))
            .to_be_visible()
            .await?;

        for toggle in TOGGLES {
            let page = ctx.check(format!("{toggle} toggle is off"))?;
            check_toggle_default(page, &format!("#acwp-toggler-{toggle}")).await?;
        }

        let page = ctx.interact("focus logo")?;
        page.focus(&logo(page)).await?;
        let baseline = focused_element_style(page).await?;

        let page = ctx.interact("highlight links on")?;
        page.click(&page.get_by_text(HIGHLIGHT_LABEL)).await?;
        let page = ctx.check("outline changed")?;
        let highlighted = focused_element_style(page).await?;
        if highlighted.outline == baseline.outline {
            return Err(ProbeError::AssertionFailed {
                assertion: "not.outline".to_string(),
                target: "focused element".to_string(),
                expected: format!("not {:?}", baseline.outline),
                actual: format!("{:?}", highlighted.outline),
                timeout_ms: 0,
            });
        }

        let page = ctx.interact("highlight links off")?;
        page.click(&page.get_by_text(HIGHLIGHT_LABEL)).await?;
        let page = ctx.check("outline restored")?;
        expect_focused_outline(page, &logo(page), &baseline.outline).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::scenarios::fixtures::{context, late_banner};
    use siteprobe::{ComputedStyleSnapshot, MockDom, MockEffect, MockElement};

    fn toolbar_dom(logo_style: Option<ComputedStyleSnapshot>) -> MockDom {
        let mut dom = MockDom::new();
        late_banner(&mut dom);
        let mut logo = MockElement::new("a")
            .with_aria_label("Logo")
            .with_href("https://kmslh.com/");
        if let Some(style) = logo_style {
            logo = logo
                .with_style(style)
                .with_alternate_style(ComputedStyleSnapshot::new(
                    "rgb(255, 0, 0) dashed 3px",
                    "underline",
                ));
        }
        let logo = dom.add(logo);

        let toolbar = dom.add(MockElement::new("div").with_id("acwp-toolbar").hidden());
        dom.add(
            MockElement::new("button")
                .with_aria_label("Toggle Accessibility Toolbar")
                .on_click(MockEffect::Show(toolbar)),
        );
        for toggle in TOGGLES {
            dom.add_child(
                toolbar,
                MockElement::new("input")
                    .with_type("checkbox")
                    .with_id(format!("acwp-toggler-{toggle}")),
            );
        }
        dom.add_child(
            toolbar,
            MockElement::new("label")
                .with_text(HIGHLIGHT_LABEL)
                .on_click(MockEffect::ToggleStyle(logo)),
        );
        dom
    }

    #[tokio::test]
    async fn test_toggle_round_trip_passes() {
        let focus_ring = ComputedStyleSnapshot::new("rgb(0, 0, 0) auto 1px", "none");
        let (driver, mut ctx) = context(toolbar_dom(Some(focus_ring))).await;

        AccessibilityToggles.run(&mut ctx).await.unwrap();
        ctx.finish().unwrap();

        let highlight_clicks = driver
            .history()
            .iter()
            .filter(|c| c.starts_with("click:") && c.contains("Highlight"))
            .count();
        assert_eq!(highlight_clicks, 2);
    }

    #[tokio::test]
    async fn test_unchanged_outline_fails() {
        let (_, mut ctx) = context(toolbar_dom(None)).await;

        let err = AccessibilityToggles.run(&mut ctx).await.unwrap_err();
        assert!(err.to_string().contains("not.outline"));
        assert_eq!(ctx.phase(), Phase::Assert);
    }
}
