//! ROI calculator: known inputs produce known savings.

use super::{knowledge_center_nav, NAV_TIMEOUT};
use async_trait::async_trait;
use siteprobe::prelude::*;

/// Calculator inputs, `#form-field-roi_calc__<field>`
pub const INPUTS: [(&str, &str); 8] = [
    ("number_of_employees", "100"),
    ("employee_salary", "50000"),
    ("number_of_agents", "25"),
    ("agent_salary", "9600"),
    ("number_of_new_agents", "5"),
    ("onboarding_time_weeks", "4"),
    ("ongoing_training_days", "100"),
    ("error_rate_percentage", "3"),
];

/// Expected results for [`INPUTS`], `#savings-roi_calc__<field>`
pub const SAVINGS: [(&str, &str); 5] = [
    ("employee_knowledge", "$41,902"),
    ("onboarding_training", "$1,846"),
    ("ongoing_training", "$358,904"),
    ("error_rate", "$1,800"),
    ("total", "$404,452"),
];

fn input(page: &Page, field: &str) -> Locator {
    page.locator(format!("#form-field-roi_calc__{field}"))
        .get_by_role(AriaRole::Spinbutton, RoleOptions::new())
}

/// ROI calculator scenario
#[derive(Debug, Clone, Copy, Default)]
pub struct RoiCalculator;

#[async_trait]
impl Scenario for RoiCalculator {
    fn name(&self) -> &str {
        "roi calculator"
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> ProbeResult<()> {
        let home = ctx.url("/");
        let calculator = ctx.url("/roi-calculator/");
        ctx.navigate(&home).await?;

        let page = ctx.interact("hover Knowledge Center")?;
        let nav = knowledge_center_nav(page);
        page.hover(&nav).await?;
        let page = ctx.check("menu is open")?;
        expect(page, nav).with_timeout(NAV_TIMEOUT).to_be_visible().await?;
        let submenu = page.get_by_role(AriaRole::Link, RoleOptions::named("ROI Calculator"));
        expect(page, submenu.clone())
            .with_timeout(NAV_TIMEOUT)
            .to_be_visible()
            .await?;

        ctx.interact("open ROI Calculator")?.click(&submenu).await?;
        expect_page(ctx.check("on the calculator page")?)
            .to_have_url(&calculator)
            .await?;

        for (field, value) in INPUTS {
            let page = ctx.interact(format!("fill {field} = {value}"))?;
            fill_and_verify(page, &input(page, field), value).await?;
        }
        let (last, _) = INPUTS[INPUTS.len() - 1];
        let page = ctx.interact("press Enter")?;
        page.press(&input(page, last), "Enter").await?;

        for (field, amount) in SAVINGS {
            let page = ctx.check(format!("{field} savings = {amount}"))?;
            expect(page, page.locator(format!("#savings-roi_calc__{field}")))
                .to_have_text(amount)
                .await?;
        }
        Ok(())
    }
}
