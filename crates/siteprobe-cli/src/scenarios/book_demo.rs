//! Book a demo: the form accepts every field and submitting without a
//! captcha token is rejected.

use async_trait::async_trait;
use siteprobe::prelude::*;

/// Textbox name and value, in form order
pub const FIELDS: [(&str, &str); 5] = [
    ("First name*", "Brana"),
    ("Last name*", "Test"),
    ("Professional Email*", "testmail@happiestbaby.com"),
    ("Phone number*", "+38164123456"),
    ("Job Title*", "QA"),
];

/// Country picked in the `Country/Region*` select
pub const COUNTRY: &str = "Serbia";

/// Message textbox value
pub const MESSAGE: &str = "Call me";

/// Error shown when the form is sent without a captcha
pub const CAPTCHA_ERROR: &str = "Failed to validate Captcha. Please try again.";

fn textbox(page: &Page, name: &str) -> Locator {
    page.get_by_role(AriaRole::Textbox, RoleOptions::named(name))
}

/// Book a demo scenario
#[derive(Debug, Clone, Copy, Default)]
pub struct BookDemo;

#[async_trait]
impl Scenario for BookDemo {
    fn name(&self) -> &str {
        "book a demo"
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> ProbeResult<()> {
        let home = ctx.url("/");
        let form_page = ctx.url("/book-a-demo/");
        ctx.navigate(&home).await?;

        let page = ctx.interact("open Book a Demo from the header")?;
        page.click(
            &page
                .get_by_role(AriaRole::Banner, RoleOptions::new())
                .get_by_role(AriaRole::Link, RoleOptions::named("Book a Demo")),
        )
        .await?;
        let page = ctx.check("form is shown")?;
        expect_page(page).to_have_url(&form_page).await?;
        expect(
            page,
            page.get_by_role(
                AriaRole::Heading,
                RoleOptions::named("Fill out the form below:").level(3),
            ),
        )
        .to_be_visible()
        .await?;

        for (name, value) in FIELDS {
            let page = ctx.interact(format!("fill {name} = {value}"))?;
            fill_and_verify(page, &textbox(page, name), value).await?;
        }

        let page = ctx.interact(format!("select {COUNTRY}"))?;
        let country = page.get_by_label("Country/Region*");
        page.select_option(&country, COUNTRY).await?;
        expect(ctx.check("country is selected")?, country)
            .to_have_value(COUNTRY)
            .await?;

        let page = ctx.interact("fill Message")?;
        fill_and_verify(page, &textbox(page, "Message"), MESSAGE).await?;

        let page = ctx.check("submit is ready")?;
        let submit = page.get_by_role(AriaRole::Button, RoleOptions::named("Book a demo"));
        expect(page, submit.clone()).to_be_visible().await?;
        expect(page, submit.clone()).to_be_enabled().await?;
        ctx.interact("submit")?.click(&submit).await?;

        let page = ctx.check("captcha error is shown")?;
        let error = page
            .get_by_role(AriaRole::Listitem, RoleOptions::new())
            .filter_has_text(CAPTCHA_ERROR);
        expect(page, error.clone()).to_have_count(1).await?;
        expect(page, error).to_be_visible().await
    }
}
