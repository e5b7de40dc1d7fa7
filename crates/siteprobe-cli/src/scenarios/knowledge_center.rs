//! Knowledge Center: News is reachable from the header menu and its search
//! returns results for the query.

use super::{knowledge_center_nav, NAV_TIMEOUT};
use async_trait::async_trait;
use siteprobe::prelude::*;
use std::time::Duration;

/// Search query typed into the News page searchbox
pub const QUERY: &str = "leader";

/// Bound for landing on the News page after the click
const NEWS_TIMEOUT: Duration = Duration::from_millis(5000);

/// Knowledge Center scenario
#[derive(Debug, Clone, Copy, Default)]
pub struct KnowledgeCenter;

#[async_trait]
impl Scenario for KnowledgeCenter {
    fn name(&self) -> &str {
        "knowledge center"
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> ProbeResult<()> {
        let home = ctx.url("/");
        let news = ctx.url("/news/");
        let results = ctx.url(&format!("/?s={QUERY}"));
        ctx.navigate(&home).await?;

        let page = ctx.interact("hover Knowledge Center")?;
        page.hover(&knowledge_center_nav(page)).await?;
        let page = ctx.check("News link is visible")?;
        let news_link = page.get_by_role(AriaRole::Link, RoleOptions::named("News"));
        expect(page, news_link.clone())
            .with_timeout(NAV_TIMEOUT)
            .to_be_visible()
            .await?;

        ctx.interact("open News")?.click(&news_link).await?;
        let page = ctx.check("on the News page")?;
        expect_page(page)
            .with_timeout(NEWS_TIMEOUT)
            .to_have_url(&news)
            .await?;
        let searchbox = page.get_by_role(AriaRole::Searchbox, RoleOptions::named("Search"));
        expect(page, searchbox.clone()).to_be_visible().await?;

        let page = ctx.interact(format!("search for {QUERY:?}"))?;
        page.fill(&searchbox, QUERY).await?;
        page.click(&page.get_by_role(AriaRole::Button, RoleOptions::named("Search")))
            .await?;

        let page = ctx.check("results match the query")?;
        expect_page(page).to_have_url(&results).await?;
        expect(
            page,
            page.get_by_role(AriaRole::Heading, RoleOptions::new().level(3))
                .first(),
        )
        .to_have_text(TextMatch::pattern(&format!("(?i){QUERY}"))?)
        .await
    }
}
