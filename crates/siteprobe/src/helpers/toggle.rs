//! Toggle State Checker.

use crate::expect::expect;
use crate::page::Page;
use crate::result::ProbeResult;
use tracing::debug;

/// Assert the toggle at `selector` is enabled and unchecked.
///
/// Both checks poll; the first one that does not hold fails with an
/// assertion error naming the condition.
pub async fn check_toggle_default(page: &Page, selector: &str) -> ProbeResult<()> {
    let toggle = page.locator(selector);
    expect(page, toggle.clone()).to_be_enabled().await?;
    expect(page, toggle).not().to_be_checked().await?;
    debug!(selector, "toggle at default state");
    Ok(())
}
