//! Form Field Verifier.

use crate::expect::expect;
use crate::locator::Locator;
use crate::page::Page;
use crate::result::ProbeResult;
use tracing::debug;

/// Fill a field and assert the value stuck.
///
/// 1. the field is visible, enabled and editable (separate assertions)
/// 2. a focusing click, then `fill` replacing existing content
/// 3. the value equals `value` byte-for-byte
pub async fn fill_and_verify(page: &Page, field: &Locator, value: &str) -> ProbeResult<()> {
    expect(page, field.clone()).to_be_visible().await?;
    expect(page, field.clone()).to_be_enabled().await?;
    expect(page, field.clone()).to_be_editable().await?;

    page.click(field).await?;
    page.fill(field, value).await?;

    expect(page, field.clone()).to_have_value(value).await?;
    debug!(%field, value, "field verified");
    Ok(())
}
