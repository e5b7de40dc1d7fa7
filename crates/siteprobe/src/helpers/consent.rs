//! Consent Banner Handler.
//!
//! Two strategies for the cookie banner that blocks interaction:
//!
//! - **Reactive** ([`install_consent_handler`]): a locator handler clicks
//!   "Allow all" whenever the banner is visible before an action or an
//!   assertion poll, whenever it appears.
//! - **Polling** ([`accept_consent_if_present`], deprecated): sleep, then
//!   click the banner once if it happens to be there.

use crate::expect::expect;
use crate::locator::Locator;
use crate::page::{HandlerOptions, Page};
use crate::result::ProbeResult;
use std::time::Duration;
use tracing::{debug, info};

/// Default sleep of the polling strategy (2 seconds)
pub const DEFAULT_CONSENT_WAIT: Duration = Duration::from_secs(2);

/// Where the dismissal control lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsentBanner {
    accept: Locator,
}

impl ConsentBanner {
    /// Banner dismissed by clicking `accept`
    #[must_use]
    pub const fn new(accept: Locator) -> Self {
        Self { accept }
    }

    /// The dismissal control
    #[must_use]
    pub const fn accept_locator(&self) -> &Locator {
        &self.accept
    }
}

impl Default for ConsentBanner {
    /// `button` filtered by text "Allow all"
    fn default() -> Self {
        Self::new(Locator::css("button").filter_has_text("Allow all"))
    }
}

/// Whether this scenario has dismissed the banner
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsentState {
    /// The banner was clicked away
    pub accepted: bool,
}

impl ConsentState {
    /// Not yet accepted
    #[must_use]
    pub const fn new() -> Self {
        Self { accepted: false }
    }

    /// Run the polling strategy unless the banner was already accepted.
    ///
    /// Returns whether the banner is now known to be accepted.
    #[allow(deprecated)]
    pub async fn accept_if_needed(&mut self, page: &Page, wait: Duration) -> ProbeResult<bool> {
        if !self.accepted {
            self.accepted = accept_consent_if_present(page, wait).await?;
        }
        Ok(self.accepted)
    }
}

/// Register the reactive consent handler for the default banner.
///
/// Idempotent: a second call on the same page keeps the single handler.
pub async fn install_consent_handler(page: &Page) -> ProbeResult<()> {
    install_consent_handler_for(page, &ConsentBanner::default()).await
}

/// Register the reactive consent handler for a custom banner
pub async fn install_consent_handler_for(page: &Page, banner: &ConsentBanner) -> ProbeResult<()> {
    let accept = banner.accept_locator().clone();
    if page.has_locator_handler(&accept).await {
        debug!(locator = %accept, "consent handler already installed");
        return Ok(());
    }
    page.add_locator_handler(
        accept,
        |page, locator| {
            Box::pin(async move {
                page.click(locator).await?;
                info!("consent accepted by handler");
                Ok(())
            })
        },
        HandlerOptions::new(),
    )
    .await;
    Ok(())
}

/// Sleep for `wait`, then click the banner if it is visible.
///
/// Returns `true` after clicking and seeing the banner hidden, `false` when
/// no banner was visible (nothing is clicked in that case).
#[deprecated(note = "fixed sleeps race the banner; use install_consent_handler")]
pub async fn accept_consent_if_present(page: &Page, wait: Duration) -> ProbeResult<bool> {
    page.wait_for_timeout(wait).await;
    let banner = ConsentBanner::default();
    let accept = banner.accept_locator();

    if !page.is_visible(accept).await? {
        debug!("no consent banner visible");
        return Ok(false);
    }
    if page.has_locator_handler(accept).await {
        // The installed handler owns the click.
        page.run_locator_handlers().await?;
    } else {
        page.click(accept).await?;
    }
    expect(page, accept.clone()).to_be_hidden().await?;
    info!("consent accepted by polling");
    Ok(true)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, deprecated)]
mod tests {
    use super::*;
    use crate::driver::{MockDom, MockDriver, MockEffect, MockElement};
    use crate::page::PageTimeouts;
    use std::sync::Arc;

    fn banner_dom() -> (MockDom, usize) {
        let mut dom = MockDom::new();
        let banner = dom.add(MockElement::new("div").with_id("CybotCookiebotDialog").blocking());
        dom.add_child(
            banner,
            MockElement::new("button")
                .with_text("Allow all")
                .on_click(MockEffect::Hide(banner)),
        );
        (dom, banner)
    }

    mod polling_tests {
        use super::*;

        #[tokio::test]
        async fn test_no_banner_returns_false_without_clicking() {
            let driver = Arc::new(MockDriver::new(MockDom::new()));
            let page = Page::new(driver.clone());
            let accepted = accept_consent_if_present(&page, Duration::from_millis(1))
                .await
                .unwrap();
            assert!(!accepted);
            assert!(!driver.was_called("click:"));
        }

        #[tokio::test]
        async fn test_banner_clicked_and_hidden() {
            let (dom, banner) = banner_dom();
            let driver = Arc::new(MockDriver::new(dom));
            let page = Page::new(driver.clone());
            let accepted = accept_consent_if_present(&page, Duration::from_millis(1))
                .await
                .unwrap();
            assert!(accepted);
            assert!(!driver.is_shown(banner));
        }

        #[tokio::test]
        async fn test_banner_accepted_with_handler_installed() {
            let (dom, banner) = banner_dom();
            let driver = Arc::new(MockDriver::new(dom));
            let page = Page::new(driver.clone()).with_timeouts(PageTimeouts {
                action: Duration::from_millis(300),
                navigation: Duration::from_millis(300),
                expect: Duration::from_millis(300),
                poll_interval: Duration::from_millis(10),
            });
            install_consent_handler(&page).await.unwrap();

            let accepted = accept_consent_if_present(&page, Duration::ZERO)
                .await
                .unwrap();
            assert!(accepted);
            assert!(!driver.is_shown(banner));
            let clicks = driver
                .history()
                .iter()
                .filter(|c| c.starts_with("click:"))
                .count();
            assert_eq!(clicks, 1);
        }

        #[tokio::test]
        async fn test_state_skips_second_check() {
            let (dom, _) = banner_dom();
            let driver = Arc::new(MockDriver::new(dom));
            let page = Page::new(driver.clone());
            let mut state = ConsentState::new();

            assert!(state.accept_if_needed(&page, Duration::ZERO).await.unwrap());
            let queries = driver.query_count();
            assert!(state.accept_if_needed(&page, Duration::ZERO).await.unwrap());
            assert_eq!(driver.query_count(), queries);
        }
    }

    mod handler_tests {
        use super::*;

        #[tokio::test]
        async fn test_install_is_idempotent() {
            let page = Page::new(Arc::new(MockDriver::new(MockDom::new())));
            install_consent_handler(&page).await.unwrap();
            install_consent_handler(&page).await.unwrap();
            let accept = ConsentBanner::default();
            assert!(page.remove_locator_handler(accept.accept_locator()).await);
            assert!(!page.has_locator_handler(accept.accept_locator()).await);
        }

        #[test]
        fn test_default_banner_locator() {
            let banner = ConsentBanner::default();
            assert_eq!(
                banner.accept_locator().to_string(),
                r#"locator("button").filter(hasText="Allow all")"#
            );
        }
    }
}
