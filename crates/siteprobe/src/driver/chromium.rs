//! Chromium over the Chrome `DevTools` Protocol (chromiumoxide).
//!
//! Each page lives in its own browser context, so cookies (and with them the
//! consent banner) never leak between scenarios. Locators are resolved in
//! page by [`RESOLVER_JS`]; pointer and keyboard input goes through
//! chromiumoxide element input on a uniquely marked element.

use super::{ElementAction, ElementState, PageDriver, RESOLVER_JS};
use crate::config::RunConfig;
use crate::helpers::style::ComputedStyleSnapshot;
use crate::locator::Locator;
use crate::result::{ProbeError, ProbeResult};
use crate::runner::PageLauncher;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams,
};
use chromiumoxide::page::{Page as CdpPage, ScreenshotParams};
use futures::StreamExt;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Attribute used to hand a resolved element to chromiumoxide input
const MARK_ATTR: &str = "data-siteprobe-target";

/// Browser launch options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOptions {
    /// Run without a window
    pub headless: bool,
    /// Chromium executable (None = auto-detect)
    pub chromium_path: Option<PathBuf>,
    /// Disable the sandbox (containers)
    pub no_sandbox: bool,
    /// Window width
    pub window_width: u32,
    /// Window height
    pub window_height: u32,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            chromium_path: None,
            no_sandbox: false,
            window_width: 1280,
            window_height: 800,
        }
    }
}

impl From<&RunConfig> for LaunchOptions {
    fn from(config: &RunConfig) -> Self {
        Self {
            headless: config.headless,
            chromium_path: config.chromium_path.clone(),
            no_sandbox: config.no_sandbox,
            ..Self::default()
        }
    }
}

fn page_err(e: impl std::fmt::Display) -> ProbeError {
    ProbeError::page(e.to_string())
}

// ============================================================================
// Browser
// ============================================================================

/// A launched Chromium process
#[derive(Debug)]
pub struct Browser {
    inner: Arc<Mutex<CdpBrowser>>,
    handle: tokio::task::JoinHandle<()>,
}

impl Browser {
    /// Launch Chromium
    ///
    /// # Errors
    ///
    /// Returns error if browser cannot be launched
    pub async fn launch(options: &LaunchOptions) -> ProbeResult<Self> {
        let mut builder =
            CdpConfig::builder().window_size(options.window_width, options.window_height);

        if !options.headless {
            builder = builder.with_head();
        }

        if options.no_sandbox {
            builder = builder.no_sandbox();
        }

        if let Some(ref path) = options.chromium_path {
            builder = builder.chrome_executable(path);
        }

        let cdp_config = builder
            .build()
            .map_err(|message| ProbeError::BrowserLaunchError { message })?;

        let (browser, mut handler) = CdpBrowser::launch(cdp_config).await.map_err(|e| {
            ProbeError::BrowserLaunchError {
                message: e.to_string(),
            }
        })?;

        let handle = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "CDP handler stopped");
                    break;
                }
            }
        });
        debug!(headless = options.headless, "browser launched");

        Ok(Self {
            inner: Arc::new(Mutex::new(browser)),
            handle,
        })
    }

    /// Open a page in a fresh browser context
    ///
    /// # Errors
    ///
    /// Returns error if the context or page cannot be created
    pub async fn new_driver(&self) -> ProbeResult<ChromiumDriver> {
        let mut browser = self.inner.lock().await;
        let context = browser
            .create_browser_context(CreateBrowserContextParams::default())
            .await
            .map_err(page_err)?;
        let params = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context.clone())
            .build()
            .map_err(ProbeError::page)?;
        let page = browser.new_page(params).await.map_err(page_err)?;
        drop(browser);

        Ok(ChromiumDriver {
            page,
            context: Some(context),
            browser: Arc::clone(&self.inner),
        })
    }

    /// Close the browser and stop the event handler
    ///
    /// # Errors
    ///
    /// Returns error if the browser does not shut down cleanly
    pub async fn close(self) -> ProbeResult<()> {
        let mut browser = self.inner.lock().await;
        browser
            .close()
            .await
            .map_err(|e| ProbeError::BrowserLaunchError {
                message: e.to_string(),
            })?;
        let _ = browser.wait().await;
        drop(browser);
        self.handle.abort();
        Ok(())
    }
}

#[async_trait]
impl PageLauncher for Browser {
    async fn new_page(&self) -> ProbeResult<Arc<dyn PageDriver>> {
        let driver: Arc<dyn PageDriver> = Arc::new(self.new_driver().await?);
        Ok(driver)
    }
}

// ============================================================================
// Driver
// ============================================================================

#[derive(Debug, Deserialize)]
struct MarkResult {
    count: usize,
    intercepted: Option<String>,
}

/// [`PageDriver`] over one chromiumoxide page
#[derive(Debug)]
pub struct ChromiumDriver {
    page: CdpPage,
    context: Option<BrowserContextId>,
    browser: Arc<Mutex<CdpBrowser>>,
}

impl ChromiumDriver {
    async fn eval_value(&self, script: &str) -> ProbeResult<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| ProbeError::EvaluationError {
                message: e.to_string(),
            })?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    /// Run a `window.__siteprobe` call, injecting the resolver first
    async fn resolver_call<T: serde::de::DeserializeOwned>(&self, call: &str) -> ProbeResult<T> {
        let script = format!("{RESOLVER_JS}\nwindow.__siteprobe.{call}");
        let value = self.eval_value(&script).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn mark(&self, locator: &Locator, token: &str, pointer: bool) -> ProbeResult<()> {
        let marked: MarkResult = self
            .resolver_call(&format!(
                "mark({}, {}, {pointer})",
                locator.to_json(),
                serde_json::to_string(token)?
            ))
            .await?;
        if marked.count != 1 {
            return Err(ProbeError::NotActionable {
                selector: locator.to_string(),
                reason: format!("resolved to {} elements", marked.count),
            });
        }
        if let Some(intercepted_by) = marked.intercepted {
            return Err(ProbeError::Intercepted {
                selector: locator.to_string(),
                intercepted_by,
            });
        }
        Ok(())
    }

    async fn in_page_edit(
        &self,
        locator: &Locator,
        call: &str,
        token: &str,
        arg: &str,
    ) -> ProbeResult<()> {
        let failure: Option<String> = self
            .resolver_call(&format!(
                "{call}({}, {})",
                serde_json::to_string(token)?,
                serde_json::to_string(arg)?
            ))
            .await?;
        match failure {
            None => Ok(()),
            Some(reason) => Err(ProbeError::NotActionable {
                selector: locator.to_string(),
                reason,
            }),
        }
    }

    async fn input(
        &self,
        locator: &Locator,
        action: &ElementAction,
        token: &str,
    ) -> ProbeResult<()> {
        let target = format!("[{MARK_ATTR}=\"{token}\"]");
        match action {
            ElementAction::Fill(value) => {
                return self.in_page_edit(locator, "fill", token, value).await
            }
            ElementAction::SelectOption(option) => {
                return self.in_page_edit(locator, "selectOption", token, option).await
            }
            _ => {}
        }

        let element = self.page.find_element(target).await.map_err(page_err)?;
        match action {
            ElementAction::Click => {
                element.click().await.map_err(page_err)?;
            }
            ElementAction::Hover => {
                element.hover().await.map_err(page_err)?;
            }
            ElementAction::Focus => {
                element.focus().await.map_err(page_err)?;
            }
            ElementAction::Press(key) => {
                element.focus().await.map_err(page_err)?;
                element.press_key(key).await.map_err(page_err)?;
            }
            ElementAction::Fill(_) | ElementAction::SelectOption(_) => {}
        }
        Ok(())
    }
}

#[async_trait]
impl PageDriver for ChromiumDriver {
    async fn goto(&self, url: &str) -> ProbeResult<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| ProbeError::NavigationError {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn url(&self) -> ProbeResult<String> {
        Ok(self
            .page
            .url()
            .await
            .map_err(page_err)?
            .unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn query(&self, locator: &Locator) -> ProbeResult<Vec<ElementState>> {
        self.resolver_call(&format!("snapshot({})", locator.to_json()))
            .await
    }

    async fn act(&self, locator: &Locator, action: &ElementAction) -> ProbeResult<()> {
        let token = uuid::Uuid::new_v4().to_string();
        self.mark(locator, &token, action.is_pointer()).await?;
        let result = self.input(locator, action, &token).await;

        // The element may be gone after a navigating click.
        let unmark = format!("unmark({})", serde_json::to_string(&token)?);
        if let Err(e) = self.resolver_call::<serde_json::Value>(&unmark).await {
            debug!(error = %e, "unmark skipped");
        }
        result
    }

    async fn focused_style(&self) -> ProbeResult<ComputedStyleSnapshot> {
        self.resolver_call("focusedStyle()").await
    }

    async fn evaluate(&self, script: &str) -> ProbeResult<serde_json::Value> {
        self.eval_value(script).await
    }

    async fn screenshot(&self) -> ProbeResult<Vec<u8>> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        self.page.screenshot(params).await.map_err(page_err)
    }

    async fn close(&self) -> ProbeResult<()> {
        self.page.clone().close().await.map_err(page_err)?;
        if let Some(context) = self.context.clone() {
            let browser = self.browser.lock().await;
            if let Err(e) = browser.dispose_browser_context(context).await {
                warn!(error = %e, "failed to dispose browser context");
            }
        }
        Ok(())
    }
}
