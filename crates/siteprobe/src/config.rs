//! Run configuration.
//!
//! Sources, lowest to highest precedence:
//!
//! 1. built-in defaults
//! 2. CI detection (`CI` set and non-empty)
//! 3. YAML file (`siteprobe.yaml`, or an explicit path)
//! 4. command-line flags (applied by the caller)

use crate::page::PageTimeouts;
use crate::result::{ProbeError, ProbeResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

/// Config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "siteprobe.yaml";

/// Site the bundled scenarios target
pub const DEFAULT_BASE_URL: &str = "https://kmslh.com/";

/// Default per-scenario timeout (30 seconds)
pub const DEFAULT_SCENARIO_TIMEOUT_MS: u64 = 30_000;

// =============================================================================
// ENUMS
// =============================================================================

/// When to record a trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TraceMode {
    /// Never
    Off,
    /// On the first retry of a failed scenario
    #[default]
    OnFirstRetry,
    /// On every attempt
    On,
}

impl TraceMode {
    /// Whether attempt number `attempt` (1-based) records a trace
    #[must_use]
    pub const fn records(self, attempt: u32) -> bool {
        match self {
            Self::Off => false,
            Self::OnFirstRetry => attempt == 2,
            Self::On => true,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::OnFirstRetry => "on-first-retry",
            Self::On => "on",
        }
    }
}

impl fmt::Display for TraceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TraceMode {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" => Ok(Self::Off),
            "on-first-retry" => Ok(Self::OnFirstRetry),
            "on" => Ok(Self::On),
            other => Err(ProbeError::config(format!(
                "unknown trace mode {other:?} (expected off, on-first-retry or on)"
            ))),
        }
    }
}

/// Report format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReporterKind {
    /// One line per scenario on the terminal
    List,
    /// Static `index.html` in the output directory
    #[default]
    Html,
    /// `report.json` in the output directory
    Json,
}

impl fmt::Display for ReporterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::List => "list",
            Self::Html => "html",
            Self::Json => "json",
        })
    }
}

impl FromStr for ReporterKind {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "list" => Ok(Self::List),
            "html" => Ok(Self::Html),
            "json" => Ok(Self::Json),
            other => Err(ProbeError::config(format!(
                "unknown reporter {other:?} (expected list, html or json)"
            ))),
        }
    }
}

/// Browser engine; only Chromium is driven
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    /// Chromium over CDP
    #[default]
    Chromium,
}

// =============================================================================
// RUN CONFIG
// =============================================================================

/// Resolved configuration of one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Requested parallelism inside a file; scenarios still run sequentially
    pub fully_parallel: bool,
    /// Extra attempts for a failed scenario
    pub retries: u32,
    /// Worker cap; `None` means unset
    pub workers: Option<usize>,
    /// Run the browser without a window
    pub headless: bool,
    /// Trace capture mode
    pub trace: TraceMode,
    /// Browser engine
    pub browser: BrowserKind,
    /// Site root the scenarios navigate under
    pub base_url: String,
    /// Default polling-assertion timeout
    pub expect_timeout_ms: u64,
    /// Auto-wait bound for actions
    pub action_timeout_ms: u64,
    /// Bound for page navigation
    pub navigation_timeout_ms: u64,
    /// Bound for one scenario attempt
    pub scenario_timeout_ms: u64,
    /// Report format
    pub reporter: ReporterKind,
    /// Where reports and traces go
    pub output_dir: PathBuf,
    /// Chromium executable; auto-detected when unset
    pub chromium_path: Option<PathBuf>,
    /// Pass `--no-sandbox` to Chromium (containers)
    pub no_sandbox: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        let page = PageTimeouts::default();
        Self {
            fully_parallel: false,
            retries: 0,
            workers: None,
            headless: false,
            trace: TraceMode::OnFirstRetry,
            browser: BrowserKind::Chromium,
            base_url: DEFAULT_BASE_URL.to_string(),
            expect_timeout_ms: crate::page::millis(page.expect),
            action_timeout_ms: crate::page::millis(page.action),
            navigation_timeout_ms: crate::page::millis(page.navigation),
            scenario_timeout_ms: DEFAULT_SCENARIO_TIMEOUT_MS,
            reporter: ReporterKind::Html,
            output_dir: PathBuf::from("target/siteprobe"),
            chromium_path: None,
            no_sandbox: false,
        }
    }
}

/// Whether the `CI` environment variable is set and non-empty
#[must_use]
pub fn is_ci() -> bool {
    std::env::var_os("CI").is_some_and(|v| !v.is_empty())
}

impl RunConfig {
    /// Local defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults adjusted for CI: retries 2, one worker, headless
    #[must_use]
    pub fn for_environment(ci: bool) -> Self {
        let mut config = Self::default();
        if ci {
            config.retries = 2;
            config.workers = Some(1);
            config.headless = true;
        }
        config
    }

    /// Defaults, then CI detection, then the YAML file.
    ///
    /// An explicit `path` must exist; otherwise [`DEFAULT_CONFIG_FILE`] is
    /// read when present in the working directory.
    pub fn load(path: Option<&Path>) -> ProbeResult<Self> {
        let mut config = Self::for_environment(is_ci());
        let file = match path {
            Some(p) => Some(ConfigFile::read(p)?),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Some(ConfigFile::read(default)?)
                } else {
                    None
                }
            }
        };
        if let Some(file) = file {
            file.apply(&mut config);
        }
        Ok(config)
    }

    /// Check values and clamp what the runner cannot honour
    pub fn validate(mut self) -> ProbeResult<Self> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ProbeError::config(format!(
                "base_url must be an http(s) URL, got {:?}",
                self.base_url
            )));
        }
        for (name, value) in [
            ("expect_timeout_ms", self.expect_timeout_ms),
            ("action_timeout_ms", self.action_timeout_ms),
            ("navigation_timeout_ms", self.navigation_timeout_ms),
            ("scenario_timeout_ms", self.scenario_timeout_ms),
        ] {
            if value == 0 {
                return Err(ProbeError::config(format!("{name} must be positive")));
            }
        }
        match self.workers {
            Some(0) => return Err(ProbeError::config("workers must be at least 1")),
            Some(n) if n > 1 => {
                warn!(requested = n, "scenarios run sequentially; capping workers to 1");
                self.workers = Some(1);
            }
            _ => {}
        }
        if self.fully_parallel {
            warn!("fully_parallel is ignored; scenarios run sequentially");
        }
        Ok(self)
    }

    /// Timeouts for each page
    #[must_use]
    pub const fn page_timeouts(&self) -> PageTimeouts {
        PageTimeouts {
            action: Duration::from_millis(self.action_timeout_ms),
            navigation: Duration::from_millis(self.navigation_timeout_ms),
            expect: Duration::from_millis(self.expect_timeout_ms),
            poll_interval: Duration::from_millis(crate::locator::DEFAULT_POLL_INTERVAL_MS),
        }
    }

    /// Bound for one scenario attempt
    #[must_use]
    pub const fn scenario_timeout(&self) -> Duration {
        Duration::from_millis(self.scenario_timeout_ms)
    }
}

// =============================================================================
// CONFIG FILE
// =============================================================================

/// YAML overlay: only keys present in the file override
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// See [`RunConfig::fully_parallel`]
    pub fully_parallel: Option<bool>,
    /// See [`RunConfig::retries`]
    pub retries: Option<u32>,
    /// See [`RunConfig::workers`]
    pub workers: Option<usize>,
    /// See [`RunConfig::headless`]
    pub headless: Option<bool>,
    /// See [`RunConfig::trace`]
    pub trace: Option<TraceMode>,
    /// See [`RunConfig::browser`]
    pub browser: Option<BrowserKind>,
    /// See [`RunConfig::base_url`]
    pub base_url: Option<String>,
    /// See [`RunConfig::expect_timeout_ms`]
    pub expect_timeout_ms: Option<u64>,
    /// See [`RunConfig::action_timeout_ms`]
    pub action_timeout_ms: Option<u64>,
    /// See [`RunConfig::navigation_timeout_ms`]
    pub navigation_timeout_ms: Option<u64>,
    /// See [`RunConfig::scenario_timeout_ms`]
    pub scenario_timeout_ms: Option<u64>,
    /// See [`RunConfig::reporter`]
    pub reporter: Option<ReporterKind>,
    /// See [`RunConfig::output_dir`]
    pub output_dir: Option<PathBuf>,
    /// See [`RunConfig::chromium_path`]
    pub chromium_path: Option<PathBuf>,
    /// See [`RunConfig::no_sandbox`]
    pub no_sandbox: Option<bool>,
}

impl ConfigFile {
    /// Parse YAML text
    pub fn parse(yaml: &str) -> ProbeResult<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Read and parse a file
    pub fn read(path: &Path) -> ProbeResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ProbeError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        debug!(path = %path.display(), "loaded config file");
        Self::parse(&text)
    }

    /// Override the keys present in this file
    pub fn apply(self, config: &mut RunConfig) {
        macro_rules! overlay {
            ($($field:ident),* $(,)?) => {
                $(if let Some(v) = self.$field { config.$field = v; })*
            };
        }
        overlay!(
            fully_parallel,
            retries,
            headless,
            trace,
            browser,
            base_url,
            expect_timeout_ms,
            action_timeout_ms,
            navigation_timeout_ms,
            scenario_timeout_ms,
            reporter,
            output_dir,
            no_sandbox,
        );
        if self.workers.is_some() {
            config.workers = self.workers;
        }
        if self.chromium_path.is_some() {
            config.chromium_path = self.chromium_path;
        }
    }
}
