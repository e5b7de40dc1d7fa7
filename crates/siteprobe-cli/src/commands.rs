//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use siteprobe::{ReporterKind, RunConfig, TraceMode};
use std::path::PathBuf;

/// siteprobe: browser-driven UI scenarios for kmslh.com
#[derive(Parser, Debug)]
#[command(name = "siteprobe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run scenarios in Chromium
    Run(RunArgs),

    /// List available scenarios
    List(ListArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunArgs {
    /// Only run scenarios whose name contains this pattern
    #[arg(short, long)]
    pub filter: Option<String>,

    /// YAML config file (default: ./siteprobe.yaml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Run without a browser window
    #[arg(long, conflicts_with = "headed")]
    pub headless: bool,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Extra attempts for a failed scenario
    #[arg(long)]
    pub retries: Option<u32>,

    /// Worker cap (scenarios run sequentially)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Trace capture mode
    #[arg(long)]
    pub trace: Option<TraceArg>,

    /// Report format
    #[arg(long)]
    pub reporter: Option<ReporterArg>,

    /// Output directory for reports and traces
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Site root the scenarios navigate under
    #[arg(long, env = "SITEPROBE_BASE_URL")]
    pub base_url: Option<String>,

    /// Chromium executable
    #[arg(long, env = "CHROMIUM_PATH")]
    pub chromium: Option<PathBuf>,

    /// Pass --no-sandbox to Chromium (containers)
    #[arg(long)]
    pub no_sandbox: bool,
}

impl RunArgs {
    /// Override `config` with the flags that were given
    pub fn apply(&self, config: &mut RunConfig) {
        if self.headless {
            config.headless = true;
        }
        if self.headed {
            config.headless = false;
        }
        if let Some(retries) = self.retries {
            config.retries = retries;
        }
        if let Some(workers) = self.workers {
            config.workers = Some(workers);
        }
        if let Some(trace) = self.trace {
            config.trace = trace.into();
        }
        if let Some(reporter) = self.reporter {
            config.reporter = reporter.into();
        }
        if let Some(ref output) = self.output {
            config.output_dir.clone_from(output);
        }
        if let Some(ref base_url) = self.base_url {
            config.base_url.clone_from(base_url);
        }
        if let Some(ref chromium) = self.chromium {
            config.chromium_path = Some(chromium.clone());
        }
        if self.no_sandbox {
            config.no_sandbox = true;
        }
    }
}

/// Arguments for the list command
#[derive(Parser, Debug, Default)]
pub struct ListArgs {
    /// Only list scenarios whose name contains this pattern
    #[arg(short, long)]
    pub filter: Option<String>,
}

/// Trace mode argument
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TraceArg {
    /// Never record
    Off,
    /// Record the first retry of a failed scenario
    OnFirstRetry,
    /// Record every attempt
    On,
}

impl From<TraceArg> for TraceMode {
    fn from(arg: TraceArg) -> Self {
        match arg {
            TraceArg::Off => Self::Off,
            TraceArg::OnFirstRetry => Self::OnFirstRetry,
            TraceArg::On => Self::On,
        }
    }
}

/// Reporter argument
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReporterArg {
    /// One line per scenario
    List,
    /// Static HTML report
    Html,
    /// JSON report
    Json,
}

impl From<ReporterArg> for ReporterKind {
    fn from(arg: ReporterArg) -> Self {
        match arg {
            ReporterArg::List => Self::List,
            ReporterArg::Html => Self::Html,
            ReporterArg::Json => Self::Json,
        }
    }
}

/// Color argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
