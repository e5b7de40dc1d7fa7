//! siteprobe: run the kmslh.com UI scenarios in Chromium
//!
//! ## Usage
//!
//! ```bash
//! siteprobe list                       # Show scenario names
//! siteprobe run                        # Run every scenario
//! siteprobe run --filter "book"        # Run matching scenarios
//! siteprobe run --headed --retries 1   # Watch the browser, retry once
//! ```

use clap::Parser;
use siteprobe::runner::select;
use siteprobe::RunConfig;
use siteprobe_cli::{
    scenarios, Cli, CliConfig, CliError, CliResult, Commands, ListArgs, RunArgs, SuiteRunner,
    Verbosity,
};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every scenario passed
fn run() -> CliResult<bool> {
    let cli = Cli::parse();
    let config = build_config(&cli);
    init_logging(config.verbosity);

    match cli.command {
        Commands::List(args) => {
            list_scenarios(&args)?;
            Ok(true)
        }
        Commands::Run(args) => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(run_scenarios(config, &args))
        }
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(cli.color.into())
}

/// `RUST_LOG` overrides the level picked from `-v`/`-q`
fn init_logging(verbosity: Verbosity) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(verbosity.log_filter())),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn list_scenarios(args: &ListArgs) -> CliResult<()> {
    let all = scenarios::all();
    let selected = select(&all, args.filter.as_deref());
    if selected.is_empty() {
        return Err(CliError::NoScenarios {
            filter: args.filter.clone().unwrap_or_default(),
        });
    }
    for scenario in selected {
        println!("{}", scenario.name());
    }
    Ok(())
}

async fn run_scenarios(config: CliConfig, args: &RunArgs) -> CliResult<bool> {
    let mut run = RunConfig::load(args.config.as_deref())?;
    args.apply(&mut run);
    let run = run.validate()?;
    tracing::debug!(?run, "resolved run config");

    let mut runner = SuiteRunner::new(config);
    let report = runner.run(run, args.filter.as_deref()).await?;
    Ok(report.all_passed())
}
