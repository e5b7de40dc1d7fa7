//! siteprobe CLI library
//!
//! Command-line front end for the siteprobe harness and the kmslh.com
//! scenario suite.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
mod output;
mod runner;
pub mod scenarios;

pub use commands::{Cli, ColorArg, Commands, ListArgs, ReporterArg, RunArgs, TraceArg};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::ProgressReporter;
pub use runner::SuiteRunner;
