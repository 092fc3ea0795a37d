//! storefront-probe CLI library
//!
//! Command-line front end for the storefront-probe verification suite:
//! argument parsing, configuration layering, logging setup, progress and
//! report rendering.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
mod logging;
mod output;
mod runner;

pub use commands::{
    Cli, ColorArg, Commands, ConfigArgs, FormatArg, ListArgs, LogFormat, ProbeArgs, RunArgs,
};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use logging::{env_filter, init_tracing};
pub use output::{render_case_list, render_report_json, CaseEntry, OutputFormat, ProgressReporter};
pub use runner::{launch_chromium, ProbeRunner};
