//! CLI command definitions using clap

use crate::config::{ColorChoice, Verbosity};
use crate::error::{CliError, CliResult};
use crate::output::OutputFormat;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use storefront_probe::{BrowserConfig, ProbeConfig};

/// storefront-probe: verify the Swag Labs storefront through a real browser
#[derive(Parser, Debug)]
#[command(name = "storefront-probe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (failures and summary only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Log line format on stderr
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Verbosity selected by `-q` and `-v`
    #[must_use]
    pub const fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the verification suite against Chromium
    Run(RunArgs),

    /// List the verification cases
    List(ListArgs),

    /// Print the effective configuration
    Config(ConfigArgs),
}

/// Settings shared by every command that resolves a [`ProbeConfig`]
#[derive(Args, Debug, Default, Clone)]
pub struct ProbeArgs {
    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Storefront base URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Disable the Chromium sandbox (containers, CI)
    #[arg(long)]
    pub no_sandbox: bool,

    /// Chromium binary
    #[arg(long)]
    pub chromium: Option<String>,

    /// Implicit-wait timeout for every action and assertion
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

impl ProbeArgs {
    /// Defaults, then the file, then the environment, then these flags
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or the result is invalid.
    pub fn resolve(&self) -> CliResult<ProbeConfig> {
        self.resolve_with_env(|key| std::env::var(key).ok())
    }

    /// As [`Self::resolve`], reading variables through `lookup`
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or the result is invalid.
    pub fn resolve_with_env(&self, lookup: impl Fn(&str) -> Option<String>) -> CliResult<ProbeConfig> {
        let base = match &self.config {
            Some(path) => ProbeConfig::load(path)?,
            None => ProbeConfig::default(),
        };
        let mut config = base.apply_env_from(lookup);
        if let Some(url) = &self.base_url {
            config = config.with_base_url(url.clone());
        }
        if let Some(timeout_ms) = self.timeout_ms {
            if timeout_ms == 0 {
                return Err(CliError::invalid_argument("--timeout-ms must be positive"));
            }
            config = config.with_timeout(timeout_ms);
        }
        let mut browser: BrowserConfig = config.browser.clone();
        if self.headed {
            browser = browser.with_headless(false);
        }
        if self.no_sandbox {
            browser = browser.with_no_sandbox();
        }
        if let Some(path) = &self.chromium {
            browser = browser.with_chromium_path(path.clone());
        }
        config = config.with_browser(browser);
        config.validate()?;
        Ok(config)
    }
}

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Browser and storefront settings
    #[command(flatten)]
    pub probe: ProbeArgs,

    /// Only run cases whose name contains this text (case-insensitive)
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Stop after the first failing case
    #[arg(long)]
    pub fail_fast: bool,

    /// Report format
    #[arg(long, default_value = "text")]
    pub format: FormatArg,
}

/// Arguments for the list command
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only list cases whose name contains this text (case-insensitive)
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Listing format
    #[arg(long, default_value = "text")]
    pub format: FormatArg,
}

/// Arguments for the config command
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Browser and storefront settings
    #[command(flatten)]
    pub probe: ProbeArgs,

    /// Print as JSON instead of YAML
    #[arg(long)]
    pub json: bool,
}

/// Report format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum FormatArg {
    /// Human-readable text
    #[default]
    Text,
    /// JSON
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => Self::Text,
            FormatArg::Json => Self::Json,
        }
    }
}

/// Log line format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Color argument for CLI
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
