//! storefront-probe: verify the Swag Labs storefront from the command line
//!
//! ## Usage
//!
//! ```bash
//! storefront-probe run                          # Run every case
//! storefront-probe run --filter sorting         # Only the sort cases
//! storefront-probe run --no-sandbox --format json
//! storefront-probe list                         # Show case names
//! storefront-probe config --base-url http://localhost:3000
//! ```
//!
//! Exit status is 0 when every selected case passes and 1 otherwise.

use clap::Parser;
use std::process::ExitCode;
use storefront_probe::SuiteRunner;
use storefront_probe_cli::{
    init_tracing, render_case_list, Cli, CliConfig, CliResult, Commands, ConfigArgs, ListArgs,
    OutputFormat, ProbeRunner, RunArgs,
};

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Whether every selected case passed
async fn run(cli: Cli) -> CliResult<bool> {
    init_tracing(cli.verbosity(), cli.log_format)?;
    let config = CliConfig::new()
        .with_verbosity(cli.verbosity())
        .with_color(cli.color.into());

    match cli.command {
        Commands::Run(args) => run_suite(config, args).await,
        Commands::List(args) => {
            run_list(&args)?;
            Ok(true)
        }
        Commands::Config(args) => {
            run_config(&args)?;
            Ok(true)
        }
    }
}

async fn run_suite(config: CliConfig, args: RunArgs) -> CliResult<bool> {
    let probe = args.probe.resolve()?;
    let config = config
        .with_format(args.format.into())
        .with_fail_fast(args.fail_fast);
    let mut runner = ProbeRunner::new(config, probe).with_filter(args.filter);
    let report = runner.run().await?;
    Ok(report.all_passed())
}

fn run_list(args: &ListArgs) -> CliResult<()> {
    let selected = SuiteRunner::new(storefront_probe::ProbeConfig::default())
        .with_filter(args.filter.clone())
        .selected();
    let format: OutputFormat = args.format.into();
    let rendered = render_case_list(&selected, format)?;
    if !rendered.is_empty() {
        println!("{rendered}");
    }
    Ok(())
}

fn run_config(args: &ConfigArgs) -> CliResult<()> {
    let config = args.probe.resolve()?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        print!("{}", config.to_yaml()?);
    }
    Ok(())
}
