//! Suite runner: progress, per-case reporting and the Chromium factory

use crate::config::CliConfig;
use crate::error::CliResult;
use crate::output::{render_report_json, OutputFormat, ProgressReporter};
use std::future::Future;
use std::time::Duration;
use storefront_probe::{PageDriver, ProbeConfig, ProbeResult, Scenario, SuiteReport, SuiteRunner};

/// Launch a fresh Chromium page for one case
#[cfg(feature = "browser")]
pub async fn launch_chromium(config: &ProbeConfig) -> ProbeResult<Box<dyn PageDriver>> {
    let driver =
        storefront_probe::ChromiumDriver::launch(&config.browser, config.navigation_timeout()).await?;
    Ok(Box::new(driver))
}

/// Without the `browser` feature every launch fails
#[cfg(not(feature = "browser"))]
pub async fn launch_chromium(config: &ProbeConfig) -> ProbeResult<Box<dyn PageDriver>> {
    let _ = config;
    Err(storefront_probe::ProbeError::BrowserLaunch {
        message: "built without the `browser` feature".to_string(),
    })
}

/// Runs the selected cases and reports them as they finish
#[derive(Debug)]
pub struct ProbeRunner {
    config: CliConfig,
    probe: ProbeConfig,
    filter: Option<String>,
    reporter: ProgressReporter,
}

impl ProbeRunner {
    /// Create a runner
    #[must_use]
    pub fn new(config: CliConfig, probe: ProbeConfig) -> Self {
        let reporter = ProgressReporter::new(config.color.should_color(), !config.shows_progress());
        Self {
            config,
            probe,
            filter: None,
            reporter,
        }
    }

    /// Only run cases whose name contains `filter`
    #[must_use]
    pub fn with_filter(mut self, filter: Option<String>) -> Self {
        self.filter = filter;
        self
    }

    fn suite(&self) -> SuiteRunner {
        SuiteRunner::new(self.probe.clone())
            .with_filter(self.filter.clone())
            .with_fail_fast(self.config.fail_fast)
    }

    /// Cases the filter selects
    #[must_use]
    pub fn selected(&self) -> Vec<Scenario> {
        self.suite().selected()
    }

    /// Run against Chromium
    ///
    /// # Errors
    ///
    /// Fails only if the JSON report cannot be rendered.
    pub async fn run(&mut self) -> CliResult<SuiteReport> {
        let probe = self.probe.clone();
        self.run_with(|| launch_chromium(&probe)).await
    }

    /// Run with drivers from `factory`
    ///
    /// # Errors
    ///
    /// Fails only if the JSON report cannot be rendered.
    pub async fn run_with<F, Fut>(&mut self, factory: F) -> CliResult<SuiteReport>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = ProbeResult<Box<dyn PageDriver>>>,
    {
        let selected = self.selected();
        tracing::info!(
            base_url = %self.probe.base_url,
            cases = selected.len(),
            "starting suite"
        );

        let report = if selected.is_empty() {
            self.reporter.warning("No cases match the filter");
            SuiteReport::default()
        } else {
            self.reporter
                .header(&format!("Verifying {}", self.probe.base_url));
            self.reporter
                .start_progress(selected.len() as u64, selected[0].name);
            let reporter = &self.reporter;
            let report = self
                .suite()
                .run(factory, |outcome| {
                    reporter.case(outcome);
                    reporter.increment(1);
                })
                .await;
            reporter.finish();
            report
        };

        match self.config.format {
            OutputFormat::Text => self.reporter.summary(
                report.passed_count(),
                report.failed_count(),
                Duration::from_millis(report.elapsed_ms),
            ),
            OutputFormat::Json => println!("{}", render_report_json(&report)?),
        }
        Ok(report)
    }
}
