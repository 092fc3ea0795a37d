//! Output formatting and progress reporting

use crate::error::CliResult;
use console::{style, Style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use storefront_probe::{CaseOutcome, Group, Scenario, SuiteReport};

/// Output format for reports and listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON output
    Json,
}

/// One line of `list` output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseEntry {
    /// Case name
    pub name: String,
    /// Precondition group
    pub group: Group,
}

impl From<&Scenario> for CaseEntry {
    fn from(scenario: &Scenario) -> Self {
        Self {
            name: scenario.name.to_string(),
            group: scenario.group,
        }
    }
}

/// Render the selected cases
pub fn render_case_list(scenarios: &[Scenario], format: OutputFormat) -> CliResult<String> {
    Ok(match format {
        OutputFormat::Text => scenarios
            .iter()
            .map(|s| format!("{:<10} {}", s.group.to_string(), s.name))
            .collect::<Vec<_>>()
            .join("\n"),
        OutputFormat::Json => {
            let entries: Vec<CaseEntry> = scenarios.iter().map(CaseEntry::from).collect();
            serde_json::to_string_pretty(&entries)?
        }
    })
}

/// Render a finished suite as JSON
pub fn render_report_json(report: &SuiteReport) -> CliResult<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Progress reporter for a suite run
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    progress_bar: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stdout(),
            progress_bar: None,
            use_color,
            quiet,
        }
    }

    /// Start a progress bar over `total` cases
    pub fn start_progress(&mut self, total: u64, message: &str) {
        if self.quiet {
            return;
        }

        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb.set_message(message.to_string());
        self.progress_bar = Some(pb);
    }

    /// Increment progress
    pub fn increment(&self, delta: u64) {
        if let Some(ref pb) = self.progress_bar {
            pb.inc(delta);
        }
    }

    /// Update progress message
    pub fn set_message(&self, message: &str) {
        if let Some(ref pb) = self.progress_bar {
            pb.set_message(message.to_string());
        }
    }

    /// Remove the progress bar
    pub fn finish(&self) {
        if let Some(ref pb) = self.progress_bar {
            pb.finish_and_clear();
        }
    }

    fn line(&self, text: &str) {
        let write = || {
            let _ = self.term.write_line(text);
        };
        match self.progress_bar {
            Some(ref pb) => pb.suspend(write),
            None => write(),
        }
    }

    fn prefix(&self, symbol: &'static str, plain: &'static str, style: &Style) -> String {
        if self.use_color {
            style.apply_to(symbol).to_string()
        } else {
            plain.to_string()
        }
    }

    /// Report one finished case; failures carry their diagnostic
    pub fn case(&self, outcome: &CaseOutcome) {
        if outcome.passed {
            if self.quiet {
                return;
            }
            let prefix = self.prefix("✓", "PASS", &Style::new().green().bold());
            self.line(&format!("{prefix} {} ({}ms)", outcome.name, outcome.elapsed_ms));
            return;
        }

        // Always print failures, even in quiet mode
        let prefix = self.prefix("✗", "FAIL", &Style::new().red().bold());
        self.line(&format!("{prefix} {}", outcome.name));
        if let Some(diag) = &outcome.diagnostic {
            self.line(&format!("    selector: {}", diag.target));
            self.line(&format!("    expected: {}", diag.expected));
            self.line(&format!("    observed: {}", diag.observed));
            self.line(&format!("    waited:   {}ms", diag.elapsed_ms));
        } else if let Some(error) = &outcome.error {
            self.line(&format!("    {error}"));
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = self.prefix("⚠", "WARN", &Style::new().yellow().bold());
        self.line(&format!("{prefix} {message}"));
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        if self.quiet {
            return;
        }

        let styled = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };

        self.line("");
        self.line(&styled);
    }

    /// Print the run summary
    pub fn summary(&self, passed: usize, failed: usize, duration: Duration) {
        if self.quiet && failed == 0 {
            return;
        }

        let total = passed + failed;
        let duration_secs = duration.as_secs_f64();
        self.line("");

        if self.use_color {
            let passed_style = Style::new().green().bold();
            let failed_style = Style::new().red().bold();
            let status = if failed > 0 {
                failed_style.apply_to("FAILED")
            } else {
                passed_style.apply_to("PASSED")
            };
            self.line(&format!(
                "{status} {total} cases in {duration_secs:.2}s ({} passed, {} failed)",
                passed_style.apply_to(passed),
                if failed > 0 {
                    failed_style.apply_to(failed).to_string()
                } else {
                    failed.to_string()
                },
            ));
        } else {
            let status = if failed > 0 { "FAILED" } else { "PASSED" };
            self.line(&format!(
                "{status} {total} cases in {duration_secs:.2}s ({passed} passed, {failed} failed)"
            ));
        }
    }
}
