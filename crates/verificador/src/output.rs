//! Report rendering and progress display

use chrono::{DateTime, Utc};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;
use verifica::{ErrorKind, ScenarioResult, StepAnnotation, SuiteResults};

use crate::config::Verbosity;
use crate::error::CliResult;

/// Spinner shown on stderr while scenarios run
#[derive(Debug)]
pub struct RunProgress {
    bar: Option<ProgressBar>,
}

impl RunProgress {
    /// Start a spinner unless `hidden`
    #[must_use]
    pub fn start(message: &str, hidden: bool) -> Self {
        if hidden {
            return Self { bar: None };
        }
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar: Some(bar) }
    }

    /// Remove the spinner
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}

/// Human-readable suite report
#[derive(Debug, Clone, Copy)]
pub struct TextReport {
    /// Whether to use colors
    pub use_color: bool,
    /// Output verbosity
    pub verbosity: Verbosity,
}

impl TextReport {
    /// Create a renderer
    #[must_use]
    pub const fn new(use_color: bool, verbosity: Verbosity) -> Self {
        Self {
            use_color,
            verbosity,
        }
    }

    fn mark(&self, passed: bool) -> String {
        match (passed, self.use_color) {
            (true, true) => style("✓").green().bold().to_string(),
            (false, true) => style("✗").red().bold().to_string(),
            (true, false) => "PASS".to_string(),
            (false, false) => "FAIL".to_string(),
        }
    }

    fn scenario(&self, result: &ScenarioResult, out: &mut String) {
        // Quiet mode only reports failures
        if result.passed && self.verbosity.is_quiet() {
            return;
        }
        out.push_str(&format!(
            "  {} {} ({})\n",
            self.mark(result.passed),
            result.name,
            format_duration(result.duration)
        ));
        if let (Some(kind), Some(error)) = (result.error_kind, &result.error) {
            let kind = if self.use_color {
                style(kind.as_str()).red().to_string()
            } else {
                kind.as_str().to_string()
            };
            out.push_str(&format!("      {kind}: {error}\n"));
        }
        if self.verbosity.is_verbose() || !result.passed {
            for step in &result.steps {
                self.step(step, out);
            }
        }
    }

    fn step(&self, step: &StepAnnotation, out: &mut String) {
        if step.passed && !self.verbosity.is_verbose() {
            return;
        }
        let mark = if self.use_color {
            if step.passed {
                style("·").dim().to_string()
            } else {
                style("!").red().to_string()
            }
        } else if step.passed {
            "-".to_string()
        } else {
            "!".to_string()
        };
        match &step.detail {
            Some(detail) => out.push_str(&format!("        {mark} {}: {detail}\n", step.name)),
            None => out.push_str(&format!("        {mark} {}\n", step.name)),
        }
    }

    /// Render the suite verdicts
    #[must_use]
    pub fn render(&self, results: &SuiteResults) -> String {
        let mut out = String::new();
        if !self.verbosity.is_quiet() {
            let header = format!("{} @ {}", results.suite_name, results.base_url);
            if self.use_color {
                out.push_str(&format!("{}\n", style(header).bold()));
            } else {
                out.push_str(&format!("{header}\n"));
            }
        }
        for result in &results.results {
            self.scenario(result, &mut out);
        }

        let summary = format!(
            "{} scenarios: {} passed, {} failed ({})",
            results.total(),
            results.passed_count(),
            results.failed_count(),
            format_duration(results.duration)
        );
        let summary = match (self.use_color, results.all_passed()) {
            (true, true) => style(summary).green().to_string(),
            (true, false) => style(summary).red().to_string(),
            (false, _) => summary,
        };
        out.push_str(&summary);
        out.push('\n');
        out
    }
}

/// Machine-readable suite report
#[derive(Debug, Clone, Serialize)]
pub struct JsonReport {
    /// Unique id for this run
    pub run_id: Uuid,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Suite name
    pub suite: String,
    /// Page under test
    pub base_url: String,
    /// All scenarios passed
    pub passed: bool,
    /// Scenarios run
    pub total: usize,
    /// Passing scenarios
    pub passed_count: usize,
    /// Failing scenarios
    pub failed_count: usize,
    /// Wall-clock duration
    pub duration_ms: u64,
    /// Per-scenario verdicts
    pub scenarios: Vec<JsonScenario>,
}

/// One scenario in a [`JsonReport`]
#[derive(Debug, Clone, Serialize)]
pub struct JsonScenario {
    /// Scenario name
    pub name: String,
    /// Verdict
    pub passed: bool,
    /// Failure classification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Failure message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Duration
    pub duration_ms: u64,
    /// Step annotations
    pub steps: Vec<StepAnnotation>,
}

impl JsonReport {
    /// Build a report for a finished run
    #[must_use]
    pub fn new(results: &SuiteResults, run_id: Uuid, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            started_at,
            suite: results.suite_name.clone(),
            base_url: results.base_url.clone(),
            passed: results.all_passed(),
            total: results.total(),
            passed_count: results.passed_count(),
            failed_count: results.failed_count(),
            duration_ms: millis(results.duration),
            scenarios: results
                .results
                .iter()
                .map(|r| JsonScenario {
                    name: r.name.clone(),
                    passed: r.passed,
                    error_kind: r.error_kind,
                    error: r.error.clone(),
                    duration_ms: millis(r.duration),
                    steps: r.steps.clone(),
                })
                .collect(),
        }
    }

    /// Serialize as pretty JSON
    ///
    /// # Errors
    ///
    /// Returns a JSON error if serialization fails.
    pub fn render(&self) -> CliResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Format duration for display
#[must_use]
pub fn format_duration(d: Duration) -> String {
    let ms = d.as_millis();
    if ms < 1000 {
        format!("{ms}ms")
    } else {
        format!("{:.2}s", d.as_secs_f64())
    }
}
