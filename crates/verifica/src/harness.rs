//! Scenario harness.
//!
//! Each scenario runs in its own session. Before the scenario body runs, the
//! setup hook loads the base URL and waits for the network to go idle. A
//! failing scenario produces one verdict with step annotations and never
//! affects the others.

use crate::driver::{LoadState, PageDriver, SessionProvider};
use crate::result::{ErrorKind, VerifyError, VerifyResult};
use async_trait::async_trait;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// One annotated step inside a scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepAnnotation {
    /// Step name
    pub name: String,
    /// Whether the step passed
    pub passed: bool,
    /// Extra detail (observed value, failure reason)
    pub detail: Option<String>,
}

/// Step annotations collected while a scenario runs
#[derive(Debug, Clone, Default)]
pub struct StepLog {
    steps: Vec<StepAnnotation>,
}

impl StepLog {
    /// Create an empty log
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a passing step
    pub fn pass(&mut self, name: impl Into<String>, detail: Option<String>) {
        self.steps.push(StepAnnotation {
            name: name.into(),
            passed: true,
            detail,
        });
    }

    /// Record a failing step
    pub fn fail(&mut self, name: impl Into<String>, detail: impl Into<String>) {
        self.steps.push(StepAnnotation {
            name: name.into(),
            passed: false,
            detail: Some(detail.into()),
        });
    }

    /// Steps recorded so far
    #[must_use]
    pub fn steps(&self) -> &[StepAnnotation] {
        &self.steps
    }

    /// Take the recorded steps
    #[must_use]
    pub fn into_steps(self) -> Vec<StepAnnotation> {
        self.steps
    }
}

/// An independent check run against a freshly loaded page
#[async_trait]
pub trait Scenario: Send + Sync {
    /// Scenario name, unique within a suite
    fn name(&self) -> &str;

    /// One-line description
    fn description(&self) -> &str;

    /// Run the check, annotating steps as it goes
    async fn run(&self, driver: &mut dyn PageDriver, steps: &mut StepLog) -> VerifyResult<()>;
}

/// Verdict for a single scenario
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    /// Scenario name
    pub name: String,
    /// Whether the scenario passed
    pub passed: bool,
    /// Failure classification
    pub error_kind: Option<ErrorKind>,
    /// Error message if failed
    pub error: Option<String>,
    /// Step annotations
    pub steps: Vec<StepAnnotation>,
    /// Scenario duration
    pub duration: Duration,
}

impl ScenarioResult {
    /// Create a passing result
    #[must_use]
    pub fn pass(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            error_kind: None,
            error: None,
            steps: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    /// Create a failing result from an error
    #[must_use]
    pub fn fail(name: impl Into<String>, error: &VerifyError) -> Self {
        Self {
            name: name.into(),
            passed: false,
            error_kind: Some(error.kind()),
            error: Some(error.to_string()),
            steps: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    /// Attach step annotations
    #[must_use]
    pub fn with_steps(mut self, steps: Vec<StepAnnotation>) -> Self {
        self.steps = steps;
        self
    }

    /// Set duration
    #[must_use]
    pub const fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }
}

/// Results from running a suite of scenarios
#[derive(Debug, Clone, Serialize)]
pub struct SuiteResults {
    /// Suite name
    pub suite_name: String,
    /// Page the suite ran against
    pub base_url: String,
    /// Individual verdicts
    pub results: Vec<ScenarioResult>,
    /// Total duration
    pub duration: Duration,
}

impl SuiteResults {
    /// Check if all scenarios passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }

    /// Count passed scenarios
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    /// Count failed scenarios
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.passed).count()
    }

    /// Get total scenario count
    #[must_use]
    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// Get failed scenarios
    #[must_use]
    pub fn failures(&self) -> Vec<&ScenarioResult> {
        self.results.iter().filter(|r| !r.passed).collect()
    }
}

/// Runs scenarios, each in a fresh session behind the setup hook
#[derive(Debug, Clone)]
pub struct Harness {
    /// Page loaded before every scenario
    pub base_url: String,
    /// Load state awaited after navigation
    pub load_state: LoadState,
    /// Stop after the first failing scenario
    pub fail_fast: bool,
}

impl Harness {
    /// Create a harness for a base URL
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            load_state: LoadState::NetworkIdle,
            fail_fast: false,
        }
    }

    /// Enable fail-fast mode
    #[must_use]
    pub const fn with_fail_fast(mut self) -> Self {
        self.fail_fast = true;
        self
    }

    /// Override the awaited load state
    #[must_use]
    pub const fn with_load_state(mut self, state: LoadState) -> Self {
        self.load_state = state;
        self
    }

    /// Load the base URL and wait for the page to settle
    ///
    /// # Errors
    ///
    /// Propagates navigation and wait failures.
    pub async fn setup(&self, driver: &mut dyn PageDriver) -> VerifyResult<()> {
        driver.navigate(&self.base_url).await?;
        driver.wait_for_load_state(self.load_state).await
    }

    /// Run one scenario against an open session
    pub async fn run_scenario(
        &self,
        scenario: &dyn Scenario,
        driver: &mut dyn PageDriver,
    ) -> ScenarioResult {
        let start = Instant::now();
        let mut steps = StepLog::new();
        info!(scenario = scenario.name(), url = %self.base_url, "scenario started");

        let outcome = match self.setup(driver).await {
            Ok(()) => {
                steps.pass("setup", Some(format!("loaded {}", self.base_url)));
                scenario.run(driver, &mut steps).await
            }
            Err(e) => {
                steps.fail("setup", e.to_string());
                Err(e)
            }
        };

        let result = match outcome {
            Ok(()) => {
                info!(scenario = scenario.name(), "scenario passed");
                ScenarioResult::pass(scenario.name())
            }
            Err(e) => {
                warn!(scenario = scenario.name(), kind = %e.kind(), error = %e, "scenario failed");
                ScenarioResult::fail(scenario.name(), &e)
            }
        };
        result
            .with_steps(steps.into_steps())
            .with_duration(start.elapsed())
    }

    /// Run every scenario whose name is in `only` (all when empty)
    pub async fn run_all(
        &self,
        suite_name: &str,
        provider: &mut dyn SessionProvider,
        scenarios: &[Box<dyn Scenario>],
        only: &[String],
    ) -> SuiteResults {
        let start = Instant::now();
        let mut results = Vec::new();

        for scenario in scenarios {
            if !only.is_empty() && !only.iter().any(|n| n == scenario.name()) {
                continue;
            }
            let result = match provider.open().await {
                Ok(mut driver) => {
                    let result = self.run_scenario(scenario.as_ref(), driver.as_mut()).await;
                    if let Err(e) = driver.close().await {
                        warn!(scenario = scenario.name(), error = %e, "session did not close cleanly");
                    }
                    result
                }
                Err(e) => {
                    warn!(scenario = scenario.name(), error = %e, "session failed to open");
                    ScenarioResult::fail(scenario.name(), &e)
                }
            };
            let stop = self.fail_fast && !result.passed;
            results.push(result);
            if stop {
                break;
            }
        }

        SuiteResults {
            suite_name: suite_name.to_string(),
            base_url: self.base_url.clone(),
            results,
            duration: start.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{MockDriver, MockElement, MockSessions};
    use crate::locator::Selector;

    struct Finds(&'static str);

    #[async_trait]
    impl Scenario for Finds {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "locates a css selector"
        }

        async fn run(&self, driver: &mut dyn PageDriver, steps: &mut StepLog) -> VerifyResult<()> {
            let handle = driver.locate(&Selector::css(self.0)).await?;
            steps.pass("locate", Some(handle.describe()));
            Ok(())
        }
    }

    fn page() -> MockDriver {
        MockDriver::new().with_element(MockElement::new("h", "header").matches(Selector::css("header")))
    }

    fn suite() -> Vec<Box<dyn Scenario>> {
        vec![
            Box::new(Finds("header")),
            Box::new(Finds("footer")),
            Box::new(Finds("header")),
        ]
    }

    mod result_tests {
        use super::*;

        #[test]
        fn test_fail_carries_kind() {
            let err = VerifyError::timeout("click", 100);
            let r = ScenarioResult::fail("theme", &err);
            assert!(!r.passed);
            assert_eq!(r.error_kind, Some(ErrorKind::DriverTimeout));
            assert!(r.error.unwrap().contains("click"));
        }

        #[test]
        fn test_step_log() {
            let mut log = StepLog::new();
            log.pass("a", None);
            log.fail("b", "nope");
            assert_eq!(log.steps().len(), 2);
            assert!(!log.into_steps()[1].passed);
        }
    }

    mod run_tests {
        use super::*;

        #[tokio::test]
        async fn test_setup_hook_runs_first() {
            let harness = Harness::new("https://react.dev");
            let mut driver = page();
            let result = harness.run_scenario(&Finds("header"), &mut driver).await;
            assert!(result.passed);
            assert_eq!(driver.history()[0], "navigate:https://react.dev");
            assert_eq!(driver.history()[1], "wait_for_load_state:networkidle");
            assert_eq!(result.steps[0].name, "setup");
            assert_eq!(result.steps[1].detail.as_deref(), Some("<header#h>"));
        }

        #[tokio::test]
        async fn test_setup_failure_skips_body() {
            let harness = Harness::new("https://react.dev");
            let mut driver = page().with_timeout_on("navigate");
            let result = harness.run_scenario(&Finds("header"), &mut driver).await;
            assert!(!result.passed);
            assert_eq!(result.error_kind, Some(ErrorKind::DriverTimeout));
            assert!(!driver.was_called("locate"));
        }

        #[tokio::test]
        async fn test_failures_are_isolated() {
            let harness = Harness::new("https://react.dev");
            let mut sessions = MockSessions::new(page());
            let results = harness.run_all("suite", &mut sessions, &suite(), &[]).await;
            assert_eq!(results.total(), 3);
            assert_eq!(results.passed_count(), 2);
            assert_eq!(results.failures()[0].name, "footer");
            assert_eq!(sessions.opened, 3);
            assert_eq!(sessions.closed(), 3);
        }

        #[tokio::test]
        async fn test_close_failure_keeps_verdict() {
            let harness = Harness::new("https://react.dev");
            let mut sessions = MockSessions::new(page().with_timeout_on("close"));
            let only = vec!["header".to_string()];
            let results = harness.run_all("suite", &mut sessions, &suite(), &only).await;
            assert!(results.all_passed());
            assert_eq!(sessions.closed(), 0);
        }

        #[tokio::test]
        async fn test_configured_load_state() {
            let harness =
                Harness::new("https://react.dev").with_load_state(LoadState::DomContentLoaded);
            let mut driver = page();
            harness.setup(&mut driver).await.unwrap();
            assert_eq!(driver.history()[1], "wait_for_load_state:DOMContentLoaded");
        }

        #[tokio::test]
        async fn test_fail_fast_stops() {
            let harness = Harness::new("https://react.dev").with_fail_fast();
            let mut sessions = MockSessions::new(page());
            let results = harness.run_all("suite", &mut sessions, &suite(), &[]).await;
            assert_eq!(results.total(), 2);
            assert!(!results.all_passed());
        }

        #[tokio::test]
        async fn test_only_filter() {
            let harness = Harness::new("https://react.dev");
            let mut sessions = MockSessions::new(page());
            let only = vec!["footer".to_string()];
            let results = harness.run_all("suite", &mut sessions, &suite(), &only).await;
            assert_eq!(results.total(), 1);
            assert_eq!(results.failed_count(), 1);
        }
    }
}
