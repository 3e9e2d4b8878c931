//! Built-in scenarios: landmarks, theme toggle, tab order and the
//! search-and-favorites round trip.

use crate::config::VerificaConfig;
use crate::driver::PageDriver;
use crate::focus::{FocusOrderMachine, FocusPlan};
use crate::harness::{Scenario, StepLog};
use crate::presence::PresenceChecker;
use crate::result::VerifyResult;
use crate::theme::ThemeToggle;
use crate::workflow::{PhaseId, Workflow};
use async_trait::async_trait;

/// Header and footer are present
#[derive(Debug, Clone)]
pub struct LandmarksScenario {
    checker: PresenceChecker,
}

impl LandmarksScenario {
    /// Wrap a presence checker
    #[must_use]
    pub const fn new(checker: PresenceChecker) -> Self {
        Self { checker }
    }
}

#[async_trait]
impl Scenario for LandmarksScenario {
    fn name(&self) -> &str {
        "landmarks"
    }

    fn description(&self) -> &str {
        "structural landmarks are present"
    }

    async fn run(&self, driver: &mut dyn PageDriver, steps: &mut StepLog) -> VerifyResult<()> {
        match self.checker.check(driver).await {
            Ok(findings) => {
                for f in findings {
                    steps.pass(
                        f.landmark,
                        Some(format!("semantic={} class={}", f.semantic_count, f.class_count)),
                    );
                }
                Ok(())
            }
            Err(e) => {
                steps.fail("landmarks", e.to_string());
                Err(e)
            }
        }
    }
}

/// One click on the toggle turns the theme dark
#[derive(Debug, Clone)]
pub struct ThemeScenario {
    toggle: ThemeToggle,
}

impl ThemeScenario {
    /// Wrap a toggle description
    #[must_use]
    pub const fn new(toggle: ThemeToggle) -> Self {
        Self { toggle }
    }
}

#[async_trait]
impl Scenario for ThemeScenario {
    fn name(&self) -> &str {
        "theme-toggle"
    }

    fn description(&self) -> &str {
        "theme toggle applies the dark class"
    }

    async fn run(&self, driver: &mut dyn PageDriver, steps: &mut StepLog) -> VerifyResult<()> {
        match self.toggle.check(driver).await {
            Ok(report) => {
                steps.pass(
                    "toggle",
                    Some(format!("\"{}\" -> \"{}\"", report.before, report.after)),
                );
                Ok(())
            }
            Err(e) => {
                steps.fail("toggle", e.to_string());
                Err(e)
            }
        }
    }
}

/// Keyboard traversal reaches every target in order
#[derive(Debug, Clone)]
pub struct FocusOrderScenario {
    plan: FocusPlan,
}

impl FocusOrderScenario {
    /// Wrap a focus plan
    #[must_use]
    pub const fn new(plan: FocusPlan) -> Self {
        Self { plan }
    }
}

#[async_trait]
impl Scenario for FocusOrderScenario {
    fn name(&self) -> &str {
        "focus-order"
    }

    fn description(&self) -> &str {
        "tab order matches the expected targets"
    }

    async fn run(&self, driver: &mut dyn PageDriver, steps: &mut StepLog) -> VerifyResult<()> {
        let mut machine = FocusOrderMachine::new(&self.plan);
        let result = machine.run(driver).await;
        for cp in machine.checkpoints() {
            let name = format!("{}. {}", cp.index + 1, cp.name);
            if cp.passed {
                steps.pass(name, cp.actual.clone());
            } else {
                steps.fail(name, cp.actual.clone().unwrap_or_default());
            }
        }
        result.map(|_| ())
    }
}

/// Query, select, save, reopen and retrieve a favorite
#[derive(Debug, Clone)]
pub struct SearchFavoritesScenario {
    workflow: Workflow,
}

impl SearchFavoritesScenario {
    /// Wrap a workflow
    #[must_use]
    pub const fn new(workflow: Workflow) -> Self {
        Self { workflow }
    }
}

#[async_trait]
impl Scenario for SearchFavoritesScenario {
    fn name(&self) -> &str {
        "search-favorites"
    }

    fn description(&self) -> &str {
        "a saved search result can be retrieved from favorites"
    }

    async fn run(&self, driver: &mut dyn PageDriver, steps: &mut StepLog) -> VerifyResult<()> {
        let report = self.workflow.execute(driver).await;
        for outcome in &report.outcomes {
            if outcome.passed {
                let detail = match outcome.phase {
                    PhaseId::Select => report.session.selected_result.clone(),
                    PhaseId::OpenQuery => report.session.query_text.clone(),
                    _ => None,
                };
                steps.pass(outcome.phase.as_str(), detail);
            } else {
                steps.fail(
                    outcome.phase.as_str(),
                    outcome.error.clone().unwrap_or_default(),
                );
            }
        }
        report.into_result().map(|_| ())
    }
}

/// Scenarios described by a configuration, in run order
///
/// # Errors
///
/// Returns [`crate::VerifyError::InvalidPlan`] if the focus list is invalid.
pub fn build_suite(config: &VerificaConfig) -> VerifyResult<Vec<Box<dyn Scenario>>> {
    Ok(vec![
        Box::new(LandmarksScenario::new(PresenceChecker::new(
            config.landmarks.clone(),
        ))),
        Box::new(ThemeScenario::new(config.theme.clone())),
        Box::new(FocusOrderScenario::new(config.focus_plan()?)),
        Box::new(SearchFavoritesScenario::new(Workflow::standard(
            config.search.clone(),
        ))),
    ])
}
