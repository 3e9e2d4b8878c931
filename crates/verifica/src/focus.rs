//! Focus-order state machine.
//!
//! Walks an ordered list of named focus targets. Before each checkpoint the
//! machine dispatches a fixed number of focus-advance keys, then asserts that
//! the target element is the active element.
//!
//! ```text
//!  NotStarted ──ok──► AtTarget(0) ──ok──► AtTarget(1) ─ … ─► Completed
//!       │                 │                   │
//!       └──mismatch──► Failed(0)          Failed(1)   (terminal)
//! ```
//!
//! Advance counts are a property of the page layout and are supplied by the
//! caller. Focus leaving the page after an advance batch is an immediate
//! failure; nothing is retried.

use crate::driver::{Key, PageDriver};
use crate::locator::Selector;
use crate::result::{VerifyError, VerifyResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Traversal action issued between checkpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TraversalAction {
    /// Move focus to the next element in tab order
    #[default]
    AdvanceFocus,
}

impl TraversalAction {
    /// Key dispatched for this action
    #[must_use]
    pub const fn key(self) -> Key {
        match self {
            Self::AdvanceFocus => Key::Tab,
        }
    }
}

/// Actions issued before a checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalStep {
    /// Action to issue
    pub action: TraversalAction,
    /// Number of times to issue it (at least 1)
    pub repeat: u32,
}

impl TraversalStep {
    /// Advance focus `repeat` times
    #[must_use]
    pub const fn advance(repeat: u32) -> Self {
        Self {
            action: TraversalAction::AdvanceFocus,
            repeat,
        }
    }
}

/// A named element expected to receive focus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusTarget {
    /// Target name, unique within a plan
    pub name: String,
    /// How to locate the target
    pub selector: Selector,
    /// Position in the page's tab sequence
    pub ordinal: u32,
}

impl FocusTarget {
    /// Create a focus target
    #[must_use]
    pub fn new(name: impl Into<String>, selector: Selector, ordinal: u32) -> Self {
        Self {
            name: name.into(),
            selector,
            ordinal,
        }
    }
}

/// Validated, ordered list of checkpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusPlan {
    entries: Vec<(FocusTarget, TraversalStep)>,
}

impl FocusPlan {
    /// Build a plan, enforcing its invariants
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::InvalidPlan`] if the list is empty, a repeat
    /// count is zero, a name repeats, or ordinals are not strictly increasing.
    pub fn new(entries: Vec<(FocusTarget, TraversalStep)>) -> VerifyResult<Self> {
        if entries.is_empty() {
            return Err(VerifyError::invalid_plan("focus plan has no targets"));
        }

        let mut names = HashSet::new();
        let mut last_ordinal: Option<u32> = None;
        for (target, step) in &entries {
            if step.repeat == 0 {
                return Err(VerifyError::invalid_plan(format!(
                    "target '{}' has an advance count of 0",
                    target.name
                )));
            }
            if !names.insert(target.name.as_str()) {
                return Err(VerifyError::invalid_plan(format!(
                    "duplicate target name '{}'",
                    target.name
                )));
            }
            if let Some(prev) = last_ordinal {
                if target.ordinal <= prev {
                    return Err(VerifyError::invalid_plan(format!(
                        "ordinal {} of '{}' does not follow {prev}",
                        target.ordinal, target.name
                    )));
                }
            }
            last_ordinal = Some(target.ordinal);
        }

        Ok(Self { entries })
    }

    /// Number of checkpoints
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false for a validated plan
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over checkpoints in order
    pub fn iter(&self) -> impl Iterator<Item = &(FocusTarget, TraversalStep)> {
        self.entries.iter()
    }

    /// Target at a checkpoint index
    #[must_use]
    pub fn target(&self, index: usize) -> Option<&FocusTarget> {
        self.entries.get(index).map(|(t, _)| t)
    }
}

/// State of the focus machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FocusState {
    /// No checkpoint attempted yet
    NotStarted,
    /// Checkpoint `i` passed
    AtTarget(usize),
    /// Checkpoint `i` failed (terminal)
    Failed(usize),
    /// Every checkpoint passed (terminal)
    Completed,
}

impl FocusState {
    /// Whether no further transitions are possible
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Failed(_) | Self::Completed)
    }
}

/// Outcome of one checkpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Checkpoint {
    /// Checkpoint index
    pub index: usize,
    /// Target name
    pub name: String,
    /// Advance actions issued before the check
    pub advances: u32,
    /// Whether focus was on the target
    pub passed: bool,
    /// What was actually focused
    pub actual: Option<String>,
}

/// Drives a [`FocusPlan`] against a page
#[derive(Debug)]
pub struct FocusOrderMachine<'p> {
    plan: &'p FocusPlan,
    state: FocusState,
    checkpoints: Vec<Checkpoint>,
}

impl<'p> FocusOrderMachine<'p> {
    /// Create a machine in the `NotStarted` state
    #[must_use]
    pub const fn new(plan: &'p FocusPlan) -> Self {
        Self {
            plan,
            state: FocusState::NotStarted,
            checkpoints: Vec::new(),
        }
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> FocusState {
        self.state
    }

    /// Checkpoints evaluated so far
    #[must_use]
    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    fn next_index(&self) -> Option<usize> {
        match self.state {
            FocusState::NotStarted => Some(0),
            FocusState::AtTarget(i) => Some(i + 1),
            FocusState::Failed(_) | FocusState::Completed => None,
        }
    }

    /// Evaluate the next checkpoint
    ///
    /// Terminal states are returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::FocusMismatch`] when the target is not focused
    /// (the machine moves to `Failed(i)`), or the driver error that
    /// interrupted the checkpoint.
    pub async fn step(&mut self, driver: &mut dyn PageDriver) -> VerifyResult<FocusState> {
        let Some(index) = self.next_index() else {
            return Ok(self.state);
        };
        let plan = self.plan;
        let Some((target, traversal)) = plan.entries.get(index) else {
            self.state = FocusState::Completed;
            return Ok(self.state);
        };

        match Self::check(driver, index, target, *traversal).await {
            Ok(actual) => {
                debug!(index, target = %target.name, "focus checkpoint passed");
                self.checkpoints.push(Checkpoint {
                    index,
                    name: target.name.clone(),
                    advances: traversal.repeat,
                    passed: true,
                    actual: Some(actual),
                });
                self.state = if index + 1 == plan.len() {
                    FocusState::Completed
                } else {
                    FocusState::AtTarget(index)
                };
                Ok(self.state)
            }
            Err(err) => {
                warn!(index, target = %target.name, error = %err, "focus checkpoint failed");
                let actual = match &err {
                    VerifyError::FocusMismatch { actual, .. } => Some(actual.clone()),
                    _ => None,
                };
                self.checkpoints.push(Checkpoint {
                    index,
                    name: target.name.clone(),
                    advances: traversal.repeat,
                    passed: false,
                    actual,
                });
                self.state = FocusState::Failed(index);
                Err(err)
            }
        }
    }

    /// Run every remaining checkpoint
    ///
    /// A machine that already failed returns `Ok(Failed(i))` without
    /// touching the page, as [`Self::step`] does.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing checkpoint.
    pub async fn run(&mut self, driver: &mut dyn PageDriver) -> VerifyResult<FocusState> {
        while !self.state.is_terminal() {
            self.step(driver).await?;
        }
        Ok(self.state)
    }

    async fn check(
        driver: &mut dyn PageDriver,
        index: usize,
        target: &FocusTarget,
        traversal: TraversalStep,
    ) -> VerifyResult<String> {
        let mismatch = |actual: String| VerifyError::FocusMismatch {
            index,
            target: target.name.clone(),
            actual,
        };

        // Focus leaving the page mid-batch fails the checkpoint even if a
        // later advance would wrap back onto the target.
        let mut focused = None;
        for _ in 0..traversal.repeat {
            driver.press_key(traversal.action.key()).await?;
            match driver.focused_element().await? {
                Some(handle) => focused = Some(handle),
                None => return Err(mismatch("nothing (focus left the page)".to_string())),
            }
        }
        let Some(focused) = focused else {
            return Err(mismatch("nothing (no advance issued)".to_string()));
        };
        let actual = focused.describe();

        let handle = match driver.locate(&target.selector).await {
            Ok(handle) => handle,
            Err(VerifyError::ElementNotFound { selector }) => {
                return Err(mismatch(format!("{actual}; target {selector} not found")));
            }
            Err(e) => return Err(e),
        };

        if driver.is_focused(&handle).await? {
            Ok(actual)
        } else {
            Err(mismatch(actual))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{MockDriver, MockElement};
    use crate::result::ErrorKind;
    use proptest::prelude::*;

    /// Header-style page: `skip` link, then one link per name.
    fn page(names: &[&str]) -> MockDriver {
        let mut driver = MockDriver::new().with_element(
            MockElement::new("skip", "a")
                .label("Skip to content")
                .focusable(),
        );
        for name in names {
            driver = driver.with_element(
                MockElement::new(name.to_lowercase(), "a")
                    .label(*name)
                    .matches(Selector::role("link", *name))
                    .focusable(),
            );
        }
        driver
    }

    fn plan(names: &[&str]) -> FocusPlan {
        let entries = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let advances = if i == 0 { 2 } else { 1 };
                (
                    FocusTarget::new(*name, Selector::role("link", *name), i as u32 + 1),
                    TraversalStep::advance(advances),
                )
            })
            .collect();
        FocusPlan::new(entries).unwrap()
    }

    const NINE: [&str; 9] = [
        "React",
        "Search",
        "Learn",
        "Reference",
        "Community",
        "Blog",
        "Theme",
        "Languages",
        "GitHub",
    ];

    mod plan_tests {
        use super::*;

        #[test]
        fn test_empty_plan_rejected() {
            let err = FocusPlan::new(vec![]).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Usage);
        }

        #[test]
        fn test_zero_repeat_rejected() {
            let err = FocusPlan::new(vec![(
                FocusTarget::new("a", Selector::css("a"), 1),
                TraversalStep::advance(0),
            )])
            .unwrap_err();
            assert!(err.to_string().contains("advance count of 0"));
        }

        #[test]
        fn test_duplicate_names_rejected() {
            let err = FocusPlan::new(vec![
                (FocusTarget::new("a", Selector::css("a"), 1), TraversalStep::advance(1)),
                (FocusTarget::new("a", Selector::css("b"), 2), TraversalStep::advance(1)),
            ])
            .unwrap_err();
            assert!(err.to_string().contains("duplicate"));
        }

        #[test]
        fn test_non_increasing_ordinals_rejected() {
            let err = FocusPlan::new(vec![
                (FocusTarget::new("a", Selector::css("a"), 2), TraversalStep::advance(1)),
                (FocusTarget::new("b", Selector::css("b"), 2), TraversalStep::advance(1)),
            ])
            .unwrap_err();
            assert!(err.to_string().contains("does not follow"));
        }

        #[test]
        fn test_valid_plan() {
            let p = plan(&NINE);
            assert_eq!(p.len(), 9);
            assert!(!p.is_empty());
            assert_eq!(p.target(2).unwrap().name, "Learn");
        }
    }

    mod machine_tests {
        use super::*;

        #[tokio::test]
        async fn test_nine_targets_complete() {
            let p = plan(&NINE);
            let mut driver = page(&NINE);
            let mut machine = FocusOrderMachine::new(&p);
            assert_eq!(machine.state(), FocusState::NotStarted);

            let state = machine.run(&mut driver).await.unwrap();
            assert_eq!(state, FocusState::Completed);
            assert_eq!(machine.checkpoints().len(), 9);
            assert!(machine.checkpoints().iter().all(|c| c.passed));
            assert_eq!(driver.call_count("press:Tab"), 10);
        }

        #[tokio::test]
        async fn test_step_transitions() {
            let p = plan(&["Learn", "Blog"]);
            let mut driver = page(&["Learn", "Blog"]);
            let mut machine = FocusOrderMachine::new(&p);
            assert_eq!(machine.step(&mut driver).await.unwrap(), FocusState::AtTarget(0));
            assert_eq!(machine.step(&mut driver).await.unwrap(), FocusState::Completed);
            assert_eq!(machine.step(&mut driver).await.unwrap(), FocusState::Completed);
        }

        #[tokio::test]
        async fn test_wrong_order_fails_at_index() {
            let p = plan(&["Learn", "Blog"]);
            let mut driver = page(&["Blog", "Learn"]);
            let mut machine = FocusOrderMachine::new(&p);
            let err = machine.run(&mut driver).await.unwrap_err();
            match err {
                VerifyError::FocusMismatch { index, target, actual } => {
                    assert_eq!(index, 0);
                    assert_eq!(target, "Learn");
                    assert!(actual.contains("Blog"));
                }
                other => panic!("unexpected error: {other}"),
            }
            assert_eq!(machine.state(), FocusState::Failed(0));
        }

        #[tokio::test]
        async fn test_focus_leaving_page_fails_immediately() {
            let p = FocusPlan::new(vec![(
                FocusTarget::new("Learn", Selector::role("link", "Learn"), 1),
                TraversalStep::advance(3),
            )])
            .unwrap();
            let mut driver = page(&["Learn"]);
            let mut machine = FocusOrderMachine::new(&p);
            let err = machine.run(&mut driver).await.unwrap_err();
            assert!(err.to_string().contains("focus left the page"));
            assert_eq!(machine.state(), FocusState::Failed(0));
            assert!(!driver.was_called("locate"));
        }

        #[tokio::test]
        async fn test_wrap_back_onto_target_still_fails() {
            let p = FocusPlan::new(vec![(
                FocusTarget::new("Learn", Selector::role("link", "Learn"), 1),
                TraversalStep::advance(3),
            )])
            .unwrap();
            let mut driver = MockDriver::new().with_element(
                MockElement::new("learn", "a")
                    .label("Learn")
                    .matches(Selector::role("link", "Learn"))
                    .focusable(),
            );
            let mut machine = FocusOrderMachine::new(&p);
            let err = machine.run(&mut driver).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::FocusMismatch);
            assert!(err.to_string().contains("focus left the page"));
            assert_eq!(machine.state(), FocusState::Failed(0));
            assert_eq!(driver.call_count("press:Tab"), 2);
            assert!(!driver.was_called("locate"));
        }

        #[tokio::test]
        async fn test_rerun_after_timeout_keeps_state() {
            let p = plan(&["Learn"]);
            let mut driver = page(&["Learn"]).with_timeout_on("focused_element");
            let mut machine = FocusOrderMachine::new(&p);
            let err = machine.run(&mut driver).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::DriverTimeout);
            let presses = driver.call_count("press");
            assert_eq!(machine.run(&mut driver).await.unwrap(), FocusState::Failed(0));
            assert_eq!(driver.call_count("press"), presses);
        }

        #[tokio::test]
        async fn test_timeout_surfaces_and_fails_checkpoint() {
            let p = plan(&["Learn"]);
            let mut driver = page(&["Learn"]).with_timeout_on("focused_element");
            let mut machine = FocusOrderMachine::new(&p);
            let err = machine.run(&mut driver).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::DriverTimeout);
            assert_eq!(machine.state(), FocusState::Failed(0));
            assert!(!machine.checkpoints()[0].passed);
        }

        #[tokio::test]
        async fn test_failed_machine_does_not_advance() {
            let p = plan(&["Learn", "Blog"]);
            let mut driver = page(&["Blog", "Learn"]);
            let mut machine = FocusOrderMachine::new(&p);
            let _ = machine.step(&mut driver).await;
            let presses = driver.call_count("press");
            assert_eq!(machine.step(&mut driver).await.unwrap(), FocusState::Failed(0));
            assert_eq!(driver.call_count("press"), presses);
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_single_perturbation_fails_exactly_there(
            len in 1usize..9,
            pick in 0usize..9,
        ) {
            let names: Vec<&str> = NINE[..len].to_vec();
            let bad = pick % len;
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();

            let good = plan(&names);
            let mut driver = page(&names);
            let mut machine = FocusOrderMachine::new(&good);
            prop_assert_eq!(rt.block_on(machine.run(&mut driver)).unwrap(), FocusState::Completed);

            let mut perturbed: Vec<String> = names.iter().map(|s| (*s).to_string()).collect();
            perturbed[bad] = format!("{}-renamed", perturbed[bad]);
            let refs: Vec<&str> = perturbed.iter().map(String::as_str).collect();
            let bad_plan = plan(&refs);
            let mut driver = page(&names);
            let mut machine = FocusOrderMachine::new(&bad_plan);
            let err = rt.block_on(machine.run(&mut driver)).unwrap_err();
            prop_assert_eq!(err.kind(), ErrorKind::FocusMismatch);
            prop_assert_eq!(machine.state(), FocusState::Failed(bad));
            prop_assert_eq!(machine.checkpoints().len(), bad + 1);
        }
    }
}
