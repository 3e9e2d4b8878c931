//! Stateful search-and-favorites workflow.
//!
//! The workflow is a strict linear chain of phases. Each phase declares the
//! session values it requires and the values it produces:
//!
//! | Phase     | Requires                    | Produces        |
//! |-----------|-----------------------------|-----------------|
//! | OpenQuery | -                           | QueryText       |
//! | Select    | QueryText                   | SelectedResult  |
//! | Save      | SelectedResult              | Favorited       |
//! | Retrieve  | Favorited                   | Retrieved       |
//! | Verify    | Favorited, Retrieved        | -               |
//!
//! A chain is validated before any driver call is issued, and each phase
//! re-checks its requirements against the live session before it runs. The
//! first failing phase ends the run; no phase is retried.

use crate::driver::{Key, PageDriver};
use crate::locator::Selector;
use crate::result::{VerifyError, VerifyResult};
use crate::wait::{wait_for, WaitCondition, WaitOptions};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Named value carried between phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKey {
    /// Text typed into the search input
    QueryText,
    /// Label of the result that was confirmed
    SelectedResult,
    /// Label of the result saved as a favorite
    Favorited,
    /// The favorite was opened from the favorites list
    Retrieved,
}

impl StateKey {
    /// Key name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::QueryText => "query_text",
            Self::SelectedResult => "selected_result",
            Self::Favorited => "favorited",
            Self::Retrieved => "retrieved",
        }
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workflow phase identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseId {
    /// Open the overlay and type the query
    OpenQuery,
    /// Confirm the top result
    Select,
    /// Save the selected result as a favorite
    Save,
    /// Close, reopen, and open the first favorite
    Retrieve,
    /// Check the favorite's title is shown
    Verify,
}

impl PhaseId {
    /// The standard chain, in order
    pub const ALL: [Self; 5] = [
        Self::OpenQuery,
        Self::Select,
        Self::Save,
        Self::Retrieve,
        Self::Verify,
    ];

    /// Phase name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenQuery => "open_query",
            Self::Select => "select",
            Self::Save => "save",
            Self::Retrieve => "retrieve",
            Self::Verify => "verify",
        }
    }

    /// Session values this phase needs
    #[must_use]
    pub const fn requires(self) -> &'static [StateKey] {
        match self {
            Self::OpenQuery => &[],
            Self::Select => &[StateKey::QueryText],
            Self::Save => &[StateKey::SelectedResult],
            Self::Retrieve => &[StateKey::Favorited],
            Self::Verify => &[StateKey::Favorited, StateKey::Retrieved],
        }
    }

    /// Session values this phase contributes
    #[must_use]
    pub const fn produces(self) -> &'static [StateKey] {
        match self {
            Self::OpenQuery => &[StateKey::QueryText],
            Self::Select => &[StateKey::SelectedResult],
            Self::Save => &[StateKey::Favorited],
            Self::Retrieve => &[StateKey::Retrieved],
            Self::Verify => &[],
        }
    }
}

impl fmt::Display for PhaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ephemeral state of one workflow run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchSession {
    /// Query typed in OpenQuery
    pub query_text: Option<String>,
    /// Result label confirmed in Select
    pub selected_result: Option<String>,
    /// Result label saved in Save
    pub favorited: Option<String>,
    /// Whether Retrieve opened the favorite
    pub retrieved: bool,
    /// Whether the harness believes the overlay is open
    pub overlay_open: bool,
    /// Phases completed so far
    pub completed: Vec<PhaseId>,
}

impl SearchSession {
    /// Create an empty session
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a value is present
    #[must_use]
    pub const fn has(&self, key: StateKey) -> bool {
        match key {
            StateKey::QueryText => self.query_text.is_some(),
            StateKey::SelectedResult => self.selected_result.is_some(),
            StateKey::Favorited => self.favorited.is_some(),
            StateKey::Retrieved => self.retrieved,
        }
    }

    /// Required keys that are absent
    #[must_use]
    pub fn missing(&self, keys: &[StateKey]) -> Vec<StateKey> {
        keys.iter().copied().filter(|k| !self.has(*k)).collect()
    }

    fn require(&self, phase: PhaseId, key: StateKey) -> VerifyResult<String> {
        let value = match key {
            StateKey::QueryText => self.query_text.clone(),
            StateKey::SelectedResult => self.selected_result.clone(),
            StateKey::Favorited => self.favorited.clone(),
            StateKey::Retrieved => self.retrieved.then(String::new),
        };
        value.ok_or_else(|| precondition(phase, &[key]))
    }
}

fn precondition(phase: PhaseId, missing: &[StateKey]) -> VerifyError {
    VerifyError::WorkflowPreconditionUnmet {
        phase: phase.to_string(),
        missing: missing.iter().map(ToString::to_string).collect(),
    }
}

/// Selectors describing the search overlay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSelectors {
    /// Control that opens the overlay
    pub trigger: Selector,
    /// Query input inside the overlay
    pub query_input: Selector,
    /// Overlay region containing the input and its lists
    pub query_region: Selector,
    /// CSS for one result item
    pub result_item: String,
    /// CSS for the label inside a result item
    pub result_label: String,
    /// Save control inside a result item
    pub save_control: Selector,
    /// Favorites list inside the overlay region
    pub favorites_list: Selector,
    /// Entry inside the favorites list
    pub favorite_entry: Selector,
    /// CSS for the element showing the opened page's title
    pub destination_label: String,
}

impl Default for SearchSelectors {
    fn default() -> Self {
        Self {
            trigger: Selector::role("button", "Search"),
            query_input: Selector::css("#docsearch-input"),
            query_region: Selector::css(".DocSearch-Modal"),
            result_item: ".DocSearch-Hit".to_string(),
            result_label: ".DocSearch-Hit-title".to_string(),
            save_control: Selector::css("[title='Save this search']"),
            favorites_list: Selector::css(".DocSearch-Hits"),
            favorite_entry: Selector::css(".DocSearch-Hit a"),
            destination_label: "h1".to_string(),
        }
    }
}

impl SearchSelectors {
    /// All result items
    #[must_use]
    pub fn results(&self) -> Selector {
        Selector::css(self.result_item.clone())
    }

    /// Label of the top result
    #[must_use]
    pub fn top_label(&self) -> Selector {
        self.results()
            .find(Selector::css(self.result_label.clone()))
    }

    /// Save control of the result labelled `identity`
    #[must_use]
    pub fn save_for(&self, identity: &str) -> Selector {
        Selector::css_with_text(self.result_item.clone(), identity)
            .find(self.save_control.clone())
    }

    /// First entry of the favorites list inside the overlay region
    #[must_use]
    pub fn first_favorite(&self) -> Selector {
        self.query_region
            .clone()
            .find(self.favorites_list.clone())
            .find(self.favorite_entry.clone())
    }

    /// Label showing `identity` after navigation
    #[must_use]
    pub fn destination(&self, identity: &str) -> Selector {
        Selector::css_with_text(self.destination_label.clone(), identity)
    }
}

/// Parameters of a workflow run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSpec {
    /// Query to type
    pub query: String,
    /// Title the top result must carry, if checked
    pub expected_title: Option<String>,
    /// Overlay selectors
    pub selectors: SearchSelectors,
    /// Key that confirms the highlighted result
    pub confirm_key: Key,
    /// Key that closes the overlay
    pub close_key: Key,
    /// How long to poll for results
    pub results_wait: WaitOptions,
    /// Extra fixed delay after results appear (0 = none)
    pub settle_ms: u64,
}

impl Default for SearchSpec {
    fn default() -> Self {
        Self {
            query: "custom hook".to_string(),
            expected_title: Some("Reusing Logic with Custom Hooks".to_string()),
            selectors: SearchSelectors::default(),
            confirm_key: Key::Enter,
            close_key: Key::Escape,
            results_wait: WaitOptions::default(),
            settle_ms: 0,
        }
    }
}

/// Outcome of one phase
#[derive(Debug, Clone, Serialize)]
pub struct PhaseOutcome {
    /// Phase
    pub phase: PhaseId,
    /// Whether it passed
    pub passed: bool,
    /// Failure message
    pub error: Option<String>,
    /// Time spent
    pub duration: Duration,
}

/// Result of a workflow run
#[derive(Debug)]
pub struct WorkflowReport {
    /// Outcomes of the phases that ran, in order
    pub outcomes: Vec<PhaseOutcome>,
    /// Session at the end of the run
    pub session: SearchSession,
    /// The error that stopped the run
    pub error: Option<VerifyError>,
}

impl WorkflowReport {
    /// Whether every phase passed
    #[must_use]
    pub const fn passed(&self) -> bool {
        self.error.is_none()
    }

    /// Convert into the final session or the stopping error
    ///
    /// # Errors
    ///
    /// Returns the error that stopped the run.
    pub fn into_result(self) -> VerifyResult<SearchSession> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.session),
        }
    }
}

/// Linear chain of workflow phases
#[derive(Debug, Clone)]
pub struct Workflow {
    phases: Vec<PhaseId>,
    spec: SearchSpec,
}

impl Workflow {
    /// The full OpenQuery → Verify chain
    #[must_use]
    pub fn standard(spec: SearchSpec) -> Self {
        Self {
            phases: PhaseId::ALL.to_vec(),
            spec,
        }
    }

    /// A custom chain
    #[must_use]
    pub const fn with_phases(phases: Vec<PhaseId>, spec: SearchSpec) -> Self {
        Self { phases, spec }
    }

    /// Phases in order
    #[must_use]
    pub fn phases(&self) -> &[PhaseId] {
        &self.phases
    }

    /// Run parameters
    #[must_use]
    pub const fn spec(&self) -> &SearchSpec {
        &self.spec
    }

    /// Check every phase's requirements are produced upstream
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::WorkflowPreconditionUnmet`] for the first phase
    /// whose requirements no earlier phase produces.
    pub fn validate(&self) -> VerifyResult<()> {
        let mut produced: Vec<StateKey> = Vec::new();
        for phase in &self.phases {
            let missing: Vec<StateKey> = phase
                .requires()
                .iter()
                .copied()
                .filter(|k| !produced.contains(k))
                .collect();
            if !missing.is_empty() {
                return Err(precondition(*phase, &missing));
            }
            produced.extend_from_slice(phase.produces());
        }
        Ok(())
    }

    /// Run the chain against a fresh session
    pub async fn execute(&self, driver: &mut dyn PageDriver) -> WorkflowReport {
        self.execute_with(driver, SearchSession::new()).await
    }

    /// Run the chain against an existing session
    pub async fn execute_with(
        &self,
        driver: &mut dyn PageDriver,
        mut session: SearchSession,
    ) -> WorkflowReport {
        let mut outcomes = Vec::with_capacity(self.phases.len());

        if session.completed.is_empty() {
            if let Err(err) = self.validate() {
                warn!(error = %err, "workflow chain rejected");
                return WorkflowReport {
                    outcomes,
                    session,
                    error: Some(err),
                };
            }
        }

        for phase in &self.phases {
            let start = Instant::now();
            let result = self.run_phase(*phase, driver, &mut session).await;
            let duration = start.elapsed();
            match result {
                Ok(()) => outcomes.push(PhaseOutcome {
                    phase: *phase,
                    passed: true,
                    error: None,
                    duration,
                }),
                Err(err) => {
                    outcomes.push(PhaseOutcome {
                        phase: *phase,
                        passed: false,
                        error: Some(err.to_string()),
                        duration,
                    });
                    return WorkflowReport {
                        outcomes,
                        session,
                        error: Some(err),
                    };
                }
            }
        }

        info!(phases = outcomes.len(), "workflow completed");
        WorkflowReport {
            outcomes,
            session,
            error: None,
        }
    }

    /// Run the chain, returning the final session
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing phase.
    pub async fn run(&self, driver: &mut dyn PageDriver) -> VerifyResult<SearchSession> {
        self.execute(driver).await.into_result()
    }

    /// Run a single phase after checking its requirements
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::WorkflowPreconditionUnmet`] without touching the
    /// driver if a requirement is absent, otherwise the phase's own error.
    pub async fn run_phase(
        &self,
        phase: PhaseId,
        driver: &mut dyn PageDriver,
        session: &mut SearchSession,
    ) -> VerifyResult<()> {
        let missing = session.missing(phase.requires());
        if !missing.is_empty() {
            return Err(precondition(phase, &missing));
        }

        debug!(%phase, "phase started");
        match phase {
            PhaseId::OpenQuery => self.open_query(driver, session).await?,
            PhaseId::Select => self.select(driver, session).await?,
            PhaseId::Save => self.save(driver, session).await?,
            PhaseId::Retrieve => self.retrieve(driver, session).await?,
            PhaseId::Verify => self.verify(driver, session).await?,
        }
        session.completed.push(phase);
        debug!(%phase, "phase passed");
        Ok(())
    }

    async fn open_overlay(
        &self,
        driver: &mut dyn PageDriver,
        session: &mut SearchSession,
    ) -> VerifyResult<()> {
        let trigger = driver.locate(&self.spec.selectors.trigger).await?;
        driver.click(&trigger).await?;
        session.overlay_open = true;
        Ok(())
    }

    async fn open_query(
        &self,
        driver: &mut dyn PageDriver,
        session: &mut SearchSession,
    ) -> VerifyResult<()> {
        let selectors = &self.spec.selectors;
        self.open_overlay(driver, session).await?;

        let input = driver.locate(&selectors.query_input).await?;
        driver.click(&input).await?;
        driver.type_text(&input, &self.spec.query).await?;

        let condition = WaitCondition::CountAtLeast {
            selector: selectors.results(),
            min: 1,
        };
        let waited = wait_for(driver, &condition, &self.spec.results_wait).await?;
        debug!(attempts = waited.attempts, "results populated");
        if self.spec.settle_ms > 0 {
            driver
                .wait_idle(Duration::from_millis(self.spec.settle_ms))
                .await?;
        }

        session.query_text = Some(self.spec.query.clone());
        Ok(())
    }

    async fn select(
        &self,
        driver: &mut dyn PageDriver,
        session: &mut SearchSession,
    ) -> VerifyResult<()> {
        let query = session.require(PhaseId::Select, StateKey::QueryText)?;
        let label = match driver.locate(&self.spec.selectors.top_label()).await {
            Ok(handle) => driver.text_content(&handle).await?.trim().to_string(),
            Err(VerifyError::ElementNotFound { .. }) => {
                return Err(VerifyError::postcondition(
                    PhaseId::Select.as_str(),
                    format!("a top result for \"{query}\""),
                    "no result label",
                ));
            }
            Err(e) => return Err(e),
        };

        if let Some(expected) = &self.spec.expected_title {
            if label != *expected {
                return Err(VerifyError::postcondition(
                    PhaseId::Select.as_str(),
                    format!("top result \"{expected}\""),
                    format!("\"{label}\""),
                ));
            }
        }

        driver.press_key(self.spec.confirm_key).await?;
        info!(%query, selected = %label, "result selected");
        session.selected_result = Some(label);
        session.overlay_open = false;
        Ok(())
    }

    async fn save(
        &self,
        driver: &mut dyn PageDriver,
        session: &mut SearchSession,
    ) -> VerifyResult<()> {
        let identity = session.require(PhaseId::Save, StateKey::SelectedResult)?;
        self.open_overlay(driver, session).await?;

        let expected = format!("visible save control for \"{identity}\"");
        let control = match driver.locate(&self.spec.selectors.save_for(&identity)).await {
            Ok(handle) => handle,
            Err(VerifyError::ElementNotFound { .. }) => {
                return Err(VerifyError::postcondition(PhaseId::Save.as_str(), expected, "absent"));
            }
            Err(e) => return Err(e),
        };
        if !driver.is_visible(&control).await? {
            return Err(VerifyError::postcondition(PhaseId::Save.as_str(), expected, "hidden"));
        }

        driver.click(&control).await?;
        info!(favorited = %identity, "favorite saved");
        session.favorited = Some(identity);
        Ok(())
    }

    async fn retrieve(
        &self,
        driver: &mut dyn PageDriver,
        session: &mut SearchSession,
    ) -> VerifyResult<()> {
        let favorited = session.require(PhaseId::Retrieve, StateKey::Favorited)?;

        driver.press_key(self.spec.close_key).await?;
        session.overlay_open = false;
        self.open_overlay(driver, session).await?;

        let entry = match driver.locate(&self.spec.selectors.first_favorite()).await {
            Ok(handle) => handle,
            Err(VerifyError::ElementNotFound { .. }) => {
                return Err(VerifyError::postcondition(
                    PhaseId::Retrieve.as_str(),
                    format!("favorites list containing \"{favorited}\""),
                    "no favorite entries",
                ));
            }
            Err(e) => return Err(e),
        };
        driver.click(&entry).await?;

        session.overlay_open = false;
        session.retrieved = true;
        Ok(())
    }

    async fn verify(
        &self,
        driver: &mut dyn PageDriver,
        session: &mut SearchSession,
    ) -> VerifyResult<()> {
        let favorited = session.require(PhaseId::Verify, StateKey::Favorited)?;
        session.require(PhaseId::Verify, StateKey::Retrieved)?;

        // The favorite opens another page; give it the results bound to render.
        let destination = self.spec.selectors.destination(&favorited);
        let rendered = WaitCondition::Visible(destination.clone());
        match wait_for(driver, &rendered, &self.spec.results_wait).await {
            Ok(waited) => debug!(attempts = waited.attempts, "destination rendered"),
            Err(VerifyError::DriverTimeout { .. }) => {}
            Err(e) => return Err(e),
        }

        let expected = format!("visible label \"{favorited}\"");
        let label = match driver.locate(&destination).await {
            Ok(handle) => handle,
            Err(VerifyError::ElementNotFound { .. }) => {
                return Err(VerifyError::postcondition(PhaseId::Verify.as_str(), expected, "absent"));
            }
            Err(e) => return Err(e),
        };
        if !driver.is_visible(&label).await? {
            return Err(VerifyError::postcondition(PhaseId::Verify.as_str(), expected, "hidden"));
        }
        info!(title = %favorited, "favorite round trip verified");
        Ok(())
    }
}

/// Scripted documentation site used by workflow tests
#[cfg(test)]
pub(crate) mod fixture {
    use super::*;
    use crate::driver::{MockDriver, MockEffect, MockElement, MockTrigger};

    pub const TITLE: &str = "Reusing Logic with Custom Hooks";

    fn id(s: &str) -> String {
        s.to_string()
    }

    /// A page whose search overlay, recent hit and favorites behave like the
    /// reference documentation site.
    pub fn docs_site() -> MockDriver {
        with_overlay(MockDriver::new().with_element(search_trigger()))
    }

    /// The overlay trigger, id `search`
    pub fn search_trigger() -> MockElement {
        MockElement::new("search", "button")
            .label("Search")
            .matches(SearchSelectors::default().trigger)
            .focusable()
    }

    /// Add the overlay, results, favorites and page heading to `base`,
    /// which must already contain [`search_trigger`].
    pub fn with_overlay(base: MockDriver) -> MockDriver {
        let sel = SearchSelectors::default();
        base
            .with_element(
                MockElement::new("modal", "div")
                    .matches(sel.query_region.clone())
                    .detached(),
            )
            .with_element(
                MockElement::new("input", "input")
                    .matches(sel.query_input.clone())
                    .focusable()
                    .detached(),
            )
            .with_element(
                MockElement::new("hit", "li")
                    .label(TITLE)
                    .matches(sel.results())
                    .matches(Selector::css_with_text(sel.result_item.clone(), TITLE))
                    .detached(),
            )
            .with_element(
                MockElement::new("hit-title", "span")
                    .label(TITLE)
                    .matches(sel.top_label())
                    .detached(),
            )
            .with_element(
                MockElement::new("save", "button")
                    .label("Save this search")
                    .matches(sel.save_for(TITLE))
                    .detached(),
            )
            .with_element(
                MockElement::new("favorite", "a")
                    .label(TITLE)
                    .matches(sel.first_favorite())
                    .detached(),
            )
            .with_element(
                MockElement::new("heading", "h1")
                    .label(TITLE)
                    .matches(sel.destination(TITLE))
                    .detached(),
            )
            .on(
                MockTrigger::Click(id("search")),
                vec![MockEffect::Attach(id("modal")), MockEffect::Attach(id("input"))],
            )
            .on(
                MockTrigger::Type(id("input")),
                vec![MockEffect::Attach(id("hit")), MockEffect::Attach(id("hit-title"))],
            )
            .on(
                MockTrigger::Key(Key::Enter),
                vec![
                    MockEffect::Detach(id("modal")),
                    MockEffect::Detach(id("input")),
                    MockEffect::Detach(id("hit-title")),
                    MockEffect::Attach(id("save")),
                    MockEffect::Attach(id("heading")),
                ],
            )
            .on(
                MockTrigger::Click(id("save")),
                vec![MockEffect::Attach(id("favorite"))],
            )
            .on(
                MockTrigger::Key(Key::Escape),
                vec![
                    MockEffect::Detach(id("modal")),
                    MockEffect::Detach(id("input")),
                    MockEffect::Detach(id("heading")),
                ],
            )
            .on(
                MockTrigger::Click(id("favorite")),
                vec![
                    MockEffect::Detach(id("modal")),
                    MockEffect::Attach(id("heading")),
                ],
            )
    }
}

#[cfg(test)]
mod tests {
    use super::fixture::{docs_site, TITLE};
    use super::*;
    use crate::driver::{MockDriver, MockEffect, MockTrigger};
    use crate::result::ErrorKind;

    fn fast_spec() -> SearchSpec {
        SearchSpec {
            results_wait: WaitOptions::new().with_timeout(40).with_poll_interval(5),
            ..SearchSpec::default()
        }
    }

    mod chain_tests {
        use super::*;

        #[test]
        fn test_standard_chain_is_valid() {
            Workflow::standard(SearchSpec::default()).validate().unwrap();
        }

        #[test]
        fn test_requirements_are_produced_upstream() {
            let mut produced = Vec::new();
            for phase in PhaseId::ALL {
                for key in phase.requires() {
                    assert!(produced.contains(key), "{phase} needs {key}");
                }
                produced.extend_from_slice(phase.produces());
            }
        }

        #[test]
        fn test_save_before_select_rejected_statically() {
            let wf = Workflow::with_phases(
                vec![PhaseId::OpenQuery, PhaseId::Save, PhaseId::Select],
                SearchSpec::default(),
            );
            let err = wf.validate().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::WorkflowPreconditionUnmet);
            assert!(err.to_string().contains("save"));
            assert!(err.to_string().contains("selected_result"));
        }

        #[test]
        fn test_session_missing_keys() {
            let mut session = SearchSession::new();
            assert_eq!(
                session.missing(PhaseId::Verify.requires()),
                vec![StateKey::Favorited, StateKey::Retrieved]
            );
            session.favorited = Some(TITLE.to_string());
            assert_eq!(
                session.missing(PhaseId::Verify.requires()),
                vec![StateKey::Retrieved]
            );
        }
    }

    mod run_tests {
        use super::*;

        #[tokio::test]
        async fn test_round_trip_custom_hook() {
            let mut driver = docs_site();
            let wf = Workflow::standard(fast_spec());
            let report = wf.execute(&mut driver).await;
            assert!(report.passed(), "{:?}", report.error);
            assert_eq!(report.outcomes.len(), 5);

            let session = report.session;
            assert_eq!(session.query_text.as_deref(), Some("custom hook"));
            assert_eq!(session.selected_result.as_deref(), Some(TITLE));
            assert_eq!(session.favorited, session.selected_result);
            assert!(session.retrieved);
            assert_eq!(session.completed, PhaseId::ALL.to_vec());
            assert_eq!(driver.typed("input"), Some("custom hook"));
        }

        #[tokio::test]
        async fn test_phase_order_of_driver_actions() {
            let mut driver = docs_site();
            Workflow::standard(fast_spec()).run(&mut driver).await.unwrap();
            let actions: Vec<&str> = driver
                .history()
                .iter()
                .map(String::as_str)
                .filter(|c| c.starts_with("click") || c.starts_with("press") || c.starts_with("type"))
                .collect();
            assert_eq!(
                actions,
                vec![
                    "click:search",
                    "click:input",
                    "type:input:custom hook",
                    "press:Enter",
                    "click:search",
                    "click:save",
                    "press:Escape",
                    "click:search",
                    "click:favorite",
                ]
            );
        }

        #[tokio::test]
        async fn test_save_before_select_never_clicks() {
            let mut driver = docs_site();
            let wf = Workflow::with_phases(vec![PhaseId::Save], fast_spec());
            let err = wf.run(&mut driver).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::WorkflowPreconditionUnmet);
            assert!(driver.history().is_empty());
        }

        #[tokio::test]
        async fn test_run_phase_checks_live_session() {
            let mut driver = docs_site();
            let wf = Workflow::standard(fast_spec());
            let mut session = SearchSession::new();
            let err = wf
                .run_phase(PhaseId::Verify, &mut driver, &mut session)
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                VerifyError::WorkflowPreconditionUnmet { ref missing, .. } if missing.len() == 2
            ));
            assert!(!driver.was_called("click"));
        }

        #[tokio::test]
        async fn test_results_never_populate_times_out() {
            let mut driver = docs_site().on(
                MockTrigger::Type("input".to_string()),
                vec![MockEffect::Detach("hit".to_string())],
            );
            let report = Workflow::standard(fast_spec()).execute(&mut driver).await;
            let err = report.error.as_ref().unwrap();
            assert_eq!(err.kind(), ErrorKind::DriverTimeout);
            assert_eq!(report.outcomes.len(), 1);
            assert_eq!(report.outcomes[0].phase, PhaseId::OpenQuery);
            assert!(!driver.was_called("press"));
        }

        #[tokio::test]
        async fn test_unexpected_top_result_stops_before_confirm() {
            let mut driver = docs_site();
            let spec = SearchSpec {
                expected_title: Some("useEffect".to_string()),
                ..fast_spec()
            };
            let report = Workflow::standard(spec).execute(&mut driver).await;
            let err = report.error.unwrap();
            assert_eq!(err.kind(), ErrorKind::WorkflowPostconditionFailed);
            assert!(err.to_string().contains("select"));
            assert!(err.to_string().contains(TITLE));
            assert!(!driver.was_called("press:Enter"));
        }

        #[tokio::test]
        async fn test_hidden_save_control_is_postcondition_failure() {
            let mut driver = docs_site().on(
                MockTrigger::Key(Key::Enter),
                vec![MockEffect::Hide("save".to_string())],
            );
            let report = Workflow::standard(fast_spec()).execute(&mut driver).await;
            let err = report.error.unwrap();
            assert_eq!(err.kind(), ErrorKind::WorkflowPostconditionFailed);
            assert!(err.to_string().contains("hidden"));
            assert!(!driver.was_called("click:save"));
            assert_eq!(report.outcomes.last().unwrap().phase, PhaseId::Save);
        }

        #[tokio::test]
        async fn test_missing_favorite_fails_retrieve() {
            let mut driver = docs_site().on(
                MockTrigger::Key(Key::Escape),
                vec![MockEffect::Detach("favorite".to_string())],
            );
            let report = Workflow::standard(fast_spec()).execute(&mut driver).await;
            let err = report.error.unwrap();
            assert_eq!(err.kind(), ErrorKind::WorkflowPostconditionFailed);
            assert_eq!(report.outcomes.last().unwrap().phase, PhaseId::Retrieve);
            assert!(report.session.favorited.is_some());
            assert!(!report.session.retrieved);
        }

        #[tokio::test]
        async fn test_hidden_destination_polled_then_fails_verify() {
            let mut driver = docs_site().on(
                MockTrigger::Click("favorite".to_string()),
                vec![MockEffect::Hide("heading".to_string())],
            );
            let report = Workflow::standard(fast_spec()).execute(&mut driver).await;
            let err = report.error.unwrap();
            assert_eq!(err.kind(), ErrorKind::WorkflowPostconditionFailed);
            assert!(err.to_string().contains("hidden"));
            assert_eq!(report.outcomes.last().unwrap().phase, PhaseId::Verify);
            assert!(driver.call_count("is_visible:heading") >= 2);
        }

        #[tokio::test]
        async fn test_settle_delay_uses_idle_wait() {
            let mut driver = docs_site();
            let spec = SearchSpec {
                settle_ms: 250,
                ..fast_spec()
            };
            Workflow::standard(spec).run(&mut driver).await.unwrap();
            assert!(driver.was_called("wait_idle:250"));
        }

        #[tokio::test]
        async fn test_empty_page_fails_in_first_phase() {
            let mut driver = MockDriver::new();
            let report = Workflow::standard(fast_spec()).execute(&mut driver).await;
            assert_eq!(
                report.error.unwrap().kind(),
                ErrorKind::ElementNotFound
            );
            assert_eq!(report.outcomes.len(), 1);
        }
    }
}
