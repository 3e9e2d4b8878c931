//! Verifica: conformance verification for live web pages.
//!
//! Drives a page through a [`PageDriver`] and checks that its structure,
//! interactive behavior and stateful flows match an expected description.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     VERIFICA Architecture                       │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Scenarios  │    │ Checkers   │    │ PageDriver │            │
//! │   │ + Harness  │───►│ focus /    │───►│ CDP / Mock │            │
//! │   │            │    │ workflow / │    │            │            │
//! │   │            │    │ theme / …  │    │            │            │
//! │   └────────────┘    └────────────┘    └────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The checkers are written only against [`PageDriver`]; [`MockDriver`]
//! scripts a page in memory so every checker is testable without a browser.

#![warn(missing_docs)]

mod config;
mod driver;
mod focus;
mod harness;
mod locator;
mod presence;
mod result;
mod scenarios;
mod theme;
mod wait;
mod workflow;

/// Chromium driver (requires the `browser` feature)
#[cfg(feature = "browser")]
#[allow(clippy::missing_errors_doc, clippy::significant_drop_tightening)]
pub mod browser;

pub use config::{BrowserSettings, FocusEntry, VerificaConfig, DEFAULT_BASE_URL, DEFAULT_CONFIG_FILE};
pub use driver::{
    class_matches, ElementHandle, Key, LoadState, MockDriver, MockEffect, MockElement,
    MockSessions, MockTrigger, PageDriver, SessionProvider,
};
pub use focus::{
    Checkpoint, FocusOrderMachine, FocusPlan, FocusState, FocusTarget, TraversalAction,
    TraversalStep,
};
pub use harness::{Harness, Scenario, ScenarioResult, StepAnnotation, StepLog, SuiteResults};
pub use locator::Selector;
pub use presence::{Landmark, PresenceChecker, PresenceFinding};
pub use result::{ErrorKind, VerifyError, VerifyResult};
pub use scenarios::{
    build_suite, FocusOrderScenario, LandmarksScenario, SearchFavoritesScenario, ThemeScenario,
};
pub use theme::{ThemeReport, ThemeToggle};
pub use wait::{
    wait_for, WaitCondition, WaitOptions, WaitResult, DEFAULT_MAX_POLL_INTERVAL_MS,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS,
};
pub use workflow::{
    PhaseId, PhaseOutcome, SearchSelectors, SearchSession, SearchSpec, StateKey, Workflow,
    WorkflowReport,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::{
        build_suite, Harness, Key, MockDriver, PageDriver, Scenario, Selector, SessionProvider,
        VerificaConfig, VerifyError, VerifyResult, Workflow,
    };
}
