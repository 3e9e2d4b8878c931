//! Scenario runner: builds the suite from configuration and drives it
//! through a session provider

use tracing::{debug, warn};
use verifica::{build_suite, Harness, Scenario, SessionProvider, SuiteResults, VerificaConfig};

use crate::error::{CliError, CliResult};

/// Suite name used in reports
pub const SUITE_NAME: &str = "verifica";

/// Runs the configured scenarios
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    config: VerificaConfig,
}

impl ScenarioRunner {
    /// Create a runner from a validated configuration
    ///
    /// # Errors
    ///
    /// Returns the validation error if the configuration is unusable.
    pub fn new(config: VerificaConfig) -> CliResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Configuration in use
    #[must_use]
    pub const fn config(&self) -> &VerificaConfig {
        &self.config
    }

    /// Build the scenario list
    ///
    /// # Errors
    ///
    /// Returns an error if a scenario cannot be built from the configuration.
    pub fn scenarios(&self) -> CliResult<Vec<Box<dyn Scenario>>> {
        Ok(build_suite(&self.config)?)
    }

    /// Reject `--only` names that match no scenario
    ///
    /// # Errors
    ///
    /// Returns an invalid argument error naming the first unknown scenario.
    pub fn check_filter(&self, only: &[String]) -> CliResult<()> {
        let suite = self.scenarios()?;
        for name in only {
            if !suite.iter().any(|s| s.name() == name) {
                let known: Vec<&str> = suite.iter().map(|s| s.name()).collect();
                return Err(CliError::invalid_argument(format!(
                    "unknown scenario '{name}' (known: {})",
                    known.join(", ")
                )));
            }
        }
        Ok(())
    }

    fn harness(&self) -> Harness {
        let harness = Harness::new(self.config.base_url.clone())
            .with_load_state(self.config.browser.load_state);
        if self.config.fail_fast {
            harness.with_fail_fast()
        } else {
            harness
        }
    }

    /// Run against sessions from any provider
    ///
    /// # Errors
    ///
    /// Returns an error if the filter names an unknown scenario.
    pub async fn run_with(
        &self,
        provider: &mut dyn SessionProvider,
        only: &[String],
    ) -> CliResult<SuiteResults> {
        self.check_filter(only)?;
        let suite = self.scenarios()?;
        debug!(scenarios = suite.len(), url = %self.config.base_url, "running suite");
        Ok(self.harness().run_all(SUITE_NAME, provider, &suite, only).await)
    }

    /// Launch Chromium and run against it
    ///
    /// # Errors
    ///
    /// Returns an error if the browser fails to launch or the filter is invalid.
    #[cfg(feature = "browser")]
    pub async fn run(&self, only: &[String]) -> CliResult<SuiteResults> {
        use std::sync::Arc;
        use verifica::browser::{CdpBrowser, CdpSessions};

        self.check_filter(only)?;
        let browser = Arc::new(CdpBrowser::launch(self.config.browser.clone()).await?);
        let mut sessions = CdpSessions::new(Arc::clone(&browser));
        let results = self.run_with(&mut sessions, only).await;
        drop(sessions);

        if let Ok(browser) = Arc::try_unwrap(browser) {
            if let Err(e) = browser.close().await {
                warn!(error = %e, "browser did not close cleanly");
            }
        }
        results
    }

    /// Launch Chromium and run against it
    ///
    /// # Errors
    ///
    /// Always fails: this build has no browser support.
    #[cfg(not(feature = "browser"))]
    pub async fn run(&self, only: &[String]) -> CliResult<SuiteResults> {
        self.check_filter(only)?;
        Err(CliError::BrowserUnavailable)
    }
}
