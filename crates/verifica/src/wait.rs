//! Condition-based waiting.
//!
//! Conditions are polled through the driver with a bounded exponential
//! backoff. Exceeding the timeout is a hard failure
//! ([`VerifyError::DriverTimeout`]); there is no retry beyond the poll loop.

use crate::driver::PageDriver;
use crate::locator::Selector;
use crate::result::{VerifyError, VerifyResult};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

/// Default timeout for wait operations (10 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 10_000;

/// Default initial polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Default upper bound on the polling interval (800ms)
pub const DEFAULT_MAX_POLL_INTERVAL_MS: u64 = 800;

/// Options for wait operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// First polling interval in milliseconds
    pub poll_interval_ms: u64,
    /// Ceiling for the polling interval in milliseconds
    pub max_poll_interval_ms: u64,
    /// Interval multiplier applied after each unsuccessful poll
    pub backoff: f64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_poll_interval_ms: DEFAULT_MAX_POLL_INTERVAL_MS,
            backoff: 2.0,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set the first polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Set the backoff multiplier
    #[must_use]
    pub const fn with_backoff(mut self, backoff: f64) -> Self {
        self.backoff = backoff;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Interval to sleep before poll number `attempt` (0-based)
    #[must_use]
    pub fn interval_for(&self, attempt: u32) -> Duration {
        let factor = self.backoff.max(1.0).powi(attempt.min(32) as i32);
        let ms = (self.poll_interval_ms as f64 * factor).min(self.max_poll_interval_ms as f64);
        Duration::from_millis(ms as u64)
    }
}

/// Condition evaluated through the driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitCondition {
    /// At least `min` elements match the selector
    CountAtLeast {
        /// Selector to count
        selector: Selector,
        /// Minimum number of matches
        min: usize,
    },
    /// The first match is visible
    Visible(Selector),
}

impl WaitCondition {
    /// Human-readable description for errors and logs
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::CountAtLeast { selector, min } => format!("at least {min} of {selector}"),
            Self::Visible(selector) => format!("{selector} visible"),
        }
    }

    async fn check(&self, driver: &mut dyn PageDriver) -> VerifyResult<bool> {
        match self {
            Self::CountAtLeast { selector, min } => Ok(driver.count(selector).await? >= *min),
            Self::Visible(selector) => match driver.locate(selector).await {
                Ok(handle) => driver.is_visible(&handle).await,
                Err(VerifyError::ElementNotFound { .. }) => Ok(false),
                Err(e) => Err(e),
            },
        }
    }
}

/// Result of a wait operation
#[derive(Debug, Clone)]
pub struct WaitResult {
    /// Time spent waiting
    pub elapsed: Duration,
    /// Number of polls issued
    pub attempts: u32,
    /// Description of what was waited for
    pub waited_for: String,
}

/// Poll `condition` until it holds or the timeout elapses
///
/// # Errors
///
/// Returns [`VerifyError::DriverTimeout`] when the condition never holds, or
/// the first driver error raised while polling.
pub async fn wait_for(
    driver: &mut dyn PageDriver,
    condition: &WaitCondition,
    options: &WaitOptions,
) -> VerifyResult<WaitResult> {
    let start = Instant::now();
    let timeout = options.timeout();
    let mut attempts = 0;

    loop {
        attempts += 1;
        if condition.check(driver).await? {
            debug!(
                condition = %condition.description(),
                attempts,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "wait condition met"
            );
            return Ok(WaitResult {
                elapsed: start.elapsed(),
                attempts,
                waited_for: condition.description(),
            });
        }

        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return Err(VerifyError::timeout(
                format!("waiting for {}", condition.description()),
                options.timeout_ms,
            ));
        }
        let pause = options.interval_for(attempts - 1).min(timeout - elapsed);
        tokio::time::sleep(pause).await;
    }
}
