//! Theme-toggle checker.
//!
//! One action and one assertion: click the toggle, then the root container's
//! class attribute must match the dark pattern. A fresh session must not
//! already carry the class.

use crate::driver::PageDriver;
use crate::locator::Selector;
use crate::result::{VerifyError, VerifyResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Toggle description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeToggle {
    /// The toggle control, located by accessible name
    pub toggle: Selector,
    /// Root container whose class reflects the theme
    pub root: Selector,
    /// Class pattern expected after one click
    pub pattern: String,
}

impl Default for ThemeToggle {
    fn default() -> Self {
        Self {
            toggle: Selector::role("button", "Use Dark Mode"),
            root: Selector::css("html"),
            pattern: "dark".to_string(),
        }
    }
}

/// Class attribute of the root before and after the click
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThemeReport {
    /// Class before clicking
    pub before: String,
    /// Class after clicking
    pub after: String,
}

impl ThemeToggle {
    /// Click the toggle once and check the root class
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::ToggleStateMismatch`] if the root already
    /// matches the pattern, the toggle is hidden, or the class does not match
    /// after the click. Driver errors propagate unchanged.
    pub async fn check(&self, driver: &mut dyn PageDriver) -> VerifyResult<ThemeReport> {
        let root = driver.locate(&self.root).await?;
        let before = driver.class_name(&root).await?;
        if driver.has_class(&root, &self.pattern).await? {
            return Err(VerifyError::ToggleStateMismatch {
                expected: format!("no class matching '{}' before toggling", self.pattern),
                observed: format!("\"{before}\""),
            });
        }

        let toggle = driver.locate(&self.toggle).await?;
        if !driver.is_visible(&toggle).await? {
            return Err(VerifyError::ToggleStateMismatch {
                expected: format!("visible toggle {}", self.toggle),
                observed: "hidden toggle".to_string(),
            });
        }
        driver.click(&toggle).await?;
        debug!(toggle = %toggle.describe(), "toggle clicked");

        let after = driver.class_name(&root).await?;
        if !driver.has_class(&root, &self.pattern).await? {
            return Err(VerifyError::ToggleStateMismatch {
                expected: format!("class matching '{}'", self.pattern),
                observed: format!("\"{after}\""),
            });
        }

        info!(%before, %after, "theme toggled");
        Ok(ThemeReport { before, after })
    }
}
