//! Structural presence checks.
//!
//! A landmark is present when either its semantic selector or its class
//! pattern matches at least one element. The check only counts; it never
//! mutates the page, so repeated runs against an unchanged page agree.

use crate::driver::PageDriver;
use crate::locator::Selector;
use crate::result::{VerifyError, VerifyResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A structural landmark with two lookup strategies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Landmark {
    /// Landmark name (e.g. "header")
    pub name: String,
    /// Semantic tag or role selector
    pub semantic: Selector,
    /// Class-pattern fallback
    pub class_pattern: Selector,
}

impl Landmark {
    /// Landmark found by tag `tag` or any class containing `tag`
    #[must_use]
    pub fn tag(tag: &str) -> Self {
        Self {
            name: tag.to_string(),
            semantic: Selector::css(tag),
            class_pattern: Selector::css(format!("[class*='{tag}']")),
        }
    }

    /// Reference landmarks: header and footer
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        vec![Self::tag("header"), Self::tag("footer")]
    }
}

/// Match counts for one landmark
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresenceFinding {
    /// Landmark name
    pub landmark: String,
    /// Matches of the semantic selector
    pub semantic_count: usize,
    /// Matches of the class-pattern selector
    pub class_count: usize,
}

impl PresenceFinding {
    /// Whether either strategy found the landmark
    #[must_use]
    pub const fn present(&self) -> bool {
        self.semantic_count > 0 || self.class_count > 0
    }
}

/// Checks a set of landmarks
#[derive(Debug, Clone)]
pub struct PresenceChecker {
    landmarks: Vec<Landmark>,
}

impl Default for PresenceChecker {
    fn default() -> Self {
        Self::new(Landmark::defaults())
    }
}

impl PresenceChecker {
    /// Create a checker for the given landmarks
    #[must_use]
    pub const fn new(landmarks: Vec<Landmark>) -> Self {
        Self { landmarks }
    }

    /// Landmarks checked
    #[must_use]
    pub fn landmarks(&self) -> &[Landmark] {
        &self.landmarks
    }

    /// Count both strategies for every landmark without judging
    ///
    /// # Errors
    ///
    /// Propagates driver errors.
    pub async fn survey(&self, driver: &mut dyn PageDriver) -> VerifyResult<Vec<PresenceFinding>> {
        let mut findings = Vec::with_capacity(self.landmarks.len());
        for landmark in &self.landmarks {
            let semantic_count = driver.count(&landmark.semantic).await?;
            let class_count = driver.count(&landmark.class_pattern).await?;
            debug!(
                landmark = %landmark.name,
                semantic_count,
                class_count,
                "landmark surveyed"
            );
            findings.push(PresenceFinding {
                landmark: landmark.name.clone(),
                semantic_count,
                class_count,
            });
        }
        Ok(findings)
    }

    /// Assert every landmark is present
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::PresenceNotFound`] for the first landmark both
    /// strategies miss.
    pub async fn check(&self, driver: &mut dyn PageDriver) -> VerifyResult<Vec<PresenceFinding>> {
        let findings = self.survey(driver).await?;
        for (landmark, finding) in self.landmarks.iter().zip(&findings) {
            if !finding.present() {
                return Err(VerifyError::PresenceNotFound {
                    landmark: landmark.name.clone(),
                    strategies: vec![
                        landmark.semantic.to_string(),
                        landmark.class_pattern.to_string(),
                    ],
                });
            }
        }
        Ok(findings)
    }
}
