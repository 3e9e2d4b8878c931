//! Configuration of the page under test.
//!
//! Every field has a default describing the React documentation site, so an
//! empty `verifica.yaml` is a valid configuration.

use crate::driver::LoadState;
use crate::focus::{FocusPlan, FocusTarget, TraversalStep};
use crate::locator::Selector;
use crate::presence::Landmark;
use crate::result::{VerifyError, VerifyResult};
use crate::theme::ThemeToggle;
use crate::workflow::SearchSpec;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "verifica.yaml";

/// Default page under test
pub const DEFAULT_BASE_URL: &str = "https://react.dev";

/// One entry of the expected tab order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusEntry {
    /// Target name, unique within the list
    pub name: String,
    /// How to locate the target
    pub selector: Selector,
    /// Focus advances issued before this checkpoint
    #[serde(default = "default_advance")]
    pub advance: u32,
}

const fn default_advance() -> u32 {
    1
}

impl FocusEntry {
    fn new(name: &str, selector: Selector, advance: u32) -> Self {
        Self {
            name: name.to_string(),
            selector,
            advance,
        }
    }
}

/// Browser session settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// Run without a visible window
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Chromium executable; detected when unset
    pub chromium_path: Option<String>,
    /// Bound on every driver action
    pub action_timeout_ms: u64,
    /// Bound on navigation and load-state waits
    pub navigation_timeout_ms: u64,
    /// Quiet period treated as network idle
    pub network_idle_ms: u64,
    /// Load state awaited before every scenario
    pub load_state: LoadState,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            chromium_path: None,
            action_timeout_ms: 10_000,
            navigation_timeout_ms: 30_000,
            network_idle_ms: 500,
            load_state: LoadState::NetworkIdle,
        }
    }
}

/// Full verification configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificaConfig {
    /// Page loaded before every scenario
    pub base_url: String,
    /// Stop after the first failing scenario
    pub fail_fast: bool,
    /// Browser session settings
    pub browser: BrowserSettings,
    /// Structural landmarks
    pub landmarks: Vec<Landmark>,
    /// Theme toggle
    pub theme: ThemeToggle,
    /// Expected tab order
    pub focus: Vec<FocusEntry>,
    /// Search-and-favorites workflow
    pub search: SearchSpec,
}

impl Default for VerificaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            fail_fast: false,
            browser: BrowserSettings::default(),
            landmarks: Landmark::defaults(),
            theme: ThemeToggle::default(),
            focus: default_focus_order(),
            search: SearchSpec::default(),
        }
    }
}

/// Tab order of the reference site's top navigation
fn default_focus_order() -> Vec<FocusEntry> {
    vec![
        // skip-to-content link comes first
        FocusEntry::new("React", Selector::role("link", "React"), 2),
        FocusEntry::new("Search", Selector::role("button", "Search"), 1),
        FocusEntry::new("Learn", Selector::role("link", "Learn"), 1),
        FocusEntry::new("Reference", Selector::role("link", "Reference"), 1),
        FocusEntry::new("Community", Selector::role("link", "Community"), 1),
        FocusEntry::new("Blog", Selector::role("link", "Blog"), 1),
        FocusEntry::new("Theme", Selector::role("button", "Use Dark Mode"), 1),
        FocusEntry::new("Languages", Selector::role("link", "Translations"), 1),
        FocusEntry::new("GitHub", Selector::role("link", "Open on GitHub"), 1),
    ]
}

impl VerificaConfig {
    /// Parse from YAML; blank input yields the defaults
    ///
    /// # Errors
    ///
    /// Returns a YAML error for malformed input.
    pub fn from_yaml(yaml: &str) -> VerifyResult<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Serialize to YAML
    ///
    /// # Errors
    ///
    /// Returns a YAML error if serialization fails.
    pub fn to_yaml(&self) -> VerifyResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Load from a file
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, or a YAML error.
    pub fn from_file(path: &Path) -> VerifyResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load `path` if given, else `verifica.yaml` if present, else defaults
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named file is missing or malformed.
    pub fn load(path: Option<&Path>) -> VerifyResult<Self> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(VerifyError::Config {
                        message: format!("config file not found: {}", p.display()),
                    });
                }
                Self::from_file(p)
            }
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Build the focus plan; ordinals follow list order
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::InvalidPlan`] if the list violates plan rules.
    pub fn focus_plan(&self) -> VerifyResult<FocusPlan> {
        let entries = self
            .focus
            .iter()
            .zip(1u32..)
            .map(|(entry, ordinal)| {
                (
                    FocusTarget::new(entry.name.clone(), entry.selector.clone(), ordinal),
                    TraversalStep::advance(entry.advance),
                )
            })
            .collect();
        FocusPlan::new(entries)
    }

    /// Check the configuration without touching a page
    ///
    /// # Errors
    ///
    /// Returns a configuration or plan error describing the first problem.
    pub fn validate(&self) -> VerifyResult<()> {
        if !(self.base_url.starts_with("http://")
            || self.base_url.starts_with("https://")
            || self.base_url.starts_with("file://"))
        {
            return Err(VerifyError::Config {
                message: format!("base_url must be an http(s) or file URL: {}", self.base_url),
            });
        }
        if self.search.query.trim().is_empty() {
            return Err(VerifyError::Config {
                message: "search.query must not be empty".to_string(),
            });
        }
        crate::driver::class_matches("", &self.theme.pattern)?;
        self.focus_plan()?;
        Ok(())
    }
}
