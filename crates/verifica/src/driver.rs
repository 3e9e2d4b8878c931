//! PageDriver - the capability surface the checkers are written against.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  PageDriver (async trait)                                     │
//! ├───────────────────────────────────────────────────────────────┤
//! │  locate / count            element lookup by Selector         │
//! │  click / type_text         pointer and text input             │
//! │  press_key                 keyboard dispatch (Tab, Enter, …)  │
//! │  is_visible / class_name   visual state                       │
//! │  is_focused / focused_…    explicit focus state               │
//! │  navigate / wait_*         page bootstrap and idle waits      │
//! ├───────────────────────────────────────────────────────────────┤
//! │  CdpDriver (feature "browser")    MockDriver (tests)          │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every method is a suspension point. Drivers apply actions in the order they
//! are issued and never retry on their own.

use crate::locator::Selector;
use crate::result::{VerifyError, VerifyResult};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Page load states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    /// The `load` event fired
    #[default]
    Load,
    /// `DOMContentLoaded` fired
    DomContentLoaded,
    /// No network activity for the idle threshold
    NetworkIdle,
}

impl LoadState {
    /// Get the event name for this load state
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::DomContentLoaded => "DOMContentLoaded",
            Self::NetworkIdle => "networkidle",
        }
    }
}

impl std::fmt::Display for LoadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.event_name())
    }
}

/// Keys the harness dispatches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    /// Advance focus
    Tab,
    /// Confirm / activate
    Enter,
    /// Close / dismiss
    Escape,
}

impl Key {
    /// DOM `key` value
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Tab => "Tab",
            Self::Enter => "Enter",
            Self::Escape => "Escape",
        }
    }

    /// Windows virtual key code, as CDP expects it
    #[must_use]
    pub const fn key_code(self) -> i64 {
        match self {
            Self::Tab => 9,
            Self::Enter => 13,
            Self::Escape => 27,
        }
    }
}

/// Handle to a located element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Driver-assigned identifier
    pub id: String,
    /// Element tag name
    pub tag_name: String,
    /// Accessible label or text, if any
    pub label: Option<String>,
}

impl ElementHandle {
    /// Create a new element handle
    #[must_use]
    pub fn new(id: impl Into<String>, tag_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag_name: tag_name.into(),
            label: None,
        }
    }

    /// Attach a label
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Short human-readable description, e.g. `<a> "Learn"`
    #[must_use]
    pub fn describe(&self) -> String {
        match &self.label {
            Some(label) => format!("<{}> \"{}\"", self.tag_name, label),
            None => format!("<{}#{}>", self.tag_name, self.id),
        }
    }
}

/// Check a class attribute against a regular-expression pattern
///
/// # Errors
///
/// Returns a configuration error if the pattern is not a valid regex.
pub fn class_matches(class_name: &str, pattern: &str) -> VerifyResult<bool> {
    let re = Regex::new(pattern).map_err(|e| VerifyError::Config {
        message: format!("invalid class pattern '{pattern}': {e}"),
    })?;
    Ok(re.is_match(class_name))
}

/// Abstract driver trait for the page under test
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate to URL
    async fn navigate(&mut self, url: &str) -> VerifyResult<()>;

    /// Wait until the page reaches a load state
    async fn wait_for_load_state(&mut self, state: LoadState) -> VerifyResult<()>;

    /// Locate the first element matching a selector
    ///
    /// Returns [`VerifyError::ElementNotFound`] when nothing matches.
    async fn locate(&mut self, selector: &Selector) -> VerifyResult<ElementHandle>;

    /// Count elements matching a selector
    async fn count(&mut self, selector: &Selector) -> VerifyResult<usize>;

    /// Click an element
    async fn click(&mut self, handle: &ElementHandle) -> VerifyResult<()>;

    /// Type text into an element
    async fn type_text(&mut self, handle: &ElementHandle, text: &str) -> VerifyResult<()>;

    /// Dispatch a key press to the page
    async fn press_key(&mut self, key: Key) -> VerifyResult<()>;

    /// Whether an element is rendered and visible
    async fn is_visible(&mut self, handle: &ElementHandle) -> VerifyResult<bool>;

    /// Raw class attribute of an element
    async fn class_name(&mut self, handle: &ElementHandle) -> VerifyResult<String>;

    /// Whether an element's class attribute matches a pattern
    async fn has_class(&mut self, handle: &ElementHandle, pattern: &str) -> VerifyResult<bool> {
        let class_name = self.class_name(handle).await?;
        class_matches(&class_name, pattern)
    }

    /// Text content of an element
    async fn text_content(&mut self, handle: &ElementHandle) -> VerifyResult<String>;

    /// Whether an element is the active element
    async fn is_focused(&mut self, handle: &ElementHandle) -> VerifyResult<bool>;

    /// The active element, or `None` if focus is not on any page element
    async fn focused_element(&mut self) -> VerifyResult<Option<ElementHandle>>;

    /// Fixed wall-clock wait
    async fn wait_idle(&mut self, duration: Duration) -> VerifyResult<()>;

    /// Release the session; the driver is not used afterwards
    async fn close(&mut self) -> VerifyResult<()> {
        Ok(())
    }
}

/// Opens fresh, isolated driver sessions, one per scenario
#[async_trait]
pub trait SessionProvider: Send {
    /// Open a new session
    async fn open(&mut self) -> VerifyResult<Box<dyn PageDriver>>;
}

// ============================================================================
// MockDriver
// ============================================================================

/// An element in the mock page model
#[derive(Debug, Clone)]
pub struct MockElement {
    /// Identifier
    pub id: String,
    /// Tag name
    pub tag_name: String,
    /// Accessible label
    pub label: Option<String>,
    /// Text content
    pub text: String,
    /// Class list
    pub classes: Vec<String>,
    /// Selectors this element answers to
    pub selectors: Vec<Selector>,
    /// Present in the DOM
    pub attached: bool,
    /// Rendered and visible
    pub visible: bool,
    /// Part of the tab sequence
    pub focusable: bool,
}

impl MockElement {
    /// Create an attached, visible, non-focusable element
    #[must_use]
    pub fn new(id: impl Into<String>, tag_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag_name: tag_name.into(),
            label: None,
            text: String::new(),
            classes: Vec::new(),
            selectors: Vec::new(),
            attached: true,
            visible: true,
            focusable: false,
        }
    }

    /// Set the label (also used as text content)
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        let label = label.into();
        self.text.clone_from(&label);
        self.label = Some(label);
        self
    }

    /// Add a selector this element matches
    #[must_use]
    pub fn matches(mut self, selector: Selector) -> Self {
        self.selectors.push(selector);
        self
    }

    /// Add a class
    #[must_use]
    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    /// Mark as focusable
    #[must_use]
    pub const fn focusable(mut self) -> Self {
        self.focusable = true;
        self
    }

    /// Start detached from the DOM
    #[must_use]
    pub const fn detached(mut self) -> Self {
        self.attached = false;
        self
    }

    /// Start hidden
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    fn handle(&self) -> ElementHandle {
        ElementHandle {
            id: self.id.clone(),
            tag_name: self.tag_name.clone(),
            label: self.label.clone(),
        }
    }
}

/// Interaction that triggers scripted effects
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MockTrigger {
    /// Element clicked
    Click(String),
    /// Text typed into element
    Type(String),
    /// Key pressed
    Key(Key),
}

/// State change applied to the mock page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEffect {
    /// Insert element into the DOM
    Attach(String),
    /// Remove element from the DOM
    Detach(String),
    /// Make element visible
    Show(String),
    /// Hide element
    Hide(String),
    /// Toggle a class on an element
    ToggleClass(String, String),
    /// Move focus to element
    Focus(String),
    /// Drop focus from the page
    Blur,
}

/// In-memory scripted driver for unit testing
///
/// Elements answer to the selectors registered on them; clicks, typing and
/// key presses apply the effects scripted with [`MockDriver::on`]. `Tab`
/// walks the focusable elements in declaration order, leaving the page after
/// the last one. `navigate` restores the page to its initial state.
#[derive(Debug, Clone, Default)]
pub struct MockDriver {
    elements: Vec<MockElement>,
    initial: Vec<MockElement>,
    reactions: HashMap<MockTrigger, Vec<MockEffect>>,
    focused: Option<String>,
    typed: HashMap<String, String>,
    timeout_on: Option<String>,
    closed: Option<Arc<AtomicUsize>>,
    /// Current URL
    pub current_url: String,
    /// Call history for verification
    pub call_history: Vec<String>,
}

impl MockDriver {
    /// Create new mock driver
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an element to the page
    #[must_use]
    pub fn with_element(mut self, element: MockElement) -> Self {
        self.initial.push(element.clone());
        self.elements.push(element);
        self
    }

    /// Script effects for a trigger
    #[must_use]
    pub fn on(mut self, trigger: MockTrigger, effects: Vec<MockEffect>) -> Self {
        self.reactions.entry(trigger).or_default().extend(effects);
        self
    }

    /// Make every call whose name starts with `operation` time out
    #[must_use]
    pub fn with_timeout_on(mut self, operation: impl Into<String>) -> Self {
        self.timeout_on = Some(operation.into());
        self
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> &[String] {
        &self.call_history
    }

    /// Check if method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.call_history.iter().any(|c| c.starts_with(method))
    }

    /// Number of calls starting with `method`
    #[must_use]
    pub fn call_count(&self, method: &str) -> usize {
        self.call_history
            .iter()
            .filter(|c| c.starts_with(method))
            .count()
    }

    /// Text typed into an element so far
    #[must_use]
    pub fn typed(&self, id: &str) -> Option<&str> {
        self.typed.get(id).map(String::as_str)
    }

    fn record(&mut self, call: String) -> VerifyResult<()> {
        let timed_out = self
            .timeout_on
            .as_deref()
            .is_some_and(|op| call.starts_with(op));
        self.call_history.push(call.clone());
        if timed_out {
            return Err(VerifyError::timeout(call, 5000));
        }
        Ok(())
    }

    fn attached(&self, id: &str) -> VerifyResult<&MockElement> {
        self.elements
            .iter()
            .find(|e| e.id == id && e.attached)
            .ok_or_else(|| VerifyError::ElementNotFound {
                selector: format!("#{id} (detached)"),
            })
    }

    fn element_mut(&mut self, id: &str) -> Option<&mut MockElement> {
        self.elements.iter_mut().find(|e| e.id == id)
    }

    fn fire(&mut self, trigger: &MockTrigger) {
        let Some(effects) = self.reactions.get(trigger).cloned() else {
            return;
        };
        for effect in effects {
            self.apply(effect);
        }
    }

    fn apply(&mut self, effect: MockEffect) {
        match effect {
            MockEffect::Attach(id) => {
                if let Some(el) = self.element_mut(&id) {
                    el.attached = true;
                }
            }
            MockEffect::Detach(id) => {
                if let Some(el) = self.element_mut(&id) {
                    el.attached = false;
                }
                if self.focused.as_deref() == Some(id.as_str()) {
                    self.focused = None;
                }
            }
            MockEffect::Show(id) => {
                if let Some(el) = self.element_mut(&id) {
                    el.visible = true;
                }
            }
            MockEffect::Hide(id) => {
                if let Some(el) = self.element_mut(&id) {
                    el.visible = false;
                }
            }
            MockEffect::ToggleClass(id, class) => {
                if let Some(el) = self.element_mut(&id) {
                    if let Some(pos) = el.classes.iter().position(|c| *c == class) {
                        el.classes.remove(pos);
                    } else {
                        el.classes.push(class);
                    }
                }
            }
            MockEffect::Focus(id) => self.focused = Some(id),
            MockEffect::Blur => self.focused = None,
        }
    }

    fn tab_sequence(&self) -> Vec<String> {
        self.elements
            .iter()
            .filter(|e| e.focusable && e.attached && e.visible)
            .map(|e| e.id.clone())
            .collect()
    }

    fn advance_focus(&mut self) {
        let sequence = self.tab_sequence();
        self.focused = match &self.focused {
            None => sequence.first().cloned(),
            Some(current) => sequence
                .iter()
                .position(|id| id == current)
                .and_then(|pos| sequence.get(pos + 1).cloned()),
        };
    }
}

#[async_trait]
impl PageDriver for MockDriver {
    async fn navigate(&mut self, url: &str) -> VerifyResult<()> {
        self.record(format!("navigate:{url}"))?;
        self.current_url = url.to_string();
        self.elements.clone_from(&self.initial);
        self.focused = None;
        self.typed.clear();
        Ok(())
    }

    async fn wait_for_load_state(&mut self, state: LoadState) -> VerifyResult<()> {
        self.record(format!("wait_for_load_state:{state}"))
    }

    async fn locate(&mut self, selector: &Selector) -> VerifyResult<ElementHandle> {
        self.record(format!("locate:{selector}"))?;
        self.elements
            .iter()
            .find(|e| e.attached && e.selectors.contains(selector))
            .map(MockElement::handle)
            .ok_or_else(|| VerifyError::ElementNotFound {
                selector: selector.to_string(),
            })
    }

    async fn count(&mut self, selector: &Selector) -> VerifyResult<usize> {
        self.record(format!("count:{selector}"))?;
        Ok(self
            .elements
            .iter()
            .filter(|e| e.attached && e.selectors.contains(selector))
            .count())
    }

    async fn click(&mut self, handle: &ElementHandle) -> VerifyResult<()> {
        self.record(format!("click:{}", handle.id))?;
        let focusable = self.attached(&handle.id)?.focusable;
        if focusable {
            self.focused = Some(handle.id.clone());
        }
        self.fire(&MockTrigger::Click(handle.id.clone()));
        Ok(())
    }

    async fn type_text(&mut self, handle: &ElementHandle, text: &str) -> VerifyResult<()> {
        self.record(format!("type:{}:{text}", handle.id))?;
        self.attached(&handle.id)?;
        self.typed
            .entry(handle.id.clone())
            .or_default()
            .push_str(text);
        self.fire(&MockTrigger::Type(handle.id.clone()));
        Ok(())
    }

    async fn press_key(&mut self, key: Key) -> VerifyResult<()> {
        self.record(format!("press:{}", key.name()))?;
        if key == Key::Tab {
            self.advance_focus();
        }
        self.fire(&MockTrigger::Key(key));
        Ok(())
    }

    async fn is_visible(&mut self, handle: &ElementHandle) -> VerifyResult<bool> {
        self.record(format!("is_visible:{}", handle.id))?;
        Ok(self.attached(&handle.id)?.visible)
    }

    async fn class_name(&mut self, handle: &ElementHandle) -> VerifyResult<String> {
        self.record(format!("class_name:{}", handle.id))?;
        Ok(self.attached(&handle.id)?.classes.join(" "))
    }

    async fn text_content(&mut self, handle: &ElementHandle) -> VerifyResult<String> {
        self.record(format!("text_content:{}", handle.id))?;
        Ok(self.attached(&handle.id)?.text.clone())
    }

    async fn is_focused(&mut self, handle: &ElementHandle) -> VerifyResult<bool> {
        self.record(format!("is_focused:{}", handle.id))?;
        Ok(self.focused.as_deref() == Some(handle.id.as_str()))
    }

    async fn focused_element(&mut self) -> VerifyResult<Option<ElementHandle>> {
        self.record("focused_element".to_string())?;
        Ok(self
            .focused
            .as_deref()
            .and_then(|id| self.elements.iter().find(|e| e.id == id && e.attached))
            .map(MockElement::handle))
    }

    async fn wait_idle(&mut self, duration: Duration) -> VerifyResult<()> {
        self.record(format!("wait_idle:{}", duration.as_millis()))
    }

    async fn close(&mut self) -> VerifyResult<()> {
        self.record("close".to_string())?;
        if let Some(closed) = &self.closed {
            closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Session provider that hands out copies of a template page
#[derive(Debug, Clone)]
pub struct MockSessions {
    template: MockDriver,
    closed: Arc<AtomicUsize>,
    /// Number of sessions opened
    pub opened: usize,
}

impl MockSessions {
    /// Create a provider from a template
    #[must_use]
    pub fn new(template: MockDriver) -> Self {
        Self {
            template,
            closed: Arc::new(AtomicUsize::new(0)),
            opened: 0,
        }
    }

    /// Number of sessions closed so far
    #[must_use]
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionProvider for MockSessions {
    async fn open(&mut self) -> VerifyResult<Box<dyn PageDriver>> {
        self.opened += 1;
        let mut driver = self.template.clone();
        driver.closed = Some(Arc::clone(&self.closed));
        Ok(Box::new(driver))
    }
}
