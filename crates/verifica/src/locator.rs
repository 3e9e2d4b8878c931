//! Selectors for locating elements on the page under test.
//!
//! A [`Selector`] is an opaque query handed to the driver. Four strategies
//! cover everything the checkers need:
//!
//! - **Role**: ARIA role plus accessible name (`button` named "Search")
//! - **Css**: attribute/class pattern (`[class*='footer']`)
//! - **Text**: deepest element whose text contains a string
//! - **Scoped**: a selector evaluated inside the first match of another
//!
//! Selectors translate to DOM query expressions for drivers that evaluate
//! JavaScript, and compare structurally so an in-memory driver can match them
//! without a DOM.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Selector {
    /// Selector evaluated within the first match of `within`
    Scoped {
        /// Parent scope
        within: Box<Selector>,
        /// Selector applied inside the parent
        find: Box<Selector>,
    },
    /// ARIA role with accessible name
    Role {
        /// ARIA role (e.g. "button", "link")
        role: String,
        /// Accessible name, matched case-insensitively as a substring
        name: String,
    },
    /// CSS selector filtered by text content
    CssWithText {
        /// Base CSS selector
        css: String,
        /// Text content to match
        text: String,
    },
    /// CSS selector (e.g. "footer", "[class*='header']")
    Css {
        /// CSS selector
        css: String,
    },
    /// Text content selector
    Text {
        /// Text to match
        text: String,
    },
}

impl Selector {
    /// Create a role selector
    #[must_use]
    pub fn role(role: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Role {
            role: role.into(),
            name: name.into(),
        }
    }

    /// Create a CSS selector
    #[must_use]
    pub fn css(css: impl Into<String>) -> Self {
        Self::Css { css: css.into() }
    }

    /// Create a text selector
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Create a CSS selector filtered by text content
    #[must_use]
    pub fn css_with_text(css: impl Into<String>, text: impl Into<String>) -> Self {
        Self::CssWithText {
            css: css.into(),
            text: text.into(),
        }
    }

    /// Scope `find` to the first element matched by `self`
    #[must_use]
    pub fn find(self, find: Self) -> Self {
        Self::Scoped {
            within: Box::new(self),
            find: Box::new(find),
        }
    }

    /// JavaScript expression evaluating to the first match, or `null`
    #[must_use]
    pub fn to_query(&self) -> String {
        format!("({}[0] ?? null)", self.all_in("document", 0))
    }

    /// JavaScript expression evaluating to the number of matches
    #[must_use]
    pub fn to_count_query(&self) -> String {
        format!("{}.length", self.all_in("document", 0))
    }

    /// JavaScript array expression of all matches under `root`
    fn all_in(&self, root: &str, depth: usize) -> String {
        match self {
            Self::Css { css } => {
                format!("Array.from({root}.querySelectorAll({}))", js_str(css))
            }
            Self::CssWithText { css, text } => format!(
                "Array.from({root}.querySelectorAll({})).filter(el => el.textContent.includes({}))",
                js_str(css),
                js_str(text)
            ),
            Self::Text { text } => {
                let t = js_str(text);
                format!(
                    "Array.from({root}.querySelectorAll('*')).filter(el => el.textContent.includes({t}) \
                     && !Array.from(el.children).some(c => c.textContent.includes({t})))"
                )
            }
            Self::Role { role, name } => format!(
                "Array.from({root}.querySelectorAll({})).filter(el => \
                 (el.getAttribute('aria-label') || el.getAttribute('title') || el.textContent || '')\
                 .trim().toLowerCase().includes({}))",
                js_str(&role_css(role)),
                js_str(&name.to_lowercase())
            ),
            Self::Scoped { within, find } => {
                let var = format!("__scope{depth}");
                format!(
                    "(({var}) => {var} ? {} : [])({}[0] ?? null)",
                    find.all_in(&var, depth + 1),
                    within.all_in(root, depth + 1)
                )
            }
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Role { role, name } => write!(f, "role={role}[name=\"{name}\"]"),
            Self::Css { css } => write!(f, "css={css}"),
            Self::CssWithText { css, text } => write!(f, "css={css}[text=\"{text}\"]"),
            Self::Text { text } => write!(f, "text=\"{text}\""),
            Self::Scoped { within, find } => write!(f, "{within} >> {find}"),
        }
    }
}

/// CSS matching the elements that carry an ARIA role, explicitly or implicitly
fn role_css(role: &str) -> String {
    let implicit = match role {
        "button" => "button, input[type='button'], input[type='submit'], ",
        "link" => "a[href], ",
        "searchbox" => "input[type='search'], ",
        "textbox" => "input:not([type]), input[type='text'], textarea, ",
        "banner" => "header, ",
        "contentinfo" => "footer, ",
        "navigation" => "nav, ",
        "list" => "ul, ol, ",
        "listitem" => "li, ",
        "heading" => "h1, h2, h3, h4, h5, h6, ",
        _ => "",
    };
    format!("{implicit}[role='{role}']")
}

/// Quote a string as a JavaScript string literal
fn js_str(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}
