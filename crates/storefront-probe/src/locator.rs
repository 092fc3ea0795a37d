//! Locator abstraction for element selection.
//!
//! A [`Locator`] is a recipe, not a reference: it is re-evaluated against the
//! page every time it is used, so a DOM that mutates between two polls is
//! always seen fresh. Resolution never assumes a match exists; combine it with
//! the [`Waiter`](crate::Waiter) before asserting existence.
//!
//! Selector kinds follow the Playwright locators the storefront suite is
//! written against:
//!
//! - `Css` - a compound selector such as `#login-button`, `.inventory_item`, `img`
//! - `Text` - the smallest elements whose text contains the string (case-insensitive)
//! - `Placeholder` - form controls with that exact placeholder
//! - `Role` - ARIA role, optionally filtered by accessible name
//! - `Within` - a child selector scoped under each element of a parent locator

use crate::driver::{ElementHandle, PageDriver};
use crate::result::{Diagnostic, ProbeError, ProbeResult};
use std::fmt;
use std::time::Duration;

const EXACTLY_ONE: &str = "exactly one element";

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// CSS selector (e.g., "button.primary")
    Css(String),
    /// Text content selector
    Text(String),
    /// Placeholder attribute selector
    Placeholder(String),
    /// ARIA role with optional accessible name filter
    Role {
        /// Role name (button, link, textbox, combobox, img, ...)
        role: String,
        /// Case-insensitive substring of the accessible name
        name: Option<String>,
    },
    /// Child selector evaluated under every element of the parent
    Within {
        /// Scope
        parent: Box<Locator>,
        /// Selector evaluated inside each scope element
        child: Box<Selector>,
    },
}

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into().trim().to_string())
    }

    /// Create a text selector
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Create a placeholder selector
    #[must_use]
    pub fn placeholder(placeholder: impl Into<String>) -> Self {
        Self::Placeholder(placeholder.into())
    }

    /// Create a role selector
    #[must_use]
    pub fn role(role: impl Into<String>) -> Self {
        Self::Role {
            role: role.into(),
            name: None,
        }
    }

    /// Create a role selector filtered by accessible name
    #[must_use]
    pub fn role_with_name(role: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Role {
            role: role.into(),
            name: Some(name.into()),
        }
    }

    /// CSS that pre-filters candidates for a role
    #[must_use]
    pub fn role_css(role: &str) -> String {
        match role {
            "button" => {
                "button, input[type=submit], input[type=button], [role=button]".to_string()
            }
            "link" => "a[href], [role=link]".to_string(),
            "textbox" => "input:not([type]), input[type=text], input[type=password], textarea, [role=textbox]".to_string(),
            "combobox" => "select, [role=combobox]".to_string(),
            "img" => "img, [role=img]".to_string(),
            other => format!("[role={other}]"),
        }
    }

    /// JavaScript expression collecting the matches under `root` as an array.
    ///
    /// `depth` keeps the arrow-function parameter names of nested scopes apart.
    #[must_use]
    pub fn to_js_collector(&self, root: &str, depth: usize) -> String {
        match self {
            Self::Css(css) => format!("Array.from({root}.querySelectorAll({}))", js_str(css)),
            Self::Text(text) => {
                let needle = js_str(&text.to_lowercase());
                format!(
                    "Array.from({root}.querySelectorAll('*')).filter(el => \
                     (el.textContent || '').replace(/\\s+/g, ' ').toLowerCase().includes({needle}) && \
                     !Array.from(el.children).some(c => (c.textContent || '').replace(/\\s+/g, ' ').toLowerCase().includes({needle})))"
                )
            }
            Self::Placeholder(p) => format!(
                "Array.from({root}.querySelectorAll('[placeholder]')).filter(el => el.getAttribute('placeholder') === {})",
                js_str(p)
            ),
            Self::Role { role, name } => {
                let base = format!(
                    "Array.from({root}.querySelectorAll({}))",
                    js_str(&Self::role_css(role))
                );
                match name {
                    None => base,
                    Some(name) => format!(
                        "{base}.filter(el => ((el.getAttribute('aria-label') || \
                         (el.tagName === 'INPUT' ? el.value : el.textContent)) || '')\
                         .replace(/\\s+/g, ' ').trim().toLowerCase().includes({}))",
                        js_str(&name.to_lowercase())
                    ),
                }
            }
            Self::Within { parent, child } => {
                let scope = format!("__scope{depth}");
                format!(
                    "{}.flatMap({scope} => {})",
                    parent.to_js_collector(root, depth + 1),
                    child.to_js_collector(&scope, depth + 1)
                )
            }
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(css) => write!(f, "css={css}"),
            Self::Text(text) => write!(f, "text={text:?}"),
            Self::Placeholder(p) => write!(f, "placeholder={p:?}"),
            Self::Role { role, name: None } => write!(f, "role={role}"),
            Self::Role {
                role,
                name: Some(name),
            } => write!(f, "role={role}[name={name:?}]"),
            Self::Within { parent, child } => write!(f, "{parent} >> {child}"),
        }
    }
}

fn js_str(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// Which of the matches a locator narrows to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Nth {
    /// Every match
    #[default]
    All,
    /// The first match
    First,
    /// The n-th match (zero-based)
    Index(usize),
}

/// A declarative, re-evaluatable description of how to find elements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    selector: Selector,
    nth: Nth,
}

impl Locator {
    /// Create a new locator with a CSS selector
    #[must_use]
    pub fn new(selector: impl Into<String>) -> Self {
        Self::from_selector(Selector::css(selector))
    }

    /// Create a locator from a selector
    #[must_use]
    pub const fn from_selector(selector: Selector) -> Self {
        Self {
            selector,
            nth: Nth::All,
        }
    }

    /// `page.getByText(..)`
    #[must_use]
    pub fn by_text(text: impl Into<String>) -> Self {
        Self::from_selector(Selector::text(text))
    }

    /// `page.getByPlaceholder(..)`
    #[must_use]
    pub fn by_placeholder(placeholder: impl Into<String>) -> Self {
        Self::from_selector(Selector::placeholder(placeholder))
    }

    /// `page.getByRole(role, { name })`
    #[must_use]
    pub fn by_role(role: impl Into<String>, name: impl Into<String>) -> Self {
        Self::from_selector(Selector::role_with_name(role, name))
    }

    /// Narrow to the first match
    #[must_use]
    pub fn first(&self) -> Self {
        Self {
            selector: self.selector.clone(),
            nth: Nth::First,
        }
    }

    /// Narrow to the n-th match (zero-based)
    #[must_use]
    pub fn nth(&self, index: usize) -> Self {
        Self {
            selector: self.selector.clone(),
            nth: Nth::Index(index),
        }
    }

    /// Scope a CSS selector under this locator's matches
    #[must_use]
    pub fn locator(&self, css: impl Into<String>) -> Self {
        self.within(Selector::css(css))
    }

    /// Scope a role selector under this locator's matches
    #[must_use]
    pub fn get_by_role(&self, role: impl Into<String>, name: impl Into<String>) -> Self {
        self.within(Selector::role_with_name(role, name))
    }

    /// Scope any selector under this locator's matches
    #[must_use]
    pub fn within(&self, child: Selector) -> Self {
        Self::from_selector(Selector::Within {
            parent: Box::new(self.clone()),
            child: Box::new(child),
        })
    }

    /// Get the selector
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Get the narrowing
    #[must_use]
    pub const fn narrowing(&self) -> Nth {
        self.nth
    }

    /// Whether the locator has been narrowed to a single position
    #[must_use]
    pub const fn is_narrowed(&self) -> bool {
        !matches!(self.nth, Nth::All)
    }

    /// Apply the narrowing to a full match set
    #[must_use]
    pub fn narrow(&self, mut matches: Vec<ElementHandle>) -> Vec<ElementHandle> {
        match self.nth {
            Nth::All => matches,
            Nth::First => {
                matches.truncate(1);
                matches
            }
            Nth::Index(i) if i < matches.len() => vec![matches.swap_remove(i)],
            Nth::Index(_) => Vec::new(),
        }
    }

    /// JavaScript expression collecting the narrowed matches under `root`
    #[must_use]
    pub fn to_js_collector(&self, root: &str, depth: usize) -> String {
        let all = self.selector.to_js_collector(root, depth);
        match self.nth {
            Nth::All => all,
            Nth::First => format!("{all}.slice(0, 1)"),
            Nth::Index(i) => format!("{all}.slice({i}, {})", i + 1),
        }
    }

    /// Resolve against the current page. Zero matches is not an error.
    pub async fn resolve(&self, driver: &dyn PageDriver) -> ProbeResult<Vec<ElementHandle>> {
        // Scoped selectors carry their parent's narrowing and are evaluated by
        // the driver as a whole.
        let matches = driver.query_all(&self.selector).await?;
        Ok(self.narrow(matches))
    }

    /// Resolve to exactly one element, without waiting.
    ///
    /// Zero matches, or several matches on a locator that was not narrowed,
    /// is a [`ProbeError::ResolutionFailure`].
    pub async fn resolve_one(&self, driver: &dyn PageDriver) -> ProbeResult<ElementHandle> {
        let mut matches = self.resolve(driver).await?;
        match matches.len() {
            0 => Err(ProbeError::resolution(Diagnostic::new(
                self.to_string(),
                EXACTLY_ONE,
                "no element matched",
                Duration::ZERO,
            ))),
            1 => Ok(matches.remove(0)),
            n => Err(self.strict_violation(n)),
        }
    }

    /// Number of current matches
    pub async fn count(&self, driver: &dyn PageDriver) -> ProbeResult<usize> {
        Ok(self.resolve(driver).await?.len())
    }

    /// Text content of every current match, in document order
    pub async fn all_text_contents(&self, driver: &dyn PageDriver) -> ProbeResult<Vec<String>> {
        Ok(self
            .resolve(driver)
            .await?
            .into_iter()
            .map(|e| e.text_content)
            .collect())
    }

    /// Error for a non-narrowed locator that matched several elements
    #[must_use]
    pub fn strict_violation(&self, count: usize) -> ProbeError {
        ProbeError::resolution(Diagnostic::new(
            self.to_string(),
            EXACTLY_ONE,
            format!("{count} elements (strict mode)"),
            Duration::ZERO,
        ))
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.nth {
            Nth::All => write!(f, "{}", self.selector),
            Nth::First => write!(f, "{} >> first", self.selector),
            Nth::Index(i) => write!(f, "{} >> nth={i}", self.selector),
        }
    }
}
