//! PageDriver - the browser boundary.
//!
//! The engine never talks to a browser directly. Everything it needs from one
//! browsing context (read the location, resolve a selector, act on an element,
//! notice a popup) goes through [`PageDriver`], so the same locate/wait/assert
//! logic runs against Chromium over CDP or against the in-memory
//! [`MockPage`](crate::mock::MockPage).
//!
//! # Implementations
//!
//! - `ChromiumDriver` - real browser, `browser` feature, uses chromiumoxide
//! - `MockPage` - in-memory DOM with simulated settle latency

use crate::locator::Selector;
use crate::result::ProbeResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A resolved reference to a live element at one point in time.
///
/// Handles are one-shot results: the next DOM mutation may invalidate them,
/// and acting on an invalidated handle fails with
/// [`ProbeError::StaleElement`](crate::ProbeError::StaleElement). Callers
/// re-resolve the [`Locator`](crate::Locator) instead of keeping handles
/// across waits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Opaque identifier, only meaningful to the driver that issued it
    pub id: String,
    /// Lower-case tag name
    pub tag_name: String,
    /// Whitespace-normalized text content
    pub text_content: String,
    /// Whether the element is rendered and not hidden
    pub visible: bool,
    /// Current value for form controls (selected option label for `<select>`)
    pub value: Option<String>,
    /// Element attributes
    pub attributes: BTreeMap<String, String>,
}

impl ElementHandle {
    /// Create a new visible element handle
    #[must_use]
    pub fn new(id: impl Into<String>, tag_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag_name: tag_name.into(),
            text_content: String::new(),
            visible: true,
            value: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Set the text content
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text_content = text.into();
        self
    }

    /// Set an attribute
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.attributes.insert(name.into(), value.into());
        self
    }

    /// Mark as hidden
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Check if element is visible
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    /// Attribute value, if present
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Whether two handles describe the same rendered state, ignoring identity.
    ///
    /// Used to detect that an action's target mutated.
    #[must_use]
    pub fn same_state(&self, other: &Self) -> bool {
        self.tag_name == other.tag_name
            && self.text_content == other.text_content
            && self.visible == other.visible
            && self.value == other.value
            && self.attributes == other.attributes
    }

    /// Short description for diagnostics
    #[must_use]
    pub fn describe(&self) -> String {
        let mut out = format!("<{}", self.tag_name);
        if let Some(id) = self.attribute("id") {
            out.push_str(&format!(" id={id:?}"));
        }
        out.push('>');
        if !self.text_content.is_empty() {
            out.push_str(&format!(" {:?}", self.text_content));
        }
        if !self.visible {
            out.push_str(" (hidden)");
        }
        out
    }
}

/// Abstract driver for one browsing context.
///
/// All methods take `&self`; implementations use interior mutability so a
/// driver can be shared by the dispatcher, the assertion engine and the
/// popup capture within one test case.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate to URL and wait for the load to finish
    async fn goto(&self, url: &str) -> ProbeResult<()>;

    /// Current location of the context
    async fn current_url(&self) -> ProbeResult<String>;

    /// Resolve a selector to all matching elements in document order
    async fn query_all(&self, selector: &Selector) -> ProbeResult<Vec<ElementHandle>>;

    /// Click the element
    async fn click(&self, element: &ElementHandle) -> ProbeResult<()>;

    /// Replace the value of a text field
    async fn fill(&self, element: &ElementHandle, text: &str) -> ProbeResult<()>;

    /// Select the option with the given visible label
    async fn select_option(&self, element: &ElementHandle, label: &str) -> ProbeResult<()>;

    /// Start listening for secondary contexts opened by this one.
    ///
    /// Only contexts opened after this call returns are reported.
    async fn arm_popup_listener(&self) -> ProbeResult<Box<dyn PopupListener>>;

    /// Release the context
    async fn close(&self) -> ProbeResult<()>;
}

/// Listener for secondary browsing contexts, armed before a trigger fires
#[async_trait]
pub trait PopupListener: Send + Sync {
    /// Next context opened since arming, without blocking
    async fn try_next(&self) -> ProbeResult<Option<Box<dyn PageDriver>>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_handle_creation() {
        let elem = ElementHandle::new("btn-1", "button").with_text("Add to cart");
        assert_eq!(elem.id, "btn-1");
        assert_eq!(elem.tag_name, "button");
        assert_eq!(elem.text_content, "Add to cart");
        assert!(elem.is_visible());
    }

    #[test]
    fn test_same_state_ignores_identity() {
        let a = ElementHandle::new("1:0", "button").with_attribute("id", "add-to-cart-a");
        let b = ElementHandle::new("2:0", "button").with_attribute("id", "add-to-cart-a");
        let c = ElementHandle::new("2:0", "button").with_attribute("id", "add-to-cart-b");
        assert!(a.same_state(&b));
        assert!(!a.same_state(&c));
        assert!(!a.same_state(&b.clone().hidden()));
    }

    #[test]
    fn test_describe() {
        let elem = ElementHandle::new("x", "span")
            .with_attribute("id", "badge")
            .with_text("3")
            .hidden();
        assert_eq!(elem.describe(), "<span id=\"badge\"> \"3\" (hidden)");
    }
}
