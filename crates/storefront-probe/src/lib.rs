//! storefront-probe: UI verification harness for the Swag Labs storefront
//!
//! Drives a real browser (or an in-memory double) through the storefront's
//! user flows and checks what the UI shows: login validation, the product
//! listing and its four sort orders, cart badge and buttons, listing/detail
//! consistency, checkout validation and the footer's social popups.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                    STOREFRONT-PROBE Architecture                  │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌────────────┐   ┌─────────────┐                 │
//! │  │ Scenario  │──►│ Dispatcher │──►│ PageDriver  │──► Chromium     │
//! │  │ Suite     │   │ Expect     │   │ (trait)     │    (CDP)        │
//! │  │ Session   │   │ Cart/Order │   │             │──► MockPage     │
//! │  └───────────┘   │ Popup      │   └─────────────┘                 │
//! │                  └─────┬──────┘                                   │
//! │                        ▼                                          │
//! │                  ┌────────────┐                                   │
//! │                  │ Waiter     │  bounded poll, tokio clock        │
//! │                  └────────────┘                                   │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Locators are recipes, re-resolved on every action and every poll;
//! element handles are one-shot. Every wait is bounded by a timeout and an
//! attempt cap, and every failure carries a [`Diagnostic`].

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

mod action;
mod assertion;
mod browser;
#[allow(clippy::missing_errors_doc)]
mod cart;
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
mod config;
mod driver;
#[allow(clippy::missing_errors_doc, clippy::doc_markdown)]
mod locator;
mod ordering;
mod popup;
mod result;
mod session;
#[allow(clippy::missing_errors_doc)]
mod suite;
mod url;
mod wait;

/// Storefront page objects, catalog fixture and verbatim messages
pub mod storefront;

/// In-memory page driver for exercising the engine without a browser
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
pub mod mock;

pub use action::{ActionReport, Dispatcher, Settle};
pub use assertion::{assert_equals, Expect};
#[cfg(feature = "browser")]
pub use browser::{ChromiumDriver, ChromiumPopupListener};
pub use browser::BrowserConfig;
pub use cart::CartModel;
pub use config::{
    Credentials, ProbeConfig, BASE_URL_ENV, CHROME_BIN_ENV, DEFAULT_NAVIGATION_TIMEOUT_MS,
};
pub use driver::{ElementHandle, PageDriver, PopupListener};
pub use locator::{Locator, Nth, Selector};
pub use ordering::{assert_order, read_listing, Mismatch, OrderedListing, SortMode};
pub use popup::{capture_popup, expect_popup_url, PopupRecord};
pub use result::{Diagnostic, ProbeError, ProbeResult};
pub use session::Session;
pub use suite::{
    run_suite, scenarios, CaseOutcome, Group, Scenario, ScenarioFn, SuiteReport, SuiteRunner,
};
pub use url::UrlPattern;
pub use wait::{
    await_condition, await_stable, Probe, WaitOptions, WaitResult, Waiter,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::action::*;
    pub use super::assertion::*;
    pub use super::browser::*;
    pub use super::cart::*;
    pub use super::config::*;
    pub use super::driver::*;
    pub use super::locator::*;
    pub use super::ordering::*;
    pub use super::popup::*;
    pub use super::result::*;
    pub use super::session::*;
    pub use super::storefront::*;
    pub use super::suite::*;
    pub use super::url::*;
    pub use super::wait::*;
}
