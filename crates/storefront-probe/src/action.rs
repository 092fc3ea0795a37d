//! Action dispatcher.
//!
//! Performs one user-intent action on a freshly resolved element and then
//! waits for the side effect it declared. Nothing is assumed idempotent:
//! every dispatch resolves its locator again, and the pre-action snapshot is
//! only used to recognise that the page moved on.

use crate::driver::{ElementHandle, PageDriver};
use crate::locator::Locator;
use crate::result::ProbeResult;
use crate::url::UrlPattern;
use crate::wait::{Probe, WaitOptions, Waiter};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Side effect an action waits for before it is considered done
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settle {
    /// Return as soon as the action was delivered
    None,
    /// The location differs from the one before the action
    Navigation,
    /// The location matches a pattern
    UrlIs(UrlPattern),
    /// The action's target is gone or no longer looks the same
    Mutation,
    /// The target's value equals the given text
    Value(String),
}

impl fmt::Display for Settle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "no settle"),
            Self::Navigation => write!(f, "navigation away"),
            Self::UrlIs(pattern) => write!(f, "{pattern}"),
            Self::Mutation => write!(f, "target to change or detach"),
            Self::Value(v) => write!(f, "value {v:?}"),
        }
    }
}

#[derive(Debug, Clone)]
enum Act {
    Click,
    Fill(String),
    Select(String),
}

impl Act {
    const fn name(&self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::Fill(_) => "fill",
            Self::Select(_) => "select",
        }
    }
}

/// What a dispatched action touched and how long it took to settle
#[derive(Debug, Clone)]
pub struct ActionReport {
    /// `click`, `fill` or `select`
    pub action: &'static str,
    /// Locator the action was aimed at
    pub target: String,
    /// The element as it was when the action fired
    pub element: ElementHandle,
    /// Time from first resolution to settled side effect
    pub elapsed: Duration,
}

/// Dispatches actions against one page
#[derive(Clone, Copy)]
pub struct Dispatcher<'a> {
    driver: &'a dyn PageDriver,
    options: WaitOptions,
}

impl fmt::Debug for Dispatcher<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<'a> Dispatcher<'a> {
    /// Create a dispatcher for `driver`
    #[must_use]
    pub const fn new(driver: &'a dyn PageDriver, options: WaitOptions) -> Self {
        Self { driver, options }
    }

    /// The page actions are dispatched to
    #[must_use]
    pub const fn driver(&self) -> &'a dyn PageDriver {
        self.driver
    }

    /// Wait options used for resolution and settling
    #[must_use]
    pub const fn options(&self) -> &WaitOptions {
        &self.options
    }

    /// Replace the value of a text field and wait for it to read back
    pub async fn fill(&self, locator: &Locator, text: &str) -> ProbeResult<ActionReport> {
        self.dispatch(
            locator,
            Act::Fill(text.to_string()),
            Settle::Value(text.to_string()),
        )
        .await
    }

    /// Click and wait for `settle`
    pub async fn click(&self, locator: &Locator, settle: Settle) -> ProbeResult<ActionReport> {
        self.dispatch(locator, Act::Click, settle).await
    }

    /// Pick the option labelled `label` and wait for the control to show it
    pub async fn select_option(&self, locator: &Locator, label: &str) -> ProbeResult<ActionReport> {
        self.dispatch(
            locator,
            Act::Select(label.to_string()),
            Settle::Value(label.to_string()),
        )
        .await
    }

    async fn dispatch(
        &self,
        locator: &Locator,
        act: Act,
        settle: Settle,
    ) -> ProbeResult<ActionReport> {
        let start = Instant::now();
        let waiter = Waiter::new(self.options);
        let target = locator.to_string();
        let before_url = match settle {
            Settle::Navigation => Some(self.driver.current_url().await?),
            _ => None,
        };

        let act_ref = &act;
        let fired = waiter
            .until(&target, "a single visible element to act on", move || {
                self.try_act(locator, act_ref)
            })
            .await?;
        let element = fired.value;
        tracing::info!(action = act.name(), locator = %target, element = %element.describe(), "action delivered");

        let expected = settle.to_string();
        let driver = self.driver;
        let snapshot = &element;
        match &settle {
            Settle::None => {}
            Settle::Navigation => {
                let before = before_url.as_deref().unwrap_or_default();
                waiter
                    .until(&target, &expected, move || async move {
                        let now = driver.current_url().await?;
                        Ok(Probe::check(now != before, (), || format!("still at {now}")))
                    })
                    .await?;
            }
            Settle::UrlIs(pattern) => {
                waiter
                    .until(&target, &expected, move || async move {
                        let now = driver.current_url().await?;
                        Ok(Probe::check(pattern.matches(&now), (), || format!("at {now}")))
                    })
                    .await?;
            }
            Settle::Mutation => {
                waiter
                    .until(&target, &expected, move || async move {
                        let current = locator.resolve(driver).await?;
                        Ok(match current.first() {
                            None => Probe::Ready(()),
                            Some(now) if !now.same_state(snapshot) => Probe::Ready(()),
                            Some(now) => Probe::Pending(format!("unchanged {}", now.describe())),
                        })
                    })
                    .await?;
            }
            Settle::Value(value) => {
                let value = value.as_str();
                waiter
                    .until(&target, &expected, move || async move {
                        let current = locator.resolve(driver).await?;
                        let observed = current.first().and_then(|e| e.value.clone());
                        Ok(Probe::check(
                            observed.as_deref() == Some(value),
                            (),
                            || format!("value {observed:?}"),
                        ))
                    })
                    .await?;
            }
        }

        let elapsed = start.elapsed();
        tracing::debug!(action = act.name(), locator = %target, ?elapsed, "action settled");
        Ok(ActionReport {
            action: act.name(),
            target,
            element,
            elapsed,
        })
    }

    /// One attempt: resolve, check strictness and visibility, act.
    async fn try_act(&self, locator: &Locator, act: &Act) -> ProbeResult<Probe<ElementHandle>> {
        let mut matches = locator.resolve(self.driver).await?;
        if matches.len() > 1 && !locator.is_narrowed() {
            return Err(locator.strict_violation(matches.len()));
        }
        if matches.is_empty() {
            return Ok(Probe::Pending("no element matched".to_string()));
        }
        let element = matches.swap_remove(0);
        if !element.is_visible() {
            return Ok(Probe::Pending(element.describe()));
        }
        match act {
            Act::Click => self.driver.click(&element).await?,
            Act::Fill(text) => self.driver.fill(&element, text).await?,
            Act::Select(label) => self.driver.select_option(&element, label).await?,
        }
        Ok(Probe::Ready(element))
    }
}
