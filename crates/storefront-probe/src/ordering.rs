//! Ordering validator.
//!
//! Reads a rendered listing in document order and compares it position by
//! position against a caller-supplied permutation. The expected order is
//! always fixture data; nothing here sorts anything.

use crate::action::Dispatcher;
use crate::driver::PageDriver;
use crate::locator::Locator;
use crate::result::{Diagnostic, ProbeError, ProbeResult};
use crate::wait::{Probe, Waiter};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Sort criteria offered by the listing's dropdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortMode {
    /// Name (A to Z)
    NameAsc,
    /// Name (Z to A)
    NameDesc,
    /// Price (low to high)
    PriceAsc,
    /// Price (high to low)
    PriceDesc,
}

impl SortMode {
    /// Every mode, in dropdown order
    pub const ALL: [Self; 4] = [Self::NameAsc, Self::NameDesc, Self::PriceAsc, Self::PriceDesc];

    /// Visible option label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::NameAsc => "Name (A to Z)",
            Self::NameDesc => "Name (Z to A)",
            Self::PriceAsc => "Price (low to high)",
            Self::PriceDesc => "Price (high to low)",
        }
    }

    /// Option value attribute
    #[must_use]
    pub const fn value(self) -> &'static str {
        match self {
            Self::NameAsc => "az",
            Self::NameDesc => "za",
            Self::PriceAsc => "lohi",
            Self::PriceDesc => "hilo",
        }
    }

    /// Mode whose label is `label`
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.label() == label)
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// First position where a listing departs from the expected sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    /// Zero-based position
    pub index: usize,
    /// Expected label, `None` past the end of the expectation
    pub expected: Option<String>,
    /// Observed label, `None` past the end of the listing
    pub observed: Option<String>,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: &Option<String>| v.as_ref().map_or_else(|| "<end>".to_string(), |s| format!("{s:?}"));
        write!(
            f,
            "position {}: expected {}, observed {}",
            self.index,
            show(&self.expected),
            show(&self.observed)
        )
    }
}

/// Labels of a listing in rendered order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedListing {
    /// Labels, first rendered first
    pub labels: Vec<String>,
}

impl OrderedListing {
    /// Wrap rendered labels
    #[must_use]
    pub const fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the listing is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Compare positionally; `None` when identical
    #[must_use]
    pub fn first_mismatch<S: AsRef<str>>(&self, expected: &[S]) -> Option<Mismatch> {
        let len = self.labels.len().max(expected.len());
        (0..len).find_map(|index| {
            let observed = self.labels.get(index).map(String::as_str);
            let wanted = expected.get(index).map(AsRef::as_ref);
            (observed != wanted).then(|| Mismatch {
                index,
                expected: wanted.map(str::to_string),
                observed: observed.map(str::to_string),
            })
        })
    }
}

/// Read the current labels of `listing`, without waiting
pub async fn read_listing(driver: &dyn PageDriver, listing: &Locator) -> ProbeResult<OrderedListing> {
    Ok(OrderedListing::new(listing.all_text_contents(driver).await?))
}

/// Select `mode` on `sort_control`, then wait for `listing` to show `expected`.
///
/// # Errors
///
/// `VerificationFailure` naming the first mismatching position when the
/// listing never reaches the expected order; dispatcher errors otherwise.
pub async fn assert_order<S: AsRef<str> + Sync>(
    dispatcher: &Dispatcher<'_>,
    sort_control: &Locator,
    listing: &Locator,
    expected: &[S],
    mode: SortMode,
) -> ProbeResult<OrderedListing> {
    dispatcher.select_option(sort_control, mode.label()).await?;
    let driver = dispatcher.driver();
    let result = Waiter::new(*dispatcher.options())
        .until(
            &listing.to_string(),
            &format!("{} entries in {mode} order", expected.len()),
            move || async move {
                let current = read_listing(driver, listing).await?;
                Ok(match current.first_mismatch(expected) {
                    None => Probe::Ready(current),
                    Some(mismatch) => Probe::Pending(format!("{mismatch} in {:?}", current.labels)),
                })
            },
        )
        .await;
    match result {
        Ok(done) => {
            tracing::info!(mode = %mode, entries = done.value.len(), "listing order verified");
            Ok(done.value)
        }
        Err(ProbeError::Timeout(diag)) => Err(ProbeError::VerificationFailure(diag)),
        Err(e) => Err(e),
    }
}

/// Select `mode` again and require `listing` to keep `expected` for `window`.
///
/// Re-selecting the active mode settles at once, so the listing is polled
/// until the window has elapsed; the first departure fails the check.
///
/// # Errors
///
/// `VerificationFailure` naming the first mismatching position seen inside
/// the window; dispatcher errors otherwise.
pub async fn assert_order_holds<S: AsRef<str> + Sync>(
    dispatcher: &Dispatcher<'_>,
    sort_control: &Locator,
    listing: &Locator,
    expected: &[S],
    mode: SortMode,
    window: Duration,
) -> ProbeResult<OrderedListing> {
    dispatcher.select_option(sort_control, mode.label()).await?;
    let driver = dispatcher.driver();
    let options = *dispatcher.options();
    let window_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);
    let hold = options.with_timeout(window_ms.saturating_add(options.poll_interval_ms.max(1)));
    let target = &listing.to_string();
    let wanted = &format!("{} entries still in {mode} order", expected.len());
    let start = Instant::now();
    let result = Waiter::new(hold)
        .until(target, wanted, move || async move {
            let current = read_listing(driver, listing).await?;
            if let Some(mismatch) = current.first_mismatch(expected) {
                return Err(ProbeError::verification(Diagnostic::new(
                    target.as_str(),
                    wanted.as_str(),
                    format!("{mismatch} in {:?}", current.labels),
                    start.elapsed(),
                )));
            }
            let held = start.elapsed() >= window;
            Ok(Probe::check(held, current, || "order held so far".to_string()))
        })
        .await;
    match result {
        Ok(done) => {
            tracing::debug!(mode = %mode, held_ms = window_ms, "listing order held");
            Ok(done.value)
        }
        Err(ProbeError::Timeout(diag)) => Err(ProbeError::VerificationFailure(diag)),
        Err(e) => Err(e),
    }
}
