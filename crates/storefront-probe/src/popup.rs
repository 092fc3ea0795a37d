//! Popup capture.
//!
//! Correlates an action with the secondary browsing context it opens. The
//! listener is armed before the trigger runs, so a popup that opens faster
//! than the trigger returns is still seen. The popup is closed on every
//! exit path, including failed waits.

use crate::driver::{PageDriver, PopupListener};
use crate::result::{ProbeError, ProbeResult};
use crate::url::UrlPattern;
use crate::wait::{Probe, WaitOptions, Waiter};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// A popup observed through to its settled location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopupRecord {
    /// Label of the action that opened it
    pub trigger: String,
    /// Settled location
    pub url: String,
    /// Time from trigger to settled location
    pub elapsed: Duration,
}

enum Destination<'a> {
    Stable,
    Matching(&'a UrlPattern),
}

/// Run `trigger` and capture the popup it opens.
///
/// The popup's URL is reported once it is non-blank and unchanged over two
/// consecutive polls.
///
/// # Errors
///
/// `Timeout` if no popup opens or its location never settles; any error the
/// trigger returns.
pub async fn capture_popup<F, Fut, T>(
    driver: &dyn PageDriver,
    options: &WaitOptions,
    label: &str,
    trigger: F,
) -> ProbeResult<PopupRecord>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = ProbeResult<T>>,
{
    capture(driver, options, label, trigger, Destination::Stable).await
}

/// Run `trigger` and wait for the popup it opens to reach `pattern`.
///
/// Redirects are followed: only the location at the end of the wait counts.
///
/// # Errors
///
/// `Timeout` if no popup opens, `VerificationFailure` with the last
/// observed location if it never matches.
pub async fn expect_popup_url<F, Fut, T>(
    driver: &dyn PageDriver,
    options: &WaitOptions,
    label: &str,
    pattern: &UrlPattern,
    trigger: F,
) -> ProbeResult<PopupRecord>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = ProbeResult<T>>,
{
    capture(driver, options, label, trigger, Destination::Matching(pattern)).await
}

async fn capture<F, Fut, T>(
    driver: &dyn PageDriver,
    options: &WaitOptions,
    label: &str,
    trigger: F,
    destination: Destination<'_>,
) -> ProbeResult<PopupRecord>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = ProbeResult<T>>,
{
    let waiter = Waiter::new(*options);
    let listener = driver.arm_popup_listener().await?;
    let start = Instant::now();

    let listener = listener.as_ref();
    let opened = match trigger().await {
        Ok(_) => {
            waiter
                .until(label, "a popup to open", move || async move {
                    Ok(match listener.try_next().await? {
                        Some(popup) => Probe::Ready(popup),
                        None => Probe::Pending("no popup yet".to_string()),
                    })
                })
                .await
        }
        Err(e) => Err(e),
    };
    let popup = match opened {
        Ok(opened) => opened.value,
        Err(e) => {
            close_delivered(listener, label).await;
            return Err(e);
        }
    };
    tracing::debug!(trigger = label, "popup opened");

    let settled = settle(&waiter, popup.as_ref(), label, &destination).await;
    close(popup.as_ref(), label).await;
    close_delivered(listener, label).await;
    let url = settled?;
    tracing::info!(trigger = label, url = %url, "popup settled");
    Ok(PopupRecord {
        trigger: label.to_string(),
        url,
        elapsed: start.elapsed(),
    })
}

async fn close(popup: &dyn PageDriver, label: &str) {
    if let Err(e) = popup.close().await {
        tracing::warn!(trigger = label, error = %e, "failed to close popup");
    }
}

/// Close every popup the listener has already delivered
async fn close_delivered(listener: &dyn PopupListener, label: &str) {
    loop {
        match listener.try_next().await {
            Ok(Some(stray)) => close(stray.as_ref(), label).await,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(trigger = label, error = %e, "could not drain popup listener");
                break;
            }
        }
    }
}

async fn settle(
    waiter: &Waiter,
    popup: &dyn PageDriver,
    label: &str,
    destination: &Destination<'_>,
) -> ProbeResult<String> {
    let target = format!("popup of {label}");
    match destination {
        Destination::Stable => waiter
            .until_stable(&target, "a settled location", move || async move {
                let url = popup.current_url().await?;
                Ok(if is_blank(&url) {
                    Probe::Pending(format!("blank location {url:?}"))
                } else {
                    Probe::Ready(url)
                })
            })
            .await
            .map(|r| r.value),
        Destination::Matching(pattern) => waiter
            .until(&target, &pattern.to_string(), move || async move {
                let url = popup.current_url().await?;
                Ok(if pattern.matches(&url) {
                    Probe::Ready(url)
                } else {
                    Probe::Pending(url)
                })
            })
            .await
            .map(|r| r.value)
            .map_err(|e| match e {
                ProbeError::Timeout(diag) => ProbeError::VerificationFailure(diag),
                other => other,
            }),
    }
}

fn is_blank(url: &str) -> bool {
    url.is_empty() || url == "about:blank"
}
