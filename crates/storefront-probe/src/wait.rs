//! Wait/Poll engine.
//!
//! The single suspension point of the harness. Everything that depends on
//! asynchronous UI settling (an element appearing, a badge changing, a popup
//! reaching its destination) is expressed as a probe that the [`Waiter`]
//! re-evaluates on a fixed interval until it is ready or the deadline passes.
//!
//! Every wait is bounded twice: by its timeout and by an attempt cap derived
//! from it, so a probe that returns instantly cannot spin forever either.
//! Time is read from the tokio clock, which lets tests run with paused time.

use crate::result::{Diagnostic, ProbeError, ProbeResult};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Default timeout for wait operations (5 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 5_000;

/// Default polling interval (100ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Upper bound on probe evaluations within one wait
    #[must_use]
    pub const fn max_attempts(&self) -> usize {
        let interval = if self.poll_interval_ms == 0 {
            1
        } else {
            self.poll_interval_ms
        };
        (self.timeout_ms.div_ceil(interval) as usize).saturating_add(1)
    }
}

/// Outcome of one probe evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe<T> {
    /// Condition holds; carries the observed value
    Ready(T),
    /// Not yet; carries a description of what was observed
    Pending(String),
}

/// Result of a successful wait
#[derive(Debug, Clone)]
pub struct WaitResult<T> {
    /// Value produced by the final probe
    pub value: T,
    /// Time spent waiting
    pub elapsed: Duration,
    /// Number of probe evaluations
    pub attempts: usize,
}

/// Polls probes until they hold or their deadline passes
#[derive(Debug, Clone, Copy, Default)]
pub struct Waiter {
    options: WaitOptions,
}

impl Waiter {
    /// Create a waiter with the given options
    #[must_use]
    pub const fn new(options: WaitOptions) -> Self {
        Self { options }
    }

    /// Get the options
    #[must_use]
    pub const fn options(&self) -> &WaitOptions {
        &self.options
    }

    /// Re-evaluate `probe` until it is ready.
    ///
    /// `target` and `expected` describe the wait for the [`Diagnostic`] of the
    /// `Timeout` raised when the deadline passes. Transient probe errors count
    /// as "not yet"; any other error aborts the wait.
    pub async fn until<T, F, Fut>(
        &self,
        target: &str,
        expected: &str,
        mut probe: F,
    ) -> ProbeResult<WaitResult<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ProbeResult<Probe<T>>>,
    {
        let start = Instant::now();
        let deadline = start + self.options.timeout();
        let max_attempts = self.options.max_attempts();
        let mut attempts = 0;

        loop {
            attempts += 1;
            let observed = match probe().await {
                Ok(Probe::Ready(value)) => {
                    tracing::debug!(subject = target, attempts, "wait satisfied");
                    return Ok(WaitResult {
                        value,
                        elapsed: start.elapsed(),
                        attempts,
                    });
                }
                Ok(Probe::Pending(observed)) => {
                    tracing::trace!(subject = target, %observed, attempts, "not yet");
                    observed
                }
                Err(e) if e.is_transient() => {
                    tracing::warn!(subject = target, error = %e, "transient probe error, retrying");
                    format!("error: {e}")
                }
                Err(e) => return Err(e),
            };

            let now = Instant::now();
            if now >= deadline || attempts >= max_attempts {
                tracing::debug!(subject = target, attempts, "wait timed out");
                return Err(ProbeError::timeout(Diagnostic::new(
                    target,
                    expected,
                    observed,
                    start.elapsed(),
                )));
            }
            tokio::time::sleep(self.options.poll_interval().min(deadline - now)).await;
        }
    }

    /// Re-evaluate `probe` until it reports the same ready value twice in a row.
    pub async fn until_stable<T, F, Fut>(
        &self,
        target: &str,
        expected: &str,
        mut probe: F,
    ) -> ProbeResult<WaitResult<T>>
    where
        T: PartialEq + Debug + Clone,
        F: FnMut() -> Fut,
        Fut: Future<Output = ProbeResult<Probe<T>>>,
    {
        let previous: Mutex<Option<T>> = Mutex::new(None);
        let previous = &previous;
        self.until(target, expected, || {
            let next = probe();
            async move {
                match next.await {
                    Ok(Probe::Ready(value)) => {
                        let mut slot = previous
                            .lock()
                            .map_err(|_| ProbeError::page("stability tracker poisoned"))?;
                        if slot.as_ref() == Some(&value) {
                            Ok(Probe::Ready(value))
                        } else {
                            let observed = format!("{value:?} (not yet stable)");
                            *slot = Some(value);
                            Ok(Probe::Pending(observed))
                        }
                    }
                    other => other,
                }
            }
        })
        .await
    }
}

/// Re-evaluate `probe` until it is ready, with the default expectation text.
///
/// Fails with `Timeout` carrying the last observed description.
pub async fn await_condition<T, F, Fut>(
    description: &str,
    options: &WaitOptions,
    probe: F,
) -> ProbeResult<WaitResult<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProbeResult<Probe<T>>>,
{
    Waiter::new(*options)
        .until(description, "condition to hold", probe)
        .await
}

/// Re-evaluate `probe` until the same value is observed on two consecutive polls.
pub async fn await_stable<T, F, Fut>(
    description: &str,
    options: &WaitOptions,
    probe: F,
) -> ProbeResult<WaitResult<T>>
where
    T: PartialEq + Debug + Clone,
    F: FnMut() -> Fut,
    Fut: Future<Output = ProbeResult<Probe<T>>>,
{
    Waiter::new(*options)
        .until_stable(description, "a stable value", probe)
        .await
}

impl<T> Probe<T> {
    /// `Ready(value)` when `holds`, otherwise `Pending(observed)`
    pub fn check(holds: bool, value: T, observed: impl FnOnce() -> String) -> Self {
        if holds {
            Self::Ready(value)
        } else {
            Self::Pending(observed())
        }
    }

    /// Whether the probe is ready
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}
