//! Assertion engine.
//!
//! Every check except [`assert_equals`] polls before it judges: the observed
//! value is re-read until it matches or the wait runs out, and only then is
//! the mismatch reported. A mismatch is a `VerificationFailure` carrying the
//! last observation; a locator that never matched anything during the whole
//! wait is a `ResolutionFailure` instead.

use crate::driver::{ElementHandle, PageDriver};
use crate::locator::Locator;
use crate::result::{Diagnostic, ProbeError, ProbeResult};
use crate::url::UrlPattern;
use crate::wait::{Probe, WaitOptions, Waiter};
use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

const NO_MATCH: &str = "no element matched";

/// Compare two values immediately.
///
/// # Errors
///
/// Returns `VerificationFailure` naming `subject` when the values differ.
pub fn assert_equals<T: PartialEq + Debug>(subject: &str, observed: &T, expected: &T) -> ProbeResult<()> {
    if observed == expected {
        Ok(())
    } else {
        Err(ProbeError::verification(Diagnostic::new(
            subject,
            format!("{expected:?}"),
            format!("{observed:?}"),
            Duration::ZERO,
        )))
    }
}

/// Waiting assertions against one page
#[derive(Clone, Copy)]
pub struct Expect<'a> {
    driver: &'a dyn PageDriver,
    options: WaitOptions,
}

impl fmt::Debug for Expect<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expect")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<'a> Expect<'a> {
    /// Create assertions for `driver`
    #[must_use]
    pub const fn new(driver: &'a dyn PageDriver, options: WaitOptions) -> Self {
        Self { driver, options }
    }

    /// Override the timeout for assertions made through this value
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.options = self.options.with_timeout(timeout_ms);
        self
    }

    /// Override the poll interval
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.options = self.options.with_poll_interval(poll_interval_ms);
        self
    }

    /// Current wait options
    #[must_use]
    pub const fn options(&self) -> &WaitOptions {
        &self.options
    }

    /// The element is rendered and not hidden.
    ///
    /// # Errors
    ///
    /// `ResolutionFailure` if nothing matched or the locator is ambiguous,
    /// `VerificationFailure` if the element stayed hidden.
    pub async fn assert_visible(&self, locator: &Locator) -> ProbeResult<ElementHandle> {
        self.single(locator, "visible".to_string(), |el| {
            if el.is_visible() {
                Ok(())
            } else {
                Err(el.describe())
            }
        })
        .await
    }

    /// No element matches, or every match is hidden.
    ///
    /// # Errors
    ///
    /// `VerificationFailure` if a visible match remained.
    pub async fn assert_not_visible(&self, locator: &Locator) -> ProbeResult<()> {
        let driver = self.driver;
        let result = Waiter::new(self.options)
            .until(&locator.to_string(), "not visible", move || async move {
                let matches = locator.resolve(driver).await?;
                Ok(match matches.iter().find(|e| e.is_visible()) {
                    None => Probe::Ready(()),
                    Some(shown) => Probe::Pending(format!("visible {}", shown.describe())),
                })
            })
            .await;
        result.map(|_| ()).map_err(into_verification)
    }

    /// No element matches at all.
    ///
    /// # Errors
    ///
    /// `VerificationFailure` if something still matched.
    pub async fn assert_absent(&self, locator: &Locator) -> ProbeResult<()> {
        self.assert_count(locator, 0).await
    }

    /// The element's normalized text equals `text`.
    ///
    /// # Errors
    ///
    /// `ResolutionFailure` or `VerificationFailure` as for [`Self::assert_visible`].
    pub async fn assert_text_equals(&self, locator: &Locator, text: &str) -> ProbeResult<ElementHandle> {
        self.single(locator, format!("text {text:?}"), |el| {
            if el.text_content == text {
                Ok(())
            } else {
                Err(format!("text {:?}", el.text_content))
            }
        })
        .await
    }

    /// The element's normalized text contains `text`.
    ///
    /// # Errors
    ///
    /// `ResolutionFailure` or `VerificationFailure` as for [`Self::assert_visible`].
    pub async fn assert_contains_text(&self, locator: &Locator, text: &str) -> ProbeResult<ElementHandle> {
        self.single(locator, format!("text containing {text:?}"), |el| {
            if el.text_content.contains(text) {
                Ok(())
            } else {
                Err(format!("text {:?}", el.text_content))
            }
        })
        .await
    }

    /// Exactly `expected` elements match.
    ///
    /// # Errors
    ///
    /// `VerificationFailure` with the last observed count.
    pub async fn assert_count(&self, locator: &Locator, expected: usize) -> ProbeResult<()> {
        let driver = self.driver;
        let result = Waiter::new(self.options)
            .until(
                &locator.to_string(),
                &format!("{expected} elements"),
                move || async move {
                    let n = locator.count(driver).await?;
                    Ok(Probe::check(n == expected, (), || format!("{n} elements")))
                },
            )
            .await;
        result.map(|_| ()).map_err(into_verification)
    }

    /// At least one element matches and each carries a non-empty `attribute`.
    ///
    /// Returns the attribute values in document order.
    ///
    /// # Errors
    ///
    /// `ResolutionFailure` if nothing ever matched, `VerificationFailure` if
    /// some match kept an empty or missing attribute.
    pub async fn assert_attribute_non_empty(
        &self,
        locator: &Locator,
        attribute: &str,
    ) -> ProbeResult<Vec<String>> {
        let driver = self.driver;
        let matched = AtomicBool::new(false);
        let matched_ref = &matched;
        let result = Waiter::new(self.options)
            .until(
                &locator.to_string(),
                &format!("non-empty {attribute} on every match"),
                move || async move {
                    let matches = locator.resolve(driver).await?;
                    if matches.is_empty() {
                        return Ok(Probe::Pending(NO_MATCH.to_string()));
                    }
                    matched_ref.store(true, Ordering::Relaxed);
                    let values: Vec<String> = matches
                        .iter()
                        .map(|e| e.attribute(attribute).unwrap_or_default().trim().to_string())
                        .collect();
                    Ok(match values.iter().position(String::is_empty) {
                        None => Probe::Ready(values),
                        Some(i) => Probe::Pending(format!(
                            "match {i} {} has empty {attribute}",
                            matches[i].describe()
                        )),
                    })
                },
            )
            .await;
        result
            .map(|r| r.value)
            .map_err(|e| verdict(locator, e, matched.load(Ordering::Relaxed)))
    }

    /// The page location matches `pattern`.
    ///
    /// # Errors
    ///
    /// `VerificationFailure` with the last observed location.
    pub async fn assert_url(&self, pattern: &UrlPattern) -> ProbeResult<String> {
        let driver = self.driver;
        let result = Waiter::new(self.options)
            .until("page url", &pattern.to_string(), move || async move {
                let url = driver.current_url().await?;
                Ok(if pattern.matches(&url) {
                    Probe::Ready(url)
                } else {
                    Probe::Pending(url)
                })
            })
            .await;
        result.map(|r| r.value).map_err(into_verification)
    }

    /// Wait for a single element satisfying `check`.
    async fn single<F>(&self, locator: &Locator, expected: String, check: F) -> ProbeResult<ElementHandle>
    where
        F: Fn(&ElementHandle) -> Result<(), String> + Sync,
    {
        let driver = self.driver;
        let matched = AtomicBool::new(false);
        let matched_ref = &matched;
        let check = &check;
        let result = Waiter::new(self.options)
            .until(&locator.to_string(), &expected, move || async move {
                let mut matches = locator.resolve(driver).await?;
                if matches.len() > 1 && !locator.is_narrowed() {
                    return Err(locator.strict_violation(matches.len()));
                }
                if matches.is_empty() {
                    return Ok(Probe::Pending(NO_MATCH.to_string()));
                }
                matched_ref.store(true, Ordering::Relaxed);
                let element = matches.swap_remove(0);
                Ok(match check(&element) {
                    Ok(()) => Probe::Ready(element),
                    Err(observed) => Probe::Pending(observed),
                })
            })
            .await;
        match result {
            Ok(found) => {
                tracing::debug!(locator = %locator, expected = %expected, elapsed = ?found.elapsed, "assertion held");
                Ok(found.value)
            }
            Err(e) => Err(verdict(locator, e, matched.load(Ordering::Relaxed))),
        }
    }
}

/// Timeout on a locator that never matched becomes a resolution failure
fn verdict(locator: &Locator, error: ProbeError, matched: bool) -> ProbeError {
    match error {
        ProbeError::Timeout(diag) if !matched => {
            tracing::debug!(locator = %locator, "locator never matched");
            ProbeError::ResolutionFailure(diag)
        }
        other => into_verification(other),
    }
}

/// An expired assertion wait is a verification failure, not a timeout
fn into_verification(error: ProbeError) -> ProbeError {
    match error {
        ProbeError::Timeout(diag) => ProbeError::VerificationFailure(diag),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockApp, MockElement, MockPage};
    use tokio::time::Instant;

    struct BadgeApp {
        clicks: u32,
    }

    impl MockApp for BadgeApp {
        fn url(&self) -> String {
            format!("https://shop.test/?clicks={}", self.clicks)
        }

        fn render(&self) -> MockElement {
            let mut body = MockElement::new("body")
                .child(MockElement::new("button").id("add").text("Add to cart"))
                .child(MockElement::new("img").attr("src", "/a.jpg"))
                .child(MockElement::new("img").attr("src", if self.clicks > 0 { "/b.jpg" } else { "" }))
                .child(MockElement::new("p").class("note").text("first note"))
                .child(MockElement::new("p").class("note").text("second note"));
            if self.clicks > 0 {
                body = body.child(
                    MockElement::new("span")
                        .class("shopping_cart_badge")
                        .text(self.clicks.to_string()),
                );
            }
            body.child(MockElement::new("div").class("menu").hidden().text("Menu"))
        }

        fn click(&mut self, _element: &MockElement) -> Option<crate::mock::PopupSpec> {
            self.clicks += 1;
            None
        }
    }

    async fn page_after_click() -> MockPage {
        let page = MockPage::new(BadgeApp { clicks: 0 }).with_latency(Duration::from_millis(400));
        let add = Locator::new("#add").resolve_one(&page).await.unwrap();
        page.click(&add).await.unwrap();
        page
    }

    mod immediate_tests {
        use super::*;

        #[test]
        fn test_assert_equals() {
            assert!(assert_equals("count", &3, &3).is_ok());
            let err = assert_equals("name", &"Onesie", &"Backpack").unwrap_err();
            let diag = err.diagnostic().unwrap();
            assert_eq!(diag.expected, "\"Backpack\"");
            assert_eq!(diag.observed, "\"Onesie\"");
            assert!(matches!(err, ProbeError::VerificationFailure(_)));
        }
    }

    mod waiting_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_text_equals_waits_for_badge() {
            let page = page_after_click().await;
            let expect = Expect::new(&page, WaitOptions::new());
            let start = Instant::now();
            let badge = expect
                .assert_text_equals(&Locator::new(".shopping_cart_badge"), "1")
                .await
                .unwrap();
            assert_eq!(badge.text_content, "1");
            assert!(start.elapsed() >= Duration::from_millis(400));
        }

        #[tokio::test(start_paused = true)]
        async fn test_wrong_text_is_verification_failure() {
            let page = page_after_click().await;
            let expect = Expect::new(&page, WaitOptions::new()).with_timeout(1_000);
            let err = expect
                .assert_text_equals(&Locator::new(".shopping_cart_badge"), "3")
                .await
                .unwrap_err();
            let diag = err.diagnostic().unwrap();
            assert!(matches!(err, ProbeError::VerificationFailure(_)));
            assert_eq!(diag.observed, "text \"1\"");
            assert_eq!(diag.elapsed_ms, 1_000);
        }

        #[tokio::test(start_paused = true)]
        async fn test_never_matched_is_resolution_failure() {
            let page = page_after_click().await;
            let expect = Expect::new(&page, WaitOptions::new()).with_timeout(500);
            let err = expect
                .assert_visible(&Locator::new(".inventory_item"))
                .await
                .unwrap_err();
            assert!(matches!(err, ProbeError::ResolutionFailure(_)));
            let diag = err.diagnostic().unwrap();
            assert_eq!(diag.target, "css=.inventory_item");
            assert_eq!(diag.observed, NO_MATCH);
            assert_eq!(diag.elapsed_ms, 500);
        }

        #[tokio::test(start_paused = true)]
        async fn test_ambiguous_locator_is_rejected() {
            let page = page_after_click().await;
            let expect = Expect::new(&page, WaitOptions::new());
            let err = expect
                .assert_contains_text(&Locator::new(".note"), "note")
                .await
                .unwrap_err();
            assert!(matches!(err, ProbeError::ResolutionFailure(_)));
            expect
                .assert_contains_text(&Locator::new(".note").nth(1), "second")
                .await
                .unwrap();
        }

        #[tokio::test(start_paused = true)]
        async fn test_not_visible() {
            let page = page_after_click().await;
            let expect = Expect::new(&page, WaitOptions::new()).with_timeout(300);
            expect.assert_not_visible(&Locator::new(".menu")).await.unwrap();
            expect.assert_not_visible(&Locator::new(".missing")).await.unwrap();
            let err = expect.assert_not_visible(&Locator::new("#add")).await.unwrap_err();
            assert!(matches!(err, ProbeError::VerificationFailure(_)));
        }

        #[tokio::test(start_paused = true)]
        async fn test_count_and_absent() {
            let page = page_after_click().await;
            let expect = Expect::new(&page, WaitOptions::new()).with_timeout(200);
            expect.assert_count(&Locator::new("img"), 2).await.unwrap();
            expect.assert_absent(&Locator::new(".cart_item")).await.unwrap();
            let err = expect.assert_count(&Locator::new(".note"), 3).await.unwrap_err();
            assert_eq!(err.diagnostic().unwrap().observed, "2 elements");
        }

        #[tokio::test(start_paused = true)]
        async fn test_attribute_non_empty_waits() {
            let page = page_after_click().await;
            let expect = Expect::new(&page, WaitOptions::new());
            let srcs = expect
                .assert_attribute_non_empty(&Locator::new("img"), "src")
                .await
                .unwrap();
            assert_eq!(srcs, vec!["/a.jpg".to_string(), "/b.jpg".to_string()]);
        }

        #[tokio::test(start_paused = true)]
        async fn test_assert_url() {
            let page = page_after_click().await;
            let expect = Expect::new(&page, WaitOptions::new());
            let url = expect
                .assert_url(&UrlPattern::Contains("clicks=1".into()))
                .await
                .unwrap();
            assert_eq!(url, "https://shop.test/?clicks=1");
            let err = expect
                .with_timeout(100)
                .assert_url(&UrlPattern::exact("https://shop.test/cart.html"))
                .await
                .unwrap_err();
            assert_eq!(err.diagnostic().unwrap().target, "page url");
        }
    }
}
