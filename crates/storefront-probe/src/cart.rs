//! Cart state model.
//!
//! Tracks which items the scenario put in the cart and derives what the UI
//! must show for it: a badge with the item count (absent, not "0", when the
//! cart is empty) and one remove affordance per item.

use crate::action::{Dispatcher, Settle};
use crate::assertion::Expect;
use crate::locator::Locator;
use crate::result::{Diagnostic, ProbeError, ProbeResult};
use crate::storefront::{CartPage, CatalogItem, Header, InventoryPage, PageObject};
use tokio::time::Instant;

/// Items the scenario has added, in the order they were added
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartModel {
    items: Vec<String>,
}

impl CartModel {
    /// Empty cart
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Slugs in the cart
    #[must_use]
    pub fn items(&self) -> &[String] {
        &self.items
    }

    /// Number of items
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the cart is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether `slug` is in the cart
    #[must_use]
    pub fn contains(&self, slug: &str) -> bool {
        self.items.iter().any(|s| s == slug)
    }

    /// Badge text the header must show, `None` when it must be absent
    #[must_use]
    pub fn expected_badge(&self) -> Option<String> {
        (!self.items.is_empty()).then(|| self.items.len().to_string())
    }

    /// Record an add without touching the page
    pub fn record_add(&mut self, slug: &str) {
        if !self.contains(slug) {
            self.items.push(slug.to_string());
        }
    }

    /// Record a removal without touching the page
    pub fn record_remove(&mut self, slug: &str) {
        self.items.retain(|s| s != slug);
    }

    /// Add `item` from the listing.
    ///
    /// # Errors
    ///
    /// Fails if the remove affordance or the badge does not follow.
    pub async fn add(&mut self, dispatcher: &Dispatcher<'_>, item: &CatalogItem) -> ProbeResult<()> {
        self.add_with(dispatcher, item, &item.add_button(), &item.remove_button())
            .await
    }

    /// Add `item` through the given affordances (e.g. on the details page)
    ///
    /// # Errors
    ///
    /// Fails if `remove` or the badge does not follow.
    pub async fn add_with(
        &mut self,
        dispatcher: &Dispatcher<'_>,
        item: &CatalogItem,
        add: &Locator,
        remove: &Locator,
    ) -> ProbeResult<()> {
        dispatcher.click(add, Settle::Mutation).await?;
        self.record_add(item.slug);
        tracing::info!(item = item.slug, count = self.len(), "added to cart");
        let expect = expect_for(dispatcher);
        expect.assert_visible(remove).await?;
        self.verify_here(dispatcher, &expect).await
    }

    /// Remove `item` using its remove button.
    ///
    /// On the listing the add button must come back.
    ///
    /// # Errors
    ///
    /// Fails if the remove affordance stays or the badge does not follow.
    pub async fn remove(&mut self, dispatcher: &Dispatcher<'_>, item: &CatalogItem) -> ProbeResult<()> {
        self.remove_with(dispatcher, item, &item.remove_button()).await?;
        let url = dispatcher.driver().current_url().await?;
        if url.ends_with(InventoryPage.path()) {
            expect_for(dispatcher).assert_visible(&item.add_button()).await?;
        }
        Ok(())
    }

    /// Remove `item` through the given affordance
    ///
    /// # Errors
    ///
    /// Fails if `remove` stays visible or the badge does not follow.
    pub async fn remove_with(
        &mut self,
        dispatcher: &Dispatcher<'_>,
        item: &CatalogItem,
        remove: &Locator,
    ) -> ProbeResult<()> {
        dispatcher.click(remove, Settle::Mutation).await?;
        self.record_remove(item.slug);
        tracing::info!(item = item.slug, count = self.len(), "removed from cart");
        let expect = expect_for(dispatcher);
        expect.assert_not_visible(remove).await?;
        self.verify_here(dispatcher, &expect).await
    }

    /// Remove `item` while the cart page is shown; its row must disappear.
    ///
    /// # Errors
    ///
    /// Fails if the row count or badge does not follow.
    pub async fn remove_from_cart_view(
        &mut self,
        dispatcher: &Dispatcher<'_>,
        item: &CatalogItem,
    ) -> ProbeResult<()> {
        let expect = expect_for(dispatcher);
        expect.assert_visible(&CartPage.landmark()).await?;
        self.remove_with(dispatcher, item, &item.remove_button()).await?;
        expect.assert_count(&CartPage::items(), self.len()).await?;
        expect.assert_not_visible(&item.name_text()).await
    }

    /// Badge shows the item count, or is absent for an empty cart.
    ///
    /// # Errors
    ///
    /// `VerificationFailure` if the badge disagrees.
    pub async fn verify_badge(&self, expect: &Expect<'_>) -> ProbeResult<()> {
        match self.expected_badge() {
            Some(count) => expect
                .assert_text_equals(&Header::cart_badge(), &count)
                .await
                .map(|_| ()),
            None => expect.assert_not_visible(&Header::cart_badge()).await,
        }
    }

    /// Badge and remove affordances both agree with the model.
    ///
    /// # Errors
    ///
    /// `VerificationFailure` on the first disagreement.
    pub async fn verify(&self, expect: &Expect<'_>) -> ProbeResult<()> {
        self.verify_badge(expect).await?;
        expect
            .assert_count(&InventoryPage::remove_buttons(), self.len())
            .await
    }

    /// [`Self::verify`] where the page lists the whole cart (listing, cart
    /// view), [`Self::verify_badge`] elsewhere.
    async fn verify_here(&self, dispatcher: &Dispatcher<'_>, expect: &Expect<'_>) -> ProbeResult<()> {
        let url = dispatcher.driver().current_url().await?;
        if lists_whole_cart(&url) {
            self.verify(expect).await
        } else {
            self.verify_badge(expect).await
        }
    }

    /// Remove items until no remove affordance is left.
    ///
    /// Every iteration re-resolves the first remaining remove button. The
    /// loop is bounded by an iteration cap of `len + max_attempts` and by a
    /// deadline of one wait timeout per expected item plus one.
    ///
    /// Returns the number of removals performed.
    ///
    /// # Errors
    ///
    /// `Timeout` when a bound is hit with affordances still present.
    pub async fn drain(&mut self, dispatcher: &Dispatcher<'_>) -> ProbeResult<usize> {
        let driver = dispatcher.driver();
        let options = *dispatcher.options();
        let remove = InventoryPage::remove_buttons();
        let cap = self.len() + options.max_attempts();
        let budget = options.timeout() * u32::try_from(self.len() + 1).unwrap_or(u32::MAX);
        let start = Instant::now();
        let mut removed = 0;

        loop {
            let remaining = remove.count(driver).await?;
            if remaining == 0 {
                break;
            }
            if removed >= cap || start.elapsed() >= budget {
                tracing::warn!(removed, remaining, "cart drain did not converge");
                return Err(ProbeError::timeout(Diagnostic::new(
                    remove.to_string(),
                    "no remove affordances",
                    format!("{remaining} remaining after {removed} removals"),
                    start.elapsed(),
                )));
            }
            let report = dispatcher.click(&remove.first(), Settle::Mutation).await?;
            if let Some(slug) = report
                .element
                .attribute("id")
                .and_then(|id| id.strip_prefix("remove-"))
            {
                self.record_remove(slug);
            }
            removed += 1;
        }

        self.items.clear();
        tracing::info!(removed, "cart drained");
        expect_for(dispatcher)
            .assert_not_visible(&Header::cart_badge())
            .await?;
        Ok(removed)
    }
}

fn lists_whole_cart(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.ends_with(InventoryPage.path()) || path.ends_with(CartPage.path())
}

fn expect_for<'a>(dispatcher: &Dispatcher<'a>) -> Expect<'a> {
    Expect::new(dispatcher.driver(), *dispatcher.options())
}
