//! Property-based tests for storefront-probe.
//!
//! Uses proptest to check the pure pieces of the engine (listing comparison,
//! cart bookkeeping, URL patterns, locator narrowing and wait bounds) over
//! arbitrary inputs.

use proptest::prelude::*;
use storefront_probe::prelude::*;

fn handles(count: usize) -> Vec<ElementHandle> {
    (0..count)
        .map(|i| ElementHandle::new(format!("0:{i}"), "div").with_text(format!("item {i}")))
        .collect()
}

// === Listing Order ===

proptest! {
    /// A listing never mismatches itself.
    #[test]
    fn prop_identical_listing_matches(labels in prop::collection::vec("[A-Za-z ]{1,12}", 0..8)) {
        let listing = OrderedListing::new(labels.clone());
        prop_assert!(listing.first_mismatch(&labels).is_none());
    }

    /// The reported position is the first one that differs.
    #[test]
    fn prop_mismatch_is_first_difference(
        labels in prop::collection::vec("[a-z]{1,8}", 1..8),
        pick in any::<prop::sample::Index>(),
    ) {
        let at = pick.index(labels.len());
        let mut expected = labels.clone();
        expected[at] = format!("{}!", expected[at]);
        let mismatch = OrderedListing::new(labels.clone()).first_mismatch(&expected);
        prop_assert!(mismatch.is_some());
        let mismatch = mismatch.unwrap();
        prop_assert_eq!(mismatch.index, at);
        prop_assert_eq!(mismatch.observed.as_deref(), Some(labels[at].as_str()));
    }

    /// A short listing mismatches where it ends.
    #[test]
    fn prop_truncated_listing_mismatches_at_end(
        labels in prop::collection::vec("[a-z]{1,8}", 1..8),
        keep in 0usize..8,
    ) {
        let keep = keep.min(labels.len() - 1);
        let listing = OrderedListing::new(labels[..keep].to_vec());
        let mismatch = listing.first_mismatch(&labels).unwrap();
        prop_assert_eq!(mismatch.index, keep);
        prop_assert!(mismatch.observed.is_none());
    }
}

// === Cart Model ===

proptest! {
    /// The expected badge is never "0": absent when empty, the count otherwise.
    #[test]
    fn prop_badge_tracks_distinct_items(ops in prop::collection::vec((any::<bool>(), 0usize..6), 0..40)) {
        let mut cart = CartModel::new();
        for (add, index) in ops {
            let slug = CATALOG[index].slug;
            if add {
                cart.record_add(slug);
            } else {
                cart.record_remove(slug);
            }
            match cart.expected_badge() {
                None => prop_assert!(cart.is_empty()),
                Some(badge) => {
                    prop_assert_ne!(badge.as_str(), "0");
                    prop_assert_eq!(badge, cart.len().to_string());
                }
            }
            prop_assert!(cart.len() <= CATALOG.len());
        }
    }
}

// === URL Patterns ===

proptest! {
    /// An exact pattern matches only its own URL.
    #[test]
    fn prop_exact_matches_only_itself(path in "[a-z]{1,10}", suffix in "[a-z?=0-9]{1,6}") {
        let url = format!("https://www.saucedemo.com/{path}");
        let pattern = UrlPattern::exact(url.clone());
        prop_assert!(pattern.matches(&url));
        let longer = format!("{url}{suffix}");
        prop_assert!(!pattern.matches(&longer));
    }

    /// The details pattern matches every item id and nothing else.
    #[test]
    fn prop_details_pattern_matches_item_ids(id in 0u32..1000, junk in "[a-z]{1,6}") {
        let pattern = DetailsPage.url_pattern("https://www.saucedemo.com/");
        let url = format!("https://www.saucedemo.com/inventory-item.html?id={id}");
        prop_assert!(pattern.matches(&url));
        prop_assert!(!pattern.matches("https://www.saucedemo.com/inventory.html"));
        let suffixed = format!("{url}{junk}");
        prop_assert!(!pattern.matches(&suffixed));
    }
}

// === Locator Narrowing ===

proptest! {
    /// Narrowing keeps at most one match, and the right one.
    #[test]
    fn prop_nth_picks_index_or_nothing(count in 0usize..10, index in 0usize..12) {
        let narrowed = Locator::new(".inventory_item").nth(index).narrow(handles(count));
        if index < count {
            prop_assert_eq!(narrowed.len(), 1);
            prop_assert_eq!(narrowed[0].id.clone(), format!("0:{index}"));
        } else {
            prop_assert!(narrowed.is_empty());
        }
    }

    /// An un-narrowed locator keeps every match in order.
    #[test]
    fn prop_all_keeps_every_match(count in 0usize..10) {
        let all = Locator::new(".inventory_item").narrow(handles(count));
        prop_assert_eq!(all, handles(count));
    }
}

// === Wait Bounds ===

proptest! {
    /// The attempt cap covers the whole timeout at the poll interval.
    #[test]
    fn prop_max_attempts_covers_timeout(timeout_ms in 1u64..60_000, poll_ms in 1u64..2_000) {
        let options = WaitOptions::new().with_timeout(timeout_ms).with_poll_interval(poll_ms);
        let attempts = options.max_attempts() as u64;
        prop_assert!(attempts >= 2);
        prop_assert!((attempts - 1) * poll_ms >= timeout_ms);
        prop_assert!((attempts - 2) * poll_ms < timeout_ms);
    }
}
