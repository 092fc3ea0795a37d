//! Page objects and fixtures for the Swag Labs storefront.
//!
//! Selectors, the six-item catalog and the exact strings the application
//! renders. Scenario code should never spell a selector or message inline.

use crate::locator::{Locator, Selector};
use crate::ordering::SortMode;
use crate::url::UrlPattern;
use std::fmt;

/// Default storefront location
pub const BASE_URL: &str = "https://www.saucedemo.com/";

/// Shared password of the demo accounts
pub const PASSWORD: &str = "secret_sauce";

/// Account that can log in
pub const STANDARD_USER: &str = "standard_user";

/// Account the application refuses
pub const LOCKED_OUT_USER: &str = "locked_out_user";

/// Messages rendered by the storefront, verbatim
pub mod messages {
    /// Login submitted without a username
    pub const USERNAME_REQUIRED: &str = "Epic sadface: Username is required";
    /// Login submitted without a password
    pub const PASSWORD_REQUIRED: &str = "Epic sadface: Password is required";
    /// Unknown username or wrong password
    pub const BAD_CREDENTIALS: &str =
        "Epic sadface: Username and password do not match any user in this service";
    /// Locked-out account
    pub const LOCKED_OUT: &str = "Epic sadface: Sorry, this user has been locked out.";
    /// Checkout without first name
    pub const FIRST_NAME_REQUIRED: &str = "Error: First Name is required";
    /// Checkout without last name
    pub const LAST_NAME_REQUIRED: &str = "Error: Last Name is required";
    /// Checkout without postal code
    pub const POSTAL_CODE_REQUIRED: &str = "Error: Postal Code is required";
}

/// One product of the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogItem {
    /// Display name
    pub name: &'static str,
    /// Slug used in button ids (`add-to-cart-{slug}`)
    pub slug: &'static str,
    /// Price in cents
    pub price_cents: u32,
    /// Numeric id used in links (`item_{id}_title_link`, `?id={id}`)
    pub id: u32,
}

impl CatalogItem {
    /// Price as rendered, e.g. `$29.99`
    #[must_use]
    pub fn price_label(&self) -> String {
        format!("${}.{:02}", self.price_cents / 100, self.price_cents % 100)
    }

    /// Listing button that adds this item
    #[must_use]
    pub fn add_button(&self) -> Locator {
        Locator::new(format!("#add-to-cart-{}", self.slug))
    }

    /// Button that removes this item (listing and cart)
    #[must_use]
    pub fn remove_button(&self) -> Locator {
        Locator::new(format!("#remove-{}", self.slug))
    }

    /// Title link on the listing
    #[must_use]
    pub fn title_link(&self) -> Locator {
        Locator::new(format!("#item_{}_title_link", self.id))
    }

    /// Text locator for the name
    #[must_use]
    pub fn name_text(&self) -> Locator {
        Locator::by_text(self.name)
    }
}

/// The catalog in the listing's default (name ascending) order
pub const CATALOG: [CatalogItem; 6] = [
    CatalogItem {
        name: "Sauce Labs Backpack",
        slug: "sauce-labs-backpack",
        price_cents: 2999,
        id: 4,
    },
    CatalogItem {
        name: "Sauce Labs Bike Light",
        slug: "sauce-labs-bike-light",
        price_cents: 999,
        id: 0,
    },
    CatalogItem {
        name: "Sauce Labs Bolt T-Shirt",
        slug: "sauce-labs-bolt-t-shirt",
        price_cents: 1599,
        id: 1,
    },
    CatalogItem {
        name: "Sauce Labs Fleece Jacket",
        slug: "sauce-labs-fleece-jacket",
        price_cents: 4999,
        id: 5,
    },
    CatalogItem {
        name: "Sauce Labs Onesie",
        slug: "sauce-labs-onesie",
        price_cents: 799,
        id: 2,
    },
    CatalogItem {
        name: "Test.allTheThings() T-Shirt (Red)",
        slug: "test.allthethings()-t-shirt-(red)",
        price_cents: 1599,
        id: 3,
    },
];

/// Look up a catalog item by slug
#[must_use]
pub fn catalog_item(slug: &str) -> Option<&'static CatalogItem> {
    CATALOG.iter().find(|item| item.slug == slug)
}

/// Listing order the storefront shows for each sort mode.
///
/// Fixture data, not a comparator: the two $15.99 shirts keep Bolt before
/// Red in both price orders.
#[must_use]
pub const fn expected_order(mode: SortMode) -> [&'static str; 6] {
    match mode {
        SortMode::NameAsc => [
            "Sauce Labs Backpack",
            "Sauce Labs Bike Light",
            "Sauce Labs Bolt T-Shirt",
            "Sauce Labs Fleece Jacket",
            "Sauce Labs Onesie",
            "Test.allTheThings() T-Shirt (Red)",
        ],
        SortMode::NameDesc => [
            "Test.allTheThings() T-Shirt (Red)",
            "Sauce Labs Onesie",
            "Sauce Labs Fleece Jacket",
            "Sauce Labs Bolt T-Shirt",
            "Sauce Labs Bike Light",
            "Sauce Labs Backpack",
        ],
        SortMode::PriceAsc => [
            "Sauce Labs Onesie",
            "Sauce Labs Bike Light",
            "Sauce Labs Bolt T-Shirt",
            "Test.allTheThings() T-Shirt (Red)",
            "Sauce Labs Backpack",
            "Sauce Labs Fleece Jacket",
        ],
        SortMode::PriceDesc => [
            "Sauce Labs Fleece Jacket",
            "Sauce Labs Backpack",
            "Sauce Labs Bolt T-Shirt",
            "Test.allTheThings() T-Shirt (Red)",
            "Sauce Labs Bike Light",
            "Sauce Labs Onesie",
        ],
    }
}

/// Social links in the footer, each opening a popup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocialLink {
    /// Twitter, redirected to x.com
    Twitter,
    /// Facebook
    Facebook,
    /// LinkedIn
    LinkedIn,
}

impl SocialLink {
    /// All footer links
    pub const ALL: [Self; 3] = [Self::Twitter, Self::Facebook, Self::LinkedIn];

    /// Footer icon
    #[must_use]
    pub fn locator(self) -> Locator {
        Locator::new(match self {
            Self::Twitter => ".social_twitter",
            Self::Facebook => ".social_facebook",
            Self::LinkedIn => ".social_linkedin",
        })
    }

    /// Where the popup must end up
    #[must_use]
    pub const fn destination(self) -> &'static str {
        match self {
            Self::Twitter => "https://x.com/saucelabs",
            Self::Facebook => "https://www.facebook.com/saucelabs",
            Self::LinkedIn => "https://www.linkedin.com/company/sauce-labs/",
        }
    }
}

impl fmt::Display for SocialLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Twitter => "twitter",
            Self::Facebook => "facebook",
            Self::LinkedIn => "linkedin",
        })
    }
}

/// Join a storefront path onto a base URL
#[must_use]
pub fn page_url(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// A page of the storefront
pub trait PageObject: Sync {
    /// Path relative to the base URL
    fn path(&self) -> &'static str;

    /// An element only this page renders
    fn landmark(&self) -> Locator;

    /// Pattern the location matches while this page is shown
    fn url_pattern(&self, base_url: &str) -> UrlPattern {
        UrlPattern::exact(page_url(base_url, self.path()))
    }

    /// Page name for logs
    fn page_name(&self) -> &'static str;
}

/// Login form
#[derive(Debug, Clone, Copy, Default)]
pub struct LoginPage;

impl LoginPage {
    /// Username field
    #[must_use]
    pub fn username() -> Locator {
        Locator::by_placeholder("Username")
    }

    /// Password field
    #[must_use]
    pub fn password() -> Locator {
        Locator::by_placeholder("Password")
    }

    /// Submit button
    #[must_use]
    pub fn submit() -> Locator {
        Locator::new("#login-button")
    }

    /// Rendered error message
    #[must_use]
    pub fn error(message: &str) -> Locator {
        Locator::by_text(message)
    }
}

impl PageObject for LoginPage {
    fn path(&self) -> &'static str {
        ""
    }

    fn landmark(&self) -> Locator {
        Self::submit()
    }

    fn page_name(&self) -> &'static str {
        "login"
    }
}

/// Product listing
#[derive(Debug, Clone, Copy, Default)]
pub struct InventoryPage;

impl InventoryPage {
    /// Product cards
    #[must_use]
    pub fn items() -> Locator {
        Locator::new(".inventory_item")
    }

    /// Product names, also used by the cart rows
    #[must_use]
    pub fn item_names() -> Locator {
        Locator::new(".inventory_item_name")
    }

    /// Product descriptions
    #[must_use]
    pub fn item_descriptions() -> Locator {
        Locator::new(".inventory_item_desc")
    }

    /// Product prices
    #[must_use]
    pub fn item_prices() -> Locator {
        Locator::new(".inventory_item_price")
    }

    /// Sort dropdown
    #[must_use]
    pub fn sort_control() -> Locator {
        Locator::new(".product_sort_container")
    }

    /// Every "Add to cart" button on the page
    #[must_use]
    pub fn add_buttons() -> Locator {
        Locator::by_role("button", "Add to cart")
    }

    /// Every "Remove" button on the page
    #[must_use]
    pub fn remove_buttons() -> Locator {
        Locator::by_role("button", "Remove")
    }

    /// Image inside the n-th card
    #[must_use]
    pub fn item_image(index: usize) -> Locator {
        Self::items().nth(index).within(Selector::css("img"))
    }

    /// Price inside the n-th card
    #[must_use]
    pub fn item_price(index: usize) -> Locator {
        Self::items().nth(index).locator(".inventory_item_price")
    }

    /// Button named `name` inside the n-th card
    #[must_use]
    pub fn item_button(index: usize, name: &str) -> Locator {
        Self::items().nth(index).get_by_role("button", name)
    }
}

impl PageObject for InventoryPage {
    fn path(&self) -> &'static str {
        "inventory.html"
    }

    fn landmark(&self) -> Locator {
        Self::sort_control()
    }

    fn page_name(&self) -> &'static str {
        "inventory"
    }
}

/// Header shared by the logged-in pages
#[derive(Debug, Clone, Copy, Default)]
pub struct Header;

impl Header {
    /// Cart icon
    #[must_use]
    pub fn cart_link() -> Locator {
        Locator::new(".shopping_cart_link")
    }

    /// Item count bubble, absent when the cart is empty
    #[must_use]
    pub fn cart_badge() -> Locator {
        Locator::new(".shopping_cart_badge")
    }
}

/// Cart contents
#[derive(Debug, Clone, Copy, Default)]
pub struct CartPage;

impl CartPage {
    /// Cart rows
    #[must_use]
    pub fn items() -> Locator {
        Locator::new(".cart_item")
    }

    /// Back to the listing
    #[must_use]
    pub fn continue_shopping() -> Locator {
        Locator::by_role("button", "Continue Shopping")
    }

    /// Start checkout
    #[must_use]
    pub fn checkout() -> Locator {
        Locator::by_role("button", "Checkout")
    }
}

impl PageObject for CartPage {
    fn path(&self) -> &'static str {
        "cart.html"
    }

    fn landmark(&self) -> Locator {
        Self::checkout()
    }

    fn page_name(&self) -> &'static str {
        "cart"
    }
}

/// Single product view
#[derive(Debug, Clone, Copy, Default)]
pub struct DetailsPage;

impl DetailsPage {
    /// Product name
    #[must_use]
    pub fn name() -> Locator {
        Locator::new(".inventory_details_name")
    }

    /// Product price
    #[must_use]
    pub fn price() -> Locator {
        Locator::new(".inventory_details_price")
    }

    /// Add button
    #[must_use]
    pub fn add_button() -> Locator {
        Locator::by_role("button", "Add to cart")
    }

    /// Remove button
    #[must_use]
    pub fn remove_button() -> Locator {
        Locator::by_role("button", "Remove")
    }
}

impl PageObject for DetailsPage {
    fn path(&self) -> &'static str {
        "inventory-item.html"
    }

    fn landmark(&self) -> Locator {
        Self::name()
    }

    fn url_pattern(&self, base_url: &str) -> UrlPattern {
        UrlPattern::Regex(format!(r"^{}\?id=\d+$", regex::escape(&page_url(base_url, self.path()))))
    }

    fn page_name(&self) -> &'static str {
        "details"
    }
}

/// Checkout step one: buyer information
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckoutPage;

impl CheckoutPage {
    /// First name field
    #[must_use]
    pub fn first_name() -> Locator {
        Locator::by_placeholder("First Name")
    }

    /// Last name field
    #[must_use]
    pub fn last_name() -> Locator {
        Locator::by_placeholder("Last Name")
    }

    /// Postal code field
    #[must_use]
    pub fn postal_code() -> Locator {
        Locator::by_placeholder("Zip/Postal Code")
    }

    /// Continue to the overview
    #[must_use]
    pub fn continue_button() -> Locator {
        Locator::by_role("button", "Continue")
    }

    /// Validation message container
    #[must_use]
    pub fn error() -> Locator {
        Locator::new(".error-message-container")
    }
}

impl PageObject for CheckoutPage {
    fn path(&self) -> &'static str {
        "checkout-step-one.html"
    }

    fn landmark(&self) -> Locator {
        Self::first_name()
    }

    fn page_name(&self) -> &'static str {
        "checkout"
    }
}

/// Checkout step two: order overview
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckoutOverviewPage;

impl CheckoutOverviewPage {
    /// Order total line
    #[must_use]
    pub fn total() -> Locator {
        Locator::new(".summary_total_label")
    }
}

impl PageObject for CheckoutOverviewPage {
    fn path(&self) -> &'static str {
        "checkout-step-two.html"
    }

    fn landmark(&self) -> Locator {
        Self::total()
    }

    fn page_name(&self) -> &'static str {
        "checkout overview"
    }
}
