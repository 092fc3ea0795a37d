//! In-memory Swag Labs storefront for integration tests.
//!
//! Renders the same classes, ids, placeholders and button labels the live
//! site does, and can be told to misbehave through [`Fault`]s so tests can
//! check that the suite catches each regression.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;
use storefront_probe::mock::{MockApp, MockElement, MockPage, PopupSpec};
use storefront_probe::storefront::{messages, CatalogItem, BASE_URL, CATALOG, LOCKED_OUT_USER, PASSWORD};
use storefront_probe::{PageDriver, ProbeError, ProbeResult, SortMode};

/// Delay between an interaction and its effect on the page
pub const LATENCY: Duration = Duration::from_millis(150);

/// A deliberate storefront bug
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Badge shows one more than the cart holds
    BadgeOffByOne,
    /// Badge shows "0" instead of disappearing when the cart empties
    ZeroBadge,
    /// Sort control changes its label but not the listing
    SortIgnored,
    /// Removing an item puts a different one into the cart
    Restock,
    /// Twitter popup never reaches x.com
    PopupNoRedirect,
    /// Fleece jacket details page shows the wrong price
    DetailPrice,
    /// Checkout continues with empty fields
    CheckoutSkipsValidation,
    /// A rejected login leaves the login page for `?failed-login`
    FailedLoginRedirects,
    /// Fleece jacket card on the listing shows the wrong price
    ListingPrice,
    /// Bolt T-Shirt's listing button keeps saying "Add to cart" once added
    StuckButtonLabel,
    /// Selecting the active sort mode reverses it
    SortToggles,
}

const DESCRIPTIONS: [(&str, &str); 6] = [
    (
        "sauce-labs-backpack",
        "carry.allTheThings() with the sleek, streamlined Sly Pack that melds uncompromising style with unequaled laptop and tablet protection.",
    ),
    (
        "sauce-labs-bike-light",
        "A red light isn't the desired state in testing but it sure helps when riding your bike at night. Water-resistant with 3 lighting modes, 1 AAA battery included.",
    ),
    (
        "sauce-labs-bolt-t-shirt",
        "Get your testing superhero on with the Sauce Labs bolt T-shirt. From American Apparel, 100% ringspun combed cotton, heather gray with red bolt.",
    ),
    (
        "sauce-labs-fleece-jacket",
        "It's not every day that you come across a midweight quarter-zip fleece jacket capable of handling everything from a relaxing day outdoors to a busy day at the office.",
    ),
    (
        "sauce-labs-onesie",
        "Rib snap infant onesie for the junior automation engineer in development. Reinforced 3-snap bottom closure, two-needle hemmed sleeved and bottom won't unravel.",
    ),
    (
        "test.allthethings()-t-shirt-(red)",
        "This classic Sauce Labs t-shirt is perfect to wear when cozying up to your keyboard to automate a few tests. Super-soft and comfy ringspun combed cotton.",
    ),
];

fn description(item: &CatalogItem) -> &'static str {
    DESCRIPTIONS
        .iter()
        .find(|(slug, _)| *slug == item.slug)
        .map_or("", |(_, text)| *text)
}

fn by_id(id: u32) -> Option<&'static CatalogItem> {
    CATALOG.iter().find(|item| item.id == id)
}

fn by_name(name: &str) -> Option<&'static CatalogItem> {
    CATALOG.iter().find(|item| item.name == name)
}

fn by_slug(slug: &str) -> Option<&'static CatalogItem> {
    CATALOG.iter().find(|item| item.slug == slug)
}

fn cents(amount: u32) -> String {
    format!("${}.{:02}", amount / 100, amount % 100)
}

/// Simulated storefront state
#[derive(Debug, Clone)]
pub struct SwagLabs {
    base: String,
    path: String,
    logged_in: bool,
    username: String,
    password: String,
    login_error: Option<String>,
    sort: SortMode,
    cart: Vec<&'static CatalogItem>,
    first_name: String,
    last_name: String,
    postal_code: String,
    checkout_error: Option<&'static str>,
    faults: Vec<Fault>,
}

impl Default for SwagLabs {
    fn default() -> Self {
        Self::new()
    }
}

impl SwagLabs {
    pub fn new() -> Self {
        Self {
            base: BASE_URL.to_string(),
            path: String::new(),
            logged_in: false,
            username: String::new(),
            password: String::new(),
            login_error: None,
            sort: SortMode::NameAsc,
            cart: Vec::new(),
            first_name: String::new(),
            last_name: String::new(),
            postal_code: String::new(),
            checkout_error: None,
            faults: Vec::new(),
        }
    }

    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.faults.push(fault);
        self
    }

    fn has(&self, fault: Fault) -> bool {
        self.faults.contains(&fault)
    }

    fn go(&mut self, path: impl Into<String>) {
        self.path = path.into();
    }

    fn detail_item(&self) -> Option<&'static CatalogItem> {
        self.path
            .strip_prefix("inventory-item.html?id=")
            .and_then(|id| id.parse().ok())
            .and_then(by_id)
    }

    fn in_cart(&self, item: &CatalogItem) -> bool {
        self.cart.iter().any(|c| c.slug == item.slug)
    }

    fn add(&mut self, item: &'static CatalogItem) {
        if !self.in_cart(item) {
            self.cart.push(item);
        }
    }

    fn remove(&mut self, item: &'static CatalogItem) {
        self.cart.retain(|c| c.slug != item.slug);
        if self.has(Fault::Restock) {
            let start = CATALOG.iter().position(|c| c.slug == item.slug).unwrap_or(0);
            let next = CATALOG
                .iter()
                .cycle()
                .skip(start + 1)
                .take(CATALOG.len() - 1)
                .find(|c| !self.in_cart(c));
            if let Some(next) = next {
                self.cart.push(next);
            }
        }
    }

    fn listing(&self) -> Vec<&'static CatalogItem> {
        let mut items: Vec<_> = CATALOG.iter().collect();
        if self.has(Fault::SortIgnored) {
            return items;
        }
        match self.sort {
            SortMode::NameAsc => items.sort_by(|a, b| a.name.cmp(b.name)),
            SortMode::NameDesc => items.sort_by(|a, b| b.name.cmp(a.name)),
            SortMode::PriceAsc => items.sort_by_key(|i| i.price_cents),
            SortMode::PriceDesc => items.sort_by(|a, b| b.price_cents.cmp(&a.price_cents)),
        }
        items
    }

    fn badge(&self) -> Option<usize> {
        let count = self.cart.len();
        if count > 0 {
            Some(if self.has(Fault::BadgeOffByOne) { count + 1 } else { count })
        } else if self.has(Fault::ZeroBadge) {
            Some(0)
        } else {
            None
        }
    }

    fn submit_login(&mut self) {
        let error = if self.username.is_empty() {
            Some(messages::USERNAME_REQUIRED)
        } else if self.password.is_empty() {
            Some(messages::PASSWORD_REQUIRED)
        } else if self.username == LOCKED_OUT_USER && self.password == PASSWORD {
            Some(messages::LOCKED_OUT)
        } else if self.username.ends_with("_user") && self.password == PASSWORD {
            None
        } else {
            Some(messages::BAD_CREDENTIALS)
        };
        self.login_error = error.map(str::to_string);
        if error.is_none() {
            self.logged_in = true;
            self.go("inventory.html");
        } else if self.has(Fault::FailedLoginRedirects) {
            self.go("?failed-login");
        }
    }

    fn submit_checkout(&mut self) {
        let error = if self.has(Fault::CheckoutSkipsValidation) {
            None
        } else if self.first_name.is_empty() {
            Some(messages::FIRST_NAME_REQUIRED)
        } else if self.last_name.is_empty() {
            Some(messages::LAST_NAME_REQUIRED)
        } else if self.postal_code.is_empty() {
            Some(messages::POSTAL_CODE_REQUIRED)
        } else {
            None
        };
        self.checkout_error = error;
        if error.is_none() {
            self.go("checkout-step-two.html");
        }
    }

    // -----------------------------------------------------------------------
    // Rendering
    // -----------------------------------------------------------------------

    fn header(&self) -> MockElement {
        let mut link = MockElement::new("a").class("shopping_cart_link");
        if let Some(count) = self.badge() {
            link = link.child(
                MockElement::new("span")
                    .class("shopping_cart_badge")
                    .text(count.to_string()),
            );
        }
        MockElement::new("div").class("primary_header").children([
            MockElement::new("div").class("app_logo").text("Swag Labs"),
            MockElement::new("div")
                .id("shopping_cart_container")
                .class("shopping_cart_container")
                .child(link),
        ])
    }

    fn footer() -> MockElement {
        let social = |class: &str, href: &str, label: &str| {
            MockElement::new("li").class(class).child(
                MockElement::new("a")
                    .attr("href", href)
                    .attr("target", "_blank")
                    .text(label),
            )
        };
        MockElement::new("footer").class("footer").children([
            MockElement::new("ul").class("social").children([
                social("social_twitter", "https://twitter.com/saucelabs", "Twitter"),
                social("social_facebook", "https://www.facebook.com/saucelabs", "Facebook"),
                social(
                    "social_linkedin",
                    "https://www.linkedin.com/company/sauce-labs/",
                    "LinkedIn",
                ),
            ]),
            MockElement::new("div")
                .class("footer_copy")
                .text("© 2026 Sauce Labs. All Rights Reserved. Terms of Service | Privacy Policy"),
        ])
    }

    fn error_container(message: Option<&str>) -> MockElement {
        let container = MockElement::new("div").class("error-message-container");
        match message {
            Some(message) => container
                .class("error")
                .child(MockElement::new("h3").attr("data-test", "error").text(message)),
            None => container,
        }
    }

    fn toggle_button(&self, item: &CatalogItem, suffix: Option<&str>) -> MockElement {
        let stuck = self.has(Fault::StuckButtonLabel)
            && suffix.is_some()
            && item.slug == "sauce-labs-bolt-t-shirt";
        let (prefix, label) = match (self.in_cart(item), stuck) {
            (true, false) => ("remove", "Remove"),
            (true, true) => ("remove", "Add to cart"),
            (false, _) => ("add-to-cart", "Add to cart"),
        };
        let id = suffix.map_or_else(|| prefix.to_string(), |slug| format!("{prefix}-{slug}"));
        MockElement::new("button").id(id).class("btn_inventory").text(label)
    }

    fn title_link(item: &CatalogItem) -> MockElement {
        MockElement::new("a")
            .id(format!("item_{}_title_link", item.id))
            .attr("href", "#")
            .child(MockElement::new("div").class("inventory_item_name").text(item.name))
    }

    fn render_login(&self) -> MockElement {
        MockElement::new("body").children([
            MockElement::new("div").class("login_logo").text("Swag Labs"),
            MockElement::new("form").children([
                MockElement::new("input")
                    .id("user-name")
                    .attr("placeholder", "Username")
                    .attr("type", "text")
                    .value(self.username.clone()),
                MockElement::new("input")
                    .id("password")
                    .attr("placeholder", "Password")
                    .attr("type", "password")
                    .value(self.password.clone()),
                Self::error_container(self.login_error.as_deref()),
                MockElement::new("input")
                    .id("login-button")
                    .attr("type", "submit")
                    .value("Login"),
            ]),
        ])
    }

    fn render_inventory(&self) -> MockElement {
        let sort = MockElement::new("select")
            .class("product_sort_container")
            .value(self.sort.label())
            .children(SortMode::ALL.map(|mode| {
                MockElement::new("option")
                    .attr("value", mode.value())
                    .text(mode.label())
            }));
        let cards = self.listing().into_iter().map(|item| {
            let price = if self.has(Fault::ListingPrice) && item.slug == "sauce-labs-fleece-jacket" {
                "$39.99".to_string()
            } else {
                item.price_label()
            };
            MockElement::new("div").class("inventory_item").children([
                MockElement::new("div").class("inventory_item_img").child(
                    MockElement::new("a")
                        .id(format!("item_{}_img_link", item.id))
                        .attr("href", "#")
                        .child(
                            MockElement::new("img")
                                .class("inventory_item_img")
                                .attr("alt", item.name)
                                .attr("src", format!("/static/media/{}.jpg", item.slug)),
                        ),
                ),
                MockElement::new("div").class("inventory_item_description").children([
                    MockElement::new("div").class("inventory_item_label").children([
                        Self::title_link(item),
                        MockElement::new("div")
                            .class("inventory_item_desc")
                            .text(description(item)),
                    ]),
                    MockElement::new("div").class("pricebar").children([
                        MockElement::new("div")
                            .class("inventory_item_price")
                            .text(price),
                        self.toggle_button(item, Some(item.slug)),
                    ]),
                ]),
            ])
        });
        MockElement::new("body").children([
            self.header(),
            MockElement::new("div").class("header_secondary_container").children([
                MockElement::new("span").class("title").text("Products"),
                sort,
            ]),
            MockElement::new("div").class("inventory_list").children(cards),
            Self::footer(),
        ])
    }

    fn render_cart(&self) -> MockElement {
        let rows = self.cart.iter().map(|item| {
            MockElement::new("div").class("cart_item").children([
                MockElement::new("div").class("cart_quantity").text("1"),
                MockElement::new("div").class("cart_item_label").children([
                    Self::title_link(item),
                    MockElement::new("div")
                        .class("inventory_item_desc")
                        .text(description(item)),
                    MockElement::new("div").class("item_pricebar").children([
                        MockElement::new("div")
                            .class("inventory_item_price")
                            .text(item.price_label()),
                        MockElement::new("button")
                            .id(format!("remove-{}", item.slug))
                            .text("Remove"),
                    ]),
                ]),
            ])
        });
        MockElement::new("body").children([
            self.header(),
            MockElement::new("span").class("title").text("Your Cart"),
            MockElement::new("div").class("cart_list").children(
                [
                    MockElement::new("div").class("cart_quantity_label").text("QTY"),
                    MockElement::new("div").class("cart_desc_label").text("Description"),
                ]
                .into_iter()
                .chain(rows),
            ),
            MockElement::new("div").class("cart_footer").children([
                MockElement::new("button")
                    .id("continue-shopping")
                    .text("Continue Shopping"),
                MockElement::new("button").id("checkout").text("Checkout"),
            ]),
            Self::footer(),
        ])
    }

    fn render_details(&self, item: &CatalogItem) -> MockElement {
        let price = if self.has(Fault::DetailPrice) && item.slug == "sauce-labs-fleece-jacket" {
            "$39.99".to_string()
        } else {
            item.price_label()
        };
        MockElement::new("body").children([
            self.header(),
            MockElement::new("button")
                .id("back-to-products")
                .text("Back to products"),
            MockElement::new("div").class("inventory_details").children([
                MockElement::new("img")
                    .class("inventory_details_img")
                    .attr("src", format!("/static/media/{}.jpg", item.slug)),
                MockElement::new("div")
                    .class("inventory_details_desc_container")
                    .children([
                        MockElement::new("div")
                            .class("inventory_details_name")
                            .class("large_size")
                            .text(item.name),
                        MockElement::new("div")
                            .class("inventory_details_desc")
                            .text(description(item)),
                        MockElement::new("div")
                            .class("inventory_details_price")
                            .text(price),
                        self.toggle_button(item, None),
                    ]),
            ]),
            Self::footer(),
        ])
    }

    fn render_checkout(&self) -> MockElement {
        let field = |id: &str, placeholder: &str, value: &str| {
            MockElement::new("input")
                .id(id)
                .attr("placeholder", placeholder)
                .attr("type", "text")
                .value(value)
        };
        MockElement::new("body").children([
            self.header(),
            MockElement::new("span").class("title").text("Checkout: Your Information"),
            MockElement::new("div").class("checkout_info").children([
                field("first-name", "First Name", &self.first_name),
                field("last-name", "Last Name", &self.last_name),
                field("postal-code", "Zip/Postal Code", &self.postal_code),
                Self::error_container(self.checkout_error),
            ]),
            MockElement::new("div").class("checkout_buttons").children([
                MockElement::new("button").id("cancel").text("Cancel"),
                MockElement::new("input")
                    .id("continue")
                    .attr("type", "submit")
                    .value("Continue"),
            ]),
        ])
    }

    fn render_overview(&self) -> MockElement {
        let subtotal: u32 = self.cart.iter().map(|item| item.price_cents).sum();
        let tax = (subtotal * 8 + 50) / 100;
        MockElement::new("body").children([
            self.header(),
            MockElement::new("span").class("title").text("Checkout: Overview"),
            MockElement::new("div").class("summary_info").children([
                MockElement::new("div")
                    .class("summary_subtotal_label")
                    .text(format!("Item total: {}", cents(subtotal))),
                MockElement::new("div")
                    .class("summary_tax_label")
                    .text(format!("Tax: {}", cents(tax))),
                MockElement::new("div")
                    .class("summary_total_label")
                    .text(format!("Total: {}", cents(subtotal + tax))),
            ]),
            MockElement::new("button").id("finish").text("Finish"),
        ])
    }
}

impl MockApp for SwagLabs {
    fn url(&self) -> String {
        format!("{}{}", self.base, self.path)
    }

    fn render(&self) -> MockElement {
        match self.path.as_str() {
            "inventory.html" => self.render_inventory(),
            "cart.html" => self.render_cart(),
            "checkout-step-one.html" => self.render_checkout(),
            "checkout-step-two.html" => self.render_overview(),
            _ => match self.detail_item() {
                Some(item) => self.render_details(item),
                None => self.render_login(),
            },
        }
    }

    fn navigate(&mut self, url: &str) -> ProbeResult<()> {
        let Some(path) = url.strip_prefix(&self.base) else {
            return Err(ProbeError::Navigation {
                url: url.to_string(),
                message: "outside the storefront".to_string(),
            });
        };
        if path.is_empty() || self.logged_in {
            self.go(path);
        } else {
            self.login_error = Some(format!(
                "Epic sadface: You can only access '/{path}' when you are logged in."
            ));
            self.go("");
        }
        Ok(())
    }

    fn click(&mut self, element: &MockElement) -> Option<PopupSpec> {
        let id = element.get_attr("id").unwrap_or_default().to_string();
        match id.as_str() {
            "login-button" => self.submit_login(),
            "add-to-cart" => {
                if let Some(item) = self.detail_item() {
                    self.add(item);
                }
            }
            "remove" => {
                if let Some(item) = self.detail_item() {
                    self.remove(item);
                }
            }
            "continue-shopping" | "back-to-products" => self.go("inventory.html"),
            "checkout" => {
                self.checkout_error = None;
                self.go("checkout-step-one.html");
            }
            "cancel" => self.go("cart.html"),
            "continue" => self.submit_checkout(),
            _ => {}
        }
        if let Some(item) = id.strip_prefix("add-to-cart-").and_then(by_slug) {
            self.add(item);
        }
        if let Some(item) = id.strip_prefix("remove-").and_then(by_slug) {
            self.remove(item);
        }
        let linked = id
            .strip_prefix("item_")
            .and_then(|rest| rest.split('_').next())
            .and_then(|n| n.parse().ok())
            .and_then(by_id)
            .or_else(|| {
                element
                    .has_class("inventory_item_name")
                    .then(|| by_name(&element.text_content()))
                    .flatten()
            });
        if let Some(item) = linked {
            self.go(format!("inventory-item.html?id={}", item.id));
        }
        if element.has_class("shopping_cart_link") || element.has_class("shopping_cart_badge") {
            self.go("cart.html");
        }
        if element.has_class("social_twitter") {
            let popup = PopupSpec::new("https://twitter.com/saucelabs");
            return Some(if self.has(Fault::PopupNoRedirect) {
                popup
            } else {
                popup.redirecting_to("https://x.com/saucelabs")
            });
        }
        if element.has_class("social_facebook") {
            return Some(PopupSpec::new("https://www.facebook.com/saucelabs"));
        }
        if element.has_class("social_linkedin") {
            return Some(PopupSpec::new("https://www.linkedin.com/company/sauce-labs/"));
        }
        None
    }

    fn fill(&mut self, element: &MockElement, text: &str) {
        let text = text.to_string();
        match element.get_attr("placeholder") {
            Some("Username") => self.username = text,
            Some("Password") => self.password = text,
            Some("First Name") => self.first_name = text,
            Some("Last Name") => self.last_name = text,
            Some("Zip/Postal Code") => self.postal_code = text,
            _ => {}
        }
    }

    fn select_option(&mut self, element: &MockElement, label: &str) -> ProbeResult<()> {
        if !element.has_class("product_sort_container") {
            return Err(ProbeError::page("not the sort control"));
        }
        let picked = SortMode::from_label(label)
            .ok_or_else(|| ProbeError::page(format!("no option labelled {label:?}")))?;
        self.sort = if self.has(Fault::SortToggles) && picked == self.sort {
            match picked {
                SortMode::NameAsc => SortMode::NameDesc,
                SortMode::NameDesc => SortMode::NameAsc,
                SortMode::PriceAsc => SortMode::PriceDesc,
                SortMode::PriceDesc => SortMode::PriceAsc,
            }
        } else {
            picked
        };
        Ok(())
    }
}

/// Hands out one simulated storefront page per case and remembers them
#[derive(Debug, Clone, Default)]
pub struct Storefronts {
    faults: Vec<Fault>,
    pages: Arc<Mutex<Vec<MockPage>>>,
}

impl Storefronts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.faults.push(fault);
        self
    }

    /// A fresh page, as a suite driver factory would return it
    pub async fn open(&self) -> ProbeResult<Box<dyn PageDriver>> {
        let app = self
            .faults
            .iter()
            .fold(SwagLabs::new(), |app, &fault| app.with_fault(fault));
        let page = MockPage::new(app).with_latency(LATENCY);
        self.pages.lock().unwrap().push(page.clone());
        Ok(Box::new(page))
    }

    /// Every page handed out so far
    pub fn pages(&self) -> Vec<MockPage> {
        self.pages.lock().unwrap().clone()
    }
}
