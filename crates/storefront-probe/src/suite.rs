//! Scenario suite and runner.
//!
//! Every scenario starts from a fresh driver and session, so a failure in
//! one case cannot leak cart contents or page state into the next. Cases in
//! the [`Group::Storefront`] group log in before their body runs.

use crate::action::Settle;
use crate::assertion::assert_equals;
use crate::cart::CartModel;
use crate::config::ProbeConfig;
use crate::driver::PageDriver;
use crate::locator::Locator;
use crate::ordering::{assert_order, assert_order_holds, SortMode};
use crate::popup::expect_popup_url;
use crate::result::{Diagnostic, ProbeError, ProbeResult};
use crate::session::Session;
use crate::storefront::{
    catalog_item, expected_order, messages, CartPage, CatalogItem, CheckoutOverviewPage,
    CheckoutPage, DetailsPage, Header, InventoryPage, LoginPage, SocialLink, CATALOG,
    LOCKED_OUT_USER, PASSWORD, STANDARD_USER,
};
use crate::url::UrlPattern;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::Instrument;

/// How long a re-selected sort must keep the listing in order
const SORT_HOLD: Duration = Duration::from_millis(500);

/// Body of a scenario, run against an opened session
pub type ScenarioFn = for<'a> fn(&'a Session) -> BoxFuture<'a, ProbeResult<()>>;

/// Precondition shared by a group of scenarios
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Group {
    /// Starts on the login form
    Login,
    /// Starts logged in, on the listing
    Storefront,
}

impl Group {
    /// Whether the session logs in before the scenario body
    #[must_use]
    pub const fn needs_login(self) -> bool {
        matches!(self, Self::Storefront)
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Login => "login",
            Self::Storefront => "storefront",
        })
    }
}

/// A named verification case
#[derive(Clone, Copy)]
pub struct Scenario {
    /// Case name, unique within the suite
    pub name: &'static str,
    /// Precondition group
    pub group: Group,
    run: ScenarioFn,
}

impl fmt::Debug for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.name)
            .field("group", &self.group)
            .finish_non_exhaustive()
    }
}

impl Scenario {
    /// Create a scenario
    #[must_use]
    pub const fn new(name: &'static str, group: Group, run: ScenarioFn) -> Self {
        Self { name, group, run }
    }

    /// Case-insensitive substring match on the name; no filter matches all
    #[must_use]
    pub fn matches(&self, filter: Option<&str>) -> bool {
        filter.map_or(true, |f| {
            self.name.to_lowercase().contains(&f.to_lowercase())
        })
    }

    /// Run the body against `session`
    pub fn run<'a>(&self, session: &'a Session) -> BoxFuture<'a, ProbeResult<()>> {
        (self.run)(session)
    }
}

/// Result of one case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseOutcome {
    /// Case name
    pub name: String,
    /// Precondition group
    pub group: Group,
    /// Whether every step held
    pub passed: bool,
    /// Error message if failed
    pub error: Option<String>,
    /// Selector, expected and observed state of the failing check
    pub diagnostic: Option<Diagnostic>,
    /// Case duration in milliseconds
    pub elapsed_ms: u64,
}

impl CaseOutcome {
    /// Create a passing outcome
    #[must_use]
    pub fn pass(scenario: &Scenario) -> Self {
        Self {
            name: scenario.name.to_string(),
            group: scenario.group,
            passed: true,
            error: None,
            diagnostic: None,
            elapsed_ms: 0,
        }
    }

    /// Create a failing outcome from the error that ended the case
    #[must_use]
    pub fn fail(scenario: &Scenario, error: &ProbeError) -> Self {
        Self {
            name: scenario.name.to_string(),
            group: scenario.group,
            passed: false,
            error: Some(error.to_string()),
            diagnostic: error.diagnostic().cloned(),
            elapsed_ms: 0,
        }
    }

    /// Set duration
    #[must_use]
    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self
    }
}

/// Results from running the suite
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteReport {
    /// Individual case outcomes, in run order
    pub cases: Vec<CaseOutcome>,
    /// Total duration in milliseconds
    pub elapsed_ms: u64,
}

impl SuiteReport {
    /// Check if all cases passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.cases.iter().all(|c| c.passed)
    }

    /// Count passed cases
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.cases.iter().filter(|c| c.passed).count()
    }

    /// Count failed cases
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.cases.iter().filter(|c| !c.passed).count()
    }

    /// Get total case count
    #[must_use]
    pub fn total(&self) -> usize {
        self.cases.len()
    }

    /// Get failed cases
    #[must_use]
    pub fn failures(&self) -> Vec<&CaseOutcome> {
        self.cases.iter().filter(|c| !c.passed).collect()
    }

    /// Outcome of the case called `name`
    #[must_use]
    pub fn case(&self, name: &str) -> Option<&CaseOutcome> {
        self.cases.iter().find(|c| c.name == name)
    }
}

/// Runs scenarios, one fresh driver per case
#[derive(Debug, Clone)]
pub struct SuiteRunner {
    config: ProbeConfig,
    filter: Option<String>,
    fail_fast: bool,
}

impl SuiteRunner {
    /// Create a runner for `config`
    #[must_use]
    pub const fn new(config: ProbeConfig) -> Self {
        Self {
            config,
            filter: None,
            fail_fast: false,
        }
    }

    /// Only run cases whose name contains `filter`
    #[must_use]
    pub fn with_filter(mut self, filter: Option<impl Into<String>>) -> Self {
        self.filter = filter.map(Into::into);
        self
    }

    /// Stop after the first failing case
    #[must_use]
    pub const fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Cases selected by the filter, in suite order
    #[must_use]
    pub fn selected(&self) -> Vec<Scenario> {
        scenarios()
            .into_iter()
            .filter(|s| s.matches(self.filter.as_deref()))
            .collect()
    }

    /// Run every selected case, reporting each outcome to `observer` as it
    /// completes.
    pub async fn run<F, Fut>(&self, factory: F, mut observer: impl FnMut(&CaseOutcome)) -> SuiteReport
    where
        F: Fn() -> Fut,
        Fut: Future<Output = ProbeResult<Box<dyn PageDriver>>>,
    {
        let start = Instant::now();
        let mut cases = Vec::new();
        for scenario in self.selected() {
            let outcome = self.run_case(&scenario, &factory).await;
            observer(&outcome);
            let failed = !outcome.passed;
            cases.push(outcome);
            if failed && self.fail_fast {
                tracing::info!(case = scenario.name, "stopping after first failure");
                break;
            }
        }
        let report = SuiteReport {
            cases,
            elapsed_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        };
        tracing::info!(
            passed = report.passed_count(),
            failed = report.failed_count(),
            "suite finished"
        );
        report
    }

    /// Run one case on a fresh driver
    pub async fn run_case<F, Fut>(&self, scenario: &Scenario, factory: &F) -> CaseOutcome
    where
        F: Fn() -> Fut,
        Fut: Future<Output = ProbeResult<Box<dyn PageDriver>>>,
    {
        let start = Instant::now();
        let span = tracing::info_span!("case", name = scenario.name);
        let result = async {
            let driver = factory().await?;
            let session = Session::open(driver, self.config.clone()).await?;
            let body = async {
                if scenario.group.needs_login() {
                    session.login().await?;
                }
                scenario.run(&session).await
            }
            .await;
            if let Err(e) = session.close().await {
                tracing::warn!(error = %e, "failed to close session");
            }
            body
        }
        .instrument(span)
        .await;

        let outcome = match result {
            Ok(()) => {
                tracing::info!(case = scenario.name, "passed");
                CaseOutcome::pass(scenario)
            }
            Err(e) => {
                tracing::info!(case = scenario.name, error = %e, "failed");
                CaseOutcome::fail(scenario, &e)
            }
        };
        outcome.with_elapsed(start.elapsed())
    }
}

/// Run the cases matching `filter`, one fresh driver from `factory` each
pub async fn run_suite<F, Fut>(config: &ProbeConfig, filter: Option<&str>, factory: F) -> SuiteReport
where
    F: Fn() -> Fut,
    Fut: Future<Output = ProbeResult<Box<dyn PageDriver>>>,
{
    SuiteRunner::new(config.clone())
        .with_filter(filter)
        .run(factory, |_| {})
        .await
}

/// Every scenario, in suite order
#[must_use]
pub fn scenarios() -> Vec<Scenario> {
    use Group::{Login, Storefront};
    vec![
        Scenario::new("successful login", Login, |s| successful_login(s).boxed()),
        Scenario::new("validation: username is required", Login, |s| {
            login_rejected(s, None, Some(PASSWORD), messages::USERNAME_REQUIRED).boxed()
        }),
        Scenario::new("validation: password is required", Login, |s| {
            login_rejected(s, Some(STANDARD_USER), None, messages::PASSWORD_REQUIRED).boxed()
        }),
        Scenario::new("validation: username or password is incorrect", Login, |s| {
            login_rejected(s, Some(STANDARD_USER), Some("aa"), messages::BAD_CREDENTIALS).boxed()
        }),
        Scenario::new("validation for locked out user", Login, |s| {
            login_rejected(s, Some(LOCKED_OUT_USER), Some(PASSWORD), messages::LOCKED_OUT).boxed()
        }),
        Scenario::new("all items should have names", Storefront, |s| items_have_names(s).boxed()),
        Scenario::new("all items should be displayed with images", Storefront, |s| {
            items_have_images(s).boxed()
        }),
        Scenario::new("each item should have a description", Storefront, |s| {
            items_have_descriptions(s).boxed()
        }),
        Scenario::new("each item should have a price", Storefront, |s| items_have_prices(s).boxed()),
        Scenario::new("\"Add to cart\" button should be displayed on all items", Storefront, |s| {
            items_have_add_buttons(s).boxed()
        }),
        Scenario::new("sorting the items from A to Z order", Storefront, |s| {
            sorted(s, SortMode::NameAsc).boxed()
        }),
        Scenario::new("sorting the items from Z to A order", Storefront, |s| {
            sorted(s, SortMode::NameDesc).boxed()
        }),
        Scenario::new("sorting the items from lowest price to highest", Storefront, |s| {
            sorted(s, SortMode::PriceAsc).boxed()
        }),
        Scenario::new("sorting the items from highest price to lowest", Storefront, |s| {
            sorted(s, SortMode::PriceDesc).boxed()
        }),
        Scenario::new("twitter icon link should work", Storefront, |s| {
            social_link(s, SocialLink::Twitter).boxed()
        }),
        Scenario::new("facebook icon link should work", Storefront, |s| {
            social_link(s, SocialLink::Facebook).boxed()
        }),
        Scenario::new("linkedin icon link should work", Storefront, |s| {
            social_link(s, SocialLink::LinkedIn).boxed()
        }),
        Scenario::new(
            "\"Add to cart\" button changes to \"Remove\" button after an item is added to cart",
            Storefront,
            |s| add_becomes_remove(s).boxed(),
        ),
        Scenario::new(
            "\"Remove\" button changes to \"Add to cart\" button after an item is removed from cart",
            Storefront,
            |s| remove_becomes_add(s).boxed(),
        ),
        Scenario::new("the cart badge displays \"1\" after an item is added to cart", Storefront, |s| {
            badge_counts(s, 1).boxed()
        }),
        Scenario::new("the cart badge displays \"3\" after 3 items are added to cart", Storefront, |s| {
            badge_counts(s, 3).boxed()
        }),
        Scenario::new(
            "no cart badge is displayed after all items are removed from cart",
            Storefront,
            |s| drain_clears_badge(s).boxed(),
        ),
        Scenario::new("you should be able to add an item to the cart", Storefront, |s| {
            add_one_to_cart(s).boxed()
        }),
        Scenario::new("you should be able to add 3 items to the cart", Storefront, |s| {
            add_three_to_cart(s).boxed()
        }),
        Scenario::new("you should be able to remove an item from the cart", Storefront, |s| {
            remove_one_from_cart(s).boxed()
        }),
        Scenario::new("you should be able to remove all items from the cart", Storefront, |s| {
            remove_all_from_cart(s).boxed()
        }),
        Scenario::new(
            "the name of an item of the listing should match with the one in details page",
            Storefront,
            |s| listing_matches_details(s, InventoryPage::item_names(), DetailsPage::name()).boxed(),
        ),
        Scenario::new(
            "the price of an item of the listing should match with the one in details page",
            Storefront,
            |s| listing_matches_details(s, InventoryPage::item_prices(), DetailsPage::price()).boxed(),
        ),
        Scenario::new(
            "every catalog item shows the same name and price in the details page",
            Storefront,
            |s| catalog_matches_details(s).boxed(),
        ),
        Scenario::new(
            "you should be able to add an item to the cart from the details page",
            Storefront,
            |s| add_from_details(s).boxed(),
        ),
        Scenario::new(
            "you should be able to remove an item to the cart from the details page",
            Storefront,
            |s| remove_from_details(s).boxed(),
        ),
        Scenario::new("first name is required to be filled in the checkout page", Storefront, |s| {
            checkout_rejected(s, CheckoutField::FirstName).boxed()
        }),
        Scenario::new("last name is required to be filled in the checkout page", Storefront, |s| {
            checkout_rejected(s, CheckoutField::LastName).boxed()
        }),
        Scenario::new("postal code is required to be filled in the checkout page", Storefront, |s| {
            checkout_rejected(s, CheckoutField::PostalCode).boxed()
        }),
        Scenario::new(
            "checkout with every field filled reaches the overview",
            Storefront,
            |s| checkout_completes(s).boxed(),
        ),
    ]
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

async fn successful_login(session: &Session) -> ProbeResult<()> {
    session
        .submit_login(Some(STANDARD_USER), Some(PASSWORD))
        .await?;
    session
        .expect()
        .assert_url(&session.url_of(&InventoryPage))
        .await?;
    Ok(())
}

async fn login_rejected(
    session: &Session,
    username: Option<&str>,
    password: Option<&str>,
    message: &str,
) -> ProbeResult<()> {
    session.submit_login(username, password).await?;
    let expect = session.expect();
    expect.assert_visible(&LoginPage::error(message)).await?;
    expect.assert_url(&session.url_of(&LoginPage)).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

async fn items_have_names(session: &Session) -> ProbeResult<()> {
    let expect = session.expect();
    for item in &CATALOG {
        // The Bolt T-Shirt's description repeats its name, so its text is
        // ambiguous on the listing.
        let locator = if item.slug == "sauce-labs-bolt-t-shirt" {
            item.title_link()
        } else {
            item.name_text()
        };
        expect.assert_visible(&locator).await?;
    }
    Ok(())
}

/// Number of product cards, which must be the whole catalog
async fn listed_items(session: &Session) -> ProbeResult<usize> {
    session
        .expect()
        .assert_count(&InventoryPage::items(), CATALOG.len())
        .await?;
    Ok(CATALOG.len())
}

async fn items_have_images(session: &Session) -> ProbeResult<()> {
    let expect = session.expect();
    for index in 0..listed_items(session).await? {
        let image = InventoryPage::item_image(index);
        expect.assert_visible(&image).await?;
        expect.assert_attribute_non_empty(&image, "src").await?;
    }
    Ok(())
}

async fn items_have_descriptions(session: &Session) -> ProbeResult<()> {
    let expect = session.expect();
    let descriptions = InventoryPage::item_descriptions();
    for index in 0..listed_items(session).await? {
        expect.assert_visible(&descriptions.nth(index)).await?;
    }
    Ok(())
}

async fn items_have_prices(session: &Session) -> ProbeResult<()> {
    let expect = session.expect();
    for index in 0..listed_items(session).await? {
        expect
            .assert_visible(&InventoryPage::item_price(index))
            .await?;
    }
    Ok(())
}

async fn items_have_add_buttons(session: &Session) -> ProbeResult<()> {
    let expect = session.expect();
    for index in 0..listed_items(session).await? {
        expect
            .assert_visible(&InventoryPage::item_button(index, "Add to cart"))
            .await?;
    }
    Ok(())
}

/// Sort, check the order, then select the same mode again: the order holds.
async fn sorted(session: &Session, mode: SortMode) -> ProbeResult<()> {
    let dispatcher = session.dispatcher();
    let expected = expected_order(mode);
    let sort_control = InventoryPage::sort_control();
    let names = InventoryPage::item_names();
    assert_order(&dispatcher, &sort_control, &names, &expected, mode).await?;
    assert_order_holds(&dispatcher, &sort_control, &names, &expected, mode, SORT_HOLD).await?;
    Ok(())
}

async fn social_link(session: &Session, link: SocialLink) -> ProbeResult<()> {
    let dispatcher = session.dispatcher();
    let icon = link.locator();
    expect_popup_url(
        session.driver(),
        dispatcher.options(),
        &link.to_string(),
        &UrlPattern::exact(link.destination()),
        || dispatcher.click(&icon, Settle::None),
    )
    .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Cart
// ---------------------------------------------------------------------------

/// Click the n-th "Add to cart" button currently shown and record the item
async fn add_listed(session: &Session, cart: &mut CartModel, nth: usize) -> ProbeResult<&'static CatalogItem> {
    let report = session
        .dispatcher()
        .click(&InventoryPage::add_buttons().nth(nth), Settle::Mutation)
        .await?;
    let item = report
        .element
        .attribute("id")
        .and_then(|id| id.strip_prefix("add-to-cart-"))
        .and_then(catalog_item)
        .ok_or_else(|| {
            ProbeError::page(format!(
                "{} is not a catalog add button",
                report.element.describe()
            ))
        })?;
    cart.record_add(item.slug);
    cart.verify(&session.expect()).await?;
    Ok(item)
}

async fn add_becomes_remove(session: &Session) -> ProbeResult<()> {
    let mut cart = CartModel::new();
    let item = add_listed(session, &mut cart, 0).await?;
    session.expect().assert_visible(&item.remove_button()).await?;
    Ok(())
}

async fn remove_becomes_add(session: &Session) -> ProbeResult<()> {
    let dispatcher = session.dispatcher();
    let first_add = InventoryPage::add_buttons().first();
    let mut cart = CartModel::new();
    add_listed(session, &mut cart, 0).await?;
    dispatcher
        .click(&InventoryPage::remove_buttons(), Settle::Mutation)
        .await?;
    session.expect().assert_visible(&first_add).await?;
    Ok(())
}

async fn badge_counts(session: &Session, count: usize) -> ProbeResult<()> {
    let mut cart = CartModel::new();
    for nth in 0..count {
        add_listed(session, &mut cart, nth).await?;
    }
    cart.verify(&session.expect()).await
}

async fn drain_clears_badge(session: &Session) -> ProbeResult<()> {
    let mut cart = CartModel::new();
    add_listed(session, &mut cart, 0).await?;
    add_listed(session, &mut cart, 1).await?;
    cart.drain(&session.dispatcher()).await?;
    cart.verify(&session.expect()).await
}

fn item(slug: &str) -> ProbeResult<&'static CatalogItem> {
    catalog_item(slug).ok_or_else(|| ProbeError::Config {
        message: format!("unknown catalog item {slug}"),
    })
}

async fn add_one_to_cart(session: &Session) -> ProbeResult<()> {
    let backpack = item("sauce-labs-backpack")?;
    let mut cart = CartModel::new();
    cart.add(&session.dispatcher(), backpack).await?;
    session.open_cart().await?;
    session
        .expect()
        .assert_contains_text(&CartPage::items(), backpack.name)
        .await?;
    Ok(())
}

async fn add_three_to_cart(session: &Session) -> ProbeResult<()> {
    let items = [
        item("sauce-labs-backpack")?,
        item("sauce-labs-bolt-t-shirt")?,
        item("sauce-labs-onesie")?,
    ];
    let dispatcher = session.dispatcher();
    let mut cart = CartModel::new();
    for item in items {
        cart.add(&dispatcher, item).await?;
    }
    session.open_cart().await?;
    let expect = session.expect();
    expect.assert_count(&CartPage::items(), items.len()).await?;
    for (index, item) in items.iter().enumerate() {
        expect
            .assert_contains_text(&CartPage::items().nth(index), item.name)
            .await?;
    }
    Ok(())
}

async fn remove_one_from_cart(session: &Session) -> ProbeResult<()> {
    let backpack = item("sauce-labs-backpack")?;
    let shirt = item("sauce-labs-bolt-t-shirt")?;
    let dispatcher = session.dispatcher();
    let mut cart = CartModel::new();
    cart.add(&dispatcher, backpack).await?;
    cart.add(&dispatcher, shirt).await?;
    session.open_cart().await?;
    cart.remove_from_cart_view(&dispatcher, backpack).await?;
    session.continue_shopping().await?;
    session
        .expect()
        .assert_not_visible(&backpack.remove_button())
        .await
}

async fn remove_all_from_cart(session: &Session) -> ProbeResult<()> {
    let dispatcher = session.dispatcher();
    let mut cart = CartModel::new();
    cart.add(&dispatcher, item("sauce-labs-backpack")?).await?;
    cart.add(&dispatcher, item("sauce-labs-bolt-t-shirt")?).await?;
    session.open_cart().await?;
    cart.drain(&dispatcher).await?;
    let expect = session.expect();
    expect.assert_not_visible(&CartPage::items()).await?;
    session.continue_shopping().await?;
    expect
        .assert_not_visible(&InventoryPage::remove_buttons())
        .await
}

// ---------------------------------------------------------------------------
// Details
// ---------------------------------------------------------------------------

async fn listing_matches_details(session: &Session, listed: Locator, detail: Locator) -> ProbeResult<()> {
    let expect = session.expect();
    let first = expect.assert_visible(&listed.first()).await?;
    let first_name = InventoryPage::item_names().first();
    session.open_details(&first_name).await?;
    expect.assert_text_equals(&detail, &first.text_content).await?;
    Ok(())
}

/// Walk every listed card: its details page repeats the card's name and
/// price, and both agree with the catalog.
async fn catalog_matches_details(session: &Session) -> ProbeResult<()> {
    let expect = session.expect();
    for index in 0..listed_items(session).await? {
        if index > 0 {
            session.visit(&InventoryPage).await?;
        }
        let name = InventoryPage::item_names().nth(index);
        let listed_name = expect.assert_visible(&name).await?.text_content;
        let listed_price = expect
            .assert_visible(&InventoryPage::item_price(index))
            .await?
            .text_content;
        session.open_details(&name).await?;
        expect.assert_text_equals(&DetailsPage::name(), &listed_name).await?;
        expect
            .assert_text_equals(&DetailsPage::price(), &listed_price)
            .await?;

        let item = CATALOG
            .iter()
            .find(|i| i.name == listed_name)
            .ok_or_else(|| ProbeError::page(format!("{listed_name:?} is not in the catalog")))?;
        assert_equals(&format!("{} price", item.slug), &listed_price, &item.price_label())?;
    }
    Ok(())
}

/// Open the first listed product and return it
async fn open_first_details(session: &Session) -> ProbeResult<&'static CatalogItem> {
    let names = InventoryPage::item_names();
    let listed = session.expect().assert_visible(&names.first()).await?;
    let item = CATALOG
        .iter()
        .find(|i| i.name == listed.text_content)
        .ok_or_else(|| ProbeError::page(format!("{} is not in the catalog", listed.describe())))?;
    session.open_details(&names.first()).await?;
    Ok(item)
}

async fn add_from_details(session: &Session) -> ProbeResult<()> {
    let dispatcher = session.dispatcher();
    let expect = session.expect();
    let item = open_first_details(session).await?;
    let mut cart = CartModel::new();
    cart.add_with(&dispatcher, item, &DetailsPage::add_button(), &DetailsPage::remove_button())
        .await?;
    session.open_cart().await?;
    expect
        .assert_text_equals(&InventoryPage::item_names(), item.name)
        .await?;
    session.continue_shopping().await?;
    expect
        .assert_visible(&InventoryPage::item_button(0, "Remove"))
        .await?;
    Ok(())
}

async fn remove_from_details(session: &Session) -> ProbeResult<()> {
    let dispatcher = session.dispatcher();
    let expect = session.expect();
    let item = open_first_details(session).await?;
    let mut cart = CartModel::new();
    cart.add_with(&dispatcher, item, &DetailsPage::add_button(), &DetailsPage::remove_button())
        .await?;
    cart.remove_with(&dispatcher, item, &DetailsPage::remove_button())
        .await?;
    expect.assert_not_visible(&Header::cart_badge()).await?;
    session.open_cart().await?;
    expect.assert_not_visible(&InventoryPage::item_names()).await?;
    session.continue_shopping().await?;
    expect
        .assert_visible(&InventoryPage::item_button(0, "Add to cart"))
        .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Checkout
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CheckoutField {
    FirstName,
    LastName,
    PostalCode,
}

impl CheckoutField {
    const ALL: [Self; 3] = [Self::FirstName, Self::LastName, Self::PostalCode];

    fn locator(self) -> Locator {
        match self {
            Self::FirstName => CheckoutPage::first_name(),
            Self::LastName => CheckoutPage::last_name(),
            Self::PostalCode => CheckoutPage::postal_code(),
        }
    }

    const fn sample(self) -> &'static str {
        match self {
            Self::FirstName => "John",
            Self::LastName => "Doe",
            Self::PostalCode => "1000",
        }
    }

    const fn required_message(self) -> &'static str {
        match self {
            Self::FirstName => messages::FIRST_NAME_REQUIRED,
            Self::LastName => messages::LAST_NAME_REQUIRED,
            Self::PostalCode => messages::POSTAL_CODE_REQUIRED,
        }
    }
}

/// Add the first listed item and walk to checkout step one
async fn reach_checkout(session: &Session) -> ProbeResult<()> {
    let mut cart = CartModel::new();
    add_listed(session, &mut cart, 0).await?;
    session.open_cart().await?;
    session.start_checkout().await
}

/// Fill every checkout field except `skip`
async fn fill_checkout(session: &Session, skip: Option<CheckoutField>) -> ProbeResult<()> {
    let dispatcher = session.dispatcher();
    for field in CheckoutField::ALL {
        if Some(field) != skip {
            dispatcher.fill(&field.locator(), field.sample()).await?;
        }
    }
    Ok(())
}

async fn checkout_rejected(session: &Session, missing: CheckoutField) -> ProbeResult<()> {
    reach_checkout(session).await?;
    fill_checkout(session, Some(missing)).await?;
    session
        .dispatcher()
        .click(&CheckoutPage::continue_button(), Settle::None)
        .await?;
    session
        .expect()
        .assert_text_equals(&CheckoutPage::error(), missing.required_message())
        .await?;
    Ok(())
}

async fn checkout_completes(session: &Session) -> ProbeResult<()> {
    reach_checkout(session).await?;
    fill_checkout(session, None).await?;
    session
        .click_to(&CheckoutPage::continue_button(), &CheckoutOverviewPage)
        .await?;
    Ok(())
}
