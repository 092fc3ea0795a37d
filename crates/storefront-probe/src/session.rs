//! One logged-in (or about to log in) browsing session.
//!
//! A session owns its driver and the configuration it was opened with, and
//! hands out dispatchers and expectations bound to that driver. Navigation
//! helpers wait for the destination page's URL and landmark, so a scenario
//! step never starts on a half-loaded page.

use crate::action::{ActionReport, Dispatcher, Settle};
use crate::assertion::Expect;
use crate::config::ProbeConfig;
use crate::driver::PageDriver;
use crate::locator::Locator;
use crate::result::ProbeResult;
use crate::storefront::{
    page_url, CartPage, CheckoutPage, DetailsPage, Header, InventoryPage, LoginPage, PageObject,
};
use crate::url::UrlPattern;
use std::fmt;

/// A browsing session against the storefront
pub struct Session {
    driver: Box<dyn PageDriver>,
    config: ProbeConfig,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Navigate `driver` to the storefront and wait for the login form
    pub async fn open(driver: Box<dyn PageDriver>, config: ProbeConfig) -> ProbeResult<Self> {
        driver.goto(&config.base_url).await?;
        let session = Self { driver, config };
        session.expect_page(&LoginPage).await?;
        tracing::debug!(base_url = %session.config.base_url, "session opened");
        Ok(session)
    }

    /// The driven page
    #[must_use]
    pub fn driver(&self) -> &dyn PageDriver {
        self.driver.as_ref()
    }

    /// Configuration the session was opened with
    #[must_use]
    pub const fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Dispatcher bound to this session's page and wait options
    #[must_use]
    pub fn dispatcher(&self) -> Dispatcher<'_> {
        Dispatcher::new(self.driver(), self.config.wait)
    }

    /// Assertions bound to this session's page and wait options
    #[must_use]
    pub fn expect(&self) -> Expect<'_> {
        Expect::new(self.driver(), self.config.wait)
    }

    /// Where `page` lives under the configured base URL
    #[must_use]
    pub fn url_of(&self, page: &dyn PageObject) -> UrlPattern {
        page.url_pattern(&self.config.base_url)
    }

    /// Wait until `page` is shown: its URL matches and its landmark is visible
    pub async fn expect_page(&self, page: &dyn PageObject) -> ProbeResult<()> {
        let expect = self.expect();
        expect.assert_url(&self.url_of(page)).await?;
        expect.assert_visible(&page.landmark()).await?;
        tracing::debug!(page = page.page_name(), "page shown");
        Ok(())
    }

    /// Navigate straight to `page` and wait until it is shown
    pub async fn visit(&self, page: &dyn PageObject) -> ProbeResult<()> {
        self.driver
            .goto(&page_url(&self.config.base_url, page.path()))
            .await?;
        self.expect_page(page).await
    }

    /// Fill whichever credentials are given and press the login button.
    ///
    /// Does not wait for any outcome; callers assert the error message or
    /// the listing themselves.
    pub async fn submit_login(&self, username: Option<&str>, password: Option<&str>) -> ProbeResult<()> {
        let dispatcher = self.dispatcher();
        if let Some(username) = username {
            dispatcher.fill(&LoginPage::username(), username).await?;
        }
        if let Some(password) = password {
            dispatcher.fill(&LoginPage::password(), password).await?;
        }
        dispatcher.click(&LoginPage::submit(), Settle::None).await?;
        Ok(())
    }

    /// Log in as `username` and wait for the listing
    pub async fn login_as(&self, username: &str, password: &str) -> ProbeResult<()> {
        let dispatcher = self.dispatcher();
        dispatcher.fill(&LoginPage::username(), username).await?;
        dispatcher.fill(&LoginPage::password(), password).await?;
        dispatcher
            .click(&LoginPage::submit(), Settle::UrlIs(self.url_of(&InventoryPage)))
            .await?;
        self.expect_page(&InventoryPage).await?;
        tracing::info!(username, "logged in");
        Ok(())
    }

    /// Log in with the configured account
    pub async fn login(&self) -> ProbeResult<()> {
        let credentials = &self.config.credentials;
        self.login_as(&credentials.username, &credentials.password)
            .await
    }

    /// Click `locator` and wait until `page` is shown
    pub async fn click_to(&self, locator: &Locator, page: &dyn PageObject) -> ProbeResult<ActionReport> {
        let report = self
            .dispatcher()
            .click(locator, Settle::UrlIs(self.url_of(page)))
            .await?;
        self.expect_page(page).await?;
        Ok(report)
    }

    /// Open the cart from the header
    pub async fn open_cart(&self) -> ProbeResult<()> {
        self.click_to(&Header::cart_link(), &CartPage).await.map(|_| ())
    }

    /// Leave the cart for the listing
    pub async fn continue_shopping(&self) -> ProbeResult<()> {
        self.click_to(&CartPage::continue_shopping(), &InventoryPage)
            .await
            .map(|_| ())
    }

    /// Leave the cart for checkout step one
    pub async fn start_checkout(&self) -> ProbeResult<()> {
        self.click_to(&CartPage::checkout(), &CheckoutPage).await.map(|_| ())
    }

    /// Open the details page of the product `link` points at
    pub async fn open_details(&self, link: &Locator) -> ProbeResult<()> {
        self.click_to(link, &DetailsPage).await.map(|_| ())
    }

    /// Release the page
    pub async fn close(self) -> ProbeResult<()> {
        self.driver.close().await
    }
}
