//! Browser control for live runs.
//!
//! Rust-native CDP (Chrome `DevTools` Protocol) control of a Chromium page.
//! When compiled with the `browser` feature, [`ChromiumDriver`] implements
//! [`PageDriver`](crate::PageDriver) on top of chromiumoxide. Without the
//! feature only the configuration is available, and the engine runs against
//! [`MockPage`](crate::mock::MockPage).

use serde::{Deserialize, Serialize};

/// Browser configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// User agent string
    pub user_agent: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            chromium_path: None,
            user_agent: None,
            sandbox: true,
        }
    }
}

impl BrowserConfig {
    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Set user agent
    #[must_use]
    pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

#[cfg(feature = "browser")]
pub use cdp::{ChromiumDriver, ChromiumPopupListener};

// ============================================================================
// Real CDP Implementation (when `browser` feature is enabled)
// ============================================================================

#[cfg(feature = "browser")]
#[allow(
    clippy::significant_drop_tightening,
    clippy::missing_errors_doc,
    clippy::items_after_statements
)]
mod cdp {
    use super::BrowserConfig;
    use crate::driver::{ElementHandle, PageDriver, PopupListener};
    use crate::locator::Selector;
    use crate::result::{ProbeError, ProbeResult};
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
    use chromiumoxide::cdp::browser_protocol::target::{EventTargetCreated, TargetId};
    use chromiumoxide::listeners::EventStream;
    use chromiumoxide::page::Page as CdpPage;
    use futures::{FutureExt, StreamExt};
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Mutex;

    /// Attribute the collector stamps on every match so a handle can be
    /// found again by CSS.
    const HANDLE_ATTRIBUTE: &str = "data-probe-handle";

    /// Browser process shared by a page and its popups
    #[derive(Debug)]
    struct BrowserSession {
        inner: Mutex<CdpBrowser>,
        handle: tokio::task::JoinHandle<()>,
    }

    /// One Chromium page driven over CDP
    #[derive(Debug)]
    pub struct ChromiumDriver {
        page: CdpPage,
        session: Arc<BrowserSession>,
        navigation_timeout: Duration,
        /// The page that launched the browser owns its shutdown
        owns_browser: bool,
    }

    impl ChromiumDriver {
        /// Launch a browser and open a blank page in it
        pub async fn launch(config: &BrowserConfig, navigation_timeout: Duration) -> ProbeResult<Self> {
            let mut builder = CdpConfig::builder()
                .window_size(config.viewport_width, config.viewport_height)
                .request_timeout(navigation_timeout);

            if !config.headless {
                builder = builder.with_head();
            }

            if !config.sandbox {
                builder = builder.no_sandbox();
            }

            if let Some(ref path) = config.chromium_path {
                builder = builder.chrome_executable(path);
            }

            if let Some(ref ua) = config.user_agent {
                builder = builder.arg(format!("--user-agent={ua}"));
            }

            let cdp_config = builder
                .build()
                .map_err(|message| ProbeError::BrowserLaunch { message })?;

            let (browser, mut handler) = CdpBrowser::launch(cdp_config)
                .await
                .map_err(|e| ProbeError::BrowserLaunch {
                    message: e.to_string(),
                })?;

            let handle = tokio::spawn(async move {
                while let Some(h) = handler.next().await {
                    if h.is_err() {
                        break;
                    }
                }
            });

            let page = browser
                .new_page("about:blank")
                .await
                .map_err(|e| ProbeError::BrowserLaunch {
                    message: e.to_string(),
                })?;
            tracing::info!(headless = config.headless, "browser launched");

            Ok(Self {
                page,
                session: Arc::new(BrowserSession {
                    inner: Mutex::new(browser),
                    handle,
                }),
                navigation_timeout,
                owns_browser: true,
            })
        }

        fn popup(&self, page: CdpPage) -> Self {
            Self {
                page,
                session: Arc::clone(&self.session),
                navigation_timeout: self.navigation_timeout,
                owns_browser: false,
            }
        }

        async fn evaluate<T: serde::de::DeserializeOwned>(&self, script: String) -> ProbeResult<T> {
            let result = self
                .page
                .evaluate(script)
                .await
                .map_err(|e| ProbeError::Evaluation {
                    message: e.to_string(),
                })?;
            result.into_value().map_err(|e| ProbeError::Evaluation {
                message: e.to_string(),
            })
        }

        /// Run `body` against the element carrying `handle`, or report it stale
        async fn with_element(&self, element: &ElementHandle, body: &str) -> ProbeResult<String> {
            let script = format!(
                "(() => {{ const el = document.querySelector({}); \
                 if (!el) return 'stale'; {body} }})()",
                js_str(&handle_css(&element.id))
            );
            let status: String = self.evaluate(script).await?;
            if status == "stale" {
                return Err(ProbeError::StaleElement {
                    handle: element.id.clone(),
                });
            }
            Ok(status)
        }
    }

    fn handle_css(id: &str) -> String {
        format!("[{HANDLE_ATTRIBUTE}=\"{id}\"]")
    }

    fn js_str(value: &str) -> String {
        serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
    }

    /// Wrap a collector so each match is stamped and serialized as an
    /// [`ElementHandle`].
    fn handle_script(collector: &str, token: &str) -> String {
        format!(
            r"(() => {{
  const norm = s => (s || '').replace(/\s+/g, ' ').trim();
  const nodes = {collector};
  return nodes.map((el, i) => {{
    const id = {token} + ':' + i;
    el.setAttribute('{HANDLE_ATTRIBUTE}', id);
    const style = window.getComputedStyle(el);
    const visible = style.visibility !== 'hidden' && style.display !== 'none' &&
      !!(el.offsetWidth || el.offsetHeight || el.getClientRects().length);
    const attributes = {{}};
    for (const a of el.attributes) {{
      if (a.name !== '{HANDLE_ATTRIBUTE}') attributes[a.name] = a.value;
    }}
    let value = null;
    if (el.tagName === 'SELECT') {{
      const opt = el.options[el.selectedIndex];
      value = opt ? norm(opt.textContent) : '';
    }} else if (el.tagName === 'INPUT' || el.tagName === 'TEXTAREA') {{
      value = el.value;
    }}
    return {{ id, tag_name: el.tagName.toLowerCase(), text_content: norm(el.textContent),
      visible, value, attributes }};
  }});
}})()",
            token = js_str(token)
        )
    }

    const FILL_BODY: &str = "const proto = el.tagName === 'TEXTAREA' ? \
        HTMLTextAreaElement.prototype : HTMLInputElement.prototype; \
        const setter = Object.getOwnPropertyDescriptor(proto, 'value').set; \
        el.focus(); setter.call(el, __TEXT__); \
        el.dispatchEvent(new Event('input', { bubbles: true })); \
        el.dispatchEvent(new Event('change', { bubbles: true })); \
        return 'ok';";

    const SELECT_BODY: &str = "if (el.tagName !== 'SELECT') return 'not-select'; \
        const norm = s => (s || '').replace(/\\s+/g, ' ').trim(); \
        const opt = Array.from(el.options).find(o => norm(o.textContent) === __TEXT__); \
        if (!opt) return 'no-option'; \
        const setter = Object.getOwnPropertyDescriptor(HTMLSelectElement.prototype, 'value').set; \
        setter.call(el, opt.value); \
        el.dispatchEvent(new Event('input', { bubbles: true })); \
        el.dispatchEvent(new Event('change', { bubbles: true })); \
        return 'ok';";

    #[async_trait]
    impl PageDriver for ChromiumDriver {
        async fn goto(&self, url: &str) -> ProbeResult<()> {
            let navigation = self.page.goto(url);
            match tokio::time::timeout(self.navigation_timeout, navigation).await {
                Ok(Ok(_)) => {
                    tracing::debug!(url, "navigated");
                    Ok(())
                }
                Ok(Err(e)) => Err(ProbeError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                }),
                Err(_) => Err(ProbeError::Navigation {
                    url: url.to_string(),
                    message: format!("no load within {}ms", self.navigation_timeout.as_millis()),
                }),
            }
        }

        async fn current_url(&self) -> ProbeResult<String> {
            let url = self.page.url().await.map_err(|e| ProbeError::Evaluation {
                message: e.to_string(),
            })?;
            Ok(url.unwrap_or_default())
        }

        async fn query_all(&self, selector: &Selector) -> ProbeResult<Vec<ElementHandle>> {
            let token = uuid::Uuid::new_v4().to_string();
            let script = handle_script(&selector.to_js_collector("document", 0), &token);
            let handles: Vec<ElementHandle> = self.evaluate(script).await?;
            tracing::trace!(selector = %selector, matches = handles.len(), "queried");
            Ok(handles)
        }

        async fn click(&self, element: &ElementHandle) -> ProbeResult<()> {
            let found = self
                .page
                .find_element(handle_css(&element.id))
                .await
                .map_err(|_| ProbeError::StaleElement {
                    handle: element.id.clone(),
                })?;
            found.click().await.map_err(|e| ProbeError::Evaluation {
                message: e.to_string(),
            })?;
            Ok(())
        }

        async fn fill(&self, element: &ElementHandle, text: &str) -> ProbeResult<()> {
            let body = FILL_BODY.replace("__TEXT__", &js_str(text));
            self.with_element(element, &body).await?;
            Ok(())
        }

        async fn select_option(&self, element: &ElementHandle, label: &str) -> ProbeResult<()> {
            let body = SELECT_BODY.replace("__TEXT__", &js_str(label));
            match self.with_element(element, &body).await?.as_str() {
                "ok" => Ok(()),
                "no-option" => Err(ProbeError::page(format!(
                    "{} has no option labelled {label:?}",
                    element.describe()
                ))),
                _ => Err(ProbeError::page(format!(
                    "cannot select an option on {}",
                    element.describe()
                ))),
            }
        }

        async fn arm_popup_listener(&self) -> ProbeResult<Box<dyn PopupListener>> {
            let events = self
                .session
                .inner
                .lock()
                .await
                .event_listener::<EventTargetCreated>()
                .await
                .map_err(|e| ProbeError::ConnectionClosed {
                    message: e.to_string(),
                })?;
            Ok(Box::new(ChromiumPopupListener {
                opener: self.page.target_id().clone(),
                events: std::sync::Mutex::new(events),
                pending: std::sync::Mutex::new(VecDeque::new()),
                parent: self.popup(self.page.clone()),
            }))
        }

        async fn close(&self) -> ProbeResult<()> {
            if self.owns_browser {
                let mut browser = self.session.inner.lock().await;
                browser.close().await.map_err(|e| ProbeError::ConnectionClosed {
                    message: e.to_string(),
                })?;
                if let Err(e) = browser.wait().await {
                    tracing::warn!(error = %e, "browser process did not exit cleanly");
                }
                self.session.handle.abort();
                tracing::info!("browser closed");
                Ok(())
            } else {
                self.page
                    .clone()
                    .close()
                    .await
                    .map_err(|e| ProbeError::page(e.to_string()))
            }
        }
    }

    /// Popup listener over CDP `Target.targetCreated` events
    pub struct ChromiumPopupListener {
        opener: TargetId,
        events: std::sync::Mutex<EventStream<EventTargetCreated>>,
        pending: std::sync::Mutex<VecDeque<TargetId>>,
        parent: ChromiumDriver,
    }

    impl std::fmt::Debug for ChromiumPopupListener {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("ChromiumPopupListener")
                .field("opener", &self.opener)
                .finish_non_exhaustive()
        }
    }

    impl ChromiumPopupListener {
        /// Move already-delivered events into the pending queue
        fn drain_events(&self) -> ProbeResult<()> {
            let mut events = self
                .events
                .lock()
                .map_err(|_| ProbeError::page("popup listener poisoned"))?;
            let mut pending = self
                .pending
                .lock()
                .map_err(|_| ProbeError::page("popup listener poisoned"))?;
            while let Some(Some(event)) = events.next().now_or_never() {
                let info = &event.target_info;
                if info.r#type == "page" && info.opener_id.as_ref() == Some(&self.opener) {
                    tracing::debug!(url = %info.url, "popup target created");
                    pending.push_back(info.target_id.clone());
                }
            }
            Ok(())
        }

        fn front(&self) -> ProbeResult<Option<TargetId>> {
            Ok(self
                .pending
                .lock()
                .map_err(|_| ProbeError::page("popup listener poisoned"))?
                .front()
                .cloned())
        }

        fn pop(&self) {
            if let Ok(mut pending) = self.pending.lock() {
                let _ = pending.pop_front();
            }
        }
    }

    #[async_trait]
    impl PopupListener for ChromiumPopupListener {
        async fn try_next(&self) -> ProbeResult<Option<Box<dyn PageDriver>>> {
            self.drain_events()?;
            let Some(target) = self.front()? else {
                return Ok(None);
            };
            // The handler attaches to new targets asynchronously; until it
            // has, the page is not listed and the wait engine polls again.
            let pages = self
                .parent
                .session
                .inner
                .lock()
                .await
                .pages()
                .await
                .map_err(|e| ProbeError::Evaluation {
                    message: e.to_string(),
                })?;
            Ok(pages
                .into_iter()
                .find(|p| p.target_id() == &target)
                .map(|page| {
                    self.pop();
                    Box::new(self.parent.popup(page)) as Box<dyn PageDriver>
                }))
        }
    }

}
