//! Chromium driver over the Chrome `DevTools` Protocol.
//!
//! Elements are addressed by a `data-verifica-id` attribute stamped on them
//! the first time a selector resolves to them. Every CDP call is bounded by
//! the configured action timeout; expiry surfaces as
//! [`VerifyError::DriverTimeout`].

use crate::config::BrowserSettings;
use crate::driver::{ElementHandle, Key, LoadState, PageDriver, SessionProvider};
use crate::locator::Selector;
use crate::result::{VerifyError, VerifyResult};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::input::{DispatchKeyEventParams, DispatchKeyEventType};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::target::{CreateBrowserContextParams, CreateTargetParams};
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// Stamps an element with a stable id and describes it
const DESCRIBE_JS: &str = "(el) => { \
    if (!el.dataset.verificaId) { \
        window.__verificaSeq = (window.__verificaSeq || 0) + 1; \
        el.dataset.verificaId = String(window.__verificaSeq); \
    } \
    const label = (el.getAttribute('aria-label') || el.getAttribute('title') || el.textContent || '') \
        .trim().replace(/\\s+/g, ' ').slice(0, 80); \
    return { id: el.dataset.verificaId, tag: el.tagName.toLowerCase(), label: label || null }; \
}";

#[derive(Debug, Deserialize)]
struct RawElement {
    id: String,
    tag: String,
    label: Option<String>,
}

impl From<RawElement> for ElementHandle {
    fn from(raw: RawElement) -> Self {
        Self {
            id: raw.id,
            tag_name: raw.tag,
            label: raw.label,
        }
    }
}

/// Distinguishes a `null` result from a missing element
#[derive(Debug, Deserialize)]
struct Wrapped<T> {
    v: T,
}

fn by_id(handle: &ElementHandle) -> String {
    format!(
        "document.querySelector('[data-verifica-id=\"{}\"]')",
        handle.id.replace(['"', '\'', '\\'], "")
    )
}

/// Launched Chromium instance
#[derive(Debug)]
pub struct CdpBrowser {
    inner: Arc<Mutex<Browser>>,
    settings: BrowserSettings,
    handler: tokio::task::JoinHandle<()>,
}

impl CdpBrowser {
    /// Launch Chromium
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::BrowserLaunch`] if the browser cannot start.
    pub async fn launch(settings: BrowserSettings) -> VerifyResult<Self> {
        let mut builder = BrowserConfig::builder()
            .window_size(settings.viewport_width, settings.viewport_height)
            .no_sandbox();
        if !settings.headless {
            builder = builder.with_head();
        }
        if let Some(ref path) = settings.chromium_path {
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(|message| VerifyError::BrowserLaunch { message })?;

        let (browser, mut handler) =
            Browser::launch(config)
                .await
                .map_err(|e| VerifyError::BrowserLaunch {
                    message: e.to_string(),
                })?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        debug!(headless = settings.headless, "browser launched");
        Ok(Self {
            inner: Arc::new(Mutex::new(browser)),
            settings,
            handler,
        })
    }

    /// Open a page in a fresh, isolated browser context
    ///
    /// # Errors
    ///
    /// Returns a driver error if the context or page cannot be created.
    pub async fn new_driver(&self) -> VerifyResult<CdpDriver> {
        let mut browser = self.inner.lock().await;
        let context = browser
            .create_browser_context(CreateBrowserContextParams::default())
            .await
            .map_err(|e| VerifyError::driver(format!("create browser context: {e}")))?;
        let params = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context.clone())
            .build()
            .map_err(VerifyError::driver)?;
        let page = browser
            .new_page(params)
            .await
            .map_err(|e| VerifyError::driver(format!("new page: {e}")))?;
        Ok(CdpDriver {
            page: Arc::new(Mutex::new(page)),
            settings: self.settings.clone(),
            browser: Arc::clone(&self.inner),
            context,
        })
    }

    /// Close the browser
    ///
    /// # Errors
    ///
    /// Returns a driver error if the browser does not close cleanly.
    pub async fn close(self) -> VerifyResult<()> {
        let mut browser = self.inner.lock().await;
        browser
            .close()
            .await
            .map_err(|e| VerifyError::driver(format!("close browser: {e}")))?;
        self.handler.abort();
        Ok(())
    }
}

/// [`PageDriver`] backed by one Chromium page
#[derive(Debug)]
pub struct CdpDriver {
    page: Arc<Mutex<Page>>,
    settings: BrowserSettings,
    browser: Arc<Mutex<Browser>>,
    context: BrowserContextId,
}

impl CdpDriver {
    async fn bounded<T, E, F>(&self, operation: &str, ms: u64, fut: F) -> VerifyResult<T>
    where
        F: Future<Output = Result<T, E>> + Send,
        E: std::fmt::Display,
    {
        match tokio::time::timeout(Duration::from_millis(ms), fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(VerifyError::driver(format!("{operation}: {e}"))),
            Err(_) => Err(VerifyError::timeout(operation, ms)),
        }
    }

    /// Evaluate `expr` and decode its JSON value
    async fn eval<T: DeserializeOwned>(&self, operation: &str, expr: &str) -> VerifyResult<T> {
        let script = format!("JSON.stringify(({expr}) ?? null)");
        let page = self.page.lock().await;
        let result = self
            .bounded(operation, self.settings.action_timeout_ms, page.evaluate(script))
            .await?;
        let json: String = result
            .into_value()
            .map_err(|e| VerifyError::driver(format!("{operation}: {e}")))?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Evaluate `body` against the element behind `handle`
    async fn eval_on<T: DeserializeOwned>(
        &self,
        operation: &str,
        handle: &ElementHandle,
        body: &str,
    ) -> VerifyResult<T> {
        let expr = format!(
            "(() => {{ const el = {}; if (!el) return null; return {{ v: ({body}) }}; }})()",
            by_id(handle)
        );
        let wrapped: Option<Wrapped<T>> = self.eval(operation, &expr).await?;
        wrapped
            .map(|w| w.v)
            .ok_or_else(|| VerifyError::ElementNotFound {
                selector: format!("{} (detached)", handle.describe()),
            })
    }

    async fn dispatch_key(&self, kind: DispatchKeyEventType, key: Key) -> VerifyResult<()> {
        let mut builder = DispatchKeyEventParams::builder()
            .r#type(kind.clone())
            .key(key.name())
            .code(key.name())
            .windows_virtual_key_code(key.key_code())
            .native_virtual_key_code(key.key_code());
        if key == Key::Enter && kind == DispatchKeyEventType::KeyDown {
            builder = builder.text("\r");
        }
        let params = builder.build().map_err(VerifyError::driver)?;
        let page = self.page.lock().await;
        let operation = format!("press {}", key.name());
        self.bounded(&operation, self.settings.action_timeout_ms, page.execute(params))
            .await?;
        Ok(())
    }

    async fn ready_state(&self) -> VerifyResult<(String, u64)> {
        self.eval(
            "read load state",
            "[document.readyState, performance.getEntriesByType('resource').length]",
        )
        .await
    }
}

#[async_trait]
impl PageDriver for CdpDriver {
    async fn navigate(&mut self, url: &str) -> VerifyResult<()> {
        let page = self.page.lock().await;
        let ms = self.settings.navigation_timeout_ms;
        match tokio::time::timeout(Duration::from_millis(ms), page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(VerifyError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            }),
            Err(_) => Err(VerifyError::timeout(format!("navigate to {url}"), ms)),
        }
    }

    async fn wait_for_load_state(&mut self, state: LoadState) -> VerifyResult<()> {
        let start = Instant::now();
        let limit = Duration::from_millis(self.settings.navigation_timeout_ms);
        let idle = Duration::from_millis(self.settings.network_idle_ms);
        let mut last_count = None;
        let mut quiet_since = Instant::now();

        loop {
            let (ready, resources) = self.ready_state().await?;
            let reached = match state {
                LoadState::DomContentLoaded => ready != "loading",
                LoadState::Load => ready == "complete",
                LoadState::NetworkIdle => {
                    if last_count != Some(resources) {
                        last_count = Some(resources);
                        quiet_since = Instant::now();
                    }
                    ready == "complete" && quiet_since.elapsed() >= idle
                }
            };
            if reached {
                debug!(%state, elapsed_ms = start.elapsed().as_millis() as u64, "load state reached");
                return Ok(());
            }
            if start.elapsed() >= limit {
                return Err(VerifyError::timeout(
                    format!("wait for {state}"),
                    self.settings.navigation_timeout_ms,
                ));
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    async fn locate(&mut self, selector: &Selector) -> VerifyResult<ElementHandle> {
        let expr = format!(
            "(() => {{ const el = {}; return el ? ({DESCRIBE_JS})(el) : null; }})()",
            selector.to_query()
        );
        let raw: Option<RawElement> = self.eval(&format!("locate {selector}"), &expr).await?;
        raw.map(ElementHandle::from)
            .ok_or_else(|| VerifyError::ElementNotFound {
                selector: selector.to_string(),
            })
    }

    async fn count(&mut self, selector: &Selector) -> VerifyResult<usize> {
        self.eval(&format!("count {selector}"), &selector.to_count_query())
            .await
    }

    async fn click(&mut self, handle: &ElementHandle) -> VerifyResult<()> {
        let css = format!("[data-verifica-id=\"{}\"]", handle.id);
        let operation = format!("click {}", handle.describe());
        let page = self.page.lock().await;
        let element = page
            .find_element(css.as_str())
            .await
            .map_err(|_| VerifyError::ElementNotFound {
                selector: handle.describe(),
            })?;
        self.bounded(&operation, self.settings.action_timeout_ms, element.click())
            .await?;
        Ok(())
    }

    async fn type_text(&mut self, handle: &ElementHandle, text: &str) -> VerifyResult<()> {
        let css = format!("[data-verifica-id=\"{}\"]", handle.id);
        let operation = format!("type into {}", handle.describe());
        let page = self.page.lock().await;
        let element = page
            .find_element(css.as_str())
            .await
            .map_err(|_| VerifyError::ElementNotFound {
                selector: handle.describe(),
            })?;
        self.bounded(&operation, self.settings.action_timeout_ms, element.focus())
            .await?;
        self.bounded(&operation, self.settings.action_timeout_ms, element.type_str(text))
            .await?;
        Ok(())
    }

    async fn press_key(&mut self, key: Key) -> VerifyResult<()> {
        self.dispatch_key(DispatchKeyEventType::KeyDown, key).await?;
        self.dispatch_key(DispatchKeyEventType::KeyUp, key).await
    }

    async fn is_visible(&mut self, handle: &ElementHandle) -> VerifyResult<bool> {
        self.eval_on(
            "is_visible",
            handle,
            "(() => { const s = getComputedStyle(el); const r = el.getBoundingClientRect(); \
             return s.visibility !== 'hidden' && s.display !== 'none' && r.width > 0 && r.height > 0; })()",
        )
        .await
    }

    async fn class_name(&mut self, handle: &ElementHandle) -> VerifyResult<String> {
        self.eval_on("class_name", handle, "el.getAttribute('class') || ''")
            .await
    }

    async fn text_content(&mut self, handle: &ElementHandle) -> VerifyResult<String> {
        self.eval_on("text_content", handle, "el.textContent || ''")
            .await
    }

    async fn is_focused(&mut self, handle: &ElementHandle) -> VerifyResult<bool> {
        self.eval_on("is_focused", handle, "document.activeElement === el")
            .await
    }

    async fn focused_element(&mut self) -> VerifyResult<Option<ElementHandle>> {
        let expr = format!(
            "(() => {{ const el = document.activeElement; \
             if (!el || el === document.body || el === document.documentElement) return null; \
             return ({DESCRIBE_JS})(el); }})()"
        );
        let raw: Option<RawElement> = self.eval("focused_element", &expr).await?;
        Ok(raw.map(ElementHandle::from))
    }

    async fn wait_idle(&mut self, duration: Duration) -> VerifyResult<()> {
        tokio::time::sleep(duration).await;
        Ok(())
    }

    async fn close(&mut self) -> VerifyResult<()> {
        let page = self.page.lock().await.clone();
        let ms = self.settings.action_timeout_ms;
        self.bounded("close page", ms, page.close()).await?;
        let browser = self.browser.lock().await;
        self.bounded(
            "dispose browser context",
            ms,
            browser.dispose_browser_context(self.context.clone()),
        )
        .await?;
        debug!("session closed");
        Ok(())
    }
}

/// Opens one isolated browser context per scenario
#[derive(Debug, Clone)]
pub struct CdpSessions {
    browser: Arc<CdpBrowser>,
}

impl CdpSessions {
    /// Share a launched browser
    #[must_use]
    pub fn new(browser: Arc<CdpBrowser>) -> Self {
        Self { browser }
    }
}

#[async_trait]
impl SessionProvider for CdpSessions {
    async fn open(&mut self) -> VerifyResult<Box<dyn PageDriver>> {
        Ok(Box::new(self.browser.new_driver().await?))
    }
}
