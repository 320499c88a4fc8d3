//! Headless Chrome via chromiumoxide.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetTimezoneOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::{CookieParam, SetUserAgentOverrideParams};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::Page;
use futures::StreamExt;
use rand::Rng;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;

use super::pool::{BrowserLauncher, BrowserPool};
use super::tab::TabGuard;
use crate::auth::Session;
use crate::error::{Error, Result};

/// Script injected into every page before site scripts run.
///
/// Hides the usual automation tells: `navigator.webdriver`, empty plugin and
/// language lists, missing `chrome.runtime`, and the SwiftShader WebGL vendor.
pub const STEALTH_SCRIPT: &str = include_str!("stealth.js");

/// Desktop Chrome user agent presented to sites.
pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const TIMEZONE: &str = "America/Los_Angeles";

/// Domains the X session cookies are installed for.
const COOKIE_DOMAINS: [&str; 2] = [".x.com", ".twitter.com"];

/// Pool of headless Chrome instances.
pub type ChromePool = BrowserPool<ChromeLauncher>;

/// Launches headless Chrome with anti-automation flags.
#[derive(Debug, Clone, Default)]
pub struct ChromeLauncher {
    chrome_path: Option<PathBuf>,
}

impl ChromeLauncher {
    #[must_use]
    pub fn new(chrome_path: Option<PathBuf>) -> Self {
        Self { chrome_path }
    }

    /// Build a pool of at most `max_browsers` Chrome instances.
    #[must_use]
    pub fn pool(self, max_browsers: usize) -> Arc<ChromePool> {
        BrowserPool::new(self, max_browsers)
    }
}

/// A running Chrome process and the task driving its CDP connection.
pub struct ChromeBrowser {
    browser: Browser,
    handler: JoinHandle<()>,
}

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    type Browser = ChromeBrowser;

    async fn launch(&self) -> Result<ChromeBrowser> {
        let (width, height) = window_size();
        let mut builder = BrowserConfig::builder()
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage") // Avoid /dev/shm size issues in containers
            .arg("--no-sandbox") // Required for containerized environments
            .window_size(width, height);
        if let Some(path) = &self.chrome_path {
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(|e| Error::Browser(format!("Failed to build browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config).await?;

        let handle = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        tracing::info!(width, height, "Launched headless Chrome");
        Ok(ChromeBrowser {
            browser,
            handler: handle,
        })
    }

    fn is_alive(&self, browser: &ChromeBrowser) -> bool {
        !browser.handler.is_finished()
    }

    async fn close(&self, mut browser: ChromeBrowser) {
        if let Err(e) = browser.browser.close().await {
            tracing::debug!(error = %e, "Browser close failed");
        }
        browser.handler.abort();
    }
}

impl ChromeBrowser {
    /// Open a blank page with the stealth script, user agent, timezone, and
    /// (when given) the X session cookies installed.
    ///
    /// The tab is closed when the returned guard drops.
    pub async fn open_page(&self, session: Option<&Session>) -> Result<TabGuard<Page>> {
        let page = TabGuard::new(self.browser.new_page("about:blank").await?);

        let user_agent = SetUserAgentOverrideParams::builder()
            .user_agent(USER_AGENT)
            .accept_language("en-US,en")
            .build()
            .map_err(Error::Browser)?;
        page.set_user_agent(user_agent).await?;
        page.evaluate_on_new_document(AddScriptToEvaluateOnNewDocumentParams::new(STEALTH_SCRIPT))
            .await?;
        page.execute(SetTimezoneOverrideParams::new(TIMEZONE)).await?;

        if let Some(session) = session {
            let cookies = session_cookies(session)?;
            tracing::debug!(count = cookies.len(), "Setting X session cookies");
            page.set_cookies(cookies).await?;
        }

        Ok(page)
    }

    /// Open a blank page with no session, for rendering local HTML.
    pub async fn blank_page(&self) -> Result<TabGuard<Page>> {
        Ok(TabGuard::new(self.browser.new_page("about:blank").await?))
    }
}

/// Cookie params for every session cookie on every X domain.
pub fn session_cookies(session: &Session) -> Result<Vec<CookieParam>> {
    let mut params = Vec::with_capacity(session.pairs().len() * COOKIE_DOMAINS.len());
    for (name, value) in session.pairs() {
        for domain in COOKIE_DOMAINS {
            let cookie = CookieParam::builder()
                .name(name.as_str())
                .value(value.as_str())
                .domain(domain)
                .path("/")
                .secure(true)
                .http_only(name == "auth_token")
                .build()
                .map_err(|e| Error::Browser(format!("Failed to build {name} cookie: {e}")))?;
            params.push(cookie);
        }
    }
    Ok(params)
}

/// Window size jittered around 1920x1080 so every launch looks a little different.
fn window_size() -> (u32, u32) {
    let mut rng = rand::thread_rng();
    (rng.gen_range(1820..=2020), rng.gen_range(1030..=1130))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stealth_script_covers_fingerprints() {
        for needle in [
            "webdriver",
            "plugins",
            "languages",
            "chrome.runtime",
            "WebGL",
            "Intel",
        ] {
            assert!(STEALTH_SCRIPT.contains(needle), "missing {needle}");
        }
    }

    #[test]
    fn test_window_size_jitter_bounds() {
        for _ in 0..50 {
            let (w, h) = window_size();
            assert!((1820..=2020).contains(&w));
            assert!((1030..=1130).contains(&h));
        }
    }

    #[test]
    fn test_session_cookies_cover_both_domains() {
        let session = Session::parse("auth_token=abc; ct0=def");
        let cookies = session_cookies(&session).unwrap();
        assert_eq!(cookies.len(), 4);

        let domains: Vec<_> = cookies.iter().filter_map(|c| c.domain.clone()).collect();
        assert!(domains.iter().any(|d| d == ".x.com"));
        assert!(domains.iter().any(|d| d == ".twitter.com"));

        let auth = cookies.iter().find(|c| c.name == "auth_token").unwrap();
        assert_eq!(auth.http_only, Some(true));
        let ct0 = cookies.iter().find(|c| c.name == "ct0").unwrap();
        assert_eq!(ct0.http_only, Some(false));
    }

    #[test]
    fn test_user_agent_is_desktop_chrome() {
        assert!(USER_AGENT.contains("Chrome/120"));
        assert!(USER_AGENT.contains("Macintosh"));
    }
}
