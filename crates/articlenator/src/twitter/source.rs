//! Fetching tweets and X articles through a logged-in headless browser.

use async_trait::async_trait;
use chromiumoxide::Page;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::article::tweet_to_article;
use super::parser::{canonical_status_url, is_status_url, parse_status_url, TweetParser};
use crate::auth::Session;
use crate::browser::{page, ChromeBrowser, ChromePool, TabGuard};
use crate::error::{Error, Result};
use crate::sources::{Article, ContentSource};

pub(super) const HOME_URL: &str = "https://x.com/home";
pub(super) const TWEET_SELECTOR: &str = "[data-testid=\"tweet\"]";

const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(60);
const HOME_SETTLE: Duration = Duration::from_secs(3);
const AUTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);
const SPA_SETTLE: Duration = Duration::from_secs(2);
const CONTENT_TIMEOUT: Duration = Duration::from_secs(30);
const CONTENT_POLL: Duration = Duration::from_millis(500);
const REPLY_SCROLLS: usize = 5;
const SCROLL_PIXELS: u32 = 800;
const SCROLL_PAUSE: Duration = Duration::from_secs(1);

/// Opens the X home timeline and reports whether the session is logged in.
///
/// X only lets deep links render reliably after the home timeline has loaded,
/// so every browser visit starts here.
pub(super) async fn open_home(
    browser: &ChromeBrowser,
    session: &Session,
    auth_timeout: Duration,
) -> Result<(TabGuard<Page>, bool)> {
    let page = browser.open_page(Some(session)).await?;
    page::goto(&page, HOME_URL, NAVIGATION_TIMEOUT).await?;
    tokio::time::sleep(HOME_SETTLE).await;

    let authenticated = page::wait_for_selector(&page, TWEET_SELECTOR, auth_timeout).await;
    let url = page::current_url(&page).await;
    tracing::info!(
        authenticated,
        url = %url,
        "Loaded X home timeline"
    );
    Ok((page, authenticated))
}

/// Content source for `twitter.com` and `x.com` status links.
pub struct TwitterSource {
    pool: Arc<ChromePool>,
    dump_dir: Option<PathBuf>,
}

impl TwitterSource {
    #[must_use]
    pub fn new(pool: Arc<ChromePool>, dump_dir: Option<PathBuf>) -> Self {
        Self { pool, dump_dir }
    }

    async fn extract(&self, page: &Page, url: &str, authenticated: bool) -> Result<Article> {
        let (username, tweet_id) =
            parse_status_url(url).ok_or_else(|| Error::UnsupportedUrl(url.to_string()))?;

        let target = canonical_status_url(&username, &tweet_id);
        tracing::debug!(target = %target, "Opening status page");
        page::spa_navigate(page, &target, SPA_SETTLE, NAVIGATION_TIMEOUT).await?;

        let Some(mut snapshot) = wait_for_content(page).await else {
            let html = page.content().await.unwrap_or_default();
            page::dump_html(self.dump_dir.as_deref(), &format!("tweet_{tweet_id}"), &html).await;
            let landed = page::current_url(page).await;
            let title = page::title(page).await;
            tracing::warn!(
                url,
                landed = %landed,
                title = %title,
                "Tweet content never rendered"
            );
            return Err(Error::Extraction(format!(
                "Tweet content did not load for {url}"
            )));
        };

        // Replies only render for logged-in sessions and never under articles.
        if authenticated && !TweetParser::parse(&snapshot, &username, false).is_article {
            for _ in 0..REPLY_SCROLLS {
                page::scroll_by(page, SCROLL_PIXELS).await;
                tokio::time::sleep(SCROLL_PAUSE).await;
            }
            snapshot = page.content().await?;
        }

        let data = TweetParser::parse(&snapshot, &username, authenticated);
        Ok(tweet_to_article(&data, url))
    }
}

/// Polls the page until tweet text or an article body renders.
async fn wait_for_content(page: &Page) -> Option<String> {
    let deadline = Instant::now() + CONTENT_TIMEOUT;
    loop {
        match page.content().await {
            Ok(html) if TweetParser::has_content(&html) => return Some(html),
            Ok(_) => {}
            Err(e) => tracing::debug!(error = %e, "Snapshot failed while waiting for tweet"),
        }
        if Instant::now() >= deadline {
            return None;
        }
        tokio::time::sleep(CONTENT_POLL).await;
    }
}

#[async_trait]
impl ContentSource for TwitterSource {
    fn name(&self) -> &'static str {
        "twitter"
    }

    fn can_handle(&self, url: &str) -> bool {
        is_status_url(url)
    }

    fn requires_cookies(&self) -> bool {
        true
    }

    async fn fetch(&self, url: &str, session: Option<&Session>) -> Result<Article> {
        let session = session.filter(|s| !s.is_empty()).ok_or(Error::CookiesRequired)?;
        tracing::info!(url, "Fetching tweet");

        let browser = self.pool.acquire().await?;
        let (page, authenticated) = open_home(&browser, session, AUTH_CHECK_TIMEOUT).await?;
        if !authenticated {
            tracing::warn!(url, "Session not authenticated, replies will be skipped");
        }

        let result = self.extract(&page, url, authenticated).await;

        page.close().await;

        match &result {
            Ok(article) => tracing::info!(
                url,
                title = %article.title,
                source_type = %article.source_type,
                content_length = article.content.len(),
                "Fetched tweet"
            ),
            Err(e) => tracing::warn!(url, error = %e, "Tweet fetch failed"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::ChromeLauncher;

    fn source() -> TwitterSource {
        TwitterSource::new(ChromeLauncher::default().pool(1), None)
    }

    #[test]
    fn test_can_handle_status_links() {
        let source = source();
        assert!(source.can_handle("https://x.com/rustlang/status/123"));
        assert!(source.can_handle("https://twitter.com/rustlang/status/123?s=20"));
        assert!(source.can_handle("http://www.x.com/rustlang/status/1"));
        assert!(!source.can_handle("https://x.com/rustlang"));
        assert!(!source.can_handle("https://example.com/rustlang/status/1"));
        assert!(source.requires_cookies());
        assert_eq!(source.name(), "twitter");
    }

    #[tokio::test]
    async fn test_fetch_without_cookies() {
        let source = source();
        let err = source
            .fetch("https://x.com/rustlang/status/1", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CookiesRequired));

        let empty = Session::parse("");
        let err = source
            .fetch("https://x.com/rustlang/status/1", Some(&empty))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CookiesRequired));
    }
}
