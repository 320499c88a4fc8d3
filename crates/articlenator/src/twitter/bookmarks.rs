//! Bookmark timeline scraping.

use async_trait::async_trait;
use chromiumoxide::Page;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use super::parser::BookmarkParser;
use super::source::{open_home, TWEET_SELECTOR};
use super::types::BookmarkEntry;
use crate::auth::Session;
use crate::browser::{page, ChromePool};
use crate::error::{Error, Result};

const BOOKMARKS_URL: &str = "https://x.com/i/bookmarks";

/// Number of scrolls in a row that may turn up nothing new before stopping.
pub const MAX_EMPTY_SCROLLS: u32 = 3;

const AUTH_CHECK_TIMEOUT: Duration = Duration::from_secs(15);
const SPA_SETTLE: Duration = Duration::from_secs(3);
const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(60);
const TIMELINE_TIMEOUT: Duration = Duration::from_secs(30);
const SCROLL_PIXELS: u32 = 800;
const SCROLL_DELAY: Duration = Duration::from_secs(3);

/// Something that can list the bookmarks of an X account.
#[async_trait]
pub trait BookmarkFeed: Send + Sync {
    /// Send every bookmark to `tx` as soon as it is seen.
    ///
    /// Returns how many distinct bookmarks were sent.
    async fn scrape(&self, session: &Session, tx: mpsc::Sender<BookmarkEntry>) -> Result<usize>;
}

/// Tracks which tweets have been emitted and when the timeline ran dry.
#[derive(Debug, Default)]
pub struct ScrollState {
    seen: HashSet<String>,
    empty_scrolls: u32,
}

impl ScrollState {
    /// Keep only entries not emitted before, and update the dry-scroll count.
    pub fn take_new(&mut self, entries: Vec<BookmarkEntry>) -> Vec<BookmarkEntry> {
        let fresh: Vec<BookmarkEntry> = entries
            .into_iter()
            .filter(|e| self.seen.insert(e.tweet_id.clone()))
            .collect();
        if fresh.is_empty() {
            self.empty_scrolls += 1;
        } else {
            self.empty_scrolls = 0;
        }
        fresh
    }

    /// Whether the timeline has stopped producing new entries.
    #[must_use]
    pub fn exhausted(&self) -> bool {
        self.empty_scrolls >= MAX_EMPTY_SCROLLS
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.seen.len()
    }
}

/// Scrapes `/i/bookmarks` with a pooled headless browser.
pub struct BookmarkScraper {
    pool: Arc<ChromePool>,
    dump_dir: Option<PathBuf>,
}

impl BookmarkScraper {
    #[must_use]
    pub fn new(pool: Arc<ChromePool>, dump_dir: Option<PathBuf>) -> Self {
        Self { pool, dump_dir }
    }

    /// Explain why the home timeline never rendered.
    async fn auth_failure(&self, page: &Page) -> Error {
        let url = page::current_url(page).await.to_lowercase();
        let title = page::title(page).await.to_lowercase();
        let html = page.content().await.unwrap_or_default();
        page::dump_html(self.dump_dir.as_deref(), "bookmarks_auth", &html).await;

        tracing::warn!(url = %url, title = %title, "Home timeline did not load");
        if url.contains("login") || url.contains("flow") || title.contains("log in") {
            Error::Auth(
                "Twitter cookies have expired. Please get fresh cookies from Twitter.".to_string(),
            )
        } else {
            Error::Auth(
                "Could not verify Twitter login. Please check your cookies and try again."
                    .to_string(),
            )
        }
    }

    async fn open_bookmarks(&self, page: &Page) -> Result<bool> {
        page::spa_navigate(page, BOOKMARKS_URL, SPA_SETTLE, NAVIGATION_TIMEOUT).await?;
        if page::wait_for_selector(page, TWEET_SELECTOR, TIMELINE_TIMEOUT).await {
            return Ok(true);
        }

        let html = page.content().await?;
        if BookmarkParser::is_empty_page(&html) {
            tracing::info!("Bookmarks page is empty");
            return Ok(false);
        }
        page::dump_html(self.dump_dir.as_deref(), "bookmarks", &html).await;
        Err(Error::Extraction("Bookmarks page failed to load".to_string()))
    }

    async fn run(&self, page: &Page, authenticated: bool, tx: &mpsc::Sender<BookmarkEntry>) -> Result<usize> {
        if !authenticated {
            return Err(self.auth_failure(page).await);
        }
        if !self.open_bookmarks(page).await? {
            return Ok(0);
        }
        scroll_timeline(page, tx).await
    }
}

/// Emit bookmarks while scrolling until the timeline stops growing.
async fn scroll_timeline(page: &Page, tx: &mpsc::Sender<BookmarkEntry>) -> Result<usize> {
    let mut state = ScrollState::default();
    loop {
        let html = page.content().await?;
        let fresh = state.take_new(BookmarkParser::parse(&html));
        tracing::debug!(new = fresh.len(), total = state.total(), "Scanned bookmarks");

        for entry in fresh {
            if tx.send(entry).await.is_err() {
                tracing::info!(total = state.total(), "Bookmark receiver dropped, stopping");
                return Ok(state.total());
            }
        }
        if state.exhausted() {
            break;
        }

        page::scroll_by(page, SCROLL_PIXELS).await;
        tokio::time::sleep(SCROLL_DELAY).await;
    }
    Ok(state.total())
}

#[async_trait]
impl BookmarkFeed for BookmarkScraper {
    async fn scrape(&self, session: &Session, tx: mpsc::Sender<BookmarkEntry>) -> Result<usize> {
        if session.is_empty() {
            return Err(Error::CookiesRequired);
        }
        tracing::info!("Scraping bookmarks");

        let browser = self.pool.acquire().await?;
        let (page, authenticated) = open_home(&browser, session, AUTH_CHECK_TIMEOUT).await?;
        let result = self.run(&page, authenticated, &tx).await;

        page.close().await;
        match &result {
            Ok(total) => tracing::info!(total, "Bookmark scrape complete"),
            Err(e) => tracing::warn!(error = %e, "Bookmark scrape failed"),
        }
        result
    }
}
