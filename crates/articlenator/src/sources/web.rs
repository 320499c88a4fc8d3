//! Generic web article source.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use reqwest::header::{ACCEPT, USER_AGENT};
use scraper::Html;
use std::sync::LazyLock;
use std::time::Duration;

use super::{Article, ContentSource};
use crate::auth::Session;
use crate::error::{Error, Result};
use crate::html;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const BOT_USER_AGENT: &str = "Mozilla/5.0 (compatible; ArticleBot/1.0)";

const EXCLUDED_HOSTS: [&str; 4] = ["twitter.com", "x.com", "www.twitter.com", "www.x.com"];

const TITLE_SELECTORS: [&str; 6] = [
    "h1.post-title",
    "h1.entry-title",
    "h1.article-title",
    "article h1",
    "main h1",
    "h1",
];

const AUTHOR_SELECTORS: [&str; 4] = ["[rel=\"author\"]", ".author", ".byline", ".post-author"];

const DATE_SELECTORS: [&str; 3] = [".date", ".published", ".post-date"];

const NOISE_SELECTORS: [&str; 11] = [
    "script",
    "style",
    "nav",
    "header",
    "footer",
    "aside",
    ".comments",
    ".sidebar",
    ".advertisement",
    ".ad",
    ".share",
];

const CONTENT_SELECTORS: [&str; 9] = [
    "article",
    "[role=\"article\"]",
    ".post-content",
    ".article-content",
    ".entry-content",
    ".content",
    "main",
    ".post",
    "#content",
];

/// Cleaned content shorter than this is assumed to be a teaser or wrapper.
const MIN_CONTENT_LENGTH: usize = 100;

static BYLINE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(by|author:)\s*").expect("valid byline regex"));

/// Fetches ordinary web pages over HTTP and extracts the article body.
#[derive(Debug, Clone)]
pub struct WebSource {
    client: reqwest::Client,
}

impl WebSource {
    pub fn new(timeout: Duration) -> std::result::Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self { client })
    }

    async fn download(&self, url: &str) -> std::result::Result<String, reqwest::Error> {
        self.client
            .get(url)
            .header(USER_AGENT, BOT_USER_AGENT)
            .header(ACCEPT, "text/html,application/xhtml+xml")
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

#[async_trait]
impl ContentSource for WebSource {
    fn name(&self) -> &'static str {
        "web"
    }

    fn can_handle(&self, url: &str) -> bool {
        let Ok(parsed) = url::Url::parse(url) else {
            return false;
        };
        if !matches!(parsed.scheme(), "http" | "https") {
            return false;
        }
        match parsed.host_str() {
            Some(host) => !EXCLUDED_HOSTS.contains(&host.to_lowercase().as_str()),
            None => false,
        }
    }

    async fn fetch(&self, url: &str, _session: Option<&Session>) -> Result<Article> {
        tracing::info!(url, "Fetching web article");

        let body = self
            .download(url)
            .await
            .map_err(|e| Error::Fetch(e.to_string()))?;

        let article = extract_article(&body, url)?;
        tracing::info!(
            url,
            title = %article.title,
            author = %article.author,
            content_length = article.content.len(),
            "Fetched web article"
        );
        Ok(article)
    }
}

/// Extract title, author, date, and readable body from a page.
pub fn extract_article(page_html: &str, url: &str) -> Result<Article> {
    let mut document = Html::parse_document(page_html);
    let domain = url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string());

    let title = extract_title(&document).unwrap_or_else(|| domain.clone());
    let author = extract_author(&document).unwrap_or_else(|| domain.clone());
    let published_at = extract_date(&document);

    let content = extract_content(&mut document);
    if content.is_empty() {
        return Err(Error::NoContent(url.to_string()));
    }

    Ok(Article {
        title,
        author,
        content,
        published_at,
        source_url: url.to_string(),
        source_type: "web".to_string(),
    })
}

fn extract_title(document: &Html) -> Option<String> {
    if let Some(og) = html::first(document, "meta[property=\"og:title\"]")
        .and_then(|m| html::attr(m, "content"))
    {
        return Some(og.to_string());
    }

    TITLE_SELECTORS
        .iter()
        .filter_map(|css| html::first(document, css))
        .map(html::text)
        .find(|t| !t.is_empty())
        .or_else(|| {
            html::first(document, "title")
                .map(html::text)
                .filter(|t| !t.is_empty())
        })
}

fn extract_author(document: &Html) -> Option<String> {
    if let Some(meta) = html::first(document, "meta[name=\"author\"]")
        .and_then(|m| html::attr(m, "content"))
    {
        return Some(meta.to_string());
    }

    AUTHOR_SELECTORS
        .iter()
        .filter_map(|css| html::first(document, css))
        .map(|el| BYLINE_PREFIX.replace(&html::text(el), "").trim().to_string())
        .find(|a| !a.is_empty())
}

/// The first date source present on the page decides; a published-time meta
/// or `<time>` element that fails to parse means no date.
fn extract_date(document: &Html) -> Option<DateTime<Utc>> {
    if let Some(content) = html::first(document, "meta[property=\"article:published_time\"]")
        .and_then(|m| html::attr(m, "content"))
    {
        return parse_date(content);
    }

    if let Some(time) = html::first(document, "time") {
        return match html::attr(time, "datetime") {
            Some(raw) => parse_date(raw),
            None => parse_date(&html::text(time)),
        };
    }

    DATE_SELECTORS
        .iter()
        .filter_map(|css| html::first(document, css))
        .filter_map(|el| {
            let raw = html::attr(el, "content")
                .map(str::to_string)
                .unwrap_or_else(|| html::text(el));
            (!raw.is_empty()).then_some(raw)
        })
        .find_map(|raw| parse_date(&raw))
}

fn extract_content(document: &mut Html) -> String {
    html::remove_all(document, &NOISE_SELECTORS);
    html::remove_empty_paragraphs(document);

    for css in CONTENT_SELECTORS {
        if let Some(el) = html::first(document, css) {
            let cleaned = html::compact_html(el);
            if cleaned.len() > MIN_CONTENT_LENGTH {
                tracing::debug!(selector = css, length = cleaned.len(), "Matched content");
                return cleaned;
            }
        }
    }

    html::first(document, "body")
        .map(html::compact_html)
        .unwrap_or_default()
}

/// Parse the date formats commonly found in article metadata.
///
/// Timestamps without an offset are taken as UTC; bare dates as midnight UTC.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%SZ", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    for fmt in ["%Y-%m-%d", "%B %d, %Y", "%b %d, %Y", "%d %B %Y", "%d %b %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }
    None
}
