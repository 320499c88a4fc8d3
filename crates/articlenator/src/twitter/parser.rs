//! Twitter page HTML parsers.
//!
//! The browser only navigates and snapshots; everything read off a page is
//! extracted here from the snapshot HTML so it can be tested with fixtures.

use chrono::{DateTime, Utc};
use regex::Regex;
use scraper::{ElementRef, Html};
use std::sync::LazyLock;

use super::types::{preview, BookmarkEntry, Reply, TweetData};
use crate::html;

static STATUS_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:www\.)?(?:twitter\.com|x\.com)/(\w+)/status/(\d+)")
        .expect("valid status URL regex")
});

/// Links that stay inside X and are not worth converting.
static IGNORED_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:www\.)?(?:twitter\.com|x\.com|t\.co)/").expect("valid ignore regex")
});

/// Native long-form X articles.
static X_ARTICLE_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:www\.)?(?:twitter\.com|x\.com)/\w+/article/")
        .expect("valid article regex")
});

static IMAGE_SIZE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"name=\w+").expect("valid image size regex"));

const TWEET: &str = "article[data-testid=\"tweet\"]";
const FOCAL_TWEET: &str = "article[data-testid=\"tweet\"][tabindex=\"-1\"]";
const ANY_TWEET: &str = "[data-testid=\"tweet\"]";
const CELL_TWEET: &str = "[data-testid=\"cellInnerDiv\"] article";
const TWEET_TEXT: &str = "[data-testid=\"tweetText\"]";
const USER_NAME: &str = "[data-testid=\"User-Name\"]";
const LONGFORM: &str = "[data-testid=\"longformRichTextComponent\"]";
const PHOTO: &str = "[data-testid=\"tweetPhoto\"] img";
const CARD_LINK: &str = "[data-testid=\"card.wrapper\"] a[href]";

/// Split a status URL into `(username, tweet_id)`.
#[must_use]
pub fn parse_status_url(url: &str) -> Option<(String, String)> {
    let caps = STATUS_URL.captures(url.trim())?;
    Some((caps[1].to_string(), caps[2].to_string()))
}

/// Whether `url` points at a tweet on twitter.com or x.com.
#[must_use]
pub fn is_status_url(url: &str) -> bool {
    STATUS_URL.is_match(url.trim())
}

/// Canonical x.com URL for a tweet.
#[must_use]
pub fn canonical_status_url(username: &str, tweet_id: &str) -> String {
    format!("https://x.com/{username}/status/{tweet_id}")
}

/// Parser for status (single tweet) pages.
pub struct TweetParser;

impl TweetParser {
    /// Extract the focal tweet or long-form article from a status page.
    ///
    /// `author` is the handle from the status URL. Replies are only read when
    /// `include_replies` is set, since logged-out pages do not show them.
    pub fn parse(page_html: &str, author: &str, include_replies: bool) -> TweetData {
        let document = Html::parse_document(page_html);
        let mut data = TweetData {
            author: author.to_string(),
            display_name: author.to_string(),
            ..TweetData::default()
        };

        if let Some(longform) = html::first(&document, LONGFORM) {
            data.is_article = true;
            data.text = Self::longform_text(longform);
            data.title = html::first(&document, "article h1")
                .map(html::text)
                .filter(|t| !t.is_empty())
                .or_else(|| {
                    html::first(&document, "title")
                        .map(html::text)
                        .filter(|t| t.contains(" / X"))
                        .map(|t| t.replace(" / X", "").trim().to_string())
                });
        } else if let Some(main) =
            html::first(&document, FOCAL_TWEET).or_else(|| html::first(&document, ANY_TWEET))
        {
            data.text = html::first_in(main, TWEET_TEXT)
                .map(html::raw_text)
                .unwrap_or_default();
            data.images = Self::images(main);
        }

        if let Some(name) = html::first(&document, &format!("{USER_NAME} span"))
            .map(html::text)
            .filter(|n| !n.is_empty())
        {
            data.display_name = name;
        }

        data.posted_at = html::first(&document, "time")
            .and_then(|t| html::attr(t, "datetime"))
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.with_timezone(&Utc));

        if !data.is_article && include_replies {
            data.replies = Self::replies(&document, author);
        }

        tracing::debug!(
            author,
            is_article = data.is_article,
            text_len = data.text.len(),
            images = data.images.len(),
            replies = data.replies.len(),
            "Parsed status page"
        );
        data
    }

    /// Whether the page has rendered tweet text or a long-form body yet.
    pub fn has_content(page_html: &str) -> bool {
        let document = Html::parse_document(page_html);
        html::first(&document, TWEET_TEXT).is_some() || html::first(&document, LONGFORM).is_some()
    }

    fn longform_text(longform: ElementRef<'_>) -> String {
        let blocks: Vec<String> = html::all_in(longform, "[data-block=\"true\"]")
            .into_iter()
            .map(html::text)
            .filter(|b| !b.is_empty())
            .collect();
        if !blocks.is_empty() {
            return blocks.join("\n");
        }

        longform
            .text()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Photo URLs in a tweet, upgraded to the large rendition.
    fn images(tweet: ElementRef<'_>) -> Vec<String> {
        html::all_in(tweet, PHOTO)
            .into_iter()
            .filter_map(|img| html::attr(img, "src"))
            .filter(|src| src.contains("twimg.com"))
            .map(|src| IMAGE_SIZE.replace_all(src, "name=large").into_owned())
            .collect()
    }

    fn replies(document: &Html, main_author: &str) -> Vec<Reply> {
        let mut tweets = html::all(document, TWEET);
        if tweets.len() <= 1 {
            let cells = html::all(document, CELL_TWEET);
            if cells.len() > tweets.len() {
                tweets = cells;
            }
        }

        tweets
            .into_iter()
            .skip(1)
            .filter_map(|tweet| {
                let author = html::first_in(tweet, &format!("{USER_NAME} a"))
                    .and_then(|a| html::attr(a, "href"))
                    .map(handle_from_href)
                    .unwrap_or_default();
                let text = html::first_in(tweet, TWEET_TEXT)
                    .map(html::raw_text)
                    .unwrap_or_default();
                let images = Self::images(tweet);
                if text.is_empty() && images.is_empty() {
                    return None;
                }
                let display_name = html::first_in(tweet, &format!("{USER_NAME} span"))
                    .map(html::text)
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| author.clone());
                Some(Reply {
                    is_op: author.eq_ignore_ascii_case(main_author),
                    author,
                    display_name,
                    text,
                    images,
                })
            })
            .collect()
    }
}

/// Parser for the bookmarks timeline.
pub struct BookmarkParser;

impl BookmarkParser {
    /// Parse every bookmark currently rendered on the page.
    pub fn parse(page_html: &str) -> Vec<BookmarkEntry> {
        let document = Html::parse_document(page_html);
        let tweets = html::all(&document, TWEET);
        tracing::debug!(tweet_count = tweets.len(), "Found tweet containers");

        tweets.into_iter().filter_map(Self::parse_entry).collect()
    }

    /// Whether the page shows X's empty-bookmarks placeholder.
    pub fn is_empty_page(page_html: &str) -> bool {
        page_html.contains("haven't added any")
            || page_html.contains("haven\u{2019}t added any")
            || page_html.contains("Save posts for later")
    }

    fn parse_entry(tweet: ElementRef<'_>) -> Option<BookmarkEntry> {
        let status_href = html::all_in(tweet, "a[href*=\"/status/\"]")
            .into_iter()
            .filter_map(|a| html::attr(a, "href"))
            .find(|href| !href.contains("/analytics") && !href.contains("/photo/"));

        let Some(href) = status_href else {
            tracing::debug!("Tweet missing status link, skipping");
            return None;
        };
        let tweet_url = absolute_x_url(href);
        let Some(tweet_id) = Self::extract_tweet_id(&tweet_url) else {
            tracing::debug!(href, "Could not parse tweet URL");
            return None;
        };

        let user_name = html::first_in(tweet, USER_NAME);
        let display_name = user_name
            .and_then(|u| html::first_in(u, "span"))
            .map(html::text)
            .unwrap_or_default();
        let author = user_name
            .and_then(|u| html::first_in(u, "a"))
            .and_then(|a| html::attr(a, "href"))
            .map(handle_from_href)
            .unwrap_or_default();

        let text_el = html::first_in(tweet, TWEET_TEXT);
        let text_preview = text_el.map(|t| preview(&html::raw_text(t))).unwrap_or_default();

        let mut article_urls: Vec<String> = Vec::new();

        if let Some(text_el) = text_el {
            for href in html::all_in(text_el, "a")
                .into_iter()
                .filter_map(|a| html::attr(a, "href"))
            {
                if href.starts_with("http") && !IGNORED_LINK.is_match(href) {
                    push_unique(&mut article_urls, href.to_string());
                }
            }
        }

        let mut is_article = false;
        for href in html::all_in(tweet, CARD_LINK)
            .into_iter()
            .filter_map(|a| html::attr(a, "href"))
            .filter(|href| href.starts_with("http"))
        {
            if X_ARTICLE_LINK.is_match(href) {
                is_article = true;
                push_unique(&mut article_urls, href.to_string());
            } else if !IGNORED_LINK.is_match(href) {
                push_unique(&mut article_urls, href.to_string());
            }
        }

        for href in html::all_in(tweet, "a[href]")
            .into_iter()
            .filter_map(|a| html::attr(a, "href"))
            .map(absolute_x_url)
        {
            if X_ARTICLE_LINK.is_match(&href) {
                is_article = true;
                push_unique(&mut article_urls, href);
            }
        }

        let bookmarked_at = html::first_in(tweet, "time")
            .and_then(|t| html::attr(t, "datetime"))
            .map(str::to_string);

        tracing::debug!(id = %tweet_id, urls = ?article_urls, "Parsed bookmark");
        Some(BookmarkEntry {
            tweet_id,
            tweet_url,
            author,
            display_name,
            text_preview,
            article_urls,
            is_article,
            bookmarked_at,
        })
    }

    /// Parse a tweet URL to extract username and tweet ID.
    /// URLs are like: /username/status/1234567890 or /username/status/1234567890?s=20
    fn parse_tweet_url(url: &str) -> Option<(String, String)> {
        let parts: Vec<&str> = url.trim_start_matches('/').split('/').collect();
        if parts.len() >= 3 && parts[1] == "status" {
            let id = parts[2]
                .split(['?', '#'])
                .next()
                .unwrap_or(parts[2]);
            Some((parts[0].to_string(), id.to_string()))
        } else {
            None
        }
    }

    /// Extract tweet ID from a URL (full or relative).
    pub fn extract_tweet_id(url: &str) -> Option<String> {
        let path = if url.starts_with("http") {
            url.split('/').skip(3).collect::<Vec<_>>().join("/")
        } else {
            url.trim_start_matches('/').to_string()
        };
        Self::parse_tweet_url(&format!("/{path}"))
            .map(|(_, id)| id)
            .filter(|id| !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()))
    }
}

fn push_unique(urls: &mut Vec<String>, url: String) {
    if !urls.contains(&url) {
        urls.push(url);
    }
}

/// `/user/status/1` -> `user`
fn handle_from_href(href: &str) -> String {
    href.trim_matches('/')
        .split('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

fn absolute_x_url(href: &str) -> String {
    if href.starts_with('/') {
        format!("https://x.com{href}")
    } else {
        href.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tweet_article(
        user: &str,
        name: &str,
        id: &str,
        text: &str,
        extra: &str,
        focal: bool,
    ) -> String {
        let tabindex = if focal { r#" tabindex="-1""# } else { "" };
        format!(
            r#"<article data-testid="tweet"{tabindex}>
  <div data-testid="User-Name"><a href="/{user}"><span>{name}</span></a><a href="/{user}/status/{id}"><time datetime="2024-05-01T12:30:00.000Z">May 1</time></a></div>
  <div data-testid="tweetText" lang="en">{text}</div>
  {extra}
  <a href="/{user}/status/{id}/analytics">Views</a>
</article>"#
        )
    }

    #[test]
    fn test_parse_status_url() {
        assert_eq!(
            parse_status_url("https://x.com/rustlang/status/123456"),
            Some(("rustlang".to_string(), "123456".to_string()))
        );
        assert_eq!(
            parse_status_url("https://www.twitter.com/a_b/status/9?s=20"),
            Some(("a_b".to_string(), "9".to_string()))
        );
        assert!(parse_status_url("https://x.com/rustlang").is_none());
        assert!(parse_status_url("https://example.com/a/status/1").is_none());
        assert!(is_status_url("http://twitter.com/u/status/1"));
        assert_eq!(
            canonical_status_url("u", "1"),
            "https://x.com/u/status/1".to_string()
        );
    }

    #[test]
    fn test_extract_tweet_id() {
        assert_eq!(
            BookmarkParser::extract_tweet_id("https://x.com/user/status/123456"),
            Some("123456".to_string())
        );
        assert_eq!(
            BookmarkParser::extract_tweet_id("/user/status/789?s=20"),
            Some("789".to_string())
        );
        assert_eq!(BookmarkParser::extract_tweet_id("https://google.com"), None);
    }

    #[test]
    fn test_parse_regular_tweet_with_images_and_replies() {
        let photo = r#"<div data-testid="tweetPhoto"><img src="https://pbs.twimg.com/media/abc?format=jpg&amp;name=small"></div>
                       <div data-testid="tweetPhoto"><img src="https://example.com/tracker.gif"></div>"#;
        let page = format!(
            "<html><head><title>Ferris on X</title></head><body>{}{}{}{}</body></html>",
            tweet_article("ferris", "Ferris", "1", "Hello\nworld", photo, true),
            tweet_article("someone", "Someone", "2", "Nice post", "", false),
            tweet_article("FERRIS", "Ferris", "3", "Thread continues", "", false),
            tweet_article("empty", "Empty", "4", "", "", false),
        );

        let data = TweetParser::parse(&page, "ferris", true);
        assert!(!data.is_article);
        assert_eq!(data.text, "Hello\nworld");
        assert_eq!(data.display_name, "Ferris");
        assert_eq!(
            data.images,
            vec!["https://pbs.twimg.com/media/abc?format=jpg&name=large".to_string()]
        );
        assert_eq!(
            data.posted_at.map(|t| t.to_rfc3339()),
            Some("2024-05-01T12:30:00+00:00".to_string())
        );

        assert_eq!(data.replies.len(), 2);
        assert_eq!(data.replies[0].author, "someone");
        assert!(!data.replies[0].is_op);
        assert_eq!(data.replies[1].author, "FERRIS");
        assert!(data.replies[1].is_op);
    }

    #[test]
    fn test_replies_skipped_when_not_requested() {
        let page = format!(
            "<html><body>{}{}</body></html>",
            tweet_article("a", "A", "1", "main", "", true),
            tweet_article("b", "B", "2", "reply", "", false),
        );
        let data = TweetParser::parse(&page, "a", false);
        assert!(data.replies.is_empty());
    }

    #[test]
    fn test_parse_longform_article() {
        let page = r#"<html><head><title>Why Rust / X</title></head><body>
            <div data-testid="User-Name"><span>Writer</span></div>
            <div data-testid="longformRichTextComponent">
              <div data-block="true"><span>First paragraph.</span></div>
              <div data-block="true"><span></span></div>
              <div data-block="true"><span>Second </span><span>paragraph.</span></div>
            </div></body></html>"#;

        let data = TweetParser::parse(page, "writer", true);
        assert!(data.is_article);
        assert_eq!(data.title.as_deref(), Some("Why Rust"));
        assert_eq!(data.text, "First paragraph.\nSecond paragraph.");
        assert_eq!(data.display_name, "Writer");
        assert!(data.replies.is_empty());
    }

    #[test]
    fn test_has_content() {
        assert!(TweetParser::has_content(
            r#"<div data-testid="tweetText">x</div>"#
        ));
        assert!(!TweetParser::has_content("<div>loading</div>"));
    }

    #[test]
    fn test_parse_bookmarks() {
        let text = r#"Read this <a href="https://blog.example.com/post">blog.example.com</a> and <a href="https://t.co/abc">t.co</a>"#;
        let card = r#"<div data-testid="card.wrapper"><a href="https://x.com/writer/article/555">Article</a><a href="https://news.example.org/x">News</a></div>"#;
        let page = format!(
            "<html><body>{}{}<article data-testid=\"tweet\"><div>no links</div></article></body></html>",
            tweet_article("reader", "Reader", "100", text, card, false),
            tweet_article("plain", "Plain", "200", "just text", "", false),
        );

        let entries = BookmarkParser::parse(&page);
        assert_eq!(entries.len(), 2);

        let first = &entries[0];
        assert_eq!(first.tweet_id, "100");
        assert_eq!(first.tweet_url, "https://x.com/reader/status/100");
        assert_eq!(first.author, "reader");
        assert_eq!(first.display_name, "Reader");
        assert!(first.is_article);
        assert_eq!(
            first.article_urls,
            vec![
                "https://blog.example.com/post".to_string(),
                "https://x.com/writer/article/555".to_string(),
                "https://news.example.org/x".to_string(),
            ]
        );
        assert_eq!(
            first.bookmarked_at.as_deref(),
            Some("2024-05-01T12:30:00.000Z")
        );

        let second = &entries[1];
        assert!(!second.is_article);
        assert!(second.article_urls.is_empty());
        assert_eq!(second.text_preview, "just text");
    }

    #[test]
    fn test_relative_article_link_detected() {
        let extra = r#"<a href="/writer/article/42">Read</a>"#;
        let page = tweet_article("reader", "Reader", "7", "see", extra, false);
        let entries = BookmarkParser::parse(&page);
        assert!(entries[0].is_article);
        assert_eq!(
            entries[0].article_urls,
            vec!["https://x.com/writer/article/42".to_string()]
        );
    }

    #[test]
    fn test_empty_bookmarks_page() {
        assert!(BookmarkParser::is_empty_page(
            "<span>You haven't added any posts to your Bookmarks yet</span>"
        ));
        assert!(BookmarkParser::is_empty_page("<h2>Save posts for later</h2>"));
        assert!(!BookmarkParser::is_empty_page("<article></article>"));
    }
}
