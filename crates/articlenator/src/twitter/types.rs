//! Twitter data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Longest bookmark text preview, in characters, before truncation.
pub const MAX_PREVIEW_LENGTH: usize = 200;

/// A bookmarked post as shown in the bookmark picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkEntry {
    /// Unique tweet ID.
    pub tweet_id: String,
    /// Canonical `https://x.com/<user>/status/<id>` URL.
    pub tweet_url: String,
    /// Author handle (without @).
    pub author: String,
    /// Author display name.
    pub display_name: String,
    /// First [`MAX_PREVIEW_LENGTH`] characters of the text.
    pub text_preview: String,
    /// External and X-article links found in the post.
    #[serde(default)]
    pub article_urls: Vec<String>,
    /// Whether the post links a native X article.
    #[serde(default)]
    pub is_article: bool,
    /// Timestamp shown on the post, as an ISO string; `null` when unknown.
    #[serde(default)]
    pub bookmarked_at: Option<String>,
}

/// A reply under a status page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub author: String,
    pub display_name: String,
    pub text: String,
    pub images: Vec<String>,
    /// Reply written by the status author.
    pub is_op: bool,
}

/// Everything extracted from a status page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TweetData {
    /// Handle from the status URL.
    pub author: String,
    pub display_name: String,
    /// Tweet text, or the long-form article body with one paragraph per line.
    pub text: String,
    pub images: Vec<String>,
    pub replies: Vec<Reply>,
    pub posted_at: Option<DateTime<Utc>>,
    /// Long-form article title.
    pub title: Option<String>,
    /// Long-form X article rather than a regular tweet.
    pub is_article: bool,
}

/// Shorten text to `max` characters, ending in `...` when cut.
#[must_use]
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// Preview text for a bookmark.
#[must_use]
pub fn preview(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() <= MAX_PREVIEW_LENGTH {
        return text.to_string();
    }
    let kept: String = text.chars().take(MAX_PREVIEW_LENGTH).collect();
    format!("{kept}...")
}
