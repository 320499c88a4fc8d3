//! Content sources: things that turn a URL into an [`Article`].

mod web;

pub use web::{extract_article, parse_date, WebSource};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::auth::Session;
use crate::error::Result;

/// A fetched article ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Article {
    pub title: String,
    pub author: String,
    /// Article body as HTML.
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    pub source_url: String,
    /// `twitter`, `twitter_article`, or `web`.
    pub source_type: String,
}

/// A handler that can claim URLs and fetch them as articles.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Whether this source knows how to fetch `url`.
    fn can_handle(&self, url: &str) -> bool;

    /// Whether `fetch` needs the X session cookies.
    fn requires_cookies(&self) -> bool {
        false
    }

    /// Fetch `url` and extract an article.
    async fn fetch(&self, url: &str, session: Option<&Session>) -> Result<Article>;
}

/// Ordered list of sources; the first that claims a URL handles it.
#[derive(Clone, Default)]
pub struct SourceRegistry {
    sources: Vec<Arc<dyn ContentSource>>,
}

impl SourceRegistry {
    #[must_use]
    pub fn new(sources: Vec<Arc<dyn ContentSource>>) -> Self {
        Self { sources }
    }

    /// Append a lower-priority source.
    #[must_use]
    pub fn with(mut self, source: Arc<dyn ContentSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Find the source for `url`.
    #[must_use]
    pub fn resolve(&self, url: &str) -> Option<Arc<dyn ContentSource>> {
        self.sources.iter().find(|s| s.can_handle(url)).cloned()
    }

    #[must_use]
    pub fn is_supported(&self, url: &str) -> bool {
        self.resolve(url).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
