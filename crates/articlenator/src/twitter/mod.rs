//! Twitter/X support.
//!
//! Status pages and the bookmark timeline are driven through a pooled headless
//! browser; page snapshots are parsed with CSS selectors.

mod article;
mod bookmarks;
mod parser;
mod source;
mod types;

pub use article::tweet_to_article;
pub use bookmarks::{BookmarkFeed, BookmarkScraper, ScrollState, MAX_EMPTY_SCROLLS};
pub use parser::{canonical_status_url, is_status_url, parse_status_url, BookmarkParser, TweetParser};
pub use source::TwitterSource;
pub use types::{preview, truncate_chars, BookmarkEntry, Reply, TweetData, MAX_PREVIEW_LENGTH};
