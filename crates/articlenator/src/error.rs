//! Error types for article conversion.

use thiserror::Error;

/// Errors raised while fetching content or producing PDFs.
#[derive(Debug, Error)]
pub enum Error {
    /// No content source claims the URL
    #[error("Unsupported URL: {0}")]
    UnsupportedUrl(String),

    /// Source needs a session cookie string but none was supplied
    #[error("Cookies are required to fetch tweets")]
    CookiesRequired,

    /// Network or HTTP status failure while fetching a page
    #[error("Failed to fetch URL: {0}")]
    Fetch(String),

    /// Page fetched but no readable article body was found
    #[error("Could not extract article content from {0}")]
    NoContent(String),

    /// Headless browser failure
    #[error("Browser error: {0}")]
    Browser(String),

    /// Expected elements never appeared on the page
    #[error("{0}")]
    Extraction(String),

    /// Session cookies rejected by the site
    #[error("{0}")]
    Auth(String),

    /// Combined article content exceeds the renderer limit
    #[error(
        "Content too large for PDF generation: {} bytes (max: {} bytes)",
        group_digits(.size),
        group_digits(.max)
    )]
    ContentTooLarge { size: usize, max: usize },

    /// PDF requested for an empty batch
    #[error("At least one article is required")]
    EmptyBatch,

    /// Operation exceeded its time budget
    #[error("Timed out after {0}s")]
    Timeout(u64),

    /// Print-to-PDF failure
    #[error("PDF generation failed: {0}")]
    Pdf(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<chromiumoxide::error::CdpError> for Error {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        Self::Browser(err.to_string())
    }
}

/// Crate result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Format an integer with thousands separators (`1234567` -> `1,234,567`).
fn group_digits(n: &usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
