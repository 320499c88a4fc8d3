//! Printing article batches to PDF files.

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::template::{pdf_filename, render_document};
use crate::browser::ChromePool;
use crate::error::{Error, Result};
use crate::sources::Article;

/// Maximum combined article content, in bytes.
pub const MAX_CONTENT_SIZE: usize = 500_000_000;

// A5 in inches.
const A5_WIDTH_IN: f64 = 5.83;
const A5_HEIGHT_IN: f64 = 8.27;

/// Turns a complete HTML document into PDF bytes.
#[async_trait]
pub trait PdfPrinter: Send + Sync {
    async fn print(&self, html: &str) -> Result<Vec<u8>>;
}

/// Prints with Chrome's built-in PDF export, using a pooled browser.
pub struct ChromePrinter {
    pool: Arc<ChromePool>,
}

impl ChromePrinter {
    #[must_use]
    pub fn new(pool: Arc<ChromePool>) -> Self {
        Self { pool }
    }

    fn print_params() -> PrintToPdfParams {
        PrintToPdfParams {
            print_background: Some(true),
            prefer_css_page_size: Some(true),
            paper_width: Some(A5_WIDTH_IN),
            paper_height: Some(A5_HEIGHT_IN),
            display_header_footer: Some(false),
            ..Default::default()
        }
    }
}

#[async_trait]
impl PdfPrinter for ChromePrinter {
    async fn print(&self, html: &str) -> Result<Vec<u8>> {
        let browser = self.pool.acquire().await?;
        let page = browser.blank_page().await?;

        let result = async {
            page.set_content(html).await?;
            page.pdf(Self::print_params()).await
        }
        .await;

        page.close().await;
        result.map_err(|e| Error::Pdf(e.to_string()))
    }
}

/// Renders article batches and writes them to the output directory.
#[derive(Clone)]
pub struct PdfGenerator {
    printer: Arc<dyn PdfPrinter>,
    output_dir: PathBuf,
    max_content_size: usize,
}

impl PdfGenerator {
    pub fn new(printer: Arc<dyn PdfPrinter>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            printer,
            output_dir: output_dir.into(),
            max_content_size: MAX_CONTENT_SIZE,
        }
    }

    /// Override the combined content limit.
    #[must_use]
    pub fn with_max_content_size(mut self, max: usize) -> Self {
        self.max_content_size = max;
        self
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Render `articles` into one PDF and return its path.
    ///
    /// # Errors
    ///
    /// Fails on an empty batch, when the combined content exceeds the limit
    /// ([`MAX_CONTENT_SIZE`] unless overridden), or when printing or writing fails.
    pub async fn generate(&self, articles: &[Article]) -> Result<PathBuf> {
        if articles.is_empty() {
            return Err(Error::EmptyBatch);
        }

        let total_size: usize = articles.iter().map(|a| a.content.len()).sum();
        if total_size > self.max_content_size {
            tracing::warn!(
                size = total_size,
                max_size = self.max_content_size,
                article_count = articles.len(),
                "Content too large"
            );
            return Err(Error::ContentTooLarge {
                size: total_size,
                max: self.max_content_size,
            });
        }

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let filename = pdf_filename(articles, chrono::Local::now().date_naive());
        let path = self.output_dir.join(&filename);

        tracing::info!(
            article_count = articles.len(),
            titles = ?articles.iter().map(|a| a.title.as_str()).collect::<Vec<_>>(),
            output_path = %path.display(),
            "Generating PDF"
        );

        let html = render_document(articles);
        let bytes = self.printer.print(&html).await?;
        tokio::fs::write(&path, &bytes).await?;

        tracing::info!(path = %path.display(), size = bytes.len(), "PDF generated");
        Ok(path)
    }
}
