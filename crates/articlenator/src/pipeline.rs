//! Conversion pipeline - resolves links, fetches articles, and prints one PDF.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::auth::Session;
use crate::config::{Config, DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_REQUEST_DELAY_MS};
use crate::error::Error;
use crate::events::{
    ArticleResult, Completion, ConversionReport, FetchStatus, ProgressEvent, Summary, UrlError,
};
use crate::pdf::PdfGenerator;
use crate::sources::{Article, ContentSource, SourceRegistry};

/// Timing knobs for a conversion run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Pause between fetches, to stay under X's rate limits.
    pub delay: Duration,
    /// Upper bound on a single fetch.
    pub fetch_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(DEFAULT_REQUEST_DELAY_MS),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
        }
    }
}

impl From<&Config> for PipelineConfig {
    fn from(config: &Config) -> Self {
        Self {
            delay: config.request_delay,
            fetch_timeout: config.fetch_timeout,
        }
    }
}

/// How links that no source claims are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Any unsupported link or missing cookie rejects the whole batch, and
    /// only cookie-backed fetches are spaced out.
    Strict,
    /// Unsupported links fail on their own and every fetch is spaced out.
    /// Used for bookmark batches, which are mostly tweets.
    Lenient,
}

/// Batch-level failures.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("No links provided")]
    NoLinks,

    #[error("Unsupported URLs: {}", .0.join(", "))]
    Unsupported(Vec<String>),

    #[error("Twitter cookies required for: {}. Please set up your cookies first.", .0.join(", "))]
    CookiesRequired(Vec<String>),

    #[error("All conversions failed:\n{}", list_failures(.0))]
    AllFailed(Vec<UrlError>),

    #[error("{}", pdf_failure(.0))]
    Pdf(Error),
}

impl ConvertError {
    /// Whether the caller should be pointed at the cookie setup page.
    #[must_use]
    pub fn needs_setup(&self) -> bool {
        matches!(self, Self::CookiesRequired(_))
    }

    /// Whether the batch was rejected before any work started.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NoLinks | Self::Unsupported(_) | Self::CookiesRequired(_)
        )
    }

    /// Event that ends a progress stream with this failure.
    #[must_use]
    pub fn to_event(&self) -> ProgressEvent {
        match self {
            Self::AllFailed(errors) => ProgressEvent::Error {
                error: "All conversions failed".to_string(),
                details: Some(errors.clone()),
            },
            other => ProgressEvent::error(other.to_string()),
        }
    }
}

fn list_failures(errors: &[UrlError]) -> String {
    errors
        .iter()
        .map(|e| format!("- {}: {}", e.url, e.error))
        .collect::<Vec<_>>()
        .join("\n")
}

fn pdf_failure(err: &Error) -> String {
    match err {
        Error::Pdf(_) => err.to_string(),
        other => format!("PDF generation failed: {other}"),
    }
}

/// Links paired with the source that will fetch each one.
pub struct Plan {
    items: Vec<(String, Option<Arc<dyn ContentSource>>)>,
    resolution: Resolution,
}

impl Plan {
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Links in fetch order.
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|(url, _)| url.as_str())
    }
}

/// Conversion pipeline orchestrator.
#[derive(Clone)]
pub struct Pipeline {
    registry: SourceRegistry,
    pdf: PdfGenerator,
    config: PipelineConfig,
}

impl Pipeline {
    #[must_use]
    pub fn new(registry: SourceRegistry, pdf: PdfGenerator, config: PipelineConfig) -> Self {
        Self {
            registry,
            pdf,
            config,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Resolve each link to a source and check that cookie-backed sources
    /// have a session.
    ///
    /// # Errors
    ///
    /// In [`Resolution::Strict`] mode, rejects the batch when any link is
    /// unsupported or a cookie-backed link has no session.
    pub fn plan(
        &self,
        links: &[String],
        session: Option<&Session>,
        resolution: Resolution,
    ) -> Result<Plan, ConvertError> {
        let links: Vec<&str> = links
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .collect();
        if links.is_empty() {
            return Err(ConvertError::NoLinks);
        }

        let items: Vec<(String, Option<Arc<dyn ContentSource>>)> = links
            .iter()
            .map(|url| ((*url).to_string(), self.registry.resolve(url)))
            .collect();

        if resolution == Resolution::Strict {
            let unsupported: Vec<String> = items
                .iter()
                .filter(|(_, source)| source.is_none())
                .map(|(url, _)| url.clone())
                .collect();
            if !unsupported.is_empty() {
                return Err(ConvertError::Unsupported(unsupported));
            }

            let has_session = session.is_some_and(|s| !s.is_empty());
            let need_cookies: Vec<String> = items
                .iter()
                .filter(|(_, source)| source.as_ref().is_some_and(|s| s.requires_cookies()))
                .map(|(url, _)| url.clone())
                .collect();
            if !need_cookies.is_empty() && !has_session {
                return Err(ConvertError::CookiesRequired(need_cookies));
            }
        }

        Ok(Plan { items, resolution })
    }

    /// Fetch every planned link and print the successes into one PDF.
    ///
    /// When `events` is given, progress is streamed to it, ending with a
    /// `complete` or `error` event.
    ///
    /// # Errors
    ///
    /// Fails when no link could be fetched or the PDF could not be generated.
    pub async fn run(
        &self,
        plan: Plan,
        session: Option<&Session>,
        events: Option<&mpsc::Sender<ProgressEvent>>,
    ) -> Result<ConversionReport, ConvertError> {
        let result = self.convert(plan, session, events).await;
        match &result {
            Ok(report) => {
                emit(events, ProgressEvent::Complete(Completion::Conversion(report.clone()))).await;
            }
            Err(e) => emit(events, e.to_event()).await,
        }
        result
    }

    async fn convert(
        &self,
        plan: Plan,
        session: Option<&Session>,
        events: Option<&mpsc::Sender<ProgressEvent>>,
    ) -> Result<ConversionReport, ConvertError> {
        let total = plan.len();
        tracing::info!(link_count = total, resolution = ?plan.resolution, "Starting conversion");
        emit(events, ProgressEvent::Start { total: Some(total) }).await;

        let mut articles: Vec<(String, Article)> = Vec::new();
        let mut errors: Vec<UrlError> = Vec::new();

        for (i, (url, source)) in plan.items.into_iter().enumerate() {
            let current = i + 1;
            if i > 0 && should_delay(plan.resolution, source.as_deref()) {
                tokio::time::sleep(self.config.delay).await;
            }

            emit(
                events,
                ProgressEvent::Progress {
                    current,
                    total,
                    url: url.clone(),
                    status: FetchStatus::Processing,
                    title: None,
                    error: None,
                },
            )
            .await;

            let outcome = match source {
                Some(source) => {
                    tracing::info!(url = %url, source = source.name(), progress = %format!("{current}/{total}"), "Processing URL");
                    self.fetch(source.as_ref(), &url, session).await
                }
                None => Err(Error::UnsupportedUrl(url.clone())),
            };

            match outcome {
                Ok(article) => {
                    tracing::info!(url = %url, title = %article.title, "URL fetched");
                    emit(
                        events,
                        ProgressEvent::Progress {
                            current,
                            total,
                            url: url.clone(),
                            status: FetchStatus::Success,
                            title: Some(article.title.clone()),
                            error: None,
                        },
                    )
                    .await;
                    articles.push((url, article));
                }
                Err(e) => {
                    let message = match e {
                        Error::UnsupportedUrl(_) => "Unsupported URL".to_string(),
                        other => other.to_string(),
                    };
                    tracing::error!(url = %url, error = %message, "URL processing failed");
                    emit(
                        events,
                        ProgressEvent::Progress {
                            current,
                            total,
                            url: url.clone(),
                            status: FetchStatus::Failed,
                            title: None,
                            error: Some(message.clone()),
                        },
                    )
                    .await;
                    errors.push(UrlError {
                        url,
                        error: message,
                    });
                }
            }
        }

        if articles.is_empty() {
            return Err(ConvertError::AllFailed(errors));
        }

        emit(events, ProgressEvent::GeneratingPdf).await;
        let batch: Vec<Article> = articles.iter().map(|(_, a)| a.clone()).collect();
        let path = self.pdf.generate(&batch).await.map_err(|e| {
            tracing::error!(error = %e, "PDF generation failed");
            ConvertError::Pdf(e)
        })?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        tracing::info!(pdf = %filename, article_count = articles.len(), failed = errors.len(), "Combined PDF generated");

        let succeeded = articles.len();
        let failed = errors.len();
        Ok(ConversionReport {
            success: true,
            filename,
            articles: articles
                .into_iter()
                .map(|(url, article)| ArticleResult {
                    url,
                    title: article.title,
                    author: article.author,
                    status: FetchStatus::Success,
                })
                .collect(),
            errors: if errors.is_empty() { None } else { Some(errors) },
            summary: Summary {
                total,
                succeeded,
                failed,
            },
        })
    }

    async fn fetch(
        &self,
        source: &dyn ContentSource,
        url: &str,
        session: Option<&Session>,
    ) -> crate::error::Result<Article> {
        let timeout = self.config.fetch_timeout;
        match tokio::time::timeout(timeout, source.fetch(url, session)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(timeout.as_secs())),
        }
    }
}

fn should_delay(resolution: Resolution, source: Option<&dyn ContentSource>) -> bool {
    match resolution {
        Resolution::Lenient => true,
        Resolution::Strict => source.is_some_and(|s| s.requires_cookies()),
    }
}

/// Send an event if anyone is listening; a closed stream is not an error.
async fn emit(events: Option<&mpsc::Sender<ProgressEvent>>, event: ProgressEvent) {
    if let Some(tx) = events {
        if tx.send(event).await.is_err() {
            tracing::debug!("Progress receiver dropped");
        }
    }
}
