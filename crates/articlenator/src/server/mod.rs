//! Web application: pages, JSON API and progress streams.

pub mod api;
pub mod error;
pub mod pages;
pub mod payload;
pub mod stream;

pub use error::{ApiError, SETUP_URL};

use axum::extract::Request;
use axum::http::header::{HeaderName, HeaderValue};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{parse_cookie_input, CookieStore, CookieVerifier, Session};
use crate::browser::{ChromeLauncher, ChromePool};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::pdf::{ChromePrinter, PdfGenerator};
use crate::pipeline::{Pipeline, PipelineConfig};
use crate::sources::{SourceRegistry, WebSource};
use crate::twitter::{BookmarkFeed, BookmarkScraper, TwitterSource};

/// Largest request body accepted.
pub const MAX_BODY_SIZE: usize = 16 * 1024 * 1024;

const SECURITY_HEADERS: [(&str, &str); 5] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("x-xss-protection", "1; mode=block"),
    ("referrer-policy", "strict-origin-when-cross-origin"),
    ("permissions-policy", "geolocation=(), microphone=(), camera=()"),
];

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pipeline: Pipeline,
    pub bookmarks: Arc<dyn BookmarkFeed>,
    pub cookies: CookieStore,
    pub verifier: CookieVerifier,
}

impl AppState {
    #[must_use]
    pub fn new(
        config: Arc<Config>,
        pipeline: Pipeline,
        bookmarks: Arc<dyn BookmarkFeed>,
        verifier: CookieVerifier,
    ) -> Self {
        let cookies = CookieStore::new(config.cookie_path());
        Self {
            config,
            pipeline,
            bookmarks,
            cookies,
            verifier,
        }
    }

    /// Wire up the Chrome-backed sources, printer and scraper.
    ///
    /// The returned pool should be shut down when the server stops.
    ///
    /// # Errors
    ///
    /// Fails when an HTTP client cannot be built.
    pub fn from_config(config: Config) -> Result<(Self, Arc<ChromePool>)> {
        let config = Arc::new(config);
        let pool = ChromeLauncher::new(config.chrome_path.clone()).pool(config.max_browsers);

        let web = WebSource::new(config.fetch_timeout)
            .map_err(|e| Error::Fetch(format!("Failed to build HTTP client: {e}")))?;
        let registry = SourceRegistry::default()
            .with(Arc::new(TwitterSource::new(
                Arc::clone(&pool),
                config.dump_dir.clone(),
            )))
            .with(Arc::new(web));

        let pdf = PdfGenerator::new(
            Arc::new(ChromePrinter::new(Arc::clone(&pool))),
            config.output_dir.clone(),
        );
        let pipeline = Pipeline::new(registry, pdf, PipelineConfig::from(config.as_ref()));
        let bookmarks = Arc::new(BookmarkScraper::new(
            Arc::clone(&pool),
            config.dump_dir.clone(),
        ));
        let verifier = CookieVerifier::new(config.x_api_base.clone())
            .map_err(|e| Error::Fetch(format!("Failed to build HTTP client: {e}")))?;

        Ok((Self::new(config, pipeline, bookmarks, verifier), pool))
    }

    /// Cookies from the request when given, else the saved ones.
    #[must_use]
    pub fn resolve_cookies(&self, request_cookies: Option<&str>) -> Option<String> {
        match request_cookies {
            Some(raw) => Some(parse_cookie_input(raw)).filter(|c| !c.is_empty()),
            None => self.cookies.load(),
        }
    }

    /// The session to fetch with, if any cookies are available.
    #[must_use]
    pub fn session_for(&self, request_cookies: Option<&str>) -> Option<Session> {
        self.resolve_cookies(request_cookies)
            .map(|c| Session::parse(&c))
            .filter(|s| !s.is_empty())
    }
}

async fn security_headers(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    for (name, value) in SECURITY_HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
    response
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(pages::index))
        .route("/setup", get(pages::setup))
        .route("/download/{filename}", get(pages::download))
        .route("/api/health", get(api::health))
        .route("/api/convert", post(api::convert))
        .route("/api/convert/stream", post(api::convert_stream))
        .route("/api/cookies", post(api::save_cookies))
        .route("/api/cookies/validate", post(api::validate))
        .route("/api/cookies/status", get(api::cookie_status))
        .route("/api/cookies/current", get(api::current_cookies))
        .route("/api/bookmarks/fetch", post(api::fetch_bookmarks))
        .route("/api/bookmarks/convert", post(api::convert_bookmarks))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(security_headers))
                .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE)),
        )
        .with_state(state)
}

/// Serve `state` on `addr` until Ctrl+C or SIGTERM.
///
/// # Errors
///
/// Fails when the address cannot be bound or the server errors.
pub async fn serve(state: AppState, addr: SocketAddr) -> Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Articlenator listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::PdfPrinter;
    use crate::twitter::BookmarkEntry;
    use async_trait::async_trait;
    use tokio::sync::mpsc;

    struct NullPrinter;

    #[async_trait]
    impl PdfPrinter for NullPrinter {
        async fn print(&self, _html: &str) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }
    }

    struct NoBookmarks;

    #[async_trait]
    impl BookmarkFeed for NoBookmarks {
        async fn scrape(&self, _session: &Session, _tx: mpsc::Sender<BookmarkEntry>) -> Result<usize> {
            Ok(0)
        }
    }

    fn state(dir: &std::path::Path) -> AppState {
        let config = Config {
            config_dir: dir.to_path_buf(),
            output_dir: dir.join("out"),
            ..Config::default()
        };
        let pdf = PdfGenerator::new(Arc::new(NullPrinter), dir.join("out"));
        let pipeline = Pipeline::new(SourceRegistry::default(), pdf, PipelineConfig::default());
        let verifier = CookieVerifier::new("http://127.0.0.1:9").unwrap();
        AppState::new(Arc::new(config), pipeline, Arc::new(NoBookmarks), verifier)
    }

    #[test]
    fn test_request_cookies_take_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());
        state
            .cookies
            .save("auth_token=saved_saved_saved_saved_1; ct0=saved_saved_saved_saved_2")
            .unwrap();

        let given = "auth_token=given_given_given_given_1; ct0=given_given_given_given_2";
        assert_eq!(state.resolve_cookies(Some(given)).as_deref(), Some(given));

        let session = state.session_for(None).unwrap();
        assert_eq!(session.auth_token(), Some("saved_saved_saved_saved_1"));
    }

    #[test]
    fn test_no_cookies_no_session() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());
        assert!(state.resolve_cookies(None).is_none());
        assert!(state.session_for(None).is_none());
    }
}
