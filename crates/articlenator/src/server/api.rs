//! JSON and streaming API handlers.

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::mpsc;

use super::error::ApiError;
use super::payload::Payload;
use super::stream::{event_stream, CHANNEL_CAPACITY, IDLE_TIMEOUT};
use super::AppState;
use crate::auth::{mask_cookies, validate_cookies, CookieStatus, LiveCheck, Session};
use crate::events::{Completion, ConversionReport, ProgressEvent};
use crate::pipeline::{ConvertError, Resolution};
use crate::version;

/// Upper bound on a whole bookmark scrape.
pub const SCRAPE_TIMEOUT: Duration = Duration::from_secs(20 * 60);

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: String,
}

/// `?live=true` / `?test=true` style switches.
#[derive(Debug, Default, Deserialize)]
pub struct Flags {
    #[serde(default)]
    live: Option<String>,
    #[serde(default)]
    test: Option<String>,
}

fn is_true(flag: Option<&str>) -> bool {
    flag.is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: version::version_string(),
    })
}

/// Synchronous batch conversion.
pub async fn convert(
    State(state): State<AppState>,
    payload: Payload,
) -> Result<Json<ConversionReport>, ApiError> {
    let session = state.session_for(payload.cookies.as_deref());
    let plan = state
        .pipeline
        .plan(&payload.links, session.as_ref(), Resolution::Strict)?;
    tracing::info!(link_count = plan.len(), "Convert requested");

    let report = state.pipeline.run(plan, session.as_ref(), None).await?;
    Ok(Json(report))
}

/// Batch conversion with progress streamed as server-sent events.
pub async fn convert_stream(
    State(state): State<AppState>,
    payload: Payload,
) -> Result<Response, ApiError> {
    let session = state.session_for(payload.cookies.as_deref());
    let plan = state
        .pipeline
        .plan(&payload.links, session.as_ref(), Resolution::Strict)?;
    tracing::info!(link_count = plan.len(), "Streaming convert requested");

    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let pipeline = state.pipeline.clone();
    tokio::spawn(async move {
        // Failures are reported to the client as events.
        let _ = pipeline.run(plan, session.as_ref(), Some(&tx)).await;
    });

    Ok(event_stream(rx, IDLE_TIMEOUT).into_response())
}

/// Save a cookie string to the config directory.
pub async fn save_cookies(
    State(state): State<AppState>,
    payload: Payload,
) -> Result<Json<Value>, ApiError> {
    let Some(raw) = payload.cookies else {
        return Err(ApiError::bad_request("No cookies provided"));
    };
    let saved = state.cookies.save(&raw)?;
    let validation = validate_cookies(Some(&saved));
    Ok(Json(json!({
        "success": true,
        "message": "Cookies saved",
        "validation": validation,
    })))
}

/// Check cookie format, and with `?live=true` ask X whether they still work.
pub async fn validate(
    State(state): State<AppState>,
    Query(flags): Query<Flags>,
    payload: Payload,
) -> impl IntoResponse {
    let cookies = state.resolve_cookies(payload.cookies.as_deref());
    let live = is_true(flags.live.as_deref());
    let result = state.verifier.validate(cookies.as_deref(), live).await;
    tracing::info!(status = ?result.status, live, "Cookies validated");
    Json(result)
}

/// Whether cookies are saved, and with `?test=true` whether X accepts them.
pub async fn cookie_status(
    State(state): State<AppState>,
    Query(flags): Query<Flags>,
) -> impl IntoResponse {
    let Some(saved) = state.cookies.load() else {
        return Json(json!({
            "configured": false,
            "status": "not_configured",
            "message": "No cookies configured",
        }));
    };

    if !is_true(flags.test.as_deref()) {
        return Json(json!({
            "configured": true,
            "status": "configured",
        }));
    }

    let result = state.verifier.validate(Some(&saved), true).await;
    Json(json!({
        "configured": true,
        "status": status_label(result.status),
        "message": result.message,
        "screen_name": result.screen_name,
    }))
}

/// Saved cookies with their values masked.
pub async fn current_cookies(State(state): State<AppState>) -> impl IntoResponse {
    match state.cookies.load() {
        Some(saved) => Json(json!({
            "configured": true,
            "cookies": mask_cookies(&saved),
        })),
        None => Json(json!({
            "configured": false,
            "cookies": [],
        })),
    }
}

/// Scrape the user's bookmarks, streaming each one as it is found.
pub async fn fetch_bookmarks(
    State(state): State<AppState>,
    payload: Payload,
) -> Result<Response, ApiError> {
    let Some(cookies) = state.resolve_cookies(payload.cookies.as_deref()) else {
        return Err(
            ApiError::bad_request("Twitter cookies required. Please set up your cookies first.")
                .with_setup(),
        );
    };

    let validation = validate_cookies(Some(&cookies));
    if !validation.valid {
        return Err(ApiError::bad_request(validation.message));
    }

    let session = Session::parse(&cookies);
    match state.verifier.check(&session).await {
        Ok(LiveCheck::Authenticated { screen_name }) => {
            tracing::info!(screen_name = %screen_name, "Bookmark preflight passed");
        }
        Ok(LiveCheck::Rejected { status }) => {
            tracing::warn!(status, "Bookmark preflight auth failed");
            return Err(ApiError::unauthorized(
                "Your Twitter cookies have expired or are invalid. \
                 Please go to Setup and enter fresh cookies.",
            )
            .with_setup());
        }
        Err(e) => {
            // The scraper reports its own auth failure.
            tracing::warn!(error = %e, "Bookmark preflight check failed, continuing");
        }
    }

    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let feed = state.bookmarks.clone();
    tokio::spawn(async move {
        if tx.send(ProgressEvent::Start { total: None }).await.is_err() {
            return;
        }

        let (entry_tx, mut entries) = mpsc::channel(CHANNEL_CAPACITY);
        let scrape = tokio::spawn(async move {
            tokio::time::timeout(SCRAPE_TIMEOUT, feed.scrape(&session, entry_tx)).await
        });

        let mut count = 0;
        while let Some(entry) = entries.recv().await {
            count += 1;
            if tx.send(ProgressEvent::Bookmark { count, entry }).await.is_err() {
                tracing::info!(count, "Client went away, stopping bookmark stream");
                break;
            }
        }
        drop(entries);

        let last = match scrape.await {
            Ok(Ok(Ok(total))) => ProgressEvent::Complete(Completion::Bookmarks { total }),
            Ok(Ok(Err(e))) => {
                tracing::error!(error = %e, "Bookmark fetch failed");
                ProgressEvent::error(e.to_string())
            }
            Ok(Err(_)) => {
                tracing::error!("Bookmark fetch timed out");
                ProgressEvent::error("Bookmark scrape timed out (20 min limit)")
            }
            Err(e) => {
                tracing::error!(error = %e, "Bookmark task panicked");
                ProgressEvent::error("Bookmark scrape failed")
            }
        };
        let _ = tx.send(last).await;
    });

    Ok(event_stream(rx, IDLE_TIMEOUT).into_response())
}

/// Convert selected bookmark URLs, streaming progress.
///
/// Unsupported URLs fail individually instead of rejecting the batch.
pub async fn convert_bookmarks(
    State(state): State<AppState>,
    payload: Payload,
) -> Result<Response, ApiError> {
    let session = state.session_for(payload.cookies.as_deref());
    let plan = match state
        .pipeline
        .plan(&payload.urls, session.as_ref(), Resolution::Lenient)
    {
        Ok(plan) => plan,
        Err(ConvertError::NoLinks) => return Err(ApiError::bad_request("No URLs provided")),
        Err(e) => return Err(e.into()),
    };
    tracing::info!(url_count = plan.len(), "Bookmark convert requested");

    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let pipeline = state.pipeline.clone();
    tokio::spawn(async move {
        let _ = pipeline.run(plan, session.as_ref(), Some(&tx)).await;
    });

    Ok(event_stream(rx, IDLE_TIMEOUT).into_response())
}

/// Status label reported by `/api/cookies/status?test=true`.
#[must_use]
pub fn status_label(status: CookieStatus) -> &'static str {
    match status {
        CookieStatus::Valid => "working",
        CookieStatus::NotConfigured => "not_configured",
        CookieStatus::Invalid | CookieStatus::Expired => "invalid",
    }
}
