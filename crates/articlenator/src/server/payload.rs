//! Request bodies accepted as JSON or as an HTML form.

use axum::extract::{FromRequest, Request};
use axum::http::header::CONTENT_TYPE;
use axum::{Form, Json};
use serde::Deserialize;

use super::error::ApiError;

/// Fields shared by the conversion and cookie endpoints.
///
/// Forms send `links`/`urls` as newline-separated text; JSON sends arrays.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Payload {
    pub links: Vec<String>,
    pub urls: Vec<String>,
    /// Raw cookie string, `None` when absent or blank.
    pub cookies: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct JsonBody {
    #[serde(default)]
    links: Vec<String>,
    #[serde(default)]
    urls: Vec<String>,
    #[serde(default)]
    cookies: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FormBody {
    #[serde(default)]
    links: String,
    #[serde(default)]
    urls: String,
    #[serde(default)]
    cookies: Option<String>,
}

fn lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl<S: Send + Sync> FromRequest<S> for Payload {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("application/json") {
            let Json(body) = Json::<JsonBody>::from_request(req, state)
                .await
                .map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {}", e.body_text())))?;
            return Ok(Self {
                links: body.links,
                urls: body.urls,
                cookies: non_blank(body.cookies),
            });
        }

        if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(body) = Form::<FormBody>::from_request(req, state)
                .await
                .map_err(|e| ApiError::bad_request(format!("Invalid form body: {}", e.body_text())))?;
            return Ok(Self {
                links: lines(&body.links),
                urls: lines(&body.urls),
                cookies: non_blank(body.cookies),
            });
        }

        Ok(Self::default())
    }
}
