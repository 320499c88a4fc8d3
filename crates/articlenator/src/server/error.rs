//! JSON error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::pipeline::ConvertError;

/// Where the UI sends users to fix their cookies.
pub const SETUP_URL: &str = "/setup";

/// An error rendered as `{"error": "...", "setup_url": "/setup"?}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    setup_url: Option<&'static str>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    setup_url: Option<&'static str>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            setup_url: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Point the client at the cookie setup page.
    #[must_use]
    pub fn with_setup(mut self) -> Self {
        self.setup_url = Some(SETUP_URL);
        self
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = self.status.as_u16(), error = %self.message, "Request failed");
        } else {
            tracing::info!(status = self.status.as_u16(), error = %self.message, "Request rejected");
        }
        let body = ErrorBody {
            error: &self.message,
            setup_url: self.setup_url,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<ConvertError> for ApiError {
    fn from(err: ConvertError) -> Self {
        let api = if err.is_client_error() {
            Self::bad_request(err.to_string())
        } else {
            Self::internal(err.to_string())
        };
        if err.needs_setup() {
            api.with_setup()
        } else {
            api
        }
    }
}

impl From<crate::error::Error> for ApiError {
    fn from(err: crate::error::Error) -> Self {
        Self::internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_error_mapping() {
        let err: ApiError = ConvertError::CookiesRequired(vec!["u".to_string()]).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.setup_url, Some(SETUP_URL));

        let err: ApiError = ConvertError::Unsupported(vec!["u".to_string()]).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.setup_url.is_none());

        let err: ApiError = ConvertError::AllFailed(vec![]).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.message().starts_with("All conversions failed"));
    }

    #[test]
    fn test_body_shape() {
        let body = ErrorBody {
            error: "nope",
            setup_url: None,
        };
        assert_eq!(serde_json::to_value(&body).unwrap(), serde_json::json!({"error": "nope"}));
    }
}
