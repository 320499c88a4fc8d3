//! HTML pages and PDF downloads.

use axum::extract::{Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{Html, IntoResponse, Response};

use super::error::ApiError;
use super::AppState;

const INDEX_HTML: &str = include_str!("../../templates/index.html");
const SETUP_HTML: &str = include_str!("../../templates/setup.html");

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Cookie setup guide.
pub async fn setup() -> Html<&'static str> {
    Html(SETUP_HTML)
}

/// Reduce a client-supplied file name to a safe basename.
///
/// Whitespace becomes `_`; path separators and anything outside
/// `[A-Za-z0-9._-]` are dropped; leading and trailing `.`/`_` are trimmed.
#[must_use]
pub fn secure_filename(name: &str) -> String {
    let joined: String = name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    joined.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Serve a generated PDF from the output directory.
pub async fn download(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let safe = secure_filename(&filename);
    if !safe.ends_with(".pdf") {
        return Err(ApiError::bad_request("Only PDF files can be downloaded"));
    }
    if safe != filename {
        return Err(ApiError::bad_request("Invalid filename"));
    }

    let path = state.config.output_dir.join(&safe);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::not_found("File not found"));
        }
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Failed to read PDF");
            return Err(ApiError::internal("Failed to read file"));
        }
    };

    tracing::info!(filename = %safe, size = bytes.len(), "Serving PDF");
    Ok((
        [
            (CONTENT_TYPE, "application/pdf".to_string()),
            (CONTENT_DISPOSITION, format!("attachment; filename=\"{safe}\"")),
        ],
        bytes,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_filename() {
        assert_eq!(secure_filename("report_20240101.pdf"), "report_20240101.pdf");
        assert_eq!(secure_filename("my report.pdf"), "my_report.pdf");
        assert_eq!(secure_filename("../../etc/passwd"), "etcpasswd");
        assert_eq!(secure_filename(".hidden.pdf"), "hidden.pdf");
        assert_eq!(secure_filename("..."), "");
    }

    #[test]
    fn test_templates_embedded() {
        assert!(INDEX_HTML.contains("<form"));
        assert!(SETUP_HTML.contains("auth_token"));
    }
}
