//! Progress events streamed to the browser during long-running work.

use serde::Serialize;

use crate::twitter::BookmarkEntry;

/// Outcome of fetching one URL in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    Processing,
    Success,
    Failed,
}

/// A URL that could not be converted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UrlError {
    pub url: String,
    pub error: String,
}

/// One converted article in a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleResult {
    pub url: String,
    pub title: String,
    pub author: String,
    pub status: FetchStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Result of a batch conversion that produced a PDF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionReport {
    pub success: bool,
    pub filename: String,
    pub articles: Vec<ArticleResult>,
    /// `null` when every URL succeeded.
    pub errors: Option<Vec<UrlError>>,
    pub summary: Summary,
}

/// Payload of a `complete` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Completion {
    Conversion(ConversionReport),
    Bookmarks { total: usize },
}

/// Server-sent event payload, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    Start {
        #[serde(skip_serializing_if = "Option::is_none")]
        total: Option<usize>,
    },
    Progress {
        current: usize,
        total: usize,
        url: String,
        status: FetchStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Bookmark {
        count: usize,
        entry: BookmarkEntry,
    },
    GeneratingPdf,
    Complete(Completion),
    Error {
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<Vec<UrlError>>,
    },
}

impl ProgressEvent {
    /// Plain error event with no per-URL details.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
            details: None,
        }
    }

    /// Whether the stream ends after this event.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete(_) | Self::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_start_event() {
        let with_total = serde_json::to_value(ProgressEvent::Start { total: Some(3) }).unwrap();
        assert_eq!(with_total, json!({"type": "start", "total": 3}));

        let bare = serde_json::to_value(ProgressEvent::Start { total: None }).unwrap();
        assert_eq!(bare, json!({"type": "start"}));
    }

    #[test]
    fn test_progress_event() {
        let event = ProgressEvent::Progress {
            current: 1,
            total: 2,
            url: "https://example.com".to_string(),
            status: FetchStatus::Failed,
            title: None,
            error: Some("boom".to_string()),
        };
        assert_eq!(
            serde_json::to_value(event).unwrap(),
            json!({
                "type": "progress",
                "current": 1,
                "total": 2,
                "url": "https://example.com",
                "status": "failed",
                "error": "boom"
            })
        );
    }

    #[test]
    fn test_generating_pdf_event() {
        assert_eq!(
            serde_json::to_value(ProgressEvent::GeneratingPdf).unwrap(),
            json!({"type": "generating_pdf"})
        );
    }

    #[test]
    fn test_complete_events() {
        let report = ConversionReport {
            success: true,
            filename: "a_20240101.pdf".to_string(),
            articles: vec![ArticleResult {
                url: "u".to_string(),
                title: "t".to_string(),
                author: "a".to_string(),
                status: FetchStatus::Success,
            }],
            errors: None,
            summary: Summary {
                total: 1,
                succeeded: 1,
                failed: 0,
            },
        };
        let value =
            serde_json::to_value(ProgressEvent::Complete(Completion::Conversion(report))).unwrap();
        assert_eq!(value["type"], "complete");
        assert_eq!(value["filename"], "a_20240101.pdf");
        assert_eq!(value["articles"][0]["status"], "success");
        assert!(value["errors"].is_null());
        assert_eq!(value["summary"]["succeeded"], 1);

        let scrape =
            serde_json::to_value(ProgressEvent::Complete(Completion::Bookmarks { total: 7 })).unwrap();
        assert_eq!(scrape, json!({"type": "complete", "total": 7}));
    }

    #[test]
    fn test_error_event() {
        let event = ProgressEvent::Error {
            error: "All conversions failed".to_string(),
            details: Some(vec![UrlError {
                url: "u".to_string(),
                error: "e".to_string(),
            }]),
        };
        assert!(event.is_terminal());
        assert_eq!(
            serde_json::to_value(event).unwrap(),
            json!({
                "type": "error",
                "error": "All conversions failed",
                "details": [{"url": "u", "error": "e"}]
            })
        );
        assert_eq!(
            serde_json::to_value(ProgressEvent::error("x")).unwrap(),
            json!({"type": "error", "error": "x"})
        );
        assert!(!ProgressEvent::GeneratingPdf.is_terminal());
    }
}
