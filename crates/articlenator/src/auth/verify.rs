//! Live cookie verification against the X API.

use reqwest::header::{AUTHORIZATION, COOKIE};
use serde::Deserialize;
use std::time::Duration;

use super::cookies::{validate_cookies, CookieStatus, CookieValidation};
use super::Session;

/// Public bearer token the X web client sends with every API call.
const WEB_CLIENT_BEARER: &str = "Bearer AAAAAAAAAAAAAAAAAAAAANRILgAAAAAAnNwIzUejRCOuH5E6I8xnZz4puTs%3D1Zv7ttfk8LF81IUq16cHjhLTvJu4FA33AGWWjCpTnA";

const VERIFY_PATH: &str = "/1.1/account/verify_credentials.json";

const VERIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of asking X whether a session is still logged in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveCheck {
    /// Session accepted, with the account handle.
    Authenticated { screen_name: String },
    /// Session rejected with the given HTTP status.
    Rejected { status: u16 },
}

#[derive(Debug, Deserialize)]
struct VerifyCredentials {
    screen_name: Option<String>,
}

/// Client for the credential check endpoint.
#[derive(Debug, Clone)]
pub struct CookieVerifier {
    client: reqwest::Client,
    base_url: String,
}

impl CookieVerifier {
    /// Create a verifier against `base_url` (normally `https://api.x.com`).
    pub fn new(base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(VERIFY_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Ask X whether the session cookies are still accepted.
    ///
    /// Network failures surface as `Err`; any non-200 response is `Rejected`.
    pub async fn check(&self, session: &Session) -> Result<LiveCheck, reqwest::Error> {
        let url = format!("{}{VERIFY_PATH}", self.base_url);
        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, WEB_CLIENT_BEARER)
            .header("x-csrf-token", session.ct0().unwrap_or_default())
            .header(COOKIE, session.cookie_string())
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            tracing::warn!(status = status.as_u16(), "Live cookie check rejected");
            return Ok(LiveCheck::Rejected {
                status: status.as_u16(),
            });
        }

        let body: VerifyCredentials = response.json().await?;
        let screen_name = body.screen_name.unwrap_or_else(|| "unknown".to_string());
        tracing::info!(screen_name = %screen_name, "Live cookie check succeeded");
        Ok(LiveCheck::Authenticated { screen_name })
    }

    /// Validate the cookie format and, when `live` is set, confirm with X.
    ///
    /// A failed network call keeps the format verdict and notes that the live
    /// check could not run.
    pub async fn validate(&self, cookies: Option<&str>, live: bool) -> CookieValidation {
        let mut result = validate_cookies(cookies);
        if !result.valid || !live {
            return result;
        }
        let Some(raw) = cookies else {
            return result;
        };

        match self.check(&Session::parse(raw)).await {
            Ok(LiveCheck::Authenticated { screen_name }) => {
                result.message = format!("Cookies valid — authenticated as @{screen_name}");
                result.live = Some(Some(true));
                result.screen_name = Some(screen_name);
            }
            Ok(LiveCheck::Rejected { .. }) => {
                result.valid = false;
                result.live = Some(Some(false));
                result.status = CookieStatus::Expired;
                result.message = "Cookies have expired or are invalid. \
                                  Please get fresh cookies from Twitter."
                    .to_string();
            }
            Err(e) => {
                tracing::warn!(error = %e, "Live cookie check failed");
                result.live = Some(None);
                result.message.push_str(" (Could not verify live — network error)");
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn valid_cookies() -> String {
        format!("auth_token={}; ct0={}", "a".repeat(30), "b".repeat(30))
    }

    #[tokio::test]
    async fn test_live_check_authenticated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(VERIFY_PATH))
            .and(header("x-csrf-token", "b".repeat(30).as_str()))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "screen_name": "rustacean" })),
            )
            .mount(&server)
            .await;

        let verifier = CookieVerifier::new(server.uri()).unwrap();
        let result = verifier.validate(Some(&valid_cookies()), true).await;

        assert!(result.valid);
        assert_eq!(result.live, Some(Some(true)));
        assert_eq!(result.screen_name.as_deref(), Some("rustacean"));
        assert!(result.message.contains("@rustacean"));
    }

    #[tokio::test]
    async fn test_live_check_expired() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(VERIFY_PATH))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let verifier = CookieVerifier::new(server.uri()).unwrap();
        let session = Session::parse(&valid_cookies());
        assert_eq!(
            verifier.check(&session).await.unwrap(),
            LiveCheck::Rejected { status: 401 }
        );

        let result = verifier.validate(Some(&valid_cookies()), true).await;
        assert!(!result.valid);
        assert_eq!(result.status, CookieStatus::Expired);
        assert_eq!(result.live, Some(Some(false)));
    }

    #[tokio::test]
    async fn test_live_check_network_error_keeps_verdict() {
        // Nothing listens on port 9 locally.
        let verifier = CookieVerifier::new("http://127.0.0.1:9").unwrap();
        let result = verifier.validate(Some(&valid_cookies()), true).await;

        assert!(result.valid);
        assert_eq!(result.live, Some(None));
        assert!(result.message.ends_with("(Could not verify live — network error)"));
    }

    #[tokio::test]
    async fn test_no_live_check_when_format_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let verifier = CookieVerifier::new(server.uri()).unwrap();
        let result = verifier
            .validate(Some("auth_token=short; ct0=short"), true)
            .await;
        assert_eq!(result.status, CookieStatus::Invalid);
        assert!(result.live.is_none());
    }
}
