//! Cookie string parsing, validation, and masking.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

use super::Session;

/// Minimum plausible length of `auth_token` and `ct0` values.
pub const MIN_TOKEN_LENGTH: usize = 20;

/// Cookies needed to browse X as a logged-in user.
pub const REQUIRED_COOKIES: [&str; 2] = ["auth_token", "ct0"];

/// Cookies worth keeping from a DevTools table copy.
const DEVTOOLS_KEEP: [&str; 4] = ["auth_token", "ct0", "twid", "guest_id"];

static COLUMN_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\t| {2,}").expect("valid column regex"));

static MULTI_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" {4,}").expect("valid spacing regex"));

/// Normalise user-supplied cookie input into `name=value; name=value` form.
///
/// Standard cookie strings pass through trimmed. Rows copied out of the
/// DevTools cookie table (tab or space separated columns, one cookie per line)
/// are reduced to the X session cookies.
#[must_use]
pub fn parse_cookie_input(input: &str) -> String {
    let input = input.trim();
    if input.is_empty() || !looks_like_devtools(input) {
        return input.to_string();
    }

    let pairs: Vec<String> = input
        .lines()
        .filter_map(|line| {
            let mut columns = COLUMN_SPLIT
                .split(line.trim())
                .map(str::trim)
                .filter(|c| !c.is_empty());
            let name = columns.next()?;
            let value = columns.next()?;
            DEVTOOLS_KEEP
                .contains(&name)
                .then(|| format!("{name}={value}"))
        })
        .collect();

    if pairs.is_empty() {
        tracing::debug!("DevTools-style input contained no session cookies");
        return input.to_string();
    }
    pairs.join("; ")
}

fn looks_like_devtools(input: &str) -> bool {
    let has_columns = input.contains('\t') || MULTI_SPACE.is_match(input);
    if !has_columns {
        return false;
    }

    let starts_with_known = input.lines().any(|line| {
        let line = line.trim_start();
        DEVTOOLS_KEEP.iter().any(|name| {
            line.strip_prefix(name)
                .is_some_and(|rest| rest.starts_with([' ', '\t']))
        })
    });
    if starts_with_known {
        return true;
    }

    let first_line = input.lines().next().unwrap_or_default();
    input.lines().count() > 1 && !first_line.contains('=')
}

/// Validation verdict for a cookie string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CookieStatus {
    NotConfigured,
    Invalid,
    Valid,
    Expired,
}

/// Result of validating a cookie string, serialised straight to API clients.
#[derive(Debug, Clone, Serialize)]
pub struct CookieValidation {
    pub valid: bool,
    pub status: CookieStatus,
    pub message: String,
    /// Absent when no live check ran, `null` when the live check could not reach X.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live: Option<Option<bool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen_name: Option<String>,
}

impl CookieValidation {
    fn new(status: CookieStatus, message: impl Into<String>) -> Self {
        Self {
            valid: status == CookieStatus::Valid,
            status,
            message: message.into(),
            live: None,
            screen_name: None,
        }
    }
}

/// Check that the session cookies are present and plausibly sized.
#[must_use]
pub fn validate_cookies(cookies: Option<&str>) -> CookieValidation {
    let Some(raw) = cookies.map(str::trim).filter(|c| !c.is_empty()) else {
        return CookieValidation::new(CookieStatus::NotConfigured, "No cookies configured");
    };

    let session = Session::parse(raw);

    let missing: Vec<&str> = REQUIRED_COOKIES
        .iter()
        .copied()
        .filter(|name| session.get(name).is_none_or(str::is_empty))
        .collect();
    if !missing.is_empty() {
        return CookieValidation::new(
            CookieStatus::Invalid,
            format!("Missing required cookies: {}", missing.join(", ")),
        );
    }

    let short: Vec<&str> = REQUIRED_COOKIES
        .iter()
        .copied()
        .filter(|name| {
            session
                .get(name)
                .is_some_and(|v| v.chars().count() < MIN_TOKEN_LENGTH)
        })
        .collect();
    if !short.is_empty() {
        return CookieValidation::new(
            CookieStatus::Invalid,
            format!(
                "Cookie values look truncated: {} (expected at least {MIN_TOKEN_LENGTH} characters)",
                short.join(", ")
            ),
        );
    }

    CookieValidation::new(CookieStatus::Valid, "Cookies look valid")
}

/// A cookie with its value hidden.
#[derive(Debug, Clone, Serialize)]
pub struct MaskedCookie {
    pub name: String,
    pub value_masked: String,
    pub length: usize,
}

/// Hide a cookie value, keeping just enough to recognise it.
#[must_use]
pub fn mask_value(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        let head: String = chars.first().map(ToString::to_string).unwrap_or_default();
        format!("{head}...")
    }
}

/// Masked view of every cookie in a cookie string.
#[must_use]
pub fn mask_cookies(cookies: &str) -> Vec<MaskedCookie> {
    Session::parse(cookies)
        .pairs()
        .iter()
        .map(|(name, value)| MaskedCookie {
            name: name.clone(),
            value_masked: mask_value(value),
            length: value.chars().count(),
        })
        .collect()
}
