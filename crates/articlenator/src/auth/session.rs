//! X session built from a cookie string.

/// Parsed X session cookies, in the order they were supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    cookies: Vec<(String, String)>,
}

impl Session {
    /// Parse a `name=value; name=value` cookie string.
    ///
    /// Segments without `=` or with an empty name are ignored; a repeated name
    /// keeps its last value.
    #[must_use]
    pub fn parse(cookie_string: &str) -> Self {
        let mut cookies: Vec<(String, String)> = Vec::new();
        for part in cookie_string.split(';') {
            let Some((name, value)) = part.trim().split_once('=') else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let value = value.trim().to_string();
            if let Some(existing) = cookies.iter_mut().find(|(n, _)| n == name) {
                existing.1 = value;
            } else {
                cookies.push((name.to_string(), value));
            }
        }
        Self { cookies }
    }

    /// Look up a cookie value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// The long-lived auth token cookie.
    #[must_use]
    pub fn auth_token(&self) -> Option<&str> {
        self.get("auth_token")
    }

    /// The CSRF token cookie.
    #[must_use]
    pub fn ct0(&self) -> Option<&str> {
        self.get("ct0")
    }

    /// All cookies as name/value pairs.
    #[must_use]
    pub fn pairs(&self) -> &[(String, String)] {
        &self.cookies
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Get cookie string for HTTP requests.
    #[must_use]
    pub fn cookie_string(&self) -> String {
        self.cookies
            .iter()
            .map(|(n, v)| format!("{n}={v}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cookie_string() {
        let session = Session::parse("auth_token=abc; ct0=def;  twid=u%3D1=2 ;junk; =x");
        assert_eq!(session.auth_token(), Some("abc"));
        assert_eq!(session.ct0(), Some("def"));
        assert_eq!(session.get("twid"), Some("u%3D1=2"));
        assert_eq!(session.pairs().len(), 3);
    }

    #[test]
    fn test_duplicate_keeps_last() {
        let session = Session::parse("ct0=old; ct0=new");
        assert_eq!(session.ct0(), Some("new"));
        assert_eq!(session.pairs().len(), 1);
    }

    #[test]
    fn test_cookie_string_roundtrip() {
        let session = Session::parse(" auth_token = abc ;ct0=def ");
        assert_eq!(session.cookie_string(), "auth_token=abc; ct0=def");
        assert!(Session::parse("").is_empty());
    }
}
