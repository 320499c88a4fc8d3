//! Cookie persistence in the config directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::cookies::parse_cookie_input;
use crate::error::Result;

#[derive(Debug, Serialize, Deserialize)]
struct StoredCookies {
    cookies: String,
}

/// Reads and writes the saved cookie string (`{"cookies": "..."}`).
#[derive(Debug, Clone)]
pub struct CookieStore {
    path: PathBuf,
}

impl CookieStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the saved cookie string.
    ///
    /// A missing, unreadable, or malformed file reads as no cookies.
    #[must_use]
    pub fn load(&self) -> Option<String> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to read cookie file");
                return None;
            }
        };

        match serde_json::from_str::<StoredCookies>(&content) {
            Ok(stored) if !stored.cookies.trim().is_empty() => Some(stored.cookies),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Ignoring malformed cookie file");
                None
            }
        }
    }

    /// Normalise and save a cookie string, returning what was stored.
    pub fn save(&self, raw: &str) -> Result<String> {
        let cookies = parse_cookie_input(raw);
        let content = serde_json::to_string_pretty(&StoredCookies {
            cookies: cookies.clone(),
        })?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, content)?;
        tracing::info!(path = %self.path.display(), "Saved cookies");
        Ok(cookies)
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.load().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let store = CookieStore::new(tmp.path().join("cookies.json"));
        assert!(store.load().is_none());
        assert!(!store.is_configured());
    }

    #[test]
    fn test_save_and_load() {
        let tmp = tempfile::tempdir().unwrap();
        let store = CookieStore::new(tmp.path().join("nested/dir/cookies.json"));

        let saved = store.save("auth_token=abc; ct0=def").unwrap();
        assert_eq!(saved, "auth_token=abc; ct0=def");
        assert_eq!(store.load().as_deref(), Some("auth_token=abc; ct0=def"));

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["cookies"], "auth_token=abc; ct0=def");
    }

    #[test]
    fn test_save_normalises_devtools_input() {
        let tmp = tempfile::tempdir().unwrap();
        let store = CookieStore::new(tmp.path().join("cookies.json"));
        let saved = store
            .save("auth_token\tabc\t.x.com\t/\nct0\tdef\t.x.com\t/")
            .unwrap();
        assert_eq!(saved, "auth_token=abc; ct0=def");
    }

    #[test]
    fn test_malformed_file_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("cookies.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(CookieStore::new(&path).load().is_none());
    }
}
