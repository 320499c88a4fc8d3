//! Runtime configuration loaded from the environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 5001;

/// Default bind address.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default number of pooled browsers.
pub const DEFAULT_MAX_BROWSERS: usize = 2;

/// Default pause between consecutive fetches, in milliseconds.
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 2000;

/// Default per-URL fetch budget, in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 120;

/// Default upstream used for live cookie verification.
pub const DEFAULT_X_API_BASE: &str = "https://api.x.com";

/// Name of the persisted cookie file inside the config directory.
pub const COOKIE_FILE: &str = "cookies.json";

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding persisted state (cookies).
    pub config_dir: PathBuf,
    /// Directory generated PDFs are written to.
    pub output_dir: PathBuf,
    /// Log level used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Emit JSON logs instead of human-readable output.
    pub json_logging: bool,
    /// Bind address for the web server.
    pub host: String,
    /// Bind port for the web server.
    pub port: u16,
    /// Upper bound on concurrently running browsers.
    pub max_browsers: usize,
    /// Pause inserted between consecutive fetches.
    pub request_delay: Duration,
    /// Budget for a single URL fetch.
    pub fetch_timeout: Duration,
    /// Explicit Chrome/Chromium executable.
    pub chrome_path: Option<PathBuf>,
    /// Where page snapshots are written when extraction fails.
    pub dump_dir: Option<PathBuf>,
    /// Base URL of the X API used for live cookie checks.
    pub x_api_base: String,
}

impl Default for Config {
    fn default() -> Self {
        let home = home_dir();
        Self {
            config_dir: home.join(".config").join("articlenator"),
            output_dir: home.join("Downloads").join("articlenator"),
            log_level: "info".to_string(),
            json_logging: true,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_browsers: DEFAULT_MAX_BROWSERS,
            request_delay: Duration::from_millis(DEFAULT_REQUEST_DELAY_MS),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            chrome_path: None,
            dump_dir: None,
            x_api_base: DEFAULT_X_API_BASE.to_string(),
        }
    }
}

impl Config {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `ARTICLENATOR_CONFIG_DIR`: state directory (default: ~/.config/articlenator)
    /// - `ARTICLENATOR_OUTPUT_DIR`: PDF directory (default: ~/Downloads/articlenator)
    /// - `ARTICLENATOR_LOG_LEVEL`: log level (default: info)
    /// - `ARTICLENATOR_JSON_LOGGING`: true/1/yes for JSON logs (default: true)
    /// - `ARTICLENATOR_HOST` / `PORT`: bind address (default: 0.0.0.0:5001)
    /// - `ARTICLENATOR_MAX_BROWSERS`: browser pool size (default: 2)
    /// - `ARTICLENATOR_REQUEST_DELAY_MS`: delay between fetches (default: 2000)
    /// - `ARTICLENATOR_CHROME_PATH`: Chrome executable
    /// - `ARTICLENATOR_DUMP_DIR`: directory for failed-page snapshots
    /// - `ARTICLENATOR_X_API_BASE`: live verification upstream
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config_dir = std::env::var("ARTICLENATOR_CONFIG_DIR")
            .ok()
            .map(|v| expand_home(&v))
            .unwrap_or(defaults.config_dir);

        let output_dir = std::env::var("ARTICLENATOR_OUTPUT_DIR")
            .ok()
            .map(|v| expand_home(&v))
            .unwrap_or(defaults.output_dir);

        let log_level = std::env::var("ARTICLENATOR_LOG_LEVEL")
            .map(|v| v.to_lowercase())
            .unwrap_or(defaults.log_level);

        let json_logging = std::env::var("ARTICLENATOR_JSON_LOGGING")
            .map(|v| parse_bool(&v))
            .unwrap_or(defaults.json_logging);

        let host = std::env::var("ARTICLENATOR_HOST").unwrap_or(defaults.host);

        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.port);

        let max_browsers = std::env::var("ARTICLENATOR_MAX_BROWSERS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|n: &usize| *n > 0)
            .unwrap_or(defaults.max_browsers);

        let request_delay = std::env::var("ARTICLENATOR_REQUEST_DELAY_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.request_delay);

        let chrome_path = std::env::var("ARTICLENATOR_CHROME_PATH")
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        let dump_dir = std::env::var("ARTICLENATOR_DUMP_DIR")
            .ok()
            .filter(|v| !v.is_empty())
            .map(|v| expand_home(&v));

        let x_api_base = std::env::var("ARTICLENATOR_X_API_BASE")
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or(defaults.x_api_base);

        Self {
            config_dir,
            output_dir,
            log_level,
            json_logging,
            host,
            port,
            max_browsers,
            request_delay,
            fetch_timeout: defaults.fetch_timeout,
            chrome_path,
            dump_dir,
            x_api_base,
        }
    }

    /// Path of the persisted cookie file.
    #[must_use]
    pub fn cookie_path(&self) -> PathBuf {
        self.config_dir.join(COOKIE_FILE)
    }

    /// Create the config and output directories if missing.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.output_dir)
    }
}

fn home_dir() -> PathBuf {
    std::env::var("HOME").map_or_else(|_| PathBuf::from("."), PathBuf::from)
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => home_dir().join(rest),
        None if path == "~" => home_dir(),
        None => Path::new(path).to_path_buf(),
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "ARTICLENATOR_CONFIG_DIR",
        "ARTICLENATOR_OUTPUT_DIR",
        "ARTICLENATOR_LOG_LEVEL",
        "ARTICLENATOR_JSON_LOGGING",
        "ARTICLENATOR_MAX_BROWSERS",
        "ARTICLENATOR_REQUEST_DELAY_MS",
        "PORT",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = Config::from_env();
        assert!(config.config_dir.ends_with(".config/articlenator"));
        assert!(config.output_dir.ends_with("Downloads/articlenator"));
        assert_eq!(config.log_level, "info");
        assert!(config.json_logging);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.max_browsers, 2);
        assert_eq!(config.request_delay, Duration::from_secs(2));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        std::env::set_var("ARTICLENATOR_CONFIG_DIR", "/tmp/articlenator-cfg");
        std::env::set_var("ARTICLENATOR_LOG_LEVEL", "DEBUG");
        std::env::set_var("ARTICLENATOR_JSON_LOGGING", "no");
        std::env::set_var("ARTICLENATOR_MAX_BROWSERS", "4");
        std::env::set_var("PORT", "8080");

        let config = Config::from_env();
        assert_eq!(config.config_dir, PathBuf::from("/tmp/articlenator-cfg"));
        assert_eq!(
            config.cookie_path(),
            PathBuf::from("/tmp/articlenator-cfg/cookies.json")
        );
        assert_eq!(config.log_level, "debug");
        assert!(!config.json_logging);
        assert_eq!(config.max_browsers, 4);
        assert_eq!(config.port, 8080);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_values_fall_back() {
        clear_env();
        std::env::set_var("ARTICLENATOR_MAX_BROWSERS", "0");
        std::env::set_var("PORT", "not-a-port");

        let config = Config::from_env();
        assert_eq!(config.max_browsers, DEFAULT_MAX_BROWSERS);
        assert_eq!(config.port, DEFAULT_PORT);

        clear_env();
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("true"));
        assert!(parse_bool("1"));
        assert!(parse_bool("YES"));
        assert!(!parse_bool("false"));
        assert!(!parse_bool("0"));
    }

    #[test]
    fn test_ensure_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config {
            config_dir: tmp.path().join("cfg"),
            output_dir: tmp.path().join("out"),
            ..Config::default()
        };
        config.ensure_dirs().unwrap();
        assert!(config.config_dir.is_dir());
        assert!(config.output_dir.is_dir());
    }
}
