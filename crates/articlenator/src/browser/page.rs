//! Navigation and waiting helpers for X pages.

use chromiumoxide::Page;
use std::path::Path;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Navigate with a hard time limit.
pub async fn goto(page: &Page, url: &str, timeout: Duration) -> Result<()> {
    match tokio::time::timeout(timeout, page.goto(url)).await {
        Ok(result) => {
            result?;
            Ok(())
        }
        Err(_) => Err(Error::Browser(format!(
            "Navigation to {url} timed out after {}s",
            timeout.as_secs()
        ))),
    }
}

/// Poll until `selector` matches an element or `timeout` elapses.
///
/// Returns whether the element appeared.
pub async fn wait_for_selector(page: &Page, selector: &str, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if page.find_element(selector).await.is_ok() {
            return true;
        }
        if Instant::now() >= deadline {
            tracing::debug!(selector, timeout_secs = timeout.as_secs(), "Selector never appeared");
            return false;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Current page URL, empty if unknown.
pub async fn current_url(page: &Page) -> String {
    page.url().await.ok().flatten().unwrap_or_default()
}

/// Route inside X's single-page app without a full reload.
///
/// A hard navigation to a status or bookmarks URL is often bounced by X's bot
/// checks, while an in-app route change is not. Falls back to a normal
/// navigation when the router ignores the push.
pub async fn spa_navigate(page: &Page, url: &str, settle: Duration, timeout: Duration) -> Result<()> {
    let script = format!(
        "history.pushState({{}}, '', {target}); \
         window.dispatchEvent(new PopStateEvent('popstate', {{ state: {{}} }}));",
        target = serde_json::to_string(url)?
    );
    if let Err(e) = page.evaluate(script).await {
        tracing::debug!(error = %e, "pushState navigation failed");
    }
    tokio::time::sleep(settle).await;

    let landed = current_url(page).await;
    if same_path(&landed, url) {
        return Ok(());
    }

    tracing::debug!(url, landed = %landed, "In-app navigation ignored, loading directly");
    goto(page, url, timeout).await
}

/// Scroll the window down by `pixels`.
pub async fn scroll_by(page: &Page, pixels: u32) {
    if let Err(e) = page.evaluate(format!("window.scrollBy(0, {pixels})")).await {
        tracing::debug!(error = %e, "Scroll failed");
    }
}

/// Page title, empty if unknown.
pub async fn title(page: &Page) -> String {
    page.get_title().await.ok().flatten().unwrap_or_default()
}

/// Write a page snapshot for debugging when extraction fails.
pub async fn dump_html(dir: Option<&Path>, name: &str, html: &str) {
    let Some(dir) = dir else { return };
    let path = dir.join(format!("{name}.html"));
    if let Err(e) = tokio::fs::create_dir_all(dir).await {
        tracing::warn!(path = %dir.display(), error = %e, "Failed to create dump dir");
        return;
    }
    match tokio::fs::write(&path, html).await {
        Ok(()) => tracing::info!(path = %path.display(), "Dumped HTML for inspection"),
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to dump HTML"),
    }
}

fn same_path(current: &str, target: &str) -> bool {
    let path_of = |u: &str| {
        url::Url::parse(u)
            .map(|parsed| parsed.path().trim_end_matches('/').to_lowercase())
            .unwrap_or_default()
    };
    let target_path = path_of(target);
    !target_path.is_empty() && path_of(current) == target_path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_path() {
        assert!(same_path(
            "https://x.com/i/bookmarks",
            "https://x.com/i/bookmarks"
        ));
        assert!(same_path(
            "https://x.com/User/status/1?s=20",
            "https://twitter.com/user/status/1"
        ));
        assert!(!same_path("https://x.com/home", "https://x.com/i/bookmarks"));
        assert!(!same_path("", "https://x.com/i/bookmarks"));
        assert!(!same_path("about:blank", "not a url"));
    }

    #[tokio::test]
    async fn test_dump_html_writes_file() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("dumps");
        dump_html(Some(dir.as_path()), "tweet-123", "<html></html>").await;
        let written = std::fs::read_to_string(dir.join("tweet-123.html")).unwrap();
        assert_eq!(written, "<html></html>");

        dump_html(None, "ignored", "<html></html>").await;
    }
}
