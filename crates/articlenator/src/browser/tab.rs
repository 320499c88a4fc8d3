//! Browser tabs that close themselves.

use async_trait::async_trait;
use chromiumoxide::Page;
use std::ops::Deref;

/// A tab that can be closed.
#[async_trait]
pub trait Tab: Send + Sized + 'static {
    /// Close the tab, logging rather than returning failures.
    async fn close_tab(self);
}

#[async_trait]
impl Tab for Page {
    async fn close_tab(self) {
        if let Err(e) = self.close().await {
            tracing::debug!(error = %e, "Failed to close tab");
        }
    }
}

/// Owns an open tab and closes it when dropped.
///
/// A fetch cut short by a timeout drops its future mid-navigation; the tab is
/// still closed before the browser goes back to the pool for reuse.
pub struct TabGuard<T: Tab> {
    tab: Option<T>,
}

impl<T: Tab> TabGuard<T> {
    #[must_use]
    pub fn new(tab: T) -> Self {
        Self { tab: Some(tab) }
    }

    /// Close the tab now and wait for it.
    pub async fn close(mut self) {
        if let Some(tab) = self.tab.take() {
            tab.close_tab().await;
        }
    }
}

impl<T: Tab> Deref for TabGuard<T> {
    type Target = T;

    fn deref(&self) -> &T {
        match &self.tab {
            Some(tab) => tab,
            None => unreachable!("tab is only taken on close or drop"),
        }
    }
}

impl<T: Tab> Drop for TabGuard<T> {
    fn drop(&mut self) {
        let Some(tab) = self.tab.take() else { return };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::debug!("Closing abandoned tab");
                handle.spawn(tab.close_tab());
            }
            Err(_) => tracing::warn!("No runtime to close abandoned tab"),
        }
    }
}
