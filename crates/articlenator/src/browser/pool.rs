//! Bounded pool of reusable browser instances.
//!
//! Launching Chrome costs hundreds of milliseconds, so browsers are kept
//! between requests. A semaphore bounds how many exist at once; browsers not
//! in use sit on an idle stack. A [`BrowserLease`] hands one out and puts it
//! back when dropped.

use async_trait::async_trait;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{Error, Result};

/// Starts, probes, and stops browser instances for a [`BrowserPool`].
#[async_trait]
pub trait BrowserLauncher: Send + Sync + 'static {
    type Browser: Send + Sync + 'static;

    /// Start a new browser.
    async fn launch(&self) -> Result<Self::Browser>;

    /// Whether the browser can still take commands.
    fn is_alive(&self, browser: &Self::Browser) -> bool;

    /// Shut a browser down.
    async fn close(&self, browser: Self::Browser);
}

/// Pool of at most `max_size` browsers.
pub struct BrowserPool<L: BrowserLauncher> {
    launcher: Arc<L>,
    idle: Mutex<Vec<L::Browser>>,
    slots: Arc<Semaphore>,
    max_size: usize,
    closed: AtomicBool,
}

impl<L: BrowserLauncher> BrowserPool<L> {
    /// Create an empty pool. Browsers are launched on first use.
    #[must_use]
    pub fn new(launcher: L, max_size: usize) -> Arc<Self> {
        let max_size = max_size.max(1);
        Arc::new(Self {
            launcher: Arc::new(launcher),
            idle: Mutex::new(Vec::with_capacity(max_size)),
            slots: Arc::new(Semaphore::new(max_size)),
            max_size,
            closed: AtomicBool::new(false),
        })
    }

    #[must_use]
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Browsers currently waiting for reuse.
    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.idle.lock().map(|idle| idle.len()).unwrap_or_default()
    }

    /// Browsers currently leased out.
    #[must_use]
    pub fn in_use(&self) -> usize {
        self.max_size - self.slots.available_permits()
    }

    /// Check out a browser, waiting while the pool is exhausted.
    ///
    /// Reuses an idle browser when one is still alive, otherwise launches a
    /// new one.
    pub async fn acquire(self: &Arc<Self>) -> Result<BrowserLease<L>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Browser("Browser pool is shut down".to_string()));
        }

        let permit = Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .map_err(|_| Error::Browser("Browser pool is shut down".to_string()))?;

        while let Some(browser) = self.pop_idle() {
            if self.launcher.is_alive(&browser) {
                tracing::debug!("Reusing pooled browser");
                return Ok(self.lease(browser, permit));
            }
            tracing::debug!("Discarding disconnected pooled browser");
            self.launcher.close(browser).await;
        }

        tracing::debug!(max = self.max_size, "Launching new browser");
        let browser = self.launcher.launch().await?;
        Ok(self.lease(browser, permit))
    }

    /// Close every idle browser and refuse further checkouts.
    ///
    /// Leased browsers are closed as they come back.
    pub async fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
        self.slots.close();

        let drained: Vec<L::Browser> = self
            .idle
            .lock()
            .map(|mut idle| idle.drain(..).collect())
            .unwrap_or_default();
        let count = drained.len();
        for browser in drained {
            self.launcher.close(browser).await;
        }
        tracing::info!(closed = count, "Browser pool shut down");
    }

    fn pop_idle(&self) -> Option<L::Browser> {
        self.idle.lock().ok().and_then(|mut idle| idle.pop())
    }

    fn lease(self: &Arc<Self>, browser: L::Browser, permit: OwnedSemaphorePermit) -> BrowserLease<L> {
        BrowserLease {
            pool: Arc::clone(self),
            browser: Some(browser),
            _permit: permit,
        }
    }

    fn release(&self, browser: L::Browser) {
        if !self.closed.load(Ordering::Acquire) && self.launcher.is_alive(&browser) {
            if let Ok(mut idle) = self.idle.lock() {
                idle.push(browser);
                return;
            }
        }

        tracing::debug!("Closing released browser");
        let launcher = Arc::clone(&self.launcher);
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move { launcher.close(browser).await });
        }
    }
}

/// A browser checked out of a [`BrowserPool`]; returned on drop.
pub struct BrowserLease<L: BrowserLauncher> {
    pool: Arc<BrowserPool<L>>,
    browser: Option<L::Browser>,
    _permit: OwnedSemaphorePermit,
}

impl<L: BrowserLauncher> Deref for BrowserLease<L> {
    type Target = L::Browser;

    fn deref(&self) -> &Self::Target {
        match &self.browser {
            Some(browser) => browser,
            None => unreachable!("browser is only taken on drop"),
        }
    }
}

impl<L: BrowserLauncher> Drop for BrowserLease<L> {
    fn drop(&mut self) {
        if let Some(browser) = self.browser.take() {
            self.pool.release(browser);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    struct FakeBrowser {
        id: usize,
        alive: Arc<AtomicBool>,
    }

    #[derive(Default)]
    struct FakeLauncher {
        launched: AtomicUsize,
        closed: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl BrowserLauncher for FakeLauncher {
        type Browser = FakeBrowser;

        async fn launch(&self) -> Result<FakeBrowser> {
            let id = self.launched.fetch_add(1, Ordering::SeqCst);
            Ok(FakeBrowser {
                id,
                alive: Arc::new(AtomicBool::new(true)),
            })
        }

        fn is_alive(&self, browser: &FakeBrowser) -> bool {
            browser.alive.load(Ordering::SeqCst)
        }

        async fn close(&self, _browser: FakeBrowser) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_default_size_is_bounded() {
        let pool = BrowserPool::new(FakeLauncher::default(), 2);
        assert_eq!(pool.max_size(), 2);
        assert_eq!(BrowserPool::new(FakeLauncher::default(), 0).max_size(), 1);
    }

    #[tokio::test]
    async fn test_reuses_released_browser() {
        let pool = BrowserPool::new(FakeLauncher::default(), 2);

        let first_id = {
            let lease = pool.acquire().await.unwrap();
            assert_eq!(pool.in_use(), 1);
            lease.id
        };
        assert_eq!(pool.idle_count(), 1);
        assert_eq!(pool.in_use(), 0);

        let lease = pool.acquire().await.unwrap();
        assert_eq!(lease.id, first_id);
        assert_eq!(pool.launcher.launched.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_launches_up_to_max_then_waits() {
        let pool = BrowserPool::new(FakeLauncher::default(), 2);
        let a = pool.acquire().await.unwrap();
        let b = pool.acquire().await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(pool.launcher.launched.load(Ordering::SeqCst), 2);

        let waiter = {
            let pool = Arc::clone(&pool);
            tokio::spawn(async move { pool.acquire().await.map(|lease| lease.id) })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        let released = a.id;
        drop(a);
        let id = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(id, released);
        assert_eq!(pool.launcher.launched.load(Ordering::SeqCst), 2);
        drop(b);
    }

    #[tokio::test]
    async fn test_dead_browser_is_replaced() {
        let pool = BrowserPool::new(FakeLauncher::default(), 1);
        let alive = {
            let lease = pool.acquire().await.unwrap();
            Arc::clone(&lease.alive)
        };
        alive.store(false, Ordering::SeqCst);

        let lease = pool.acquire().await.unwrap();
        assert_eq!(lease.id, 1);
        assert_eq!(pool.launcher.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_disconnected_on_release_frees_slot() {
        let pool = BrowserPool::new(FakeLauncher::default(), 1);
        {
            let lease = pool.acquire().await.unwrap();
            lease.alive.store(false, Ordering::SeqCst);
        }
        assert_eq!(pool.idle_count(), 0);

        let lease = tokio::time::timeout(Duration::from_secs(1), pool.acquire())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(lease.id, 1);
    }

    #[tokio::test]
    async fn test_shutdown_closes_idle_and_rejects_acquire() {
        let pool = BrowserPool::new(FakeLauncher::default(), 2);
        let a = pool.acquire().await.unwrap();
        let b = pool.acquire().await.unwrap();
        drop(a);
        drop(b);
        assert_eq!(pool.idle_count(), 2);

        pool.shutdown().await;
        assert_eq!(pool.idle_count(), 0);
        assert_eq!(pool.launcher.closed.load(Ordering::SeqCst), 2);
        assert!(pool.acquire().await.is_err());
    }
}
