//! Pooled headless browsers.

mod chrome;
pub mod page;
mod pool;
mod tab;

pub use chrome::{
    session_cookies, ChromeBrowser, ChromeLauncher, ChromePool, STEALTH_SCRIPT, USER_AGENT,
};
pub use pool::{BrowserLauncher, BrowserLease, BrowserPool};
pub use tab::{Tab, TabGuard};
