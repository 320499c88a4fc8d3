//! Articlenator: Twitter/X posts and web articles as e-reader PDFs.
//!
//! This crate provides:
//! - Content sources for X status pages (headless Chrome) and web articles (HTTP)
//! - A pooled headless-browser layer with stealth patches
//! - PDF rendering tuned for A5 e-reader screens
//! - A bookmark scraper that streams entries as the timeline scrolls
//! - Cookie parsing, persistence and live verification
//! - An axum web application with JSON and server-sent-event endpoints

pub mod auth;
pub mod browser;
pub mod config;
pub mod error;
pub mod events;
pub mod html;
pub mod logging;
pub mod pdf;
pub mod pipeline;
pub mod server;
pub mod sources;
pub mod twitter;
pub mod version;

// Re-export main types
pub use auth::{CookieStore, CookieValidation, CookieVerifier, Session};
pub use config::Config;
pub use error::{Error, Result};
pub use events::{ConversionReport, ProgressEvent};
pub use pdf::{PdfGenerator, PdfPrinter};
pub use pipeline::{ConvertError, Pipeline, PipelineConfig, Resolution};
pub use server::{build_router, AppState};
pub use sources::{Article, ContentSource, SourceRegistry};
pub use twitter::{BookmarkEntry, BookmarkFeed, TweetData};
