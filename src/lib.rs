//! Crawlgate - robots.txt generation and serving.
//!
//! Crawlgate turns a loosely written rule specification into a canonical
//! robots.txt document. The same configuration drives two passes:
//!
//! - a **build pass** (`crawlgate generate`) that resolves the rules once and
//!   writes them, after any hand-written static rules, to an output file;
//! - a **serve pass** (`crawlgate serve`) that answers `GET /robots.txt` with
//!   rules resolved against the incoming request.
//!
//! # Features
//! - Forgiving keys: `User-agent`, `user_agent` and `USERAGENT` all name the
//!   same directive
//! - Values may be literals, lists, or async functions of the request
//! - A single mapping is laid over `User-agent: *` / `Disallow: /`; a list of
//!   mappings is emitted as written
//! - A time-bounded single-flight cache so concurrent requests share one
//!   specification load
//! - TOML / YAML / JSON configuration with environment overrides
//! - Structured tracing via `tracing`
//!
//! # Quick Example
//! ```no_run
//! use std::sync::Arc;
//!
//! use crawlgate::{
//!     FileSystemAdapter, RobotsService,
//!     config::RobotsConfig,
//!     core::{RuleItem, RuleValue},
//! };
//!
//! # #[tokio::main] async fn main() -> eyre::Result<()> {
//! let config = RobotsConfig::builder()
//!     .robots(vec![
//!         RuleItem::new().with("User-agent", "*").with("Disallow", "/admin"),
//!         RuleItem::new().with(
//!             "Sitemap",
//!             RuleValue::from_fn(|request: Option<&crawlgate::core::RequestContext>| {
//!                 let host = request.and_then(|r| r.host.clone());
//!                 format!("https://{}/sitemap.xml", host.as_deref().unwrap_or("example.com"))
//!             }),
//!         ),
//!     ])
//!     .build();
//!
//! let fs = Arc::new(FileSystemAdapter::new());
//! let service = Arc::new(RobotsService::initialize(config, fs.clone(), fs).await?);
//! let app = crawlgate::adapters::router(service);
//! # let _ = app;
//! # Ok(()) }
//! ```
//!
//! # Architecture
//! The crate separates **ports** (traits) from **adapters** (implementations) while keeping
//! rule resolution and caching inside `core`.
//!
//! # Error Handling
//! Each module reports a typed error (`thiserror`); the binary and the build lifecycle
//! hooks return `eyre::Result<T>` with context attached using `WrapErr`.
//!
//! # Concurrency & Data Structures
//! Cache state lives in an `scc::HashMap`, whose per-entry locks make the
//! cache's state transitions atomic; the static rule set is swapped with `arc-swap`.
pub mod config;
pub mod ports;
pub mod tracing_setup;
pub mod utils;

pub mod adapters;
pub mod core;

// Re-export the specific types needed by the binary crate
pub use crate::{
    adapters::FileSystemAdapter,
    core::{RobotsError, RobotsService},
    ports::lifecycle::BuildLifecycle,
    utils::GracefulShutdown,
};
