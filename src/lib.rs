// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod app;
pub mod cli;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod output;
pub mod stream;

// ---- Re-exports for stable public API ----
pub use crate::config::CrawlerConfig;
pub use crate::stream::{Crawler, RetryPolicy};
