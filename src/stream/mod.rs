// src/stream/mod.rs
pub mod crawler;
pub mod error;
pub mod reader;
pub mod source;
pub mod types;

use metrics::{describe_counter, describe_histogram};
use once_cell::sync::OnceCell;

pub use crawler::{Crawler, RetryPolicy};
pub use error::{CrawlError, FetchError, ReadError};
pub use source::{HttpPageSource, PageSource};
pub use types::{Accumulator, Cursor, DateWindow, Message, Page, Sentiment};

/// One-time metrics registration (so series carry descriptions in the snapshot).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("crawl_pages_total", "Pages fetched and decoded.");
        describe_counter!("crawl_messages_total", "Messages read from fetched pages.");
        describe_counter!(
            "crawl_decode_errors_total",
            "Responses whose body was not JSON."
        );
        describe_counter!(
            "crawl_transport_errors_total",
            "Connect/TLS/proxy failures while fetching a page."
        );
        describe_counter!(
            "crawl_throttled_total",
            "Responses with a non-success HTTP status."
        );
        describe_histogram!("crawl_fetch_ms", "Page request time in milliseconds.");
    });
}
