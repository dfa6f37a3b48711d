// src/stream/crawler.rs
//! Backward crawl over the symbol stream.
//!
//! Every request depends on the cursor returned by the previous page, so
//! fetches are strictly sequential. Recoverable failures sleep a fixed
//! backoff and ask for the same cursor again.

use metrics::counter;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::stream::ensure_metrics_described;
use crate::stream::error::{CrawlError, FetchError};
use crate::stream::reader::read_messages;
use crate::stream::source::PageSource;
use crate::stream::types::{Accumulator, Cursor, DateWindow, Page};

/// Rough page size used to turn a message count into a page count.
pub const MESSAGES_PER_PAGE_ESTIMATE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub decode_backoff: Duration,
    pub transport_backoff: Duration,
    /// `None` retries forever.
    pub max_retries: Option<u32>,
}

impl RetryPolicy {
    /// No pauses; handy for tests and local replays.
    pub fn immediate(max_retries: Option<u32>) -> Self {
        Self {
            decode_backoff: Duration::ZERO,
            transport_backoff: Duration::ZERO,
            max_retries,
        }
    }

    pub fn backoff_for(&self, err: &FetchError) -> Duration {
        if err.is_transport() {
            self.transport_backoff
        } else {
            self.decode_backoff
        }
    }
}

pub struct Crawler<'a, S: PageSource + ?Sized> {
    source: &'a S,
    policy: RetryPolicy,
}

impl<'a, S: PageSource + ?Sized> Crawler<'a, S> {
    pub fn new(source: &'a S, policy: RetryPolicy) -> Self {
        ensure_metrics_described();
        Self { source, policy }
    }

    /// Walk back from the stream head (or from `start_cursor`) until the
    /// oldest message predates `window.start` or history runs out.
    ///
    /// The result may still contain messages outside the window; the
    /// selector trims it.
    pub async fn history(
        &self,
        symbol: &str,
        window: DateWindow,
        start_cursor: Option<Cursor>,
    ) -> Result<Accumulator, CrawlError> {
        let mut failures = 0u32;
        let first = self
            .fetch_until_ok(symbol, start_cursor.as_ref(), &mut failures)
            .await?;
        let mut cursor = first.next_cursor().cloned();
        let mut acc = read_messages(&first, None)?;
        self.record_page(&first);

        while acc.needs_older_than(window.start) {
            let Some(max) = cursor.clone() else {
                info!(symbol, kept = acc.len(), "cursor exhausted; history ends here");
                break;
            };

            match self.source.fetch_page(symbol, Some(&max)).await {
                Ok(page) => {
                    failures = 0;
                    self.record_page(&page);
                    cursor = page.next_cursor().cloned();
                    acc = read_messages(&page, Some(acc))?;
                }
                Err(e) => {
                    let pause = self.record_failure(e, &mut failures)?;
                    tokio::time::sleep(pause).await;
                }
            }

            // Everything gathered so far is newer than the window.
            if acc.min_date().is_some_and(|d| d > window.end) {
                debug!(symbol, dropped = acc.len(), "all records after window end; discarding");
                acc.clear();
            }
        }

        info!(
            symbol,
            records = acc.len(),
            oldest = ?acc.min_date(),
            "history crawl finished"
        );
        Ok(acc)
    }

    /// Head page plus `count / 3` older pages. The size is approximate.
    pub async fn latest(&self, symbol: &str, count: usize) -> Result<Accumulator, CrawlError> {
        let mut failures = 0u32;
        let first = self.fetch_until_ok(symbol, None, &mut failures).await?;
        let mut cursor = first.next_cursor().cloned();
        let mut acc = read_messages(&first, None)?;
        self.record_page(&first);

        let rounds = count / MESSAGES_PER_PAGE_ESTIMATE;
        for round in 0..rounds {
            let Some(max) = cursor.clone() else {
                info!(symbol, round, "cursor exhausted before requested count");
                break;
            };

            match self.source.fetch_page(symbol, Some(&max)).await {
                Ok(page) => {
                    failures = 0;
                    self.record_page(&page);
                    cursor = page.next_cursor().cloned();
                    acc = read_messages(&page, Some(acc))?;
                }
                Err(e) => {
                    // The page is skipped; only transport failures wait.
                    let transport = e.is_transport();
                    let pause = self.record_failure(e, &mut failures)?;
                    if transport {
                        tokio::time::sleep(pause).await;
                    }
                }
            }
        }

        info!(symbol, records = acc.len(), requested = count, "latest crawl finished");
        Ok(acc)
    }

    async fn fetch_until_ok(
        &self,
        symbol: &str,
        max: Option<&Cursor>,
        failures: &mut u32,
    ) -> Result<Page, CrawlError> {
        loop {
            match self.source.fetch_page(symbol, max).await {
                Ok(page) => {
                    *failures = 0;
                    return Ok(page);
                }
                Err(e) => {
                    let pause = self.record_failure(e, failures)?;
                    tokio::time::sleep(pause).await;
                }
            }
        }
    }

    /// Count and log a failed fetch; returns the pause before the retry.
    fn record_failure(&self, err: FetchError, failures: &mut u32) -> Result<Duration, CrawlError> {
        if !err.is_recoverable() {
            return Err(err.into());
        }

        match &err {
            FetchError::Transport { .. } => counter!("crawl_transport_errors_total").increment(1),
            FetchError::Throttled { .. } => counter!("crawl_throttled_total").increment(1),
            _ => counter!("crawl_decode_errors_total").increment(1),
        }

        *failures += 1;
        if let Some(max) = self.policy.max_retries {
            if *failures > max {
                warn!(source = self.source.name(), attempts = *failures, error = %err, "retry budget exhausted");
                return Err(CrawlError::RetriesExhausted {
                    attempts: *failures,
                    last: err,
                });
            }
        }

        let pause = self.policy.backoff_for(&err);
        warn!(
            source = self.source.name(),
            url = err.url(),
            error = %err,
            failures = *failures,
            pause_secs = pause.as_secs(),
            "page fetch failed; retrying"
        );
        Ok(pause)
    }

    fn record_page(&self, page: &Page) {
        counter!("crawl_pages_total").increment(1);
        counter!("crawl_messages_total").increment(page.messages.len() as u64);
    }
}
