// src/stream/source.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::histogram;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use crate::config::CrawlerConfig;
use crate::stream::error::FetchError;
use crate::stream::types::{Cursor, Page};

/// Where pages come from. One call = one upstream request.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch the newest page (`max = None`) or the page older than `max`.
    async fn fetch_page(&self, symbol: &str, max: Option<&Cursor>) -> Result<Page, FetchError>;
    fn name(&self) -> &'static str;
}

/// Decode a response body: non-JSON is recoverable, wrong JSON is not.
pub fn decode_page(url: &str, body: &str) -> Result<Page, FetchError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })?;
    serde_json::from_value(value).map_err(|source| FetchError::Shape {
        url: url.to_string(),
        source,
    })
}

pub struct HttpPageSource {
    client: reqwest::Client,
    base_url: String,
    symbol_suffix: String,
}

impl HttpPageSource {
    pub fn new(cfg: &CrawlerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(cfg.user_agent.as_str())
            .connect_timeout(Duration::from_secs(cfg.connect_timeout_secs))
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()
            .context("building reqwest client")?;
        Ok(Self {
            client,
            base_url: cfg.base_url.clone(),
            symbol_suffix: cfg.symbol_suffix.clone(),
        })
    }

    pub fn page_url(&self, symbol: &str, max: Option<&Cursor>) -> String {
        let mut url = format!(
            "{}/streams/symbol/{}{}.json",
            self.base_url, symbol, self.symbol_suffix
        );
        if let Some(c) = max {
            url.push_str("?max=");
            url.push_str(c.as_str());
        }
        url
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch_page(&self, symbol: &str, max: Option<&Cursor>) -> Result<Page, FetchError> {
        let url = self.page_url(symbol, max);
        let t0 = std::time::Instant::now();

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                url: url.clone(),
                source: Box::new(e),
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Throttled {
                url,
                status: status.as_u16(),
            });
        }

        let body = resp.text().await.map_err(|e| FetchError::Transport {
            url: url.clone(),
            source: Box::new(e),
        })?;

        histogram!("crawl_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        decode_page(&url, &body)
    }

    fn name(&self) -> &'static str {
        "stocktwits"
    }
}

// --- Test helper ---

/// Replays a fixed script of page results and records every requested cursor.
pub struct ScriptedSource {
    script: Mutex<VecDeque<Result<Page, FetchError>>>,
    pub calls: Mutex<Vec<Option<String>>>,
}

impl ScriptedSource {
    pub fn new(script: Vec<Result<Page, FetchError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(vec![]),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl PageSource for ScriptedSource {
    async fn fetch_page(&self, symbol: &str, max: Option<&Cursor>) -> Result<Page, FetchError> {
        self.calls
            .lock()
            .unwrap()
            .push(max.map(|c| c.as_str().to_string()));
        let url = format!("scripted://{symbol}?max={}", max.map(Cursor::as_str).unwrap_or(""));
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(FetchError::Transport {
                    url,
                    source: "script exhausted".into(),
                })
            })
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
