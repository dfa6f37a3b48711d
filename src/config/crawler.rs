// src/config/crawler.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use crate::stream::crawler::RetryPolicy;

pub const ENV_CONFIG_PATH: &str = "STREAMS_CONFIG_PATH";
pub const ENV_BASE_URL: &str = "STREAMS_BASE_URL";
pub const ENV_MAX_RETRIES: &str = "STREAMS_MAX_RETRIES";
pub const DEFAULT_CONFIG_PATH: &str = "config/streams.toml";

const DEFAULT_BASE_URL: &str = "https://api.stocktwits.com/api/2";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 4;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CrawlerConfig {
    /// API root, without the `/streams/...` path.
    pub base_url: String,
    /// Appended to the symbol in the path, e.g. ".X" for crypto pairs.
    pub symbol_suffix: String,
    pub user_agent: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Pause after a non-JSON body or a non-success status.
    pub decode_backoff_secs: u64,
    /// Pause after a connect/TLS/proxy failure.
    pub transport_backoff_secs: u64,
    /// Consecutive failed fetches tolerated; 0 means retry forever.
    pub max_retries: u32,
    pub out_dir: PathBuf,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            symbol_suffix: String::new(),
            user_agent: concat!("stocktwits-streams/", env!("CARGO_PKG_VERSION")).to_string(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            decode_backoff_secs: 5,
            transport_backoff_secs: 600,
            max_retries: 0,
            out_dir: PathBuf::from("."),
        }
    }
}

impl CrawlerConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading crawler config from {}", path.display()))?;
        let cfg: CrawlerConfig = toml::from_str(&data)
            .with_context(|| format!("parsing crawler config {}", path.display()))?;
        Ok(cfg)
    }

    /// Resolve the config file, then apply env overrides:
    /// 1) `explicit` (from `--config`)
    /// 2) $STREAMS_CONFIG_PATH
    /// 3) config/streams.toml
    /// 4) built-in defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut cfg = match explicit {
            Some(p) => Self::load_from_file(p)?,
            None => Self::load_default_file()?,
        };
        cfg.apply_env_overrides()?;
        cfg.sanitize();
        Ok(cfg)
    }

    fn load_default_file() -> Result<Self> {
        if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from_file(&pb);
            } else {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
        }
        let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_p.exists() {
            return Self::load_from_file(&default_p);
        }
        Ok(Self::default())
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(url) = env::var(ENV_BASE_URL) {
            if !url.trim().is_empty() {
                self.base_url = url.trim().to_string();
            }
        }
        if let Ok(n) = env::var(ENV_MAX_RETRIES) {
            self.max_retries = n
                .trim()
                .parse()
                .with_context(|| format!("{ENV_MAX_RETRIES}={n:?} is not a number"))?;
        }
        Ok(())
    }

    fn sanitize(&mut self) {
        while self.base_url.ends_with('/') {
            self.base_url.pop();
        }
        if self.base_url.is_empty() {
            self.base_url = DEFAULT_BASE_URL.to_string();
        }
        if self.connect_timeout_secs == 0 {
            self.connect_timeout_secs = DEFAULT_CONNECT_TIMEOUT_SECS;
        }
        if self.request_timeout_secs == 0 {
            self.request_timeout_secs = DEFAULT_REQUEST_TIMEOUT_SECS;
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            decode_backoff: Duration::from_secs(self.decode_backoff_secs),
            transport_backoff: Duration::from_secs(self.transport_backoff_secs),
            max_retries: (self.max_retries > 0).then_some(self.max_retries),
        }
    }
}
