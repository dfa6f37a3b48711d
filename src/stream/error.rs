//! Error taxonomy for page fetches and the crawl loop.

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure of a single page request.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, TLS, proxy or timeout failure; usually means we are being blocked.
    #[error("transport failure for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: BoxError,
    },

    /// Body is not JSON at all (outage or rate-limit page).
    #[error("{url} JSON response could not be decoded: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// Upstream answered with a non-success status.
    #[error("{url} answered HTTP {status}")]
    Throttled { url: String, status: u16 },

    /// Valid JSON that is not a stream page.
    #[error("{url} returned an unexpected payload: {source}")]
    Shape {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    pub fn url(&self) -> &str {
        match self {
            Self::Transport { url, .. }
            | Self::Decode { url, .. }
            | Self::Throttled { url, .. }
            | Self::Shape { url, .. } => url,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Shape { .. })
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

/// A message that decoded as JSON but cannot be normalized.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("message {message_id}: created_at {value:?} does not match %Y-%m-%dT%H:%M:%SZ")]
    BadTimestamp {
        message_id: u64,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error("giving up after {attempts} consecutive failed fetches")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: FetchError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_shape_errors_are_fatal() {
        let t = FetchError::Transport {
            url: "u".into(),
            source: "proxy refused".into(),
        };
        let h = FetchError::Throttled {
            url: "u".into(),
            status: 429,
        };
        let d = FetchError::Decode {
            url: "u".into(),
            source: serde_json::from_str::<serde_json::Value>("<html>").unwrap_err(),
        };
        let s = FetchError::Shape {
            url: "u".into(),
            source: serde_json::from_str::<u8>("\"x\"").unwrap_err(),
        };
        assert!(t.is_recoverable() && t.is_transport());
        assert!(h.is_recoverable() && !h.is_transport());
        assert!(d.is_recoverable());
        assert!(!s.is_recoverable());
        assert!(d.to_string().contains("could not be decoded"));
    }
}
