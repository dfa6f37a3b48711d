// src/logging.rs
//! Per-run logger. Built once at startup and attached to the run's future,
//! so nothing is installed process-wide.

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing::Dispatch;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "stocktwits_streams=info,warn";
const FILE_FILTER: &str = "stocktwits_streams=debug,warn";

pub struct RunLog {
    dispatch: Dispatch,
}

impl RunLog {
    /// Compact logs on stderr only.
    pub fn stderr() -> Self {
        let subscriber = tracing_subscriber::registry()
            .with(filter_or(DEFAULT_FILTER))
            .with(fmt::layer().compact().with_writer(std::io::stderr));
        Self {
            dispatch: Dispatch::new(subscriber),
        }
    }

    /// Append plain-text logs to `path` (created if missing) and mirror them on stderr.
    pub fn append_to(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating log dir {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening run log {}", path.display()))?;

        let subscriber = tracing_subscriber::registry()
            .with(filter_or(FILE_FILTER))
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(fmt::layer().compact().with_writer(std::io::stderr));
        Ok(Self {
            dispatch: Dispatch::new(subscriber),
        })
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }
}

fn filter_or(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}
