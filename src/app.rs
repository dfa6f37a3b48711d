// src/app.rs
//! One invocation: load config, crawl, select, write.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;
use tracing::instrument::WithSubscriber;

use crate::cli::{Cli, Command};
use crate::config::CrawlerConfig;
use crate::logging::RunLog;
use crate::metrics::MetricsSnapshot;
use crate::output::{
    history_file_name, history_log_name, latest_file_name, select_history, select_latest,
    write_table, Compression,
};
use crate::stream::{Crawler, Cursor, DateWindow, HttpPageSource, PageSource};

/// Run the parsed command and return the path of the written table.
pub async fn run(cli: Cli) -> Result<PathBuf> {
    let mut cfg = CrawlerConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.out_dir {
        cfg.out_dir = dir;
    }
    if let Some(n) = cli.max_retries {
        cfg.max_retries = n;
    }

    let metrics = match cli.metrics_out {
        Some(_) => Some(MetricsSnapshot::install()?),
        None => None,
    };

    let source = HttpPageSource::new(&cfg)?;

    let written = match cli.command {
        Command::Latest { symbol, count } => {
            let log = RunLog::stderr();
            run_latest(&source, &cfg, &symbol, count)
                .with_subscriber(log.dispatch().clone())
                .await?
        }
        Command::History {
            symbol,
            start,
            end,
            max_id,
        } => {
            let window = DateWindow::new(start, end)?;
            let log = RunLog::append_to(&cfg.out_dir.join(history_log_name(&symbol, &window)))?;
            run_history(&source, &cfg, &symbol, window, max_id.map(Cursor::new))
                .with_subscriber(log.dispatch().clone())
                .await?
        }
    };

    if let (Some(m), Some(path)) = (metrics, cli.metrics_out) {
        m.write_to(&path)?;
    }
    Ok(written)
}

pub async fn run_history<S: PageSource + ?Sized>(
    source: &S,
    cfg: &CrawlerConfig,
    symbol: &str,
    window: DateWindow,
    start_cursor: Option<Cursor>,
) -> Result<PathBuf> {
    let started = Instant::now();
    info!(
        symbol,
        start = %window.start,
        end = %window.end,
        max_id = ?start_cursor.as_ref().map(Cursor::as_str),
        "history crawl started"
    );

    let acc = Crawler::new(source, cfg.retry_policy())
        .history(symbol, window, start_cursor)
        .await
        .with_context(|| format!("crawling {symbol} history"))?;

    let rows = select_history(acc, &window);
    let path = cfg.out_dir.join(history_file_name(symbol, &window));
    write_table(&rows, &path, Compression::Gzip)?;

    info!(rows = rows.len(), path = %path.display(), "history table written");
    info!("Execution took {:.3} seconds.", started.elapsed().as_secs_f64());
    Ok(path)
}

pub async fn run_latest<S: PageSource + ?Sized>(
    source: &S,
    cfg: &CrawlerConfig,
    symbol: &str,
    count: usize,
) -> Result<PathBuf> {
    let started = Instant::now();
    let acc = Crawler::new(source, cfg.retry_policy())
        .latest(symbol, count)
        .await
        .with_context(|| format!("crawling latest {symbol} messages"))?;

    let rows = select_latest(acc);
    let path = cfg.out_dir.join(latest_file_name(symbol, count));
    write_table(&rows, &path, Compression::None)?;

    info!(
        rows = rows.len(),
        path = %path.display(),
        elapsed_secs = started.elapsed().as_secs_f64(),
        "latest table written"
    );
    Ok(path)
}
