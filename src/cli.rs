// src/cli.rs
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use regex::Regex;
use std::path::PathBuf;

/// Download StockTwits streams of a symbol into a CSV table.
///
/// The crawl walks the stream backwards, so older start dates take longer.
/// For old windows pass MAX_ID to start the walk near a known message id.
#[derive(Parser, Debug)]
#[command(name = "stocktwits-streams", version)]
pub struct Cli {
    /// Crawler config file (TOML). Defaults to $STREAMS_CONFIG_PATH, then config/streams.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory for tables and run logs (overrides the config file).
    #[arg(long, global = true)]
    pub out_dir: Option<PathBuf>,

    /// Consecutive failed fetches tolerated before giving up; 0 retries forever.
    #[arg(long, global = true)]
    pub max_retries: Option<u32>,

    /// Write a Prometheus text snapshot of the run's counters here.
    #[arg(long, global = true)]
    pub metrics_out: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Approximately the COUNT most recent messages
    Latest {
        #[arg(value_parser = parse_symbol)]
        symbol: String,
        count: usize,
    },
    /// All messages between START and END (inclusive, YYYY-MM-DD)
    History {
        #[arg(value_parser = parse_symbol)]
        symbol: String,
        #[arg(value_parser = parse_date)]
        start: NaiveDate,
        #[arg(value_parser = parse_date)]
        end: NaiveDate,
        /// Message id to start walking back from instead of the stream head
        max_id: Option<String>,
    },
}

pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("{s:?} is not YYYY-MM-DD: {e}"))
}

pub fn parse_symbol(s: &str) -> Result<String, String> {
    static RE_SYMBOL: OnceCell<Regex> = OnceCell::new();
    let re = RE_SYMBOL.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._\-]{0,31}$").expect("symbol regex is valid")
    });
    if re.is_match(s) {
        Ok(s.to_string())
    } else {
        Err(format!("{s:?} is not a ticker symbol"))
    }
}
