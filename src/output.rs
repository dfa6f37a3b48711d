// src/output.rs
//! Window selection, exact-duplicate removal and CSV serialization.

use anyhow::{anyhow, Context, Result};
use flate2::write::GzEncoder;
use serde::Serialize;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::stream::types::{sentiment_tag, Accumulator, DateWindow, Message};

pub const HEADER: [&str; 6] = [
    "created_at",
    "user_name",
    "user_id",
    "sentiment_tag",
    "text",
    "message_id",
];

/// A message as written to the table (derived date dropped).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct OutputRow {
    pub created_at: String,
    pub user_name: String,
    pub user_id: u64,
    pub sentiment_tag: String,
    pub text: String,
    pub message_id: u64,
}

impl From<Message> for OutputRow {
    fn from(m: Message) -> Self {
        Self {
            created_at: m.created_at,
            user_name: m.user_name,
            user_id: m.user_id,
            sentiment_tag: sentiment_tag(m.sentiment.as_ref()).to_string(),
            text: m.text,
            message_id: m.message_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
}

/// Keep rows inside `window`, drop exact duplicates (first one wins).
pub fn select_history(acc: Accumulator, window: &DateWindow) -> Vec<OutputRow> {
    dedup_rows(
        acc.into_records()
            .into_iter()
            .filter(|m| window.contains(m.date))
            .map(OutputRow::from),
    )
}

pub fn select_latest(acc: Accumulator) -> Vec<OutputRow> {
    dedup_rows(acc.into_records().into_iter().map(OutputRow::from))
}

fn dedup_rows(rows: impl IntoIterator<Item = OutputRow>) -> Vec<OutputRow> {
    let mut seen: HashSet<OutputRow> = HashSet::new();
    let mut keep = Vec::new();
    for row in rows {
        if seen.insert(row.clone()) {
            keep.push(row);
        }
    }
    keep
}

pub fn history_file_name(symbol: &str, window: &DateWindow) -> String {
    format!(
        "{symbol}_{}_{}.csv.gz",
        window.start.format("%Y%m%d"),
        window.end.format("%Y%m%d")
    )
}

pub fn history_log_name(symbol: &str, window: &DateWindow) -> String {
    format!(
        "{symbol}_{}_{}.log",
        window.start.format("%Y%m%d"),
        window.end.format("%Y%m%d")
    )
}

pub fn latest_file_name(symbol: &str, count: usize) -> String {
    format!("{symbol}_{count}.csv")
}

/// Write `rows` as CSV with a header, overwriting `path`.
pub fn write_table(rows: &[OutputRow], path: &Path, compression: Compression) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output dir {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let out = BufWriter::new(file);

    match compression {
        Compression::None => {
            let mut out = write_csv(rows, out)?;
            out.flush()?;
        }
        Compression::Gzip => {
            let enc = GzEncoder::new(out, flate2::Compression::default());
            let enc = write_csv(rows, enc)?;
            enc.finish()
                .with_context(|| format!("finishing gzip stream {}", path.display()))?
                .flush()?;
        }
    }
    Ok(())
}

fn write_csv<W: Write>(rows: &[OutputRow], w: W) -> Result<W> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(w);
    // Header goes out even for an empty table.
    wtr.write_record(HEADER)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    wtr.into_inner()
        .map_err(|e| anyhow!("flushing csv writer: {}", e.error()))
}
