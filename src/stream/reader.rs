// src/stream/reader.rs
use chrono::NaiveDateTime;

use crate::stream::error::ReadError;
use crate::stream::types::{Accumulator, Message, Page, RawMessage, Sentiment, CREATED_AT_FORMAT};

/// Normalize every message of one page, in page order.
pub fn read_page(page: &Page) -> Result<Vec<Message>, ReadError> {
    page.messages.iter().map(read_message).collect()
}

/// Append a page's messages to `acc` (or to a fresh accumulator).
pub fn read_messages(page: &Page, acc: Option<Accumulator>) -> Result<Accumulator, ReadError> {
    let mut acc = acc.unwrap_or_default();
    for m in read_page(page)? {
        acc.push(m);
    }
    Ok(acc)
}

pub fn parse_created_at(s: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(s, CREATED_AT_FORMAT)
}

fn read_message(raw: &RawMessage) -> Result<Message, ReadError> {
    let date = parse_created_at(&raw.created_at)
        .map_err(|source| ReadError::BadTimestamp {
            message_id: raw.id,
            value: raw.created_at.clone(),
            source,
        })?
        .date();

    // null at any level of entities.sentiment.basic -> no annotation
    let sentiment = raw
        .entities
        .as_ref()
        .and_then(|e| e.sentiment.as_ref())
        .and_then(|s| s.basic.as_deref())
        .map(Sentiment::from_label);

    Ok(Message {
        message_id: raw.id,
        created_at: raw.created_at.clone(),
        date,
        user_name: raw.user.username.clone(),
        user_id: raw.user.id,
        sentiment,
        text: raw.body.clone(),
    })
}
