// tests/crawl_history.rs
use chrono::NaiveDate;
use std::collections::HashSet;
use stocktwits_streams::config::CrawlerConfig;
use stocktwits_streams::output::select_history;
use stocktwits_streams::stream::source::ScriptedSource;
use stocktwits_streams::stream::types::{Cursor, DateWindow, Page, Sentiment};
use stocktwits_streams::stream::{CrawlError, Crawler, FetchError, RetryPolicy};

fn page(since: Option<u64>, msgs: &[(u64, &str)]) -> Page {
    let messages: Vec<serde_json::Value> = msgs
        .iter()
        .map(|(id, day)| {
            serde_json::json!({
                "id": id,
                "body": format!("message {id}"),
                "created_at": format!("{day}T12:00:00Z"),
                "user": {"id": 100 + id, "username": format!("user{id}")},
                "entities": {"sentiment": null}
            })
        })
        .collect();
    serde_json::from_value(serde_json::json!({
        "messages": messages,
        "cursor": {"since": since}
    }))
    .unwrap()
}

fn window(start: &str, end: &str) -> DateWindow {
    DateWindow::new(
        NaiveDate::parse_from_str(start, "%Y-%m-%d").unwrap(),
        NaiveDate::parse_from_str(end, "%Y-%m-%d").unwrap(),
    )
    .unwrap()
}

fn decode_error() -> FetchError {
    FetchError::Decode {
        url: "scripted://SYM".into(),
        source: serde_json::from_str::<serde_json::Value>("<html>rate limited</html>").unwrap_err(),
    }
}

fn two_page_script() -> Vec<Result<Page, FetchError>> {
    vec![
        Ok(page(Some(2), &[(3, "2022-07-12"), (2, "2022-07-11")])),
        Ok(page(None, &[(1, "2022-07-10")])),
    ]
}

#[tokio::test]
async fn two_pages_until_cursor_runs_out() {
    let src = ScriptedSource::new(two_page_script());
    let w = window("2022-07-10", "2022-07-12");

    let acc = Crawler::new(&src, RetryPolicy::immediate(Some(3)))
        .history("SYM", w, None)
        .await
        .unwrap();
    let rows = select_history(acc, &w);

    let ids: Vec<u64> = rows.iter().map(|r| r.message_id).collect();
    assert_eq!(ids, vec![3, 2, 1]);
    assert_eq!(
        *src.calls.lock().unwrap(),
        vec![None, Some("2".to_string())],
        "no fetch after the cursor went null"
    );
}

#[tokio::test]
async fn decode_error_is_retried_with_same_cursor() {
    let mut script = two_page_script();
    script.insert(1, Err(decode_error()));
    let src = ScriptedSource::new(script);
    let w = window("2022-07-10", "2022-07-12");

    let acc = Crawler::new(&src, RetryPolicy::immediate(Some(3)))
        .history("SYM", w, None)
        .await
        .unwrap();

    let clean_src = ScriptedSource::new(two_page_script());
    let clean = Crawler::new(&clean_src, RetryPolicy::immediate(Some(3)))
        .history("SYM", w, None)
        .await
        .unwrap();

    assert_eq!(select_history(acc, &w), select_history(clean, &w));
    assert_eq!(
        *src.calls.lock().unwrap(),
        vec![None, Some("2".to_string()), Some("2".to_string())]
    );
}

#[tokio::test]
async fn exhausted_history_before_start_is_not_an_error() {
    let src = ScriptedSource::new(vec![Ok(page(
        None,
        &[(3, "2022-07-12"), (2, "2022-07-11")],
    ))]);
    let w = window("2022-07-01", "2022-07-12");

    let acc = Crawler::new(&src, RetryPolicy::immediate(Some(3)))
        .history("SYM", w, None)
        .await
        .unwrap();
    assert_eq!(acc.len(), 2);
    assert_eq!(src.call_count(), 1);
}

#[tokio::test]
async fn records_newer_than_window_are_discarded_while_crawling() {
    let src = ScriptedSource::new(vec![
        Ok(page(Some(4), &[(5, "2022-07-14"), (4, "2022-07-13")])),
        Ok(page(Some(3), &[(3, "2022-07-12")])),
        Ok(page(Some(1), &[(2, "2022-07-11"), (1, "2022-07-10")])),
        Ok(page(None, &[(0, "2022-07-09")])),
    ]);
    let w = window("2022-07-10", "2022-07-11");

    let acc = Crawler::new(&src, RetryPolicy::immediate(Some(3)))
        .history("SYM", w, None)
        .await
        .unwrap();
    let kept: Vec<u64> = acc.records().iter().map(|m| m.message_id).collect();
    assert_eq!(kept, vec![2, 1, 0]);

    let rows = select_history(acc, &w);
    let ids: Vec<u64> = rows.iter().map(|r| r.message_id).collect();
    assert_eq!(ids, vec![2, 1]);
    assert_eq!(src.call_count(), 4);
}

#[tokio::test]
async fn result_stays_in_window_without_duplicates() {
    // Overlapping pages repeat the boundary message.
    let src = ScriptedSource::new(vec![
        Ok(page(Some(3), &[(5, "2022-07-13"), (4, "2022-07-12"), (3, "2022-07-11")])),
        Ok(page(Some(1), &[(3, "2022-07-11"), (2, "2022-07-10"), (1, "2022-07-10")])),
        Ok(page(Some(0), &[(1, "2022-07-10"), (0, "2022-07-08")])),
    ]);
    let w = window("2022-07-10", "2022-07-12");

    let acc = Crawler::new(&src, RetryPolicy::immediate(Some(3)))
        .history("SYM", w, None)
        .await
        .unwrap();
    let rows = select_history(acc, &w);

    let unique: HashSet<_> = rows.iter().cloned().collect();
    assert_eq!(unique.len(), rows.len());
    assert!(rows
        .iter()
        .all(|r| r.created_at.as_str() >= "2022-07-10" && r.created_at.as_str() < "2022-07-13"));
    let ids: Vec<u64> = rows.iter().map(|r| r.message_id).collect();
    assert_eq!(ids, vec![4, 3, 2, 1]);
}

#[tokio::test]
async fn explicit_max_id_seeds_the_first_request() {
    let src = ScriptedSource::new(vec![Ok(page(None, &[(174_999_999, "2018-06-01")]))]);
    let w = window("2018-01-01", "2018-12-31");

    Crawler::new(&src, RetryPolicy::immediate(Some(3)))
        .history("AA", w, Some(Cursor::new("175000000")))
        .await
        .unwrap();
    assert_eq!(
        *src.calls.lock().unwrap(),
        vec![Some("175000000".to_string())]
    );
}

#[tokio::test]
async fn unexpected_payload_is_fatal() {
    let shape = FetchError::Shape {
        url: "scripted://SYM".into(),
        source: serde_json::from_str::<Page>(r#"{"errors":[{"message":"oops"}]}"#).unwrap_err(),
    };
    let src = ScriptedSource::new(vec![
        Ok(page(Some(2), &[(3, "2022-07-12")])),
        Err(shape),
        Ok(page(None, &[(1, "2022-07-01")])),
    ]);
    let w = window("2022-07-10", "2022-07-12");

    let err = Crawler::new(&src, RetryPolicy::immediate(None))
        .history("SYM", w, None)
        .await
        .unwrap_err();
    assert!(matches!(err, CrawlError::Fetch(FetchError::Shape { .. })));
    assert_eq!(src.call_count(), 2);
}

#[tokio::test]
async fn unlisted_sentiment_label_does_not_lose_the_crawl() {
    let second: Page = serde_json::from_value(serde_json::json!({
        "messages": [{
            "id": 2, "body": "flat day", "created_at": "2022-07-11T12:00:00Z",
            "user": {"id": 102, "username": "user2"},
            "entities": {"sentiment": {"basic": "Neutral"}}
        }],
        "cursor": {"since": null}
    }))
    .unwrap();
    let src = ScriptedSource::new(vec![Ok(page(Some(2), &[(3, "2022-07-12")])), Ok(second)]);
    let w = window("2022-07-10", "2022-07-12");

    let acc = Crawler::new(&src, RetryPolicy::immediate(None))
        .history("SYM", w, None)
        .await
        .unwrap();
    let rows = select_history(acc, &w);

    let tags: Vec<(u64, &str)> = rows
        .iter()
        .map(|r| (r.message_id, r.sentiment_tag.as_str()))
        .collect();
    assert_eq!(tags, vec![(3, "NIL"), (2, "Neutral")]);
    assert_eq!(
        Sentiment::from_label("Neutral"),
        Sentiment::Other("Neutral".into())
    );
}

#[tokio::test]
async fn default_policy_outlasts_a_long_outage() {
    let mut policy = CrawlerConfig::default().retry_policy();
    policy.decode_backoff = std::time::Duration::ZERO;
    policy.transport_backoff = std::time::Duration::ZERO;

    let mut script = vec![Ok(page(Some(2), &[(3, "2022-07-12")]))];
    script.extend((0..50).map(|_| Err(decode_error())));
    script.push(Ok(page(None, &[(1, "2022-07-09")])));
    let src = ScriptedSource::new(script);
    let w = window("2022-07-10", "2022-07-12");

    let acc = Crawler::new(&src, policy)
        .history("SYM", w, None)
        .await
        .unwrap();
    let ids: Vec<u64> = select_history(acc, &w).iter().map(|r| r.message_id).collect();
    assert_eq!(ids, vec![3]);
    assert_eq!(src.call_count(), 52);
}
