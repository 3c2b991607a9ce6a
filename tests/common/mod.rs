#![allow(dead_code)]

mod scripted;

pub use scripted::*;

use campaign_stream::aggregator::{AggregatorHandle, View};
use campaign_stream::connection::RetryPolicy;
use campaign_stream::job::JobRequest;
use campaign_stream::persistence::SqliteSnapshots;
use campaign_stream::transport::{Connection, Transport, TransportError};
use std::time::Duration;

pub fn line(time: &str, csq: u32) -> String {
    format!("실배송 & 포토 리뷰 & 쿠팡 & 15,000원 & 500 P & {time} & 상품 {csq} & https://shop.test/view?csq={csq}")
}

pub fn record(kind: &str, time: &str, csq: u32) -> Step {
    frame(kind, &line(time, csq))
}

pub fn job() -> JobRequest {
    JobRequest::full_range("PHPSESSID-test", vec!["01일".into(), "02일".into()], vec![])
}

/// Default retry budget with a delay short enough to run in real time.
/// The SQLite pool works on its own thread, so these tests cannot pause time.
pub fn policy() -> RetryPolicy {
    RetryPolicy {
        max_retries: 5,
        delay: Duration::from_millis(20),
    }
}

pub async fn snapshots() -> SqliteSnapshots {
    SqliteSnapshots::open("sqlite::memory:").await.unwrap()
}

/// Wait until the published view satisfies `pred`.
pub async fn wait_until(handle: &AggregatorHandle, pred: impl Fn(&View) -> bool) -> View {
    let mut rx = handle.subscribe();
    loop {
        {
            let view = rx.borrow_and_update();
            if pred(&view) {
                return view.clone();
            }
        }
        rx.changed().await.expect("aggregator stopped");
    }
}
