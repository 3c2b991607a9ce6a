//! Connection manager: owns the stream to the crawler and the reconnect state
//! machine.
//!
//! ```text
//! Idle ──► Connecting ──► Streaming ──► Closed(Completed | RemoteError)
//!  │           ▲  │           │
//!  │           │  └───────────┴──► (dropped) ──► AwaitingRetry ──┐
//!  │           └──────────────────────────────────────────────────┘
//!  └──► Closed(ConfigInvalid)          (retries exhausted) ──► Closed(RetryExhausted)
//! ```
//!
//! Any state can be cancelled into `Closed(Cancelled)`.
use crate::codec;
use crate::config;
use crate::envelope::{Inbound, Outbound};
use crate::job::JobRequest;
use crate::model::{Kind, RecordId, Row};
use crate::transport::{Connection, Transport, TransportError};
use futures::future::BoxFuture;
use std::collections::BTreeSet;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Sleep;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    Completed,
    RemoteError(String),
    ConfigInvalid(String),
    /// Transport ended without `done`/`error`. Transient: followed by a retry
    /// or by `RetryExhausted`.
    Dropped,
    RetryExhausted,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnState {
    Idle,
    Connecting,
    Streaming,
    AwaitingRetry,
    Closed(CloseReason),
}

impl ConnState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnState::Closed(reason) if *reason != CloseReason::Dropped)
    }

    /// Human-readable status for the UI layer.
    pub fn status_line(&self) -> String {
        match self {
            ConnState::Idle => "waiting for a job".to_string(),
            ConnState::Connecting => "connecting to the crawler...".to_string(),
            ConnState::Streaming => "receiving data...".to_string(),
            ConnState::AwaitingRetry => "connection lost, retrying...".to_string(),
            ConnState::Closed(CloseReason::Completed) => "all data received".to_string(),
            ConnState::Closed(CloseReason::RemoteError(msg)) => format!("error: {}", msg),
            ConnState::Closed(CloseReason::ConfigInvalid(msg)) => {
                format!("job parameters are invalid ({}); start over", msg)
            }
            ConnState::Closed(CloseReason::Dropped) => "connection lost".to_string(),
            ConnState::Closed(CloseReason::RetryExhausted) => {
                "could not reach the server; restart the job".to_string()
            }
            ConnState::Closed(CloseReason::Cancelled) => "cancelled".to_string(),
        }
    }
}

impl fmt::Display for ConnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.status_line())
    }
}

/// What the manager hands back to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    State(ConnState),
    Record { kind: Kind, row: Row },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            delay: Duration::from_millis(3000),
        }
    }
}

impl From<&config::Stream> for RetryPolicy {
    fn from(cfg: &config::Stream) -> Self {
        Self {
            max_retries: cfg.max_retries,
            delay: cfg.retry_delay(),
        }
    }
}

/// Connect and send the job frame, as one future owned by the manager.
type PendingConnect = BoxFuture<'static, Result<Box<dyn Connection>, TransportError>>;

pub struct ConnectionManager {
    transport: Arc<dyn Transport>,
    endpoint: String,
    job: JobRequest,
    policy: RetryPolicy,
    state: ConnState,
    retries: u32,
    attempts: u32,
    conn: Option<Box<dyn Connection>>,
    pending: Option<PendingConnect>,
    retry_timer: Option<Pin<Box<Sleep>>>,
    /// Stream taken out of service whose `close` has not finished yet.
    closing: Option<Box<dyn Connection>>,
    /// Event decided before a close began and not yet handed out.
    queued: Option<StreamEvent>,
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("endpoint", &self.endpoint)
            .field("state", &self.state)
            .field("retries", &self.retries)
            .field("attempts", &self.attempts)
            .finish_non_exhaustive()
    }
}

impl ConnectionManager {
    pub fn new(
        transport: Arc<dyn Transport>,
        endpoint: impl Into<String>,
        job: JobRequest,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
            job,
            policy,
            state: ConnState::Idle,
            retries: 0,
            attempts: 0,
            conn: None,
            pending: None,
            retry_timer: None,
            closing: None,
            queued: None,
        }
    }

    pub fn state(&self) -> &ConnState {
        &self.state
    }

    /// Consecutive retries since the last successful open.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Connection attempts made so far, successful or not.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// True once the state is terminal and every event, the terminal one
    /// included, has been handed out by `next_event`.
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal() && self.queued.is_none() && self.closing.is_none()
    }

    /// Drive the state machine until it has something to report. Returns None
    /// once a terminal state has been reported.
    ///
    /// `seen` is read when a connection attempt starts, to build the
    /// `exclude_ids` hint.
    ///
    /// Cancel-safe. Every state change happens before the first await that
    /// follows it; the pending connect, the open stream, a stream being
    /// closed, the retry timer and an undelivered event all live in `self`,
    /// and a later call resumes from them.
    pub async fn next_event(&mut self, seen: &BTreeSet<RecordId>) -> Option<StreamEvent> {
        self.finish_close().await;
        if let Some(event) = self.queued.take() {
            return Some(event);
        }
        loop {
            match self.state {
                ConnState::Idle => {
                    if let Err(err) = self.job.validate() {
                        warn!(%err, "job request rejected");
                        return Some(
                            self.transition(ConnState::Closed(CloseReason::ConfigInvalid(
                                err.to_string(),
                            ))),
                        );
                    }
                    return Some(self.begin_connect(seen));
                }
                ConnState::Connecting => {
                    let Some(pending) = self.pending.as_mut() else {
                        return Some(self.begin_connect(seen));
                    };
                    let result = pending.await;
                    self.pending = None;
                    return Some(match result {
                        Ok(conn) => self.open(conn),
                        Err(err) => {
                            warn!(%err, attempt = self.attempts, "connect failed");
                            self.on_drop()
                        }
                    });
                }
                ConnState::Streaming => {
                    let Some(conn) = self.conn.as_mut() else {
                        return Some(self.on_drop());
                    };
                    match conn.recv().await {
                        Some(Ok(text)) => {
                            if let Some(event) = self.on_frame(&text).await {
                                return Some(event);
                            }
                        }
                        Some(Err(err)) => {
                            warn!(%err, "stream error");
                            self.retire();
                            let event = self.on_drop();
                            return self.settle(event).await;
                        }
                        None => {
                            info!("stream closed by peer without completion");
                            self.conn = None;
                            return Some(self.on_drop());
                        }
                    }
                }
                ConnState::AwaitingRetry => {
                    if let Some(timer) = self.retry_timer.as_mut() {
                        timer.await;
                    }
                    self.retry_timer = None;
                    return Some(self.begin_connect(seen));
                }
                ConnState::Closed(_) => return None,
            }
        }
    }

    /// Tear down from any state: clears the retry timer, drops a pending
    /// connect and closes the open stream. Returns the state the caller has
    /// not seen yet: `Closed(Cancelled)`, or a terminal state that was decided
    /// but not yet handed out. None when the final state was already reported.
    pub async fn cancel(&mut self) -> Option<ConnState> {
        self.retry_timer = None;
        self.pending = None;
        self.retire();
        let unreported = match self.queued.take() {
            Some(StreamEvent::State(state)) => Some(state),
            _ => None,
        };
        if self.state.is_terminal() {
            self.finish_close().await;
            return unreported;
        }
        info!("stream cancelled");
        self.transition(ConnState::Closed(CloseReason::Cancelled));
        self.finish_close().await;
        Some(self.state.clone())
    }

    fn begin_connect(&mut self, seen: &BTreeSet<RecordId>) -> StreamEvent {
        let exclude_ids: Vec<String> = seen.iter().map(|id| id.0.clone()).collect();
        let excluded = exclude_ids.len();
        let frame = match self.job.with_exclude_ids(exclude_ids).to_frame() {
            Ok(frame) => frame,
            Err(err) => {
                return self.transition(ConnState::Closed(CloseReason::ConfigInvalid(
                    err.to_string(),
                )));
            }
        };

        self.attempts += 1;
        info!(
            endpoint = %self.endpoint,
            attempt = self.attempts,
            retries = self.retries,
            excluded,
            "connecting"
        );
        let transport = Arc::clone(&self.transport);
        let endpoint = self.endpoint.clone();
        self.pending = Some(Box::pin(async move {
            let mut conn = transport.connect(&endpoint).await?;
            if let Err(err) = conn.send(frame).await {
                conn.close().await;
                return Err(err);
            }
            Ok(conn)
        }));
        self.transition(ConnState::Connecting)
    }

    fn open(&mut self, conn: Box<dyn Connection>) -> StreamEvent {
        // Never hold two transports.
        self.retire();
        self.conn = Some(conn);
        info!(attempt = self.attempts, "job request sent");
        self.retries = 0;
        self.transition(ConnState::Streaming)
    }

    async fn on_frame(&mut self, text: &str) -> Option<StreamEvent> {
        let inbound = match Inbound::parse(text) {
            Ok(inbound) => inbound,
            Err(err) => {
                warn!(%err, "dropping malformed frame");
                return None;
            }
        };
        match inbound {
            Inbound::Record { kind, data } => match codec::decode(&data) {
                Ok(row) => Some(StreamEvent::Record { kind, row }),
                Err(err) => {
                    warn!(%kind, %err, "dropping malformed record");
                    None
                }
            },
            Inbound::Ping => {
                let pong = match Outbound::pong().to_frame() {
                    Ok(pong) => pong,
                    Err(err) => {
                        warn!(%err, "failed to encode pong");
                        return None;
                    }
                };
                let conn = self.conn.as_mut()?;
                if let Err(err) = conn.send(pong).await {
                    warn!(%err, "failed to answer ping");
                    self.retire();
                    let event = self.on_drop();
                    return self.settle(event).await;
                }
                debug!("answered ping");
                None
            }
            Inbound::Done => {
                self.retire();
                let event = self.transition(ConnState::Closed(CloseReason::Completed));
                self.settle(event).await
            }
            Inbound::Error(msg) => {
                warn!(error = %msg, "crawler reported an error");
                self.retire();
                let event = self.transition(ConnState::Closed(CloseReason::RemoteError(msg)));
                self.settle(event).await
            }
        }
    }

    fn on_drop(&mut self) -> StreamEvent {
        self.state = ConnState::Closed(CloseReason::Dropped);
        if self.retries < self.policy.max_retries {
            self.retries += 1;
            warn!(
                retry = self.retries,
                max = self.policy.max_retries,
                delay_ms = self.policy.delay.as_millis() as u64,
                "connection dropped; scheduling retry"
            );
            self.retry_timer = Some(Box::pin(tokio::time::sleep(self.policy.delay)));
            self.transition(ConnState::AwaitingRetry)
        } else {
            warn!(retries = self.retries, "retry budget exhausted");
            self.transition(ConnState::Closed(CloseReason::RetryExhausted))
        }
    }

    /// Take the open stream out of service. The close itself runs in
    /// `finish_close`.
    fn retire(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.closing = Some(conn);
        }
    }

    /// Close the retired stream. If this future is dropped the stream stays
    /// in `closing` and the next call starts the close again.
    async fn finish_close(&mut self) {
        if let Some(conn) = self.closing.as_mut() {
            conn.close().await;
        }
        self.closing = None;
    }

    /// Hand out `event` once the retired stream is closed. The event is parked
    /// in `queued` during the close so that a dropped call cannot lose it.
    async fn settle(&mut self, event: StreamEvent) -> Option<StreamEvent> {
        self.queued = Some(event);
        self.finish_close().await;
        self.queued.take()
    }

    fn transition(&mut self, next: ConnState) -> StreamEvent {
        debug!(from = ?self.state, to = ?next, "state change");
        self.state = next.clone();
        StreamEvent::State(next)
    }
}

#[cfg(test)]
#[path = "../tests/common/scripted.rs"]
mod scripted;

#[cfg(test)]
mod tests {
    use super::scripted::*;
    use super::*;

    const ROW5: &str = "A & r & m & 1000원 & 10 & 2024-01-02T10:00 & n & http://x?csq=5";

    fn job() -> JobRequest {
        JobRequest::full_range("abc", vec!["01일".into()], vec![])
    }

    fn manager(transport: &ScriptedTransport, job: JobRequest) -> ConnectionManager {
        let policy = RetryPolicy {
            max_retries: 5,
            delay: Duration::from_millis(2000),
        };
        ConnectionManager::new(Arc::new(transport.clone()), "ws://test/ws/crawl", job, policy)
    }

    async fn drain(mgr: &mut ConnectionManager, seen: &BTreeSet<RecordId>) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Some(event) = mgr.next_event(seen).await {
            events.push(event);
        }
        events
    }

    fn states(events: &[StreamEvent]) -> Vec<ConnState> {
        events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::State(s) => Some(s.clone()),
                StreamEvent::Record { .. } => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn invalid_job_closes_without_connecting() {
        let transport = ScriptedTransport::new(vec![]);
        let mut mgr = manager(&transport, JobRequest::full_range("", vec![], vec![]));
        let events = drain(&mut mgr, &BTreeSet::new()).await;
        assert_eq!(events.len(), 1);
        assert!(matches!(
            mgr.state(),
            ConnState::Closed(CloseReason::ConfigInvalid(_))
        ));
        assert_eq!(mgr.attempts(), 0);
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn streams_records_then_completes() {
        let transport = ScriptedTransport::new(vec![Script::Open(vec![
            frame("hidden", ROW5),
            frame("ping", ""),
            Step::Frame("garbage".into()),
            frame("public", "too & few"),
            done(),
        ])]);
        let mut mgr = manager(&transport, job());
        let events = drain(&mut mgr, &BTreeSet::new()).await;

        assert_eq!(
            states(&events),
            vec![
                ConnState::Connecting,
                ConnState::Streaming,
                ConnState::Closed(CloseReason::Completed)
            ]
        );
        let records: Vec<&StreamEvent> = events
            .iter()
            .filter(|e| matches!(e, StreamEvent::Record { .. }))
            .collect();
        assert_eq!(records.len(), 1);
        assert!(matches!(
            records[0],
            StreamEvent::Record { kind: Kind::Hidden, row } if row.time == "2024-01-02T10:00"
        ));

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].len(), 2);
        let pong: serde_json::Value = serde_json::from_str(&sent[0][1]).unwrap();
        assert_eq!(pong["event"], "pong");
        assert_eq!(transport.closed(), 1);
    }

    #[tokio::test]
    async fn remote_error_is_terminal() {
        let transport = ScriptedTransport::new(vec![Script::Open(vec![frame(
            "error",
            "login required",
        )])]);
        let mut mgr = manager(&transport, job());
        drain(&mut mgr, &BTreeSet::new()).await;
        assert_eq!(
            mgr.state(),
            &ConnState::Closed(CloseReason::RemoteError("login required".into()))
        );
        assert_eq!(mgr.attempts(), 1);
        assert_eq!(mgr.state().status_line(), "error: login required");
    }

    #[tokio::test(start_paused = true)]
    async fn retry_cap_after_consecutive_failed_reconnects() {
        let mut scripts = vec![Script::Open(vec![])];
        scripts.extend((0..10).map(|_| Script::Refuse));
        let transport = ScriptedTransport::new(scripts);
        let mut mgr = manager(&transport, job());

        let events = drain(&mut mgr, &BTreeSet::new()).await;
        assert_eq!(mgr.state(), &ConnState::Closed(CloseReason::RetryExhausted));
        // one successful open, then five failed reconnects
        assert_eq!(mgr.attempts(), 6);
        let retries = states(&events)
            .into_iter()
            .filter(|s| *s == ConnState::AwaitingRetry)
            .count();
        assert_eq!(retries, 5);
        assert!(mgr.next_event(&BTreeSet::new()).await.is_none());
        assert_eq!(mgr.attempts(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn successful_open_resets_retry_counter() {
        let transport = ScriptedTransport::new(vec![
            Script::Refuse,
            Script::Refuse,
            Script::Refuse,
            Script::Open(vec![]),
            Script::Refuse,
            Script::Open(vec![done()]),
        ]);
        let mut mgr = manager(&transport, job());
        let mut peak = 0;
        while let Some(event) = mgr.next_event(&BTreeSet::new()).await {
            if event == StreamEvent::State(ConnState::Streaming) {
                assert_eq!(mgr.retries(), 0);
            }
            peak = peak.max(mgr.retries());
        }
        assert_eq!(peak, 3);
        assert_eq!(mgr.state(), &ConnState::Closed(CloseReason::Completed));
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_sends_current_seen_ids() {
        let transport = ScriptedTransport::new(vec![
            Script::Open(vec![frame("hidden", ROW5)]),
            Script::Open(vec![done()]),
        ]);
        let mut mgr = manager(&transport, job());
        let mut seen = BTreeSet::new();
        while let Some(event) = mgr.next_event(&seen).await {
            if let StreamEvent::Record { row, .. } = event {
                seen.insert(codec::extract_id(&row).unwrap());
            }
        }

        let sent = transport.sent();
        let first: serde_json::Value = serde_json::from_str(&sent[0][0]).unwrap();
        let second: serde_json::Value = serde_json::from_str(&sent[1][0]).unwrap();
        assert_eq!(first["exclude_ids"], serde_json::json!([]));
        assert_eq!(second["exclude_ids"], serde_json::json!(["5"]));
    }

    #[tokio::test(start_paused = true)]
    async fn retry_waits_for_configured_delay() {
        let transport = ScriptedTransport::new(vec![Script::Open(vec![]), Script::Open(vec![])]);
        let mut mgr = manager(&transport, job());
        let seen = BTreeSet::new();
        // Connecting, Streaming, AwaitingRetry
        for _ in 0..3 {
            mgr.next_event(&seen).await;
        }
        assert_eq!(mgr.state(), &ConnState::AwaitingRetry);

        let started = tokio::time::Instant::now();
        assert_eq!(
            mgr.next_event(&seen).await,
            Some(StreamEvent::State(ConnState::Connecting))
        );
        assert!(started.elapsed() >= Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_clears_pending_retry() {
        let transport = ScriptedTransport::new(vec![Script::Open(vec![]), Script::Open(vec![])]);
        let mut mgr = manager(&transport, job());
        let seen = BTreeSet::new();
        for _ in 0..3 {
            mgr.next_event(&seen).await;
        }
        assert_eq!(mgr.state(), &ConnState::AwaitingRetry);

        assert_eq!(
            mgr.cancel().await,
            Some(ConnState::Closed(CloseReason::Cancelled))
        );
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(mgr.next_event(&seen).await.is_none());
        assert_eq!(mgr.attempts(), 1);
        assert!(mgr.cancel().await.is_none());
    }

    #[tokio::test]
    async fn cancel_while_streaming_closes_transport() {
        let transport = ScriptedTransport::new(vec![Script::Open(vec![Step::Hang])]);
        let mut mgr = manager(&transport, job());
        let seen = BTreeSet::new();
        mgr.next_event(&seen).await;
        mgr.next_event(&seen).await;
        assert_eq!(mgr.state(), &ConnState::Streaming);

        let waited = tokio::time::timeout(Duration::from_millis(20), mgr.next_event(&seen)).await;
        assert!(waited.is_err());
        assert_eq!(mgr.state(), &ConnState::Streaming);

        mgr.cancel().await;
        assert_eq!(mgr.state(), &ConnState::Closed(CloseReason::Cancelled));
        assert_eq!(transport.closed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_stream_stays_open_across_timed_out_polls() {
        let transport = ScriptedTransport::new(vec![Script::Open(vec![Step::Hang])]);
        let mut mgr = manager(&transport, job());
        let seen = BTreeSet::new();
        mgr.next_event(&seen).await;
        mgr.next_event(&seen).await;

        for _ in 0..3 {
            let waited =
                tokio::time::timeout(Duration::from_millis(50), mgr.next_event(&seen)).await;
            assert!(waited.is_err());
        }
        assert_eq!(mgr.state(), &ConnState::Streaming);
        assert_eq!(transport.connects(), 1);
        assert_eq!(transport.closed(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn completion_survives_a_dropped_close() {
        let transport = ScriptedTransport::new(vec![Script::Open(vec![frame("hidden", ROW5), done()])])
            .with_close_delay(Duration::from_millis(300));
        let mut mgr = manager(&transport, job());
        let seen = BTreeSet::new();
        // Connecting, Streaming, record
        for _ in 0..3 {
            mgr.next_event(&seen).await;
        }

        let waited = tokio::time::timeout(Duration::from_millis(50), mgr.next_event(&seen)).await;
        assert!(waited.is_err());
        assert_eq!(mgr.state(), &ConnState::Closed(CloseReason::Completed));
        assert!(!mgr.is_terminal());
        assert_eq!(transport.closed(), 0);

        assert_eq!(
            mgr.next_event(&seen).await,
            Some(StreamEvent::State(ConnState::Closed(CloseReason::Completed)))
        );
        assert!(mgr.is_terminal());
        assert!(mgr.next_event(&seen).await.is_none());
        assert_eq!(transport.closed(), 1);
        assert_eq!(transport.connects(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_reports_undelivered_terminal_state() {
        let transport = ScriptedTransport::new(vec![Script::Open(vec![frame("error", "login required")])])
            .with_close_delay(Duration::from_millis(300));
        let mut mgr = manager(&transport, job());
        let seen = BTreeSet::new();
        mgr.next_event(&seen).await;
        mgr.next_event(&seen).await;

        let waited = tokio::time::timeout(Duration::from_millis(50), mgr.next_event(&seen)).await;
        assert!(waited.is_err());

        assert_eq!(
            mgr.cancel().await,
            Some(ConnState::Closed(CloseReason::RemoteError("login required".into())))
        );
        assert!(mgr.is_terminal());
        assert_eq!(transport.closed(), 1);
        assert!(mgr.cancel().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_call_resumes_the_pending_connect() {
        let transport = ScriptedTransport::new(vec![Script::Open(vec![done()])])
            .with_connect_delay(Duration::from_millis(300));
        let mut mgr = manager(&transport, job());
        let seen = BTreeSet::new();
        assert_eq!(
            mgr.next_event(&seen).await,
            Some(StreamEvent::State(ConnState::Connecting))
        );

        let waited = tokio::time::timeout(Duration::from_millis(50), mgr.next_event(&seen)).await;
        assert!(waited.is_err());
        assert_eq!(mgr.state(), &ConnState::Connecting);

        assert_eq!(
            mgr.next_event(&seen).await,
            Some(StreamEvent::State(ConnState::Streaming))
        );
        assert_eq!(transport.connects(), 1);
        assert_eq!(mgr.attempts(), 1);
        assert_eq!(transport.sent()[0].len(), 1);
    }

    #[test]
    fn terminal_states() {
        assert!(!ConnState::Streaming.is_terminal());
        assert!(!ConnState::AwaitingRetry.is_terminal());
        assert!(!ConnState::Closed(CloseReason::Dropped).is_terminal());
        assert!(ConnState::Closed(CloseReason::Completed).is_terminal());
        assert!(ConnState::Closed(CloseReason::RetryExhausted).is_terminal());
    }
}
