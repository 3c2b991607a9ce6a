//! Composition root: feeds connection-manager output into the store, routes
//! external commands through the store contract and publishes a view that
//! subscribers watch.
use crate::connection::{ConnState, ConnectionManager, RetryPolicy, StreamEvent};
use crate::job::JobRequest;
use crate::model::{Kind, Row};
use crate::persistence::SnapshotStore;
use crate::store::{DeleteOutcome, InsertOutcome, Store, StoreError};
use crate::transport::Transport;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

const COMMAND_BUFFER: usize = 32;

#[derive(Debug, Error)]
pub enum AggregatorError {
    #[error("aggregator is no longer running")]
    Stopped,
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub enum Command {
    Delete {
        kind: Kind,
        index: usize,
        reply: oneshot::Sender<Result<DeleteOutcome, StoreError>>,
    },
    Cancel,
}

/// Snapshot published after every state change or store mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub state: ConnState,
    pub hidden: Vec<Row>,
    pub public: Vec<Row>,
    /// Bumped on every publish.
    pub revision: u64,
}

impl View {
    pub fn rows(&self, kind: Kind) -> &[Row] {
        match kind {
            Kind::Hidden => &self.hidden,
            Kind::Public => &self.public,
        }
    }

    pub fn status_line(&self) -> String {
        self.state.status_line()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub state: ConnState,
    pub inserted: usize,
    pub skipped: usize,
    pub deleted: usize,
    pub hidden: usize,
    pub public: usize,
}

#[derive(Debug, Clone)]
pub struct AggregatorHandle {
    commands: mpsc::Sender<Command>,
    view: watch::Receiver<View>,
}

impl AggregatorHandle {
    /// Delete a row through the store, so the deletion is persisted and the
    /// id stays excluded.
    pub async fn delete(&self, kind: Kind, index: usize) -> Result<DeleteOutcome, AggregatorError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Delete { kind, index, reply })
            .await
            .map_err(|_| AggregatorError::Stopped)?;
        Ok(rx.await.map_err(|_| AggregatorError::Stopped)??)
    }

    /// Stop streaming and end the aggregator loop. Idempotent.
    pub async fn cancel(&self) {
        let _ = self.commands.send(Command::Cancel).await;
    }

    pub fn subscribe(&self) -> watch::Receiver<View> {
        self.view.clone()
    }

    pub fn view(&self) -> View {
        self.view.borrow().clone()
    }

    /// Resolve once the connection reached a terminal state (or the
    /// aggregator went away).
    pub async fn wait_for_terminal(&self) -> ConnState {
        let mut rx = self.view.clone();
        loop {
            {
                let view = rx.borrow_and_update();
                if view.state.is_terminal() {
                    return view.state.clone();
                }
            }
            if rx.changed().await.is_err() {
                return rx.borrow().state.clone();
            }
        }
    }
}

pub struct Aggregator<P> {
    run_id: Uuid,
    store: Store<P>,
    manager: ConnectionManager,
    commands: mpsc::Receiver<Command>,
    view: watch::Sender<View>,
    revision: u64,
    summary: RunSummary,
}

impl<P: SnapshotStore> Aggregator<P> {
    /// Seed the store from `persistence` and prepare the connection. Nothing
    /// is connected until [`Aggregator::run`] is polled.
    pub async fn start(
        persistence: P,
        transport: Arc<dyn Transport>,
        endpoint: impl Into<String>,
        job: JobRequest,
        policy: RetryPolicy,
    ) -> Result<(Self, AggregatorHandle), StoreError> {
        if let Err(err) = persistence.save_job(&job).await {
            warn!(?err, "failed to cache job parameters");
        }
        let store = Store::load(persistence).await?;
        let manager = ConnectionManager::new(transport, endpoint, job, policy);

        let initial = View {
            state: manager.state().clone(),
            hidden: store.rows(Kind::Hidden).to_vec(),
            public: store.rows(Kind::Public).to_vec(),
            revision: 0,
        };
        let (view_tx, view_rx) = watch::channel(initial);
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);

        let summary = RunSummary {
            state: manager.state().clone(),
            inserted: 0,
            skipped: 0,
            deleted: 0,
            hidden: store.len(Kind::Hidden),
            public: store.len(Kind::Public),
        };
        let aggregator = Self {
            run_id: Uuid::new_v4(),
            store,
            manager,
            commands: cmd_rx,
            view: view_tx,
            revision: 0,
            summary,
        };
        let handle = AggregatorHandle {
            commands: cmd_tx,
            view: view_rx,
        };
        Ok((aggregator, handle))
    }

    pub fn store(&self) -> &Store<P> {
        &self.store
    }

    /// Run until cancelled, or until the stream is terminal and every handle
    /// has been dropped. Deletes keep being served after the stream ends.
    #[instrument(skip_all, fields(run_id = %self.run_id))]
    pub async fn run(mut self) -> RunSummary {
        info!(
            hidden = self.store.len(Kind::Hidden),
            public = self.store.len(Kind::Public),
            "aggregator started"
        );
        let mut commands_open = true;
        loop {
            if !commands_open && self.manager.is_terminal() {
                break;
            }
            tokio::select! {
                cmd = self.commands.recv(), if commands_open => match cmd {
                    Some(Command::Delete { kind, index, reply }) => {
                        let result = self.delete(kind, index).await;
                        let _ = reply.send(result);
                    }
                    Some(Command::Cancel) => {
                        if let Some(state) = self.manager.cancel().await {
                            self.publish_state(state);
                        }
                        break;
                    }
                    None => commands_open = false,
                },
                event = self.manager.next_event(self.store.seen_ids()), if !self.manager.is_terminal() => {
                    match event {
                        Some(StreamEvent::Record { kind, row }) => self.insert(kind, row).await,
                        Some(StreamEvent::State(state)) => {
                            info!(state = ?state, status = %state.status_line(), "connection state");
                            self.publish_state(state);
                        }
                        None => {}
                    }
                },
                else => break,
            }
        }

        self.summary.state = self.manager.state().clone();
        self.summary.hidden = self.store.len(Kind::Hidden);
        self.summary.public = self.store.len(Kind::Public);
        info!(
            state = ?self.summary.state,
            inserted = self.summary.inserted,
            skipped = self.summary.skipped,
            deleted = self.summary.deleted,
            "aggregator stopped"
        );
        self.summary
    }

    async fn insert(&mut self, kind: Kind, row: Row) {
        match self.store.insert(kind, row).await {
            Ok(InsertOutcome::Inserted { index, id }) => {
                self.summary.inserted += 1;
                info!(%kind, index, id = ?id, "record merged");
                self.publish_rows(kind);
            }
            Ok(InsertOutcome::Skipped(reason)) => {
                self.summary.skipped += 1;
                tracing::debug!(%kind, ?reason, "record skipped");
            }
            Err(err) => error!(%kind, %err, "record dropped"),
        }
    }

    async fn delete(&mut self, kind: Kind, index: usize) -> Result<DeleteOutcome, StoreError> {
        let outcome = self.store.delete(kind, index).await?;
        if let DeleteOutcome::Deleted(row) = &outcome {
            self.summary.deleted += 1;
            info!(%kind, index, time = %row.time, "row deleted");
            self.publish_rows(kind);
        }
        Ok(outcome)
    }

    fn publish_state(&mut self, state: ConnState) {
        self.revision += 1;
        let revision = self.revision;
        self.view.send_modify(|view| {
            view.state = state;
            view.revision = revision;
        });
    }

    fn publish_rows(&mut self, kind: Kind) {
        self.revision += 1;
        let revision = self.revision;
        let rows = self.store.rows(kind).to_vec();
        self.view.send_modify(|view| {
            match kind {
                Kind::Hidden => view.hidden = rows,
                Kind::Public => view.public = rows,
            }
            view.revision = revision;
        });
    }
}
