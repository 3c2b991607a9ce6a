//! Scripted transport shared by the connection unit tests and the
//! integration tests. The including module must have `Connection`,
//! `Transport` and `TransportError` in scope.
#![allow(dead_code)]

use super::{Connection, Transport, TransportError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub enum Step {
    Frame(String),
    /// Stay open without sending anything. Never consumed.
    Hang,
}

pub enum Script {
    Refuse,
    Open(Vec<Step>),
}

/// Replays one script per connect attempt and records what the client sent on
/// each connection. Runs out of scripts by refusing.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    scripts: Arc<Mutex<VecDeque<Script>>>,
    sent: Arc<Mutex<Vec<Vec<String>>>>,
    connects: Arc<Mutex<usize>>,
    closed: Arc<Mutex<usize>>,
    connect_delay: Duration,
    close_delay: Duration,
}

impl ScriptedTransport {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(VecDeque::from(scripts))),
            ..Default::default()
        }
    }

    /// Make every connect attempt take `delay` before it resolves.
    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    /// Make every `close` take `delay` before it completes.
    pub fn with_close_delay(mut self, delay: Duration) -> Self {
        self.close_delay = delay;
        self
    }

    /// Frames sent, one list per opened connection.
    pub fn sent(&self) -> Vec<Vec<String>> {
        self.sent.lock().unwrap().clone()
    }

    /// `exclude_ids` of the job frame sent on each opened connection.
    pub fn exclude_ids(&self) -> Vec<Vec<String>> {
        self.sent()
            .iter()
            .map(|frames| {
                let job: serde_json::Value = serde_json::from_str(&frames[0]).unwrap();
                job["exclude_ids"]
                    .as_array()
                    .unwrap()
                    .iter()
                    .map(|v| v.as_str().unwrap().to_string())
                    .collect()
            })
            .collect()
    }

    pub fn connects(&self) -> usize {
        *self.connects.lock().unwrap()
    }

    /// Completed `close` calls.
    pub fn closed(&self) -> usize {
        *self.closed.lock().unwrap()
    }
}

struct ScriptedConnection {
    steps: VecDeque<Step>,
    index: usize,
    sent: Arc<Mutex<Vec<Vec<String>>>>,
    closed: Arc<Mutex<usize>>,
    close_delay: Duration,
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn Connection>, TransportError> {
        *self.connects.lock().unwrap() += 1;
        if !self.connect_delay.is_zero() {
            tokio::time::sleep(self.connect_delay).await;
        }
        let script = self.scripts.lock().unwrap().pop_front();
        match script {
            Some(Script::Open(steps)) => {
                let mut sent = self.sent.lock().unwrap();
                sent.push(Vec::new());
                Ok(Box::new(ScriptedConnection {
                    steps: steps.into(),
                    index: sent.len() - 1,
                    sent: Arc::clone(&self.sent),
                    closed: Arc::clone(&self.closed),
                    close_delay: self.close_delay,
                }))
            }
            Some(Script::Refuse) | None => Err(TransportError::Connect {
                endpoint: endpoint.to_string(),
                reason: "connection refused".into(),
            }),
        }
    }
}

#[async_trait]
impl Connection for ScriptedConnection {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.sent.lock().unwrap()[self.index].push(text);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        if let Some(Step::Hang) = self.steps.front() {
            return std::future::pending().await;
        }
        match self.steps.pop_front() {
            Some(Step::Frame(text)) => Some(Ok(text)),
            Some(Step::Hang) | None => None,
        }
    }

    async fn close(&mut self) {
        if !self.close_delay.is_zero() {
            tokio::time::sleep(self.close_delay).await;
        }
        *self.closed.lock().unwrap() += 1;
    }
}

pub fn frame(event: &str, data: &str) -> Step {
    Step::Frame(serde_json::json!({ "event": event, "data": data }).to_string())
}

pub fn done() -> Step {
    frame("done", "")
}
