//! Tagged frames exchanged with the crawler over the stream.
use crate::model::Kind;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const PONG_PAYLOAD: &str = "💓";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("frame is not a JSON envelope: {0}")]
    NotJson(String),
    #[error("unknown event {0:?}")]
    UnknownEvent(String),
    #[error("event {0:?} requires a string payload")]
    MissingPayload(&'static str),
}

/// Inbound frame, one variant per event the producer emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Record { kind: Kind, data: String },
    Ping,
    Done,
    Error(String),
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    event: String,
    #[serde(default)]
    data: Value,
}

impl Inbound {
    pub fn parse(text: &str) -> Result<Self, EnvelopeError> {
        let raw: RawEnvelope =
            serde_json::from_str(text).map_err(|e| EnvelopeError::NotJson(e.to_string()))?;
        match raw.event.as_str() {
            "hidden" => record(Kind::Hidden, raw.data),
            "public" => record(Kind::Public, raw.data),
            "ping" => Ok(Inbound::Ping),
            "done" => Ok(Inbound::Done),
            "error" => Ok(Inbound::Error(message(raw.data))),
            other => Err(EnvelopeError::UnknownEvent(other.to_string())),
        }
    }
}

fn record(kind: Kind, data: Value) -> Result<Inbound, EnvelopeError> {
    match data {
        Value::String(data) => Ok(Inbound::Record { kind, data }),
        _ => Err(EnvelopeError::MissingPayload(kind.as_str())),
    }
}

fn message(data: Value) -> String {
    match data {
        Value::String(s) => s,
        Value::Null => "unknown error".to_string(),
        other => other.to_string(),
    }
}

/// Outbound control frame.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum Outbound {
    Pong(String),
}

impl Outbound {
    pub fn pong() -> Self {
        Outbound::Pong(PONG_PAYLOAD.to_string())
    }

    pub fn to_frame(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
