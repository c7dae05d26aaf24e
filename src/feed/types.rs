//! Types for the server push feed

use crate::identity::Identity;

use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;

/// Kind of a pushed event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// A user's credit count changed
    CreditsUpdate,
    /// A ticket reward was paid out
    RewardGranted,
    /// A notification was created
    Notify,
    /// Any kind this client does not know about
    Unknown(String),
}

impl EventKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "credits_update" => EventKind::CreditsUpdate,
            "reward_granted" => EventKind::RewardGranted,
            "notify" => EventKind::Notify,
            other => EventKind::Unknown(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            EventKind::CreditsUpdate => "credits_update",
            EventKind::RewardGranted => "reward_granted",
            EventKind::Notify => "notify",
            EventKind::Unknown(name) => name,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Event payload. Only `user_id` is interpreted; the rest is kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EventPayload {
    pub user_id: Identity,
    /// Kind-specific fields such as `new_credits`, `credits`, `pay`, `ticket_id` or `message`.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// A pushed event. Transient: it only ever triggers refresh decisions.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    pub payload: EventPayload,
}

impl Event {
    #[cfg(test)]
    pub fn new(kind: EventKind, user_id: impl Into<Identity>) -> Self {
        Self {
            kind,
            payload: EventPayload {
                user_id: user_id.into(),
                fields: Map::new(),
            },
        }
    }

    pub fn user_id(&self) -> &Identity {
        &self.payload.user_id
    }
}

/// Wire shape of a push frame: `{"event": "...", "payload": {"user_id": "...", ...}}`
#[derive(Deserialize)]
struct Frame {
    event: String,
    payload: EventPayload,
}

/// Decode one text frame into an event.
pub fn parse_frame(text: &str) -> Result<Event, ChannelError> {
    let frame: Frame = serde_json::from_str(text)
        .map_err(|e| ChannelError::MalformedEvent(format!("{} in frame {:?}", e, truncate(text))))?;

    Ok(Event {
        kind: EventKind::from_name(&frame.event),
        payload: frame.payload,
    })
}

fn truncate(text: &str) -> &str {
    const MAX: usize = 120;
    match text.char_indices().nth(MAX) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// What a subscriber sees from the channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelNotice {
    /// The connection reached Open
    Opened,
    /// An open connection was lost; events are paused until the next `Opened`
    Closed,
    /// A well-formed event arrived
    Event(Event),
}

/// Connection state of the push channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Open,
    /// Terminal: the channel was shut down
    Closed,
}

/// Error types for the push channel
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("WebSocket error: {0}")]
    WebSocketError(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Malformed event: {0}")]
    MalformedEvent(String),
}
