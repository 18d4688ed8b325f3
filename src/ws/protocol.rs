//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::game::actor::Direction;

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMsg {
    /// Request to turn the player's actor
    #[serde(rename = "direction", rename_all = "camelCase")]
    ChangeDirection {
        match_id: Uuid,
        player_id: Uuid,
        /// `[dx, dy]`, one axis only
        new_direction: Direction,
    },
}

impl ClientMsg {
    /// Discriminators accepted in the `type` field
    pub const EVENT_TYPES: &'static [&'static str] = &["direction"];

    /// Parse an inbound text frame, telling an unknown `type` apart from a bad body
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(text)?;
        match value.get("type").and_then(Value::as_str) {
            Some(event_type) if Self::EVENT_TYPES.contains(&event_type) => {
                Ok(serde_json::from_value(value)?)
            }
            other => Err(ProtocolError::UnknownEventType(other.map(str::to_owned))),
        }
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "eventType", rename_all = "camelCase")]
pub enum ServerMsg {
    /// Sent once to a connection after registration
    #[serde(rename_all = "camelCase")]
    Registered {
        match_id: Uuid,
        data: ActorSnapshot,
    },

    /// World state after a tick
    #[serde(rename_all = "camelCase")]
    Frame {
        /// Nanoseconds since the Unix epoch, strictly increasing per match
        tick: i64,
        match_id: Uuid,
        data: HashMap<Uuid, ActorSnapshot>,
    },
}

impl ServerMsg {
    pub fn match_id(&self) -> Uuid {
        match self {
            ServerMsg::Registered { match_id, .. } | ServerMsg::Frame { match_id, .. } => *match_id,
        }
    }
}

/// Actor state as the client sees it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorSnapshot {
    pub id: Uuid,
    /// Display name
    pub ign: String,
    /// Power counter
    pub eating: u32,
    pub x: f32,
    pub y: f32,
    pub direction: Direction,
    pub skin_id: Option<String>,
    pub dead: bool,
}

/// Inbound message errors
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed event: {0}")]
    MalformedEvent(#[from] serde_json::Error),

    #[error("Missing or unknown event type: {0:?}")]
    UnknownEventType(Option<String>),
}
