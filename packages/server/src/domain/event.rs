//! Realtime event contract.
//!
//! Every frame exchanged with a room is one of three tagged unions, encoded as
//! `{"type": <tag>, "payload": {...}}`:
//!
//! - [`PresenceMessage`]: who is online
//! - [`ChannelEvent`]: messages, reactions and reply counts of a channel
//! - [`ThreadEvent`]: replies and reactions inside a thread
//!
//! The `parse_*` functions are the only way frames enter the relay and the
//! client reducers. They never panic and report a structured [`SchemaError`].

use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error;

use super::entity::User;

/// Why a frame was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("frame has no string `type` tag")]
    MissingType,

    #[error("unknown event type '{0}'")]
    UnknownType(String),

    #[error("invalid payload for '{event_type}': {reason}")]
    InvalidPayload { event_type: String, reason: String },
}

/// Aggregated reaction of one emoji on a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedReaction {
    pub emoji: String,
    pub count: u32,
    pub reacted_by_user: bool,
}

/// Message projection carried by channel and thread events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeMessage {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(deserialize_with = "rfc3339")]
    pub created_at: String,
    #[serde(deserialize_with = "rfc3339")]
    pub updated_at: String,
    pub author_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_avatar: Option<String>,
    pub channel_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reactions: Option<Vec<GroupedReaction>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_count: Option<u32>,
}

// Timestamps are relayed exactly as received; only their format is checked.
fn rfc3339<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    chrono::DateTime::parse_from_rfc3339(&raw).map_err(serde::de::Error::custom)?;
    Ok(raw)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum PresenceMessage {
    /// Associate a user with the sending connection
    #[serde(rename = "add-user")]
    AddUser(User),
    /// Clear the user of the sending connection
    #[serde(rename = "remove-user")]
    RemoveUser { id: String },
    /// Full online-user snapshot, sent by the server only
    #[serde(rename = "presence")]
    Presence { users: Vec<User> },
}

impl PresenceMessage {
    pub const TYPES: &'static [&'static str] = &["add-user", "remove-user", "presence"];

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::AddUser(_) => "add-user",
            Self::RemoveUser { .. } => "remove-user",
            Self::Presence { .. } => "presence",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ChannelEvent {
    #[serde(rename = "message:created")]
    MessageCreated { message: RealtimeMessage },
    #[serde(rename = "message:updated")]
    MessageUpdated { message: RealtimeMessage },
    #[serde(rename = "reaction:updated", rename_all = "camelCase")]
    ReactionUpdated {
        message_id: String,
        reactions: Vec<GroupedReaction>,
    },
    #[serde(rename = "message:replies:incremented", rename_all = "camelCase")]
    RepliesIncremented { message_id: String, delta: i64 },
}

impl ChannelEvent {
    pub const TYPES: &'static [&'static str] = &[
        "message:created",
        "message:updated",
        "reaction:updated",
        "message:replies:incremented",
    ];

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::MessageCreated { .. } => "message:created",
            Self::MessageUpdated { .. } => "message:updated",
            Self::ReactionUpdated { .. } => "reaction:updated",
            Self::RepliesIncremented { .. } => "message:replies:incremented",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ThreadEvent {
    #[serde(rename = "thread:reply:created")]
    ReplyCreated { reply: RealtimeMessage },
    #[serde(rename = "thread:reaction:updated", rename_all = "camelCase")]
    ReactionUpdated {
        message_id: String,
        reactions: Vec<GroupedReaction>,
        thread_id: String,
    },
}

impl ThreadEvent {
    pub const TYPES: &'static [&'static str] = &["thread:reply:created", "thread:reaction:updated"];

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ReplyCreated { .. } => "thread:reply:created",
            Self::ReactionUpdated { .. } => "thread:reaction:updated",
        }
    }
}

/// Any valid frame. Serializes exactly like the wrapped event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EventEnvelope {
    Presence(PresenceMessage),
    Channel(ChannelEvent),
    Thread(ThreadEvent),
}

impl EventEnvelope {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Presence(event) => event.event_type(),
            Self::Channel(event) => event.event_type(),
            Self::Thread(event) => event.event_type(),
        }
    }
}

impl From<PresenceMessage> for EventEnvelope {
    fn from(event: PresenceMessage) -> Self {
        Self::Presence(event)
    }
}

impl From<ChannelEvent> for EventEnvelope {
    fn from(event: ChannelEvent) -> Self {
        Self::Channel(event)
    }
}

impl From<ThreadEvent> for EventEnvelope {
    fn from(event: ThreadEvent) -> Self {
        Self::Thread(event)
    }
}

fn parse_tagged<T>(value: &Value, types: &[&str]) -> Result<T, SchemaError>
where
    T: DeserializeOwned,
{
    let tag = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(SchemaError::MissingType)?;

    if !types.contains(&tag) {
        return Err(SchemaError::UnknownType(tag.to_string()));
    }

    T::deserialize(value).map_err(|e| SchemaError::InvalidPayload {
        event_type: tag.to_string(),
        reason: e.to_string(),
    })
}

/// Validate a JSON value against the presence union
pub fn parse_presence(value: &Value) -> Result<PresenceMessage, SchemaError> {
    parse_tagged(value, PresenceMessage::TYPES)
}

/// Validate a JSON value against the channel-event union
pub fn parse_channel_event(value: &Value) -> Result<ChannelEvent, SchemaError> {
    parse_tagged(value, ChannelEvent::TYPES)
}

/// Validate a JSON value against the thread-event union
pub fn parse_thread_event(value: &Value) -> Result<ThreadEvent, SchemaError> {
    parse_tagged(value, ThreadEvent::TYPES)
}

/// Parse a raw text frame: JSON first, then presence, channel and thread
/// unions in that order.
pub fn parse_frame(raw: &str) -> Result<EventEnvelope, SchemaError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| SchemaError::InvalidJson(e.to_string()))?;

    match parse_presence(&value) {
        Err(SchemaError::UnknownType(_)) => {}
        other => return other.map(EventEnvelope::Presence),
    }

    match parse_channel_event(&value) {
        Err(SchemaError::UnknownType(_)) => {}
        other => return other.map(EventEnvelope::Channel),
    }

    parse_thread_event(&value).map(EventEnvelope::Thread)
}
