//! Hook for making silently degraded paths observable.
//!
//! The relay never surfaces errors to clients. Instead every dropped frame or
//! unreadable connection state is reported here, so operators and tests can
//! count what was dropped.

use super::{ConnectionId, RoomName, SchemaError};

/// Why an inbound frame was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropReason {
    /// Not valid JSON
    InvalidJson,
    /// JSON without a string `type` tag
    MissingType,
    /// Tag outside every known union
    UnknownType,
    /// Known tag, payload failed validation
    InvalidPayload,
    /// `presence` snapshots only flow server → client
    ServerOnlyEvent,
    /// Binary WebSocket frame
    BinaryFrame,
}

impl From<&SchemaError> for DropReason {
    fn from(error: &SchemaError) -> Self {
        match error {
            SchemaError::InvalidJson(_) => Self::InvalidJson,
            SchemaError::MissingType => Self::MissingType,
            SchemaError::UnknownType(_) => Self::UnknownType,
            SchemaError::InvalidPayload { .. } => Self::InvalidPayload,
        }
    }
}

pub trait RelayObserver: Send + Sync {
    fn frame_dropped(&self, _room: &RoomName, _connection: &ConnectionId, _reason: DropReason) {}

    fn state_corrupted(&self, _room: &RoomName, _connection: &ConnectionId) {}

    fn event_relayed(&self, _room: &RoomName, _event_type: &str, _recipients: usize) {}

    fn presence_broadcast(&self, _room: &RoomName, _online_users: usize, _recipients: usize) {}
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl RelayObserver for NoopObserver {}
