//! Domain error types.

use thiserror::Error;

/// Value object validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("room name must not be empty")]
    EmptyRoomName,

    #[error("room name is too long ({0} bytes, at most 128 allowed)")]
    RoomNameTooLong(usize),

    #[error("room name contains invalid character {0:?}")]
    InvalidRoomNameChar(char),

    #[error("user id must not be empty")]
    EmptyUserId,
}

/// Connection state store errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("connection '{0}' is not attached to this room")]
    ConnectionNotFound(String),

    #[error("state of connection '{connection}' is corrupted: {reason}")]
    CorruptedState { connection: String, reason: String },
}

/// Message delivery errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    #[error("connection '{0}' is not registered")]
    ClientNotFound(String),

    #[error("failed to push message: {0}")]
    PushFailed(String),
}
