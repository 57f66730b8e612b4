//! Domain logic for client-side operations.
//!
//! This module contains pure functions that implement business logic
//! without side effects, making them easy to test.

use std::time::Duration;

use huddle_server::domain::{RealtimeMessage, User};

use crate::error::ClientError;

/// Maximum number of consecutive reconnection attempts
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Fixed wait between reconnection attempts
pub const RECONNECT_INTERVAL: Duration = Duration::from_secs(5);

/// Check if the client should exit immediately based on the error type.
///
/// Errors caused by the client's own input never go away by reconnecting.
pub fn should_exit_immediately(error: &ClientError) -> bool {
    matches!(
        error,
        ClientError::InvalidRoom(_) | ClientError::Serialization(_)
    )
}

/// Check if the client should attempt to reconnect.
///
/// # Arguments
///
/// * `error` - The client error that occurred
/// * `current_attempt` - The number of failed attempts so far
/// * `max_attempts` - The maximum number of reconnection attempts allowed
pub fn should_attempt_reconnect(
    error: &ClientError,
    current_attempt: u32,
    max_attempts: u32,
) -> bool {
    if should_exit_immediately(error) {
        return false;
    }

    current_attempt < max_attempts
}

/// Channel id a room name refers to (`channel-<id>` → `<id>`)
///
/// Rooms without the prefix are used as the channel id unchanged.
pub fn default_channel_id(room: &str) -> String {
    room.strip_prefix("channel-").unwrap_or(room).to_string()
}

/// Build the message projection for a line typed by `author`
pub fn build_message(
    id: String,
    author: &User,
    channel_id: &str,
    content: String,
    created_at: String,
) -> RealtimeMessage {
    RealtimeMessage {
        id,
        content: Some(content),
        image_url: None,
        updated_at: created_at.clone(),
        created_at,
        author_id: author.id.to_string(),
        author_email: author.email.clone(),
        author_name: author.full_name.clone(),
        author_avatar: author.picture.clone(),
        channel_id: channel_id.to_string(),
        thread_id: None,
        reactions: Some(Vec::new()),
        reply_count: Some(0),
    }
}
