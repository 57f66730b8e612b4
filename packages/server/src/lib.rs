//! Huddle realtime presence and event-relay server.
//!
//! Tracks which users are online per room and relays channel/thread events
//! between the WebSocket connections of a room.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
