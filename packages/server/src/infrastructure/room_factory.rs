//! Wiring of Room Servers backed by the in-memory store and WebSocket pusher.

use std::sync::Arc;

use huddle_shared::time::Clock;

use crate::{
    domain::RelayObserver,
    usecase::{RoomServer, RoomServerFactory},
};

use super::{
    message_pusher::WebSocketMessagePusher, repository::InMemoryConnectionStateRepository,
};

/// Factory giving every new room its own connection store and pusher
pub fn in_memory_room_factory(
    observer: Arc<dyn RelayObserver>,
    clock: Arc<dyn Clock>,
) -> RoomServerFactory {
    Arc::new(move |name| {
        RoomServer::new(
            name,
            Arc::new(InMemoryConnectionStateRepository::new()),
            Arc::new(WebSocketMessagePusher::new()),
            observer.clone(),
            clock.clone(),
        )
    })
}
