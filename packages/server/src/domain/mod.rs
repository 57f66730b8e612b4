//! Domain layer: value objects, entities, the realtime event contract and the
//! traits the outer layers implement.

pub mod entity;
pub mod error;
pub mod event;
pub mod message_pusher;
pub mod observer;
pub mod repository;
pub mod value_object;

pub use entity::{ConnectionState, RoomOverview, User, dedup_users};
pub use error::{MessagePushError, RepositoryError, ValueObjectError};
pub use event::{
    ChannelEvent, EventEnvelope, GroupedReaction, PresenceMessage, RealtimeMessage, SchemaError,
    ThreadEvent, parse_channel_event, parse_frame, parse_presence, parse_thread_event,
};
pub use message_pusher::{MessagePusher, PusherChannel};
#[cfg(test)]
pub use message_pusher::MockMessagePusher;
pub use observer::{DropReason, NoopObserver, RelayObserver};
pub use repository::{ConnectionStateRepository, OnlineUsers};
pub use value_object::{ConnectionId, RoomName, Timestamp, UserId};
