//! Infrastructure layer: concrete implementations of the domain traits, the
//! HTTP DTOs and the wiring of in-memory rooms.

pub mod dto;
pub mod message_pusher;
pub mod metrics;
pub mod repository;
pub mod room_factory;

pub use room_factory::in_memory_room_factory;
