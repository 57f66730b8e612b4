//! Utilities shared by the Huddle relay server and client.

pub mod logger;
pub mod time;
