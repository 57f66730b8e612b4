//! Data Transfer Objects of the HTTP introspection API.
//!
//! The realtime wire contract is part of the domain (`domain::event`), so only
//! the read-side JSON shapes live here.

pub mod conversion;
pub mod http;
