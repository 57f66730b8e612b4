//! インメモリ実装

pub mod connection_state;

pub use connection_state::InMemoryConnectionStateRepository;
