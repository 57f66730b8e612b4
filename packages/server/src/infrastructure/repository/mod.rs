//! Connection state store の実装

pub mod inmemory;

pub use inmemory::InMemoryConnectionStateRepository;
