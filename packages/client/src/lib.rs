//! Huddle relay client.
//!
//! - `socket`: typed connection to one room of the relay server
//! - `cache`: reducers that fold relayed events into local views
//! - `runner` / `session`: the interactive CLI with reconnection

pub mod cache;
pub mod domain;
pub mod error;
pub mod formatter;
pub mod runner;
pub mod session;
pub mod socket;
pub mod ui;

pub use error::ClientError;
pub use runner::{ClientConfig, run_client};
pub use socket::{RelayReader, RelaySocket, RelayWriter};
