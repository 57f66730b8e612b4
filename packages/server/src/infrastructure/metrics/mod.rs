//! Relay metrics: counters fed by the `RelayObserver` hook.

pub mod counters;

pub use counters::{RelayCounters, RelayMetricsSnapshot};
