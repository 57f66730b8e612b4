//! In-process counters for relay traffic and dropped frames.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::domain::{ConnectionId, DropReason, RelayObserver, RoomName};

/// Process-wide relay counters shared by every room
#[derive(Debug, Default)]
pub struct RelayCounters {
    malformed_frames: AtomicU64,
    unknown_events: AtomicU64,
    rejected_server_events: AtomicU64,
    corrupted_states: AtomicU64,
    relayed_events: AtomicU64,
    relay_deliveries: AtomicU64,
    presence_broadcasts: AtomicU64,
}

/// Point-in-time copy of [`RelayCounters`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RelayMetricsSnapshot {
    /// Invalid JSON, missing tag, invalid payload or binary frames
    pub malformed_frames: u64,
    pub unknown_events: u64,
    /// `presence` frames sent by a client
    pub rejected_server_events: u64,
    pub corrupted_states: u64,
    pub relayed_events: u64,
    /// Sum of recipients over all relayed events
    pub relay_deliveries: u64,
    pub presence_broadcasts: u64,
}

impl RelayCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> RelayMetricsSnapshot {
        RelayMetricsSnapshot {
            malformed_frames: self.malformed_frames.load(Ordering::Relaxed),
            unknown_events: self.unknown_events.load(Ordering::Relaxed),
            rejected_server_events: self.rejected_server_events.load(Ordering::Relaxed),
            corrupted_states: self.corrupted_states.load(Ordering::Relaxed),
            relayed_events: self.relayed_events.load(Ordering::Relaxed),
            relay_deliveries: self.relay_deliveries.load(Ordering::Relaxed),
            presence_broadcasts: self.presence_broadcasts.load(Ordering::Relaxed),
        }
    }
}

impl RelayObserver for RelayCounters {
    fn frame_dropped(&self, room: &RoomName, connection: &ConnectionId, reason: DropReason) {
        let counter = match reason {
            DropReason::UnknownType => &self.unknown_events,
            DropReason::ServerOnlyEvent => &self.rejected_server_events,
            DropReason::InvalidJson
            | DropReason::MissingType
            | DropReason::InvalidPayload
            | DropReason::BinaryFrame => &self.malformed_frames,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            room = %room,
            connection = %connection,
            reason = ?reason,
            "frame dropped"
        );
    }

    fn state_corrupted(&self, room: &RoomName, connection: &ConnectionId) {
        self.corrupted_states.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(room = %room, connection = %connection, "connection state corrupted");
    }

    fn event_relayed(&self, room: &RoomName, event_type: &str, recipients: usize) {
        self.relayed_events.fetch_add(1, Ordering::Relaxed);
        self.relay_deliveries
            .fetch_add(recipients as u64, Ordering::Relaxed);
        tracing::debug!(room = %room, event_type, recipients, "event relayed");
    }

    fn presence_broadcast(&self, room: &RoomName, online_users: usize, recipients: usize) {
        self.presence_broadcasts.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(room = %room, online_users, recipients, "presence broadcast");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room() -> RoomName {
        RoomName::new("channel-c1".to_string()).unwrap()
    }

    #[test]
    fn test_drop_reasons_are_bucketed() {
        // テスト項目: 破棄理由ごとに適切なカウンタが増える
        // given (前提条件):
        let counters = RelayCounters::new();
        let connection = ConnectionId::generate();

        // when (操作):
        for reason in [
            DropReason::InvalidJson,
            DropReason::MissingType,
            DropReason::InvalidPayload,
            DropReason::BinaryFrame,
            DropReason::UnknownType,
            DropReason::ServerOnlyEvent,
        ] {
            counters.frame_dropped(&room(), &connection, reason);
        }

        // then (期待する結果):
        let snapshot = counters.snapshot();
        assert_eq!(snapshot.malformed_frames, 4);
        assert_eq!(snapshot.unknown_events, 1);
        assert_eq!(snapshot.rejected_server_events, 1);
    }

    #[test]
    fn test_relay_counts_recipients() {
        // テスト項目: 中継イベント数と配信数が集計される
        // given (前提条件):
        let counters = RelayCounters::new();

        // when (操作):
        counters.event_relayed(&room(), "message:created", 3);
        counters.event_relayed(&room(), "reaction:updated", 0);
        counters.presence_broadcast(&room(), 2, 4);

        // then (期待する結果):
        let snapshot = counters.snapshot();
        assert_eq!(snapshot.relayed_events, 2);
        assert_eq!(snapshot.relay_deliveries, 3);
        assert_eq!(snapshot.presence_broadcasts, 1);
        assert_eq!(snapshot.corrupted_states, 0);
    }
}
