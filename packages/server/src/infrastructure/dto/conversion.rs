//! Conversion from domain read models to HTTP DTOs.

use huddle_shared::time::timestamp_to_rfc3339;

use crate::domain::RoomOverview;

use super::http::{RoomDetailDto, RoomSummaryDto};

impl From<RoomOverview> for RoomSummaryDto {
    fn from(room: RoomOverview) -> Self {
        Self {
            name: room.name.into_string(),
            connections: room.connection_count,
            online_users: room
                .online_users
                .into_iter()
                .map(|user| user.id.into())
                .collect(),
            created_at: timestamp_to_rfc3339(room.created_at.value()),
        }
    }
}

impl From<RoomOverview> for RoomDetailDto {
    fn from(room: RoomOverview) -> Self {
        Self {
            name: room.name.into_string(),
            connections: room.connection_count,
            online_users: room.online_users,
            created_at: timestamp_to_rfc3339(room.created_at.value()),
            last_active: timestamp_to_rfc3339(room.last_active.value()),
        }
    }
}
