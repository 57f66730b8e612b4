//! HTTP API response DTOs.

use serde::{Deserialize, Serialize};

use crate::{domain::User, infrastructure::metrics::RelayMetricsSnapshot};

/// Entry of `GET /api/rooms`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummaryDto {
    pub name: String,
    pub connections: usize,
    /// Ids of the online users
    pub online_users: Vec<String>,
    pub created_at: String,
}

/// Body of `GET /api/rooms/{room}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomDetailDto {
    pub name: String,
    pub connections: usize,
    pub online_users: Vec<User>,
    pub created_at: String,
    pub last_active: String,
}

/// Body of `GET /api/health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthDto {
    pub status: String,
    pub rooms: usize,
}

/// Body of `GET /api/metrics`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsDto {
    pub rooms: usize,
    pub connections: usize,
    #[serde(flatten)]
    pub relay: RelayMetricsSnapshot,
}
