//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    infrastructure::dto::http::{HealthDto, MetricsDto, RoomDetailDto, RoomSummaryDto},
    ui::state::AppState,
    usecase::GetRoomDetailError,
};

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthDto> {
    Json(HealthDto {
        status: "ok".to_string(),
        rooms: state.router.len().await,
    })
}

/// Get list of live rooms
pub async fn get_rooms(State(state): State<Arc<AppState>>) -> Json<Vec<RoomSummaryDto>> {
    let rooms = state.get_rooms_usecase.execute().await;

    // Domain Model から DTO への変換
    Json(rooms.into_iter().map(RoomSummaryDto::from).collect())
}

/// Get room detail by name
pub async fn get_room_detail(
    State(state): State<Arc<AppState>>,
    Path(room): Path<String>,
) -> Result<Json<RoomDetailDto>, StatusCode> {
    match state.get_room_detail_usecase.execute(room).await {
        Ok(overview) => Ok(Json(RoomDetailDto::from(overview))),
        Err(GetRoomDetailError::InvalidRoomName(_)) => Err(StatusCode::BAD_REQUEST),
        Err(GetRoomDetailError::RoomNotFound(_)) => Err(StatusCode::NOT_FOUND),
    }
}

/// Relay counters plus current room and connection totals
pub async fn get_metrics(State(state): State<Arc<AppState>>) -> Json<MetricsDto> {
    let rooms = state.router.rooms().await;
    let mut connections = 0;
    for room in &rooms {
        connections += room.connection_count().await;
    }

    Json(MetricsDto {
        rooms: rooms.len(),
        connections,
        relay: state.counters.snapshot(),
    })
}
