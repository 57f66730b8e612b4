//! Shared application state.

use std::sync::Arc;

use crate::{
    infrastructure::metrics::RelayCounters,
    usecase::{GetRoomDetailUseCase, GetRoomsUseCase, RoomRouter},
};

/// Shared application state
pub struct AppState {
    /// RoomRouter（ルーム名 → Room Server）
    pub router: Arc<RoomRouter>,
    /// RelayCounters（破棄・中継の集計）
    pub counters: Arc<RelayCounters>,
    /// GetRoomsUseCase（ルーム一覧取得のユースケース）
    pub get_rooms_usecase: Arc<GetRoomsUseCase>,
    /// GetRoomDetailUseCase（ルーム詳細取得のユースケース）
    pub get_room_detail_usecase: Arc<GetRoomDetailUseCase>,
}

impl AppState {
    pub fn new(router: Arc<RoomRouter>, counters: Arc<RelayCounters>) -> Self {
        Self {
            get_rooms_usecase: Arc::new(GetRoomsUseCase::new(router.clone())),
            get_room_detail_usecase: Arc::new(GetRoomDetailUseCase::new(router.clone())),
            router,
            counters,
        }
    }
}
