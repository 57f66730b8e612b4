//! UseCase 層
//!
//! - `room_server`: 1 ルーム分の接続・presence・イベント中継
//! - `room_router`: ルーム名から Room Server への振り分けとライフサイクル
//! - `get_rooms`: イントロスペクション API 向けの読み取り

pub mod error;
pub mod get_rooms;
pub mod room_router;
pub mod room_server;

pub use error::GetRoomDetailError;
pub use get_rooms::{GetRoomDetailUseCase, GetRoomsUseCase};
pub use room_router::{
    EvictionPolicy, IdleTimeoutEviction, NeverEvict, RoomRouter, RoomServerFactory,
};
pub use room_server::{FrameOutcome, RoomServer};
