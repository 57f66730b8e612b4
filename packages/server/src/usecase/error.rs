//! UseCase 層のエラー定義

use thiserror::Error;

use crate::domain::ValueObjectError;

/// ルーム詳細取得のエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GetRoomDetailError {
    #[error("invalid room name: {0}")]
    InvalidRoomName(#[from] ValueObjectError),

    #[error("room not found: {0}")]
    RoomNotFound(String),
}
