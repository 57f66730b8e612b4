//! UseCase: ルーム一覧・詳細の取得（イントロスペクション用）

use std::sync::Arc;

use crate::domain::{RoomName, RoomOverview};

use super::{error::GetRoomDetailError, room_router::RoomRouter};

/// ルーム一覧取得のユースケース
pub struct GetRoomsUseCase {
    router: Arc<RoomRouter>,
}

impl GetRoomsUseCase {
    pub fn new(router: Arc<RoomRouter>) -> Self {
        Self { router }
    }

    /// 生存中の全ルームを名前順で返す
    pub async fn execute(&self) -> Vec<RoomOverview> {
        let mut overviews = Vec::new();
        for room in self.router.rooms().await {
            overviews.push(room.overview().await);
        }
        overviews
    }
}

/// ルーム詳細取得のユースケース
pub struct GetRoomDetailUseCase {
    router: Arc<RoomRouter>,
}

impl GetRoomDetailUseCase {
    pub fn new(router: Arc<RoomRouter>) -> Self {
        Self { router }
    }

    /// # Errors
    ///
    /// * `InvalidRoomName` - ルーム名として使えない文字列
    /// * `RoomNotFound` - 生存中のルームがない
    pub async fn execute(&self, name: String) -> Result<RoomOverview, GetRoomDetailError> {
        let name = RoomName::new(name)?;
        match self.router.get(&name).await {
            Some(room) => Ok(room.overview().await),
            None => Err(GetRoomDetailError::RoomNotFound(name.into_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{NoopObserver, ValueObjectError},
        infrastructure::{
            message_pusher::WebSocketMessagePusher, repository::InMemoryConnectionStateRepository,
        },
        usecase::{NeverEvict, RoomServer, RoomServerFactory},
    };
    use huddle_shared::time::FixedClock;
    use tokio::sync::mpsc;

    fn create_router() -> Arc<RoomRouter> {
        let factory: RoomServerFactory = Arc::new(|name| {
            RoomServer::new(
                name,
                Arc::new(InMemoryConnectionStateRepository::new()),
                Arc::new(WebSocketMessagePusher::new()),
                Arc::new(NoopObserver),
                Arc::new(FixedClock::new(0)),
            )
        });
        Arc::new(RoomRouter::new(
            factory,
            Arc::new(NeverEvict),
            Arc::new(FixedClock::new(0)),
        ))
    }

    #[tokio::test]
    async fn test_get_rooms_lists_live_rooms() {
        // テスト項目: 生存中のルームの概要が名前順で返される
        // given (前提条件):
        let router = create_router();
        for name in ["thread-m1", "channel-c1"] {
            let (tx, _rx) = mpsc::unbounded_channel();
            router
                .connect(RoomName::new(name.to_string()).unwrap(), tx)
                .await;
        }
        let usecase = GetRoomsUseCase::new(router);

        // when (操作):
        let rooms = usecase.execute().await;

        // then (期待する結果):
        let names: Vec<&str> = rooms.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["channel-c1", "thread-m1"]);
        assert!(rooms.iter().all(|r| r.connection_count == 1));
    }

    #[tokio::test]
    async fn test_get_room_detail_not_found() {
        // テスト項目: 存在しないルームは RoomNotFound になる
        // given (前提条件):
        let usecase = GetRoomDetailUseCase::new(create_router());

        // when (操作):
        let result = usecase.execute("channel-missing".to_string()).await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(GetRoomDetailError::RoomNotFound("channel-missing".to_string()))
        );
    }

    #[tokio::test]
    async fn test_get_room_detail_invalid_name() {
        // テスト項目: 空のルーム名は InvalidRoomName になる
        // given (前提条件):
        let usecase = GetRoomDetailUseCase::new(create_router());

        // when (操作):
        let result = usecase.execute(String::new()).await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(GetRoomDetailError::InvalidRoomName(
                ValueObjectError::EmptyRoomName
            ))
        );
    }

    #[tokio::test]
    async fn test_get_room_detail_found() {
        // テスト項目: 存在するルームの概要が返される
        // given (前提条件):
        let router = create_router();
        let (tx, _rx) = mpsc::unbounded_channel();
        router
            .connect(RoomName::new("channel-c1".to_string()).unwrap(), tx)
            .await;
        let usecase = GetRoomDetailUseCase::new(router);

        // when (操作):
        let room = usecase.execute("channel-c1".to_string()).await.unwrap();

        // then (期待する結果):
        assert_eq!(room.name.as_str(), "channel-c1");
        assert_eq!(room.connection_count, 1);
        assert!(room.online_users.is_empty());
    }
}
