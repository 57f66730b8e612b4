//! Connection state store trait 定義
//!
//! Room Server が必要とする接続ごとの状態（ConnectionState）へのアクセスを
//! 定義します。具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

use async_trait::async_trait;

use super::{ConnectionId, ConnectionState, RepositoryError, User, dedup_users};

/// Online users derived from every live connection of a room
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OnlineUsers {
    /// Deduplicated by id, in first-seen order
    pub users: Vec<User>,
    /// Connections whose stored state could not be read and counted as anonymous
    pub corrupted: Vec<ConnectionId>,
}

/// Connection State Store
///
/// 1 つの Room Server が所有する、接続 ID → ConnectionState のサイドテーブル。
/// トランスポート（WebSocket）側には状態を持たせない。
#[async_trait]
pub trait ConnectionStateRepository: Send + Sync {
    /// 接続を登録（user は None で初期化）
    async fn attach(&self, connection: ConnectionId);

    /// 接続を削除。登録されていた場合は true
    async fn detach(&self, connection: &ConnectionId) -> bool;

    /// 接続のユーザーを上書き（唯一の更新操作）
    async fn set_user(
        &self,
        connection: &ConnectionId,
        user: Option<User>,
    ) -> Result<(), RepositoryError>;

    /// 接続の状態を取得
    async fn get_state(&self, connection: &ConnectionId)
    -> Result<ConnectionState, RepositoryError>;

    /// 登録中の全ての接続 ID を登録順に取得
    async fn connection_ids(&self) -> Vec<ConnectionId>;

    /// 登録中の接続数を取得
    async fn count(&self) -> usize;

    /// 接続のユーザーを取得
    async fn get_user(&self, connection: &ConnectionId) -> Result<Option<User>, RepositoryError> {
        self.get_state(connection).await.map(|state| state.user)
    }

    /// 全接続のユーザーを ID で重複排除して取得
    ///
    /// 読み出せない状態は `user: None` として扱い、`corrupted` に記録する。
    async fn all_users(&self) -> OnlineUsers {
        let mut users = Vec::new();
        let mut corrupted = Vec::new();

        for connection in self.connection_ids().await {
            match self.get_state(&connection).await {
                Ok(ConnectionState { user: Some(user) }) => users.push(user),
                Ok(ConnectionState { user: None }) => {}
                // detached between listing and reading
                Err(RepositoryError::ConnectionNotFound(_)) => {}
                Err(e) => {
                    tracing::warn!("Treating connection '{}' as anonymous: {}", connection, e);
                    corrupted.push(connection);
                }
            }
        }

        OnlineUsers {
            users: dedup_users(users),
            corrupted,
        }
    }
}
