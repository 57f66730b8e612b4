//! InMemory Connection State Repository 実装
//!
//! ドメイン層が定義する ConnectionStateRepository trait の具体的な実装。
//! 接続順を保った Vec をインメモリのサイドテーブルとして使用します。
//!
//! 状態は型付きで保持されるため、この実装では破損状態（CorruptedState）は
//! 発生しません。ハイバネーション対応のホストで状態をシリアライズして
//! 退避する実装では、復元時の検証失敗を CorruptedState として返します。

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    ConnectionId, ConnectionState, ConnectionStateRepository, RepositoryError, User,
};

/// インメモリ Connection State Repository 実装
#[derive(Default)]
pub struct InMemoryConnectionStateRepository {
    /// 接続 ID と状態（接続順）
    states: Mutex<Vec<(ConnectionId, ConnectionState)>>,
}

impl InMemoryConnectionStateRepository {
    /// 新しい InMemoryConnectionStateRepository を作成
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConnectionStateRepository for InMemoryConnectionStateRepository {
    async fn attach(&self, connection: ConnectionId) {
        let mut states = self.states.lock().await;
        if states.iter().any(|(id, _)| *id == connection) {
            tracing::debug!("Connection '{}' is already attached", connection);
            return;
        }
        states.push((connection, ConnectionState::default()));
    }

    async fn detach(&self, connection: &ConnectionId) -> bool {
        let mut states = self.states.lock().await;
        let before = states.len();
        states.retain(|(id, _)| id != connection);
        states.len() != before
    }

    async fn set_user(
        &self,
        connection: &ConnectionId,
        user: Option<User>,
    ) -> Result<(), RepositoryError> {
        let mut states = self.states.lock().await;
        let (_, state) = states
            .iter_mut()
            .find(|(id, _)| id == connection)
            .ok_or_else(|| RepositoryError::ConnectionNotFound(connection.to_string()))?;
        state.user = user;
        Ok(())
    }

    async fn get_state(
        &self,
        connection: &ConnectionId,
    ) -> Result<ConnectionState, RepositoryError> {
        let states = self.states.lock().await;
        states
            .iter()
            .find(|(id, _)| id == connection)
            .map(|(_, state)| state.clone())
            .ok_or_else(|| RepositoryError::ConnectionNotFound(connection.to_string()))
    }

    async fn connection_ids(&self) -> Vec<ConnectionId> {
        let states = self.states.lock().await;
        states.iter().map(|(id, _)| *id).collect()
    }

    async fn count(&self) -> usize {
        self.states.lock().await.len()
    }
}
