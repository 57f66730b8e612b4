//! UseCase: Room Server（1 ルームにつき 1 インスタンス）
//!
//! 接続の登録・切断、presence の再計算とブロードキャスト、チャンネル／スレッド
//! イベントの中継を担当します。
//!
//! ## 処理モデル
//!
//! - 1 ルームのコールバック（on_connect / on_message / on_close）は `turn` ロックで
//!   直列化され、トランスポートが届けた順に 1 つずつ処理される
//! - 異なるルームは状態を共有せず、並行に動作する
//! - 送信は `MessagePusher` 経由の fire-and-forget（ACK・再送なし）
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - 接続時の presence スナップショット送信（遅れて参加したクライアント向け）
//! - add-user / remove-user による presence 全量ブロードキャスト
//! - ドメインイベントの送信者以外への中継
//! - 不正フレームの破棄（接続は維持、状態は不変）
//! - 切断時の presence 再計算
//!
//! ### どのような状況を想定しているか
//! - 正常系：参加・イベント中継・離脱
//! - 異常系：不正 JSON、未知のイベント、クライアントからの presence 送信、破損した接続状態
//! - エッジケース：同一ユーザーの複数タブ、二重の切断通知

use std::sync::{
    Arc,
    atomic::{AtomicI64, Ordering},
};

use huddle_shared::time::Clock;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::domain::{
    ConnectionId, ConnectionStateRepository, DropReason, EventEnvelope, MessagePusher,
    PresenceMessage, PusherChannel, RelayObserver, RoomName, RoomOverview, Timestamp, User,
    parse_frame,
};

/// Result of handling one inbound frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Presence changed and a fresh snapshot was broadcast to `recipients`
    PresenceBroadcast { recipients: usize },
    /// Domain event relayed to every other connection
    Relayed { recipients: usize },
    /// Frame logged and dropped, the connection stays open
    Dropped(DropReason),
    /// The connection is no longer attached to this room
    Detached,
}

/// Room Server
pub struct RoomServer {
    name: RoomName,
    /// Connection State Store（接続 ID → ConnectionState）
    repository: Arc<dyn ConnectionStateRepository>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
    observer: Arc<dyn RelayObserver>,
    clock: Arc<dyn Clock>,
    created_at: Timestamp,
    last_active: AtomicI64,
    /// コールバックを直列化するためのロック
    turn: Mutex<()>,
}

impl RoomServer {
    /// 新しい RoomServer を作成
    pub fn new(
        name: RoomName,
        repository: Arc<dyn ConnectionStateRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        observer: Arc<dyn RelayObserver>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let now = clock.now_millis();
        Self {
            name,
            repository,
            message_pusher,
            observer,
            clock,
            created_at: Timestamp::new(now),
            last_active: AtomicI64::new(now),
            turn: Mutex::new(()),
        }
    }

    pub fn name(&self) -> &RoomName {
        &self.name
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn last_active(&self) -> Timestamp {
        Timestamp::new(self.last_active.load(Ordering::SeqCst))
    }

    pub async fn connection_count(&self) -> usize {
        self.repository.count().await
    }

    /// 新しい接続を登録し、その接続にだけ現在の presence を送信
    ///
    /// 遅れて参加したクライアントも、他の誰かの状態変化を待たずに
    /// オンラインのユーザーを知ることができる。
    pub async fn on_connect(&self, connection: ConnectionId, sender: PusherChannel) {
        let _turn = self.turn.lock().await;
        self.touch();

        self.message_pusher.register_client(connection, sender).await;
        self.repository.attach(connection).await;
        tracing::info!("Connected '{}' to room '{}'", connection, self.name);

        let users = self.presence_snapshot().await;
        let Some(frame) = encode(&PresenceMessage::Presence { users }) else {
            return;
        };
        if let Err(e) = self.message_pusher.push_to(&connection, &frame).await {
            tracing::warn!(
                "Failed to send presence snapshot to '{}' in room '{}': {}",
                connection,
                self.name,
                e
            );
        }
    }

    /// 受信したテキストフレームを処理
    pub async fn on_message(&self, connection: &ConnectionId, raw: &str) -> FrameOutcome {
        let _turn = self.turn.lock().await;
        self.touch();

        let envelope = match parse_frame(raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(
                    "Dropping frame from '{}' in room '{}': {}",
                    connection,
                    self.name,
                    e
                );
                return self.drop_frame(connection, DropReason::from(&e));
            }
        };

        match envelope {
            EventEnvelope::Presence(PresenceMessage::AddUser(user)) => {
                tracing::debug!("'{}' is now '{}' in room '{}'", connection, user.id, self.name);
                self.update_user(connection, Some(user)).await
            }
            EventEnvelope::Presence(PresenceMessage::RemoveUser { id }) => {
                tracing::debug!("'{}' removed user '{}' in room '{}'", connection, id, self.name);
                self.update_user(connection, None).await
            }
            EventEnvelope::Presence(PresenceMessage::Presence { .. }) => {
                tracing::warn!(
                    "Dropping presence snapshot sent by '{}' in room '{}'",
                    connection,
                    self.name
                );
                self.drop_frame(connection, DropReason::ServerOnlyEvent)
            }
            event @ (EventEnvelope::Channel(_) | EventEnvelope::Thread(_)) => {
                self.relay(connection, &event).await
            }
        }
    }

    /// バイナリフレームを破棄
    pub async fn on_binary(&self, connection: &ConnectionId) -> FrameOutcome {
        let _turn = self.turn.lock().await;
        self.touch();
        tracing::warn!(
            "Dropping binary frame from '{}' in room '{}'",
            connection,
            self.name
        );
        self.drop_frame(connection, DropReason::BinaryFrame)
    }

    /// 接続の終了を処理し、残りの接続に presence を再送信
    ///
    /// # Returns
    ///
    /// 接続が登録されていた場合は true（二重の切断通知は何もしない）
    pub async fn on_close(&self, connection: &ConnectionId) -> bool {
        let _turn = self.turn.lock().await;
        self.touch();

        self.message_pusher.unregister_client(connection).await;
        if !self.repository.detach(connection).await {
            return false;
        }
        tracing::info!("Connection '{}' closed in room '{}'", connection, self.name);

        self.broadcast_presence().await;
        true
    }

    /// トランスポートエラーを処理（切断と同じく presence を再計算）
    pub async fn on_error(&self, connection: &ConnectionId, error: &str) -> bool {
        tracing::error!(
            "Error on connection '{}' in room '{}': {}",
            connection,
            self.name,
            error
        );
        self.on_close(connection).await
    }

    /// 現在オンラインのユーザー（ID で重複排除）
    pub async fn presence_snapshot(&self) -> Vec<User> {
        let online = self.repository.all_users().await;
        for connection in &online.corrupted {
            self.observer.state_corrupted(&self.name, connection);
        }
        online.users
    }

    /// ルームの状態のスナップショット
    pub async fn overview(&self) -> RoomOverview {
        RoomOverview {
            name: self.name.clone(),
            connection_count: self.repository.count().await,
            online_users: self.presence_snapshot().await,
            created_at: self.created_at,
            last_active: self.last_active(),
        }
    }

    fn touch(&self) {
        self.last_active.store(self.clock.now_millis(), Ordering::SeqCst);
    }

    fn drop_frame(&self, connection: &ConnectionId, reason: DropReason) -> FrameOutcome {
        self.observer.frame_dropped(&self.name, connection, reason);
        FrameOutcome::Dropped(reason)
    }

    async fn update_user(&self, connection: &ConnectionId, user: Option<User>) -> FrameOutcome {
        if let Err(e) = self.repository.set_user(connection, user).await {
            tracing::warn!("Ignoring presence update in room '{}': {}", self.name, e);
            return FrameOutcome::Detached;
        }
        let recipients = self.broadcast_presence().await;
        FrameOutcome::PresenceBroadcast { recipients }
    }

    /// presence スナップショットを全接続（送信者を含む）にブロードキャスト
    async fn broadcast_presence(&self) -> usize {
        let users = self.presence_snapshot().await;
        let online_users = users.len();
        let Some(frame) = encode(&PresenceMessage::Presence { users }) else {
            return 0;
        };

        let targets = self.repository.connection_ids().await;
        let recipients = self.push(targets, &frame).await;
        self.observer.presence_broadcast(&self.name, online_users, recipients);
        recipients
    }

    /// ドメインイベントを送信者以外の全接続に中継
    async fn relay(&self, sender: &ConnectionId, event: &EventEnvelope) -> FrameOutcome {
        let Some(frame) = encode(event) else {
            return FrameOutcome::Relayed { recipients: 0 };
        };

        let targets: Vec<ConnectionId> = self
            .repository
            .connection_ids()
            .await
            .into_iter()
            .filter(|id| id != sender)
            .collect();
        let recipients = self.push(targets, &frame).await;

        tracing::debug!(
            "Relayed '{}' from '{}' to {} connection(s) in room '{}'",
            event.event_type(),
            sender,
            recipients,
            self.name
        );
        self.observer.event_relayed(&self.name, event.event_type(), recipients);
        FrameOutcome::Relayed { recipients }
    }

    async fn push(&self, targets: Vec<ConnectionId>, frame: &str) -> usize {
        match self.message_pusher.broadcast(targets, frame).await {
            Ok(delivered) => delivered,
            Err(e) => {
                tracing::warn!("Broadcast failed in room '{}': {}", self.name, e);
                0
            }
        }
    }
}

fn encode<T: Serialize>(value: &T) -> Option<String> {
    match serde_json::to_string(value) {
        Ok(json) => Some(json),
        Err(e) => {
            tracing::error!("Failed to serialize outbound frame: {}", e);
            None
        }
    }
}
