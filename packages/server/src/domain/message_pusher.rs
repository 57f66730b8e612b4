//! MessagePusher trait 定義
//!
//! 接続へのメッセージ送信（通知）の抽象化。Room Server はこの trait にのみ依存し、
//! WebSocket などの具体的な送信手段は Infrastructure 層が提供します。

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{ConnectionId, MessagePushError};

/// Outbound channel of one connection (serialized JSON frames)
pub type PusherChannel = mpsc::UnboundedSender<String>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// 接続の送信チャンネルを登録
    async fn register_client(&self, connection: ConnectionId, sender: PusherChannel);

    /// 接続の送信チャンネルを登録解除
    async fn unregister_client(&self, connection: &ConnectionId);

    /// 特定の接続に送信
    async fn push_to(&self, connection: &ConnectionId, content: &str)
    -> Result<(), MessagePushError>;

    /// 複数の接続に送信（fire-and-forget）
    ///
    /// 一部の送信失敗は許容し、実際に送信できた接続数を返す
    async fn broadcast(
        &self,
        targets: Vec<ConnectionId>,
        content: &str,
    ) -> Result<usize, MessagePushError>;
}
