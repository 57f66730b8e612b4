//! UseCase: Room Router
//!
//! ルーム名から Room Server を引き当て、初回接続時にインスタンスを生成します。
//! 接続のないルームは `EvictionPolicy` に従って破棄されます。
//!
//! ## ロック順序
//!
//! レジストリのロック → Room Server の turn ロックの順でのみ取得する。
//! `connect` はレジストリのロック中にルームの取得・生成と接続の予約だけを行い、
//! ロックを解放してから `on_connect` を待つ。異なるルームへの接続は互いを待たない。
//! `sweep` は予約中の接続があるルームを破棄しない。

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use huddle_shared::time::Clock;
use tokio::sync::Mutex;

use crate::domain::{ConnectionId, PusherChannel, RoomName};

use super::room_server::RoomServer;

/// Room Server を生成するファクトリ
pub type RoomServerFactory = Arc<dyn Fn(RoomName) -> RoomServer + Send + Sync>;

/// 空のルームを破棄するかどうかの判定
pub trait EvictionPolicy: Send + Sync {
    /// `idle_millis` は最後のコールバックからの経過時間
    fn should_evict(&self, idle_millis: i64) -> bool;
}

/// 一定時間アイドルだった空のルームを破棄
#[derive(Debug, Clone, Copy)]
pub struct IdleTimeoutEviction {
    timeout_millis: i64,
}

impl IdleTimeoutEviction {
    /// `i64` ミリ秒に収まらないタイムアウトは `i64::MAX` に丸める
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout_millis: i64::try_from(timeout.as_millis()).unwrap_or(i64::MAX),
        }
    }
}

impl EvictionPolicy for IdleTimeoutEviction {
    fn should_evict(&self, idle_millis: i64) -> bool {
        idle_millis >= self.timeout_millis
    }
}

/// ルームを破棄しない
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverEvict;

impl EvictionPolicy for NeverEvict {
    fn should_evict(&self, _idle_millis: i64) -> bool {
        false
    }
}

/// レジストリの 1 エントリ
struct RoomEntry {
    room: Arc<RoomServer>,
    /// `on_connect` を待っている接続の数
    pending: Arc<AtomicUsize>,
}

impl RoomEntry {
    fn new(room: RoomServer) -> Self {
        Self {
            room: Arc::new(room),
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }
}

/// 接続の予約（drop で解除）
struct PendingConnect(Arc<AtomicUsize>);

impl PendingConnect {
    fn new(pending: Arc<AtomicUsize>) -> Self {
        pending.fetch_add(1, Ordering::SeqCst);
        Self(pending)
    }
}

impl Drop for PendingConnect {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Room Router
pub struct RoomRouter {
    rooms: Mutex<HashMap<RoomName, RoomEntry>>,
    factory: RoomServerFactory,
    eviction: Arc<dyn EvictionPolicy>,
    clock: Arc<dyn Clock>,
}

impl RoomRouter {
    pub fn new(
        factory: RoomServerFactory,
        eviction: Arc<dyn EvictionPolicy>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            factory,
            eviction,
            clock,
        }
    }

    /// ルームに新しい接続を登録（ルームがなければ生成）
    ///
    /// # Returns
    ///
    /// 接続先の Room Server と、割り当てた接続 ID
    pub async fn connect(
        &self,
        name: RoomName,
        sender: PusherChannel,
    ) -> (Arc<RoomServer>, ConnectionId) {
        let (room, _reservation) = {
            let mut rooms = self.rooms.lock().await;
            let entry = rooms.entry(name).or_insert_with_key(|name| {
                tracing::info!("Room '{}' created", name);
                RoomEntry::new((self.factory)(name.clone()))
            });
            (entry.room.clone(), PendingConnect::new(entry.pending.clone()))
        };

        let connection = ConnectionId::generate();
        room.on_connect(connection, sender).await;
        (room, connection)
    }

    /// 既存のルームを取得（生成はしない）
    pub async fn get(&self, name: &RoomName) -> Option<Arc<RoomServer>> {
        self.rooms.lock().await.get(name).map(|entry| entry.room.clone())
    }

    /// 全ルームを名前順で取得
    pub async fn rooms(&self) -> Vec<Arc<RoomServer>> {
        let mut rooms: Vec<Arc<RoomServer>> = self
            .rooms
            .lock()
            .await
            .values()
            .map(|entry| entry.room.clone())
            .collect();
        rooms.sort_by(|a, b| a.name().cmp(b.name()));
        rooms
    }

    pub async fn len(&self) -> usize {
        self.rooms.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rooms.lock().await.is_empty()
    }

    /// 接続がなく、破棄ポリシーを満たすルームを削除
    ///
    /// # Returns
    ///
    /// 削除したルーム名
    pub async fn sweep(&self) -> Vec<RoomName> {
        let now = self.clock.now_millis();
        let mut rooms = self.rooms.lock().await;

        let mut evicted = Vec::new();
        for (name, entry) in rooms.iter() {
            let pending = entry.pending.load(Ordering::SeqCst);
            if pending > 0 || entry.room.connection_count().await > 0 {
                continue;
            }
            let idle = now.saturating_sub(entry.room.last_active().value());
            if self.eviction.should_evict(idle) {
                evicted.push(name.clone());
            }
        }

        for name in &evicted {
            rooms.remove(name);
            tracing::info!("Room '{}' evicted", name);
        }
        evicted
    }
}
