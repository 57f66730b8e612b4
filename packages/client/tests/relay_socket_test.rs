//! Relay adapter against an in-process server.

use std::{sync::Arc, time::Duration};

use huddle_client::{
    ClientConfig, RelaySocket,
    cache::{ChannelCache, PresenceView},
    domain::build_message,
    session::run_client_session,
};
use huddle_server::{
    domain::{ChannelEvent, EventEnvelope, PresenceMessage, User, UserId},
    infrastructure::{in_memory_room_factory, metrics::RelayCounters},
    ui::Server,
    usecase::{NeverEvict, RoomRouter},
};
use huddle_shared::time::SystemClock;
use tokio::{net::TcpListener, sync::mpsc};

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// Start a server in the background and return its base URL
async fn start_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());

    let counters = Arc::new(RelayCounters::new());
    let clock = Arc::new(SystemClock);
    let factory = in_memory_room_factory(counters.clone(), clock.clone());
    let router = Arc::new(RoomRouter::new(factory, Arc::new(NeverEvict), clock));
    let server = Server::new(router, counters, Duration::from_secs(60));

    tokio::spawn(async move {
        server
            .serve(listener, std::future::pending())
            .await
            .unwrap();
    });

    url
}

fn user(id: &str) -> User {
    User::new(UserId::new(id.to_string()).unwrap()).with_full_name(id.to_uppercase())
}

async fn next(socket: &mut RelaySocket) -> EventEnvelope {
    tokio::time::timeout(RECV_TIMEOUT, socket.next_event())
        .await
        .expect("timed out waiting for an event")
        .unwrap()
        .expect("connection closed")
}

/// Fold presence snapshots until `expected` ids are online
async fn wait_for_presence(socket: &mut RelaySocket, view: &mut PresenceView, expected: &[&str]) {
    loop {
        if let EventEnvelope::Presence(message) = next(socket).await {
            view.apply(&message);
            let mut ids: Vec<&str> = view.users().iter().map(|u| u.id.as_str()).collect();
            ids.sort();
            if ids == expected {
                return;
            }
        }
    }
}

#[tokio::test]
async fn test_presence_and_relay_through_adapter() {
    // テスト項目: アダプタ経由で presence が反映され、送信したイベントが他の接続のキャッシュに届く
    // given (前提条件):
    let url = start_server().await;
    let mut alice = RelaySocket::connect(&url, "channel-c1").await.unwrap();
    // events may be sent before the first server frame
    alice
        .send(PresenceMessage::AddUser(user("alice")))
        .await
        .unwrap();
    let mut bob = RelaySocket::connect(&url, "channel-c1").await.unwrap();
    bob.send(PresenceMessage::AddUser(user("bob"))).await.unwrap();
    let mut bob_presence = PresenceView::new();
    wait_for_presence(&mut bob, &mut bob_presence, &["alice", "bob"]).await;

    // when (操作):
    let message = build_message(
        "m1".to_string(),
        &user("alice"),
        "c1",
        "hello".to_string(),
        "2025-01-01T10:00:00.000Z".to_string(),
    );
    alice
        .send(ChannelEvent::MessageCreated {
            message: message.clone(),
        })
        .await
        .unwrap();

    // then (期待する結果):
    let mut cache = ChannelCache::new();
    match next(&mut bob).await {
        EventEnvelope::Channel(event) => cache.apply(&event),
        other => panic!("unexpected event: {:?}", other),
    }
    assert_eq!(cache.get("m1"), Some(&message));
    assert_eq!(bob_presence.users()[0].full_name.as_deref(), Some("ALICE"));
}

#[tokio::test]
async fn test_one_client_in_several_rooms() {
    // テスト項目: 1 つのクライアントが複数のルームに同時に接続でき、ルームごとに presence が独立する
    // given (前提条件):
    let url = start_server().await;
    let mut channel = RelaySocket::connect(&url, "channel-c1").await.unwrap();
    let mut workspace = RelaySocket::connect(&url, "workspace-o1").await.unwrap();

    // when (操作):
    channel
        .send(PresenceMessage::AddUser(user("alice")))
        .await
        .unwrap();

    // then (期待する結果):
    let mut channel_view = PresenceView::new();
    wait_for_presence(&mut channel, &mut channel_view, &["alice"]).await;
    let first = next(&mut workspace).await;
    assert_eq!(
        first,
        EventEnvelope::Presence(PresenceMessage::Presence { users: vec![] })
    );
    assert_eq!(workspace.room().as_str(), "workspace-o1");
}

#[tokio::test]
async fn test_reconnect_is_a_new_client() {
    // テスト項目: 切断後に再接続したクライアントは add-user を送り直すまで presence に現れない
    // given (前提条件):
    let url = start_server().await;
    let mut observer = RelaySocket::connect(&url, "channel-c1").await.unwrap();
    let mut view = PresenceView::new();
    let mut alice = RelaySocket::connect(&url, "channel-c1").await.unwrap();
    alice
        .send(PresenceMessage::AddUser(user("alice")))
        .await
        .unwrap();
    wait_for_presence(&mut observer, &mut view, &["alice"]).await;

    // when (操作):
    alice.close().await.unwrap();
    wait_for_presence(&mut observer, &mut view, &[]).await;
    let mut alice = RelaySocket::connect(&url, "channel-c1").await.unwrap();
    alice
        .send(PresenceMessage::AddUser(user("alice")))
        .await
        .unwrap();

    // then (期待する結果):
    wait_for_presence(&mut observer, &mut view, &["alice"]).await;
}

#[tokio::test]
async fn test_one_input_stream_serves_consecutive_sessions() {
    // テスト項目: 同じ入力ストリームを使い回しても、再接続後のセッションに入力行が届く
    // given (前提条件):
    let url = start_server().await;
    let mut observer = RelaySocket::connect(&url, "channel-c1").await.unwrap();
    let mut view = PresenceView::new();
    let config = ClientConfig {
        url: url.clone(),
        room: "channel-c1".to_string(),
        user: user("alice"),
        channel_id: "c1".to_string(),
    };
    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();
    input_tx.send("/quit".to_string()).unwrap();
    run_client_session(&config, &mut input_rx).await.unwrap();
    wait_for_presence(&mut observer, &mut view, &["alice"]).await;
    wait_for_presence(&mut observer, &mut view, &[]).await;

    // when (操作):
    input_tx.send("hello again".to_string()).unwrap();
    input_tx.send("/quit".to_string()).unwrap();
    run_client_session(&config, &mut input_rx).await.unwrap();

    // then (期待する結果):
    let content = loop {
        if let EventEnvelope::Channel(ChannelEvent::MessageCreated { message }) =
            next(&mut observer).await
        {
            break message.content;
        }
    };
    assert_eq!(content.as_deref(), Some("hello again"));
}
