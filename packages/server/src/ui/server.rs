//! Server execution logic.

use std::{future::Future, sync::Arc, time::Duration};

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::{infrastructure::metrics::RelayCounters, usecase::RoomRouter};

use super::{
    handler::{get_metrics, get_room_detail, get_rooms, health_check, websocket_handler},
    signal::shutdown_signal,
    state::AppState,
};

/// Realtime presence and event-relay server
///
/// # Example
///
/// ```ignore
/// let server = Server::new(router, counters, Duration::from_secs(60));
/// server.run("127.0.0.1".to_string(), 8787).await?;
/// ```
pub struct Server {
    /// RoomRouter（ルーム名 → Room Server）
    router: Arc<RoomRouter>,
    /// RelayCounters（`/api/metrics` で公開）
    counters: Arc<RelayCounters>,
    /// 空のルームを掃除する間隔
    sweep_interval: Duration,
}

impl Server {
    /// Create a new Server instance
    ///
    /// # Arguments
    ///
    /// * `router` - Router owning every live room
    /// * `counters` - Counters fed by the rooms' observer hook
    /// * `sweep_interval` - How often idle empty rooms are evicted
    pub fn new(
        router: Arc<RoomRouter>,
        counters: Arc<RelayCounters>,
        sweep_interval: Duration,
    ) -> Self {
        Self {
            router,
            counters,
            sweep_interval,
        }
    }

    /// Build the axum application
    pub fn app(&self) -> Router {
        let app_state = Arc::new(AppState::new(self.router.clone(), self.counters.clone()));

        Router::new()
            // WebSocket エンドポイント
            .route("/parties/{party}/{room}", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/rooms", get(get_rooms))
            .route("/api/rooms/{room}", get(get_room_detail))
            .route("/api/metrics", get(get_metrics))
            .layer(TraceLayer::new_for_http())
            .with_state(app_state)
    }

    /// Run the relay server until Ctrl+C or SIGTERM
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr).await?;

        tracing::info!("Relay server listening on {}", listener.local_addr()?);
        tracing::info!("Connect to: ws://{}/parties/chat/<room>", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener, shutdown_signal()).await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.app();
        let sweeper = spawn_sweeper(self.router.clone(), self.sweep_interval);

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await;

        sweeper.abort();
        result
    }
}

/// Periodically evict idle empty rooms
fn spawn_sweeper(router: Arc<RoomRouter>, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // the first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let evicted = router.sweep().await;
            if !evicted.is_empty() {
                tracing::debug!("Evicted {} idle room(s)", evicted.len());
            }
        }
    })
}
