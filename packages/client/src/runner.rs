//! Client execution logic with reconnection support.

use huddle_server::domain::User;
use tokio::sync::mpsc;

use crate::{
    domain::{
        MAX_RECONNECT_ATTEMPTS, RECONNECT_INTERVAL, should_attempt_reconnect,
        should_exit_immediately,
    },
    error::ClientError,
    session::{run_client_session, spawn_readline},
};

/// Everything a session needs to join a room
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Relay server base URL (e.g. `ws://127.0.0.1:8787`)
    pub url: String,
    pub room: String,
    /// Identity announced with `add-user` on every open
    pub user: User,
    /// Channel id stamped on typed messages
    pub channel_id: String,
}

/// Run the relay client with reconnection logic
///
/// Each reconnection opens a fresh socket and announces the user again; the
/// server cannot tell it apart from a new client.
pub async fn run_client(config: ClientConfig) -> Result<(), ClientError> {
    let mut failed_attempts = 0;

    // One readline thread for the whole run, shared by every session
    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();
    spawn_readline(config.user.id.to_string(), input_tx);

    loop {
        tracing::info!(
            "Attempting to connect to {} room '{}' as '{}' (attempt {}/{})",
            config.url,
            config.room,
            config.user.id,
            failed_attempts + 1,
            MAX_RECONNECT_ATTEMPTS
        );

        let error = match run_client_session(&config, &mut input_rx).await {
            Ok(()) => {
                tracing::info!("Client session ended normally");
                return Ok(());
            }
            Err(e) => e,
        };

        if should_exit_immediately(&error) {
            tracing::error!("{}. Exiting.", error);
            return Err(error);
        }

        tracing::warn!("Connection lost: {}", error);
        failed_attempts += 1;

        if !should_attempt_reconnect(&error, failed_attempts, MAX_RECONNECT_ATTEMPTS) {
            tracing::error!(
                "Failed to reconnect after {} attempts. Exiting.",
                MAX_RECONNECT_ATTEMPTS
            );
            return Err(error);
        }

        tracing::info!(
            "Reconnecting in {} seconds... (attempt {}/{})",
            RECONNECT_INTERVAL.as_secs(),
            failed_attempts + 1,
            MAX_RECONNECT_ATTEMPTS
        );
        tokio::time::sleep(RECONNECT_INTERVAL).await;
    }
}
