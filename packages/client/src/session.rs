//! Interactive client session on one room.

use huddle_server::domain::{ChannelEvent, EventEnvelope, PresenceMessage, UserId};
use huddle_shared::time::{current_timestamp_millis, timestamp_to_rfc3339};
use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::mpsc;

use crate::{
    cache::{ChannelCache, PresenceView},
    domain::build_message,
    error::ClientError,
    runner::ClientConfig,
    socket::{RelayReader, RelaySocket, RelayWriter},
};

use super::{formatter::MessageFormatter, ui::redisplay_prompt};

/// Ends the session without reconnecting
const QUIT_COMMAND: &str = "/quit";
/// Sends `remove-user`: stay connected but appear offline
const LEAVE_COMMAND: &str = "/leave";
/// Sends `add-user` again after `/leave`
const JOIN_COMMAND: &str = "/join";

/// Run one session: connect, announce the user, then relay typed lines and
/// print everything the room sends until the connection ends.
///
/// `input_rx` outlives the session so that one readline thread serves every
/// reconnection.
///
/// Returns `Ok(())` when the user quits, an error when the connection was lost.
pub async fn run_client_session(
    config: &ClientConfig,
    input_rx: &mut mpsc::UnboundedReceiver<String>,
) -> Result<(), ClientError> {
    let socket = RelaySocket::connect(&config.url, &config.room).await?;
    let (mut writer, reader) = socket.into_split();

    // The server keeps no state across connections, so every open announces
    // the user again
    writer
        .send(PresenceMessage::AddUser(config.user.clone()))
        .await?;

    let me = config.user.id.clone();
    println!(
        "\nYou are '{}' in '{}'. Type messages and press Enter to send. \
         {} hides you, {} shows you again, {} exits.\n",
        me, config.room, LEAVE_COMMAND, JOIN_COMMAND, QUIT_COMMAND
    );

    let mut read_task = tokio::spawn(receive_events(reader, me));

    // If either side completes, stop the other
    tokio::select! {
        read_result = &mut read_task => {
            match read_result {
                Ok(error) => Err(error),
                Err(e) => Err(ClientError::ConnectionError(e.to_string())),
            }
        }
        write_result = send_input(writer, input_rx, config) => {
            read_task.abort();
            write_result
        }
    }
}

/// Print every valid frame until the connection ends
///
/// Returns the reason the connection ended.
async fn receive_events(mut reader: RelayReader, me: UserId) -> ClientError {
    let mut presence = PresenceView::new();
    let mut channel = ChannelCache::new();

    loop {
        let event = match reader.next_event().await {
            Ok(Some(event)) => event,
            Ok(None) => {
                tracing::info!("Server closed the connection");
                return ClientError::ConnectionClosed;
            }
            Err(e) => {
                tracing::warn!("WebSocket read error: {}", e);
                return e;
            }
        };

        match &event {
            EventEnvelope::Presence(message) => presence.apply(message),
            EventEnvelope::Channel(channel_event) => channel.apply(channel_event),
            EventEnvelope::Thread(_) => {}
        }

        let formatted = match &event {
            EventEnvelope::Presence(PresenceMessage::Presence { .. }) => Some(
                MessageFormatter::format_presence(presence.users(), &me),
            ),
            EventEnvelope::Channel(ChannelEvent::RepliesIncremented { message_id, .. }) => {
                channel.get(message_id).map(|message| {
                    format!(
                        "\n↳ {} now has {} repl(ies)\n",
                        message.id,
                        message.reply_count.unwrap_or(0)
                    )
                })
            }
            other => MessageFormatter::format_event(other, &me),
        };

        if let Some(formatted) = formatted {
            print!("{}", formatted);
            redisplay_prompt(me.as_str());
        }
    }
}

/// Send every typed line until the user quits or the connection breaks
async fn send_input(
    mut writer: RelayWriter,
    input_rx: &mut mpsc::UnboundedReceiver<String>,
    config: &ClientConfig,
) -> Result<(), ClientError> {
    let user = &config.user;

    while let Some(line) = input_rx.recv().await {
        match line.as_str() {
            QUIT_COMMAND => break,
            LEAVE_COMMAND => {
                writer
                    .send(PresenceMessage::RemoveUser {
                        id: user.id.to_string(),
                    })
                    .await?;
            }
            JOIN_COMMAND => {
                writer.send(PresenceMessage::AddUser(user.clone())).await?;
            }
            _ => {
                let created_at = timestamp_to_rfc3339(current_timestamp_millis());
                let message = build_message(
                    uuid::Uuid::new_v4().to_string(),
                    user,
                    &config.channel_id,
                    line,
                    created_at.clone(),
                );
                writer.send(ChannelEvent::MessageCreated { message }).await?;

                // The relay never echoes our own events, so confirm locally
                print!("\n{}", MessageFormatter::format_sent_confirmation(&created_at));
            }
        }
        redisplay_prompt(user.id.as_str());
    }

    if let Err(e) = writer.close().await {
        tracing::debug!("Close after quit failed: {}", e);
    }
    Ok(())
}

/// Spawn a blocking thread for rustyline (synchronous readline)
///
/// Start it once per process. A second thread would compete for stdin with the
/// first, which stays blocked in `readline`.
pub fn spawn_readline(prompt_id: String, input_tx: mpsc::UnboundedSender<String>) {
    std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };

        let prompt = format!("{}> ", prompt_id);

        loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        rl.add_history_entry(line).ok();
                        if input_tx.send(line.to_string()).is_err() {
                            // Session ended
                            break;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    // Ctrl+C
                    tracing::info!("Interrupted");
                    let _ = input_tx.send(QUIT_COMMAND.to_string());
                    break;
                }
                Err(ReadlineError::Eof) => {
                    // Ctrl+D
                    tracing::info!("EOF");
                    let _ = input_tx.send(QUIT_COMMAND.to_string());
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });
}
