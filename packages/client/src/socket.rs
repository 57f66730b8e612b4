//! Typed WebSocket connection to one room of the relay server.
//!
//! Outbound events are serialized from the shared event types, inbound frames
//! are validated with the same parser the server uses. Frames that fail
//! validation are logged and skipped, never surfaced as errors.

use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use huddle_server::domain::{EventEnvelope, RoomName, parse_frame};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::protocol::Message,
};

use crate::error::ClientError;

/// Party name the relay server serves rooms under
pub const PARTY: &str = "chat";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Build `{base_url}/parties/chat/{room}`
pub fn room_url(base_url: &str, room: &RoomName) -> String {
    format!(
        "{}/parties/{}/{}",
        base_url.trim_end_matches('/'),
        PARTY,
        room
    )
}

/// Open connection to one room
pub struct RelaySocket {
    writer: RelayWriter,
    reader: RelayReader,
}

impl RelaySocket {
    /// Connect to `room` on the relay server at `base_url` (e.g. `ws://127.0.0.1:8787`)
    ///
    /// Events may be sent right away, without waiting for the first server frame.
    pub async fn connect(base_url: &str, room: &str) -> Result<Self, ClientError> {
        let room =
            RoomName::new(room.to_string()).map_err(|e| ClientError::InvalidRoom(e.to_string()))?;
        let url = room_url(base_url, &room);

        let (stream, _response) = connect_async(&url)
            .await
            .map_err(|e| ClientError::ConnectionError(e.to_string()))?;
        tracing::info!("Connected to room '{}' at {}", room, url);

        let (sink, stream) = stream.split();
        Ok(Self {
            writer: RelayWriter { sink },
            reader: RelayReader { stream, room },
        })
    }

    pub fn room(&self) -> &RoomName {
        &self.reader.room
    }

    pub async fn send(&mut self, event: impl Into<EventEnvelope>) -> Result<(), ClientError> {
        self.writer.send(event).await
    }

    pub async fn next_event(&mut self) -> Result<Option<EventEnvelope>, ClientError> {
        self.reader.next_event().await
    }

    /// Split into independently usable send and receive halves
    pub fn into_split(self) -> (RelayWriter, RelayReader) {
        (self.writer, self.reader)
    }

    pub async fn close(self) -> Result<(), ClientError> {
        self.writer.close().await
    }
}

/// Sending half of a [`RelaySocket`]
pub struct RelayWriter {
    sink: SplitSink<WsStream, Message>,
}

impl RelayWriter {
    /// Serialize and send one event (fire-and-forget, no acknowledgement)
    pub async fn send(&mut self, event: impl Into<EventEnvelope>) -> Result<(), ClientError> {
        let event = event.into();
        let json = serde_json::to_string(&event)?;
        self.sink
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| ClientError::ConnectionError(e.to_string()))?;
        tracing::debug!("Sent '{}'", event.event_type());
        Ok(())
    }

    pub async fn close(mut self) -> Result<(), ClientError> {
        self.sink
            .close()
            .await
            .map_err(|e| ClientError::ConnectionError(e.to_string()))
    }
}

/// Receiving half of a [`RelaySocket`]
pub struct RelayReader {
    stream: SplitStream<WsStream>,
    room: RoomName,
}

impl RelayReader {
    /// Next valid frame from the server
    ///
    /// Returns `Ok(None)` once the server closed the connection.
    pub async fn next_event(&mut self) -> Result<Option<EventEnvelope>, ClientError> {
        while let Some(message) = self.stream.next().await {
            let message = message.map_err(|e| ClientError::ConnectionError(e.to_string()))?;
            match message {
                Message::Text(text) => match parse_frame(text.as_str()) {
                    Ok(event) => return Ok(Some(event)),
                    Err(e) => {
                        tracing::warn!("Skipping invalid frame in room '{}': {}", self.room, e);
                    }
                },
                Message::Binary(data) => {
                    tracing::warn!(
                        "Skipping binary frame ({} bytes) in room '{}'",
                        data.len(),
                        self.room
                    );
                }
                Message::Close(_) => return Ok(None),
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
        Ok(None)
    }
}
