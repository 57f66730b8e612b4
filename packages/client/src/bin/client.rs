//! CLI client for the Huddle relay server.
//!
//! Joins one room as a user (`add-user` on every open), sends typed lines as
//! `message:created` and prints presence snapshots and relayed events.
//! Automatically reconnects on disconnection (max 5 attempts with 5 second interval).
//!
//! Run with:
//! ```not_rust
//! cargo run --bin huddle-client -- --room channel-c1 --user-id alice --name Alice
//! cargo run --bin huddle-client -- -r channel-c1 -i bob -u ws://127.0.0.1:8787
//! ```

use clap::Parser;
use huddle_client::{ClientConfig, domain::default_channel_id, run_client};
use huddle_server::domain::{User, UserId};
use huddle_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "huddle-client")]
#[command(about = "CLI client for the Huddle realtime presence and event-relay server", long_about = None)]
struct Args {
    /// Relay server base URL
    #[arg(short = 'u', long, default_value = "ws://127.0.0.1:8787")]
    url: String,

    /// Room to join (e.g. channel-c1, thread-m1, workspace-o1)
    #[arg(short = 'r', long)]
    room: String,

    /// User ID announced in presence
    #[arg(short = 'i', long)]
    user_id: String,

    /// Display name
    #[arg(short = 'n', long)]
    name: Option<String>,

    /// Email address
    #[arg(short = 'e', long)]
    email: Option<String>,

    /// Channel id for sent messages (defaults to the room name without `channel-`)
    #[arg(short = 'c', long)]
    channel_id: Option<String>,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    let user_id = match UserId::new(args.user_id) {
        Ok(id) => id,
        Err(e) => {
            tracing::error!("Invalid user id: {}", e);
            std::process::exit(1);
        }
    };
    let user = User {
        id: user_id,
        full_name: args.name,
        email: args.email,
        picture: None,
    };

    let config = ClientConfig {
        channel_id: args
            .channel_id
            .unwrap_or_else(|| default_channel_id(&args.room)),
        url: args.url,
        room: args.room,
        user,
    };

    // Run the client
    if let Err(e) = run_client(config).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
