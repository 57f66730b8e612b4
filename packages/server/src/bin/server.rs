//! Realtime presence and event-relay server.
//!
//! Clients connect to `ws://<host>:<port>/parties/chat/<room>`, announce who
//! they are with `add-user`, and relay channel/thread events to everyone else
//! in the same room.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin huddle-server
//! cargo run --bin huddle-server -- --host 0.0.0.0 --port 8787 --idle-timeout-secs 600
//! ```

use std::{sync::Arc, time::Duration};

use clap::Parser;
use huddle_server::{
    infrastructure::{in_memory_room_factory, metrics::RelayCounters},
    ui::Server,
    usecase::{IdleTimeoutEviction, RoomRouter},
};
use huddle_shared::{logger::setup_logger, time::SystemClock};

#[derive(Parser, Debug)]
#[command(name = "huddle-server")]
#[command(about = "Realtime presence and event-relay server", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8787")]
    port: u16,

    /// Seconds an empty room may stay idle before it is evicted
    #[arg(long, default_value_t = 300)]
    idle_timeout_secs: u64,

    /// Seconds between eviction sweeps
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
    sweep_interval_secs: u64,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();

    // Initialize dependencies in order:
    // 1. Observer (relay counters) and clock
    // 2. Room factory (in-memory store + WebSocket pusher per room)
    // 3. Router
    // 4. Server

    // 1. Observer and clock
    let counters = Arc::new(RelayCounters::new());
    let clock = Arc::new(SystemClock);

    // 2. Room factory
    let factory = in_memory_room_factory(counters.clone(), clock.clone());

    // 3. Router
    let eviction = Arc::new(IdleTimeoutEviction::new(Duration::from_secs(
        args.idle_timeout_secs,
    )));
    let router = Arc::new(RoomRouter::new(factory, eviction, clock));

    // 4. Create and run the server
    let server = Server::new(
        router,
        counters,
        Duration::from_secs(args.sweep_interval_secs),
    );
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
