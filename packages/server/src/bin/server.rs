//! Between real-time server.
//!
//! Serves the presence counter, the fading spaces, the threshold and the
//! federation endpoint, and dials the given peers at start-up.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin between-server
//! cargo run --bin between-server -- --port 3334 --name "Second Garden" --peer http://127.0.0.1:3333
//! ```

use std::sync::Arc;

use between_server::ui::{Server, state::AppState};
use between_shared::{logger::setup_logger, time::SystemClock};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "between-server")]
#[command(about = "Real-time presence, fading spaces and federation for Between", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "BETWEEN_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "BETWEEN_PORT", default_value = "3333")]
    port: u16,

    /// Name this instance announces to its peers
    #[arg(long, env = "BETWEEN_INSTANCE_NAME", default_value = "A Between Garden")]
    name: String,

    /// Base URL of a peer instance to connect to at start-up (repeatable)
    #[arg(long = "peer", env = "BETWEEN_PEERS", value_delimiter = ',')]
    peers: Vec<String>,

    /// Directory holding the gardens; statistics are read from `wonder.json`
    #[arg(long, env = "BETWEEN_GARDENS_DIR", default_value = "gardens")]
    gardens_dir: String,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();

    // 1. Wire the spaces and the federation
    let server = Server::new(AppState::new(
        args.name,
        args.gardens_dir,
        Arc::new(SystemClock),
    ));

    // 2. Dial the start-up peers
    for peer in &args.peers {
        if let Err(e) = server.state().federation.connect_to_peer(peer).await {
            tracing::warn!("Not connecting to '{}': {}", peer, e);
        }
    }

    // 3. Serve until shutdown
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
