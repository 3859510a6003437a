//! Terminal client for the Between threshold.
//!
//! Prints what happens at the threshold and sends each input line as a
//! message. Reconnects on disconnection (max 5 attempts with 5 second
//! interval).
//!
//! Run with:
//! ```not_rust
//! cargo run --bin between-client
//! cargo run --bin between-client -- --name wren --url ws://127.0.0.1:3333/threshold-ws
//! ```

use clap::Parser;

use between_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "between-client")]
#[command(about = "Terminal client for the Between threshold", long_about = None)]
struct Args {
    /// Threshold WebSocket URL
    #[arg(short = 'u', long, default_value = "ws://127.0.0.1:3333/threshold-ws")]
    url: String,

    /// Display name revealed when speaking
    #[arg(short = 'n', long)]
    name: Option<String>,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    if let Err(e) = between_client::run_client(args.url, args.name).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
