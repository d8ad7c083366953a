//! Roomcast server binary.
//!
//! # Usage
//!
//! ```bash
//! # Listen on the default chat port, any origin accepted
//! roomcast-server --bind 0.0.0.0:3500
//!
//! # Restrict the WebSocket upgrade to known page origins
//! roomcast-server --allow-origin http://localhost:5500 \
//!                 --allow-origin http://127.0.0.1:5500
//! ```

use clap::Parser;
use roomcast_server::{Server, ServerConfig};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Roomcast chat relay server
#[derive(Parser, Debug)]
#[command(name = "roomcast-server")]
#[command(about = "Real-time group-chat relay server")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = "0.0.0.0:3500")]
    bind: String,

    /// Origin allowed during the WebSocket upgrade (repeatable).
    /// Accepts any origin when omitted.
    #[arg(long = "allow-origin")]
    allow_origin: Vec<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("roomcast server starting");

    if args.allow_origin.is_empty() {
        tracing::warn!("no --allow-origin given - accepting connections from any origin");
    }

    let config =
        ServerConfig { bind_address: args.bind, allowed_origins: args.allow_origin };

    let server = Server::bind(config).await?;

    server.run().await?;

    Ok(())
}
