//! huddle-relay server binary.

use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use huddle_relay::{serve, RelayConfig, RoomRegistry};

#[derive(Parser)]
#[command(name = "huddle-relay", about = "Room-based WebSocket chat relay")]
struct Args {
    /// Port to listen on.
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Outbound queue depth per connection.
    #[arg(long, default_value_t = 256)]
    queue_capacity: usize,

    /// Leave the sender out of its own room broadcasts.
    #[arg(long)]
    exclude_sender: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "huddle_relay=info".into()),
        )
        .init();

    let args = Args::parse();
    let config = RelayConfig {
        port: args.port,
        queue_capacity: args.queue_capacity,
        exclude_sender: args.exclude_sender,
    };

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .expect("Failed to bind TCP listener");

    tracing::info!("huddle-relay listening on {}", addr);

    let registry = RoomRegistry::new();

    // Spawn the stats tick.
    let stats_registry = registry.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(60)).await;
            let connections = stats_registry.count().await;
            let rooms = stats_registry.room_count().await;
            tracing::debug!(connections, rooms, "Stats tick");
        }
    });

    serve(listener, registry, config).await;
}
