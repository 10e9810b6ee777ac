mod broadcast;
mod connection;
mod handler;
mod join_image;
mod registry;
mod server;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use crate::join_image::LinkImage;
use crate::server::ServerConfig;

/// Golftab Server - scoring session coordinator for the Golf card game
#[derive(Parser, Debug)]
#[command(name = "golftab-server", version, about)]
struct Args {
    /// Address to bind the server to
    #[arg(short, long, default_value = "0.0.0.0:9876")]
    bind: String,

    /// Host[:port] advertised in join URLs (what devices on the local
    /// network can actually reach)
    #[arg(short, long, default_value = "localhost:9876")]
    public_addr: String,

    /// Maximum simultaneous connections allowed
    #[arg(short, long, default_value_t = 100)]
    max_connections: usize,

    /// Minutes of inactivity before a room is evicted
    #[arg(long, default_value_t = 720)]
    room_idle_minutes: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "golftab_server=debug,golftab_common=debug".into()),
        )
        .init();

    let args = Args::parse();

    let addr: SocketAddr = args.bind.parse()?;

    tracing::info!(
        "Starting golftab server on {} (max {} connections)",
        addr,
        args.max_connections
    );
    server::run(
        ServerConfig {
            addr,
            public_addr: args.public_addr,
            max_connections: args.max_connections,
            room_idle_timeout: Duration::from_secs(args.room_idle_minutes * 60),
        },
        Arc::new(LinkImage),
    )
    .await
}
