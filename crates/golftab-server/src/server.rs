use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::connection::{self, ConnectionHandle};
use crate::join_image::JoinImageGenerator;
use crate::registry::RoomRegistry;

pub struct ServerState {
    pub registry: RwLock<RoomRegistry>,
    pub connections: RwLock<HashMap<Uuid, ConnectionHandle>>,
    pub join_image: Arc<dyn JoinImageGenerator>,
    /// Address advertised in join URLs, not necessarily the bind address.
    pub public_addr: String,
    pub max_connections: usize,
}

pub type SharedState = Arc<ServerState>;

pub struct ServerConfig {
    pub addr: SocketAddr,
    pub public_addr: String,
    pub max_connections: usize,
    pub room_idle_timeout: Duration,
}

pub async fn run(
    config: ServerConfig,
    join_image: Arc<dyn JoinImageGenerator>,
) -> anyhow::Result<()> {
    let state: SharedState = Arc::new(ServerState {
        registry: RwLock::new(RoomRegistry::new()),
        connections: RwLock::new(HashMap::new()),
        join_image,
        public_addr: config.public_addr,
        max_connections: config.max_connections,
    });

    // Rooms never end on their own, so a sweeper reclaims the ones
    // nobody has touched in a while.
    let sweep_state = state.clone();
    let max_idle = config.room_idle_timeout;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            let evicted = sweep_state.registry.write().await.cleanup_idle(max_idle);
            if evicted > 0 {
                tracing::info!("Evicted {} idle room(s)", evicted);
            }
        }
    });

    let listener = TcpListener::bind(config.addr).await?;
    tracing::info!("Listening on {}", config.addr);

    loop {
        let (stream, peer_addr) = listener.accept().await?;

        // Enforce max connections
        let conn_count = state.connections.read().await.len();
        if conn_count >= state.max_connections {
            tracing::warn!(
                "Rejecting connection from {} (max {} reached)",
                peer_addr,
                state.max_connections
            );
            drop(stream);
            continue;
        }

        tracing::info!(
            "New connection from {} ({}/{})",
            peer_addr,
            conn_count + 1,
            state.max_connections
        );

        let state = state.clone();
        tokio::spawn(async move {
            if let Err(e) = connection::handle_connection(stream, state).await {
                tracing::warn!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }
}
