use std::collections::HashMap;

use uuid::Uuid;

use golftab_common::protocol::ServerMessage;
use golftab_common::room::Room;

use crate::connection::ConnectionHandle;

/// Fan the current room snapshot out to every connection bound to one of
/// its participants. No per-recipient filtering: placeholders' and
/// spectators' scores are as visible as everyone else's.
pub async fn broadcast_room(room: &Room, connections: &HashMap<Uuid, ConnectionHandle>) {
    let msg = ServerMessage::game_state(room);
    for connection_id in room.connected_ids() {
        if let Some(conn) = connections.get(&connection_id) {
            let _ = conn.tx.send(msg.clone()).await;
        }
    }
}

/// Point-to-point variant: reconnect snapshots and error notifications.
pub async fn send_to(
    connection_id: Uuid,
    msg: ServerMessage,
    connections: &HashMap<Uuid, ConnectionHandle>,
) {
    if let Some(conn) = connections.get(&connection_id) {
        let _ = conn.tx.send(msg).await;
    }
}
