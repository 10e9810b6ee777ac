use std::collections::HashMap;

use rand::SeedableRng;
use serde_json::Value;
use uuid::Uuid;

use golftab_common::identity::{self, ClaimOutcome, JoinOutcome};
use golftab_common::protocol::{ClaimableSlot, ClientMessage, ServerMessage};
use golftab_common::room::{Room, RoomError, Transition};
use golftab_common::score;

use crate::broadcast;
use crate::join_image;
use crate::server::SharedState;

pub async fn handle_message(
    connection_id: Uuid,
    msg: ClientMessage,
    state: &SharedState,
) -> anyhow::Result<()> {
    match msg {
        ClientMessage::CreateSession {
            host_name,
            durable_id,
        } => {
            let code = {
                let mut registry = state.registry.write().await;
                let mut rng = rand::rngs::StdRng::from_entropy();
                registry.create(durable_id.clone(), &mut rng).code.clone()
            };
            tracing::info!("Room {} created by '{}'", code, host_name);

            // Image generation stays off the registry lock; a slow
            // generator must never gate admission.
            let url = join_image::join_url(&state.public_addr, &code);
            let image = state.join_image.generate(&url);
            send_to_connection(
                connection_id,
                ServerMessage::SessionCreated {
                    code: code.clone(),
                    join_image: image,
                },
                state,
            )
            .await;

            // The host joins their own room right away.
            join_session(connection_id, &code, host_name, durable_id, state).await;
        }

        ClientMessage::CheckRoom { code } => {
            let registry = state.registry.read().await;
            let reply = match registry.get(&code) {
                Some(room) => ServerMessage::RoomInfo {
                    exists: true,
                    claimable: identity::claimable_placeholders(room)
                        .into_iter()
                        .map(|p| ClaimableSlot {
                            slot_key: p.slot_key.clone().unwrap_or_default(),
                            name: p.display_name.clone(),
                        })
                        .collect(),
                },
                None => ServerMessage::RoomInfo {
                    exists: false,
                    claimable: Vec::new(),
                },
            };
            drop(registry);
            send_to_connection(connection_id, reply, state).await;
        }

        ClientMessage::JoinSession {
            code,
            display_name,
            durable_id,
        } => {
            join_session(connection_id, &code, display_name, durable_id, state).await;
        }

        ClientMessage::AddPlaceholder { code, name } => {
            let mut registry = state.registry.write().await;
            let outcome = match registry.get_mut(&code) {
                Some(room) => match identity::add_placeholder(room, name) {
                    Ok(_) => Ok(room.clone()),
                    Err(e) => Err(e),
                },
                None => Err(RoomError::NotFound),
            };
            drop(registry);

            match outcome {
                Ok(room) => fan_out(&room, state).await,
                Err(e) => send_error(connection_id, &e, state).await,
            }
        }

        ClientMessage::ClaimPlaceholder {
            code,
            slot_key,
            durable_id,
        } => {
            let mut registry = state.registry.write().await;
            let outcome = match registry.get_mut(&code) {
                Some(room) => {
                    let claim =
                        identity::claim_placeholder(room, &slot_key, durable_id, connection_id);
                    match claim {
                        ClaimOutcome::Claimed => Ok(room.clone()),
                        ClaimOutcome::NotFound => {
                            Err(RoomError::Rejected("no such placeholder".into()))
                        }
                        ClaimOutcome::AlreadyClaimed => {
                            Err(RoomError::Rejected("placeholder already claimed".into()))
                        }
                        ClaimOutcome::NotAPlaceholder => {
                            Err(RoomError::Rejected("seat is not a placeholder".into()))
                        }
                    }
                }
                None => Err(RoomError::NotFound),
            };
            drop(registry);

            match outcome {
                Ok(room) => {
                    bind_connection(connection_id, &room.code, state).await;
                    fan_out(&room, state).await;
                }
                Err(e) => send_error(connection_id, &e, state).await,
            }
        }

        ClientMessage::StartSession { code } => {
            apply_transition(connection_id, &code, Transition::Start, state).await;
        }
        ClientMessage::FinishSession { code } => {
            apply_transition(connection_id, &code, Transition::Finish, state).await;
        }
        ClientMessage::RestartSession { code } => {
            apply_transition(connection_id, &code, Transition::Restart, state).await;
        }

        ClientMessage::SubmitRound {
            code,
            scores,
            durable_id,
        } => {
            submit_round(connection_id, &code, &scores, &durable_id, state).await;
        }

        ClientMessage::Ping => {
            send_to_connection(connection_id, ServerMessage::Pong, state).await;
        }

        ClientMessage::Disconnect => {
            handle_disconnect(connection_id, state).await;
        }

        ClientMessage::Hello { .. } => {
            // Handshake is handled before the message loop.
        }
    }

    Ok(())
}

/// Join or rejoin: the one path deciding between "rebind and answer
/// point-to-point" and "append and fan out".
async fn join_session(
    connection_id: Uuid,
    code: &str,
    display_name: String,
    durable_id: String,
    state: &SharedState,
) {
    let mut registry = state.registry.write().await;
    let Some(room) = registry.get_mut(code) else {
        drop(registry);
        send_error(connection_id, &RoomError::NotFound, state).await;
        return;
    };

    let outcome = identity::join(room, display_name, durable_id, connection_id);
    let room = room.clone();
    drop(registry);

    bind_connection(connection_id, &room.code, state).await;

    match outcome {
        JoinOutcome::Reconnected => {
            tracing::debug!("Reconnect into room {}", room.code);
            let conns = state.connections.read().await;
            broadcast::send_to(connection_id, ServerMessage::game_state(&room), &conns).await;
        }
        JoinOutcome::Joined | JoinOutcome::JoinedAsSpectator => {
            fan_out(&room, state).await;
        }
    }
}

async fn apply_transition(
    connection_id: Uuid,
    code: &str,
    transition: Transition,
    state: &SharedState,
) {
    let mut registry = state.registry.write().await;
    let outcome = match registry.get_mut(code) {
        Some(room) => {
            // Transitions carry no identity; who the connection currently
            // is decides authority.
            let caller = room
                .durable_id_for_connection(connection_id)
                .map(str::to_string);
            match caller {
                Some(caller) => room
                    .apply_transition(transition, &caller)
                    .map(|_| room.clone()),
                None => Err(RoomError::Unauthorized),
            }
        }
        None => Err(RoomError::NotFound),
    };
    drop(registry);

    match outcome {
        Ok(room) => {
            tracing::info!("Room {} -> {:?}", room.code, room.status);
            fan_out(&room, state).await;
        }
        Err(e) => send_error(connection_id, &e, state).await,
    }
}

async fn submit_round(
    connection_id: Uuid,
    code: &str,
    scores: &HashMap<String, Value>,
    durable_id: &str,
    state: &SharedState,
) {
    let mut registry = state.registry.write().await;
    let outcome = match registry.get_mut(code) {
        Some(room) => score::submit_round(room, scores, durable_id).map(|_| room.clone()),
        None => Err(RoomError::NotFound),
    };
    drop(registry);

    match outcome {
        Ok(room) => {
            tracing::debug!("Room {} advanced to round {}", room.code, room.round);
            fan_out(&room, state).await;
        }
        Err(e) => send_error(connection_id, &e, state).await,
    }
}

pub async fn handle_disconnect(connection_id: Uuid, state: &SharedState) {
    let room_code = {
        let mut conns = state.connections.write().await;
        conns.remove(&connection_id).and_then(|c| c.room_code)
    };

    let Some(code) = room_code else {
        return;
    };

    // The seat stays in the room; only the connection binding is cleared
    // so the roster shows the participant as offline until they rejoin.
    let mut registry = state.registry.write().await;
    let updated = registry.get_mut(&code).and_then(|room| {
        identity::mark_disconnected(room, connection_id).then(|| room.clone())
    });
    drop(registry);

    if let Some(room) = updated {
        fan_out(&room, state).await;
    }
}

async fn bind_connection(connection_id: Uuid, code: &str, state: &SharedState) {
    let mut conns = state.connections.write().await;
    if let Some(conn) = conns.get_mut(&connection_id) {
        conn.room_code = Some(code.to_string());
    }
}

async fn fan_out(room: &Room, state: &SharedState) {
    let conns = state.connections.read().await;
    broadcast::broadcast_room(room, &conns).await;
}

async fn send_error(connection_id: Uuid, err: &RoomError, state: &SharedState) {
    send_to_connection(connection_id, ServerMessage::from_room_error(err), state).await;
}

async fn send_to_connection(connection_id: Uuid, msg: ServerMessage, state: &SharedState) {
    let conns = state.connections.read().await;
    broadcast::send_to(connection_id, msg, &conns).await;
}
