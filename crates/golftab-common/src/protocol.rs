use std::collections::HashMap;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use uuid::Uuid;

use crate::participant::ParticipantKind;
use crate::room::{Room, RoomError, RoomStatus};

// -- Framing --

pub type Transport = Framed<TcpStream, LengthDelimitedCodec>;

pub fn framed_transport(stream: TcpStream) -> Transport {
    LengthDelimitedCodec::builder()
        .max_frame_length(64 * 1024)
        .new_framed(stream)
}

// -- Client -> Server Messages --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClientMessage {
    // Handshake
    Hello {
        client_name: String,
        version: String,
    },

    // Session lifecycle
    CreateSession {
        host_name: String,
        durable_id: String,
    },
    CheckRoom {
        code: String,
    },
    JoinSession {
        code: String,
        display_name: String,
        durable_id: String,
    },
    AddPlaceholder {
        code: String,
        name: String,
    },
    ClaimPlaceholder {
        code: String,
        slot_key: String,
        durable_id: String,
    },

    // Host-gated transitions
    StartSession {
        code: String,
    },
    FinishSession {
        code: String,
    },
    RestartSession {
        code: String,
    },

    // Scoring; raw values stay untyped so the server-side coercion
    // rule is the single place that interprets them.
    SubmitRound {
        code: String,
        scores: HashMap<String, Value>,
        durable_id: String,
    },

    // Connection
    Ping,
    Disconnect,
}

// -- Server -> Client Messages --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ServerMessage {
    // Handshake
    Welcome {
        connection_id: Uuid,
        server_version: String,
    },
    HandshakeError {
        reason: String,
    },

    // Session lifecycle
    SessionCreated {
        code: String,
        join_image: String,
    },
    RoomInfo {
        exists: bool,
        claimable: Vec<ClaimableSlot>,
    },

    // The one fan-out payload: the full room, to everyone in it.
    GameState {
        room: RoomSnapshot,
    },

    // Errors go point-to-point only, never into a broadcast.
    ErrorMsg {
        code: ErrorCode,
        message: String,
    },

    // Connection
    Pong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    RoomNotFound,
    Unauthorized,
    RuleViolation,
    Rejected,
    InternalError,
}

impl ServerMessage {
    pub fn from_room_error(err: &RoomError) -> Self {
        let code = match err {
            RoomError::NotFound => ErrorCode::RoomNotFound,
            RoomError::Unauthorized => ErrorCode::Unauthorized,
            RoomError::Validation(_) => ErrorCode::RuleViolation,
            RoomError::Rejected(_) => ErrorCode::Rejected,
        };
        ServerMessage::ErrorMsg {
            code,
            message: err.to_string(),
        }
    }

    pub fn game_state(room: &Room) -> Self {
        ServerMessage::GameState {
            room: room.snapshot(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub code: String,
    pub status: RoomStatus,
    pub round: u32,
    pub host_id: String,
    pub created_at: DateTime<Utc>,
    pub participants: Vec<ParticipantSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantSnapshot {
    /// Stable submission key: durable id for claimed seats, slot key
    /// for open placeholders.
    pub key: String,
    pub display_name: String,
    pub kind: ParticipantKind,
    pub scores: Vec<i32>,
    pub total: i32,
    pub connected: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimableSlot {
    pub slot_key: String,
    pub name: String,
}

// -- Serialization helpers --

pub fn serialize_message<T: Serialize>(msg: &T) -> Result<Bytes, serde_json::Error> {
    let json = serde_json::to_vec(msg)?;
    Ok(Bytes::from(json))
}

pub fn deserialize_message<T: for<'de> Deserialize<'de>>(
    data: &[u8],
) -> Result<T, serde_json::Error> {
    serde_json::from_slice(data)
}

// -- Transport helpers --

pub async fn send_message<T: Serialize>(
    transport: &mut Transport,
    msg: &T,
) -> anyhow::Result<()> {
    let bytes = serialize_message(msg).map_err(|e| anyhow::anyhow!("serialize error: {}", e))?;
    transport
        .send(bytes.into())
        .await
        .map_err(|e| anyhow::anyhow!("send error: {}", e))
}

pub async fn recv_message<T: for<'de> Deserialize<'de>>(
    transport: &mut Transport,
) -> anyhow::Result<Option<T>> {
    match transport.next().await {
        Some(Ok(frame)) => {
            let msg = deserialize_message(&frame)
                .map_err(|e| anyhow::anyhow!("deserialize error: {}", e))?;
            Ok(Some(msg))
        }
        Some(Err(e)) => Err(anyhow::anyhow!("recv error: {}", e)),
        None => Ok(None),
    }
}
