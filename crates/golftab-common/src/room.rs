use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::participant::Participant;
use crate::protocol::{ParticipantSnapshot, RoomSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Lobby,
    Playing,
    Finished,
}

/// Host-gated state transitions. All of them go through
/// [`Room::apply_transition`] so the authority and legality checks
/// cannot drift apart between handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Start,
    Finish,
    Restart,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum RoomError {
    #[error("room not found")]
    NotFound,
    #[error("only the host may do that")]
    Unauthorized,
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Rejected(String),
}

#[derive(Debug, Clone)]
pub struct Room {
    pub code: String,
    pub status: RoomStatus,
    /// 1-based; increments only when a round is successfully applied.
    pub round: u32,
    /// Durable id of the single host. Always a Human participant once
    /// the host has joined.
    pub host_id: String,
    /// Insertion order is display order. Participants are never removed.
    pub participants: Vec<Participant>,
    pub created_at: DateTime<Utc>,
}

impl Room {
    pub fn new(code: String, host_durable_id: String) -> Self {
        Self {
            code,
            status: RoomStatus::Lobby,
            round: 1,
            host_id: host_durable_id,
            participants: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn is_host(&self, durable_id: &str) -> bool {
        self.host_id == durable_id
    }

    pub fn find_by_durable_id(&self, durable_id: &str) -> Option<&Participant> {
        self.participants
            .iter()
            .find(|p| p.durable_id.as_deref() == Some(durable_id))
    }

    pub fn find_by_durable_id_mut(&mut self, durable_id: &str) -> Option<&mut Participant> {
        self.participants
            .iter_mut()
            .find(|p| p.durable_id.as_deref() == Some(durable_id))
    }

    pub fn find_by_slot_key_mut(&mut self, slot_key: &str) -> Option<&mut Participant> {
        self.participants
            .iter_mut()
            .find(|p| p.slot_key.as_deref() == Some(slot_key))
    }

    /// Resolve the durable identity behind a live connection. Host-gated
    /// requests carry only the room code, so authority is decided by who
    /// the connection currently is.
    pub fn durable_id_for_connection(&self, connection_id: Uuid) -> Option<&str> {
        self.participants
            .iter()
            .find(|p| p.connection_id == Some(connection_id))
            .and_then(|p| p.durable_id.as_deref())
    }

    /// Participants counted by round validation (everyone but spectators).
    pub fn active_participants(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter().filter(|p| p.is_active())
    }

    /// Connection ids forming the room's broadcast group.
    pub fn connected_ids(&self) -> Vec<Uuid> {
        self.participants
            .iter()
            .filter_map(|p| p.connection_id)
            .collect()
    }

    /// Apply a host-gated transition. Fails without effect when the
    /// caller is not the host or the transition is illegal from the
    /// current status.
    pub fn apply_transition(
        &mut self,
        transition: Transition,
        caller_durable_id: &str,
    ) -> Result<(), RoomError> {
        if !self.is_host(caller_durable_id) {
            return Err(RoomError::Unauthorized);
        }

        match (transition, self.status) {
            (Transition::Start, RoomStatus::Lobby) => {
                self.status = RoomStatus::Playing;
                Ok(())
            }
            (Transition::Finish, RoomStatus::Playing) => {
                self.status = RoomStatus::Finished;
                Ok(())
            }
            (Transition::Restart, RoomStatus::Playing | RoomStatus::Finished) => {
                self.status = RoomStatus::Playing;
                self.round = 1;
                for p in &mut self.participants {
                    p.reset_scores();
                }
                Ok(())
            }
            (t, status) => Err(RoomError::Rejected(format!(
                "cannot {:?} while room is {:?}",
                t, status
            ))),
        }
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            code: self.code.clone(),
            status: self.status,
            round: self.round,
            host_id: self.host_id.clone(),
            created_at: self.created_at,
            participants: self
                .participants
                .iter()
                .map(|p| ParticipantSnapshot {
                    key: p.score_key().to_string(),
                    display_name: p.display_name.clone(),
                    kind: p.kind,
                    scores: p.scores.clone(),
                    total: p.total,
                    connected: p.is_connected(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::ParticipantKind;

    fn room_with_host() -> Room {
        let mut room = Room::new("AB2X".into(), "host".into());
        room.participants.push(Participant::human(
            "Host".into(),
            "host".into(),
            Uuid::new_v4(),
        ));
        room
    }

    #[test]
    fn test_new_room_defaults() {
        let room = Room::new("AB2X".into(), "host".into());
        assert_eq!(room.status, RoomStatus::Lobby);
        assert_eq!(room.round, 1);
        assert!(room.participants.is_empty());
    }

    #[test]
    fn test_start_requires_host() {
        let mut room = room_with_host();
        assert!(matches!(
            room.apply_transition(Transition::Start, "not_host"),
            Err(RoomError::Unauthorized)
        ));
        assert_eq!(room.status, RoomStatus::Lobby);

        room.apply_transition(Transition::Start, "host").unwrap();
        assert_eq!(room.status, RoomStatus::Playing);
    }

    #[test]
    fn test_finish_only_from_playing() {
        let mut room = room_with_host();
        assert!(matches!(
            room.apply_transition(Transition::Finish, "host"),
            Err(RoomError::Rejected(_))
        ));
        room.apply_transition(Transition::Start, "host").unwrap();
        room.apply_transition(Transition::Finish, "host").unwrap();
        assert_eq!(room.status, RoomStatus::Finished);
    }

    #[test]
    fn test_start_twice_rejected() {
        let mut room = room_with_host();
        room.apply_transition(Transition::Start, "host").unwrap();
        assert!(matches!(
            room.apply_transition(Transition::Start, "host"),
            Err(RoomError::Rejected(_))
        ));
        assert_eq!(room.status, RoomStatus::Playing);
    }

    #[test]
    fn test_restart_resets_scores_preserves_seats() {
        let mut room = room_with_host();
        room.participants.push(Participant::spectator(
            "Late".into(),
            "user_late".into(),
            Uuid::new_v4(),
        ));
        room.participants
            .push(Participant::placeholder("Opa".into(), "slot_1".into()));
        room.apply_transition(Transition::Start, "host").unwrap();

        room.participants[0].scores = vec![5, 3];
        room.participants[0].total = 8;
        room.round = 3;
        room.apply_transition(Transition::Finish, "host").unwrap();

        room.apply_transition(Transition::Restart, "host").unwrap();
        assert_eq!(room.status, RoomStatus::Playing);
        assert_eq!(room.round, 1);
        for p in &room.participants {
            assert!(p.scores.is_empty());
            assert_eq!(p.total, 0);
        }
        // Seats keep their identity and kind.
        assert_eq!(room.participants[1].kind, ParticipantKind::Spectator);
        assert_eq!(room.participants[2].kind, ParticipantKind::Placeholder);
        assert_eq!(room.participants[2].slot_key.as_deref(), Some("slot_1"));
    }

    #[test]
    fn test_restart_from_lobby_rejected() {
        let mut room = room_with_host();
        assert!(matches!(
            room.apply_transition(Transition::Restart, "host"),
            Err(RoomError::Rejected(_))
        ));
    }

    #[test]
    fn test_durable_id_for_connection() {
        let conn = Uuid::new_v4();
        let mut room = Room::new("AB2X".into(), "host".into());
        room.participants
            .push(Participant::human("Host".into(), "host".into(), conn));
        assert_eq!(room.durable_id_for_connection(conn), Some("host"));
        assert_eq!(room.durable_id_for_connection(Uuid::new_v4()), None);
    }

    #[test]
    fn test_snapshot_carries_full_roster() {
        let mut room = room_with_host();
        room.participants
            .push(Participant::placeholder("Opa".into(), "slot_1".into()));
        let snap = room.snapshot();
        assert_eq!(snap.code, "AB2X");
        assert_eq!(snap.participants.len(), 2);
        assert_eq!(snap.participants[1].key, "slot_1");
        assert!(!snap.participants[1].connected);
    }
}
