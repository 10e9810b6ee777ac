//! Reconciles an inbound request's durable identity against a room's
//! roster: reconnects, fresh joins, spectator admission, and the
//! placeholder add/claim flow.

use uuid::Uuid;

use crate::participant::{Participant, ParticipantKind};
use crate::room::{Room, RoomError, RoomStatus};

/// What `join` did, so the caller knows whether to answer point-to-point
/// (reconnect) or fan out the new roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Known durable id; connection rebound, roster unchanged.
    Reconnected,
    /// New durable id while the room was in Lobby.
    Joined,
    /// New durable id after play started; seat is view-only.
    JoinedAsSpectator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    Claimed,
    NotFound,
    AlreadyClaimed,
    NotAPlaceholder,
}

/// Join or rejoin a room. Keyed exclusively on the durable id: the same
/// id never produces a second seat, no matter how often it arrives.
pub fn join(
    room: &mut Room,
    display_name: String,
    durable_id: String,
    connection_id: Uuid,
) -> JoinOutcome {
    if let Some(existing) = room.find_by_durable_id_mut(&durable_id) {
        existing.connection_id = Some(connection_id);
        return JoinOutcome::Reconnected;
    }

    if room.status == RoomStatus::Lobby {
        room.participants
            .push(Participant::human(display_name, durable_id, connection_id));
        JoinOutcome::Joined
    } else {
        room.participants.push(Participant::spectator(
            display_name,
            durable_id,
            connection_id,
        ));
        JoinOutcome::JoinedAsSpectator
    }
}

/// Add an offline seat that a device can claim later. Lobby-only.
pub fn add_placeholder(room: &mut Room, display_name: String) -> Result<&Participant, RoomError> {
    if room.status != RoomStatus::Lobby {
        return Err(RoomError::Rejected(
            "placeholders can only be added in the lobby".into(),
        ));
    }
    let slot_key = format!("slot_{}", Uuid::new_v4().simple());
    room.participants
        .push(Participant::placeholder(display_name, slot_key));
    Ok(room.participants.last().unwrap())
}

/// Bind a durable identity to an unclaimed placeholder. Every non-success
/// outcome leaves the room untouched.
pub fn claim_placeholder(
    room: &mut Room,
    slot_key: &str,
    durable_id: String,
    connection_id: Uuid,
) -> ClaimOutcome {
    let Some(seat) = room.find_by_slot_key_mut(slot_key) else {
        return ClaimOutcome::NotFound;
    };
    if seat.durable_id.is_some() {
        return ClaimOutcome::AlreadyClaimed;
    }
    if seat.kind != ParticipantKind::Placeholder {
        return ClaimOutcome::NotAPlaceholder;
    }

    seat.durable_id = Some(durable_id);
    seat.connection_id = Some(connection_id);
    seat.kind = ParticipantKind::Human;
    ClaimOutcome::Claimed
}

/// Placeholders that are still open to claim, for the pre-join room
/// probe. Exposes nothing about other participants.
pub fn claimable_placeholders(room: &Room) -> Vec<&Participant> {
    room.participants
        .iter()
        .filter(|p| p.kind == ParticipantKind::Placeholder && p.durable_id.is_none())
        .collect()
}

/// Drop the connection binding when a transport goes away. The seat
/// itself stays; a later `join` with the same durable id rebinds it.
pub fn mark_disconnected(room: &mut Room, connection_id: Uuid) -> bool {
    for p in &mut room.participants {
        if p.connection_id == Some(connection_id) {
            p.connection_id = None;
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::Transition;

    fn lobby_room() -> Room {
        Room::new("AB2X".into(), "host".into())
    }

    #[test]
    fn test_join_appends_human_in_lobby() {
        let mut room = lobby_room();
        let outcome = join(&mut room, "Anna".into(), "user_a".into(), Uuid::new_v4());
        assert_eq!(outcome, JoinOutcome::Joined);
        assert_eq!(room.participants.len(), 1);
        assert_eq!(room.participants[0].kind, ParticipantKind::Human);
    }

    #[test]
    fn test_rejoin_is_idempotent() {
        let mut room = lobby_room();
        let first_conn = Uuid::new_v4();
        join(&mut room, "Anna".into(), "user_a".into(), first_conn);

        let second_conn = Uuid::new_v4();
        for _ in 0..3 {
            let outcome = join(&mut room, "Anna".into(), "user_a".into(), second_conn);
            assert_eq!(outcome, JoinOutcome::Reconnected);
        }

        assert_eq!(room.participants.len(), 1);
        assert_eq!(room.participants[0].connection_id, Some(second_conn));
    }

    #[test]
    fn test_rejoin_preserves_scores_and_kind() {
        let mut room = lobby_room();
        join(&mut room, "Anna".into(), "user_a".into(), Uuid::new_v4());
        room.participants[0].scores = vec![4, 2];
        room.participants[0].total = 6;

        join(&mut room, "Anna".into(), "user_a".into(), Uuid::new_v4());
        assert_eq!(room.participants[0].scores, vec![4, 2]);
        assert_eq!(room.participants[0].total, 6);
        assert_eq!(room.participants[0].kind, ParticipantKind::Human);
    }

    #[test]
    fn test_late_joiner_becomes_spectator() {
        let mut room = lobby_room();
        join(&mut room, "Host".into(), "host".into(), Uuid::new_v4());
        room.apply_transition(Transition::Start, "host").unwrap();

        let outcome = join(&mut room, "Late".into(), "user_l".into(), Uuid::new_v4());
        assert_eq!(outcome, JoinOutcome::JoinedAsSpectator);
        assert_eq!(room.participants[1].kind, ParticipantKind::Spectator);
    }

    #[test]
    fn test_spectator_rejoin_stays_spectator() {
        let mut room = lobby_room();
        join(&mut room, "Host".into(), "host".into(), Uuid::new_v4());
        room.apply_transition(Transition::Start, "host").unwrap();
        join(&mut room, "Late".into(), "user_l".into(), Uuid::new_v4());

        let outcome = join(&mut room, "Late".into(), "user_l".into(), Uuid::new_v4());
        assert_eq!(outcome, JoinOutcome::Reconnected);
        assert_eq!(room.participants.len(), 2);
        assert_eq!(room.participants[1].kind, ParticipantKind::Spectator);
    }

    #[test]
    fn test_add_placeholder_in_lobby() {
        let mut room = lobby_room();
        let slot_key = {
            let seat = add_placeholder(&mut room, "Opa".into()).unwrap();
            assert_eq!(seat.kind, ParticipantKind::Placeholder);
            seat.slot_key.clone().unwrap()
        };
        assert!(slot_key.starts_with("slot_"));
        assert_eq!(claimable_placeholders(&room).len(), 1);
    }

    #[test]
    fn test_add_placeholder_rejected_while_playing() {
        let mut room = lobby_room();
        join(&mut room, "Host".into(), "host".into(), Uuid::new_v4());
        room.apply_transition(Transition::Start, "host").unwrap();
        assert!(matches!(
            add_placeholder(&mut room, "Opa".into()),
            Err(RoomError::Rejected(_))
        ));
        assert_eq!(room.participants.len(), 1);
    }

    #[test]
    fn test_claim_placeholder_success() {
        let mut room = lobby_room();
        let slot_key = add_placeholder(&mut room, "Opa".into())
            .unwrap()
            .slot_key
            .clone()
            .unwrap();

        let conn = Uuid::new_v4();
        let outcome = claim_placeholder(&mut room, &slot_key, "user_o".into(), conn);
        assert_eq!(outcome, ClaimOutcome::Claimed);

        let seat = &room.participants[0];
        assert_eq!(seat.kind, ParticipantKind::Human);
        assert_eq!(seat.durable_id.as_deref(), Some("user_o"));
        assert_eq!(seat.connection_id, Some(conn));
        assert!(claimable_placeholders(&room).is_empty());
    }

    #[test]
    fn test_claim_unknown_slot_is_noop() {
        let mut room = lobby_room();
        add_placeholder(&mut room, "Opa".into()).unwrap();
        let before = format!("{:?}", room.participants);

        let outcome = claim_placeholder(&mut room, "slot_missing", "u".into(), Uuid::new_v4());
        assert_eq!(outcome, ClaimOutcome::NotFound);
        assert_eq!(format!("{:?}", room.participants), before);
    }

    #[test]
    fn test_double_claim_is_noop() {
        let mut room = lobby_room();
        let slot_key = add_placeholder(&mut room, "Opa".into())
            .unwrap()
            .slot_key
            .clone()
            .unwrap();
        claim_placeholder(&mut room, &slot_key, "user_o".into(), Uuid::new_v4());
        let before = format!("{:?}", room.participants);

        let outcome = claim_placeholder(&mut room, &slot_key, "user_x".into(), Uuid::new_v4());
        assert_eq!(outcome, ClaimOutcome::AlreadyClaimed);
        assert_eq!(format!("{:?}", room.participants), before);
    }

    #[test]
    fn test_mark_disconnected() {
        let mut room = lobby_room();
        let conn = Uuid::new_v4();
        join(&mut room, "Anna".into(), "user_a".into(), conn);

        assert!(mark_disconnected(&mut room, conn));
        assert!(room.participants[0].connection_id.is_none());
        assert!(!mark_disconnected(&mut room, conn));
        // Seat survives the disconnect.
        assert_eq!(room.participants.len(), 1);
    }
}
