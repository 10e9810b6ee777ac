use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantKind {
    Human,
    Placeholder,
    Spectator,
}

/// One seat in a room. Never removed once created; only mutated
/// (connection rebind, placeholder claim, score reset).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    /// Current transport connection, rebound on every reconnect.
    /// `None` for unclaimed placeholders and disconnected participants.
    pub connection_id: Option<Uuid>,
    /// Client-supplied identity, stable across reloads. `None` only
    /// while the participant is an unclaimed placeholder.
    pub durable_id: Option<String>,
    /// Lookup token for seats created as placeholders; kept after the
    /// seat is claimed so old claim links stay resolvable.
    pub slot_key: Option<String>,
    pub display_name: String,
    pub scores: Vec<i32>,
    pub total: i32,
    pub kind: ParticipantKind,
}

impl Participant {
    pub fn human(display_name: String, durable_id: String, connection_id: Uuid) -> Self {
        Self {
            connection_id: Some(connection_id),
            durable_id: Some(durable_id),
            slot_key: None,
            display_name,
            scores: Vec::new(),
            total: 0,
            kind: ParticipantKind::Human,
        }
    }

    pub fn spectator(display_name: String, durable_id: String, connection_id: Uuid) -> Self {
        Self {
            kind: ParticipantKind::Spectator,
            ..Self::human(display_name, durable_id, connection_id)
        }
    }

    pub fn placeholder(display_name: String, slot_key: String) -> Self {
        Self {
            connection_id: None,
            durable_id: None,
            slot_key: Some(slot_key),
            display_name,
            scores: Vec::new(),
            total: 0,
            kind: ParticipantKind::Placeholder,
        }
    }

    /// Stable key this seat is addressed by in round submissions and
    /// snapshots: the durable id once one is bound, the slot key before.
    pub fn score_key(&self) -> &str {
        self.durable_id
            .as_deref()
            .or(self.slot_key.as_deref())
            .unwrap_or(&self.display_name)
    }

    /// Spectators are excluded from round validation and mutation.
    pub fn is_active(&self) -> bool {
        self.kind != ParticipantKind::Spectator
    }

    pub fn is_connected(&self) -> bool {
        self.connection_id.is_some()
    }

    pub fn reset_scores(&mut self) {
        self.scores.clear();
        self.total = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_starts_with_empty_scores() {
        let p = Participant::human("Anna".into(), "user_1".into(), Uuid::new_v4());
        assert!(p.scores.is_empty());
        assert_eq!(p.total, 0);
        assert_eq!(p.kind, ParticipantKind::Human);
        assert!(p.is_active());
        assert!(p.is_connected());
    }

    #[test]
    fn test_placeholder_has_no_identity() {
        let p = Participant::placeholder("Opa".into(), "slot_abc".into());
        assert!(p.durable_id.is_none());
        assert!(p.connection_id.is_none());
        assert_eq!(p.score_key(), "slot_abc");
        assert!(p.is_active());
        assert!(!p.is_connected());
    }

    #[test]
    fn test_score_key_prefers_durable_id() {
        let mut p = Participant::placeholder("Opa".into(), "slot_abc".into());
        p.durable_id = Some("user_9".into());
        assert_eq!(p.score_key(), "user_9");
    }

    #[test]
    fn test_spectator_is_not_active() {
        let p = Participant::spectator("Late".into(), "user_2".into(), Uuid::new_v4());
        assert!(!p.is_active());
    }

    #[test]
    fn test_reset_scores() {
        let mut p = Participant::human("Anna".into(), "user_1".into(), Uuid::new_v4());
        p.scores = vec![5, 3];
        p.total = 8;
        p.reset_scores();
        assert!(p.scores.is_empty());
        assert_eq!(p.total, 0);
    }
}
