//! Round submission: permissive coercion of raw client values, the golf
//! legality rule, and all-or-nothing application to the roster.

use std::collections::HashMap;

use serde_json::Value;

use crate::room::{Room, RoomError, RoomStatus};

/// Coerce one raw submitted value to a score. Total order of cases:
/// absent -> 0, null -> 0, blank string -> 0, numeric string -> parsed,
/// JSON number -> integer part, anything else -> 0. Never rejects on
/// type; legality is judged afterwards on the coerced values.
pub fn coerce_score(raw: Option<&Value>) -> i32 {
    match raw {
        None | Some(Value::Null) => 0,
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                0
            } else {
                s.parse::<i32>().unwrap_or(0)
            }
        }
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .map(|v| v as i32)
            .unwrap_or(0),
        Some(_) => 0,
    }
}

/// Validate and apply one round of scores, keyed by each active
/// participant's stable score key. Golf rule: at most one active
/// participant may record a zero. On any failure nothing is mutated.
pub fn submit_round(
    room: &mut Room,
    raw_scores: &HashMap<String, Value>,
    caller_durable_id: &str,
) -> Result<(), RoomError> {
    if !room.is_host(caller_durable_id) {
        return Err(RoomError::Unauthorized);
    }
    if room.status != RoomStatus::Playing {
        return Err(RoomError::Rejected(
            "rounds can only be submitted while the game is running".into(),
        ));
    }

    // Resolve every active seat's value up front so application is a
    // pure append pass once the round is known to be legal.
    let resolved: Vec<i32> = room
        .active_participants()
        .map(|p| coerce_score(raw_scores.get(p.score_key())))
        .collect();

    let zero_count = resolved.iter().filter(|&&s| s == 0).count();
    if zero_count > 1 {
        return Err(RoomError::Validation(
            "golf rule: at most one zero (or empty) score per round".into(),
        ));
    }

    let mut scores = resolved.into_iter();
    for p in room.participants.iter_mut().filter(|p| p.is_active()) {
        let score = scores.next().unwrap_or(0);
        p.scores.push(score);
        p.total += score;
    }
    room.round += 1;
    Ok(())
}
