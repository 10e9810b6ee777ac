use std::collections::HashMap;
use std::time::{Duration, Instant};

use rand::Rng;

use golftab_common::code::{generate_code, normalize_code};
use golftab_common::room::Room;

struct RoomEntry {
    room: Room,
    last_activity: Instant,
}

/// Owns every live room, keyed by its join code. Rooms are created here
/// and only ever removed by the idle sweep.
pub struct RoomRegistry {
    rooms: HashMap<String, RoomEntry>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: HashMap::new(),
        }
    }

    /// Create a room for the given host identity, drawing codes until one
    /// does not collide with a live room.
    pub fn create(&mut self, host_durable_id: String, rng: &mut impl Rng) -> &mut Room {
        let code = loop {
            let candidate = generate_code(rng);
            if !self.rooms.contains_key(&candidate) {
                break candidate;
            }
        };
        let room = Room::new(code.clone(), host_durable_id);
        self.rooms.insert(
            code.clone(),
            RoomEntry {
                room,
                last_activity: Instant::now(),
            },
        );
        &mut self.rooms.get_mut(&code).unwrap().room
    }

    pub fn get(&self, code: &str) -> Option<&Room> {
        self.rooms.get(&normalize_code(code)).map(|e| &e.room)
    }

    /// Mutable lookup; counts as activity for the idle sweep.
    pub fn get_mut(&mut self, code: &str) -> Option<&mut Room> {
        let entry = self.rooms.get_mut(&normalize_code(code))?;
        entry.last_activity = Instant::now();
        Some(&mut entry.room)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Drop rooms that saw no activity for longer than `max_idle`.
    /// Returns how many were evicted.
    pub fn cleanup_idle(&mut self, max_idle: Duration) -> usize {
        let before = self.rooms.len();
        let now = Instant::now();
        self.rooms
            .retain(|_, entry| now.duration_since(entry.last_activity) < max_idle);
        before - self.rooms.len()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
