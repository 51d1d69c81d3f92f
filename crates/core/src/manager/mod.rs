//! Room lifecycle and membership coordination
//!
//! [`RoomManager`] is the single entry point mutating room state. Every
//! operation runs against the database in one transaction, so a crash
//! mid-operation leaves the prior state untouched. Session flow lives
//! in [`session`], chat in [`chat`].

mod chat;
mod session;

use std::path::Path;

use rand::Rng;
use serde_json::{Map, Value};
use tracing::{info, instrument, warn};

use crate::error::{Error, Result};
use crate::events::{EventBus, RoomEvent};
use crate::models::{
    Message, Participant, ParticipantStatus, Room, RoomStatus, RoomSummary, RoomType,
};
use crate::storage::Database;
use crate::templates::seeded_settings;

/// Room codes are sampled from this alphabet
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CODE_LEN: usize = 6;

/// Rooms idle longer than this are swept on startup
const IDLE_EXPIRY_HOURS: i64 = 24;

/// Allowed room capacity range
pub const MIN_PARTICIPANTS: usize = 2;
pub const MAX_PARTICIPANTS: usize = 6;

pub struct RoomManager {
    db: Database,
    events: EventBus,
}

impl RoomManager {
    /// Wrap an open database, sweeping expired rooms first
    pub fn new(db: Database) -> Result<Self> {
        let manager = Self {
            db,
            events: EventBus::new(),
        };
        manager.sweep_idle_rooms()?;
        Ok(manager)
    }

    /// Open or create the database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(Database::open(path)?)
    }

    /// In-memory manager (for testing)
    pub fn open_in_memory() -> Result<Self> {
        Self::new(Database::open_in_memory()?)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Delete rooms whose last activity is older than the idle cutoff
    #[instrument(skip(self))]
    fn sweep_idle_rooms(&self) -> Result<usize> {
        let cutoff = chrono::Utc::now() - chrono::Duration::hours(IDLE_EXPIRY_HOURS);
        let stale = self.db.rooms().idle_since(cutoff)?;
        let count = stale.len();

        for room_id in stale {
            self.db.rooms().delete(&room_id)?;
            self.events.publish(&room_id, RoomEvent::RoomClosed);
            self.events.remove(&room_id);
        }
        if count > 0 {
            warn!(count, "swept idle rooms");
        }
        Ok(count)
    }

    fn generate_room_code(&self) -> Result<String> {
        let mut rng = rand::thread_rng();
        loop {
            let code: String = (0..CODE_LEN)
                .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
                .collect();
            if !self.db.rooms().exists(&code)? {
                return Ok(code);
            }
        }
    }

    /// Create a room with the caller as host and sole member
    #[instrument(skip(self, settings), fields(host_id, room_name))]
    pub fn create_room(
        &self,
        host_id: &str,
        host_name: &str,
        room_name: &str,
        room_type: RoomType,
        max_participants: usize,
        settings: Option<Map<String, Value>>,
    ) -> Result<Room> {
        if !(MIN_PARTICIPANTS..=MAX_PARTICIPANTS).contains(&max_participants) {
            return Err(Error::InvalidOperation(format!(
                "max_participants must be between {MIN_PARTICIPANTS} and {MAX_PARTICIPANTS}, got {max_participants}"
            )));
        }

        let room = Room::new(
            self.generate_room_code()?,
            room_name.to_string(),
            host_id.to_string(),
            room_type,
            max_participants,
            seeded_settings(room_type, settings),
        );

        let tx = self.db.transaction()?;
        crate::storage::RoomStore::new(&tx).create(&room)?;
        crate::storage::ParticipantStore::new(&tx)
            .add(&room.room_id, &Participant::new(host_id, host_name).ready())?;
        crate::storage::MessageStore::new(&tx).append(&Message::system(
            &room.room_id,
            format!("{host_name} created the room"),
        ))?;
        tx.commit()?;

        info!(room_id = %room.room_id, "room created");
        Ok(room)
    }

    pub fn get_room(&self, room_id: &str) -> Result<Option<Room>> {
        self.db.rooms().find_by_id(room_id)
    }

    fn require_room(&self, room_id: &str) -> Result<Room> {
        self.get_room(room_id)?
            .ok_or_else(|| Error::room_not_found(room_id))
    }

    fn require_member(&self, room_id: &str, user_id: &str) -> Result<Participant> {
        self.db
            .participants()
            .find(room_id, user_id)?
            .ok_or_else(|| Error::not_a_member(user_id))
    }

    fn require_host(&self, room: &Room, user_id: &str) -> Result<()> {
        if room.host_id != user_id {
            return Err(Error::PermissionDenied(format!(
                "only the host may do this, {user_id} is not the host"
            )));
        }
        Ok(())
    }

    fn touch(&self, room: &mut Room) {
        room.last_activity = chrono::Utc::now();
    }

    /// Waiting rooms that can still be joined
    pub fn list_available_rooms(&self) -> Result<Vec<RoomSummary>> {
        let rooms = self.db.rooms().list_waiting()?;
        let mut summaries = Vec::with_capacity(rooms.len());
        for room in rooms {
            let count = self.db.participants().count(&room.room_id)?;
            if count < room.max_participants {
                summaries.push(RoomSummary::of(&room, count));
            }
        }
        Ok(summaries)
    }

    /// Join a waiting room. Joining a room you are already in is a
    /// no-op, not an error.
    #[instrument(skip(self))]
    pub fn join_room(&self, room_id: &str, user_id: &str, user_name: &str) -> Result<Room> {
        let mut room = self.require_room(room_id)?;

        if self.db.participants().find(room_id, user_id)?.is_some() {
            return Ok(room);
        }
        if room.status != RoomStatus::Waiting {
            return Err(Error::InvalidOperation(
                "cannot join a session already in progress".into(),
            ));
        }
        if self.db.participants().count(room_id)? >= room.max_participants {
            return Err(Error::InvalidOperation("room is full".into()));
        }

        self.touch(&mut room);
        let tx = self.db.transaction()?;
        crate::storage::ParticipantStore::new(&tx)
            .add(room_id, &Participant::new(user_id, user_name))?;
        crate::storage::MessageStore::new(&tx)
            .append(&Message::system(room_id, format!("{user_name} joined")))?;
        crate::storage::RoomStore::new(&tx).update(&room)?;
        tx.commit()?;

        self.events.publish(
            room_id,
            RoomEvent::ParticipantJoined {
                user_id: user_id.to_string(),
            },
        );
        Ok(room)
    }

    /// Leave a room. Departing hosts hand off to the longest-standing
    /// remaining member; the last member out deletes the room. Returns
    /// false when the room or membership does not exist.
    #[instrument(skip(self))]
    pub fn leave_room(&self, room_id: &str, user_id: &str) -> Result<bool> {
        let Some(mut room) = self.get_room(room_id)? else {
            return Ok(false);
        };
        let Some(leaver) = self.db.participants().find(room_id, user_id)? else {
            return Ok(false);
        };

        let tx = self.db.transaction()?;
        let participants = crate::storage::ParticipantStore::new(&tx);
        let rooms = crate::storage::RoomStore::new(&tx);

        participants.remove(room_id, user_id)?;
        let remaining = participants.list_for_room(room_id)?;

        if remaining.is_empty() {
            rooms.delete(room_id)?;
            tx.commit()?;
            self.events.publish(room_id, RoomEvent::RoomClosed);
            self.events.remove(room_id);
            info!(room_id, "room deleted after last member left");
            return Ok(true);
        }

        let mut host_changed = None;
        if room.host_id == user_id {
            room.host_id = remaining[0].user_id.clone();
            host_changed = Some(room.host_id.clone());
        }

        // A departing current speaker must not stall the session
        let speaker_moved = if room.state.current_speaker_id.as_deref() == Some(user_id) {
            Some(Self::advance_speaker(&mut room, &participants, &remaining)?)
        } else {
            None
        };

        self.touch(&mut room);
        rooms.update(&room)?;
        crate::storage::MessageStore::new(&tx)
            .append(&Message::system(room_id, format!("{} left", leaver.user_name)))?;
        tx.commit()?;

        self.events.publish(
            room_id,
            RoomEvent::ParticipantLeft {
                user_id: user_id.to_string(),
            },
        );
        if let Some(new_host_id) = host_changed {
            self.events
                .publish(room_id, RoomEvent::HostChanged { new_host_id });
        }
        if let Some(new_speaker) = speaker_moved {
            self.events.publish(
                room_id,
                RoomEvent::SpeakerChanged {
                    user_id: new_speaker,
                    round_number: room.state.round_number,
                },
            );
        }
        Ok(true)
    }

    /// Remove another member from the room. Host only; the host cannot
    /// kick themselves (they leave instead).
    #[instrument(skip(self))]
    pub fn kick_participant(&self, room_id: &str, host_id: &str, target_id: &str) -> Result<()> {
        let mut room = self.require_room(room_id)?;
        self.require_host(&room, host_id)?;
        if host_id == target_id {
            return Err(Error::InvalidOperation(
                "the host cannot kick themselves".into(),
            ));
        }
        let target = self.require_member(room_id, target_id)?;

        let tx = self.db.transaction()?;
        let participants = crate::storage::ParticipantStore::new(&tx);
        participants.remove(room_id, target_id)?;
        let remaining = participants.list_for_room(room_id)?;

        let speaker_moved = if room.state.current_speaker_id.as_deref() == Some(target_id) {
            Some(Self::advance_speaker(&mut room, &participants, &remaining)?)
        } else {
            None
        };

        self.touch(&mut room);
        crate::storage::RoomStore::new(&tx).update(&room)?;
        crate::storage::MessageStore::new(&tx).append(&Message::system(
            room_id,
            format!("{} was removed from the room", target.user_name),
        ))?;
        tx.commit()?;

        self.events.publish(
            room_id,
            RoomEvent::ParticipantKicked {
                user_id: target_id.to_string(),
            },
        );
        if let Some(new_speaker) = speaker_moved {
            self.events.publish(
                room_id,
                RoomEvent::SpeakerChanged {
                    user_id: new_speaker,
                    round_number: room.state.round_number,
                },
            );
        }
        Ok(())
    }

    /// Delete a room outright. Host only.
    #[instrument(skip(self))]
    pub fn delete_room(&self, room_id: &str, host_id: &str) -> Result<()> {
        let room = self.require_room(room_id)?;
        self.require_host(&room, host_id)?;

        self.db.rooms().delete(room_id)?;
        self.events.publish(room_id, RoomEvent::RoomClosed);
        self.events.remove(room_id);
        Ok(())
    }

    pub fn get_participants(&self, room_id: &str) -> Result<Vec<Participant>> {
        self.require_room(room_id)?;
        self.db.participants().list_for_room(room_id)
    }

    /// Set one member's ready/answering/waiting status
    pub fn update_participant_status(
        &self,
        room_id: &str,
        user_id: &str,
        status: ParticipantStatus,
    ) -> Result<()> {
        let mut room = self.require_room(room_id)?;
        if !self.db.participants().set_status(room_id, user_id, status)? {
            return Err(Error::not_a_member(user_id));
        }
        self.touch(&mut room);
        self.db.rooms().update(&room)?;
        Ok(())
    }

    /// Merge settings overrides into the room's settings map. Host only.
    #[instrument(skip(self, overrides))]
    pub fn update_room_settings(
        &self,
        room_id: &str,
        host_id: &str,
        overrides: Map<String, Value>,
    ) -> Result<Room> {
        let mut room = self.require_room(room_id)?;
        self.require_host(&room, host_id)?;

        for (key, value) in overrides {
            room.settings.insert(key, value);
        }
        self.touch(&mut room);
        self.db.rooms().update(&room)?;
        Ok(room)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manager() -> RoomManager {
        RoomManager::open_in_memory().unwrap()
    }

    fn create(mgr: &RoomManager, host: &str) -> Room {
        mgr.create_room(host, host, "Practice", RoomType::GroupInterview, 4, None)
            .unwrap()
    }

    #[test]
    fn room_codes_are_unique_six_char_alphanumerics() {
        let mgr = manager();
        let mut seen = std::collections::HashSet::new();

        for i in 0..20 {
            let room = create(&mgr, &format!("host{i}"));
            assert_eq!(room.room_id.len(), CODE_LEN);
            assert!(room
                .room_id
                .bytes()
                .all(|b| CODE_ALPHABET.contains(&b)));
            assert!(seen.insert(room.room_id));
        }
    }

    #[test]
    fn create_room_seats_host_as_ready_member() {
        let mgr = manager();
        let room = create(&mgr, "h1");

        assert_eq!(room.status, RoomStatus::Waiting);
        let members = mgr.get_participants(&room.room_id).unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].user_id, "h1");
        assert_eq!(members[0].status, ParticipantStatus::Ready);
    }

    #[test]
    fn capacity_bounds_are_enforced_at_creation() {
        let mgr = manager();
        for bad in [0, 1, 7] {
            assert!(mgr
                .create_room("h1", "Host", "Bad", RoomType::Debate, bad, None)
                .is_err());
        }
    }

    #[test]
    fn join_is_idempotent_and_capacity_bounded() {
        let mgr = manager();
        let room = mgr
            .create_room("h1", "Host", "Tiny", RoomType::GroupInterview, 2, None)
            .unwrap();

        mgr.join_room(&room.room_id, "u2", "User2").unwrap();
        mgr.join_room(&room.room_id, "u2", "User2").unwrap();
        assert_eq!(mgr.get_participants(&room.room_id).unwrap().len(), 2);

        assert!(matches!(
            mgr.join_room(&room.room_id, "u3", "User3"),
            Err(Error::InvalidOperation(_))
        ));
        assert_eq!(mgr.get_participants(&room.room_id).unwrap().len(), 2);
    }

    #[test]
    fn join_rejected_once_session_started() {
        let mgr = manager();
        let room = create(&mgr, "h1");
        mgr.join_room(&room.room_id, "u2", "User2").unwrap();
        mgr.start_session(&room.room_id, "h1").unwrap();

        assert!(mgr.join_room(&room.room_id, "u3", "User3").is_err());
        // Existing members can still "join" as a no-op
        mgr.join_room(&room.room_id, "u2", "User2").unwrap();
    }

    #[test]
    fn host_departure_promotes_oldest_member() {
        let mgr = manager();
        let room = create(&mgr, "h1");
        mgr.join_room(&room.room_id, "u2", "User2").unwrap();
        mgr.join_room(&room.room_id, "u3", "User3").unwrap();

        assert!(mgr.leave_room(&room.room_id, "h1").unwrap());
        let room = mgr.get_room(&room.room_id).unwrap().unwrap();
        assert_eq!(room.host_id, "u2");
    }

    #[test]
    fn last_member_out_deletes_the_room() {
        let mgr = manager();
        let room = create(&mgr, "h1");
        mgr.join_room(&room.room_id, "u2", "User2").unwrap();

        assert!(mgr.leave_room(&room.room_id, "h1").unwrap());
        assert!(mgr.leave_room(&room.room_id, "u2").unwrap());
        assert!(mgr.get_room(&room.room_id).unwrap().is_none());
    }

    #[test]
    fn leave_returns_false_for_missing_room_or_member() {
        let mgr = manager();
        let room = create(&mgr, "h1");

        assert!(!mgr.leave_room("NOPE99", "h1").unwrap());
        assert!(!mgr.leave_room(&room.room_id, "stranger").unwrap());
    }

    #[test]
    fn kick_is_host_only_and_never_self() {
        let mgr = manager();
        let room = create(&mgr, "h1");
        mgr.join_room(&room.room_id, "u2", "User2").unwrap();

        assert!(matches!(
            mgr.kick_participant(&room.room_id, "u2", "h1"),
            Err(Error::PermissionDenied(_))
        ));
        assert!(matches!(
            mgr.kick_participant(&room.room_id, "h1", "h1"),
            Err(Error::InvalidOperation(_))
        ));

        mgr.kick_participant(&room.room_id, "h1", "u2").unwrap();
        assert_eq!(mgr.get_participants(&room.room_id).unwrap().len(), 1);
    }

    #[test]
    fn available_listing_hides_full_and_started_rooms() {
        let mgr = manager();
        let open = create(&mgr, "h1");
        let full = mgr
            .create_room("h2", "Host2", "Full", RoomType::GroupInterview, 2, None)
            .unwrap();
        mgr.join_room(&full.room_id, "u2", "User2").unwrap();
        let started = create(&mgr, "h3");
        mgr.join_room(&started.room_id, "u4", "User4").unwrap();
        mgr.start_session(&started.room_id, "h3").unwrap();

        let listed: Vec<_> = mgr
            .list_available_rooms()
            .unwrap()
            .into_iter()
            .map(|s| s.room_id)
            .collect();
        assert_eq!(listed, vec![open.room_id]);
    }

    #[test]
    fn settings_overrides_merge_and_are_host_only() {
        let mgr = manager();
        let room = create(&mgr, "h1");
        mgr.join_room(&room.room_id, "u2", "User2").unwrap();

        let mut overrides = Map::new();
        overrides.insert("time_limit_per_answer".into(), json!(90));
        let updated = mgr
            .update_room_settings(&room.room_id, "h1", overrides.clone())
            .unwrap();
        assert_eq!(updated.settings["time_limit_per_answer"], 90);
        assert_eq!(updated.settings["max_questions"], 5);

        assert!(matches!(
            mgr.update_room_settings(&room.room_id, "u2", overrides),
            Err(Error::PermissionDenied(_))
        ));
    }

    #[test]
    fn idle_rooms_are_swept_on_startup() {
        let db = Database::open_in_memory().unwrap();
        let mut stale = Room::new(
            "STALE1".to_string(),
            "Old".to_string(),
            "h1".to_string(),
            RoomType::GroupInterview,
            4,
            Map::new(),
        );
        stale.last_activity = chrono::Utc::now() - chrono::Duration::hours(IDLE_EXPIRY_HOURS + 1);
        db.rooms().create(&stale).unwrap();

        let mgr = RoomManager::new(db).unwrap();
        assert!(mgr.get_room("STALE1").unwrap().is_none());
    }

    #[test]
    fn membership_changes_are_published() {
        let mgr = manager();
        let room = create(&mgr, "h1");
        let mut rx = mgr.events().subscribe(&room.room_id);

        mgr.join_room(&room.room_id, "u2", "User2").unwrap();
        mgr.leave_room(&room.room_id, "u2").unwrap();

        assert!(matches!(
            rx.try_recv().unwrap(),
            RoomEvent::ParticipantJoined { .. }
        ));
        assert!(matches!(
            rx.try_recv().unwrap(),
            RoomEvent::ParticipantLeft { .. }
        ));
    }
}
