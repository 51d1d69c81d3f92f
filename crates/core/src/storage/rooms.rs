//! Room storage operations

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use tracing::instrument;

use super::parse::{parse_datetime, parse_enum, parse_json, OptionalExt};
use crate::error::Result;
use crate::models::{Room, RoomState, RoomStatus};

pub struct RoomStore<'a> {
    conn: &'a Connection,
}

impl<'a> RoomStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn map_room(row: &Row<'_>) -> rusqlite::Result<Room> {
        Ok(Room {
            room_id: row.get(0)?,
            room_name: row.get(1)?,
            host_id: row.get(2)?,
            room_type: parse_enum(&row.get::<_, String>(3)?)?,
            max_participants: row.get::<_, i64>(4)? as usize,
            status: parse_enum(&row.get::<_, String>(5)?)?,
            created_at: parse_datetime(&row.get::<_, String>(6)?)?,
            last_activity: parse_datetime(&row.get::<_, String>(7)?)?,
            settings: parse_json(&row.get::<_, String>(8)?)?,
            questions: parse_json(&row.get::<_, String>(9)?)?,
            state: RoomState {
                current_question_idx: row.get::<_, i64>(10)? as usize,
                current_speaker_id: row.get(11)?,
                turn_order: parse_json(&row.get::<_, String>(12)?)?,
                current_turn_idx: row.get::<_, i64>(13)? as usize,
                round_number: row.get::<_, i64>(14)? as u32,
                phase: parse_enum(&row.get::<_, String>(15)?)?,
            },
        })
    }

    const COLUMNS: &'static str = "room_id, room_name, host_id, room_type, max_participants, \
         status, created_at, last_activity, settings, questions, current_question_idx, \
         current_speaker_id, turn_order, current_turn_idx, round_number, phase";

    /// Create a new room row
    #[instrument(skip(self, room), fields(room_id = %room.room_id, room_name = %room.room_name))]
    pub fn create(&self, room: &Room) -> Result<()> {
        self.conn.execute(
            "INSERT INTO rooms (room_id, room_name, host_id, room_type, max_participants,
                 status, created_at, last_activity, settings, questions, current_question_idx,
                 current_speaker_id, turn_order, current_turn_idx, round_number, phase)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                room.room_id,
                room.room_name,
                room.host_id,
                room.room_type.as_str(),
                room.max_participants as i64,
                room.status.as_str(),
                room.created_at.to_rfc3339(),
                room.last_activity.to_rfc3339(),
                serde_json::to_string(&room.settings)?,
                serde_json::to_string(&room.questions)?,
                room.state.current_question_idx as i64,
                room.state.current_speaker_id,
                serde_json::to_string(&room.state.turn_order)?,
                room.state.current_turn_idx as i64,
                room.state.round_number as i64,
                room.state.phase.as_str(),
            ],
        )?;
        Ok(())
    }

    /// Find a room by its join code
    #[instrument(skip(self))]
    pub fn find_by_id(&self, room_id: &str) -> Result<Option<Room>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM rooms WHERE room_id = ?1",
            Self::COLUMNS
        ))?;

        let room = stmt
            .query_row(params![room_id], Self::map_room)
            .optional()?;

        Ok(room)
    }

    /// Write back every mutable room field
    #[instrument(skip(self, room), fields(room_id = %room.room_id))]
    pub fn update(&self, room: &Room) -> Result<()> {
        self.conn.execute(
            "UPDATE rooms SET room_name = ?1, host_id = ?2, max_participants = ?3,
                 status = ?4, last_activity = ?5, settings = ?6, questions = ?7,
                 current_question_idx = ?8, current_speaker_id = ?9, turn_order = ?10,
                 current_turn_idx = ?11, round_number = ?12, phase = ?13
             WHERE room_id = ?14",
            params![
                room.room_name,
                room.host_id,
                room.max_participants as i64,
                room.status.as_str(),
                room.last_activity.to_rfc3339(),
                serde_json::to_string(&room.settings)?,
                serde_json::to_string(&room.questions)?,
                room.state.current_question_idx as i64,
                room.state.current_speaker_id,
                serde_json::to_string(&room.state.turn_order)?,
                room.state.current_turn_idx as i64,
                room.state.round_number as i64,
                room.state.phase.as_str(),
                room.room_id,
            ],
        )?;
        Ok(())
    }

    /// Delete a room; participants, answers, messages and live scores
    /// cascade. Returns whether a row existed.
    #[instrument(skip(self))]
    pub fn delete(&self, room_id: &str) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM rooms WHERE room_id = ?1", params![room_id])?;
        Ok(affected > 0)
    }

    /// Check code existence (for rejection sampling)
    pub fn exists(&self, room_id: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM rooms WHERE room_id = ?1",
            params![room_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// List rooms still accepting members
    #[instrument(skip(self))]
    pub fn list_waiting(&self) -> Result<Vec<Room>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM rooms WHERE status = ?1 ORDER BY created_at",
            Self::COLUMNS
        ))?;

        let rooms = stmt
            .query_map(params![RoomStatus::Waiting.as_str()], Self::map_room)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rooms)
    }

    /// Room ids idle since before the cutoff
    pub fn idle_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT room_id FROM rooms WHERE last_activity < ?1")?;

        let ids = stmt
            .query_map(params![cutoff.to_rfc3339()], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RoomType;
    use crate::storage::Database;
    use crate::templates::settings_template;

    fn make_room(code: &str) -> Room {
        Room::new(
            code.to_string(),
            "Practice".to_string(),
            "host-1".to_string(),
            RoomType::GroupInterview,
            4,
            settings_template(RoomType::GroupInterview),
        )
    }

    #[test]
    fn create_and_find_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let room = make_room("AB12CD");
        db.rooms().create(&room).unwrap();

        let loaded = db.rooms().find_by_id("AB12CD").unwrap().unwrap();
        assert_eq!(loaded.room_name, "Practice");
        assert_eq!(loaded.room_type, RoomType::GroupInterview);
        assert_eq!(loaded.status, RoomStatus::Waiting);
        assert_eq!(loaded.settings["max_questions"], 5);
        assert!(loaded.state.turn_order.is_empty());
    }

    #[test]
    fn update_persists_state_columns() {
        let db = Database::open_in_memory().unwrap();
        let mut room = make_room("XY34ZW");
        db.rooms().create(&room).unwrap();

        room.status = RoomStatus::InProgress;
        room.state.turn_order = vec!["u1".into(), "u2".into()];
        room.state.current_speaker_id = Some("u1".into());
        room.state.round_number = 2;
        db.rooms().update(&room).unwrap();

        let loaded = db.rooms().find_by_id("XY34ZW").unwrap().unwrap();
        assert_eq!(loaded.status, RoomStatus::InProgress);
        assert_eq!(loaded.state.turn_order, vec!["u1", "u2"]);
        assert_eq!(loaded.state.round_number, 2);
    }

    #[test]
    fn delete_reports_existence() {
        let db = Database::open_in_memory().unwrap();
        db.rooms().create(&make_room("GONE01")).unwrap();

        assert!(db.rooms().delete("GONE01").unwrap());
        assert!(!db.rooms().delete("GONE01").unwrap());
        assert!(db.rooms().find_by_id("GONE01").unwrap().is_none());
    }

    #[test]
    fn idle_since_finds_stale_rooms() {
        let db = Database::open_in_memory().unwrap();
        let mut room = make_room("OLD001");
        room.last_activity = Utc::now() - chrono::Duration::hours(30);
        db.rooms().create(&room).unwrap();
        db.rooms().create(&make_room("NEW001")).unwrap();

        let cutoff = Utc::now() - chrono::Duration::hours(24);
        let stale = db.rooms().idle_since(cutoff).unwrap();
        assert_eq!(stale, vec!["OLD001".to_string()]);
    }
}
