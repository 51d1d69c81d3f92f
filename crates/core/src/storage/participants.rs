//! Participant storage operations

use rusqlite::{params, Connection, Row};
use tracing::instrument;

use super::parse::{parse_datetime, parse_enum, parse_enum_opt, OptionalExt};
use crate::error::Result;
use crate::models::{DebateSide, Participant, ParticipantStatus};

pub struct ParticipantStore<'a> {
    conn: &'a Connection,
}

impl<'a> ParticipantStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn map_participant(row: &Row<'_>) -> rusqlite::Result<Participant> {
        Ok(Participant {
            user_id: row.get(0)?,
            user_name: row.get(1)?,
            status: parse_enum(&row.get::<_, String>(2)?)?,
            joined_at: parse_datetime(&row.get::<_, String>(3)?)?,
            side: parse_enum_opt(row.get::<_, Option<String>>(4)?)?,
        })
    }

    /// Append a member at the end of the room's insertion order
    #[instrument(skip(self, participant), fields(user_id = %participant.user_id))]
    pub fn add(&self, room_id: &str, participant: &Participant) -> Result<()> {
        let position: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(position), -1) + 1 FROM participants WHERE room_id = ?1",
            params![room_id],
            |row| row.get(0),
        )?;

        self.conn.execute(
            "INSERT INTO participants (room_id, user_id, user_name, status, joined_at, side, position)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                room_id,
                participant.user_id,
                participant.user_name,
                participant.status.as_str(),
                participant.joined_at.to_rfc3339(),
                participant.side.map(|s| s.as_str()),
                position,
            ],
        )?;
        Ok(())
    }

    /// Members of a room in insertion order
    pub fn list_for_room(&self, room_id: &str) -> Result<Vec<Participant>> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, user_name, status, joined_at, side
             FROM participants WHERE room_id = ?1 ORDER BY position",
        )?;

        let participants = stmt
            .query_map(params![room_id], Self::map_participant)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(participants)
    }

    /// Look up one member
    pub fn find(&self, room_id: &str, user_id: &str) -> Result<Option<Participant>> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, user_name, status, joined_at, side
             FROM participants WHERE room_id = ?1 AND user_id = ?2",
        )?;

        let participant = stmt
            .query_row(params![room_id, user_id], Self::map_participant)
            .optional()?;

        Ok(participant)
    }

    pub fn count(&self, room_id: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM participants WHERE room_id = ?1",
            params![room_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Remove a member; returns whether they were present
    #[instrument(skip(self))]
    pub fn remove(&self, room_id: &str, user_id: &str) -> Result<bool> {
        let affected = self.conn.execute(
            "DELETE FROM participants WHERE room_id = ?1 AND user_id = ?2",
            params![room_id, user_id],
        )?;
        Ok(affected > 0)
    }

    /// Update one member's status
    pub fn set_status(&self, room_id: &str, user_id: &str, status: ParticipantStatus) -> Result<bool> {
        let affected = self.conn.execute(
            "UPDATE participants SET status = ?1 WHERE room_id = ?2 AND user_id = ?3",
            params![status.as_str(), room_id, user_id],
        )?;
        Ok(affected > 0)
    }

    /// Set every member of a room to the same status
    pub fn set_all_status(&self, room_id: &str, status: ParticipantStatus) -> Result<()> {
        self.conn.execute(
            "UPDATE participants SET status = ?1 WHERE room_id = ?2",
            params![status.as_str(), room_id],
        )?;
        Ok(())
    }

    /// Assign a debate side to a member
    pub fn set_side(&self, room_id: &str, user_id: &str, side: DebateSide) -> Result<bool> {
        let affected = self.conn.execute(
            "UPDATE participants SET side = ?1 WHERE room_id = ?2 AND user_id = ?3",
            params![side.as_str(), room_id, user_id],
        )?;
        Ok(affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Room, RoomType};
    use crate::storage::Database;

    fn seed_room(db: &Database, code: &str) {
        let room = Room::new(
            code.to_string(),
            "Room".to_string(),
            "h1".to_string(),
            RoomType::GroupInterview,
            4,
            serde_json::Map::new(),
        );
        db.rooms().create(&room).unwrap();
    }

    #[test]
    fn insertion_order_is_preserved() {
        let db = Database::open_in_memory().unwrap();
        seed_room(&db, "ROOM01");

        for name in ["alpha", "bravo", "charlie"] {
            db.participants()
                .add("ROOM01", &Participant::new(name, name))
                .unwrap();
        }

        let members = db.participants().list_for_room("ROOM01").unwrap();
        let ids: Vec<_> = members.iter().map(|p| p.user_id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "bravo", "charlie"]);
    }

    #[test]
    fn order_survives_removal_in_the_middle() {
        let db = Database::open_in_memory().unwrap();
        seed_room(&db, "ROOM02");

        for name in ["a", "b", "c"] {
            db.participants()
                .add("ROOM02", &Participant::new(name, name))
                .unwrap();
        }
        assert!(db.participants().remove("ROOM02", "b").unwrap());
        db.participants()
            .add("ROOM02", &Participant::new("d", "d"))
            .unwrap();

        let members = db.participants().list_for_room("ROOM02").unwrap();
        let ids: Vec<_> = members.iter().map(|p| p.user_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "d"]);
    }

    #[test]
    fn duplicate_member_insert_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        seed_room(&db, "ROOM03");

        db.participants()
            .add("ROOM03", &Participant::new("u1", "User"))
            .unwrap();
        assert!(db
            .participants()
            .add("ROOM03", &Participant::new("u1", "User"))
            .is_err());
    }

    #[test]
    fn status_updates_apply() {
        let db = Database::open_in_memory().unwrap();
        seed_room(&db, "ROOM04");
        db.participants()
            .add("ROOM04", &Participant::new("u1", "User"))
            .unwrap();

        assert!(db
            .participants()
            .set_status("ROOM04", "u1", ParticipantStatus::Answering)
            .unwrap());
        let member = db.participants().find("ROOM04", "u1").unwrap().unwrap();
        assert_eq!(member.status, ParticipantStatus::Answering);

        db.participants()
            .set_all_status("ROOM04", ParticipantStatus::Waiting)
            .unwrap();
        let member = db.participants().find("ROOM04", "u1").unwrap().unwrap();
        assert_eq!(member.status, ParticipantStatus::Waiting);
    }
}
