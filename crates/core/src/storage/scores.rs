//! Live session score storage

use rusqlite::{params, Connection, Row};
use tracing::instrument;

use super::parse::OptionalExt;
use crate::error::Result;
use crate::models::{LiveScore, ScoreCategory};

pub struct ScoreStore<'a> {
    conn: &'a Connection,
}

impl<'a> ScoreStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn map_score(row: &Row<'_>) -> rusqlite::Result<LiveScore> {
        Ok(LiveScore {
            content: row.get(0)?,
            structure: row.get(1)?,
            delivery: row.get(2)?,
            relevance: row.get(3)?,
        })
    }

    /// Ensure a zeroed score row exists for a participant
    pub fn init(&self, room_id: &str, user_id: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO live_scores (room_id, user_id, updated_at)
             VALUES (?1, ?2, ?3)",
            params![room_id, user_id, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Add points to one category of a participant's live score
    #[instrument(skip(self))]
    pub fn bump(
        &self,
        room_id: &str,
        user_id: &str,
        category: ScoreCategory,
        points: f64,
    ) -> Result<LiveScore> {
        self.init(room_id, user_id)?;

        // Column names come from a closed enum, never from input
        self.conn.execute(
            &format!(
                "UPDATE live_scores SET {col} = {col} + ?1, updated_at = ?2
                 WHERE room_id = ?3 AND user_id = ?4",
                col = category.as_str()
            ),
            params![points, chrono::Utc::now().to_rfc3339(), room_id, user_id],
        )?;

        self.find(room_id, user_id)
            .map(|score| score.unwrap_or_default())
    }

    pub fn find(&self, room_id: &str, user_id: &str) -> Result<Option<LiveScore>> {
        let score = self
            .conn
            .query_row(
                "SELECT content, structure, delivery, relevance
                 FROM live_scores WHERE room_id = ?1 AND user_id = ?2",
                params![room_id, user_id],
                Self::map_score,
            )
            .optional()?;
        Ok(score)
    }

    /// Every participant's live score for a room
    pub fn list_for_room(&self, room_id: &str) -> Result<Vec<(String, LiveScore)>> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, content, structure, delivery, relevance
             FROM live_scores WHERE room_id = ?1",
        )?;

        let scores = stmt
            .query_map(params![room_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    LiveScore {
                        content: row.get(1)?,
                        structure: row.get(2)?,
                        delivery: row.get(3)?,
                        relevance: row.get(4)?,
                    },
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(scores)
    }

    /// Drop every score row for a room (used when a session restarts)
    pub fn clear_room(&self, room_id: &str) -> Result<()> {
        self.conn.execute(
            "DELETE FROM live_scores WHERE room_id = ?1",
            params![room_id],
        )?;
        Ok(())
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
    fn bumps_accumulate_per_category() {
        let db = Database::open_in_memory().unwrap();
        seed_room(&db, "SCR001");

        db.scores()
            .bump("SCR001", "u1", ScoreCategory::Content, 15.0)
            .unwrap();
        let score = db
            .scores()
            .bump("SCR001", "u1", ScoreCategory::Content, 10.0)
            .unwrap();

        assert_eq!(score.content, 25.0);
        assert_eq!(score.structure, 0.0);
        assert_eq!(score.total(), 25.0);
    }

    #[test]
    fn clear_room_removes_scores() {
        let db = Database::open_in_memory().unwrap();
        seed_room(&db, "SCR002");

        db.scores()
            .bump("SCR002", "u1", ScoreCategory::Delivery, 5.0)
            .unwrap();
        db.scores().clear_room("SCR002").unwrap();

        assert!(db.scores().find("SCR002", "u1").unwrap().is_none());
        assert!(db.scores().list_for_room("SCR002").unwrap().is_empty());
    }
}
