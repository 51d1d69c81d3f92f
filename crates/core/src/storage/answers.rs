//! Answer storage operations

use rusqlite::{params, Connection, Row};
use tracing::instrument;

use super::parse::parse_datetime;
use crate::error::Result;
use crate::models::Answer;

pub struct AnswerStore<'a> {
    conn: &'a Connection,
}

impl<'a> AnswerStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn map_answer(row: &Row<'_>) -> rusqlite::Result<Answer> {
        Ok(Answer {
            user_id: row.get(0)?,
            user_name: row.get(1)?,
            question_idx: row.get::<_, i64>(2)? as usize,
            answer_text: row.get(3)?,
            audio_data: row.get(4)?,
            submitted_at: parse_datetime(&row.get::<_, String>(5)?)?,
        })
    }

    #[instrument(skip(self, answer), fields(user_id = %answer.user_id, question_idx = answer.question_idx))]
    pub fn append(&self, room_id: &str, answer: &Answer) -> Result<()> {
        self.conn.execute(
            "INSERT INTO answers (room_id, user_id, user_name, question_idx, answer_text, audio_data, submitted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                room_id,
                answer.user_id,
                answer.user_name,
                answer.question_idx as i64,
                answer.answer_text,
                answer.audio_data,
                answer.submitted_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Answers for one question of a room, in submission order
    pub fn list_for_question(&self, room_id: &str, question_idx: usize) -> Result<Vec<Answer>> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, user_name, question_idx, answer_text, audio_data, submitted_at
             FROM answers WHERE room_id = ?1 AND question_idx = ?2 ORDER BY id",
        )?;

        let answers = stmt
            .query_map(params![room_id, question_idx as i64], Self::map_answer)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(answers)
    }

    /// Every answer submitted in a room, in submission order
    pub fn list_for_room(&self, room_id: &str) -> Result<Vec<Answer>> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, user_name, question_idx, answer_text, audio_data, submitted_at
             FROM answers WHERE room_id = ?1 ORDER BY id",
        )?;

        let answers = stmt
            .query_map(params![room_id], Self::map_answer)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(answers)
    }

    pub fn count_for_user(&self, room_id: &str, user_id: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM answers WHERE room_id = ?1 AND user_id = ?2",
            params![room_id, user_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
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
    fn answers_group_by_question() {
        let db = Database::open_in_memory().unwrap();
        seed_room(&db, "ANS001");

        db.answers()
            .append("ANS001", &Answer::new("u1", "One", 0, "first", None))
            .unwrap();
        db.answers()
            .append("ANS001", &Answer::new("u2", "Two", 0, "second", None))
            .unwrap();
        db.answers()
            .append("ANS001", &Answer::new("u1", "One", 1, "third", None))
            .unwrap();

        let q0 = db.answers().list_for_question("ANS001", 0).unwrap();
        assert_eq!(q0.len(), 2);
        assert_eq!(q0[0].answer_text, "first");
        assert_eq!(q0[1].answer_text, "second");

        let all = db.answers().list_for_room("ANS001").unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(db.answers().count_for_user("ANS001", "u1").unwrap(), 2);
    }

    #[test]
    fn audio_payload_round_trips() {
        let db = Database::open_in_memory().unwrap();
        seed_room(&db, "ANS002");

        let audio = Some("c29tZSBhdWRpbw==".to_string());
        db.answers()
            .append("ANS002", &Answer::new("u1", "One", 0, "spoken", audio.clone()))
            .unwrap();

        let answers = db.answers().list_for_question("ANS002", 0).unwrap();
        assert_eq!(answers[0].audio_data, audio);
    }
}
