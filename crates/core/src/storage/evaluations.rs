//! Peer evaluation storage

use rusqlite::{params, Connection, Row};
use tracing::instrument;

use super::parse::{parse_datetime, parse_enum, parse_uuid};
use crate::error::Result;
use crate::models::{CategoryScores, PeerEvaluation, PeerReaction, PeerReactionKind};

pub struct EvaluationStore<'a> {
    conn: &'a Connection,
}

impl<'a> EvaluationStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn map_evaluation(row: &Row<'_>) -> rusqlite::Result<PeerEvaluation> {
        Ok(PeerEvaluation {
            id: parse_uuid(&row.get::<_, String>(0)?)?,
            room_id: row.get(1)?,
            evaluator_id: row.get(2)?,
            target_id: row.get(3)?,
            question_idx: row.get::<_, i64>(4)? as usize,
            scores: CategoryScores {
                content: row.get(5)?,
                delivery: row.get(6)?,
                attitude: row.get(7)?,
                structure: row.get(8)?,
            },
            feedback: row.get(9)?,
            created_at: parse_datetime(&row.get::<_, String>(10)?)?,
        })
    }

    const COLUMNS: &'static str = "id, room_id, evaluator_id, target_id, question_idx, \
         content, delivery, attitude, structure, feedback, created_at";

    #[instrument(skip(self, evaluation), fields(room_id = %evaluation.room_id, evaluator = %evaluation.evaluator_id, target = %evaluation.target_id))]
    pub fn create(&self, evaluation: &PeerEvaluation) -> Result<()> {
        self.conn.execute(
            "INSERT INTO evaluations (id, room_id, evaluator_id, target_id, question_idx,
                 content, delivery, attitude, structure, total, feedback, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                evaluation.id.to_string(),
                evaluation.room_id,
                evaluation.evaluator_id,
                evaluation.target_id,
                evaluation.question_idx as i64,
                evaluation.scores.content,
                evaluation.scores.delivery,
                evaluation.scores.attitude,
                evaluation.scores.structure,
                evaluation.scores.total(),
                evaluation.feedback,
                evaluation.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Whether this evaluator already scored this target in this room
    pub fn exists(&self, room_id: &str, evaluator_id: &str, target_id: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM evaluations
             WHERE room_id = ?1 AND evaluator_id = ?2 AND target_id = ?3",
            params![room_id, evaluator_id, target_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Evaluations a user received, newest first
    pub fn received_by(&self, target_id: &str) -> Result<Vec<PeerEvaluation>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM evaluations WHERE target_id = ?1 ORDER BY created_at DESC",
            Self::COLUMNS
        ))?;

        let evaluations = stmt
            .query_map(params![target_id], Self::map_evaluation)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(evaluations)
    }

    /// Evaluations a user gave, newest first
    pub fn given_by(&self, evaluator_id: &str) -> Result<Vec<PeerEvaluation>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM evaluations WHERE evaluator_id = ?1 ORDER BY created_at DESC",
            Self::COLUMNS
        ))?;

        let evaluations = stmt
            .query_map(params![evaluator_id], Self::map_evaluation)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(evaluations)
    }

    /// Evaluations received by a user within one room
    pub fn received_in_room(&self, room_id: &str, target_id: &str) -> Result<Vec<PeerEvaluation>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM evaluations WHERE room_id = ?1 AND target_id = ?2",
            Self::COLUMNS
        ))?;

        let evaluations = stmt
            .query_map(params![room_id, target_id], Self::map_evaluation)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(evaluations)
    }

    #[instrument(skip(self, reaction), fields(room_id = %reaction.room_id, kind = reaction.kind.as_str()))]
    pub fn add_reaction(&self, reaction: &PeerReaction) -> Result<()> {
        self.conn.execute(
            "INSERT INTO peer_reactions (id, room_id, sender_id, target_id, reaction, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                reaction.id.to_string(),
                reaction.room_id,
                reaction.sender_id,
                reaction.target_id,
                reaction.kind.as_str(),
                reaction.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Reaction counts a user received, as (kind, count) pairs
    pub fn reaction_counts_for(&self, target_id: &str) -> Result<Vec<(PeerReactionKind, usize)>> {
        let mut stmt = self.conn.prepare(
            "SELECT reaction, COUNT(*) FROM peer_reactions
             WHERE target_id = ?1 GROUP BY reaction",
        )?;

        let counts = stmt
            .query_map(params![target_id], |row| {
                Ok((
                    parse_enum::<PeerReactionKind>(&row.get::<_, String>(0)?)?,
                    row.get::<_, i64>(1)? as usize,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::storage::Database;

    fn scores(content: f64) -> CategoryScores {
        CategoryScores {
            content,
            delivery: 20.0,
            attitude: 20.0,
            structure: 20.0,
        }
    }

    #[test]
    fn one_evaluation_per_pair_per_room() {
        let db = Database::open_in_memory().unwrap();

        let eval = PeerEvaluation::new("EVL001", "u1", "u2", 0, scores(20.0), "solid answer");
        db.evaluations().create(&eval).unwrap();
        assert!(db.evaluations().exists("EVL001", "u1", "u2").unwrap());

        let repeat = PeerEvaluation::new("EVL001", "u1", "u2", 1, scores(10.0), "again");
        assert!(db.evaluations().create(&repeat).is_err());

        // The same pair in another room is a fresh slate
        let elsewhere = PeerEvaluation::new("EVL002", "u1", "u2", 0, scores(15.0), "different room");
        db.evaluations().create(&elsewhere).unwrap();
    }

    #[test]
    fn received_and_given_are_distinct_views() {
        let db = Database::open_in_memory().unwrap();

        db.evaluations()
            .create(&PeerEvaluation::new("EVL003", "u1", "u2", 0, scores(25.0), "a"))
            .unwrap();
        db.evaluations()
            .create(&PeerEvaluation::new("EVL003", "u3", "u2", 0, scores(15.0), "b"))
            .unwrap();

        assert_eq!(db.evaluations().received_by("u2").unwrap().len(), 2);
        assert_eq!(db.evaluations().given_by("u1").unwrap().len(), 1);
        assert_eq!(
            db.evaluations().received_in_room("EVL003", "u2").unwrap().len(),
            2
        );
    }

    #[test]
    fn reaction_counts_group_by_kind() {
        let db = Database::open_in_memory().unwrap();

        for kind in [
            PeerReactionKind::Like,
            PeerReactionKind::Like,
            PeerReactionKind::Amazing,
        ] {
            db.evaluations()
                .add_reaction(&PeerReaction::new("EVL004", "u1", "u2", kind))
                .unwrap();
        }

        let counts = db.evaluations().reaction_counts_for("u2").unwrap();
        let likes = counts
            .iter()
            .find(|(k, _)| *k == PeerReactionKind::Like)
            .unwrap();
        assert_eq!(likes.1, 2);
    }
}
