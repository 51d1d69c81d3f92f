//! Match archive and weekly points storage

use rusqlite::{params, Connection, Row};
use tracing::instrument;

use super::parse::{parse_datetime, parse_enum, parse_json, parse_uuid, OptionalExt};
use crate::error::Result;
use crate::models::MatchRecord;

pub struct MatchStore<'a> {
    conn: &'a Connection,
}

impl<'a> MatchStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn map_match(row: &Row<'_>) -> rusqlite::Result<MatchRecord> {
        Ok(MatchRecord {
            id: parse_uuid(&row.get::<_, String>(0)?)?,
            room_id: row.get(1)?,
            room_name: row.get(2)?,
            room_type: parse_enum(&row.get::<_, String>(3)?)?,
            standings: parse_json(&row.get::<_, String>(4)?)?,
            winner_id: row.get(5)?,
            finished_at: parse_datetime(&row.get::<_, String>(6)?)?,
        })
    }

    const COLUMNS: &'static str =
        "id, room_id, room_name, room_type, standings, winner_id, finished_at";

    #[instrument(skip(self, record), fields(room_id = %record.room_id))]
    pub fn create(&self, record: &MatchRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO matches (id, room_id, room_name, room_type, standings, winner_id, finished_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.id.to_string(),
                record.room_id,
                record.room_name,
                record.room_type.as_str(),
                serde_json::to_string(&record.standings)?,
                record.winner_id,
                record.finished_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, id: &str) -> Result<Option<MatchRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM matches WHERE id = ?1",
            Self::COLUMNS
        ))?;

        let record = stmt.query_row(params![id], Self::map_match).optional()?;
        Ok(record)
    }

    /// Matches a user appeared in, newest first. Standings are a JSON
    /// column so the filter scans; matches are write-few read-few.
    pub fn list_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<MatchRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM matches ORDER BY finished_at DESC",
            Self::COLUMNS
        ))?;

        let records = stmt
            .query_map([], Self::map_match)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records
            .into_iter()
            .filter(|m| m.standings.iter().any(|s| s.user_id == user_id))
            .take(limit)
            .collect())
    }

    /// A user's highest-scoring appearances, best first
    pub fn best_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<MatchRecord>> {
        let mut records = self.list_for_user(user_id, usize::MAX)?;
        records.sort_by(|a, b| {
            let score = |m: &MatchRecord| {
                m.standings
                    .iter()
                    .find(|s| s.user_id == user_id)
                    .map(|s| s.score)
                    .unwrap_or(0.0)
            };
            score(b).partial_cmp(&score(a)).unwrap_or(std::cmp::Ordering::Equal)
        });
        records.truncate(limit);
        Ok(records)
    }

    /// Add competition points to a user's weekly total
    #[instrument(skip(self))]
    pub fn award_points(&self, user_id: &str, week: &str, points: f64) -> Result<f64> {
        self.conn.execute(
            "INSERT INTO weekly_points (user_id, week, points) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id, week) DO UPDATE SET points = points + ?3",
            params![user_id, week, points],
        )?;

        let total: f64 = self.conn.query_row(
            "SELECT points FROM weekly_points WHERE user_id = ?1 AND week = ?2",
            params![user_id, week],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    /// Weekly ranking as (user_id, points), highest first
    pub fn weekly_ranking(&self, week: &str, limit: usize) -> Result<Vec<(String, f64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, points FROM weekly_points
             WHERE week = ?1 ORDER BY points DESC LIMIT ?2",
        )?;

        let ranking = stmt
            .query_map(params![week, limit as i64], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(ranking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MatchStanding, RoomType};
    use crate::storage::Database;

    fn standings(pairs: &[(&str, f64)]) -> Vec<MatchStanding> {
        pairs
            .iter()
            .enumerate()
            .map(|(i, (id, score))| MatchStanding {
                user_id: id.to_string(),
                user_name: id.to_string(),
                score: *score,
                rank: i + 1,
            })
            .collect()
    }

    #[test]
    fn match_round_trip_keeps_standings() {
        let db = Database::open_in_memory().unwrap();

        let record = MatchRecord::new(
            "MTC001",
            "Final round",
            RoomType::Debate,
            standings(&[("u1", 88.0), ("u2", 74.0)]),
        );
        db.matches().create(&record).unwrap();

        let loaded = db.matches().find_by_id(&record.id.to_string()).unwrap().unwrap();
        assert_eq!(loaded.winner_id.as_deref(), Some("u1"));
        assert_eq!(loaded.standings.len(), 2);
        assert_eq!(loaded.standings[1].rank, 2);
    }

    #[test]
    fn history_filters_by_appearance() {
        let db = Database::open_in_memory().unwrap();

        db.matches()
            .create(&MatchRecord::new(
                "MTC002",
                "A",
                RoomType::GroupInterview,
                standings(&[("u1", 50.0), ("u2", 40.0)]),
            ))
            .unwrap();
        db.matches()
            .create(&MatchRecord::new(
                "MTC003",
                "B",
                RoomType::GroupInterview,
                standings(&[("u3", 60.0)]),
            ))
            .unwrap();

        assert_eq!(db.matches().list_for_user("u1", 10).unwrap().len(), 1);
        assert!(db.matches().list_for_user("u4", 10).unwrap().is_empty());
    }

    #[test]
    fn best_sorts_by_own_score() {
        let db = Database::open_in_memory().unwrap();

        for (room, score) in [("MTC004", 55.0), ("MTC005", 91.0), ("MTC006", 72.0)] {
            db.matches()
                .create(&MatchRecord::new(
                    room,
                    "Practice",
                    RoomType::GroupInterview,
                    standings(&[("u1", score)]),
                ))
                .unwrap();
        }

        let best = db.matches().best_for_user("u1", 2).unwrap();
        assert_eq!(best.len(), 2);
        assert_eq!(best[0].standings[0].score, 91.0);
        assert_eq!(best[1].standings[0].score, 72.0);
    }

    #[test]
    fn weekly_points_accumulate() {
        let db = Database::open_in_memory().unwrap();

        assert_eq!(db.matches().award_points("u1", "2026-W35", 10.0).unwrap(), 10.0);
        assert_eq!(db.matches().award_points("u1", "2026-W35", 5.0).unwrap(), 15.0);
        db.matches().award_points("u2", "2026-W35", 20.0).unwrap();
        db.matches().award_points("u1", "2026-W36", 99.0).unwrap();

        let ranking = db.matches().weekly_ranking("2026-W35", 10).unwrap();
        assert_eq!(ranking[0], ("u2".to_string(), 20.0));
        assert_eq!(ranking[1], ("u1".to_string(), 15.0));
    }
}
