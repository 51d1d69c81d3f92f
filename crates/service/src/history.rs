//! Match archive, competition points, and weekly rankings

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use tracing::{info, instrument};

use crewroom_core::{MatchRecord, MatchStanding, Room, RoomManager};

use crate::error::Result;
use crate::interview::InterviewService;

/// Points by final rank: winner, runner-up, third, everyone else
const RANK_POINTS: [f64; 4] = [100.0, 70.0, 50.0, 30.0];

#[derive(Debug, Clone, Serialize)]
pub struct AwardedPoints {
    pub user_id: String,
    pub user_name: String,
    pub rank: usize,
    pub points: f64,
    pub weekly_total: f64,
}

pub struct HistoryService<'a> {
    manager: &'a RoomManager,
}

impl<'a> HistoryService<'a> {
    pub fn new(manager: &'a RoomManager) -> Self {
        Self { manager }
    }

    fn require_room(&self, room_id: &str) -> Result<Room> {
        Ok(self
            .manager
            .get_room(room_id)?
            .ok_or_else(|| crewroom_core::Error::room_not_found(room_id))?)
    }

    /// ISO week bucket for a timestamp, e.g. "2026-W35"
    pub fn week_key(at: DateTime<Utc>) -> String {
        let iso = at.iso_week();
        format!("{}-W{:02}", iso.year(), iso.week())
    }

    /// Archive the room's final standings. The record outlives the
    /// room and is keyed by its own id.
    #[instrument(skip(self))]
    pub fn save_match_result(&self, room_id: &str) -> Result<MatchRecord> {
        let room = self.require_room(room_id)?;

        let standings: Vec<MatchStanding> = InterviewService::new(self.manager)
            .leaderboard(room_id)?
            .into_iter()
            .map(|e| MatchStanding {
                user_id: e.user_id,
                user_name: e.user_name,
                score: e.score,
                rank: e.rank,
            })
            .collect();

        let record = MatchRecord::new(room_id, room.room_name, room.room_type, standings);
        self.manager.database().matches().create(&record)?;

        info!(room_id, match_id = %record.id, "match archived");
        Ok(record)
    }

    /// Matches a user appeared in, newest first
    pub fn match_history(&self, user_id: &str, limit: usize) -> Result<Vec<MatchRecord>> {
        Ok(self.manager.database().matches().list_for_user(user_id, limit)?)
    }

    pub fn match_details(&self, match_id: &str) -> Result<Option<MatchRecord>> {
        Ok(self.manager.database().matches().find_by_id(match_id)?)
    }

    /// A user's highest-scoring matches, best first
    pub fn best_performances(&self, user_id: &str, limit: usize) -> Result<Vec<MatchRecord>> {
        Ok(self.manager.database().matches().best_for_user(user_id, limit)?)
    }

    /// Hand out competition points for a finished match by rank and
    /// add them to this week's totals
    #[instrument(skip(self, record))]
    pub fn award_points(&self, record: &MatchRecord) -> Result<Vec<AwardedPoints>> {
        let week = Self::week_key(record.finished_at);
        let matches = self.manager.database().matches();

        let mut awarded = Vec::with_capacity(record.standings.len());
        for standing in &record.standings {
            let points = RANK_POINTS[standing.rank.saturating_sub(1).min(RANK_POINTS.len() - 1)];
            let weekly_total = matches.award_points(&standing.user_id, &week, points)?;
            awarded.push(AwardedPoints {
                user_id: standing.user_id.clone(),
                user_name: standing.user_name.clone(),
                rank: standing.rank,
                points,
                weekly_total,
            });
        }
        Ok(awarded)
    }

    /// This week's competition ranking, highest points first
    pub fn weekly_ranking(&self, limit: usize) -> Result<Vec<(String, f64)>> {
        let week = Self::week_key(Utc::now());
        Ok(self.manager.database().matches().weekly_ranking(&week, limit)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crewroom_core::{RoomType, ScoreCategory};

    fn finished_interview(mgr: &RoomManager) -> String {
        let room = mgr
            .create_room("h1", "Host", "Finals", RoomType::GroupInterview, 4, None)
            .unwrap();
        mgr.join_room(&room.room_id, "u2", "User2").unwrap();
        mgr.join_room(&room.room_id, "u3", "User3").unwrap();
        mgr.start_session(&room.room_id, "h1").unwrap();

        let interviews = InterviewService::new(mgr);
        interviews
            .start_group_interview(&room.room_id, "korean_air", 2)
            .unwrap();
        interviews
            .update_live_score(&room.room_id, "u2", ScoreCategory::Content, 40.0)
            .unwrap();
        interviews
            .update_live_score(&room.room_id, "h1", ScoreCategory::Content, 25.0)
            .unwrap();
        interviews
            .update_live_score(&room.room_id, "u3", ScoreCategory::Content, 10.0)
            .unwrap();
        room.room_id
    }

    #[test]
    fn archived_match_preserves_rankings() {
        let mgr = RoomManager::open_in_memory().unwrap();
        let room_id = finished_interview(&mgr);
        let svc = HistoryService::new(&mgr);

        let record = svc.save_match_result(&room_id).unwrap();
        assert_eq!(record.winner_id.as_deref(), Some("u2"));
        assert_eq!(record.standings[0].rank, 1);
        assert_eq!(record.standings[2].user_id, "u3");

        // The archive survives room deletion
        mgr.delete_room(&room_id, "h1").unwrap();
        let loaded = svc.match_details(&record.id.to_string()).unwrap().unwrap();
        assert_eq!(loaded.standings.len(), 3);
    }

    #[test]
    fn history_is_scoped_to_the_user() {
        let mgr = RoomManager::open_in_memory().unwrap();
        let room_id = finished_interview(&mgr);
        let svc = HistoryService::new(&mgr);
        svc.save_match_result(&room_id).unwrap();

        assert_eq!(svc.match_history("u2", 10).unwrap().len(), 1);
        assert!(svc.match_history("nobody", 10).unwrap().is_empty());
    }

    #[test]
    fn points_follow_final_rank() {
        let mgr = RoomManager::open_in_memory().unwrap();
        let room_id = finished_interview(&mgr);
        let svc = HistoryService::new(&mgr);

        let record = svc.save_match_result(&room_id).unwrap();
        let awarded = svc.award_points(&record).unwrap();

        assert_eq!(awarded[0].points, 100.0);
        assert_eq!(awarded[1].points, 70.0);
        assert_eq!(awarded[2].points, 50.0);

        let ranking = svc.weekly_ranking(10).unwrap();
        assert_eq!(ranking[0], ("u2".to_string(), 100.0));
    }

    #[test]
    fn week_key_is_iso_formatted() {
        let at = DateTime::parse_from_rfc3339("2026-08-29T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(HistoryService::week_key(at), "2026-W35");
    }
}
