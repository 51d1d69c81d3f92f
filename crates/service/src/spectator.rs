//! Spectator mode: read-only room views and a comment stream

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crewroom_core::{Participant, Phase, Room, RoomManager, RoomStatus, RoomType};

use crate::debate::{DebatePhase, DebateService};
use crate::error::{Error, Result};
use crate::interview::{InterviewService, RankEntry};

const SPECTATOR_KEY: &str = "spectator_state";

/// Oldest comments are dropped past this many
const COMMENT_BACKLOG: usize = 100;
/// Comments included in the spectator view
const RECENT_COMMENTS: usize = 10;
/// Leaderboard rows included in the spectator view
const LEADERBOARD_TOP: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpectatorComment {
    pub user_id: String,
    pub comment: String,
    pub sent_at: DateTime<Utc>,
}

/// Spectator roster and comment backlog, kept in the room's settings
/// map like the other per-room experience state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SpectatorState {
    users: Vec<String>,
    comments: Vec<SpectatorComment>,
}

/// Interview summary shown to spectators
#[derive(Debug, Clone, Serialize)]
pub struct InterviewGlance {
    pub airline: String,
    pub current_question: Option<String>,
    pub question_idx: usize,
    pub total_questions: usize,
}

/// Debate summary shown to spectators
#[derive(Debug, Clone, Serialize)]
pub struct DebateGlance {
    pub topic: String,
    pub phase: DebatePhase,
    pub statement_count: usize,
}

/// Everything a non-participant needs to follow a room
#[derive(Debug, Clone, Serialize)]
pub struct SpectatorView {
    pub room_id: String,
    pub room_name: String,
    pub room_type: RoomType,
    pub status: RoomStatus,
    pub phase: Phase,
    pub current_speaker_id: Option<String>,
    pub participants: Vec<Participant>,
    pub spectator_count: usize,
    pub recent_comments: Vec<SpectatorComment>,
    pub interview: Option<InterviewGlance>,
    pub debate: Option<DebateGlance>,
    pub leaderboard: Vec<RankEntry>,
}

pub struct SpectatorService<'a> {
    manager: &'a RoomManager,
}

impl<'a> SpectatorService<'a> {
    pub fn new(manager: &'a RoomManager) -> Self {
        Self { manager }
    }

    fn require_room(&self, room_id: &str) -> Result<Room> {
        Ok(self
            .manager
            .get_room(room_id)?
            .ok_or_else(|| crewroom_core::Error::room_not_found(room_id))?)
    }

    fn state_of(&self, room: &Room) -> Result<SpectatorState> {
        match room.settings.get(SPECTATOR_KEY) {
            Some(value) => Ok(serde_json::from_value(value.clone())?),
            None => Ok(SpectatorState::default()),
        }
    }

    fn persist(&self, room: &mut Room, state: &SpectatorState) -> Result<()> {
        room.settings
            .insert(SPECTATOR_KEY.to_string(), serde_json::to_value(state)?);
        self.manager.database().rooms().update(room)?;
        Ok(())
    }

    /// Register a spectator. Participants cannot spectate their own
    /// room; re-registering is a no-op. Returns the spectator count.
    #[instrument(skip(self))]
    pub fn add_spectator(&self, room_id: &str, user_id: &str) -> Result<usize> {
        let mut room = self.require_room(room_id)?;
        let members = self.manager.get_participants(room_id)?;
        if members.iter().any(|m| m.user_id == user_id) {
            return Err(Error::InvalidOperation(
                "participants cannot spectate their own room".into(),
            ));
        }

        let mut state = self.state_of(&room)?;
        if !state.users.iter().any(|id| id == user_id) {
            state.users.push(user_id.to_string());
            self.persist(&mut room, &state)?;
            info!(room_id, user_id, "spectator joined");
        }
        Ok(state.users.len())
    }

    /// Drop a spectator. Returns false when they were not registered.
    #[instrument(skip(self))]
    pub fn remove_spectator(&self, room_id: &str, user_id: &str) -> Result<bool> {
        let mut room = self.require_room(room_id)?;
        let mut state = self.state_of(&room)?;

        let before = state.users.len();
        state.users.retain(|id| id != user_id);
        if state.users.len() == before {
            return Ok(false);
        }
        self.persist(&mut room, &state)?;
        Ok(true)
    }

    /// Post a comment to the room's spectator stream. Registered
    /// spectators only; the backlog keeps the newest entries.
    #[instrument(skip(self, comment))]
    pub fn spectator_comment(
        &self,
        room_id: &str,
        user_id: &str,
        comment: &str,
    ) -> Result<SpectatorComment> {
        let mut room = self.require_room(room_id)?;
        let mut state = self.state_of(&room)?;

        if !state.users.iter().any(|id| id == user_id) {
            return Err(Error::InvalidOperation(
                "only registered spectators may comment".into(),
            ));
        }

        let entry = SpectatorComment {
            user_id: user_id.to_string(),
            comment: comment.to_string(),
            sent_at: Utc::now(),
        };
        state.comments.push(entry.clone());
        if state.comments.len() > COMMENT_BACKLOG {
            let excess = state.comments.len() - COMMENT_BACKLOG;
            state.comments.drain(..excess);
        }
        self.persist(&mut room, &state)?;
        Ok(entry)
    }

    /// Full comment backlog, oldest first
    pub fn comments(&self, room_id: &str) -> Result<Vec<SpectatorComment>> {
        let room = self.require_room(room_id)?;
        Ok(self.state_of(&room)?.comments)
    }

    /// Assemble the read-only view: room state, running experience
    /// summaries, the newest comments, and the leaderboard top.
    pub fn view(&self, room_id: &str) -> Result<SpectatorView> {
        let room = self.require_room(room_id)?;
        let state = self.state_of(&room)?;
        let participants = self.manager.get_participants(room_id)?;

        let interviews = InterviewService::new(self.manager);
        let interview = match interviews.session(room_id) {
            Ok(session) => Some(InterviewGlance {
                airline: session.airline,
                current_question: room
                    .questions
                    .get(room.state.current_question_idx)
                    .cloned(),
                question_idx: room.state.current_question_idx,
                total_questions: room.questions.len(),
            }),
            Err(Error::NoActiveInterview(_)) => None,
            Err(e) => return Err(e),
        };

        let debate = match DebateService::new(self.manager).state(room_id) {
            Ok(debate) => Some(DebateGlance {
                topic: debate.topic.topic,
                phase: debate.phase,
                statement_count: debate.arguments.len() + debate.rebuttals.len(),
            }),
            Err(Error::NoActiveDebate(_)) => None,
            Err(e) => return Err(e),
        };

        let mut leaderboard = if interview.is_some() {
            interviews.leaderboard(room_id)?
        } else {
            Vec::new()
        };
        leaderboard.truncate(LEADERBOARD_TOP);

        let recent_start = state.comments.len().saturating_sub(RECENT_COMMENTS);
        Ok(SpectatorView {
            room_id: room.room_id,
            room_name: room.room_name,
            room_type: room.room_type,
            status: room.status,
            phase: room.state.phase,
            current_speaker_id: room.state.current_speaker_id,
            participants,
            spectator_count: state.users.len(),
            recent_comments: state.comments[recent_start..].to_vec(),
            interview,
            debate,
            leaderboard,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crewroom_core::{DebateSide, RoomType, ScoreCategory};
    use std::collections::HashMap;

    fn room_with_members(mgr: &RoomManager) -> String {
        let room = mgr
            .create_room("h1", "Host", "Practice", RoomType::GroupInterview, 4, None)
            .unwrap();
        mgr.join_room(&room.room_id, "u2", "User2").unwrap();
        room.room_id
    }

    #[test]
    fn participants_cannot_spectate() {
        let mgr = RoomManager::open_in_memory().unwrap();
        let room_id = room_with_members(&mgr);
        let svc = SpectatorService::new(&mgr);

        assert!(svc.add_spectator(&room_id, "h1").is_err());

        assert_eq!(svc.add_spectator(&room_id, "fan1").unwrap(), 1);
        // Re-registering is a no-op
        assert_eq!(svc.add_spectator(&room_id, "fan1").unwrap(), 1);

        assert!(svc.remove_spectator(&room_id, "fan1").unwrap());
        assert!(!svc.remove_spectator(&room_id, "fan1").unwrap());
    }

    #[test]
    fn comments_require_registration() {
        let mgr = RoomManager::open_in_memory().unwrap();
        let room_id = room_with_members(&mgr);
        let svc = SpectatorService::new(&mgr);

        assert!(svc.spectator_comment(&room_id, "fan1", "hello").is_err());

        svc.add_spectator(&room_id, "fan1").unwrap();
        svc.spectator_comment(&room_id, "fan1", "hello").unwrap();

        let view = svc.view(&room_id).unwrap();
        assert_eq!(view.spectator_count, 1);
        assert_eq!(view.recent_comments.len(), 1);
        assert_eq!(view.recent_comments[0].comment, "hello");
    }

    #[test]
    fn comment_backlog_keeps_the_newest_entries() {
        let mgr = RoomManager::open_in_memory().unwrap();
        let room_id = room_with_members(&mgr);
        let svc = SpectatorService::new(&mgr);
        svc.add_spectator(&room_id, "fan1").unwrap();

        for i in 0..105 {
            svc.spectator_comment(&room_id, "fan1", &format!("c{i}"))
                .unwrap();
        }

        let all = svc.comments(&room_id).unwrap();
        assert_eq!(all.len(), 100);
        assert_eq!(all[0].comment, "c5");

        let view = svc.view(&room_id).unwrap();
        assert_eq!(view.recent_comments.len(), 10);
        assert_eq!(view.recent_comments[9].comment, "c104");
    }

    #[test]
    fn view_carries_interview_glance_and_leaderboard() {
        let mgr = RoomManager::open_in_memory().unwrap();
        let room_id = room_with_members(&mgr);
        mgr.start_session(&room_id, "h1").unwrap();

        let interviews = InterviewService::new(&mgr);
        interviews
            .start_group_interview(&room_id, "korean_air", 3)
            .unwrap();
        interviews
            .update_live_score(&room_id, "u2", ScoreCategory::Content, 20.0)
            .unwrap();

        let svc = SpectatorService::new(&mgr);
        let view = svc.view(&room_id).unwrap();
        assert_eq!(view.status, RoomStatus::InProgress);
        assert!(view.debate.is_none());

        let glance = view.interview.unwrap();
        assert_eq!(glance.airline, "korean_air");
        assert_eq!(glance.total_questions, 3);
        assert!(glance.current_question.is_some());

        assert_eq!(view.leaderboard[0].user_id, "u2");
    }

    #[test]
    fn view_carries_debate_glance() {
        let mgr = RoomManager::open_in_memory().unwrap();
        let room = mgr
            .create_room("h1", "Host", "Debate night", RoomType::Debate, 4, None)
            .unwrap();
        mgr.join_room(&room.room_id, "u2", "User2").unwrap();
        let positions = HashMap::from([
            ("h1".to_string(), DebateSide::Pro),
            ("u2".to_string(), DebateSide::Con),
        ]);
        let debates = DebateService::new(&mgr);
        debates
            .start_debate(&room.room_id, "pet_cabin", positions)
            .unwrap();
        debates
            .submit_argument(&room.room_id, "h1", "opening")
            .unwrap();

        let svc = SpectatorService::new(&mgr);
        let view = svc.view(&room.room_id).unwrap();
        assert!(view.interview.is_none());

        let glance = view.debate.unwrap();
        assert_eq!(glance.phase, DebatePhase::Opening);
        assert_eq!(glance.statement_count, 1);
        assert!(view.leaderboard.is_empty());
    }
}
