//! Group interview experience built on top of the room coordinator

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument};

use crewroom_core::{LiveScore, Room, RoomManager, RoomStatus, ScoreCategory};

use crate::error::{Error, Result};
use crate::questions::airline_questions;

const SESSION_KEY: &str = "interview_session";
const TIMER_KEY: &str = "answer_timer";

/// Default seconds allowed per answer
pub const DEFAULT_ANSWER_SECONDS: i64 = 120;

/// Durable interview session metadata, kept in the room's settings map
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewSession {
    pub airline: String,
    pub question_count: usize,
    pub started_at: DateTime<Utc>,
    pub completed: bool,
}

/// Countdown for the current answer, also kept in settings so every
/// process observing the room sees the same deadline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerTimer {
    pub user_id: String,
    pub duration_secs: i64,
    pub started_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub enum TimerStatus {
    Inactive,
    Running { user_id: String, remaining_secs: i64 },
    Expired { user_id: String },
}

/// Per-question answer completion
#[derive(Debug, Clone, Serialize)]
pub struct QuestionProgress {
    pub question_idx: usize,
    pub question: String,
    pub answered_count: usize,
    pub total_participants: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct InterviewProgress {
    pub room_id: String,
    pub airline: String,
    pub current_question_idx: usize,
    pub total_questions: usize,
    pub elapsed_secs: i64,
    pub questions: Vec<QuestionProgress>,
    pub current_speaker_id: Option<String>,
    pub completed: bool,
}

/// Snapshot of whose turn it is right now
#[derive(Debug, Clone, Serialize)]
pub struct TurnInfo {
    pub current_speaker_id: Option<String>,
    pub current_speaker_name: Option<String>,
    pub current_question: Option<String>,
    pub current_question_idx: usize,
    pub round_number: u32,
    pub remaining_secs: Option<i64>,
}

/// One leaderboard row
#[derive(Debug, Clone, Serialize)]
pub struct RankEntry {
    pub user_id: String,
    pub user_name: String,
    pub score: f64,
    pub rank: usize,
}

pub struct InterviewService<'a> {
    manager: &'a RoomManager,
}

impl<'a> InterviewService<'a> {
    pub fn new(manager: &'a RoomManager) -> Self {
        Self { manager }
    }

    fn require_room(&self, room_id: &str) -> Result<Room> {
        Ok(self
            .manager
            .get_room(room_id)?
            .ok_or_else(|| crewroom_core::Error::room_not_found(room_id))?)
    }

    fn session_of(&self, room: &Room) -> Result<InterviewSession> {
        let value = room
            .settings
            .get(SESSION_KEY)
            .ok_or_else(|| Error::NoActiveInterview(room.room_id.clone()))?;
        Ok(serde_json::from_value(value.clone())?)
    }

    fn store_key(&self, room: &mut Room, key: &str, value: serde_json::Value) -> Result<()> {
        room.settings.insert(key.to_string(), value);
        self.manager.database().rooms().update(room)?;
        Ok(())
    }

    /// Seed the question list from the airline bank and open the
    /// interview. The room's session must already be running.
    #[instrument(skip(self))]
    pub fn start_group_interview(
        &self,
        room_id: &str,
        airline: &str,
        question_count: usize,
    ) -> Result<InterviewSession> {
        let room = self.require_room(room_id)?;
        if room.status != RoomStatus::InProgress {
            return Err(Error::InvalidOperation(
                "start the room session before the interview".into(),
            ));
        }

        let questions = airline_questions(airline, question_count);
        self.manager.set_questions(room_id, questions)?;

        let session = InterviewSession {
            airline: airline.to_string(),
            question_count,
            started_at: Utc::now(),
            completed: false,
        };

        // set_questions rewrote the room row; reload before writing settings
        let mut room = self.require_room(room_id)?;
        self.store_key(&mut room, SESSION_KEY, serde_json::to_value(&session)?)?;

        // Everyone starts from a zeroed scoreboard
        let scores = self.manager.database().scores();
        scores.clear_room(room_id)?;
        for member in self.manager.get_participants(room_id)? {
            scores.init(room_id, &member.user_id)?;
        }

        info!(room_id, airline, question_count, "group interview started");
        Ok(session)
    }

    pub fn session(&self, room_id: &str) -> Result<InterviewSession> {
        let room = self.require_room(room_id)?;
        self.session_of(&room)
    }

    /// How far along the interview is, per question
    pub fn progress(&self, room_id: &str) -> Result<InterviewProgress> {
        let room = self.require_room(room_id)?;
        let session = self.session_of(&room)?;
        let members = self.manager.get_participants(room_id)?;

        let mut questions = Vec::with_capacity(room.questions.len());
        for (idx, question) in room.questions.iter().enumerate() {
            let answers = self.manager.get_answers_for_question(room_id, idx)?;
            questions.push(QuestionProgress {
                question_idx: idx,
                question: question.clone(),
                answered_count: answers.len(),
                total_participants: members.len(),
            });
        }

        Ok(InterviewProgress {
            room_id: room_id.to_string(),
            airline: session.airline,
            current_question_idx: room.state.current_question_idx,
            total_questions: room.questions.len(),
            elapsed_secs: (Utc::now() - session.started_at).num_seconds(),
            questions,
            current_speaker_id: room.state.current_speaker_id,
            completed: session.completed,
        })
    }

    /// Who speaks now, on what question, with how much time left
    pub fn current_turn_info(&self, room_id: &str) -> Result<TurnInfo> {
        let room = self.require_room(room_id)?;
        let members = self.manager.get_participants(room_id)?;

        let speaker_name = room.state.current_speaker_id.as_ref().and_then(|id| {
            members
                .iter()
                .find(|m| &m.user_id == id)
                .map(|m| m.user_name.clone())
        });

        let remaining_secs = self.timer_of(&room).and_then(|timer| {
            if timer.active {
                Some((timer.deadline - Utc::now()).num_seconds().max(0))
            } else {
                None
            }
        });

        Ok(TurnInfo {
            current_speaker_id: room.state.current_speaker_id.clone(),
            current_speaker_name: speaker_name,
            current_question: room
                .questions
                .get(room.state.current_question_idx)
                .cloned(),
            current_question_idx: room.state.current_question_idx,
            round_number: room.state.round_number,
            remaining_secs,
        })
    }

    fn timer_of(&self, room: &Room) -> Option<AnswerTimer> {
        room.settings
            .get(TIMER_KEY)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Start (or restart) the countdown for the current answer
    #[instrument(skip(self))]
    pub fn start_answer_timer(
        &self,
        room_id: &str,
        user_id: &str,
        duration_secs: i64,
    ) -> Result<AnswerTimer> {
        let mut room = self.require_room(room_id)?;
        let started_at = Utc::now();
        let timer = AnswerTimer {
            user_id: user_id.to_string(),
            duration_secs,
            started_at,
            deadline: started_at + Duration::seconds(duration_secs),
            active: true,
        };
        self.store_key(&mut room, TIMER_KEY, serde_json::to_value(&timer)?)?;
        Ok(timer)
    }

    /// Poll the countdown. Crossing the deadline flips the stored
    /// timer inactive so expiry is reported exactly once.
    pub fn check_timer(&self, room_id: &str) -> Result<TimerStatus> {
        let mut room = self.require_room(room_id)?;
        let Some(mut timer) = self.timer_of(&room) else {
            return Ok(TimerStatus::Inactive);
        };
        if !timer.active {
            return Ok(TimerStatus::Inactive);
        }

        let remaining = (timer.deadline - Utc::now()).num_seconds();
        if remaining <= 0 {
            timer.active = false;
            let user_id = timer.user_id.clone();
            self.store_key(&mut room, TIMER_KEY, serde_json::to_value(&timer)?)?;
            return Ok(TimerStatus::Expired { user_id });
        }

        Ok(TimerStatus::Running {
            user_id: timer.user_id.clone(),
            remaining_secs: remaining,
        })
    }

    /// Give up the current turn. Only the current speaker may skip.
    #[instrument(skip(self))]
    pub fn skip_turn(&self, room_id: &str, user_id: &str) -> Result<Option<String>> {
        let mut room = self.require_room(room_id)?;
        if room.state.current_speaker_id.as_deref() != Some(user_id) {
            return Err(Error::InvalidOperation(
                "only the current speaker may skip their turn".into(),
            ));
        }

        if let Some(mut timer) = self.timer_of(&room) {
            timer.active = false;
            self.store_key(&mut room, TIMER_KEY, serde_json::to_value(&timer)?)?;
        }

        Ok(self.manager.next_turn(room_id)?)
    }

    /// Add judge points to one member's running score
    #[instrument(skip(self))]
    pub fn update_live_score(
        &self,
        room_id: &str,
        user_id: &str,
        category: ScoreCategory,
        points: f64,
    ) -> Result<LiveScore> {
        self.require_room(room_id)?;
        // Only members accumulate scores
        self.manager
            .get_participants(room_id)?
            .iter()
            .find(|m| m.user_id == user_id)
            .ok_or_else(|| Error::InvalidOperation(format!("user is not in this room: {user_id}")))?;

        Ok(self
            .manager
            .database()
            .scores()
            .bump(room_id, user_id, category, points)?)
    }

    /// Current standings by total live score, highest first
    pub fn leaderboard(&self, room_id: &str) -> Result<Vec<RankEntry>> {
        let members = self.manager.get_participants(room_id)?;
        let scores = self.manager.database().scores().list_for_room(room_id)?;

        let mut entries: Vec<RankEntry> = members
            .iter()
            .map(|m| {
                let total = scores
                    .iter()
                    .find(|(id, _)| id == &m.user_id)
                    .map(|(_, s)| s.total())
                    .unwrap_or(0.0);
                RankEntry {
                    user_id: m.user_id.clone(),
                    user_name: m.user_name.clone(),
                    score: total,
                    rank: 0,
                }
            })
            .collect();

        entries.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        for (i, entry) in entries.iter_mut().enumerate() {
            entry.rank = i + 1;
        }
        Ok(entries)
    }

    /// Per-category breakdown for every member
    pub fn score_comparison(&self, room_id: &str) -> Result<Vec<(String, LiveScore)>> {
        self.require_room(room_id)?;
        Ok(self.manager.database().scores().list_for_room(room_id)?)
    }

    /// Mark the interview finished and return the final standings
    #[instrument(skip(self))]
    pub fn complete_interview(&self, room_id: &str) -> Result<Vec<RankEntry>> {
        let mut room = self.require_room(room_id)?;
        let mut session = self.session_of(&room)?;
        session.completed = true;
        self.store_key(&mut room, SESSION_KEY, serde_json::to_value(&session)?)?;
        // Timer is meaningless once the interview is over
        self.store_key(&mut room, TIMER_KEY, json!(null))?;

        self.leaderboard(room_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crewroom_core::RoomType;

    fn started_room(mgr: &RoomManager) -> String {
        let room = mgr
            .create_room("h1", "Host", "Practice", RoomType::GroupInterview, 4, None)
            .unwrap();
        mgr.join_room(&room.room_id, "u2", "User2").unwrap();
        mgr.start_session(&room.room_id, "h1").unwrap();
        room.room_id
    }

    #[test]
    fn interview_requires_running_session() {
        let mgr = RoomManager::open_in_memory().unwrap();
        let room = mgr
            .create_room("h1", "Host", "Idle", RoomType::GroupInterview, 4, None)
            .unwrap();

        let svc = InterviewService::new(&mgr);
        assert!(matches!(
            svc.start_group_interview(&room.room_id, "korean_air", 3),
            Err(Error::InvalidOperation(_))
        ));
    }

    #[test]
    fn starting_seeds_questions_and_scoreboard() {
        let mgr = RoomManager::open_in_memory().unwrap();
        let room_id = started_room(&mgr);
        let svc = InterviewService::new(&mgr);

        svc.start_group_interview(&room_id, "korean_air", 3).unwrap();

        let room = mgr.get_room(&room_id).unwrap().unwrap();
        assert_eq!(room.questions.len(), 3);

        let board = svc.leaderboard(&room_id).unwrap();
        assert_eq!(board.len(), 2);
        assert!(board.iter().all(|e| e.score == 0.0));
    }

    #[test]
    fn progress_counts_answers_per_question() {
        let mgr = RoomManager::open_in_memory().unwrap();
        let room_id = started_room(&mgr);
        let svc = InterviewService::new(&mgr);
        svc.start_group_interview(&room_id, "asiana", 2).unwrap();

        mgr.submit_answer(&room_id, "h1", "my answer", None).unwrap();

        let progress = svc.progress(&room_id).unwrap();
        assert_eq!(progress.total_questions, 2);
        assert_eq!(progress.questions[0].answered_count, 1);
        assert_eq!(progress.questions[1].answered_count, 0);
        assert!(!progress.completed);
    }

    #[test]
    fn live_scores_rank_the_leaderboard() {
        let mgr = RoomManager::open_in_memory().unwrap();
        let room_id = started_room(&mgr);
        let svc = InterviewService::new(&mgr);
        svc.start_group_interview(&room_id, "jeju_air", 2).unwrap();

        svc.update_live_score(&room_id, "u2", ScoreCategory::Content, 20.0)
            .unwrap();
        svc.update_live_score(&room_id, "u2", ScoreCategory::Delivery, 10.0)
            .unwrap();
        svc.update_live_score(&room_id, "h1", ScoreCategory::Content, 5.0)
            .unwrap();

        let board = svc.leaderboard(&room_id).unwrap();
        assert_eq!(board[0].user_id, "u2");
        assert_eq!(board[0].score, 30.0);
        assert_eq!(board[0].rank, 1);
        assert_eq!(board[1].rank, 2);
    }

    #[test]
    fn scores_reject_non_members() {
        let mgr = RoomManager::open_in_memory().unwrap();
        let room_id = started_room(&mgr);
        let svc = InterviewService::new(&mgr);

        assert!(svc
            .update_live_score(&room_id, "stranger", ScoreCategory::Content, 5.0)
            .is_err());
    }

    #[test]
    fn timer_runs_then_expires_once() {
        let mgr = RoomManager::open_in_memory().unwrap();
        let room_id = started_room(&mgr);
        let svc = InterviewService::new(&mgr);

        svc.start_answer_timer(&room_id, "h1", 120).unwrap();
        assert!(matches!(
            svc.check_timer(&room_id).unwrap(),
            TimerStatus::Running { remaining_secs, .. } if remaining_secs > 0
        ));

        // Force the deadline into the past
        svc.start_answer_timer(&room_id, "h1", -1).unwrap();
        assert!(matches!(
            svc.check_timer(&room_id).unwrap(),
            TimerStatus::Expired { ref user_id } if user_id == "h1"
        ));
        assert!(matches!(
            svc.check_timer(&room_id).unwrap(),
            TimerStatus::Inactive
        ));
    }

    #[test]
    fn only_the_speaker_may_skip() {
        let mgr = RoomManager::open_in_memory().unwrap();
        let room_id = started_room(&mgr);
        let svc = InterviewService::new(&mgr);

        let speaker = mgr
            .get_room(&room_id)
            .unwrap()
            .unwrap()
            .state
            .current_speaker_id
            .unwrap();
        let other = if speaker == "h1" { "u2" } else { "h1" };

        assert!(svc.skip_turn(&room_id, other).is_err());
        let next = svc.skip_turn(&room_id, &speaker).unwrap().unwrap();
        assert_eq!(next, other);
    }

    #[test]
    fn completing_freezes_the_session() {
        let mgr = RoomManager::open_in_memory().unwrap();
        let room_id = started_room(&mgr);
        let svc = InterviewService::new(&mgr);
        svc.start_group_interview(&room_id, "korean_air", 2).unwrap();

        let standings = svc.complete_interview(&room_id).unwrap();
        assert_eq!(standings.len(), 2);
        assert!(svc.session(&room_id).unwrap().completed);
    }
}
