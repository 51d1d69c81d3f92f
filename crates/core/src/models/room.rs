//! Room model - the core session unit

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::EnumParseError;

/// Kind of session a room hosts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomType {
    GroupInterview,
    Debate,
    StudyGroup,
}

impl RoomType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomType::GroupInterview => "group_interview",
            RoomType::Debate => "debate",
            RoomType::StudyGroup => "study_group",
        }
    }
}

impl FromStr for RoomType {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "group_interview" => Ok(RoomType::GroupInterview),
            "debate" => Ok(RoomType::Debate),
            "study_group" => Ok(RoomType::StudyGroup),
            other => Err(EnumParseError::new("room type", other)),
        }
    }
}

impl std::fmt::Display for RoomType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse room lifecycle status.
///
/// Monotonic: once a room leaves `Waiting` it never returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Waiting,
    InProgress,
    Completed,
}

impl RoomStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomStatus::Waiting => "waiting",
            RoomStatus::InProgress => "in_progress",
            RoomStatus::Completed => "completed",
        }
    }
}

impl FromStr for RoomStatus {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(RoomStatus::Waiting),
            "in_progress" => Ok(RoomStatus::InProgress),
            "completed" => Ok(RoomStatus::Completed),
            other => Err(EnumParseError::new("room status", other)),
        }
    }
}

/// Activity sub-state of an in-progress room, finer than [`RoomStatus`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Waiting,
    Questioning,
    Answering,
    Reviewing,
    Completed,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Waiting => "waiting",
            Phase::Questioning => "questioning",
            Phase::Answering => "answering",
            Phase::Reviewing => "reviewing",
            Phase::Completed => "completed",
        }
    }
}

impl FromStr for Phase {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(Phase::Waiting),
            "questioning" => Ok(Phase::Questioning),
            "answering" => Ok(Phase::Answering),
            "reviewing" => Ok(Phase::Reviewing),
            "completed" => Ok(Phase::Completed),
            other => Err(EnumParseError::new("phase", other)),
        }
    }
}

impl Default for Phase {
    fn default() -> Self {
        Phase::Waiting
    }
}

/// Session progress embedded in a room.
///
/// `turn_order` is frozen at session start and never compacted;
/// turn advancement filters it against current membership instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomState {
    pub current_question_idx: usize,
    pub current_speaker_id: Option<String>,
    pub turn_order: Vec<String>,
    pub current_turn_idx: usize,
    pub round_number: u32,
    pub phase: Phase,
}

impl Default for RoomState {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomState {
    pub fn new() -> Self {
        Self {
            current_question_idx: 0,
            current_speaker_id: None,
            turn_order: Vec::new(),
            current_turn_idx: 0,
            round_number: 1,
            phase: Phase::Waiting,
        }
    }
}

/// A single interview/debate/study session container.
///
/// Participants and answers live in their own tables and are loaded
/// through the stores; the room row carries identity, settings, the
/// question list, and the embedded session state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    /// 6-character uppercase alphanumeric join code
    pub room_id: String,
    pub room_name: String,
    pub host_id: String,
    pub room_type: RoomType,
    pub max_participants: usize,
    pub status: RoomStatus,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    /// Free-form settings seeded from a per-room-type template
    pub settings: Map<String, Value>,
    pub questions: Vec<String>,
    pub state: RoomState,
}

impl Room {
    pub fn new(
        room_id: String,
        room_name: String,
        host_id: String,
        room_type: RoomType,
        max_participants: usize,
        settings: Map<String, Value>,
    ) -> Self {
        let now = Utc::now();
        Self {
            room_id,
            room_name,
            host_id,
            room_type,
            max_participants,
            status: RoomStatus::Waiting,
            created_at: now,
            last_activity: now,
            settings,
            questions: Vec::new(),
            state: RoomState::new(),
        }
    }
}

/// Public listing entry for joinable rooms
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSummary {
    pub room_id: String,
    pub room_name: String,
    pub room_type: RoomType,
    pub host_id: String,
    pub current_participants: usize,
    pub max_participants: usize,
    pub created_at: DateTime<Utc>,
}

impl RoomSummary {
    pub fn of(room: &Room, current_participants: usize) -> Self {
        Self {
            room_id: room.room_id.clone(),
            room_name: room.room_name.clone(),
            room_type: room.room_type,
            host_id: room.host_id.clone(),
            current_participants,
            max_participants: room.max_participants,
            created_at: room.created_at,
        }
    }
}

/// Session state joined with its question context, for status polling
#[derive(Debug, Clone, Serialize)]
pub struct RoomStateSnapshot {
    pub state: RoomState,
    pub room_status: RoomStatus,
    pub current_question: Option<String>,
    pub total_questions: usize,
    pub participant_count: usize,
}
