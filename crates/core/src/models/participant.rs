//! Participant models

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::EnumParseError;

/// Readiness / speaking state of a room member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantStatus {
    Ready,
    NotReady,
    Answering,
    Waiting,
}

impl ParticipantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantStatus::Ready => "ready",
            ParticipantStatus::NotReady => "not_ready",
            ParticipantStatus::Answering => "answering",
            ParticipantStatus::Waiting => "waiting",
        }
    }
}

impl FromStr for ParticipantStatus {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ready" => Ok(ParticipantStatus::Ready),
            "not_ready" => Ok(ParticipantStatus::NotReady),
            "answering" => Ok(ParticipantStatus::Answering),
            "waiting" => Ok(ParticipantStatus::Waiting),
            other => Err(EnumParseError::new("participant status", other)),
        }
    }
}

/// Debate team assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebateSide {
    Pro,
    Con,
}

impl DebateSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            DebateSide::Pro => "pro",
            DebateSide::Con => "con",
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            DebateSide::Pro => DebateSide::Con,
            DebateSide::Con => DebateSide::Pro,
        }
    }
}

impl FromStr for DebateSide {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pro" => Ok(DebateSide::Pro),
            "con" => Ok(DebateSide::Con),
            other => Err(EnumParseError::new("debate side", other)),
        }
    }
}

/// A user's membership in a room.
///
/// Insertion order is preserved by the store (`position` column) and
/// drives both default turn assignment and host promotion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: String,
    pub user_name: String,
    pub status: ParticipantStatus,
    pub joined_at: DateTime<Utc>,
    pub side: Option<DebateSide>,
}

impl Participant {
    pub fn new(user_id: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            user_name: user_name.into(),
            status: ParticipantStatus::NotReady,
            joined_at: Utc::now(),
            side: None,
        }
    }

    pub fn ready(mut self) -> Self {
        self.status = ParticipantStatus::Ready;
        self
    }
}
