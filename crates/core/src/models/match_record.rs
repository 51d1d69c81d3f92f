//! Completed-match models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::RoomType;

/// Final standing of one participant in a saved match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchStanding {
    pub user_id: String,
    pub user_name: String,
    pub score: f64,
    pub rank: usize,
}

/// A finished session archived to the match log.
///
/// Standings are stored as a JSON column; matches outlive the room
/// they came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: Uuid,
    pub room_id: String,
    pub room_name: String,
    pub room_type: RoomType,
    pub standings: Vec<MatchStanding>,
    pub winner_id: Option<String>,
    pub finished_at: DateTime<Utc>,
}

impl MatchRecord {
    pub fn new(
        room_id: impl Into<String>,
        room_name: impl Into<String>,
        room_type: RoomType,
        standings: Vec<MatchStanding>,
    ) -> Self {
        let winner_id = standings.first().map(|s| s.user_id.clone());
        Self {
            id: Uuid::new_v4(),
            room_id: room_id.into(),
            room_name: room_name.into(),
            room_type,
            standings,
            winner_id,
            finished_at: Utc::now(),
        }
    }
}

/// Accumulated live scores for one participant during a session
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LiveScore {
    pub content: f64,
    pub structure: f64,
    pub delivery: f64,
    pub relevance: f64,
}

impl LiveScore {
    pub fn total(&self) -> f64 {
        self.content + self.structure + self.delivery + self.relevance
    }
}

/// Live-score category a judge can bump
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreCategory {
    Content,
    Structure,
    Delivery,
    Relevance,
}

impl ScoreCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreCategory::Content => "content",
            ScoreCategory::Structure => "structure",
            ScoreCategory::Delivery => "delivery",
            ScoreCategory::Relevance => "relevance",
        }
    }
}
