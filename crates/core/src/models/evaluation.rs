//! Peer evaluation models

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::EnumParseError;

/// Per-category peer scores, each capped at 25 for a total out of 100
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CategoryScores {
    pub content: f64,
    pub delivery: f64,
    pub attitude: f64,
    pub structure: f64,
}

/// Maximum score per evaluation category
pub const CATEGORY_MAX: f64 = 25.0;

impl CategoryScores {
    pub fn total(&self) -> f64 {
        self.content + self.delivery + self.attitude + self.structure
    }

    /// True when every category is within `0..=CATEGORY_MAX`
    pub fn in_bounds(&self) -> bool {
        [self.content, self.delivery, self.attitude, self.structure]
            .iter()
            .all(|s| (0.0..=CATEGORY_MAX).contains(s))
    }
}

/// One participant's scored review of another's session performance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerEvaluation {
    pub id: Uuid,
    pub room_id: String,
    pub evaluator_id: String,
    pub target_id: String,
    pub question_idx: usize,
    pub scores: CategoryScores,
    pub feedback: String,
    pub created_at: DateTime<Utc>,
}

impl PeerEvaluation {
    pub fn new(
        room_id: impl Into<String>,
        evaluator_id: impl Into<String>,
        target_id: impl Into<String>,
        question_idx: usize,
        scores: CategoryScores,
        feedback: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_id: room_id.into(),
            evaluator_id: evaluator_id.into(),
            target_id: target_id.into(),
            question_idx,
            scores,
            feedback: feedback.into(),
            created_at: Utc::now(),
        }
    }
}

/// Quick emoji reactions exchanged between peers after a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerReactionKind {
    Like,
    Amazing,
    Confident,
    Creative,
    Empathy,
}

impl PeerReactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeerReactionKind::Like => "like",
            PeerReactionKind::Amazing => "amazing",
            PeerReactionKind::Confident => "confident",
            PeerReactionKind::Creative => "creative",
            PeerReactionKind::Empathy => "empathy",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            PeerReactionKind::Like => "👍",
            PeerReactionKind::Amazing => "👏",
            PeerReactionKind::Confident => "💪",
            PeerReactionKind::Creative => "💡",
            PeerReactionKind::Empathy => "❤️",
        }
    }
}

impl FromStr for PeerReactionKind {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(PeerReactionKind::Like),
            "amazing" => Ok(PeerReactionKind::Amazing),
            "confident" => Ok(PeerReactionKind::Confident),
            "creative" => Ok(PeerReactionKind::Creative),
            "empathy" => Ok(PeerReactionKind::Empathy),
            other => Err(EnumParseError::new("peer reaction", other)),
        }
    }
}

/// A peer reaction record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerReaction {
    pub id: Uuid,
    pub room_id: String,
    pub sender_id: String,
    pub target_id: String,
    pub kind: PeerReactionKind,
    pub created_at: DateTime<Utc>,
}

impl PeerReaction {
    pub fn new(
        room_id: impl Into<String>,
        sender_id: impl Into<String>,
        target_id: impl Into<String>,
        kind: PeerReactionKind,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_id: room_id.into(),
            sender_id: sender_id.into(),
            target_id: target_id.into(),
            kind,
            created_at: Utc::now(),
        }
    }
}
