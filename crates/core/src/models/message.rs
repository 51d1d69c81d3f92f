//! Chat message model

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::EnumParseError;

/// What a message entry represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Chat,
    System,
    Reaction,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Chat => "chat",
            MessageKind::System => "system",
            MessageKind::Reaction => "reaction",
        }
    }
}

impl FromStr for MessageKind {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chat" => Ok(MessageKind::Chat),
            "system" => Ok(MessageKind::System),
            "reaction" => Ok(MessageKind::Reaction),
            other => Err(EnumParseError::new("message kind", other)),
        }
    }
}

/// In-room reaction vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reaction {
    ThumbsUp,
    Clap,
    Heart,
    Fire,
    Thinking,
}

impl Reaction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reaction::ThumbsUp => "thumbs_up",
            Reaction::Clap => "clap",
            Reaction::Heart => "heart",
            Reaction::Fire => "fire",
            Reaction::Thinking => "thinking",
        }
    }

    pub fn all() -> &'static [Reaction] {
        &[
            Reaction::ThumbsUp,
            Reaction::Clap,
            Reaction::Heart,
            Reaction::Fire,
            Reaction::Thinking,
        ]
    }
}

impl FromStr for Reaction {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "thumbs_up" => Ok(Reaction::ThumbsUp),
            "clap" => Ok(Reaction::Clap),
            "heart" => Ok(Reaction::Heart),
            "fire" => Ok(Reaction::Fire),
            "thinking" => Ok(Reaction::Thinking),
            other => Err(EnumParseError::new("reaction", other)),
        }
    }
}

/// Sender id used for system-generated messages
pub const SYSTEM_USER_ID: &str = "system";

/// One entry in a room's message stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub room_id: String,
    pub user_id: String,
    pub user_name: String,
    pub body: String,
    pub kind: MessageKind,
    pub target_user_id: Option<String>,
    pub reaction: Option<Reaction>,
    pub sent_at: DateTime<Utc>,
}

impl Message {
    pub fn chat(
        room_id: impl Into<String>,
        user_id: impl Into<String>,
        user_name: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_id: room_id.into(),
            user_id: user_id.into(),
            user_name: user_name.into(),
            body: body.into(),
            kind: MessageKind::Chat,
            target_user_id: None,
            reaction: None,
            sent_at: Utc::now(),
        }
    }

    pub fn system(room_id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_id: room_id.into(),
            user_id: SYSTEM_USER_ID.to_string(),
            user_name: SYSTEM_USER_ID.to_string(),
            body: body.into(),
            kind: MessageKind::System,
            target_user_id: None,
            reaction: None,
            sent_at: Utc::now(),
        }
    }

    pub fn reaction(
        room_id: impl Into<String>,
        user_id: impl Into<String>,
        user_name: impl Into<String>,
        target_user_id: impl Into<String>,
        reaction: Reaction,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_id: room_id.into(),
            user_id: user_id.into(),
            user_name: user_name.into(),
            body: body.into(),
            kind: MessageKind::Reaction,
            target_user_id: Some(target_user_id.into()),
            reaction: Some(reaction),
            sent_at: Utc::now(),
        }
    }
}
