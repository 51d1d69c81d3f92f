//! Answer model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One submitted answer, tagged with the question it answered.
///
/// Answers are append-only; there is no update or delete operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub user_id: String,
    pub user_name: String,
    pub question_idx: usize,
    pub answer_text: String,
    /// Base64-encoded audio recording, when one was captured
    pub audio_data: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

impl Answer {
    pub fn new(
        user_id: impl Into<String>,
        user_name: impl Into<String>,
        question_idx: usize,
        answer_text: impl Into<String>,
        audio_data: Option<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            user_name: user_name.into(),
            question_idx,
            answer_text: answer_text.into(),
            audio_data,
            submitted_at: Utc::now(),
        }
    }
}
