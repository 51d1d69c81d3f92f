//! Per-room-type settings templates
//!
//! Every room starts from the template for its type; hosts can then
//! override individual keys. Settings stay a free-form JSON map so
//! experience layers can stash their own keys without schema churn.

use serde_json::{json, Map, Value};

use crate::models::RoomType;

/// Default maximum participants suggested for a room type
pub fn default_max_participants(room_type: RoomType) -> usize {
    match room_type {
        RoomType::GroupInterview => 4,
        RoomType::Debate | RoomType::StudyGroup => 6,
    }
}

/// Build the seed settings map for a room type
pub fn settings_template(room_type: RoomType) -> Map<String, Value> {
    let value = match room_type {
        RoomType::GroupInterview => json!({
            "turn_based": true,
            "time_limit_per_answer": 120,
            "max_questions": 5,
            "allow_feedback": true,
            "show_other_answers": true,
        }),
        RoomType::Debate => json!({
            "pro_con_sides": true,
            "rebuttal_rounds": 2,
            "time_limit_per_turn": 180,
            "opening_statement_time": 60,
            "closing_statement_time": 60,
        }),
        RoomType::StudyGroup => json!({
            "free_discussion": true,
            "shared_resources": true,
            "voice_enabled": true,
            "screen_share_enabled": true,
            "note_sharing": true,
        }),
    };

    match value {
        Value::Object(map) => map,
        _ => unreachable!("templates are object literals"),
    }
}

/// Seed settings for a room type, with caller overrides applied on top
pub fn seeded_settings(room_type: RoomType, overrides: Option<Map<String, Value>>) -> Map<String, Value> {
    let mut settings = settings_template(room_type);
    if let Some(overrides) = overrides {
        for (key, value) in overrides {
            settings.insert(key, value);
        }
    }
    settings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interview_template_has_turn_limits() {
        let settings = settings_template(RoomType::GroupInterview);
        assert_eq!(settings["time_limit_per_answer"], 120);
        assert_eq!(settings["max_questions"], 5);
    }

    #[test]
    fn overrides_win_over_template() {
        let mut overrides = Map::new();
        overrides.insert("time_limit_per_answer".into(), json!(90));
        overrides.insert("custom_key".into(), json!("x"));

        let settings = seeded_settings(RoomType::GroupInterview, Some(overrides));
        assert_eq!(settings["time_limit_per_answer"], 90);
        assert_eq!(settings["custom_key"], "x");
        assert_eq!(settings["max_questions"], 5);
    }
}
