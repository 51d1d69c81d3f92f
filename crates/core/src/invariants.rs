//! Developer guardrails and invariants
//!
//! Debug assertions for detecting impossible states during development.
//! These checks are compiled out in release builds.

use crate::models::{Participant, ParticipantStatus, Room, RoomStatus};

/// Validate that a Room's state is internally consistent
pub fn assert_room_invariants(room: &Room) {
    debug_assert!(
        !room.room_name.trim().is_empty(),
        "Room {} has empty name",
        room.room_id
    );

    debug_assert!(
        room.room_id.len() == 6 && room.room_id.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()),
        "Room id {} is not a 6-character uppercase code",
        room.room_id
    );

    // A speaker only exists while a session is running
    debug_assert!(
        !(room.status == RoomStatus::Waiting && room.state.current_speaker_id.is_some()),
        "Room {} is waiting but has speaker {:?}",
        room.room_id,
        room.state.current_speaker_id
    );

    // The turn cursor must stay inside the frozen order
    debug_assert!(
        room.state.turn_order.is_empty() || room.state.current_turn_idx < room.state.turn_order.len(),
        "Room {} turn index {} out of range for order of {}",
        room.room_id,
        room.state.current_turn_idx,
        room.state.turn_order.len()
    );

    debug_assert!(
        room.state.round_number >= 1,
        "Room {} has round number 0",
        room.room_id
    );
}

/// Validate that a member list is consistent with its room
pub fn assert_member_list_invariants(members: &[Participant], room: &Room) {
    debug_assert!(
        members.len() <= room.max_participants,
        "Room {} has {} members over capacity {}",
        room.room_id,
        members.len(),
        room.max_participants
    );

    // At most one member answers at a time
    let answering = members
        .iter()
        .filter(|m| m.status == ParticipantStatus::Answering)
        .count();
    debug_assert!(
        answering <= 1,
        "Room {} has {} answering members, expected 0 or 1",
        room.room_id,
        answering
    );

    // The host must be a member while anyone remains
    debug_assert!(
        members.is_empty() || members.iter().any(|m| m.user_id == room.host_id),
        "Room {} host {} is not a member",
        room.room_id,
        room.host_id
    );

    // The recorded speaker must be the one answering
    if let Some(speaker_id) = &room.state.current_speaker_id {
        let speaker_answering = members
            .iter()
            .any(|m| &m.user_id == speaker_id && m.status == ParticipantStatus::Answering);
        debug_assert!(
            !members.iter().any(|m| &m.user_id == speaker_id) || speaker_answering,
            "Room {} speaker {} is a member but not answering",
            room.room_id,
            speaker_id
        );
    }
}

/// Validate that a frozen turn order came from the given member set
pub fn assert_turn_order_origin(turn_order: &[String], members: &[Participant]) {
    let mut sorted = turn_order.to_vec();
    sorted.sort();
    sorted.dedup();
    debug_assert!(
        sorted.len() == turn_order.len(),
        "Turn order contains duplicate ids"
    );

    for id in turn_order {
        debug_assert!(
            members.iter().any(|m| &m.user_id == id),
            "Turn order id {} was never a member",
            id
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RoomType;

    fn make_room() -> Room {
        Room::new(
            "AB12CD".to_string(),
            "Test Room".to_string(),
            "h1".to_string(),
            RoomType::GroupInterview,
            4,
            serde_json::Map::new(),
        )
    }

    #[test]
    fn fresh_room_is_valid() {
        assert_room_invariants(&make_room());
    }

    #[test]
    fn member_list_with_host_is_valid() {
        let room = make_room();
        let members = vec![Participant::new("h1", "Host").ready()];
        assert_member_list_invariants(&members, &room);
    }

    #[test]
    #[should_panic(expected = "not a member")]
    fn missing_host_is_caught() {
        let room = make_room();
        let members = vec![Participant::new("u2", "User2")];
        assert_member_list_invariants(&members, &room);
    }

    #[test]
    #[should_panic(expected = "duplicate")]
    fn duplicate_turn_order_is_caught() {
        let members = vec![Participant::new("u1", "One")];
        assert_turn_order_origin(&["u1".to_string(), "u1".to_string()], &members);
    }
}
