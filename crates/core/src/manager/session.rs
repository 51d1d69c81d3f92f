//! Session flow: turn order, question progression, answers

use std::collections::HashSet;

use rand::seq::SliceRandom;
use tracing::{info, instrument};

use crate::error::{Error, Result};
use crate::events::RoomEvent;
use crate::models::{
    Answer, Message, Participant, ParticipantStatus, Phase, Room, RoomStateSnapshot, RoomStatus,
};
use crate::storage::ParticipantStore;

use super::RoomManager;

impl RoomManager {
    /// Start the session: freeze a shuffled turn order and hand the
    /// first turn out. Host only, at least two members.
    #[instrument(skip(self))]
    pub fn start_session(&self, room_id: &str, host_id: &str) -> Result<Room> {
        let mut room = self.require_room(room_id)?;
        self.require_host(&room, host_id)?;
        if room.status != RoomStatus::Waiting {
            return Err(Error::InvalidOperation(
                "session has already started".into(),
            ));
        }

        let members = self.db.participants().list_for_room(room_id)?;
        if members.len() < super::MIN_PARTICIPANTS {
            return Err(Error::InvalidOperation(format!(
                "need at least {} participants to start, have {}",
                super::MIN_PARTICIPANTS,
                members.len()
            )));
        }

        let mut order: Vec<String> = members.iter().map(|p| p.user_id.clone()).collect();
        order.shuffle(&mut rand::thread_rng());

        room.status = RoomStatus::InProgress;
        room.state.phase = Phase::Questioning;
        room.state.turn_order = order;
        room.state.current_turn_idx = 0;
        room.state.current_question_idx = 0;
        room.state.round_number = 1;
        self.touch(&mut room);

        let tx = self.db.transaction()?;
        let participants = ParticipantStore::new(&tx);
        let speaker = Self::seat_speaker_at(&mut room, &participants, &members, 0)?;
        crate::storage::RoomStore::new(&tx).update(&room)?;
        crate::storage::MessageStore::new(&tx)
            .append(&Message::system(room_id, "session started"))?;
        tx.commit()?;

        self.events.publish(
            room_id,
            RoomEvent::StatusChanged {
                status: RoomStatus::InProgress,
            },
        );
        self.events.publish(
            room_id,
            RoomEvent::PhaseChanged {
                phase: Phase::Questioning,
            },
        );
        self.events.publish(
            room_id,
            RoomEvent::SpeakerChanged {
                user_id: speaker,
                round_number: room.state.round_number,
            },
        );

        info!(room_id, "session started");
        Ok(room)
    }

    /// Close out an in-progress session. Host only.
    #[instrument(skip(self))]
    pub fn end_session(&self, room_id: &str, host_id: &str) -> Result<Room> {
        let mut room = self.require_room(room_id)?;
        self.require_host(&room, host_id)?;
        if room.status != RoomStatus::InProgress {
            return Err(Error::InvalidOperation("no session in progress".into()));
        }

        room.status = RoomStatus::Completed;
        room.state.phase = Phase::Completed;
        room.state.current_speaker_id = None;
        self.touch(&mut room);

        let tx = self.db.transaction()?;
        ParticipantStore::new(&tx).set_all_status(room_id, ParticipantStatus::Waiting)?;
        crate::storage::RoomStore::new(&tx).update(&room)?;
        crate::storage::MessageStore::new(&tx)
            .append(&Message::system(room_id, "session ended"))?;
        tx.commit()?;

        self.events.publish(
            room_id,
            RoomEvent::StatusChanged {
                status: RoomStatus::Completed,
            },
        );
        self.events.publish(
            room_id,
            RoomEvent::PhaseChanged {
                phase: Phase::Completed,
            },
        );
        Ok(room)
    }

    /// Replace the question list and rewind to the first question
    #[instrument(skip(self, questions))]
    pub fn set_questions(&self, room_id: &str, questions: Vec<String>) -> Result<()> {
        let mut room = self.require_room(room_id)?;
        room.questions = questions;
        room.state.current_question_idx = 0;
        self.touch(&mut room);
        self.db.rooms().update(&room)?;
        Ok(())
    }

    pub fn get_current_question(&self, room_id: &str) -> Result<Option<String>> {
        let room = self.require_room(room_id)?;
        Ok(room
            .questions
            .get(room.state.current_question_idx)
            .cloned())
    }

    /// Advance to the next question and restart the turn cycle at the
    /// top of the order. Returns None once the list is exhausted, which
    /// moves the room into the reviewing phase.
    #[instrument(skip(self))]
    pub fn next_question(&self, room_id: &str) -> Result<Option<String>> {
        let mut room = self.require_room(room_id)?;
        let next_idx = room.state.current_question_idx + 1;

        if next_idx >= room.questions.len() {
            room.state.phase = Phase::Reviewing;
            room.state.current_speaker_id = None;
            self.touch(&mut room);

            let tx = self.db.transaction()?;
            ParticipantStore::new(&tx).set_all_status(room_id, ParticipantStatus::Waiting)?;
            crate::storage::RoomStore::new(&tx).update(&room)?;
            tx.commit()?;

            self.events.publish(
                room_id,
                RoomEvent::PhaseChanged {
                    phase: Phase::Reviewing,
                },
            );
            return Ok(None);
        }

        room.state.current_question_idx = next_idx;
        self.touch(&mut room);

        let tx = self.db.transaction()?;
        let participants = ParticipantStore::new(&tx);
        let members = participants.list_for_room(room_id)?;
        let speaker = Self::seat_speaker_at(&mut room, &participants, &members, 0)?;
        crate::storage::RoomStore::new(&tx).update(&room)?;
        tx.commit()?;

        self.events.publish(
            room_id,
            RoomEvent::QuestionAdvanced {
                question_idx: next_idx,
            },
        );
        self.events.publish(
            room_id,
            RoomEvent::SpeakerChanged {
                user_id: speaker,
                round_number: room.state.round_number,
            },
        );

        Ok(room.questions.get(next_idx).cloned())
    }

    /// Pass the turn to the next member still in the room. A full trip
    /// through the order bumps the round number. Returns the new
    /// speaker, or None when nobody from the order remains.
    #[instrument(skip(self))]
    pub fn next_turn(&self, room_id: &str) -> Result<Option<String>> {
        let mut room = self.require_room(room_id)?;
        if room.state.turn_order.is_empty() {
            return Err(Error::InvalidOperation(
                "no turn order; session has not started".into(),
            ));
        }

        self.touch(&mut room);
        let tx = self.db.transaction()?;
        let participants = ParticipantStore::new(&tx);
        let members = participants.list_for_room(room_id)?;
        let speaker = Self::advance_speaker(&mut room, &participants, &members)?;
        crate::storage::RoomStore::new(&tx).update(&room)?;
        tx.commit()?;

        self.events.publish(
            room_id,
            RoomEvent::SpeakerChanged {
                user_id: speaker.clone(),
                round_number: room.state.round_number,
            },
        );
        Ok(speaker)
    }

    /// Append an answer tagged with the current question
    #[instrument(skip(self, answer_text, audio_data))]
    pub fn submit_answer(
        &self,
        room_id: &str,
        user_id: &str,
        answer_text: &str,
        audio_data: Option<String>,
    ) -> Result<Answer> {
        let mut room = self.require_room(room_id)?;
        let member = self.require_member(room_id, user_id)?;

        if let Some(audio) = &audio_data {
            use base64::Engine as _;
            base64::engine::general_purpose::STANDARD
                .decode(audio)
                .map_err(|_| Error::InvalidOperation("audio payload is not valid base64".into()))?;
        }

        let answer = Answer::new(
            user_id,
            member.user_name,
            room.state.current_question_idx,
            answer_text,
            audio_data,
        );

        self.touch(&mut room);
        let tx = self.db.transaction()?;
        crate::storage::AnswerStore::new(&tx).append(room_id, &answer)?;
        crate::storage::RoomStore::new(&tx).update(&room)?;
        tx.commit()?;

        self.events.publish(
            room_id,
            RoomEvent::AnswerSubmitted {
                user_id: user_id.to_string(),
                question_idx: answer.question_idx,
            },
        );
        Ok(answer)
    }

    /// Every answer submitted in the room so far
    pub fn get_all_answers(&self, room_id: &str) -> Result<Vec<Answer>> {
        self.require_room(room_id)?;
        self.db.answers().list_for_room(room_id)
    }

    /// Answers for one question only
    pub fn get_answers_for_question(
        &self,
        room_id: &str,
        question_idx: usize,
    ) -> Result<Vec<Answer>> {
        self.require_room(room_id)?;
        self.db.answers().list_for_question(room_id, question_idx)
    }

    /// Current session state with the question context attached
    pub fn get_room_state(&self, room_id: &str) -> Result<RoomStateSnapshot> {
        let room = self.require_room(room_id)?;
        let participant_count = self.db.participants().count(room_id)?;
        Ok(RoomStateSnapshot {
            room_status: room.status,
            current_question: room
                .questions
                .get(room.state.current_question_idx)
                .cloned(),
            total_questions: room.questions.len(),
            participant_count,
            state: room.state,
        })
    }

    /// Hand the floor to a chosen member, out of rotation order.
    /// The round counter is untouched; the rotation resumes from the
    /// target's slot when they hold one.
    #[instrument(skip(self))]
    pub fn set_current_speaker(&self, room_id: &str, user_id: &str) -> Result<Room> {
        let mut room = self.require_room(room_id)?;
        self.require_member(room_id, user_id)?;

        let idx = room
            .state
            .turn_order
            .iter()
            .position(|id| id == user_id)
            .unwrap_or(room.state.current_turn_idx);

        self.touch(&mut room);
        let tx = self.db.transaction()?;
        let participants = ParticipantStore::new(&tx);
        Self::seat(&mut room, &participants, Some((idx, user_id.to_string())))?;
        crate::storage::RoomStore::new(&tx).update(&room)?;
        tx.commit()?;

        self.events.publish(
            room_id,
            RoomEvent::SpeakerChanged {
                user_id: Some(user_id.to_string()),
                round_number: room.state.round_number,
            },
        );
        Ok(room)
    }

    /// Move the speaker to the next live member after the current turn
    /// index. The frozen order is never compacted; departed ids are
    /// skipped here instead.
    pub(super) fn advance_speaker(
        room: &mut Room,
        participants: &ParticipantStore<'_>,
        live: &[Participant],
    ) -> Result<Option<String>> {
        let order = room.state.turn_order.clone();
        let n = order.len();
        let live_ids: HashSet<&str> = live.iter().map(|p| p.user_id.as_str()).collect();

        let mut found = None;
        for step in 1..=n {
            let raw = room.state.current_turn_idx + step;
            let idx = raw % n;
            if live_ids.contains(order[idx].as_str()) {
                if raw >= n {
                    room.state.round_number += 1;
                }
                found = Some(idx);
                break;
            }
        }

        Self::seat(room, participants, found.map(|idx| (idx, order[idx].clone())))
    }

    /// Seat the first live member at or after `start` in the order,
    /// without touching the round counter
    pub(super) fn seat_speaker_at(
        room: &mut Room,
        participants: &ParticipantStore<'_>,
        live: &[Participant],
        start: usize,
    ) -> Result<Option<String>> {
        let order = room.state.turn_order.clone();
        let n = order.len();
        let live_ids: HashSet<&str> = live.iter().map(|p| p.user_id.as_str()).collect();

        let found = (0..n)
            .map(|step| (start + step) % n)
            .find(|&idx| live_ids.contains(order[idx].as_str()));

        Self::seat(room, participants, found.map(|idx| (idx, order[idx].clone())))
    }

    fn seat(
        room: &mut Room,
        participants: &ParticipantStore<'_>,
        choice: Option<(usize, String)>,
    ) -> Result<Option<String>> {
        participants.set_all_status(&room.room_id, ParticipantStatus::Waiting)?;
        match choice {
            Some((idx, speaker)) => {
                room.state.current_turn_idx = idx;
                room.state.current_speaker_id = Some(speaker.clone());
                participants.set_status(&room.room_id, &speaker, ParticipantStatus::Answering)?;
                Ok(Some(speaker))
            }
            None => {
                room.state.current_speaker_id = None;
                Ok(None)
            }
        }
    }
}
