//! Pro/con debate experience

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crewroom_core::{DebateSide, Room, RoomManager};

use crate::error::{Error, Result};
use crate::questions::{resolve_topic, DebateTopic};

const DEBATE_KEY: &str = "debate_state";

/// Base score every debater starts from
const BASE_SCORE: f64 = 50.0;
/// Points per argument made
const ARGUMENT_POINTS: f64 = 15.0;
/// Points per rebuttal made
const REBUTTAL_POINTS: f64 = 10.0;
/// Individual scores cap here
const MAX_SCORE: f64 = 100.0;

/// Stage of a running debate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebatePhase {
    Opening,
    Argument,
    Rebuttal,
    Closing,
    Evaluation,
}

/// One statement made during the debate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statement {
    pub user_id: String,
    pub side: DebateSide,
    pub text: String,
    pub phase: DebatePhase,
    pub submitted_at: DateTime<Utc>,
}

/// Full debate state, persisted in the room's settings map so it
/// survives restarts alongside the room itself
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateState {
    pub topic: DebateTopic,
    pub phase: DebatePhase,
    pub positions: HashMap<String, DebateSide>,
    pub arguments: Vec<Statement>,
    pub rebuttals: Vec<Statement>,
    pub current_speaker_id: Option<String>,
    pub turn_order: Vec<String>,
    pub current_turn_idx: usize,
    pub rebuttal_round: u32,
    pub max_rebuttal_rounds: u32,
    pub started_at: DateTime<Utc>,
}

/// Score sheet for one debater
#[derive(Debug, Clone, Serialize)]
pub struct DebaterScore {
    pub user_id: String,
    pub user_name: String,
    pub side: DebateSide,
    pub argument_count: usize,
    pub rebuttal_count: usize,
    pub total_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DebateWinner {
    Pro,
    Con,
    Draw,
}

#[derive(Debug, Clone, Serialize)]
pub struct DebateEvaluation {
    pub topic: String,
    pub winner: DebateWinner,
    pub pro_total: f64,
    pub con_total: f64,
    pub scores: Vec<DebaterScore>,
}

pub struct DebateService<'a> {
    manager: &'a RoomManager,
}

impl<'a> DebateService<'a> {
    pub fn new(manager: &'a RoomManager) -> Self {
        Self { manager }
    }

    fn require_room(&self, room_id: &str) -> Result<Room> {
        Ok(self
            .manager
            .get_room(room_id)?
            .ok_or_else(|| crewroom_core::Error::room_not_found(room_id))?)
    }

    fn state_of(&self, room: &Room) -> Result<DebateState> {
        let value = room
            .settings
            .get(DEBATE_KEY)
            .ok_or_else(|| Error::NoActiveDebate(room.room_id.clone()))?;
        Ok(serde_json::from_value(value.clone())?)
    }

    fn persist(&self, room: &mut Room, state: &DebateState) -> Result<()> {
        room.settings
            .insert(DEBATE_KEY.to_string(), serde_json::to_value(state)?);
        self.manager.database().rooms().update(room)?;
        Ok(())
    }

    /// Open a debate: resolve the topic, record sides, and build a
    /// turn order that alternates pro and con speakers.
    #[instrument(skip(self, positions))]
    pub fn start_debate(
        &self,
        room_id: &str,
        topic: &str,
        positions: HashMap<String, DebateSide>,
    ) -> Result<DebateState> {
        let mut room = self.require_room(room_id)?;
        let members = self.manager.get_participants(room_id)?;

        for user_id in positions.keys() {
            if !members.iter().any(|m| &m.user_id == user_id) {
                return Err(Error::InvalidOperation(format!(
                    "user is not in this room: {user_id}"
                )));
            }
        }
        if positions.is_empty() {
            return Err(Error::InvalidOperation(
                "a debate needs at least one assigned side".into(),
            ));
        }

        // Alternate pro and con, keeping room insertion order inside
        // each team
        let pro: Vec<&String> = members
            .iter()
            .map(|m| &m.user_id)
            .filter(|id| positions.get(*id) == Some(&DebateSide::Pro))
            .collect();
        let con: Vec<&String> = members
            .iter()
            .map(|m| &m.user_id)
            .filter(|id| positions.get(*id) == Some(&DebateSide::Con))
            .collect();

        let mut turn_order = Vec::with_capacity(pro.len() + con.len());
        for i in 0..pro.len().max(con.len()) {
            if let Some(id) = pro.get(i) {
                turn_order.push((*id).clone());
            }
            if let Some(id) = con.get(i) {
                turn_order.push((*id).clone());
            }
        }

        let participants = self.manager.database().participants();
        for (user_id, side) in &positions {
            participants.set_side(room_id, user_id, *side)?;
        }

        let state = DebateState {
            topic: resolve_topic(topic),
            phase: DebatePhase::Opening,
            positions,
            arguments: Vec::new(),
            rebuttals: Vec::new(),
            current_speaker_id: turn_order.first().cloned(),
            turn_order,
            current_turn_idx: 0,
            rebuttal_round: 0,
            max_rebuttal_rounds: 2,
            started_at: Utc::now(),
        };
        self.persist(&mut room, &state)?;

        info!(room_id, topic = %state.topic.topic, "debate started");
        Ok(state)
    }

    pub fn state(&self, room_id: &str) -> Result<DebateState> {
        let room = self.require_room(room_id)?;
        self.state_of(&room)
    }

    /// Submit a statement for the current phase. Only the current
    /// speaker may submit; a full pass of the order advances the phase
    /// ladder (opening, argument, rebuttal rounds, closing, evaluation).
    #[instrument(skip(self, text))]
    pub fn submit_argument(&self, room_id: &str, user_id: &str, text: &str) -> Result<DebateState> {
        let mut room = self.require_room(room_id)?;
        let mut state = self.state_of(&room)?;

        if state.current_speaker_id.as_deref() != Some(user_id) {
            return Err(Error::InvalidOperation(
                "only the current speaker may submit".into(),
            ));
        }

        let members = self.manager.get_participants(room_id)?;
        let live: HashSet<&str> = members.iter().map(|m| m.user_id.as_str()).collect();
        if !live.contains(user_id) {
            return Err(Error::InvalidOperation(format!(
                "user is not in this room: {user_id}"
            )));
        }

        let side = *state
            .positions
            .get(user_id)
            .ok_or_else(|| Error::InvalidOperation("speaker has no assigned side".into()))?;

        let statement = Statement {
            user_id: user_id.to_string(),
            side,
            text: text.to_string(),
            phase: state.phase,
            submitted_at: Utc::now(),
        };
        if state.phase == DebatePhase::Rebuttal {
            state.rebuttals.push(statement);
        } else {
            state.arguments.push(statement);
        }

        Self::advance_turn(&mut state, &live);

        self.persist(&mut room, &state)?;
        Ok(state)
    }

    /// Pass the debate turn to the next debater still in the room.
    /// Unblocks the floor when the current speaker has left.
    #[instrument(skip(self))]
    pub fn skip_turn(&self, room_id: &str) -> Result<DebateState> {
        let mut room = self.require_room(room_id)?;
        let mut state = self.state_of(&room)?;

        let members = self.manager.get_participants(room_id)?;
        let live: HashSet<&str> = members.iter().map(|m| m.user_id.as_str()).collect();
        Self::advance_turn(&mut state, &live);

        self.persist(&mut room, &state)?;
        Ok(state)
    }

    /// Step to the next debater still in the room. The frozen order is
    /// never compacted; departed ids are skipped here. Wrapping the
    /// order completes the phase, same as a submitted statement would.
    fn advance_turn(state: &mut DebateState, live: &HashSet<&str>) {
        let n = state.turn_order.len();
        let mut next = None;
        for step in 1..=n {
            let raw = state.current_turn_idx + step;
            let idx = raw % n;
            if live.contains(state.turn_order[idx].as_str()) {
                next = Some((idx, raw >= n));
                break;
            }
        }
        match next {
            Some((idx, wrapped)) => {
                state.current_turn_idx = idx;
                state.current_speaker_id = Some(state.turn_order[idx].clone());
                if wrapped {
                    Self::advance_phase(state);
                }
            }
            None => state.current_speaker_id = None,
        }
    }

    fn advance_phase(state: &mut DebateState) {
        state.phase = match state.phase {
            DebatePhase::Opening => DebatePhase::Argument,
            DebatePhase::Argument => {
                state.rebuttal_round = 1;
                DebatePhase::Rebuttal
            }
            DebatePhase::Rebuttal => {
                if state.rebuttal_round < state.max_rebuttal_rounds {
                    state.rebuttal_round += 1;
                    DebatePhase::Rebuttal
                } else {
                    DebatePhase::Closing
                }
            }
            DebatePhase::Closing => DebatePhase::Evaluation,
            DebatePhase::Evaluation => DebatePhase::Evaluation,
        };
    }

    /// Jump straight into a fresh rebuttal round from the top of the
    /// order, regardless of current phase
    #[instrument(skip(self))]
    pub fn start_rebuttal_round(&self, room_id: &str) -> Result<DebateState> {
        let mut room = self.require_room(room_id)?;
        let mut state = self.state_of(&room)?;

        state.phase = DebatePhase::Rebuttal;
        state.rebuttal_round += 1;
        state.current_turn_idx = 0;
        state.current_speaker_id = state.turn_order.first().cloned();

        self.persist(&mut room, &state)?;
        Ok(state)
    }

    /// Score the debate: base points plus per-argument and
    /// per-rebuttal credit, capped per debater. Team totals decide
    /// the winner.
    #[instrument(skip(self))]
    pub fn evaluate(&self, room_id: &str) -> Result<DebateEvaluation> {
        let mut room = self.require_room(room_id)?;
        let mut state = self.state_of(&room)?;
        let members = self.manager.get_participants(room_id)?;

        let mut scores = Vec::with_capacity(state.positions.len());
        for (user_id, side) in &state.positions {
            let argument_count = state
                .arguments
                .iter()
                .filter(|a| &a.user_id == user_id)
                .count();
            let rebuttal_count = state
                .rebuttals
                .iter()
                .filter(|r| &r.user_id == user_id)
                .count();

            let total = (BASE_SCORE
                + argument_count as f64 * ARGUMENT_POINTS
                + rebuttal_count as f64 * REBUTTAL_POINTS)
                .min(MAX_SCORE);

            let user_name = members
                .iter()
                .find(|m| &m.user_id == user_id)
                .map(|m| m.user_name.clone())
                .unwrap_or_else(|| user_id.clone());

            scores.push(DebaterScore {
                user_id: user_id.clone(),
                user_name,
                side: *side,
                argument_count,
                rebuttal_count,
                total_score: total,
            });
        }
        scores.sort_by(|a, b| {
            b.total_score
                .partial_cmp(&a.total_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let pro_total: f64 = scores
            .iter()
            .filter(|s| s.side == DebateSide::Pro)
            .map(|s| s.total_score)
            .sum();
        let con_total: f64 = scores
            .iter()
            .filter(|s| s.side == DebateSide::Con)
            .map(|s| s.total_score)
            .sum();

        let winner = if pro_total > con_total {
            DebateWinner::Pro
        } else if con_total > pro_total {
            DebateWinner::Con
        } else {
            DebateWinner::Draw
        };

        state.phase = DebatePhase::Evaluation;
        self.persist(&mut room, &state)?;

        info!(room_id, ?winner, "debate evaluated");
        Ok(DebateEvaluation {
            topic: state.topic.topic,
            winner,
            pro_total,
            con_total,
            scores,
        })
    }
}
