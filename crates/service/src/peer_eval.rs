//! Peer evaluation: post-session scoring and emoji reactions

use std::collections::HashMap;

use serde::Serialize;
use tracing::{info, instrument};

use crewroom_core::{
    CategoryScores, PeerEvaluation, PeerReaction, PeerReactionKind, RoomManager, CATEGORY_MAX,
};

use crate::error::{Error, Result};

/// Aggregated view of everything a user has received from peers
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackSummary {
    pub user_id: String,
    pub evaluation_count: usize,
    pub average_total: f64,
    pub average_by_category: CategoryScores,
    pub strongest_category: Option<&'static str>,
    pub weakest_category: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReactionSummary {
    pub user_id: String,
    pub total: usize,
    pub counts: Vec<(PeerReactionKind, usize)>,
}

pub struct PeerEvalService<'a> {
    manager: &'a RoomManager,
}

impl<'a> PeerEvalService<'a> {
    pub fn new(manager: &'a RoomManager) -> Self {
        Self { manager }
    }

    /// Check the rules before offering the evaluation form: no
    /// self-evaluation, both sides must be room members, and each pair
    /// evaluates once per room.
    pub fn can_evaluate(&self, room_id: &str, evaluator_id: &str, target_id: &str) -> Result<()> {
        if evaluator_id == target_id {
            return Err(Error::EvaluationRejected(
                "you cannot evaluate yourself".into(),
            ));
        }

        let members = self.manager.get_participants(room_id)?;
        for user_id in [evaluator_id, target_id] {
            if !members.iter().any(|m| m.user_id == user_id) {
                return Err(Error::EvaluationRejected(format!(
                    "user is not in this room: {user_id}"
                )));
            }
        }

        if self
            .manager
            .database()
            .evaluations()
            .exists(room_id, evaluator_id, target_id)?
        {
            return Err(Error::EvaluationRejected(
                "you already evaluated this participant in this room".into(),
            ));
        }
        Ok(())
    }

    /// Record a peer evaluation after validating scores and the pair
    #[instrument(skip(self, scores, feedback))]
    pub fn submit_evaluation(
        &self,
        room_id: &str,
        evaluator_id: &str,
        target_id: &str,
        question_idx: usize,
        scores: CategoryScores,
        feedback: &str,
    ) -> Result<PeerEvaluation> {
        self.can_evaluate(room_id, evaluator_id, target_id)?;
        if !scores.in_bounds() {
            return Err(Error::EvaluationRejected(format!(
                "each category score must be between 0 and {CATEGORY_MAX}"
            )));
        }

        let evaluation = PeerEvaluation::new(
            room_id,
            evaluator_id,
            target_id,
            question_idx,
            scores,
            feedback,
        );
        self.manager.database().evaluations().create(&evaluation)?;

        info!(room_id, evaluator_id, target_id, "peer evaluation recorded");
        Ok(evaluation)
    }

    pub fn evaluations_received(&self, user_id: &str) -> Result<Vec<PeerEvaluation>> {
        Ok(self.manager.database().evaluations().received_by(user_id)?)
    }

    pub fn evaluations_given(&self, user_id: &str) -> Result<Vec<PeerEvaluation>> {
        Ok(self.manager.database().evaluations().given_by(user_id)?)
    }

    /// Average of the totals a user received within one room
    pub fn peer_score(&self, room_id: &str, user_id: &str) -> Result<Option<f64>> {
        let received = self
            .manager
            .database()
            .evaluations()
            .received_in_room(room_id, user_id)?;
        if received.is_empty() {
            return Ok(None);
        }
        let sum: f64 = received.iter().map(|e| e.scores.total()).sum();
        Ok(Some(sum / received.len() as f64))
    }

    /// Category-level averages across everything a user received
    pub fn feedback_summary(&self, user_id: &str) -> Result<FeedbackSummary> {
        let received = self.evaluations_received(user_id)?;
        let count = received.len();

        if count == 0 {
            return Ok(FeedbackSummary {
                user_id: user_id.to_string(),
                evaluation_count: 0,
                average_total: 0.0,
                average_by_category: CategoryScores::default(),
                strongest_category: None,
                weakest_category: None,
            });
        }

        let n = count as f64;
        let average_by_category = CategoryScores {
            content: received.iter().map(|e| e.scores.content).sum::<f64>() / n,
            delivery: received.iter().map(|e| e.scores.delivery).sum::<f64>() / n,
            attitude: received.iter().map(|e| e.scores.attitude).sum::<f64>() / n,
            structure: received.iter().map(|e| e.scores.structure).sum::<f64>() / n,
        };

        let by_name = [
            ("content", average_by_category.content),
            ("delivery", average_by_category.delivery),
            ("attitude", average_by_category.attitude),
            ("structure", average_by_category.structure),
        ];
        let strongest = by_name
            .iter()
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(name, _)| *name);
        let weakest = by_name
            .iter()
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(name, _)| *name);

        Ok(FeedbackSummary {
            user_id: user_id.to_string(),
            evaluation_count: count,
            average_total: received.iter().map(|e| e.scores.total()).sum::<f64>() / n,
            average_by_category,
            strongest_category: strongest,
            weakest_category: weakest,
        })
    }

    /// Send a quick emoji reaction to a fellow member
    #[instrument(skip(self))]
    pub fn add_reaction(
        &self,
        room_id: &str,
        sender_id: &str,
        target_id: &str,
        kind: PeerReactionKind,
    ) -> Result<PeerReaction> {
        if sender_id == target_id {
            return Err(Error::EvaluationRejected(
                "you cannot react to yourself".into(),
            ));
        }
        let members = self.manager.get_participants(room_id)?;
        for user_id in [sender_id, target_id] {
            if !members.iter().any(|m| m.user_id == user_id) {
                return Err(Error::EvaluationRejected(format!(
                    "user is not in this room: {user_id}"
                )));
            }
        }

        let reaction = PeerReaction::new(room_id, sender_id, target_id, kind);
        self.manager.database().evaluations().add_reaction(&reaction)?;
        Ok(reaction)
    }

    /// Reaction totals a user has collected, across all rooms
    pub fn reaction_summary(&self, user_id: &str) -> Result<ReactionSummary> {
        let counts = self
            .manager
            .database()
            .evaluations()
            .reaction_counts_for(user_id)?;
        let total = counts.iter().map(|(_, c)| c).sum();
        Ok(ReactionSummary {
            user_id: user_id.to_string(),
            total,
            counts,
        })
    }

    /// Reaction counts rendered with their emoji, for display
    pub fn reaction_emoji_counts(&self, user_id: &str) -> Result<HashMap<&'static str, usize>> {
        let counts = self
            .manager
            .database()
            .evaluations()
            .reaction_counts_for(user_id)?;
        Ok(counts.into_iter().map(|(k, c)| (k.emoji(), c)).collect())
    }
}
