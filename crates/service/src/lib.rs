//! Crewroom Service Library
//!
//! Experience layers composed on top of the core room coordinator:
//! group interviews with live scoring, pro/con debates, peer
//! evaluation, spectator views, and the match archive.

pub mod debate;
pub mod error;
pub mod history;
pub mod interview;
pub mod peer_eval;
pub mod questions;
pub mod spectator;

pub use debate::{DebateEvaluation, DebatePhase, DebateService, DebateState, DebateWinner};
pub use error::{Error, Result};
pub use history::{AwardedPoints, HistoryService};
pub use interview::{
    AnswerTimer, InterviewProgress, InterviewService, InterviewSession, RankEntry, TimerStatus,
    TurnInfo, DEFAULT_ANSWER_SECONDS,
};
pub use peer_eval::{FeedbackSummary, PeerEvalService, ReactionSummary};
pub use questions::{airline_questions, debate_topics, resolve_topic, DebateTopic};
pub use spectator::{
    DebateGlance, InterviewGlance, SpectatorComment, SpectatorService, SpectatorView,
};
