//! Error types for the service layer

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] crewroom_core::Error),

    #[error("No active interview session in room {0}")]
    NoActiveInterview(String),

    #[error("No active debate in room {0}")]
    NoActiveDebate(String),

    #[error("Evaluation rejected: {0}")]
    EvaluationRejected(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
