//! Error types for crewroom core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Not-found error for a missing room
    pub fn room_not_found(room_id: &str) -> Self {
        Error::NotFound(format!("room does not exist: {room_id}"))
    }

    /// Precondition error for a user who isn't a room member
    pub fn not_a_member(user_id: &str) -> Self {
        Error::InvalidOperation(format!("user is not in this room: {user_id}"))
    }
}
