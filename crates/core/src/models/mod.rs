//! Data models for crewroom

mod answer;
mod evaluation;
mod match_record;
mod message;
mod participant;
mod room;

pub use answer::*;
pub use evaluation::*;
pub use match_record::*;
pub use message::*;
pub use participant::*;
pub use room::*;

use thiserror::Error;

/// Raised when a stored enum string doesn't match any known variant
#[derive(Debug, Error)]
#[error("unknown {kind} value: {value}")]
pub struct EnumParseError {
    pub kind: &'static str,
    pub value: String,
}

impl EnumParseError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
