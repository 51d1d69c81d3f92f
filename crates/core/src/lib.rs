//! Crewroom Core Library
//!
//! Core models, room coordination, events, and storage for the
//! crewroom practice-session platform.

pub mod error;
pub mod events;
pub mod invariants;
pub mod manager;
pub mod models;
pub mod storage;
pub mod templates;

pub use error::{Error, Result};
pub use events::{EventBus, RoomEvent};
pub use manager::{RoomManager, MAX_PARTICIPANTS, MIN_PARTICIPANTS};
pub use models::*;
pub use storage::Database;
