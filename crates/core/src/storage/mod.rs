//! SQLite storage layer

mod answers;
mod evaluations;
mod matches;
mod messages;
mod migrations;
mod parse;
mod participants;
mod rooms;
mod scores;

use std::path::Path;

use rusqlite::{Connection, Transaction};
use tracing::instrument;

use crate::error::Result;

pub use answers::AnswerStore;
pub use evaluations::EvaluationStore;
pub use matches::MatchStore;
pub use messages::MessageStore;
pub use participants::ParticipantStore;
pub use rooms::RoomStore;
pub use scores::ScoreStore;

/// Main database handle
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Open in-memory database (for testing)
    #[instrument]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initialize database schema via migrations
    fn init(&self) -> Result<()> {
        migrations::run_migrations(&self.conn)?;
        Ok(())
    }

    /// Get current schema version
    pub fn schema_version(&self) -> u32 {
        self.conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap_or(0)
    }

    /// Begin a transaction spanning several store calls. Stores built
    /// over the returned handle share its atomicity.
    pub fn transaction(&self) -> Result<Transaction<'_>> {
        Ok(self.conn.unchecked_transaction()?)
    }

    /// Get room store
    pub fn rooms(&self) -> RoomStore<'_> {
        RoomStore::new(&self.conn)
    }

    /// Get participant store
    pub fn participants(&self) -> ParticipantStore<'_> {
        ParticipantStore::new(&self.conn)
    }

    /// Get answer store
    pub fn answers(&self) -> AnswerStore<'_> {
        AnswerStore::new(&self.conn)
    }

    /// Get message store
    pub fn messages(&self) -> MessageStore<'_> {
        MessageStore::new(&self.conn)
    }

    /// Get live-score store
    pub fn scores(&self) -> ScoreStore<'_> {
        ScoreStore::new(&self.conn)
    }

    /// Get peer evaluation store
    pub fn evaluations(&self) -> EvaluationStore<'_> {
        EvaluationStore::new(&self.conn)
    }

    /// Get match archive store
    pub fn matches(&self) -> MatchStore<'_> {
        MatchStore::new(&self.conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_version_matches_migrations() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.schema_version(), 2);
    }

    #[test]
    fn cascade_removes_room_children() {
        use crate::models::{Message, Participant, Room, RoomType};

        let db = Database::open_in_memory().unwrap();
        let room = Room::new(
            "CAS001".to_string(),
            "Room".to_string(),
            "h1".to_string(),
            RoomType::GroupInterview,
            4,
            serde_json::Map::new(),
        );
        db.rooms().create(&room).unwrap();
        db.participants()
            .add("CAS001", &Participant::new("u1", "User"))
            .unwrap();
        db.messages()
            .append(&Message::chat("CAS001", "u1", "User", "hi"))
            .unwrap();

        db.rooms().delete("CAS001").unwrap();
        assert_eq!(db.participants().count("CAS001").unwrap(), 0);
        assert_eq!(db.messages().count("CAS001").unwrap(), 0);
    }

    #[test]
    fn open_persists_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crewroom.db");

        {
            let db = Database::open(&path).unwrap();
            assert_eq!(db.schema_version(), 2);
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.schema_version(), 2);
    }
}
