//! Database migration system
//!
//! Tracks schema versions and applies migrations in order.

use rusqlite::Connection;
use tracing::{info, instrument};

use crate::error::Result;

/// A database migration
pub struct Migration {
    /// Version number (must be sequential starting from 1)
    pub version: u32,
    /// Description of what this migration does
    pub description: &'static str,
    /// SQL to run for this migration
    pub sql: &'static str,
}

/// All migrations in order
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial schema",
        sql: r#"
            -- Rooms table: one row per session container, keyed by join code.
            -- Session state lives in dedicated columns; settings, the
            -- question list, and the frozen turn order are JSON text.
            CREATE TABLE IF NOT EXISTS rooms (
                room_id TEXT PRIMARY KEY,
                room_name TEXT NOT NULL,
                host_id TEXT NOT NULL,
                room_type TEXT NOT NULL,
                max_participants INTEGER NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                last_activity TEXT NOT NULL,
                settings TEXT NOT NULL DEFAULT '{}',
                questions TEXT NOT NULL DEFAULT '[]',
                current_question_idx INTEGER NOT NULL DEFAULT 0,
                current_speaker_id TEXT,
                turn_order TEXT NOT NULL DEFAULT '[]',
                current_turn_idx INTEGER NOT NULL DEFAULT 0,
                round_number INTEGER NOT NULL DEFAULT 1,
                phase TEXT NOT NULL DEFAULT 'waiting'
            );

            -- Participants table; position preserves insertion order
            CREATE TABLE IF NOT EXISTS participants (
                room_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                user_name TEXT NOT NULL,
                status TEXT NOT NULL,
                joined_at TEXT NOT NULL,
                side TEXT,
                position INTEGER NOT NULL,
                PRIMARY KEY (room_id, user_id),
                FOREIGN KEY (room_id) REFERENCES rooms(room_id) ON DELETE CASCADE
            );

            -- Answers table (append-only)
            CREATE TABLE IF NOT EXISTS answers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                room_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                user_name TEXT NOT NULL,
                question_idx INTEGER NOT NULL,
                answer_text TEXT NOT NULL,
                audio_data TEXT,
                submitted_at TEXT NOT NULL,
                FOREIGN KEY (room_id) REFERENCES rooms(room_id) ON DELETE CASCADE
            );

            -- Messages table (append-only per-room stream)
            CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                room_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                user_name TEXT NOT NULL,
                body TEXT NOT NULL,
                kind TEXT NOT NULL,
                target_user_id TEXT,
                reaction TEXT,
                sent_at TEXT NOT NULL,
                FOREIGN KEY (room_id) REFERENCES rooms(room_id) ON DELETE CASCADE
            );

            -- Live session scores, reset per session
            CREATE TABLE IF NOT EXISTS live_scores (
                room_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                content REAL NOT NULL DEFAULT 0,
                structure REAL NOT NULL DEFAULT 0,
                delivery REAL NOT NULL DEFAULT 0,
                relevance REAL NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (room_id, user_id),
                FOREIGN KEY (room_id) REFERENCES rooms(room_id) ON DELETE CASCADE
            );

            -- Peer evaluations; no FK so they outlive room cleanup
            CREATE TABLE IF NOT EXISTS evaluations (
                id TEXT PRIMARY KEY,
                room_id TEXT NOT NULL,
                evaluator_id TEXT NOT NULL,
                target_id TEXT NOT NULL,
                question_idx INTEGER NOT NULL,
                content REAL NOT NULL,
                delivery REAL NOT NULL,
                attitude REAL NOT NULL,
                structure REAL NOT NULL,
                total REAL NOT NULL,
                feedback TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE(room_id, evaluator_id, target_id)
            );

            -- Peer reactions (append-only)
            CREATE TABLE IF NOT EXISTS peer_reactions (
                id TEXT PRIMARY KEY,
                room_id TEXT NOT NULL,
                sender_id TEXT NOT NULL,
                target_id TEXT NOT NULL,
                reaction TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            -- Archived match results; standings as JSON
            CREATE TABLE IF NOT EXISTS matches (
                id TEXT PRIMARY KEY,
                room_id TEXT NOT NULL,
                room_name TEXT NOT NULL,
                room_type TEXT NOT NULL,
                standings TEXT NOT NULL,
                winner_id TEXT,
                finished_at TEXT NOT NULL
            );

            -- Weekly competition points
            CREATE TABLE IF NOT EXISTS weekly_points (
                user_id TEXT NOT NULL,
                week TEXT NOT NULL,
                points REAL NOT NULL DEFAULT 0,
                PRIMARY KEY (user_id, week)
            );
        "#,
    },
    Migration {
        version: 2,
        description: "Add indexes for query performance",
        sql: r#"
            -- Room sweep reads last_activity for every row
            CREATE INDEX IF NOT EXISTS idx_rooms_last_activity ON rooms(last_activity);
            CREATE INDEX IF NOT EXISTS idx_rooms_status ON rooms(status);

            -- Membership lookups
            CREATE INDEX IF NOT EXISTS idx_participants_room ON participants(room_id);

            -- Per-room message reads must not scan other rooms
            CREATE INDEX IF NOT EXISTS idx_messages_room_sent ON messages(room_id, sent_at);

            -- Answer reads filter by question within a room
            CREATE INDEX IF NOT EXISTS idx_answers_room_question ON answers(room_id, question_idx);

            -- Evaluation queries go both directions
            CREATE INDEX IF NOT EXISTS idx_evaluations_target ON evaluations(target_id);
            CREATE INDEX IF NOT EXISTS idx_evaluations_evaluator ON evaluations(evaluator_id);
            CREATE INDEX IF NOT EXISTS idx_peer_reactions_target ON peer_reactions(target_id);

            -- Match history per room and per finish time
            CREATE INDEX IF NOT EXISTS idx_matches_room ON matches(room_id);
            CREATE INDEX IF NOT EXISTS idx_matches_finished ON matches(finished_at);
        "#,
    },
];

/// Run all pending migrations
#[instrument(skip(conn))]
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
    )?;

    let current: u32 = conn
        .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
            row.get::<_, Option<u32>>(0)
        })?
        .unwrap_or(0);

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        conn.execute_batch(migration.sql)?;
        conn.execute(
            "INSERT INTO schema_migrations (version, description, applied_at)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![
                migration.version,
                migration.description,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;
        info!(
            version = migration.version,
            description = migration.description,
            "Applied migration"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_sequential() {
        for (i, m) in MIGRATIONS.iter().enumerate() {
            assert_eq!(m.version, i as u32 + 1);
        }
    }

    #[test]
    fn migrations_apply_cleanly_and_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version: u32 = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, MIGRATIONS.len() as u32);
    }
}
