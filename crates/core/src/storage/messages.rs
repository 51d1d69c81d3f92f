//! Message storage operations

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use tracing::instrument;

use super::parse::{parse_datetime, parse_enum, parse_enum_opt, parse_uuid};
use crate::error::Result;
use crate::models::Message;

pub struct MessageStore<'a> {
    conn: &'a Connection,
}

impl<'a> MessageStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn map_message(row: &Row<'_>) -> rusqlite::Result<Message> {
        Ok(Message {
            id: parse_uuid(&row.get::<_, String>(0)?)?,
            room_id: row.get(1)?,
            user_id: row.get(2)?,
            user_name: row.get(3)?,
            body: row.get(4)?,
            kind: parse_enum(&row.get::<_, String>(5)?)?,
            target_user_id: row.get(6)?,
            reaction: parse_enum_opt(row.get::<_, Option<String>>(7)?)?,
            sent_at: parse_datetime(&row.get::<_, String>(8)?)?,
        })
    }

    #[instrument(skip(self, message), fields(room_id = %message.room_id, kind = message.kind.as_str()))]
    pub fn append(&self, message: &Message) -> Result<()> {
        self.conn.execute(
            "INSERT INTO messages (id, room_id, user_id, user_name, body, kind, target_user_id, reaction, sent_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                message.id.to_string(),
                message.room_id,
                message.user_id,
                message.user_name,
                message.body,
                message.kind.as_str(),
                message.target_user_id,
                message.reaction.map(|r| r.as_str()),
                message.sent_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Messages of one room in send order, optionally only those after
    /// `since`. Reads never touch other rooms' streams.
    pub fn list_for_room(
        &self,
        room_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Message>> {
        const COLUMNS: &str =
            "id, room_id, user_id, user_name, body, kind, target_user_id, reaction, sent_at";

        let messages = match since {
            Some(since) => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {COLUMNS} FROM messages
                     WHERE room_id = ?1 AND sent_at > ?2 ORDER BY sent_at, id"
                ))?;
                let rows = stmt
                    .query_map(params![room_id, since.to_rfc3339()], Self::map_message)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {COLUMNS} FROM messages WHERE room_id = ?1 ORDER BY sent_at, id"
                ))?;
                let rows = stmt
                    .query_map(params![room_id], Self::map_message)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
        };

        Ok(messages)
    }

    pub fn count(&self, room_id: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM messages WHERE room_id = ?1",
            params![room_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
