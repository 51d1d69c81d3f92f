//! In-room chat and reactions

use chrono::{DateTime, Utc};
use tracing::instrument;

use crate::error::Result;
use crate::events::RoomEvent;
use crate::models::{Message, Reaction};

use super::RoomManager;

impl RoomManager {
    /// Post a chat message. Sender must be a member.
    #[instrument(skip(self, body))]
    pub fn send_message(&self, room_id: &str, user_id: &str, body: &str) -> Result<Message> {
        let mut room = self.require_room(room_id)?;
        let sender = self.require_member(room_id, user_id)?;

        let message = Message::chat(room_id, user_id, sender.user_name, body);
        self.touch(&mut room);

        let tx = self.db.transaction()?;
        crate::storage::MessageStore::new(&tx).append(&message)?;
        crate::storage::RoomStore::new(&tx).update(&room)?;
        tx.commit()?;

        self.events.publish(
            room_id,
            RoomEvent::MessagePosted {
                message_id: message.id.to_string(),
            },
        );
        Ok(message)
    }

    /// Read a room's message stream, optionally only entries after
    /// `since`. Reading does not require membership.
    pub fn get_messages(
        &self,
        room_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Message>> {
        self.require_room(room_id)?;
        self.db.messages().list_for_room(room_id, since)
    }

    /// Send a reaction aimed at another member
    #[instrument(skip(self))]
    pub fn send_reaction(
        &self,
        room_id: &str,
        user_id: &str,
        target_user_id: &str,
        reaction: Reaction,
    ) -> Result<Message> {
        let mut room = self.require_room(room_id)?;
        let sender = self.require_member(room_id, user_id)?;
        self.require_member(room_id, target_user_id)?;

        let message = Message::reaction(
            room_id,
            user_id,
            sender.user_name,
            target_user_id,
            reaction,
            reaction.as_str(),
        );
        self.touch(&mut room);

        let tx = self.db.transaction()?;
        crate::storage::MessageStore::new(&tx).append(&message)?;
        crate::storage::RoomStore::new(&tx).update(&room)?;
        tx.commit()?;

        self.events.publish(
            room_id,
            RoomEvent::MessagePosted {
                message_id: message.id.to_string(),
            },
        );
        Ok(message)
    }
}
