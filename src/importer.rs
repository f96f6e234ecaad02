/// Record types read out of the Signal Desktop database.
///
/// Storage format: SQLCipher-encrypted SQLite at `<source>/sql/db.sqlite`.
/// Message bodies are stored as JSON text in `messages.json`.
///
/// Relevant slice of the schema:
/// ```sql
/// CREATE TABLE conversations (
///     id   STRING PRIMARY KEY ASC,
///     json TEXT,
///     type STRING,          -- "private" | "group"
///     name TEXT,
///     uuid STRING,
///     ...
/// );
/// CREATE TABLE messages (
///     id             STRING PRIMARY KEY ASC,
///     json           TEXT,
///     conversationId STRING,
///     sent_at        INTEGER,  -- epoch ms
///     type           STRING,   -- "incoming" | "outgoing" | ...
///     sourceUuid     STRING,
///     ...
/// );
/// ```
use serde::{Deserialize, Serialize};

/// Value of `conversations.type` for group chats.
pub const GROUP_CONVERSATION: &str = "group";

/// Value of `messages.type` for messages received from someone else.
pub const INCOMING_MESSAGE: &str = "incoming";

/// A group conversation, as exported under `groups_name_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub name: String,
}

/// A message payload exactly as Signal stored it. No schema is imposed.
///
/// Numbers keep their original digits and objects keep their key order, so
/// re-serializing gives back what was stored.
pub type Message = serde_json::Value;

/// Raw row of `SELECT type, id, name FROM conversations`.
#[derive(Debug, Clone)]
pub struct ConversationRow {
    pub kind: Option<String>,
    pub id: String,
    pub name: Option<String>,
}

impl ConversationRow {
    pub fn is_group(&self) -> bool {
        self.kind.as_deref() == Some(GROUP_CONVERSATION)
    }

    /// Keep only group conversations; a NULL name becomes the empty string.
    pub fn into_group_contact(self) -> Option<Contact> {
        if !self.is_group() {
            return None;
        }
        Some(Contact {
            id: self.id,
            name: self.name.unwrap_or_default(),
        })
    }
}
