use crate::config::ChatFilter;
use crate::error::{ExportError, Result};
use crate::importer::{Contact, ConversationRow, INCOMING_MESSAGE, Message};
use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags, params_from_iter};
use std::path::Path;
use tracing::debug;

/// SQLCipher settings a database must be opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CipherParams {
    pub page_size: u32,
    pub kdf_iter: u32,
    pub hmac_algorithm: &'static str,
    pub kdf_algorithm: &'static str,
}

impl CipherParams {
    /// What Signal Desktop writes its database with. Not tunable: any other
    /// value makes every read fail.
    pub const SIGNAL: CipherParams = CipherParams {
        page_size: 4096,
        kdf_iter: 64000,
        hmac_algorithm: "HMAC_SHA512",
        kdf_algorithm: "PBKDF2_HMAC_SHA512",
    };

    /// Pragma batch to run right after opening. `key` must already be hex.
    pub fn pragmas(&self, key: &str) -> String {
        format!(
            "PRAGMA key = \"x'{key}'\";
             PRAGMA cipher_page_size = {};
             PRAGMA kdf_iter = {};
             PRAGMA cipher_hmac_algorithm = {};
             PRAGMA cipher_kdf_algorithm = {};",
            self.page_size, self.kdf_iter, self.hmac_algorithm, self.kdf_algorithm
        )
    }
}

/// Open the Signal database read-only and unlock it with `key`.
///
/// SQLCipher only notices a wrong key on the first read, so the schema is
/// touched here to fail early.
pub fn open_encrypted_database(path: &Path, key: &str) -> Result<Connection> {
    let failure = |reason: String| ExportError::DatabaseOpenFailure {
        path: path.to_path_buf(),
        reason,
    };

    if !path.is_file() {
        return Err(failure("file not found".to_string()));
    }
    if key.is_empty() || !key.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(failure("key must be a non-empty hex string".to_string()));
    }

    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| failure(e.to_string()))?;

    // SQLCipher would otherwise print its own hmac errors to stderr on a wrong key.
    conn.execute_batch("PRAGMA cipher_log_level = NONE;")
        .map_err(|e| failure(format!("failed to configure cipher logging: {e}")))?;
    conn.execute_batch(&CipherParams::SIGNAL.pragmas(key))
        .map_err(|e| failure(format!("failed to apply cipher settings: {e}")))?;

    let tables: i64 = conn
        .query_row("SELECT count(*) FROM sqlite_master", [], |row| row.get(0))
        .map_err(|e| failure(format!("wrong key or cipher parameters: {e}")))?;

    debug!(path = %path.display(), tables, "opened encrypted database");
    Ok(conn)
}

/// All group conversations, in store order.
pub fn list_group_contacts(conn: &Connection) -> Result<Vec<Contact>> {
    let mut stmt = conn.prepare("SELECT type, id, name FROM conversations")?;
    let rows: Vec<ConversationRow> = stmt
        .query_map([], |row| {
            Ok(ConversationRow {
                kind: row.get(0)?,
                id: row.get(1)?,
                name: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<_, _>>()?;

    let total = rows.len();
    let contacts: Vec<Contact> = rows
        .into_iter()
        .filter_map(ConversationRow::into_group_contact)
        .collect();
    debug!(total, groups = contacts.len(), "listed conversations");
    Ok(contacts)
}

/// SQL for incoming messages after a cutoff, with one `?` per filtered chat name.
pub fn incoming_messages_query(filter: Option<&ChatFilter>) -> String {
    let mut sql = String::from(
        "SELECT m.id, m.json \
         FROM messages m \
         JOIN conversations c ON m.conversationId = c.id \
         JOIN conversations c2 ON m.sourceUuid = c2.uuid \
         WHERE m.type = ? AND m.sent_at > ?",
    );
    if let Some(filter) = filter.filter(|f| !f.is_empty()) {
        let placeholders = vec!["?"; filter.names().len()].join(", ");
        sql.push_str(&format!(" AND c.name IN ({placeholders})"));
    }
    sql.push_str(" ORDER BY m.sent_at ASC");
    sql
}

/// Incoming messages sent strictly after `cutoff_ts`, oldest first.
///
/// A payload that is not valid JSON aborts the whole listing.
pub fn list_incoming_messages(
    conn: &Connection,
    cutoff_ts: i64,
    filter: Option<&ChatFilter>,
) -> Result<Vec<Message>> {
    let sql = incoming_messages_query(filter);

    let mut params = vec![
        Value::Text(INCOMING_MESSAGE.to_string()),
        Value::Integer(cutoff_ts),
    ];
    if let Some(filter) = filter {
        params.extend(filter.names().iter().cloned().map(Value::Text));
    }

    let mut stmt = conn.prepare(&sql)?;
    let rows: Vec<(String, String)> = stmt
        .query_map(params_from_iter(params.iter()), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<std::result::Result<_, _>>()?;

    let messages = rows
        .into_iter()
        .map(|(id, json)| {
            serde_json::from_str::<Message>(&json)
                .map_err(|source| ExportError::MalformedMessagePayload { id, source })
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(cutoff_ts, count = messages.len(), "listed incoming messages");
    Ok(messages)
}
