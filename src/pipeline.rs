use crate::config::ExportConfig;
use crate::db;
use crate::error::Result;
use crate::exporter::{self, OutputDocument};
use crate::importer::Contact;
use std::path::PathBuf;
use tracing::{debug, info};

/// How a run ended.
#[derive(Debug)]
pub enum Outcome {
    /// `--list-chats`: only the group contacts were read.
    Listed(Vec<Contact>),
    Exported {
        path: PathBuf,
        groups: usize,
        messages: usize,
    },
}

/// The main entry point for the business logic: open the database, read
/// contacts, then either stop there (list mode) or read messages and write
/// the export file.
pub fn execute(config: &ExportConfig) -> Result<Outcome> {
    debug!(source = %config.source_dir.display(), "using Signal directory");
    let conn = db::open_encrypted_database(&config.db_path, &config.key)?;

    let contacts = db::list_group_contacts(&conn)?;
    if config.list_chats {
        return Ok(Outcome::Listed(contacts));
    }

    let messages =
        db::list_incoming_messages(&conn, config.cutoff_ts, config.chat_filter.as_ref())?;
    drop(conn);

    let doc = OutputDocument {
        groups_name_id: contacts,
        messages,
    };
    let path = exporter::export_document(&config.output_dir, config.cutoff_ts, &doc)?;
    info!(
        path = %path.display(),
        groups = doc.groups_name_id.len(),
        messages = doc.messages.len(),
        "export written"
    );

    Ok(Outcome::Exported {
        path,
        groups: doc.groups_name_id.len(),
        messages: doc.messages.len(),
    })
}
