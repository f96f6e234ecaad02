//! # signal-json-export
//!
//! A CLI tool that exports [Signal Desktop](https://signal.org/download/) group chats and
//! incoming messages to a JSON file.
//!
//! ## What it does
//!
//! Signal Desktop keeps its data in a SQLCipher-encrypted SQLite database
//! (`sql/db.sqlite`) next to a `config.json` holding the database key. This tool reads
//! the key, unlocks the database, and writes every group conversation plus every incoming
//! message sent after a cutoff to `output/json_data_<cutoff>.json`.
//!
//! The database is opened **read-only**; your data is never modified.
//!
//! ## Usage
//!
//! ```sh
//! # Export today's incoming messages from all chats
//! signal-json-export
//!
//! # Only some chats, since a given epoch-ms timestamp
//! signal-json-export --chats "Friends,Family" --ts 1700000000000
//!
//! # Show the group names available for --chats
//! signal-json-export --list-chats
//! ```
//!
//! A default chat selection can be kept in `export_config.json` in the working directory:
//! `{"groups": ["Friends", "Family"]}` (the older `"'Friends','Family'"` string form is
//! accepted too).
//!
//! ## Output
//!
//! ```json
//! {
//!     "groups_name_id": [{"id": "...", "name": "Friends"}],
//!     "messsages": [{ "...": "message as stored by Signal" }]
//! }
//! ```
//!
//! The `messsages` key is spelled that way on purpose; tools consuming earlier exports
//! depend on it.
pub mod config;
pub mod db;
pub mod error;
pub mod exporter;
pub mod importer;
pub mod pipeline;
