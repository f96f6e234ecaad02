//! Error types for the exporter

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("No default Signal location for platform `{0}`. Please pass the location with --source.")]
    UnsupportedPlatform(String),

    #[error("{} not found", .0.display())]
    MissingConfigFile(PathBuf),

    #[error("Failed to parse {}: {reason}", .path.display())]
    InvalidConfigFile { path: PathBuf, reason: String },

    #[error("Invalid decryption key in {}: {reason}", .path.display())]
    MissingOrInvalidKey { path: PathBuf, reason: String },

    #[error("Failed to open encrypted database {}: {reason}", .path.display())]
    DatabaseOpenFailure { path: PathBuf, reason: String },

    #[error("Query failed: {0}")]
    QueryFailure(#[from] rusqlite::Error),

    #[error("Message {id} has a malformed JSON payload: {source}")]
    MalformedMessagePayload {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExportError>;
