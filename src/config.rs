//! Resolution of everything the export needs before touching the database:
//! where Signal lives, the SQLCipher key, which chats to export and the
//! timestamp cutoff.

use crate::error::{ExportError, Result};
use chrono::{DateTime, Local, NaiveTime, TimeDelta, TimeZone};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the optional chat filter file looked up in the working directory.
pub const EXPORT_CONFIG_FILE: &str = "export_config.json";

/// Configuration required to run the export.
/// This decouples the logic from how the arguments were parsed (CLI/config file).
#[derive(Clone)]
pub struct ExportConfig {
    pub source_dir: PathBuf,
    pub db_path: PathBuf,
    pub key: String,
    pub chat_filter: Option<ChatFilter>,
    pub cutoff_ts: i64,
    pub output_dir: PathBuf,
    pub list_chats: bool,
}

impl ExportConfig {
    pub fn db_path_for(source_dir: &Path) -> PathBuf {
        source_dir.join("sql").join("db.sqlite")
    }
}

// ── Source directory ──────────────────────────────────────────────────────────

/// Platforms with a known Signal Desktop data directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    Windows,
}

impl Platform {
    /// Map a platform identifier (`std::env::consts::OS` or the legacy
    /// `linux2`/`win32` spellings) to a supported platform.
    pub fn from_identifier(id: &str) -> Result<Self> {
        match id {
            "linux" | "linux2" => Ok(Platform::Linux),
            "windows" | "win32" => Ok(Platform::Windows),
            other => Err(ExportError::UnsupportedPlatform(other.to_string())),
        }
    }

    pub fn default_source_dir(self, home: &Path) -> PathBuf {
        match self {
            Platform::Linux => home.join(".config").join("Signal"),
            Platform::Windows => home.join("AppData").join("Roaming").join("Signal"),
        }
    }
}

/// Explicit path (expanded and absolutized) or the platform default.
pub fn resolve_source_directory(explicit: Option<&Path>) -> Result<PathBuf> {
    resolve_source_directory_for(
        explicit,
        std::env::consts::OS,
        dirs::home_dir().as_deref(),
    )
}

pub fn resolve_source_directory_for(
    explicit: Option<&Path>,
    platform_id: &str,
    home: Option<&Path>,
) -> Result<PathBuf> {
    if let Some(path) = explicit {
        let expanded = expand_home(path, home);
        return Ok(std::path::absolute(&expanded)?);
    }

    let platform = Platform::from_identifier(platform_id)?;
    let home = home.ok_or_else(|| ExportError::UnsupportedPlatform(platform_id.to_string()))?;
    Ok(platform.default_source_dir(home))
}

fn expand_home(path: &Path, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix("~"), home) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

// ── Decryption key ────────────────────────────────────────────────────────────

/// Read the SQLCipher key from `<source_dir>/config.json`.
///
/// The key is a hex string; anything else is rejected here because it ends up
/// inside a `PRAGMA key` statement, which cannot take bound parameters.
pub fn read_decryption_key(source_dir: &Path) -> Result<String> {
    let path = source_dir.join("config.json");
    if !path.is_file() {
        return Err(ExportError::MissingConfigFile(path));
    }

    let invalid = |reason: String| ExportError::MissingOrInvalidKey {
        path: path.clone(),
        reason,
    };

    let content = fs::read_to_string(&path)?;
    let value: serde_json::Value =
        serde_json::from_str(&content).map_err(|e| invalid(format!("not valid JSON: {e}")))?;

    let key = match value.get("key") {
        None => return Err(invalid("no `key` field".to_string())),
        Some(serde_json::Value::String(s)) => s.trim(),
        Some(_) => return Err(invalid("`key` is not a string".to_string())),
    };

    if key.is_empty() {
        return Err(invalid("`key` is empty".to_string()));
    }
    if !key.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid("`key` is not a hex string".to_string()));
    }

    debug!(path = %path.display(), "read decryption key");
    Ok(key.to_string())
}

// ── Chat filter ───────────────────────────────────────────────────────────────

/// An explicit set of chat names to export. Order of first appearance is kept.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChatFilter {
    names: Vec<String>,
}

impl ChatFilter {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut filter = ChatFilter::default();
        for name in names {
            let name = name.into();
            if !name.is_empty() && !filter.names.contains(&name) {
                filter.names.push(name);
            }
        }
        filter
    }

    /// Parse the `--chats` value or the legacy `groups` string.
    ///
    /// Accepts bare names (`Friends,Family`) as well as the quoted form
    /// (`'Friends','Family'`), where commas inside quotes belong to the name
    /// and `''` inside single quotes is a literal quote.
    pub fn parse(input: &str) -> Self {
        Self::new(split_quoted_list(input))
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// `None` when there is nothing to filter on, so an empty filter exports everything.
    pub fn non_empty(self) -> Option<Self> {
        if self.is_empty() { None } else { Some(self) }
    }
}

fn split_quoted_list(input: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) if c == q => {
                if chars.peek() == Some(&q) {
                    current.push(q);
                    chars.next();
                } else {
                    quote = None;
                }
            }
            Some(_) => current.push(c),
            None if (c == '\'' || c == '"') && current.trim().is_empty() => {
                current.clear();
                quote = Some(c);
            }
            None if c == ',' => items.push(std::mem::take(&mut current)),
            None => current.push(c),
        }
    }
    items.push(current);

    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[derive(Deserialize, Default)]
struct FileConfig {
    groups: Option<GroupsField>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GroupsField {
    Quoted(String),
    Names(Vec<String>),
}

/// Chat filter from `export_config.json` in `working_dir`, if that file exists.
pub fn read_default_chat_filter(working_dir: &Path) -> Result<Option<ChatFilter>> {
    load_chat_filter_file(None, working_dir)
}

/// Chat filter from an explicit file, or from `export_config.json` in
/// `working_dir`. An explicit path that does not exist is an error.
pub fn load_chat_filter_file(
    explicit_path: Option<&Path>,
    working_dir: &Path,
) -> Result<Option<ChatFilter>> {
    let path = match explicit_path {
        Some(p) => {
            if !p.is_file() {
                return Err(ExportError::MissingConfigFile(p.to_path_buf()));
            }
            p.to_path_buf()
        }
        None => {
            let p = working_dir.join(EXPORT_CONFIG_FILE);
            if !p.is_file() {
                return Ok(None);
            }
            p
        }
    };

    let content = fs::read_to_string(&path)?;
    let cfg: FileConfig = serde_json::from_str(&content).map_err(|e| {
        ExportError::InvalidConfigFile {
            path: path.clone(),
            reason: e.to_string(),
        }
    })?;

    let filter = match cfg.groups {
        None => None,
        Some(GroupsField::Quoted(s)) => ChatFilter::parse(&s).non_empty(),
        Some(GroupsField::Names(names)) => ChatFilter::new(names).non_empty(),
    };
    debug!(path = %path.display(), ?filter, "loaded export config");
    Ok(filter)
}

// ── Cutoff timestamp ──────────────────────────────────────────────────────────

/// Explicit cutoff in epoch ms, or local midnight of today.
pub fn resolve_cutoff_timestamp(explicit: Option<i64>) -> i64 {
    explicit.unwrap_or_else(|| local_midnight_millis(&Local::now()))
}

/// Start of `now`'s local calendar day as UTC epoch milliseconds.
pub fn local_midnight_millis<Tz: TimeZone>(now: &DateTime<Tz>) -> i64 {
    let tz = now.timezone();
    let midnight = now.date_naive().and_time(NaiveTime::MIN);

    // Midnight can fall into a DST gap; take the first local time that exists.
    let mut candidate = midnight;
    for _ in 0..96 {
        if let Some(dt) = tz.from_local_datetime(&candidate).earliest() {
            return dt.timestamp_millis();
        }
        candidate += TimeDelta::minutes(15);
    }
    midnight.and_utc().timestamp_millis()
}
