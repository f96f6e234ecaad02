use crate::error::Result;
use crate::importer::{Contact, Message};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// The exported document.
///
/// `messsages` is spelled the way existing consumers of these exports expect it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputDocument {
    pub groups_name_id: Vec<Contact>,
    #[serde(rename = "messsages")]
    pub messages: Vec<Message>,
}

/// `<output_dir>/json_data_<cutoff_ts>.json`
pub fn output_path(output_dir: &Path, cutoff_ts: i64) -> PathBuf {
    output_dir.join(format!("json_data_{cutoff_ts}.json"))
}

/// Pretty-print `doc` with a 4-space indent.
pub fn write_document<W: Write>(writer: &mut W, doc: &OutputDocument) -> std::io::Result<()> {
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut *writer, formatter);
    doc.serialize(&mut ser).map_err(std::io::Error::other)?;
    writeln!(writer)
}

/// Write the document to its timestamped file under `output_dir`, creating
/// the directory if needed. Returns the written path.
pub fn export_document(output_dir: &Path, cutoff_ts: i64, doc: &OutputDocument) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)?;

    let path = output_path(output_dir, cutoff_ts);
    let file = File::create(&path)?;
    let mut writer = BufWriter::new(file);
    write_document(&mut writer, doc)?;
    writer.flush()?;

    Ok(path)
}

/// Chat names the way list mode prints them, one `'<name>'` per line.
pub fn write_chat_list<W: Write>(writer: &mut W, contacts: &[Contact]) -> std::io::Result<()> {
    for contact in contacts {
        writeln!(writer, "'{}'", contact.name)?;
    }
    Ok(())
}
