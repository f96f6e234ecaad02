use clap::Parser;
use eyre::{Context, Result};
use signal_json_export::config::{self, ChatFilter, ExportConfig};
use signal_json_export::exporter;
use signal_json_export::pipeline::{self, Outcome};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Export Signal Desktop group chats and incoming messages to JSON.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the Signal data directory (the one holding config.json and sql/).
    /// Auto-detected on Linux and Windows if omitted.
    #[arg(long, value_name = "PATH")]
    source: Option<PathBuf>,

    /// Comma-separated chat names to include (e.g. "Friends,Family").
    /// Overrides export_config.json.
    #[arg(long, value_name = "NAMES")]
    chats: Option<String>,

    /// Only export messages sent after this UNIX timestamp in milliseconds.
    /// Defaults to local midnight today.
    #[arg(long, value_name = "MS")]
    ts: Option<i64>,

    /// List available chats and exit.
    #[arg(short, long)]
    list_chats: bool,

    /// Path to an export config file.
    /// Defaults to ./export_config.json if present.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory the JSON file is written to.
    #[arg(long, value_name = "DIR", default_value = "output")]
    output_dir: PathBuf,

    /// Log what is being read and written.
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("signal_json_export={level}")))
        .wrap_err("Invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    // 1. Locate Signal and its key
    let source_dir = config::resolve_source_directory(cli.source.as_deref())?;
    let key = config::read_decryption_key(&source_dir)
        .wrap_err_with(|| format!("Cannot read the database key from {}", source_dir.display()))?;

    // 2. Resolve chat filter (CLI > config file)
    let chat_filter = match cli.chats.as_deref() {
        Some(chats) => ChatFilter::parse(chats).non_empty(),
        None => {
            let cwd = std::env::current_dir().wrap_err("Cannot determine working directory")?;
            match cli.config.as_deref() {
                Some(path) => config::load_chat_filter_file(Some(path), &cwd)?,
                None => config::read_default_chat_filter(&cwd)?,
            }
        }
    };

    // 3. Resolve cutoff (CLI > local midnight)
    let cutoff_ts = config::resolve_cutoff_timestamp(cli.ts);

    let config = ExportConfig {
        db_path: ExportConfig::db_path_for(&source_dir),
        source_dir,
        key,
        chat_filter,
        cutoff_ts,
        output_dir: cli.output_dir,
        list_chats: cli.list_chats,
    };

    // 4. Run
    match pipeline::execute(&config)? {
        Outcome::Listed(contacts) => {
            let mut stdout = io::stdout().lock();
            exporter::write_chat_list(&mut stdout, &contacts)?;
            stdout.flush()?;
        }
        Outcome::Exported { path, .. } => {
            println!("Signal database exported as {}", path.display());
        }
    }

    Ok(())
}
