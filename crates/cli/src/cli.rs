use std::path::PathBuf;

use clap::Parser;

/// Run catalog commands against a metacat catalog.
///
/// Commands are read as JSON (one array, or one object per line) from a
/// script file or stdin, executed in order within a single session, and
/// listing results are printed one name per line.
#[derive(Parser, Debug)]
#[command(name = "metacat", version, about = "Catalog command executor")]
pub struct CliArgs {
    /// Script of JSON commands; `-` reads stdin
    #[arg(default_value = "-")]
    pub script: String,

    /// Directory holding catalog.json (overrides METACAT_DATA_DIR)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Keep the catalog in memory only
    #[arg(long, conflicts_with = "data_dir")]
    pub in_memory: bool,

    /// Starting cluster for the session
    #[arg(long)]
    pub cluster: Option<String>,

    /// Starting database for the session
    #[arg(long)]
    pub database: Option<String>,

    /// Drop tables along with their database or cluster
    #[arg(long)]
    pub cascade_drops: bool,

    /// Continue with the next command after a failure
    #[arg(long)]
    pub keep_going: bool,

    /// Log at info level unless RUST_LOG says otherwise
    #[arg(short, long)]
    pub verbose: bool,
}
