use std::path::PathBuf;

use clap::Parser;

use super::logging::LogDestination;

/// Local web UI that sends WhatsApp messages to every row of a spreadsheet.
#[derive(Debug, Parser)]
#[command(name = "bulk-sender", version, about)]
pub struct Cli {
    /// RON config file; CLI flags override its values.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub port: Option<u16>,

    /// Directory for uploaded spreadsheets and the last-run summary.
    #[arg(long)]
    pub upload_dir: Option<PathBuf>,

    /// Country code for numbers without a leading `+`.
    #[arg(long)]
    pub country_code: Option<String>,

    #[arg(long, value_enum)]
    pub log: Option<LogDestination>,
}
