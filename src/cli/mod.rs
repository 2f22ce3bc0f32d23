pub mod wizard;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "OccurrenceDesk",
    about = "Operational non-compliance reports for transit operations"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    Doctor,
    Catalog {
        #[command(subcommand)]
        command: CatalogCommands,
    },
    Occurrence {
        #[command(subcommand)]
        command: OccurrenceCommands,
    },
    Driver {
        #[command(subcommand)]
        command: DriverCommands,
    },
    /// Request the backend-rendered PDF of an occurrence
    Pdf {
        id: String,
        #[arg(long)]
        ttl: Option<u64>,
        #[arg(long, default_value_t = false)]
        force: bool,
        #[arg(long, default_value_t = false)]
        download: bool,
    },
    /// Compile the daily report for a date (YYYY-MM-DD, default today)
    Report {
        #[arg(long)]
        date: Option<String>,
        /// Print the copy/export variant (no markers, no evidence lines)
        #[arg(long, default_value_t = false)]
        copy: bool,
        #[arg(long, default_value_t = false)]
        save: bool,
    },
    /// Foreground service exporting the daily report at report_time
    Service,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    Set { key: String, value: String },
    Get { key: String },
}

#[derive(Debug, Subcommand)]
pub enum CatalogCommands {
    List,
    Search {
        query: String,
    },
    Find {
        #[arg(long)]
        line_code: String,
        #[arg(long)]
        line_name: String,
        #[arg(long)]
        departure_time: String,
        #[arg(long)]
        direction: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum OccurrenceCommands {
    /// Interactive form
    New,
    Create(CreateOccurrenceArgs),
    Show {
        id: String,
        #[arg(long, value_enum, default_value_t = TextFormat::Digest)]
        format: TextFormat,
    },
    Upload {
        id: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[derive(Debug, clap::Args)]
pub struct CreateOccurrenceArgs {
    /// Catalog key, as printed by `catalog search`
    #[arg(long)]
    pub trip: String,
    #[arg(long)]
    pub vehicle: String,
    /// YYYY-MM-DD
    #[arg(long)]
    pub date: String,
    #[arg(long)]
    pub trip_date: Option<String>,
    #[arg(long)]
    pub start: String,
    #[arg(long)]
    pub end: String,
    #[arg(long)]
    pub place: String,
    #[arg(long)]
    pub driver1: String,
    #[arg(long)]
    pub driver2: Option<String>,
    #[arg(long)]
    pub type_code: Option<String>,
    #[arg(long = "evidence")]
    pub evidences: Vec<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum DriverCommands {
    Search {
        term: String,
    },
    Create {
        #[arg(long)]
        code: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        base: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TextFormat {
    Digest,
    Narrative,
    Whatsapp,
    Json,
}
