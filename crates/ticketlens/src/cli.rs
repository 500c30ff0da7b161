use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ticketlens")]
#[command(version)]
#[command(about = "Turn incident tickets into observability queries")]
pub struct Cli {
    /// Project root holding `.ticket-analyzer/` (defaults to the current directory)
    #[arg(short, long, global = true)]
    pub project_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write configuration templates (existing files are kept)
    Init,

    /// Report missing required configuration fields
    Check,

    /// Extract ticket fields, resolve the time window and generate queries
    Prepare(PrepareArgs),

    /// Mine results.json and regenerate narrower queries
    Refine {
        /// Ticket id printed by `prepare`
        ticket_id: String,
    },

    /// Build the unscoped prevalence query, or classify its results
    Prevalence {
        /// Ticket id printed by `prepare`
        ticket_id: String,
    },

    /// Show per-ticket progress
    Status {
        /// Limit output to one ticket
        ticket_id: Option<String>,
    },

    /// Print version information
    Version,
}

#[derive(Args, Debug, Clone, Default)]
pub struct PrepareArgs {
    /// Ticket text
    pub text: Option<String>,

    /// Read the ticket text from a file
    #[arg(short, long, conflicts_with = "text")]
    pub file: Option<PathBuf>,

    /// Service name (repeatable)
    #[arg(short, long = "service")]
    pub services: Vec<String>,

    /// Window start, e.g. "2025-01-20 08:00:00"
    #[arg(long)]
    pub start_time: Option<String>,

    /// Window end
    #[arg(long)]
    pub end_time: Option<String>,

    /// Override the ticket id
    #[arg(long)]
    pub ticket_id: Option<String>,
}
