use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = env!("CARGO_PKG_NAME"))]
#[command(about = env!("CARGO_PKG_DESCRIPTION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Record the start of a new batch, replacing the previous record
    Start,
    /// Record the completion percentage of a pipeline stage
    Stage {
        /// Stage name (scrape, enrich, deduplicate, mockup, personalize, email)
        stage: String,
        /// Completion percentage, 0 to 100
        #[arg(allow_hyphen_values = true)]
        percentage: i64,
    },
    /// Record the end of the current batch
    End,
    /// Show the current batch status
    Status,
    /// Check the current batch against the deadline and exit non-zero on violation
    Check,
    /// Run the completion monitor (default)
    Monitor {
        /// Run a single check, alerting if needed, then exit
        #[arg(long)]
        once: bool,
    },
    /// Show version information
    Version,
}
