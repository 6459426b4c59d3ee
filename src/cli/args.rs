//! CLI argument definitions using clap
//!
//! Commands:
//! - caseops health
//! - caseops list
//! - caseops stats
//! - caseops backup / restore
//! - caseops cleanup
//! - caseops monitor / live

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// caseops - operational toolkit for a hosted service-request record store
#[derive(Parser, Debug)]
#[command(name = "caseops")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, global = true, default_value = "./caseops.json")]
    pub config: PathBuf,

    /// Lower the log severity floor to TRACE
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the categorized health probes; exits non-zero on overall fail
    Health {
        /// Write the full JSON report to this path
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// List records from the primary table
    List {
        /// Only records with this status
        #[arg(long)]
        status: Option<String>,

        /// Only records with this priority
        #[arg(long)]
        priority: Option<String>,

        /// Maximum rows to print
        #[arg(long, default_value_t = 25)]
        limit: usize,
    },

    /// Print aggregate statistics over the primary table
    Stats {
        /// Trend window in days
        #[arg(long, default_value_t = 14)]
        days: u32,
    },

    /// Export a checksummed snapshot of the store
    Backup {
        /// Export a single table instead of every configured one
        #[arg(long)]
        table: Option<String>,

        /// Output directory (defaults to the configured one)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Gzip the file on disk
        #[arg(long)]
        compress: bool,
    },

    /// Import a backup file via idempotent upserts
    Restore {
        /// Backup file to restore from
        file: PathBuf,

        /// Report intended counts without writing
        #[arg(long)]
        dry_run: bool,

        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,

        /// Proceed despite a checksum mismatch
        #[arg(long)]
        override_checksum: bool,
    },

    /// Analyze integrity violations and repair them after confirmation
    Cleanup {
        /// Analyze and report only; never write
        #[arg(long)]
        dry_run: bool,

        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
    },

    /// Log change events as they happen
    Monitor {
        /// Seconds between snapshots (defaults to the configured interval)
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Redrawn live dashboard over the same change feed
    Live {
        /// Seconds between snapshots (defaults to the configured interval)
        #[arg(long)]
        interval: Option<u64>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
