//! CLI module for caseops
//!
//! Subcommands:
//! - health: categorized probes, one aggregated report
//! - list: filtered record listing
//! - stats: aggregate statistics
//! - backup: checksummed export with retention rotation
//! - restore: verified, idempotent import
//! - cleanup: integrity analysis and confirmed repair
//! - monitor: change events logged per tick
//! - live: redrawn dashboard
//!
//! Every command prints a structured summary. The exit code is
//! non-zero exactly when a fail-class outcome occurred during the
//! run.

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{run, Config};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{DashboardRender, EventLogRender};
