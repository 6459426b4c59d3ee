//! caseops CLI entry point
//!
//! A minimal entrypoint that:
//! 1. Parses CLI arguments (via cli::run)
//! 2. Dispatches to the selected command (via cli::run)
//! 3. Exits with the command's status code
//!
//! All logic is delegated to the CLI module.

use caseops::cli;

#[tokio::main]
async fn main() {
    std::process::exit(cli::run().await);
}
