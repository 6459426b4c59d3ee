//! Restore subsystem
//!
//! Validation first, then apply:
//! - `load_backup` parses the file and recomputes the payload
//!   checksum. A mismatch is reported, not fatal; proceeding past it
//!   requires the explicit override flag.
//! - `RestoreManager` replays records one at a time through
//!   `upsert`, classifying each as inserted, skipped (id already
//!   present) or errored. One bad record never aborts the rest.
//!
//! Restoring the same backup twice is a no-op by construction: the
//! second pass classifies every record as skipped.

mod restorer;
mod validator;

pub use restorer::{RestoreManager, RestoreRun, RestoreSummary, TableRestoreCounts};
pub use validator::{load_backup, ValidatedBackup};
