//! Cleanup engine
//!
//! Two-phase by construction:
//! - `analyze` runs the integrity auditor over a fresh fetch and is
//!   always side-effect-free (the dry-run default).
//! - `execute` mutates only behind the confirmation gate, fixing
//!   enum violations in place and deleting stale/cancelled/duplicate
//!   records.
//!
//! Bulk execution is fault-tolerant: a failed write on one record is
//! counted and the batch continues. The engine never aborts
//! mid-batch on a single error.

mod engine;
mod outcome;

pub use engine::{CleanupEngine, CleanupOptions, CleanupRun};
pub use outcome::{CategoryOutcome, CleanupOutcome};
