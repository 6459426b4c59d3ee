//! Observability for caseops
//!
//! Structured JSON logging:
//! - one log line = one event
//! - deterministic key ordering
//! - synchronous, no buffering

mod logger;

pub use logger::{Logger, Severity};
