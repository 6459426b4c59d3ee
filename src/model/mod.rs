//! Data model for caseops
//!
//! One record shape covers every tracked table (service requests,
//! waitlist signups). Status and priority travel as raw strings so
//! that out-of-set values survive deserialization and can be flagged
//! by the integrity auditor instead of failing the fetch.

mod record;

pub use record::{Record, RecordPriority, RecordStatus};
