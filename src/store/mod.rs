//! Record-store boundary
//!
//! The engines depend only on the `RecordStore` trait:
//! - query with filter/order/range
//! - count
//! - insert / update / delete
//! - upsert keyed by record id
//!
//! Two implementations:
//! - `HttpRecordStore`: the hosted store, reached over an
//!   authenticated REST call (PostgREST-style dialect).
//! - `MemoryRecordStore`: in-process tables with the same query
//!   semantics, used by tests.

mod client;
mod errors;
mod http;
mod memory;

pub use client::{Filter, Order, QueryOptions, QueryPage, Range, RecordStore, UpsertOutcome};
pub use errors::{StoreError, StoreResult};
pub use http::HttpRecordStore;
pub use memory::MemoryRecordStore;
