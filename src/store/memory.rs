//! In-memory record store
//!
//! Holds tables in a mutex'd map and applies the same
//! filter/order/range semantics as the hosted store. Used by the
//! engine tests; also handy for offline experiments.
//!
//! Test support: the store can be flipped offline (every call fails
//! with a connection error) and individual ids can be marked as
//! failing writes, which is how the bulk-mutation fault-tolerance
//! paths are exercised.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::model::Record;

use super::client::{Filter, QueryOptions, QueryPage, RecordStore, UpsertOutcome};
use super::errors::{StoreError, StoreResult};

/// In-process implementation of [`RecordStore`].
#[derive(Default)]
pub struct MemoryRecordStore {
    tables: Mutex<BTreeMap<String, Vec<Record>>>,
    offline: AtomicBool,
    failing_ids: Mutex<HashSet<String>>,
}

impl MemoryRecordStore {
    /// Empty store with no tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates (or replaces) a table with the given rows.
    pub fn seed(&self, table: &str, records: Vec<Record>) {
        self.tables
            .lock()
            .expect("store lock poisoned")
            .insert(table.to_string(), records);
    }

    /// Current rows of a table, empty if absent. Test helper.
    pub fn rows(&self, table: &str) -> Vec<Record> {
        self.tables
            .lock()
            .expect("store lock poisoned")
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Simulates the store being unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, AtomicOrdering::SeqCst);
    }

    /// Marks an id so that any write touching it fails.
    pub fn fail_writes_on(&self, id: &str) {
        self.failing_ids
            .lock()
            .expect("store lock poisoned")
            .insert(id.to_string());
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.offline.load(AtomicOrdering::SeqCst) {
            return Err(StoreError::connection("store offline"));
        }
        Ok(())
    }

    fn check_writable(&self, id: &str) -> StoreResult<()> {
        if self
            .failing_ids
            .lock()
            .expect("store lock poisoned")
            .contains(id)
        {
            return Err(StoreError::validation(format!(
                "write rejected for record {}",
                id
            )));
        }
        Ok(())
    }

    fn with_table<T>(
        &self,
        table: &str,
        f: impl FnOnce(&mut Vec<Record>) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut tables = self.tables.lock().expect("store lock poisoned");
        match tables.get_mut(table) {
            Some(rows) => f(rows),
            None => Err(StoreError::schema(format!(
                "table \"{}\" does not exist",
                table
            ))),
        }
    }
}

/// Looks up a column on the serialized record.
///
/// An absent column is a schema error; a null value is `None`.
fn column_value(serialized: &Value, column: &str) -> StoreResult<Option<String>> {
    match serialized.get(column) {
        None => Err(StoreError::schema(format!(
            "column \"{}\" does not exist",
            column
        ))),
        Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Ok(Some(other.to_string())),
    }
}

/// Numeric comparison when both sides parse, string otherwise.
fn compare_values(a: &str, b: &str) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.cmp(b),
    }
}

fn matches_filter(serialized: &Value, filter: &Filter) -> StoreResult<bool> {
    let actual = column_value(serialized, filter.column())?;
    let actual = match actual {
        Some(v) => v,
        // Null only matches inequality
        None => return Ok(matches!(filter, Filter::Neq(_, _))),
    };

    Ok(match filter {
        Filter::Eq(_, v) => actual == *v,
        Filter::Neq(_, v) => actual != *v,
        Filter::Lt(_, v) => compare_values(&actual, v) == Ordering::Less,
        Filter::Lte(_, v) => compare_values(&actual, v) != Ordering::Greater,
        Filter::Gt(_, v) => compare_values(&actual, v) == Ordering::Greater,
        Filter::Gte(_, v) => compare_values(&actual, v) != Ordering::Less,
    })
}

fn apply_options(rows: &[Record], options: &QueryOptions) -> StoreResult<(Vec<Record>, u64)> {
    let mut selected = Vec::new();
    for record in rows {
        let serialized = serde_json::to_value(record)?;
        let mut keep = true;
        for filter in &options.filters {
            if !matches_filter(&serialized, filter)? {
                keep = false;
                break;
            }
        }
        if keep {
            selected.push(record.clone());
        }
    }

    let total = selected.len() as u64;

    if let Some(order) = &options.order {
        // Validate the sort column against one row, then sort
        if let Some(first) = selected.first() {
            column_value(&serde_json::to_value(first)?, &order.column)?;
        }
        let column = order.column.clone();
        selected.sort_by(|a, b| {
            let left = serde_json::to_value(a)
                .ok()
                .and_then(|v| column_value(&v, &column).ok().flatten())
                .unwrap_or_default();
            let right = serde_json::to_value(b)
                .ok()
                .and_then(|v| column_value(&v, &column).ok().flatten())
                .unwrap_or_default();
            compare_values(&left, &right)
        });
        if order.descending {
            selected.reverse();
        }
    }

    if let Some(range) = &options.range {
        let from = range.from.min(selected.len());
        let to = range.to.saturating_add(1).min(selected.len()).max(from);
        selected = selected[from..to].to_vec();
    }

    Ok((selected, total))
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn query(&self, table: &str, options: &QueryOptions) -> StoreResult<QueryPage> {
        self.check_online()?;
        self.with_table(table, |rows| {
            let (records, total) = apply_options(rows, options)?;
            Ok(QueryPage {
                records,
                total: Some(total),
            })
        })
    }

    async fn count(&self, table: &str) -> StoreResult<u64> {
        self.check_online()?;
        self.with_table(table, |rows| Ok(rows.len() as u64))
    }

    async fn insert(&self, table: &str, record: &Record) -> StoreResult<()> {
        self.check_online()?;
        self.check_writable(&record.id)?;
        self.with_table(table, |rows| {
            if !record.id.is_empty() && rows.iter().any(|r| r.id == record.id) {
                return Err(StoreError::validation(format!(
                    "duplicate id {}",
                    record.id
                )));
            }
            let mut record = record.clone();
            if record.id.is_empty() {
                record.id = Uuid::new_v4().to_string();
            }
            rows.push(record);
            Ok(())
        })
    }

    async fn update(&self, table: &str, id: &str, record: &Record) -> StoreResult<()> {
        self.check_online()?;
        self.check_writable(id)?;
        self.with_table(table, |rows| {
            match rows.iter_mut().find(|r| r.id == id) {
                Some(slot) => {
                    *slot = record.clone();
                    slot.id = id.to_string();
                    Ok(())
                }
                None => Err(StoreError::validation(format!("no record with id {}", id))),
            }
        })
    }

    async fn delete(&self, table: &str, id: &str) -> StoreResult<()> {
        self.check_online()?;
        self.check_writable(id)?;
        self.with_table(table, |rows| {
            let before = rows.len();
            rows.retain(|r| r.id != id);
            if rows.len() == before {
                return Err(StoreError::validation(format!("no record with id {}", id)));
            }
            Ok(())
        })
    }

    async fn upsert(&self, table: &str, record: &Record) -> StoreResult<UpsertOutcome> {
        self.check_online()?;
        self.check_writable(&record.id)?;
        self.with_table(table, |rows| {
            match rows.iter_mut().find(|r| r.id == record.id) {
                Some(slot) => {
                    *slot = record.clone();
                    Ok(UpsertOutcome::Updated)
                }
                None => {
                    rows.push(record.clone());
                    Ok(UpsertOutcome::Inserted)
                }
            }
        })
    }
}
