//! The abstract record-store capability
//!
//! Everything above the store boundary (health, cleanup, backup,
//! restore, monitor) takes an `Arc<dyn RecordStore>` so tests can
//! substitute the in-memory implementation.

use async_trait::async_trait;

use crate::model::Record;

use super::errors::StoreResult;

/// A single column predicate.
///
/// Values are carried as strings; RFC 3339 timestamps compare
/// correctly in this form, and numeric columns are compared
/// numerically by the in-memory implementation when both sides
/// parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// column = value
    Eq(String, String),
    /// column != value
    Neq(String, String),
    /// column < value
    Lt(String, String),
    /// column <= value
    Lte(String, String),
    /// column > value
    Gt(String, String),
    /// column >= value
    Gte(String, String),
}

impl Filter {
    /// The column this predicate applies to.
    pub fn column(&self) -> &str {
        match self {
            Filter::Eq(c, _)
            | Filter::Neq(c, _)
            | Filter::Lt(c, _)
            | Filter::Lte(c, _)
            | Filter::Gt(c, _)
            | Filter::Gte(c, _) => c,
        }
    }

    /// Renders the predicate as a PostgREST query pair,
    /// e.g. `("status", "eq.pending")`.
    pub fn to_query_pair(&self) -> (String, String) {
        let (column, op, value) = match self {
            Filter::Eq(c, v) => (c, "eq", v),
            Filter::Neq(c, v) => (c, "neq", v),
            Filter::Lt(c, v) => (c, "lt", v),
            Filter::Lte(c, v) => (c, "lte", v),
            Filter::Gt(c, v) => (c, "gt", v),
            Filter::Gte(c, v) => (c, "gte", v),
        };
        (column.clone(), format!("{}.{}", op, value))
    }
}

/// Sort specification for a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// Column to sort by.
    pub column: String,
    /// Descending when true.
    pub descending: bool,
}

impl Order {
    /// Ascending order on a column.
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: false,
        }
    }

    /// Descending order on a column.
    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: true,
        }
    }
}

/// Inclusive row range, zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub from: usize,
    pub to: usize,
}

impl Range {
    /// The first `limit` rows.
    pub fn first(limit: usize) -> Self {
        Self {
            from: 0,
            to: limit.saturating_sub(1),
        }
    }
}

/// Query parameters: filters, optional order, optional range.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub range: Option<Range>,
}

impl QueryOptions {
    /// Adds an equality filter.
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Sets the sort order.
    pub fn with_order(mut self, order: Order) -> Self {
        self.order = Some(order);
        self
    }

    /// Sets the row range.
    pub fn with_range(mut self, range: Range) -> Self {
        self.range = Some(range);
        self
    }
}

/// One page of query results.
#[derive(Debug, Clone)]
pub struct QueryPage {
    /// Records in this page.
    pub records: Vec<Record>,
    /// Total matching rows, when the backend reports one.
    pub total: Option<u64>,
}

/// Outcome of an upsert keyed by record id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The id was not present; a new row was created.
    Inserted,
    /// The id was already present; the existing row was rewritten.
    Updated,
}

/// Abstract CRUD/query capability over the backing store.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Filtered, ordered, ranged read. Returns the page plus the
    /// total matching count when the backend reports one.
    async fn query(&self, table: &str, options: &QueryOptions) -> StoreResult<QueryPage>;

    /// Full table contents.
    async fn fetch_all(&self, table: &str) -> StoreResult<Vec<Record>> {
        Ok(self.query(table, &QueryOptions::default()).await?.records)
    }

    /// Total row count for a table.
    async fn count(&self, table: &str) -> StoreResult<u64>;

    /// Inserts a new record. Fails if the id is already present.
    async fn insert(&self, table: &str, record: &Record) -> StoreResult<()>;

    /// Rewrites the record with the given id.
    async fn update(&self, table: &str, id: &str, record: &Record) -> StoreResult<()>;

    /// Deletes the record with the given id.
    async fn delete(&self, table: &str, id: &str) -> StoreResult<()>;

    /// Insert-or-update keyed by record id.
    async fn upsert(&self, table: &str, record: &Record) -> StoreResult<UpsertOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_query_pair() {
        let f = Filter::Eq("status".into(), "pending".into());
        assert_eq!(
            f.to_query_pair(),
            ("status".to_string(), "eq.pending".to_string())
        );

        let f = Filter::Gte("created_at".into(), "2026-07-01T00:00:00Z".into());
        assert_eq!(
            f.to_query_pair(),
            (
                "created_at".to_string(),
                "gte.2026-07-01T00:00:00Z".to_string()
            )
        );
    }

    #[test]
    fn test_range_first() {
        let r = Range::first(25);
        assert_eq!(r.from, 0);
        assert_eq!(r.to, 24);

        // Degenerate limit still yields a valid inclusive range
        let r = Range::first(0);
        assert_eq!(r.to, 0);
    }

    #[test]
    fn test_query_options_builder() {
        let opts = QueryOptions::default()
            .with_filter(Filter::Eq("status".into(), "pending".into()))
            .with_order(Order::desc("created_at"))
            .with_range(Range::first(10));

        assert_eq!(opts.filters.len(), 1);
        assert!(opts.order.as_ref().unwrap().descending);
        assert_eq!(opts.range.unwrap().to, 9);
    }
}
