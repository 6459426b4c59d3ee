//! Hosted record store over REST
//!
//! Speaks a PostgREST-style dialect: filters as query pairs
//! (`status=eq.pending`), `order=col.desc`, row windows via `Range`
//! headers, totals via `Prefer: count=exact` + `Content-Range`.
//! Authentication is an api-key header pair supplied once at
//! construction.
//!
//! Upsert is implemented as read-then-write (two round trips). The
//! store offers no multi-record transaction boundary here, and the
//! callers are administrative tools, so the race window is accepted.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};

use crate::model::Record;

use super::client::{QueryOptions, QueryPage, RecordStore, UpsertOutcome};
use super::errors::{StoreError, StoreResult};
use super::Filter;

use async_trait::async_trait;

/// REST-backed implementation of [`RecordStore`].
pub struct HttpRecordStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpRecordStore {
    /// Builds a store client for the given endpoint and credential.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::connection(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }

    fn table_url(&self, table: &str) -> StoreResult<Url> {
        let raw = format!("{}/rest/v1/{}", self.base_url.trim_end_matches('/'), table);
        Url::parse(&raw)
            .map_err(|e| StoreError::connection(format!("invalid store URL {}: {}", raw, e)))
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", &self.api_key))
    }

    async fn check(&self, response: Response) -> StoreResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "failed to read error body".to_string());
        Err(response_error(status, &body))
    }
}

/// Classifies a non-success response into the store error taxonomy.
fn response_error(status: StatusCode, body: &str) -> StoreError {
    if status == StatusCode::NOT_FOUND || body.contains("does not exist") {
        return StoreError::schema(body.to_string());
    }
    StoreError::Api {
        status: status.as_u16(),
        message: body.to_string(),
    }
}

/// Parses the total from a `Content-Range` value like `0-24/3573`.
///
/// Returns `None` for an unknown total (`*`) or a malformed header.
fn parse_content_range_total(value: &str) -> Option<u64> {
    let total = value.rsplit('/').next()?;
    total.parse().ok()
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    async fn query(&self, table: &str, options: &QueryOptions) -> StoreResult<QueryPage> {
        let url = self.table_url(table)?;
        let mut req = self
            .request(Method::GET, url)
            .header("Prefer", "count=exact")
            .query(&[("select", "*")]);

        for filter in &options.filters {
            let (column, predicate) = filter.to_query_pair();
            req = req.query(&[(column, predicate)]);
        }

        if let Some(order) = &options.order {
            let direction = if order.descending { "desc" } else { "asc" };
            req = req.query(&[("order", format!("{}.{}", order.column, direction))]);
        }

        if let Some(range) = &options.range {
            req = req
                .header("Range-Unit", "items")
                .header("Range", format!("{}-{}", range.from, range.to));
        }

        let response = self.check(req.send().await?).await?;

        let total = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total);

        let records: Vec<Record> = response.json().await?;
        Ok(QueryPage { records, total })
    }

    async fn count(&self, table: &str) -> StoreResult<u64> {
        // Minimal window; the count rides in on Content-Range.
        let page = self
            .query(
                table,
                &QueryOptions::default().with_range(super::Range { from: 0, to: 0 }),
            )
            .await?;

        Ok(page.total.unwrap_or(page.records.len() as u64))
    }

    async fn insert(&self, table: &str, record: &Record) -> StoreResult<()> {
        let url = self.table_url(table)?;
        let response = self
            .request(Method::POST, url)
            .header("Prefer", "return=minimal")
            .json(record)
            .send()
            .await?;

        self.check(response).await?;
        Ok(())
    }

    async fn update(&self, table: &str, id: &str, record: &Record) -> StoreResult<()> {
        let url = self.table_url(table)?;
        let response = self
            .request(Method::PATCH, url)
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=minimal")
            .json(record)
            .send()
            .await?;

        self.check(response).await?;
        Ok(())
    }

    async fn delete(&self, table: &str, id: &str) -> StoreResult<()> {
        let url = self.table_url(table)?;
        let response = self
            .request(Method::DELETE, url)
            .query(&[("id", format!("eq.{}", id))])
            .send()
            .await?;

        self.check(response).await?;
        Ok(())
    }

    async fn upsert(&self, table: &str, record: &Record) -> StoreResult<UpsertOutcome> {
        let existing = self
            .query(
                table,
                &QueryOptions::default()
                    .with_filter(Filter::Eq("id".into(), record.id.clone())),
            )
            .await?;

        if existing.records.is_empty() {
            self.insert(table, record).await?;
            Ok(UpsertOutcome::Inserted)
        } else {
            self.update(table, &record.id, record).await?;
            Ok(UpsertOutcome::Updated)
        }
    }
}
