//! Probe orchestration
//!
//! Probes run in a fixed order and never abort the run; a probe
//! that cannot execute reports what stopped it. Connection failures
//! surface as `fail`, missing tables/columns as `warn` (the primary
//! table excepted, which the tool cannot operate without).

use std::sync::Arc;
use std::time::Instant;

use chrono::{Duration, Utc};
use futures_util::future::join_all;

use crate::audit::{AuditConfig, IntegrityAuditor};
use crate::store::{Filter, Order, QueryOptions, Range, RecordStore, StoreError};

use super::report::{HealthCategory, HealthCheckResult, HealthReport, HealthStatus};

/// Tunables for the health run.
#[derive(Debug, Clone)]
pub struct HealthConfig {
    /// Tables expected to exist.
    pub tables: Vec<String>,
    /// The table the tool cannot operate without.
    pub primary_table: String,
    /// Round-trip samples for the latency probe.
    pub latency_samples: usize,
    /// Average latency below this is a pass (milliseconds).
    pub latency_warn_ms: u64,
    /// Average latency below this is a warn; above, a fail.
    pub latency_fail_ms: u64,
    /// Concurrent reads in the parallel burst.
    pub parallel_reads: usize,
    /// Budget for the whole burst (milliseconds).
    pub parallel_budget_ms: u64,
    /// Budget for the mixed-query sequence (milliseconds).
    pub mixed_budget_ms: u64,
    /// Sample size for the required-fields probe.
    pub validation_sample: usize,
    /// Staleness cutoff handed to the integrity auditor.
    pub stale_after_days: i64,
    /// Assumed serialized row size for the storage estimate.
    pub assumed_row_bytes: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            tables: vec!["service_requests".to_string(), "waitlist".to_string()],
            primary_table: "service_requests".to_string(),
            latency_samples: 3,
            latency_warn_ms: 500,
            latency_fail_ms: 1000,
            parallel_reads: 6,
            parallel_budget_ms: 2000,
            mixed_budget_ms: 1500,
            validation_sample: 100,
            stale_after_days: 90,
            assumed_row_bytes: 1024,
        }
    }
}

/// Runs the categorized probe list against one store.
pub struct HealthCheckEngine {
    store: Arc<dyn RecordStore>,
    config: HealthConfig,
}

impl HealthCheckEngine {
    pub fn new(store: Arc<dyn RecordStore>, config: HealthConfig) -> Self {
        Self { store, config }
    }

    /// Executes every probe and aggregates the results.
    pub async fn run(&self) -> HealthReport {
        let mut results = Vec::new();

        results.push(timed(self.connectivity_latency()).await);
        results.extend(self.structure_tables().await);
        results.push(timed(self.parallel_burst()).await);
        results.push(timed(self.mixed_queries()).await);
        results.push(timed(self.restricted_query()).await);
        results.push(timed(self.integrity_violations()).await);
        results.push(timed(self.required_fields()).await);
        results.push(timed(self.timestamp_audit()).await);
        results.push(timed(self.storage_footprint()).await);

        HealthReport { results }
    }

    async fn connectivity_latency(&self) -> HealthCheckResult {
        let name = "connectivity.latency";
        let mut total_ms = 0u64;

        for _ in 0..self.config.latency_samples.max(1) {
            let start = Instant::now();
            if let Err(e) = self.store.count(&self.config.primary_table).await {
                return degraded(name, HealthCategory::Connectivity, &e);
            }
            total_ms += start.elapsed().as_millis() as u64;
        }

        let avg_ms = total_ms / self.config.latency_samples.max(1) as u64;
        let message = format!(
            "average round trip {} ms over {} samples",
            avg_ms, self.config.latency_samples
        );

        let status = if avg_ms < self.config.latency_warn_ms {
            HealthStatus::Pass
        } else if avg_ms < self.config.latency_fail_ms {
            HealthStatus::Warn
        } else {
            HealthStatus::Fail
        };

        HealthCheckResult::new(name, HealthCategory::Connectivity, status, message)
    }

    async fn structure_tables(&self) -> Vec<HealthCheckResult> {
        let mut results = Vec::new();

        for table in &self.config.tables {
            let name = format!("structure.{}", table);
            let start = Instant::now();
            let result = match self.store.count(table).await {
                Ok(rows) => HealthCheckResult::new(
                    name,
                    HealthCategory::Structure,
                    HealthStatus::Pass,
                    format!("table {} present, {} rows", table, rows),
                ),
                Err(e) if e.is_schema() && *table == self.config.primary_table => {
                    HealthCheckResult::new(
                        name,
                        HealthCategory::Structure,
                        HealthStatus::Fail,
                        format!("primary table {} is missing: {}", table, e),
                    )
                    .with_suggestion("verify the store schema before using this tool")
                }
                Err(e) if e.is_schema() => HealthCheckResult::new(
                    name,
                    HealthCategory::Structure,
                    HealthStatus::Warn,
                    format!("table {} is missing: {}", table, e),
                )
                .with_suggestion("create the table or drop it from the configured table list"),
                Err(e) => degraded(&name, HealthCategory::Structure, &e),
            };
            results.push(result.with_duration_ms(start.elapsed().as_millis() as u64));
        }

        results
    }

    async fn parallel_burst(&self) -> HealthCheckResult {
        let name = "performance.parallel_burst";
        let options = QueryOptions::default().with_range(Range::first(25));

        let start = Instant::now();
        let reads = (0..self.config.parallel_reads.max(1))
            .map(|_| self.store.query(&self.config.primary_table, &options))
            .collect::<Vec<_>>();
        let outcomes = join_all(reads).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        if let Some(Err(e)) = outcomes.iter().find(|o| o.is_err()) {
            return degraded(name, HealthCategory::Performance, e);
        }

        let message = format!(
            "{} concurrent reads completed in {} ms (budget {} ms)",
            self.config.parallel_reads, elapsed_ms, self.config.parallel_budget_ms
        );
        HealthCheckResult::new(
            name,
            HealthCategory::Performance,
            budget_status(elapsed_ms, self.config.parallel_budget_ms),
            message,
        )
    }

    async fn mixed_queries(&self) -> HealthCheckResult {
        let name = "performance.mixed_queries";
        let table = &self.config.primary_table;

        let filtered = QueryOptions::default()
            .with_filter(Filter::Eq("status".into(), "pending".into()))
            .with_range(Range::first(10));
        let ordered = QueryOptions::default()
            .with_order(Order::desc("created_at"))
            .with_range(Range::first(10));

        let start = Instant::now();
        for options in [&filtered, &ordered] {
            if let Err(e) = self.store.query(table, options).await {
                return degraded(name, HealthCategory::Performance, &e);
            }
        }
        if let Err(e) = self.store.count(table).await {
            return degraded(name, HealthCategory::Performance, &e);
        }
        let elapsed_ms = start.elapsed().as_millis() as u64;

        let message = format!(
            "filtered + ordered + count completed in {} ms (budget {} ms)",
            elapsed_ms, self.config.mixed_budget_ms
        );
        HealthCheckResult::new(
            name,
            HealthCategory::Performance,
            budget_status(elapsed_ms, self.config.mixed_budget_ms),
            message,
        )
    }

    async fn restricted_query(&self) -> HealthCheckResult {
        let name = "security.restricted_query";
        let options = QueryOptions::default()
            .with_filter(Filter::Eq("status".into(), "pending".into()))
            .with_range(Range::first(1));

        match self.store.query(&self.config.primary_table, &options).await {
            Ok(_) => HealthCheckResult::new(
                name,
                HealthCategory::Security,
                HealthStatus::Pass,
                "restrictive filtered read succeeded under the configured credential",
            ),
            Err(e) => degraded(name, HealthCategory::Security, &e),
        }
    }

    async fn integrity_violations(&self) -> HealthCheckResult {
        let name = "integrity.violations";
        let records = match self.store.fetch_all(&self.config.primary_table).await {
            Ok(records) => records,
            Err(e) => return degraded(name, HealthCategory::Integrity, &e),
        };

        let auditor = IntegrityAuditor::new(AuditConfig {
            stale_after_days: self.config.stale_after_days,
        });
        let report = auditor.analyze(&records, Utc::now());

        if report.is_clean() {
            return HealthCheckResult::new(
                name,
                HealthCategory::Integrity,
                HealthStatus::Pass,
                format!("no violations in {} records", report.scanned),
            );
        }

        let breakdown = report
            .class_counts()
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|(class, count)| format!("{}={}", class, count))
            .collect::<Vec<_>>()
            .join(", ");

        HealthCheckResult::new(
            name,
            HealthCategory::Integrity,
            HealthStatus::Warn,
            format!("{} flags in {} records: {}", report.total_flagged(), report.scanned, breakdown),
        )
        .with_suggestion("run `caseops cleanup --dry-run` to review the flagged records")
    }

    async fn required_fields(&self) -> HealthCheckResult {
        let name = "validation.required_fields";
        let options =
            QueryOptions::default().with_range(Range::first(self.config.validation_sample.max(1)));

        let page = match self.store.query(&self.config.primary_table, &options).await {
            Ok(page) => page,
            Err(e) => return degraded(name, HealthCategory::Validation, &e),
        };

        let missing_name = page.records.iter().filter(|r| r.name.trim().is_empty()).count();
        let missing_email = page
            .records
            .iter()
            .filter(|r| r.email.trim().is_empty())
            .count();

        if missing_name == 0 && missing_email == 0 {
            HealthCheckResult::new(
                name,
                HealthCategory::Validation,
                HealthStatus::Pass,
                format!("required fields present in all {} sampled records", page.records.len()),
            )
        } else {
            HealthCheckResult::new(
                name,
                HealthCategory::Validation,
                HealthStatus::Warn,
                format!(
                    "{} records missing name, {} missing email (sample of {})",
                    missing_name,
                    missing_email,
                    page.records.len()
                ),
            )
        }
    }

    async fn timestamp_audit(&self) -> HealthCheckResult {
        let name = "audit.timestamps";
        let records = match self.store.fetch_all(&self.config.primary_table).await {
            Ok(records) => records,
            Err(e) => return degraded(name, HealthCategory::Audit, &e),
        };

        let now = Utc::now();
        let regressed = records
            .iter()
            .filter(|r| r.updated_at < r.created_at)
            .count();
        let future_dated = records.iter().filter(|r| r.created_at > now).count();
        let misplaced_completion = records
            .iter()
            .filter(|r| r.completed_at.is_some() && !r.is_completed())
            .count();

        if regressed == 0 && future_dated == 0 && misplaced_completion == 0 {
            HealthCheckResult::new(
                name,
                HealthCategory::Audit,
                HealthStatus::Pass,
                format!("timestamps consistent across {} records", records.len()),
            )
        } else {
            HealthCheckResult::new(
                name,
                HealthCategory::Audit,
                HealthStatus::Warn,
                format!(
                    "{} updated_at regressions, {} future-dated, {} completed_at on non-completed",
                    regressed, future_dated, misplaced_completion
                ),
            )
        }
    }

    async fn storage_footprint(&self) -> HealthCheckResult {
        let name = "storage.footprint";
        let mut total_rows = 0u64;

        for table in &self.config.tables {
            match self.store.count(table).await {
                Ok(rows) => total_rows += rows,
                Err(e) if e.is_schema() => continue,
                Err(e) => return degraded(name, HealthCategory::Storage, &e),
            }
        }

        let now = Utc::now();
        let (week, month) = match self.store.fetch_all(&self.config.primary_table).await {
            Ok(records) => {
                let week_cutoff = now - Duration::days(7);
                let month_cutoff = now - Duration::days(30);
                (
                    records.iter().filter(|r| r.created_at >= week_cutoff).count(),
                    records.iter().filter(|r| r.created_at >= month_cutoff).count(),
                )
            }
            Err(e) => return degraded(name, HealthCategory::Storage, &e),
        };

        let estimate = total_rows * self.config.assumed_row_bytes;
        HealthCheckResult::new(
            name,
            HealthCategory::Storage,
            HealthStatus::Info,
            format!(
                "~{} across {} rows; +{} records in 7d, +{} in 30d",
                format_bytes(estimate),
                total_rows,
                week,
                month
            ),
        )
    }
}

/// Wraps a probe with wall-clock timing.
async fn timed<F>(probe: F) -> HealthCheckResult
where
    F: std::future::Future<Output = HealthCheckResult>,
{
    let start = Instant::now();
    let result = probe.await;
    let elapsed = start.elapsed().as_millis() as u64;
    result.with_duration_ms(elapsed)
}

/// pass within budget, warn within twice the budget, fail beyond.
fn budget_status(elapsed_ms: u64, budget_ms: u64) -> HealthStatus {
    if elapsed_ms <= budget_ms {
        HealthStatus::Pass
    } else if elapsed_ms <= budget_ms * 2 {
        HealthStatus::Warn
    } else {
        HealthStatus::Fail
    }
}

/// Maps a store error onto the continue-on-error contract.
fn degraded(name: &str, category: HealthCategory, error: &StoreError) -> HealthCheckResult {
    match error {
        StoreError::Connection(_) => HealthCheckResult::new(
            name,
            category,
            HealthStatus::Fail,
            format!("probe could not reach the store: {}", error),
        )
        .with_suggestion("check the store endpoint and credential"),
        StoreError::Schema(_) => HealthCheckResult::new(
            name,
            category,
            HealthStatus::Warn,
            format!("probe skipped: {}", error),
        ),
        _ => HealthCheckResult::new(
            name,
            category,
            HealthStatus::Warn,
            format!("probe degraded: {}", error),
        ),
    }
}

/// Human-readable byte count.
fn format_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * 1024;
    if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{} B", bytes)
    }
}
