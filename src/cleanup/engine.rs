//! Analysis and confirmed execution

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;

use crate::audit::{AuditConfig, IntegrityAuditor, IntegrityReport};
use crate::confirm::ConfirmationPort;
use crate::model::{Record, RecordPriority, RecordStatus};
use crate::store::{RecordStore, StoreResult};

use super::outcome::{CategoryOutcome, CleanupOutcome};

/// Which corrective actions a run may take.
#[derive(Debug, Clone)]
pub struct CleanupOptions {
    pub fix_invalid_status: bool,
    pub fix_invalid_priority: bool,
    pub remove_stale_completed: bool,
    pub remove_cancelled: bool,
    pub remove_duplicates: bool,
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self {
            fix_invalid_status: true,
            fix_invalid_priority: true,
            remove_stale_completed: true,
            remove_cancelled: true,
            remove_duplicates: true,
        }
    }
}

/// Result of an execution attempt.
#[derive(Debug)]
pub enum CleanupRun {
    /// The operator declined the confirmation prompt; nothing was
    /// written.
    Declined,
    /// The batch ran to completion (item errors included in the
    /// outcome).
    Completed(CleanupOutcome),
}

/// Dry-run analysis plus confirmed corrective mutation.
pub struct CleanupEngine {
    store: Arc<dyn RecordStore>,
    table: String,
    auditor: IntegrityAuditor,
}

impl CleanupEngine {
    pub fn new(store: Arc<dyn RecordStore>, table: impl Into<String>, config: AuditConfig) -> Self {
        Self {
            store,
            table: table.into(),
            auditor: IntegrityAuditor::new(config),
        }
    }

    /// Fetches the table and partitions it. Never writes; this is
    /// the dry-run default, and `execute` consumes its output.
    pub async fn analyze(&self) -> StoreResult<IntegrityReport> {
        let records = self.store.fetch_all(&self.table).await?;
        Ok(self.auditor.analyze(&records, Utc::now()))
    }

    /// Applies the selected corrections behind the confirmation
    /// gate. A declined prompt writes nothing. Item failures are
    /// counted and the batch continues.
    pub async fn execute(
        &self,
        report: &IntegrityReport,
        options: &CleanupOptions,
        confirm: &dyn ConfirmationPort,
    ) -> CleanupRun {
        let planned = self.planned_actions(report, options);
        if planned == 0 {
            return CleanupRun::Completed(CleanupOutcome::default());
        }

        let question = format!(
            "Apply {} corrective actions to table {}? This cannot be undone.",
            planned, self.table
        );
        if !confirm.ask(&question) {
            return CleanupRun::Declined;
        }

        let mut outcome = CleanupOutcome::default();
        let mut deleted: HashSet<String> = HashSet::new();

        if options.fix_invalid_status {
            outcome.invalid_status = self
                .fix_batch(&report.invalid_status, coerce_status)
                .await;
        }
        if options.fix_invalid_priority {
            outcome.invalid_priority = self
                .fix_batch(&report.invalid_priority, coerce_priority)
                .await;
        }
        if options.remove_stale_completed {
            outcome.stale_completed = self
                .remove_batch(&report.stale_completed, &mut deleted)
                .await;
        }
        if options.remove_cancelled {
            outcome.cancelled = self.remove_batch(&report.cancelled, &mut deleted).await;
        }
        if options.remove_duplicates {
            outcome.duplicates = self.remove_batch(&report.duplicates, &mut deleted).await;
        }

        CleanupRun::Completed(outcome)
    }

    fn planned_actions(&self, report: &IntegrityReport, options: &CleanupOptions) -> usize {
        let mut planned = 0;
        if options.fix_invalid_status {
            planned += report.invalid_status.len();
        }
        if options.fix_invalid_priority {
            planned += report.invalid_priority.len();
        }
        if options.remove_stale_completed {
            planned += report.stale_completed.len();
        }
        if options.remove_cancelled {
            planned += report.cancelled.len();
        }
        if options.remove_duplicates {
            planned += report.duplicates.len();
        }
        planned
    }

    async fn fix_batch(
        &self,
        records: &[Record],
        fix: fn(&mut Record),
    ) -> CategoryOutcome {
        let mut outcome = CategoryOutcome::default();

        for record in records {
            let mut corrected = record.clone();
            fix(&mut corrected);
            corrected.updated_at = Utc::now();

            match self.store.update(&self.table, &record.id, &corrected).await {
                Ok(()) => outcome.fixed += 1,
                Err(_) => outcome.errored += 1,
            }
        }

        outcome
    }

    async fn remove_batch(
        &self,
        records: &[Record],
        deleted: &mut HashSet<String>,
    ) -> CategoryOutcome {
        let mut outcome = CategoryOutcome::default();

        for record in records {
            // A record can sit in several removal partitions; only
            // the first class that reaches it deletes it.
            if !deleted.insert(record.id.clone()) {
                continue;
            }
            match self.store.delete(&self.table, &record.id).await {
                Ok(()) => outcome.removed += 1,
                Err(_) => outcome.errored += 1,
            }
        }

        outcome
    }
}

/// Out-of-set status falls back to `pending`.
fn coerce_status(record: &mut Record) {
    if record.parsed_status().is_none() {
        record.status = RecordStatus::Pending.as_str().to_string();
    }
}

/// Out-of-set priority falls back to `normal`. The status is coerced
/// too when invalid, so a priority fix never writes an invalid
/// status back over an earlier status fix.
fn coerce_priority(record: &mut Record) {
    if record.parsed_priority().is_none() {
        record.priority = RecordPriority::Normal.as_str().to_string();
    }
    coerce_status(record);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirm::ScriptedConfirmation;
    use crate::store::MemoryRecordStore;
    use chrono::TimeZone;

    fn rec(id: &str, status: &str, priority: &str) -> Record {
        let created = Utc.with_ymd_and_hms(2026, 7, 1, 9, 0, 0).unwrap();
        Record {
            id: id.to_string(),
            name: format!("contact-{}", id),
            email: format!("{}@example.com", id),
            phone: "5553017788".to_string(),
            status: status.to_string(),
            priority: priority.to_string(),
            service_type: "plumbing".to_string(),
            description: String::new(),
            estimated_value: None,
            notes: None,
            assigned_to: None,
            created_at: created,
            updated_at: created,
            completed_at: None,
        }
    }

    fn engine_over(store: Arc<MemoryRecordStore>) -> CleanupEngine {
        CleanupEngine::new(store, "service_requests", AuditConfig::default())
    }

    #[tokio::test]
    async fn test_analyze_is_side_effect_free() {
        let store = Arc::new(MemoryRecordStore::new());
        store.seed(
            "service_requests",
            vec![rec("a", "pending", "normal"), rec("b", "bogus", "normal")],
        );
        let before = store.rows("service_requests");

        let report = engine_over(store.clone()).analyze().await.unwrap();
        assert_eq!(report.invalid_status.len(), 1);

        assert_eq!(store.rows("service_requests"), before);
    }

    #[tokio::test]
    async fn test_bogus_status_scenario() {
        // Two valid pending records, one with status "bogus".
        let store = Arc::new(MemoryRecordStore::new());
        store.seed(
            "service_requests",
            vec![
                rec("a", "pending", "normal"),
                rec("b", "pending", "normal"),
                rec("c", "bogus", "normal"),
            ],
        );
        let engine = engine_over(store.clone());

        let report = engine.analyze().await.unwrap();
        assert_eq!(report.invalid_status.len(), 1);

        let run = engine
            .execute(
                &report,
                &CleanupOptions::default(),
                &ScriptedConfirmation::new(true),
            )
            .await;

        let outcome = match run {
            CleanupRun::Completed(outcome) => outcome,
            CleanupRun::Declined => panic!("scripted confirmation accepted"),
        };
        assert_eq!(outcome.invalid_status.fixed, 1);
        assert_eq!(outcome.totals().removed, 0);

        let rows = store.rows("service_requests");
        assert_eq!(rows.len(), 3);
        let fixed = rows.iter().find(|r| r.id == "c").unwrap();
        assert_eq!(fixed.status, "pending");
        // The two valid records are untouched
        assert_eq!(rows.iter().find(|r| r.id == "a").unwrap().status, "pending");
        assert_eq!(rows.iter().find(|r| r.id == "b").unwrap().status, "pending");
    }

    #[tokio::test]
    async fn test_declined_confirmation_writes_nothing() {
        let store = Arc::new(MemoryRecordStore::new());
        store.seed(
            "service_requests",
            vec![rec("a", "bogus", "normal"), rec("b", "cancelled", "normal")],
        );
        let before = store.rows("service_requests");
        let engine = engine_over(store.clone());

        let report = engine.analyze().await.unwrap();
        let run = engine
            .execute(
                &report,
                &CleanupOptions::default(),
                &ScriptedConfirmation::new(false),
            )
            .await;

        assert!(matches!(run, CleanupRun::Declined));
        assert_eq!(store.rows("service_requests"), before);
    }

    #[tokio::test]
    async fn test_removals_delete_flagged_records() {
        let mut stale = rec("a", "completed", "normal");
        stale.completed_at = Some(Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap());

        let store = Arc::new(MemoryRecordStore::new());
        store.seed(
            "service_requests",
            vec![
                stale,
                rec("b", "cancelled", "normal"),
                rec("c", "pending", "normal"),
            ],
        );
        let engine = engine_over(store.clone());

        let report = engine.analyze().await.unwrap();
        let run = engine
            .execute(
                &report,
                &CleanupOptions::default(),
                &ScriptedConfirmation::new(true),
            )
            .await;

        let outcome = match run {
            CleanupRun::Completed(outcome) => outcome,
            CleanupRun::Declined => panic!("scripted confirmation accepted"),
        };
        assert_eq!(outcome.stale_completed.removed, 1);
        assert_eq!(outcome.cancelled.removed, 1);

        let rows = store.rows("service_requests");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "c");
    }

    #[tokio::test]
    async fn test_overlapping_partitions_delete_once() {
        // Two cancelled records sharing a correlation key: the
        // second is both cancelled and a duplicate.
        let store = Arc::new(MemoryRecordStore::new());
        let mut first = rec("a", "cancelled", "normal");
        let mut second = rec("b", "cancelled", "normal");
        first.email = "dana@example.com".to_string();
        second.email = "dana@example.com".to_string();
        store.seed("service_requests", vec![first, second]);
        let engine = engine_over(store.clone());

        let report = engine.analyze().await.unwrap();
        assert_eq!(report.cancelled.len(), 2);
        assert_eq!(report.duplicates.len(), 1);

        let run = engine
            .execute(
                &report,
                &CleanupOptions::default(),
                &ScriptedConfirmation::new(true),
            )
            .await;

        let outcome = match run {
            CleanupRun::Completed(outcome) => outcome,
            CleanupRun::Declined => panic!("scripted confirmation accepted"),
        };
        assert_eq!(outcome.cancelled.removed, 2);
        assert_eq!(outcome.duplicates.removed, 0);
        assert_eq!(outcome.totals().errored, 0);
        assert!(store.rows("service_requests").is_empty());
    }

    #[tokio::test]
    async fn test_single_failure_does_not_abort_the_batch() {
        let store = Arc::new(MemoryRecordStore::new());
        store.seed(
            "service_requests",
            vec![
                rec("a", "cancelled", "normal"),
                rec("b", "cancelled", "normal"),
                rec("c", "cancelled", "normal"),
            ],
        );
        store.fail_writes_on("b");
        let engine = engine_over(store.clone());

        let report = engine.analyze().await.unwrap();
        let run = engine
            .execute(
                &report,
                &CleanupOptions::default(),
                &ScriptedConfirmation::new(true),
            )
            .await;

        let outcome = match run {
            CleanupRun::Completed(outcome) => outcome,
            CleanupRun::Declined => panic!("scripted confirmation accepted"),
        };
        assert_eq!(outcome.cancelled.removed, 2);
        assert_eq!(outcome.cancelled.errored, 1);
        assert!(outcome.had_errors());

        let rows = store.rows("service_requests");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "b");
    }

    #[tokio::test]
    async fn test_empty_report_skips_confirmation() {
        let store = Arc::new(MemoryRecordStore::new());
        let mut a = rec("a", "pending", "normal");
        let mut b = rec("b", "in_progress", "high");
        a.email = "a@example.com".to_string();
        b.email = "b@example.com".to_string();
        store.seed("service_requests", vec![a, b]);
        let engine = engine_over(store.clone());

        let report = engine.analyze().await.unwrap();
        // A declining port proves the gate was never consulted
        let run = engine
            .execute(
                &report,
                &CleanupOptions::default(),
                &ScriptedConfirmation::new(false),
            )
            .await;

        assert!(matches!(run, CleanupRun::Completed(_)));
    }
}
