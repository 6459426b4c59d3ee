//! Sequential idempotent replay

use std::sync::Arc;

use serde::Serialize;

use crate::confirm::ConfirmationPort;
use crate::store::{RecordStore, UpsertOutcome};

use super::validator::ValidatedBackup;

/// Item outcomes for one restored table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TableRestoreCounts {
    pub inserted: usize,
    pub skipped: usize,
    pub errored: usize,
}

/// Per-table outcome counts for one live restore.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RestoreSummary {
    pub tables: Vec<(String, TableRestoreCounts)>,
}

impl RestoreSummary {
    /// Sums every table.
    pub fn totals(&self) -> TableRestoreCounts {
        let mut totals = TableRestoreCounts::default();
        for (_, counts) in &self.tables {
            totals.inserted += counts.inserted;
            totals.skipped += counts.skipped;
            totals.errored += counts.errored;
        }
        totals
    }

    /// True when any record failed to apply.
    pub fn had_errors(&self) -> bool {
        self.totals().errored > 0
    }
}

/// Result of a restore attempt.
#[derive(Debug)]
pub enum RestoreRun {
    /// The payload checksum did not match and no override was
    /// given; nothing was written.
    ChecksumBlocked { expected: String, actual: String },
    /// The operator declined the confirmation prompt; nothing was
    /// written.
    Declined,
    /// The replay ran to completion (item errors included).
    Completed(RestoreSummary),
}

/// Replays a validated backup into the store.
pub struct RestoreManager {
    store: Arc<dyn RecordStore>,
}

impl RestoreManager {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Live restore behind the confirmation gate.
    ///
    /// A checksum mismatch blocks the run unless `override_checksum`
    /// is set. Records are applied strictly one at a time; an error
    /// on one record is counted and the replay continues.
    pub async fn restore(
        &self,
        backup: &ValidatedBackup,
        override_checksum: bool,
        confirm: &dyn ConfirmationPort,
    ) -> RestoreRun {
        if let crate::backup::ChecksumComparison::Mismatch { expected, actual } = &backup.checksum
        {
            if !override_checksum {
                return RestoreRun::ChecksumBlocked {
                    expected: expected.clone(),
                    actual: actual.clone(),
                };
            }
        }

        let total = backup.file.total_rows();
        let question = format!(
            "Restore {} records into {} tables? Existing ids are skipped.",
            total,
            backup.file.data.len()
        );
        if !confirm.ask(&question) {
            return RestoreRun::Declined;
        }

        let mut summary = RestoreSummary::default();

        for (table, records) in &backup.file.data {
            let mut counts = TableRestoreCounts::default();
            for record in records {
                match self.store.upsert(table, record).await {
                    Ok(UpsertOutcome::Inserted) => counts.inserted += 1,
                    Ok(UpsertOutcome::Updated) => counts.skipped += 1,
                    Err(_) => counts.errored += 1,
                }
            }
            summary.tables.push((table.clone(), counts));
        }

        RestoreRun::Completed(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::{BackupData, BackupFile, BackupManager};
    use crate::confirm::ScriptedConfirmation;
    use crate::model::Record;
    use crate::restore::load_backup;
    use crate::store::MemoryRecordStore;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn rec(id: &str) -> Record {
        let created = Utc.with_ymd_and_hms(2026, 7, 1, 9, 0, 0).unwrap();
        Record {
            id: id.to_string(),
            name: format!("contact-{}", id),
            email: format!("{}@example.com", id),
            phone: "5553017788".to_string(),
            status: "pending".to_string(),
            priority: "normal".to_string(),
            service_type: "plumbing".to_string(),
            description: String::new(),
            estimated_value: Some(250.0),
            notes: None,
            assigned_to: None,
            created_at: created,
            updated_at: created,
            completed_at: None,
        }
    }

    fn validated_from(records: Vec<Record>) -> ValidatedBackup {
        let mut data = BackupData::new();
        data.insert("service_requests".to_string(), records);
        let file = BackupFile::assemble(data, Utc.with_ymd_and_hms(2026, 8, 7, 12, 0, 0).unwrap())
            .unwrap();
        ValidatedBackup {
            file,
            checksum: crate::backup::ChecksumComparison::Match,
        }
    }

    fn empty_target() -> Arc<MemoryRecordStore> {
        let store = Arc::new(MemoryRecordStore::new());
        store.seed("service_requests", vec![]);
        store
    }

    async fn completed(
        manager: &RestoreManager,
        backup: &ValidatedBackup,
        override_checksum: bool,
    ) -> RestoreSummary {
        match manager
            .restore(backup, override_checksum, &ScriptedConfirmation::new(true))
            .await
        {
            RestoreRun::Completed(summary) => summary,
            other => panic!("expected completion, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_roundtrip_restores_id_set_and_fields() {
        // Export from a seeded store, restore into an empty one
        let source = Arc::new(MemoryRecordStore::new());
        source.seed("service_requests", vec![rec("a"), rec("b"), rec("c")]);
        let dir = TempDir::new().unwrap();

        let exported = BackupManager::new(source.clone())
            .export(&["service_requests".to_string()], dir.path(), false, 5)
            .await
            .unwrap();

        let backup = load_backup(&exported.path).unwrap();
        assert!(backup.checksum_ok());

        let target = empty_target();
        let summary = completed(&RestoreManager::new(target.clone()), &backup, false).await;

        assert_eq!(summary.totals().inserted, 3);
        assert_eq!(summary.totals().skipped, 0);
        assert_eq!(summary.totals().errored, 0);

        let source_ids: BTreeSet<String> =
            source.rows("service_requests").into_iter().map(|r| r.id).collect();
        let target_ids: BTreeSet<String> =
            target.rows("service_requests").into_iter().map(|r| r.id).collect();
        assert_eq!(source_ids, target_ids);

        let restored = target.rows("service_requests");
        let original = source.rows("service_requests");
        for record in &original {
            let twin = restored.iter().find(|r| r.id == record.id).unwrap();
            assert_eq!(twin, record);
        }
    }

    #[tokio::test]
    async fn test_second_restore_is_idempotent() {
        let backup = validated_from(vec![rec("a"), rec("b")]);
        let target = empty_target();
        let manager = RestoreManager::new(target.clone());

        let first = completed(&manager, &backup, false).await;
        assert_eq!(first.totals().inserted, 2);

        let second = completed(&manager, &backup, false).await;
        assert_eq!(second.totals().inserted, 0);
        assert_eq!(second.totals().skipped, 2);
        assert_eq!(target.rows("service_requests").len(), 2);
    }

    #[tokio::test]
    async fn test_checksum_mismatch_blocks_without_override() {
        let mut backup = validated_from(vec![rec("a")]);
        backup.checksum = crate::backup::ChecksumComparison::Mismatch {
            expected: "sha256:aaaa".to_string(),
            actual: "sha256:bbbb".to_string(),
        };

        let target = empty_target();
        let run = RestoreManager::new(target.clone())
            .restore(&backup, false, &ScriptedConfirmation::new(true))
            .await;

        assert!(matches!(run, RestoreRun::ChecksumBlocked { .. }));
        assert!(target.rows("service_requests").is_empty());
    }

    #[tokio::test]
    async fn test_checksum_mismatch_proceeds_with_override() {
        let mut backup = validated_from(vec![rec("a")]);
        backup.checksum = crate::backup::ChecksumComparison::Mismatch {
            expected: "sha256:aaaa".to_string(),
            actual: "sha256:bbbb".to_string(),
        };

        let target = empty_target();
        let summary = completed(&RestoreManager::new(target.clone()), &backup, true).await;
        assert_eq!(summary.totals().inserted, 1);
    }

    #[tokio::test]
    async fn test_declined_confirmation_writes_nothing() {
        let backup = validated_from(vec![rec("a")]);
        let target = empty_target();

        let run = RestoreManager::new(target.clone())
            .restore(&backup, false, &ScriptedConfirmation::new(false))
            .await;

        assert!(matches!(run, RestoreRun::Declined));
        assert!(target.rows("service_requests").is_empty());
    }

    #[tokio::test]
    async fn test_per_record_error_does_not_abort_the_replay() {
        let backup = validated_from(vec![rec("a"), rec("b"), rec("c")]);
        let target = empty_target();
        target.fail_writes_on("b");

        let summary = completed(&RestoreManager::new(target.clone()), &backup, false).await;

        assert_eq!(summary.totals().inserted, 2);
        assert_eq!(summary.totals().errored, 1);
        assert!(summary.had_errors());

        let ids: Vec<String> = target
            .rows("service_requests")
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["a".to_string(), "c".to_string()]);
    }

    #[tokio::test]
    async fn test_restore_into_missing_table_counts_errors() {
        let backup = validated_from(vec![rec("a"), rec("b")]);
        let target = Arc::new(MemoryRecordStore::new()); // no tables at all

        let summary = completed(&RestoreManager::new(target), &backup, false).await;
        assert_eq!(summary.totals().errored, 2);
        assert_eq!(summary.totals().inserted, 0);
    }
}
