//! Backup subsystem
//!
//! Export wraps full table contents in a checksummed JSON document:
//!
//! 1. Fetch each requested table, one at a time.
//! 2. Assemble metadata (schema version, timestamp, row counts) and
//!    the SHA-256 payload checksum.
//! 3. Write the document to the output directory, optionally
//!    gzipped.
//! 4. Rotate: delete backups beyond the retention cap, best-effort.
//!
//! A missing table is skipped and reported, not fatal; a store
//! connection failure aborts the export before anything is written.
//! Export is read-only with respect to the store.

mod checksum;
mod errors;
mod manifest;
mod rotation;

pub use checksum::{legacy_checksum, payload_checksum, verify_checksum, ChecksumComparison};
pub use errors::{BackupError, BackupResult};
pub use manifest::{payload_bytes, BackupData, BackupFile, BackupMetadata, SCHEMA_VERSION};
pub use rotation::{rotate_backups, RotationOutcome};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;

use crate::store::RecordStore;

/// What an export produced.
#[derive(Debug, Clone)]
pub struct ExportSummary {
    /// Where the backup landed.
    pub path: PathBuf,
    /// Rows written per table.
    pub row_counts: Vec<(String, usize)>,
    /// Tables skipped because the store does not have them.
    pub skipped_tables: Vec<String>,
    /// Rotation results.
    pub rotation: RotationOutcome,
}

/// Exports checksummed snapshots of the store.
pub struct BackupManager {
    store: Arc<dyn RecordStore>,
}

impl BackupManager {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Exports `tables` into `output_dir`, keeping the `retention`
    /// newest files afterwards.
    pub async fn export(
        &self,
        tables: &[String],
        output_dir: &Path,
        compress: bool,
        retention: usize,
    ) -> BackupResult<ExportSummary> {
        let mut data = BackupData::new();
        let mut skipped_tables = Vec::new();

        for table in tables {
            match self.store.fetch_all(table).await {
                Ok(records) => {
                    data.insert(table.clone(), records);
                }
                Err(e) if e.is_schema() => skipped_tables.push(table.clone()),
                Err(e) => return Err(e.into()),
            }
        }

        if data.is_empty() {
            return Err(BackupError::malformed(format!(
                "none of the requested tables exist: {}",
                tables.join(", ")
            )));
        }

        let now = Utc::now();
        let file = BackupFile::assemble(data, now)?;

        std::fs::create_dir_all(output_dir)
            .map_err(|e| BackupError::io_at(output_dir, e))?;

        let extension = if compress { "json.gz" } else { "json" };
        let filename = format!(
            "backup-{}.{}",
            now.format("%Y%m%dT%H%M%S%3fZ"),
            extension
        );
        let path = output_dir.join(filename);

        file.write_to_file(&path, compress)?;

        let rotation = rotate_backups(output_dir, retention);

        let row_counts = file
            .metadata
            .row_counts
            .iter()
            .map(|(table, count)| (table.clone(), *count))
            .collect();

        Ok(ExportSummary {
            path,
            row_counts,
            skipped_tables,
            rotation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Record;
    use crate::store::MemoryRecordStore;
    use chrono::TimeZone;
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
            estimated_value: None,
            notes: None,
            assigned_to: None,
            created_at: created,
            updated_at: created,
            completed_at: None,
        }
    }

    fn tables() -> Vec<String> {
        vec!["service_requests".to_string(), "waitlist".to_string()]
    }

    #[tokio::test]
    async fn test_export_writes_verifiable_file() {
        let store = Arc::new(MemoryRecordStore::new());
        store.seed("service_requests", vec![rec("a"), rec("b")]);
        store.seed("waitlist", vec![rec("w")]);
        let dir = TempDir::new().unwrap();

        let summary = BackupManager::new(store)
            .export(&tables(), dir.path(), false, 5)
            .await
            .unwrap();

        assert!(summary.path.exists());
        assert!(summary.skipped_tables.is_empty());
        assert_eq!(
            summary.row_counts,
            vec![
                ("service_requests".to_string(), 2),
                ("waitlist".to_string(), 1)
            ]
        );

        let file = BackupFile::read_from_file(&summary.path).unwrap();
        let payload = payload_bytes(&file.data).unwrap();
        assert!(verify_checksum(&payload, &file.metadata.checksum).is_match());
    }

    #[tokio::test]
    async fn test_export_skips_missing_table() {
        let store = Arc::new(MemoryRecordStore::new());
        store.seed("service_requests", vec![rec("a")]);
        let dir = TempDir::new().unwrap();

        let summary = BackupManager::new(store)
            .export(&tables(), dir.path(), false, 5)
            .await
            .unwrap();

        assert_eq!(summary.skipped_tables, vec!["waitlist".to_string()]);
        let file = BackupFile::read_from_file(&summary.path).unwrap();
        assert!(!file.data.contains_key("waitlist"));
    }

    #[tokio::test]
    async fn test_export_fails_when_store_unreachable() {
        let store = Arc::new(MemoryRecordStore::new());
        store.seed("service_requests", vec![rec("a")]);
        store.set_offline(true);
        let dir = TempDir::new().unwrap();

        let err = BackupManager::new(store)
            .export(&tables(), dir.path(), false, 5)
            .await
            .unwrap_err();
        assert!(matches!(err, BackupError::Store(_)));

        // Nothing was written
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_export_fails_when_no_tables_exist() {
        let store = Arc::new(MemoryRecordStore::new());
        let dir = TempDir::new().unwrap();

        let err = BackupManager::new(store)
            .export(&tables(), dir.path(), false, 5)
            .await
            .unwrap_err();
        assert!(matches!(err, BackupError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_export_rotates_old_backups() {
        let store = Arc::new(MemoryRecordStore::new());
        store.seed("service_requests", vec![rec("a")]);
        let dir = TempDir::new().unwrap();

        // Two pre-existing, older backups
        std::fs::write(dir.path().join("backup-20250101T000000000Z.json"), "{}").unwrap();
        std::fs::write(dir.path().join("backup-20250102T000000000Z.json"), "{}").unwrap();

        let summary = BackupManager::new(store)
            .export(
                &["service_requests".to_string()],
                dir.path(),
                false,
                2,
            )
            .await
            .unwrap();

        assert_eq!(summary.rotation.deleted.len(), 1);
        assert!(!dir
            .path()
            .join("backup-20250101T000000000Z.json")
            .exists());
        assert!(summary.path.exists());
    }

    #[tokio::test]
    async fn test_compressed_export_roundtrips() {
        let store = Arc::new(MemoryRecordStore::new());
        store.seed("service_requests", vec![rec("a")]);
        let dir = TempDir::new().unwrap();

        let summary = BackupManager::new(store)
            .export(&["service_requests".to_string()], dir.path(), true, 5)
            .await
            .unwrap();

        assert!(summary.path.to_string_lossy().ends_with(".json.gz"));
        let file = BackupFile::read_from_file(&summary.path).unwrap();
        assert_eq!(file.total_rows(), 1);
    }
}
