//! Backup file validation

use std::path::Path;

use crate::backup::{
    payload_bytes, verify_checksum, BackupFile, BackupResult, ChecksumComparison,
};

/// A parsed backup plus its checksum verdict.
#[derive(Debug, Clone)]
pub struct ValidatedBackup {
    pub file: BackupFile,
    pub checksum: ChecksumComparison,
}

impl ValidatedBackup {
    /// True when the payload matches the stored checksum.
    pub fn checksum_ok(&self) -> bool {
        self.checksum.is_match()
    }

    /// Intended upsert counts per table, for dry-run reporting.
    pub fn planned_counts(&self) -> Vec<(String, usize)> {
        self.file
            .data
            .iter()
            .map(|(table, rows)| (table.clone(), rows.len()))
            .collect()
    }
}

/// Parses a backup file and recomputes its checksum. The legacy
/// `crc32:` format is verified with the legacy digest; everything
/// else with the current one.
pub fn load_backup(path: &Path) -> BackupResult<ValidatedBackup> {
    let file = BackupFile::read_from_file(path)?;
    let payload = payload_bytes(&file.data)?;
    let checksum = verify_checksum(&payload, &file.metadata.checksum);

    Ok(ValidatedBackup { file, checksum })
}
