//! Retention rotation
//!
//! After a successful export the output directory keeps only the N
//! most recent backup files. Rotation is best-effort: a file that
//! cannot be deleted is reported, never fatal.

use std::fs;
use std::path::{Path, PathBuf};

/// What rotation did.
#[derive(Debug, Clone, Default)]
pub struct RotationOutcome {
    /// Files removed.
    pub deleted: Vec<PathBuf>,
    /// Files that should have been removed but could not be.
    pub failed: Vec<PathBuf>,
}

/// True for filenames this tool writes as backups.
fn is_backup_file(name: &str) -> bool {
    name.starts_with("backup-") && (name.ends_with(".json") || name.ends_with(".json.gz"))
}

/// Deletes backup files beyond the `retention` newest in `dir`.
///
/// Backup filenames embed their creation timestamp, so a reverse
/// lexicographic sort puts the newest first.
pub fn rotate_backups(dir: &Path, retention: usize) -> RotationOutcome {
    let mut outcome = RotationOutcome::default();
    let retention = retention.max(1);

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return outcome,
    };

    let mut backups: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(is_backup_file)
                .unwrap_or(false)
        })
        .collect();

    backups.sort();
    backups.reverse();

    for stale in backups.into_iter().skip(retention) {
        match fs::remove_file(&stale) {
            Ok(()) => outcome.deleted.push(stale),
            Err(_) => outcome.failed.push(stale),
        }
    }

    outcome
}
