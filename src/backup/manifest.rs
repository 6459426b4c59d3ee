//! Backup file format
//!
//! A backup is one JSON document:
//!
//! ```text
//! {
//!   "metadata": {
//!     "schema_version": 2,
//!     "created_at": "2026-08-07T12:00:00+00:00",
//!     "row_counts": { "service_requests": 41, "waitlist": 7 },
//!     "checksum": "sha256:..."
//!   },
//!   "data": { "service_requests": [ ... ], "waitlist": [ ... ] }
//! }
//! ```
//!
//! The checksum covers the serialized `data` section only, so the
//! metadata can be inspected and rewritten without invalidating it.
//! Tables live in a BTreeMap: serialization order is deterministic,
//! which is what makes the checksum reproducible. Files may be
//! gzip-compressed on disk; readers sniff the magic bytes.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use crate::model::Record;

use super::checksum::payload_checksum;
use super::errors::{BackupError, BackupResult};

/// Current backup schema version. Version 1 files used the legacy
/// crc32 checksum format.
pub const SCHEMA_VERSION: u32 = 2;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Table name → rows.
pub type BackupData = BTreeMap<String, Vec<Record>>;

/// Descriptive header of a backup file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupMetadata {
    /// Format version of this file.
    pub schema_version: u32,

    /// RFC 3339 creation timestamp.
    pub created_at: String,

    /// Rows per exported table.
    pub row_counts: BTreeMap<String, usize>,

    /// Digest over the serialized `data` section.
    pub checksum: String,
}

/// A complete backup document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupFile {
    pub metadata: BackupMetadata,
    pub data: BackupData,
}

/// Canonical payload bytes the checksum is computed over.
pub fn payload_bytes(data: &BackupData) -> BackupResult<Vec<u8>> {
    Ok(serde_json::to_vec(data)?)
}

impl BackupFile {
    /// Wraps fetched table contents in metadata, computing counts
    /// and the payload checksum.
    pub fn assemble(data: BackupData, created_at: DateTime<Utc>) -> BackupResult<Self> {
        let row_counts = data
            .iter()
            .map(|(table, rows)| (table.clone(), rows.len()))
            .collect();
        let checksum = payload_checksum(&payload_bytes(&data)?);

        Ok(Self {
            metadata: BackupMetadata {
                schema_version: SCHEMA_VERSION,
                created_at: created_at.to_rfc3339(),
                row_counts,
                checksum,
            },
            data,
        })
    }

    /// Total rows across tables.
    pub fn total_rows(&self) -> usize {
        self.data.values().map(Vec::len).sum()
    }

    /// Writes the document to disk, gzipped when `compress` is set.
    pub fn write_to_file(&self, path: &Path, compress: bool) -> BackupResult<()> {
        let json = serde_json::to_vec_pretty(self)?;

        let mut file = File::create(path).map_err(|e| BackupError::io_at(path, e))?;
        if compress {
            let mut encoder = GzEncoder::new(&mut file, Compression::default());
            encoder
                .write_all(&json)
                .map_err(|e| BackupError::io_at(path, e))?;
            encoder.finish().map_err(|e| BackupError::io_at(path, e))?;
        } else {
            file.write_all(&json)
                .map_err(|e| BackupError::io_at(path, e))?;
        }
        file.sync_all().map_err(|e| BackupError::io_at(path, e))?;

        Ok(())
    }

    /// Reads a document from disk, transparently decompressing.
    pub fn read_from_file(path: &Path) -> BackupResult<Self> {
        let mut raw = Vec::new();
        File::open(path)
            .map_err(|e| BackupError::io_at(path, e))?
            .read_to_end(&mut raw)
            .map_err(|e| BackupError::io_at(path, e))?;

        let json = if raw.starts_with(&GZIP_MAGIC) {
            let mut decoded = Vec::new();
            GzDecoder::new(raw.as_slice())
                .read_to_end(&mut decoded)
                .map_err(|e| BackupError::io_at(path, e))?;
            decoded
        } else {
            raw
        };

        let file: BackupFile = serde_json::from_slice(&json)
            .map_err(|e| BackupError::malformed(format!("{}: {}", path.display(), e)))?;
        Ok(file)
    }
}
