//! Payload checksums
//!
//! New backup files carry a SHA-256 digest over the serialized
//! payload, formatted `sha256:<64 hex>`. Files written before the
//! digest upgrade carry `crc32:<8 hex>`; the verifier still accepts
//! that form so old archives remain checkable, but the writer never
//! emits it.

use crc32fast::Hasher as Crc32;
use sha2::{Digest, Sha256};

/// Computes the current-format checksum of a payload.
pub fn payload_checksum(payload: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload);
    let digest = hasher.finalize();

    let mut out = String::with_capacity(7 + 64);
    out.push_str("sha256:");
    for byte in digest {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

/// Computes the legacy-format checksum of a payload.
pub fn legacy_checksum(payload: &[u8]) -> String {
    let mut hasher = Crc32::new();
    hasher.update(payload);
    format!("crc32:{:08x}", hasher.finalize())
}

/// Result of comparing a payload against a stored checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChecksumComparison {
    /// The payload matches the stored value.
    Match,
    /// The payload does not match (or the stored format is unknown).
    Mismatch { expected: String, actual: String },
}

impl ChecksumComparison {
    pub fn is_match(&self) -> bool {
        matches!(self, ChecksumComparison::Match)
    }
}

/// Verifies a payload against a stored checksum string, picking the
/// verifier from the prefix.
pub fn verify_checksum(payload: &[u8], stored: &str) -> ChecksumComparison {
    let actual = if stored.starts_with("crc32:") {
        legacy_checksum(payload)
    } else {
        payload_checksum(payload)
    };

    if actual == stored {
        ChecksumComparison::Match
    } else {
        ChecksumComparison::Mismatch {
            expected: stored.to_string(),
            actual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_deterministic() {
        let payload = b"backup payload bytes";
        assert_eq!(payload_checksum(payload), payload_checksum(payload));
        assert_eq!(legacy_checksum(payload), legacy_checksum(payload));
    }

    #[test]
    fn test_checksum_format() {
        let checksum = payload_checksum(b"x");
        assert!(checksum.starts_with("sha256:"));
        assert_eq!(checksum.len(), 7 + 64);

        let legacy = legacy_checksum(b"x");
        assert!(legacy.starts_with("crc32:"));
        assert_eq!(legacy.len(), 6 + 8);
    }

    #[test]
    fn test_single_byte_flip_changes_checksum() {
        let original = b"{\"service_requests\":[]}".to_vec();
        let mut mutated = original.clone();
        mutated[1] ^= 0x01;

        assert_ne!(payload_checksum(&original), payload_checksum(&mutated));

        let stored = payload_checksum(&original);
        assert!(!verify_checksum(&mutated, &stored).is_match());
    }

    #[test]
    fn test_verify_current_format() {
        let payload = b"payload";
        let stored = payload_checksum(payload);
        assert_eq!(verify_checksum(payload, &stored), ChecksumComparison::Match);
    }

    #[test]
    fn test_verify_legacy_format() {
        let payload = b"payload from an old archive";
        let stored = legacy_checksum(payload);
        assert_eq!(verify_checksum(payload, &stored), ChecksumComparison::Match);
        assert!(!verify_checksum(b"tampered", &stored).is_match());
    }

    #[test]
    fn test_unknown_prefix_is_a_mismatch() {
        let result = verify_checksum(b"payload", "md5:abcdef");
        match result {
            ChecksumComparison::Mismatch { expected, actual } => {
                assert_eq!(expected, "md5:abcdef");
                assert!(actual.starts_with("sha256:"));
            }
            ChecksumComparison::Match => panic!("unknown prefix must not match"),
        }
    }
}
