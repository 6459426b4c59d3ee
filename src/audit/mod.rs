//! Integrity auditing
//!
//! `IntegrityAuditor::analyze` partitions a record set into
//! violation classes. Pure and side-effect-free; the health engine
//! reports the counts, the cleanup engine acts on the partitions.
//!
//! Classes:
//! - invalid_status / invalid_priority: value outside the enumerated set
//! - invalid_email: non-empty value failing the format check
//! - invalid_phone: non-empty value with an implausible digit count
//! - stale_completed: completed longer ago than the configured age
//! - cancelled: cancelled records (purge candidates)
//! - duplicates: same normalized correlation key (email +
//!   service_type + calendar day); all but the first occurrence,
//!   in input order

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::Serialize;

use crate::model::Record;

/// Tunables for the auditor.
#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// A completed record older than this many days is stale.
    pub stale_after_days: i64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            stale_after_days: 90,
        }
    }
}

/// Partitioned audit result.
///
/// A record can appear in more than one partition (e.g. a cancelled
/// duplicate).
#[derive(Debug, Clone, Default, Serialize)]
pub struct IntegrityReport {
    /// Records examined.
    pub scanned: usize,
    pub invalid_status: Vec<Record>,
    pub invalid_priority: Vec<Record>,
    pub invalid_email: Vec<Record>,
    pub invalid_phone: Vec<Record>,
    pub stale_completed: Vec<Record>,
    pub cancelled: Vec<Record>,
    pub duplicates: Vec<Record>,
}

impl IntegrityReport {
    /// Sum of partition sizes (flags, not distinct records).
    pub fn total_flagged(&self) -> usize {
        self.invalid_status.len()
            + self.invalid_priority.len()
            + self.invalid_email.len()
            + self.invalid_phone.len()
            + self.stale_completed.len()
            + self.cancelled.len()
            + self.duplicates.len()
    }

    /// True when no partition holds any record.
    pub fn is_clean(&self) -> bool {
        self.total_flagged() == 0
    }

    /// Per-class counts in a stable order, for reporting.
    pub fn class_counts(&self) -> Vec<(&'static str, usize)> {
        vec![
            ("invalid_status", self.invalid_status.len()),
            ("invalid_priority", self.invalid_priority.len()),
            ("invalid_email", self.invalid_email.len()),
            ("invalid_phone", self.invalid_phone.len()),
            ("stale_completed", self.stale_completed.len()),
            ("cancelled", self.cancelled.len()),
            ("duplicates", self.duplicates.len()),
        ]
    }
}

/// Scans record sets for integrity violations.
pub struct IntegrityAuditor {
    config: AuditConfig,
    email_format: Regex,
}

impl IntegrityAuditor {
    /// Auditor with the given tunables.
    pub fn new(config: AuditConfig) -> Self {
        Self {
            config,
            // One non-space local part, one @, one dotted domain.
            email_format: Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$")
                .expect("email pattern is valid"),
        }
    }

    /// Partitions `records` into violation classes. `now` anchors
    /// the staleness cutoff.
    pub fn analyze(&self, records: &[Record], now: DateTime<Utc>) -> IntegrityReport {
        let mut report = IntegrityReport {
            scanned: records.len(),
            ..IntegrityReport::default()
        };

        let stale_cutoff = now - Duration::days(self.config.stale_after_days);
        let mut seen_keys: Vec<String> = Vec::new();

        for record in records {
            if record.parsed_status().is_none() {
                report.invalid_status.push(record.clone());
            }
            if record.parsed_priority().is_none() {
                report.invalid_priority.push(record.clone());
            }

            let email = record.email.trim();
            if !email.is_empty() && !self.email_format.is_match(email) {
                report.invalid_email.push(record.clone());
            }

            let phone = record.phone.trim();
            if !phone.is_empty() && !plausible_phone(phone) {
                report.invalid_phone.push(record.clone());
            }

            if record.is_completed() {
                if let Some(completed_at) = record.completed_at {
                    if completed_at < stale_cutoff {
                        report.stale_completed.push(record.clone());
                    }
                }
            }

            if record.is_cancelled() {
                report.cancelled.push(record.clone());
            }

            if let Some(key) = correlation_key(record) {
                if seen_keys.contains(&key) {
                    report.duplicates.push(record.clone());
                } else {
                    seen_keys.push(key);
                }
            }
        }

        report
    }
}

impl Default for IntegrityAuditor {
    fn default() -> Self {
        Self::new(AuditConfig::default())
    }
}

/// 10 to 15 digits once formatting characters are stripped.
fn plausible_phone(phone: &str) -> bool {
    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    (10..=15).contains(&digits)
}

/// Normalized duplicate-detection key, `None` when the record has
/// no email to correlate on.
fn correlation_key(record: &Record) -> Option<String> {
    let email = record.email.trim().to_lowercase();
    if email.is_empty() {
        return None;
    }
    let service = record.service_type.trim().to_lowercase();
    let day = record.created_at.date_naive();
    Some(format!("{}|{}|{}", email, service, day))
}

#[cfg(test)]
mod tests {
    use super::*;
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

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_enum_partitions_flag_exactly_out_of_set_values() {
        let records = vec![
            rec("a", "pending", "normal"),
            rec("b", "in_progress", "urgent"),
            rec("c", "bogus", "normal"),
            rec("d", "pending", "asap"),
        ];

        let report = IntegrityAuditor::default().analyze(&records, now());

        assert_eq!(report.scanned, 4);
        assert_eq!(report.invalid_status.len(), 1);
        assert_eq!(report.invalid_status[0].id, "c");
        assert_eq!(report.invalid_priority.len(), 1);
        assert_eq!(report.invalid_priority[0].id, "d");
    }

    #[test]
    fn test_email_and_phone_format_checks() {
        let mut bad_email = rec("a", "pending", "normal");
        bad_email.email = "not-an-email".to_string();
        let mut bad_phone = rec("b", "pending", "normal");
        bad_phone.phone = "12345".to_string();
        let mut empty_contact = rec("c", "pending", "normal");
        empty_contact.email = String::new();
        empty_contact.phone = String::new();

        let report =
            IntegrityAuditor::default().analyze(&[bad_email, bad_phone, empty_contact], now());

        assert_eq!(report.invalid_email.len(), 1);
        assert_eq!(report.invalid_email[0].id, "a");
        assert_eq!(report.invalid_phone.len(), 1);
        assert_eq!(report.invalid_phone[0].id, "b");
    }

    #[test]
    fn test_phone_accepts_formatting_characters() {
        let mut formatted = rec("a", "pending", "normal");
        formatted.phone = "+1 (555) 301-7788".to_string();
        let report = IntegrityAuditor::default().analyze(&[formatted], now());
        assert!(report.invalid_phone.is_empty());
    }

    #[test]
    fn test_stale_completed_uses_configured_age() {
        let mut old = rec("a", "completed", "normal");
        old.completed_at = Some(Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).unwrap());
        let mut recent = rec("b", "completed", "normal");
        recent.completed_at = Some(Utc.with_ymd_and_hms(2026, 7, 20, 9, 0, 0).unwrap());

        let auditor = IntegrityAuditor::new(AuditConfig {
            stale_after_days: 30,
        });
        let report = auditor.analyze(&[old, recent], now());

        assert_eq!(report.stale_completed.len(), 1);
        assert_eq!(report.stale_completed[0].id, "a");
    }

    #[test]
    fn test_cancelled_partition() {
        let records = vec![rec("a", "cancelled", "normal"), rec("b", "pending", "normal")];
        let report = IntegrityAuditor::default().analyze(&records, now());
        assert_eq!(report.cancelled.len(), 1);
        assert_eq!(report.cancelled[0].id, "a");
    }

    #[test]
    fn test_duplicates_keep_first_occurrence_in_input_order() {
        let mut first = rec("a", "pending", "normal");
        let mut second = rec("b", "pending", "normal");
        let mut third = rec("c", "pending", "normal");
        first.email = "dana@example.com".to_string();
        second.email = "Dana@Example.com".to_string(); // same key after normalization
        third.email = "dana@example.com".to_string();

        let report = IntegrityAuditor::default().analyze(&[first, second, third], now());

        let ids: Vec<&str> = report.duplicates.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn test_different_day_is_not_a_duplicate() {
        let mut first = rec("a", "pending", "normal");
        let mut second = rec("b", "pending", "normal");
        first.email = "dana@example.com".to_string();
        second.email = "dana@example.com".to_string();
        second.created_at = Utc.with_ymd_and_hms(2026, 7, 2, 9, 0, 0).unwrap();

        let report = IntegrityAuditor::default().analyze(&[first, second], now());
        assert!(report.duplicates.is_empty());
    }

    #[test]
    fn test_clean_set_reports_clean() {
        let records = vec![rec("a", "pending", "normal"), rec("b", "in_progress", "high")];
        let mut distinct = records.clone();
        distinct[1].email = "other@example.com".to_string();

        let report = IntegrityAuditor::default().analyze(&distinct, now());
        assert!(report.is_clean());
        assert_eq!(report.total_flagged(), 0);
    }
}
