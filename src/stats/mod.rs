//! Aggregate statistics over a record set
//!
//! Pure functions: the full record set goes in, numbers come out.
//! No store access and no clock access; callers pass `now` where a
//! reference point is needed, which keeps every computation
//! reproducible in tests.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Timelike, Utc};
use serde::Serialize;

use crate::model::{Record, RecordPriority, RecordStatus};

/// Resolution-time summary over completed records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolutionStats {
    /// Completed records with a usable completion timestamp.
    pub completed: usize,
    pub avg_hours: f64,
    pub min_hours: f64,
    pub max_hours: f64,
}

/// One day of the trailing trend window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendBucket {
    pub date: NaiveDate,
    pub created: usize,
    pub completed: usize,
}

/// A contact and how many records it accounts for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactCount {
    pub email: String,
    pub count: usize,
}

/// A fired threshold alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub name: String,
    pub message: String,
    pub count: usize,
}

/// Thresholds for [`alerts`].
#[derive(Debug, Clone)]
pub struct AlertThresholds {
    /// Alert when urgent-and-pending records exceed this count.
    pub urgent_pending_max: usize,
    /// A pending record older than this many days is considered aging.
    pub pending_age_days: i64,
    /// Alert when aging pending records exceed this count.
    pub aging_pending_max: usize,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            urgent_pending_max: 0,
            pending_age_days: 7,
            aging_pending_max: 0,
        }
    }
}

/// Record count per raw status value (out-of-set values included).
pub fn count_by_status(records: &[Record]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(record.status.clone()).or_insert(0) += 1;
    }
    counts
}

/// Record count per raw priority value.
pub fn count_by_priority(records: &[Record]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(record.priority.clone()).or_insert(0) += 1;
    }
    counts
}

/// Record count per service type.
pub fn count_by_service_type(records: &[Record]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(record.service_type.clone()).or_insert(0) += 1;
    }
    counts
}

/// Created-at histogram by weekday, Monday first.
pub fn weekday_histogram(records: &[Record]) -> [usize; 7] {
    let mut buckets = [0usize; 7];
    for record in records {
        let day = record.created_at.weekday().num_days_from_monday() as usize;
        buckets[day] += 1;
    }
    buckets
}

/// Created-at histogram by hour of day (UTC).
pub fn hourly_histogram(records: &[Record]) -> [usize; 24] {
    let mut buckets = [0usize; 24];
    for record in records {
        buckets[record.created_at.hour() as usize] += 1;
    }
    buckets
}

/// Resolution-time stats over completed records.
///
/// Only records that are `completed` and carry a `completed_at` at
/// or after `created_at` contribute. Returns `None` when no record
/// qualifies.
pub fn resolution_stats(records: &[Record]) -> Option<ResolutionStats> {
    let mut hours = Vec::new();
    for record in records {
        if record.parsed_status() != Some(RecordStatus::Completed) {
            continue;
        }
        let completed_at = match record.completed_at {
            Some(t) if t >= record.created_at => t,
            _ => continue,
        };
        let elapsed = completed_at - record.created_at;
        hours.push(elapsed.num_minutes() as f64 / 60.0);
    }

    if hours.is_empty() {
        return None;
    }

    let sum: f64 = hours.iter().sum();
    let min = hours.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = hours.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    Some(ResolutionStats {
        completed: hours.len(),
        avg_hours: sum / hours.len() as f64,
        min_hours: min,
        max_hours: max,
    })
}

/// Daily created/completed counts over the trailing `days` window,
/// oldest bucket first, today included.
pub fn trend_buckets(records: &[Record], days: u32, now: DateTime<Utc>) -> Vec<TrendBucket> {
    let today = now.date_naive();
    let mut buckets: Vec<TrendBucket> = (0..days)
        .rev()
        .map(|back| TrendBucket {
            date: today - Duration::days(back as i64),
            created: 0,
            completed: 0,
        })
        .collect();

    for record in records {
        let created = record.created_at.date_naive();
        if let Some(bucket) = buckets.iter_mut().find(|b| b.date == created) {
            bucket.created += 1;
        }
        if let Some(completed_at) = record.completed_at {
            let completed = completed_at.date_naive();
            if let Some(bucket) = buckets.iter_mut().find(|b| b.date == completed) {
                bucket.completed += 1;
            }
        }
    }

    buckets
}

/// Top-K contacts by record count.
///
/// Grouping is by lowercased email; records without an email are
/// skipped. Ties break alphabetically so the output is stable.
pub fn top_contacts(records: &[Record], k: usize) -> Vec<ContactCount> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for record in records {
        let email = record.email.trim().to_lowercase();
        if email.is_empty() {
            continue;
        }
        *counts.entry(email).or_insert(0) += 1;
    }

    let mut ranked: Vec<ContactCount> = counts
        .into_iter()
        .map(|(email, count)| ContactCount { email, count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.email.cmp(&b.email)));
    ranked.truncate(k);
    ranked
}

/// Threshold-based alerts over the record set.
pub fn alerts(records: &[Record], thresholds: &AlertThresholds, now: DateTime<Utc>) -> Vec<Alert> {
    let mut fired = Vec::new();

    let urgent_pending = records
        .iter()
        .filter(|r| {
            r.parsed_status() == Some(RecordStatus::Pending)
                && r.parsed_priority() == Some(RecordPriority::Urgent)
        })
        .count();
    if urgent_pending > thresholds.urgent_pending_max {
        fired.push(Alert {
            name: "urgent_pending".to_string(),
            message: format!("{} urgent requests are still pending", urgent_pending),
            count: urgent_pending,
        });
    }

    let cutoff = now - Duration::days(thresholds.pending_age_days);
    let aging_pending = records
        .iter()
        .filter(|r| r.parsed_status() == Some(RecordStatus::Pending) && r.created_at < cutoff)
        .count();
    if aging_pending > thresholds.aging_pending_max {
        fired.push(Alert {
            name: "aging_pending".to_string(),
            message: format!(
                "{} pending requests are older than {} days",
                aging_pending, thresholds.pending_age_days
            ),
            count: aging_pending,
        });
    }

    fired
}
