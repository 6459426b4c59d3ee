//! Snapshot diffing

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::model::Record;

use super::events::{ChangeEvent, ChangeKind};

/// Diffs two full snapshots by id set.
///
/// - ids only in `current` are inserts
/// - ids only in `previous` are deletes
/// - ids in both whose `updated_at` differs are updates
///
/// Inserts and updates come out in `current` order, deletes in
/// `previous` order.
pub fn diff_snapshots(
    previous: &[Record],
    current: &[Record],
    observed_at: DateTime<Utc>,
) -> Vec<ChangeEvent> {
    let previous_by_id: HashMap<&str, &Record> =
        previous.iter().map(|r| (r.id.as_str(), r)).collect();
    let current_ids: HashMap<&str, ()> = current.iter().map(|r| (r.id.as_str(), ())).collect();

    let mut events = Vec::new();

    for record in current {
        match previous_by_id.get(record.id.as_str()) {
            None => events.push(ChangeEvent {
                kind: ChangeKind::Insert,
                record: record.clone(),
                observed_at,
            }),
            Some(prior) if prior.updated_at != record.updated_at => events.push(ChangeEvent {
                kind: ChangeKind::Update,
                record: record.clone(),
                observed_at,
            }),
            Some(_) => {}
        }
    }

    for record in previous {
        if !current_ids.contains_key(record.id.as_str()) {
            events.push(ChangeEvent {
                kind: ChangeKind::Delete,
                record: record.clone(),
                observed_at,
            });
        }
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn rec(id: &str, updated_hour: u32) -> Record {
        let created = Utc.with_ymd_and_hms(2026, 7, 1, 9, 0, 0).unwrap();
        Record {
            id: id.to_string(),
            name: format!("contact-{}", id),
            email: format!("{}@example.com", id),
            phone: String::new(),
            status: "pending".to_string(),
            priority: "normal".to_string(),
            service_type: "plumbing".to_string(),
            description: String::new(),
            estimated_value: None,
            notes: None,
            assigned_to: None,
            created_at: created,
            updated_at: Utc.with_ymd_and_hms(2026, 7, 1, updated_hour, 0, 0).unwrap(),
            completed_at: None,
        }
    }

    fn observed() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 2, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_insert_update_delete_scenario() {
        // A = {1,2,3}; B = {2,3,4} with 2 touched
        let previous = vec![rec("1", 9), rec("2", 9), rec("3", 9)];
        let current = vec![rec("2", 11), rec("3", 9), rec("4", 10)];

        let events = diff_snapshots(&previous, &current, observed());
        assert_eq!(events.len(), 3);

        let find = |kind: ChangeKind| {
            events
                .iter()
                .find(|e| e.kind == kind)
                .map(|e| e.record.id.as_str())
        };
        assert_eq!(find(ChangeKind::Delete), Some("1"));
        assert_eq!(find(ChangeKind::Insert), Some("4"));
        assert_eq!(find(ChangeKind::Update), Some("2"));
    }

    #[test]
    fn test_identical_snapshots_yield_no_events() {
        let snapshot = vec![rec("1", 9), rec("2", 9)];
        assert!(diff_snapshots(&snapshot, &snapshot.clone(), observed()).is_empty());
    }

    #[test]
    fn test_first_snapshot_against_empty_is_all_inserts() {
        let current = vec![rec("1", 9), rec("2", 9)];
        let events = diff_snapshots(&[], &current, observed());
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.kind == ChangeKind::Insert));
    }

    #[test]
    fn test_emptied_table_is_all_deletes() {
        let previous = vec![rec("1", 9), rec("2", 9)];
        let events = diff_snapshots(&previous, &[], observed());
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.kind == ChangeKind::Delete));
    }

    #[test]
    fn test_updated_at_regression_still_counts_as_update() {
        // Any change to updated_at is a change, direction ignored
        let previous = vec![rec("1", 12)];
        let current = vec![rec("1", 9)];
        let events = diff_snapshots(&previous, &current, observed());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, ChangeKind::Update);
    }
}
