//! Change events and the bounded history ring

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::Record;

/// What happened to a record between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    /// Returns the display string for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Insert => "insert",
            ChangeKind::Update => "update",
            ChangeKind::Delete => "delete",
        }
    }
}

/// One observed change. For deletes the record is the last snapshot
/// seen before it disappeared.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub record: Record,
    pub observed_at: DateTime<Utc>,
}

/// Bounded FIFO of recent events; the oldest is dropped once the
/// capacity is reached.
#[derive(Debug)]
pub struct EventRing {
    capacity: usize,
    events: VecDeque<ChangeEvent>,
}

impl EventRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            events: VecDeque::new(),
        }
    }

    /// Appends an event, evicting the oldest beyond capacity.
    pub fn push(&mut self, event: ChangeEvent) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// Events oldest-first.
    pub fn to_vec(&self) -> Vec<ChangeEvent> {
        self.events.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
