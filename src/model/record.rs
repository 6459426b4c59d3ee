//! Record type and its enumerated value sets

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Valid lifecycle states for a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl RecordStatus {
    /// All valid states, in lifecycle order.
    pub const ALL: [RecordStatus; 4] = [
        RecordStatus::Pending,
        RecordStatus::InProgress,
        RecordStatus::Completed,
        RecordStatus::Cancelled,
    ];

    /// Returns the wire string for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Pending => "pending",
            RecordStatus::InProgress => "in_progress",
            RecordStatus::Completed => "completed",
            RecordStatus::Cancelled => "cancelled",
        }
    }

    /// Parses a wire string; returns `None` for out-of-set values.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RecordStatus::Pending),
            "in_progress" => Some(RecordStatus::InProgress),
            "completed" => Some(RecordStatus::Completed),
            "cancelled" => Some(RecordStatus::Cancelled),
            _ => None,
        }
    }
}

/// Valid priority levels for a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordPriority {
    Low,
    Normal,
    High,
    Urgent,
}

impl RecordPriority {
    /// All valid priorities, lowest first.
    pub const ALL: [RecordPriority; 4] = [
        RecordPriority::Low,
        RecordPriority::Normal,
        RecordPriority::High,
        RecordPriority::Urgent,
    ];

    /// Returns the wire string for this priority.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordPriority::Low => "low",
            RecordPriority::Normal => "normal",
            RecordPriority::High => "high",
            RecordPriority::Urgent => "urgent",
        }
    }

    /// Parses a wire string; returns `None` for out-of-set values.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(RecordPriority::Low),
            "normal" => Some(RecordPriority::Normal),
            "high" => Some(RecordPriority::High),
            "urgent" => Some(RecordPriority::Urgent),
            _ => None,
        }
    }
}

/// A case/request entity tracked by the store.
///
/// Invariants the store is supposed to uphold (and the auditor
/// verifies): `status`/`priority` in their enumerated sets,
/// `completed_at` set only when status is `completed`,
/// `updated_at >= created_at`, `created_at` not in the future.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Unique, stable identifier.
    pub id: String,

    /// Contact name.
    #[serde(default)]
    pub name: String,

    /// Contact email.
    #[serde(default)]
    pub email: String,

    /// Contact phone.
    #[serde(default)]
    pub phone: String,

    /// Lifecycle state; raw string, validated by the auditor.
    pub status: String,

    /// Priority level; raw string, validated by the auditor.
    pub priority: String,

    /// Requested service type (free text from a known set).
    #[serde(default)]
    pub service_type: String,

    /// Free-text description of the request.
    #[serde(default)]
    pub description: String,

    /// Estimated value of the job, if quoted.
    #[serde(default)]
    pub estimated_value: Option<f64>,

    /// Operator notes.
    #[serde(default)]
    pub notes: Option<String>,

    /// Assignee, if the request has been picked up.
    #[serde(default)]
    pub assigned_to: Option<String>,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,

    /// Completion timestamp; only meaningful when status is `completed`.
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Record {
    /// Parsed status, or `None` if the raw value is out of set.
    pub fn parsed_status(&self) -> Option<RecordStatus> {
        RecordStatus::parse(&self.status)
    }

    /// Parsed priority, or `None` if the raw value is out of set.
    pub fn parsed_priority(&self) -> Option<RecordPriority> {
        RecordPriority::parse(&self.priority)
    }

    /// True when the record is in the `completed` state.
    pub fn is_completed(&self) -> bool {
        self.parsed_status() == Some(RecordStatus::Completed)
    }

    /// True when the record is in the `cancelled` state.
    pub fn is_cancelled(&self) -> bool {
        self.parsed_status() == Some(RecordStatus::Cancelled)
    }
}
