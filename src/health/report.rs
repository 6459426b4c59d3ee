//! Health-check result and report types

use serde::Serialize;

/// Verdict of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Pass,
    Warn,
    Fail,
    Info,
}

impl HealthStatus {
    /// Returns the report string for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Pass => "pass",
            HealthStatus::Warn => "warn",
            HealthStatus::Fail => "fail",
            HealthStatus::Info => "info",
        }
    }
}

/// Probe category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthCategory {
    Connectivity,
    Structure,
    Performance,
    Security,
    Integrity,
    Validation,
    Audit,
    Storage,
}

impl HealthCategory {
    /// Returns the report string for this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthCategory::Connectivity => "connectivity",
            HealthCategory::Structure => "structure",
            HealthCategory::Performance => "performance",
            HealthCategory::Security => "security",
            HealthCategory::Integrity => "integrity",
            HealthCategory::Validation => "validation",
            HealthCategory::Audit => "audit",
            HealthCategory::Storage => "storage",
        }
    }
}

/// Outcome of one probe. Ephemeral, produced and consumed within a
/// single run.
#[derive(Debug, Clone, Serialize)]
pub struct HealthCheckResult {
    pub name: String,
    pub category: HealthCategory,
    pub status: HealthStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    pub duration_ms: u64,
}

impl HealthCheckResult {
    /// Result with the given verdict; duration is filled in by the
    /// engine once the probe returns.
    pub fn new(
        name: impl Into<String>,
        category: HealthCategory,
        status: HealthStatus,
        message: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            status,
            message: message.into(),
            suggestion: None,
            duration_ms: 0,
        }
    }

    /// Attaches a remediation hint.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Records how long the probe took.
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }
}

/// All results of one health run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HealthReport {
    pub results: Vec<HealthCheckResult>,
}

impl HealthReport {
    /// Graduated severity over every result: any `fail` wins, then
    /// any `warn`, otherwise `pass`. `info` results never influence
    /// the verdict.
    pub fn overall(&self) -> HealthStatus {
        if self
            .results
            .iter()
            .any(|r| r.status == HealthStatus::Fail)
        {
            return HealthStatus::Fail;
        }
        if self
            .results
            .iter()
            .any(|r| r.status == HealthStatus::Warn)
        {
            return HealthStatus::Warn;
        }
        HealthStatus::Pass
    }

    /// (pass, warn, fail, info) counts.
    pub fn counts(&self) -> (usize, usize, usize, usize) {
        let mut counts = (0, 0, 0, 0);
        for result in &self.results {
            match result.status {
                HealthStatus::Pass => counts.0 += 1,
                HealthStatus::Warn => counts.1 += 1,
                HealthStatus::Fail => counts.2 += 1,
                HealthStatus::Info => counts.3 += 1,
            }
        }
        counts
    }
}
