//! Cleanup execution accounting

use serde::Serialize;

/// Item outcomes for one violation class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryOutcome {
    pub fixed: usize,
    pub removed: usize,
    pub errored: usize,
}

impl CategoryOutcome {
    fn absorb(&mut self, other: &CategoryOutcome) {
        self.fixed += other.fixed;
        self.removed += other.removed;
        self.errored += other.errored;
    }
}

/// Per-class outcome counts for one confirmed cleanup run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupOutcome {
    pub invalid_status: CategoryOutcome,
    pub invalid_priority: CategoryOutcome,
    pub stale_completed: CategoryOutcome,
    pub cancelled: CategoryOutcome,
    pub duplicates: CategoryOutcome,
}

impl CleanupOutcome {
    /// Sums every class.
    pub fn totals(&self) -> CategoryOutcome {
        let mut total = CategoryOutcome::default();
        for outcome in [
            &self.invalid_status,
            &self.invalid_priority,
            &self.stale_completed,
            &self.cancelled,
            &self.duplicates,
        ] {
            total.absorb(outcome);
        }
        total
    }

    /// True when any item errored anywhere in the batch.
    pub fn had_errors(&self) -> bool {
        self.totals().errored > 0
    }
}
