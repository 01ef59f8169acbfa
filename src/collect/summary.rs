use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{ErrorKind, HarvestError};
use crate::model::Category;

/// Terminal state of a collection run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every due category finished without error
    Completed,
    /// At least one category recorded an error
    CompletedWithErrors,
    /// The run stopped early at a cancellation check
    Cancelled,
}

impl RunOutcome {
    /// Process exit code for this outcome
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Completed => 0,
            Self::CompletedWithErrors => 1,
            Self::Cancelled => 130,
        }
    }
}

/// An error recorded against a category
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportedError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&HarvestError> for ReportedError {
    fn from(err: &HarvestError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// What one category did during a run
///
/// Units of `attempted`/`succeeded`/`skipped` are catalog pages for the app
/// list and apps for player counts and reviews.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryReport {
    pub category: Category,
    /// Whether the staleness policy called for a fetch
    pub due: bool,
    pub attempted: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub new_records: usize,
    pub duplicates: usize,
    pub malformed: usize,
    pub cancelled: bool,
    pub error: Option<ReportedError>,
}

impl CategoryReport {
    /// Empty report for a category
    pub fn new(category: Category) -> Self {
        Self {
            category,
            due: false,
            attempted: 0,
            succeeded: 0,
            skipped: 0,
            new_records: 0,
            duplicates: 0,
            malformed: 0,
            cancelled: false,
            error: None,
        }
    }
}

/// Result of one collection pass
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: RunOutcome,
    pub categories: Vec<CategoryReport>,
}

impl RunSummary {
    /// Assemble a summary, deriving the outcome from the reports
    pub fn new(started_at: DateTime<Utc>, categories: Vec<CategoryReport>) -> Self {
        let outcome = if categories.iter().any(|c| c.cancelled) {
            RunOutcome::Cancelled
        } else if categories.iter().any(|c| c.error.is_some()) {
            RunOutcome::CompletedWithErrors
        } else {
            RunOutcome::Completed
        };
        Self {
            started_at,
            finished_at: Utc::now(),
            outcome,
            categories,
        }
    }

    /// Report for a category, if the run reached it
    pub fn category(&self, category: Category) -> Option<&CategoryReport> {
        self.categories.iter().find(|c| c.category == category)
    }

    /// New records across all categories
    pub fn total_new_records(&self) -> usize {
        self.categories.iter().map(|c| c.new_records).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_completed() {
        let summary = RunSummary::new(Utc::now(), vec![CategoryReport::new(Category::AppList)]);
        assert_eq!(summary.outcome, RunOutcome::Completed);
        assert_eq!(summary.outcome.exit_code(), 0);
    }

    #[test]
    fn test_outcome_with_errors() {
        let mut failed = CategoryReport::new(Category::PlayerCounts);
        failed.error = Some(ReportedError::from(&HarvestError::Transient("timeout".into())));

        let summary = RunSummary::new(
            Utc::now(),
            vec![CategoryReport::new(Category::AppList), failed],
        );
        assert_eq!(summary.outcome, RunOutcome::CompletedWithErrors);
        assert_eq!(summary.outcome.exit_code(), 1);
        assert_eq!(
            summary.category(Category::PlayerCounts).unwrap().error.as_ref().unwrap().kind,
            ErrorKind::Transient
        );
    }

    #[test]
    fn test_cancellation_wins_over_errors() {
        let mut failed = CategoryReport::new(Category::AppList);
        failed.error = Some(ReportedError::from(&HarvestError::Malformed("x".into())));
        let mut cancelled = CategoryReport::new(Category::PlayerCounts);
        cancelled.cancelled = true;

        let summary = RunSummary::new(Utc::now(), vec![failed, cancelled]);
        assert_eq!(summary.outcome, RunOutcome::Cancelled);
    }

    #[test]
    fn test_total_new_records() {
        let mut apps = CategoryReport::new(Category::AppList);
        apps.new_records = 3;
        let mut reviews = CategoryReport::new(Category::Reviews);
        reviews.new_records = 4;

        let summary = RunSummary::new(Utc::now(), vec![apps, reviews]);
        assert_eq!(summary.total_new_records(), 7);
        assert!(summary.category(Category::PlayerCounts).is_none());
    }
}
