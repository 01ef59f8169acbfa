use chrono::{DateTime, Duration, Utc};

use crate::model::{Category, FetchLedgerEntry};

/// Minimum time between completed passes of each category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessPolicy {
    pub app_list: Duration,
    pub player_counts: Duration,
    pub reviews: Duration,
}

impl Default for StalenessPolicy {
    fn default() -> Self {
        Self {
            app_list: Duration::hours(24),
            player_counts: Duration::minutes(60),
            reviews: Duration::hours(24),
        }
    }
}

impl StalenessPolicy {
    /// Policy that treats every category as stale on every run
    pub fn always() -> Self {
        Self {
            app_list: Duration::zero(),
            player_counts: Duration::zero(),
            reviews: Duration::zero(),
        }
    }

    /// Refresh interval for a category
    pub fn interval(&self, category: Category) -> Duration {
        match category {
            Category::AppList => self.app_list,
            Category::PlayerCounts => self.player_counts,
            Category::Reviews => self.reviews,
        }
    }

    /// When the category next needs a pass; `None` means now
    pub fn next_due(&self, entry: Option<&FetchLedgerEntry>) -> Option<DateTime<Utc>> {
        let entry = entry?;
        if entry.is_in_progress() {
            return None;
        }
        entry.last_fetched_at.checked_add_signed(self.interval(entry.category))
    }

    /// Whether the category should be fetched at `now`
    pub fn is_stale(&self, entry: Option<&FetchLedgerEntry>, now: DateTime<Utc>) -> bool {
        match self.next_due(entry) {
            Some(due) => now >= due,
            None => true,
        }
    }
}
