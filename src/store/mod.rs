//! Durable storage for datasets and the fetch ledger
//!
//! The collector only talks to the [`Ledger`] and [`DatasetStore`] traits;
//! the JSON-file implementations here can be swapped for an embedded
//! database without touching collection logic.

pub mod atomic;
mod datasets;
mod export;
mod ledger;
mod lock;

pub use datasets::{JsonDatasetStore, PlayerCountMap, ReviewMap};
pub use export::{
    export_reviews_csv, export_reviews_jsonl, ExportReport, REVIEWS_CSV_EXPORT_PATH,
    REVIEWS_EXPORT_PATH, REVIEW_CSV_COLUMNS,
};
pub use ledger::{JsonLedger, LedgerMap};
pub use lock::RunLock;

use serde::Serialize;

use crate::error::Result;
use crate::model::{AppId, AppListEntry, Category, FetchLedgerEntry, PlayerCountSample, ReviewRecord};

/// App catalog file
pub const APP_LIST_FILE: &str = "steam_app_list.json";
/// Player count time series file
pub const PLAYER_COUNTS_FILE: &str = "game_player_data.json";
/// Review dataset file
pub const REVIEWS_FILE: &str = "reviews_data.json";
/// Fetch ledger file
pub const LEDGER_FILE: &str = "last_timestamps.json";
/// Single-instance lock file
pub const LOCK_FILE: &str = ".steam-harvest.lock";

/// Outcome of merging a batch into a dataset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    /// Records that were not stored before
    pub added: usize,
    /// Existing records whose content changed
    pub updated: usize,
    /// Records dropped because their key was already stored
    pub duplicates: usize,
}

/// Durable map of category to last fetch progress
pub trait Ledger {
    /// Current entry for a category; fails only when the ledger is corrupt
    fn get(&self, category: Category) -> Result<Option<FetchLedgerEntry>>;

    /// Durably replace the entry for `entry.category`
    ///
    /// `last_fetched_at` never moves backwards; the stored entry is returned.
    fn commit(&mut self, entry: FetchLedgerEntry) -> Result<FetchLedgerEntry>;

    /// Remove the entry for a category; returns whether one existed
    fn reset(&mut self, category: Category) -> Result<bool>;
}

/// Read-merge-write persistence for the three datasets
pub trait DatasetStore {
    /// Stored catalog, ordered by app id
    fn load_app_list(&mut self) -> Result<Vec<AppListEntry>>;

    /// Union by app id; a newer name replaces the stored one
    fn merge_app_list(&mut self, entries: &[AppListEntry]) -> Result<MergeReport>;

    /// Append samples to each app's time series; returns how many were written
    fn append_player_counts(&mut self, samples: &[PlayerCountSample]) -> Result<usize>;

    /// Add reviews for one app, keeping the first-seen copy of each review id
    fn merge_reviews(&mut self, app_id: AppId, reviews: Vec<ReviewRecord>) -> Result<MergeReport>;

    /// All player count series
    fn load_player_counts(&mut self) -> Result<PlayerCountMap>;

    /// All stored reviews
    fn load_reviews(&mut self) -> Result<ReviewMap>;
}
