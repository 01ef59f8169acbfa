use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::StalenessPolicy;
use crate::error::Result;
use crate::model::{Category, FetchLedgerEntry};
use crate::store::{DatasetStore, JsonDatasetStore, JsonLedger, LOCK_FILE};

/// Ledger state of one category
#[derive(Debug, Clone, Serialize)]
pub struct CategoryStatus {
    pub category: Category,
    pub entry: Option<FetchLedgerEntry>,
    /// Whether the next run would fetch this category
    pub stale: bool,
    /// When the category becomes due; `None` when it already is
    pub next_due: Option<DateTime<Utc>>,
}

/// Record counts across the stored datasets
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DatasetCounts {
    pub apps: usize,
    pub player_count_apps: usize,
    pub player_count_samples: usize,
    pub review_apps: usize,
    pub reviews: usize,
}

/// Snapshot of an output directory
#[derive(Debug, Clone, Serialize)]
pub struct CollectionStatus {
    pub output_dir: PathBuf,
    /// A lock file is present, so a run may be active
    pub locked: bool,
    pub categories: Vec<CategoryStatus>,
    pub datasets: DatasetCounts,
}

/// Read the ledger and datasets under `output_dir` without fetching anything
pub fn collection_status(output_dir: &Path, staleness: &StalenessPolicy) -> Result<CollectionStatus> {
    let ledger = JsonLedger::new(output_dir).load_all()?;
    let now = Utc::now();

    let categories = Category::ALL
        .into_iter()
        .map(|category| {
            let entry = ledger.get(&category).cloned();
            CategoryStatus {
                category,
                stale: staleness.is_stale(entry.as_ref(), now),
                next_due: staleness
                    .next_due(entry.as_ref())
                    .filter(|due| *due > now),
                entry,
            }
        })
        .collect();

    let mut store = JsonDatasetStore::new(output_dir);
    let player_counts = store.load_player_counts()?;
    let reviews = store.load_reviews()?;
    let datasets = DatasetCounts {
        apps: store.load_app_list()?.len(),
        player_count_apps: player_counts.len(),
        player_count_samples: player_counts.values().map(Vec::len).sum(),
        review_apps: reviews.len(),
        reviews: reviews.values().map(Vec::len).sum(),
    };

    Ok(CollectionStatus {
        output_dir: output_dir.to_path_buf(),
        locked: output_dir.join(LOCK_FILE).exists(),
        categories,
        datasets,
    })
}
