use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::debug;

use super::atomic::{read_json, write_json_atomic};
use super::{DatasetStore, MergeReport, APP_LIST_FILE, PLAYER_COUNTS_FILE, REVIEWS_FILE};
use crate::error::{HarvestError, Result};
use crate::model::{AppId, AppListEntry, PlayerCountSample, ReviewRecord};

/// Player count series keyed by app id
pub type PlayerCountMap = BTreeMap<AppId, Vec<PlayerCountSample>>;

/// Reviews keyed by app id
pub type ReviewMap = BTreeMap<AppId, Vec<ReviewRecord>>;

/// Datasets stored as JSON files in one directory
///
/// Each file is read once and kept in memory for the life of the store.
/// A failed write drops the cached copy so the next access re-reads disk.
#[derive(Debug)]
pub struct JsonDatasetStore {
    dir: PathBuf,
    app_list: Option<BTreeMap<AppId, AppListEntry>>,
    player_counts: Option<PlayerCountMap>,
    reviews: Option<ReviewMap>,
}

impl JsonDatasetStore {
    /// Store rooted at an output directory
    pub fn new(output_dir: &Path) -> Self {
        Self {
            dir: output_dir.to_path_buf(),
            app_list: None,
            player_counts: None,
            reviews: None,
        }
    }

    /// Path of a dataset file
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    fn app_list_mut(&mut self) -> Result<&mut BTreeMap<AppId, AppListEntry>> {
        if self.app_list.is_none() {
            let entries: Vec<AppListEntry> = load_or_default(&self.file(APP_LIST_FILE))?;
            self.app_list = Some(entries.into_iter().map(|e| (e.app_id, e)).collect());
        }
        Ok(self.app_list.get_or_insert_with(BTreeMap::new))
    }

    fn player_counts_mut(&mut self) -> Result<&mut PlayerCountMap> {
        if self.player_counts.is_none() {
            self.player_counts = Some(load_or_default(&self.file(PLAYER_COUNTS_FILE))?);
        }
        Ok(self.player_counts.get_or_insert_with(BTreeMap::new))
    }

    fn reviews_mut(&mut self) -> Result<&mut ReviewMap> {
        if self.reviews.is_none() {
            self.reviews = Some(load_or_default(&self.file(REVIEWS_FILE))?);
        }
        Ok(self.reviews.get_or_insert_with(BTreeMap::new))
    }
}

impl DatasetStore for JsonDatasetStore {
    fn load_app_list(&mut self) -> Result<Vec<AppListEntry>> {
        Ok(self.app_list_mut()?.values().cloned().collect())
    }

    fn merge_app_list(&mut self, entries: &[AppListEntry]) -> Result<MergeReport> {
        let path = self.file(APP_LIST_FILE);
        let catalog = self.app_list_mut()?;

        let mut report = MergeReport::default();
        for entry in entries {
            match catalog.get_mut(&entry.app_id) {
                None => {
                    catalog.insert(entry.app_id, entry.clone());
                    report.added += 1;
                }
                Some(existing) if *existing != *entry => {
                    *existing = entry.clone();
                    report.updated += 1;
                }
                Some(_) => report.duplicates += 1,
            }
        }

        if report.added + report.updated > 0 {
            let ordered: Vec<&AppListEntry> = catalog.values().collect();
            let written = write_json_atomic(&path, &ordered);
            if written.is_err() {
                self.app_list = None;
            }
            written?;
        }
        debug!(added = report.added, updated = report.updated, "merged catalog page");
        Ok(report)
    }

    fn append_player_counts(&mut self, samples: &[PlayerCountSample]) -> Result<usize> {
        if samples.is_empty() {
            return Ok(0);
        }
        let path = self.file(PLAYER_COUNTS_FILE);
        let series = self.player_counts_mut()?;
        for sample in samples {
            series.entry(sample.app_id).or_default().push(sample.clone());
        }

        let written = write_json_atomic(&path, &*series);
        if written.is_err() {
            self.player_counts = None;
        }
        written?;
        Ok(samples.len())
    }

    fn merge_reviews(&mut self, app_id: AppId, reviews: Vec<ReviewRecord>) -> Result<MergeReport> {
        if let Some(stray) = reviews.iter().find(|r| r.app_id != app_id) {
            return Err(HarvestError::InvalidArgument(format!(
                "review {} belongs to app {}, not {app_id}",
                stray.review_id, stray.app_id
            )));
        }

        let path = self.file(REVIEWS_FILE);
        let all = self.reviews_mut()?;
        let stored = all.entry(app_id).or_default();
        let mut seen: HashSet<String> = stored.iter().map(|r| r.review_id.clone()).collect();

        let mut report = MergeReport::default();
        for review in reviews {
            if seen.insert(review.review_id.clone()) {
                stored.push(review);
                report.added += 1;
            } else {
                report.duplicates += 1;
            }
        }
        if stored.is_empty() {
            all.remove(&app_id);
        }

        if report.added > 0 {
            let written = write_json_atomic(&path, &*all);
            if written.is_err() {
                self.reviews = None;
            }
            written?;
        }
        debug!(app_id, added = report.added, duplicates = report.duplicates, "merged reviews");
        Ok(report)
    }

    fn load_player_counts(&mut self) -> Result<PlayerCountMap> {
        Ok(self.player_counts_mut()?.clone())
    }

    fn load_reviews(&mut self) -> Result<ReviewMap> {
        Ok(self.reviews_mut()?.clone())
    }
}

fn load_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    let loaded = read_json(path, |detail| HarvestError::DatasetCorrupt {
        path: path.to_path_buf(),
        detail,
    })?;
    Ok(loaded.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Rating;
    use chrono::{DateTime, TimeZone, Utc};
    use std::fs;
    use tempfile::TempDir;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap()
    }

    fn app(app_id: AppId, name: &str) -> AppListEntry {
        AppListEntry {
            app_id,
            name: name.to_string(),
            last_modified: None,
        }
    }

    fn review(app_id: AppId, review_id: &str, text: &str) -> ReviewRecord {
        ReviewRecord {
            app_id,
            review_id: review_id.to_string(),
            text: text.to_string(),
            rating: Rating::Positive,
            posted_at: now(),
            fetched_at: now(),
            updated_at: None,
            language: "english".to_string(),
            votes_up: 0,
            votes_funny: 0,
            weighted_vote_score: None,
            comment_count: 0,
            steam_purchase: true,
            received_for_free: false,
            written_during_early_access: false,
            primarily_steam_deck: false,
            author: Default::default(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // App List Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_empty_store_has_no_apps() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = JsonDatasetStore::new(temp_dir.path());
        assert!(store.load_app_list().unwrap().is_empty());
    }

    #[test]
    fn test_merge_app_list_union_and_rename() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = JsonDatasetStore::new(temp_dir.path());

        let first = store
            .merge_app_list(&[app(20, "Game B"), app(10, "Game A")])
            .unwrap();
        assert_eq!(first.added, 2);

        let second = store
            .merge_app_list(&[app(10, "Game A Remastered"), app(20, "Game B"), app(30, "Game C")])
            .unwrap();
        assert_eq!(second.added, 1);
        assert_eq!(second.updated, 1);
        assert_eq!(second.duplicates, 1);

        let mut reopened = JsonDatasetStore::new(temp_dir.path());
        let apps = reopened.load_app_list().unwrap();
        let ids: Vec<AppId> = apps.iter().map(|a| a.app_id).collect();
        assert_eq!(ids, vec![10, 20, 30]);
        assert_eq!(apps[0].name, "Game A Remastered");
    }

    #[test]
    fn test_app_list_file_is_an_array() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = JsonDatasetStore::new(temp_dir.path());
        store.merge_app_list(&[app(10, "Game A")]).unwrap();

        let raw = fs::read_to_string(temp_dir.path().join(APP_LIST_FILE)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value, serde_json::json!([{"appid": 10, "name": "Game A"}]));
    }

    #[test]
    fn test_corrupt_app_list_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(APP_LIST_FILE), "not json").unwrap();

        let mut store = JsonDatasetStore::new(temp_dir.path());
        assert!(matches!(
            store.load_app_list(),
            Err(HarvestError::DatasetCorrupt { .. })
        ));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Player Count Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_append_player_counts_scenario() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = JsonDatasetStore::new(temp_dir.path());
        store.merge_app_list(&[app(10, "Game A")]).unwrap();

        let sample = PlayerCountSample {
            app_id: 10,
            count: 532,
            fetched_at: now(),
        };
        assert_eq!(store.append_player_counts(&[sample]).unwrap(), 1);

        let raw = fs::read_to_string(temp_dir.path().join(PLAYER_COUNTS_FILE)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let series = value["10"].as_array().unwrap();
        assert!(series.iter().any(|s| s["count"] == 532));
    }

    #[test]
    fn test_append_player_counts_keeps_history() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = JsonDatasetStore::new(temp_dir.path());

        for count in [1, 2, 2] {
            let sample = PlayerCountSample {
                app_id: 10,
                count,
                fetched_at: now(),
            };
            store.append_player_counts(&[sample]).unwrap();
        }

        let mut reopened = JsonDatasetStore::new(temp_dir.path());
        let series = reopened.load_player_counts().unwrap();
        let counts: Vec<u64> = series[&10].iter().map(|s| s.count).collect();
        assert_eq!(counts, vec![1, 2, 2]);
    }

    #[test]
    fn test_append_nothing_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = JsonDatasetStore::new(temp_dir.path());
        assert_eq!(store.append_player_counts(&[]).unwrap(), 0);
        assert!(!temp_dir.path().join(PLAYER_COUNTS_FILE).exists());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Review Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_merge_reviews_scenario() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = JsonDatasetStore::new(temp_dir.path());

        store.merge_reviews(10, vec![review(10, "r1", "first")]).unwrap();
        let again = store.merge_reviews(10, vec![review(10, "r1", "first")]).unwrap();
        assert_eq!(again.added, 0);
        assert_eq!(again.duplicates, 1);

        let last = store
            .merge_reviews(10, vec![review(10, "r1", "first"), review(10, "r2", "second")])
            .unwrap();
        assert_eq!(last.added, 1);
        assert_eq!(last.duplicates, 1);

        let mut reopened = JsonDatasetStore::new(temp_dir.path());
        let reviews = reopened.load_reviews().unwrap();
        assert_eq!(reviews[&10].len(), 2);
    }

    #[test]
    fn test_merge_reviews_keeps_first_seen_copy() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = JsonDatasetStore::new(temp_dir.path());

        store
            .merge_reviews(10, vec![review(10, "r1", "original"), review(10, "r1", "edited")])
            .unwrap();
        store.merge_reviews(10, vec![review(10, "r1", "edited later")]).unwrap();

        let reviews = store.load_reviews().unwrap();
        assert_eq!(reviews[&10].len(), 1);
        assert_eq!(reviews[&10][0].text, "original");
    }

    #[test]
    fn test_merge_reviews_dedup_any_sequence() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = JsonDatasetStore::new(temp_dir.path());

        let batches = [
            vec!["a", "b", "a"],
            vec!["c"],
            vec!["b", "c", "d", "d"],
            vec![],
            vec!["a", "e"],
        ];
        let mut total_added = 0;
        for batch in batches {
            let reviews = batch.iter().map(|id| review(10, id, "x")).collect();
            total_added += store.merge_reviews(10, reviews).unwrap().added;
        }

        let reviews = store.load_reviews().unwrap();
        let mut ids: Vec<&str> = reviews[&10].iter().map(|r| r.review_id.as_str()).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(total_added, 5);
    }

    #[test]
    fn test_same_review_id_in_different_apps_is_distinct() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = JsonDatasetStore::new(temp_dir.path());

        store.merge_reviews(10, vec![review(10, "r1", "x")]).unwrap();
        let report = store.merge_reviews(20, vec![review(20, "r1", "x")]).unwrap();
        assert_eq!(report.added, 1);
    }

    #[test]
    fn test_merge_reviews_rejects_foreign_app() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = JsonDatasetStore::new(temp_dir.path());

        let result = store.merge_reviews(10, vec![review(20, "r1", "x")]);
        assert!(matches!(result, Err(HarvestError::InvalidArgument(_))));
        assert!(store.load_reviews().unwrap().is_empty());
    }

    #[test]
    fn test_merge_empty_batch_does_not_create_entry() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = JsonDatasetStore::new(temp_dir.path());

        let report = store.merge_reviews(10, Vec::new()).unwrap();
        assert_eq!(report, MergeReport::default());
        assert!(store.load_reviews().unwrap().is_empty());
        assert!(!temp_dir.path().join(REVIEWS_FILE).exists());
    }
}
