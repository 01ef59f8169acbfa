use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use super::atomic::write_atomic;
use super::DatasetStore;
use crate::error::{HarvestError, Result};
use crate::model::{AppId, Rating, ReviewRecord};

/// JSON Lines export location relative to the output directory
pub const REVIEWS_EXPORT_PATH: &str = "reviews/combined_reviews/all_reviews.jsonl";

/// CSV export location relative to the output directory
pub const REVIEWS_CSV_EXPORT_PATH: &str = "reviews/PBI_review_ready/all_reviews.csv";

/// Column order of the flattened review table
pub const REVIEW_CSV_COLUMNS: [&str; 22] = [
    "appid",
    "recommendation_id",
    "author_steamid",
    "author_num_games_owned",
    "author_num_reviews",
    "author_playtime_forever",
    "author_playtime_last_two_weeks",
    "author_playtime_at_review",
    "author_last_played",
    "language",
    "review",
    "timestamp_created",
    "timestamp_updated",
    "voted_up",
    "votes_up",
    "votes_funny",
    "weighted_vote_score",
    "comment_count",
    "steam_purchase",
    "received_for_free",
    "written_during_early_access",
    "primarily_steam_deck",
];

/// What an export wrote
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    pub path: PathBuf,
    pub apps: usize,
    pub reviews: usize,
}

#[derive(Serialize)]
struct ReviewLine<'a> {
    appid: AppId,
    reviews: &'a [ReviewRecord],
}

/// One review flattened into a table row; times are unix seconds
#[derive(Serialize)]
struct ReviewRow<'a> {
    appid: AppId,
    recommendation_id: &'a str,
    author_steamid: &'a str,
    author_num_games_owned: u64,
    author_num_reviews: u64,
    author_playtime_forever: u64,
    author_playtime_last_two_weeks: u64,
    author_playtime_at_review: Option<u64>,
    author_last_played: Option<i64>,
    language: &'a str,
    review: &'a str,
    timestamp_created: i64,
    timestamp_updated: Option<i64>,
    voted_up: bool,
    votes_up: u64,
    votes_funny: u64,
    weighted_vote_score: Option<f64>,
    comment_count: u64,
    steam_purchase: bool,
    received_for_free: bool,
    written_during_early_access: bool,
    primarily_steam_deck: bool,
}

impl<'a> From<&'a ReviewRecord> for ReviewRow<'a> {
    fn from(review: &'a ReviewRecord) -> Self {
        let author = &review.author;
        Self {
            appid: review.app_id,
            recommendation_id: &review.review_id,
            author_steamid: &author.steam_id,
            author_num_games_owned: author.num_games_owned,
            author_num_reviews: author.num_reviews,
            author_playtime_forever: author.playtime_forever,
            author_playtime_last_two_weeks: author.playtime_last_two_weeks,
            author_playtime_at_review: author.playtime_at_review,
            author_last_played: author.last_played.map(|at| at.timestamp()),
            language: &review.language,
            review: &review.text,
            timestamp_created: review.posted_at.timestamp(),
            timestamp_updated: review.updated_at.map(|at| at.timestamp()),
            voted_up: review.rating == Rating::Positive,
            votes_up: review.votes_up,
            votes_funny: review.votes_funny,
            weighted_vote_score: review.weighted_vote_score,
            comment_count: review.comment_count,
            steam_purchase: review.steam_purchase,
            received_for_free: review.received_for_free,
            written_during_early_access: review.written_during_early_access,
            primarily_steam_deck: review.primarily_steam_deck,
        }
    }
}

/// Write every stored review to `out` as JSON Lines, one app per line
///
/// Apps with no reviews are left out. The file is replaced atomically.
pub fn export_reviews_jsonl(store: &mut impl DatasetStore, out: &Path) -> Result<ExportReport> {
    let reviews = store.load_reviews()?;
    let mut report = ExportReport {
        path: out.to_path_buf(),
        apps: 0,
        reviews: 0,
    };

    write_atomic(out, |writer| {
        for (app_id, list) in reviews.iter().filter(|(_, list)| !list.is_empty()) {
            let line = ReviewLine {
                appid: *app_id,
                reviews: list,
            };
            serde_json::to_writer(&mut *writer, &line)
                .map_err(|e| HarvestError::storage_write(out, e))?;
            writer
                .write_all(b"\n")
                .map_err(|e| HarvestError::storage_write(out, e))?;
            report.apps += 1;
            report.reviews += list.len();
        }
        Ok(())
    })?;

    info!(path = %out.display(), apps = report.apps, reviews = report.reviews, "exported reviews");
    Ok(report)
}

/// Write every stored review to `out` as CSV, one row per review
///
/// The header is always written, so an empty store yields a header-only
/// file. The file is replaced atomically.
pub fn export_reviews_csv(store: &mut impl DatasetStore, out: &Path) -> Result<ExportReport> {
    let reviews = store.load_reviews()?;
    let mut report = ExportReport {
        path: out.to_path_buf(),
        apps: 0,
        reviews: 0,
    };

    write_atomic(out, |writer| {
        let mut table = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(&mut *writer);
        table
            .write_record(REVIEW_CSV_COLUMNS)
            .map_err(|e| HarvestError::storage_write(out, e))?;

        for list in reviews.values().filter(|list| !list.is_empty()) {
            for review in list {
                table
                    .serialize(ReviewRow::from(review))
                    .map_err(|e| HarvestError::storage_write(out, e))?;
            }
            report.apps += 1;
            report.reviews += list.len();
        }
        table.flush().map_err(|e| HarvestError::storage_write(out, e))
    })?;

    info!(path = %out.display(), apps = report.apps, reviews = report.reviews, "exported reviews as csv");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ReviewAuthor;
    use crate::store::JsonDatasetStore;
    use chrono::TimeZone;
    use chrono::Utc;
    use std::fs;
    use tempfile::TempDir;

    fn review(app_id: AppId, review_id: &str) -> ReviewRecord {
        ReviewRecord {
            app_id,
            review_id: review_id.to_string(),
            text: "solid".to_string(),
            rating: Rating::Negative,
            posted_at: Utc::now(),
            fetched_at: Utc::now(),
            updated_at: None,
            language: "english".to_string(),
            votes_up: 1,
            votes_funny: 0,
            weighted_vote_score: Some(0.5),
            comment_count: 0,
            steam_purchase: true,
            received_for_free: false,
            written_during_early_access: false,
            primarily_steam_deck: false,
            author: Default::default(),
        }
    }

    #[test]
    fn test_export_writes_one_line_per_app() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = JsonDatasetStore::new(temp_dir.path());
        store
            .merge_reviews(10, vec![review(10, "r1"), review(10, "r2")])
            .unwrap();
        store.merge_reviews(20, vec![review(20, "r9")]).unwrap();

        let out = temp_dir.path().join(REVIEWS_EXPORT_PATH);
        let report = export_reviews_jsonl(&mut store, &out).unwrap();

        assert_eq!(report.apps, 2);
        assert_eq!(report.reviews, 3);

        let contents = fs::read_to_string(&out).unwrap();
        let lines: Vec<serde_json::Value> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["appid"], 10);
        assert_eq!(lines[0]["reviews"].as_array().unwrap().len(), 2);
        assert_eq!(lines[1]["reviews"][0]["review_id"], "r9");
    }

    #[test]
    fn test_export_of_empty_store_writes_empty_file() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = JsonDatasetStore::new(temp_dir.path());
        let out = temp_dir.path().join("out.jsonl");

        let report = export_reviews_jsonl(&mut store, &out).unwrap();

        assert_eq!(report.reviews, 0);
        assert_eq!(fs::read_to_string(&out).unwrap(), "");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // CSV Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_csv_export_flattens_author_columns() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = JsonDatasetStore::new(temp_dir.path());
        let mut first = review(10, "r1");
        first.text = "great, \"really\" great".to_string();
        first.posted_at = Utc.timestamp_opt(1_760_000_000, 0).unwrap();
        first.author = ReviewAuthor {
            steam_id: "76561198000000000".to_string(),
            num_games_owned: 12,
            num_reviews: 3,
            playtime_forever: 300,
            playtime_last_two_weeks: 20,
            playtime_at_review: Some(250),
            last_played: Some(Utc.timestamp_opt(1_760_000_500, 0).unwrap()),
        };
        store.merge_reviews(10, vec![first]).unwrap();
        store.merge_reviews(20, vec![review(20, "r9")]).unwrap();

        let out = temp_dir.path().join(REVIEWS_CSV_EXPORT_PATH);
        let report = export_reviews_csv(&mut store, &out).unwrap();
        assert_eq!(report.apps, 2);
        assert_eq!(report.reviews, 2);

        let mut reader = csv::Reader::from_path(&out).unwrap();
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers, REVIEW_CSV_COLUMNS);

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        let row = &rows[0];
        assert_eq!(&row[0], "10");
        assert_eq!(&row[1], "r1");
        assert_eq!(&row[2], "76561198000000000");
        assert_eq!(&row[3], "12");
        assert_eq!(&row[4], "3");
        assert_eq!(&row[5], "300");
        assert_eq!(&row[6], "20");
        assert_eq!(&row[7], "250");
        assert_eq!(&row[8], "1760000500");
        assert_eq!(&row[10], "great, \"really\" great");
        assert_eq!(&row[11], "1760000000");
        assert_eq!(&row[12], "");
        assert_eq!(&row[13], "false");
        assert_eq!(&row[16], "0.5");

        assert_eq!(&rows[1][0], "20");
        assert_eq!(&rows[1][7], "");
    }

    #[test]
    fn test_csv_export_of_empty_store_writes_header_only() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = JsonDatasetStore::new(temp_dir.path());
        let out = temp_dir.path().join("out.csv");

        let report = export_reviews_csv(&mut store, &out).unwrap();

        assert_eq!(report.reviews, 0);
        assert_eq!(
            fs::read_to_string(&out).unwrap(),
            format!("{}\n", REVIEW_CSV_COLUMNS.join(","))
        );
    }
}
