//! Domain records persisted by the collector
//!
//! Field names on disk use Steam's own `appid` spelling so the files stay
//! readable next to raw API dumps.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Steam application identifier
pub type AppId = u32;

/// One entry of the Steam app catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppListEntry {
    #[serde(rename = "appid")]
    pub app_id: AppId,
    pub name: String,
    /// Unix time of the last store page change, when upstream reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<i64>,
}

/// A single current-player observation for an app
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerCountSample {
    #[serde(rename = "appid")]
    pub app_id: AppId,
    pub count: u64,
    pub fetched_at: DateTime<Utc>,
}

/// Whether the reviewer recommends the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Positive,
    Negative,
}

impl Rating {
    /// Map Steam's `voted_up` flag
    pub fn from_voted_up(voted_up: bool) -> Self {
        if voted_up {
            Self::Positive
        } else {
            Self::Negative
        }
    }
}

/// Reviewer details attached to a review
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewAuthor {
    #[serde(default)]
    pub steam_id: String,
    #[serde(default)]
    pub num_games_owned: u64,
    #[serde(default)]
    pub num_reviews: u64,
    /// Lifetime playtime in minutes
    #[serde(default)]
    pub playtime_forever: u64,
    #[serde(default)]
    pub playtime_last_two_weeks: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playtime_at_review: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_played: Option<DateTime<Utc>>,
}

/// A user review, unique per `(app_id, review_id)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    #[serde(rename = "appid")]
    pub app_id: AppId,
    pub review_id: String,
    pub text: String,
    pub rating: Rating,
    pub posted_at: DateTime<Utc>,
    pub fetched_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub votes_up: u64,
    #[serde(default)]
    pub votes_funny: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weighted_vote_score: Option<f64>,
    #[serde(default)]
    pub comment_count: u64,
    #[serde(default)]
    pub steam_purchase: bool,
    #[serde(default)]
    pub received_for_free: bool,
    #[serde(default)]
    pub written_during_early_access: bool,
    #[serde(default)]
    pub primarily_steam_deck: bool,
    #[serde(default)]
    pub author: ReviewAuthor,
}

/// Data category tracked by the ledger, in collection order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    AppList,
    PlayerCounts,
    Reviews,
}

impl Category {
    /// All categories in the order a pass visits them
    pub const ALL: [Category; 3] = [Self::AppList, Self::PlayerCounts, Self::Reviews];

    /// Stable identifier used in files and output
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AppList => "app_list",
            Self::PlayerCounts => "player_counts",
            Self::Reviews => "reviews",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position inside one app's paged review listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewCursor {
    #[serde(rename = "appid")]
    pub app_id: AppId,
    pub cursor: String,
}

/// Last durable progress recorded for a category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchLedgerEntry {
    pub category: Category,
    pub last_fetched_at: DateTime<Utc>,
    /// Highest app finished by an unfinished pass (catalog page or review app)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_successful_app_id: Option<AppId>,
    /// Next review page to request for an app that was interrupted mid-listing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<ReviewCursor>,
}

impl FetchLedgerEntry {
    /// Entry for a category whose pass finished at `at`
    pub fn completed(category: Category, at: DateTime<Utc>) -> Self {
        Self {
            category,
            last_fetched_at: at,
            last_successful_app_id: None,
            cursor: None,
        }
    }

    /// Entry for a pass that is still underway
    pub fn in_progress(
        category: Category,
        at: DateTime<Utc>,
        last_successful_app_id: Option<AppId>,
        cursor: Option<ReviewCursor>,
    ) -> Self {
        Self {
            category,
            last_fetched_at: at,
            last_successful_app_id,
            cursor,
        }
    }

    /// Whether a previous pass left resume state behind
    pub fn is_in_progress(&self) -> bool {
        self.last_successful_app_id.is_some() || self.cursor.is_some()
    }
}
