//! Wire formats of the Steam Web API and store endpoints
//!
//! Collections are decoded as raw JSON values first so that a single bad
//! element is counted and skipped instead of failing the whole page.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::model::{AppId, AppListEntry, PlayerCountSample, Rating, ReviewAuthor, ReviewRecord};

/// `IStoreService/GetAppList` envelope
#[derive(Debug, Deserialize)]
pub struct AppListEnvelope {
    #[serde(default)]
    pub response: AppListBody,
}

/// Body of a catalog page
#[derive(Debug, Default, Deserialize)]
pub struct AppListBody {
    #[serde(default)]
    pub apps: Vec<Value>,
    #[serde(default)]
    pub have_more_results: bool,
    pub last_appid: Option<AppId>,
}

/// A catalog entry as Steam sends it
#[derive(Debug, Deserialize)]
pub struct RawApp {
    pub appid: AppId,
    pub name: String,
    pub last_modified: Option<i64>,
}

impl From<RawApp> for AppListEntry {
    fn from(raw: RawApp) -> Self {
        Self {
            app_id: raw.appid,
            name: raw.name,
            last_modified: raw.last_modified,
        }
    }
}

/// `ISteamUserStats/GetNumberOfCurrentPlayers` envelope
#[derive(Debug, Deserialize)]
pub struct PlayerCountEnvelope {
    pub response: PlayerCountBody,
}

/// Body of a player count response
#[derive(Debug, Deserialize)]
pub struct PlayerCountBody {
    pub player_count: Option<u64>,
    /// 1 on success, 42 when the app has no stats
    pub result: i64,
}

/// Result code Steam uses for a successful call
pub const RESULT_OK: i64 = 1;

impl PlayerCountBody {
    /// Build a sample if the call succeeded and carried a count
    pub fn into_sample(self, app_id: AppId, fetched_at: DateTime<Utc>) -> Option<PlayerCountSample> {
        self.player_count.map(|count| PlayerCountSample {
            app_id,
            count,
            fetched_at,
        })
    }
}

/// `appreviews/{appid}` envelope
#[derive(Debug, Deserialize)]
pub struct ReviewsEnvelope {
    #[serde(default)]
    pub success: i64,
    #[serde(default)]
    pub reviews: Vec<Value>,
    pub cursor: Option<String>,
}

/// A review as the store endpoint sends it
#[derive(Debug, Deserialize)]
pub struct RawReview {
    pub recommendationid: String,
    #[serde(default)]
    pub author: RawAuthor,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub review: String,
    pub timestamp_created: i64,
    pub timestamp_updated: Option<i64>,
    pub voted_up: bool,
    #[serde(default)]
    pub votes_up: u64,
    #[serde(default)]
    pub votes_funny: u64,
    /// Sent as a decimal string, occasionally as a number
    pub weighted_vote_score: Option<Value>,
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
}

/// Review author block
#[derive(Debug, Default, Deserialize)]
pub struct RawAuthor {
    #[serde(default)]
    pub steamid: String,
    #[serde(default)]
    pub num_games_owned: u64,
    #[serde(default)]
    pub num_reviews: u64,
    #[serde(default)]
    pub playtime_forever: u64,
    #[serde(default)]
    pub playtime_last_two_weeks: u64,
    pub playtime_at_review: Option<u64>,
    pub last_played: Option<i64>,
}

impl RawReview {
    /// Convert into a stored record; `None` when the creation time is out of range
    pub fn into_record(self, app_id: AppId, fetched_at: DateTime<Utc>) -> Option<ReviewRecord> {
        let posted_at = DateTime::from_timestamp(self.timestamp_created, 0)?;
        let weighted_vote_score = self.weighted_vote_score.as_ref().and_then(parse_score);
        Some(ReviewRecord {
            app_id,
            review_id: self.recommendationid,
            text: self.review,
            rating: Rating::from_voted_up(self.voted_up),
            posted_at,
            fetched_at,
            updated_at: self
                .timestamp_updated
                .and_then(|ts| DateTime::from_timestamp(ts, 0)),
            language: self.language,
            votes_up: self.votes_up,
            votes_funny: self.votes_funny,
            weighted_vote_score,
            comment_count: self.comment_count,
            steam_purchase: self.steam_purchase,
            received_for_free: self.received_for_free,
            written_during_early_access: self.written_during_early_access,
            primarily_steam_deck: self.primarily_steam_deck,
            author: ReviewAuthor {
                steam_id: self.author.steamid,
                num_games_owned: self.author.num_games_owned,
                num_reviews: self.author.num_reviews,
                playtime_forever: self.author.playtime_forever,
                playtime_last_two_weeks: self.author.playtime_last_two_weeks,
                playtime_at_review: self.author.playtime_at_review,
                last_played: self
                    .author
                    .last_played
                    .and_then(|ts| DateTime::from_timestamp(ts, 0)),
            },
        })
    }
}

fn parse_score(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}
