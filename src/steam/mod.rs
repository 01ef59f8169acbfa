mod backoff;
mod client;
pub mod types;

pub use backoff::BackoffPolicy;
pub use client::SteamClient;

use crate::error::Result;
use crate::model::{AppId, AppListEntry, PlayerCountSample, ReviewRecord};

/// Cursor Steam expects for the first review page
pub const INITIAL_REVIEW_CURSOR: &str = "*";

/// One page of the app catalog
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppListPage {
    pub apps: Vec<AppListEntry>,
    /// Entries dropped because they could not be decoded
    pub malformed: usize,
    /// App id to continue after, or `None` on the final page
    pub next_after: Option<AppId>,
}

/// One page of an app's reviews
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewPage {
    pub reviews: Vec<ReviewRecord>,
    /// Reviews dropped because they could not be decoded
    pub malformed: usize,
    /// Cursor for the following page, or `None` at end of data
    pub next_cursor: Option<String>,
}

/// The three logical Steam operations the collector depends on
///
/// Implementations retry rate-limited and transient failures themselves;
/// errors that reach the caller are final for that request.
pub trait Upstream {
    /// Fetch the catalog page that starts after `after`
    fn list_apps(&self, after: Option<AppId>, max_results: u32) -> Result<AppListPage>;

    /// Fetch the current player count for an app
    fn player_count(&self, app_id: AppId) -> Result<PlayerCountSample>;

    /// Fetch the review page addressed by `cursor`
    fn reviews(&self, app_id: AppId, cursor: &str, per_page: u32) -> Result<ReviewPage>;
}
