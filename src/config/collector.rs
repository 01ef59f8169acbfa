use std::path::PathBuf;
use std::time::Duration;

use crate::collect::StalenessPolicy;
use crate::error::{HarvestError, Result};
use crate::model::AppId;
use crate::steam::BackoffPolicy;

/// Everything one collection pass needs, passed explicitly to the collector
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub token: String,
    pub output_dir: PathBuf,
    pub api_base_url: String,
    pub store_base_url: String,
    pub timeout: Duration,
    pub backoff: BackoffPolicy,
    pub min_request_interval: Duration,
    pub staleness: StalenessPolicy,
    pub app_list_page_size: u32,
    pub reviews_per_page: u32,
    pub max_reviews_per_app: usize,
    pub review_language: String,
    pub tracked_apps: Vec<AppId>,
}

impl CollectorConfig {
    /// Configuration with default policies for a token and output directory
    pub fn new(token: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            token: token.into(),
            output_dir: output_dir.into(),
            api_base_url: "https://api.steampowered.com".to_string(),
            store_base_url: "https://store.steampowered.com".to_string(),
            timeout: Duration::from_secs(30),
            backoff: BackoffPolicy::default(),
            min_request_interval: Duration::ZERO,
            staleness: StalenessPolicy::default(),
            app_list_page_size: 10_000,
            reviews_per_page: 100,
            max_reviews_per_app: 6000,
            review_language: "all".to_string(),
            tracked_apps: Vec::new(),
        }
    }

    /// The token, or `MissingCredential` when it is blank
    pub fn require_token(&self) -> Result<&str> {
        if self.token.trim().is_empty() {
            return Err(HarvestError::missing_credential(
                "Steam API token is empty. Run 'steam-harvest config init' or set STEAM_HARVEST_TOKEN.",
            ));
        }
        Ok(&self.token)
    }
}
