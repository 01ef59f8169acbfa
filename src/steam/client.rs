use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::types::*;
use super::{AppListPage, BackoffPolicy, ReviewPage, Upstream, INITIAL_REVIEW_CURSOR};
use crate::config::CollectorConfig;
use crate::error::{HarvestError, Result};
use crate::model::{AppId, AppListEntry, PlayerCountSample};

const USER_AGENT: &str = concat!("steam-harvest/", env!("CARGO_PKG_VERSION"));

/// Steam Web API and store client
///
/// Safe to share between threads: request pacing is coordinated through a
/// single lock, so concurrent callers never exceed the configured rate.
pub struct SteamClient {
    client: Client,
    token: String,
    api_base: String,
    store_base: String,
    review_language: String,
    backoff: BackoffPolicy,
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl SteamClient {
    /// Create a new client from collector configuration
    pub fn new(config: &CollectorConfig) -> Result<Self> {
        let token = config.require_token()?.to_string();

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            token,
            api_base: config.api_base_url.trim_end_matches('/').to_string(),
            store_base: config.store_base_url.trim_end_matches('/').to_string(),
            review_language: config.review_language.clone(),
            backoff: config.backoff,
            min_interval: config.min_request_interval,
            last_request: Mutex::new(None),
        })
    }

    /// Build an endpoint URL with encoded query parameters
    fn endpoint(base: &str, path: &str, params: &[(&str, String)]) -> Result<Url> {
        let mut url = Url::parse(&format!("{base}{path}"))
            .map_err(|e| HarvestError::Config(format!("Invalid Steam URL {base}{path}: {e}")))?;
        url.query_pairs_mut()
            .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
        Ok(url)
    }

    /// Wait until the minimum interval since the previous request has passed
    fn pace(&self) {
        if self.min_interval.is_zero() {
            return;
        }
        let mut last = match self.last_request.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                thread::sleep(self.min_interval - elapsed);
            }
        }
        *last = Some(Instant::now());
    }

    /// Make a single GET request and decode the JSON body
    fn get_once<T: DeserializeOwned>(&self, url: &Url) -> Result<T> {
        self.pace();
        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            return Err(classify_status(status.as_u16(), url.path(), &message));
        }

        let body = response.text().map_err(transport_error)?;
        serde_json::from_str(&body)
            .map_err(|e| HarvestError::Malformed(format!("{}: {e}", url.path())))
    }

    /// Make a GET request, retrying rate-limited and transient failures
    fn get<T: DeserializeOwned>(&self, url: &Url) -> Result<T> {
        let mut attempt = 1;
        loop {
            match self.get_once(url) {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() => match self.backoff.delay_after(attempt) {
                    Some(delay) => {
                        warn!(
                            path = url.path(),
                            attempt,
                            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                            error = %err,
                            "retrying Steam request"
                        );
                        thread::sleep(delay);
                        attempt += 1;
                    }
                    None => return Err(err),
                },
                Err(err) => return Err(err),
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Catalog
    // ─────────────────────────────────────────────────────────────────────────

    /// Fetch one page of `IStoreService/GetAppList`
    pub fn list_apps(&self, after: Option<AppId>, max_results: u32) -> Result<AppListPage> {
        let mut params = vec![
            ("access_token", self.token.clone()),
            ("max_results", max_results.to_string()),
        ];
        if let Some(after) = after {
            params.push(("last_appid", after.to_string()));
        }
        let url = Self::endpoint(&self.api_base, "/IStoreService/GetAppList/v1/", &params)?;
        let envelope: AppListEnvelope = self.get(&url)?;

        let body = envelope.response;
        let (apps, malformed) = decode_each(body.apps, |value| {
            serde_json::from_value::<RawApp>(value).ok().map(AppListEntry::from)
        });
        if malformed > 0 {
            warn!(malformed, "skipped undecodable catalog entries");
        }

        let next_after = if body.have_more_results {
            let last = body
                .last_appid
                .or_else(|| apps.last().map(|app| app.app_id))
                .ok_or_else(|| {
                    HarvestError::Malformed("catalog reports more results without last_appid".into())
                })?;
            Some(last)
        } else {
            None
        };

        debug!(count = apps.len(), ?next_after, "fetched catalog page");
        Ok(AppListPage {
            apps,
            malformed,
            next_after,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Player Counts
    // ─────────────────────────────────────────────────────────────────────────

    /// Fetch the current player count for an app
    pub fn player_count(&self, app_id: AppId) -> Result<PlayerCountSample> {
        let params = [
            ("appid", app_id.to_string()),
            ("access_token", self.token.clone()),
        ];
        let url = Self::endpoint(
            &self.api_base,
            "/ISteamUserStats/GetNumberOfCurrentPlayers/v1/",
            &params,
        )?;
        let envelope: PlayerCountEnvelope = self.get(&url)?;

        if envelope.response.result != RESULT_OK {
            return Err(HarvestError::NotFound(format!(
                "no player count for app {app_id} (result {})",
                envelope.response.result
            )));
        }
        envelope
            .response
            .into_sample(app_id, Utc::now())
            .ok_or_else(|| HarvestError::Malformed(format!("player count missing for app {app_id}")))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reviews
    // ─────────────────────────────────────────────────────────────────────────

    /// Fetch one page of recent reviews for an app
    pub fn reviews(&self, app_id: AppId, cursor: &str, per_page: u32) -> Result<ReviewPage> {
        let params = [
            ("json", "1".to_string()),
            ("cursor", cursor.to_string()),
            ("num_per_page", per_page.to_string()),
            ("filter", "recent".to_string()),
            ("language", self.review_language.clone()),
            ("purchase_type", "all".to_string()),
            ("access_token", self.token.clone()),
        ];
        let url = Self::endpoint(&self.store_base, &format!("/appreviews/{app_id}"), &params)?;
        let envelope: ReviewsEnvelope = self.get(&url)?;

        if envelope.success != 1 || envelope.reviews.is_empty() {
            return Ok(ReviewPage::default());
        }

        let fetched_at = Utc::now();
        let (reviews, malformed) = decode_each(envelope.reviews, |value| {
            serde_json::from_value::<RawReview>(value)
                .ok()
                .and_then(|raw| raw.into_record(app_id, fetched_at))
        });
        if malformed > 0 {
            warn!(app_id, malformed, "skipped undecodable reviews");
        }

        Ok(ReviewPage {
            reviews,
            malformed,
            next_cursor: next_cursor(envelope.cursor, cursor),
        })
    }
}

impl Upstream for SteamClient {
    fn list_apps(&self, after: Option<AppId>, max_results: u32) -> Result<AppListPage> {
        SteamClient::list_apps(self, after, max_results)
    }

    fn player_count(&self, app_id: AppId) -> Result<PlayerCountSample> {
        SteamClient::player_count(self, app_id)
    }

    fn reviews(&self, app_id: AppId, cursor: &str, per_page: u32) -> Result<ReviewPage> {
        SteamClient::reviews(self, app_id, cursor, per_page)
    }
}

/// Decode each element, counting the ones that fail
fn decode_each<T>(values: Vec<Value>, decode: impl Fn(Value) -> Option<T>) -> (Vec<T>, usize) {
    let total = values.len();
    let decoded: Vec<T> = values.into_iter().filter_map(decode).collect();
    let malformed = total - decoded.len();
    (decoded, malformed)
}

/// The cursor to continue with, or `None` when the listing is exhausted
fn next_cursor(returned: Option<String>, requested: &str) -> Option<String> {
    returned.filter(|c| !c.is_empty() && c != INITIAL_REVIEW_CURSOR && c != requested)
}

/// Map a non-success HTTP status to the error taxonomy
fn classify_status(status: u16, path: &str, body: &str) -> HarvestError {
    let detail = format!("HTTP {status} from {path}");
    match status {
        401 | 403 => HarvestError::Unauthorized { status },
        404 => HarvestError::NotFound(detail),
        429 => HarvestError::RateLimited(detail),
        500..=599 => HarvestError::Transient(detail),
        _ => {
            let snippet: String = body.chars().take(200).collect();
            HarvestError::Malformed(format!("{detail}: {snippet}"))
        }
    }
}

/// Map a transport failure; URLs are stripped since they carry the token
fn transport_error(err: reqwest::Error) -> HarvestError {
    if err.is_decode() {
        HarvestError::Malformed(err.without_url().to_string())
    } else {
        HarvestError::Transient(err.without_url().to_string())
    }
}
