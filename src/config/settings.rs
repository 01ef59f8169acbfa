use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use super::collector::CollectorConfig;
use super::paths::Paths;
use crate::collect::StalenessPolicy;
use crate::error::{HarvestError, Result};
use crate::model::AppId;
use crate::steam::BackoffPolicy;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Output preferences
    #[serde(default)]
    pub output: OutputConfig,

    /// Collection policy
    #[serde(default)]
    pub collection: CollectionConfig,

    /// Retry and pacing policy
    #[serde(default)]
    pub retry: RetryConfig,
}

/// API-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Steam Web API access token
    pub token: Option<String>,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_store_base_url")]
    pub store_base_url: String,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_base_url() -> String {
    "https://api.steampowered.com".to_string()
}

fn default_store_base_url() -> String {
    "https://store.steampowered.com".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_base_url: default_api_base_url(),
            store_base_url: default_store_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Output preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory holding the datasets and ledger
    #[serde(default = "default_directory")]
    pub directory: PathBuf,

    /// Default output format
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_directory() -> PathBuf {
    PathBuf::from("data")
}

fn default_format() -> String {
    "pretty".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            format: default_format(),
        }
    }
}

/// How often and how much to collect
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    pub app_list_interval_hours: u32,
    pub player_count_interval_minutes: u32,
    pub review_interval_hours: u32,
    pub app_list_page_size: u32,
    pub reviews_per_page: u32,
    pub max_reviews_per_app: usize,
    pub review_language: String,
    /// Restrict player counts and reviews to these apps (empty = whole catalog)
    pub tracked_apps: Vec<AppId>,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            app_list_interval_hours: 24,
            player_count_interval_minutes: 60,
            review_interval_hours: 24,
            app_list_page_size: 10_000,
            reviews_per_page: 100,
            max_reviews_per_app: 6000,
            review_language: "all".to_string(),
            tracked_apps: Vec::new(),
        }
    }
}

/// Retry and request pacing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_attempts: u32,
    pub min_request_interval_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 500,
            max_delay_ms: 30_000,
            max_attempts: 5,
            min_request_interval_ms: 0,
        }
    }
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let paths = Paths::new()?;
        Self::load_from(&paths)
    }

    /// Load configuration from a specific paths instance
    pub fn load_from(paths: &Paths) -> Result<Self> {
        if !paths.config_exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&paths.config_file)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a specific paths instance
    pub fn save_to(&self, paths: &Paths) -> Result<()> {
        paths.ensure_dirs()?;
        let contents = toml::to_string_pretty(self)?;
        fs::write(&paths.config_file, &contents)?;

        // Set restrictive permissions on config file (contains API token)
        #[cfg(unix)]
        {
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(&paths.config_file, perms)?;
        }

        Ok(())
    }

    /// Get the API token or return an error with instructions
    pub fn require_token(&self) -> Result<&str> {
        self.api
            .token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                HarvestError::missing_credential(
                    "Steam API token not configured. Run 'steam-harvest config init' or set STEAM_HARVEST_TOKEN.",
                )
            })
    }

    /// Set the API token
    pub fn set_token(&mut self, token: String) {
        self.api.token = Some(token);
    }

    /// Build the collector configuration, applying command-line overrides
    pub fn collector(
        &self,
        token_override: Option<&str>,
        directory_override: Option<&Path>,
    ) -> Result<CollectorConfig> {
        let token = match token_override {
            Some(token) => token,
            None => self.require_token()?,
        };
        let directory = directory_override
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.output.directory.clone());

        let mut collector = CollectorConfig::new(token, directory);
        collector.require_token()?;

        collector.api_base_url = self.api.api_base_url.clone();
        collector.store_base_url = self.api.store_base_url.clone();
        collector.timeout = Duration::from_secs(self.api.timeout_secs);
        collector.backoff = self.retry.backoff_policy();
        collector.min_request_interval = Duration::from_millis(self.retry.min_request_interval_ms);
        collector.staleness = self.collection.staleness_policy();
        collector.app_list_page_size = self.collection.app_list_page_size.max(1);
        collector.reviews_per_page = self.collection.reviews_per_page.clamp(1, 100);
        collector.max_reviews_per_app = self.collection.max_reviews_per_app;
        collector.review_language = self.collection.review_language.clone();
        collector.tracked_apps = self.collection.tracked_apps.clone();
        Ok(collector)
    }
}

impl CollectionConfig {
    /// Staleness intervals as a policy
    pub fn staleness_policy(&self) -> StalenessPolicy {
        StalenessPolicy {
            app_list: chrono::Duration::hours(i64::from(self.app_list_interval_hours)),
            player_counts: chrono::Duration::minutes(i64::from(self.player_count_interval_minutes)),
            reviews: chrono::Duration::hours(i64::from(self.review_interval_hours)),
        }
    }
}

impl RetryConfig {
    /// Retry settings as a backoff policy
    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            base: Duration::from_millis(self.base_delay_ms),
            max: Duration::from_millis(self.max_delay_ms),
            max_attempts: self.max_attempts.max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Create a test Paths instance using a temp directory
    fn make_test_paths(temp_dir: &TempDir) -> Paths {
        Paths::with_root(temp_dir.path().to_path_buf())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Default Value Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.api.token.is_none());
        assert_eq!(config.api.api_base_url, "https://api.steampowered.com");
        assert_eq!(config.output.directory, PathBuf::from("data"));
        assert_eq!(config.output.format, "pretty");
        assert_eq!(config.collection.app_list_interval_hours, 24);
        assert_eq!(config.collection.max_reviews_per_app, 6000);
        assert_eq!(config.retry.max_attempts, 5);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Load/Save Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_load_returns_default_when_no_file() {
        let temp_dir = TempDir::new().unwrap();
        let paths = make_test_paths(&temp_dir);

        let config = Config::load_from(&paths).unwrap();
        assert!(config.api.token.is_none());
        assert_eq!(config.output.format, "pretty");
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let paths = make_test_paths(&temp_dir);

        let mut config = Config::default();
        config.set_token("test-token-123".to_string());
        config.output.directory = PathBuf::from("/srv/steam");
        config.collection.tracked_apps = vec![10, 730];

        config.save_to(&paths).unwrap();

        let loaded = Config::load_from(&paths).unwrap();
        assert_eq!(loaded.api.token, Some("test-token-123".to_string()));
        assert_eq!(loaded.output.directory, PathBuf::from("/srv/steam"));
        assert_eq!(loaded.collection.tracked_apps, vec![10, 730]);
    }

    #[test]
    fn test_load_partial_config() {
        let temp_dir = TempDir::new().unwrap();
        let paths = make_test_paths(&temp_dir);

        fs::create_dir_all(&paths.root).unwrap();
        fs::write(
            &paths.config_file,
            r#"
[api]
token = "partial-token"

[collection]
review_interval_hours = 6
"#,
        )
        .unwrap();

        let config = Config::load_from(&paths).unwrap();
        assert_eq!(config.api.token, Some("partial-token".to_string()));
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.collection.review_interval_hours, 6);
        assert_eq!(config.collection.player_count_interval_minutes, 60);
    }

    #[test]
    fn test_load_invalid_toml_fails() {
        let temp_dir = TempDir::new().unwrap();
        let paths = make_test_paths(&temp_dir);

        fs::create_dir_all(&paths.root).unwrap();
        fs::write(&paths.config_file, "[api\ntoken = ").unwrap();

        assert!(matches!(Config::load_from(&paths), Err(HarvestError::Toml(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_save_sets_restrictive_permissions() {
        let temp_dir = TempDir::new().unwrap();
        let paths = make_test_paths(&temp_dir);

        let mut config = Config::default();
        config.set_token("secret-token".to_string());
        config.save_to(&paths).unwrap();

        let metadata = fs::metadata(&paths.config_file).unwrap();
        let mode = metadata.permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "Config file should have 0600 permissions");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Collector Config Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_require_token_when_missing() {
        let config = Config::default();
        let err = config.require_token().unwrap_err();
        assert!(matches!(err, HarvestError::MissingCredential(_)));
        assert!(err.to_string().contains("token not configured"));
    }

    #[test]
    fn test_require_token_rejects_blank() {
        let mut config = Config::default();
        config.set_token("   ".to_string());
        assert!(config.require_token().is_err());
    }

    #[test]
    fn test_collector_uses_overrides() {
        let mut config = Config::default();
        config.set_token("file-token".to_string());

        let collector = config
            .collector(Some("flag-token"), Some(Path::new("/tmp/out")))
            .unwrap();
        assert_eq!(collector.token, "flag-token");
        assert_eq!(collector.output_dir, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn test_collector_fails_fast_without_token() {
        let config = Config::default();
        let result = config.collector(None, None);
        assert!(matches!(result, Err(HarvestError::MissingCredential(_))));

        let result = config.collector(Some(""), None);
        assert!(matches!(result, Err(HarvestError::MissingCredential(_))));
    }

    #[test]
    fn test_collector_maps_policies() {
        let mut config = Config::default();
        config.set_token("t".to_string());
        config.collection.player_count_interval_minutes = 15;
        config.collection.reviews_per_page = 500;
        config.retry.base_delay_ms = 250;
        config.retry.max_attempts = 0;

        let collector = config.collector(None, None).unwrap();
        assert_eq!(collector.staleness.player_counts, chrono::Duration::minutes(15));
        assert_eq!(collector.reviews_per_page, 100);
        assert_eq!(collector.backoff.base, Duration::from_millis(250));
        assert_eq!(collector.backoff.max_attempts, 1);
        assert_eq!(collector.output_dir, PathBuf::from("data"));
    }
}
