use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for collector operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Errors that can occur while collecting or persisting Steam data
#[derive(Error, Debug)]
pub enum HarvestError {
    /// Upstream rejected the access token
    #[error("Steam API rejected the access token (HTTP {status})")]
    Unauthorized { status: u16 },

    /// Upstream is throttling requests
    #[error("Steam API rate limit hit: {0}")]
    RateLimited(String),

    /// The requested app or resource does not exist upstream
    #[error("Not found upstream: {0}")]
    NotFound(String),

    /// Temporary upstream or network failure
    #[error("Transient upstream failure: {0}")]
    Transient(String),

    /// Upstream response could not be understood
    #[error("Malformed upstream data: {0}")]
    Malformed(String),

    /// The ledger file exists but cannot be read back
    #[error(
        "Ledger file {} is corrupt: {detail}. Inspect or repair it manually; it will not be reset automatically.",
        path.display()
    )]
    LedgerCorrupt { path: PathBuf, detail: String },

    /// A dataset file exists but cannot be read back
    #[error("Dataset file {} is corrupt: {detail}", path.display())]
    DatasetCorrupt { path: PathBuf, detail: String },

    /// Writing a dataset or ledger file failed
    #[error("Failed to write {}: {detail}", path.display())]
    StorageWriteFailure { path: PathBuf, detail: String },

    /// No API token was supplied
    #[error("{0}")]
    MissingCredential(String),

    /// Another collection run holds the lock file
    #[error(
        "Another collection run is active (lock file {}). Remove it if no run is in progress.",
        .0.display()
    )]
    AlreadyRunning(PathBuf),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// HTTP client could not be constructed or used
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("Failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("Failed to write config file: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Environment variable error
    #[error("Environment error: {0}")]
    Env(#[from] std::env::VarError),
}

/// Serializable classification of a [`HarvestError`], used in run summaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unauthorized,
    RateLimited,
    NotFound,
    Transient,
    Malformed,
    LedgerCorrupt,
    DatasetCorrupt,
    StorageWriteFailure,
    MissingCredential,
    AlreadyRunning,
    Config,
    Internal,
}

impl HarvestError {
    /// Create a storage write failure for a path
    pub fn storage_write(path: impl Into<PathBuf>, detail: impl ToString) -> Self {
        Self::StorageWriteFailure {
            path: path.into(),
            detail: detail.to_string(),
        }
    }

    /// Create a missing credential error with helpful message
    pub fn missing_credential(message: impl Into<String>) -> Self {
        Self::MissingCredential(message.into())
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::RateLimited(_) => ErrorKind::RateLimited,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Transient(_) => ErrorKind::Transient,
            Self::Malformed(_) | Self::Json(_) => ErrorKind::Malformed,
            Self::LedgerCorrupt { .. } => ErrorKind::LedgerCorrupt,
            Self::DatasetCorrupt { .. } => ErrorKind::DatasetCorrupt,
            Self::StorageWriteFailure { .. } => ErrorKind::StorageWriteFailure,
            Self::MissingCredential(_) => ErrorKind::MissingCredential,
            Self::AlreadyRunning(_) => ErrorKind::AlreadyRunning,
            Self::Config(_)
            | Self::InvalidArgument(_)
            | Self::Toml(_)
            | Self::TomlSerialize(_)
            | Self::Env(_) => ErrorKind::Config,
            Self::Http(_) | Self::Io(_) => ErrorKind::Internal,
        }
    }

    /// Whether the request that produced this error may be retried
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::RateLimited | ErrorKind::Transient)
    }

    /// Whether this error must abort the whole collection run
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Unauthorized
                | ErrorKind::MissingCredential
                | ErrorKind::LedgerCorrupt
                | ErrorKind::AlreadyRunning
        )
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::MissingCredential | ErrorKind::Config | ErrorKind::Unauthorized => 2,
            ErrorKind::LedgerCorrupt => 3,
            ErrorKind::AlreadyRunning => 4,
            _ => 1,
        }
    }
}
