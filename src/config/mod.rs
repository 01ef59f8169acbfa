mod collector;
mod paths;
mod settings;

pub use collector::CollectorConfig;
pub use paths::Paths;
pub use settings::{ApiConfig, CollectionConfig, Config, OutputConfig, RetryConfig};
