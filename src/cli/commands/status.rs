use std::path::Path;

use super::common::resolve_data_dir;
use crate::cli::args::OutputFormat;
use crate::collect::collection_status;
use crate::config::Config;
use crate::error::Result;
use crate::output;

/// Handle the status command
pub fn status(config: &Config, data_dir: Option<&Path>, format: OutputFormat) -> Result<String> {
    let directory = resolve_data_dir(config, data_dir);
    let status = collection_status(&directory, &config.collection.staleness_policy())?;
    output::format_status(&status, format)
}
