use std::path::Path;

use tracing::warn;

use super::common::{is_interrupted, setup_interrupt_handler};
use crate::cli::args::{CollectArgs, OutputFormat};
use crate::collect::{run_collection_pass, RunOutcome, StalenessPolicy};
use crate::config::Config;
use crate::error::Result;
use crate::output;

/// Handle the collect command
///
/// Returns the rendered summary together with the run outcome, which decides
/// the process exit code.
pub fn collect(
    config: &Config,
    token: Option<&str>,
    data_dir: Option<&Path>,
    args: &CollectArgs,
    format: OutputFormat,
) -> Result<(String, RunOutcome)> {
    let mut collector = config.collector(token, data_dir)?;
    if args.force {
        collector.staleness = StalenessPolicy::always();
    }
    if !args.apps.is_empty() {
        collector.tracked_apps = args.apps.clone();
    }

    let interrupted = setup_interrupt_handler();
    let summary = run_collection_pass(&collector, interrupted.clone())?;
    if is_interrupted(&interrupted) {
        warn!("interrupted; completed work has been saved and the next run resumes from it");
    }

    Ok((output::format_summary(&summary, format)?, summary.outcome))
}
