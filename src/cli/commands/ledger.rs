use std::path::Path;

use colored::Colorize;
use tracing::info;

use super::common::resolve_data_dir;
use crate::cli::args::{LedgerArgs, LedgerCommands, OutputFormat};
use crate::config::Config;
use crate::error::Result;
use crate::model::Category;
use crate::output;
use crate::store::{JsonLedger, Ledger, RunLock};

/// Handle the ledger command
pub fn ledger(
    config: &Config,
    data_dir: Option<&Path>,
    args: &LedgerArgs,
    format: OutputFormat,
) -> Result<String> {
    let directory = resolve_data_dir(config, data_dir);
    match &args.command {
        LedgerCommands::Show => {
            let entries = JsonLedger::new(&directory).load_all()?;
            output::format_ledger(&entries, format)
        }
        LedgerCommands::Reset { category } => reset(&directory, category.to_category(), format),
    }
}

/// Remove one ledger entry while holding the run lock
fn reset(directory: &Path, category: Category, format: OutputFormat) -> Result<String> {
    let _lock = RunLock::acquire(directory)?;
    let mut ledger = JsonLedger::new(directory);
    let removed = ledger.reset(category)?;
    info!(category = %category, removed, "ledger reset");

    match format {
        OutputFormat::Pretty => Ok(if removed {
            format!(
                "{} Reset {}; the next collect fetches it from scratch",
                "✓".green(),
                category.as_str().bold()
            )
        } else {
            format!("No ledger entry for {}", category.as_str().bold())
        }),
        OutputFormat::Json => {
            let result = serde_json::json!({
                "category": category,
                "removed": removed
            });
            Ok(serde_json::to_string_pretty(&result)?)
        }
    }
}
