use std::path::Path;

use super::common::resolve_data_dir;
use crate::cli::args::{ExportArgs, ExportCommands, ExportFormat, OutputFormat};
use crate::config::Config;
use crate::error::Result;
use crate::output;
use crate::store::{
    export_reviews_csv, export_reviews_jsonl, JsonDatasetStore, REVIEWS_CSV_EXPORT_PATH,
    REVIEWS_EXPORT_PATH,
};

/// Handle the export command
pub fn export(
    config: &Config,
    data_dir: Option<&Path>,
    args: &ExportArgs,
    format: OutputFormat,
) -> Result<String> {
    let directory = resolve_data_dir(config, data_dir);
    match &args.command {
        ExportCommands::Reviews { format: file_format, out } => {
            let default_path = match file_format {
                ExportFormat::Jsonl => REVIEWS_EXPORT_PATH,
                ExportFormat::Csv => REVIEWS_CSV_EXPORT_PATH,
            };
            let out = out.clone().unwrap_or_else(|| directory.join(default_path));
            let mut store = JsonDatasetStore::new(&directory);
            let report = match file_format {
                ExportFormat::Jsonl => export_reviews_jsonl(&mut store, &out)?,
                ExportFormat::Csv => export_reviews_csv(&mut store, &out)?,
            };
            output::format_export(&report, format)
        }
    }
}
