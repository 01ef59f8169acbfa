pub mod json;
pub mod pretty;

use crate::cli::OutputFormat;
use crate::collect::{CollectionStatus, RunSummary};
use crate::error::Result;
use crate::store::{ExportReport, LedgerMap};

/// Format a run summary based on output format
pub fn format_summary(summary: &RunSummary, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Pretty => Ok(pretty::format_summary(summary)),
        OutputFormat::Json => json::format_summary(summary),
    }
}

/// Format a directory status based on output format
pub fn format_status(status: &CollectionStatus, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Pretty => Ok(pretty::format_status(status)),
        OutputFormat::Json => json::format_status(status),
    }
}

/// Format ledger entries based on output format
pub fn format_ledger(entries: &LedgerMap, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Pretty => Ok(pretty::format_ledger(entries)),
        OutputFormat::Json => json::format_ledger(entries),
    }
}

/// Format an export result based on output format
pub fn format_export(report: &ExportReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Pretty => Ok(pretty::format_export(report)),
        OutputFormat::Json => json::format_export(report),
    }
}
