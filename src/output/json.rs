use serde::Serialize;

use crate::collect::{CollectionStatus, RunSummary};
use crate::error::Result;
use crate::store::{ExportReport, LedgerMap};

/// Format a run summary as JSON
pub fn format_summary(summary: &RunSummary) -> Result<String> {
    format_json(summary)
}

/// Format a directory status as JSON
pub fn format_status(status: &CollectionStatus) -> Result<String> {
    format_json(status)
}

/// Format ledger entries as JSON, keyed by category
pub fn format_ledger(entries: &LedgerMap) -> Result<String> {
    format_json(entries)
}

/// Format an export result as JSON
pub fn format_export(report: &ExportReport) -> Result<String> {
    format_json(report)
}

/// Format any serializable value as JSON
pub fn format_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
