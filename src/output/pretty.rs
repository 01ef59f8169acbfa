use chrono::{DateTime, Utc};
use colored::Colorize;

use crate::collect::{CategoryReport, CollectionStatus, RunOutcome, RunSummary};
use crate::model::FetchLedgerEntry;
use crate::store::{ExportReport, LedgerMap};

fn format_time(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Human-friendly span such as "2h 5m" or "40s"
fn format_span(duration: chrono::Duration) -> String {
    let secs = duration.num_seconds().max(0);
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

fn outcome_label(outcome: RunOutcome) -> colored::ColoredString {
    match outcome {
        RunOutcome::Completed => "completed".green(),
        RunOutcome::CompletedWithErrors => "completed with errors".yellow(),
        RunOutcome::Cancelled => "cancelled".red(),
    }
}

fn category_line(report: &CategoryReport) -> String {
    let name = format!("{:<14}", report.category.as_str());
    if !report.due {
        return format!("  {} {}\n", name.bold(), "fresh, skipped".dimmed());
    }

    let mut line = format!(
        "  {} {} new, {} fetched",
        name.bold(),
        report.new_records.to_string().green(),
        report.succeeded
    );
    if report.skipped > 0 {
        line.push_str(&format!(", {} skipped", report.skipped));
    }
    if report.duplicates > 0 {
        line.push_str(&format!(", {} duplicates", report.duplicates));
    }
    if report.malformed > 0 {
        line.push_str(&format!(", {} malformed", report.malformed.to_string().yellow()));
    }
    if report.cancelled {
        line.push_str(&format!(" [{}]", "cancelled".red()));
    }
    line.push('\n');

    if let Some(ref error) = report.error {
        line.push_str(&format!("    {} {}\n", "✗".red(), error.message));
    }
    line
}

/// Format a run summary for pretty output
pub fn format_summary(summary: &RunSummary) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "{} [{}]\n",
        "Collection run".bold(),
        outcome_label(summary.outcome)
    ));
    output.push_str(&"─".repeat(60));
    output.push('\n');

    for report in &summary.categories {
        output.push_str(&category_line(report));
    }

    output.push('\n');
    output.push_str(&format!(
        "{} {} in {}",
        "New records:".cyan(),
        summary.total_new_records(),
        format_span(summary.finished_at - summary.started_at)
    ));
    output
}

fn entry_state(entry: &FetchLedgerEntry) -> String {
    if !entry.is_in_progress() {
        return "complete".green().to_string();
    }
    let mut state = "interrupted".yellow().to_string();
    if let Some(app_id) = entry.last_successful_app_id {
        state.push_str(&format!(", through app {}", app_id));
    }
    if let Some(ref cursor) = entry.cursor {
        state.push_str(&format!(", resumes app {} mid-listing", cursor.app_id));
    }
    state
}

/// Format a directory status for pretty output
pub fn format_status(status: &CollectionStatus) -> String {
    let now = Utc::now();
    let mut output = String::new();
    output.push_str(&format!(
        "{} {}\n",
        "Data directory:".bold(),
        status.output_dir.display()
    ));
    if status.locked {
        output.push_str(&format!("{}\n", "A collection run holds the lock".yellow()));
    }
    output.push_str(&"─".repeat(60));
    output.push('\n');

    for category in &status.categories {
        let name = format!("{:<14}", category.category.as_str());
        let last = match category.entry {
            Some(ref entry) => format!(
                "last {} ({})",
                format_time(&entry.last_fetched_at),
                entry_state(entry)
            ),
            None => "never fetched".dimmed().to_string(),
        };
        let due = match category.next_due {
            Some(due) => format!("due in {}", format_span(due - now)),
            None => "due now".cyan().to_string(),
        };
        output.push_str(&format!("  {} {}, {}\n", name.bold(), last, due));
    }

    let counts = &status.datasets;
    output.push('\n');
    output.push_str(&format!("{} {}\n", "Apps:".cyan(), counts.apps));
    output.push_str(&format!(
        "{} {} samples across {} apps\n",
        "Player counts:".cyan(),
        counts.player_count_samples,
        counts.player_count_apps
    ));
    output.push_str(&format!(
        "{} {} across {} apps",
        "Reviews:".cyan(),
        counts.reviews,
        counts.review_apps
    ));
    output
}

/// Format ledger entries for pretty output
pub fn format_ledger(entries: &LedgerMap) -> String {
    if entries.is_empty() {
        return "Ledger is empty; every category is due.".to_string();
    }

    let mut output = String::new();
    output.push_str(&format!("{}\n", "Ledger".bold()));
    output.push_str(&"─".repeat(60));
    output.push('\n');
    for entry in entries.values() {
        output.push_str(&format!(
            "  {} {} ({})\n",
            format!("{:<14}", entry.category.as_str()).bold(),
            format_time(&entry.last_fetched_at),
            entry_state(entry)
        ));
    }
    output
}

/// Format an export result for pretty output
pub fn format_export(report: &ExportReport) -> String {
    format!(
        "{} Exported {} reviews for {} apps to {}",
        "✓".green(),
        report.reviews,
        report.apps,
        report.path.display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::ReportedError;
    use crate::error::ErrorKind;
    use crate::model::{Category, ReviewCursor};
    use chrono::Duration;

    // ─────────────────────────────────────────────────────────────────────────
    // Span Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_format_span_hours() {
        assert_eq!(format_span(Duration::minutes(125)), "2h 5m");
    }

    #[test]
    fn test_format_span_minutes() {
        assert_eq!(format_span(Duration::seconds(95)), "1m 35s");
    }

    #[test]
    fn test_format_span_negative_clamps() {
        assert_eq!(format_span(Duration::seconds(-5)), "0s");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Summary Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_summary_lists_categories() {
        colored::control::set_override(false);
        let mut apps = CategoryReport::new(Category::AppList);
        apps.due = true;
        apps.succeeded = 1;
        apps.new_records = 12;
        let players = CategoryReport::new(Category::PlayerCounts);

        let summary = RunSummary::new(Utc::now(), vec![apps, players]);
        let output = format_summary(&summary);

        assert!(output.contains("app_list"));
        assert!(output.contains("12 new"));
        assert!(output.contains("fresh, skipped"));
        assert!(output.contains("New records: 12"));
    }

    #[test]
    fn test_summary_shows_category_error() {
        colored::control::set_override(false);
        let mut reviews = CategoryReport::new(Category::Reviews);
        reviews.due = true;
        reviews.error = Some(ReportedError {
            kind: ErrorKind::Transient,
            message: "Transient upstream failure: HTTP 503".to_string(),
        });

        let summary = RunSummary::new(Utc::now(), vec![reviews]);
        let output = format_summary(&summary);

        assert!(output.contains("completed with errors"));
        assert!(output.contains("HTTP 503"));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Ledger Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_format_ledger_empty() {
        assert!(format_ledger(&LedgerMap::new()).contains("empty"));
    }

    #[test]
    fn test_format_ledger_marks_interrupted_entry() {
        colored::control::set_override(false);
        let mut entries = LedgerMap::new();
        entries.insert(
            Category::Reviews,
            FetchLedgerEntry::in_progress(
                Category::Reviews,
                Utc::now(),
                Some(10),
                Some(ReviewCursor {
                    app_id: 20,
                    cursor: "AoJ4".to_string(),
                }),
            ),
        );

        let output = format_ledger(&entries);
        assert!(output.contains("interrupted"));
        assert!(output.contains("through app 10"));
        assert!(output.contains("resumes app 20"));
    }
}
