//! Collection pass orchestration
//!
//! A pass visits the categories in a fixed order (catalog first, since the
//! other two only fetch apps the catalog knows about). Each category reads its
//! ledger entry, fetches only when the staleness policy says so, writes the
//! results durably, and only then advances the ledger.

mod staleness;
mod status;
mod summary;

pub use staleness::StalenessPolicy;
pub use status::{collection_status, CategoryStatus, CollectionStatus, DatasetCounts};
pub use summary::{CategoryReport, ReportedError, RunOutcome, RunSummary};

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::config::CollectorConfig;
use crate::error::{ErrorKind, HarvestError, Result};
use crate::model::{AppId, Category, FetchLedgerEntry, ReviewCursor};
use crate::steam::{SteamClient, Upstream, INITIAL_REVIEW_CURSOR};
use crate::store::{DatasetStore, JsonDatasetStore, JsonLedger, Ledger, RunLock};

/// Tunables for a pass that do not concern the HTTP layer
#[derive(Debug, Clone)]
pub struct CollectionSettings {
    pub staleness: StalenessPolicy,
    pub app_list_page_size: u32,
    pub reviews_per_page: u32,
    pub max_reviews_per_app: usize,
    /// Apps to follow; empty means the whole catalog
    pub tracked_apps: Vec<AppId>,
}

impl Default for CollectionSettings {
    fn default() -> Self {
        Self {
            staleness: StalenessPolicy::default(),
            app_list_page_size: 10_000,
            reviews_per_page: 100,
            max_reviews_per_app: 6000,
            tracked_apps: Vec::new(),
        }
    }
}

impl From<&CollectorConfig> for CollectionSettings {
    fn from(config: &CollectorConfig) -> Self {
        Self {
            staleness: config.staleness,
            app_list_page_size: config.app_list_page_size,
            reviews_per_page: config.reviews_per_page,
            max_reviews_per_app: config.max_reviews_per_app,
            tracked_apps: config.tracked_apps.clone(),
        }
    }
}

/// Run one collection pass against Steam using the files in `config.output_dir`
///
/// Fails fast on a missing token, refuses to start while another run holds
/// the directory lock, and returns `Err` only for run-fatal errors; category
/// failures are reported in the summary.
pub fn run_collection_pass(config: &CollectorConfig, cancel: Arc<AtomicBool>) -> Result<RunSummary> {
    config.require_token()?;
    let _lock = RunLock::acquire(&config.output_dir)?;

    let client = SteamClient::new(config)?;
    let mut collector = Collector::new(
        client,
        JsonDatasetStore::new(&config.output_dir),
        JsonLedger::new(&config.output_dir),
        CollectionSettings::from(config),
    )
    .with_cancellation(cancel);

    collector.run()
}

/// Drives a collection pass over an upstream, a dataset store and a ledger
pub struct Collector<U, D, L> {
    upstream: U,
    datasets: D,
    ledger: L,
    settings: CollectionSettings,
    cancel: Arc<AtomicBool>,
}

impl<U: Upstream, D: DatasetStore, L: Ledger> Collector<U, D, L> {
    pub fn new(upstream: U, datasets: D, ledger: L, settings: CollectionSettings) -> Self {
        Self {
            upstream,
            datasets,
            ledger,
            settings,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Check `cancel` between categories, apps and review pages
    pub fn with_cancellation(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Give back the collaborators
    pub fn into_parts(self) -> (U, D, L) {
        (self.upstream, self.datasets, self.ledger)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Run every category once, in order
    pub fn run(&mut self) -> Result<RunSummary> {
        let started_at = Utc::now();
        let mut reports = Vec::with_capacity(Category::ALL.len());

        for category in Category::ALL {
            let mut report = CategoryReport::new(category);
            if self.is_cancelled() {
                report.cancelled = true;
                reports.push(report);
                break;
            }

            let result = match category {
                Category::AppList => self.collect_app_list(&mut report),
                Category::PlayerCounts => self.collect_player_counts(&mut report),
                Category::Reviews => self.collect_reviews(&mut report),
            };

            if let Err(err) = result {
                if err.is_fatal() {
                    error!(category = %category, error = %err, "aborting collection run");
                    return Err(err);
                }
                warn!(category = %category, error = %err, "category failed");
                report.error = Some(ReportedError::from(&err));
            }

            let cancelled = report.cancelled;
            reports.push(report);
            if cancelled {
                info!(category = %category, "collection cancelled");
                break;
            }
        }

        let summary = RunSummary::new(started_at, reports);
        info!(
            outcome = ?summary.outcome,
            new_records = summary.total_new_records(),
            "collection run finished"
        );
        Ok(summary)
    }

    /// Ledger entry for a category if a fetch is due, else `None`
    fn due_entry(
        &self,
        category: Category,
        report: &mut CategoryReport,
    ) -> Result<Option<Option<FetchLedgerEntry>>> {
        let entry = self.ledger.get(category)?;
        if !self.settings.staleness.is_stale(entry.as_ref(), Utc::now()) {
            debug!(category = %category, "category is fresh");
            return Ok(None);
        }
        report.due = true;
        Ok(Some(entry))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Catalog
    // ─────────────────────────────────────────────────────────────────────────

    fn collect_app_list(&mut self, report: &mut CategoryReport) -> Result<()> {
        let Some(entry) = self.due_entry(Category::AppList, report)? else {
            return Ok(());
        };

        let mut after = entry.and_then(|e| e.last_successful_app_id);
        if let Some(after) = after {
            info!(after, "resuming catalog refresh");
        }

        loop {
            if self.is_cancelled() {
                report.cancelled = true;
                return Ok(());
            }

            report.attempted += 1;
            let page = self
                .upstream
                .list_apps(after, self.settings.app_list_page_size)?;
            report.succeeded += 1;
            report.malformed += page.malformed;

            let merged = self.datasets.merge_app_list(&page.apps)?;
            report.new_records += merged.added;

            match page.next_after {
                None => {
                    self.ledger
                        .commit(FetchLedgerEntry::completed(Category::AppList, Utc::now()))?;
                    return Ok(());
                }
                Some(next) if after.map_or(true, |previous| next > previous) => {
                    self.ledger.commit(FetchLedgerEntry::in_progress(
                        Category::AppList,
                        Utc::now(),
                        Some(next),
                        None,
                    ))?;
                    after = Some(next);
                }
                Some(next) => {
                    return Err(HarvestError::Malformed(format!(
                        "catalog paging did not advance past app {next}"
                    )));
                }
            }
        }
    }

    /// Apps to fetch per-app data for, in ascending order
    fn target_apps(&mut self, report: &mut CategoryReport) -> Result<Vec<AppId>> {
        let catalog: BTreeSet<AppId> = self
            .datasets
            .load_app_list()?
            .into_iter()
            .map(|app| app.app_id)
            .collect();

        if self.settings.tracked_apps.is_empty() {
            return Ok(catalog.into_iter().collect());
        }

        let tracked: BTreeSet<AppId> = self.settings.tracked_apps.iter().copied().collect();
        let mut apps = Vec::with_capacity(tracked.len());
        for app_id in tracked {
            if catalog.contains(&app_id) {
                apps.push(app_id);
            } else {
                warn!(app_id, "tracked app is not in the catalog; skipping");
                report.skipped += 1;
            }
        }
        Ok(apps)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Player Counts
    // ─────────────────────────────────────────────────────────────────────────

    fn collect_player_counts(&mut self, report: &mut CategoryReport) -> Result<()> {
        if self.due_entry(Category::PlayerCounts, report)?.is_none() {
            return Ok(());
        }

        let apps = self.target_apps(report)?;
        if apps.is_empty() {
            warn!("no catalog apps to sample; skipping player counts");
            return Ok(());
        }

        let mut samples = Vec::with_capacity(apps.len());
        for app_id in apps {
            if self.is_cancelled() {
                report.cancelled = true;
                return Ok(());
            }

            report.attempted += 1;
            match self.upstream.player_count(app_id) {
                Ok(sample) => {
                    samples.push(sample);
                    report.succeeded += 1;
                }
                Err(err) if is_per_app(&err) => skip_app(report, app_id, &err),
                Err(err) => return Err(err),
            }
        }

        report.new_records += self.datasets.append_player_counts(&samples)?;
        self.ledger
            .commit(FetchLedgerEntry::completed(Category::PlayerCounts, Utc::now()))?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reviews
    // ─────────────────────────────────────────────────────────────────────────

    fn collect_reviews(&mut self, report: &mut CategoryReport) -> Result<()> {
        let Some(entry) = self.due_entry(Category::Reviews, report)? else {
            return Ok(());
        };

        let apps = self.target_apps(report)?;
        if apps.is_empty() {
            warn!("no catalog apps to fetch reviews for; skipping reviews");
            return Ok(());
        }

        let mut done_through = entry.as_ref().and_then(|e| e.last_successful_app_id);
        let mut resume = entry.and_then(|e| e.cursor);
        if done_through.is_some() || resume.is_some() {
            info!(?done_through, "resuming review pass");
        }

        for app_id in apps {
            if done_through.is_some_and(|done| app_id <= done) {
                continue;
            }
            if self.is_cancelled() {
                report.cancelled = true;
                return Ok(());
            }

            let start = match resume.take() {
                Some(saved) if saved.app_id == app_id => saved.cursor,
                Some(saved) if saved.app_id > app_id => {
                    resume = Some(saved);
                    INITIAL_REVIEW_CURSOR.to_string()
                }
                _ => INITIAL_REVIEW_CURSOR.to_string(),
            };

            report.attempted += 1;
            match self.collect_app_reviews(app_id, start, done_through, report) {
                Ok(true) => report.succeeded += 1,
                Ok(false) => {
                    report.cancelled = true;
                    return Ok(());
                }
                Err(err) if is_per_app(&err) => skip_app(report, app_id, &err),
                Err(err) => return Err(err),
            }

            self.ledger.commit(FetchLedgerEntry::in_progress(
                Category::Reviews,
                Utc::now(),
                Some(app_id),
                None,
            ))?;
            done_through = Some(app_id);
        }

        self.ledger
            .commit(FetchLedgerEntry::completed(Category::Reviews, Utc::now()))?;
        Ok(())
    }

    /// Page through one app's reviews; `Ok(false)` when cancelled mid-listing
    fn collect_app_reviews(
        &mut self,
        app_id: AppId,
        mut cursor: String,
        done_through: Option<AppId>,
        report: &mut CategoryReport,
    ) -> Result<bool> {
        // A stored cursor may point at a page merged just before a crash, so
        // only a listing from the newest review stops at already-seen pages
        let stop_on_seen = cursor == INITIAL_REVIEW_CURSOR;
        let mut collected = 0;
        loop {
            let page = self
                .upstream
                .reviews(app_id, &cursor, self.settings.reviews_per_page)?;
            report.malformed += page.malformed;

            let fetched = page.reviews.len();
            let merged = self.datasets.merge_reviews(app_id, page.reviews)?;
            collected += merged.added;
            report.new_records += merged.added;
            report.duplicates += merged.duplicates;

            let only_seen = stop_on_seen && fetched > 0 && merged.added == 0;
            let next = match page.next_cursor {
                Some(next) if !only_seen && collected < self.settings.max_reviews_per_app => next,
                _ => {
                    debug!(app_id, collected, only_seen, "review listing finished");
                    return Ok(true);
                }
            };

            self.ledger.commit(FetchLedgerEntry::in_progress(
                Category::Reviews,
                Utc::now(),
                done_through,
                Some(ReviewCursor {
                    app_id,
                    cursor: next.clone(),
                }),
            ))?;

            if self.is_cancelled() {
                return Ok(false);
            }
            cursor = next;
        }
    }
}

/// Errors that only affect the app being fetched
fn is_per_app(err: &HarvestError) -> bool {
    matches!(err.kind(), ErrorKind::NotFound | ErrorKind::Malformed)
}

fn skip_app(report: &mut CategoryReport, app_id: AppId, err: &HarvestError) {
    report.skipped += 1;
    if err.kind() == ErrorKind::Malformed {
        report.malformed += 1;
        warn!(app_id, error = %err, "skipping app with malformed data");
    } else {
        debug!(app_id, error = %err, "skipping app");
    }
}
