use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::atomic::{read_json, write_json_atomic};
use super::{Ledger, LEDGER_FILE};
use crate::error::{HarvestError, Result};
use crate::model::{Category, FetchLedgerEntry};

/// On-disk ledger layout: category name to entry
pub type LedgerMap = BTreeMap<Category, FetchLedgerEntry>;

/// Ledger kept in `last_timestamps.json`
#[derive(Debug, Clone)]
pub struct JsonLedger {
    path: PathBuf,
}

impl JsonLedger {
    /// Ledger inside an output directory
    pub fn new(output_dir: &Path) -> Self {
        Self {
            path: output_dir.join(LEDGER_FILE),
        }
    }

    /// Path of the ledger file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every stored entry
    pub fn load_all(&self) -> Result<LedgerMap> {
        let map: LedgerMap = read_json(&self.path, |detail| self.corrupt(detail))?.unwrap_or_default();

        if let Some((key, entry)) = map.iter().find(|(key, entry)| **key != entry.category) {
            return Err(self.corrupt(format!(
                "entry stored under '{key}' claims category '{}'",
                entry.category
            )));
        }
        Ok(map)
    }

    fn corrupt(&self, detail: String) -> HarvestError {
        HarvestError::LedgerCorrupt {
            path: self.path.clone(),
            detail,
        }
    }
}

impl Ledger for JsonLedger {
    fn get(&self, category: Category) -> Result<Option<FetchLedgerEntry>> {
        Ok(self.load_all()?.remove(&category))
    }

    fn commit(&mut self, mut entry: FetchLedgerEntry) -> Result<FetchLedgerEntry> {
        let mut map = self.load_all()?;
        if let Some(previous) = map.get(&entry.category) {
            entry.last_fetched_at = entry.last_fetched_at.max(previous.last_fetched_at);
        }
        map.insert(entry.category, entry.clone());
        write_json_atomic(&self.path, &map)?;

        debug!(
            category = %entry.category,
            last_fetched_at = %entry.last_fetched_at,
            in_progress = entry.is_in_progress(),
            "ledger committed"
        );
        Ok(entry)
    }

    fn reset(&mut self, category: Category) -> Result<bool> {
        let mut map = self.load_all()?;
        if map.remove(&category).is_none() {
            return Ok(false);
        }
        write_json_atomic(&self.path, &map)?;
        Ok(true)
    }
}
