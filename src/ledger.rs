//! Cumulative playtime per title.
//!
//! All updates go through one mutex, and the ledger is saved while that mutex is still
//! held, so the file on disk always reflects updates in the order they were applied.

use crate::model::LedgerData;
use crate::storage::{PersistentStore, StoreKind};
use std::sync::{Arc, Mutex, MutexGuard};

pub struct PlaytimeLedger {
    totals: Mutex<LedgerData>,
    store: Arc<PersistentStore>,
}

impl PlaytimeLedger {
    pub fn load(store: Arc<PersistentStore>) -> Self {
        let totals: LedgerData = store.load(StoreKind::Ledger, LedgerData::new());
        tracing::debug!(titles = totals.len(), "ledger loaded");
        Self {
            totals: Mutex::new(totals),
            store,
        }
    }

    fn lock(&self) -> MutexGuard<'_, LedgerData> {
        self.totals.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a completed session to `title`'s total and persist. Returns the new total.
    ///
    /// Negative durations are clamped to 0. A failed save is logged; the in-memory total
    /// still advances and is written by the next successful save.
    pub fn record(&self, title: &str, duration_seconds: i64) -> u64 {
        let added = u64::try_from(duration_seconds).unwrap_or(0);
        let mut totals = self.lock();
        let total = totals.entry(title.to_string()).or_insert(0);
        *total = total.saturating_add(added);
        let new_total = *total;

        if let Err(e) = self.store.save(StoreKind::Ledger, &*totals) {
            tracing::error!(title, error = %e, "failed to save playtime ledger");
        }
        tracing::info!(title, added, new_total, "playtime recorded");
        new_total
    }

    pub fn total(&self, title: &str) -> u64 {
        self.lock().get(title).copied().unwrap_or(0)
    }

    pub fn snapshot(&self) -> LedgerData {
        self.lock().clone()
    }
}
