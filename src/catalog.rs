//! In-memory catalog of launchable entries, persisted through [`PersistentStore`].

use crate::error::CatalogError;
use crate::model::{CatalogData, CatalogEntry};
use crate::storage::{PersistentStore, StoreKind};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

pub struct Catalog {
    entries: Mutex<CatalogData>,
    store: Arc<PersistentStore>,
}

impl Catalog {
    pub fn load(store: Arc<PersistentStore>) -> Self {
        let entries: CatalogData = store.load(StoreKind::Catalog, Vec::new());
        tracing::debug!(entries = entries.len(), "catalog loaded");
        Self {
            entries: Mutex::new(entries),
            store,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CatalogData> {
        // Poisoning only means another thread panicked mid-update; the Vec itself is intact.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Validate and append a new entry, then persist the catalog.
    pub fn add(&self, entry: CatalogEntry) -> Result<(), CatalogError> {
        let entry = CatalogEntry::new(
            entry.name.trim(),
            entry.executable_path.trim(),
            entry.icon_path.map(|p| p.trim().to_string()),
        );
        if entry.name.is_empty() || entry.executable_path.is_empty() {
            return Err(CatalogError::EmptyField);
        }
        if !Path::new(&entry.executable_path).is_file() {
            return Err(CatalogError::ExecutableMissing(entry.executable_path));
        }
        if let Some(icon) = entry.icon_path.as_deref() {
            if !Path::new(icon).is_file() {
                return Err(CatalogError::IconMissing(icon.to_string()));
            }
        }

        let mut entries = self.lock();
        if entries.iter().any(|e| e.name == entry.name) {
            return Err(CatalogError::DuplicateTitle(entry.name));
        }
        tracing::info!(title = %entry.name, path = %entry.executable_path, "catalog entry added");
        entries.push(entry);
        if let Err(e) = self.store.save(StoreKind::Catalog, &*entries) {
            entries.pop();
            return Err(e.into());
        }
        Ok(())
    }

    /// Remove an entry by name. Its playtime history is left in the ledger.
    pub fn remove(&self, name: &str) -> Result<CatalogEntry, CatalogError> {
        let mut entries = self.lock();
        let idx = entries
            .iter()
            .position(|e| e.name == name)
            .ok_or_else(|| CatalogError::NotFound(name.to_string()))?;
        let removed = entries.remove(idx);
        if let Err(e) = self.store.save(StoreKind::Catalog, &*entries) {
            entries.insert(idx, removed);
            return Err(e.into());
        }
        tracing::info!(title = %removed.name, "catalog entry removed");
        Ok(removed)
    }

    /// Exact, case-sensitive lookup.
    pub fn get(&self, name: &str) -> Option<CatalogEntry> {
        self.lock().iter().find(|e| e.name == name).cloned()
    }

    pub fn entries(&self) -> CatalogData {
        self.lock().clone()
    }
}
