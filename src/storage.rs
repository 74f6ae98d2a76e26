//! Durable storage for the catalog and the playtime ledger.
//!
//! Both resources are pretty-printed JSON documents in a single data directory. Reads
//! never fail: a missing file yields the caller's default, and an unreadable or
//! unparsable one is logged as corrupt and also yields the default. Writes go to a
//! sibling temp file that is renamed over the target.
//!
//! There is no locking against other processes editing the same files.

use crate::error::StoreError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// The two persisted resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Catalog,
    Ledger,
}

impl StoreKind {
    pub fn file_name(self) -> &'static str {
        match self {
            StoreKind::Catalog => "games.json",
            StoreKind::Ledger => "playtime.json",
        }
    }

    fn label(self) -> &'static str {
        match self {
            StoreKind::Catalog => "catalog",
            StoreKind::Ledger => "ledger",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PersistentStore {
    dir: PathBuf,
}

impl PersistentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Platform data directory, or the working directory when there is none.
    pub fn default_dir() -> PathBuf {
        dirs::data_dir()
            .map(|d| d.join("playtime-launcher"))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn path(&self, kind: StoreKind) -> PathBuf {
        self.dir.join(kind.file_name())
    }

    pub fn load<T: DeserializeOwned>(&self, kind: StoreKind, default: T) -> T {
        let path = self.path(kind);
        let bytes = match std::fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return default,
            Err(e) => {
                tracing::warn!(
                    store = kind.label(),
                    path = %path.display(),
                    error = %e,
                    "store corrupt: unreadable, using empty default"
                );
                return default;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(
                    store = kind.label(),
                    path = %path.display(),
                    error = %e,
                    "store corrupt: unparsable, using empty default"
                );
                default
            }
        }
    }

    pub fn save<T: Serialize>(&self, kind: StoreKind, data: &T) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(data).map_err(|source| StoreError::Serialize {
            what: kind.label(),
            source,
        })?;
        write_file_atomic(&self.path(kind), &json)?;
        tracing::debug!(store = kind.label(), bytes = json.len(), "saved");
        Ok(())
    }
}

fn write_file_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| StoreError::Io { path, source }
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err(parent))?;
    }

    let file_name = path.file_name().and_then(|v| v.to_str()).unwrap_or("store");
    let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
    let tmp_path = path.with_file_name(format!(".{file_name}.{}.{seq}.tmp", std::process::id()));

    if let Err(e) = std::fs::write(&tmp_path, bytes) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(io_err(&tmp_path)(e));
    }

    // Windows rename requires target not to exist.
    #[cfg(windows)]
    if path.exists() {
        let _ = std::fs::remove_file(path);
    }

    std::fs::rename(&tmp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        io_err(path)(e)
    })
}
