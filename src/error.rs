//! Error types shared across the launcher core.

use std::path::PathBuf;

/// Failures while writing a persisted resource.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Reasons a launch request is refused.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    /// The title is not in the catalog.
    #[error("game '{0}' not found")]
    NotFound(String),

    /// The catalog entry points at something that is not a regular file.
    #[error("executable for '{title}' not found: {path}")]
    ExecutableMissing { title: String, path: String },

    /// The OS refused to create the process.
    #[error("failed to launch '{title}': {source}")]
    LaunchFailed {
        title: String,
        #[source]
        source: std::io::Error,
    },
}

/// Catalog editing failures.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("game name and executable are required")]
    EmptyField,

    #[error("executable not found: {0}")]
    ExecutableMissing(String),

    #[error("icon file not found: {0}")]
    IconMissing(String),

    #[error("a game named '{0}' already exists")]
    DuplicateTitle(String),

    #[error("game '{0}' not found")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
