use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// One launchable entry in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    #[serde(rename = "exec_path", alias = "executable_path")]
    pub executable_path: String,
    /// Stored as an empty string on disk when absent.
    #[serde(
        default,
        serialize_with = "serialize_icon_path",
        deserialize_with = "deserialize_icon_path"
    )]
    pub icon_path: Option<String>,
}

impl CatalogEntry {
    pub fn new(
        name: impl Into<String>,
        executable_path: impl Into<String>,
        icon_path: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            executable_path: executable_path.into(),
            icon_path: icon_path.filter(|p| !p.trim().is_empty()),
        }
    }
}

fn serialize_icon_path<S: Serializer>(value: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(value.as_deref().unwrap_or(""))
}

fn deserialize_icon_path<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let raw: Option<String> = Option::deserialize(d)?;
    Ok(raw.filter(|p| !p.trim().is_empty()))
}

/// Ordered catalog as persisted in `games.json`.
pub type CatalogData = Vec<CatalogEntry>;

/// Title to cumulative seconds, as persisted in `playtime.json`.
pub type LedgerData = BTreeMap<String, u64>;

/// Process-unique identifier for one tracked launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of a single launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Spawned,
    Running,
    Completed { duration_seconds: u64 },
    SpawnFailed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Completed { .. } | SessionState::SpawnFailed
        )
    }
}

/// Sent by a tracker's waiter thread once the process has exited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub id: SessionId,
    pub title: String,
    pub duration_seconds: u64,
}

/// A launch that is currently being waited on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSession {
    pub id: SessionId,
    pub title: String,
}

/// Events published to presentation layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SessionEvent {
    Completed {
        id: SessionId,
        title: String,
        duration_seconds: u64,
        new_total: u64,
    },
    LaunchFailed {
        title: String,
        reason: String,
    },
}
