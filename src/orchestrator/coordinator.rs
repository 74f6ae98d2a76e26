//! Launch validation and process start-up.
//!
//! Owns the hand-off from a launch request to a [`SessionTracker`] and publishes
//! [`SessionEvent`]s for presentation layers.

use super::completion::run_completion_pump;
use crate::catalog::Catalog;
use crate::clock::Clock;
use crate::error::LaunchError;
use crate::ledger::PlaytimeLedger;
use crate::model::{ActiveSession, SessionEvent, SessionId, SessionReport, SessionState};
use crate::session::SessionTracker;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

pub(crate) struct LaunchCoordinator {
    catalog: Arc<Catalog>,
    clock: Arc<dyn Clock>,
    report_tx: UnboundedSender<SessionReport>,
    event_tx: UnboundedSender<SessionEvent>,
    trackers: Mutex<Vec<SessionTracker>>,
    next_id: AtomicU64,
}

impl LaunchCoordinator {
    /// Build a coordinator and spawn its completion pump on the current tokio runtime.
    ///
    /// Events for every completed or failed launch arrive on the returned receiver.
    pub(crate) fn start(
        catalog: Arc<Catalog>,
        ledger: Arc<PlaytimeLedger>,
        clock: Arc<dyn Clock>,
    ) -> (Self, UnboundedReceiver<SessionEvent>) {
        let (report_tx, report_rx) = mpsc::unbounded_channel::<SessionReport>();
        let (event_tx, event_rx) = mpsc::unbounded_channel::<SessionEvent>();
        tokio::spawn(run_completion_pump(ledger, report_rx, event_tx.clone()));
        let coordinator = Self {
            catalog,
            clock,
            report_tx,
            event_tx,
            trackers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        };
        (coordinator, event_rx)
    }

    /// Start `title`'s executable and begin tracking it. Returns once the process exists.
    ///
    /// Several sessions of the same title may run at once; each is recorded on its own.
    pub(crate) fn launch(&self, title: &str) -> Result<SessionId, LaunchError> {
        let entry = self
            .catalog
            .get(title)
            .ok_or_else(|| LaunchError::NotFound(title.to_string()))?;

        let path = Path::new(&entry.executable_path);
        if !path.is_file() {
            return Err(LaunchError::ExecutableMissing {
                title: entry.name,
                path: entry.executable_path,
            });
        }

        let id = SessionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let started = self.clock.now_secs();
        // argv is the literal path: no shell, no arguments.
        let child = Command::new(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| self.launch_failed(&entry.name, source))?;
        let pid = child.id();

        let tracker = SessionTracker::start(
            id,
            entry.name.clone(),
            child,
            started,
            self.clock.clone(),
            self.report_tx.clone(),
        )
        .map_err(|source| self.launch_failed(&entry.name, source))?;

        tracing::info!(session = %id, title = %entry.name, pid, "launched");
        let mut trackers = self.trackers.lock().unwrap_or_else(|e| e.into_inner());
        trackers.retain(|t| !t.is_finished());
        trackers.push(tracker);
        Ok(id)
    }

    fn launch_failed(&self, title: &str, source: std::io::Error) -> LaunchError {
        tracing::warn!(title, state = ?SessionState::SpawnFailed, error = %source, "launch failed");
        let _ = self.event_tx.send(SessionEvent::LaunchFailed {
            title: title.to_string(),
            reason: source.to_string(),
        });
        LaunchError::LaunchFailed {
            title: title.to_string(),
            source,
        }
    }

    /// Launches whose processes have not yet been seen to exit.
    pub(crate) fn active_sessions(&self) -> Vec<ActiveSession> {
        let trackers = self.trackers.lock().unwrap_or_else(|e| e.into_inner());
        trackers
            .iter()
            .filter(|t| !t.state().is_terminal())
            .map(|t| ActiveSession {
                id: t.id(),
                title: t.title().to_string(),
            })
            .collect()
    }
}
