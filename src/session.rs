//! Per-launch exit tracking.
//!
//! Every tracked process gets its own named OS thread that blocks in `wait()`. The thread
//! owns the child handle and the report sender for that session, and sends exactly one
//! [`SessionReport`] when the process terminates for any reason.

use crate::clock::{elapsed_whole_seconds, Clock};
use crate::model::{SessionId, SessionReport, SessionState};
use std::process::Child;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use tokio::sync::mpsc::UnboundedSender;

/// Observer bound to one spawned process.
pub struct SessionTracker {
    id: SessionId,
    title: String,
    state: Arc<Mutex<SessionState>>,
    waiter: JoinHandle<()>,
}

/// Body run on a session's waiter thread.
type WaiterBody = Box<dyn FnOnce() + Send + 'static>;

impl SessionTracker {
    /// Take ownership of `child` and start waiting for it on a dedicated thread.
    ///
    /// `started_secs` is the `clock` reading taken right before the process was spawned.
    /// If the waiter thread cannot be created the child is killed, so no process is ever
    /// left running untracked.
    pub fn start(
        id: SessionId,
        title: String,
        child: Child,
        started_secs: f64,
        clock: Arc<dyn Clock>,
        report_tx: UnboundedSender<SessionReport>,
    ) -> std::io::Result<Self> {
        Self::start_with(
            id,
            title,
            child,
            started_secs,
            clock,
            report_tx,
            |name, body| std::thread::Builder::new().name(name).spawn(body),
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn start_with<S>(
        id: SessionId,
        title: String,
        child: Child,
        started_secs: f64,
        clock: Arc<dyn Clock>,
        report_tx: UnboundedSender<SessionReport>,
        spawn_waiter: S,
    ) -> std::io::Result<Self>
    where
        S: FnOnce(String, WaiterBody) -> std::io::Result<JoinHandle<()>>,
    {
        let state = Arc::new(Mutex::new(SessionState::Spawned));
        let thread_state = state.clone();
        let thread_title = title.clone();

        // The child is handed over only once the thread exists, so a failed spawn
        // leaves it with us to clean up.
        let (child_tx, child_rx) = std::sync::mpsc::sync_channel::<Child>(1);
        let body: WaiterBody = Box::new(move || {
            let Ok(child) = child_rx.recv() else { return };
            wait_and_report(
                id,
                thread_title,
                child,
                started_secs,
                clock,
                thread_state,
                report_tx,
            )
        });

        let waiter = match spawn_waiter(format!("session-{}", id.0), body) {
            Ok(handle) => handle,
            Err(e) => {
                kill_untracked(id, child);
                return Err(e);
            }
        };
        if let Err(std::sync::mpsc::SendError(child)) = child_tx.send(child) {
            kill_untracked(id, child);
            return Err(std::io::Error::other("session waiter exited before hand-off"));
        }

        Ok(Self {
            id,
            title,
            state,
            waiter,
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_finished(&self) -> bool {
        self.waiter.is_finished()
    }
}

fn kill_untracked(id: SessionId, mut child: Child) {
    tracing::warn!(session = %id, pid = child.id(), "no waiter thread, killing process");
    let _ = child.kill();
    let _ = child.wait();
}

fn set_state(state: &Mutex<SessionState>, next: SessionState) {
    *state.lock().unwrap_or_else(|e| e.into_inner()) = next;
}

fn wait_and_report(
    id: SessionId,
    title: String,
    mut child: Child,
    started_secs: f64,
    clock: Arc<dyn Clock>,
    state: Arc<Mutex<SessionState>>,
    report_tx: UnboundedSender<SessionReport>,
) {
    set_state(&state, SessionState::Running);
    let pid = child.id();

    // Exit status is not distinguished; a failed wait still ends the session.
    match child.wait() {
        Ok(status) => tracing::debug!(session = %id, pid, %status, "process exited"),
        Err(e) => tracing::warn!(session = %id, pid, error = %e, "wait failed, treating as exited"),
    }

    let duration_seconds = elapsed_whole_seconds(started_secs, clock.now_secs());
    set_state(&state, SessionState::Completed { duration_seconds });

    let report = SessionReport {
        id,
        title,
        duration_seconds,
    };
    if report_tx.send(report).is_err() {
        tracing::warn!(session = %id, duration_seconds, "completion receiver gone, session not recorded");
    }
}

#[cfg(all(test, unix))]
pub(crate) mod tests {
    use super::*;
    use crate::clock::tests::ScriptedClock;
    use crate::clock::SystemClock;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use std::process::{Command, Stdio};
    use tokio::sync::mpsc;

    /// Write an executable shell script into `dir`.
    pub(crate) fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    fn spawn(path: &Path) -> Child {
        Command::new(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .unwrap()
    }

    #[tokio::test]
    async fn reports_once_with_truncated_duration() {
        let dir = tempfile::tempdir().unwrap();
        let exe = script(dir.path(), "quick.sh", "exit 3");
        let clock: Arc<dyn Clock> = Arc::new(ScriptedClock::new(&[100.0, 112.9]));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let started = clock.now_secs();
        let tracker =
            SessionTracker::start(SessionId(1), "Quick".into(), spawn(&exe), started, clock, tx)
                .unwrap();
        assert_eq!(tracker.title(), "Quick");

        let report = rx.recv().await.unwrap();
        assert_eq!(
            report,
            SessionReport {
                id: SessionId(1),
                title: "Quick".into(),
                duration_seconds: 12,
            }
        );
        // Sender dropped with the thread; nothing else arrives.
        assert!(rx.recv().await.is_none());
        assert_eq!(
            tracker.state(),
            SessionState::Completed {
                duration_seconds: 12
            }
        );
    }

    #[tokio::test]
    async fn backwards_clock_reports_zero() {
        let dir = tempfile::tempdir().unwrap();
        let exe = script(dir.path(), "quick.sh", "exit 0");
        let clock: Arc<dyn Clock> = Arc::new(ScriptedClock::new(&[500.0, 20.0]));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let started = clock.now_secs();
        SessionTracker::start(SessionId(2), "Back".into(), spawn(&exe), started, clock, tx).unwrap();
        assert_eq!(rx.recv().await.unwrap().duration_seconds, 0);
    }

    #[tokio::test]
    async fn killed_process_still_reports() {
        let dir = tempfile::tempdir().unwrap();
        let exe = script(dir.path(), "long.sh", "exec sleep 30");
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
        let (tx, mut rx) = mpsc::unbounded_channel();

        let child = spawn(&exe);
        let pid = child.id();
        let started = clock.now_secs();
        let tracker =
            SessionTracker::start(SessionId(3), "Long".into(), child, started, clock, tx).unwrap();
        assert!(!tracker.state().is_terminal());

        Command::new("kill")
            .arg("-9")
            .arg(pid.to_string())
            .status()
            .unwrap();
        let report = rx.recv().await.unwrap();
        assert_eq!(report.id, SessionId(3));
        assert!(report.duration_seconds < 30);
    }

    #[tokio::test]
    async fn failed_waiter_spawn_kills_the_process() {
        let dir = tempfile::tempdir().unwrap();
        let exe = script(dir.path(), "long.sh", "exec sleep 30");
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
        let (tx, mut rx) = mpsc::unbounded_channel();

        let child = spawn(&exe);
        let pid = child.id();
        let started = clock.now_secs();
        let err = SessionTracker::start_with(
            SessionId(4),
            "NoThread".into(),
            child,
            started,
            clock,
            tx,
            |_, _| Err(std::io::Error::other("thread limit reached")),
        )
        .err()
        .unwrap();
        assert_eq!(err.to_string(), "thread limit reached");

        // No report is ever sent and the process has been reaped.
        assert!(rx.recv().await.is_none());
        let alive = Command::new("kill")
            .arg("-0")
            .arg(pid.to_string())
            .stderr(Stdio::null())
            .status()
            .unwrap()
            .success();
        assert!(!alive);
    }
}
