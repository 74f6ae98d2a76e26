//! Post-session processing.
//!
//! Receives tracker reports on the coordinating side, merges them into the ledger and
//! republishes them as [`SessionEvent`]s.

use crate::ledger::PlaytimeLedger;
use crate::model::{SessionEvent, SessionReport};
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Record a finished session and build the event presentation layers consume.
pub(crate) fn process_completion(ledger: &PlaytimeLedger, report: SessionReport) -> SessionEvent {
    let duration = i64::try_from(report.duration_seconds).unwrap_or(i64::MAX);
    let new_total = ledger.record(&report.title, duration);
    SessionEvent::Completed {
        id: report.id,
        title: report.title,
        duration_seconds: report.duration_seconds,
        new_total,
    }
}

/// Drain reports until every sender is gone.
pub(crate) async fn run_completion_pump(
    ledger: Arc<PlaytimeLedger>,
    mut report_rx: UnboundedReceiver<SessionReport>,
    event_tx: UnboundedSender<SessionEvent>,
) {
    while let Some(report) = report_rx.recv().await {
        let session = report.id;
        let ledger = ledger.clone();
        // Recording saves to disk; keep that off the async workers.
        let event =
            match tokio::task::spawn_blocking(move || process_completion(&ledger, report)).await {
                Ok(ev) => ev,
                Err(e) => {
                    tracing::error!(%session, error = %e, "recording session failed");
                    continue;
                }
            };
        let _ = event_tx.send(event);
    }
    tracing::debug!("completion pump finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SessionId;
    use crate::storage::PersistentStore;
    use tokio::sync::mpsc;

    fn report(id: u64, title: &str, duration_seconds: u64) -> SessionReport {
        SessionReport {
            id: SessionId(id),
            title: title.into(),
            duration_seconds,
        }
    }

    #[test]
    fn process_completion_carries_new_total() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = PlaytimeLedger::load(Arc::new(PersistentStore::new(dir.path())));
        ledger.record("Doom", 100);
        assert_eq!(
            process_completion(&ledger, report(4, "Doom", 25)),
            SessionEvent::Completed {
                id: SessionId(4),
                title: "Doom".into(),
                duration_seconds: 25,
                new_total: 125,
            }
        );
    }

    #[tokio::test]
    async fn pump_sums_concurrent_reports_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Arc::new(PlaytimeLedger::load(Arc::new(PersistentStore::new(
            dir.path(),
        ))));
        let (report_tx, report_rx) = mpsc::unbounded_channel();
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let pump = tokio::spawn(run_completion_pump(ledger.clone(), report_rx, event_tx));

        let senders: Vec<_> = [(1, 5), (2, 10), (3, 3)]
            .into_iter()
            .map(|(id, d)| {
                let tx = report_tx.clone();
                std::thread::spawn(move || tx.send(report(id, "Doom", d)).unwrap())
            })
            .collect();
        drop(report_tx);
        for s in senders {
            s.join().unwrap();
        }
        pump.await.unwrap();

        let mut ids = Vec::new();
        while let Some(ev) = event_rx.recv().await {
            if let SessionEvent::Completed { id, .. } = ev {
                ids.push(id.0);
            }
        }
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(ledger.total("Doom"), 18);
    }
}
