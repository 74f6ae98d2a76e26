//! Text builders for CLI output.

use crate::model::{CatalogEntry, LedgerData, SessionEvent};

/// `H:MM:SS`, hours unpadded.
pub(crate) fn format_seconds(seconds: u64) -> String {
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    let s = seconds % 60;
    format!("{h}:{m:02}:{s:02}")
}

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

/// One line per catalog entry with its total playtime.
pub(crate) fn build_catalog_listing(entries: &[CatalogEntry], ledger: &LedgerData) -> TextSummary {
    if entries.is_empty() {
        return TextSummary {
            lines: vec!["No games yet. Use `add` to register one.".to_string()],
        };
    }
    let width = entries.iter().map(|e| e.name.chars().count()).max().unwrap_or(0);
    let lines = entries
        .iter()
        .map(|e| {
            let total = ledger.get(&e.name).copied().unwrap_or(0);
            format!(
                "{:<width$}  {:>10}  {}",
                e.name,
                format_seconds(total),
                e.executable_path
            )
        })
        .collect();
    TextSummary { lines }
}

/// Per-title playtime plus a total over catalog titles. Ledger titles no longer in the
/// catalog are listed after the catalog and excluded from the total.
pub(crate) fn build_stats(entries: &[CatalogEntry], ledger: &LedgerData) -> TextSummary {
    let mut lines = vec!["Playtime Statistics".to_string()];
    let mut total = 0u64;
    for e in entries {
        let pt = ledger.get(&e.name).copied().unwrap_or(0);
        total = total.saturating_add(pt);
        lines.push(format!("{}: {}", e.name, format_seconds(pt)));
    }
    for (title, pt) in ledger {
        if !entries.iter().any(|e| &e.name == title) {
            lines.push(format!("{title} (removed): {}", format_seconds(*pt)));
        }
    }
    lines.push(format!("Total Playtime: {}", format_seconds(total)));
    TextSummary { lines }
}

/// Human-readable line for a session event.
pub(crate) fn describe_event(event: &SessionEvent) -> String {
    match event {
        SessionEvent::Completed {
            title,
            duration_seconds,
            new_total,
            ..
        } => format!(
            "{title} play session ended. Session: {} Total: {}",
            format_seconds(*duration_seconds),
            format_seconds(*new_total)
        ),
        SessionEvent::LaunchFailed { title, reason } => {
            format!("{title} failed to launch: {reason}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SessionId;

    #[test]
    fn formats_hours_minutes_seconds() {
        assert_eq!(format_seconds(0), "0:00:00");
        assert_eq!(format_seconds(59), "0:00:59");
        assert_eq!(format_seconds(3725), "1:02:05");
        assert_eq!(format_seconds(360_000), "100:00:00");
    }

    #[test]
    fn stats_total_only_counts_catalog_titles() {
        let entries = vec![
            CatalogEntry::new("Doom", "/d", None),
            CatalogEntry::new("Quake", "/q", None),
        ];
        let ledger = LedgerData::from([("Doom".into(), 60), ("Old".into(), 3600)]);
        let summary = build_stats(&entries, &ledger);
        assert_eq!(
            summary.lines,
            vec![
                "Playtime Statistics",
                "Doom: 0:01:00",
                "Quake: 0:00:00",
                "Old (removed): 1:00:00",
                "Total Playtime: 0:01:00",
            ]
        );
    }

    #[test]
    fn listing_aligns_names() {
        let entries = vec![
            CatalogEntry::new("A", "/a", None),
            CatalogEntry::new("Longer", "/l", None),
        ];
        let ledger = LedgerData::from([("A".into(), 5)]);
        let lines = build_catalog_listing(&entries, &ledger).lines;
        assert_eq!(lines[0], "A          0:00:05  /a");
        assert_eq!(lines[1], "Longer     0:00:00  /l");
        assert_eq!(build_catalog_listing(&[], &ledger).lines.len(), 1);
    }

    #[test]
    fn describes_completion() {
        let ev = SessionEvent::Completed {
            id: SessionId(1),
            title: "Doom".into(),
            duration_seconds: 65,
            new_total: 3725,
        };
        assert_eq!(
            describe_event(&ev),
            "Doom play session ended. Session: 0:01:05 Total: 1:02:05"
        );
    }
}
