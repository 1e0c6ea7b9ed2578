//! Terminal reporting for sessions.

use shelfsync_core::reconcile::SessionPhase;
use shelfsync_core::{BatchProgress, MatchStatus, SessionListener, SessionOutcome, WorkItem};
use tracing::{debug, info, warn};

/// Logs session events through tracing.
#[derive(Debug, Default)]
pub struct ConsoleListener;

fn phase_name(phase: SessionPhase) -> &'static str {
    match phase {
        SessionPhase::Matching => "Matching",
        SessionPhase::Tracking => "Tracking",
    }
}

impl SessionListener for ConsoleListener {
    fn on_progress(&self, phase: SessionPhase, progress: BatchProgress) {
        if progress.done > 0 {
            info!(
                "{} {}/{} ({:.0}%)",
                phase_name(phase),
                progress.done,
                progress.total,
                progress.percent()
            );
        }
    }

    fn on_item_status_changed(&self, item: &WorkItem) {
        match item.status {
            MatchStatus::Error => warn!(
                "{}: {} ({})",
                item.title,
                item.label,
                item.error.as_deref().unwrap_or("unknown error")
            ),
            _ => debug!("{}: {}", item.title, item.label),
        }
    }

    fn on_session_complete(&self, outcome: &SessionOutcome) {
        info!(
            "Session complete: {} tracked, {} failed, library {}",
            outcome.tracked,
            outcome.failed,
            if outcome.persisted { "saved" } else { "not saved" }
        );
    }
}

/// Print the work list as a table.
pub fn print_items(items: &[WorkItem]) {
    println!("{:<4} {:<3} {:<13} {:<48} MATCH", "#", "SEL", "STATUS", "TITLE");
    for item in items {
        let candidate = item
            .candidate
            .as_ref()
            .map(|c| format!("{} [{}] score {}", c.title, c.id, c.score))
            .unwrap_or_default();
        println!(
            "{:<4} {:<3} {:<13} {:<48} {}",
            item.id.0,
            if item.selected { "x" } else { "" },
            item.label,
            truncate(&item.title, 48),
            candidate
        );
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Berserk", 10), "Berserk");
        assert_eq!(truncate("Chainsaw Man Season 1", 10), "Chainsa...");
        assert_eq!(truncate("進撃の巨人進撃の巨人", 8), "進撃の巨人...");
    }
}
