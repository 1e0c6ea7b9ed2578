//! Session events and listeners.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

use super::item::{ItemId, MatchStatus, WorkItem};
use crate::scheduler::BatchProgress;

/// Which pass produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Matching,
    Tracking,
}

/// Result of a tracking pass, reported once when the session completes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOutcome {
    pub tracked: usize,
    pub failed: usize,
    /// Whether the library was written back.
    pub persisted: bool,
    pub cancelled: bool,
}

/// Receives session notifications.
///
/// Callbacks run on the coordinating task and must not block.
pub trait SessionListener: Send + Sync {
    /// Cumulative progress after each batch.
    fn on_progress(&self, _phase: SessionPhase, _progress: BatchProgress) {}

    /// An item changed status or label.
    fn on_item_status_changed(&self, _item: &WorkItem) {}

    /// The tracking pass finished and the session is done.
    fn on_session_complete(&self, _outcome: &SessionOutcome) {}
}

/// Listener that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl SessionListener for NoopListener {}

/// Serializable form of the listener callbacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    Progress {
        phase: SessionPhase,
        done: usize,
        total: usize,
    },
    ItemStatusChanged {
        item: ItemId,
        title: String,
        status: MatchStatus,
        label: String,
    },
    SessionComplete(SessionOutcome),
}

/// Forwards events to a broadcast channel.
///
/// Sending never blocks; events are dropped when nobody is subscribed.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    tx: broadcast::Sender<SessionEvent>,
}

impl ChannelListener {
    pub fn new(capacity: usize) -> (Self, broadcast::Receiver<SessionEvent>) {
        let (tx, rx) = broadcast::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    fn send(&self, event: SessionEvent) {
        if self.tx.send(event).is_err() {
            trace!("No session event subscribers");
        }
    }
}

impl SessionListener for ChannelListener {
    fn on_progress(&self, phase: SessionPhase, progress: BatchProgress) {
        self.send(SessionEvent::Progress {
            phase,
            done: progress.done,
            total: progress.total,
        });
    }

    fn on_item_status_changed(&self, item: &WorkItem) {
        self.send(SessionEvent::ItemStatusChanged {
            item: item.id,
            title: item.title.clone(),
            status: item.status,
            label: item.label.clone(),
        });
    }

    fn on_session_complete(&self, outcome: &SessionOutcome) {
        self.send(SessionEvent::SessionComplete(outcome.clone()));
    }
}
