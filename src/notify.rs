//! Fire-and-forget transition fan-out for chat, notification and audit consumers
use chrono::Utc;
use std::sync::mpsc::Sender;

use super::document::{DocumentKind, Status, TimeStamp};

/// Emitted once per committed transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionEvent {
    pub document_id: String,
    pub kind: DocumentKind,
    pub new_status: Status,
    pub actor_id: String,
    pub entry_digest: Option<String>, // sha256 of the appended ledger entry, if any
    pub occurred_at: TimeStamp<Utc>,
}

/// Nothing in the workflow waits on, or fails because of, a notifier.
pub trait TransitionNotifier: Send + Sync {
    fn notify(&self, event: &TransitionEvent);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl TransitionNotifier for LogNotifier {
    fn notify(&self, event: &TransitionEvent) {
        tracing::info!(
            event_name = "workflow.transition.notified",
            document_id = %event.document_id,
            kind = %event.kind,
            status = %event.new_status,
            actor_id = %event.actor_id,
            "document transitioned"
        );
    }
}

impl TransitionNotifier for std::sync::Mutex<Sender<TransitionEvent>> {
    fn notify(&self, event: &TransitionEvent) {
        let sent = match self.lock() {
            Ok(sender) => sender.send(event.clone()).is_ok(),
            Err(_) => false,
        };
        if !sent {
            tracing::warn!(
                event_name = "workflow.transition.dropped",
                document_id = %event.document_id,
                "transition listener is gone, event dropped"
            );
        }
    }
}

impl<N: TransitionNotifier> TransitionNotifier for Vec<N> {
    fn notify(&self, event: &TransitionEvent) {
        for notifier in self {
            notifier.notify(event);
        }
    }
}
