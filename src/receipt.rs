//! Delivery acknowledgement by the original requester
use chrono::Utc;

use super::document::{Document, Status, TimeStamp};
use super::error::WorkflowError;

#[derive(Debug, Clone, Copy, Default)]
pub struct ReceiptTracker;

impl ReceiptTracker {
    pub fn new() -> Self {
        Self
    }

    /// Sets `received_at` once. Only `created_by` may do it, and only after approval.
    pub fn mark_received(
        &self,
        document: &Document,
        actor_id: &str,
        at: TimeStamp<Utc>,
    ) -> Result<Document, WorkflowError> {
        if !document.kind.is_request() {
            return Err(WorkflowError::UnsupportedKind(document.kind));
        }
        if document.status != Status::Approved {
            return Err(WorkflowError::NotApprovedYet(document.status));
        }
        if let Some(received_at) = &document.received_at {
            return Err(WorkflowError::AlreadyReceived(received_at.clone()));
        }
        if actor_id != document.created_by {
            return Err(WorkflowError::NotRequester(actor_id.to_string()));
        }

        let mut next = document.clone();
        next.received_at = Some(document.ledger().next_timestamp(at));
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ApprovalRecord, DocumentKind, Role};
    use crate::engine::WorkflowEngine;

    fn approved_request() -> Document {
        let mut doc = WorkflowEngine::default()
            .open(DocumentKind::MaterialRequest, "user_requester")
            .unwrap();
        for role in Role::ALL {
            doc.approvals
                .append(ApprovalRecord::approved(role, "user_x", TimeStamp::new()))
                .unwrap();
        }
        doc.status = Status::Approved;
        doc
    }

    #[test]
    fn requester_marks_once() {
        let tracker = ReceiptTracker::new();
        let doc = tracker
            .mark_received(&approved_request(), "user_requester", TimeStamp::new())
            .unwrap();
        let first = doc.received_at.clone().unwrap();

        let err = tracker
            .mark_received(&doc, "user_requester", TimeStamp::new())
            .unwrap_err();
        assert!(matches!(err, WorkflowError::AlreadyReceived(ref at) if *at == first));
    }

    #[test]
    fn chain_actor_cannot_forge_receipt() {
        let tracker = ReceiptTracker::new();
        assert!(matches!(
            tracker.mark_received(&approved_request(), "user_x", TimeStamp::new()),
            Err(WorkflowError::NotRequester(_))
        ));
    }

    #[test]
    fn pending_request_is_not_receivable() {
        let doc = WorkflowEngine::default()
            .open(DocumentKind::ManpowerRequest, "user_requester")
            .unwrap();
        assert!(matches!(
            ReceiptTracker::new().mark_received(&doc, "user_requester", TimeStamp::new()),
            Err(WorkflowError::NotApprovedYet(Status::Pending(Role::ProjectManager)))
        ));
    }
}
