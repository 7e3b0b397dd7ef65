//! Sequential approval state machine
//!
//! `decide` is pure: it takes a snapshot and returns the next snapshot plus the
//! ledger entry it appended. Atomicity against concurrent writers is the storage
//! layer's job, see [`crate::service::WorkflowService`].
use chrono::Utc;

use super::document::{ApprovalRecord, Decision, Document, DocumentKind, Role, Status, TimeStamp};
use super::error::WorkflowError;
use super::ledger::ApprovalLedger;
use super::role_chain::{RoleChain, RoleChains};
use super::utils;

/// Inbound decision as submitted by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionRequest {
    pub document_id: String,
    pub kind: DocumentKind,
    pub acting_role: String, // raw profile role, normalised here
    pub acting_actor_id: String,
    pub decision: Decision,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: Status,
    pub document: Document,
    pub entry: ApprovalRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Approve,
    Deny,
}

/// What a UI needs to render one document for one role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingView {
    pub status: Status,
    pub pending_role: Option<Role>,
    pub pending_for_me: bool,
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, Default)]
pub struct WorkflowEngine {
    chains: RoleChains,
}

impl DecisionRequest {
    pub fn approve(
        document: &Document,
        acting_role: impl Into<String>,
        acting_actor_id: impl Into<String>,
    ) -> Self {
        Self {
            document_id: document.id.clone(),
            kind: document.kind,
            acting_role: acting_role.into(),
            acting_actor_id: acting_actor_id.into(),
            decision: Decision::Approved,
            reason: None,
        }
    }

    pub fn deny(
        document: &Document,
        acting_role: impl Into<String>,
        acting_actor_id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            document_id: document.id.clone(),
            kind: document.kind,
            acting_role: acting_role.into(),
            acting_actor_id: acting_actor_id.into(),
            decision: Decision::Denied,
            reason: Some(reason.into()),
        }
    }

    /// Denials need a non-blank reason. Checked before anything else is looked at.
    pub fn validate(&self) -> Result<(), WorkflowError> {
        if self.decision == Decision::Denied
            && self.reason.as_deref().is_none_or(|r| r.trim().is_empty())
        {
            return Err(WorkflowError::ReasonRequired);
        }
        Ok(())
    }
}

impl WorkflowEngine {
    pub fn new(chains: RoleChains) -> Self {
        Self { chains }
    }

    pub fn chains(&self) -> &RoleChains {
        &self.chains
    }

    /// Fresh document at its initial state with an empty ledger.
    pub fn open(&self, kind: DocumentKind, created_by: &str) -> Result<Document, WorkflowError> {
        let status = match kind {
            DocumentKind::Project => Status::Ongoing,
            _ => self.chains.for_kind(kind)?.initial_status(),
        };

        Ok(Document {
            id: utils::new_document_id(kind)?,
            kind,
            status,
            approvals: ApprovalLedger::new(),
            received_at: None,
            created_by: created_by.to_string(),
        })
    }

    pub fn decide(
        &self,
        document: &Document,
        request: &DecisionRequest,
        at: TimeStamp<Utc>,
    ) -> Result<Transition, WorkflowError> {
        request.validate()?;

        if request.kind != document.kind {
            return Err(WorkflowError::KindMismatch {
                requested: request.kind,
                stored: document.kind,
            });
        }

        let chain = self.chains.for_kind(document.kind)?;
        let role = resolve_role(chain, &request.acting_role)?;
        let expected_step = chain.index_of(role)?;

        let ledger = document.ledger();
        if let Some(denied) = ledger.denied_entry() {
            return Err(WorkflowError::AlreadyFinalized(Status::Denied(denied.role)));
        }
        if document.status.is_terminal() {
            return Err(WorkflowError::AlreadyFinalized(document.status));
        }
        if !chain.recognises(document.status) {
            return Err(WorkflowError::UnknownStatus(document.status.to_string()));
        }

        let current_step = ledger.current_step_index(chain);
        if current_step >= chain.len() {
            // every seat approved but status never caught up
            return Err(WorkflowError::AlreadyFinalized(Status::Approved));
        }
        if expected_step != current_step {
            return Err(WorkflowError::NotYourTurn {
                role,
                current: document.status,
            });
        }
        if ledger.has_acted(role) {
            return Err(WorkflowError::DuplicateAction(role));
        }

        let timestamp = ledger.next_timestamp(at);
        let (entry, status) = match request.decision {
            Decision::Denied => {
                let reason = request.reason.clone().unwrap_or_default();
                (
                    ApprovalRecord::denied(
                        role,
                        &request.acting_actor_id,
                        reason.trim(),
                        timestamp,
                    ),
                    chain.denied_status_for(role)?,
                )
            }
            Decision::Approved => {
                let status = if expected_step == chain.last_index() {
                    Status::Approved
                } else {
                    chain.pending_status_for(expected_step + 1)?
                };
                (
                    ApprovalRecord::approved(role, &request.acting_actor_id, timestamp),
                    status,
                )
            }
        };

        let mut next = document.clone();
        next.approvals.append(entry.clone())?;
        next.status = status;

        Ok(Transition {
            from: document.status,
            document: next,
            entry,
        })
    }

    /// Derived from status and role only, never from client memory.
    pub fn is_pending_for(&self, document: &Document, role: Role) -> bool {
        document.status.pending_role() == Some(role)
            && document.ledger().denied_entry().is_none()
            && !document.ledger().has_acted(role)
    }

    pub fn view(&self, document: &Document, role: Role) -> PendingView {
        let pending_for_me = document.kind.is_request() && self.is_pending_for(document, role);
        let actions = if pending_for_me {
            vec![Action::Approve, Action::Deny]
        } else {
            vec![]
        };

        PendingView {
            status: document.status,
            pending_role: document.status.pending_role(),
            pending_for_me,
            actions,
        }
    }

    /// Who denied, and why.
    pub fn denial<'a>(&self, document: &'a Document) -> Option<(Role, &'a str)> {
        document
            .ledger()
            .denied_entry()
            .map(|entry| (entry.role, entry.reason.as_deref().unwrap_or_default()))
    }
}

fn resolve_role(chain: &RoleChain, acting_role: &str) -> Result<Role, WorkflowError> {
    acting_role
        .parse::<Role>()
        .map_err(|_| WorkflowError::UnknownRole {
            kind: Some(chain.kind()),
            role: acting_role.to_string(),
        })
}
