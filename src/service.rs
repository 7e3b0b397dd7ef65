//! Service layer API for workflow operations
//!
//! Every write is load, compute, compare-and-swap. A lost race reloads the
//! document and recomputes from the fresh snapshot, so the loser fails on the
//! winner's state instead of overwriting it.
use chrono::Utc;

use super::completion::{CompletionGate, ProjectReadiness, ProjectState, Toggle};
use super::config::WorkflowConfig;
use super::document::{ApprovalRecord, Document, DocumentKind, Role, Status, TimeStamp};
use super::engine::{DecisionRequest, PendingView, WorkflowEngine};
use super::error::{ErrorCategory, WorkflowError};
use super::notify::{TransitionEvent, TransitionNotifier};
use super::receipt::ReceiptTracker;
use super::role_chain::RoleChains;
use super::store::{CommitOutcome, DocumentStore, Snapshot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionOutcome {
    pub new_status: Status,
    pub entry: ApprovalRecord,
    pub entry_digest: String,
    pub version: u64,
}

pub struct WorkflowService<S, P, N> {
    store: S,
    engine: WorkflowEngine,
    gate: CompletionGate<P>,
    receipts: ReceiptTracker,
    notifier: N,
    max_commit_attempts: u32,
}

// what a single attempt decided to do with the loaded snapshot
enum Step<T> {
    Commit(Document, T),
    Skip(T),
}

impl<S, P, N> WorkflowService<S, P, N>
where
    S: DocumentStore,
    P: ProjectReadiness,
    N: TransitionNotifier,
{
    pub fn new(
        config: &WorkflowConfig,
        store: S,
        readiness: P,
        notifier: N,
    ) -> Result<Self, WorkflowError> {
        let chains = RoleChains::from_config(&config.chains)?;
        config.validate()?;
        Ok(Self {
            store,
            engine: WorkflowEngine::new(chains),
            gate: CompletionGate::new(readiness),
            receipts: ReceiptTracker::new(),
            notifier,
            max_commit_attempts: config.engine.max_commit_attempts,
        })
    }

    pub fn engine(&self) -> &WorkflowEngine {
        &self.engine
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create and persist a new document at its initial state.
    pub fn open(&self, kind: DocumentKind, created_by: &str) -> Result<Document, WorkflowError> {
        let document = self
            .engine
            .open(kind, created_by)
            .inspect_err(|e| log_rejection("open", "-", e))?;
        self.store.insert(&document)?;

        tracing::info!(
            event_name = "workflow.document.opened",
            document_id = %document.id,
            kind = %kind,
            status = %document.status,
            actor_id = %created_by,
            "document opened"
        );
        Ok(document)
    }

    pub fn get(&self, id: &str) -> Result<Snapshot, WorkflowError> {
        self.store
            .load(id)?
            .ok_or_else(|| WorkflowError::DocumentNotFound(id.to_string()))
    }

    /// Read model for one role. Callers should re-fetch this before writing.
    pub fn view(&self, id: &str, role: &str) -> Result<PendingView, WorkflowError> {
        let role: Role = role.parse()?;
        let snapshot = self.get(id)?;
        Ok(self.engine.view(&snapshot.document, role))
    }

    pub fn decide(&self, request: &DecisionRequest) -> Result<DecisionOutcome, WorkflowError> {
        // caller-correctable, so never touch storage for it
        request
            .validate()
            .inspect_err(|e| log_rejection("decide", &request.document_id, e))?;

        let result = self.update(&request.document_id, |document| {
            let transition = self.engine.decide(document, request, TimeStamp::new())?;
            let status = transition.document.status;
            let digest = transition.entry.digest()?;
            Ok(Step::Commit(
                transition.document,
                (status, transition.entry, digest),
            ))
        });
        let ((new_status, entry, entry_digest), version) =
            result.inspect_err(|e| log_rejection("decide", &request.document_id, e))?;
        let version = version.unwrap_or_default();

        tracing::info!(
            event_name = "workflow.decision.applied",
            document_id = %request.document_id,
            role = %entry.role,
            decision = %entry.decision,
            status = %new_status,
            actor_id = %request.acting_actor_id,
            version,
            "decision applied"
        );
        self.notifier.notify(&TransitionEvent {
            document_id: request.document_id.clone(),
            kind: request.kind,
            new_status,
            actor_id: request.acting_actor_id.clone(),
            entry_digest: Some(entry_digest.clone()),
            occurred_at: entry.timestamp.clone(),
        });

        Ok(DecisionOutcome {
            new_status,
            entry,
            entry_digest,
            version,
        })
    }

    pub fn toggle_completion(
        &self,
        project_id: &str,
        requested: ProjectState,
        actor_id: &str,
    ) -> Result<Status, WorkflowError> {
        let result = self.update(project_id, |document| {
            Ok(match self.gate.toggle(document, requested)? {
                Toggle::Changed { document, .. } => {
                    let status = document.status;
                    Step::Commit(document, status)
                }
                Toggle::Unchanged(document) => Step::Skip(document.status),
            })
        });
        let (status, version) =
            result.inspect_err(|e| log_rejection("toggle_completion", project_id, e))?;

        if version.is_some() {
            tracing::info!(
                event_name = "workflow.completion.toggled",
                document_id = %project_id,
                status = %status,
                actor_id = %actor_id,
                "project status changed"
            );
            self.notifier.notify(&TransitionEvent {
                document_id: project_id.to_string(),
                kind: DocumentKind::Project,
                new_status: status,
                actor_id: actor_id.to_string(),
                entry_digest: None,
                occurred_at: TimeStamp::new(),
            });
        }
        Ok(status)
    }

    pub fn mark_received(
        &self,
        id: &str,
        actor_id: &str,
    ) -> Result<TimeStamp<Utc>, WorkflowError> {
        let result = self.update(id, |document| {
            let next = self
                .receipts
                .mark_received(document, actor_id, TimeStamp::new())?;
            let received_at = next.received_at.clone().unwrap_or_default();
            Ok(Step::Commit(next, (document.kind, received_at)))
        });
        let ((kind, received_at), _) =
            result.inspect_err(|e| log_rejection("mark_received", id, e))?;

        tracing::info!(
            event_name = "workflow.receipt.marked",
            document_id = %id,
            actor_id = %actor_id,
            received_at = %received_at,
            "document marked received"
        );
        self.notifier.notify(&TransitionEvent {
            document_id: id.to_string(),
            kind,
            new_status: Status::Approved,
            actor_id: actor_id.to_string(),
            entry_digest: None,
            occurred_at: received_at.clone(),
        });
        Ok(received_at)
    }

    fn update<T, F>(&self, id: &str, mut compute: F) -> Result<(T, Option<u64>), WorkflowError>
    where
        F: FnMut(&Document) -> Result<Step<T>, WorkflowError>,
    {
        for attempt in 1..=self.max_commit_attempts {
            let snapshot = self.get(id)?;
            let (next, value) = match compute(&snapshot.document)? {
                Step::Skip(value) => return Ok((value, None)),
                Step::Commit(next, value) => (next, value),
            };

            match self.store.commit(id, snapshot.version, &next)? {
                CommitOutcome::Committed { version } => return Ok((value, Some(version))),
                CommitOutcome::Conflict => {
                    tracing::debug!(
                        event_name = "workflow.commit.conflict",
                        document_id = %id,
                        attempt,
                        expected_version = snapshot.version,
                        "document changed underneath, reloading"
                    );
                }
            }
        }

        tracing::warn!(
            event_name = "workflow.commit.exhausted",
            document_id = %id,
            attempts = self.max_commit_attempts,
            "giving up on contended document"
        );
        Err(WorkflowError::RetryExhausted {
            id: id.to_string(),
            attempts: self.max_commit_attempts,
        })
    }
}

fn rejection_event(category: ErrorCategory) -> &'static str {
    match category {
        ErrorCategory::Configuration => "workflow.decision.rejected.configuration",
        ErrorCategory::Storage => "workflow.decision.rejected.storage",
        ErrorCategory::Legality | ErrorCategory::Validation | ErrorCategory::Precondition => {
            "workflow.decision.rejected"
        }
    }
}

fn log_rejection(operation: &str, document_id: &str, err: &WorkflowError) {
    let category = err.category();
    let event_name = rejection_event(category);
    match category {
        ErrorCategory::Configuration => tracing::error!(
            event_name,
            operation,
            document_id,
            error = %err,
            "role chain and caller data disagree"
        ),
        ErrorCategory::Storage => tracing::warn!(
            event_name,
            operation,
            document_id,
            error = %err,
            "storage failure"
        ),
        ErrorCategory::Legality | ErrorCategory::Validation | ErrorCategory::Precondition => {
            tracing::info!(
                event_name,
                operation,
                document_id,
                error = %err,
                "transition rejected"
            )
        }
    }
}
