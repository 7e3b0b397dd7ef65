use super::config::ConfigError;
use super::document::{DocumentKind, Role, Status, TimeStamp};
use chrono::Utc;

/// How a caller is expected to react to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Chain definitions and caller data disagree. Fatal to the request.
    Configuration,
    /// Stale UI or a lost race. Re-fetch and show, don't resubmit blindly.
    Legality,
    /// Caller-correctable input.
    Validation,
    /// External readiness check failed.
    Precondition,
    Storage,
}

#[derive(thiserror::Error, Debug)]
pub enum WorkflowError {
    #[error("{0} documents are not supported by this operation")]
    UnsupportedKind(DocumentKind),
    #[error("role `{role}` is not part of the {} approval chain", display_kind(.kind))]
    UnknownRole {
        kind: Option<DocumentKind>,
        role: String,
    },
    #[error("unrecognised status label `{0}`")]
    UnknownStatus(String),
    #[error("request targets a {requested} but document is a {stored}")]
    KindMismatch {
        requested: DocumentKind,
        stored: DocumentKind,
    },
    #[error("invalid approval chain: {0}")]
    InvalidChain(String),
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("not {role}'s turn, document is {current}")]
    NotYourTurn { role: Role, current: Status },
    #[error("document is already finalized as {0}")]
    AlreadyFinalized(Status),
    #[error("{0} has already acted on this document")]
    DuplicateAction(Role),
    #[error("document was already marked received at {0}")]
    AlreadyReceived(TimeStamp<Utc>),
    #[error("document is not approved yet, status is {0}")]
    NotApprovedYet(Status),
    #[error("only the requester may mark the document received, got `{0}`")]
    NotRequester(String),

    #[error("a reason is required when denying")]
    ReasonRequired,

    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("document {0} not found")]
    DocumentNotFound(String),
    #[error("document {id} kept changing after {attempts} attempts, please retry")]
    RetryExhausted { id: String, attempts: u32 },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Collaborator(#[from] anyhow::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("storage backend failure: {0}")]
    Backend(#[from] sled::Error),
    #[error("failed to encode document: {0}")]
    Encode(String),
    #[error("failed to decode stored document: {0}")]
    Decode(#[from] minicbor::decode::Error),
    #[error("document {0} already exists")]
    AlreadyExists(String),
}

impl WorkflowError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            WorkflowError::UnsupportedKind(_)
            | WorkflowError::UnknownRole { .. }
            | WorkflowError::UnknownStatus(_)
            | WorkflowError::KindMismatch { .. }
            | WorkflowError::InvalidChain(_)
            | WorkflowError::Config(_) => ErrorCategory::Configuration,
            WorkflowError::NotYourTurn { .. }
            | WorkflowError::AlreadyFinalized(_)
            | WorkflowError::DuplicateAction(_)
            | WorkflowError::AlreadyReceived(_)
            | WorkflowError::NotApprovedYet(_)
            | WorkflowError::NotRequester(_) => ErrorCategory::Legality,
            WorkflowError::ReasonRequired => ErrorCategory::Validation,
            WorkflowError::PreconditionFailed(_) => ErrorCategory::Precondition,
            WorkflowError::DocumentNotFound(_)
            | WorkflowError::RetryExhausted { .. }
            | WorkflowError::Store(_)
            | WorkflowError::Collaborator(_) => ErrorCategory::Storage,
        }
    }
}

fn display_kind(kind: &Option<DocumentKind>) -> String {
    match kind {
        Some(kind) => kind.to_string(),
        None => "known".to_string(),
    }
}
