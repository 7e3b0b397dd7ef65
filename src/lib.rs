pub mod completion;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod notify;
pub mod receipt;
pub mod role_chain;
pub mod service;
pub mod store;
pub mod utils;

pub use document::{ApprovalRecord, Decision, Document, DocumentKind, Role, Status, TimeStamp};
pub use engine::{DecisionRequest, WorkflowEngine};
pub use error::{ErrorCategory, WorkflowError};
pub use service::WorkflowService;
