//! Append-only decision trail attached to every request
use chrono::Utc;

use super::document::{ApprovalRecord, Decision, Role, TimeStamp};
use super::error::WorkflowError;
use super::role_chain::RoleChain;

/// Insertion order is chronological order. Entries are never reordered,
/// edited or removed once appended.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Default, PartialEq, Eq)]
pub struct ApprovalLedger {
    #[n(0)]
    records: Vec<ApprovalRecord>,
}

impl ApprovalLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[ApprovalRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of leading chain roles that have an approval on record.
    pub fn current_step_index(&self, chain: &RoleChain) -> usize {
        chain
            .steps()
            .iter()
            .take_while(|role| {
                self.entry_for(**role)
                    .is_some_and(|record| record.decision == Decision::Approved)
            })
            .count()
    }

    /// True if any actor already used this role's seat, regardless of who.
    pub fn has_acted(&self, role: Role) -> bool {
        self.entry_for(role).is_some()
    }

    pub fn entry_for(&self, role: Role) -> Option<&ApprovalRecord> {
        self.records.iter().find(|record| record.role == role)
    }

    pub fn denied_entry(&self) -> Option<&ApprovalRecord> {
        self.records
            .iter()
            .find(|record| record.decision == Decision::Denied)
    }

    pub fn last_timestamp(&self) -> Option<&TimeStamp<Utc>> {
        self.records.last().map(|record| &record.timestamp)
    }

    /// Clamp `at` so the ledger's timestamps never go backwards.
    pub fn next_timestamp(&self, at: TimeStamp<Utc>) -> TimeStamp<Utc> {
        match self.last_timestamp() {
            Some(last) if *last > at => last.clone(),
            _ => at,
        }
    }

    /// The only mutator. Refuses a second entry for a seat and anything after a denial.
    pub fn append(&mut self, record: ApprovalRecord) -> Result<(), WorkflowError> {
        if let Some(denied) = self.denied_entry() {
            return Err(WorkflowError::AlreadyFinalized(
                super::document::Status::Denied(denied.role),
            ));
        }
        if self.has_acted(record.role) {
            return Err(WorkflowError::DuplicateAction(record.role));
        }
        if record.decision == Decision::Denied
            && record.reason.as_deref().is_none_or(|r| r.trim().is_empty())
        {
            return Err(WorkflowError::ReasonRequired);
        }

        let record = ApprovalRecord {
            timestamp: self.next_timestamp(record.timestamp.clone()),
            ..record
        };
        self.records.push(record);
        Ok(())
    }
}
