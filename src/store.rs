//! Versioned document persistence
//!
//! Every write is a compare-and-swap keyed by document id, so two writers racing on
//! the same document serialize: one commits, the other sees [`CommitOutcome::Conflict`]
//! and has to reload.
use sled::{Db, Tree};
use std::sync::Arc;

use super::config::StoreConfig;
use super::document::Document;
use super::error::StoreError;

const DOCUMENTS_TREE: &str = "documents";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub version: u64,
    pub document: Document,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed { version: u64 },
    Conflict,
}

pub trait DocumentStore: Send + Sync {
    /// Store a brand new document at version 1.
    fn insert(&self, document: &Document) -> Result<u64, StoreError>;
    fn load(&self, id: &str) -> Result<Option<Snapshot>, StoreError>;
    /// Replace the document only if it is still at `expected_version`.
    fn commit(
        &self,
        id: &str,
        expected_version: u64,
        document: &Document,
    ) -> Result<CommitOutcome, StoreError>;
}

#[derive(minicbor::Decode)]
struct StoredDocument {
    #[n(0)]
    version: u64,
    #[n(1)]
    document: Document,
}

#[derive(minicbor::Encode)]
struct StoredDocumentRef<'a> {
    #[n(0)]
    version: u64,
    #[n(1)]
    document: &'a Document,
}

pub struct SledStore {
    documents: Tree,
    flush_on_commit: bool,
}

impl SledStore {
    pub fn new(instance: Arc<Db>, flush_on_commit: bool) -> Result<Self, StoreError> {
        let documents = instance.open_tree(DOCUMENTS_TREE)?;
        Ok(Self {
            documents,
            flush_on_commit,
        })
    }

    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        let db = sled::open(&config.path)?;
        tracing::debug!(
            event_name = "workflow.store.opened",
            path = %config.path.display(),
            "opened document store"
        );
        Self::new(Arc::new(db), config.flush_on_commit)
    }

    fn encode(version: u64, document: &Document) -> Result<Vec<u8>, StoreError> {
        minicbor::to_vec(StoredDocumentRef { version, document })
            .map_err(|e| StoreError::Encode(e.to_string()))
    }

    fn decode(bytes: &[u8]) -> Result<StoredDocument, StoreError> {
        Ok(minicbor::decode(bytes)?)
    }

    fn flush(&self) -> Result<(), StoreError> {
        if self.flush_on_commit {
            self.documents.flush()?;
        }
        Ok(())
    }
}

impl DocumentStore for SledStore {
    fn insert(&self, document: &Document) -> Result<u64, StoreError> {
        let bytes = Self::encode(1, document)?;
        let swapped =
            self.documents
                .compare_and_swap(document.id.as_bytes(), None as Option<&[u8]>, Some(bytes))?;

        if swapped.is_err() {
            return Err(StoreError::AlreadyExists(document.id.clone()));
        }
        self.flush()?;
        Ok(1)
    }

    fn load(&self, id: &str) -> Result<Option<Snapshot>, StoreError> {
        let Some(bytes) = self.documents.get(id.as_bytes())? else {
            return Ok(None);
        };
        let stored = Self::decode(&bytes)?;

        Ok(Some(Snapshot {
            version: stored.version,
            document: stored.document,
        }))
    }

    fn commit(
        &self,
        id: &str,
        expected_version: u64,
        document: &Document,
    ) -> Result<CommitOutcome, StoreError> {
        // a removed document is just another way of losing the race
        let Some(current) = self.documents.get(id.as_bytes())? else {
            return Ok(CommitOutcome::Conflict);
        };
        if Self::decode(&current)?.version != expected_version {
            return Ok(CommitOutcome::Conflict);
        }

        let version = expected_version + 1;
        let next = Self::encode(version, document)?;
        let swapped = self
            .documents
            .compare_and_swap(id.as_bytes(), Some(&current), Some(next))?;

        match swapped {
            Ok(()) => {
                self.flush()?;
                Ok(CommitOutcome::Committed { version })
            }
            Err(_) => Ok(CommitOutcome::Conflict),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentKind, Status};
    use crate::engine::WorkflowEngine;
    use tempfile::tempdir;

    fn store(dir: &tempfile::TempDir) -> SledStore {
        let db = sled::open(dir.path().join("store.db")).unwrap();
        SledStore::new(Arc::new(db), false).unwrap()
    }

    #[test]
    fn insert_then_load() {
        let dir = tempdir().unwrap();
        let store = store(&dir);
        let doc = WorkflowEngine::default()
            .open(DocumentKind::MaterialRequest, "user_a")
            .unwrap();

        assert_eq!(store.insert(&doc).unwrap(), 1);
        let snapshot = store.load(&doc.id).unwrap().unwrap();
        assert_eq!(snapshot.version, 1);
        assert_eq!(snapshot.document, doc);

        assert!(matches!(
            store.insert(&doc),
            Err(StoreError::AlreadyExists(_))
        ));
        assert!(store.load("mreq_missing").unwrap().is_none());
    }

    #[test]
    fn stale_version_conflicts() {
        let dir = tempdir().unwrap();
        let store = store(&dir);
        let mut doc = WorkflowEngine::default()
            .open(DocumentKind::Project, "user_a")
            .unwrap();
        store.insert(&doc).unwrap();

        doc.status = Status::Completed;
        assert_eq!(
            store.commit(&doc.id, 1, &doc).unwrap(),
            CommitOutcome::Committed { version: 2 }
        );
        assert_eq!(
            store.commit(&doc.id, 1, &doc).unwrap(),
            CommitOutcome::Conflict
        );
        assert_eq!(store.load(&doc.id).unwrap().unwrap().version, 2);
    }
}
