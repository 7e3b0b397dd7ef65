//! Guarded Ongoing <-> Completed toggle for projects
use super::document::{Document, DocumentKind, Status};
use super::error::WorkflowError;

/// Readiness queries answered by whatever owns project files and reports.
pub trait ProjectReadiness {
    fn has_attached_files(&self, project_id: &str) -> anyhow::Result<bool>;
    fn has_submitted_reports(&self, project_id: &str) -> anyhow::Result<bool>;
}

impl<T: ProjectReadiness + ?Sized> ProjectReadiness for std::sync::Arc<T> {
    fn has_attached_files(&self, project_id: &str) -> anyhow::Result<bool> {
        (**self).has_attached_files(project_id)
    }
    fn has_submitted_reports(&self, project_id: &str) -> anyhow::Result<bool> {
        (**self).has_submitted_reports(project_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectState {
    Ongoing,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toggle {
    Changed { from: Status, document: Document },
    Unchanged(Document),
}

pub struct CompletionGate<P> {
    readiness: P,
}

impl From<ProjectState> for Status {
    fn from(value: ProjectState) -> Self {
        match value {
            ProjectState::Ongoing => Status::Ongoing,
            ProjectState::Completed => Status::Completed,
        }
    }
}

impl Toggle {
    pub fn document(&self) -> &Document {
        match self {
            Toggle::Changed { document, .. } | Toggle::Unchanged(document) => document,
        }
    }

    pub fn into_document(self) -> Document {
        match self {
            Toggle::Changed { document, .. } | Toggle::Unchanged(document) => document,
        }
    }
}

impl<P: ProjectReadiness> CompletionGate<P> {
    pub fn new(readiness: P) -> Self {
        Self { readiness }
    }

    /// Completing needs at least one stored file and one submitted report.
    /// Reverting to ongoing is unconditional.
    pub fn toggle(
        &self,
        document: &Document,
        requested: ProjectState,
    ) -> Result<Toggle, WorkflowError> {
        if document.kind != DocumentKind::Project {
            return Err(WorkflowError::UnsupportedKind(document.kind));
        }
        if !matches!(document.status, Status::Ongoing | Status::Completed) {
            return Err(WorkflowError::UnknownStatus(document.status.to_string()));
        }

        let target = Status::from(requested);
        if document.status == target {
            return Ok(Toggle::Unchanged(document.clone()));
        }

        if requested == ProjectState::Completed {
            self.check_ready(&document.id)?;
        }

        let mut next = document.clone();
        next.status = target;
        Ok(Toggle::Changed {
            from: document.status,
            document: next,
        })
    }

    fn check_ready(&self, project_id: &str) -> Result<(), WorkflowError> {
        let mut missing = vec![];
        if !self.readiness.has_attached_files(project_id)? {
            missing.push("at least one uploaded document");
        }
        if !self.readiness.has_submitted_reports(project_id)? {
            missing.push("at least one submitted report");
        }

        if missing.is_empty() {
            return Ok(());
        }
        Err(WorkflowError::PreconditionFailed(format!(
            "project cannot be completed, it needs {}",
            missing.join(" and ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::WorkflowEngine;

    struct Fixed(bool, bool);

    impl ProjectReadiness for Fixed {
        fn has_attached_files(&self, _: &str) -> anyhow::Result<bool> {
            Ok(self.0)
        }
        fn has_submitted_reports(&self, _: &str) -> anyhow::Result<bool> {
            Ok(self.1)
        }
    }

    struct Broken;

    impl ProjectReadiness for Broken {
        fn has_attached_files(&self, _: &str) -> anyhow::Result<bool> {
            Err(anyhow::anyhow!("file index unavailable"))
        }
        fn has_submitted_reports(&self, _: &str) -> anyhow::Result<bool> {
            Ok(true)
        }
    }

    fn project() -> Document {
        WorkflowEngine::default()
            .open(DocumentKind::Project, "user_pm")
            .unwrap()
    }

    #[test]
    fn completion_names_every_missing_requirement() {
        let gate = CompletionGate::new(Fixed(false, false));
        let err = gate.toggle(&project(), ProjectState::Completed).unwrap_err();

        match err {
            WorkflowError::PreconditionFailed(msg) => {
                assert!(msg.contains("uploaded document"));
                assert!(msg.contains("submitted report"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn completion_and_revert() {
        let gate = CompletionGate::new(Fixed(true, true));
        let done = gate
            .toggle(&project(), ProjectState::Completed)
            .unwrap()
            .into_document();
        assert_eq!(done.status, Status::Completed);

        // reverting skips the readiness check entirely
        let gate = CompletionGate::new(Fixed(false, false));
        let back = gate.toggle(&done, ProjectState::Ongoing).unwrap();
        assert!(matches!(back, Toggle::Changed { from: Status::Completed, .. }));
        assert_eq!(back.document().status, Status::Ongoing);
    }

    #[test]
    fn same_state_is_a_no_op() {
        let gate = CompletionGate::new(Fixed(false, false));
        let doc = project();
        assert_eq!(
            gate.toggle(&doc, ProjectState::Ongoing).unwrap(),
            Toggle::Unchanged(doc)
        );
    }

    #[test]
    fn collaborator_failure_is_not_readiness() {
        let gate = CompletionGate::new(Broken);
        assert!(matches!(
            gate.toggle(&project(), ProjectState::Completed),
            Err(WorkflowError::Collaborator(_))
        ));
    }

    #[test]
    fn requests_cannot_be_toggled() {
        let gate = CompletionGate::new(Fixed(true, true));
        let request = WorkflowEngine::default()
            .open(DocumentKind::ManpowerRequest, "user_a")
            .unwrap();
        assert!(matches!(
            gate.toggle(&request, ProjectState::Completed),
            Err(WorkflowError::UnsupportedKind(DocumentKind::ManpowerRequest))
        ));
    }
}
