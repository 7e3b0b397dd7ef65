//! Ordered approver chains per document kind
use super::config::ChainConfig;
use super::document::{DocumentKind, Role, Status};
use super::error::WorkflowError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleChain {
    kind: DocumentKind,
    steps: Vec<Role>,
}

/// One chain per request kind. Projects have none, they go through the completion gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleChains {
    material_request: RoleChain,
    manpower_request: RoleChain,
}

impl RoleChain {
    pub fn new(kind: DocumentKind, steps: Vec<Role>) -> Result<Self, WorkflowError> {
        if !kind.is_request() {
            return Err(WorkflowError::UnsupportedKind(kind));
        }
        if steps.is_empty() {
            return Err(WorkflowError::InvalidChain(format!(
                "{kind} chain has no steps"
            )));
        }
        for (i, role) in steps.iter().enumerate() {
            if steps[..i].contains(role) {
                return Err(WorkflowError::InvalidChain(format!(
                    "{kind} chain lists {role} more than once"
                )));
            }
        }

        Ok(Self { kind, steps })
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn steps(&self) -> &[Role] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn last_index(&self) -> usize {
        self.steps.len() - 1
    }

    pub fn index_of(&self, role: Role) -> Result<usize, WorkflowError> {
        self.steps
            .iter()
            .position(|step| *step == role)
            .ok_or_else(|| WorkflowError::UnknownRole {
                kind: Some(self.kind),
                role: role.code().to_string(),
            })
    }

    pub fn role_at(&self, step: usize) -> Option<Role> {
        self.steps.get(step).copied()
    }

    pub fn initial_status(&self) -> Status {
        Status::Pending(self.steps[0])
    }

    pub fn pending_status_for(&self, step: usize) -> Result<Status, WorkflowError> {
        self.role_at(step).map(Status::Pending).ok_or_else(|| {
            WorkflowError::InvalidChain(format!(
                "{} chain has no step {step}",
                self.kind
            ))
        })
    }

    pub fn denied_status_for(&self, role: Role) -> Result<Status, WorkflowError> {
        self.index_of(role)?;
        Ok(Status::Denied(role))
    }

    /// Whether `status` belongs to this chain's closed set of states.
    pub fn recognises(&self, status: Status) -> bool {
        match status {
            Status::Pending(role) | Status::Denied(role) => self.steps.contains(&role),
            Status::Approved => true,
            Status::Ongoing | Status::Completed => false,
        }
    }
}

impl RoleChains {
    pub fn from_config(config: &ChainConfig) -> Result<Self, WorkflowError> {
        Ok(Self {
            material_request: RoleChain::new(
                DocumentKind::MaterialRequest,
                parse_roles(&config.material_request)?,
            )?,
            manpower_request: RoleChain::new(
                DocumentKind::ManpowerRequest,
                parse_roles(&config.manpower_request)?,
            )?,
        })
    }

    pub fn for_kind(&self, kind: DocumentKind) -> Result<&RoleChain, WorkflowError> {
        match kind {
            DocumentKind::MaterialRequest => Ok(&self.material_request),
            DocumentKind::ManpowerRequest => Ok(&self.manpower_request),
            DocumentKind::Project => Err(WorkflowError::UnsupportedKind(kind)),
        }
    }
}

impl Default for RoleChains {
    fn default() -> Self {
        let standard = vec![Role::ProjectManager, Role::AreaManager, Role::Ceo];
        Self {
            material_request: RoleChain {
                kind: DocumentKind::MaterialRequest,
                steps: standard.clone(),
            },
            manpower_request: RoleChain {
                kind: DocumentKind::ManpowerRequest,
                steps: standard,
            },
        }
    }
}

fn parse_roles(codes: &[String]) -> Result<Vec<Role>, WorkflowError> {
    codes
        .iter()
        .map(|code| {
            code.parse::<Role>()
                .map_err(|_| WorkflowError::InvalidChain(format!("unknown role `{code}`")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_chain_lookups() {
        let chains = RoleChains::default();
        let chain = chains.for_kind(DocumentKind::MaterialRequest).unwrap();

        assert_eq!(chain.len(), 3);
        assert_eq!(chain.index_of(Role::AreaManager).unwrap(), 1);
        assert_eq!(
            chain.pending_status_for(2).unwrap(),
            Status::Pending(Role::Ceo)
        );
        assert_eq!(
            chain.denied_status_for(Role::ProjectManager).unwrap(),
            Status::Denied(Role::ProjectManager)
        );
        assert!(chain.pending_status_for(3).is_err());
    }

    #[test]
    fn projects_have_no_chain() {
        let chains = RoleChains::default();
        assert!(matches!(
            chains.for_kind(DocumentKind::Project),
            Err(WorkflowError::UnsupportedKind(DocumentKind::Project))
        ));
    }

    #[test]
    fn rejects_bad_chains() {
        assert!(RoleChain::new(DocumentKind::MaterialRequest, vec![]).is_err());
        assert!(
            RoleChain::new(
                DocumentKind::ManpowerRequest,
                vec![Role::ProjectManager, Role::ProjectManager],
            )
            .is_err()
        );

        let config = ChainConfig {
            material_request: vec!["PM".into(), "Foreman".into()],
            manpower_request: vec!["PM".into()],
        };
        assert!(matches!(
            RoleChains::from_config(&config),
            Err(WorkflowError::InvalidChain(_))
        ));
    }

    #[test]
    fn configured_chain_excludes_missing_roles() {
        let config = ChainConfig {
            material_request: vec!["Project Manager".into(), "CEO".into()],
            manpower_request: vec!["PM".into(), "AM".into()],
        };
        let chains = RoleChains::from_config(&config).unwrap();
        let manpower = chains.for_kind(DocumentKind::ManpowerRequest).unwrap();

        assert!(matches!(
            manpower.index_of(Role::Ceo),
            Err(WorkflowError::UnknownRole { .. })
        ));
        assert!(!manpower.recognises(Status::Pending(Role::Ceo)));
        assert_eq!(
            chains
                .for_kind(DocumentKind::MaterialRequest)
                .unwrap()
                .steps(),
            &[Role::ProjectManager, Role::Ceo]
        );
    }
}
