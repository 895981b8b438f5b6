//! Workspace domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::types::FieldError;

/// Port the injected editor listens on inside the workspace
pub const WORKSPACE_EDITOR_PORT: u16 = 60001;

/// The only editor that can currently be injected
pub const SUPPORTED_EDITOR: &str = "webide";

/// Workspace state, used for both desired and actual state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkspaceState {
    CreationRequested,
    Starting,
    Running,
    Stopping,
    Stopped,
    Terminating,
    Terminated,
    Failed,
    Error,
    RestartRequested,
    Unknown,
}

/// States a user may ask a workspace to be in
pub const VALID_DESIRED_STATES: [WorkspaceState; 4] = [
    WorkspaceState::Running,
    WorkspaceState::Stopped,
    WorkspaceState::Terminated,
    WorkspaceState::RestartRequested,
];

impl WorkspaceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkspaceState::CreationRequested => "CreationRequested",
            WorkspaceState::Starting => "Starting",
            WorkspaceState::Running => "Running",
            WorkspaceState::Stopping => "Stopping",
            WorkspaceState::Stopped => "Stopped",
            WorkspaceState::Terminating => "Terminating",
            WorkspaceState::Terminated => "Terminated",
            WorkspaceState::Failed => "Failed",
            WorkspaceState::Error => "Error",
            WorkspaceState::RestartRequested => "RestartRequested",
            WorkspaceState::Unknown => "Unknown",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "CreationRequested" => Some(WorkspaceState::CreationRequested),
            "Starting" => Some(WorkspaceState::Starting),
            "Running" => Some(WorkspaceState::Running),
            "Stopping" => Some(WorkspaceState::Stopping),
            "Stopped" => Some(WorkspaceState::Stopped),
            "Terminating" => Some(WorkspaceState::Terminating),
            "Terminated" => Some(WorkspaceState::Terminated),
            "Failed" => Some(WorkspaceState::Failed),
            "Error" => Some(WorkspaceState::Error),
            "RestartRequested" => Some(WorkspaceState::RestartRequested),
            "Unknown" => Some(WorkspaceState::Unknown),
            _ => None,
        }
    }

    /// Check if a user may request this state
    pub fn is_valid_desired_state(&self) -> bool {
        VALID_DESIRED_STATES.contains(self)
    }
}

/// Workspace entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: i64,
    pub user_id: i64,
    pub project_id: i64,
    pub agent_id: i64,
    pub name: String,
    pub namespace: String,
    pub desired_state: WorkspaceState,
    pub actual_state: WorkspaceState,
    pub editor: String,
    pub max_hours_before_termination: i64,
    pub devfile_ref: String,
    pub devfile_path: String,
    /// Devfile as fetched from the repository
    pub devfile: String,
    /// Devfile after flattening and component injection
    pub processed_devfile: String,
    pub url: String,
    pub dns_zone: String,
    pub personal_access_token_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Unsaved workspace record, validated before insertion
#[derive(Debug, Clone, PartialEq)]
pub struct NewWorkspace {
    pub user_id: i64,
    pub project_id: i64,
    pub agent_id: i64,
    pub name: String,
    pub namespace: String,
    /// Raw requested state, checked by [`NewWorkspace::validate`]
    pub desired_state: String,
    pub editor: String,
    pub max_hours_before_termination: i64,
    pub devfile_ref: String,
    pub devfile_path: String,
    pub devfile: String,
    pub processed_devfile: String,
    pub url: String,
    pub dns_zone: String,
}

impl NewWorkspace {
    /// Model validations; an empty list means the record can be saved
    pub fn validate(&self, max_hours_limit: i64) -> Vec<FieldError> {
        let mut errors = Vec::new();

        if self.editor != SUPPORTED_EDITOR {
            errors.push(FieldError::new(
                "editor",
                format!("'{}' is currently the only supported editor", SUPPORTED_EDITOR),
            ));
        }

        match WorkspaceState::from_str(&self.desired_state) {
            Some(state) if state.is_valid_desired_state() => {}
            _ => errors.push(FieldError::new(
                "desired_state",
                "is not included in the list",
            )),
        }

        if self.max_hours_before_termination <= 0 {
            errors.push(FieldError::new(
                "max_hours_before_termination",
                "must be greater than 0",
            ));
        } else if self.max_hours_before_termination > max_hours_limit {
            errors.push(FieldError::new(
                "max_hours_before_termination",
                format!("must be less than or equal to {}", max_hours_limit),
            ));
        }

        if self.devfile_ref.trim().is_empty() {
            errors.push(FieldError::new("devfile_ref", "can't be blank"));
        }

        if self.devfile_path.trim().is_empty() {
            errors.push(FieldError::new("devfile_path", "can't be blank"));
        }

        if self.dns_zone.trim().is_empty() {
            errors.push(FieldError::new("dns_zone", "can't be blank"));
        }

        errors
    }
}

/// `workspace-<agent_id>-<user_id>-<suffix>`
pub fn workspace_name(agent_id: i64, user_id: i64, suffix: &str) -> String {
    format!("workspace-{}-{}-{}", agent_id, user_id, suffix)
}

/// `gl-rd-ns-<agent_id>-<user_id>-<suffix>`
pub fn workspace_namespace(agent_id: i64, user_id: i64, suffix: &str) -> String {
    format!("gl-rd-ns-{}-{}-{}", agent_id, user_id, suffix)
}

/// Editor URL, opening the cloned project folder
pub fn workspace_url(name: &str, dns_zone: &str, mount_path: &str, project_path: &str) -> String {
    format!(
        "https://{}-{}.{}/?folder={}/{}",
        WORKSPACE_EDITOR_PORT, name, dns_zone, mount_path, project_path
    )
}

/// Host template for any port exposed by the workspace
pub fn workspace_domain_template(name: &str, dns_zone: &str) -> String {
    format!("${{PORT}}-{}.{}", name, dns_zone)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_workspace() -> NewWorkspace {
        NewWorkspace {
            user_id: 2,
            project_id: 3,
            agent_id: 1,
            name: workspace_name(1, 2, "abc123"),
            namespace: workspace_namespace(1, 2, "abc123"),
            desired_state: "Running".to_string(),
            editor: "webide".to_string(),
            max_hours_before_termination: 24,
            devfile_ref: "main".to_string(),
            devfile_path: ".devfile.yaml".to_string(),
            devfile: String::new(),
            processed_devfile: String::new(),
            url: String::new(),
            dns_zone: "workspaces.localdev.me".to_string(),
        }
    }

    #[test]
    fn test_generated_identifiers_are_reproducible() {
        assert_eq!(workspace_name(1, 2, "abc123"), "workspace-1-2-abc123");
        assert_eq!(workspace_name(1, 2, "abc123"), workspace_name(1, 2, "abc123"));
        assert_eq!(workspace_namespace(1, 2, "abc123"), "gl-rd-ns-1-2-abc123");
        assert_ne!(workspace_name(1, 2, "abc123"), workspace_name(1, 2, "abc124"));
    }

    #[test]
    fn test_workspace_url() {
        assert_eq!(
            workspace_url(
                "workspace-1-2-abc123",
                "workspaces.localdev.me",
                "/projects",
                "test-project"
            ),
            "https://60001-workspace-1-2-abc123.workspaces.localdev.me/?folder=/projects/test-project"
        );
    }

    #[test]
    fn test_domain_template() {
        assert_eq!(
            workspace_domain_template("workspace-1-2-abc123", "workspaces.localdev.me"),
            "${PORT}-workspace-1-2-abc123.workspaces.localdev.me"
        );
    }

    #[test]
    fn test_state_round_trip() {
        for state in VALID_DESIRED_STATES {
            assert_eq!(WorkspaceState::from_str(state.as_str()), Some(state));
        }
        assert_eq!(WorkspaceState::from_str("running"), None);
        assert!(!WorkspaceState::CreationRequested.is_valid_desired_state());
    }

    #[test]
    fn test_valid_workspace_has_no_errors() {
        assert!(new_workspace().validate(120).is_empty());
    }

    #[test]
    fn test_invalid_desired_state() {
        let workspace = NewWorkspace {
            desired_state: "Sleeping".to_string(),
            ..new_workspace()
        };
        let errors = workspace.validate(120);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].to_string(), "Desired state is not included in the list");
    }

    #[test]
    fn test_creation_requested_is_not_a_desired_state() {
        let workspace = NewWorkspace {
            desired_state: "CreationRequested".to_string(),
            ..new_workspace()
        };
        assert_eq!(workspace.validate(120)[0].field, "desired_state");
    }

    #[test]
    fn test_unsupported_editor_and_too_many_hours() {
        let workspace = NewWorkspace {
            editor: "vim".to_string(),
            max_hours_before_termination: 121,
            ..new_workspace()
        };
        let messages: Vec<String> = workspace
            .validate(120)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            messages,
            vec![
                "Editor 'webide' is currently the only supported editor".to_string(),
                "Max hours before termination must be less than or equal to 120".to_string(),
            ]
        );
    }
}
