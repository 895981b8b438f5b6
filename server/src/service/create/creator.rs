//! Workspace record creation

#[cfg(test)]
use mockall::automock;
use rand::Rng;
use sqlx::SqliteConnection;
use tracing::warn;

use super::{CreateFailure, DevfilePrepared, StageResult, WorkspaceCreated};
use crate::config::Config;
use crate::domain::types::FieldError;
use crate::domain::workspace::{
    workspace_name, workspace_namespace, workspace_url, NewWorkspace, WorkspaceState,
};
use crate::infra::workspace_repository::{InsertOutcome, WorkspaceRepository};

const SUFFIX_LENGTH: usize = 6;
const SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Source of the random part of generated workspace names
#[cfg_attr(test, automock)]
pub trait NameSuffixSource: Send + Sync {
    fn next_suffix(&self) -> String;
}

/// Lowercase alphanumeric suffixes from the thread-local RNG
pub struct RandomSuffix;

impl NameSuffixSource for RandomSuffix {
    fn next_suffix(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..SUFFIX_LENGTH)
            .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
            .collect()
    }
}

/// Insert the workspace, generating a fresh name whenever the previous one
/// collides with an existing workspace
pub async fn create(
    conn: &mut SqliteConnection,
    suffixes: &dyn NameSuffixSource,
    config: &Config,
    prepared: DevfilePrepared,
) -> StageResult<WorkspaceCreated> {
    let processed_devfile = prepared.processed_devfile.to_yaml()?;
    let params = &prepared.request.params;
    let attempts = config.name_generation_attempts.max(1);

    for attempt in 1..=attempts {
        let suffix = suffixes.next_suffix();
        let name = workspace_name(params.agent.id, params.user.id, &suffix);
        let new_workspace = NewWorkspace {
            user_id: params.user.id,
            project_id: params.project.id,
            agent_id: params.agent.id,
            namespace: workspace_namespace(params.agent.id, params.user.id, &suffix),
            desired_state: params.desired_state.clone(),
            editor: params.editor.clone(),
            max_hours_before_termination: params.max_hours_before_termination,
            devfile_ref: params.devfile_ref.clone(),
            devfile_path: params.devfile_path.clone(),
            devfile: prepared.devfile_yaml.clone(),
            processed_devfile: processed_devfile.clone(),
            url: workspace_url(
                &name,
                &prepared.agent_config.dns_zone,
                &prepared.volume.path,
                &params.project.path,
            ),
            dns_zone: prepared.agent_config.dns_zone.clone(),
            name,
        };

        let errors = new_workspace.validate(config.max_hours_before_termination_limit);
        if !errors.is_empty() {
            return Err(CreateFailure::WorkspaceCreateFailed(errors).into());
        }

        match WorkspaceRepository::insert(conn, &new_workspace, WorkspaceState::CreationRequested)
            .await?
        {
            InsertOutcome::Created(workspace) => {
                return Ok(WorkspaceCreated {
                    request: prepared.request,
                    workspace,
                });
            }
            InsertOutcome::NameTaken => {
                warn!(
                    "Workspace name {} is taken (attempt {}/{})",
                    new_workspace.name, attempt, attempts
                );
            }
        }
    }

    Err(CreateFailure::WorkspaceCreateFailed(vec![FieldError::new(
        "name",
        "has already been taken",
    )])
    .into())
}
