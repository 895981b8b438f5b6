//! Workspace service

use std::sync::Arc;

use tracing::info;

use crate::domain::types::User;
use crate::domain::workspace::Workspace;
use crate::error::{Error, Result};
use crate::infra::identity_repository::IdentityRepository;
use crate::infra::workspace_repository::WorkspaceRepository;
use crate::service::create::{CreateParams, CreatePipeline, CreateRequest, CreateResponse};

/// Create parameters as received from clients, referencing records by id
#[derive(Debug, Clone)]
pub struct CreateWorkspaceParams {
    pub agent_id: i64,
    pub project_id: i64,
    pub editor: String,
    pub max_hours_before_termination: i64,
    pub desired_state: String,
    pub devfile_ref: String,
    pub devfile_path: String,
}

/// Entry point for creating and reading workspaces
pub struct WorkspaceService {
    identities: Arc<IdentityRepository>,
    workspaces: Arc<WorkspaceRepository>,
    pipeline: Arc<CreatePipeline>,
}

impl WorkspaceService {
    /// Create a new workspace service
    pub fn new(
        identities: Arc<IdentityRepository>,
        workspaces: Arc<WorkspaceRepository>,
        pipeline: Arc<CreatePipeline>,
    ) -> Self {
        Self {
            identities,
            workspaces,
            pipeline,
        }
    }

    /// Resolve the user a request is made on behalf of
    pub async fn current_user(&self, user_id: i64) -> Result<User> {
        self.identities
            .find_user(user_id)
            .await?
            .ok_or_else(|| Error::UserNotFound(user_id.to_string()))
    }

    /// Resolve the referenced records and run the create pipeline
    pub async fn create(
        &self,
        current_user: User,
        params: CreateWorkspaceParams,
    ) -> Result<CreateResponse> {
        let agent = self
            .identities
            .find_agent(params.agent_id)
            .await?
            .ok_or_else(|| Error::AgentNotFound(params.agent_id.to_string()))?;

        let project = self
            .identities
            .find_project(params.project_id)
            .await?
            .ok_or_else(|| Error::ProjectNotFound(params.project_id.to_string()))?;

        info!(
            "User {} requested a workspace for project {}",
            current_user.username, project.full_path
        );

        let request = CreateRequest {
            params: CreateParams {
                agent,
                user: current_user.clone(),
                project,
                editor: params.editor,
                max_hours_before_termination: params.max_hours_before_termination,
                desired_state: params.desired_state,
                devfile_ref: params.devfile_ref,
                devfile_path: params.devfile_path,
            },
            current_user,
        };

        self.pipeline.main(request).await
    }

    /// Get one of the user's workspaces
    pub async fn get(&self, user: &User, id: i64) -> Result<Workspace> {
        self.workspaces.get_for_user(id, user.id).await
    }

    /// List the user's workspaces
    pub async fn list(&self, user: &User) -> Result<Vec<Workspace>> {
        self.workspaces.list_for_user(user.id).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use sqlx::SqlitePool;

    use crate::config::Config;
    use crate::infra::agent_config_repository::AgentConfigRepository;
    use crate::service::create::creator::MockNameSuffixSource;
    use crate::service::create::devfile_fetcher::MockRepositoryFiles;

    /// A service backed by the database, serving `devfile` for every project
    pub fn workspace_service(pool: &SqlitePool, devfile: &'static str) -> WorkspaceService {
        let identities = Arc::new(IdentityRepository::new(pool.clone()));

        let mut files = MockRepositoryFiles::new();
        files
            .expect_read_file()
            .returning(move |_, _, _| Ok(Some(devfile.to_string())));

        let mut suffixes = MockNameSuffixSource::new();
        let mut calls = 0;
        suffixes.expect_next_suffix().returning(move || {
            calls += 1;
            format!("test{:02}", calls)
        });

        let pipeline = CreatePipeline::new(
            pool.clone(),
            Arc::new(Config::default()),
            identities.clone(),
            Arc::new(AgentConfigRepository::new(pool.clone())),
            Arc::new(files),
            Arc::new(suffixes),
        );

        WorkspaceService::new(
            identities,
            Arc::new(WorkspaceRepository::new(pool.clone())),
            Arc::new(pipeline),
        )
    }
}
