//! Workspace create pipeline
//!
//! A create request travels through a fixed sequence of stages. Each stage
//! consumes the context produced by the previous one and either returns a
//! richer context or halts the pipeline with a [`StageError`]:
//!
//! ```text
//! authorize -> fetch -> validate (pre flatten) -> flatten -> validate (post flatten)
//!   -> define volume -> inject volume -> inject editor -> inject project cloner
//!   -> create workspace -> issue token -> create variables
//! ```
//!
//! The last three stages share one database transaction, so a halted request
//! never leaves a partial workspace behind.

pub mod authorizer;
pub mod creator;
pub mod devfile_fetcher;
pub mod editor_injector;
pub mod flattener;
pub mod post_flatten_validator;
pub mod pre_flatten_validator;
pub mod project_cloner_injector;
pub mod token_issuer;
pub mod variables;
pub mod volume;

use std::sync::Arc;

use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::domain::devfile::DevfileDocument;
use crate::domain::token::{IssuedToken, PersonalAccessToken};
use crate::domain::types::{full_messages, Agent, AgentConfig, FieldError, Project, User};
use crate::domain::variable::WorkspaceVariable;
use crate::domain::workspace::Workspace;
use crate::error::Error;

use self::authorizer::PermissionChecker;
use self::creator::NameSuffixSource;
use self::devfile_fetcher::{AgentConfigLookup, RepositoryFiles};
use self::volume::VolumeMount;

/// Parameters of a create request, with the referenced records resolved
#[derive(Debug, Clone, PartialEq)]
pub struct CreateParams {
    pub agent: Agent,
    pub user: User,
    pub project: Project,
    pub editor: String,
    pub max_hours_before_termination: i64,
    pub desired_state: String,
    pub devfile_ref: String,
    pub devfile_path: String,
}

/// Input of the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct CreateRequest {
    pub current_user: User,
    pub params: CreateParams,
}

/// Context after the devfile was loaded from the project
#[derive(Debug, Clone)]
pub struct DevfileFetched {
    pub request: CreateRequest,
    pub agent_config: AgentConfig,
    /// Devfile text exactly as stored in the repository
    pub devfile_yaml: String,
    pub devfile: DevfileDocument,
}

/// Context after flattening
#[derive(Debug, Clone)]
pub struct DevfileFlattened {
    pub request: CreateRequest,
    pub agent_config: AgentConfig,
    pub devfile_yaml: String,
    pub processed_devfile: DevfileDocument,
}

/// Context during volume definition and component injection
#[derive(Debug, Clone)]
pub struct DevfilePrepared {
    pub request: CreateRequest,
    pub agent_config: AgentConfig,
    pub devfile_yaml: String,
    pub processed_devfile: DevfileDocument,
    pub volume: VolumeMount,
}

/// Context after the workspace row was inserted
#[derive(Debug, Clone)]
pub struct WorkspaceCreated {
    pub request: CreateRequest,
    pub workspace: Workspace,
}

/// Context after the workspace token was issued
#[derive(Debug, Clone)]
pub struct TokenIssued {
    pub request: CreateRequest,
    pub workspace: Workspace,
    pub personal_access_token: IssuedToken,
}

/// Final context of a successful create
#[derive(Debug, Clone)]
pub struct CreateCompleted {
    pub workspace: Workspace,
    pub personal_access_token: PersonalAccessToken,
    pub workspace_variables: Vec<WorkspaceVariable>,
}

/// User-facing reasons a create request is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CreateFailure {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Workspace create params validation failed: {0}")]
    ParamsValidationFailed(String),

    #[error("Workspace create devfile load failed: {0}")]
    DevfileLoadFailed(String),

    #[error("Workspace create devfile yaml parse failed: {0}")]
    DevfileYamlParseFailed(String),

    #[error("Workspace create pre flatten devfile validation failed: {0}")]
    PreFlattenDevfileValidationFailed(String),

    #[error("Workspace create devfile flatten failed: {0}")]
    DevfileFlattenFailed(String),

    #[error("Workspace create post flatten devfile validation failed: {0}")]
    PostFlattenDevfileValidationFailed(String),

    #[error("Workspace create failed: {}", full_messages(.0))]
    WorkspaceCreateFailed(Vec<FieldError>),

    #[error("Personal access token model create failed: {}", full_messages(.0))]
    PersonalAccessTokenModelCreateFailed(Vec<FieldError>),

    #[error("Workspace variables model create failed: {}", full_messages(.0))]
    WorkspaceVariablesModelCreateFailed(Vec<FieldError>),
}

impl CreateFailure {
    pub fn reason(&self) -> ErrorReason {
        match self {
            CreateFailure::Unauthorized => ErrorReason::Unauthorized,
            _ => ErrorReason::BadRequest,
        }
    }

    /// Structured model errors, when the failure came from a model validation
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            CreateFailure::WorkspaceCreateFailed(errors)
            | CreateFailure::PersonalAccessTokenModelCreateFailed(errors)
            | CreateFailure::WorkspaceVariablesModelCreateFailed(errors) => errors,
            _ => &[],
        }
    }

    /// Stable name of the failure, for logs
    pub fn kind(&self) -> &'static str {
        match self {
            CreateFailure::Unauthorized => "Unauthorized",
            CreateFailure::ParamsValidationFailed(_) => "ParamsValidationFailed",
            CreateFailure::DevfileLoadFailed(_) => "DevfileLoadFailed",
            CreateFailure::DevfileYamlParseFailed(_) => "DevfileYamlParseFailed",
            CreateFailure::PreFlattenDevfileValidationFailed(_) => {
                "PreFlattenDevfileValidationFailed"
            }
            CreateFailure::DevfileFlattenFailed(_) => "DevfileFlattenFailed",
            CreateFailure::PostFlattenDevfileValidationFailed(_) => {
                "PostFlattenDevfileValidationFailed"
            }
            CreateFailure::WorkspaceCreateFailed(_) => "WorkspaceCreateFailed",
            CreateFailure::PersonalAccessTokenModelCreateFailed(_) => {
                "PersonalAccessTokenModelCreateFailed"
            }
            CreateFailure::WorkspaceVariablesModelCreateFailed(_) => {
                "WorkspaceVariablesModelCreateFailed"
            }
        }
    }
}

/// Why a stage halted the pipeline
#[derive(Debug, Error)]
pub enum StageError {
    /// The request was rejected
    #[error(transparent)]
    Failed(#[from] CreateFailure),

    /// The server could not process the request
    #[error(transparent)]
    Internal(#[from] Error),
}

impl From<sqlx::Error> for StageError {
    fn from(err: sqlx::Error) -> Self {
        StageError::Internal(err.into())
    }
}

/// Result type of a pipeline stage
pub type StageResult<T> = std::result::Result<T, StageError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorReason {
    Unauthorized,
    BadRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatePayload {
    pub workspace: Workspace,
}

/// Normalized outcome of a create request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CreateResponse {
    Success {
        payload: CreatePayload,
    },
    Error {
        message: String,
        reason: ErrorReason,
    },
}

impl From<CreateFailure> for CreateResponse {
    fn from(failure: CreateFailure) -> Self {
        CreateResponse::Error {
            message: failure.to_string(),
            reason: failure.reason(),
        }
    }
}

impl From<CreateCompleted> for CreateResponse {
    fn from(completed: CreateCompleted) -> Self {
        CreateResponse::Success {
            payload: CreatePayload {
                workspace: completed.workspace,
            },
        }
    }
}

/// Collaborators the pipeline reaches outside of itself
pub struct CreatePipeline {
    pool: SqlitePool,
    config: Arc<Config>,
    permissions: Arc<dyn PermissionChecker>,
    agent_configs: Arc<dyn AgentConfigLookup>,
    repository_files: Arc<dyn RepositoryFiles>,
    name_suffixes: Arc<dyn NameSuffixSource>,
}

impl CreatePipeline {
    pub fn new(
        pool: SqlitePool,
        config: Arc<Config>,
        permissions: Arc<dyn PermissionChecker>,
        agent_configs: Arc<dyn AgentConfigLookup>,
        repository_files: Arc<dyn RepositoryFiles>,
        name_suffixes: Arc<dyn NameSuffixSource>,
    ) -> Self {
        Self {
            pool,
            config,
            permissions,
            agent_configs,
            repository_files,
            name_suffixes,
        }
    }

    /// Run a create request and normalize its outcome.
    ///
    /// Rejections become a [`CreateResponse::Error`]; only infrastructure
    /// failures are returned as `Err`.
    pub async fn main(&self, request: CreateRequest) -> crate::Result<CreateResponse> {
        info!(
            "Creating workspace for user {} on agent {} from {}@{}",
            request.current_user.id,
            request.params.agent.id,
            request.params.devfile_path,
            request.params.devfile_ref
        );

        match self.run(request).await {
            Ok(completed) => {
                info!(
                    "Workspace {} created in namespace {}",
                    completed.workspace.name, completed.workspace.namespace
                );
                Ok(completed.into())
            }
            Err(StageError::Failed(failure)) => {
                warn!("Workspace create halted ({}): {}", failure.kind(), failure);
                Ok(failure.into())
            }
            Err(StageError::Internal(e)) => Err(e),
        }
    }

    async fn run(&self, request: CreateRequest) -> StageResult<CreateCompleted> {
        let config = self.config.as_ref();

        let request = authorizer::authorize(
            self.permissions.as_ref(),
            config.remote_development_enabled,
            request,
        )
        .await?;
        debug!("Authorized");

        let fetched = devfile_fetcher::fetch(
            self.agent_configs.as_ref(),
            self.repository_files.as_ref(),
            request,
        )
        .await?;
        debug!("Devfile fetched");

        pre_flatten_validator::validate(&fetched.devfile)?;
        let flattened = flattener::flatten(fetched)?;
        post_flatten_validator::validate(&flattened.processed_devfile)?;
        debug!("Devfile flattened and validated");

        let prepared = volume::define(flattened, config);
        let prepared = volume::inject(prepared, config);
        let prepared = editor_injector::inject(prepared, config);
        let prepared = project_cloner_injector::inject(prepared, config);
        debug!("Platform components injected");

        let mut tx = self.pool.begin().await?;

        let created = creator::create(&mut tx, self.name_suffixes.as_ref(), config, prepared).await?;
        let issued = token_issuer::issue(&mut tx, created).await?;
        let completed = variables::create(&mut tx, issued).await?;

        tx.commit().await?;

        Ok(completed)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::infra::sqlite::testing::Fixtures;

    /// Minimal devfile accepted by every stage
    pub const VALID_DEVFILE: &str = r#"schemaVersion: 2.2.0
components:
  - name: tooling-container
    attributes:
      gl/inject-editor: true
    container:
      image: quay.io/mloriedo/universal-developer-image:ubi8-dw-demo
"#;

    pub fn request(fixtures: &Fixtures) -> CreateRequest {
        CreateRequest {
            current_user: fixtures.user.clone(),
            params: CreateParams {
                agent: fixtures.agent.clone(),
                user: fixtures.user.clone(),
                project: fixtures.project.clone(),
                editor: "webide".to_string(),
                max_hours_before_termination: 24,
                desired_state: "Running".to_string(),
                devfile_ref: "main".to_string(),
                devfile_path: ".devfile.yaml".to_string(),
            },
        }
    }

    pub fn prepared(fixtures: &Fixtures, devfile: &str, config: &Config) -> DevfilePrepared {
        let fetched = DevfileFetched {
            request: request(fixtures),
            agent_config: fixtures.agent_config.clone(),
            devfile_yaml: devfile.to_string(),
            devfile: DevfileDocument::parse(devfile).expect("Failed to parse devfile"),
        };
        let flattened = flattener::flatten(fetched).expect("Failed to flatten devfile");
        volume::define(flattened, config)
    }
}
