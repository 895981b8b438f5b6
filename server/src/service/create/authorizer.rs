//! Permission check guarding the create pipeline

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use super::{CreateFailure, CreateRequest, StageResult};
use crate::domain::types::{Project, User};
use crate::error::Result;

/// Answers whether a user may create workspaces for a project
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PermissionChecker: Send + Sync {
    async fn can_create_workspace(&self, user: &User, project: &Project) -> Result<bool>;
}

/// Let the request through only when the capability is enabled and the
/// current user holds the create permission on the target project
pub async fn authorize(
    permissions: &dyn PermissionChecker,
    remote_development_enabled: bool,
    request: CreateRequest,
) -> StageResult<CreateRequest> {
    if !remote_development_enabled {
        return Err(CreateFailure::Unauthorized.into());
    }

    let allowed = permissions
        .can_create_workspace(&request.current_user, &request.params.project)
        .await?;

    if !allowed {
        return Err(CreateFailure::Unauthorized.into());
    }

    Ok(request)
}
