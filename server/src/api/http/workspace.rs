//! Workspace HTTP handlers

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::domain::types::User;
use crate::domain::workspace::Workspace;
use crate::service::create::{CreateResponse, ErrorReason};
use crate::service::workspace::CreateWorkspaceParams;
use crate::{AppState, Error, Result};

/// Header identifying the user a request acts for
pub const USER_ID_HEADER: &str = "x-user-id";

// ==================== Request/Response Types ====================

/// Create workspace request
#[derive(Debug, Deserialize)]
pub struct CreateWorkspaceRequest {
    pub agent_id: i64,
    pub project_id: i64,
    pub editor: String,
    pub max_hours_before_termination: i64,
    pub desired_state: String,
    pub devfile_ref: String,
    pub devfile_path: String,
}

/// List workspaces response
#[derive(Debug, Serialize)]
pub struct ListWorkspacesResponse {
    pub workspaces: Vec<Workspace>,
    pub total: usize,
}

// ==================== Handlers ====================

async fn current_user(state: &AppState, headers: &HeaderMap) -> Result<User> {
    let user_id = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<i64>().ok())
        .ok_or(Error::AuthenticationRequired)?;

    state.workspace_service.current_user(user_id).await
}

/// Create a new workspace from a devfile in the project repository
pub async fn create_workspace(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateWorkspaceRequest>,
) -> Result<(StatusCode, Json<CreateResponse>)> {
    let user = current_user(&state, &headers).await?;

    let params = CreateWorkspaceParams {
        agent_id: req.agent_id,
        project_id: req.project_id,
        editor: req.editor,
        max_hours_before_termination: req.max_hours_before_termination,
        desired_state: req.desired_state,
        devfile_ref: req.devfile_ref,
        devfile_path: req.devfile_path,
    };

    let response = state.workspace_service.create(user, params).await?;
    let status = match &response {
        CreateResponse::Success { .. } => StatusCode::CREATED,
        CreateResponse::Error {
            reason: ErrorReason::Unauthorized,
            ..
        } => StatusCode::UNAUTHORIZED,
        CreateResponse::Error {
            reason: ErrorReason::BadRequest,
            ..
        } => StatusCode::BAD_REQUEST,
    };

    Ok((status, Json(response)))
}

/// List the current user's workspaces
pub async fn list_workspaces(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ListWorkspacesResponse>> {
    let user = current_user(&state, &headers).await?;
    let workspaces = state.workspace_service.list(&user).await?;
    let total = workspaces.len();

    Ok(Json(ListWorkspacesResponse { workspaces, total }))
}

/// Get workspace by ID
pub async fn get_workspace(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<Workspace>> {
    let user = current_user(&state, &headers).await?;
    let workspace = state.workspace_service.get(&user, id).await?;

    Ok(Json(workspace))
}
