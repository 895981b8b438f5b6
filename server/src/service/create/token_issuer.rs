//! Personal access token issuance for new workspaces

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use sqlx::SqliteConnection;

use super::{CreateFailure, StageResult, TokenIssued, WorkspaceCreated};
use crate::domain::token::{
    token_expiry, IssuedToken, NewPersonalAccessToken, WRITE_REPOSITORY_SCOPE,
};
use crate::infra::token_repository::TokenRepository;
use crate::infra::workspace_repository::WorkspaceRepository;

const TOKEN_PREFIX: &str = "glpat-";
const TOKEN_RANDOM_LENGTH: usize = 20;

/// A new random token value
pub fn generate_token_value() -> String {
    let random: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_RANDOM_LENGTH)
        .map(char::from)
        .collect();
    format!("{}{}", TOKEN_PREFIX, random)
}

/// Issue a `write_repository` token for the workspace owner that outlives
/// the workspace, and link it to the workspace
pub async fn issue(conn: &mut SqliteConnection, created: WorkspaceCreated) -> StageResult<TokenIssued> {
    let params = &created.request.params;
    let new_token = NewPersonalAccessToken {
        user_id: params.user.id,
        name: created.workspace.name.clone(),
        scopes: vec![WRITE_REPOSITORY_SCOPE.to_string()],
        impersonation: false,
        expires_at: token_expiry(Utc::now(), params.max_hours_before_termination),
    };

    let errors = new_token.validate();
    let expires_at = match new_token.expires_at {
        Some(expires_at) if errors.is_empty() => expires_at,
        _ => return Err(CreateFailure::PersonalAccessTokenModelCreateFailed(errors).into()),
    };

    let value = generate_token_value();
    let token = TokenRepository::insert(
        conn,
        new_token.user_id,
        &new_token.name,
        &new_token.scopes,
        new_token.impersonation,
        expires_at,
        &value,
    )
    .await?;

    WorkspaceRepository::set_personal_access_token(conn, created.workspace.id, token.id).await?;
    let workspace = WorkspaceRepository::fetch(conn, created.workspace.id).await?;

    Ok(TokenIssued {
        request: created.request,
        workspace,
        personal_access_token: IssuedToken { token, value },
    })
}
