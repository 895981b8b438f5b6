//! Workspace variables
//!
//! Every workspace gets its token as a file plus a git credential helper that
//! reads it, so git authenticates without the token ever being placed in the
//! environment.

use sqlx::SqliteConnection;

use super::{CreateCompleted, CreateFailure, StageResult, TokenIssued};
use crate::domain::variable::{file_variable_path, NewWorkspaceVariable, VariableType};
use crate::domain::workspace::workspace_domain_template;
use crate::infra::variable_repository::VariableRepository;

const TOKEN_FILE: &str = "gl_token";
const CREDENTIAL_STORE_FILE: &str = "gl_git_credential_store.sh";

const GIT_CREDENTIAL_STORE_SCRIPT: &str = r#"#!/bin/sh
# This is a readonly store so we can exit cleanly when git attempts a store or erase action
if [ "$1" != "get" ];
then
  exit 0
fi

if [ -z "${GL_TOKEN_FILE_PATH}" ];
then
  echo "We could not find the GL_TOKEN_FILE_PATH variable"
  exit 1
fi
password=$(cat ${GL_TOKEN_FILE_PATH})

# The username is derived from the "user.email" configuration item. Ensure it is set.
echo "username=does-not-matter"
echo "password=${password}"
exit 0
"#;

/// The variable set of a workspace, in a fixed order
pub fn build(
    workspace_id: i64,
    workspace_name: &str,
    dns_zone: &str,
    token_value: &str,
    user_name: &str,
    user_email: &str,
) -> Vec<NewWorkspaceVariable> {
    let credential_store_path = file_variable_path(CREDENTIAL_STORE_FILE);

    let file = |key: &str, value: &str| NewWorkspaceVariable {
        workspace_id,
        key: key.to_string(),
        value: value.to_string(),
        variable_type: VariableType::File,
    };
    let env = |key: &str, value: &str| NewWorkspaceVariable {
        workspace_id,
        key: key.to_string(),
        value: value.to_string(),
        variable_type: VariableType::EnvVar,
    };

    vec![
        file(TOKEN_FILE, token_value),
        file(CREDENTIAL_STORE_FILE, GIT_CREDENTIAL_STORE_SCRIPT),
        env("GIT_CONFIG_COUNT", "3"),
        env("GIT_CONFIG_KEY_0", "credential.helper"),
        env("GIT_CONFIG_VALUE_0", &credential_store_path),
        env("GIT_CONFIG_KEY_1", "user.name"),
        env("GIT_CONFIG_VALUE_1", user_name),
        env("GIT_CONFIG_KEY_2", "user.email"),
        env("GIT_CONFIG_VALUE_2", user_email),
        env("GL_GIT_CREDENTIAL_STORE_FILE_PATH", &credential_store_path),
        env("GL_TOKEN_FILE_PATH", &file_variable_path(TOKEN_FILE)),
        env(
            "GL_WORKSPACE_DOMAIN_TEMPLATE",
            &workspace_domain_template(workspace_name, dns_zone),
        ),
    ]
}

pub async fn create(conn: &mut SqliteConnection, issued: TokenIssued) -> StageResult<CreateCompleted> {
    let user = &issued.request.params.user;
    let variables = build(
        issued.workspace.id,
        &issued.workspace.name,
        &issued.workspace.dns_zone,
        &issued.personal_access_token.value,
        &user.name,
        &user.email,
    );

    let errors: Vec<_> = variables
        .iter()
        .flat_map(NewWorkspaceVariable::validate)
        .collect();
    if !errors.is_empty() {
        return Err(CreateFailure::WorkspaceVariablesModelCreateFailed(errors).into());
    }

    let workspace_variables = VariableRepository::insert_all(conn, &variables).await?;

    Ok(CreateCompleted {
        workspace: issued.workspace,
        personal_access_token: issued.personal_access_token.token,
        workspace_variables,
    })
}
