//! Users, projects and cluster agents
//!
//! These records are owned by the surrounding platform; the server only reads
//! them to resolve the participants of a create request.

use async_trait::async_trait;
use sqlx::{FromRow, SqlitePool};

use crate::domain::types::{Agent, Project, User};
use crate::error::Result;
use crate::service::create::authorizer::PermissionChecker;

/// Lowest project access level allowed to create workspaces (Developer)
pub const CREATE_WORKSPACE_ACCESS_LEVEL: i64 = 30;

#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    username: String,
    name: String,
    email: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            name: row.name,
            email: row.email,
        }
    }
}

#[derive(Debug, FromRow)]
struct ProjectRow {
    id: i64,
    name: String,
    path: String,
    full_path: String,
    http_url_to_repo: String,
}

impl From<ProjectRow> for Project {
    fn from(row: ProjectRow) -> Self {
        Project {
            id: row.id,
            name: row.name,
            path: row.path,
            full_path: row.full_path,
            http_url_to_repo: row.http_url_to_repo,
        }
    }
}

#[derive(Debug, FromRow)]
struct AgentRow {
    id: i64,
    name: String,
    project_id: i64,
}

impl From<AgentRow> for Agent {
    fn from(row: AgentRow) -> Self {
        Agent {
            id: row.id,
            name: row.name,
            project_id: row.project_id,
        }
    }
}

/// Read access to users, projects, memberships and agents
pub struct IdentityRepository {
    pool: SqlitePool,
}

impl IdentityRepository {
    /// Create a new repository with the given pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_user(&self, id: i64) -> Result<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT id, username, name, email FROM users WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(Into::into))
    }

    pub async fn find_project(&self, id: i64) -> Result<Option<Project>> {
        let row: Option<ProjectRow> = sqlx::query_as(
            "SELECT id, name, path, full_path, http_url_to_repo FROM projects WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    pub async fn find_agent(&self, id: i64) -> Result<Option<Agent>> {
        let row: Option<AgentRow> =
            sqlx::query_as("SELECT id, name, project_id FROM cluster_agents WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(Into::into))
    }

    /// Access level of a user on a project, if they are a member
    pub async fn access_level(&self, project_id: i64, user_id: i64) -> Result<Option<i64>> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT access_level FROM project_members WHERE project_id = ? AND user_id = ?",
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(level,)| level))
    }
}

#[async_trait]
impl PermissionChecker for IdentityRepository {
    async fn can_create_workspace(&self, user: &User, project: &Project) -> Result<bool> {
        let level = self.access_level(project.id, user.id).await?;
        Ok(level.is_some_and(|level| level >= CREATE_WORKSPACE_ACCESS_LEVEL))
    }
}
