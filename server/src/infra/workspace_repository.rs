//! Workspace repository for database operations

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};

use crate::domain::workspace::{NewWorkspace, Workspace, WorkspaceState};
use crate::error::{Error, Result};

const WORKSPACE_COLUMNS: &str = r#"
    id, user_id, project_id, cluster_agent_id, personal_access_token_id, name, namespace,
    desired_state, actual_state, editor, max_hours_before_termination, devfile_ref,
    devfile_path, devfile, processed_devfile, url, dns_zone, created_at, updated_at
"#;

/// Database row for workspace
#[derive(Debug, FromRow)]
struct WorkspaceRow {
    id: i64,
    user_id: i64,
    project_id: i64,
    cluster_agent_id: i64,
    personal_access_token_id: Option<i64>,
    name: String,
    namespace: String,
    desired_state: String,
    actual_state: String,
    editor: String,
    max_hours_before_termination: i64,
    devfile_ref: String,
    devfile_path: String,
    devfile: String,
    processed_devfile: String,
    url: String,
    dns_zone: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<WorkspaceRow> for Workspace {
    type Error = Error;

    fn try_from(row: WorkspaceRow) -> Result<Self> {
        let desired_state = WorkspaceState::from_str(&row.desired_state).ok_or_else(|| {
            Error::Internal(format!("Invalid desired state: {}", row.desired_state))
        })?;

        let actual_state = WorkspaceState::from_str(&row.actual_state).ok_or_else(|| {
            Error::Internal(format!("Invalid actual state: {}", row.actual_state))
        })?;

        let created_at = DateTime::parse_from_rfc3339(&row.created_at)
            .map_err(|e| Error::Internal(format!("Failed to parse created_at: {}", e)))?
            .with_timezone(&Utc);

        let updated_at = DateTime::parse_from_rfc3339(&row.updated_at)
            .map_err(|e| Error::Internal(format!("Failed to parse updated_at: {}", e)))?
            .with_timezone(&Utc);

        Ok(Workspace {
            id: row.id,
            user_id: row.user_id,
            project_id: row.project_id,
            agent_id: row.cluster_agent_id,
            name: row.name,
            namespace: row.namespace,
            desired_state,
            actual_state,
            editor: row.editor,
            max_hours_before_termination: row.max_hours_before_termination,
            devfile_ref: row.devfile_ref,
            devfile_path: row.devfile_path,
            devfile: row.devfile,
            processed_devfile: row.processed_devfile,
            url: row.url,
            dns_zone: row.dns_zone,
            personal_access_token_id: row.personal_access_token_id,
            created_at,
            updated_at,
        })
    }
}

/// Result of inserting a workspace row
#[derive(Debug)]
pub enum InsertOutcome {
    Created(Workspace),
    /// Another workspace already uses the generated name or namespace
    NameTaken,
}

/// Workspace repository for database operations
pub struct WorkspaceRepository {
    pool: SqlitePool,
}

impl WorkspaceRepository {
    /// Create a new repository with the given pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a validated workspace with the given actual state
    pub async fn insert(
        conn: &mut SqliteConnection,
        workspace: &NewWorkspace,
        actual_state: WorkspaceState,
    ) -> Result<InsertOutcome> {
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            r#"
            INSERT INTO workspaces (
                user_id, project_id, cluster_agent_id, name, namespace, desired_state,
                actual_state, editor, max_hours_before_termination, devfile_ref, devfile_path,
                devfile, processed_devfile, url, dns_zone, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(workspace.user_id)
        .bind(workspace.project_id)
        .bind(workspace.agent_id)
        .bind(&workspace.name)
        .bind(&workspace.namespace)
        .bind(&workspace.desired_state)
        .bind(actual_state.as_str())
        .bind(&workspace.editor)
        .bind(workspace.max_hours_before_termination)
        .bind(&workspace.devfile_ref)
        .bind(&workspace.devfile_path)
        .bind(&workspace.devfile)
        .bind(&workspace.processed_devfile)
        .bind(&workspace.url)
        .bind(&workspace.dns_zone)
        .bind(&now)
        .bind(&now)
        .execute(&mut *conn)
        .await;

        let id = match result {
            Ok(done) => done.last_insert_rowid(),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Ok(InsertOutcome::NameTaken);
            }
            Err(e) => return Err(e.into()),
        };

        let workspace = Self::fetch(conn, id).await?;
        Ok(InsertOutcome::Created(workspace))
    }

    /// Link the token issued for a workspace
    pub async fn set_personal_access_token(
        conn: &mut SqliteConnection,
        workspace_id: i64,
        token_id: i64,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE workspaces
            SET personal_access_token_id = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(token_id)
        .bind(Utc::now().to_rfc3339())
        .bind(workspace_id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::WorkspaceNotFound(workspace_id.to_string()));
        }

        Ok(())
    }

    /// Get a workspace by ID on an explicit connection
    pub async fn fetch(conn: &mut SqliteConnection, id: i64) -> Result<Workspace> {
        let row: WorkspaceRow = sqlx::query_as(&format!(
            "SELECT {} FROM workspaces WHERE id = ?",
            WORKSPACE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| Error::WorkspaceNotFound(id.to_string()))?;

        row.try_into()
    }

    /// Get a workspace owned by a user
    pub async fn get_for_user(&self, id: i64, user_id: i64) -> Result<Workspace> {
        let row: WorkspaceRow = sqlx::query_as(&format!(
            "SELECT {} FROM workspaces WHERE id = ? AND user_id = ?",
            WORKSPACE_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::WorkspaceNotFound(id.to_string()))?;

        row.try_into()
    }

    /// List the workspaces of a user, newest first
    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<Workspace>> {
        let rows: Vec<WorkspaceRow> = sqlx::query_as(&format!(
            "SELECT {} FROM workspaces WHERE user_id = ? ORDER BY id DESC",
            WORKSPACE_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::workspace::{workspace_name, workspace_namespace};
    use crate::infra::sqlite::testing::{create_test_pool, seed, Fixtures};

    fn new_workspace(fixtures: &Fixtures, suffix: &str) -> NewWorkspace {
        NewWorkspace {
            user_id: fixtures.user.id,
            project_id: fixtures.project.id,
            agent_id: fixtures.agent.id,
            name: workspace_name(fixtures.agent.id, fixtures.user.id, suffix),
            namespace: workspace_namespace(fixtures.agent.id, fixtures.user.id, suffix),
            desired_state: "Running".to_string(),
            editor: "webide".to_string(),
            max_hours_before_termination: 24,
            devfile_ref: "main".to_string(),
            devfile_path: ".devfile.yaml".to_string(),
            devfile: "schemaVersion: 2.2.0\n".to_string(),
            processed_devfile: "schemaVersion: 2.2.0\ncomponents: []\n".to_string(),
            url: "https://60001-example.workspaces.localdev.me/?folder=/projects/test-project"
                .to_string(),
            dns_zone: fixtures.agent_config.dns_zone.clone(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get_workspace() {
        let pool = create_test_pool().await;
        let fixtures = seed(&pool).await;
        let repo = WorkspaceRepository::new(pool.clone());

        let mut conn = pool.acquire().await.expect("Failed to acquire connection");
        let outcome = WorkspaceRepository::insert(
            &mut conn,
            &new_workspace(&fixtures, "abc123"),
            WorkspaceState::CreationRequested,
        )
        .await
        .expect("Failed to insert workspace");
        drop(conn);

        let workspace = match outcome {
            InsertOutcome::Created(workspace) => workspace,
            InsertOutcome::NameTaken => panic!("unexpected name collision"),
        };
        assert_eq!(workspace.desired_state, WorkspaceState::Running);
        assert_eq!(workspace.actual_state, WorkspaceState::CreationRequested);
        assert_eq!(workspace.personal_access_token_id, None);

        let fetched = repo
            .get_for_user(workspace.id, fixtures.user.id)
            .await
            .expect("Failed to get workspace");
        assert_eq!(fetched, workspace);
    }

    #[tokio::test]
    async fn test_duplicate_name_is_reported_as_taken() {
        let pool = create_test_pool().await;
        let fixtures = seed(&pool).await;

        let mut conn = pool.acquire().await.expect("Failed to acquire connection");
        let workspace = new_workspace(&fixtures, "abc123");
        WorkspaceRepository::insert(&mut conn, &workspace, WorkspaceState::CreationRequested)
            .await
            .expect("Failed to insert workspace");

        let outcome =
            WorkspaceRepository::insert(&mut conn, &workspace, WorkspaceState::CreationRequested)
                .await
                .expect("Failed to insert workspace");
        assert!(matches!(outcome, InsertOutcome::NameTaken));
    }

    #[tokio::test]
    async fn test_list_and_ownership() {
        let pool = create_test_pool().await;
        let fixtures = seed(&pool).await;
        let repo = WorkspaceRepository::new(pool.clone());

        let mut conn = pool.acquire().await.expect("Failed to acquire connection");
        for suffix in ["aaaaaa", "bbbbbb"] {
            WorkspaceRepository::insert(
                &mut conn,
                &new_workspace(&fixtures, suffix),
                WorkspaceState::CreationRequested,
            )
            .await
            .expect("Failed to insert workspace");
        }
        drop(conn);

        let all = repo
            .list_for_user(fixtures.user.id)
            .await
            .expect("Failed to list workspaces");
        assert_eq!(all.len(), 2);
        assert!(all[0].name.ends_with("bbbbbb"));

        let result = repo.get_for_user(all[0].id, fixtures.user.id + 1).await;
        assert!(matches!(result, Err(Error::WorkspaceNotFound(_))));
    }
}
