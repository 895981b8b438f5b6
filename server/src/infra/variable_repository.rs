//! Workspace variable repository

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};

use crate::domain::variable::{NewWorkspaceVariable, VariableType, WorkspaceVariable};
use crate::error::{Error, Result};

#[derive(Debug, FromRow)]
struct VariableRow {
    id: i64,
    workspace_id: i64,
    key: String,
    value: String,
    variable_type: i64,
    created_at: String,
}

impl TryFrom<VariableRow> for WorkspaceVariable {
    type Error = Error;

    fn try_from(row: VariableRow) -> Result<Self> {
        let variable_type = VariableType::from_i64(row.variable_type).ok_or_else(|| {
            Error::Internal(format!("Invalid variable type: {}", row.variable_type))
        })?;

        let created_at = DateTime::parse_from_rfc3339(&row.created_at)
            .map_err(|e| Error::Internal(format!("Failed to parse created_at: {}", e)))?
            .with_timezone(&Utc);

        Ok(WorkspaceVariable {
            id: row.id,
            workspace_id: row.workspace_id,
            key: row.key,
            value: row.value,
            variable_type,
            created_at,
        })
    }
}

/// Workspace variable repository
pub struct VariableRepository {
    pool: SqlitePool,
}

impl VariableRepository {
    /// Create a new repository with the given pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert variables in order, returning the stored rows
    pub async fn insert_all(
        conn: &mut SqliteConnection,
        variables: &[NewWorkspaceVariable],
    ) -> Result<Vec<WorkspaceVariable>> {
        let now = Utc::now().to_rfc3339();
        let mut ids = Vec::with_capacity(variables.len());

        for variable in variables {
            let id = sqlx::query(
                r#"
                INSERT INTO workspace_variables (workspace_id, key, value, variable_type, created_at)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(variable.workspace_id)
            .bind(&variable.key)
            .bind(&variable.value)
            .bind(variable.variable_type.as_i64())
            .bind(&now)
            .execute(&mut *conn)
            .await?
            .last_insert_rowid();
            ids.push(id);
        }

        let mut stored = Vec::with_capacity(ids.len());
        for id in ids {
            let row: VariableRow = sqlx::query_as(
                r#"
                SELECT id, workspace_id, key, value, variable_type, created_at
                FROM workspace_variables
                WHERE id = ?
                "#,
            )
            .bind(id)
            .fetch_one(&mut *conn)
            .await?;
            stored.push(row.try_into()?);
        }

        Ok(stored)
    }

    /// List the variables of a workspace in insertion order
    pub async fn list_for_workspace(&self, workspace_id: i64) -> Result<Vec<WorkspaceVariable>> {
        let rows: Vec<VariableRow> = sqlx::query_as(
            r#"
            SELECT id, workspace_id, key, value, variable_type, created_at
            FROM workspace_variables
            WHERE workspace_id = ?
            ORDER BY id
            "#,
        )
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }
}
