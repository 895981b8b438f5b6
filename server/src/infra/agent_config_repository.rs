//! Remote development agent configuration registry

use async_trait::async_trait;
use sqlx::{FromRow, SqlitePool};

use crate::domain::types::AgentConfig;
use crate::error::Result;
use crate::service::create::devfile_fetcher::AgentConfigLookup;

#[derive(Debug, FromRow)]
struct AgentConfigRow {
    id: i64,
    cluster_agent_id: i64,
    enabled: bool,
    dns_zone: String,
}

impl From<AgentConfigRow> for AgentConfig {
    fn from(row: AgentConfigRow) -> Self {
        AgentConfig {
            id: row.id,
            agent_id: row.cluster_agent_id,
            enabled: row.enabled,
            dns_zone: row.dns_zone,
        }
    }
}

/// Agent configuration repository
pub struct AgentConfigRepository {
    pool: SqlitePool,
}

impl AgentConfigRepository {
    /// Create a new repository with the given pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AgentConfigLookup for AgentConfigRepository {
    async fn find_by_agent(&self, agent_id: i64) -> Result<Option<AgentConfig>> {
        let row: Option<AgentConfigRow> = sqlx::query_as(
            r#"
            SELECT id, cluster_agent_id, enabled, dns_zone
            FROM remote_development_agent_configs
            WHERE cluster_agent_id = ?
            "#,
        )
        .bind(agent_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }
}
