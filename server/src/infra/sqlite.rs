//! SQLite database layer

use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

/// Initialize the database connection pool and apply migrations
pub async fn init_pool(database_url: &str) -> anyhow::Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(path) = database_url.strip_prefix("sqlite:") {
        if let Some(path) = path.split('?').next() {
            if let Some(parent) = std::path::Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    // Enable WAL mode for better concurrent performance
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

#[cfg(test)]
pub(crate) mod testing {
    use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

    use crate::domain::types::{Agent, AgentConfig, Project, User};

    /// Access level that grants the create-workspace capability
    pub const DEVELOPER: i64 = 30;

    pub async fn create_test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create test pool");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        pool
    }

    /// Rows every create scenario starts from
    pub struct Fixtures {
        pub user: User,
        pub project: Project,
        pub agent: Agent,
        pub agent_config: AgentConfig,
    }

    pub async fn seed(pool: &SqlitePool) -> Fixtures {
        let user_id = sqlx::query(
            "INSERT INTO users (username, name, email) VALUES ('jdoe', 'Jane Doe', 'jdoe@example.com')",
        )
        .execute(pool)
        .await
        .expect("Failed to insert user")
        .last_insert_rowid();

        let project_id = sqlx::query(
            r#"
            INSERT INTO projects (name, path, full_path, http_url_to_repo)
            VALUES ('Test Project', 'test-project', 'test-group/test-project',
                    'http://localhost/test-group/test-project.git')
            "#,
        )
        .execute(pool)
        .await
        .expect("Failed to insert project")
        .last_insert_rowid();

        sqlx::query("INSERT INTO project_members (project_id, user_id, access_level) VALUES (?, ?, ?)")
            .bind(project_id)
            .bind(user_id)
            .bind(DEVELOPER)
            .execute(pool)
            .await
            .expect("Failed to insert membership");

        let agent_id = sqlx::query("INSERT INTO cluster_agents (name, project_id) VALUES ('remotedev', ?)")
            .bind(project_id)
            .execute(pool)
            .await
            .expect("Failed to insert agent")
            .last_insert_rowid();

        let config_id = sqlx::query(
            "INSERT INTO remote_development_agent_configs (cluster_agent_id, enabled, dns_zone) VALUES (?, 1, 'workspaces.localdev.me')",
        )
        .bind(agent_id)
        .execute(pool)
        .await
        .expect("Failed to insert agent config")
        .last_insert_rowid();

        Fixtures {
            user: User {
                id: user_id,
                username: "jdoe".to_string(),
                name: "Jane Doe".to_string(),
                email: "jdoe@example.com".to_string(),
            },
            project: Project {
                id: project_id,
                name: "Test Project".to_string(),
                path: "test-project".to_string(),
                full_path: "test-group/test-project".to_string(),
                http_url_to_repo: "http://localhost/test-group/test-project.git".to_string(),
            },
            agent: Agent {
                id: agent_id,
                name: "remotedev".to_string(),
                project_id,
            },
            agent_config: AgentConfig {
                id: config_id,
                agent_id,
                enabled: true,
                dns_zone: "workspaces.localdev.me".to_string(),
            },
        }
    }

    pub async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
        let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(pool)
            .await
            .expect("Failed to count rows");
        count
    }
}
