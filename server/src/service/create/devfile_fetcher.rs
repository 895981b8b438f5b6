//! Load and parse the devfile named by a create request

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use super::{CreateFailure, CreateRequest, DevfileFetched, StageResult};
use crate::domain::devfile::DevfileDocument;
use crate::domain::types::{AgentConfig, Project};
use crate::error::Result;

/// Remote development configuration registered per cluster agent
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AgentConfigLookup: Send + Sync {
    async fn find_by_agent(&self, agent_id: i64) -> Result<Option<AgentConfig>>;
}

/// Read access to files in project repositories
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RepositoryFiles: Send + Sync {
    /// Content of `path` at `git_ref`, `None` when there is no such blob
    async fn read_file(&self, project: &Project, git_ref: &str, path: &str) -> Result<Option<String>>;
}

pub async fn fetch(
    agent_configs: &dyn AgentConfigLookup,
    repository_files: &dyn RepositoryFiles,
    request: CreateRequest,
) -> StageResult<DevfileFetched> {
    let params = &request.params;

    let agent_config = agent_configs
        .find_by_agent(params.agent.id)
        .await?
        .ok_or_else(|| {
            CreateFailure::ParamsValidationFailed(format!(
                "No RemoteDevelopmentAgentConfig found for agent '{}'",
                params.agent.name
            ))
        })?;

    if !agent_config.enabled {
        return Err(CreateFailure::ParamsValidationFailed(format!(
            "RemoteDevelopmentAgentConfig for agent '{}' is not enabled",
            params.agent.name
        ))
        .into());
    }

    if params.devfile_ref.starts_with('-') {
        return Err(CreateFailure::DevfileLoadFailed(format!(
            "Devfile ref '{}' is not a valid git ref",
            params.devfile_ref
        ))
        .into());
    }

    let devfile_yaml = repository_files
        .read_file(&params.project, &params.devfile_ref, &params.devfile_path)
        .await?
        .ok_or_else(|| {
            CreateFailure::DevfileLoadFailed("Devfile could not be loaded from project".to_string())
        })?;

    let devfile = DevfileDocument::parse(&devfile_yaml).map_err(|e| {
        CreateFailure::DevfileYamlParseFailed(format!("Devfile YAML could not be parsed: {}", e))
    })?;

    Ok(DevfileFetched {
        request,
        agent_config,
        devfile_yaml,
        devfile,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::sqlite::testing::{create_test_pool, seed, Fixtures};
    use crate::service::create::testing::{request, VALID_DEVFILE};
    use crate::service::create::StageError;

    fn agent_configs(fixtures: &Fixtures) -> MockAgentConfigLookup {
        let config = fixtures.agent_config.clone();
        let mut lookup = MockAgentConfigLookup::new();
        lookup
            .expect_find_by_agent()
            .returning(move |_| Ok(Some(config.clone())));
        lookup
    }

    fn failure(result: StageResult<DevfileFetched>) -> CreateFailure {
        match result {
            Err(StageError::Failed(failure)) => failure,
            Err(StageError::Internal(e)) => panic!("unexpected internal error: {}", e),
            Ok(_) => panic!("expected a failure"),
        }
    }

    #[tokio::test]
    async fn test_fetch_reads_devfile_at_ref() {
        let pool = create_test_pool().await;
        let fixtures = seed(&pool).await;

        let mut files = MockRepositoryFiles::new();
        files
            .expect_read_file()
            .withf(|project, git_ref, path| {
                project.full_path == "test-group/test-project"
                    && git_ref == "main"
                    && path == ".devfile.yaml"
            })
            .times(1)
            .returning(|_, _, _| Ok(Some(VALID_DEVFILE.to_string())));

        let fetched = fetch(&agent_configs(&fixtures), &files, request(&fixtures))
            .await
            .expect("Failed to fetch devfile");

        assert_eq!(fetched.devfile_yaml, VALID_DEVFILE);
        assert_eq!(fetched.agent_config, fixtures.agent_config);
        assert_eq!(fetched.devfile.components().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_agent_config() {
        let pool = create_test_pool().await;
        let fixtures = seed(&pool).await;

        let mut lookup = MockAgentConfigLookup::new();
        lookup.expect_find_by_agent().returning(|_| Ok(None));
        let mut files = MockRepositoryFiles::new();
        files.expect_read_file().never();

        let result = fetch(&lookup, &files, request(&fixtures)).await;
        assert_eq!(
            failure(result),
            CreateFailure::ParamsValidationFailed(
                "No RemoteDevelopmentAgentConfig found for agent 'remotedev'".to_string()
            )
        );
    }

    #[tokio::test]
    async fn test_disabled_agent_config() {
        let pool = create_test_pool().await;
        let fixtures = seed(&pool).await;

        let mut config = fixtures.agent_config.clone();
        config.enabled = false;
        let mut lookup = MockAgentConfigLookup::new();
        lookup
            .expect_find_by_agent()
            .returning(move |_| Ok(Some(config.clone())));
        let mut files = MockRepositoryFiles::new();
        files.expect_read_file().never();

        let result = fetch(&lookup, &files, request(&fixtures)).await;
        assert_eq!(
            failure(result),
            CreateFailure::ParamsValidationFailed(
                "RemoteDevelopmentAgentConfig for agent 'remotedev' is not enabled".to_string()
            )
        );
    }

    #[tokio::test]
    async fn test_missing_blob() {
        let pool = create_test_pool().await;
        let fixtures = seed(&pool).await;

        let mut files = MockRepositoryFiles::new();
        files.expect_read_file().returning(|_, _, _| Ok(None));

        let result = fetch(&agent_configs(&fixtures), &files, request(&fixtures)).await;
        assert_eq!(
            failure(result).to_string(),
            "Workspace create devfile load failed: Devfile could not be loaded from project"
        );
    }

    #[tokio::test]
    async fn test_option_like_ref_is_rejected_before_reading() {
        let pool = create_test_pool().await;
        let fixtures = seed(&pool).await;

        let mut files = MockRepositoryFiles::new();
        files.expect_read_file().never();

        let mut request = request(&fixtures);
        request.params.devfile_ref = "--output=/tmp/devfile".to_string();

        let result = fetch(&agent_configs(&fixtures), &files, request).await;
        assert_eq!(
            failure(result).to_string(),
            "Workspace create devfile load failed: Devfile ref '--output=/tmp/devfile' is not a valid git ref"
        );
    }

    #[tokio::test]
    async fn test_unparseable_yaml() {
        let pool = create_test_pool().await;
        let fixtures = seed(&pool).await;

        let mut files = MockRepositoryFiles::new();
        files
            .expect_read_file()
            .returning(|_, _, _| Ok(Some("schemaVersion: [".to_string())));

        let result = fetch(&agent_configs(&fixtures), &files, request(&fixtures)).await;
        match failure(result) {
            CreateFailure::DevfileYamlParseFailed(message) => {
                assert!(message.starts_with("Devfile YAML could not be parsed: "));
            }
            other => panic!("unexpected failure: {:?}", other),
        }
    }
}
