//! Server configuration

use serde::Deserialize;

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// HTTP server host
    #[serde(default = "default_http_host")]
    pub http_host: String,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Database URL (SQLite)
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Directory holding bare project repositories as `<full_path>.git`
    #[serde(default = "default_repositories_dir")]
    pub repositories_dir: String,

    /// Git executable used to read devfiles out of project repositories
    #[serde(default = "default_git_binary")]
    pub git_binary: String,

    /// Whether the remote development capability is licensed for this instance
    #[serde(default = "default_remote_development_enabled")]
    pub remote_development_enabled: bool,

    /// Name of the data volume shared by every workspace container
    #[serde(default = "default_workspace_volume_name")]
    pub workspace_volume_name: String,

    /// Mount path of the data volume inside workspace containers
    #[serde(default = "default_workspace_volume_path")]
    pub workspace_volume_path: String,

    /// Requested size of the data volume
    #[serde(default = "default_workspace_volume_size")]
    pub workspace_volume_size: String,

    /// Image that copies the editor into the data volume before start
    #[serde(default = "default_editor_injector_image")]
    pub editor_injector_image: String,

    /// Image that clones the project into the data volume before start
    #[serde(default = "default_project_cloner_image")]
    pub project_cloner_image: String,

    /// Upper bound accepted for `max_hours_before_termination`
    #[serde(default = "default_max_hours_before_termination_limit")]
    pub max_hours_before_termination_limit: i64,

    /// How many random suffixes to try when a generated workspace name collides
    #[serde(default = "default_name_generation_attempts")]
    pub name_generation_attempts: u32,
}

fn default_http_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_database_url() -> String {
    "sqlite:data/remote_development.db?mode=rwc".to_string()
}

fn default_repositories_dir() -> String {
    "/var/lib/remote-dev/repositories".to_string()
}

fn default_git_binary() -> String {
    "git".to_string()
}

fn default_remote_development_enabled() -> bool {
    true
}

fn default_workspace_volume_name() -> String {
    "gl-workspace-data".to_string()
}

fn default_workspace_volume_path() -> String {
    "/projects".to_string()
}

fn default_workspace_volume_size() -> String {
    "15Gi".to_string()
}

fn default_editor_injector_image() -> String {
    "registry.gitlab.com/gitlab-org/gitlab-web-ide-vscode-fork/web-ide-injector:1".to_string()
}

fn default_project_cloner_image() -> String {
    "alpine/git:2.36.3".to_string()
}

fn default_max_hours_before_termination_limit() -> i64 {
    120
}

fn default_name_generation_attempts() -> u32 {
    3
}

impl Config {
    /// Load configuration from `REMOTE_DEV_*` environment variables
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("REMOTE_DEV")
                    .prefix_separator("_")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_host: default_http_host(),
            http_port: default_http_port(),
            database_url: default_database_url(),
            repositories_dir: default_repositories_dir(),
            git_binary: default_git_binary(),
            remote_development_enabled: default_remote_development_enabled(),
            workspace_volume_name: default_workspace_volume_name(),
            workspace_volume_path: default_workspace_volume_path(),
            workspace_volume_size: default_workspace_volume_size(),
            editor_injector_image: default_editor_injector_image(),
            project_cloner_image: default_project_cloner_image(),
            max_hours_before_termination_limit: default_max_hours_before_termination_limit(),
            name_generation_attempts: default_name_generation_attempts(),
        }
    }
}
