//! Remote Development Server
//!
//! This server turns devfiles stored in project repositories into
//! workspace records ready to be reconciled by a cluster agent.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::signal;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;
mod domain;
mod error;
mod infra;
mod service;

pub use config::Config;
pub use error::{Error, Result};

use infra::agent_config_repository::AgentConfigRepository;
use infra::git::GitRepositoryFiles;
use infra::identity_repository::IdentityRepository;
use infra::workspace_repository::WorkspaceRepository;
use service::create::creator::RandomSuffix;
use service::create::CreatePipeline;
use service::workspace::WorkspaceService;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub workspace_service: Arc<WorkspaceService>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::load()?;
    let config = Arc::new(config);

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let http_addr: SocketAddr = format!("{}:{}", config.http_host, config.http_port).parse()?;

    info!("Starting Remote Development Server");
    info!("HTTP listening on {}", http_addr);
    if !config.remote_development_enabled {
        info!("Remote development is disabled, create requests will be rejected");
    }

    // Initialize infrastructure
    let pool = infra::sqlite::init_pool(&config.database_url).await?;
    let identity_repository = Arc::new(IdentityRepository::new(pool.clone()));
    let workspace_repository = Arc::new(WorkspaceRepository::new(pool.clone()));
    let agent_config_repository = Arc::new(AgentConfigRepository::new(pool.clone()));
    let repository_files = Arc::new(GitRepositoryFiles::new(
        &config.git_binary,
        &config.repositories_dir,
    ));

    // Initialize services
    let pipeline = Arc::new(CreatePipeline::new(
        pool,
        config.clone(),
        identity_repository.clone(),
        agent_config_repository,
        repository_files,
        Arc::new(RandomSuffix),
    ));

    let workspace_service = Arc::new(WorkspaceService::new(
        identity_repository,
        workspace_repository,
        pipeline,
    ));

    let state = AppState {
        config: config.clone(),
        workspace_service,
    };

    let app = api::http::create_router(state);

    axum::serve(
        tokio::net::TcpListener::bind(http_addr).await?,
        app.into_make_service(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Received shutdown signal");
}
