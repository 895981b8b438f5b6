//! Infrastructure layer

pub mod agent_config_repository;
pub mod git;
pub mod identity_repository;
pub mod sqlite;
pub mod token_repository;
pub mod variable_repository;
pub mod workspace_repository;
