//! Error types for the remote development server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Infrastructure and lookup errors.
///
/// Failures of the workspace create pipeline that are caused by user input
/// are not represented here; see `service::create::CreateFailure`.
#[derive(Debug, Error)]
pub enum Error {
    // Lookup errors (2000-2999)
    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error("Workspace not found: {0}")]
    WorkspaceNotFound(String),

    // Authentication errors (3000-3999)
    #[error("Authentication required")]
    AuthenticationRequired,

    // Infrastructure errors (6000-6999)
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Git error: {0}")]
    GitError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    // General errors (1000-1999)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get the error code
    pub fn code(&self) -> u32 {
        match self {
            // Lookup errors (2000-2999)
            Error::UserNotFound(_) => 2001,
            Error::ProjectNotFound(_) => 2002,
            Error::AgentNotFound(_) => 2003,
            Error::WorkspaceNotFound(_) => 2004,

            // Authentication errors (3000-3999)
            Error::AuthenticationRequired => 3001,

            // Infrastructure errors (6000-6999)
            Error::DatabaseError(_) => 6001,
            Error::GitError(_) => 6002,
            Error::SerializationError(_) => 6003,

            // General errors (1000-1999)
            Error::Internal(_) => 1003,
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::ProjectNotFound(_) | Error::AgentNotFound(_) | Error::WorkspaceNotFound(_) => {
                StatusCode::NOT_FOUND
            }

            Error::UserNotFound(_) | Error::AuthenticationRequired => StatusCode::UNAUTHORIZED,

            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            code: self.code(),
            message: self.to_string(),
            details: None,
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Error::DatabaseError(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for Error {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Error::DatabaseError(err.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            Error::WorkspaceNotFound("1".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            Error::AuthenticationRequired.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            Error::DatabaseError("locked".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_codes_are_grouped_by_category() {
        assert_eq!(Error::ProjectNotFound("p".to_string()).code(), 2002);
        assert_eq!(Error::GitError("boom".to_string()).code(), 6002);
        assert_eq!(Error::Internal("bad".to_string()).code(), 1003);
    }
}
