//! Workspace variable domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::types::FieldError;

/// Directory file variables are materialised in, inside the workspace
pub const VARIABLES_FILE_DIR: &str = "/.workspace-data/variables/file";

const MAX_KEY_LENGTH: usize = 255;

/// How a variable is exposed to the workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VariableType {
    EnvVar,
    File,
}

impl VariableType {
    pub fn as_i64(&self) -> i64 {
        match self {
            VariableType::EnvVar => 0,
            VariableType::File => 1,
        }
    }

    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(VariableType::EnvVar),
            1 => Some(VariableType::File),
            _ => None,
        }
    }
}

/// Runtime path of a file variable
pub fn file_variable_path(key: &str) -> String {
    format!("{}/{}", VARIABLES_FILE_DIR, key)
}

/// Stored workspace variable
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkspaceVariable {
    pub id: i64,
    pub workspace_id: i64,
    pub key: String,
    #[serde(skip_serializing)]
    pub value: String,
    pub variable_type: VariableType,
    pub created_at: DateTime<Utc>,
}

/// Unsaved workspace variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWorkspaceVariable {
    pub workspace_id: i64,
    pub key: String,
    pub value: String,
    pub variable_type: VariableType,
}

impl NewWorkspaceVariable {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();

        if self.key.trim().is_empty() {
            errors.push(FieldError::new("key", "can't be blank"));
        } else if self.key.len() > MAX_KEY_LENGTH {
            errors.push(FieldError::new(
                "key",
                format!("is too long (maximum is {} characters)", MAX_KEY_LENGTH),
            ));
        }

        errors
    }
}
