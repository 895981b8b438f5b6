//! Common domain types

use std::fmt;

use serde::{Deserialize, Serialize};

/// A user of the instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub name: String,
    pub email: String,
}

/// A project whose repository carries the devfile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    /// Last path segment, used as the clone directory name
    pub path: String,
    /// Namespaced path, e.g. `group/project`
    pub full_path: String,
    pub http_url_to_repo: String,
}

/// A cluster agent that will run the workspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: i64,
    pub name: String,
    pub project_id: i64,
}

/// Remote development configuration registered for a cluster agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub id: i64,
    pub agent_id: i64,
    pub enabled: bool,
    pub dns_zone: String,
}

/// A model validation error on a single attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    /// An error that is not tied to one attribute
    pub fn base(message: impl Into<String>) -> Self {
        Self::new("base", message)
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.field == "base" {
            return write!(f, "{}", self.message);
        }

        let humanized = self.field.replace('_', " ");
        let mut chars = humanized.chars();
        match chars.next() {
            Some(first) => write!(
                f,
                "{}{} {}",
                first.to_uppercase(),
                chars.as_str(),
                self.message
            ),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Join errors into the single line shown to users
pub fn full_messages(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
