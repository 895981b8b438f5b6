//! Personal access token domain model

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::domain::types::FieldError;

/// Scope granted to tokens minted for workspaces
pub const WRITE_REPOSITORY_SCOPE: &str = "write_repository";

/// Stored token; the secret itself is only kept as a digest
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonalAccessToken {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub scopes: Vec<String>,
    pub impersonation: bool,
    pub expires_at: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// A freshly issued token together with its plaintext value
///
/// The plaintext only lives for the duration of one create request, long
/// enough to be written into the workspace's file variables.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: PersonalAccessToken,
    pub value: String,
}

/// Unsaved token record
#[derive(Debug, Clone, PartialEq)]
pub struct NewPersonalAccessToken {
    pub user_id: i64,
    pub name: String,
    pub scopes: Vec<String>,
    pub impersonation: bool,
    pub expires_at: Option<NaiveDate>,
}

impl NewPersonalAccessToken {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push(FieldError::new("name", "can't be blank"));
        }

        if self.scopes.is_empty() {
            errors.push(FieldError::new("scopes", "can't be blank"));
        }

        if self.expires_at.is_none() {
            errors.push(FieldError::new("expires_at", "is invalid"));
        }

        errors
    }
}

/// Expiry date for a token that must outlive the workspace.
///
/// The workspace may run for `max_hours` from `now`; the token expires at the
/// start of the following day. `None` when the date is not representable.
pub fn token_expiry(now: DateTime<Utc>, max_hours: i64) -> Option<NaiveDate> {
    let ttl = Duration::try_hours(max_hours)?;
    now.checked_add_signed(ttl)?.date_naive().succ_opt()
}
