//! Personal access token repository

use chrono::{DateTime, NaiveDate, Utc};
use sha2::{Digest, Sha256};
use sqlx::{FromRow, SqliteConnection};

use crate::domain::token::PersonalAccessToken;
use crate::error::{Error, Result};

/// Hex encoded SHA-256 of a token value
pub fn token_digest(value: &str) -> String {
    format!("{:x}", Sha256::digest(value.as_bytes()))
}

#[derive(Debug, FromRow)]
struct TokenRow {
    id: i64,
    user_id: i64,
    name: String,
    scopes: String,
    impersonation: bool,
    expires_at: String,
    created_at: String,
}

impl TryFrom<TokenRow> for PersonalAccessToken {
    type Error = Error;

    fn try_from(row: TokenRow) -> Result<Self> {
        let scopes: Vec<String> = serde_json::from_str(&row.scopes)
            .map_err(|e| Error::SerializationError(format!("Failed to parse scopes: {}", e)))?;

        let expires_at = NaiveDate::parse_from_str(&row.expires_at, "%Y-%m-%d")
            .map_err(|e| Error::Internal(format!("Failed to parse expires_at: {}", e)))?;

        let created_at = DateTime::parse_from_rfc3339(&row.created_at)
            .map_err(|e| Error::Internal(format!("Failed to parse created_at: {}", e)))?
            .with_timezone(&Utc);

        Ok(PersonalAccessToken {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            scopes,
            impersonation: row.impersonation,
            expires_at,
            created_at,
        })
    }
}

/// Token rows are only written inside the create transaction
pub struct TokenRepository;

impl TokenRepository {
    /// Store a token; only the digest of `value` is persisted
    pub async fn insert(
        conn: &mut SqliteConnection,
        user_id: i64,
        name: &str,
        scopes: &[String],
        impersonation: bool,
        expires_at: NaiveDate,
        value: &str,
    ) -> Result<PersonalAccessToken> {
        let scopes = serde_json::to_string(scopes)
            .map_err(|e| Error::SerializationError(e.to_string()))?;

        let id = sqlx::query(
            r#"
            INSERT INTO personal_access_tokens
                (user_id, name, token_digest, scopes, impersonation, expires_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(name)
        .bind(token_digest(value))
        .bind(&scopes)
        .bind(impersonation)
        .bind(expires_at.format("%Y-%m-%d").to_string())
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();

        Self::fetch(conn, id).await
    }

    pub async fn fetch(conn: &mut SqliteConnection, id: i64) -> Result<PersonalAccessToken> {
        let row: TokenRow = sqlx::query_as(
            r#"
            SELECT id, user_id, name, scopes, impersonation, expires_at, created_at
            FROM personal_access_tokens
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| Error::Internal(format!("Personal access token {} vanished", id)))?;

        row.try_into()
    }
}
