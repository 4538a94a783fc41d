/// PostgreSQL credential store
///
/// sqlx-backed implementation of [`CredentialStore`]. Uniqueness of username
/// and email is enforced by the database's unique indexes; a violated
/// constraint on insert is translated to [`StoreError::Conflict`], which is
/// the authoritative duplicate signal (no pre-check, no race window).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id BIGSERIAL PRIMARY KEY,
///     username TEXT NOT NULL UNIQUE,
///     email TEXT NOT NULL UNIQUE,
///     password_hash TEXT NOT NULL,
///     is_active BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::warn;

use crate::auth::store::{Credential, CredentialStore, NewCredential, StoreError};

const CREDENTIAL_COLUMNS: &str =
    "id, username, email, password_hash, is_active, created_at, updated_at";

/// Credential store backed by PostgreSQL
#[derive(Debug, Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    /// Creates a store over an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Maps sqlx failures onto the store error vocabulary
///
/// Unique violations become `Conflict` with the offending field name derived
/// from the constraint (`users_username_key`, `users_email_key`).
fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let field = match db_err.constraint() {
                Some("users_username_key") => "username",
                Some("users_email_key") => "email",
                _ => "credential",
            };
            return StoreError::Conflict(field.to_string());
        }
    }

    warn!(error = %err, "credential query failed");
    StoreError::Backend(err.to_string())
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Credential>, StoreError> {
        sqlx::query_as::<_, Credential>(&format!(
            "SELECT {CREDENTIAL_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Credential>, StoreError> {
        sqlx::query_as::<_, Credential>(&format!(
            "SELECT {CREDENTIAL_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn insert(&self, new: NewCredential) -> Result<Credential, StoreError> {
        sqlx::query_as::<_, Credential>(&format!(
            r#"
            INSERT INTO users (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING {CREDENTIAL_COLUMNS}
            "#
        ))
        .bind(new.username)
        .bind(new.email)
        .bind(new.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn set_active(&self, id: i64) -> Result<Credential, StoreError> {
        sqlx::query_as::<_, Credential>(&format!(
            r#"
            UPDATE users
            SET is_active = TRUE, updated_at = NOW()
            WHERE id = $1
            RETURNING {CREDENTIAL_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?
        .ok_or(StoreError::NotFound)
    }

    async fn update_password_hash(&self, id: i64, hash: &str) -> Result<Credential, StoreError> {
        sqlx::query_as::<_, Credential>(&format!(
            r#"
            UPDATE users
            SET password_hash = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {CREDENTIAL_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?
        .ok_or(StoreError::NotFound)
    }
}

// Integration tests for these queries require a running database; the store
// trait itself is exercised against the in-memory implementation in
// tests/auth_flow_tests.rs.
