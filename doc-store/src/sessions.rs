//! Session token lookup.
//!
//! Session issuance (login) is external; the API layer only validates
//! presented tokens against this table.

use sqlx::{PgPool, Row};

use crate::errors::StoreError;

/// Resolves a session token to its user id, `None` when unknown.
///
/// # Errors
/// Returns `StoreError::Database` on query failure.
pub async fn find_session_user(pool: &PgPool, token: &str) -> Result<Option<i64>, StoreError> {
    let row = sqlx::query("SELECT user_id::int8 AS user_id FROM sessions WHERE token = $1")
        .bind(token)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|r| r.get("user_id")))
}
