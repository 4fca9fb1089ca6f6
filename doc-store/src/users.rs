//! User credential lookup.
//!
//! Only credential resolution lives here; account CRUD is handled by
//! operational tooling outside this service.

use sqlx::{PgPool, Row};

use crate::errors::StoreError;

/// Fetches the stored (still encrypted) external-service token for a user.
///
/// Returns `Ok(None)` when the user does not exist.
///
/// # Errors
/// Returns `StoreError::Database` on query failure.
pub async fn find_encrypted_token(
    pool: &PgPool,
    user_id: i64,
) -> Result<Option<String>, StoreError> {
    let row = sqlx::query("SELECT encrypted_qiita_token FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|r| r.get("encrypted_qiita_token")))
}
