//! Traveller (credential record) operations
//!
//! Every lookup used by authentication filters on `active = 1` explicitly;
//! deactivated records are invisible to these paths. Password and
//! reset-token mutations are single UPDATE statements so concurrent flows
//! overwrite rather than interleave.

use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use crate::error::DbError;
use crate::models::{NewTraveller, Role, Traveller};
use crate::repository::Database;

const TRAVELLER_COLUMNS: &str = "id, name, email, password_hash, role, active, \
     password_changed_at, reset_token_hash, reset_token_expires_at, created_at, updated_at";

impl Database {
    /// Insert a new traveller
    ///
    /// The caller hashes the password; `password_changed_at` stays NULL
    /// because creation is not a credential change.
    pub async fn insert_traveller(&self, traveller: NewTraveller) -> Result<Traveller, DbError> {
        let now = Utc::now();
        let id = Uuid::new_v4();

        // Check for an existing account first so the caller gets a classified
        // duplicate error instead of a raw constraint violation. The email
        // column is unique across deactivated records too, so this check
        // deliberately skips the active filter.
        let existing = sqlx::query("SELECT COUNT(*) as count FROM travellers WHERE email = ?")
            .bind(&traveller.email)
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = existing.get("count");
        if count > 0 {
            return Err(DbError::Duplicate(format!(
                "Account '{}' already exists",
                traveller.email
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO travellers (id, name, email, password_hash, role, active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 1, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(&traveller.name)
        .bind(&traveller.email)
        .bind(&traveller.password_hash)
        .bind(traveller.role.as_str())
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(Traveller {
            id,
            name: traveller.name,
            email: traveller.email,
            password_hash: traveller.password_hash,
            role: traveller.role,
            active: true,
            password_changed_at: None,
            reset_token_hash: None,
            reset_token_expires_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Get an active traveller by email
    pub async fn find_active_by_email(&self, email: &str) -> Result<Option<Traveller>, DbError> {
        let result = sqlx::query(&format!(
            r#"
            SELECT {TRAVELLER_COLUMNS}
            FROM travellers
            WHERE email = ? AND active = 1
            "#
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        result
            .map(|row| Traveller::try_from(&row).map_err(DbError::from))
            .transpose()
    }

    /// Get an active traveller by ID
    pub async fn find_active_by_id(&self, id: Uuid) -> Result<Option<Traveller>, DbError> {
        let result = sqlx::query(&format!(
            r#"
            SELECT {TRAVELLER_COLUMNS}
            FROM travellers
            WHERE id = ? AND active = 1
            "#
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        result
            .map(|row| Traveller::try_from(&row).map_err(DbError::from))
            .transpose()
    }

    /// Get an active traveller by the stored hash of an outstanding reset token
    pub async fn find_active_by_reset_hash(
        &self,
        reset_token_hash: &str,
    ) -> Result<Option<Traveller>, DbError> {
        let result = sqlx::query(&format!(
            r#"
            SELECT {TRAVELLER_COLUMNS}
            FROM travellers
            WHERE reset_token_hash = ? AND active = 1
            "#
        ))
        .bind(reset_token_hash)
        .fetch_optional(&self.pool)
        .await?;

        result
            .map(|row| Traveller::try_from(&row).map_err(DbError::from))
            .transpose()
    }

    /// List all active travellers
    pub async fn list_active_travellers(&self) -> Result<Vec<Traveller>, DbError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {TRAVELLER_COLUMNS}
            FROM travellers
            WHERE active = 1
            ORDER BY email
            "#
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| Traveller::try_from(row).map_err(DbError::from))
            .collect()
    }

    /// Replace the password hash and stamp the change time
    ///
    /// One atomic write: the new hash, `password_changed_at`, and the
    /// clearing of any outstanding reset token land together.
    pub async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
        changed_at: DateTime<Utc>,
    ) -> Result<bool, DbError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE travellers
            SET password_hash = ?, password_changed_at = ?,
                reset_token_hash = NULL, reset_token_expires_at = NULL,
                updated_at = ?
            WHERE id = ? AND active = 1
            "#,
        )
        .bind(password_hash)
        .bind(changed_at.to_rfc3339())
        .bind(now.to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Store a reset-token hash and its expiry, overwriting any previous one
    pub async fn set_reset_token(
        &self,
        id: Uuid,
        reset_token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, DbError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE travellers
            SET reset_token_hash = ?, reset_token_expires_at = ?, updated_at = ?
            WHERE id = ? AND active = 1
            "#,
        )
        .bind(reset_token_hash)
        .bind(expires_at.to_rfc3339())
        .bind(now.to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Clear the reset-token pair
    pub async fn clear_reset_token(&self, id: Uuid) -> Result<bool, DbError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE travellers
            SET reset_token_hash = NULL, reset_token_expires_at = NULL, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(now.to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Complete a password reset in one guarded write
    ///
    /// The `reset_token_hash` predicate makes double consumption lose: the
    /// second writer matches zero rows and the caller sees `false`.
    pub async fn consume_reset_token(
        &self,
        id: Uuid,
        reset_token_hash: &str,
        new_password_hash: &str,
        changed_at: DateTime<Utc>,
    ) -> Result<bool, DbError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE travellers
            SET password_hash = ?, password_changed_at = ?,
                reset_token_hash = NULL, reset_token_expires_at = NULL,
                updated_at = ?
            WHERE id = ? AND reset_token_hash = ? AND active = 1
            "#,
        )
        .bind(new_password_hash)
        .bind(changed_at.to_rfc3339())
        .bind(now.to_rfc3339())
        .bind(id.to_string())
        .bind(reset_token_hash)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Update a traveller's role
    pub async fn update_role(&self, id: Uuid, role: Role) -> Result<bool, DbError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE travellers
            SET role = ?, updated_at = ?
            WHERE id = ? AND active = 1
            "#,
        )
        .bind(role.as_str())
        .bind(now.to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Soft-delete a traveller
    ///
    /// The record stays on disk; the `active = 1` filters make it invisible
    /// to every authentication lookup from here on.
    pub async fn deactivate_traveller(&self, id: Uuid) -> Result<bool, DbError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE travellers
            SET active = 0, updated_at = ?
            WHERE id = ? AND active = 1
            "#,
        )
        .bind(now.to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Check if any travellers exist
    pub async fn has_travellers(&self) -> Result<bool, DbError> {
        let result = sqlx::query("SELECT COUNT(*) as count FROM travellers")
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = result.get("count");
        Ok(count > 0)
    }
}
