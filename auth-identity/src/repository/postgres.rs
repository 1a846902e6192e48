//! PostgreSQL-backed auth store
//!
//! Plain relational rows, no bespoke formats. Single-row mutations are one
//! statement each (the failure counter increments inside the database so
//! concurrent attempts cannot lose an update); the multi-step mutations go
//! through the unit-of-work transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use database_layer::DatabasePool;
use tracing::debug;
use uuid::Uuid;

use crate::{
    models::{Permission, RefreshToken, Role, RoleAssignment, Session, User},
    repository::{
        AuthUnitOfWork, FailureOutcome, RefreshTokenRepository, RoleRepository, SessionRepository,
        UserRepository,
    },
    AuthError, Result,
};

/// PostgreSQL implementation of every repository trait
#[derive(Clone)]
pub struct PostgresAuthStore {
    pool: DatabasePool,
}

impl PostgresAuthStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresAuthStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await?;

        Ok(user)
    }

    async fn find_by_legajo(&self, legajo: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE legajo = $1")
            .bind(legajo)
            .fetch_optional(self.pool.pool())
            .await?;

        Ok(user)
    }

    async fn record_failure(
        &self,
        id: Uuid,
        threshold: u32,
        lock_until: DateTime<Utc>,
    ) -> Result<FailureOutcome> {
        debug!("Recording failed login attempt for {}", id);

        // The increment happens inside the statement; row-level locking
        // serializes concurrent attempts for the same user.
        let outcome = sqlx::query_as::<_, FailureOutcome>(
            r#"
            UPDATE users
            SET
                failed_login_attempts = failed_login_attempts + 1,
                locked_until = CASE
                    WHEN failed_login_attempts + 1 >= $2 THEN $3
                    ELSE locked_until
                END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING failed_login_attempts, locked_until
            "#,
        )
        .bind(id)
        .bind(threshold as i32)
        .bind(lock_until)
        .fetch_optional(self.pool.pool())
        .await?
        .ok_or(AuthError::UserNotFound)?;

        Ok(outcome)
    }

    async fn record_success(&self, id: Uuid, now: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET
                failed_login_attempts = 0,
                locked_until = NULL,
                last_login = $2,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(self.pool.pool())
        .await?;

        Ok(())
    }

    async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET
                password_hash = $2,
                password_changed_at = $3,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .bind(now)
        .execute(self.pool.pool())
        .await?;

        Ok(())
    }
}

#[async_trait]
impl RoleRepository for PostgresAuthStore {
    async fn find_assignment(&self, role_id: Uuid) -> Result<Option<RoleAssignment>> {
        let role = sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE id = $1")
            .bind(role_id)
            .fetch_optional(self.pool.pool())
            .await?;

        let Some(role) = role else {
            return Ok(None);
        };

        let permissions = sqlx::query_as::<_, Permission>(
            r#"
            SELECT p.*
            FROM permissions p
            JOIN role_permissions rp ON rp.permission_id = p.id
            WHERE rp.role_id = $1
            "#,
        )
        .bind(role_id)
        .fetch_all(self.pool.pool())
        .await?;

        Ok(Some(RoleAssignment { role, permissions }))
    }
}

#[async_trait]
impl RefreshTokenRepository for PostgresAuthStore {
    async fn create(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshToken> {
        let record = sqlx::query_as::<_, RefreshToken>(
            r#"
            INSERT INTO refresh_tokens (id, user_id, token, expires_at, revoked, created_at)
            VALUES ($1, $2, $3, $4, FALSE, NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .fetch_one(self.pool.pool())
        .await?;

        Ok(record)
    }

    async fn find_active(&self, token: &str, user_id: Uuid) -> Result<Option<RefreshToken>> {
        let record = sqlx::query_as::<_, RefreshToken>(
            r#"
            SELECT *
            FROM refresh_tokens
            WHERE token = $1 AND user_id = $2 AND revoked = FALSE
            "#,
        )
        .bind(token)
        .bind(user_id)
        .fetch_optional(self.pool.pool())
        .await?;

        Ok(record)
    }

    async fn revoke(&self, token: &str, user_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked = TRUE
            WHERE token = $1 AND user_id = $2
            "#,
        )
        .bind(token)
        .bind(user_id)
        .execute(self.pool.pool())
        .await?;

        Ok(())
    }

    async fn revoke_all(&self, user_id: Uuid) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked = TRUE
            WHERE user_id = $1 AND revoked = FALSE
            "#,
        )
        .bind(user_id)
        .execute(self.pool.pool())
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < $1")
            .bind(now)
            .execute(self.pool.pool())
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl SessionRepository for PostgresAuthStore {
    async fn create(
        &self,
        user_id: Uuid,
        ip_address: Option<String>,
        user_agent: Option<String>,
        expires_at: DateTime<Utc>,
    ) -> Result<Session> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (
                id, user_id, ip_address, user_agent,
                expires_at, created_at, last_activity
            )
            VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(ip_address)
        .bind(user_agent)
        .bind(expires_at)
        .fetch_one(self.pool.pool())
        .await?;

        Ok(session)
    }

    async fn list_active(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<Vec<Session>> {
        let sessions = sqlx::query_as::<_, Session>(
            r#"
            SELECT *
            FROM sessions
            WHERE user_id = $1 AND expires_at > $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(now)
        .fetch_all(self.pool.pool())
        .await?;

        Ok(sessions)
    }

    async fn delete(&self, session_id: Uuid, user_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = $1 AND user_id = $2")
            .bind(session_id)
            .bind(user_id)
            .execute(self.pool.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn touch(&self, session_id: Uuid, now: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE sessions SET last_activity = $2 WHERE id = $1")
            .bind(session_id)
            .bind(now)
            .execute(self.pool.pool())
            .await?;

        Ok(())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < $1")
            .bind(now)
            .execute(self.pool.pool())
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl AuthUnitOfWork for PostgresAuthStore {
    async fn admit_login(
        &self,
        user_id: Uuid,
        refresh_token: &str,
        refresh_expires_at: DateTime<Utc>,
        ip_address: Option<String>,
        user_agent: Option<String>,
        session_expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(RefreshToken, Session)> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AuthError::InternalError(e.into()))?;

        sqlx::query(
            r#"
            UPDATE users
            SET
                failed_login_attempts = 0,
                locked_until = NULL,
                last_login = $2,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let token = sqlx::query_as::<_, RefreshToken>(
            r#"
            INSERT INTO refresh_tokens (id, user_id, token, expires_at, revoked, created_at)
            VALUES ($1, $2, $3, $4, FALSE, NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(refresh_token)
        .bind(refresh_expires_at)
        .fetch_one(&mut *tx)
        .await?;

        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (
                id, user_id, ip_address, user_agent,
                expires_at, created_at, last_activity
            )
            VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(ip_address)
        .bind(user_agent)
        .bind(session_expires_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!("Login admitted for {}", user_id);
        Ok((token, session))
    }

    async fn commit_password_change(
        &self,
        user_id: Uuid,
        new_password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AuthError::InternalError(e.into()))?;

        sqlx::query(
            r#"
            UPDATE users
            SET
                password_hash = $2,
                password_changed_at = $3,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(new_password_hash)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked = TRUE
            WHERE user_id = $1 AND revoked = FALSE
            "#,
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(result.rows_affected())
    }
}
