//! Persistence seams for the auth subsystem
//!
//! One trait per entity plus a unit-of-work trait for the two multi-step
//! mutations that must commit atomically. The in-memory store backs tests
//! and development; the PostgreSQL store lives in [`postgres`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::{
    error::AuthError,
    models::{RefreshToken, RoleAssignment, Session, User},
    Result,
};

pub mod postgres;

/// Counters after a recorded failure, so the caller can tell whether this
/// attempt crossed the lockout threshold
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FailureOutcome {
    pub failed_login_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;
    async fn find_by_legajo(&self, legajo: &str) -> Result<Option<User>>;

    /// Atomically increment the failure counter; when the post-increment
    /// count reaches `threshold`, stamp `lock_until` in the same write.
    /// Concurrent failures must each count.
    async fn record_failure(
        &self,
        id: Uuid,
        threshold: u32,
        lock_until: DateTime<Utc>,
    ) -> Result<FailureOutcome>;

    /// Zero the counter, clear the lock, stamp the login time
    async fn record_success(&self, id: Uuid, now: DateTime<Utc>) -> Result<()>;

    async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<()>;
}

#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Role row plus its granted permissions
    async fn find_assignment(&self, role_id: Uuid) -> Result<Option<RoleAssignment>>;
}

#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    async fn create(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshToken>;

    /// The not-revoked ledger row for this token, scoped to its owner.
    /// Expiry is the caller's check so an expired row can surface as a
    /// distinct outcome from a revoked or unknown one.
    async fn find_active(&self, token: &str, user_id: Uuid) -> Result<Option<RefreshToken>>;

    /// Idempotent: revoking an already-revoked token is a no-op
    async fn revoke(&self, token: &str, user_id: Uuid) -> Result<()>;

    /// Revoke every live token for the user; returns the affected count
    async fn revoke_all(&self, user_id: Uuid) -> Result<u64>;

    /// Sweep hook for the external cleanup job
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create(
        &self,
        user_id: Uuid,
        ip_address: Option<String>,
        user_agent: Option<String>,
        expires_at: DateTime<Utc>,
    ) -> Result<Session>;

    /// Unexpired sessions for the user, newest first
    async fn list_active(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<Vec<Session>>;

    /// Delete a session owned by `user_id`; returns false when the session
    /// does not exist or belongs to someone else
    async fn delete(&self, session_id: Uuid, user_id: Uuid) -> Result<bool>;

    /// Update the last-activity stamp
    async fn touch(&self, session_id: Uuid, now: DateTime<Utc>) -> Result<()>;

    /// Sweep hook for the external cleanup job
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}

/// Transactional boundary for the multi-step auth mutations
///
/// A crash mid-operation must not leave a token issued without its ledger
/// row, a session without its token, or a password changed with old
/// refresh tokens still usable.
#[async_trait]
pub trait AuthUnitOfWork: Send + Sync {
    /// Login admission: success bookkeeping on the user row plus the
    /// refresh-token and session inserts, committed as one unit.
    #[allow(clippy::too_many_arguments)]
    async fn admit_login(
        &self,
        user_id: Uuid,
        refresh_token: &str,
        refresh_expires_at: DateTime<Utc>,
        ip_address: Option<String>,
        user_agent: Option<String>,
        session_expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(RefreshToken, Session)>;

    /// Password change: new hash plus mass revocation of the user's
    /// refresh tokens, committed as one unit. Returns the revoked count.
    async fn commit_password_change(
        &self,
        user_id: Uuid,
        new_password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<u64>;
}

// ---------------------------------------------------------------------------
// In-memory store for testing and development
// ---------------------------------------------------------------------------

/// In-memory implementation of every repository trait
#[derive(Default)]
pub struct MemoryAuthStore {
    users: DashMap<Uuid, User>,
    roles: DashMap<Uuid, RoleAssignment>,
    refresh_tokens: DashMap<String, RefreshToken>,
    sessions: DashMap<Uuid, Session>,
}

impl MemoryAuthStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user (provisioning is out of scope for the auth core)
    pub fn insert_user(&self, user: User) {
        self.users.insert(user.id, user);
    }

    /// Seed a role with its permissions
    pub fn insert_role(&self, assignment: RoleAssignment) {
        self.roles.insert(assignment.role.id, assignment);
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[async_trait]
impl UserRepository for MemoryAuthStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_by_legajo(&self, legajo: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|entry| entry.value().legajo == legajo)
            .map(|entry| entry.value().clone()))
    }

    async fn record_failure(
        &self,
        id: Uuid,
        threshold: u32,
        lock_until: DateTime<Utc>,
    ) -> Result<FailureOutcome> {
        // The map shard lock serializes concurrent increments per user
        let mut user = self.users.get_mut(&id).ok_or(AuthError::UserNotFound)?;

        user.failed_login_attempts += 1;
        if user.failed_login_attempts >= threshold as i32 {
            user.locked_until = Some(lock_until);
        }
        user.updated_at = Utc::now();

        Ok(FailureOutcome {
            failed_login_attempts: user.failed_login_attempts,
            locked_until: user.locked_until,
        })
    }

    async fn record_success(&self, id: Uuid, now: DateTime<Utc>) -> Result<()> {
        let mut user = self.users.get_mut(&id).ok_or(AuthError::UserNotFound)?;

        user.failed_login_attempts = 0;
        user.locked_until = None;
        user.last_login = Some(now);
        user.updated_at = now;

        Ok(())
    }

    async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut user = self.users.get_mut(&id).ok_or(AuthError::UserNotFound)?;

        user.password_hash = password_hash.to_string();
        user.password_changed_at = Some(now);
        user.updated_at = now;

        Ok(())
    }
}

#[async_trait]
impl RoleRepository for MemoryAuthStore {
    async fn find_assignment(&self, role_id: Uuid) -> Result<Option<RoleAssignment>> {
        Ok(self.roles.get(&role_id).map(|entry| entry.value().clone()))
    }
}

#[async_trait]
impl RefreshTokenRepository for MemoryAuthStore {
    async fn create(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshToken> {
        let record = RefreshToken {
            id: Uuid::new_v4(),
            user_id,
            token: token.to_string(),
            expires_at,
            revoked: false,
            created_at: Utc::now(),
        };

        self.refresh_tokens.insert(record.token.clone(), record.clone());
        Ok(record)
    }

    async fn find_active(&self, token: &str, user_id: Uuid) -> Result<Option<RefreshToken>> {
        Ok(self
            .refresh_tokens
            .get(token)
            .filter(|entry| entry.value().user_id == user_id && !entry.value().revoked)
            .map(|entry| entry.value().clone()))
    }

    async fn revoke(&self, token: &str, user_id: Uuid) -> Result<()> {
        if let Some(mut record) = self.refresh_tokens.get_mut(token) {
            if record.user_id == user_id {
                record.revoked = true;
            }
        }
        Ok(())
    }

    async fn revoke_all(&self, user_id: Uuid) -> Result<u64> {
        let mut revoked = 0;

        for mut entry in self.refresh_tokens.iter_mut() {
            let record = entry.value_mut();
            if record.user_id == user_id && !record.revoked {
                record.revoked = true;
                revoked += 1;
            }
        }

        Ok(revoked)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let before = self.refresh_tokens.len();
        self.refresh_tokens.retain(|_, record| record.expires_at > now);
        Ok((before - self.refresh_tokens.len()) as u64)
    }
}

#[async_trait]
impl SessionRepository for MemoryAuthStore {
    async fn create(
        &self,
        user_id: Uuid,
        ip_address: Option<String>,
        user_agent: Option<String>,
        expires_at: DateTime<Utc>,
    ) -> Result<Session> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4(),
            user_id,
            ip_address,
            user_agent,
            expires_at,
            created_at: now,
            last_activity: now,
        };

        self.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn list_active(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<Vec<Session>> {
        let mut sessions: Vec<Session> = self
            .sessions
            .iter()
            .filter(|entry| {
                let s = entry.value();
                s.user_id == user_id && s.expires_at > now
            })
            .map(|entry| entry.value().clone())
            .collect();

        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }

    async fn delete(&self, session_id: Uuid, user_id: Uuid) -> Result<bool> {
        let owned = self
            .sessions
            .get(&session_id)
            .map(|entry| entry.value().user_id == user_id)
            .unwrap_or(false);

        if owned {
            self.sessions.remove(&session_id);
        }

        Ok(owned)
    }

    async fn touch(&self, session_id: Uuid, now: DateTime<Utc>) -> Result<()> {
        if let Some(mut session) = self.sessions.get_mut(&session_id) {
            session.last_activity = now;
        }
        Ok(())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| session.expires_at > now);
        Ok((before - self.sessions.len()) as u64)
    }
}

#[async_trait]
impl AuthUnitOfWork for MemoryAuthStore {
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
        self.record_success(user_id, now).await?;
        let token = RefreshTokenRepository::create(self, user_id, refresh_token, refresh_expires_at)
            .await?;
        let session =
            SessionRepository::create(self, user_id, ip_address, user_agent, session_expires_at)
                .await?;

        Ok((token, session))
    }

    async fn commit_password_change(
        &self,
        user_id: Uuid,
        new_password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        self.update_password(user_id, new_password_hash, now).await?;
        self.revoke_all(user_id).await
    }
}
