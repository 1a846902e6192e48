//! Auth gateway
//!
//! The only component with cross-cutting control flow: composes the
//! credential store, lockout policy, token issuer, ledgers and permission
//! resolver into the login, refresh, logout, change-password and session
//! operations.

use audit_engine::{AuditEntry, AuditLogger};
use chrono::{Duration, Utc};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    config::AuthConfig,
    error::AuthError,
    lockout,
    models::{
        ChangePasswordRequest, ClientMeta, LoginRequest, LoginResponse, RefreshResponse,
        RoleAssignment, SessionInfo, User, UserProfile,
    },
    password,
    permissions::PermissionResolver,
    repository::{
        AuthUnitOfWork, RefreshTokenRepository, RoleRepository, SessionRepository, UserRepository,
    },
    tokens::{TokenIssuer, TokenUse},
    Result,
};

pub struct AuthService {
    users: Arc<dyn UserRepository>,
    roles: Arc<dyn RoleRepository>,
    refresh_tokens: Arc<dyn RefreshTokenRepository>,
    sessions: Arc<dyn SessionRepository>,
    unit_of_work: Arc<dyn AuthUnitOfWork>,
    tokens: TokenIssuer,
    resolver: PermissionResolver,
    config: AuthConfig,
    audit: Option<AuditLogger>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        roles: Arc<dyn RoleRepository>,
        refresh_tokens: Arc<dyn RefreshTokenRepository>,
        sessions: Arc<dyn SessionRepository>,
        unit_of_work: Arc<dyn AuthUnitOfWork>,
        config: AuthConfig,
    ) -> Self {
        Self {
            users,
            roles,
            refresh_tokens,
            sessions,
            unit_of_work,
            tokens: TokenIssuer::new(&config),
            resolver: PermissionResolver::new(),
            config,
            audit: None,
        }
    }

    /// Build from a single store implementing every repository trait
    pub fn with_store<S>(store: Arc<S>, config: AuthConfig) -> Self
    where
        S: UserRepository
            + RoleRepository
            + RefreshTokenRepository
            + SessionRepository
            + AuthUnitOfWork
            + 'static,
    {
        Self::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store,
            config,
        )
    }

    pub fn with_audit_logger(mut self, logger: AuditLogger) -> Self {
        self.audit = Some(logger);
        self
    }

    pub fn with_resolver(mut self, resolver: PermissionResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Login with brute-force lockout
    ///
    /// Unknown legajo and wrong password are the same generic outcome; a
    /// locked account is reported before any password comparison so the
    /// outcome cannot leak whether the lock would have reset.
    pub async fn login(&self, request: &LoginRequest, client: &ClientMeta) -> Result<LoginResponse> {
        let now = Utc::now();

        let user = self
            .users
            .find_by_legajo(&request.legajo)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if lockout::is_locked(user.locked_until, now) {
            let remaining_minutes = user
                .locked_until
                .map(|until| lockout::remaining_minutes(until, now))
                .unwrap_or_default();

            return Err(AuthError::AccountLocked { remaining_minutes });
        }

        if !password::verify_password(&request.password, &user.password_hash)? {
            let outcome = self
                .users
                .record_failure(
                    user.id,
                    self.config.max_login_attempts,
                    lockout::lock_expiry(now, &self.config),
                )
                .await?;

            if outcome.failed_login_attempts >= self.config.max_login_attempts as i32 {
                warn!(legajo = %user.legajo, "Account locked after repeated failed attempts");
                self.audit_event(
                    "account_locked",
                    Some(user.id),
                    json!({"attempts": outcome.failed_login_attempts}),
                    client,
                )
                .await;

                return Err(AuthError::AccountLocked {
                    remaining_minutes: self.config.lockout_minutes,
                });
            }

            self.audit_event(
                "login_failed",
                Some(user.id),
                json!({"attempts": outcome.failed_login_attempts}),
                client,
            )
            .await;

            return Err(AuthError::InvalidCredentials);
        }

        if !user.is_active {
            return Err(AuthError::UserInactive);
        }

        let access_token = self.tokens.issue_access_token(user.id)?;
        let refresh_token = self.tokens.issue_refresh_token(user.id)?;

        // Success bookkeeping plus both ledger rows commit as one unit
        self.unit_of_work
            .admit_login(
                user.id,
                &refresh_token,
                now + self.tokens.refresh_token_lifetime(),
                client.ip_address.clone(),
                client.user_agent.clone(),
                now + Duration::hours(self.config.session_hours),
                now,
            )
            .await?;

        let assignment = self.role_assignment(&user).await?;
        let access = self.resolver.effective_permissions(assignment.as_ref());
        let profile = UserProfile::from_user(&user, assignment.as_ref(), &access);

        info!(legajo = %user.legajo, "User logged in");
        self.audit_event("login", Some(user.id), json!({"legajo": user.legajo}), client)
            .await;

        Ok(LoginResponse {
            access_token,
            refresh_token,
            user: profile,
            expires_in: self.tokens.access_token_lifetime_secs(),
        })
    }

    /// Exchange a usable refresh token for a new access token
    ///
    /// The refresh token itself is not rotated; it stays valid until
    /// explicitly revoked or expired.
    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse> {
        let now = Utc::now();

        let claims = self.tokens.decode(refresh_token, TokenUse::Refresh)?;
        let user_id = claims.user_id()?;

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or(AuthError::UserInactive)?;

        let record = self
            .refresh_tokens
            .find_active(refresh_token, user.id)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if record.expires_at <= now {
            return Err(AuthError::TokenExpired);
        }

        let access_token = self.tokens.issue_access_token(user.id)?;

        Ok(RefreshResponse {
            access_token,
            expires_in: self.tokens.access_token_lifetime_secs(),
        })
    }

    /// Revoke the supplied refresh token, if any
    ///
    /// Logout without a refresh token is a successful no-op. The session
    /// row is left in place; only the token ledger is touched.
    pub async fn logout(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
        client: &ClientMeta,
    ) -> Result<()> {
        let claims = self.tokens.decode(access_token, TokenUse::Access)?;
        let user_id = claims.user_id()?;

        if let Some(token) = refresh_token {
            self.refresh_tokens.revoke(token, user_id).await?;
        }

        self.audit_event("logout", Some(user_id), json!({}), client).await;
        Ok(())
    }

    /// Change the caller's password and force re-login everywhere
    ///
    /// Every refresh token is revoked in the same transaction as the hash
    /// update; the current access token stays valid until its own expiry.
    pub async fn change_password(
        &self,
        access_token: &str,
        request: &ChangePasswordRequest,
        client: &ClientMeta,
    ) -> Result<()> {
        let now = Utc::now();

        let claims = self.tokens.decode(access_token, TokenUse::Access)?;
        let user = self
            .users
            .find_by_id(claims.user_id()?)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !password::verify_password(&request.old_password, &user.password_hash)? {
            return Err(AuthError::InvalidPassword);
        }

        password::validate_password_policy(&request.new_password, &self.config)?;
        let new_hash = password::hash_password(&request.new_password)?;

        let revoked = self
            .unit_of_work
            .commit_password_change(user.id, &new_hash, now)
            .await?;

        info!(legajo = %user.legajo, revoked, "Password changed, refresh tokens revoked");
        self.audit_event(
            "change_password",
            Some(user.id),
            json!({"revoked_tokens": revoked}),
            client,
        )
        .await;

        Ok(())
    }

    /// Profile of the authenticated caller, permissions included
    pub async fn current_user(&self, access_token: &str) -> Result<UserProfile> {
        let claims = self.tokens.decode(access_token, TokenUse::Access)?;

        let user = self
            .users
            .find_by_id(claims.user_id()?)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !user.is_active {
            return Err(AuthError::UserInactive);
        }

        let assignment = self.role_assignment(&user).await?;
        let access = self.resolver.effective_permissions(assignment.as_ref());

        Ok(UserProfile::from_user(&user, assignment.as_ref(), &access))
    }

    /// Active sessions of the caller, newest first
    pub async fn list_sessions(&self, access_token: &str) -> Result<Vec<SessionInfo>> {
        let claims = self.tokens.decode(access_token, TokenUse::Access)?;
        let user_id = claims.user_id()?;

        let sessions = self.sessions.list_active(user_id, Utc::now()).await?;
        Ok(sessions.into_iter().map(SessionInfo::from).collect())
    }

    /// Delete one of the caller's sessions
    ///
    /// The ownership check makes a foreign session indistinguishable from
    /// a missing one.
    pub async fn revoke_session(
        &self,
        access_token: &str,
        session_id: Uuid,
        client: &ClientMeta,
    ) -> Result<()> {
        let claims = self.tokens.decode(access_token, TokenUse::Access)?;
        let user_id = claims.user_id()?;

        if !self.sessions.delete(session_id, user_id).await? {
            return Err(AuthError::SessionNotFound);
        }

        self.audit_event(
            "revoke_session",
            Some(user_id),
            json!({"session_id": session_id}),
            client,
        )
        .await;

        Ok(())
    }

    /// Resolve the identity behind an access token; guard primitive
    pub async fn authenticate(&self, access_token: &str) -> Result<User> {
        let claims = self.tokens.decode(access_token, TokenUse::Access)?;

        self.users
            .find_by_id(claims.user_id()?)
            .await?
            .filter(|u| u.is_active)
            .ok_or(AuthError::UserInactive)
    }

    /// Does this identity hold this permission?
    pub async fn check_permission(&self, user: &User, permission: &str) -> Result<bool> {
        let assignment = self.role_assignment(user).await?;
        Ok(self.resolver.has_permission(assignment.as_ref(), permission))
    }

    async fn role_assignment(&self, user: &User) -> Result<Option<RoleAssignment>> {
        match user.role_id {
            Some(role_id) => self.roles.find_assignment(role_id).await,
            None => Ok(None),
        }
    }

    async fn audit_event(
        &self,
        action: &str,
        user_id: Option<Uuid>,
        details: serde_json::Value,
        client: &ClientMeta,
    ) {
        if let Some(logger) = &self.audit {
            let mut entry = AuditEntry::new(action, "auth")
                .with_details(details)
                .with_client(client.ip_address.clone(), client.user_agent.clone());

            if let Some(id) = user_id {
                entry = entry.with_user(id);
            }

            logger.log(entry).await;
        }
    }
}
