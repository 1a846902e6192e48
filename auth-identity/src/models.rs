use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::permissions::PermissionAccess;

/// A system user
///
/// `legajo` is the personnel file number, the external identifier officers
/// log in with. The password hash never serializes.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub legajo: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub nombre: Option<String>,
    pub apellido: Option<String>,
    pub rango: Option<String>,
    pub area: Option<String>,
    pub role_id: Option<Uuid>,
    pub is_active: bool,
    pub email_verified: bool,
    pub failed_login_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
    pub password_changed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Permission {
    /// Dot-namespaced name, e.g. `capacitaciones.crear`
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A role together with its granted permissions
#[derive(Debug, Clone)]
pub struct RoleAssignment {
    pub role: Role,
    pub permissions: Vec<Permission>,
}

impl RoleAssignment {
    pub fn permission_names(&self) -> HashSet<String> {
        self.permissions.iter().map(|p| p.name.clone()).collect()
    }
}

/// Persisted refresh token ledger row
///
/// Usable for renewal iff not revoked, not expired and the owner is still
/// active.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
}

/// Tracked login session
///
/// Lifecycle is independent from the refresh-token ledger: logout revokes
/// the token row and leaves the session row in place.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Request/response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub legajo: String,
    pub password: String,
}

/// Client metadata captured by the transport layer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleSummary {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

/// User payload returned on login and `/me`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub legajo: String,
    pub username: String,
    pub email: String,
    pub nombre: Option<String>,
    pub apellido: Option<String>,
    pub rango: Option<String>,
    pub area: Option<String>,
    pub is_active: bool,
    pub email_verified: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<RoleSummary>,
    /// `["*"]` for admin-tier roles, the literal permission names otherwise
    pub permissions: Vec<String>,
}

impl UserProfile {
    pub fn from_user(
        user: &User,
        assignment: Option<&RoleAssignment>,
        access: &PermissionAccess,
    ) -> Self {
        Self {
            id: user.id,
            legajo: user.legajo.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            nombre: user.nombre.clone(),
            apellido: user.apellido.clone(),
            rango: user.rango.clone(),
            area: user.area.clone(),
            is_active: user.is_active,
            email_verified: user.email_verified,
            last_login: user.last_login,
            created_at: user.created_at,
            role: assignment.map(|a| RoleSummary {
                id: a.role.id,
                name: a.role.name.clone(),
                description: a.role.description.clone(),
            }),
            permissions: access.to_wire(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserProfile,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub expires_in: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoutRequest {
    /// Absent refresh token means a successful no-op logout
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// Session entry as listed to its owner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: Uuid,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<Session> for SessionInfo {
    fn from(session: Session) -> Self {
        Self {
            id: session.id,
            ip_address: session.ip_address,
            user_agent: session.user_agent,
            created_at: session.created_at,
            last_activity: session.last_activity,
            expires_at: session.expires_at,
        }
    }
}
