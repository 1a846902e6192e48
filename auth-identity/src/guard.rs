//! Permission gates for protected operations
//!
//! Gates are composed at route-registration time and receive the resolved
//! identity and the required permission as explicit parameters; there is
//! no ambient or global lookup.

use std::sync::Arc;

use crate::{error::AuthError, models::User, service::AuthService, Result};

/// Resolve the caller or fail with the token/identity error
pub async fn require_user(service: &AuthService, bearer_token: &str) -> Result<User> {
    service.authenticate(bearer_token).await
}

/// Resolve the caller and require a named permission
pub async fn require_permission(
    service: &AuthService,
    bearer_token: &str,
    permission: &str,
) -> Result<User> {
    let user = service.authenticate(bearer_token).await?;

    if !service.check_permission(&user, permission).await? {
        return Err(AuthError::InsufficientPermissions(permission.to_string()));
    }

    Ok(user)
}

/// A route's permission requirement, bound once at registration
pub struct PermissionGuard {
    service: Arc<AuthService>,
    permission: String,
}

impl PermissionGuard {
    pub fn new(service: Arc<AuthService>, permission: &str) -> Self {
        Self {
            service,
            permission: permission.to_string(),
        }
    }

    pub fn permission(&self) -> &str {
        &self.permission
    }

    /// Check a request's bearer token against the bound permission
    pub async fn check(&self, bearer_token: &str) -> Result<User> {
        require_permission(&self.service, bearer_token, &self.permission).await
    }
}
