use serde::{Deserialize, Serialize};

/// Authentication configuration
///
/// Token lifetimes live here and nowhere else; issuance always reads the
/// configured value so the effective lifetime cannot drift from the
/// documented one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    /// Access token lifetime in minutes
    pub access_token_minutes: i64,
    /// Refresh token lifetime in days
    pub refresh_token_days: i64,
    /// Session record lifetime in hours
    pub session_hours: i64,
    /// Failed attempts before the account locks
    pub max_login_attempts: u32,
    /// Lock duration once the threshold is crossed
    pub lockout_minutes: i64,
    pub password_min_length: usize,
    pub password_require_uppercase: bool,
    pub password_require_digit: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "jwt-secret-key-change-in-production".to_string(),
            jwt_issuer: "sigpol".to_string(),
            access_token_minutes: 15,
            refresh_token_days: 30,
            session_hours: 24,
            max_login_attempts: 5,
            lockout_minutes: 30,
            password_min_length: 8,
            password_require_uppercase: true,
            password_require_digit: true,
        }
    }
}

impl AuthConfig {
    /// Build from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            jwt_secret: std::env::var("JWT_SECRET_KEY").unwrap_or(defaults.jwt_secret),
            jwt_issuer: std::env::var("JWT_ISSUER").unwrap_or(defaults.jwt_issuer),
            access_token_minutes: env_i64("JWT_ACCESS_TOKEN_MINUTES", defaults.access_token_minutes),
            refresh_token_days: env_i64("JWT_REFRESH_TOKEN_DAYS", defaults.refresh_token_days),
            session_hours: env_i64("SESSION_HOURS", defaults.session_hours),
            max_login_attempts: env_i64("MAX_LOGIN_ATTEMPTS", defaults.max_login_attempts as i64)
                as u32,
            lockout_minutes: env_i64("LOCKOUT_MINUTES", defaults.lockout_minutes),
            password_min_length: defaults.password_min_length,
            password_require_uppercase: defaults.password_require_uppercase,
            password_require_digit: defaults.password_require_digit,
        }
    }

    /// Access token lifetime in seconds, as reported in `expires_in`
    pub fn access_token_seconds(&self) -> i64 {
        self.access_token_minutes * 60
    }
}

fn env_i64(name: &str, default: i64) -> i64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_lifetimes() {
        let config = AuthConfig::default();
        assert_eq!(config.access_token_seconds(), 900);
        assert_eq!(config.refresh_token_days, 30);
        assert_eq!(config.max_login_attempts, 5);
        assert_eq!(config.lockout_minutes, 30);
    }
}
