//! Access and refresh token issuance
//!
//! HS256 bearer tokens signed with the deployment secret. The issuer only
//! mints and validates tokens; persistence of refresh tokens is the
//! ledger's job. Verification is synchronous and side-effect-free.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{config::AuthConfig, error::AuthError, Result};

/// Token class carried in the claims
///
/// A refresh token can never be presented where an access token is
/// expected and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenUse {
    Access,
    Refresh,
}

/// Signed token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    /// Unique token identifier
    pub jti: String,
    /// Issued at (seconds since epoch)
    pub iat: i64,
    /// Expiration (seconds since epoch)
    pub exp: i64,
    /// Issuer
    pub iss: String,
    /// Token class
    pub token_use: TokenUse,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid> {
        Uuid::parse_str(&self.sub).map_err(|_| AuthError::InvalidToken)
    }
}

/// Mints and validates the two token classes
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    access_minutes: i64,
    refresh_days: i64,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&config.jwt_issuer]);
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            issuer: config.jwt_issuer.clone(),
            access_minutes: config.access_token_minutes,
            refresh_days: config.refresh_token_days,
        }
    }

    /// Short-lived token authorizing API calls
    pub fn issue_access_token(&self, user_id: Uuid) -> Result<String> {
        self.issue(user_id, TokenUse::Access, Duration::minutes(self.access_minutes))
    }

    /// Long-lived token exchangeable for new access tokens
    pub fn issue_refresh_token(&self, user_id: Uuid) -> Result<String> {
        self.issue(user_id, TokenUse::Refresh, Duration::days(self.refresh_days))
    }

    /// Access token lifetime in seconds, as reported in `expires_in`
    pub fn access_token_lifetime_secs(&self) -> i64 {
        self.access_minutes * 60
    }

    /// Refresh token lifetime, for the ledger row expiry
    pub fn refresh_token_lifetime(&self) -> Duration {
        Duration::days(self.refresh_days)
    }

    /// Validate signature, expiry and token class
    pub fn decode(&self, token: &str, expected: TokenUse) -> Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            }
        })?;

        if data.claims.token_use != expected {
            return Err(AuthError::InvalidToken);
        }

        Ok(data.claims)
    }

    fn issue(&self, user_id: Uuid, token_use: TokenUse, lifetime: Duration) -> Result<String> {
        let now = Utc::now();

        let claims = Claims {
            sub: user_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
            iss: self.issuer.clone(),
            token_use,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::InternalError(anyhow::anyhow!("Failed to encode token: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(&AuthConfig::default())
    }

    #[test]
    fn test_access_token_roundtrip() {
        let issuer = issuer();
        let user_id = Uuid::new_v4();

        let token = issuer.issue_access_token(user_id).unwrap();
        let claims = issuer.decode(&token, TokenUse::Access).unwrap();

        assert_eq!(claims.user_id().unwrap(), user_id);
        assert_eq!(claims.token_use, TokenUse::Access);
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn test_token_class_is_enforced() {
        let issuer = issuer();
        let user_id = Uuid::new_v4();

        let refresh = issuer.issue_refresh_token(user_id).unwrap();
        assert!(matches!(
            issuer.decode(&refresh, TokenUse::Access),
            Err(AuthError::InvalidToken)
        ));

        let access = issuer.issue_access_token(user_id).unwrap();
        assert!(matches!(
            issuer.decode(&access, TokenUse::Refresh),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_expired_token_is_a_distinct_outcome() {
        let issuer = issuer();
        let now = Utc::now();

        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: (now - Duration::minutes(20)).timestamp(),
            exp: (now - Duration::minutes(5)).timestamp(),
            iss: "sigpol".to_string(),
            token_use: TokenUse::Access,
        };
        let token = encode(&Header::default(), &claims, &issuer.encoding_key).unwrap();

        assert!(matches!(
            issuer.decode(&token, TokenUse::Access),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let issuer = issuer();
        let other = TokenIssuer::new(&AuthConfig {
            jwt_secret: "another-secret".to_string(),
            ..AuthConfig::default()
        });

        let token = other.issue_access_token(Uuid::new_v4()).unwrap();
        assert!(matches!(
            issuer.decode(&token, TokenUse::Access),
            Err(AuthError::InvalidToken)
        ));
    }
}
