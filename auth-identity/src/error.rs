use error_common::codes;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    /// Generic credential failure; never distinguishes unknown user from
    /// wrong password.
    #[error("Credenciales inválidas")]
    InvalidCredentials,

    #[error("Cuenta bloqueada. Intente nuevamente en {remaining_minutes} minutos")]
    AccountLocked { remaining_minutes: i64 },

    #[error("Usuario inactivo")]
    UserInactive,

    #[error("Usuario no encontrado")]
    UserNotFound,

    #[error("Token inválido o revocado")]
    InvalidToken,

    #[error("Token expirado")]
    TokenExpired,

    #[error("Contraseña actual incorrecta")]
    InvalidPassword,

    #[error("Sesión no encontrada")]
    SessionNotFound,

    #[error("Permiso requerido: {0}")]
    InsufficientPermissions(String),

    #[error("{0}")]
    Validation(String),

    #[error("Hashing error")]
    HashingError,

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl AuthError {
    /// Stable error code for the response envelope
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => codes::auth::INVALID_CREDENTIALS,
            Self::AccountLocked { .. } => codes::auth::ACCOUNT_LOCKED,
            Self::UserInactive => codes::auth::USER_INACTIVE,
            Self::UserNotFound => codes::resource::USER_NOT_FOUND,
            Self::InvalidToken => codes::auth::INVALID_TOKEN,
            Self::TokenExpired => codes::auth::TOKEN_EXPIRED,
            Self::InvalidPassword => codes::auth::INVALID_PASSWORD,
            Self::SessionNotFound => codes::resource::SESSION_NOT_FOUND,
            Self::InsufficientPermissions(_) => codes::auth::INSUFFICIENT_PERMISSIONS,
            Self::Validation(_) => codes::validation::VALIDATION_ERROR,
            Self::HashingError | Self::DatabaseError(_) | Self::InternalError(_) => {
                codes::internal::INTERNAL_ERROR
            }
        }
    }

    /// HTTP status this error maps to
    pub fn status(&self) -> u16 {
        error_common::http_status(self.code())
    }

    /// Message safe to put on the wire; storage details never leave the
    /// process.
    pub fn public_message(&self) -> String {
        match self {
            Self::HashingError | Self::DatabaseError(_) | Self::InternalError(_) => {
                "Error interno del servidor".to_string()
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_status() {
        assert_eq!(AuthError::InvalidCredentials.status(), 401);
        assert_eq!(
            AuthError::AccountLocked {
                remaining_minutes: 30
            }
            .status(),
            403
        );
        assert_eq!(AuthError::SessionNotFound.status(), 404);
        assert_eq!(AuthError::Validation("x".into()).status(), 400);
    }

    #[test]
    fn test_internal_errors_are_masked() {
        let err = AuthError::DatabaseError(sqlx::Error::RowNotFound);
        assert_eq!(err.code(), "INTERNAL_ERROR");
        assert_eq!(err.public_message(), "Error interno del servidor");
    }

    #[test]
    fn test_lockout_message_carries_minutes() {
        let err = AuthError::AccountLocked {
            remaining_minutes: 12,
        };
        assert!(err.to_string().contains("12 minutos"));
    }
}
