use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};

use crate::{config::AuthConfig, error::AuthError, Result};

/// Hash a password with Argon2id and a fresh salt
///
/// Returns the PHC string format (algorithm, parameters, salt and hash).
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|_| AuthError::HashingError)?
        .to_string();

    Ok(hash)
}

/// Verify a password against a stored PHC hash
///
/// The comparison inside `argon2` is constant-time; a mismatch is an
/// `Ok(false)`, only an unparseable stored hash is an error.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::HashingError)?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// New-password policy: minimum length, one uppercase letter, one digit
pub fn validate_password_policy(password: &str, config: &AuthConfig) -> Result<()> {
    if password.chars().count() < config.password_min_length {
        return Err(AuthError::Validation(format!(
            "La contraseña debe tener al menos {} caracteres",
            config.password_min_length
        )));
    }

    if config.password_require_uppercase && !password.chars().any(|c| c.is_uppercase()) {
        return Err(AuthError::Validation(
            "La contraseña debe contener al menos una mayúscula".to_string(),
        ));
    }

    if config.password_require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AuthError::Validation(
            "La contraseña debe contener al menos un número".to_string(),
        ));
    }

    Ok(())
}
