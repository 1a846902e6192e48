//! Credential, session and token authority for the SIGPOL engine
//!
//! This module is the single place that decides whether a credential is
//! valid, whether a token is still usable and whether an identity holds a
//! permission. It provides:
//! - Login with brute-force lockout (5 attempts, 30 minute lock)
//! - Access/refresh token issuance (HS256 bearer tokens)
//! - Refresh-token ledger with revocation and password-change mass revoke
//! - Concurrent session tracking per user (multi-device by design)
//! - Role-based permission evaluation with an admin wildcard tier
//!
//! HTTP routing, request validation schemas, rate limiting and the
//! business entities behind the permissions are collaborators, not part
//! of this crate.
//!
//! # Example
//!
//! ```rust,no_run
//! use auth_identity::{AuthConfig, AuthService, LoginRequest, ClientMeta, MemoryAuthStore};
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), auth_identity::AuthError> {
//! let store = Arc::new(MemoryAuthStore::new());
//! let service = AuthService::with_store(store, AuthConfig::default());
//!
//! let admitted = service
//!     .login(
//!         &LoginRequest { legajo: "12345".into(), password: "Secreta1".into() },
//!         &ClientMeta::default(),
//!     )
//!     .await?;
//!
//! println!("expires in {}s", admitted.expires_in);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod guard;
pub mod handlers;
pub mod lockout;
pub mod models;
pub mod password;
pub mod permissions;
pub mod repository;
pub mod service;
pub mod tokens;

pub use config::AuthConfig;
pub use error::{AuthError, Result};
pub use guard::PermissionGuard;
pub use handlers::AuthHandlers;
pub use models::*;
pub use permissions::{PermissionAccess, PermissionResolver};
pub use repository::{
    postgres::PostgresAuthStore, AuthUnitOfWork, FailureOutcome, MemoryAuthStore,
    RefreshTokenRepository, RoleRepository, SessionRepository, UserRepository,
};
pub use service::AuthService;
pub use tokens::{Claims, TokenIssuer, TokenUse};
